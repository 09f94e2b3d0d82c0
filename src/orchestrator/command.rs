//! Executable commands: atomic backend calls plus sequence and conditional
//! composites.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

use crate::parser::types::{number_value, Params};
use crate::utils::config::Config;

/// Every command the orchestrator understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandKind {
    CreateSession,
    TerminateSession,
    ListSimulators,
    ListBootedSimulators,
    BootSimulator,
    ShutdownSimulator,
    InstallApp,
    LaunchApp,
    TerminateApp,
    UninstallApp,
    ListApps,
    IsAppInstalled,
    Tap,
    Swipe,
    PressButton,
    InputText,
    PressKey,
    PressKeySequence,
    DescribeAll,
    DescribePoint,
    TakeScreenshot,
    RecordVideo,
    StopRecording,
    GetLogs,
    GetAppLogs,
    StartDebug,
    StopDebug,
    DebugStatus,
    ListCrashLogs,
    ShowCrashLog,
    DeleteCrashLogs,
    InstallDylib,
    OpenUrl,
    ClearKeychain,
    SetLocation,
    AddMedia,
    ApprovePermissions,
    UpdateContacts,
    Sequence,
    Conditional,
}

impl CommandKind {
    pub fn is_composite(&self) -> bool {
        matches!(self, CommandKind::Sequence | CommandKind::Conditional)
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_value(self) {
            Ok(Value::String(name)) => f.write_str(&name),
            _ => write!(f, "{:?}", self),
        }
    }
}

/// Outcome envelope shared by every execution path
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommandResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl CommandResult {
    /// Successful result; a JSON null payload is dropped.
    pub fn success(data: Value) -> Self {
        Self {
            success: true,
            data: if data.is_null() { None } else { Some(data) },
            error: None,
            timestamp: Utc::now(),
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            timestamp: Utc::now(),
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// What hooks get to see while a command runs
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionContext {
    pub session_id: Option<String>,
}

/// Decides whether an atomic command may be dispatched at all
#[async_trait]
pub trait CommandValidator: Send + Sync {
    async fn validate(&self, context: &ExecutionContext) -> Result<bool>;
}

/// Rewrites an atomic command's parameters right before dispatch
#[async_trait]
pub trait ParameterTransform: Send + Sync {
    async fn transform(&self, parameters: Params) -> Result<Params>;
}

/// Turns a backend failure into a custom result
#[async_trait]
pub trait ErrorHandler: Send + Sync {
    async fn on_error(&self, error: &anyhow::Error, context: &ExecutionContext) -> CommandResult;
}

/// Branch condition of a conditional command
#[async_trait]
pub trait ConditionPredicate: Send + Sync {
    async fn evaluate(&self, context: &ExecutionContext) -> Result<bool>;
}

struct ValidatorFn<F>(F);

#[async_trait]
impl<F> CommandValidator for ValidatorFn<F>
where
    F: Fn(&ExecutionContext) -> Result<bool> + Send + Sync,
{
    async fn validate(&self, context: &ExecutionContext) -> Result<bool> {
        (self.0)(context)
    }
}

struct TransformFn<F>(F);

#[async_trait]
impl<F> ParameterTransform for TransformFn<F>
where
    F: Fn(Params) -> Result<Params> + Send + Sync,
{
    async fn transform(&self, parameters: Params) -> Result<Params> {
        (self.0)(parameters)
    }
}

struct ErrorHandlerFn<F>(F);

#[async_trait]
impl<F> ErrorHandler for ErrorHandlerFn<F>
where
    F: Fn(&anyhow::Error, &ExecutionContext) -> CommandResult + Send + Sync,
{
    async fn on_error(&self, error: &anyhow::Error, context: &ExecutionContext) -> CommandResult {
        (self.0)(error, context)
    }
}

struct PredicateFn<F>(F);

#[async_trait]
impl<F> ConditionPredicate for PredicateFn<F>
where
    F: Fn(&ExecutionContext) -> Result<bool> + Send + Sync,
{
    async fn evaluate(&self, context: &ExecutionContext) -> Result<bool> {
        (self.0)(context)
    }
}

pub fn validator_fn<F>(f: F) -> Arc<dyn CommandValidator>
where
    F: Fn(&ExecutionContext) -> Result<bool> + Send + Sync + 'static,
{
    Arc::new(ValidatorFn(f))
}

pub fn transform_fn<F>(f: F) -> Arc<dyn ParameterTransform>
where
    F: Fn(Params) -> Result<Params> + Send + Sync + 'static,
{
    Arc::new(TransformFn(f))
}

pub fn error_handler_fn<F>(f: F) -> Arc<dyn ErrorHandler>
where
    F: Fn(&anyhow::Error, &ExecutionContext) -> CommandResult + Send + Sync + 'static,
{
    Arc::new(ErrorHandlerFn(f))
}

pub fn predicate_fn<F>(f: F) -> Arc<dyn ConditionPredicate>
where
    F: Fn(&ExecutionContext) -> Result<bool> + Send + Sync + 'static,
{
    Arc::new(PredicateFn(f))
}

/// Optional per-command strategies
#[derive(Clone, Default)]
pub struct CommandHooks {
    pub validate: Option<Arc<dyn CommandValidator>>,
    pub transform: Option<Arc<dyn ParameterTransform>>,
    pub on_error: Option<Arc<dyn ErrorHandler>>,
}

/// Shape of a command; the variant fixes what the parameters look like
#[derive(Clone)]
pub enum CommandBody {
    Atomic {
        kind: CommandKind,
        parameters: Params,
    },
    Sequence {
        commands: Vec<OrchestratorCommand>,
        stop_on_error: bool,
    },
    Conditional {
        condition: Arc<dyn ConditionPredicate>,
        if_true: Box<OrchestratorCommand>,
        if_false: Option<Box<OrchestratorCommand>>,
    },
}

/// The unit of execution. Build through [`CommandFactory`].
#[derive(Clone)]
pub struct OrchestratorCommand {
    pub(crate) id: String,
    pub(crate) body: CommandBody,
    pub(crate) description: Option<String>,
    pub(crate) timeout_ms: u64,
    pub(crate) retries: u32,
    pub(crate) hooks: CommandHooks,
}

impl OrchestratorCommand {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> CommandKind {
        match &self.body {
            CommandBody::Atomic { kind, .. } => *kind,
            CommandBody::Sequence { .. } => CommandKind::Sequence,
            CommandBody::Conditional { .. } => CommandKind::Conditional,
        }
    }

    pub fn body(&self) -> &CommandBody {
        &self.body
    }

    /// Parameters of an atomic command; composites have none.
    pub fn parameters(&self) -> Option<&Params> {
        match &self.body {
            CommandBody::Atomic { parameters, .. } => Some(parameters),
            _ => None,
        }
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn timeout_ms(&self) -> u64 {
        self.timeout_ms
    }

    pub fn retries(&self) -> u32 {
        self.retries
    }

    pub fn hooks(&self) -> &CommandHooks {
        &self.hooks
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn with_validator(mut self, validator: Arc<dyn CommandValidator>) -> Self {
        self.hooks.validate = Some(validator);
        self
    }

    pub fn with_transform(mut self, transform: Arc<dyn ParameterTransform>) -> Self {
        self.hooks.transform = Some(transform);
        self
    }

    pub fn with_error_handler(mut self, handler: Arc<dyn ErrorHandler>) -> Self {
        self.hooks.on_error = Some(handler);
        self
    }

    /// Serializable view for history, events and transport output
    pub fn to_record(&self) -> CommandRecord {
        let (parameters, children, stop_on_error) = match &self.body {
            CommandBody::Atomic { parameters, .. } => (parameters.clone(), Vec::new(), None),
            CommandBody::Sequence {
                commands,
                stop_on_error,
            } => (
                Params::new(),
                commands.iter().map(|c| c.to_record()).collect(),
                Some(*stop_on_error),
            ),
            CommandBody::Conditional {
                if_true, if_false, ..
            } => {
                let mut children = vec![if_true.to_record()];
                if let Some(if_false) = if_false {
                    children.push(if_false.to_record());
                }
                (Params::new(), children, None)
            }
        };

        CommandRecord {
            id: self.id.clone(),
            kind: self.kind(),
            parameters,
            description: self.description.clone(),
            timeout_ms: self.timeout_ms,
            retries: self.retries,
            stop_on_error,
            children,
        }
    }
}

impl fmt::Debug for OrchestratorCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.to_record(), f)
    }
}

/// Serializable snapshot of a command, hooks left out
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CommandRecord {
    pub id: String,
    pub kind: CommandKind,
    pub parameters: Params,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub timeout_ms: u64,
    pub retries: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_on_error: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<CommandRecord>,
}

/// Sole constructor of commands: fresh ids and default timeout/retries
#[derive(Debug, Clone)]
pub struct CommandFactory {
    default_timeout_ms: u64,
    default_retries: u32,
}

impl CommandFactory {
    pub fn new(default_timeout_ms: u64, default_retries: u32) -> Self {
        Self {
            default_timeout_ms,
            default_retries,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.default_timeout_ms, config.default_retry_count)
    }

    fn build(&self, body: CommandBody) -> OrchestratorCommand {
        OrchestratorCommand {
            id: Uuid::new_v4().to_string(),
            body,
            description: None,
            timeout_ms: self.default_timeout_ms,
            retries: self.default_retries,
            hooks: CommandHooks::default(),
        }
    }

    pub fn create(&self, kind: CommandKind, parameters: Params) -> OrchestratorCommand {
        self.build(CommandBody::Atomic { kind, parameters })
    }

    pub fn create_sequence(
        &self,
        commands: Vec<OrchestratorCommand>,
        stop_on_error: bool,
    ) -> OrchestratorCommand {
        self.build(CommandBody::Sequence {
            commands,
            stop_on_error,
        })
    }

    pub fn create_conditional(
        &self,
        condition: Arc<dyn ConditionPredicate>,
        if_true: OrchestratorCommand,
        if_false: Option<OrchestratorCommand>,
    ) -> OrchestratorCommand {
        self.build(CommandBody::Conditional {
            condition,
            if_true: Box::new(if_true),
            if_false: if_false.map(Box::new),
        })
    }
}

impl Default for CommandFactory {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

// Parameter accessors tolerant of the shapes parsing can produce.

pub fn param_str(parameters: &Params, name: &str) -> Option<String> {
    match parameters.get(name)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

pub fn param_f64(parameters: &Params, name: &str) -> Option<f64> {
    match parameters.get(name)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub fn param_bool(parameters: &Params, name: &str) -> Option<bool> {
    match parameters.get(name)? {
        Value::Bool(b) => Some(*b),
        Value::String(s) => Some(s.eq_ignore_ascii_case("true")),
        _ => None,
    }
}

/// A list parameter, accepting an array or a comma/space separated string.
pub fn param_list(parameters: &Params, name: &str) -> Option<Vec<String>> {
    match parameters.get(name)? {
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s.clone()),
                    Value::Null => None,
                    other => Some(other.to_string()),
                })
                .collect(),
        ),
        Value::String(s) => Some(
            s.split(|c: char| c == ',' || c.is_whitespace())
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        ),
        other => Some(vec![other.to_string()]),
    }
}

/// Force a parameter to a JSON number if it holds a numeric string.
pub fn coerce_number(parameters: &mut Params, name: &str) {
    if let Some(Value::String(s)) = parameters.get(name) {
        if let Some(number) = number_value(s) {
            parameters.insert(name.to_string(), number);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_factory_assigns_unique_ids_and_defaults() {
        let factory = CommandFactory::new(1500, 2);
        let a = factory.create(CommandKind::Tap, Params::new());
        let b = factory.create(CommandKind::Tap, Params::new());
        assert_ne!(a.id(), b.id());
        assert_eq!(a.timeout_ms(), 1500);
        assert_eq!(a.retries(), 2);
        assert!(a.hooks().validate.is_none());
    }

    #[test]
    fn test_kind_follows_body() {
        let factory = CommandFactory::default();
        let tap = factory.create(CommandKind::Tap, Params::new());
        let seq = factory.create_sequence(vec![tap.clone()], true);
        let cond = factory.create_conditional(predicate_fn(|_| Ok(true)), tap.clone(), None);
        assert_eq!(tap.kind(), CommandKind::Tap);
        assert_eq!(seq.kind(), CommandKind::Sequence);
        assert_eq!(cond.kind(), CommandKind::Conditional);
        assert!(seq.parameters().is_none());
    }

    #[test]
    fn test_record_serializes_children() {
        let factory = CommandFactory::default();
        let mut params = Params::new();
        params.insert("x".into(), json!(1));
        let seq = factory
            .create_sequence(vec![factory.create(CommandKind::Tap, params)], false)
            .with_description("two taps");
        let record = serde_json::to_value(seq.to_record()).unwrap();
        assert_eq!(record["kind"], json!("SEQUENCE"));
        assert_eq!(record["stopOnError"], json!(false));
        assert_eq!(record["children"][0]["kind"], json!("TAP"));
        assert_eq!(record["children"][0]["parameters"]["x"], json!(1));
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(CommandKind::CreateSession.to_string(), "CREATE_SESSION");
        assert_eq!(CommandKind::OpenUrl.to_string(), "OPEN_URL");
    }

    #[test]
    fn test_param_accessors() {
        let mut params = Params::new();
        params.insert("x".into(), json!("12.5"));
        params.insert("flag".into(), json!("TRUE"));
        params.insert("keys".into(), json!(["4", 5]));
        params.insert("paths".into(), json!("a.png, b.png"));
        assert_eq!(param_f64(&params, "x"), Some(12.5));
        assert_eq!(param_bool(&params, "flag"), Some(true));
        assert_eq!(param_list(&params, "keys"), Some(vec!["4".to_string(), "5".to_string()]));
        assert_eq!(param_list(&params, "paths"), Some(vec!["a.png".to_string(), "b.png".to_string()]));
        coerce_number(&mut params, "x");
        assert_eq!(params.get("x"), Some(&json!(12.5)));
    }

    #[test]
    fn test_success_drops_null_payload() {
        assert_eq!(CommandResult::success(Value::Null).data, None);
        assert_eq!(CommandResult::success(json!("abc")).data, Some(json!("abc")));
        let failure = CommandResult::failure("boom");
        assert!(!failure.success);
        assert_eq!(failure.error.as_deref(), Some("boom"));
    }
}
