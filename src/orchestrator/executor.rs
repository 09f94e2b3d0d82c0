use anyhow::Result;
use log::{debug, error, info, warn};
use serde_json::{json, Value};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use super::command::{
    CommandBody, CommandKind, CommandRecord, CommandResult, ConditionPredicate, ExecutionContext,
    OrchestratorCommand,
};
use super::events::{EventFeed, EventName, ListenerId, OrchestratorEvent};
use super::history::{CommandHistory, HistoryEntry};
use crate::driver::{BackendAdapter, SimulatorBackend};
use crate::error::PipelineError;
use crate::parser::types::Params;
use crate::utils::config::Config;

pub type BoxedResult<'a> = Pin<Box<dyn Future<Output = CommandResult> + Send + 'a>>;

/// Runs commands against the backend while tracking the active session,
/// the history buffer and the event feed.
///
/// One instance serves one logical caller. Concurrent `execute` calls on the
/// same instance interleave their session updates.
pub struct Orchestrator {
    adapter: BackendAdapter,
    config: Config,
    active_session: Mutex<Option<String>>,
    history: Mutex<CommandHistory>,
    events: EventFeed,
}

impl Orchestrator {
    pub fn new(backend: Arc<dyn SimulatorBackend>, config: Config) -> Self {
        Self {
            adapter: BackendAdapter::new(backend),
            history: Mutex::new(CommandHistory::new(config.history_limit)),
            config,
            active_session: Mutex::new(None),
            events: EventFeed::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn events(&self) -> &EventFeed {
        &self.events
    }

    pub fn on<F>(&self, name: EventName, listener: F) -> ListenerId
    where
        F: Fn(&OrchestratorEvent) -> Result<()> + Send + Sync + 'static,
    {
        self.events.on(name, listener)
    }

    pub fn off(&self, name: EventName, id: ListenerId) -> bool {
        self.events.off(name, id)
    }

    /// Execute a command of any shape. Never fails: every error ends up in
    /// the returned result. Appends one history entry and emits
    /// `commandExecuted` per call, children included.
    pub fn execute<'a>(&'a self, command: &'a OrchestratorCommand) -> BoxedResult<'a> {
        Box::pin(async move {
            let mut record = command.to_record();

            let outcome = match command.body() {
                CommandBody::Sequence {
                    commands,
                    stop_on_error,
                } => self.run_sequence(commands, *stop_on_error).await,
                CommandBody::Conditional {
                    condition,
                    if_true,
                    if_false,
                } => {
                    self.run_conditional(condition.as_ref(), if_true, if_false.as_deref())
                        .await
                }
                CommandBody::Atomic { kind, parameters } => {
                    self.run_atomic(command, *kind, parameters, &mut record).await
                }
            };

            let result = outcome.unwrap_or_else(|e| {
                error!("Command {} ({}) failed: {:#}", command.id(), command.kind(), e);
                CommandResult::failure(format!("{:#}", e))
            });

            self.lock_history().push(record.clone(), result.clone());
            self.events.emit(OrchestratorEvent::CommandExecuted {
                command: record,
                result: result.clone(),
            });

            result
        })
    }

    async fn run_sequence(&self, commands: &[OrchestratorCommand], stop_on_error: bool) -> Result<CommandResult> {
        let total = commands.len();
        let mut results = Vec::with_capacity(total);
        let mut failed = 0;

        for (index, child) in commands.iter().enumerate() {
            let result = self.execute(child).await;

            if !result.success {
                failed += 1;
                if stop_on_error {
                    let message = format!(
                        "Sequence stopped at command {} ({}/{}): {}",
                        child.id(),
                        index + 1,
                        total,
                        result.error.as_deref().unwrap_or("unknown error")
                    );
                    results.push(result);
                    return Ok(CommandResult::failure(message).with_data(json!({
                        "results": results,
                        "completedCommands": index + 1,
                        "totalCommands": total,
                        "failedCommandId": child.id(),
                    })));
                }
            }
            results.push(result);
        }

        // Success here means the sequence ran to completion; failedCommands
        // tells whether every child succeeded.
        Ok(CommandResult::success(json!({
            "results": results,
            "completedCommands": total,
            "totalCommands": total,
            "failedCommands": failed,
        })))
    }

    async fn run_conditional(
        &self,
        condition: &dyn ConditionPredicate,
        if_true: &OrchestratorCommand,
        if_false: Option<&OrchestratorCommand>,
    ) -> Result<CommandResult> {
        let holds = condition
            .evaluate(&self.context())
            .await
            .map_err(|e| hook_failed("condition", e))?;
        debug!("Condition evaluated to {}", holds);

        match (holds, if_false) {
            (true, _) => Ok(self.execute(if_true).await),
            (false, Some(branch)) => Ok(self.execute(branch).await),
            (false, None) => Ok(CommandResult::success(json!({
                "conditionResult": false,
                "executed": false,
            }))),
        }
    }

    async fn run_atomic(
        &self,
        command: &OrchestratorCommand,
        kind: CommandKind,
        parameters: &Params,
        record: &mut CommandRecord,
    ) -> Result<CommandResult> {
        let hooks = command.hooks();

        if let Some(validator) = &hooks.validate {
            let valid = validator
                .validate(&self.context())
                .await
                .map_err(|e| hook_failed("validate", e))?;
            if !valid {
                return Ok(CommandResult::failure("Parameter validation failed"));
            }
        }

        let transformed;
        let dispatched = match &hooks.transform {
            Some(transform) => {
                let parameters = transform
                    .transform(parameters.clone())
                    .await
                    .map_err(|e| hook_failed("transform", e))?;
                record.parameters = parameters.clone();
                let mut rewritten = command.clone();
                rewritten.body = CommandBody::Atomic { kind, parameters };
                transformed = rewritten;
                &transformed
            }
            None => command,
        };

        let mut result = self
            .adapter
            .execute(dispatched, self.active_session_id().as_deref())
            .await;

        let retries = command.retries();
        let mut attempt = 0;
        while !result.success && attempt < retries {
            attempt += 1;
            warn!(
                "{} failed ({}), retry {}/{}",
                kind,
                result.error.as_deref().unwrap_or("unknown error"),
                attempt,
                retries
            );
            tokio::time::sleep(Duration::from_millis(self.config.retry_delay_ms)).await;
            result = self
                .adapter
                .execute(dispatched, self.active_session_id().as_deref())
                .await;
        }

        if result.success {
            self.apply_session_change(kind, &result);
        }
        Ok(result)
    }

    fn apply_session_change(&self, kind: CommandKind, result: &CommandResult) {
        match kind {
            CommandKind::CreateSession => {
                let Some(session_id) = result.data.as_ref().and_then(session_handle) else {
                    warn!("Session created without a usable handle: {:?}", result.data);
                    return;
                };
                info!("Session {} is now active", session_id);
                *self.lock_session() = Some(session_id.clone());
                self.events.emit(OrchestratorEvent::SessionCreated { session_id });
            }
            CommandKind::TerminateSession => {
                let previous = self.lock_session().take();
                info!("Session {} terminated", previous.as_deref().unwrap_or("-"));
                self.events.emit(OrchestratorEvent::SessionTerminated {
                    session_id: previous,
                });
            }
            _ => {}
        }
    }

    pub fn get_active_session_id(&self) -> Option<String> {
        self.active_session_id()
    }

    /// Replace the active session. Emits `sessionActivated` for a new id and
    /// `sessionDeactivated` (with the previous id) when cleared.
    pub fn set_active_session_id(&self, session_id: Option<String>) {
        let previous = std::mem::replace(&mut *self.lock_session(), session_id.clone());
        match session_id {
            Some(session_id) => self.events.emit(OrchestratorEvent::SessionActivated { session_id }),
            None => self.events.emit(OrchestratorEvent::SessionDeactivated {
                previous_session_id: previous,
            }),
        }
    }

    /// Last `limit` entries in execution order, all when None.
    pub fn get_command_history(&self, limit: Option<usize>) -> Vec<HistoryEntry> {
        self.lock_history().recent(limit)
    }

    pub fn clear_history(&self) {
        self.lock_history().clear();
    }

    /// Tear down: terminate the held session on the backend, then drop
    /// listeners and history.
    pub async fn dispose(&self) {
        let active = self.lock_session().take();
        if let Some(session_id) = active {
            match self.adapter.backend().terminate_session(&session_id).await {
                Ok(()) => self.events.emit(OrchestratorEvent::SessionTerminated {
                    session_id: Some(session_id),
                }),
                Err(e) => warn!("Failed to terminate session {} on dispose: {:#}", session_id, e),
            }
        }
        self.events.clear();
        self.clear_history();
    }

    fn context(&self) -> ExecutionContext {
        ExecutionContext {
            session_id: self.active_session_id(),
        }
    }

    fn active_session_id(&self) -> Option<String> {
        self.lock_session().clone()
    }

    fn lock_session(&self) -> MutexGuard<'_, Option<String>> {
        self.active_session
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_history(&self) -> MutexGuard<'_, CommandHistory> {
        self.history
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Session handle out of a create-session payload: a bare string, or an
/// object carrying `sessionId`/`udid`.
fn session_handle(data: &Value) -> Option<String> {
    match data {
        Value::String(id) if !id.is_empty() => Some(id.clone()),
        Value::Object(map) => map
            .get("sessionId")
            .or_else(|| map.get("udid"))
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    }
}

fn hook_failed(hook: &'static str, error: anyhow::Error) -> anyhow::Error {
    PipelineError::HookFailed {
        hook,
        message: format!("{:#}", error),
    }
    .into()
}
