use super::command::{coerce_number, CommandFactory, CommandKind, OrchestratorCommand};
use crate::error::PipelineError;
use crate::parser::types::{ParseResult, Params};
use serde_json::Value;

/// Parsed command name to command kind. Order matters for the substring
/// fallback: the first key contained in the parsed name wins.
const COMMAND_KINDS: &[(&str, CommandKind)] = &[
    ("create session", CommandKind::CreateSession),
    ("terminate session", CommandKind::TerminateSession),
    ("list booted simulators", CommandKind::ListBootedSimulators),
    ("list simulators", CommandKind::ListSimulators),
    ("boot simulator", CommandKind::BootSimulator),
    ("shutdown simulator", CommandKind::ShutdownSimulator),
    ("install app", CommandKind::InstallApp),
    ("launch app", CommandKind::LaunchApp),
    ("terminate app", CommandKind::TerminateApp),
    ("uninstall app", CommandKind::UninstallApp),
    ("list apps", CommandKind::ListApps),
    ("is app installed", CommandKind::IsAppInstalled),
    ("tap", CommandKind::Tap),
    ("swipe", CommandKind::Swipe),
    ("press button", CommandKind::PressButton),
    ("press key sequence", CommandKind::PressKeySequence),
    ("press key", CommandKind::PressKey),
    ("input text", CommandKind::InputText),
    ("describe all elements", CommandKind::DescribeAll),
    ("describe point", CommandKind::DescribePoint),
    ("take screenshot", CommandKind::TakeScreenshot),
    ("record video", CommandKind::RecordVideo),
    ("stop recording", CommandKind::StopRecording),
    ("get app logs", CommandKind::GetAppLogs),
    ("get logs", CommandKind::GetLogs),
    ("start debug", CommandKind::StartDebug),
    ("stop debug", CommandKind::StopDebug),
    ("debug status", CommandKind::DebugStatus),
    ("list crash logs", CommandKind::ListCrashLogs),
    ("show crash log", CommandKind::ShowCrashLog),
    ("delete crash logs", CommandKind::DeleteCrashLogs),
    ("install dylib", CommandKind::InstallDylib),
    ("open url", CommandKind::OpenUrl),
    ("clear keychain", CommandKind::ClearKeychain),
    ("set location", CommandKind::SetLocation),
    ("add media", CommandKind::AddMedia),
    ("approve permissions", CommandKind::ApprovePermissions),
    ("update contacts", CommandKind::UpdateContacts),
];

/// Turns validated parse results into orchestrator commands
#[derive(Debug, Clone, Default)]
pub struct CommandTranslator {
    factory: CommandFactory,
}

impl CommandTranslator {
    pub fn new(factory: CommandFactory) -> Self {
        Self { factory }
    }

    pub fn to_command(&self, parsed: &ParseResult) -> Result<OrchestratorCommand, PipelineError> {
        let kind = resolve_kind(&parsed.command)?;
        let parameters = coerce_parameters(kind, parsed.parameters.clone());
        Ok(self
            .factory
            .create(kind, parameters)
            .with_description(format!("Instruction: {}", parsed.original_text)))
    }
}

/// Exact match first, then the first table key the name contains.
pub fn resolve_kind(command: &str) -> Result<CommandKind, PipelineError> {
    let name = command.trim().to_lowercase();

    if let Some((_, kind)) = COMMAND_KINDS.iter().find(|(key, _)| *key == name) {
        return Ok(*kind);
    }

    COMMAND_KINDS
        .iter()
        .find(|(key, _)| name.contains(key))
        .map(|(_, kind)| *kind)
        .ok_or_else(|| PipelineError::UnmappedCommand {
            name: command.to_string(),
        })
}

fn coerce_parameters(kind: CommandKind, mut parameters: Params) -> Params {
    match kind {
        CommandKind::Tap | CommandKind::DescribePoint => {
            coerce_number(&mut parameters, "x");
            coerce_number(&mut parameters, "y");
        }
        CommandKind::Swipe => {
            for name in ["startX", "startY", "endX", "endY", "duration"] {
                coerce_number(&mut parameters, name);
            }
        }
        CommandKind::CreateSession => {
            if let Some(Value::String(flag)) = parameters.get("autoboot") {
                let autoboot = flag.eq_ignore_ascii_case("true");
                parameters.insert("autoboot".to_string(), Value::Bool(autoboot));
            }
        }
        _ => {}
    }
    parameters
}
