//! Resolved command → one backend capability call → result envelope.

use anyhow::{anyhow, Result};
use log::{debug, warn};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

use super::traits::{LogQuery, SessionOptions, SimulatorBackend};
use crate::error::PipelineError;
use crate::orchestrator::command::{
    param_bool, param_f64, param_list, param_str, CommandKind, CommandResult, ExecutionContext,
    OrchestratorCommand,
};
use crate::parser::types::Params;

pub struct BackendAdapter {
    backend: Arc<dyn SimulatorBackend>,
}

impl BackendAdapter {
    pub fn new(backend: Arc<dyn SimulatorBackend>) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &Arc<dyn SimulatorBackend> {
        &self.backend
    }

    /// Run one atomic command. Never fails: errors become failed results,
    /// or whatever the command's error handler makes of them.
    pub async fn execute(&self, command: &OrchestratorCommand, session_id: Option<&str>) -> CommandResult {
        let empty = Params::new();
        let parameters = command.parameters().unwrap_or(&empty);
        let session = param_str(parameters, "sessionId")
            .or_else(|| session_id.map(str::to_string))
            .unwrap_or_default();
        let kind = command.kind();

        debug!("Dispatching {} to {} (session '{}')", kind, self.backend.name(), session);

        let timeout = Duration::from_millis(command.timeout_ms());
        let outcome = match tokio::time::timeout(timeout, self.dispatch(kind, parameters, &session)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(anyhow!("{} timed out after {}ms", kind, command.timeout_ms())),
        };

        match outcome {
            Ok(data) => CommandResult::success(data),
            Err(error) => {
                if let Some(handler) = &command.hooks().on_error {
                    let context = ExecutionContext {
                        session_id: Some(session),
                    };
                    return handler.on_error(&error, &context).await;
                }
                warn!("{} failed: {:#}", kind, error);
                CommandResult::failure(format!("{:#}", error))
            }
        }
    }

    async fn dispatch(&self, kind: CommandKind, params: &Params, session: &str) -> Result<Value> {
        let backend = &self.backend;

        let data = match kind {
            CommandKind::CreateSession => {
                let options = SessionOptions {
                    device_name: param_str(params, "deviceName"),
                    platform_version: param_str(params, "platformVersion"),
                    autoboot: param_bool(params, "autoboot").unwrap_or(true),
                };
                Value::String(backend.create_session(&options).await?)
            }
            CommandKind::TerminateSession => {
                backend.terminate_session(session).await?;
                Value::Null
            }
            CommandKind::ListSimulators => serde_json::to_value(backend.list_simulators().await?)?,
            CommandKind::ListBootedSimulators => {
                serde_json::to_value(backend.list_booted_simulators().await?)?
            }
            CommandKind::BootSimulator => {
                backend.boot_simulator(&required_str(params, "udid")?).await?;
                Value::Null
            }
            CommandKind::ShutdownSimulator => {
                backend.shutdown_simulator(&required_str(params, "udid")?).await?;
                Value::Null
            }

            CommandKind::InstallApp => {
                backend.install_app(session, &required_str(params, "appPath")?).await?;
                Value::Null
            }
            CommandKind::LaunchApp => {
                backend.launch_app(session, &required_str(params, "bundleId")?).await?;
                Value::Null
            }
            CommandKind::TerminateApp => {
                backend.terminate_app(session, &required_str(params, "bundleId")?).await?;
                Value::Null
            }
            CommandKind::UninstallApp => {
                backend.uninstall_app(session, &required_str(params, "bundleId")?).await?;
                Value::Null
            }
            CommandKind::ListApps => backend.list_apps(session).await?,
            CommandKind::IsAppInstalled => {
                let bundle_id = required_str(params, "bundleId")?;
                let installed = backend.is_app_installed(session, &bundle_id).await?;
                json!({ "bundleId": bundle_id, "installed": installed })
            }

            CommandKind::Tap => {
                let x = required_f64(params, "x")?;
                let y = required_f64(params, "y")?;
                backend.tap(session, x, y, param_f64(params, "duration")).await?;
                Value::Null
            }
            CommandKind::Swipe => {
                let start = (required_f64(params, "startX")?, required_f64(params, "startY")?);
                let end = (required_f64(params, "endX")?, required_f64(params, "endY")?);
                let delta = param_f64(params, "delta").map(|d| d as u32);
                backend
                    .swipe(session, start, end, param_f64(params, "duration"), delta)
                    .await?;
                Value::Null
            }
            CommandKind::PressButton => {
                let button = required_str(params, "button")?.to_uppercase();
                backend
                    .press_button(session, &button, param_f64(params, "duration"))
                    .await?;
                Value::Null
            }
            CommandKind::InputText => {
                backend.input_text(session, &required_str(params, "text")?).await?;
                Value::Null
            }
            CommandKind::PressKey => {
                let key_code = required_f64(params, "keyCode")? as u32;
                backend
                    .press_key(session, key_code, param_f64(params, "duration"))
                    .await?;
                Value::Null
            }
            CommandKind::PressKeySequence => {
                let keys = param_list(params, "keySequence")
                    .ok_or_else(|| missing("keySequence"))?
                    .iter()
                    .map(|key| {
                        key.parse::<u32>()
                            .map_err(|_| anyhow!("Invalid key code '{}'", key))
                    })
                    .collect::<Result<Vec<u32>>>()?;
                backend.press_key_sequence(session, &keys).await?;
                Value::Null
            }

            CommandKind::DescribeAll => backend.describe_all(session).await?,
            CommandKind::DescribePoint => {
                let x = required_f64(params, "x")?;
                let y = required_f64(params, "y")?;
                backend.describe_point(session, x, y).await?
            }

            CommandKind::TakeScreenshot => {
                let output = param_str(params, "outputPath");
                let path = backend.take_screenshot(session, output.as_deref()).await?;
                screenshot_payload(path).await
            }
            CommandKind::RecordVideo => {
                let output = param_str(params, "outputPath");
                let path = backend.start_recording(session, output.as_deref()).await?;
                json!({ "path": path, "recording": true })
            }
            CommandKind::StopRecording => {
                let path = backend.stop_recording(session).await?;
                json!({ "path": path, "recording": false })
            }
            CommandKind::GetLogs | CommandKind::GetAppLogs => {
                let query = LogQuery {
                    limit: param_f64(params, "limit").map(|l| l as u32),
                    bundle_id: if kind == CommandKind::GetAppLogs {
                        Some(required_str(params, "bundleId")?)
                    } else {
                        param_str(params, "bundleId")
                    },
                };
                Value::String(backend.get_logs(session, &query).await?)
            }

            CommandKind::StartDebug => {
                let bundle_id = required_str(params, "bundleId")?;
                let port = param_f64(params, "port").map(|p| p as u16);
                backend.start_debug(session, &bundle_id, port).await?
            }
            CommandKind::StopDebug => {
                backend.stop_debug(session).await?;
                Value::Null
            }
            CommandKind::DebugStatus => backend.debug_status(session).await?,
            CommandKind::ListCrashLogs => {
                let bundle_id = param_str(params, "bundleId");
                backend.list_crash_logs(session, bundle_id.as_deref()).await?
            }
            CommandKind::ShowCrashLog => {
                Value::String(backend.get_crash_log(session, &required_str(params, "name")?).await?)
            }
            CommandKind::DeleteCrashLogs => {
                let name = param_str(params, "name");
                backend.delete_crash_logs(session, name.as_deref()).await?;
                Value::Null
            }

            CommandKind::InstallDylib => {
                backend.install_dylib(session, &required_str(params, "dylibPath")?).await?;
                Value::Null
            }
            CommandKind::OpenUrl => {
                backend.open_url(session, &required_str(params, "url")?).await?;
                Value::Null
            }
            CommandKind::ClearKeychain => {
                backend.clear_keychain(session).await?;
                Value::Null
            }
            CommandKind::SetLocation => {
                let latitude = required_f64(params, "latitude")?;
                let longitude = required_f64(params, "longitude")?;
                backend.set_location(session, latitude, longitude).await?;
                Value::Null
            }
            CommandKind::AddMedia => {
                let paths = param_list(params, "mediaPaths").ok_or_else(|| missing("mediaPaths"))?;
                backend.add_media(session, &paths).await?;
                Value::Null
            }
            CommandKind::ApprovePermissions => {
                let bundle_id = required_str(params, "bundleId")?;
                let permissions = param_list(params, "permissions").ok_or_else(|| missing("permissions"))?;
                backend.approve_permissions(session, &bundle_id, &permissions).await?;
                Value::Null
            }
            CommandKind::UpdateContacts => {
                backend.update_contacts(session, &required_str(params, "dbPath")?).await?;
                Value::Null
            }

            CommandKind::Sequence | CommandKind::Conditional => {
                return Err(PipelineError::UnsupportedKind {
                    kind: kind.to_string(),
                }
                .into())
            }
        };

        Ok(data)
    }
}

/// `{path, data}` with the PNG inlined as base64 when the file is readable
async fn screenshot_payload(path: String) -> Value {
    use base64::Engine;

    match tokio::fs::read(&path).await {
        Ok(bytes) => json!({
            "path": path,
            "data": base64::engine::general_purpose::STANDARD.encode(bytes),
        }),
        Err(e) => {
            debug!("Screenshot {} not readable: {}", path, e);
            json!({ "path": path })
        }
    }
}

fn missing(name: &str) -> anyhow::Error {
    anyhow!("Missing parameter '{}'", name)
}

fn required_str(params: &Params, name: &str) -> Result<String> {
    param_str(params, name).ok_or_else(|| missing(name))
}

fn required_f64(params: &Params, name: &str) -> Result<f64> {
    param_f64(params, name).ok_or_else(|| missing(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::testing::RecordingBackend;
    use crate::orchestrator::command::{error_handler_fn, CommandFactory};

    fn params(value: Value) -> Params {
        match value {
            Value::Object(map) => map,
            _ => Params::new(),
        }
    }

    #[tokio::test]
    async fn test_explicit_session_beats_fallback() {
        let backend = Arc::new(RecordingBackend::new());
        let adapter = BackendAdapter::new(backend.clone());
        let factory = CommandFactory::default();

        let command = factory.create(
            CommandKind::LaunchApp,
            params(json!({"bundleId": "com.example.demo", "sessionId": "explicit"})),
        );
        assert!(adapter.execute(&command, Some("implicit")).await.success);

        let command = factory.create(CommandKind::LaunchApp, params(json!({"bundleId": "com.example.demo"})));
        assert!(adapter.execute(&command, Some("implicit")).await.success);

        let command = factory.create(CommandKind::LaunchApp, params(json!({"bundleId": "com.example.demo"})));
        assert!(adapter.execute(&command, None).await.success);

        assert_eq!(
            backend.calls(),
            vec![
                "launch_app explicit com.example.demo",
                "launch_app implicit com.example.demo",
                "launch_app  com.example.demo",
            ]
        );
    }

    #[tokio::test]
    async fn test_backend_failure_becomes_failed_result() {
        let backend = Arc::new(RecordingBackend::new().failing("tap"));
        let adapter = BackendAdapter::new(backend);
        let command = CommandFactory::default().create(CommandKind::Tap, params(json!({"x": 1, "y": 2})));

        let result = adapter.execute(&command, Some("sim")).await;
        assert!(!result.success);
        assert!(result.error.unwrap().contains("tap failed"));
    }

    #[tokio::test]
    async fn test_error_handler_takes_over() {
        let backend = Arc::new(RecordingBackend::new().failing("tap"));
        let adapter = BackendAdapter::new(backend);
        let command = CommandFactory::default()
            .create(CommandKind::Tap, params(json!({"x": 1, "y": 2})))
            .with_error_handler(error_handler_fn(|error, context| {
                CommandResult::success(json!({
                    "recovered": error.to_string(),
                    "session": context.session_id.clone(),
                }))
            }));

        let result = adapter.execute(&command, Some("sim")).await;
        assert!(result.success);
        let data = result.data.unwrap();
        assert_eq!(data["session"], json!("sim"));
        assert!(data["recovered"].as_str().unwrap().contains("tap failed"));
    }

    #[tokio::test]
    async fn test_composite_kind_is_rejected_locally() {
        let backend = Arc::new(RecordingBackend::new());
        let adapter = BackendAdapter::new(backend.clone());
        let command = CommandFactory::default().create(CommandKind::Sequence, Params::new());

        let result = adapter.execute(&command, None).await;
        assert!(!result.success);
        assert!(result.error.unwrap().contains("Unsupported command kind"));
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_timeout_is_a_failure() {
        let backend = Arc::new(RecordingBackend::new().with_delay_ms(200));
        let adapter = BackendAdapter::new(backend);
        let command = CommandFactory::default()
            .create(CommandKind::ClearKeychain, Params::new())
            .with_timeout_ms(20);

        let result = adapter.execute(&command, Some("sim")).await;
        assert!(!result.success);
        assert!(result.error.unwrap().contains("timed out after 20ms"));
    }

    #[tokio::test]
    async fn test_screenshot_inlines_image() {
        let path = std::env::temp_dir().join(format!("sim-pilot-shot-{}.png", uuid::Uuid::new_v4()));
        std::fs::write(&path, b"png").unwrap();
        let path_str = path.to_string_lossy().to_string();

        let adapter = BackendAdapter::new(Arc::new(RecordingBackend::new()));
        let command = CommandFactory::default()
            .create(CommandKind::TakeScreenshot, params(json!({"outputPath": path_str})));
        let data = adapter.execute(&command, Some("sim")).await.data.unwrap();
        assert_eq!(data["path"], json!(path_str));
        assert_eq!(data["data"], json!("cG5n"));

        let _ = std::fs::remove_file(&path);
        let missing = CommandFactory::default()
            .create(CommandKind::TakeScreenshot, params(json!({"outputPath": path_str})));
        let data = adapter.execute(&missing, Some("sim")).await.data.unwrap();
        assert!(data.get("data").is_none());
    }

    #[tokio::test]
    async fn test_payload_shapes() {
        let backend = Arc::new(RecordingBackend::new().with_session("NEW-UDID"));
        let adapter = BackendAdapter::new(backend.clone());
        let factory = CommandFactory::default();

        let created = adapter
            .execute(&factory.create(CommandKind::CreateSession, params(json!({"autoboot": false}))), None)
            .await;
        assert_eq!(created.data, Some(json!("NEW-UDID")));

        let keys = adapter
            .execute(
                &factory.create(CommandKind::PressKeySequence, params(json!({"keySequence": ["4", "5"]}))),
                Some("sim"),
            )
            .await;
        assert!(keys.success);
        assert!(keys.data.is_none());

        let bad_keys = adapter
            .execute(
                &factory.create(CommandKind::PressKeySequence, params(json!({"keySequence": ["x"]}))),
                Some("sim"),
            )
            .await;
        assert!(!bad_keys.success);

        assert_eq!(
            backend.calls(),
            vec!["create_session None None false", "press_key_sequence sim [4, 5]"]
        );
    }
}
