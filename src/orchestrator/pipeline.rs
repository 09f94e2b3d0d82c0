//! Text in, result envelope out.

use log::{debug, info};
use serde_json::json;
use std::sync::Arc;

use super::command::{CommandFactory, CommandResult};
use super::executor::Orchestrator;
use super::translator::CommandTranslator;
use crate::driver::SimulatorBackend;
use crate::error::PipelineError;
use crate::parser::InstructionParser;
use crate::utils::config::Config;

/// Parser, translator and orchestrator wired together
pub struct InstructionPipeline {
    parser: InstructionParser,
    translator: CommandTranslator,
    orchestrator: Orchestrator,
}

impl InstructionPipeline {
    pub fn new(backend: Arc<dyn SimulatorBackend>, config: Config) -> Self {
        Self {
            parser: InstructionParser::default(),
            translator: CommandTranslator::new(CommandFactory::from_config(&config)),
            orchestrator: Orchestrator::new(backend, config),
        }
    }

    pub fn parser(&self) -> &InstructionParser {
        &self.parser
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    /// Run one natural-language instruction. Recognition, validation and
    /// mapping failures are reported before anything reaches the backend.
    pub async fn process(&self, text: &str) -> CommandResult {
        info!("Instruction: {}", text);

        let parsed = match self.parser.parse_and_validate(text) {
            Ok(parsed) => parsed,
            Err(e) => return self.rejected(text, e),
        };
        debug!("Parsed '{}' as {} {:?}", text, parsed.command, parsed.parameters);

        let command = match self.translator.to_command(&parsed) {
            Ok(command) => command,
            Err(e) => return self.rejected(text, e),
        };

        self.orchestrator.execute(&command).await
    }

    fn rejected(&self, text: &str, error: PipelineError) -> CommandResult {
        debug!("Rejected '{}': {}", text, error);
        let result = CommandResult::failure(error.to_string());
        match error {
            PipelineError::Unrecognized { .. } => result.with_data(json!({
                "suggestions": self.parser.registry().suggest(text),
            })),
            PipelineError::Validation { missing, invalid, .. } => result.with_data(json!({
                "missingParameters": missing,
                "invalidParameters": invalid,
            })),
            _ => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::testing::RecordingBackend;
    use serde_json::Value;

    fn pipeline(backend: RecordingBackend) -> (Arc<RecordingBackend>, InstructionPipeline) {
        let backend = Arc::new(backend);
        (backend.clone(), InstructionPipeline::new(backend, Config::default()))
    }

    #[tokio::test]
    async fn test_spanish_tap_reaches_backend_once() {
        let (backend, pipeline) = pipeline(RecordingBackend::new());

        let result = pipeline.process("tap en 100, 200").await;

        assert!(result.success, "{:?}", result.error);
        assert_eq!(backend.calls(), vec!["tap  100 200"]);
        let history = pipeline.orchestrator().get_command_history(None);
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].command.parameters["x"], json!(100));
        assert_eq!(history[0].command.parameters["y"], json!(200));
    }

    #[tokio::test]
    async fn test_unrecognized_instruction_never_reaches_backend() {
        let (backend, pipeline) = pipeline(RecordingBackend::new());

        let result = pipeline.process("invalid command here").await;

        assert!(!result.success);
        assert!(result.error.unwrap().contains("Unrecognized instruction"));
        assert!(result.data.unwrap()["suggestions"].is_array());
        assert!(backend.calls().is_empty());
        assert!(pipeline.orchestrator().get_command_history(None).is_empty());
    }

    #[tokio::test]
    async fn test_session_flows_into_later_instructions() {
        let (backend, pipeline) = pipeline(RecordingBackend::new().with_session("UDID-7"));

        assert!(pipeline.process("create session").await.success);
        assert!(pipeline.process("launch app com.example.Demo").await.success);

        assert_eq!(
            backend.calls(),
            vec!["create_session None None true", "launch_app UDID-7 com.example.Demo"]
        );
        assert_eq!(
            pipeline.orchestrator().get_active_session_id().as_deref(),
            Some("UDID-7")
        );
    }

    /// Every catalog example and the single backend call it must produce,
    /// with "SIM" as the active session.
    fn example_calls() -> Vec<(&'static str, &'static str)> {
        vec![
            ("create session", "create_session None None true"),
            ("create session with iPhone 15 Pro", r#"create_session Some("iPhone 15 Pro") None true"#),
            (
                "start a new session with iPhone 15 iOS 17.2 without boot",
                r#"create_session Some("iPhone 15") Some("17.2") false"#,
            ),
            ("crear sesión", "create_session None None true"),
            ("terminate session", "terminate_session SIM"),
            ("end the current session", "terminate_session SIM"),
            ("cerrar sesión", "terminate_session SIM"),
            ("list booted simulators", "list_simulators"),
            ("show running devices", "list_simulators"),
            ("listar simuladores activos", "list_simulators"),
            ("list simulators", "list_simulators"),
            ("show all available devices", "list_simulators"),
            ("listar simuladores", "list_simulators"),
            (
                "boot simulator 5A3F1C2D-1234-4ABC-9DEF-0123456789AB",
                "boot_simulator 5A3F1C2D-1234-4ABC-9DEF-0123456789AB",
            ),
            (
                "arrancar simulador 5A3F1C2D-1234-4ABC-9DEF-0123456789AB",
                "boot_simulator 5A3F1C2D-1234-4ABC-9DEF-0123456789AB",
            ),
            (
                "shutdown simulator 5A3F1C2D-1234-4ABC-9DEF-0123456789AB",
                "shutdown_simulator 5A3F1C2D-1234-4ABC-9DEF-0123456789AB",
            ),
            (
                "apagar simulador 5A3F1C2D-1234-4ABC-9DEF-0123456789AB",
                "shutdown_simulator 5A3F1C2D-1234-4ABC-9DEF-0123456789AB",
            ),
            ("install app /tmp/Demo.app", "install_app SIM /tmp/Demo.app"),
            ("instalar aplicación ~/Builds/Demo.ipa", "install_app SIM ~/Builds/Demo.ipa"),
            ("launch app com.apple.MobileSafari", "launch_app SIM com.apple.MobileSafari"),
            ("abrir aplicación com.apple.Maps", "launch_app SIM com.apple.Maps"),
            ("terminate app com.apple.MobileSafari", "terminate_app SIM com.apple.MobileSafari"),
            ("cerrar aplicación com.apple.Maps", "terminate_app SIM com.apple.Maps"),
            ("uninstall app com.example.demo", "uninstall_app SIM com.example.demo"),
            ("desinstalar aplicación com.example.demo", "uninstall_app SIM com.example.demo"),
            ("list apps", "list_apps SIM"),
            ("show installed applications", "list_apps SIM"),
            ("listar aplicaciones", "list_apps SIM"),
            ("is app com.example.demo installed?", "list_apps SIM"),
            ("check if com.example.demo is installed", "list_apps SIM"),
            ("tap en 100, 200", "tap SIM 100 200"),
            ("tap at 50 75", "tap SIM 50 75"),
            ("toca en (120, 640) durante 2 segundos", "tap SIM 120 640 for 2"),
            ("swipe from 100, 600 to 100, 200", "swipe SIM 100 600 100 200"),
            ("swipe from (10, 20) to (300, 20) in 0.5 seconds", "swipe SIM 10 20 300 20 for 0.5"),
            ("desliza desde 200, 700 hasta 200, 100", "swipe SIM 200 700 200 100"),
            ("press home button", "press_button SIM HOME"),
            ("press the lock button for 3 seconds", "press_button SIM LOCK for 3"),
            ("pulsa el botón home", "press_button SIM HOME"),
            ("press key sequence 11 8 15 15 18", "press_key_sequence SIM [11, 8, 15, 15, 18]"),
            ("send keys 4, 5, 6", "press_key_sequence SIM [4, 5, 6]"),
            ("press key 40", "press_key SIM 40"),
            ("pulsa la tecla 42", "press_key SIM 42"),
            ("type \"hello world\"", "input_text SIM hello world"),
            ("input text user@example.com", "input_text SIM user@example.com"),
            ("escribe hola", "input_text SIM hola"),
            ("describe all elements", "describe_all SIM"),
            ("dump the accessibility tree", "describe_all SIM"),
            ("describir todos los elementos", "describe_all SIM"),
            ("describe point 100, 200", "describe_point SIM 100 200"),
            ("what is at 50, 60?", "describe_point SIM 50 60"),
            ("describir elemento en 10 20", "describe_point SIM 10 20"),
            ("take screenshot", "take_screenshot SIM screenshot.png"),
            ("take a screenshot to /tmp/home.png", "take_screenshot SIM /tmp/home.png"),
            ("tomar captura de pantalla", "take_screenshot SIM screenshot.png"),
            ("record video", "start_recording SIM None"),
            ("start screen recording to /tmp/run.mp4", r#"start_recording SIM Some("/tmp/run.mp4")"#),
            ("grabar pantalla", "start_recording SIM None"),
            ("stop recording", "stop_recording SIM"),
            ("stop the screen recording", "stop_recording SIM"),
            ("detener grabación", "stop_recording SIM"),
            ("get logs for com.example.demo", r#"get_logs SIM Some("com.example.demo") None"#),
            (
                "show app logs of com.example.demo last 50",
                r#"get_logs SIM Some("com.example.demo") Some(50)"#,
            ),
            ("get logs", "get_logs SIM None None"),
            ("show system logs last 100", "get_logs SIM None Some(100)"),
            ("ver registros del sistema", "get_logs SIM None None"),
            ("stop debug", "stop_debug SIM"),
            ("stop the debugger", "stop_debug SIM"),
            ("detener depuración", "stop_debug SIM"),
            ("debug status", "debug_status SIM"),
            ("check the debugger status", "debug_status SIM"),
            ("estado de la depuración", "debug_status SIM"),
            ("start debug session for com.example.demo", "start_debug SIM com.example.demo None"),
            ("start debugging com.example.demo on port 1234", "start_debug SIM com.example.demo Some(1234)"),
            ("debug app com.example.demo", "start_debug SIM com.example.demo None"),
            ("list crash logs", "list_crash_logs SIM None"),
            ("show crashes for com.example.demo", r#"list_crash_logs SIM Some("com.example.demo")"#),
            (
                "show crash log Demo-2024-05-01-101010.ips",
                "get_crash_log SIM Demo-2024-05-01-101010.ips",
            ),
            ("delete all crash logs", "delete_crash_logs SIM None"),
            (
                "delete crash log Demo-2024-05-01-101010.ips",
                r#"delete_crash_logs SIM Some("Demo-2024-05-01-101010.ips")"#,
            ),
            ("borrar registros de fallos", "delete_crash_logs SIM None"),
            ("install dylib /tmp/libInspector.dylib", "install_dylib SIM /tmp/libInspector.dylib"),
            ("open url https://example.com", "open_url SIM https://example.com"),
            ("go to myapp://settings/profile", "open_url SIM myapp://settings/profile"),
            ("abrir enlace https://example.com", "open_url SIM https://example.com"),
            ("clear keychain", "clear_keychain SIM"),
            ("reset the keychain", "clear_keychain SIM"),
            ("limpiar llavero", "clear_keychain SIM"),
            ("set location to 40.4168, -3.7038", "set_location SIM 40.4168 -3.7038"),
            ("establecer ubicación en 10.76, 106.66", "set_location SIM 10.76 106.66"),
            ("add media /tmp/a.png /tmp/b.mov", r#"add_media SIM ["/tmp/a.png", "/tmp/b.mov"]"#),
            ("add photos /tmp/cat.jpg, /tmp/dog.jpg", r#"add_media SIM ["/tmp/cat.jpg", "/tmp/dog.jpg"]"#),
            (
                "approve permissions photos, camera for com.example.demo",
                r#"approve_permissions SIM com.example.demo ["photos", "camera"]"#,
            ),
            (
                "grant permission location to com.example.demo",
                r#"approve_permissions SIM com.example.demo ["location"]"#,
            ),
            ("update contacts from /tmp/contacts.sqlite", "update_contacts SIM /tmp/contacts.sqlite"),
        ]
    }

    #[test]
    fn test_call_table_covers_every_catalog_example() {
        let table = example_calls();
        let registry = crate::parser::CommandRegistry::default();
        for definition in registry.definitions() {
            for example in definition.examples {
                assert!(
                    table.iter().any(|(text, _)| text == example),
                    "no expected call for '{}'",
                    example
                );
            }
        }
    }

    #[tokio::test]
    async fn test_every_example_reaches_backend_with_its_arguments() {
        for (instruction, expected) in example_calls() {
            let (backend, pipeline) = pipeline(RecordingBackend::new());
            pipeline
                .orchestrator()
                .set_active_session_id(Some("SIM".to_string()));

            let result = pipeline.process(instruction).await;

            assert!(result.success, "'{}' failed: {:?}", instruction, result.error);
            assert_eq!(backend.calls(), vec![expected], "'{}'", instruction);
        }
    }

    #[tokio::test]
    async fn test_installed_check_reports_bundle() {
        let (_, pipeline) = pipeline(RecordingBackend::new());

        let result = pipeline.process("is app com.example.demo installed?").await;
        assert_eq!(
            result.data,
            Some(json!({"bundleId": "com.example.demo", "installed": true}))
        );

        let result = pipeline.process("check if com.other.app is installed").await;
        assert_eq!(
            result.data,
            Some(json!({"bundleId": "com.other.app", "installed": false}))
        );
    }

    #[tokio::test]
    async fn test_typed_digits_stay_text() {
        let (backend, pipeline) = pipeline(RecordingBackend::new());

        assert!(pipeline.process("type 007").await.success);

        assert_eq!(backend.calls(), vec!["input_text  007"]);
    }

    #[tokio::test]
    async fn test_backend_failure_is_a_failed_result() {
        let (_, pipeline) = pipeline(RecordingBackend::new().failing("input_text"));

        let result = pipeline.process("type \"hello\"").await;

        assert!(!result.success);
        assert_eq!(result.data, None::<Value>);
        assert!(result.error.unwrap().contains("input_text failed"));
    }
}
