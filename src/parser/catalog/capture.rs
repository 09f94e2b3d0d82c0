//! Screenshots, video and logs.

use super::BUNDLE_ID;
use crate::parser::types::CommandDefinition;

pub fn definitions() -> Vec<CommandDefinition> {
    let app_logs = format!(
        r"^(?:get|show|fetch|obtener|ver)\s+(?:the\s+|los\s+)?(?:app\s+)?(?:logs|registros)\s+(?:for|of|from|de)\s+(?:app\s+|la\s+aplicaci[oó]n\s+)?(?P<bundleId>{BUNDLE_ID})(?:\s+(?:last|[uú]ltimos)\s+(?P<limit>\d+))?$"
    );

    vec![
        CommandDefinition::new("take screenshot", "Capture a screenshot of the simulator screen")
            .patterns(&[
                r"^(?:take|capture|grab|tomar|toma|capturar|hacer|haz)\s+(?:a\s+|an?\s+|una\s+)?(?:screenshot|screen\s*shot|captura(?:\s+de\s+pantalla)?)(?:\s+(?:to|as|into|en|como)\s+(?P<outputPath>\S+))?$",
                r"^screenshot(?:\s+(?P<outputPath>\S+))?$",
            ])
            .optional(&["outputPath"])
            .examples(&["take screenshot", "take a screenshot to /tmp/home.png", "tomar captura de pantalla"])
            .capture("outputPath"),
        CommandDefinition::new("record video", "Start recording the simulator screen")
            .patterns(&[
                r"^(?:record|grabar|graba)\s+(?:a\s+|un\s+)?(?:video|screen|pantalla)(?:\s+(?:to|as|into|en)\s+(?P<outputPath>\S+))?$",
                r"^start\s+(?:video\s+|screen\s+)?recording(?:\s+(?:to|as|into)\s+(?P<outputPath>\S+))?$",
            ])
            .optional(&["outputPath"])
            .examples(&["record video", "start screen recording to /tmp/run.mp4", "grabar pantalla"])
            .capture("outputPath"),
        CommandDefinition::new("stop recording", "Stop the running screen recording")
            .patterns(&[
                r"^(?:stop|end|finish|detener|parar)\s+(?:the\s+|la\s+)?(?:video\s+|screen\s+)?(?:recording|grabaci[oó]n)$",
            ])
            .examples(&["stop recording", "stop the screen recording", "detener grabación"]),
        CommandDefinition::new("get app logs", "Fetch recent log lines emitted by one app")
            .patterns(&[app_logs.as_str()])
            .required(&["bundleId"])
            .optional(&["limit"])
            .examples(&["get logs for com.example.demo", "show app logs of com.example.demo last 50"])
            .capture("bundleId")
            .capture_number("limit"),
        CommandDefinition::new("get logs", "Fetch recent system log lines")
            .patterns(&[
                r"^(?:get|show|fetch|obtener|ver)\s+(?:the\s+|los\s+)?(?:system\s+|device\s+)?(?:logs|registros)(?:\s+(?:del\s+sistema))?(?:\s+(?:last|[uú]ltimos)\s+(?P<limit>\d+))?$",
            ])
            .optional(&["limit"])
            .examples(&["get logs", "show system logs last 100", "ver registros del sistema"])
            .capture_number("limit"),
    ]
}
