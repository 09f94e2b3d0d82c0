//! Debug server control and crash reports.

use super::BUNDLE_ID;
use crate::parser::types::CommandDefinition;
use serde_json::Value;

pub fn definitions() -> Vec<CommandDefinition> {
    let start_debug = format!(
        r"^(?:start|begin|iniciar)\s+(?:a\s+)?(?:debug|debugging|debugger|depuraci[oó]n)(?:\s+session)?(?:\s+(?:for|of|on|de|para))?\s+(?:app\s+)?(?P<bundleId>{BUNDLE_ID})(?:\s+(?:on\s+)?port\s+(?P<port>\d+))?$"
    );
    let debug_app = format!(r"^debug\s+(?:the\s+)?(?:app\s+)?(?P<bundleId>{BUNDLE_ID})$");
    let list_crashes = format!(
        r"^(?:list|show|get)\s+(?:all\s+)?(?:the\s+)?crash(?:es|\s+logs|\s+reports)(?:\s+(?:for|of)\s+(?:app\s+)?(?P<bundleId>{BUNDLE_ID}))?$"
    );

    vec![
        CommandDefinition::new("stop debug", "Stop the running debug server")
            .patterns(&[
                r"^(?:stop|end|detener|terminar)\s+(?:the\s+|la\s+)?(?:debug|debugging|debugger|depuraci[oó]n)(?:\s+session)?$",
            ])
            .examples(&["stop debug", "stop the debugger", "detener depuración"]),
        CommandDefinition::new("debug status", "Report whether a debug server is running")
            .patterns(&[
                r"^(?:debug|debugger|debugging)\s+status$",
                r"^(?:get|show|check)\s+(?:the\s+)?(?:debug|debugger)\s+status$",
                r"^estado\s+(?:de\s+)?(?:la\s+)?depuraci[oó]n$",
            ])
            .examples(&["debug status", "check the debugger status", "estado de la depuración"]),
        // Comes after "debug status": the bare `debug <app>` form would read
        // "status" as a bundle id.
        CommandDefinition::new("start debug", "Start a debug server for an app")
            .patterns(&[start_debug.as_str(), debug_app.as_str()])
            .required(&["bundleId"])
            .optional(&["port"])
            .examples(&[
                "start debug session for com.example.demo",
                "start debugging com.example.demo on port 1234",
                "debug app com.example.demo",
            ])
            .capture("bundleId")
            .capture_number("port"),
        CommandDefinition::new("list crash logs", "List crash reports on the simulator")
            .patterns(&[list_crashes.as_str()])
            .optional(&["bundleId"])
            .examples(&["list crash logs", "show crashes for com.example.demo"])
            .capture("bundleId"),
        CommandDefinition::new("show crash log", "Show the contents of one crash report")
            .patterns(&[r"^(?:show|get|read|open|view)\s+(?:the\s+)?crash\s+(?:log|report)\s+(?P<name>\S+)$"])
            .required(&["name"])
            .examples(&["show crash log Demo-2024-05-01-101010.ips"])
            .capture("name"),
        CommandDefinition::new("delete crash logs", "Delete one crash report, or all of them")
            .patterns(&[
                r"^(?:delete|remove|clear|borrar|eliminar)\s+(?:all\s+)?(?:the\s+)?crash(?:es|\s+logs?|\s+reports?)(?:\s+(?P<name>\S+))?$",
                r"^(?:borrar|eliminar)\s+(?:los\s+)?registros\s+de\s+(?:fallos|errores)$",
            ])
            .optional(&["name", "all"])
            .examples(&[
                "delete all crash logs",
                "delete crash log Demo-2024-05-01-101010.ips",
                "borrar registros de fallos",
            ])
            .capture("name")
            .extract("all", |caps| {
                if caps.name("name").is_none() {
                    Some(Value::Bool(true))
                } else {
                    None
                }
            }),
    ]
}
