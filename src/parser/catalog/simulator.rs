//! Simulator lifecycle: sessions, listing, boot and shutdown.

use crate::parser::types::CommandDefinition;
use serde_json::Value;

pub fn definitions() -> Vec<CommandDefinition> {
    vec![
        CommandDefinition::new(
            "create session",
            "Create a simulator session, booting the device unless told otherwise",
        )
        .patterns(&[
            r"^(?:create|start|open|new|crear|iniciar|abrir)\s+(?:a\s+|una\s+)?(?:new\s+|nueva\s+)?(?:simulator\s+)?(?:session|sesi[oó]n)(?:\s+(?:with|on|using|for|con|en|para)\s+(?P<deviceName>[^,]+?))?(?:\s+ios\s+(?P<platformVersion>\d+(?:\.\d+)*))?(?:,?\s+(?P<noboot>without\s+boot(?:ing)?|sin\s+arrancar))?$",
        ])
        .optional(&["deviceName", "platformVersion", "autoboot"])
        .examples(&[
            "create session",
            "create session with iPhone 15 Pro",
            "start a new session with iPhone 15 iOS 17.2 without boot",
            "crear sesión",
        ])
        .capture("deviceName")
        .capture("platformVersion")
        .extract("autoboot", |caps| {
            let autoboot = if caps.name("noboot").is_some() { "false" } else { "true" };
            Some(Value::String(autoboot.to_string()))
        }),
        CommandDefinition::new("terminate session", "Terminate the active simulator session")
            .patterns(&[
                r"^(?:terminate|end|close|stop|kill|terminar|cerrar|finalizar)\s+(?:the\s+|la\s+)?(?:current\s+|active\s+)?(?:simulator\s+)?(?:session|sesi[oó]n)(?:\s+(?P<sessionId>[\w-]+))?$",
            ])
            .optional(&["sessionId"])
            .examples(&["terminate session", "end the current session", "cerrar sesión"])
            .capture("sessionId"),
        CommandDefinition::new("list booted simulators", "List simulators that are currently booted")
            .patterns(&[
                r"^(?:list|show|get)\s+(?:all\s+)?(?:the\s+)?(?:booted|running|active)\s+(?:simulators|devices)$",
                r"^listar\s+simuladores\s+(?:arrancados|activos)$",
            ])
            .examples(&["list booted simulators", "show running devices", "listar simuladores activos"]),
        CommandDefinition::new("list simulators", "List every available simulator")
            .patterns(&[
                r"^(?:list|show|get)\s+(?:all\s+)?(?:the\s+)?(?:available\s+)?(?:simulators|devices)$",
                r"^listar\s+(?:los\s+)?simuladores$",
            ])
            .examples(&["list simulators", "show all available devices", "listar simuladores"]),
        CommandDefinition::new("boot simulator", "Boot a simulator by UDID")
            .patterns(&[
                r"^(?:boot|arrancar|arranca)\s+(?:the\s+|el\s+)?(?:simulator|device|simulador)\s+(?P<udid>[\w-]+)$",
            ])
            .required(&["udid"])
            .examples(&[
                "boot simulator 5A3F1C2D-1234-4ABC-9DEF-0123456789AB",
                "arrancar simulador 5A3F1C2D-1234-4ABC-9DEF-0123456789AB",
            ])
            .capture("udid"),
        CommandDefinition::new("shutdown simulator", "Shut down a simulator by UDID")
            .patterns(&[
                r"^(?:shut\s*down|stop|apagar|apaga|detener)\s+(?:the\s+|el\s+)?(?:simulator|device|simulador)\s+(?P<udid>[\w-]+)$",
            ])
            .required(&["udid"])
            .examples(&[
                "shutdown simulator 5A3F1C2D-1234-4ABC-9DEF-0123456789AB",
                "apagar simulador 5A3F1C2D-1234-4ABC-9DEF-0123456789AB",
            ])
            .capture("udid"),
    ]
}
