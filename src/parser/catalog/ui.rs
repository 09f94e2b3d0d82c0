//! UI interaction: touches, gestures, hardware buttons and keyboard.

use super::NUMBER;
use crate::parser::types::CommandDefinition;
use serde_json::Value;

pub fn definitions() -> Vec<CommandDefinition> {
    let tap = format!(
        r"^(?:tap|click|touch|toca|tocar|pulsa|pulsar)\s+(?:en\s+|at\s+|on\s+)?\(?\s*(?P<x>{NUMBER})(?:\s*,\s*|\s+)(?P<y>{NUMBER})\s*\)?(?:\s+(?:for|durante)\s+(?P<duration>{NUMBER})\s*(?:s|sec|seconds|segundos)?)?$"
    );
    let swipe = format!(
        r"^(?:swipe|drag|desliza|deslizar)\s+(?:from\s+|desde\s+)?\(?\s*(?P<startX>{NUMBER})\s*,\s*(?P<startY>{NUMBER})\s*\)?\s+(?:to|hasta|a)\s+\(?\s*(?P<endX>{NUMBER})\s*,\s*(?P<endY>{NUMBER})\s*\)?(?:\s+(?:in|over|for|en|durante)\s+(?P<duration>{NUMBER})\s*(?:s|sec|seconds|segundos)?)?(?:\s+(?:with\s+)?delta\s+(?P<delta>\d+))?$"
    );

    vec![
        CommandDefinition::new("tap", "Tap the screen at x, y")
            .patterns(&[tap.as_str()])
            .required(&["x", "y"])
            .optional(&["duration"])
            .examples(&["tap en 100, 200", "tap at 50 75", "toca en (120, 640) durante 2 segundos"])
            .capture_number("x")
            .capture_number("y")
            .capture_number("duration"),
        CommandDefinition::new("swipe", "Swipe from one point to another")
            .patterns(&[swipe.as_str()])
            .required(&["startX", "startY", "endX", "endY"])
            .optional(&["duration", "delta"])
            .examples(&[
                "swipe from 100, 600 to 100, 200",
                "swipe from (10, 20) to (300, 20) in 0.5 seconds",
                "desliza desde 200, 700 hasta 200, 100",
            ])
            .capture_number("startX")
            .capture_number("startY")
            .capture_number("endX")
            .capture_number("endY")
            .capture_number("duration")
            .capture_number("delta"),
        CommandDefinition::new("press button", "Press a hardware button (HOME, LOCK, SIDE_BUTTON, SIRI, APPLE_PAY)")
            .patterns(&[
                r"^(?:press|push|pulsa|pulsar|presiona|presionar)\s+(?:the\s+|el\s+)?(?:button\s+|bot[oó]n\s+)?(?P<button>home|lock|side[_\s]button|siri|apple[_\s]pay)(?:\s+button)?(?:\s+(?:for|durante)\s+(?P<duration>\d+(?:\.\d+)?)\s*(?:s|sec|seconds|segundos)?)?$",
            ])
            .required(&["button"])
            .optional(&["duration"])
            .examples(&["press home button", "press the lock button for 3 seconds", "pulsa el botón home"])
            .extract("button", |caps| {
                caps.name("button").map(|m| {
                    Value::String(m.as_str().to_uppercase().replace(char::is_whitespace, "_"))
                })
            })
            .capture_number("duration"),
        CommandDefinition::new("press key sequence", "Press a sequence of HID key codes")
            .patterns(&[
                r"^(?:press|send|pulsa|pulsar)\s+(?:the\s+)?(?:key\s+sequence|keys|secuencia\s+de\s+teclas|teclas)\s+(?P<keySequence>\d+(?:[\s,]+\d+)+)$",
            ])
            .required(&["keySequence"])
            .examples(&["press key sequence 11 8 15 15 18", "send keys 4, 5, 6"])
            .capture_list("keySequence"),
        CommandDefinition::new("press key", "Press a single HID key code")
            .patterns(&[
                r"^(?:press|send|pulsa|pulsar)\s+(?:the\s+|la\s+)?(?:key|keycode|tecla)\s+(?P<keyCode>\d+)(?:\s+(?:for|durante)\s+(?P<duration>\d+(?:\.\d+)?)\s*(?:s|sec|seconds|segundos)?)?$",
            ])
            .required(&["keyCode"])
            .optional(&["duration"])
            .examples(&["press key 40", "pulsa la tecla 42"])
            .capture_number("keyCode")
            .capture_number("duration"),
        CommandDefinition::new("input text", "Type text into the focused field")
            .patterns(&[
                r#"^(?:type|input|enter|write|escribe|escribir)\s+(?:text\s+|texto\s+)?["'](?P<text>.*)["']$"#,
                r"^(?:type|input|enter|write|escribe|escribir)\s+(?:text\s+|texto\s+)?(?P<text>.+)$",
            ])
            .required(&["text"])
            .examples(&["type \"hello world\"", "input text user@example.com", "escribe hola"])
            .capture("text"),
    ]
}
