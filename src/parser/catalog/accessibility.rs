//! Accessibility inspection of what is on screen.

use super::NUMBER;
use crate::parser::types::CommandDefinition;

pub fn definitions() -> Vec<CommandDefinition> {
    let point = format!(
        r"^(?:describe|inspect|what\s+is|describir)\s+(?:the\s+|el\s+)?(?:element\s+|point\s+|elemento\s+|punto\s+)?(?:at\s+|en\s+)?\(?\s*(?P<x>{NUMBER})(?:\s*,\s*|\s+)(?P<y>{NUMBER})\s*\)?\??$"
    );

    vec![
        CommandDefinition::new("describe all elements", "Describe every accessibility element on screen")
            .patterns(&[
                r"^(?:describe|list|show|get|dump|describir)\s+(?:all\s+|todos\s+los\s+)?(?:the\s+)?(?:ui\s+|screen\s+|accessibility\s+)?(?:elements|elementos|ui|screen|accessibility\s+tree)$",
            ])
            .examples(&["describe all elements", "dump the accessibility tree", "describir todos los elementos"]),
        CommandDefinition::new("describe point", "Describe the accessibility element at x, y")
            .patterns(&[point.as_str()])
            .required(&["x", "y"])
            .examples(&["describe point 100, 200", "what is at 50, 60?", "describir elemento en 10 20"])
            .capture_number("x")
            .capture_number("y"),
    ]
}
