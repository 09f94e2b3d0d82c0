use super::registry::CommandRegistry;
use super::types::{number_value, CommandInfo, ParseResult, ValidationResult};
use crate::error::PipelineError;
use log::debug;
use serde_json::Value;

/// Free-text parameters that are passed on exactly as typed.
const VERBATIM_PARAMS: &[&str] = &["text"];

/// Registry plus the validation and normalization contract applied to every
/// parse result before it is turned into a command.
pub struct InstructionParser {
    registry: CommandRegistry,
}

impl InstructionParser {
    pub fn new(registry: CommandRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    pub fn parse(&self, text: &str) -> Result<ParseResult, PipelineError> {
        self.registry.match_instruction(text)
    }

    pub fn validate(&self, result: &ParseResult) -> ValidationResult {
        let supported = self.registry.list_supported();
        let Some(info) = supported
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(&result.command))
        else {
            return ValidationResult::invalid(format!("Unrecognized command: {}", result.command));
        };

        let missing = missing_parameters(info, result);
        if !missing.is_empty() {
            return ValidationResult {
                is_valid: false,
                error_message: Some(format!("Missing required parameters: {}", missing.join(", "))),
                missing_parameters: Some(missing),
                ..Default::default()
            };
        }

        let invalid: Vec<String> = result
            .parameters
            .iter()
            .filter(|(_, value)| value.is_null())
            .map(|(name, _)| name.clone())
            .collect();
        if !invalid.is_empty() {
            return ValidationResult {
                is_valid: false,
                error_message: Some(format!("Invalid parameters: {}", invalid.join(", "))),
                invalid_parameters: Some(invalid),
                ..Default::default()
            };
        }

        ValidationResult::valid()
    }

    /// Coerce numeric-looking and `true`/`false` strings, except in
    /// [`VERBATIM_PARAMS`]. Idempotent.
    pub fn normalize(&self, mut result: ParseResult) -> ParseResult {
        for (_, value) in result.parameters.iter_mut().filter(|(name, _)| coercible(name)) {
            if let Value::String(text) = value {
                if let Some(number) = number_value(text) {
                    *value = number;
                }
            }
        }
        for (_, value) in result.parameters.iter_mut().filter(|(name, _)| coercible(name)) {
            if let Value::String(text) = value {
                if text.eq_ignore_ascii_case("true") {
                    *value = Value::Bool(true);
                } else if text.eq_ignore_ascii_case("false") {
                    *value = Value::Bool(false);
                }
            }
        }
        result
    }

    /// Parse, validate and normalize in one step.
    pub fn parse_and_validate(&self, text: &str) -> Result<ParseResult, PipelineError> {
        let parsed = self.parse(text)?;
        let validation = self.validate(&parsed);
        if !validation.is_valid {
            debug!("Instruction '{}' failed validation: {:?}", text, validation);
            return Err(PipelineError::Validation {
                message: validation
                    .error_message
                    .unwrap_or_else(|| "Invalid command".to_string()),
                missing: validation.missing_parameters.unwrap_or_default(),
                invalid: validation.invalid_parameters.unwrap_or_default(),
            });
        }
        Ok(self.normalize(parsed))
    }
}

impl Default for InstructionParser {
    fn default() -> Self {
        Self::new(CommandRegistry::default())
    }
}

fn coercible(name: &str) -> bool {
    !VERBATIM_PARAMS.contains(&name)
}

fn missing_parameters(info: &CommandInfo, result: &ParseResult) -> Vec<String> {
    info.required_parameters
        .iter()
        .filter(|name| !result.parameters.contains_key(name.as_str()))
        .cloned()
        .collect()
}
