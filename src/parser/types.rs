use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Parameter map carried by parse results and commands.
pub type Params = serde_json::Map<String, Value>;

/// Pulls one parameter value out of a successful pattern match.
/// Returning `None` leaves the parameter out of the result.
pub type Extractor = Box<dyn Fn(&Captures) -> Option<Value> + Send + Sync>;

/// A recognizable instruction family: name, patterns and how to read its
/// parameters out of a match.
pub struct CommandDefinition {
    pub name: &'static str,
    pub patterns: Vec<Regex>,
    pub description: &'static str,
    pub required_params: &'static [&'static str],
    pub optional_params: &'static [&'static str],
    pub examples: &'static [&'static str],
    pub extractors: Vec<(&'static str, Extractor)>,
}

impl CommandDefinition {
    pub fn new(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            patterns: Vec::new(),
            description,
            required_params: &[],
            optional_params: &[],
            examples: &[],
            extractors: Vec::new(),
        }
    }

    /// Append recognition patterns, tried in the order given.
    ///
    /// Patterns compile case-insensitively and run against the trimmed
    /// instruction, so captured values keep the caller's casing.
    pub fn patterns(mut self, sources: &[&str]) -> Self {
        for source in sources {
            let re = Regex::new(&format!("(?i){}", source))
                .unwrap_or_else(|e| panic!("invalid pattern for '{}': {}", self.name, e));
            self.patterns.push(re);
        }
        self
    }

    pub fn required(mut self, params: &'static [&'static str]) -> Self {
        self.required_params = params;
        self
    }

    pub fn optional(mut self, params: &'static [&'static str]) -> Self {
        self.optional_params = params;
        self
    }

    pub fn examples(mut self, examples: &'static [&'static str]) -> Self {
        self.examples = examples;
        self
    }

    /// Register a custom extractor for `param`.
    pub fn extract<F>(mut self, param: &'static str, extractor: F) -> Self
    where
        F: Fn(&Captures) -> Option<Value> + Send + Sync + 'static,
    {
        self.extractors.push((param, Box::new(extractor)));
        self
    }

    /// Read `param` from the named capture group of the same name, as text.
    pub fn capture(self, param: &'static str) -> Self {
        self.extract(param, move |caps| {
            caps.name(param)
                .map(|m| m.as_str().trim())
                .filter(|s| !s.is_empty())
                .map(|s| Value::String(s.to_string()))
        })
    }

    /// Read `param` from the named capture group of the same name, as a number.
    pub fn capture_number(self, param: &'static str) -> Self {
        self.extract(param, move |caps| {
            caps.name(param).and_then(|m| number_value(m.as_str()))
        })
    }

    /// Read `param` as a list split on commas and whitespace.
    pub fn capture_list(self, param: &'static str) -> Self {
        self.extract(param, move |caps| {
            let items: Vec<Value> = caps
                .name(param)?
                .as_str()
                .split(|c: char| c == ',' || c.is_whitespace())
                .filter(|s| !s.is_empty())
                .map(|s| Value::String(s.to_string()))
                .collect();
            if items.is_empty() {
                None
            } else {
                Some(Value::Array(items))
            }
        })
    }

    pub fn info(&self) -> CommandInfo {
        CommandInfo {
            name: self.name.to_string(),
            description: self.description.to_string(),
            required_parameters: self.required_params.iter().map(|s| s.to_string()).collect(),
            optional_parameters: self.optional_params.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl fmt::Debug for CommandDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandDefinition")
            .field("name", &self.name)
            .field("patterns", &self.patterns.len())
            .field("required_params", &self.required_params)
            .field("optional_params", &self.optional_params)
            .finish()
    }
}

/// Parse a textual number into a JSON number, keeping integers integral.
pub fn number_value(text: &str) -> Option<Value> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if let Ok(i) = text.parse::<i64>() {
        return Some(Value::from(i));
    }
    text.parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .and_then(serde_json::Number::from_f64)
        .map(Value::Number)
}

/// One row of the introspection catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CommandInfo {
    pub name: String,
    pub description: String,
    pub required_parameters: Vec<String>,
    pub optional_parameters: Vec<String>,
}

/// Structured output of matching an instruction against the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ParseResult {
    pub command: String,
    pub parameters: Params,
    /// Always 1.0 for a match; carries no ranking information.
    pub confidence: f64,
    pub original_text: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub is_valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub missing_parameters: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invalid_parameters: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl ValidationResult {
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            ..Default::default()
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            error_message: Some(message.into()),
            ..Default::default()
        }
    }
}
