//! Natural-language command registry.
//!
//! Precedence is strictly positional: groups in registration order, then
//! definitions in declaration order, then patterns in declaration order. The
//! first pattern that matches wins.

use super::catalog::{self, CatalogGroup};
use super::types::{CommandDefinition, CommandInfo, ParseResult, Params};
use crate::error::PipelineError;
use log::debug;

const MAX_SUGGESTIONS: usize = 5;

/// Shown when the caller has typed nothing yet.
const DEFAULT_SUGGESTIONS: &[&str] = &[
    "create session",
    "list simulators",
    "launch app",
    "tap",
    "take screenshot",
];

pub struct CommandRegistry {
    groups: Vec<CatalogGroup>,
}

impl CommandRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self { groups: Vec::new() }
    }

    /// Register a group after every group already present.
    pub fn register(&mut self, group: CatalogGroup) {
        debug!(
            "Registering command group '{}' ({} definitions)",
            group.name,
            group.definitions.len()
        );
        self.groups.push(group);
    }

    pub fn groups(&self) -> &[CatalogGroup] {
        &self.groups
    }

    pub fn definitions(&self) -> impl Iterator<Item = &CommandDefinition> {
        self.groups.iter().flat_map(|g| g.definitions.iter())
    }

    /// Match free text against the catalog.
    pub fn match_instruction(&self, text: &str) -> Result<ParseResult, PipelineError> {
        let normalized = text.trim();

        for definition in self.definitions() {
            for pattern in &definition.patterns {
                let Some(caps) = pattern.captures(normalized) else {
                    continue;
                };

                let mut parameters = Params::new();
                for (param, extractor) in &definition.extractors {
                    if let Some(value) = extractor(&caps) {
                        parameters.insert(param.to_string(), value);
                    }
                }

                debug!(
                    "Matched '{}' as '{}' with {} parameter(s)",
                    normalized,
                    definition.name,
                    parameters.len()
                );

                return Ok(ParseResult {
                    command: definition.name.to_string(),
                    parameters,
                    confidence: 1.0,
                    original_text: text.to_string(),
                });
            }
        }

        Err(PipelineError::Unrecognized {
            text: text.to_string(),
        })
    }

    /// Every registered definition, flattened in match order.
    pub fn list_supported(&self) -> Vec<CommandInfo> {
        self.definitions().map(CommandDefinition::info).collect()
    }

    /// Completion candidates for a partially typed instruction.
    pub fn suggest(&self, partial: &str) -> Vec<String> {
        let needle = partial.trim().to_lowercase();
        if needle.is_empty() {
            return DEFAULT_SUGGESTIONS.iter().map(|s| s.to_string()).collect();
        }

        let mut suggestions: Vec<String> = Vec::new();
        for definition in self.definitions() {
            let candidates = std::iter::once(definition.name).chain(definition.examples.iter().copied());
            for candidate in candidates {
                if suggestions.len() >= MAX_SUGGESTIONS {
                    return suggestions;
                }
                if candidate.to_lowercase().contains(&needle)
                    && !suggestions.iter().any(|s| s == candidate)
                {
                    suggestions.push(candidate.to_string());
                }
            }
        }
        suggestions
    }
}

impl Default for CommandRegistry {
    /// A registry holding the full built-in catalog.
    fn default() -> Self {
        let mut registry = Self::new();
        for group in catalog::default_groups() {
            registry.register(group);
        }
        registry
    }
}
