//! Static command catalog.
//!
//! Groups are registered in the order returned by [`default_groups`], and
//! each group lists its definitions in match order. The registry stops at the
//! first pattern that matches, so a definition whose patterns could swallow a
//! more specific phrasing must come after it.

pub mod accessibility;
pub mod app;
pub mod capture;
pub mod debug;
pub mod misc;
pub mod simulator;
pub mod ui;

use super::types::CommandDefinition;

/// A named domain of command definitions.
#[derive(Debug)]
pub struct CatalogGroup {
    pub name: &'static str,
    pub definitions: Vec<CommandDefinition>,
}

impl CatalogGroup {
    pub fn new(name: &'static str, definitions: Vec<CommandDefinition>) -> Self {
        Self { name, definitions }
    }
}

/// Every built-in group, in registration order.
pub fn default_groups() -> Vec<CatalogGroup> {
    vec![
        CatalogGroup::new("simulator", simulator::definitions()),
        CatalogGroup::new("app", app::definitions()),
        CatalogGroup::new("ui", ui::definitions()),
        CatalogGroup::new("accessibility", accessibility::definitions()),
        CatalogGroup::new("capture", capture::definitions()),
        CatalogGroup::new("debug", debug::definitions()),
        CatalogGroup::new("misc", misc::definitions()),
    ]
}

/// Shared pattern fragments.
pub(crate) const NUMBER: &str = r"-?\d+(?:\.\d+)?";
pub(crate) const BUNDLE_ID: &str = r"[\w.-]+";
