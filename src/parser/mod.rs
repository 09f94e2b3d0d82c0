pub mod catalog;
pub mod instruction;
pub mod registry;
pub mod types;

pub use instruction::InstructionParser;
pub use registry::CommandRegistry;
pub use types::{CommandDefinition, CommandInfo, ParseResult, Params, ValidationResult};
