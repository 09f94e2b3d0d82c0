pub mod driver;
pub mod error;
pub mod orchestrator;
pub mod parser;
pub mod server;
pub mod shell;
pub mod utils;

// Re-export common items
pub use driver::{BackendAdapter, SimulatorBackend};
pub use error::PipelineError;
pub use orchestrator::{InstructionPipeline, Orchestrator};
pub use parser::{CommandRegistry, InstructionParser};
pub use utils::config::Config;
