pub mod command;
pub mod events;
pub mod executor;
pub mod history;
pub mod pipeline;
pub mod translator;

pub use command::{CommandFactory, CommandKind, CommandResult, OrchestratorCommand};
pub use events::{ConsoleEventListener, EventFeed, EventName, OrchestratorEvent};
pub use executor::Orchestrator;
pub use history::{CommandHistory, HistoryEntry};
pub use pipeline::InstructionPipeline;
pub use translator::CommandTranslator;
