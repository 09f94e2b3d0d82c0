use super::command::{CommandRecord, CommandResult};
use log::warn;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

/// Orchestrator lifecycle events
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum OrchestratorEvent {
    #[serde(rename_all = "camelCase")]
    SessionCreated { session_id: String },
    #[serde(rename_all = "camelCase")]
    SessionTerminated { session_id: Option<String> },
    #[serde(rename_all = "camelCase")]
    SessionActivated { session_id: String },
    #[serde(rename_all = "camelCase")]
    SessionDeactivated { previous_session_id: Option<String> },
    CommandExecuted {
        command: CommandRecord,
        result: CommandResult,
    },
}

/// Names listeners subscribe under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventName {
    SessionCreated,
    SessionTerminated,
    SessionActivated,
    SessionDeactivated,
    CommandExecuted,
}

impl EventName {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventName::SessionCreated => "sessionCreated",
            EventName::SessionTerminated => "sessionTerminated",
            EventName::SessionActivated => "sessionActivated",
            EventName::SessionDeactivated => "sessionDeactivated",
            EventName::CommandExecuted => "commandExecuted",
        }
    }
}

impl OrchestratorEvent {
    pub fn name(&self) -> EventName {
        match self {
            OrchestratorEvent::SessionCreated { .. } => EventName::SessionCreated,
            OrchestratorEvent::SessionTerminated { .. } => EventName::SessionTerminated,
            OrchestratorEvent::SessionActivated { .. } => EventName::SessionActivated,
            OrchestratorEvent::SessionDeactivated { .. } => EventName::SessionDeactivated,
            OrchestratorEvent::CommandExecuted { .. } => EventName::CommandExecuted,
        }
    }

    /// Event body without the tag, as handed to JSON consumers
    pub fn payload(&self) -> Value {
        let mut value = serde_json::to_value(self).unwrap_or(Value::Null);
        if let Value::Object(map) = &mut value {
            map.remove("event");
        }
        value
    }
}

pub type Listener = Arc<dyn Fn(&OrchestratorEvent) -> anyhow::Result<()> + Send + Sync>;

/// Handle returned by [`EventFeed::on`], used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Named listeners plus a broadcast stream of the same events.
///
/// Listeners run synchronously in registration order. A listener that
/// returns an error or panics is logged and skipped.
pub struct EventFeed {
    listeners: Mutex<HashMap<EventName, Vec<(ListenerId, Listener)>>>,
    next_id: AtomicU64,
    sender: broadcast::Sender<OrchestratorEvent>,
}

impl EventFeed {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(100);
        Self {
            listeners: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            sender,
        }
    }

    pub fn on<F>(&self, name: EventName, listener: F) -> ListenerId
    where
        F: Fn(&OrchestratorEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock()
            .entry(name)
            .or_default()
            .push((id, Arc::new(listener)));
        id
    }

    /// Returns false if the listener was not registered under `name`.
    pub fn off(&self, name: EventName, id: ListenerId) -> bool {
        let mut listeners = self.lock();
        let Some(list) = listeners.get_mut(&name) else {
            return false;
        };
        let before = list.len();
        list.retain(|(listener_id, _)| *listener_id != id);
        before != list.len()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn listener_count(&self, name: EventName) -> usize {
        self.lock().get(&name).map_or(0, Vec::len)
    }

    /// Stream of every emitted event
    pub fn subscribe(&self) -> broadcast::Receiver<OrchestratorEvent> {
        self.sender.subscribe()
    }

    pub fn emit(&self, event: OrchestratorEvent) {
        let name = event.name();
        // Snapshot so listeners may subscribe or unsubscribe while running.
        let listeners: Vec<Listener> = self
            .lock()
            .get(&name)
            .map(|list| list.iter().map(|(_, l)| l.clone()).collect())
            .unwrap_or_default();

        for listener in listeners {
            match panic::catch_unwind(AssertUnwindSafe(|| listener(&event))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!("Listener for '{}' failed: {}", name.as_str(), e),
                Err(_) => warn!("Listener for '{}' panicked", name.as_str()),
            }
        }

        let _ = self.sender.send(event);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<EventName, Vec<(ListenerId, Listener)>>> {
        self.listeners
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for EventFeed {
    fn default() -> Self {
        Self::new()
    }
}

/// Console event listener for printing real-time updates
pub struct ConsoleEventListener;

impl ConsoleEventListener {
    pub async fn listen(mut receiver: broadcast::Receiver<OrchestratorEvent>) {
        use colored::Colorize;

        loop {
            let event = match receiver.recv().await {
                Ok(event) => event,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Console listener skipped {} events", skipped);
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            };

            match event {
                OrchestratorEvent::SessionCreated { session_id } => {
                    println!("{} Session created: {}", "▶".green().bold(), session_id.cyan());
                }
                OrchestratorEvent::SessionTerminated { session_id } => {
                    println!(
                        "{} Session terminated: {}",
                        "■".blue().bold(),
                        session_id.unwrap_or_else(|| "-".to_string()).cyan()
                    );
                }
                OrchestratorEvent::SessionActivated { session_id } => {
                    println!("{} Active session: {}", "→".blue(), session_id.cyan());
                }
                OrchestratorEvent::SessionDeactivated { previous_session_id } => {
                    println!(
                        "{} Session released: {}",
                        "←".blue(),
                        previous_session_id.unwrap_or_else(|| "-".to_string())
                    );
                }
                OrchestratorEvent::CommandExecuted { command, result } => {
                    if result.success {
                        println!("    {} {}", "✓".green(), command.kind.to_string().dimmed());
                    } else {
                        println!(
                            "    {} {} {}",
                            "✗".red(),
                            command.kind.to_string().dimmed(),
                            result.error.unwrap_or_default().red()
                        );
                    }
                }
            }
        }
    }
}
