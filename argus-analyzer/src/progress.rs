//! Progress reporting
//!
//! A dedicated worker thread receives frame updates over a channel and
//! renders them. The logger is strictly decoupled from the analysis:
//! disabling it changes nothing but the output.

use std::sync::mpsc;
use std::thread::JoinHandle;

use tracing::{
    debug,
    info,
};

use argus_ar::BasicBlockId;

use crate::call_context::CallContextRef;

/// How progress is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProgressMode {
    /// No progress output.
    None,
    /// One line per event.
    Linear,
    /// A refreshed frame stack.
    Interactive,
    /// Pick a mode based on the environment.
    #[default]
    Auto,
}

#[derive(Debug)]
enum ProgressEvent {
    EnterFunction { name: String, context: String },
    LeaveFunction { name: String },
    CycleWidening { function: u32, head: u32 },
    Shutdown,
}

/// Cheap handle given to the analysis; sending never blocks the fixpoint.
pub struct ProgressHandle {
    sender: Option<mpsc::Sender<ProgressEvent>>,
}

impl ProgressHandle {
    /// A handle that drops every event.
    pub fn disabled() -> Self {
        ProgressHandle { sender: None }
    }

    fn send(&self, event: ProgressEvent) {
        if let Some(sender) = &self.sender {
            let _ = sender.send(event);
        }
    }

    /// Record entry into a function fixpoint.
    pub fn enter_function(&self, name: &str, context: &CallContextRef) {
        self.send(ProgressEvent::EnterFunction {
            name: name.to_owned(),
            context: context.to_string(),
        });
    }

    /// Record completion of a function fixpoint.
    pub fn leave_function(&self, name: &str) {
        self.send(ProgressEvent::LeaveFunction {
            name: name.to_owned(),
        });
    }

    /// Record a widening step at a cycle head.
    pub fn cycle_widening(&self, function: argus_ar::FunctionId, head: BasicBlockId) {
        self.send(ProgressEvent::CycleWidening {
            function: function.0,
            head: head.0,
        });
    }
}

/// The worker half: owns the receiving thread.
pub struct ProgressLogger {
    sender: mpsc::Sender<ProgressEvent>,
    worker: Option<JoinHandle<()>>,
}

impl ProgressLogger {
    /// Start a worker for the given mode; `None` for the disabled modes.
    pub fn start(mode: ProgressMode) -> (ProgressHandle, Option<ProgressLogger>) {
        let mode = match mode {
            ProgressMode::Auto => ProgressMode::Linear,
            other => other,
        };
        if mode == ProgressMode::None {
            return (ProgressHandle::disabled(), None)
        }
        let (sender, receiver) = mpsc::channel();
        let interactive = mode == ProgressMode::Interactive;
        let worker = std::thread::spawn(move || run_worker(receiver, interactive));
        let handle = ProgressHandle {
            sender: Some(sender.clone()),
        };
        (
            handle,
            Some(ProgressLogger {
                sender,
                worker: Some(worker),
            }),
        )
    }

    /// Stop the worker, draining queued events.
    pub fn shutdown(mut self) {
        let _ = self.sender.send(ProgressEvent::Shutdown);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn run_worker(receiver: mpsc::Receiver<ProgressEvent>, interactive: bool) {
    let mut stack: Vec<String> = Vec::new();
    while let Ok(event) = receiver.recv() {
        match event {
            ProgressEvent::EnterFunction { name, context } => {
                stack.push(name.clone());
                if interactive {
                    debug!(depth = stack.len(), stack = %stack.join(" > "), "analyzing");
                } else {
                    info!(function = %name, context = %context, "analyzing");
                }
            }
            ProgressEvent::LeaveFunction { name } => {
                if let Some(position) = stack.iter().rposition(|frame| *frame == name) {
                    stack.truncate(position);
                }
                if interactive {
                    debug!(depth = stack.len(), stack = %stack.join(" > "), "done");
                }
            }
            ProgressEvent::CycleWidening { function, head } => {
                debug!(function, head, "widening");
            }
            ProgressEvent::Shutdown => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::call_context::CallContextFactory;

    #[test]
    fn disabled_handle_is_inert() {
        let handle = ProgressHandle::disabled();
        let contexts = CallContextFactory::new();
        handle.enter_function("main", &contexts.empty());
        handle.leave_function("main");
    }

    #[test]
    fn worker_drains_and_stops() {
        let (handle, logger) = ProgressLogger::start(ProgressMode::Linear);
        let contexts = CallContextFactory::new();
        handle.enter_function("main", &contexts.empty());
        handle.cycle_widening(argus_ar::FunctionId(0), BasicBlockId(1));
        handle.leave_function("main");
        logger.expect("linear mode starts a worker").shutdown();
    }
}
