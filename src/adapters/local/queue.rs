//! In-process command queue: unbounded FIFO, any number of producers, one consumer.

use crate::domain::commands::Command;
use tokio::sync::mpsc;

/// Producer handle. Cheap to clone, safe to use from any thread or task.
#[derive(Clone, Debug)]
pub struct CommandSender {
    tx: mpsc::UnboundedSender<Command>,
}

impl CommandSender {
    /// Append `command`. Returns false once the consumer is gone.
    pub fn push(&self, command: Command) -> bool {
        self.tx.send(command).is_ok()
    }
}

/// The single consumer end, owned by the worker.
#[derive(Debug)]
pub struct CommandReceiver {
    rx: mpsc::UnboundedReceiver<Command>,
}

impl CommandReceiver {
    /// Wait for the next command in push order. `None` once every sender is dropped and the
    /// queue is drained.
    pub async fn pop(&mut self) -> Option<Command> {
        self.rx.recv().await
    }
}

pub fn command_queue() -> (CommandSender, CommandReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (CommandSender { tx }, CommandReceiver { rx })
}
