//! User-facing blocking notifications.
//!
//! Camera and network failures interrupt the user; script load failures
//! never reach this layer (they are logged only).

use crate::logger;

/// Sink for notifications the user must acknowledge.
pub trait Notifier: Send + Sync {
    fn alert(&self, message: &str);
}

/// Prints notifications into the terminal status block.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn alert(&self, message: &str) {
        match message.split_once('\n') {
            Some((summary, detail)) => logger::status_error(summary, detail),
            None => logger::status_error(message, ""),
        }
    }
}
