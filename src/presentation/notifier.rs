use tracing::{error, info};

use crate::domain::ports::Notifier;

/// Sends toasts to the log. Useful for headless callers and tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify_success(&self, message: &str) {
        info!(toast = "success", "{}", message);
    }

    fn notify_error(&self, message: &str) {
        error!(toast = "error", "{}", message);
    }
}

/// Prints toasts to the terminal.
#[cfg(feature = "cli")]
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleNotifier;

#[cfg(feature = "cli")]
impl Notifier for ConsoleNotifier {
    fn notify_success(&self, message: &str) {
        use colored::Colorize;
        println!("{} {}", "✓".bold().green(), message.green());
    }

    fn notify_error(&self, message: &str) {
        use colored::Colorize;
        eprintln!("{} {}", "✗".bold().red(), message.red());
    }
}
