//! User-visible alerts.

/// Surfaces a message the user must see. Used sparingly: most export
/// failures are only logged.
pub trait UserNotifier: Send + Sync {
    fn alert(&self, message: &str);
}

/// Prints alerts to stderr, for the command-line front end.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleNotifier;

impl UserNotifier for ConsoleNotifier {
    fn alert(&self, message: &str) {
        log::debug!("Alerting user: {}", message);
        eprintln!("⚠️  {}", message);
    }
}
