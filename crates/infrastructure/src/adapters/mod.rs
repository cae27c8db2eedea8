//! Small adapters for the application ports.

mod logging_notifier;
mod system_clock;

pub use logging_notifier::LoggingNotifier;
pub use system_clock::SystemClock;
