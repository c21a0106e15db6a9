use owo_colors::OwoColorize;
use taskdesk_core::notify::Notifier;

/// Prints engine notifications to the terminal.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn success(&self, message: &str) {
        println!("{} {}", "Success:".green().bold(), message);
    }

    fn error(&self, message: &str) {
        eprintln!("{} {}", "Error:".red().bold(), message);
    }
}
