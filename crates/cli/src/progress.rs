//! Progress indicators
//!
//! Spinners are drawn on stderr and hidden when stderr is not a terminal.

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Create a spinner for indeterminate progress
///
/// Returns a hidden bar when `quiet` is set or stderr is not a terminal.
pub fn spinner(message: &str, quiet: bool) -> ProgressBar {
    if quiet || !console::Term::stderr().is_term() {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
        .template("{spinner:.blue} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    pb.set_style(style);
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

/// Clear a spinner without leaving a line behind
pub fn finish_clear(pb: &ProgressBar) {
    pb.finish_and_clear();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quiet_spinner_is_hidden() {
        let pb = spinner("Indexing...", true);
        assert!(pb.is_hidden());
        finish_clear(&pb);
        assert!(pb.is_finished());
    }

    #[test]
    fn test_spinner_creation() {
        let pb = spinner("Matching...", false);
        finish_clear(&pb);
        assert!(pb.is_finished());
    }
}
