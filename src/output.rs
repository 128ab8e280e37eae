//! Console output helpers for task and watch progress lines

use std::time::{Duration, SystemTime};

/// Clear the terminal screen
pub fn clear_screen() {
    // ANSI escape code to clear screen and move cursor to top-left
    print!("\x1B[2J\x1B[1;1H");
}

/// Format duration for display
pub fn format_duration(duration: Duration) -> String {
    let millis = duration.as_millis();
    if millis < 1000 {
        format!("{} ms", millis)
    } else {
        format!("{:.2} s", duration.as_secs_f64())
    }
}

/// Get current timestamp for logging
pub fn timestamp() -> String {
    let now = SystemTime::now().duration_since(SystemTime::UNIX_EPOCH).unwrap_or_default();
    let secs = now.as_secs() % 86400; // seconds since midnight
    let hours = (secs / 3600) % 24;
    let minutes = (secs / 60) % 60;
    let seconds = secs % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}

/// Print a progress line prefixed with the current time.
pub fn log_line(message: impl AsRef<str>) {
    println!("[{}] {}", timestamp(), message.as_ref());
}

/// Print an error line prefixed with the current time.
pub fn log_error(message: impl AsRef<str>) {
    eprintln!("[{}] {}", timestamp(), message.as_ref());
}
