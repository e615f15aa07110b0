//! Event handling and progress display

use crate::logging::log_event_with_tracing;
use nasemu_events::{AcquisitionEvent, AppEvent, EventMessage};
use nasemu_net::human_bytes;
use std::io::Write;

/// Event handler for logging and the download progress line
pub struct EventHandler {
    /// Suppress terminal rendering; events only go to the log
    json_mode: bool,
    /// A `\r` progress line is on screen and needs a newline before other output
    progress_open: bool,
}

impl EventHandler {
    pub fn new(json_mode: bool) -> Self {
        Self {
            json_mode,
            progress_open: false,
        }
    }

    /// Handle incoming event
    pub fn handle_event(&mut self, message: EventMessage) {
        if let AppEvent::Acquisition(AcquisitionEvent::Progress {
            url,
            bytes,
            total_bytes,
        }) = &message.event
        {
            if !self.json_mode {
                self.render_progress(url, *bytes, *total_bytes);
            }
            return;
        }

        self.close_progress();
        log_event_with_tracing(&message);
    }

    fn render_progress(&mut self, url: &str, bytes: u64, total: Option<u64>) {
        let line = progress_line(url, bytes, total);
        let mut stdout = std::io::stdout().lock();
        // Terminal output is best effort
        let _ = write!(stdout, "\r{line}      ");
        let _ = stdout.flush();
        self.progress_open = true;
    }

    fn close_progress(&mut self) {
        if self.progress_open {
            println!();
            self.progress_open = false;
        }
    }
}

/// `name cur/total pct%` for one download
pub fn progress_line(url: &str, bytes: u64, total: Option<u64>) -> String {
    let name = url
        .split(['?', '#'])
        .next()
        .and_then(|path| path.rsplit('/').find(|segment| !segment.is_empty()))
        .unwrap_or(url);

    match total {
        Some(total) if total > 0 => {
            #[allow(clippy::cast_precision_loss)]
            let percent = bytes as f64 * 100.0 / total as f64;
            format!(
                "{name} {}/{} {percent:.2}%",
                human_bytes(bytes),
                human_bytes(total)
            )
        }
        _ => format!("{name} {}", human_bytes(bytes)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_line_with_total() {
        let line = progress_line(
            "https://example.com/dl/pan-xunlei-com.spk",
            512 * 1024,
            Some(1024 * 1024),
        );
        assert_eq!(line, "pan-xunlei-com.spk 512.00 KiB/1.00 MiB 50.00%");
    }

    #[test]
    fn test_progress_line_without_total() {
        let line = progress_line("http://host/pkg.spk?token=abc", 100, None);
        assert_eq!(line, "pkg.spk 100 bytes");
    }

    #[test]
    fn test_progress_closes_before_other_events() {
        let mut handler = EventHandler::new(false);
        handler.handle_event(EventMessage::from_event(AppEvent::Acquisition(
            AcquisitionEvent::Progress {
                url: "http://host/pkg.spk".into(),
                bytes: 1,
                total_bytes: Some(2),
            },
        )));
        assert!(handler.progress_open);

        handler.handle_event(EventMessage::from_event(AppEvent::Acquisition(
            AcquisitionEvent::Completed {
                url: "http://host/pkg.spk".into(),
                dest: "/tmp".into(),
            },
        )));
        assert!(!handler.progress_open);
    }

    #[test]
    fn test_json_mode_skips_rendering() {
        let mut handler = EventHandler::new(true);
        handler.handle_event(EventMessage::from_event(AppEvent::Acquisition(
            AcquisitionEvent::Progress {
                url: "http://host/pkg.spk".into(),
                bytes: 1,
                total_bytes: None,
            },
        )));
        assert!(!handler.progress_open);
    }
}
