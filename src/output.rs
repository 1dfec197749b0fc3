//! CLI output formatting.
//!
//! One line per outcome, path first, status after the colon:
//!
//! ```text
//! notes.txt: not an image, skipping
//! out/photos/dawn_web.jpg: OK
//! out/photos/dawn_thumb.jpg: already exists, skipping
//! photos/broken.jpg: Decode failed: Format error decoding Jpeg: invalid marker
//! photos/dusk.png: error while processing profile web: Profile load failed: /x.icc: No such file
//! out/photos: exists and not a directory, skipping
//!
//! 1 written, 1 already existed, 3 failed, 1 not an image
//! ```
//!
//! Statuses are green for success and red otherwise when colour is enabled.
//!
//! # Architecture
//!
//! Each kind of output has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::process::{ProcessEvent, ProcessSummary};
use std::path::Path;
use supports_color::Stream;

const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const RESET: &str = "\x1b[0m";

/// Whether statuses are wrapped in ANSI colour codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Style {
    pub color: bool,
}

impl Style {
    pub const PLAIN: Style = Style { color: false };

    /// Colour when stdout supports it (honours `NO_COLOR`/`FORCE_COLOR`)
    /// and `--no-color` was not given.
    pub fn detect(no_color: bool) -> Self {
        Self {
            color: !no_color && supports_color::on(Stream::Stdout).is_some(),
        }
    }

    fn paint(self, code: &str, text: &str) -> String {
        if self.color {
            format!("{code}{text}{RESET}")
        } else {
            text.to_string()
        }
    }

    fn ok(self, text: &str) -> String {
        self.paint(GREEN, text)
    }

    fn bad(self, text: &str) -> String {
        self.paint(RED, text)
    }
}

fn status_line(path: &Path, status: &str) -> String {
    format!("{}: {}", path.display(), status)
}

fn plural(n: usize, one: &str, many: &str) -> String {
    format!("{n} {}", if n == 1 { one } else { many })
}

// ============================================================================
// Events
// ============================================================================

pub fn format_event(event: &ProcessEvent, style: Style) -> Vec<String> {
    let line = match event {
        ProcessEvent::NotAnImage { path } => status_line(path, &style.bad("not an image, skipping")),
        ProcessEvent::Written { path } => status_line(path, &style.ok("OK")),
        ProcessEvent::Exists { path } => status_line(path, &style.bad("already exists, skipping")),
        ProcessEvent::Failed { path, error } => status_line(path, &style.bad(error)),
        ProcessEvent::ProfileFailed {
            source,
            profile,
            error,
        } => format!(
            "{}: error while processing profile {}: {}",
            source.display(),
            profile,
            style.bad(error)
        ),
        ProcessEvent::FormatFailed {
            source,
            profile,
            error,
        } => format!(
            "{}: error in format string for profile {}: {}",
            source.display(),
            profile,
            style.bad(error)
        ),
    };
    vec![line]
}

pub fn print_event(event: &ProcessEvent, style: Style) {
    for line in format_event(event, style) {
        println!("{}", line);
    }
}

// ============================================================================
// Run summary
// ============================================================================

/// Count line printed after the last event. Zero counts other than
/// `written` are left out.
pub fn format_summary(summary: &ProcessSummary, style: Style) -> Vec<String> {
    let mut parts = vec![format!("{} written", summary.written)];
    if summary.existing > 0 {
        parts.push(format!("{} already existed", summary.existing));
    }
    if summary.failed > 0 {
        parts.push(style.bad(&format!("{} failed", summary.failed)));
    }
    if summary.not_images > 0 {
        parts.push(plural(summary.not_images, "not an image", "not images"));
    }
    vec![String::new(), parts.join(", ")]
}

pub fn print_summary(summary: &ProcessSummary, style: Style) {
    for line in format_summary(summary, style) {
        println!("{}", line);
    }
}

pub fn format_no_images(style: Style) -> Vec<String> {
    vec![style.ok("No images to process")]
}

pub fn print_no_images(style: Style) {
    for line in format_no_images(style) {
        println!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn line(event: ProcessEvent) -> String {
        let lines = format_event(&event, Style::PLAIN);
        assert_eq!(lines.len(), 1);
        lines.into_iter().next().unwrap()
    }

    // =========================================================================
    // Event formatting
    // =========================================================================

    #[test]
    fn written_and_skipped_lines() {
        assert_eq!(
            line(ProcessEvent::Written {
                path: PathBuf::from("out/a_web.jpg")
            }),
            "out/a_web.jpg: OK"
        );
        assert_eq!(
            line(ProcessEvent::Exists {
                path: PathBuf::from("out/a_web.jpg")
            }),
            "out/a_web.jpg: already exists, skipping"
        );
        assert_eq!(
            line(ProcessEvent::NotAnImage {
                path: PathBuf::from("notes.txt")
            }),
            "notes.txt: not an image, skipping"
        );
    }

    #[test]
    fn failure_lines() {
        assert_eq!(
            line(ProcessEvent::Failed {
                path: PathBuf::from("out/photos"),
                error: "exists and not a directory, skipping".into()
            }),
            "out/photos: exists and not a directory, skipping"
        );
        assert_eq!(
            line(ProcessEvent::ProfileFailed {
                source: PathBuf::from("a.jpg"),
                profile: "web".into(),
                error: "boom".into()
            }),
            "a.jpg: error while processing profile web: boom"
        );
        assert_eq!(
            line(ProcessEvent::FormatFailed {
                source: PathBuf::from("a.jpg"),
                profile: "web".into(),
                error: "unclosed '{' at offset 0".into()
            }),
            "a.jpg: error in format string for profile web: unclosed '{' at offset 0"
        );
    }

    #[test]
    fn colour_wraps_only_the_status() {
        let style = Style { color: true };
        let lines = format_event(
            &ProcessEvent::Written {
                path: PathBuf::from("x.png"),
            },
            style,
        );
        assert_eq!(lines[0], "x.png: \x1b[32mOK\x1b[0m");
    }

    // =========================================================================
    // Summary formatting
    // =========================================================================

    #[test]
    fn summary_omits_zero_counts() {
        let summary = ProcessSummary {
            written: 3,
            ..ProcessSummary::default()
        };
        assert_eq!(format_summary(&summary, Style::PLAIN), vec!["", "3 written"]);
    }

    #[test]
    fn summary_lists_every_nonzero_count() {
        let summary = ProcessSummary {
            written: 1,
            existing: 2,
            failed: 3,
            not_images: 1,
        };
        assert_eq!(
            format_summary(&summary, Style::PLAIN)[1],
            "1 written, 2 already existed, 3 failed, 1 not an image"
        );
        let summary = ProcessSummary {
            not_images: 2,
            ..ProcessSummary::default()
        };
        assert_eq!(format_summary(&summary, Style::PLAIN)[1], "0 written, 2 not images");
    }

    #[test]
    fn no_images_line() {
        assert_eq!(format_no_images(Style::PLAIN), vec!["No images to process"]);
    }
}
