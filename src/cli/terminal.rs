//! Colours for command output.
//!
//! Colour is used only when stdout supports it, so piped output (and the
//! JSON formats) stays plain.

use std::sync::OnceLock;

use owo_colors::{OwoColorize, Style};

/// Whether stdout takes ANSI colours. Detected once per process.
pub fn supports_color() -> bool {
    static SUPPORTED: OnceLock<bool> = OnceLock::new();
    *SUPPORTED.get_or_init(|| supports_color::on(supports_color::Stream::Stdout).is_some())
}

#[derive(Debug, Clone, Copy)]
enum Tone {
    Success,
    Warning,
    Error,
    Dim,
}

impl Tone {
    fn style(self) -> Style {
        let style = Style::new();
        match self {
            Self::Success => style.green(),
            Self::Warning => style.yellow(),
            Self::Error => style.red().bold(),
            Self::Dim => style.dimmed(),
        }
    }
}

fn paint(text: &str, tone: Tone) -> String {
    if supports_color() {
        text.style(tone.style()).to_string()
    } else {
        text.to_string()
    }
}

/// Extension trait for colouring output
pub trait Colorize {
    /// Completed changes (green)
    fn success(&self) -> String;
    /// Something that needs attention but did not block (yellow)
    fn warning(&self) -> String;
    /// A blocked or unavailable selection (bold red)
    fn error(&self) -> String;
    /// Secondary detail
    fn dim(&self) -> String;
}

impl<T: AsRef<str> + ?Sized> Colorize for T {
    fn success(&self) -> String {
        paint(self.as_ref(), Tone::Success)
    }

    fn warning(&self) -> String {
        paint(self.as_ref(), Tone::Warning)
    }

    fn error(&self) -> String {
        paint(self.as_ref(), Tone::Error)
    }

    fn dim(&self) -> String {
        paint(self.as_ref(), Tone::Dim)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_text_intact() {
        let painted = "Total".success();
        assert!(painted.contains("Total"));
        assert!(String::from("Cancelled").dim().contains("Cancelled"));
    }
}
