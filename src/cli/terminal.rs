//! Coloured terminal output

use owo_colors::{OwoColorize, colors::css};
use supports_color::Stream;
use vplan::domain::LockStatus;

/// How a piece of output should stand out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    /// Healthy state (green)
    Good,
    /// Needs attention (amber)
    Attention,
    /// Identifiers such as tags (blue)
    Label,
    /// Secondary detail (dimmed)
    Muted,
}

/// Colours `text` if stdout supports it.
pub fn paint(text: &str, tone: Tone) -> String {
    if supports_color::on(Stream::Stdout).is_none() {
        return text.to_string();
    }
    match tone {
        Tone::Good => text.fg::<css::Green>().to_string(),
        Tone::Attention => text.fg::<css::Orange>().to_string(),
        Tone::Label => text.fg::<css::LightBlue>().to_string(),
        Tone::Muted => text.dimmed().to_string(),
    }
}

/// Extension trait for colouring output
pub trait Colorize: AsRef<str> {
    /// Colour as healthy
    fn success(&self) -> String {
        paint(self.as_ref(), Tone::Good)
    }

    /// Colour as needing attention
    fn warning(&self) -> String {
        paint(self.as_ref(), Tone::Attention)
    }

    /// Colour as an identifier
    fn info(&self) -> String {
        paint(self.as_ref(), Tone::Label)
    }

    /// Dim the text
    fn dim(&self) -> String {
        paint(self.as_ref(), Tone::Muted)
    }
}

impl<T: AsRef<str> + ?Sized> Colorize for T {}

/// One-word summary of a lock for listings.
pub fn lock_marker(status: &LockStatus) -> String {
    status.owner().map_or_else(
        || "unlocked".dim(),
        |owner| format!("locked by {owner}").warning(),
    )
}
