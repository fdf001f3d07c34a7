//! Coloured terminal output

use owo_colors::{OwoColorize, Style};

/// Wraps text in a style when stdout accepts colour.
fn paint(text: &str, style: Style) -> String {
    if supports_color::on(supports_color::Stream::Stdout).is_some() {
        text.style(style).to_string()
    } else {
        text.to_string()
    }
}

/// Extension trait for colorizing output
pub trait Colorize {
    /// Color as success (green)
    fn success(&self) -> String;
    /// Color as warning (yellow)
    fn warning(&self) -> String;
    /// Color as info (blue)
    fn info(&self) -> String;
    /// Dim the text
    fn dim(&self) -> String;
}

impl<T: AsRef<str> + ?Sized> Colorize for T {
    fn success(&self) -> String {
        paint(self.as_ref(), Style::new().green())
    }

    fn warning(&self) -> String {
        paint(self.as_ref(), Style::new().yellow())
    }

    fn info(&self) -> String {
        paint(self.as_ref(), Style::new().bright_blue())
    }

    fn dim(&self) -> String {
        paint(self.as_ref(), Style::new().dimmed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_survives_colouring() {
        // colour codes may or may not be added depending on the test terminal
        assert!("saved".success().contains("saved"));
        assert!(String::from("careful").warning().contains("careful"));
    }
}
