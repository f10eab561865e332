use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Span;

use crate::fmt::money;

pub const HEADER_STYLE: Style = Style::new()
    .fg(Color::Yellow)
    .add_modifier(Modifier::BOLD);

pub const FOOTER_STYLE: Style = Style::new().fg(Color::DarkGray);

pub const AMOUNT_POS_STYLE: Style = Style::new().fg(Color::Rgb(80, 220, 100));
pub const AMOUNT_NEG_STYLE: Style = Style::new().fg(Color::Red);

pub const SELECTED_STYLE: Style = Style::new()
    .bg(Color::Rgb(40, 40, 60))
    .add_modifier(Modifier::BOLD);

/// Colored amount: green when non-negative, red otherwise.
pub fn money_span(amount: f64) -> Span<'static> {
    let style = if amount < 0.0 {
        AMOUNT_NEG_STYLE
    } else {
        AMOUNT_POS_STYLE
    };
    Span::styled(money(amount), style)
}

/// Expense amounts are stored positive; show them in red regardless.
pub fn expense_span(amount: f64) -> Span<'static> {
    Span::styled(money(amount), AMOUNT_NEG_STYLE)
}

/// Wrap text to a given width. Returns (wrapped_string, line_count).
pub fn wrap_text(text: &str, width: usize) -> (String, u16) {
    if width == 0 {
        return (text.to_string(), 1);
    }
    let wrapped = textwrap::fill(text, width);
    let lines = wrapped.lines().count().max(1) as u16;
    (wrapped, lines)
}

/// Horizontal bar of `width` cells scaled by `value / max`.
pub fn share_bar(value: f64, max: f64, width: usize) -> String {
    if max <= 0.0 || value <= 0.0 {
        return String::new();
    }
    let cells = ((value / max) * width as f64).round() as usize;
    "\u{2588}".repeat(cells.clamp(1, width))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_text() {
        let (wrapped, lines) = wrap_text("quarterly hosting invoice for client", 10);
        assert!(lines > 1);
        assert!(wrapped.lines().all(|l| l.chars().count() <= 10));
        assert_eq!(wrap_text("x", 0), ("x".to_string(), 1));
    }

    #[test]
    fn test_share_bar() {
        assert_eq!(share_bar(50.0, 100.0, 10).chars().count(), 5);
        assert_eq!(share_bar(100.0, 100.0, 10).chars().count(), 10);
        assert_eq!(share_bar(0.1, 100.0, 10).chars().count(), 1);
        assert!(share_bar(0.0, 100.0, 10).is_empty());
        assert!(share_bar(5.0, 0.0, 10).is_empty());
    }
}
