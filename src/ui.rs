use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    Terminal,
};

use crate::config::current_theme_color;

pub type Term = Terminal<ratatui::backend::CrosstermBackend<std::io::Stdout>>;

// ── Color helpers ─────────────────────────────────────────────────────────────

pub fn normal_style()   -> Style { Style::default().fg(current_theme_color()) }
pub fn sel_style()      -> Style { Style::default().fg(ratatui::style::Color::Black).bg(current_theme_color()).add_modifier(Modifier::BOLD) }
pub fn title_style()    -> Style { Style::default().fg(current_theme_color()).add_modifier(Modifier::BOLD) }
pub fn dim_style()      -> Style { Style::default().fg(current_theme_color()).add_modifier(Modifier::DIM) }
/// Corrupt records stay red regardless of the active theme.
pub fn alert_style()    -> Style { Style::default().fg(ratatui::style::Color::Red) }

// ── Cell-row text helpers ─────────────────────────────────────────────────────

pub fn write_text(buf: &mut [char], start: usize, text: &str) {
    for (i, ch) in text.chars().enumerate() {
        let idx = start + i;
        if idx >= buf.len() {
            break;
        }
        buf[idx] = ch;
    }
}

pub fn point_in_rect(x: u16, y: u16, r: Rect) -> bool {
    x >= r.x && x < r.x.saturating_add(r.width) && y >= r.y && y < r.y.saturating_add(r.height)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_text_clips_at_buffer_end() {
        let mut row = vec![' '; 4];
        write_text(&mut row, 2, "LONG");
        assert_eq!(row.iter().collect::<String>(), "  LO");
    }

    #[test]
    fn point_in_rect_excludes_far_edges() {
        let r = Rect::new(2, 3, 4, 2);
        assert!(point_in_rect(2, 3, r));
        assert!(point_in_rect(5, 4, r));
        assert!(!point_in_rect(6, 3, r));
        assert!(!point_in_rect(2, 5, r));
    }
}
