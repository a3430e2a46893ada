use rand::Rng;
use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use crate::catalog::LogRecord;
use crate::media::{timestamp_label, Playback};
use crate::ui::{dim_style, normal_style, point_in_rect, sel_style, title_style, write_text};

pub const WINDOW_W: u16 = 56;
pub const WINDOW_H: u16 = 18;

const BASE_X: i32 = 8;
const BASE_Y: i32 = 2;
const SPAWN_JITTER: i32 = 8;

const TITLE_DECOR_BUTTONS: &str = "[_][o]";
const TITLE_CLOSE_BUTTON: &str = "[X]";
const TOGGLE_PLAY: &str = "[ >]";
const TOGGLE_PAUSE: &str = "[||]";
const TRANSCRIPT: [&str; 2] = [
    "TRANSCRIPT: AUTOMATED LOG ENTRY. VISUAL SENSORS ACTIVE.",
    "AUDIO NORMALIZED. NO ANOMALIES DETECTED IN SECTOR 4...",
];

// ── Geometry ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WinRect {
    pub x: i32,
    pub y: i32,
    pub w: u16,
    pub h: u16,
}

impl WinRect {
    pub fn contains(self, x: u16, y: u16) -> bool {
        let x0 = self.x.max(0) as u16;
        let y0 = self.y.max(0) as u16;
        let x1 = x0.saturating_add(self.w);
        let y1 = y0.saturating_add(self.h);
        x >= x0 && x < x1 && y >= y0 && y < y1
    }

    pub fn to_rect(self) -> Rect {
        Rect {
            x: self.x.max(0) as u16,
            y: self.y.max(0) as u16,
            width: self.w,
            height: self.h,
        }
    }
}

/// Keep a window on the desktop after moves and terminal resizes.
pub fn clamp_window(rect: &mut WinRect, desk: Rect) {
    if desk.width < 8 || desk.height < 4 {
        return;
    }
    rect.w = rect.w.min(desk.width.saturating_sub(1).max(1));
    rect.h = rect.h.min(desk.height.saturating_sub(1).max(1));

    let min_x = desk.x as i32;
    let min_y = desk.y as i32;
    let max_x = desk
        .x
        .saturating_add(desk.width)
        .saturating_sub(rect.w)
        .saturating_sub(1) as i32;
    let max_y = desk
        .y
        .saturating_add(desk.height)
        .saturating_sub(rect.h)
        .saturating_sub(1) as i32;

    rect.x = rect.x.clamp(min_x, max_x.max(min_x));
    rect.y = rect.y.clamp(min_y, max_y.max(min_y));
}

// ── Window ────────────────────────────────────────────────────────────────────

pub struct LogWindow {
    pub id: String,
    pub record: LogRecord,
    pub rect: WinRect,
    pub dragging: bool,
    pub playback: Playback,
}

impl LogWindow {
    /// The spawn offset is jittered once so stacked opens don't overlap
    /// perfectly; rows get half the jitter to match cell aspect.
    pub fn open<R: Rng>(record: LogRecord, playback: Playback, rng: &mut R) -> Self {
        let j = rng.gen_range(0..SPAWN_JITTER);
        Self {
            id: record.id.clone(),
            record,
            rect: WinRect {
                x: BASE_X + j,
                y: BASE_Y + j / 2,
                w: WINDOW_W,
                h: WINDOW_H,
            },
            dragging: false,
            playback,
        }
    }
}

// ── Hit testing ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowHit {
    Title,
    Close,
    Toggle,
    Content,
}

fn close_button_rect(area: Rect) -> Rect {
    Rect {
        x: area.x
            + area
                .width
                .saturating_sub(TITLE_CLOSE_BUTTON.len() as u16 + 1),
        y: area.y,
        width: TITLE_CLOSE_BUTTON.len() as u16,
        height: 1,
    }
}

fn controls_row_y(area: Rect) -> u16 {
    area.y + area.height.saturating_sub(5)
}

fn toggle_button_rect(area: Rect) -> Rect {
    Rect {
        x: area.x + 2,
        y: controls_row_y(area),
        width: TOGGLE_PLAY.len() as u16,
        height: 1,
    }
}

pub fn hit_test(win: &LogWindow, x: u16, y: u16) -> Option<WindowHit> {
    if !win.rect.contains(x, y) {
        return None;
    }
    let area = win.rect.to_rect();
    if point_in_rect(x, y, close_button_rect(area)) {
        return Some(WindowHit::Close);
    }
    if y == area.y {
        return Some(WindowHit::Title);
    }
    if point_in_rect(x, y, toggle_button_rect(area)) {
        return Some(WindowHit::Toggle);
    }
    Some(WindowHit::Content)
}

// ── Drawing ───────────────────────────────────────────────────────────────────

pub fn draw_window(f: &mut Frame, win: &LogWindow, focused: bool) {
    let area = win.rect.to_rect();
    if area.width < 12 || area.height < 7 {
        return;
    }

    // Fully opaque over anything behind it.
    f.render_widget(Clear, area);

    let border_style = if focused { title_style() } else { dim_style() };
    f.render_widget(
        Block::default().borders(Borders::ALL).style(border_style),
        area,
    );

    draw_title_row(f, win, area, focused);

    let inner = Rect {
        x: area.x + 1,
        y: area.y + 1,
        width: area.width - 2,
        height: area.height - 2,
    };
    draw_panel(f, win, inner, focused);
}

fn draw_title_row(f: &mut Frame, win: &LogWindow, area: Rect, focused: bool) {
    let title_color = if focused { sel_style() } else { dim_style() };
    let mut chars: Vec<char> = vec![' '; area.width.saturating_sub(2) as usize];
    write_text(&mut chars, 0, &format!(" {} ", win.record.title));
    let buttons = format!("{TITLE_DECOR_BUTTONS}{TITLE_CLOSE_BUTTON}");
    if chars.len() >= buttons.len() {
        let button_x = chars.len() - buttons.len();
        write_text(&mut chars, button_x, &buttons);
    }
    let title_line: String = chars.into_iter().collect();
    f.render_widget(
        Paragraph::new(Line::from(Span::styled(title_line, title_color))),
        Rect {
            x: area.x + 1,
            y: area.y,
            width: area.width - 2,
            height: 1,
        },
    );
}

/// Panel rows, top to bottom: metadata, viewport, controls, transcript,
/// mount footer.
fn draw_panel(f: &mut Frame, win: &LogWindow, inner: Rect, focused: bool) {
    if inner.height < 5 {
        return;
    }
    let meta_y = inner.y;
    let footer_y = inner.y + inner.height - 1;
    let transcript_y = footer_y.saturating_sub(2);
    let controls_y = transcript_y.saturating_sub(1);
    let viewport = Rect {
        x: inner.x + 1,
        y: meta_y + 1,
        width: inner.width.saturating_sub(2),
        height: controls_y.saturating_sub(meta_y + 1),
    };

    let meta = format!(
        " METADATA: {} // ENCRYPTED // {}",
        win.record.size_label, win.record.date
    );
    f.render_widget(
        Paragraph::new(Line::from(Span::styled(meta, dim_style()))),
        Rect { x: inner.x, y: meta_y, width: inner.width, height: 1 },
    );

    draw_viewport(f, &win.playback, viewport);
    draw_controls(f, &win.playback, Rect { x: inner.x, y: controls_y, width: inner.width, height: 1 }, focused);

    for (i, text) in TRANSCRIPT.iter().enumerate() {
        let y = transcript_y + i as u16;
        if y < footer_y {
            f.render_widget(
                Paragraph::new(Line::from(Span::styled(format!(" {text}"), dim_style()))),
                Rect { x: inner.x, y, width: inner.width, height: 1 },
            );
        }
    }

    let mut row = vec![' '; inner.width as usize];
    let status = if win.dragging {
        "STATUS: RELOCATING"
    } else {
        "STATUS: MOUNTED"
    };
    write_text(&mut row, 1, status);
    let mem = "MEM: 0x4F2A ";
    if row.len() > mem.len() {
        let at = row.len() - mem.len();
        write_text(&mut row, at, mem);
    }
    f.render_widget(
        Paragraph::new(Line::from(Span::styled(
            row.into_iter().collect::<String>(),
            dim_style(),
        ))),
        Rect { x: inner.x, y: footer_y, width: inner.width, height: 1 },
    );
}

fn draw_viewport(f: &mut Frame, playback: &Playback, area: Rect) {
    if area.width == 0 || area.height == 0 {
        return;
    }

    if playback.duration().is_none() {
        let label = Paragraph::new("ACQUIRING SIGNAL...")
            .alignment(ratatui::layout::Alignment::Center)
            .style(dim_style());
        f.render_widget(label, center_row(area));
        return;
    }

    if playback.is_playing() {
        // Sensor static keyed off the stream position; no randomness so a
        // paused frame holds still.
        let t = (playback.position() * 8.0) as usize;
        let glyphs = ['░', '▒', '▓', ' '];
        let mut lines = Vec::with_capacity(area.height as usize);
        for row in 0..area.height as usize {
            let text: String = (0..area.width as usize)
                .map(|col| glyphs[(col * 7 + row * 13 + t) % glyphs.len()])
                .collect();
            lines.push(Line::from(Span::styled(text, dim_style())));
        }
        f.render_widget(Paragraph::new(lines), area);
    } else {
        let label = Paragraph::new("> STANDBY <")
            .alignment(ratatui::layout::Alignment::Center)
            .style(normal_style());
        f.render_widget(label, center_row(area));
    }
}

fn center_row(area: Rect) -> Rect {
    Rect {
        x: area.x,
        y: area.y + area.height / 2,
        width: area.width,
        height: 1,
    }
}

fn draw_controls(f: &mut Frame, playback: &Playback, area: Rect, focused: bool) {
    let width = area.width as usize;
    if width < 12 {
        return;
    }
    let mut row = vec![' '; width];

    let button = if playback.is_playing() { TOGGLE_PAUSE } else { TOGGLE_PLAY };
    write_text(&mut row, 2, button);

    let clock = format!(
        "{} LOG_PLAYBACK_MODE ",
        timestamp_label(playback.position())
    );
    let bar_start = 2 + button.len() + 1;
    let bar_end = width.saturating_sub(clock.len() + 1);
    if bar_end > bar_start {
        let bar_w = bar_end - bar_start;
        let filled = ((playback.progress() / 100.0) * bar_w as f64) as usize;
        for (i, slot) in row[bar_start..bar_end].iter_mut().enumerate() {
            *slot = if i < filled { '▓' } else { '·' };
        }
        write_text(&mut row, bar_end + 1, &clock);
    }

    let style = if focused { normal_style() } else { dim_style() };
    f.render_widget(
        Paragraph::new(Line::from(Span::styled(
            row.into_iter().collect::<String>(),
            style,
        ))),
        area,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::builtin_catalog;

    fn sample_window() -> LogWindow {
        let record = builtin_catalog().into_iter().next().unwrap();
        let playback = Playback::open("x://feed", 10.0, false, true);
        let mut rng = rand::thread_rng();
        LogWindow::open(record, playback, &mut rng)
    }

    #[test]
    fn spawn_jitter_stays_within_bounds() {
        for _ in 0..50 {
            let win = sample_window();
            assert!(win.rect.x >= BASE_X && win.rect.x < BASE_X + SPAWN_JITTER);
            assert!(win.rect.y >= BASE_Y && win.rect.y < BASE_Y + SPAWN_JITTER / 2 + 1);
        }
    }

    #[test]
    fn title_row_hits_resolve_before_content() {
        let mut win = sample_window();
        win.rect = WinRect { x: 10, y: 5, w: 40, h: 12 };
        assert_eq!(hit_test(&win, 12, 5), Some(WindowHit::Title));
        assert_eq!(hit_test(&win, 12, 7), Some(WindowHit::Content));
        assert_eq!(hit_test(&win, 9, 5), None);
    }

    #[test]
    fn close_button_sits_at_title_right_edge() {
        let mut win = sample_window();
        win.rect = WinRect { x: 0, y: 0, w: 40, h: 12 };
        // [X] occupies columns 36..39 of a 40-wide window.
        assert_eq!(hit_test(&win, 36, 0), Some(WindowHit::Close));
        assert_eq!(hit_test(&win, 35, 0), Some(WindowHit::Title));
    }

    #[test]
    fn toggle_button_hits_on_controls_row() {
        let mut win = sample_window();
        win.rect = WinRect { x: 0, y: 0, w: 40, h: 12 };
        let y = controls_row_y(win.rect.to_rect());
        assert_eq!(hit_test(&win, 2, y), Some(WindowHit::Toggle));
        assert_eq!(hit_test(&win, 10, y), Some(WindowHit::Content));
    }

    #[test]
    fn clamp_keeps_window_inside_desk() {
        let desk = Rect::new(0, 1, 80, 22);
        let mut rect = WinRect { x: -5, y: -5, w: 56, h: 18 };
        clamp_window(&mut rect, desk);
        assert!(rect.x >= 0 && rect.y >= 1);

        rect = WinRect { x: 200, y: 200, w: 56, h: 18 };
        clamp_window(&mut rect, desk);
        assert!(rect.x + i32::from(rect.w) <= 80);
        assert!(rect.y + i32::from(rect.h) <= 23);
    }
}
