use anyhow::Result;
use chrono::Local;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, MouseButton,
    MouseEvent, MouseEventKind,
};
use crossterm::execute;
use rand::Rng;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Clear, Paragraph},
    Frame,
};
use std::time::{Duration, Instant};

use crate::catalog::{load_catalog, LogKind, LogRecord};
use crate::config::{get_settings, persist_settings, update_settings, Settings, THEMES};
use crate::crt::CrtOverlay;
use crate::feed::{FeedPhase, TerminalFeed};
use crate::media::Playback;
use crate::status::{render_bottom_bar, render_top_bar, StatusClock, SystemGauges};
use crate::ui::{alert_style, dim_style, normal_style, point_in_rect, sel_style, Term};
use crate::window::{clamp_window, draw_window, hit_test, LogWindow, WindowHit};

const ICON_W: u16 = 18;
const ICON_H: u16 = 4;

// ── Pointer normalization ─────────────────────────────────────────────────────

/// Single reading extracted from whatever shape the host input layer emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pointer {
    pub x: u16,
    pub y: u16,
}

fn pointer_of(mouse: &MouseEvent) -> Pointer {
    Pointer {
        x: mouse.column,
        y: mouse.row,
    }
}

// ── Drag session ──────────────────────────────────────────────────────────────

/// Live for the duration of one header drag; holds the grab offset so the
/// window's top-left corner tracks pointer minus offset.
#[derive(Debug, Clone)]
pub struct DragSession {
    pub window_id: String,
    pub dx: i32,
    pub dy: i32,
}

// ── Desktop state ─────────────────────────────────────────────────────────────

pub struct DesktopState {
    pub catalog: Vec<LogRecord>,
    /// Open windows in open order; ids unique.
    pub windows: Vec<LogWindow>,
    /// May briefly name a just-closed window (see `close_window`); every
    /// lookup resolves through the open set and treats that as no focus.
    pub active_id: Option<String>,
    pub dragging: Option<DragSession>,
    pub selected_icon: usize,
    autoplay_allowed: bool,
    cursor_x: u16,
    cursor_y: u16,
    feed: TerminalFeed,
    crt: CrtOverlay,
    clock: StatusClock,
    gauges: SystemGauges,
    last_tick: Instant,
}

impl DesktopState {
    pub fn new(catalog: Vec<LogRecord>, settings: &Settings, now: Instant) -> Self {
        Self {
            catalog,
            windows: Vec::new(),
            active_id: None,
            dragging: None,
            selected_icon: 0,
            autoplay_allowed: settings.autoplay,
            cursor_x: 0,
            cursor_y: 0,
            feed: TerminalFeed::new(
                settings.bootup,
                Duration::from_millis(settings.boot_char_ms),
                Duration::from_millis(settings.chatter_interval_ms),
                now,
            ),
            crt: CrtOverlay::new(settings.scanlines, now),
            clock: StatusClock::new(Local::now()),
            gauges: SystemGauges::new(),
            last_tick: now,
        }
    }

    /// Corrupt records are inert. An already-open id only regains focus.
    pub fn open_record<R: Rng>(&mut self, record: &LogRecord, rng: &mut R) {
        let LogKind::Recording {
            source,
            runtime_secs,
        } = &record.kind
        else {
            log::debug!("ignoring corrupt record {}", record.id);
            return;
        };
        if self.windows.iter().any(|w| w.id == record.id) {
            self.active_id = Some(record.id.clone());
            return;
        }
        let playback = Playback::open(source, *runtime_secs, true, self.autoplay_allowed);
        self.windows.push(LogWindow::open(record.clone(), playback, rng));
        self.active_id = Some(record.id.clone());
    }

    /// Removing the active window refocuses by the pre-removal open order:
    /// with more than one window open, focus goes to the id that sat
    /// second-to-last before removal, even where that is the id being
    /// closed. Deliberately kept; see DESIGN.md.
    pub fn close_window(&mut self, id: &str) {
        let Some(pos) = self.windows.iter().position(|w| w.id == id) else {
            return;
        };
        let was_active = self.active_id.as_deref() == Some(id);
        let refocus = if was_active && self.windows.len() > 1 {
            Some(self.windows[self.windows.len() - 2].id.clone())
        } else {
            None
        };
        self.windows.remove(pos);
        if was_active {
            self.active_id = refocus;
        }
    }

    pub fn set_focus(&mut self, id: &str) {
        self.active_id = Some(id.to_string());
    }

    /// Resolves the focused window, tolerating a dangling active id.
    pub fn active_window_idx(&self) -> Option<usize> {
        self.active_id
            .as_deref()
            .and_then(|id| self.windows.iter().position(|w| w.id == id))
    }

    fn cycle_focus(&mut self) {
        if self.windows.is_empty() {
            return;
        }
        let next = match self.active_window_idx() {
            Some(idx) => (idx + 1) % self.windows.len(),
            None => self.windows.len() - 1,
        };
        let id = self.windows[next].id.clone();
        self.set_focus(&id);
    }

    fn advance_timers<R: Rng>(&mut self, now: Instant, rng: &mut R) {
        let dt = now.saturating_duration_since(self.last_tick);
        self.last_tick = now;
        self.feed.tick(now, rng);
        for win in &mut self.windows {
            win.playback.tick(dt);
        }
        self.crt.tick(now, rng);
        self.clock.refresh(Local::now());
    }
}

// ── Event loop ────────────────────────────────────────────────────────────────

pub fn desktop_mode(terminal: &mut Term) -> Result<()> {
    let _ = terminal.hide_cursor();
    execute!(terminal.backend_mut(), EnableMouseCapture)?;
    let result = run_desktop_loop(terminal);
    let _ = execute!(terminal.backend_mut(), DisableMouseCapture);
    let _ = terminal.show_cursor();
    result
}

fn run_desktop_loop(terminal: &mut Term) -> Result<()> {
    let settings = get_settings();
    let mut state = DesktopState::new(load_catalog(), &settings, Instant::now());
    let mut rng = rand::thread_rng();

    loop {
        state.advance_timers(Instant::now(), &mut rng);
        draw_desktop(terminal, &mut state)?;

        if event::poll(Duration::from_millis(16))? {
            match event::read()? {
                Event::Key(key) => {
                    if key.kind != KeyEventKind::Press && key.kind != KeyEventKind::Repeat {
                        continue;
                    }
                    if handle_key(&mut state, key.code, &mut rng) {
                        return Ok(());
                    }
                }
                Event::Mouse(mouse) => {
                    let ts = terminal.size()?;
                    handle_mouse(&mut state, mouse, full_rect(ts.width, ts.height), &mut rng);
                }
                Event::Resize(w, h) => {
                    let desk = desktop_area(full_rect(w, h));
                    for win in &mut state.windows {
                        clamp_window(&mut win.rect, desk);
                    }
                }
                _ => {}
            }
        }
    }
}

/// Returns true to leave the desktop.
fn handle_key<R: Rng>(state: &mut DesktopState, code: KeyCode, rng: &mut R) -> bool {
    match code {
        KeyCode::Char('q') => return true,
        KeyCode::Esc => {
            if let Some(idx) = state.active_window_idx() {
                let id = state.windows[idx].id.clone();
                state.close_window(&id);
            } else {
                return true;
            }
        }
        KeyCode::Char(' ') | KeyCode::Char('p') => {
            if let Some(idx) = state.active_window_idx() {
                state.windows[idx].playback.toggle();
            }
        }
        KeyCode::Tab => state.cycle_focus(),
        KeyCode::Char('t') => {
            update_settings(|s| {
                let idx = THEMES
                    .iter()
                    .position(|(n, _)| *n == s.theme)
                    .unwrap_or(0);
                s.theme = THEMES[(idx + 1) % THEMES.len()].0.to_string();
            });
            persist_settings();
        }
        KeyCode::Char('c') => {
            update_settings(|s| s.scanlines = !s.scanlines);
            persist_settings();
            state.crt.set_enabled(get_settings().scanlines);
        }
        KeyCode::Left | KeyCode::Up => {
            state.selected_icon = state.selected_icon.saturating_sub(1);
        }
        KeyCode::Right | KeyCode::Down => {
            state.selected_icon =
                (state.selected_icon + 1).min(state.catalog.len().saturating_sub(1));
        }
        KeyCode::Enter => {
            if let Some(record) = state.catalog.get(state.selected_icon).cloned() {
                state.open_record(&record, rng);
            }
        }
        _ => {}
    }
    false
}

fn handle_mouse<R: Rng>(state: &mut DesktopState, mouse: MouseEvent, size: Rect, rng: &mut R) {
    state.cursor_x = mouse.column;
    state.cursor_y = mouse.row;
    let desk = desktop_area(size);
    let p = pointer_of(&mouse);

    match mouse.kind {
        MouseEventKind::Drag(MouseButton::Left) => {
            if let Some(drag) = state.dragging.clone() {
                if let Some(win) = state.windows.iter_mut().find(|w| w.id == drag.window_id) {
                    apply_drag(win, &drag, p);
                    clamp_window(&mut win.rect, desk);
                }
            }
        }
        MouseEventKind::Up(MouseButton::Left) => {
            if let Some(drag) = state.dragging.take() {
                if let Some(win) = state.windows.iter_mut().find(|w| w.id == drag.window_id) {
                    win.dragging = false;
                }
            }
        }
        MouseEventKind::Down(MouseButton::Left) => {
            if let Some((id, hit)) = hit_window(state, p.x, p.y) {
                state.set_focus(&id);
                match hit {
                    WindowHit::Close => state.close_window(&id),
                    WindowHit::Title => begin_drag(state, &id, p),
                    WindowHit::Toggle => {
                        if let Some(win) = state.windows.iter_mut().find(|w| w.id == id) {
                            win.playback.toggle();
                        }
                    }
                    WindowHit::Content => {}
                }
            } else if let Some(idx) = hit_icon(state, desk, p.x, p.y) {
                state.selected_icon = idx;
                let record = state.catalog[idx].clone();
                state.open_record(&record, rng);
            }
        }
        _ => {}
    }
}

fn begin_drag(state: &mut DesktopState, id: &str, p: Pointer) {
    if let Some(win) = state.windows.iter_mut().find(|w| w.id == id) {
        win.dragging = true;
        state.dragging = Some(DragSession {
            window_id: win.id.clone(),
            dx: i32::from(p.x) - win.rect.x,
            dy: i32::from(p.y) - win.rect.y,
        });
    }
}

fn apply_drag(win: &mut LogWindow, drag: &DragSession, p: Pointer) {
    win.rect.x = i32::from(p.x) - drag.dx;
    win.rect.y = i32::from(p.y) - drag.dy;
}

/// Topmost-first: the raised window wins, then the rest in reverse open
/// order.
fn hit_window(state: &DesktopState, x: u16, y: u16) -> Option<(String, WindowHit)> {
    let active = state.active_window_idx();
    if let Some(idx) = active {
        if let Some(hit) = hit_test(&state.windows[idx], x, y) {
            return Some((state.windows[idx].id.clone(), hit));
        }
    }
    for (idx, win) in state.windows.iter().enumerate().rev() {
        if Some(idx) == active {
            continue;
        }
        if let Some(hit) = hit_test(win, x, y) {
            return Some((win.id.clone(), hit));
        }
    }
    None
}

// ── Icon grid ─────────────────────────────────────────────────────────────────

fn icon_cell(desk: Rect, idx: usize) -> Option<Rect> {
    if desk.width < ICON_W + 4 || desk.height < ICON_H + 1 {
        return None;
    }
    let cols = ((desk.width - 4) / ICON_W).max(1) as usize;
    let col = idx % cols;
    let row = idx / cols;
    let x = desk.x + 2 + col as u16 * ICON_W;
    let y = desk.y + 1 + row as u16 * ICON_H;
    if y + ICON_H > desk.y + desk.height {
        return None;
    }
    Some(Rect::new(x, y, ICON_W - 2, ICON_H - 1))
}

fn hit_icon(state: &DesktopState, desk: Rect, x: u16, y: u16) -> Option<usize> {
    (0..state.catalog.len())
        .find(|&i| icon_cell(desk, i).map_or(false, |cell| point_in_rect(x, y, cell)))
}

fn draw_icons(f: &mut Frame, state: &DesktopState, desk: Rect) {
    for (idx, record) in state.catalog.iter().enumerate() {
        let Some(cell) = icon_cell(desk, idx) else {
            continue;
        };
        let corrupt = record.is_corrupt();
        let glyph_style = if corrupt { alert_style() } else { normal_style() };
        let glyph = if corrupt { "[ ERR ]" } else { "[ REC ]" };

        let label_style = if idx == state.selected_icon {
            sel_style()
        } else if corrupt {
            alert_style()
        } else {
            normal_style()
        };
        let title: String = record
            .title
            .chars()
            .take(cell.width as usize)
            .collect();

        let lines = vec![
            Line::from(Span::styled(glyph, glyph_style)),
            Line::from(Span::styled(title, label_style)),
            Line::from(Span::styled(record.date.clone(), dim_style())),
        ];
        f.render_widget(Paragraph::new(lines), cell);
    }
}

// ── Drawing ───────────────────────────────────────────────────────────────────

fn draw_desktop(terminal: &mut Term, state: &mut DesktopState) -> Result<()> {
    let ts = terminal.size()?;
    let desk = desktop_area(full_rect(ts.width, ts.height));
    for win in &mut state.windows {
        clamp_window(&mut win.rect, desk);
    }

    terminal.draw(|f| {
        let size = f.area();
        let top = top_status_area(size);
        let desk = desktop_area(size);
        let bottom = bottom_status_area(size);

        // Fully clear each frame so overlapped windows cannot leak old cells.
        f.render_widget(Clear, size);

        draw_feed(f, &state.feed, desk);
        draw_icons(f, state, desk);

        let active = state.active_window_idx();
        for (idx, win) in state.windows.iter().enumerate() {
            if Some(idx) != active {
                draw_window(f, win, false);
            }
        }
        if let Some(idx) = active {
            draw_window(f, &state.windows[idx], true);
        }

        render_top_bar(f, top, &state.clock);
        render_bottom_bar(f, bottom, &mut state.gauges);

        state.crt.apply(f.buffer_mut(), desk);
        draw_cursor(f, state.cursor_x, state.cursor_y, size);
    })?;
    Ok(())
}

/// Feed lines are anchored to the bottom of the desk, oldest at top, with the
/// idle prompt below the newest line.
fn draw_feed(f: &mut Frame, feed: &TerminalFeed, area: Rect) {
    if area.height == 0 || area.width < 4 {
        return;
    }
    let mut lines: Vec<Line> = feed
        .lines()
        .iter()
        .map(|l| Line::from(Span::styled(l.as_str(), dim_style())))
        .collect();
    let prompt = match feed.phase() {
        FeedPhase::Booting { .. } => "█",
        FeedPhase::Chattering => "_",
    };
    lines.push(Line::from(Span::styled(prompt, dim_style())));

    let visible = area.height as usize;
    let skip = lines.len().saturating_sub(visible);
    let page: Vec<Line> = lines.into_iter().skip(skip).collect();
    let page_h = page.len() as u16;
    let rect = Rect {
        x: area.x + 1,
        y: area.y + area.height - page_h.min(area.height),
        width: area.width - 2,
        height: page_h.min(area.height),
    };
    f.render_widget(Paragraph::new(page), rect);
}

fn draw_cursor(f: &mut Frame, x: u16, y: u16, size: Rect) {
    if point_in_rect(x, y, size) {
        f.buffer_mut().set_style(
            Rect::new(x, y, 1, 1),
            Style::default().add_modifier(Modifier::REVERSED),
        );
    }
}

// ── Areas ─────────────────────────────────────────────────────────────────────

fn full_rect(width: u16, height: u16) -> Rect {
    Rect {
        x: 0,
        y: 0,
        width,
        height,
    }
}

fn top_status_area(size: Rect) -> Rect {
    Rect {
        x: size.x,
        y: size.y,
        width: size.width,
        height: if size.height > 0 { 1 } else { 0 },
    }
}

fn bottom_status_area(size: Rect) -> Rect {
    Rect {
        x: size.x,
        y: size.y + size.height.saturating_sub(1),
        width: size.width,
        height: if size.height > 1 { 1 } else { 0 },
    }
}

fn desktop_area(size: Rect) -> Rect {
    let top = if size.height > 0 { 1 } else { 0 };
    let bottom = if size.height > 1 { 1 } else { 0 };
    Rect {
        x: size.x,
        y: size.y + top,
        width: size.width,
        height: size.height.saturating_sub(top + bottom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::builtin_catalog;
    use crate::window::WinRect;

    fn state() -> DesktopState {
        DesktopState::new(builtin_catalog(), &Settings::default(), Instant::now())
    }

    fn record(state: &DesktopState, id: &str) -> LogRecord {
        state.catalog.iter().find(|r| r.id == id).unwrap().clone()
    }

    #[test]
    fn open_is_idempotent_per_id() {
        let mut s = state();
        let mut rng = rand::thread_rng();
        let rec = record(&s, "log_042");
        s.open_record(&rec, &mut rng);
        s.open_record(&rec, &mut rng);
        assert_eq!(s.windows.len(), 1);
        assert_eq!(s.active_id.as_deref(), Some("log_042"));
    }

    #[test]
    fn opening_corrupt_record_changes_nothing() {
        let mut s = state();
        let mut rng = rand::thread_rng();
        let rec = record(&s, "log_042");
        s.open_record(&rec, &mut rng);
        let err = record(&s, "err_001");
        s.open_record(&err, &mut rng);
        assert_eq!(s.windows.len(), 1);
        assert_eq!(s.active_id.as_deref(), Some("log_042"));
    }

    #[test]
    fn close_of_sole_active_window_clears_focus() {
        let mut s = state();
        let mut rng = rand::thread_rng();
        let rec = record(&s, "log_042");
        s.open_record(&rec, &mut rng);
        s.close_window("log_042");
        assert!(s.windows.is_empty());
        assert_eq!(s.active_id, None);
    }

    #[test]
    fn close_of_last_opened_active_refocuses_previous() {
        let mut s = state();
        let mut rng = rand::thread_rng();
        for id in ["log_042", "log_043", "log_044"] {
            let rec = record(&s, id);
            s.open_record(&rec, &mut rng);
        }
        s.close_window("log_044");
        assert_eq!(s.active_id.as_deref(), Some("log_043"));
        assert!(s.active_window_idx().is_some());
    }

    #[test]
    fn close_of_non_topmost_active_follows_pre_removal_index() {
        // Open order [042, 043], 042 active: the literal rule refocuses to
        // the second-to-last PRE-removal slot, which is 042 itself. The
        // dangling id must resolve to "nothing focused".
        let mut s = state();
        let mut rng = rand::thread_rng();
        let a = record(&s, "log_042");
        let b = record(&s, "log_043");
        s.open_record(&a, &mut rng);
        s.open_record(&b, &mut rng);
        s.set_focus("log_042");
        s.close_window("log_042");
        assert_eq!(s.windows.len(), 1);
        assert_eq!(s.active_id.as_deref(), Some("log_042"));
        assert_eq!(s.active_window_idx(), None);
    }

    #[test]
    fn close_of_inactive_window_keeps_focus() {
        let mut s = state();
        let mut rng = rand::thread_rng();
        let a = record(&s, "log_042");
        let b = record(&s, "log_043");
        s.open_record(&a, &mut rng);
        s.open_record(&b, &mut rng);
        s.close_window("log_042");
        assert_eq!(s.active_id.as_deref(), Some("log_043"));
    }

    #[test]
    fn drag_moves_by_exact_delta_regardless_of_grab_point() {
        let mut s = state();
        let mut rng = rand::thread_rng();
        let rec = record(&s, "log_042");
        s.open_record(&rec, &mut rng);
        s.windows[0].rect = WinRect { x: 10, y: 5, w: 40, h: 12 };

        for grab in [Pointer { x: 11, y: 5 }, Pointer { x: 30, y: 5 }] {
            s.windows[0].rect = WinRect { x: 10, y: 5, w: 40, h: 12 };
            begin_drag(&mut s, "log_042", grab);
            let drag = s.dragging.clone().unwrap();
            let moved = Pointer { x: grab.x + 7, y: grab.y + 3 };
            apply_drag(&mut s.windows[0], &drag, moved);
            assert_eq!(s.windows[0].rect.x, 17);
            assert_eq!(s.windows[0].rect.y, 8);
            s.dragging = None;
            s.windows[0].dragging = false;
        }
    }

    #[test]
    fn body_click_refocus_preserves_positions() {
        let mut s = state();
        let mut rng = rand::thread_rng();
        let a = record(&s, "log_042");
        let b = record(&s, "log_043");
        s.open_record(&a, &mut rng);
        s.open_record(&b, &mut rng);
        let before: Vec<WinRect> = s.windows.iter().map(|w| w.rect).collect();
        s.set_focus("log_042");
        let after: Vec<WinRect> = s.windows.iter().map(|w| w.rect).collect();
        assert_eq!(before, after);
        assert_eq!(s.active_window_idx(), Some(0));
    }

    #[test]
    fn cycle_focus_walks_open_order() {
        let mut s = state();
        let mut rng = rand::thread_rng();
        for id in ["log_042", "log_043"] {
            let rec = record(&s, id);
            s.open_record(&rec, &mut rng);
        }
        s.cycle_focus();
        assert_eq!(s.active_id.as_deref(), Some("log_042"));
        s.cycle_focus();
        assert_eq!(s.active_id.as_deref(), Some("log_043"));
    }

    #[test]
    fn icon_grid_hits_map_back_to_indices() {
        let s = state();
        let desk = Rect::new(0, 1, 80, 22);
        for idx in 0..s.catalog.len() {
            let cell = icon_cell(desk, idx).unwrap();
            assert_eq!(hit_icon(&s, desk, cell.x, cell.y), Some(idx));
        }
        assert_eq!(hit_icon(&s, desk, 79, 21), None);
    }
}
