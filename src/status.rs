use chrono::{DateTime, Local};
use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::config::{FOOTER_NOTICE, SYSTEM_NAME, SYSTEM_TAG};
use crate::ui::{sel_style, write_text};

// ── Clock ─────────────────────────────────────────────────────────────────────

/// Status-bar clock. Formatted strings are cached and recomputed only when
/// the observed second changes; the event loop is the timer.
pub struct StatusClock {
    date: String,
    time: String,
    stamp: i64,
}

impl StatusClock {
    pub fn new(now: DateTime<Local>) -> Self {
        Self {
            date: iso_date(now),
            time: clock_time(now),
            stamp: now.timestamp(),
        }
    }

    /// Returns true when the display strings changed.
    pub fn refresh(&mut self, now: DateTime<Local>) -> bool {
        let stamp = now.timestamp();
        if stamp == self.stamp {
            return false;
        }
        self.stamp = stamp;
        self.date = iso_date(now);
        self.time = clock_time(now);
        true
    }

    pub fn date(&self) -> &str {
        &self.date
    }

    pub fn time(&self) -> &str {
        &self.time
    }
}

fn iso_date(now: DateTime<Local>) -> String {
    now.format("%Y-%m-%d").to_string()
}

fn clock_time(now: DateTime<Local>) -> String {
    now.format("%H:%M:%S").to_string()
}

// ── Cached battery probe ──────────────────────────────────────────────────────

struct BattCache {
    pct: Option<f32>,
    ts: Instant,
}
static BATT: Mutex<Option<BattCache>> = Mutex::new(None);

fn battery_pct() -> Option<f32> {
    let mut guard = BATT.lock().ok()?;
    if guard.as_ref().map_or(true, |c| c.ts.elapsed() > Duration::from_secs(30)) {
        let pct = read_battery_linux();
        *guard = Some(BattCache { pct, ts: Instant::now() });
    }
    guard.as_ref().and_then(|c| c.pct)
}

fn read_battery_linux() -> Option<f32> {
    for entry in std::fs::read_dir("/sys/class/power_supply").ok()? {
        let path = entry.ok()?.path();
        let kind = std::fs::read_to_string(path.join("type")).ok()?;
        if kind.trim() == "Battery" {
            let cap = std::fs::read_to_string(path.join("capacity")).ok()?;
            return cap.trim().parse().ok();
        }
    }
    None
}

/// Shore power reads as the fixed shipboard figure.
fn power_display() -> String {
    match battery_pct() {
        Some(p) => format!("PWR_{p:.0}%"),
        None => "PWR_98%".to_string(),
    }
}

// ── System gauges ─────────────────────────────────────────────────────────────

/// Footer memory/CPU readout via sysinfo, refreshed on a 5s cadence.
pub struct SystemGauges {
    sys: sysinfo::System,
    line: String,
    refreshed: Option<Instant>,
}

impl SystemGauges {
    pub fn new() -> Self {
        Self {
            sys: sysinfo::System::new(),
            line: String::new(),
            refreshed: None,
        }
    }

    pub fn readout(&mut self) -> &str {
        let stale = self
            .refreshed
            .map_or(true, |at| at.elapsed() > Duration::from_secs(5));
        if stale {
            self.sys.refresh_memory();
            self.sys.refresh_cpu_usage();
            let used = self.sys.used_memory() as f64 / 1_073_741_824.0;
            let total = self.sys.total_memory() as f64 / 1_073_741_824.0;
            let cpu = self.sys.global_cpu_usage();
            self.line = format!("CORE {cpu:.0}% // MEM {used:.1}/{total:.1}GB");
            self.refreshed = Some(Instant::now());
        }
        &self.line
    }
}

// ── Bars ──────────────────────────────────────────────────────────────────────

pub fn render_top_bar(f: &mut Frame, area: Rect, clock: &StatusClock) {
    if area.height == 0 || area.width == 0 {
        return;
    }
    let width = area.width as usize;
    let mut row = vec![' '; width];

    write_text(&mut row, 0, &format!(" {SYSTEM_NAME}  {SYSTEM_TAG}"));
    let right = format!("UPLINK_OK  {}  {} {} ", power_display(), clock.date(), clock.time());
    if width > right.len() {
        write_text(&mut row, width - right.len(), &right);
    }

    let line: String = row.into_iter().collect();
    f.render_widget(
        Paragraph::new(Line::from(Span::styled(line, sel_style()))),
        area,
    );
}

pub fn render_bottom_bar(f: &mut Frame, area: Rect, gauges: &mut SystemGauges) {
    if area.height == 0 || area.width == 0 {
        return;
    }
    let width = area.width as usize;
    let mut row = vec![' '; width];

    write_text(&mut row, 0, &format!(" {}", gauges.readout()));
    let right = format!("{FOOTER_NOTICE} ");
    if width > right.len() {
        write_text(&mut row, width - right.len(), &right);
    }

    let line: String = row.into_iter().collect();
    f.render_widget(
        Paragraph::new(Line::from(Span::styled(line, sel_style()))),
        area,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_string_is_iso_shaped() {
        let clock = StatusClock::new(Local::now());
        let d = clock.date();
        assert_eq!(d.len(), 10);
        assert_eq!(&d[4..5], "-");
        assert_eq!(&d[7..8], "-");
        assert!(d.chars().filter(|c| c.is_ascii_digit()).count() == 8);
    }

    #[test]
    fn time_string_is_24h_shaped() {
        let clock = StatusClock::new(Local::now());
        let t = clock.time();
        assert_eq!(t.len(), 8);
        assert_eq!(&t[2..3], ":");
        assert_eq!(&t[5..6], ":");
        let hh: u32 = t[0..2].parse().unwrap();
        assert!(hh < 24);
    }

    #[test]
    fn refresh_is_a_noop_within_the_same_second() {
        let now = Local::now();
        let mut clock = StatusClock::new(now);
        assert!(!clock.refresh(now));
        assert!(clock.refresh(now + chrono::Duration::seconds(1)));
    }
}
