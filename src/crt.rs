use rand::Rng;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
};
use std::time::{Duration, Instant};

/// One full sweep of the moving scanline band.
const SWEEP: Duration = Duration::from_secs(8);

/// Decorative CRT treatment: dimmed raster rows, a band sweeping down the
/// screen, and an occasional whole-frame flicker. Applied as a style pass
/// over the finished buffer; purely cosmetic.
pub struct CrtOverlay {
    enabled: bool,
    phase: f32,
    flicker: bool,
    last: Instant,
}

impl CrtOverlay {
    pub fn new(enabled: bool, now: Instant) -> Self {
        Self {
            enabled,
            phase: 0.0,
            flicker: false,
            last: now,
        }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn tick<R: Rng>(&mut self, now: Instant, rng: &mut R) {
        let dt = now.saturating_duration_since(self.last);
        self.last = now;
        if !self.enabled {
            return;
        }
        self.phase = (self.phase + dt.as_secs_f32() / SWEEP.as_secs_f32()) % 1.0;
        self.flicker = rng.gen_ratio(1, 12);
    }

    pub fn apply(&self, buf: &mut Buffer, area: Rect) {
        if !self.enabled || area.width == 0 || area.height == 0 {
            return;
        }

        // Static raster: every other row dimmed.
        for row in (0..area.height).step_by(2) {
            buf.set_style(
                Rect::new(area.x, area.y + row, area.width, 1),
                Style::default().add_modifier(Modifier::DIM),
            );
        }

        // Moving band, ~20% of the screen tall, brightened.
        let band_h = (area.height / 5).max(1);
        let span = i32::from(area.height + band_h);
        let top = (self.phase * span as f32) as i32 - i32::from(band_h);
        for r in 0..i32::from(band_h) {
            let y = top + r;
            if y >= 0 && (y as u16) < area.height {
                buf.set_style(
                    Rect::new(area.x, area.y + y as u16, area.width, 1),
                    Style::default().add_modifier(Modifier::BOLD),
                );
            }
        }

        if self.flicker {
            buf.set_style(area, Style::default().add_modifier(Modifier::DIM));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_stays_normalized_across_long_gaps() {
        let start = Instant::now();
        let mut crt = CrtOverlay::new(true, start);
        let mut rng = rand::thread_rng();
        crt.tick(start + Duration::from_secs(100), &mut rng);
        assert!(crt.phase >= 0.0 && crt.phase < 1.0);
    }

    #[test]
    fn disabled_overlay_leaves_buffer_untouched() {
        let area = Rect::new(0, 0, 10, 6);
        let mut buf = Buffer::empty(area);
        let before = buf.clone();
        let crt = CrtOverlay::new(false, Instant::now());
        crt.apply(&mut buf, area);
        assert_eq!(buf, before);
    }

    #[test]
    fn raster_dims_alternate_rows() {
        let area = Rect::new(0, 0, 4, 4);
        let mut buf = Buffer::empty(area);
        let mut crt = CrtOverlay::new(true, Instant::now());
        crt.flicker = false;
        crt.apply(&mut buf, area);
        let top = buf.cell((0, 0)).unwrap().style();
        let next = buf.cell((0, 1)).unwrap().style();
        assert!(top.add_modifier.contains(Modifier::DIM));
        assert!(!next.add_modifier.contains(Modifier::DIM));
    }
}
