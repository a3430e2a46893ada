use chrono::Local;
use rand::seq::SliceRandom;
use rand::Rng;
use std::time::{Duration, Instant};

// ── Script & vocabulary ───────────────────────────────────────────────────────

pub const BOOT_SCRIPT: &[&str] = &[
    "SYSTEM_BOOT_SEQUENCE_INIT...",
    "CHECKING_BIO_SENSORS... [OK]",
    "OXYGEN_LEVELS... 98.4%",
    "HULL_INTEGRITY... 100%",
    "CONNECTING_TO_MAIN_FRAME... SUCCESS",
    "DECRYPTING_DAILY_LOGS...",
    "WARNING: MINOR PRESSURE FLUCTUATION IN SECTOR 7",
    "ESTABLISHING_SECURE_CONNECTION...",
    "USER_AUTH: COMMANDER_SHEPARD",
    "LOADING_DESKTOP_ENVIRONMENT_V4.2",
    "SCANNING_EXTERNAL_DRIVES...",
    "NO_THREATS_DETECTED.",
    "STANDBY_FOR_USER_INPUT...",
    "LISTENING_ON_PORT_8080...",
    "MEMORY_USAGE: 14TB / 512PB",
    "RENDERING_INTERFACE...",
    "LOADING_ASSETS...",
    "SYSTEM_READY.",
];

const CHATTER_VOCAB: &[&str] = &[
    "PING 192.168.0.1",
    "UPDATE_PACKET_LOSS",
    "RECALIBRATING_ENGINES",
    "SYNC_COMPLETE",
    "IDLE...",
];

/// 20 retained lines plus the newest.
pub const MAX_FEED_LINES: usize = 21;

/// Upper bound on catch-up steps per tick, so a long stall (suspended
/// terminal, debugger) cannot spin the feed for a whole frame.
const MAX_CATCHUP_STEPS: usize = 120;

// ── State machine ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedPhase {
    Booting { line: usize, chr: usize },
    Chattering,
}

/// Background terminal feed: a typewriter boot script, then synthetic daemon
/// chatter forever. The transition is one-way for the lifetime of the feed.
pub struct TerminalFeed {
    phase: FeedPhase,
    lines: Vec<String>,
    next_due: Instant,
    boot_char_delay: Duration,
    chatter_interval: Duration,
}

impl TerminalFeed {
    pub fn new(
        bootup: bool,
        boot_char_delay: Duration,
        chatter_interval: Duration,
        now: Instant,
    ) -> Self {
        let phase = if bootup {
            FeedPhase::Booting { line: 0, chr: 0 }
        } else {
            FeedPhase::Chattering
        };
        let mut feed = Self {
            phase,
            lines: Vec::new(),
            next_due: now,
            boot_char_delay,
            chatter_interval,
        };
        feed.next_due = now + feed.cadence();
        feed
    }

    pub fn phase(&self) -> FeedPhase {
        self.phase
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    fn cadence(&self) -> Duration {
        match self.phase {
            FeedPhase::Booting { .. } => self.boot_char_delay,
            FeedPhase::Chattering => self.chatter_interval,
        }
    }

    /// Advance past every due deadline. Bounded, so the buffer invariant holds
    /// regardless of how late the caller is.
    pub fn tick<R: Rng>(&mut self, now: Instant, rng: &mut R) {
        let mut steps = 0;
        while now >= self.next_due {
            self.step(rng);
            self.next_due += self.cadence();
            steps += 1;
            if steps >= MAX_CATCHUP_STEPS {
                self.next_due = now + self.cadence();
                break;
            }
        }
    }

    fn step<R: Rng>(&mut self, rng: &mut R) {
        match self.phase {
            FeedPhase::Booting { line, chr } => self.step_boot(line, chr),
            FeedPhase::Chattering => self.push_chatter(rng),
        }
    }

    /// Reveal one more character of the current script line. The partial line
    /// replaces the buffer slot in place; a completed line advances the
    /// cursor, and exhausting the script flips the phase for good.
    fn step_boot(&mut self, line: usize, chr: usize) {
        let Some(target) = BOOT_SCRIPT.get(line) else {
            self.phase = FeedPhase::Chattering;
            return;
        };
        let total = target.chars().count();
        let revealed: String = target.chars().take(chr + 1).collect();
        if self.lines.len() > line {
            self.lines[line] = revealed;
        } else {
            self.lines.push(revealed);
        }

        self.phase = if chr + 1 >= total {
            if line + 1 >= BOOT_SCRIPT.len() {
                FeedPhase::Chattering
            } else {
                FeedPhase::Booting {
                    line: line + 1,
                    chr: 0,
                }
            }
        } else {
            FeedPhase::Booting { line, chr: chr + 1 }
        };
    }

    fn push_chatter<R: Rng>(&mut self, rng: &mut R) {
        let cmd = CHATTER_VOCAB.choose(rng).copied().unwrap_or("IDLE...");
        let stamp = Local::now().timestamp_millis();
        self.lines.push(format!("sys_daemon@root: {cmd} [{stamp}]"));
        let excess = self.lines.len().saturating_sub(MAX_FEED_LINES);
        if excess > 0 {
            self.lines.drain(..excess);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed() -> TerminalFeed {
        TerminalFeed::new(
            true,
            Duration::from_millis(20),
            Duration::from_secs(3),
            Instant::now(),
        )
    }

    #[test]
    fn boot_reveals_script_character_by_character() {
        let mut f = feed();
        let mut rng = rand::thread_rng();

        f.step(&mut rng);
        assert_eq!(f.lines(), &["S".to_string()]);

        let remaining: usize = BOOT_SCRIPT.iter().map(|l| l.chars().count()).sum::<usize>() - 1;
        for _ in 0..remaining {
            assert!(matches!(f.phase(), FeedPhase::Booting { .. }));
            f.step(&mut rng);
        }

        assert_eq!(f.phase(), FeedPhase::Chattering);
        let full: Vec<String> = BOOT_SCRIPT.iter().map(|l| l.to_string()).collect();
        assert_eq!(f.lines(), &full[..]);
    }

    #[test]
    fn partial_line_replaces_buffer_tail_in_place() {
        let mut f = feed();
        let mut rng = rand::thread_rng();
        for _ in 0..3 {
            f.step(&mut rng);
        }
        assert_eq!(f.lines(), &["SYS".to_string()]);
    }

    #[test]
    fn chatter_caps_buffer_at_max_lines() {
        let mut f = TerminalFeed::new(
            false,
            Duration::from_millis(20),
            Duration::from_secs(3),
            Instant::now(),
        );
        let mut rng = rand::thread_rng();
        for _ in 0..500 {
            f.step(&mut rng);
            assert!(f.lines().len() <= MAX_FEED_LINES);
        }
        assert_eq!(f.lines().len(), MAX_FEED_LINES);
        assert!(f.lines()[0].starts_with("sys_daemon@root: "));
    }

    #[test]
    fn transition_is_one_way() {
        let mut f = feed();
        let mut rng = rand::thread_rng();
        let total: usize = BOOT_SCRIPT.iter().map(|l| l.chars().count()).sum();
        for _ in 0..total + 50 {
            f.step(&mut rng);
        }
        assert_eq!(f.phase(), FeedPhase::Chattering);
    }

    #[test]
    fn tick_catch_up_is_bounded() {
        let start = Instant::now();
        let mut f = TerminalFeed::new(
            false,
            Duration::from_millis(20),
            Duration::from_millis(1),
            start,
        );
        let mut rng = rand::thread_rng();
        // Ten seconds late: far more deadlines than the per-tick bound.
        f.tick(start + Duration::from_secs(10), &mut rng);
        assert_eq!(f.lines().len(), MAX_FEED_LINES);
    }

    #[test]
    fn disabled_bootup_starts_in_chatter() {
        let f = TerminalFeed::new(
            false,
            Duration::from_millis(20),
            Duration::from_secs(3),
            Instant::now(),
        );
        assert_eq!(f.phase(), FeedPhase::Chattering);
        assert!(f.lines().is_empty());
    }
}
