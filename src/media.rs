use std::time::Duration;

/// Delay before the engine reports a duration, standing in for the host
/// decoder's asynchronous metadata load. Progress is pinned to 0 until then.
const METADATA_PROBE: Duration = Duration::from_millis(400);

/// Playback state for one log window.
///
/// `is_playing` is the *control* state shown to the user; the engine clock is
/// tracked separately so a blocked autoplay leaves the control state at its
/// requested value while the clock stays parked, exactly like a media element
/// whose `play()` promise was rejected.
#[derive(Debug, Clone)]
pub struct Playback {
    source: String,
    is_playing: bool,
    advancing: bool,
    current: f64,
    duration: Option<f64>,
    runtime_hint: f64,
    probe_remaining: Duration,
    looping: bool,
}

impl Playback {
    /// Attach a source. When `autostart` is requested but the platform policy
    /// refuses unsolicited playback, the refusal is swallowed and logged.
    pub fn open(source: &str, runtime_secs: f64, autostart: bool, autoplay_allowed: bool) -> Self {
        let mut p = Self {
            source: source.to_string(),
            is_playing: autostart,
            advancing: false,
            current: 0.0,
            duration: None,
            runtime_hint: runtime_secs,
            probe_remaining: METADATA_PROBE,
            looping: true,
        };
        if autostart {
            if autoplay_allowed {
                p.advancing = true;
            } else {
                log::warn!("autoplay blocked for {}", p.source);
            }
        }
        p
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn position(&self) -> f64 {
        self.current
    }

    pub fn duration(&self) -> Option<f64> {
        self.duration
    }

    /// Pause if playing, else play.
    pub fn toggle(&mut self) {
        self.advancing = !self.is_playing;
        self.is_playing = !self.is_playing;
    }

    /// Idempotent end-of-stream reset. With looping enabled the engine never
    /// reaches it on its own.
    pub fn ended(&mut self) {
        self.is_playing = false;
        self.advancing = false;
    }

    /// Percentage in [0, 100]; 0 whenever the duration is unknown or zero.
    pub fn progress(&self) -> f64 {
        match self.duration {
            Some(d) if d > 0.0 => ((self.current / d) * 100.0).clamp(0.0, 100.0),
            _ => 0.0,
        }
    }

    /// Time-update from the event loop.
    pub fn tick(&mut self, dt: Duration) {
        if self.duration.is_none() {
            self.probe_remaining = self.probe_remaining.saturating_sub(dt);
            if self.probe_remaining.is_zero() {
                self.duration = Some(self.runtime_hint);
            }
        }
        if !self.advancing {
            return;
        }
        let Some(d) = self.duration else { return };
        if d <= 0.0 {
            return;
        }
        self.current += dt.as_secs_f64();
        if self.current >= d {
            if self.looping {
                self.current %= d;
            } else {
                self.current = d;
                self.ended();
            }
        }
    }
}

/// "MM:SS" readout for the control row.
pub fn timestamp_label(secs: f64) -> String {
    let whole = secs.max(0.0) as u64;
    format!("{:02}:{:02}", whole / 60, whole % 60)
}
