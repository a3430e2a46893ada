use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{OnceLock, RwLock};

// ── Paths ─────────────────────────────────────────────────────────────────────

pub fn base_dir() -> PathBuf {
    let d = dirs::config_dir()
        .map(|p| p.join("nostromos"))
        .unwrap_or_else(|| PathBuf::from("."));
    let _ = std::fs::create_dir_all(&d);
    d
}

pub fn settings_file() -> PathBuf {
    base_dir().join("settings.json")
}

pub fn logs_file() -> PathBuf {
    base_dir().join("logs.json")
}

pub fn log_file() -> PathBuf {
    base_dir().join("nostromos.log")
}

// ── JSON helpers ──────────────────────────────────────────────────────────────

pub fn load_json<T: for<'de> Deserialize<'de> + Default>(path: &Path) -> T {
    std::fs::read_to_string(path)
        .ok()
        .and_then(|s| serde_json::from_str(&s).ok())
        .unwrap_or_default()
}

pub fn save_json<T: Serialize>(path: &Path, data: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(data)?;
    std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))
}

// ── Settings ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Run the scripted boot feed before the idle chatter starts.
    pub bootup: bool,
    /// Platform autoplay policy: when false, unsolicited playback is refused.
    pub autoplay: bool,
    pub scanlines: bool,
    pub theme: String,
    #[serde(default = "default_boot_char_ms")]
    pub boot_char_ms: u64,
    #[serde(default = "default_chatter_interval_ms")]
    pub chatter_interval_ms: u64,
}

const fn default_boot_char_ms() -> u64 {
    20
}

const fn default_chatter_interval_ms() -> u64 {
    3000
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bootup: true,
            autoplay: true,
            scanlines: true,
            theme: "Cyan (Default)".into(),
            boot_char_ms: default_boot_char_ms(),
            chatter_interval_ms: default_chatter_interval_ms(),
        }
    }
}

pub fn load_settings() -> Settings {
    load_json(&settings_file())
}

pub fn save_settings(d: &Settings) {
    let _ = save_json(&settings_file(), d);
}

// ── Global mutable state ──────────────────────────────────────────────────────

static APP_SETTINGS: OnceLock<RwLock<Settings>> = OnceLock::new();

fn settings_lock() -> &'static RwLock<Settings> {
    APP_SETTINGS.get_or_init(|| RwLock::new(Settings::default()))
}

pub fn get_settings() -> Settings {
    settings_lock()
        .read()
        .map(|g| g.clone())
        .unwrap_or_default()
}

pub fn reload_settings() {
    let s = load_settings();
    if let Ok(mut guard) = settings_lock().write() {
        *guard = s;
    }
}

pub fn update_settings<F: FnOnce(&mut Settings)>(f: F) {
    if let Ok(mut guard) = settings_lock().write() {
        f(&mut guard);
    }
}

pub fn persist_settings() {
    let s = get_settings();
    save_settings(&s);
}

// ── Themes ────────────────────────────────────────────────────────────────────

use ratatui::style::Color;

pub const THEMES: &[(&str, Color)] = &[
    ("Cyan (Default)", Color::Cyan),
    ("Green", Color::Green),
    ("Amber", Color::Yellow),
    ("White", Color::White),
    ("Blue", Color::Blue),
    ("Red", Color::Red),
    ("Purple", Color::Magenta),
];

pub fn theme_color(name: &str) -> Color {
    THEMES
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, c)| *c)
        .unwrap_or(Color::Cyan)
}

pub fn current_theme_color() -> Color {
    theme_color(&get_settings().theme)
}

// ── Shipboard identity ────────────────────────────────────────────────────────

pub const SYSTEM_NAME: &str = "USCSS_NOSTROMO";
pub const SYSTEM_TAG: &str = "SYS_VER_4.2.1 // ORBITAL_MODE";
pub const FOOTER_NOTICE: &str = "AUTHORIZED PERSONNEL ONLY";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_theme_falls_back_to_cyan() {
        assert_eq!(theme_color("Chartreuse"), Color::Cyan);
        assert_eq!(theme_color("Amber"), Color::Yellow);
    }

    #[test]
    fn settings_round_trip_keeps_cadence_fields() {
        let mut s = Settings::default();
        s.boot_char_ms = 5;
        s.chatter_interval_ms = 100;
        let json = serde_json::to_string(&s).unwrap();
        let back: Settings = serde_json::from_str(&json).unwrap();
        assert_eq!(back.boot_char_ms, 5);
        assert_eq!(back.chatter_interval_ms, 100);
    }

    #[test]
    fn missing_cadence_fields_use_defaults() {
        let back: Settings = serde_json::from_str(
            r#"{"bootup":false,"autoplay":true,"scanlines":true,"theme":"Green"}"#,
        )
        .unwrap();
        assert!(!back.bootup);
        assert_eq!(back.boot_char_ms, 20);
        assert_eq!(back.chatter_interval_ms, 3000);
    }
}
