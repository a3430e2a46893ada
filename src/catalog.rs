use serde::{Deserialize, Serialize};

use crate::config::logs_file;

const SAMPLE_FEED: &str =
    "https://commondatastorage.googleapis.com/gtv-videos-bucket/sample/TearsOfSteel.mp4";

// ── Records ───────────────────────────────────────────────────────────────────

/// A corrupt record carries no source, so only recordings can ever reach the
/// playback path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LogKind {
    Recording { source: String, runtime_secs: f64 },
    Corrupt,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    pub id: String,
    pub title: String,
    pub date: String,
    pub size_label: String,
    #[serde(flatten)]
    pub kind: LogKind,
}

impl LogRecord {
    pub fn is_corrupt(&self) -> bool {
        matches!(self.kind, LogKind::Corrupt)
    }
}

fn recording(id: &str, title: &str, date: &str, size: &str, runtime_secs: f64) -> LogRecord {
    LogRecord {
        id: id.into(),
        title: title.into(),
        date: date.into(),
        size_label: size.into(),
        kind: LogKind::Recording {
            source: SAMPLE_FEED.into(),
            runtime_secs,
        },
    }
}

/// The shipboard log archive compiled into the binary.
pub fn builtin_catalog() -> Vec<LogRecord> {
    vec![
        recording("log_042", "LOG_042: ARRIVAL", "2142-05-12", "142 MB", 734.0),
        recording("log_043", "LOG_043: ANOMALY", "2142-05-13", "98 MB", 734.0),
        recording("log_044", "LOG_044: CONTACT", "2142-05-14", "210 MB", 734.0),
        recording("log_045", "LOG_045: BREACH", "2142-05-15", "45 MB", 734.0),
        LogRecord {
            id: "err_001".into(),
            title: "ERR_DUMP_CORE".into(),
            date: "2142-05-15".into(),
            size_label: "12 KB".into(),
            kind: LogKind::Corrupt,
        },
    ]
}

/// Catalog override, same shape as the other user data files: a `logs.json`
/// next to the settings file replaces the compiled-in archive. Missing,
/// malformed, or empty files fall back to the builtin set.
pub fn load_catalog() -> Vec<LogRecord> {
    let loaded: Vec<LogRecord> = std::fs::read_to_string(logs_file())
        .ok()
        .and_then(|s| serde_json::from_str(&s).ok())
        .unwrap_or_default();
    if loaded.is_empty() {
        builtin_catalog()
    } else {
        loaded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_ids_are_unique() {
        let cat = builtin_catalog();
        for (i, a) in cat.iter().enumerate() {
            for b in &cat[i + 1..] {
                assert_ne!(a.id, b.id);
            }
        }
    }

    #[test]
    fn builtin_has_exactly_one_corrupt_record() {
        let cat = builtin_catalog();
        assert_eq!(cat.iter().filter(|r| r.is_corrupt()).count(), 1);
        assert_eq!(cat.len(), 5);
    }

    #[test]
    fn record_round_trips_through_json() {
        let rec = recording("log_099", "LOG_099: TEST", "2142-06-01", "1 MB", 60.0);
        let json = serde_json::to_string(&rec).unwrap();
        let back: LogRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, rec);
    }

    #[test]
    fn corrupt_record_parses_without_source_fields() {
        let back: LogRecord = serde_json::from_str(
            r#"{"id":"err_002","title":"ERR","date":"2142-06-02","size_label":"3 KB","kind":"corrupt"}"#,
        )
        .unwrap();
        assert!(back.is_corrupt());
    }

    #[test]
    fn malformed_override_falls_back_to_builtin() {
        let loaded: Vec<LogRecord> = serde_json::from_str("{not json").unwrap_or_default();
        assert!(loaded.is_empty());
        assert!(!load_catalog().is_empty());
    }
}
