use std::fs::OpenOptions;
use std::sync::Once;

use crate::config::log_file;

static INIT: Once = Once::new();

/// Initializes the global logger once; subsequent calls are ignored.
///
/// Output is piped to a file under the config directory so diagnostics never
/// bleed into the alternate screen. `RUST_LOG` selects the filter, defaulting
/// to `info`.
pub fn init() {
    INIT.call_once(|| {
        let mut builder = env_logger::Builder::new();

        if let Ok(filter) = std::env::var("RUST_LOG") {
            builder.parse_filters(&filter);
        } else {
            builder.filter_level(log::LevelFilter::Info);
        }

        if let Ok(file) = OpenOptions::new().create(true).append(true).open(log_file()) {
            builder.target(env_logger::Target::Pipe(Box::new(file)));
        }

        let _ = builder.try_init();
        log::debug!("logging initialized");
    });
}
