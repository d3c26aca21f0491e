// Diagnostics go to a per-run log file: each invocation starts it empty.

use std::fs::File;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber.
///
/// `RUST_LOG` wins when set; otherwise `default_level` applies. When the file
/// cannot be created the subscriber writes to stderr and the error is
/// returned for the caller to report.
pub fn init(path: &Path, default_level: &str) -> std::io::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_target(false);

    match File::create(path) {
        Ok(file) => {
            let _ = builder.with_writer(Mutex::new(file)).try_init();
            Ok(())
        }
        Err(e) => {
            let _ = builder.with_writer(std::io::stderr).try_init();
            Err(e)
        }
    }
}

/// Level name for a `-v` count.
pub fn level_for(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}
