pub mod config;
pub mod parser;
pub mod rrule;

use env_logger::Env;
use std::io::Write;

/// Install the timestamped logger; `RUST_LOG` overrides the default `info` level.
/// Later calls are no-ops.
pub fn init_logger() {
    let _ = env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .try_init();
}

// Re-export commonly used types
pub use config::ParserConfig;
pub use parser::{parse_reminder, parse_reminder_at, parse_reminder_with, ParseResult, ParserOptions, RecurrenceInfo};
pub use rrule::RecurrenceRule;
