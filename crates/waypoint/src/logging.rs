use std::io::Write;

use env_logger::{Builder, Env};

/// Install the global logger.
///
/// Lines read `[INFO    ] message`, lining up with interactive prompts.
/// `RUST_LOG` takes precedence over `debug`.
pub fn init(debug: bool) -> Result<(), log::SetLoggerError> {
    let default_level = if debug { "debug" } else { "info" };
    Builder::from_env(Env::default().default_filter_or(default_level))
        .format(|buf, record| writeln!(buf, "[{:<8}] {}", record.level().as_str(), record.args()))
        .try_init()
}
