use std::{fs::File, io, path::Path, sync::Mutex};
use tracing_subscriber::{filter::LevelFilter, fmt, prelude::*, EnvFilter};

/// level used when RUST_LOG is not set
pub fn level_for(verbosity: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::OFF;
    }

    match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

/// install the global subscriber, logs go to stderr and optionally to `log_file`
pub fn setup_logging(verbosity: u8, quiet: bool, log_file: Option<&Path>) -> io::Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(level_for(verbosity, quiet).into())
        .from_env_lossy();

    let stderr_layer = fmt::layer()
        .with_writer(io::stderr)
        .with_target(false)
        .compact();

    let file_layer = match log_file {
        Some(path) => {
            let file = File::create(path)?;

            Some(
                fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false)
                    .with_target(true),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::level_for;
    use tracing_subscriber::filter::LevelFilter;

    #[test]
    fn verbosity_raises_level() {
        assert_eq!(level_for(0, false), LevelFilter::WARN);
        assert_eq!(level_for(1, false), LevelFilter::INFO);
        assert_eq!(level_for(2, false), LevelFilter::DEBUG);
        assert_eq!(level_for(7, false), LevelFilter::TRACE);
    }

    #[test]
    fn quiet_wins() {
        assert_eq!(level_for(3, true), LevelFilter::OFF);
    }
}
