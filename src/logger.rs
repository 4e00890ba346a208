use std::io::{self, Write};

use env_logger::{fmt::Formatter, Env, WriteStyle};
use log::{Level, LevelFilter, Record};

/// Filter directives in this variable replace the `-v`/`-q` level,
/// e.g. `UPMANY_LOG=upmany::schedule=trace`.
pub const LOG_ENV_VAR: &str = "UPMANY_LOG";

pub fn init(verbosity: i8, style: WriteStyle) {
    env_logger::Builder::new()
        .format(format)
        .filter_level(level_filter(verbosity))
        .parse_env(Env::new().filter(LOG_ENV_VAR))
        .write_style(style)
        .init();
}

/// Maps `verbose - quiet` to a level, `info` being the default.
pub fn level_filter(verbosity: i8) -> LevelFilter {
    match verbosity {
        i8::MIN..=-3 => LevelFilter::Off,
        -2 => LevelFilter::Error,
        -1 => LevelFilter::Warn,
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

fn format(f: &mut Formatter, record: &Record) -> io::Result<()> {
    let args = record.args();
    let level = record.level();
    match level_prefix(level) {
        Some(prefix) => {
            let style = f.default_level_style(level);
            writeln!(f, "{style}{prefix}{style:#}{args}")
        }
        None if level >= Level::Debug => {
            let style = f.default_level_style(level);
            writeln!(f, "{style}{args}{style:#}")
        }
        None => writeln!(f, "{args}"),
    }
}

fn level_prefix(level: Level) -> Option<&'static str> {
    match level {
        Level::Debug | Level::Trace | Level::Info => None,
        Level::Warn => Some("warning: "),
        Level::Error => Some("error: "),
    }
}

#[cfg(test)]
mod tests {
    use log::LevelFilter;

    use super::level_filter;

    #[test]
    fn verbosity_maps_to_levels() {
        assert_eq!(level_filter(0), LevelFilter::Info);
        assert_eq!(level_filter(1), LevelFilter::Debug);
        assert_eq!(level_filter(5), LevelFilter::Trace);
        assert_eq!(level_filter(-1), LevelFilter::Warn);
        assert_eq!(level_filter(-2), LevelFilter::Error);
        assert_eq!(level_filter(-7), LevelFilter::Off);
    }
}
