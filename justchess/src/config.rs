//! Runtime configuration for justchess.
//!
//! Every value has a compile-time default and can be overridden through a
//! dedicated environment variable. Command-line flags take precedence over
//! both.

use std::path::PathBuf;

/// Default engine skill level (0-20).
const DEFAULT_SKILL_LEVEL: u8 = 5;

/// Default pause before the random mover answers (in milliseconds).
const DEFAULT_THINK_DELAY_MS: u64 = 600;

/// Machine opponent backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum EngineKind {
    /// Random legal moves after a short pause.
    Random,
    /// A UCI engine subprocess.
    Stockfish,
}

/// Get the machine opponent backend.
///
/// Priority:
/// 1. `JUSTCHESS_ENGINE` env variable (`random` or `stockfish`)
/// 2. `random` as fallback
pub fn get_engine_kind() -> EngineKind {
    match std::env::var("JUSTCHESS_ENGINE") {
        Ok(value) if value.eq_ignore_ascii_case("stockfish") => EngineKind::Stockfish,
        _ => EngineKind::Random,
    }
}

/// Get an explicit engine binary path. `None` searches common install
/// locations.
pub fn get_stockfish_path() -> Option<PathBuf> {
    std::env::var("JUSTCHESS_STOCKFISH_PATH")
        .ok()
        .filter(|p| !p.is_empty())
        .map(PathBuf::from)
}

/// Get the engine skill level.
///
/// Priority:
/// 1. `JUSTCHESS_SKILL_LEVEL` env variable if set (falls back to the default
///    if it does not parse; capped at 20)
/// 2. `5` as fallback
pub fn get_skill_level() -> u8 {
    if let Ok(level) = std::env::var("JUSTCHESS_SKILL_LEVEL") {
        return level.parse::<u8>().unwrap_or(DEFAULT_SKILL_LEVEL).min(20);
    }

    DEFAULT_SKILL_LEVEL
}

/// Get the random mover's thinking delay in milliseconds.
pub fn get_think_delay_ms() -> u64 {
    if let Ok(delay) = std::env::var("JUSTCHESS_THINK_DELAY_MS") {
        return delay.parse().unwrap_or(DEFAULT_THINK_DELAY_MS);
    }

    DEFAULT_THINK_DELAY_MS
}

/// Get the log file path. Logs go to stderr when unset.
pub fn get_log_path() -> Option<PathBuf> {
    std::env::var("JUSTCHESS_LOG_PATH")
        .ok()
        .filter(|p| !p.is_empty())
        .map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_engine_kind() {
        let kind = get_engine_kind();
        match std::env::var("JUSTCHESS_ENGINE") {
            Ok(val) if val.eq_ignore_ascii_case("stockfish") => {
                assert_eq!(kind, EngineKind::Stockfish)
            }
            _ => assert_eq!(kind, EngineKind::Random),
        }
    }

    #[test]
    fn test_get_skill_level_in_range() {
        let level = get_skill_level();
        assert!(level <= 20);
        if std::env::var("JUSTCHESS_SKILL_LEVEL").is_err() {
            assert_eq!(level, DEFAULT_SKILL_LEVEL);
        }
    }

    #[test]
    fn test_get_think_delay_ms_default() {
        if std::env::var("JUSTCHESS_THINK_DELAY_MS").is_err() {
            assert_eq!(get_think_delay_ms(), DEFAULT_THINK_DELAY_MS);
        }
    }

    #[test]
    fn test_get_log_path() {
        match std::env::var("JUSTCHESS_LOG_PATH") {
            Ok(val) if !val.is_empty() => assert_eq!(get_log_path(), Some(PathBuf::from(val))),
            _ => assert_eq!(get_log_path(), None),
        }
    }
}
