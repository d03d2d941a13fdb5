use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

/// Command-line configuration.
#[derive(Debug, Clone, Parser)]
#[command(name = "coltab", version, about = "Terminal table with formula-bound columns")]
pub struct Config {
    /// Project file to open at start.
    pub project: Option<PathBuf>,

    /// Auto-update period in milliseconds.
    #[arg(long, default_value_t = 2000, value_parser = clap::value_parser!(u64).range(1..))]
    pub interval_ms: u64,

    /// Start with timer-driven recomputation switched off.
    #[arg(long)]
    pub no_auto_update: bool,

    /// Write logs to this file (filtered by RUST_LOG, default "info").
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl Config {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::try_parse_from(["coltab"]).unwrap();
        assert_eq!(config.interval(), Duration::from_secs(2));
        assert!(!config.no_auto_update);
        assert!(config.project.is_none());
        assert!(config.log_file.is_none());
    }

    #[test]
    fn test_all_options() {
        let config = Config::try_parse_from([
            "coltab",
            "data.json",
            "--interval-ms",
            "500",
            "--no-auto-update",
            "--log-file",
            "coltab.log",
        ])
        .unwrap();
        assert_eq!(config.project, Some(PathBuf::from("data.json")));
        assert_eq!(config.interval(), Duration::from_millis(500));
        assert!(config.no_auto_update);
        assert_eq!(config.log_file, Some(PathBuf::from("coltab.log")));
    }

    #[test]
    fn test_zero_interval_is_rejected() {
        assert!(Config::try_parse_from(["coltab", "--interval-ms", "0"]).is_err());
    }
}
