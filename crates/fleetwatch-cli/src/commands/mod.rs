pub mod control;
pub mod fetch;
pub mod follow;
pub mod watch;

use std::time::Duration;

use fleetwatch_core::{HttpBackend, PlaybackSpeed, WatchConfig};

/// Build the watch configuration from the `--backend` flag and interval.
pub fn make_config(backend: Option<&str>, interval_ms: u64) -> WatchConfig {
    let mut config = match backend {
        Some(url) => WatchConfig::for_backend(url),
        None => WatchConfig::default(),
    };
    config.poll_interval = Duration::from_millis(interval_ms.max(1));
    config
}

/// Build the HTTP client, exiting on an invalid backend URL.
pub fn make_backend(config: WatchConfig) -> HttpBackend {
    match HttpBackend::new(config) {
        Ok(backend) => backend,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

/// Multi-threaded runtime for the poller and command tasks.
pub fn runtime() -> tokio::runtime::Runtime {
    match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to start async runtime: {e}");
            std::process::exit(1);
        }
    }
}

/// Parse a speed multiplier string into a recognized playback speed.
pub fn parse_speed(s: &str) -> PlaybackSpeed {
    match s.trim().parse::<f64>().map(PlaybackSpeed::from_multiplier) {
        Ok(Ok(speed)) => speed,
        Ok(Err(e)) => {
            eprintln!("Error: {e}");
            std::process::exit(2);
        }
        Err(_) => {
            eprintln!("Error: '{s}' is not a number");
            std::process::exit(2);
        }
    }
}

/// Map a TUI key to a playback speed.
pub fn speed_for_key(c: char) -> Option<PlaybackSpeed> {
    match c {
        '1' => Some(PlaybackSpeed::X1),
        '2' => Some(PlaybackSpeed::X2),
        '5' => Some(PlaybackSpeed::X5),
        '0' => Some(PlaybackSpeed::X10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_speed_recognized() {
        assert_eq!(parse_speed("1"), PlaybackSpeed::X1);
        assert_eq!(parse_speed("2"), PlaybackSpeed::X2);
        assert_eq!(parse_speed(" 5 "), PlaybackSpeed::X5);
        assert_eq!(parse_speed("10"), PlaybackSpeed::X10);
    }

    #[test]
    fn test_speed_keys() {
        assert_eq!(speed_for_key('1'), Some(PlaybackSpeed::X1));
        assert_eq!(speed_for_key('0'), Some(PlaybackSpeed::X10));
        assert_eq!(speed_for_key('3'), None);
    }

    #[test]
    fn test_make_config_backend_and_interval() {
        let config = make_config(Some("http://10.0.0.5:8000"), 250);
        assert_eq!(config.backend, "http://10.0.0.5:8000");
        assert_eq!(config.poll_interval, Duration::from_millis(250));
    }

    #[test]
    fn test_make_config_zero_interval_clamped() {
        let config = make_config(Some("http://localhost:8000"), 0);
        assert_eq!(config.poll_interval, Duration::from_millis(1));
    }
}
