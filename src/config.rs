// Defaults for the serial link and the ramp, plus JSON profile loading
use std::path::Path;
use std::time::Duration;

use crate::ramp::RampProfile;

// Serial port for the VESC (USB CDC device)
pub const DEFAULT_PORT: &str = "/dev/ttyACM1";
pub const DEFAULT_BAUDRATE: u32 = 115_200;

// Bound on each serial read/write
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(100);

// Failed writes are retried this many times before escalating
pub const WRITE_RETRIES: u32 = 1;
pub const RETRY_BACKOFF: Duration = Duration::from_millis(20);

// Alive frames during long dwells keep the firmware timeout from stopping the motor
pub const KEEPALIVE_INTERVAL: Duration = Duration::from_millis(100);

// How often a dwell without keepalive checks for an abort request
pub const ABORT_POLL_INTERVAL: Duration = Duration::from_millis(50);

// Ramp defaults
pub const RAMP_STEPS: u32 = 10;
pub const RAMP_DELAY_MS: u64 = 200;
pub const TARGET_DUTY: f64 = 0.5;
pub const HOLD_MS: u64 = 2_000;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Cannot read profile {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid profile JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid ramp profile: {0}")]
    InvalidProfile(String),
}

/// Load a ramp profile from a JSON file; missing fields take the defaults above
pub fn load_profile(path: &Path) -> Result<RampProfile, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_profile(&text)
}

pub fn parse_profile(json: &str) -> Result<RampProfile, ConfigError> {
    Ok(serde_json::from_str(json)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_profile_uses_defaults() {
        let profile = parse_profile(r#"{ "target_duty": 0.3, "steps": 4 }"#).unwrap();
        assert_eq!(profile.target_duty, 0.3);
        assert_eq!(profile.steps, 4);
        assert_eq!(profile.step_delay_ms, RAMP_DELAY_MS);
        assert_eq!(profile.hold_ms, HOLD_MS);
    }

    #[test]
    fn test_empty_profile_is_default() {
        let profile = parse_profile("{}").unwrap();
        assert_eq!(profile, RampProfile::default());
    }

    #[test]
    fn test_bad_json_rejected() {
        assert!(matches!(
            parse_profile(r#"{ "steps": "ten" }"#),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn test_load_profile_from_file() {
        let path = std::env::temp_dir()
            .join(format!("vesc-ramp-profile-{}.json", std::process::id()));
        std::fs::write(&path, r#"{ "target_duty": -0.2, "hold_ms": 500 }"#).unwrap();

        let profile = load_profile(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(profile.target_duty, -0.2);
        assert_eq!(profile.hold_ms, 500);
        assert_eq!(profile.steps, RAMP_STEPS);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = load_profile(Path::new("/nonexistent/vesc-ramp/profile.json"));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }
}
