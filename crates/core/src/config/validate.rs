use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Tool paths are not empty
/// - Intervals, timeouts and buffer sizes are non-zero
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.tools.ffmpeg_path.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "tools.ffmpeg_path cannot be empty".to_string(),
        ));
    }

    if config.tools.ffprobe_path.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "tools.ffprobe_path cannot be empty".to_string(),
        ));
    }

    if config.tools.diagnostic_lines == 0 {
        return Err(ConfigError::ValidationError(
            "tools.diagnostic_lines must be at least 1".to_string(),
        ));
    }

    if config.jobs.progress_interval_ms == 0 {
        return Err(ConfigError::ValidationError(
            "jobs.progress_interval_ms cannot be 0".to_string(),
        ));
    }

    if config.subscribers.send_timeout_ms == 0 {
        return Err(ConfigError::ValidationError(
            "subscribers.send_timeout_ms cannot be 0".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_validate_valid_config() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_validate_port_zero_fails() {
        let mut config = Config::default();
        config.server.port = 0;
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_validate_empty_ffprobe_path_fails() {
        let mut config = Config::default();
        config.tools.ffprobe_path = PathBuf::new();
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("ffprobe_path"));
    }

    #[test]
    fn test_validate_zero_interval_fails() {
        let mut config = Config::default();
        config.jobs.progress_interval_ms = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_zero_send_timeout_fails() {
        let mut config = Config::default();
        config.subscribers.send_timeout_ms = 0;
        assert!(validate_config(&config).is_err());
    }
}
