use serde::{Deserialize, Serialize};

/// Environment variable that overrides the engine binary.
pub const SOX_BIN_ENV: &str = "SOX_BIN";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoxConfig {
    /// Engine executable, looked up on `PATH` unless it is a path itself.
    pub binary: String,
    /// Rate used by the `-r` flag pair.
    pub strict_sample_rate: u32,
}

impl SoxConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(binary) = std::env::var(SOX_BIN_ENV) {
            if !binary.trim().is_empty() {
                config.binary = binary;
            }
        }
        config
    }
}

impl Default for SoxConfig {
    fn default() -> Self {
        Self {
            binary: "sox".to_string(),
            strict_sample_rate: 44100,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SoxConfig::default();
        assert_eq!(config.binary, "sox");
        assert_eq!(config.strict_sample_rate, 44100);
    }

    #[test]
    fn test_partial_json() {
        let config: SoxConfig = serde_json::from_str(r#"{"binary": "/usr/local/bin/sox"}"#).unwrap();
        assert_eq!(config.binary, "/usr/local/bin/sox");
        assert_eq!(config.strict_sample_rate, 44100);
    }
}
