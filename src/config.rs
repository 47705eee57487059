use crate::error::{EcError, EcResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncoderConfig {
    /// Bytes allocated for the output buffer up front.
    pub initial_capacity: usize,
    /// Hard cap on output buffer storage. Growth past it is reported as an
    /// allocation failure.
    pub storage_limit: Option<usize>,
    pub measure_overhead: bool,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 0,
            storage_limit: None,
            measure_overhead: false,
        }
    }
}

impl EncoderConfig {
    pub fn with_capacity(initial_capacity: usize) -> Self {
        Self {
            initial_capacity,
            ..Self::default()
        }
    }

    pub fn storage_limit(mut self, limit: usize) -> Self {
        self.storage_limit = Some(limit);
        self
    }

    pub fn measure_overhead(mut self, enabled: bool) -> Self {
        self.measure_overhead = enabled;
        self
    }

    pub fn validate(&self) -> EcResult<()> {
        if let Some(limit) = self.storage_limit {
            if self.initial_capacity > limit {
                return Err(EcError::InvalidConfig(format!(
                    "initial capacity {} exceeds storage limit {}",
                    self.initial_capacity, limit
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let config = EncoderConfig::with_capacity(64)
            .storage_limit(128)
            .measure_overhead(true);
        assert_eq!(config.initial_capacity, 64);
        assert_eq!(config.storage_limit, Some(128));
        assert!(config.measure_overhead);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_capacity_above_limit_rejected() {
        let config = EncoderConfig::with_capacity(256).storage_limit(16);
        assert!(matches!(
            config.validate(),
            Err(EcError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_json_roundtrip() {
        let config = EncoderConfig::with_capacity(32).storage_limit(4096);
        let json = serde_json::to_string(&config).unwrap();
        let back: EncoderConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, back);
    }
}
