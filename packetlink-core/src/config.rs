//! Link configuration

use crate::constants::{DEFAULT_BLOCK_LEN, DEFAULT_LOG_CMD, DEFAULT_RX_TIMEOUT, MAX_BLOCK_LEN, MAX_PAYLOAD_LEN};
use crate::error::ConfigError;
use crate::registry::ModuleRegistry;
use serde::{Deserialize, Serialize};

/// Settings for one communication channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Payload capacity the channel's buffer pair is generated with
    pub block_len: usize,

    /// Largest block length a buffer pair may be generated with
    pub max_block_len: usize,

    /// Valid module ids
    pub modules: ModuleRegistry,

    /// Ticks a partial frame may stall before it is dropped
    pub rx_timeout: u32,

    /// Command opcode carried by log packets
    pub log_cmd: u8,
}

impl LinkConfig {
    /// Check the settings for consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_block_len > MAX_PAYLOAD_LEN {
            return Err(ConfigError::MaxBlockTooLarge(self.max_block_len, MAX_PAYLOAD_LEN));
        }
        if self.block_len > self.max_block_len {
            return Err(ConfigError::BlockTooLarge(self.block_len, self.max_block_len));
        }
        if self.modules.is_empty() {
            return Err(ConfigError::EmptyRegistry);
        }
        if self.rx_timeout == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            block_len: DEFAULT_BLOCK_LEN,
            max_block_len: MAX_BLOCK_LEN,
            modules: ModuleRegistry::default(),
            rx_timeout: DEFAULT_RX_TIMEOUT,
            log_cmd: DEFAULT_LOG_CMD,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert_eq!(LinkConfig::default().validate(), Ok(()));
    }

    #[test]
    fn test_validate_rejects() {
        let config = LinkConfig {
            block_len: 600,
            ..LinkConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::BlockTooLarge(600, 512)));

        let config = LinkConfig {
            max_block_len: 2048,
            ..LinkConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::MaxBlockTooLarge(2048, _))));

        let config = LinkConfig {
            modules: ModuleRegistry::empty(),
            ..LinkConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::EmptyRegistry));

        let config = LinkConfig {
            rx_timeout: 0,
            ..LinkConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroTimeout));
    }
}
