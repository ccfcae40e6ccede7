//! Kiosk configuration.

use std::time::Duration;

use gabarito_proto::{CodecLimits, MAX_PIECES};
use thiserror::Error;

use crate::registry::RegistryLimits;

/// Which card reader an event came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReaderId {
    /// Reader used for master authentication, registration and template reads.
    Primary,
    /// Piece reader in dual-reader deployments.
    Secondary,
}

/// Kiosk tuning and deployment variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KioskConfig {
    /// Time allowed to present every piece after a template is recognized.
    /// 20 seconds on the standard station, 60 on the long-kit variant.
    pub verification_timeout: Duration,
    /// Minimum quiet time between accepted button toggles.
    pub debounce: Duration,
    /// Maximum number of templates (100 or 150 depending on the medium).
    pub max_templates: usize,
    /// Maximum pieces per template.
    pub max_pieces: usize,
    /// Reader that pieces are presented on during verification.
    pub piece_reader: ReaderId,
}

impl Default for KioskConfig {
    fn default() -> Self {
        Self {
            verification_timeout: Duration::from_secs(20),
            debounce: Duration::from_millis(200),
            max_templates: 100,
            max_pieces: MAX_PIECES,
            piece_reader: ReaderId::Secondary,
        }
    }
}

/// Invalid configuration values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Template capacity outside `1..=255`.
    #[error("max_templates must be between 1 and 255, got {0}")]
    TemplateCapacity(usize),

    /// Piece capacity outside `1..=255`.
    #[error("max_pieces must be between 1 and 255, got {0}")]
    PieceCapacity(usize),

    /// Zero verification timeout.
    #[error("verification timeout must be non-zero")]
    ZeroTimeout,
}

impl KioskConfig {
    /// Check that the configuration can be encoded and enforced.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=usize::from(u8::MAX)).contains(&self.max_templates) {
            return Err(ConfigError::TemplateCapacity(self.max_templates));
        }
        if !(1..=usize::from(u8::MAX)).contains(&self.max_pieces) {
            return Err(ConfigError::PieceCapacity(self.max_pieces));
        }
        if self.verification_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }

    /// Registry bounds implied by this configuration.
    pub fn registry_limits(&self) -> RegistryLimits {
        RegistryLimits { max_templates: self.max_templates, max_pieces: self.max_pieces }
    }

    /// Codec bounds implied by this configuration.
    pub fn codec_limits(&self) -> CodecLimits {
        CodecLimits { max_templates: self.max_templates, max_pieces: self.max_pieces }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert_eq!(KioskConfig::default().validate(), Ok(()));
    }

    #[test]
    fn capacity_must_fit_count_byte() {
        let config = KioskConfig { max_templates: 300, ..Default::default() };
        assert_eq!(config.validate(), Err(ConfigError::TemplateCapacity(300)));
    }

    #[test]
    fn zero_timeout_rejected() {
        let config = KioskConfig { verification_timeout: Duration::ZERO, ..Default::default() };
        assert_eq!(config.validate(), Err(ConfigError::ZeroTimeout));
    }
}
