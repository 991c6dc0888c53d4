//! Error taxonomy surfaced by table operations.

use thiserror::Error;

/// Reason a `GrowthPolicy` was refused at creation time.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Error)]
pub enum ConfigError {
    #[error("initial exponent {0} exceeds the limit of 31")]
    InitialTooLarge(u8),
    #[error("maximum exponent {0} exceeds the limit of 31")]
    MaximumTooLarge(u8),
    #[error("initial exponent {initial} exceeds maximum exponent {maximum}")]
    InitialAboveMaximum { initial: u8, maximum: u8 },
    #[error("extend step must be at least 1")]
    ZeroExtendStep,
    #[error("extend trigger {trigger} exceeds initial exponent {initial}")]
    TriggerAboveInitial { trigger: u8, initial: u8 },
}

/// Errors returned by `ChainedHashTable`.
///
/// Every failing call leaves the table exactly as it was.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Error)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidConfiguration(#[from] ConfigError),
    #[error("out of memory")]
    OutOfMemory,
    #[error("key not found")]
    KeyNotFound,
    #[error("duplicate key")]
    Duplicate,
    #[error("size limit reached")]
    CapacityExceeded,
    #[error("handle refers to a removed item")]
    StaleHandle,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        assert_eq!(Error::KeyNotFound.to_string(), "key not found");
        assert_eq!(Error::Duplicate.to_string(), "duplicate key");
        assert_eq!(Error::CapacityExceeded.to_string(), "size limit reached");
        let e: Error = ConfigError::ZeroExtendStep.into();
        assert_eq!(
            e.to_string(),
            "invalid argument: extend step must be at least 1"
        );
    }
}
