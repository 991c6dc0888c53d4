//! Growth policy: when the bucket array grows and by how much.
//!
//! All sizes are powers of two expressed as exponents. The bucket array
//! starts at `2^initial_exponent` slots and grows by `extend_step`
//! exponent levels whenever the item count reaches
//! `2^(size_exponent - extend_trigger)`. A trigger of 0 grows once the
//! table holds one item per bucket; larger triggers grow earlier.

use crate::error::ConfigError;

/// Largest exponent accepted anywhere in a policy; keeps `1 << exponent`
/// representable in a `u32` mask.
pub const EXPONENT_LIMIT: u8 = 31;

/// What `set` does when growth is due but `maximum_exponent` is reached.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum CapacityMode {
    /// Accept the insert and let chains get longer.
    #[default]
    Degrade,
    /// Refuse the insert with `Error::CapacityExceeded`.
    ///
    /// Growth only ever moves by whole `extend_step`s, so when the last
    /// step would overshoot `maximum_exponent` the table stops below it
    /// and starts refusing there. `new(0, 3).with_extend_step(2)` tops
    /// out at 4 buckets and refuses the 5th item.
    Reject,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct GrowthPolicy {
    pub initial_exponent: u8,
    pub maximum_exponent: u8,
    pub extend_step: u8,
    pub extend_trigger: u8,
    pub on_capacity: CapacityMode,
}

impl GrowthPolicy {
    pub const DEFAULT: GrowthPolicy = GrowthPolicy::new(4, 24);

    /// Doubling policy between the two exponents, growing at full load.
    pub const fn new(initial_exponent: u8, maximum_exponent: u8) -> Self {
        Self {
            initial_exponent,
            maximum_exponent,
            extend_step: 1,
            extend_trigger: 0,
            on_capacity: CapacityMode::Degrade,
        }
    }

    pub const fn with_extend_step(mut self, extend_step: u8) -> Self {
        self.extend_step = extend_step;
        self
    }

    pub const fn with_extend_trigger(mut self, extend_trigger: u8) -> Self {
        self.extend_trigger = extend_trigger;
        self
    }

    pub const fn with_capacity_mode(mut self, on_capacity: CapacityMode) -> Self {
        self.on_capacity = on_capacity;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.initial_exponent > EXPONENT_LIMIT {
            return Err(ConfigError::InitialTooLarge(self.initial_exponent));
        }
        if self.maximum_exponent > EXPONENT_LIMIT {
            return Err(ConfigError::MaximumTooLarge(self.maximum_exponent));
        }
        if self.initial_exponent > self.maximum_exponent {
            return Err(ConfigError::InitialAboveMaximum {
                initial: self.initial_exponent,
                maximum: self.maximum_exponent,
            });
        }
        if self.extend_step == 0 {
            return Err(ConfigError::ZeroExtendStep);
        }
        // The size exponent never drops below the initial one, so this
        // keeps the threshold exponent non-negative for the table's life.
        if self.extend_trigger > self.initial_exponent {
            return Err(ConfigError::TriggerAboveInitial {
                trigger: self.extend_trigger,
                initial: self.initial_exponent,
            });
        }
        Ok(())
    }

    /// Item count at which a table of `2^size_exponent` buckets grows.
    pub fn growth_threshold(&self, size_exponent: u8) -> usize {
        1usize << size_exponent.saturating_sub(self.extend_trigger)
    }

    /// Exponent the next growth would reach, or `None` past the ceiling.
    /// A step that would overshoot `maximum_exponent` is not shortened.
    pub fn next_exponent(&self, size_exponent: u8) -> Option<u8> {
        let next = size_exponent.checked_add(self.extend_step)?;
        (next <= self.maximum_exponent).then_some(next)
    }
}

impl Default for GrowthPolicy {
    fn default() -> Self {
        Self::DEFAULT
    }
}
