//! Cart line quantity.

use core::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// A cart line quantity, always at least one.
///
/// Every constructor clamps values below one up to one, so a `Quantity` can
/// never describe an empty or negative line. Deserialization clamps as well,
/// which keeps stale device-storage values from smuggling in zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Quantity(u32);

impl Quantity {
    /// The smallest allowed quantity.
    pub const ONE: Self = Self(1);

    /// Create a quantity, clamping anything below one up to one.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        if value < 1 { Self::ONE } else { Self(value) }
    }

    /// Create a quantity from a signed user-supplied value.
    #[must_use]
    pub fn clamped(value: i64) -> Self {
        Self::new(u32::try_from(value.max(1)).unwrap_or(u32::MAX))
    }

    /// Get the underlying value.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }

    /// Quantity plus one, saturating at `u32::MAX`.
    #[must_use]
    pub const fn incremented(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl Default for Quantity {
    fn default() -> Self {
        Self::ONE
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<'de> Deserialize<'de> for Quantity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = i64::deserialize(deserializer)?;
        Ok(Self::clamped(raw))
    }
}
