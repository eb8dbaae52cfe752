//! Legacy string hash and reversal of hash-mixed values
//!
//! Some legacy resources stored `user_value * multiplier + hash(field) % modulus`
//! to keep values unique. Recovering `user_value` requires the exact hash the
//! legacy system used: CRC-32 (IEEE) over the UTF-8 bytes, made non-negative.
//! On 32-bit platforms the checksum was first reinterpreted as a signed
//! 32-bit integer, so both behaviors are reproduced.

use shift_core::{HashWidth, MigrationContext};

/// Legacy string hashcode
#[must_use]
pub fn legacy_hashcode(value: &str, width: HashWidth) -> i64 {
    let checksum = crc32fast::hash(value.as_bytes());
    match width {
        HashWidth::Bits64 => i64::from(checksum),
        HashWidth::Bits32 => {
            let signed = checksum as i32;
            if signed >= 0 {
                i64::from(signed)
            } else {
                // i32::MIN has no positive counterpart and maps to 0
                signed.checked_neg().map_or(0, i64::from)
            }
        }
    }
}

/// Parameters of a hash-mixed value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashMix {
    pub multiplier: i64,
    pub modulus: i64,
    pub width: HashWidth,
}

impl Default for HashMix {
    fn default() -> Self {
        Self {
            multiplier: 1000,
            modulus: 1000,
            width: HashWidth::Bits64,
        }
    }
}

/// Result of reversing a hash-mixed value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reversal {
    /// The original value was recovered exactly
    Recovered(i64),
    /// The stored value does not carry the expected hash; `best_effort` is
    /// the stored value divided by the multiplier
    Irreversible { best_effort: i64, reason: String },
}

impl Reversal {
    /// Recovered or best-effort value
    #[must_use]
    pub fn value(&self) -> i64 {
        match self {
            Self::Recovered(v) | Self::Irreversible { best_effort: v, .. } => *v,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_recovered(&self) -> bool {
        matches!(self, Self::Recovered(_))
    }

    /// Record a warning when the value could not be recovered
    pub fn report(&self, ctx: &mut MigrationContext, address: &str, field: &str) {
        if let Self::Irreversible { best_effort, reason } = self {
            tracing::warn!(%address, %field, best_effort, "legacy hash reversal failed");
            ctx.warn_at(
                address,
                "value not recoverable",
                format!("`{field}` set to best-effort {best_effort}: {reason}"),
            );
        }
    }
}

impl HashMix {
    #[must_use]
    pub fn with_width(mut self, width: HashWidth) -> Self {
        self.width = width;
        self
    }

    /// Compute the stored value the legacy system would have written
    #[must_use]
    pub fn mix(&self, user_value: i64, field: &str) -> Option<i64> {
        let salt = self.salt(field)?;
        user_value.checked_mul(self.multiplier)?.checked_add(salt)
    }

    /// Recover the user value from a stored value
    #[must_use]
    pub fn reverse(&self, stored: i64, field: &str) -> Reversal {
        let Some(salt) = self.salt(field) else {
            return Reversal::Irreversible {
                best_effort: stored,
                reason: format!(
                    "invalid mix parameters (multiplier {}, modulus {})",
                    self.multiplier, self.modulus
                ),
            };
        };
        let best_effort = stored.div_euclid(self.multiplier);
        match stored.checked_sub(salt) {
            Some(rest) if rest.rem_euclid(self.multiplier) == 0 => {
                Reversal::Recovered(rest / self.multiplier)
            }
            _ => Reversal::Irreversible {
                best_effort,
                reason: format!(
                    "stored value {stored} does not end in hash remainder {salt} of {field:?}"
                ),
            },
        }
    }

    fn salt(&self, field: &str) -> Option<i64> {
        if self.multiplier <= 0 || self.modulus <= 0 {
            return None;
        }
        Some(legacy_hashcode(field, self.width) % self.modulus)
    }
}
