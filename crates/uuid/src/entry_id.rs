use crate::{UuidError, UuidResult};
use std::{fmt, str::FromStr};

/// Re-exported for convenience.
pub use ::uuid::Uuid;

/// Prefix carried by every history entry identifier.
pub const ENTRY_ID_PREFIX: &str = "H-";

/// Canonical identifier of a history entry.
///
/// Once constructed the inner UUID is valid and [`Display`](fmt::Display) always yields the
/// canonical `H-<32 hex>` form, so ids can be compared as strings in stored drafts and reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntryId(Uuid);

impl Default for EntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl EntryId {
    /// Allocates a new random (v4) identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parses an identifier that must already be canonical.
    ///
    /// # Errors
    ///
    /// Returns [`UuidError::InvalidInput`] if `input` is not `H-` followed by 32 lowercase hex
    /// characters.
    pub fn parse(input: &str) -> UuidResult<Self> {
        let invalid = || {
            UuidError::InvalidInput(format!(
                "entry id must be '{}' followed by 32 lowercase hex characters, got: '{}'",
                ENTRY_ID_PREFIX, input
            ))
        };

        let hex = input.strip_prefix(ENTRY_ID_PREFIX).ok_or_else(invalid)?;
        if !Self::is_canonical_hex(hex) {
            return Err(invalid());
        }
        let uuid = Uuid::parse_str(hex).map_err(|_| invalid())?;
        Ok(Self(uuid))
    }

    /// Returns the underlying UUID.
    pub fn uuid(&self) -> Uuid {
        self.0
    }

    fn is_canonical_hex(input: &str) -> bool {
        input.len() == 32
            && input
                .bytes()
                .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", ENTRY_ID_PREFIX, self.0.simple())
    }
}

impl FromStr for EntryId {
    type Err = UuidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntryId::parse(s)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for EntryId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for EntryId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        EntryId::parse(&s).map_err(serde::de::Error::custom)
    }
}
