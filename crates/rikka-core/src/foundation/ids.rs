//! Snowflake identifiers.
//!
//! Every entity on the platform is addressed by a 64-bit snowflake whose top
//! 42 bits are a millisecond timestamp relative to [`Snowflake::EPOCH_MS`].
//! Snowflakes are therefore roughly ordered by creation time, which the
//! snapshot cache relies on for retention pruning.

use std::fmt;
use std::str::FromStr;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use time::OffsetDateTime;

/// A platform snowflake identifier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Snowflake(pub u64);

/// Identifier of a guild.
pub type GuildId = Snowflake;
/// Identifier of a channel.
pub type ChannelId = Snowflake;
/// Identifier of a message.
pub type MessageId = Snowflake;
/// Identifier of a user.
pub type UserId = Snowflake;

impl Snowflake {
    /// Platform epoch (2015-01-01T00:00:00Z) in unix milliseconds.
    pub const EPOCH_MS: u64 = 1_420_070_400_000;

    const TIMESTAMP_SHIFT: u32 = 22;

    /// Creates a snowflake from its raw value.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw value.
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Returns the creation time embedded in this snowflake, in unix milliseconds.
    pub const fn timestamp_ms(self) -> u64 {
        (self.0 >> Self::TIMESTAMP_SHIFT) + Self::EPOCH_MS
    }

    /// Returns the smallest snowflake that could have been minted at `unix_ms`.
    ///
    /// Times before the platform epoch clamp to zero.
    pub const fn from_timestamp_ms(unix_ms: u64) -> Self {
        Self(unix_ms.saturating_sub(Self::EPOCH_MS) << Self::TIMESTAMP_SHIFT)
    }

    /// Returns the smallest snowflake that could have been minted at `at`.
    pub fn from_datetime(at: OffsetDateTime) -> Self {
        let ms = at.unix_timestamp_nanos() / 1_000_000;
        Self::from_timestamp_ms(u64::try_from(ms).unwrap_or(0))
    }
}

impl fmt::Display for Snowflake {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Snowflake {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl From<Snowflake> for u64 {
    fn from(id: Snowflake) -> Self {
        id.0
    }
}

impl FromStr for Snowflake {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

// The platform encodes ids as JSON strings to survive 53-bit float parsers;
// accept both forms on input and always write strings.
impl Serialize for Snowflake {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Snowflake {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SnowflakeVisitor;

        impl Visitor<'_> for SnowflakeVisitor {
            type Value = Snowflake;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a snowflake as an integer or numeric string")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
                Ok(Snowflake(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
                u64::try_from(v)
                    .map(Snowflake)
                    .map_err(|_| E::custom("negative snowflake"))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                v.parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_any(SnowflakeVisitor)
    }
}
