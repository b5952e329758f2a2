//! Strongly-typed identifiers for Strand entities.
//!
//! Numeric identifiers wrap a u64 and are generated by [`define_id!`].
//! `TopicName` and `PartitionId` validate their input, so every value of
//! those types that exists is a legal partition key component.

use std::fmt;

use bytes::Bytes;

use crate::error::{Error, Result};
use crate::limits::{PARTITION_ID_MAX, TOPIC_NAME_BYTES_MAX};

/// Macro to generate strongly-typed u64 wrappers.
macro_rules! define_id {
    ($name:ident, $prefix:expr, $doc:expr) => {
        #[doc = $doc]
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
        #[repr(transparent)]
        pub struct $name(u64);

        impl $name {
            /// Creates a new value from a raw u64.
            #[inline]
            #[must_use]
            pub const fn new(value: u64) -> Self {
                Self(value)
            }

            /// Returns the raw u64 value.
            #[inline]
            #[must_use]
            pub const fn get(self) -> u64 {
                self.0
            }

            /// Returns the next value in sequence.
            ///
            /// # Panics
            /// Panics if the value would overflow.
            #[inline]
            #[must_use]
            pub const fn next(self) -> Self {
                assert!(self.0 < u64::MAX, "ID overflow");
                Self(self.0 + 1)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", $prefix, self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}-{}", $prefix, self.0)
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self::new(value)
            }
        }

        impl From<$name> for u64 {
            fn from(id: $name) -> Self {
                id.get()
            }
        }
    };
}

define_id!(NodeId, "node", "Unique identifier for a broker node in the cluster.");
define_id!(
    Position,
    "pos",
    "Position of an entry within one partition log. Dense and 0-based."
);

impl Position {
    /// The position of the first entry of a fresh log.
    pub const ZERO: Self = Self(0);
}

/// Name of a topic.
///
/// Topic names are non-empty UTF-8 strings that are safe to use as a single
/// path component: no `/`, `\\` or NUL, and not `.` or `..`. Distinct names
/// therefore map to distinct log directories. Cloning is cheap.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TopicName(Bytes);

impl TopicName {
    /// Creates a topic name.
    ///
    /// # Errors
    /// Returns an error if the name is empty, longer than
    /// [`TOPIC_NAME_BYTES_MAX`], not UTF-8, contains a path separator or NUL,
    /// or is `.` or `..`.
    pub fn new(name: impl Into<Bytes>) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::InvalidArgument {
                name: "topic name",
                reason: "must not be empty",
            });
        }
        if name.len() > TOPIC_NAME_BYTES_MAX {
            return Err(Error::InvalidArgument {
                name: "topic name",
                reason: "exceeds maximum length",
            });
        }
        let Ok(text) = std::str::from_utf8(&name) else {
            return Err(Error::InvalidArgument {
                name: "topic name",
                reason: "must be valid UTF-8",
            });
        };
        // The name becomes a single directory component on disk.
        if text.contains(['/', '\\', '\0']) {
            return Err(Error::InvalidArgument {
                name: "topic name",
                reason: "must not contain path separators or NUL",
            });
        }
        if text == "." || text == ".." {
            return Err(Error::InvalidArgument {
                name: "topic name",
                reason: "must not be a relative path component",
            });
        }
        Ok(Self(name))
    }

    /// Returns the raw bytes of the name.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns the name as a string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        // Validated as UTF-8 on construction.
        std::str::from_utf8(&self.0).unwrap_or_default()
    }

}

impl TryFrom<&str> for TopicName {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self> {
        Self::new(Bytes::copy_from_slice(value.as_bytes()))
    }
}

impl fmt::Debug for TopicName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "topic({})", self.as_str())
    }
}

impl fmt::Display for TopicName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifier of a partition within a topic, in `0..=32767`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct PartitionId(u16);

impl PartitionId {
    /// Creates a partition id.
    ///
    /// # Errors
    /// Returns an error if the value is negative or above [`PARTITION_ID_MAX`].
    pub fn new(value: i64) -> Result<Self> {
        match u16::try_from(value) {
            Ok(id) if id <= PARTITION_ID_MAX => Ok(Self(id)),
            _ => Err(Error::OutOfRange {
                name: "partition id",
                min: 0,
                max: i64::from(PARTITION_ID_MAX),
                actual: value,
            }),
        }
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn get(self) -> u16 {
        self.0
    }
}

impl fmt::Debug for PartitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "partition({})", self.0)
    }
}

impl fmt::Display for PartitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
