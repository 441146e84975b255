//! Advisory item locks.
//!
//! A lock records who last claimed an item and when. Nothing prevents a second
//! user from locking the same item or from editing a locked one; the record is
//! metadata for reviewers and front-ends.

use std::{env, fmt};

use borsh::{BorshDeserialize, BorshSerialize};
use chrono::Local;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Supplies the wall-clock time and user identity stamped into locks.
pub trait AuditSource {
    /// The current local time, formatted for display.
    fn timestamp(&self) -> String;

    /// The login name of the current user.
    fn user(&self) -> String;

    /// The lock record for "locked now by the current user".
    fn stamp(&self) -> String {
        format!("{} {}", self.timestamp(), self.user())
    }
}

/// Reads the local clock and the operating-system login name.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemAudit;

impl AuditSource for SystemAudit {
    fn timestamp(&self) -> String {
        Local::now().format("%Y-%m-%d %H:%M:%S%.6f").to_string()
    }

    fn user(&self) -> String {
        ["USER", "LOGNAME", "USERNAME"]
            .iter()
            .find_map(|var| env::var(var).ok().filter(|name| !name.is_empty()))
            .unwrap_or_else(|| "unknown".to_string())
    }
}

/// Lock state of an item.
///
/// Persisted as `0` when unlocked and as the `"<timestamp> <user>"` record
/// when locked.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, BorshSerialize, BorshDeserialize)]
pub enum LockStatus {
    /// Nobody has claimed the item.
    #[default]
    Unlocked,
    /// Claimed; holds the `"<timestamp> <user>"` record.
    Locked(String),
}

impl LockStatus {
    /// Whether the item is locked.
    #[must_use]
    pub const fn is_locked(&self) -> bool {
        matches!(self, Self::Locked(_))
    }

    /// The user who took the lock, if locked.
    #[must_use]
    pub fn owner(&self) -> Option<&str> {
        match self {
            Self::Unlocked => None,
            Self::Locked(record) => Some(
                record
                    .rsplit_once(' ')
                    .map_or(record.as_str(), |(_, user)| user),
            ),
        }
    }

    /// When the lock was taken, if locked.
    #[must_use]
    pub fn since(&self) -> Option<&str> {
        match self {
            Self::Unlocked => None,
            Self::Locked(record) => record.rsplit_once(' ').map(|(timestamp, _)| timestamp),
        }
    }
}

impl fmt::Display for LockStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Unlocked => f.write_str("0"),
            Self::Locked(record) => f.write_str(record),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum Stored {
    Flag(i64),
    Record(String),
}

impl Serialize for LockStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Unlocked => Stored::Flag(0),
            Self::Locked(record) => Stored::Record(record.clone()),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for LockStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Stored::deserialize(deserializer)? {
            Stored::Flag(0) => Self::Unlocked,
            Stored::Flag(flag) => Self::Locked(flag.to_string()),
            Stored::Record(record) if record.is_empty() => Self::Unlocked,
            Stored::Record(record) => Self::Locked(record),
        })
    }
}
