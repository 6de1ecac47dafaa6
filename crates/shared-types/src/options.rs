//! Transactional and isolation options of a bus endpoint.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::ParseEnumError;

/// Whether queue operations run inside a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TransactionalMode {
    /// Not stated in configuration; the transport decides.
    #[default]
    Unspecified,
    /// Receive and send inside a queue transaction.
    Transactional,
    /// No transactional scope.
    NonTransactional,
}

impl TransactionalMode {
    /// Resolve to a concrete flag, using `fallback` when unspecified.
    #[must_use]
    pub fn is_transactional_or(self, fallback: bool) -> bool {
        match self {
            Self::Unspecified => fallback,
            Self::Transactional => true,
            Self::NonTransactional => false,
        }
    }
}

impl From<bool> for TransactionalMode {
    fn from(value: bool) -> Self {
        if value {
            Self::Transactional
        } else {
            Self::NonTransactional
        }
    }
}

/// Isolation level for the transactional unit around a queue receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum IsolationLevel {
    #[default]
    Serializable,
    RepeatableRead,
    ReadCommitted,
    ReadUncommitted,
    Snapshot,
    Chaos,
    Unspecified,
}

impl IsolationLevel {
    /// All enumerators, in declaration order.
    pub const ALL: [IsolationLevel; 7] = [
        Self::Serializable,
        Self::RepeatableRead,
        Self::ReadCommitted,
        Self::ReadUncommitted,
        Self::Snapshot,
        Self::Chaos,
        Self::Unspecified,
    ];

    /// Enumerator name as written in configuration.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Serializable => "Serializable",
            Self::RepeatableRead => "RepeatableRead",
            Self::ReadCommitted => "ReadCommitted",
            Self::ReadUncommitted => "ReadUncommitted",
            Self::Snapshot => "Snapshot",
            Self::Chaos => "Chaos",
            Self::Unspecified => "Unspecified",
        }
    }
}

impl fmt::Display for IsolationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for IsolationLevel {
    type Err = ParseEnumError;

    /// Names are matched exactly (case-sensitive).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|level| level.name() == s)
            .ok_or_else(|| ParseEnumError {
                kind: "IsolationLevel",
                value: s.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_isolation_level_names_round_trip() {
        for level in IsolationLevel::ALL {
            assert_eq!(level.name().parse::<IsolationLevel>().unwrap(), level);
        }
    }

    #[test]
    fn test_isolation_level_unknown() {
        let err = "readcommitted".parse::<IsolationLevel>().unwrap_err();
        assert_eq!(err.kind, "IsolationLevel");
        assert_eq!(err.value, "readcommitted");
    }

    #[test]
    fn test_transactional_fallback() {
        assert!(TransactionalMode::Unspecified.is_transactional_or(true));
        assert!(!TransactionalMode::Unspecified.is_transactional_or(false));
        assert!(!TransactionalMode::NonTransactional.is_transactional_or(true));
        assert_eq!(TransactionalMode::from(true), TransactionalMode::Transactional);
    }
}
