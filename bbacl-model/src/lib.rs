//! bbacl-model: Shared types for repository permission reconciliation
//!
//! This crate defines the normalized permission model that the gateway
//! produces and the diff engine consumes. It performs no I/O.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub mod diff;
pub mod operation;

pub use diff::{actionable, diff, remove_all};
pub use operation::{Action, Operation};

/// All permission grants of one repository (groups and users, in no
/// particular order).
pub type PermissionSet = Vec<PermissionGrant>;

/// Error returned when a wire or CLI value is not a known variant
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {what} '{value}' (expected one of: {expected})")]
pub struct ParseError {
    pub what: &'static str,
    pub value: String,
    pub expected: &'static str,
}

/// Kind of principal a grant belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrincipalKind {
    Group,
    User,
}

impl PrincipalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Group => "group",
            Self::User => "user",
        }
    }
}

impl fmt::Display for PrincipalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PrincipalKind {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "group" => Ok(Self::Group),
            "user" => Ok(Self::User),
            other => Err(ParseError {
                what: "principal kind",
                value: other.to_string(),
                expected: "user, group",
            }),
        }
    }
}

/// Repository permission level, ordered by increasing privilege
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionLevel {
    Read,
    Write,
    Admin,
}

impl PermissionLevel {
    /// All levels in privilege order
    pub const ALL: [PermissionLevel; 3] = [Self::Read, Self::Write, Self::Admin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::Admin => "admin",
        }
    }

    /// Upper-case label used in operation messages
    pub fn label(&self) -> &'static str {
        match self {
            Self::Read => "READ",
            Self::Write => "WRITE",
            Self::Admin => "ADMIN",
        }
    }
}

impl fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PermissionLevel {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "read" => Ok(Self::Read),
            "write" => Ok(Self::Write),
            "admin" => Ok(Self::Admin),
            other => Err(ParseError {
                what: "permission level",
                value: other.to_string(),
                expected: "read, write, admin",
            }),
        }
    }
}

/// One principal's access grant on one repository.
///
/// `object_id` is the stable key (group slug or user uuid); `object_name` is
/// a display label only and is not unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionGrant {
    pub object_id: String,
    pub object_name: String,
    pub kind: PrincipalKind,
    pub level: PermissionLevel,
}

impl PermissionGrant {
    /// Create a new grant
    pub fn new(
        object_id: impl Into<String>,
        object_name: impl Into<String>,
        kind: PrincipalKind,
        level: PermissionLevel,
    ) -> Self {
        Self {
            object_id: object_id.into(),
            object_name: object_name.into(),
            kind,
            level,
        }
    }

    /// Shorthand for a user grant
    pub fn user(
        uuid: impl Into<String>,
        nickname: impl Into<String>,
        level: PermissionLevel,
    ) -> Self {
        Self::new(uuid, nickname, PrincipalKind::User, level)
    }

    /// Shorthand for a group grant
    pub fn group(
        slug: impl Into<String>,
        name: impl Into<String>,
        level: PermissionLevel,
    ) -> Self {
        Self::new(slug, name, PrincipalKind::Group, level)
    }
}

/// Report row: `type, id, name, permission`
impl fmt::Display for PermissionGrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, {}, {}, {}",
            self.kind, self.object_id, self.object_name, self.level
        )
    }
}

/// Account listed as a default reviewer of a repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewerAccount {
    pub uuid: String,
    pub nickname: String,
    pub display_name: String,
}

/// Report row: `id, name`
impl fmt::Display for ReviewerAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.uuid, self.nickname)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_parse_rejects_unknown() {
        assert_eq!("write".parse::<PermissionLevel>(), Ok(PermissionLevel::Write));

        let err = "owner".parse::<PermissionLevel>().unwrap_err();
        assert_eq!(err.value, "owner");
        assert!(err.to_string().contains("read, write, admin"));
    }

    #[test]
    fn test_kind_parse() {
        assert_eq!("group".parse::<PrincipalKind>(), Ok(PrincipalKind::Group));
        assert!("team".parse::<PrincipalKind>().is_err());
    }

    #[test]
    fn test_level_serde_is_closed() {
        let level: PermissionLevel = serde_json::from_str("\"admin\"").unwrap();
        assert_eq!(level, PermissionLevel::Admin);
        assert!(serde_json::from_str::<PermissionLevel>("\"none\"").is_err());
    }

    #[test]
    fn test_level_privilege_order() {
        assert!(PermissionLevel::Read < PermissionLevel::Write);
        assert!(PermissionLevel::Write < PermissionLevel::Admin);
    }

    #[test]
    fn test_grant_report_row() {
        let grant = PermissionGrant::user("{1234}", "john-doe", PermissionLevel::Admin);
        assert_eq!(grant.to_string(), "user, {1234}, john-doe, admin");
    }

    #[test]
    fn test_reviewer_report_row() {
        let account = ReviewerAccount {
            uuid: "{u-1}".into(),
            nickname: "alice".into(),
            display_name: "Alice A.".into(),
        };
        assert_eq!(account.to_string(), "{u-1}, alice");
    }
}
