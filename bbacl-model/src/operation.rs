//! Reconciliation operations
//!
//! An [`Operation`] is one step of a reconciliation plan. The level fields
//! that make sense for each action are carried by a private enum, so an add
//! always has a target level and a remove always has a current one.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{ParseError, PermissionGrant, PermissionLevel, PrincipalKind};

/// What an operation does to the remote grant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Add,
    Update,
    Remove,
    /// Grant already matches; nothing to send
    None,
}

impl FromStr for Action {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "add" => Ok(Self::Add),
            "update" => Ok(Self::Update),
            "remove" => Ok(Self::Remove),
            other => Err(ParseError {
                what: "operation",
                value: other.to_string(),
                expected: "add, update, remove",
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Change {
    Add {
        after: PermissionLevel,
    },
    Update {
        before: PermissionLevel,
        after: PermissionLevel,
    },
    Remove {
        before: PermissionLevel,
    },
    Same {
        level: PermissionLevel,
    },
}

/// One immutable step of a reconciliation plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    object_id: String,
    object_name: String,
    kind: PrincipalKind,
    change: Change,
}

impl Operation {
    fn from_grant(grant: &PermissionGrant, change: Change) -> Self {
        Self {
            object_id: grant.object_id.clone(),
            object_name: grant.object_name.clone(),
            kind: grant.kind,
            change,
        }
    }

    /// Grant `grant.level` to a principal that has no grant yet
    pub fn add(grant: &PermissionGrant) -> Self {
        Self::from_grant(grant, Change::Add { after: grant.level })
    }

    /// Revoke the existing `grant`
    pub fn remove(grant: &PermissionGrant) -> Self {
        Self::from_grant(
            grant,
            Change::Remove {
                before: grant.level,
            },
        )
    }

    /// Move the existing `grant` to `after`.
    ///
    /// Yields a no-op when the level is already `after`.
    pub fn update(grant: &PermissionGrant, after: PermissionLevel) -> Self {
        let change = if grant.level == after {
            Change::Same { level: after }
        } else {
            Change::Update {
                before: grant.level,
                after,
            }
        };
        Self::from_grant(grant, change)
    }

    /// No-op entry for a grant that already matches
    pub fn same(grant: &PermissionGrant) -> Self {
        Self::from_grant(grant, Change::Same { level: grant.level })
    }

    pub fn object_id(&self) -> &str {
        &self.object_id
    }

    pub fn object_name(&self) -> &str {
        &self.object_name
    }

    pub fn kind(&self) -> PrincipalKind {
        self.kind
    }

    pub fn action(&self) -> Action {
        match self.change {
            Change::Add { .. } => Action::Add,
            Change::Update { .. } => Action::Update,
            Change::Remove { .. } => Action::Remove,
            Change::Same { .. } => Action::None,
        }
    }

    /// Level on the remote before the operation; absent for add
    pub fn level_before(&self) -> Option<PermissionLevel> {
        match self.change {
            Change::Add { .. } => None,
            Change::Update { before, .. } | Change::Remove { before } => Some(before),
            Change::Same { level } => Some(level),
        }
    }

    /// Level on the remote after the operation; absent for remove
    pub fn level_after(&self) -> Option<PermissionLevel> {
        match self.change {
            Change::Add { after } | Change::Update { after, .. } => Some(after),
            Change::Remove { .. } => None,
            Change::Same { level } => Some(level),
        }
    }

    pub fn is_noop(&self) -> bool {
        matches!(self.change, Change::Same { .. })
    }

    /// Single-line description shown in selection prompts and reports
    pub fn message(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (kind, name) = (self.kind, &self.object_name);
        match self.change {
            Change::Update { before, after } => write!(
                f,
                "Update: {} {} {} => {}",
                kind,
                name,
                before.label(),
                after.label()
            ),
            Change::Add { after } => write!(f, "Add: {} {} ({})", kind, name, after.label()),
            Change::Remove { before } => {
                write!(f, "Remove: {} {} ({})", kind, name, before.label())
            }
            Change::Same { level } => write!(f, "Same: {} {} ({})", kind, name, level.label()),
        }
    }
}
