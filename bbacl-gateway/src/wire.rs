//! Remote API payloads
//!
//! Only the fields the gateway reads are modeled. Levels are decoded into the
//! closed model enum, so an unknown permission string fails the decode.

use bbacl_model::{PermissionGrant, PermissionLevel, ReviewerAccount};
use serde::{Deserialize, Serialize};

/// One page of a cursor-paginated listing
#[derive(Debug, Deserialize)]
pub(crate) struct Page<T> {
    pub values: Vec<T>,
    #[serde(default)]
    pub pagelen: Option<u32>,
    #[serde(default)]
    pub size: Option<u32>,
    #[serde(default)]
    pub next: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GroupPermission {
    pub permission: PermissionLevel,
    pub group: GroupRef,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GroupRef {
    pub slug: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UserPermission {
    pub permission: PermissionLevel,
    pub user: UserRef,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UserRef {
    pub uuid: String,
    #[serde(default)]
    pub nickname: String,
    #[serde(default)]
    pub display_name: String,
}

/// Body of the set-permission call
#[derive(Debug, Serialize)]
pub(crate) struct PermissionBody {
    pub permission: PermissionLevel,
}

impl From<GroupPermission> for PermissionGrant {
    fn from(v: GroupPermission) -> Self {
        PermissionGrant::group(v.group.slug, v.group.name, v.permission)
    }
}

impl From<UserPermission> for PermissionGrant {
    fn from(v: UserPermission) -> Self {
        PermissionGrant::user(v.user.uuid, v.user.nickname, v.permission)
    }
}

impl From<UserRef> for ReviewerAccount {
    fn from(v: UserRef) -> Self {
        ReviewerAccount {
            uuid: v.uuid,
            nickname: v.nickname,
            display_name: v.display_name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bbacl_model::PrincipalKind;

    #[test]
    fn test_group_page_maps_to_grants() {
        let body = r#"{
            "pagelen": 10,
            "size": 1,
            "values": [{
                "type": "repository_group_permission",
                "permission": "write",
                "group": {"type": "group", "slug": "developer", "full_slug": "ws:developer", "name": "Developers"}
            }]
        }"#;

        let page: Page<GroupPermission> = serde_json::from_str(body).unwrap();
        assert!(page.next.is_none());

        let grant: PermissionGrant = page.values.into_iter().next().unwrap().into();
        assert_eq!(grant.object_id, "developer");
        assert_eq!(grant.object_name, "Developers");
        assert_eq!(grant.kind, PrincipalKind::Group);
        assert_eq!(grant.level, PermissionLevel::Write);
    }

    #[test]
    fn test_unknown_permission_is_rejected() {
        let body = r#"{"values": [{"permission": "owner", "user": {"uuid": "{u}", "nickname": "n"}}]}"#;
        assert!(serde_json::from_str::<Page<UserPermission>>(body).is_err());
    }

    #[test]
    fn test_permission_body() {
        let body = PermissionBody {
            permission: PermissionLevel::Admin,
        };
        assert_eq!(
            serde_json::to_string(&body).unwrap(),
            r#"{"permission":"admin"}"#
        );
    }
}
