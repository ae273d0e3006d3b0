//! User model for storage and API.

use crate::models::UserPermissions;
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// User record stored in the `users` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct User {
    /// Discord user ID (also used as document ID)
    #[serde(rename = "_id")]
    pub id: String,
    pub username: String,
    pub discriminator: String,
    /// Discord avatar hash
    pub avatar: Option<String>,
    /// Client IP seen on the last login or refresh
    pub latest_ip: String,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub permissions: UserPermissions,
    /// When the user first logged in (ISO 8601)
    pub registered: String,
    pub last_login_or_refresh: String,
    pub posts: u64,
    pub comments: u64,
}

/// A user as shown to other clients.
///
/// `latest_ip` is `None` unless the viewer is allowed to see it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ClientFacingUser {
    #[serde(rename = "_id")]
    pub id: String,
    pub username: String,
    pub discriminator: String,
    pub avatar: Option<String>,
    pub latest_ip: Option<String>,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub permissions: UserPermissions,
    pub registered: String,
    pub last_login_or_refresh: String,
    pub posts: u64,
    pub comments: u64,
}

impl User {
    /// Project this user for a viewer, keeping the IP only when `show_ip` is set.
    pub fn client_facing(self, show_ip: bool) -> ClientFacingUser {
        ClientFacingUser {
            id: self.id,
            username: self.username,
            discriminator: self.discriminator,
            avatar: self.avatar,
            latest_ip: show_ip.then_some(self.latest_ip),
            permissions: self.permissions,
            registered: self.registered,
            last_login_or_refresh: self.last_login_or_refresh,
            posts: self.posts,
            comments: self.comments,
        }
    }

    /// Apply a partial update in place. `_id` and `registered` are not part of
    /// [`UserUpdate`] and so can never change here.
    pub fn apply(&mut self, update: &UserUpdate) {
        if let Some(username) = &update.username {
            self.username = username.clone();
        }
        if let Some(discriminator) = &update.discriminator {
            self.discriminator = discriminator.clone();
        }
        if let Some(avatar) = &update.avatar {
            self.avatar = avatar.clone();
        }
        if let Some(latest_ip) = &update.latest_ip {
            self.latest_ip = latest_ip.clone();
        }
        if let Some(permissions) = update.permissions {
            self.permissions = permissions;
        }
        if let Some(last) = &update.last_login_or_refresh {
            self.last_login_or_refresh = last.clone();
        }
    }
}

/// Fields that may be `$set` on an existing user.
///
/// Firestore echoes the written document back after an update, so this also
/// deserializes from a full user document, ignoring fields it does not set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discriminator: Option<String>,
    /// Outer `Some` means "set", inner `None` clears the avatar.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permissions: Option<UserPermissions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login_or_refresh: Option<String>,
}

impl UserUpdate {
    /// Serialized names of the fields this update sets.
    pub fn field_names(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.username.is_some() {
            fields.push("username");
        }
        if self.discriminator.is_some() {
            fields.push("discriminator");
        }
        if self.avatar.is_some() {
            fields.push("avatar");
        }
        if self.latest_ip.is_some() {
            fields.push("latestIp");
        }
        if self.permissions.is_some() {
            fields.push("permissions");
        }
        if self.last_login_or_refresh.is_some() {
            fields.push("lastLoginOrRefresh");
        }
        fields
    }

    pub fn is_empty(&self) -> bool {
        self.field_names().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User {
            id: "1001".to_string(),
            username: "aims".to_string(),
            discriminator: "0001".to_string(),
            avatar: Some("abc".to_string()),
            latest_ip: "10.0.0.1".to_string(),
            permissions: UserPermissions::DEFAULT,
            registered: "2026-01-01T00:00:00.000Z".to_string(),
            last_login_or_refresh: "2026-01-01T00:00:00.000Z".to_string(),
            posts: 3,
            comments: 7,
        }
    }

    #[test]
    fn test_user_wire_format() {
        let json = serde_json::to_value(sample_user()).unwrap();

        assert_eq!(json["_id"], "1001");
        assert_eq!(json["latestIp"], "10.0.0.1");
        assert_eq!(json["permissions"], 4);
        assert_eq!(json["lastLoginOrRefresh"], "2026-01-01T00:00:00.000Z");
        assert!(json.get("id").is_none());
    }

    #[test]
    fn test_client_facing_hides_ip() {
        let hidden = serde_json::to_value(sample_user().client_facing(false)).unwrap();
        assert!(hidden["latestIp"].is_null());

        let shown = sample_user().client_facing(true);
        assert_eq!(shown.latest_ip.as_deref(), Some("10.0.0.1"));
    }

    #[test]
    fn test_apply_keeps_immutable_fields() {
        let mut user = sample_user();
        let update = UserUpdate {
            username: Some("renamed".to_string()),
            avatar: Some(None),
            latest_ip: Some("10.0.0.2".to_string()),
            ..Default::default()
        };

        user.apply(&update);

        assert_eq!(user.username, "renamed");
        assert_eq!(user.avatar, None);
        assert_eq!(user.latest_ip, "10.0.0.2");
        assert_eq!(user.id, "1001");
        assert_eq!(user.registered, "2026-01-01T00:00:00.000Z");
        assert_eq!(user.posts, 3);
    }

    #[test]
    fn test_update_serializes_only_set_fields() {
        let update = UserUpdate {
            permissions: Some(UserPermissions::AUDIT),
            ..Default::default()
        };

        assert_eq!(update.field_names(), vec!["permissions"]);
        assert_eq!(
            serde_json::to_value(&update).unwrap(),
            serde_json::json!({ "permissions": 2 })
        );
        assert!(UserUpdate::default().is_empty());
    }

    #[test]
    fn test_update_reads_back_from_stored_document() {
        let stored = serde_json::to_value(sample_user()).unwrap();

        let echoed: UserUpdate = serde_json::from_value(stored).unwrap();

        assert_eq!(echoed.username.as_deref(), Some("aims"));
        assert_eq!(echoed.permissions, Some(UserPermissions::DEFAULT));
        assert_eq!(echoed.avatar, Some(Some("abc".to_string())));

        let partial: UserUpdate =
            serde_json::from_value(serde_json::json!({ "permissions": 2 })).unwrap();
        assert_eq!(partial.field_names(), vec!["permissions"]);
    }
}
