//! Admin user management list.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::format;
use crate::domain::{EntityId, ListScreen, Role};

/// Collection endpoint.
pub const USERS_PATH: &str = "/admin/users";

/// Filter parameter names accepted by the users endpoint.
pub mod filters {
    /// Account status, e.g. `ACTIVE` or `SUSPENDED`.
    pub const STATUS: &str = "status";
    /// Principal role.
    pub const ROLE: &str = "role";
    /// Free-text search over name, email and phone.
    pub const SEARCH: &str = "search";
}

/// User as returned by the backend.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRow {
    /// Backend id.
    pub id: EntityId,
    /// Login name.
    #[serde(default)]
    pub username: Option<String>,
    /// Display name.
    #[serde(default, alias = "fullName")]
    pub name: Option<String>,
    /// Contact email.
    #[serde(default)]
    pub email: Option<String>,
    /// Contact phone.
    #[serde(default, alias = "phoneNumber")]
    pub phone: Option<String>,
    /// Role as reported; unknown roles are shown verbatim.
    #[serde(default)]
    pub role: Option<String>,
    /// Account status.
    #[serde(default)]
    pub status: Option<String>,
    /// Registration time.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Row shown in the users table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserView {
    /// Backend id.
    pub id: EntityId,
    /// Display name, falling back to the username.
    pub name: String,
    /// Email or phone.
    pub contact: String,
    /// Role label.
    pub role: String,
    /// Status label.
    pub status: String,
    /// Registration day.
    pub joined: String,
}

/// Paginated users screen.
#[derive(Debug, Clone, Copy, Default)]
pub struct UserList;

impl ListScreen for UserList {
    type Row = UserRow;
    type View = UserView;

    fn label(&self) -> &'static str {
        "User"
    }

    fn collection_path(&self) -> String {
        USERS_PATH.to_owned()
    }

    fn plural(&self) -> &'static str {
        "users"
    }

    fn project(&self, row: &UserRow) -> UserView {
        UserView {
            id: row.id.clone(),
            name: format::text(row.name.as_deref().or(row.username.as_deref())),
            contact: format::text(row.email.as_deref().or(row.phone.as_deref())),
            role: row.role.as_deref().map_or_else(
                || format::MISSING.to_owned(),
                |raw| parse_role(raw).map_or_else(|| raw.to_owned(), role_label),
            ),
            status: format::text(row.status.as_deref()),
            joined: format::day(row.created_at.as_ref()),
        }
    }
}

/// Parse a backend role name.
pub fn parse_role(raw: &str) -> Option<Role> {
    serde_json::from_value(serde_json::Value::String(raw.to_owned())).ok()
}

/// Human label for a role.
pub fn role_label(role: Role) -> String {
    match role {
        Role::NormalUser => "Rider",
        Role::Driver => "Driver",
        Role::Admin => "Admin",
        Role::SuperAdmin => "Super admin",
    }
    .to_owned()
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    fn projection_prefers_name_and_email() {
        let row: UserRow = serde_json::from_value(json!({
            "id": 4,
            "username": "ada",
            "fullName": "Ada Obi",
            "phoneNumber": "0803",
            "role": "NORMAL_USER",
            "status": "ACTIVE",
            "createdAt": "2026-01-02T10:00:00Z"
        }))
        .expect("row decodes");

        let view = UserList.project(&row);

        assert_eq!(view.name, "Ada Obi");
        assert_eq!(view.contact, "0803");
        assert_eq!(view.role, "Rider");
        assert_eq!(view.joined, "2026-01-02");
    }

    #[rstest]
    fn unknown_fields_fall_back_to_placeholders() {
        let row: UserRow = serde_json::from_value(json!({ "id": "u-1" })).expect("row decodes");
        let view = UserList.project(&row);
        assert_eq!(view.name, format::MISSING);
        assert_eq!(view.role, format::MISSING);
    }

    #[rstest]
    fn unknown_roles_are_shown_verbatim() {
        let row: UserRow =
            serde_json::from_value(json!({ "id": 1, "role": "AUDITOR" })).expect("row decodes");
        assert_eq!(UserList.project(&row).role, "AUDITOR");
    }
}
