//! User profiles: role and assigned work site.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use super::null_as_empty;

pub const TABLE: &str = "perfis";

/// Closed set of roles.
///
/// Stored as free text in the profile table; unknown values fall back to
/// the least privileged role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Role {
    Admin,
    Manager,
    #[default]
    Guard,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Admin, Role::Manager, Role::Guard];

    /// Parse the stored role text. Case-insensitive; `administrador` is an
    /// accepted alias of `admin`.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "admin" | "administrador" => Role::Admin,
            "gestor" => Role::Manager,
            _ => Role::Guard,
        }
    }

    /// Value written back to the backend.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Manager => "gestor",
            Role::Guard => "porteiro",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Role::Admin => "Administrador",
            Role::Manager => "Gestor",
            Role::Guard => "Porteiro",
        }
    }
}

impl Serialize for Role {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().map(Role::parse).unwrap_or_default())
    }
}

/// Profile row of an authenticated user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    #[serde(rename = "nome_completo", default, deserialize_with = "null_as_empty")]
    pub full_name: String,
    #[serde(rename = "cargo", default)]
    pub role: Role,
    #[serde(rename = "obra_id", default)]
    pub work_id: Option<i64>,
    #[serde(rename = "atualizado_em", default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Profile {
    pub fn display_name(&self) -> &str {
        if self.full_name.is_empty() {
            "Sem nome"
        } else {
            &self.full_name
        }
    }
}

/// Admin change of a user's role and assigned work.
///
/// `work_id: None` clears the assignment.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateProfile {
    #[serde(rename = "cargo")]
    pub role: Role,
    #[serde(rename = "obra_id")]
    pub work_id: Option<i64>,
    #[serde(rename = "atualizado_em")]
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parse_aliases() {
        assert_eq!(Role::parse("admin"), Role::Admin);
        assert_eq!(Role::parse("Administrador"), Role::Admin);
        assert_eq!(Role::parse(" ADMIN "), Role::Admin);
        assert_eq!(Role::parse("gestor"), Role::Manager);
        assert_eq!(Role::parse("porteiro"), Role::Guard);
        assert_eq!(Role::parse("estagiario"), Role::Guard);
    }

    #[test]
    fn test_role_round_trip_text() {
        for role in Role::ALL {
            assert_eq!(Role::parse(role.as_str()), role);
        }
    }

    #[test]
    fn test_profile_with_null_role_and_site() {
        let json = r#"{"id": "7f1c0c36-3f51-4a43-9f7f-1a0f3d2c9b11", "nome_completo": "ANA", "cargo": null, "obra_id": null}"#;
        let profile: Profile = serde_json::from_str(json).unwrap();
        assert_eq!(profile.role, Role::Guard);
        assert_eq!(profile.work_id, None);
    }

    #[test]
    fn test_update_profile_writes_null_site() {
        let update = UpdateProfile {
            role: Role::Manager,
            work_id: None,
            updated_at: Utc::now(),
        };
        let value = serde_json::to_value(&update).unwrap();
        assert_eq!(value["cargo"], "gestor");
        assert!(value["obra_id"].is_null());
    }
}
