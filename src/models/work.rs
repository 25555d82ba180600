//! Construction sites ("obras"), the tenant unit.

use serde::{Deserialize, Serialize};

use super::null_as_empty;

pub const TABLE: &str = "obras";

/// Work site row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Work {
    pub id: i64,
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "endereco", default, deserialize_with = "null_as_empty")]
    pub address: String,
    #[serde(rename = "ativo", default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

/// DTO for creating a work site.
#[derive(Debug, Clone, Serialize)]
pub struct NewWork {
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "endereco")]
    pub address: String,
    #[serde(rename = "ativo")]
    pub active: bool,
}

impl NewWork {
    /// Upper-cased draft. Name is required.
    pub fn new(name: &str, address: &str) -> Option<Self> {
        let name = crate::format::upper(name.trim());
        if name.is_empty() {
            return None;
        }
        Some(Self {
            name,
            address: crate::format::upper(address.trim()),
            active: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_work_requires_name() {
        assert!(NewWork::new("   ", "RUA A").is_none());

        let work = NewWork::new(" residencial aurora ", "rua das flores, 10").unwrap();
        assert_eq!(work.name, "RESIDENCIAL AURORA");
        assert_eq!(work.address, "RUA DAS FLORES, 10");
        assert!(work.active);
    }

    #[test]
    fn test_deserialize_without_active_column() {
        let work: Work = serde_json::from_str(r#"{"id": 4, "nome": "TORRE B", "endereco": null}"#).unwrap();
        assert!(work.active);
        assert_eq!(work.address, "");
    }
}
