//! Visitor records and DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{GateRecord, any_contains, null_as_empty, null_as_false, record_exit};

/// Backend table for visitors.
pub const TABLE: &str = "visitantes";

/// Columns fetched for lists; photos are loaded on demand.
pub const LIST_COLUMNS: &str = "id,obra_id,usuario_id,nome,documento,empresa,motivo_visita,pessoa_visitada,\
capacete,botas,oculos,veiculo_modelo,veiculo_cor,veiculo_placa,entrada,saida";

/// Photo columns.
pub const PHOTO_COLUMNS: &str = "foto,foto_placa";

/// Safety equipment (EPI) confirmed at the gate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Epi {
    #[serde(rename = "capacete", default, deserialize_with = "null_as_false")]
    pub helmet: bool,
    #[serde(rename = "botas", default, deserialize_with = "null_as_false")]
    pub boots: bool,
    #[serde(rename = "oculos", default, deserialize_with = "null_as_false")]
    pub glasses: bool,
}

impl Epi {
    /// At least one item confirmed.
    pub fn any(&self) -> bool {
        self.helmet || self.boots || self.glasses
    }

    /// Items with their pt-BR labels, in display order.
    pub fn items(&self) -> [(&'static str, bool); 3] {
        [("Capacete", self.helmet), ("Botina", self.boots), ("Óculos", self.glasses)]
    }
}

/// Vehicle the visitor arrived with (all fields optional).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vehicle {
    #[serde(rename = "veiculo_modelo", default, deserialize_with = "null_as_empty")]
    pub model: String,
    #[serde(rename = "veiculo_cor", default, deserialize_with = "null_as_empty")]
    pub color: String,
    #[serde(rename = "veiculo_placa", default, deserialize_with = "null_as_empty")]
    pub plate: String,
}

impl Vehicle {
    pub fn is_empty(&self) -> bool {
        self.model.is_empty() && self.color.is_empty() && self.plate.is_empty()
    }
}

/// Visitor row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Visitor {
    pub id: i64,
    #[serde(rename = "obra_id")]
    pub work_id: i64,
    #[serde(rename = "usuario_id", default)]
    pub user_id: Option<Uuid>,
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "documento")]
    pub document: String,
    #[serde(rename = "empresa", default, deserialize_with = "null_as_empty")]
    pub company: String,
    #[serde(rename = "motivo_visita", default, deserialize_with = "null_as_empty")]
    pub visit_reason: String,
    #[serde(rename = "pessoa_visitada", default, deserialize_with = "null_as_empty")]
    pub person_visited: String,
    #[serde(flatten)]
    pub epi: Epi,
    #[serde(flatten)]
    pub vehicle: Vehicle,
    #[serde(rename = "foto", default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
    #[serde(rename = "foto_placa", default, skip_serializing_if = "Option::is_none")]
    pub plate_photo: Option<String>,
    #[serde(rename = "entrada")]
    pub entry_time: DateTime<Utc>,
    #[serde(rename = "saida", default)]
    pub exit_time: Option<DateTime<Utc>>,
}

impl Visitor {
    /// Record the exit. A second call keeps the first exit time.
    pub fn mark_exit(&mut self, at: DateTime<Utc>) -> bool {
        record_exit(&mut self.exit_time, at)
    }

    /// Attach photos fetched separately.
    pub fn attach_photos(&mut self, photos: VisitorPhotos) {
        self.photo = photos.photo;
        self.plate_photo = photos.plate_photo;
    }
}

impl GateRecord for Visitor {
    fn id(&self) -> i64 {
        self.id
    }

    fn work_id(&self) -> i64 {
        self.work_id
    }

    fn entry_time(&self) -> DateTime<Utc> {
        self.entry_time
    }

    fn exit_time(&self) -> Option<DateTime<Utc>> {
        self.exit_time
    }

    fn display_name(&self) -> &str {
        if self.name.is_empty() { "Visitante" } else { &self.name }
    }

    fn matches_search(&self, term: &str) -> bool {
        any_contains(
            &[&self.name, &self.document, &self.company, &self.vehicle.plate],
            term,
        )
    }
}

/// Photo columns of one visitor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VisitorPhotos {
    #[serde(rename = "foto", default)]
    pub photo: Option<String>,
    #[serde(rename = "foto_placa", default)]
    pub plate_photo: Option<String>,
}

/// DTO for registering a visitor entry.
#[derive(Debug, Clone, Serialize)]
pub struct NewVisitor {
    #[serde(rename = "obra_id")]
    pub work_id: i64,
    #[serde(rename = "usuario_id")]
    pub user_id: Uuid,
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "documento")]
    pub document: String,
    #[serde(rename = "empresa")]
    pub company: String,
    #[serde(rename = "motivo_visita")]
    pub visit_reason: String,
    #[serde(rename = "pessoa_visitada")]
    pub person_visited: String,
    #[serde(flatten)]
    pub epi: Epi,
    #[serde(flatten)]
    pub vehicle: Vehicle,
    #[serde(rename = "foto")]
    pub photo: String,
    #[serde(rename = "foto_placa", skip_serializing_if = "Option::is_none")]
    pub plate_photo: Option<String>,
    #[serde(rename = "entrada")]
    pub entry_time: DateTime<Utc>,
}

/// DTO for editing a past visitor record. Exit time is not editable.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateVisitor {
    #[serde(rename = "nome", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "documento", skip_serializing_if = "Option::is_none")]
    pub document: Option<String>,
    #[serde(rename = "empresa", skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(rename = "motivo_visita", skip_serializing_if = "Option::is_none")]
    pub visit_reason: Option<String>,
    #[serde(rename = "pessoa_visitada", skip_serializing_if = "Option::is_none")]
    pub person_visited: Option<String>,
    #[serde(rename = "capacete", skip_serializing_if = "Option::is_none")]
    pub helmet: Option<bool>,
    #[serde(rename = "botas", skip_serializing_if = "Option::is_none")]
    pub boots: Option<bool>,
    #[serde(rename = "oculos", skip_serializing_if = "Option::is_none")]
    pub glasses: Option<bool>,
    #[serde(rename = "veiculo_modelo", skip_serializing_if = "Option::is_none")]
    pub vehicle_model: Option<String>,
    #[serde(rename = "veiculo_cor", skip_serializing_if = "Option::is_none")]
    pub vehicle_color: Option<String>,
    #[serde(rename = "veiculo_placa", skip_serializing_if = "Option::is_none")]
    pub vehicle_plate: Option<String>,
}

impl UpdateVisitor {
    /// Changed fields between the stored record and an edited copy.
    pub fn diff(original: &Visitor, edited: &Visitor) -> Self {
        fn changed<T: PartialEq + Clone>(a: &T, b: &T) -> Option<T> {
            (a != b).then(|| b.clone())
        }

        Self {
            name: changed(&original.name, &edited.name),
            document: changed(&original.document, &edited.document),
            company: changed(&original.company, &edited.company),
            visit_reason: changed(&original.visit_reason, &edited.visit_reason),
            person_visited: changed(&original.person_visited, &edited.person_visited),
            helmet: changed(&original.epi.helmet, &edited.epi.helmet),
            boots: changed(&original.epi.boots, &edited.epi.boots),
            glasses: changed(&original.epi.glasses, &edited.epi.glasses),
            vehicle_model: changed(&original.vehicle.model, &edited.vehicle.model),
            vehicle_color: changed(&original.vehicle.color, &edited.vehicle.color),
            vehicle_plate: changed(&original.vehicle.plate, &edited.vehicle.plate),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.document.is_none()
            && self.company.is_none()
            && self.visit_reason.is_none()
            && self.person_visited.is_none()
            && self.helmet.is_none()
            && self.boots.is_none()
            && self.glasses.is_none()
            && self.vehicle_model.is_none()
            && self.vehicle_color.is_none()
            && self.vehicle_plate.is_none()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::TimeZone;

    pub(crate) fn sample_visitor(id: i64) -> Visitor {
        Visitor {
            id,
            work_id: 1,
            user_id: None,
            name: "JOÃO SILVA".to_string(),
            document: "123.456.789-09".to_string(),
            company: "ACME".to_string(),
            visit_reason: "REUNIÃO".to_string(),
            person_visited: "ENG. MARIA".to_string(),
            epi: Epi {
                helmet: true,
                boots: true,
                glasses: false,
            },
            vehicle: Vehicle {
                model: "GOL".to_string(),
                color: "PRATA".to_string(),
                plate: "ABC1D23".to_string(),
            },
            photo: None,
            plate_photo: None,
            entry_time: Utc.with_ymd_and_hms(2026, 10, 15, 11, 0, 0).unwrap(),
            exit_time: None,
        }
    }

    #[test]
    fn test_deserialize_row_with_nulls() {
        let json = r#"{
            "id": 7, "obra_id": 2, "usuario_id": null,
            "nome": "ANA", "documento": "12.345.678-9", "empresa": null,
            "motivo_visita": "ENTREGA", "pessoa_visitada": "PEDRO",
            "capacete": true, "botas": null, "oculos": false,
            "veiculo_modelo": null, "veiculo_cor": null, "veiculo_placa": null,
            "entrada": "2026-10-15T08:30:00.123456+00:00", "saida": null
        }"#;

        let visitor: Visitor = serde_json::from_str(json).unwrap();
        assert_eq!(visitor.id, 7);
        assert_eq!(visitor.company, "");
        assert!(visitor.epi.helmet);
        assert!(!visitor.epi.boots);
        assert!(visitor.vehicle.is_empty());
        assert!(visitor.photo.is_none());
        assert!(visitor.is_active());
    }

    #[test]
    fn test_exit_is_one_way() {
        let mut visitor = sample_visitor(1);
        let first = Utc.with_ymd_and_hms(2026, 10, 15, 12, 0, 0).unwrap();
        let later = Utc.with_ymd_and_hms(2026, 10, 15, 18, 0, 0).unwrap();

        assert!(visitor.is_active());
        assert!(visitor.mark_exit(first));
        assert!(!visitor.is_active());

        assert!(!visitor.mark_exit(later));
        assert_eq!(visitor.exit_time, Some(first));
        assert!(!visitor.is_active());
    }

    #[test]
    fn test_search_covers_plate() {
        let visitor = sample_visitor(1);
        assert!(visitor.matches_search("abc1"));
        assert!(visitor.matches_search("acme"));
        assert!(visitor.matches_search(""));
        assert!(!visitor.matches_search("xyz"));
    }

    #[test]
    fn test_new_visitor_serializes_flat_columns() {
        let draft = NewVisitor {
            work_id: 3,
            user_id: Uuid::nil(),
            name: "ANA".to_string(),
            document: "12.345.678-9".to_string(),
            company: "ACME".to_string(),
            visit_reason: "VISITA".to_string(),
            person_visited: "PEDRO".to_string(),
            epi: Epi {
                helmet: true,
                ..Default::default()
            },
            vehicle: Vehicle::default(),
            photo: "data:image/jpeg;base64,AAAA".to_string(),
            plate_photo: None,
            entry_time: Utc.with_ymd_and_hms(2026, 10, 15, 8, 0, 0).unwrap(),
        };

        let value = serde_json::to_value(&draft).unwrap();
        assert_eq!(value["obra_id"], 3);
        assert_eq!(value["capacete"], true);
        assert_eq!(value["veiculo_placa"], "");
        assert!(value.get("foto_placa").is_none());
        assert!(value.get("saida").is_none());
    }

    #[test]
    fn test_update_diff_only_changed_fields() {
        let original = sample_visitor(1);
        let mut edited = original.clone();
        edited.company = "OUTRA".to_string();
        edited.epi.glasses = true;

        let update = UpdateVisitor::diff(&original, &edited);
        assert_eq!(update.company.as_deref(), Some("OUTRA"));
        assert_eq!(update.glasses, Some(true));
        assert!(update.name.is_none());

        let value = serde_json::to_value(&update).unwrap();
        assert_eq!(value.as_object().unwrap().len(), 2);
        assert!(UpdateVisitor::diff(&original, &original).is_empty());
    }
}
