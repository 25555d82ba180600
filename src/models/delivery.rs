//! Delivery records and DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{GateRecord, any_contains, null_as_empty, record_exit};

/// Backend table for deliveries.
pub const TABLE: &str = "entregas";

/// Columns fetched for lists; photos are loaded on demand.
pub const LIST_COLUMNS: &str =
    "id,obra_id,usuario_id,fornecedor,motorista,documento_motorista,nota_fiscal,placa,entrada,saida";

/// Photo columns.
pub const PHOTO_COLUMNS: &str = "foto_nota,foto_placa";

/// Delivery row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Delivery {
    pub id: i64,
    #[serde(rename = "obra_id")]
    pub work_id: i64,
    #[serde(rename = "usuario_id", default)]
    pub user_id: Option<Uuid>,
    #[serde(rename = "fornecedor")]
    pub supplier: String,
    #[serde(rename = "motorista", default, deserialize_with = "null_as_empty")]
    pub driver_name: String,
    #[serde(rename = "documento_motorista", default, deserialize_with = "null_as_empty")]
    pub driver_document: String,
    #[serde(rename = "nota_fiscal", default, deserialize_with = "null_as_empty")]
    pub invoice_number: String,
    #[serde(rename = "placa", default, deserialize_with = "null_as_empty")]
    pub license_plate: String,
    #[serde(rename = "foto_nota", default, skip_serializing_if = "Option::is_none")]
    pub invoice_photo: Option<String>,
    #[serde(rename = "foto_placa", default, skip_serializing_if = "Option::is_none")]
    pub plate_photo: Option<String>,
    #[serde(rename = "entrada")]
    pub entry_time: DateTime<Utc>,
    #[serde(rename = "saida", default)]
    pub exit_time: Option<DateTime<Utc>>,
}

impl Delivery {
    /// Record the exit. A second call keeps the first exit time.
    pub fn mark_exit(&mut self, at: DateTime<Utc>) -> bool {
        record_exit(&mut self.exit_time, at)
    }

    pub fn attach_photos(&mut self, photos: DeliveryPhotos) {
        self.invoice_photo = photos.invoice_photo;
        self.plate_photo = photos.plate_photo;
    }
}

impl GateRecord for Delivery {
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
        if self.driver_name.is_empty() {
            &self.supplier
        } else {
            &self.driver_name
        }
    }

    fn matches_search(&self, term: &str) -> bool {
        any_contains(
            &[&self.supplier, &self.driver_name, &self.license_plate, &self.invoice_number],
            term,
        )
    }
}

/// Photo columns of one delivery.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeliveryPhotos {
    #[serde(rename = "foto_nota", default)]
    pub invoice_photo: Option<String>,
    #[serde(rename = "foto_placa", default)]
    pub plate_photo: Option<String>,
}

/// DTO for registering a delivery.
#[derive(Debug, Clone, Serialize)]
pub struct NewDelivery {
    #[serde(rename = "obra_id")]
    pub work_id: i64,
    #[serde(rename = "usuario_id")]
    pub user_id: Uuid,
    #[serde(rename = "fornecedor")]
    pub supplier: String,
    #[serde(rename = "motorista")]
    pub driver_name: String,
    #[serde(rename = "documento_motorista")]
    pub driver_document: String,
    #[serde(rename = "nota_fiscal")]
    pub invoice_number: String,
    #[serde(rename = "placa")]
    pub license_plate: String,
    #[serde(rename = "foto_nota")]
    pub invoice_photo: String,
    #[serde(rename = "foto_placa")]
    pub plate_photo: String,
    #[serde(rename = "entrada")]
    pub entry_time: DateTime<Utc>,
}

/// DTO for editing a past delivery.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateDelivery {
    #[serde(rename = "fornecedor", skip_serializing_if = "Option::is_none")]
    pub supplier: Option<String>,
    #[serde(rename = "motorista", skip_serializing_if = "Option::is_none")]
    pub driver_name: Option<String>,
    #[serde(rename = "documento_motorista", skip_serializing_if = "Option::is_none")]
    pub driver_document: Option<String>,
    #[serde(rename = "nota_fiscal", skip_serializing_if = "Option::is_none")]
    pub invoice_number: Option<String>,
    #[serde(rename = "placa", skip_serializing_if = "Option::is_none")]
    pub license_plate: Option<String>,
}

impl UpdateDelivery {
    pub fn diff(original: &Delivery, edited: &Delivery) -> Self {
        fn changed(a: &str, b: &str) -> Option<String> {
            (a != b).then(|| b.to_string())
        }

        Self {
            supplier: changed(&original.supplier, &edited.supplier),
            driver_name: changed(&original.driver_name, &edited.driver_name),
            driver_document: changed(&original.driver_document, &edited.driver_document),
            invoice_number: changed(&original.invoice_number, &edited.invoice_number),
            license_plate: changed(&original.license_plate, &edited.license_plate),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.supplier.is_none()
            && self.driver_name.is_none()
            && self.driver_document.is_none()
            && self.invoice_number.is_none()
            && self.license_plate.is_none()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::TimeZone;

    pub(crate) fn sample_delivery(id: i64) -> Delivery {
        Delivery {
            id,
            work_id: 1,
            user_id: None,
            supplier: "CIMENTOS SA".to_string(),
            driver_name: "CARLOS".to_string(),
            driver_document: "12.345.678-9".to_string(),
            invoice_number: "NF-4411".to_string(),
            license_plate: "XYZ9A87".to_string(),
            invoice_photo: None,
            plate_photo: None,
            entry_time: Utc.with_ymd_and_hms(2026, 10, 15, 13, 30, 0).unwrap(),
            exit_time: None,
        }
    }

    #[test]
    fn test_deserialize_list_row() {
        let json = r#"{
            "id": 3, "obra_id": 1, "usuario_id": "00000000-0000-0000-0000-000000000000",
            "fornecedor": "AREIA LTDA", "motorista": null, "documento_motorista": "123",
            "nota_fiscal": "991", "placa": "ABC1234",
            "entrada": "2026-10-15T10:00:00+00:00", "saida": "2026-10-15T11:00:00+00:00"
        }"#;

        let delivery: Delivery = serde_json::from_str(json).unwrap();
        assert_eq!(delivery.supplier, "AREIA LTDA");
        assert_eq!(delivery.driver_name, "");
        assert_eq!(delivery.display_name(), "AREIA LTDA");
        assert!(!delivery.is_active());
    }

    #[test]
    fn test_exit_keeps_first_time() {
        let mut delivery = sample_delivery(1);
        let first = Utc.with_ymd_and_hms(2026, 10, 15, 14, 0, 0).unwrap();
        assert!(delivery.mark_exit(first));
        assert!(!delivery.mark_exit(Utc.with_ymd_and_hms(2026, 10, 16, 9, 0, 0).unwrap()));
        assert_eq!(delivery.exit_time, Some(first));
    }

    #[test]
    fn test_search_covers_invoice_and_plate() {
        let delivery = sample_delivery(1);
        assert!(delivery.matches_search("nf-44"));
        assert!(delivery.matches_search("xyz9"));
        assert!(delivery.matches_search("cimentos"));
        assert!(!delivery.matches_search("pedra"));
    }

    #[test]
    fn test_update_diff() {
        let original = sample_delivery(1);
        let mut edited = original.clone();
        edited.invoice_number = "NF-5000".to_string();

        let update = UpdateDelivery::diff(&original, &edited);
        assert_eq!(update.invoice_number.as_deref(), Some("NF-5000"));
        assert!(update.supplier.is_none());
        assert!(!update.is_empty());
    }
}
