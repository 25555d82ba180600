//! Entry forms for visitors and deliveries.
//!
//! Text is stored upper-cased and documents masked as typed. Validation
//! runs before any request and yields one aggregated message.

use chrono::{DateTime, Utc};

use crate::camera::Photo;
use crate::error::{AppError, Result};
use crate::format::{format_document, format_plate, upper};
use crate::models::{Delivery, Epi, NewDelivery, NewVisitor, Vehicle, Visitor};
use crate::session::SessionContext;
use crate::store::GateStore;

const VISITOR_FIELDS_MESSAGE: &str = "Todos os campos obrigatórios e a foto devem ser preenchidos.";
const VISITOR_EPI_MESSAGE: &str = "Confirme o uso de ao menos um EPI (capacete, botina ou óculos).";
const DELIVERY_MESSAGE: &str = "Todos os campos e fotos são obrigatórios.";
const LOGIN_MESSAGE: &str = "Informe e-mail e senha.";

/// Soft guard against double submission.
#[derive(Debug, Default)]
pub struct SubmitGuard {
    in_flight: bool,
}

impl SubmitGuard {
    /// Claim the guard; `false` while a submission is running.
    pub fn begin(&mut self) -> bool {
        if self.in_flight {
            return false;
        }
        self.in_flight = true;
        true
    }

    pub fn finish(&mut self) {
        self.in_flight = false;
    }

    pub fn is_submitting(&self) -> bool {
        self.in_flight
    }
}

fn filled(value: &str) -> bool {
    !value.trim().is_empty()
}

/// Whether the login screen signs in or creates an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoginMode {
    #[default]
    SignIn,
    SignUp,
}

#[derive(Debug, Default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    pub mode: LoginMode,
    pub guard: SubmitGuard,
}

impl LoginForm {
    /// Trimmed e-mail and the password, or the local rejection.
    pub fn credentials(&self) -> Result<(String, String)> {
        let email = self.email.trim();
        if email.is_empty() || self.password.is_empty() {
            return Err(AppError::validation(LOGIN_MESSAGE));
        }
        Ok((email.to_string(), self.password.clone()))
    }

    pub fn toggle_mode(&mut self) {
        self.mode = match self.mode {
            LoginMode::SignIn => LoginMode::SignUp,
            LoginMode::SignUp => LoginMode::SignIn,
        };
    }
}

#[derive(Debug, Default)]
pub struct VisitorForm {
    pub name: String,
    pub document: String,
    pub company: String,
    pub visit_reason: String,
    pub person_visited: String,
    pub epi: Epi,
    pub vehicle: Vehicle,
    pub photo: Option<Photo>,
    pub plate_photo: Option<Photo>,
    /// Site chosen by an admin; ignored for assigned users.
    pub work_id: Option<i64>,
    pub guard: SubmitGuard,
}

impl VisitorForm {
    /// Apply the stored casing and masks to every field.
    pub fn normalize(&mut self) {
        self.name = upper(&self.name);
        self.document = format_document(&self.document);
        self.company = upper(&self.company);
        self.visit_reason = upper(&self.visit_reason);
        self.person_visited = upper(&self.person_visited);
        self.vehicle.model = upper(&self.vehicle.model);
        self.vehicle.color = upper(&self.vehicle.color);
        self.vehicle.plate = format_plate(&self.vehicle.plate);
    }

    pub fn validate(&self) -> Result<()> {
        let complete = filled(&self.name)
            && filled(&self.document)
            && filled(&self.company)
            && filled(&self.visit_reason)
            && filled(&self.person_visited)
            && self.photo.is_some();
        if !complete {
            return Err(AppError::validation(VISITOR_FIELDS_MESSAGE));
        }
        if !self.epi.any() {
            return Err(AppError::validation(VISITOR_EPI_MESSAGE));
        }
        Ok(())
    }

    /// Validated insert payload for the caller's site.
    pub fn prepare(&self, ctx: &SessionContext, now: DateTime<Utc>) -> Result<NewVisitor> {
        self.validate()?;
        let work_id = ctx.scope().write_site(self.work_id)?;
        let photo = self.photo.as_ref().ok_or_else(|| AppError::validation(VISITOR_FIELDS_MESSAGE))?;

        Ok(NewVisitor {
            work_id,
            user_id: ctx.user_id(),
            name: upper(self.name.trim()),
            document: format_document(&self.document),
            company: upper(self.company.trim()),
            visit_reason: upper(self.visit_reason.trim()),
            person_visited: upper(self.person_visited.trim()),
            epi: self.epi,
            vehicle: Vehicle {
                model: upper(self.vehicle.model.trim()),
                color: upper(self.vehicle.color.trim()),
                plate: format_plate(&self.vehicle.plate),
            },
            photo: photo.data_url().to_string(),
            plate_photo: self.plate_photo.as_ref().map(|p| p.data_url().to_string()),
            entry_time: now,
        })
    }

    /// Empty the form, keeping the admin's site choice.
    pub fn clear(&mut self) {
        let work_id = self.work_id;
        *self = Self {
            work_id,
            ..Default::default()
        };
    }
}

#[derive(Debug, Default)]
pub struct DeliveryForm {
    pub supplier: String,
    pub driver_name: String,
    pub driver_document: String,
    pub invoice_number: String,
    pub license_plate: String,
    pub invoice_photo: Option<Photo>,
    pub plate_photo: Option<Photo>,
    pub work_id: Option<i64>,
    pub guard: SubmitGuard,
}

impl DeliveryForm {
    pub fn normalize(&mut self) {
        self.supplier = upper(&self.supplier);
        self.driver_name = upper(&self.driver_name);
        self.driver_document = format_document(&self.driver_document);
        self.invoice_number = upper(&self.invoice_number);
        self.license_plate = format_plate(&self.license_plate);
    }

    pub fn validate(&self) -> Result<()> {
        let complete = filled(&self.supplier)
            && filled(&self.driver_name)
            && filled(&self.driver_document)
            && filled(&self.invoice_number)
            && filled(&self.license_plate)
            && self.invoice_photo.is_some()
            && self.plate_photo.is_some();
        if complete {
            Ok(())
        } else {
            Err(AppError::validation(DELIVERY_MESSAGE))
        }
    }

    pub fn prepare(&self, ctx: &SessionContext, now: DateTime<Utc>) -> Result<NewDelivery> {
        self.validate()?;
        let work_id = ctx.scope().write_site(self.work_id)?;
        let (Some(invoice_photo), Some(plate_photo)) = (&self.invoice_photo, &self.plate_photo) else {
            return Err(AppError::validation(DELIVERY_MESSAGE));
        };

        Ok(NewDelivery {
            work_id,
            user_id: ctx.user_id(),
            supplier: upper(self.supplier.trim()),
            driver_name: upper(self.driver_name.trim()),
            driver_document: format_document(&self.driver_document),
            invoice_number: upper(self.invoice_number.trim()),
            license_plate: format_plate(&self.license_plate),
            invoice_photo: invoice_photo.data_url().to_string(),
            plate_photo: plate_photo.data_url().to_string(),
            entry_time: now,
        })
    }

    pub fn clear(&mut self) {
        let work_id = self.work_id;
        *self = Self {
            work_id,
            ..Default::default()
        };
    }
}

/// Validate and insert. Nothing is sent when validation fails.
pub async fn submit_visitor(store: &dyn GateStore, ctx: &SessionContext, draft: Result<NewVisitor>) -> Result<Visitor> {
    let draft = draft?;
    ctx.scope().check_write(draft.work_id)?;
    store.insert_visitor(draft).await
}

/// Validate and insert. Nothing is sent when validation fails.
pub async fn submit_delivery(
    store: &dyn GateStore,
    ctx: &SessionContext,
    draft: Result<NewDelivery>,
) -> Result<Delivery> {
    let draft = draft?;
    ctx.scope().check_write(draft.work_id)?;
    store.insert_delivery(draft).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use crate::session::tests::context;
    use crate::store::tests::FakeStore;
    use image::RgbImage;

    fn photo() -> Photo {
        Photo::encode_jpeg(&RgbImage::new(8, 8), 80).unwrap()
    }

    fn complete_delivery() -> DeliveryForm {
        DeliveryForm {
            supplier: "cimentos sa".to_string(),
            driver_name: "carlos".to_string(),
            driver_document: "123456789".to_string(),
            invoice_number: "nf-10".to_string(),
            license_plate: "abc-1234".to_string(),
            invoice_photo: Some(photo()),
            plate_photo: Some(photo()),
            ..Default::default()
        }
    }

    fn complete_visitor() -> VisitorForm {
        VisitorForm {
            name: "ana souza".to_string(),
            document: "12345678909".to_string(),
            company: "acme".to_string(),
            visit_reason: "reunião".to_string(),
            person_visited: "eng. pedro".to_string(),
            epi: Epi {
                helmet: true,
                ..Default::default()
            },
            photo: Some(photo()),
            ..Default::default()
        }
    }

    fn now() -> DateTime<Utc> {
        "2026-10-15T12:00:00Z".parse().unwrap()
    }

    #[tokio::test]
    async fn test_delivery_missing_any_field_sends_nothing() {
        let ctx = context(Role::Guard, Some(1));
        let blanks: [fn(&mut DeliveryForm); 7] = [
            |f| f.supplier.clear(),
            |f| f.driver_name.clear(),
            |f| f.driver_document = "  ".to_string(),
            |f| f.invoice_number.clear(),
            |f| f.license_plate.clear(),
            |f| f.invoice_photo = None,
            |f| f.plate_photo = None,
        ];

        for blank in blanks {
            let store = FakeStore::default();
            let mut form = complete_delivery();
            blank(&mut form);

            let err = submit_delivery(&store, &ctx, form.prepare(&ctx, now())).await.unwrap_err();
            assert_eq!(err.to_string(), DELIVERY_MESSAGE);
            assert_eq!(store.calls(), 0);
        }
    }

    #[tokio::test]
    async fn test_complete_delivery_is_normalised_and_sent() {
        let ctx = context(Role::Guard, Some(1));
        let store = FakeStore::default();
        let form = complete_delivery();

        let saved = submit_delivery(&store, &ctx, form.prepare(&ctx, now())).await.unwrap();
        assert_eq!(store.calls(), 1);
        assert_eq!(saved.supplier, "CIMENTOS SA");
        assert_eq!(saved.driver_document, "12.345.678-9");
        assert_eq!(saved.license_plate, "ABC1234");
        assert_eq!(saved.work_id, 1);
    }

    #[test]
    fn test_visitor_validation_messages() {
        let mut form = complete_visitor();
        assert!(form.validate().is_ok());

        form.epi = Epi::default();
        assert_eq!(form.validate().unwrap_err().to_string(), VISITOR_EPI_MESSAGE);

        form.photo = None;
        assert_eq!(form.validate().unwrap_err().to_string(), VISITOR_FIELDS_MESSAGE);
    }

    #[test]
    fn test_visitor_plate_photo_optional() {
        let ctx = context(Role::Guard, Some(3));
        let draft = complete_visitor().prepare(&ctx, now()).unwrap();
        assert!(draft.plate_photo.is_none());
        assert_eq!(draft.work_id, 3);
        assert_eq!(draft.name, "ANA SOUZA");
        assert_eq!(draft.document, "123.456.789-09");
        assert_eq!(draft.visit_reason, "REUNIÃO");
    }

    #[test]
    fn test_admin_must_choose_site() {
        let ctx = context(Role::Admin, None);
        let mut form = complete_visitor();
        assert!(matches!(form.prepare(&ctx, now()), Err(AppError::Validation(_))));

        form.work_id = Some(5);
        assert_eq!(form.prepare(&ctx, now()).unwrap().work_id, 5);
    }

    #[tokio::test]
    async fn test_unassigned_guard_cannot_submit() {
        let ctx = context(Role::Guard, None);
        let store = FakeStore::default();
        let err = submit_visitor(&store, &ctx, complete_visitor().prepare(&ctx, now()))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
        assert_eq!(store.calls(), 0);
    }

    #[test]
    fn test_normalize_and_clear() {
        let mut form = complete_visitor();
        form.vehicle.plate = "abc-1d23".to_string();
        form.work_id = Some(2);
        form.normalize();
        assert_eq!(form.name, "ANA SOUZA");
        assert_eq!(form.vehicle.plate, "ABC1D23");

        form.clear();
        assert!(form.name.is_empty());
        assert!(form.photo.is_none());
        assert_eq!(form.work_id, Some(2));
    }

    #[test]
    fn test_login_requires_both_fields() {
        let mut form = LoginForm {
            email: "  guarda@obra.com ".to_string(),
            ..Default::default()
        };
        assert_eq!(form.credentials().unwrap_err().to_string(), LOGIN_MESSAGE);

        form.password = "segredo".to_string();
        let (email, password) = form.credentials().unwrap();
        assert_eq!(email, "guarda@obra.com");
        assert_eq!(password, "segredo");

        form.email = "   ".to_string();
        assert!(form.credentials().is_err());

        form.toggle_mode();
        assert_eq!(form.mode, LoginMode::SignUp);
    }

    #[test]
    fn test_submit_guard() {
        let mut guard = SubmitGuard::default();
        assert!(guard.begin());
        assert!(!guard.begin());
        assert!(guard.is_submitting());
        guard.finish();
        assert!(guard.begin());
    }
}
