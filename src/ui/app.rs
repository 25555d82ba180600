//! Main application UI.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Local, Utc};
use eframe::egui::{self, Align, Layout, RichText};
use egui_phosphor::regular::SIGN_OUT;
use image::RgbaImage;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::camera::decode_data_url;
use crate::client::{BackendClient, SignUpOutcome};
use crate::config::AppConfig;
use crate::db;
use crate::db::connection::TableCounts;
use crate::error::AppError;
use crate::export::{self, ExportFormat};
use crate::format::{format_document, format_plate, upper};
use crate::forms::{self, DeliveryForm, LoginForm, LoginMode, VisitorForm};
use crate::models::{
    Delivery, GateRecord, NewWork, Profile, RecordKind, Role, UpdateDelivery, UpdateVisitor, Visitor, Work,
};
use crate::reports::{self, DashboardData, RecordFilter};
use crate::session::{self, Session, SessionContext, SessionStore, Tab};
use crate::store::{GateStore, RemoteStore};

use super::camera_widget::CameraWidget;
use super::components::colors;
use super::{admin_panel, dashboard, deliveries_panel, exit_panel, login_panel, reports_panel, visitors_panel};

/// Wait before retrying a token refresh that failed for a non-auth reason.
const REFRESH_RETRY: Duration = Duration::from_secs(30);

/// Messages from async tasks to UI.
pub enum UiMessage {
    // Authentication
    SignedIn(SessionContext),
    SignUpConfirmationSent(String),
    AuthFailed(AppError),
    RestoreFailed(AppError),
    SessionRefreshed(Session),
    RefreshFailed(AppError),

    // Data loading
    DashboardLoaded(DashboardData),
    RecordsLoaded(Vec<Visitor>, Vec<Delivery>),
    WorksLoaded(Vec<Work>),
    ProfilesLoaded(Vec<Profile>),
    TableCountsLoaded(TableCounts),
    LoadFailed(AppError),

    // Gate operations
    VisitorSaved(Visitor),
    DeliverySaved(Delivery),
    SubmitFailed(RecordKind, AppError),
    ExitRegistered { kind: RecordKind, name: String, done: bool },
    RecordUpdated { kind: RecordKind, found: bool },
    PhotosLoaded { kind: RecordKind, id: i64, photos: Vec<LoadedPhoto> },

    // Admin
    WorkCreated(Work),
    ProfileAssigned(Option<Profile>),

    // Export
    ExportCompleted(PathBuf),
    ExportFailed(String),

    OperationFailed(AppError),
}

/// Sender handed to a spawned task, tagged with the session epoch it was
/// started in.
#[derive(Clone)]
pub struct UiSender {
    epoch: u64,
    tx: mpsc::UnboundedSender<(u64, UiMessage)>,
}

impl UiSender {
    pub fn new(epoch: u64, tx: mpsc::UnboundedSender<(u64, UiMessage)>) -> Self {
        Self { epoch, tx }
    }

    pub fn send(&self, msg: UiMessage) -> Result<(), mpsc::error::SendError<(u64, UiMessage)>> {
        self.tx.send((self.epoch, msg))
    }
}

/// Counter advanced whenever a session starts or ends.
///
/// Results of tasks spawned under an older value belong to a session
/// that no longer exists and are discarded.
#[derive(Debug, Default)]
pub struct SessionEpoch(u64);

impl SessionEpoch {
    pub fn current(&self) -> u64 {
        self.0
    }

    pub fn advance(&mut self) {
        self.0 = self.0.wrapping_add(1);
    }

    pub fn accept(&self, (epoch, msg): (u64, UiMessage)) -> Option<UiMessage> {
        (epoch == self.0).then_some(msg)
    }
}

/// Log level for UI messages.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// Log entry for display in the UI.
#[derive(Clone)]
pub struct LogEntry {
    pub timestamp: DateTime<Local>,
    pub message: String,
    pub level: LogLevel,
}

/// Banner dismissed after `ui.toast_secs`.
pub struct Toast {
    pub level: LogLevel,
    pub message: String,
    shown_at: Instant,
}

/// Record waiting for exit confirmation.
#[derive(Clone)]
pub struct ExitTarget {
    pub kind: RecordKind,
    pub id: i64,
    pub name: String,
}

/// One decoded photo for the evidence modal.
pub struct LoadedPhoto {
    pub label: &'static str,
    pub image: Option<RgbaImage>,
}

/// Evidence modal of the reports view. Photos load on demand.
pub struct PhotoModal {
    pub title: String,
    pub kind: RecordKind,
    pub id: i64,
    pub photos: Option<Vec<(&'static str, Option<egui::TextureHandle>)>>,
}

/// Past record being edited in the reports view.
pub enum EditTarget {
    Visitor { original: Visitor, edited: Visitor },
    Delivery { original: Delivery, edited: Delivery },
}

/// State of the exit view.
#[derive(Default)]
pub struct ExitView {
    pub kind: RecordKind,
    pub search: String,
}

/// State of the reports view.
#[derive(Default)]
pub struct ReportsView {
    pub kind: RecordKind,
    pub filter: RecordFilter,
    pub photo_modal: Option<PhotoModal>,
    pub edit: Option<EditTarget>,
}

/// State of the admin view.
#[derive(Default)]
pub struct AdminView {
    pub work_name: String,
    pub work_address: String,
    pub profile_search: String,
    /// Unsaved role/site choices per user.
    pub drafts: HashMap<Uuid, (Role, Option<i64>)>,
}

/// Main application state.
pub struct App {
    // Runtime and backend
    pub rt: tokio::runtime::Runtime,
    pub client: BackendClient,

    // Message channel for async communication
    pub tx: mpsc::UnboundedSender<(u64, UiMessage)>,
    pub rx: mpsc::UnboundedReceiver<(u64, UiMessage)>,
    epoch: SessionEpoch,

    // Session
    pub session: Option<SessionContext>,
    pub store: Option<Arc<dyn GateStore>>,
    session_store: Option<SessionStore>,
    pub restoring: bool,
    refreshing: bool,
    retry_refresh_at: Option<Instant>,
    pub login: LoginForm,
    pub login_error: Option<String>,
    pub login_notice: Option<String>,

    // Navigation
    pub current_tab: Tab,

    // Cached data
    pub dashboard: DashboardData,
    pub visitors: Vec<Visitor>,
    pub deliveries: Vec<Delivery>,
    pub works: Vec<Work>,
    pub profiles: Vec<Profile>,
    pub table_counts: Option<TableCounts>,
    pub loading: u32,

    // Entry forms
    pub visitor_form: VisitorForm,
    pub visitor_error: Option<String>,
    pub visitor_photo: CameraWidget,
    pub visitor_plate_photo: CameraWidget,
    pub delivery_form: DeliveryForm,
    pub delivery_error: Option<String>,
    pub delivery_invoice_photo: CameraWidget,
    pub delivery_plate_photo: CameraWidget,

    // Views
    pub exit_view: ExitView,
    pub reports: ReportsView,
    pub admin: AdminView,

    // Messages
    pub log_messages: Vec<LogEntry>,
    pub toasts: Vec<Toast>,

    // Dialogs
    pub exit_confirm: Option<ExitTarget>,
    pub sign_out_confirm: bool,

    pub config: AppConfig,
}

impl App {
    pub fn new(config: AppConfig, rt: tokio::runtime::Runtime, client: BackendClient) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let session_store = if config.ui.remember_session {
            SessionStore::default_location()
        } else {
            None
        };

        let mut app = Self {
            rt,
            client,
            tx,
            rx,
            epoch: SessionEpoch::default(),
            session: None,
            store: None,
            session_store,
            restoring: false,
            refreshing: false,
            retry_refresh_at: None,
            login: LoginForm::default(),
            login_error: None,
            login_notice: None,
            current_tab: Tab::default(),
            dashboard: DashboardData::default(),
            visitors: Vec::new(),
            deliveries: Vec::new(),
            works: Vec::new(),
            profiles: Vec::new(),
            table_counts: None,
            loading: 0,
            visitor_form: VisitorForm::default(),
            visitor_error: None,
            visitor_photo: CameraWidget::new("visitor_photo", "Foto do visitante *", &config.camera),
            visitor_plate_photo: CameraWidget::new("visitor_plate_photo", "Foto da placa", &config.camera),
            delivery_form: DeliveryForm::default(),
            delivery_error: None,
            delivery_invoice_photo: CameraWidget::new("delivery_invoice_photo", "Foto da nota fiscal *", &config.camera),
            delivery_plate_photo: CameraWidget::new("delivery_plate_photo", "Foto da placa *", &config.camera),
            exit_view: ExitView::default(),
            reports: ReportsView::default(),
            admin: AdminView::default(),
            log_messages: Vec::new(),
            toasts: Vec::new(),
            exit_confirm: None,
            sign_out_confirm: false,
            config,
        };

        app.restore_session();
        app
    }

    /// Channel end for a task started now.
    fn sender(&self) -> UiSender {
        UiSender::new(self.epoch.current(), self.tx.clone())
    }

    /// Log a message to the UI log.
    pub fn log(&mut self, level: LogLevel, message: impl Into<String>) {
        self.log_messages.push(LogEntry {
            timestamp: Local::now(),
            message: message.into(),
            level,
        });

        // Keep only last 100 messages
        if self.log_messages.len() > 100 {
            self.log_messages.remove(0);
        }
    }

    /// Log a message and show it as a toast.
    pub fn notify(&mut self, level: LogLevel, message: impl Into<String>) {
        let message = message.into();
        self.toasts.push(Toast {
            level,
            message: message.clone(),
            shown_at: Instant::now(),
        });
        self.log(level, message);
    }

    /// Report a failed remote call. Auth failures end the session.
    fn report_error(&mut self, context: &str, error: AppError) {
        if error.is_auth_failure() && self.session.is_some() {
            tracing::warn!("{context}: {error}; session expired");
            self.end_session();
            self.login_error = Some(AppError::Unauthorized.user_message());
            return;
        }
        tracing::error!("{context}: {error}");
        self.notify(LogLevel::Error, error.user_message());
    }

    /// Name of a site for headers and lists.
    pub fn site_name(&self, work_id: i64) -> String {
        self.works
            .iter()
            .find(|w| w.id == work_id)
            .map(|w| w.name.clone())
            .unwrap_or_else(|| format!("Obra {work_id}"))
    }

    // ----- Session -----

    /// Resume the saved session, refreshing the tokens if they are close to expiry.
    fn restore_session(&mut self) {
        let Some(saved) = self.session_store.as_ref().and_then(SessionStore::load) else {
            return;
        };

        self.restoring = true;
        let client = self.client.clone();
        let tx = self.sender();

        self.rt.spawn(async move {
            let result = async {
                let session = if saved.needs_refresh(Utc::now()) {
                    client.refresh(&saved.refresh_token).await?
                } else {
                    saved
                };
                db::profile::load_context(&client, session).await
            }
            .await;

            match result {
                Ok(ctx) => {
                    let _ = tx.send(UiMessage::SignedIn(ctx));
                }
                Err(e) => {
                    let _ = tx.send(UiMessage::RestoreFailed(e));
                }
            }
        });
    }

    /// Sign in or create an account with the login form.
    pub fn submit_login(&mut self) {
        let (email, password) = match self.login.credentials() {
            Ok(credentials) => credentials,
            Err(e) => {
                self.login_error = Some(e.user_message());
                return;
            }
        };
        if !self.login.guard.begin() {
            return;
        }
        self.login_error = None;
        self.login_notice = None;

        let client = self.client.clone();
        let tx = self.sender();
        let mode = self.login.mode;

        self.rt.spawn(async move {
            let result = async {
                let session = match mode {
                    LoginMode::SignIn => client.sign_in(&email, &password).await?,
                    LoginMode::SignUp => match client.sign_up(&email, &password).await? {
                        SignUpOutcome::SignedIn(session) => session,
                        SignUpOutcome::ConfirmationSent => return Ok(None),
                    },
                };
                db::profile::load_context(&client, session).await.map(Some)
            }
            .await;

            let msg = match result {
                Ok(Some(ctx)) => UiMessage::SignedIn(ctx),
                Ok(None) => UiMessage::SignUpConfirmationSent(email),
                Err(e) => UiMessage::AuthFailed(e),
            };
            let _ = tx.send(msg);
        });
    }

    fn start_session(&mut self, ctx: SessionContext) {
        self.epoch.advance();
        self.loading = 0;
        self.persist_session(&ctx.session);
        self.store = Some(Arc::new(RemoteStore::new(self.client.clone(), ctx.clone())));
        self.visitor_form.work_id = ctx.work_id();
        self.delivery_form.work_id = ctx.work_id();
        self.current_tab = Tab::Dashboard;

        let name = ctx.display_name();
        let denied = ctx.scope().is_denied();
        self.session = Some(ctx);
        self.log(LogLevel::Info, format!("Sessão iniciada: {name}"));
        if denied {
            self.notify(
                LogLevel::Warning,
                "Seu perfil não está vinculado a nenhuma obra. Procure o administrador.",
            );
        }

        self.load_works();
        self.load_dashboard();
        self.load_records();
    }

    fn persist_session(&self, session: &Session) {
        if let Some(store) = &self.session_store
            && let Err(e) = store.save(session)
        {
            tracing::warn!("Failed to save session to {}: {e}", store.path().display());
        }
    }

    /// Refresh the access token shortly before it expires.
    fn check_session_refresh(&mut self) {
        let Some(ctx) = &self.session else {
            return;
        };
        if self.refreshing || self.retry_refresh_at.is_some_and(|at| Instant::now() < at) {
            return;
        }
        if !ctx.session.needs_refresh(Utc::now()) {
            return;
        }

        self.refreshing = true;
        let client = self.client.clone();
        let tx = self.sender();
        let refresh_token = ctx.session.refresh_token.clone();

        self.rt.spawn(async move {
            match client.refresh(&refresh_token).await {
                Ok(session) => {
                    let _ = tx.send(UiMessage::SessionRefreshed(session));
                }
                Err(e) => {
                    let _ = tx.send(UiMessage::RefreshFailed(e));
                }
            }
        });
    }

    pub fn request_sign_out(&mut self) {
        self.sign_out_confirm = true;
    }

    fn sign_out(&mut self) {
        let Some(ctx) = &self.session else {
            return;
        };
        let client = self.client.clone();
        let token = ctx.access_token().to_string();

        self.rt.spawn(async move {
            if let Err(e) = client.sign_out(&token).await {
                tracing::warn!("Remote sign-out failed: {e}");
            }
        });

        self.end_session();
        tracing::info!("Signed out");
    }

    /// Drop everything tied to the signed-in user.
    fn end_session(&mut self) {
        if let Some(store) = &self.session_store
            && let Err(e) = store.clear()
        {
            tracing::warn!("Failed to remove saved session: {e}");
        }

        self.epoch.advance();
        self.session = None;
        self.store = None;
        self.loading = 0;
        self.refreshing = false;
        self.retry_refresh_at = None;
        self.dashboard = DashboardData::default();
        self.visitors.clear();
        self.deliveries.clear();
        self.works.clear();
        self.profiles.clear();
        self.table_counts = None;
        self.visitor_form = VisitorForm::default();
        self.delivery_form = DeliveryForm::default();
        self.visitor_error = None;
        self.delivery_error = None;
        self.reset_visitor_cameras();
        self.reset_delivery_cameras();
        self.exit_view = ExitView::default();
        self.reports = ReportsView::default();
        self.admin = AdminView::default();
        self.exit_confirm = None;
        self.login = LoginForm::default();
    }

    // ----- Navigation -----

    pub fn open_tab(&mut self, tab: Tab) {
        let Some(ctx) = &self.session else {
            return;
        };
        if !ctx.can_open(tab) {
            return;
        }
        self.current_tab = tab;

        match tab {
            Tab::Dashboard | Tab::Exit => self.load_dashboard(),
            Tab::Reports => self.load_records(),
            Tab::Admin => {
                self.load_works();
                self.load_profiles();
                self.load_table_counts();
            }
            Tab::Deliveries | Tab::Visitors => {}
        }
    }

    /// Reload everything the current tab shows.
    pub fn refresh_all(&mut self) {
        self.load_works();
        self.load_dashboard();
        self.load_records();
        if self.session.as_ref().is_some_and(SessionContext::is_admin) {
            self.load_profiles();
            self.load_table_counts();
        }
    }

    // ----- Loading -----

    /// Load today's counts and everyone on site.
    pub fn load_dashboard(&mut self) {
        let Some(store) = self.store.clone() else {
            return;
        };
        let tx = self.sender();
        self.loading += 1;

        self.rt.spawn(async move {
            match reports::load_dashboard(store.as_ref(), Local::now()).await {
                Ok(data) => {
                    let _ = tx.send(UiMessage::DashboardLoaded(data));
                }
                Err(e) => {
                    let _ = tx.send(UiMessage::LoadFailed(e));
                }
            }
        });
    }

    /// Load both registers for the reports view and exports.
    pub fn load_records(&mut self) {
        let Some(store) = self.store.clone() else {
            return;
        };
        let tx = self.sender();
        self.loading += 1;

        self.rt.spawn(async move {
            let result = async {
                let visitors = store.all_visitors().await?;
                let deliveries = store.all_deliveries().await?;
                Ok::<_, AppError>((visitors, deliveries))
            }
            .await;

            match result {
                Ok((visitors, deliveries)) => {
                    let _ = tx.send(UiMessage::RecordsLoaded(visitors, deliveries));
                }
                Err(e) => {
                    let _ = tx.send(UiMessage::LoadFailed(e));
                }
            }
        });
    }

    pub fn load_works(&mut self) {
        let Some(ctx) = self.session.clone() else {
            return;
        };
        let client = self.client.clone();
        let tx = self.sender();
        self.loading += 1;

        self.rt.spawn(async move {
            match db::work::list_visible(&client, &ctx).await {
                Ok(works) => {
                    let _ = tx.send(UiMessage::WorksLoaded(works));
                }
                Err(e) => {
                    let _ = tx.send(UiMessage::LoadFailed(e));
                }
            }
        });
    }

    pub fn load_profiles(&mut self) {
        let Some(ctx) = self.session.clone() else {
            return;
        };
        let client = self.client.clone();
        let tx = self.sender();
        self.loading += 1;

        self.rt.spawn(async move {
            match db::profile::list_all(&client, &ctx).await {
                Ok(profiles) => {
                    let _ = tx.send(UiMessage::ProfilesLoaded(profiles));
                }
                Err(e) => {
                    let _ = tx.send(UiMessage::LoadFailed(e));
                }
            }
        });
    }

    pub fn load_table_counts(&mut self) {
        let Some(ctx) = self.session.clone() else {
            return;
        };
        let client = self.client.clone();
        let tx = self.sender();
        self.loading += 1;

        self.rt.spawn(async move {
            match db::connection::get_table_counts(&client, &ctx).await {
                Ok(counts) => {
                    let _ = tx.send(UiMessage::TableCountsLoaded(counts));
                }
                Err(e) => {
                    let _ = tx.send(UiMessage::LoadFailed(e));
                }
            }
        });
    }

    // ----- Entry forms -----

    pub fn submit_visitor(&mut self) {
        let (Some(ctx), Some(store)) = (self.session.clone(), self.store.clone()) else {
            return;
        };
        self.visitor_form.normalize();
        let draft = match self.visitor_form.prepare(&ctx, Utc::now()) {
            Ok(draft) => draft,
            Err(e) => {
                self.visitor_error = Some(e.user_message());
                return;
            }
        };
        if !self.visitor_form.guard.begin() {
            return;
        }
        self.visitor_error = None;
        let tx = self.sender();

        self.rt.spawn(async move {
            match forms::submit_visitor(store.as_ref(), &ctx, Ok(draft)).await {
                Ok(visitor) => {
                    let _ = tx.send(UiMessage::VisitorSaved(visitor));
                }
                Err(e) => {
                    let _ = tx.send(UiMessage::SubmitFailed(RecordKind::Visitor, e));
                }
            }
        });
    }

    pub fn submit_delivery(&mut self) {
        let (Some(ctx), Some(store)) = (self.session.clone(), self.store.clone()) else {
            return;
        };
        self.delivery_form.normalize();
        let draft = match self.delivery_form.prepare(&ctx, Utc::now()) {
            Ok(draft) => draft,
            Err(e) => {
                self.delivery_error = Some(e.user_message());
                return;
            }
        };
        if !self.delivery_form.guard.begin() {
            return;
        }
        self.delivery_error = None;
        let tx = self.sender();

        self.rt.spawn(async move {
            match forms::submit_delivery(store.as_ref(), &ctx, Ok(draft)).await {
                Ok(delivery) => {
                    let _ = tx.send(UiMessage::DeliverySaved(delivery));
                }
                Err(e) => {
                    let _ = tx.send(UiMessage::SubmitFailed(RecordKind::Delivery, e));
                }
            }
        });
    }

    pub fn clear_visitor_form(&mut self) {
        self.visitor_form.clear();
        self.visitor_error = None;
        self.reset_visitor_cameras();
    }

    pub fn clear_delivery_form(&mut self) {
        self.delivery_form.clear();
        self.delivery_error = None;
        self.reset_delivery_cameras();
    }

    fn reset_visitor_cameras(&mut self) {
        self.visitor_photo.reset();
        self.visitor_plate_photo.reset();
    }

    fn reset_delivery_cameras(&mut self) {
        self.delivery_invoice_photo.reset();
        self.delivery_plate_photo.reset();
    }

    // ----- Exit -----

    /// Ask for confirmation before registering an exit.
    pub fn request_exit<R: GateRecord>(&mut self, kind: RecordKind, record: &R) {
        self.exit_confirm = Some(ExitTarget {
            kind,
            id: record.id(),
            name: record.display_name().to_string(),
        });
    }

    fn register_exit(&mut self, target: ExitTarget) {
        let Some(store) = self.store.clone() else {
            return;
        };
        let tx = self.sender();

        self.rt.spawn(async move {
            match reports::register_exit(store.as_ref(), target.kind, target.id).await {
                Ok(done) => {
                    let _ = tx.send(UiMessage::ExitRegistered {
                        kind: target.kind,
                        name: target.name,
                        done,
                    });
                }
                Err(e) => {
                    let _ = tx.send(UiMessage::OperationFailed(e));
                }
            }
        });
    }

    // ----- Reports -----

    /// Open the evidence modal and fetch its photos.
    pub fn open_photos(&mut self, kind: RecordKind, id: i64, title: String) {
        let Some(store) = self.store.clone() else {
            return;
        };
        self.reports.photo_modal = Some(PhotoModal {
            title,
            kind,
            id,
            photos: None,
        });
        let tx = self.sender();

        self.rt.spawn(async move {
            let result = match kind {
                RecordKind::Visitor => store
                    .visitor_photos(id)
                    .await
                    .map(|p| vec![("Visitante", p.photo), ("Placa", p.plate_photo)]),
                RecordKind::Delivery => store
                    .delivery_photos(id)
                    .await
                    .map(|p| vec![("Nota fiscal", p.invoice_photo), ("Placa", p.plate_photo)]),
            };

            match result {
                Ok(urls) => {
                    let photos = urls
                        .into_iter()
                        .map(|(label, url)| LoadedPhoto {
                            label,
                            image: url.and_then(|u| match decode_data_url(&u) {
                                Ok(image) => Some(image),
                                Err(e) => {
                                    tracing::warn!("Stored photo '{label}' of {} {id} is unreadable: {e}", kind.label());
                                    None
                                }
                            }),
                        })
                        .collect();
                    let _ = tx.send(UiMessage::PhotosLoaded { kind, id, photos });
                }
                Err(e) => {
                    let _ = tx.send(UiMessage::OperationFailed(e));
                }
            }
        });
    }

    pub fn edit_visitor(&mut self, visitor: &Visitor) {
        self.reports.edit = Some(EditTarget::Visitor {
            original: visitor.clone(),
            edited: visitor.clone(),
        });
    }

    pub fn edit_delivery(&mut self, delivery: &Delivery) {
        self.reports.edit = Some(EditTarget::Delivery {
            original: delivery.clone(),
            edited: delivery.clone(),
        });
    }

    /// Send the changed fields of the edit dialog.
    pub fn save_edit(&mut self) {
        let Some(target) = self.reports.edit.take() else {
            return;
        };
        let Some(store) = self.store.clone() else {
            return;
        };
        let tx = self.sender();

        match target {
            EditTarget::Visitor { original, mut edited } => {
                edited.name = upper(edited.name.trim());
                edited.document = format_document(&edited.document);
                edited.company = upper(edited.company.trim());
                edited.visit_reason = upper(edited.visit_reason.trim());
                edited.person_visited = upper(edited.person_visited.trim());
                edited.vehicle.model = upper(edited.vehicle.model.trim());
                edited.vehicle.color = upper(edited.vehicle.color.trim());
                edited.vehicle.plate = format_plate(&edited.vehicle.plate);

                let changes = UpdateVisitor::diff(&original, &edited);
                if changes.is_empty() {
                    return;
                }
                self.rt.spawn(async move {
                    match store.update_visitor(original.id, changes).await {
                        Ok(updated) => {
                            let _ = tx.send(UiMessage::RecordUpdated {
                                kind: RecordKind::Visitor,
                                found: updated.is_some(),
                            });
                        }
                        Err(e) => {
                            let _ = tx.send(UiMessage::OperationFailed(e));
                        }
                    }
                });
            }
            EditTarget::Delivery { original, mut edited } => {
                edited.supplier = upper(edited.supplier.trim());
                edited.driver_name = upper(edited.driver_name.trim());
                edited.driver_document = format_document(&edited.driver_document);
                edited.invoice_number = upper(edited.invoice_number.trim());
                edited.license_plate = format_plate(&edited.license_plate);

                let changes = UpdateDelivery::diff(&original, &edited);
                if changes.is_empty() {
                    return;
                }
                self.rt.spawn(async move {
                    match store.update_delivery(original.id, changes).await {
                        Ok(updated) => {
                            let _ = tx.send(UiMessage::RecordUpdated {
                                kind: RecordKind::Delivery,
                                found: updated.is_some(),
                            });
                        }
                        Err(e) => {
                            let _ = tx.send(UiMessage::OperationFailed(e));
                        }
                    }
                });
            }
        }
    }

    /// Export both in-memory registers through a save dialog.
    pub fn export_report(&mut self, format: ExportFormat) {
        let Some(path) = export::show_save_dialog(format, self.config.export.directory.as_deref()) else {
            return;
        };
        let visitors = self.visitors.clone();
        let deliveries = self.deliveries.clone();
        let tx = self.sender();

        self.rt.spawn_blocking(move || {
            let msg = match export::export(format, &visitors, &deliveries, &path) {
                Ok(()) => UiMessage::ExportCompleted(path),
                Err(e) => {
                    tracing::error!("Export to {} failed: {e}", path.display());
                    UiMessage::ExportFailed(e.user_message())
                }
            };
            let _ = tx.send(msg);
        });
    }

    // ----- Admin -----

    pub fn create_work(&mut self) {
        let Some(ctx) = self.session.clone() else {
            return;
        };
        let Some(data) = NewWork::new(&self.admin.work_name, &self.admin.work_address) else {
            self.notify(LogLevel::Warning, "Informe o nome da obra.");
            return;
        };
        let client = self.client.clone();
        let tx = self.sender();

        self.rt.spawn(async move {
            match db::work::create(&client, &ctx, &data).await {
                Ok(work) => {
                    let _ = tx.send(UiMessage::WorkCreated(work));
                }
                Err(e) => {
                    let _ = tx.send(UiMessage::OperationFailed(e));
                }
            }
        });
    }

    pub fn assign_profile(&mut self, user_id: Uuid, role: Role, work_id: Option<i64>) {
        let Some(ctx) = self.session.clone() else {
            return;
        };
        let client = self.client.clone();
        let tx = self.sender();

        self.rt.spawn(async move {
            match db::profile::assign(&client, &ctx, user_id, role, work_id).await {
                Ok(profile) => {
                    let _ = tx.send(UiMessage::ProfileAssigned(profile));
                }
                Err(e) => {
                    let _ = tx.send(UiMessage::OperationFailed(e));
                }
            }
        });
    }

    /// Poll async operation results.
    fn poll_async_results(&mut self, ctx: &egui::Context) {
        while let Ok(tagged) = self.rx.try_recv() {
            let Some(msg) = self.epoch.accept(tagged) else {
                tracing::debug!("Dropped result of an ended session");
                continue;
            };
            match msg {
                UiMessage::SignedIn(session_ctx) => {
                    self.restoring = false;
                    self.login.guard.finish();
                    self.start_session(session_ctx);
                }
                UiMessage::SignUpConfirmationSent(email) => {
                    self.login.guard.finish();
                    self.login.mode = LoginMode::SignIn;
                    self.login.password.clear();
                    self.login_notice = Some(format!(
                        "Conta criada. Verifique o e-mail enviado para {email} antes de entrar."
                    ));
                }
                UiMessage::AuthFailed(e) => {
                    self.login.guard.finish();
                    tracing::warn!("Authentication failed: {e}");
                    self.login_error = Some(e.user_message());
                }
                UiMessage::RestoreFailed(e) => {
                    self.restoring = false;
                    tracing::warn!("Saved session could not be restored: {e}");
                    if let Some(store) = &self.session_store
                        && let Err(e) = store.clear()
                    {
                        tracing::warn!("Failed to remove saved session: {e}");
                    }
                    if !e.is_auth_failure() {
                        self.login_error = Some(e.user_message());
                    }
                }
                UiMessage::SessionRefreshed(session) => {
                    self.refreshing = false;
                    self.retry_refresh_at = None;
                    if let Some(current) = &mut self.session {
                        current.session = session;
                        let current = current.clone();
                        self.persist_session(&current.session);
                        self.store = Some(Arc::new(RemoteStore::new(self.client.clone(), current)));
                        tracing::info!("Session refreshed");
                    }
                }
                UiMessage::RefreshFailed(e) => {
                    self.refreshing = false;
                    if e.is_auth_failure() {
                        self.report_error("Session refresh", e);
                    } else {
                        tracing::warn!("Session refresh failed, retrying later: {e}");
                        self.retry_refresh_at = Some(Instant::now() + REFRESH_RETRY);
                    }
                }
                UiMessage::DashboardLoaded(data) => {
                    self.loading = self.loading.saturating_sub(1);
                    self.dashboard = data;
                }
                UiMessage::RecordsLoaded(visitors, deliveries) => {
                    self.loading = self.loading.saturating_sub(1);
                    self.visitors = visitors;
                    self.deliveries = deliveries;
                }
                UiMessage::WorksLoaded(works) => {
                    self.loading = self.loading.saturating_sub(1);
                    self.works = works;
                }
                UiMessage::ProfilesLoaded(profiles) => {
                    self.loading = self.loading.saturating_sub(1);
                    self.admin.drafts.clear();
                    self.profiles = profiles;
                }
                UiMessage::TableCountsLoaded(counts) => {
                    self.loading = self.loading.saturating_sub(1);
                    self.table_counts = Some(counts);
                }
                UiMessage::LoadFailed(e) => {
                    self.loading = self.loading.saturating_sub(1);
                    self.report_error("Load failed", e);
                }
                UiMessage::VisitorSaved(visitor) => {
                    self.visitor_form.guard.finish();
                    self.clear_visitor_form();
                    self.notify(LogLevel::Success, format!("Entrada registrada: {}", visitor.name));
                    self.load_dashboard();
                    self.load_records();
                }
                UiMessage::DeliverySaved(delivery) => {
                    self.delivery_form.guard.finish();
                    self.clear_delivery_form();
                    self.notify(
                        LogLevel::Success,
                        format!("Entrega registrada: {}", delivery.display_name()),
                    );
                    self.load_dashboard();
                    self.load_records();
                }
                UiMessage::SubmitFailed(kind, e) => {
                    match kind {
                        RecordKind::Visitor => self.visitor_form.guard.finish(),
                        RecordKind::Delivery => self.delivery_form.guard.finish(),
                    }
                    if e.is_auth_failure() {
                        self.report_error("Entry insert failed", e);
                        continue;
                    }
                    tracing::error!("{} insert failed: {e}", kind.label());
                    let message = Some(e.user_message());
                    match kind {
                        RecordKind::Visitor => self.visitor_error = message,
                        RecordKind::Delivery => self.delivery_error = message,
                    }
                }
                UiMessage::ExitRegistered { kind, name, done } => {
                    if done {
                        self.notify(LogLevel::Success, format!("Saída registrada: {name}"));
                    } else {
                        self.notify(LogLevel::Warning, format!("A saída de {name} já havia sido registrada."));
                    }
                    tracing::info!("{} exit processed for {name}", kind.label());
                    self.load_dashboard();
                    self.load_records();
                }
                UiMessage::RecordUpdated { kind, found } => {
                    if found {
                        self.notify(LogLevel::Success, "Registro atualizado.");
                    } else {
                        self.notify(LogLevel::Warning, format!("{}: registro não encontrado.", kind.label()));
                    }
                    self.load_records();
                }
                UiMessage::PhotosLoaded { kind, id, photos } => {
                    if let Some(modal) = &mut self.reports.photo_modal
                        && modal.kind == kind
                        && modal.id == id
                    {
                        let textures = photos
                            .into_iter()
                            .enumerate()
                            .map(|(idx, photo)| {
                                let texture = photo.image.map(|image| {
                                    ctx.load_texture(
                                        format!("evidence_{}_{id}_{idx}", kind.table()),
                                        super::camera_widget::rgba_preview(&image),
                                        egui::TextureOptions::LINEAR,
                                    )
                                });
                                (photo.label, texture)
                            })
                            .collect();
                        modal.photos = Some(textures);
                    }
                }
                UiMessage::WorkCreated(work) => {
                    self.admin.work_name.clear();
                    self.admin.work_address.clear();
                    self.notify(LogLevel::Success, format!("Obra cadastrada: {}", work.name));
                    self.load_works();
                    self.load_table_counts();
                }
                UiMessage::ProfileAssigned(profile) => {
                    match profile {
                        Some(p) => self.notify(LogLevel::Success, format!("Perfil atualizado: {}", p.display_name())),
                        None => self.notify(LogLevel::Warning, "Perfil não encontrado."),
                    }
                    self.load_profiles();
                }
                UiMessage::ExportCompleted(path) => {
                    self.notify(LogLevel::Success, format!("Relatório exportado: {}", path.display()));
                }
                UiMessage::ExportFailed(e) => {
                    self.notify(LogLevel::Error, format!("Falha ao exportar: {e}"));
                }
                UiMessage::OperationFailed(e) => {
                    self.report_error("Operation failed", e);
                }
            }
        }
    }

    fn expire_toasts(&mut self) {
        let ttl = Duration::from_secs(self.config.ui.toast_secs);
        self.toasts.retain(|t| t.shown_at.elapsed() < ttl);
    }

    /// Render the top bar: tabs, user and sign-out.
    fn show_top_bar(&mut self, ctx: &egui::Context) {
        let Some(session_ctx) = self.session.clone() else {
            return;
        };

        egui::TopBottomPanel::top("top_bar").min_height(40.0).show(ctx, |ui| {
            ui.horizontal_centered(|ui| {
                ui.label(RichText::new("Portaria Obras").strong().size(16.0));
                ui.separator();

                for tab in session::tabs(session_ctx.role()) {
                    if ui.selectable_label(self.current_tab == tab, tab.label()).clicked() {
                        self.open_tab(tab);
                    }
                }

                ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                    if ui.button(format!("{SIGN_OUT} Sair")).clicked() {
                        self.request_sign_out();
                    }
                    ui.label(RichText::new(session_ctx.role().label()).weak());
                    ui.label(session_ctx.display_name());
                });
            });
        });
    }

    /// Render status bar (display only, no interaction).
    fn show_status_bar(&self, ctx: &egui::Context) {
        let Some(session_ctx) = &self.session else {
            return;
        };

        egui::TopBottomPanel::bottom("status_bar")
            .min_height(28.0)
            .show(ctx, |ui| {
                ui.disable();
                ui.horizontal(|ui| {
                    let site = match session_ctx.scope().site_filter() {
                        Some(id) => self.site_name(id),
                        None if session_ctx.is_admin() => "Todas as obras".to_string(),
                        None => "Sem obra vinculada".to_string(),
                    };
                    let color = if session_ctx.scope().is_denied() {
                        colors::WARNING
                    } else {
                        colors::SUCCESS
                    };
                    ui.colored_label(color, site);
                    ui.separator();
                    ui.label(RichText::new(self.client.base_url()).weak());

                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        if self.loading > 0 {
                            ui.spinner();
                            ui.label("Carregando...");
                        }
                    });
                });
            });
    }

    /// Render toasts in the top-right corner.
    fn show_toasts(&self, ctx: &egui::Context) {
        if self.toasts.is_empty() {
            return;
        }

        egui::Area::new(egui::Id::new("toasts"))
            .anchor(egui::Align2::RIGHT_TOP, [-12.0, 52.0])
            .order(egui::Order::Foreground)
            .show(ctx, |ui| {
                for toast in &self.toasts {
                    let color = match toast.level {
                        LogLevel::Info => colors::NEUTRAL,
                        LogLevel::Success => colors::SUCCESS,
                        LogLevel::Warning => colors::WARNING,
                        LogLevel::Error => colors::ERROR,
                    };
                    egui::Frame::popup(ui.style()).show(ui, |ui| {
                        ui.set_max_width(360.0);
                        ui.colored_label(color, &toast.message);
                    });
                    ui.add_space(6.0);
                }
            });
    }

    /// Render modal dialogs (exit and sign-out confirmation).
    fn show_dialogs(&mut self, ctx: &egui::Context) {
        if let Some(target) = self.exit_confirm.clone() {
            egui::Window::new("Registrar saída")
                .collapsible(false)
                .resizable(false)
                .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
                .show(ctx, |ui| {
                    ui.label(format!("Registrar a saída de {}?", target.name));
                    ui.label(RichText::new("Esta ação não pode ser desfeita.").color(colors::WARNING));
                    ui.add_space(10.0);
                    ui.horizontal(|ui| {
                        if ui.button("Cancelar").clicked() {
                            self.exit_confirm = None;
                        }
                        if ui.button("Confirmar saída").clicked() {
                            self.exit_confirm = None;
                            self.register_exit(target.clone());
                        }
                    });
                });
        }

        if self.sign_out_confirm {
            egui::Window::new("Sair")
                .collapsible(false)
                .resizable(false)
                .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
                .show(ctx, |ui| {
                    ui.label("Deseja realmente sair?");
                    ui.add_space(10.0);
                    ui.horizontal(|ui| {
                        if ui.button("Cancelar").clicked() {
                            self.sign_out_confirm = false;
                        }
                        if ui.button("Sair").clicked() {
                            self.sign_out_confirm = false;
                            self.sign_out();
                        }
                    });
                });
        }
    }

    fn is_busy(&self) -> bool {
        self.loading > 0
            || self.restoring
            || self.login.guard.is_submitting()
            || self.visitor_form.guard.is_submitting()
            || self.delivery_form.guard.is_submitting()
            || !self.toasts.is_empty()
    }
}

impl eframe::App for App {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Poll async results
        self.poll_async_results(ctx);
        self.check_session_refresh();
        self.expire_toasts();

        // Keep polling while work is in flight; otherwise wake up for token refresh
        if self.is_busy() {
            ctx.request_repaint_after(Duration::from_millis(100));
        } else {
            ctx.request_repaint_after(Duration::from_secs(30));
        }

        if self.session.is_none() {
            egui::CentralPanel::default().show(ctx, |ui| login_panel::show(self, ui));
            self.show_toasts(ctx);
            return;
        }

        self.show_top_bar(ctx);
        self.show_status_bar(ctx);
        self.show_dialogs(ctx);
        self.show_toasts(ctx);

        // Main content
        egui::CentralPanel::default().show(ctx, |ui| match self.current_tab {
            Tab::Dashboard => {
                if let Some(next) = dashboard::show(self, ui) {
                    self.open_tab(next);
                }
            }
            Tab::Deliveries => deliveries_panel::show(self, ui),
            Tab::Visitors => visitors_panel::show(self, ui),
            Tab::Exit => exit_panel::show(self, ui),
            Tab::Reports => reports_panel::show(self, ui),
            Tab::Admin => admin_panel::show(self, ui),
        });
    }
}
