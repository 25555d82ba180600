//! GUI panels and application state.

pub mod admin_panel;
pub mod app;
pub mod camera_widget;
pub mod components;
pub mod dashboard;
pub mod deliveries_panel;
pub mod exit_panel;
pub mod login_panel;
pub mod recovery;
pub mod reports_panel;
pub mod setup_wizard;
pub mod visitors_panel;

pub use app::App;
pub use recovery::RecoveryApp;
pub use setup_wizard::{SetupApp, SetupWizard};
