// Core warnings module - warning records, manual warns and pending
// ban confirmations.

pub mod pending_actions;
pub mod warning_models;
pub mod warning_service;

pub use pending_actions::*;
pub use warning_models::*;
pub use warning_service::*;
