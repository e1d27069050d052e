// =====================================================================================
// SECURITY CELL - CREDENTIALS & INPUT CHECKS
// =====================================================================================
//
// Password hashing for portal accounts plus the small set of input checks shared
// by the appointment, doctor and notification cells.
//
// =====================================================================================

pub mod models;
pub mod services;

pub use models::SecurityError;
pub use services::{PasswordSecurityService, ValidationService, MIN_PASSWORD_LENGTH};
