// =====================================================================================
// SETTINGS CELL - ACCOUNT PASSWORD & CALENDAR CONNECTION
// =====================================================================================

pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use router::settings_routes;
