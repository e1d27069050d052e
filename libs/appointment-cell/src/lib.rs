pub mod handlers;
pub mod models;
pub mod router;
pub mod services;
pub mod validation;

pub use router::appointment_routes;
pub use services::AppointmentNotifier;
