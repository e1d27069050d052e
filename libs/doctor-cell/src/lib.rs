pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::{DoctorError, EMAIL_TAKEN_MESSAGE};
pub use router::doctor_routes;
pub use services::DoctorService;
