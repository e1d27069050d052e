pub mod lifecycle;
pub mod notifications;
pub mod repository;

pub use lifecycle::AppointmentLifecycleService;
pub use notifications::AppointmentNotifier;
pub use repository::AppointmentRepository;
