pub mod doctor;

pub use doctor::DoctorService;
