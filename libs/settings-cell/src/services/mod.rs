pub mod password;

pub use password::AccountPasswordService;
