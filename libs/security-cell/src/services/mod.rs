pub mod password;
pub mod validation;

pub use password::{PasswordSecurityService, MIN_PASSWORD_LENGTH};
pub use validation::ValidationService;
