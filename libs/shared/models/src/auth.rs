use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

/// Portal roles. Stored as `users.role`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Reception,
    Doctor,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Reception => write!(f, "reception"),
            Role::Doctor => write!(f, "doctor"),
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "reception" => Ok(Role::Reception),
            "doctor" => Ok(Role::Doctor),
            other => Err(format!("Unknown role: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub role: String,
    pub iat: i64,
    pub exp: i64,
}

/// Authenticated caller, inserted into request extensions by the auth middleware.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionUser {
    pub id: Uuid,
    pub email: Option<String>,
    pub name: Option<String>,
    pub role: Role,
}

impl SessionUser {
    /// Gate for operations reserved to the front desk.
    pub fn require_reception(&self) -> Result<(), AppError> {
        match self.role {
            Role::Reception => Ok(()),
            Role::Doctor => Err(AppError::Forbidden("Forbidden".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Role) -> SessionUser {
        SessionUser {
            id: Uuid::new_v4(),
            email: Some("someone@example.com".to_string()),
            name: None,
            role,
        }
    }

    #[test]
    fn role_round_trips_through_its_string_form() {
        assert_eq!("reception".parse::<Role>().unwrap(), Role::Reception);
        assert_eq!("doctor".parse::<Role>().unwrap(), Role::Doctor);
        assert_eq!(Role::Doctor.to_string(), "doctor");
        assert!("admin".parse::<Role>().is_err());
        assert!("Reception".parse::<Role>().is_err());
    }

    #[test]
    fn only_reception_passes_the_reception_gate() {
        assert!(user(Role::Reception).require_reception().is_ok());
        match user(Role::Doctor).require_reception() {
            Err(AppError::Forbidden(_)) => {}
            other => panic!("expected Forbidden, got {:?}", other),
        }
    }
}
