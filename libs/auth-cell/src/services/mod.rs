pub mod credentials;
pub mod oauth;

pub use credentials::CredentialService;
