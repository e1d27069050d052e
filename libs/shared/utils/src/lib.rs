pub mod extractor;
pub mod jwt;
pub mod rate_limit;
pub mod state;
pub mod test_utils;

pub use state::AppState;
