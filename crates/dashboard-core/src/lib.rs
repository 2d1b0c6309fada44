pub mod error;
pub mod types;

pub use error::DashboardError;
pub use types::*;
