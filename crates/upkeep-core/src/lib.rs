pub mod config;
pub mod error;
pub mod ids;
pub mod types;

pub use config::UpkeepConfig;
pub use error::{Result, UpkeepError};
pub use types::{RecordId, UserId, UserRole};
