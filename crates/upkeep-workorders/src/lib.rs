pub mod db;
pub mod error;
pub mod store;
pub mod types;

pub use error::{Result, WorkOrderError};
pub use store::{Actor, WorkOrderStore};
pub use types::{Category, NewWorkOrder, Priority, WoListFilter, WoStatus, WoUpdate, WorkOrder};
