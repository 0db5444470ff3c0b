pub mod db;
pub mod error;
pub mod models;
pub mod schema;
pub mod service;

pub use db::Database;
pub use error::{ValidationError, is_validation_error};
pub use service::KcalService;
