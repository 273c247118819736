pub mod config;
pub mod error;
pub mod export;
pub mod logging;
pub mod people;
pub mod resume;
pub mod rounds;
pub mod table;
pub mod types;

// Re-export the types most callers need
pub use config::DatasetConfig;
pub use error::{ExportError, Result};
pub use export::{ExportOptions, Exporter};
pub use types::{CompanyRecord, PersonRecord, Row};
