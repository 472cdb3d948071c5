pub mod config;
pub mod context;
pub mod database;
pub mod error;
pub mod monitoring;
pub mod pool;
pub mod settings;
pub mod telemetry;
pub mod validation;

pub use config::Config;
pub use context::ServiceContext;
pub use error::ServiceError;
