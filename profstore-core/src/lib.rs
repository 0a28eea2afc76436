pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod storage;

pub use config::ProfStoreConfig;
pub use error::ProfStoreError;
pub use models::ProfilerResult;
pub use storage::{ListOrder, MemoryStorage, PostgresStorage, ResultStorage};
