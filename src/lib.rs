pub mod clean;
pub mod config;
pub mod error;
pub mod fetch;
pub mod pipeline;
pub mod server;
pub mod table;

pub use clean::{CleanedRow, Value};
pub use config::ServerConfig;
pub use error::PipelineError;
pub use pipeline::fetch_and_clean;
pub use table::RawTable;
