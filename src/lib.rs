pub mod driver;
pub mod error;
pub mod metadata;
pub mod parser;
pub mod report;
pub mod resolver;
pub mod runner;
pub mod server;
pub mod ui5;
pub mod utils;

// Re-export common items
pub use error::FioriError;
pub use runner::{execute, Command, Session};
pub use utils::config::Config;
