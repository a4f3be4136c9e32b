pub mod chunker;
pub mod config;
pub mod error;
pub mod loader;
pub mod processor;
pub mod traits;
pub mod types;

pub use config::{expand_path, resolve_with_base, Config, Settings};
pub use error::{Error, LoadError, Result};
