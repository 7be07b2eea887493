pub mod config;
pub mod error;
pub mod frame;
pub mod ids;
pub mod model;
pub mod normalize;
pub mod query;
pub mod severity;
pub mod time;

pub use error::{CloudlogError, ProviderError, Result};
