pub mod api;
pub mod context;
pub mod discovery;
pub mod fetch;
pub mod locator;
pub mod rest;

pub use api::{LogProvider, ProjectLocator};
pub use context::RequestContext;
pub use fetch::LogFetcher;
