pub mod datasource;
pub mod http;
pub mod resources;
pub mod server;

pub use datasource::Datasource;
pub use resources::{ResourceRequest, ResourceResponse, ResourceRoute};
pub use server::run_http_server;
