//! Cloud Logging v2 and Resource Manager v1 over their JSON REST surface.

pub mod client;
pub mod decode;

pub use client::{Credentials, RestClient, RestEndpoints};
