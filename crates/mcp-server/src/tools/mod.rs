//! MCP tool surface: request schemas, the rmcp service, and result rendering.

mod render;
pub mod schemas;
mod service;

pub use service::RelayService;
