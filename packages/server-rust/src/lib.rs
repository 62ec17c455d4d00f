//! Zedex server: a self-hosted backend for the Zed editor.
//!
//! Serves the collaboration RPC over websocket, mirrors the extension
//! registry and release metadata, and proxies edit predictions to an
//! OpenAI-compatible endpoint.

pub mod mirror;
pub mod network;
pub mod predict;
pub mod rpc;

pub use network::{NetworkConfig, NetworkModule, Services};
