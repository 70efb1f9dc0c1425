//! Assistant backend: the `ChatBackend` seam, wire types and the HTTP client.

pub mod chat;
pub mod clones;
pub mod http;
pub mod protocol;

pub use chat::{ChatBackend, ChatRequest, MockBackend};
pub use clones::CloneBackend;
pub use http::HttpBackend;
