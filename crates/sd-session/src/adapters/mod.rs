//! Adapters layer: concrete implementations of the outbound ports.
//!
//! - `http`: reqwest-backed [`HttpTransport`](crate::ports::HttpTransport)
//! - `storage`: in-memory and file-backed [`SessionStorage`](crate::ports::SessionStorage)

pub mod http;
pub mod storage;

pub use http::ReqwestTransport;
pub use storage::{FileStorage, MemoryStorage};
