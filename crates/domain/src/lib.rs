//! Portico Domain - Core client types
//!
//! This crate defines the domain model for the Portico portal client.
//! All types here are pure Rust with no I/O dependencies: requests,
//! responses, session state and the error taxonomy.

pub mod error;
pub mod request;
pub mod response;
pub mod session;

pub use error::{ApiError, ApiResult};
pub use request::{
    Header, Headers, HttpMethod, RequestBody, RequestDescriptor, DEFAULT_TIMEOUT_MS,
};
pub use response::{RawResponse, ResponseBody};
pub use session::{Session, SessionKey};
