//! Request model
//!
//! Types describing a single outgoing HTTP request.

mod body;
mod descriptor;
mod header;
mod method;

pub use body::RequestBody;
pub use descriptor::{RequestDescriptor, DEFAULT_TIMEOUT_MS};
pub use header::{Header, Headers};
pub use method::HttpMethod;
