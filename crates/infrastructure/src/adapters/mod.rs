//! Outbound adapters for the application ports.

mod reqwest_transport;

pub use reqwest_transport::ReqwestTransport;
