//! HTTP plumbing for TIN validation: the upstream tax-authority client the
//! proxy forwards through, and the validator callers use against the proxy.

pub mod client;
pub mod error;
pub mod types;
pub mod upstream;

pub use client::TinValidator;
pub use error::TinError;
pub use types::{UpstreamBody, UpstreamReply, ValidationState};
pub use upstream::TaxAuthorityClient;
