//! Remote metadata gateway.
//!
//! This module contains the [`MetadataGateway`] trait and its HTTP
//! implementation, [`HttpMetadataGateway`].

mod http;
mod traits;

pub use http::HttpMetadataGateway;
pub use traits::MetadataGateway;

#[cfg(test)]
pub use traits::MockMetadataGateway;
