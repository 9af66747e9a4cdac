//! Transport layer for the E-Com Plus store API.
//!
//! This module provides:
//! - `Transport`: the seam the account handle dispatches every call through
//! - `HttpTransport`: the `reqwest` implementation used in production
//! - `ApiError`: status-mapped failures, propagated to callers unchanged
//!
//! Requests are authenticated with the `X-Store-ID`, `X-My-ID` and
//! `X-Access-Token` headers.

pub mod error;
pub mod transport;

#[cfg(test)]
pub(crate) mod mock;

pub use error::ApiError;
pub use reqwest::Method;
pub use transport::{AccessCredentials, ApiRequest, HttpTransport, RequestOptions, Transport};
