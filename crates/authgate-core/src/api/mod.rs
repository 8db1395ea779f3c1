//! HTTP client module for the authentication backend.
//!
//! This module provides the `ApiClient`, the request/response `Pipeline`
//! it runs every call through, the `Transport` seam to the wire, and the
//! failure taxonomy (`ErrorKind`, `ApiError`).
//!
//! Authenticated endpoints expect `Authorization: Bearer <token>`; the
//! `AuthHeader` stage attaches it from the session on every attempt.

pub mod client;
pub mod error;
pub mod pipeline;
pub mod retry;
pub mod transport;

pub use client::{ApiClient, Credentials, Registration};
pub use error::{ApiError, ErrorKind};
pub use pipeline::{ApiRequest, ApiResponse, Pipeline, RequestStage, ResponseStage};
pub use retry::RetryPolicy;
pub use transport::{HttpReply, ReqwestTransport, Transport, TransportError};
