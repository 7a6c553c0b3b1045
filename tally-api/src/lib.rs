//! # tally-api
//!
//! Narrow HTTP collaborator for the billing platform.
//!
//! The sync engine only depends on [`PlatformApi`]: one `send` per request,
//! a 200 status as the sole success signal, and a JSON body on success.
//! [`HttpClient`] is the blocking live implementation; [`StubApi`] serves
//! canned responses for tests.

pub mod auth;
pub mod client;
pub mod error;
pub mod request;
pub mod stub;

pub use auth::{BearerSession, Token};
pub use client::HttpClient;
pub use error::ApiError;
pub use request::{ApiRequest, ApiResponse, Method, PlatformApi};
pub use stub::StubApi;
