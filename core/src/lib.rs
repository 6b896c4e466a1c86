//! API client core for the nutrition-tracking service.
//!
//! # Overview
//! Builds `HttpRequest` values and parses `HttpResponse` values without
//! touching the network (host-does-IO pattern). The async app layer, the
//! C bridge used by the mobile shells, and the tests all drive the same
//! `NutritionClient`, so header, auth and error handling live in one place.
//!
//! # Design
//! - Each operation is a `build_*` / `parse_*` pair; the I/O boundary sits
//!   between them.
//! - The bearer token lives behind the `TokenStore` trait and is read at
//!   build time; login and refresh write it, logout clears it.
//! - Every failure is an `ApiError`; the server's `detail` string is kept
//!   verbatim for display.

pub mod client;
pub mod error;
pub mod http;
pub mod multipart;
pub mod session;
pub mod summary;
pub mod types;

pub use client::{AuthMode, NutritionClient, DEFAULT_FOOD_LOG_LIMIT};
pub use error::ApiError;
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use multipart::MultipartForm;
pub use session::{FileTokenStore, MemoryTokenStore, TokenStore, TOKEN_KEY};
pub use summary::DailySummary;
pub use types::*;
