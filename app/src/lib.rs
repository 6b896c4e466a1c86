//! Async host for `nutai-core`.
//!
//! # Overview
//! Wires the sans-IO `NutritionClient` to a real network through the
//! `Transport` trait, and adds the small amount of screen state the
//! mobile apps keep: a per-day food diary and a dashboard that loads the
//! profile and achievements side by side.
//!
//! # Design
//! - `NutritionService<T: Transport>` is generic so tests can script
//!   responses without a server.
//! - Configuration comes from `NUTAI_*` environment variables.
//! - Logging goes through `tracing`; binaries install the subscriber.

pub mod config;
pub mod error;
pub mod logging;
pub mod service;
pub mod state;
pub mod transport;

pub use config::{AppConfig, ConfigError};
pub use error::AppError;
pub use service::NutritionService;
pub use state::{Dashboard, FoodDiary};
pub use transport::{ReqwestTransport, Transport};
