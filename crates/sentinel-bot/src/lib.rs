//! Sentinel signal admission and execution service.
//!
//! Wires the pipeline together:
//! - Sqlite pool, signal store and audit sink
//! - Brokerage REST gateway and exchange calendar
//! - The signal executor and its periodic queue driver
//!
//! The REST/WebSocket delivery layer is an external collaborator; it
//! drives admission and approval through the executor handle exposed by
//! [`Application::executor`].

pub mod app;
pub mod config;
pub mod error;
pub mod logging;

pub use app::Application;
pub use config::AppConfig;
pub use error::{AppError, AppResult};
