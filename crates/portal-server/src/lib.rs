//! Service wiring and query surface for the device capture subsystem.
//!
//! [`service::PortalService`] owns the refresh engine, snapshot store, and
//! capture coordinator; [`query`] turns service state into the JSON
//! envelopes clients consume.

pub mod config;
pub mod coordinator;
pub mod logging;
pub mod query;
pub mod service;

pub use config::PortalConfig;
pub use coordinator::{CaptureCoordinator, CaptureRequestError};
pub use service::{MirrorDeps, PortalDeps, PortalService};
