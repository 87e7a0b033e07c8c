//! DeviceInfo service.
//!
//! Exposes read-only device telemetry over HTTP as JSON. A GET under the
//! configured web prefix is routed to one or all collectors:
//!
//! ```text
//! GET /Service/DeviceInfo            -> systeminfo + addresses + sockets
//! GET /Service/DeviceInfo/System     -> systeminfo
//! GET /Service/DeviceInfo/Addresses  -> addresses
//! GET /Service/DeviceInfo/Sockets    -> sockets
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ HTTP Server  │────>│    Router    │────>│  Collectors  │
//! │   (axum)     │     │ (route table)│     │ (Facilities) │
//! └──────────────┘     └──────────────┘     └──────────────┘
//!                             │
//!                      ┌──────────────┐     ┌──────────────┐
//!                      │  DeviceInfo  │────>│    Shell     │
//!                      │  (lifecycle) │     │  (provider)  │
//!                      └──────────────┘     └──────────────┘
//! ```

pub mod capabilities;
pub mod collector;
pub mod config;
pub mod host;
pub mod http;
#[cfg(target_os = "linux")]
mod linux;
pub mod platform;
pub mod plugin;
pub mod router;
pub mod shell;

pub use collector::Facilities;
pub use config::ServiceConfig;
pub use http::{HttpServer, SharedDeviceInfo};
pub use plugin::DeviceInfo;
pub use router::{Request, Response, Verb};
pub use shell::LocalShell;
