//! Type definitions module
//!
//! Shared domain types: extracted intent, inbound requests, and the
//! response record returned to every front-end.

pub mod intent;
pub mod request;
pub mod response;

// Re-export commonly used types
pub use intent::{contains_safety_keywords, EquipmentType, Intent, Vendor};
pub use request::{Channel, Request};
pub use response::{Citation, RivetResponse, RouteTrace};
