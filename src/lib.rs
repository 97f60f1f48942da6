//! Rivet v0.3.0 - Coverage-Driven Routing and Research Engine
//!
//! Routes industrial-maintenance questions by how well the knowledge store
//! covers them, and turns every coverage gap into background research work.
//!
//! # Architecture
//!
//! - **Intent + coverage**: extract a structured intent, probe the store,
//!   classify coverage as NONE/THIN/STRONG
//! - **Routing**: clarity gate first, then one of Direct/Enrich/Research,
//!   with an orthogonal SME agent overlay
//! - **Gaps + research**: unanswered questions become deduplicated gap
//!   records and fan-out forum research runs feeding an ingestion queue
//! - **Synthesis**: citations, safety notices, checkboxes, and confidence
//!   badges layered over the drafted answer

// Request decision path
pub mod config;
pub mod coverage;
pub mod errors;
pub mod intent;
pub mod router;
pub mod types;

// Knowledge store and retrieval
pub mod knowledge;
pub mod retrieval;

// Gap detection and background research
pub mod gaps;
pub mod research;
pub mod storage;

// Answer post-processing
pub mod synthesis;

// Orchestration and interface
pub mod cli;
pub mod engine;

// Re-export commonly used types
pub use config::RivetConfig;
pub use engine::RivetEngine;
pub use errors::{Result, RivetError};
pub use types::{Channel, Request, RivetResponse, RouteTrace};
