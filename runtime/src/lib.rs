//! pageharvest — configurable row extraction from live browser pages.
//!
//! Finds the repeating containers on a page, reads typed fields out of
//! each, and pages through results by scrolling or clicking "next", while
//! keeping an injected page runtime alive across navigations.

pub mod bridge;
pub mod cli;
pub mod extraction;
pub mod orchestrator;
pub mod page;
pub mod renderer;
pub mod settings;
pub mod types;

pub use bridge::{BridgeError, ExecutionBridge, RetryPolicy};
pub use orchestrator::{Orchestrator, TabProvider};
pub use settings::HarvestSettings;
pub use types::{ExtractionConfig, ExtractionResult, FieldDescriptor, PaginationConfig};
