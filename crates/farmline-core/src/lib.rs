//! farmline-core - Core library for Farmline
//!
//! This crate provides the channel-agnostic dialogue machinery shared by the
//! USSD and IVR access channels:
//!
//! - **session**: session records, state enum, volatile session store
//! - **dialogue**: the state machine advancing one keystroke at a time
//! - **menu**: localized prompt catalog, validated at startup
//! - **price**: market price lookup port and its dataset-backed implementation

pub mod dialogue;
pub mod error;
pub mod menu;
pub mod price;
pub mod session;

// Re-export commonly used types
pub use dialogue::{DialogueEngine, StepOutcome};
pub use error::{Error, Result};
pub use menu::{Language, MenuCatalog, Prompt};
pub use price::{JsonPriceBook, PriceLookupPort, PriceRecord, StaticPriceBook};
pub use session::{DialogueState, InMemorySessionStore, SessionRecord, SessionStore};
