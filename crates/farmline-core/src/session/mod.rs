//! Session model for the dialogue engine.
//!
//! USSD and IVR are stateless on the wire: every keystroke arrives as a fresh
//! request carrying only a gateway-issued session identifier. The server
//! reconstructs the exact conversational position from the [`SessionRecord`]
//! stored under that identifier, so the record is the single source of truth
//! for where a caller is in the menu tree.

mod store;

pub use store::{InMemorySessionStore, SessionStore};

use std::time::Instant;

use crate::menu::Language;

/// Position in the menu dialogue.
///
/// Closed set: a session is always in exactly one of these states, and every
/// transition is handled by an exhaustive match in the dialogue engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DialogueState {
    /// First contact; waiting for the caller to pick a language.
    AwaitingLanguage,
    /// Top-level menu (crop info / pest help / market prices / exit).
    MainMenu,
    /// Crop info flow, step 1: collecting the caller's region.
    CropInfoAwaitRegion,
    /// Crop info flow, step 2: collecting the crop type.
    CropInfoAwaitType,
    /// Pest help flow, step 1: collecting the affected crop.
    PestHelpAwaitCrop,
    /// Pest help flow, step 2: collecting the issue description.
    PestHelpAwaitDescription,
    /// Market price flow: collecting the crop to price.
    MarketPriceAwaitCrop,
    /// Absorbing terminal state. The record is deleted on entry and never
    /// read back; a later request under the same id starts a fresh session.
    Terminated,
}

impl DialogueState {
    /// Whether this state ends the session.
    pub fn is_terminal(&self) -> bool {
        matches!(self, DialogueState::Terminated)
    }
}

/// Multi-step input accumulated before a flow resolves.
///
/// Fields are only ever populated in the order the owning flow requests them;
/// a flow never reads a field it has not itself written earlier in the same
/// session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scratch {
    /// Region collected by the crop-info flow.
    pub region: Option<String>,
    /// Crop collected by the pest-help flow.
    pub crop: Option<String>,
}

/// Per-session conversation state.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    /// Gateway-supplied opaque identifier, unique per active conversation.
    pub session_id: String,
    /// Chosen language. `None` exactly while in [`DialogueState::AwaitingLanguage`];
    /// set once during language selection and immutable thereafter.
    pub language: Option<Language>,
    /// Current position in the dialogue.
    pub state: DialogueState,
    /// Accumulated multi-step input.
    pub scratch: Scratch,
    /// Last activity, used for idle eviction.
    pub touched_at: Instant,
}

impl SessionRecord {
    /// Fresh session at the language prompt.
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            language: None,
            state: DialogueState::AwaitingLanguage,
            scratch: Scratch::default(),
            touched_at: Instant::now(),
        }
    }

    /// Refresh the idle timer.
    pub fn touch(&mut self) {
        self.touched_at = Instant::now();
    }
}
