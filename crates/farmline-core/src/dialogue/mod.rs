//! The dialogue state machine.
//!
//! One call to [`DialogueEngine::step`] interprets a single inbound keystroke
//! (or DTMF/speech event, already normalized to text by the channel adapter)
//! against the session's current record, advances the state, renders the
//! localized reply, and reports whether the session continues or ends.
//!
//! The step is synchronous in spirit: the only await point is the optional
//! market price lookup, which is bounded by a timeout and degraded to the
//! localized invalid-input text on failure. A USSD or IVR session always ends
//! with user-visible text, never a raw error.
//!
//! Input `"0"` always means "back one level", except at the main menu where
//! it ends the session entirely. That asymmetry is deliberate.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::menu::{Language, MenuCatalog, Prompt};
use crate::price::PriceLookupPort;
use crate::session::{DialogueState, SessionRecord};

/// Result of one engine step.
#[derive(Debug)]
pub struct StepOutcome {
    /// Updated record to persist, or `None` when the session just ended and
    /// its record must be deleted.
    pub record: Option<SessionRecord>,
    /// Rendered reply text, without any channel framing.
    pub text: String,
    /// Language the reply is rendered in. English before a language is chosen.
    pub language: Language,
    /// Whether the session just reached its terminal state.
    pub terminal: bool,
}

/// Channel-agnostic dialogue engine shared by the USSD and IVR adapters.
pub struct DialogueEngine {
    catalog: MenuCatalog,
    prices: Arc<dyn PriceLookupPort>,
    lookup_timeout: Duration,
}

impl DialogueEngine {
    pub fn new(
        catalog: MenuCatalog,
        prices: Arc<dyn PriceLookupPort>,
        lookup_timeout: Duration,
    ) -> Self {
        Self {
            catalog,
            prices,
            lookup_timeout,
        }
    }

    pub fn catalog(&self) -> &MenuCatalog {
        &self.catalog
    }

    /// Advance `record` by one inbound event.
    pub async fn step(&self, mut record: SessionRecord, input: &str) -> StepOutcome {
        let input = input.trim();

        // Language selection runs before everything else, including the
        // universal "0" rule: at this state every non-language keystroke just
        // repeats the welcome prompt.
        if record.state == DialogueState::AwaitingLanguage {
            return match Language::from_menu_digit(input) {
                Some(language) => {
                    record.language = Some(language);
                    record.state = DialogueState::MainMenu;
                    self.stay(record, Prompt::MainMenu)
                }
                None => self.stay(record, Prompt::Welcome),
            };
        }

        // Every state past language selection has a language set.
        let language = record.language.unwrap_or(Language::En);

        // Empty or whitespace-only input never counts as "0" or a menu digit.
        if input.is_empty() {
            return self.stay(record, Prompt::InvalidInput);
        }

        // Universal back/exit. Back goes one level up the menu tree; at the
        // main menu it ends the session.
        if input == "0" {
            return match record.state {
                DialogueState::MainMenu => self.end(record.session_id, language, Prompt::ThankYou, &[]),
                DialogueState::CropInfoAwaitType => {
                    // Re-entering the region step must not retain a stale region.
                    record.scratch.region = None;
                    record.state = DialogueState::CropInfoAwaitRegion;
                    self.stay(record, Prompt::CropRegionPrompt)
                }
                DialogueState::PestHelpAwaitDescription => {
                    record.scratch.crop = None;
                    record.state = DialogueState::PestHelpAwaitCrop;
                    self.stay(record, Prompt::PestCropPrompt)
                }
                _ => {
                    record.scratch = Default::default();
                    record.state = DialogueState::MainMenu;
                    self.stay(record, Prompt::MainMenu)
                }
            };
        }

        match record.state {
            DialogueState::MainMenu => match input {
                "1" => {
                    record.state = DialogueState::CropInfoAwaitRegion;
                    self.stay(record, Prompt::CropRegionPrompt)
                }
                "2" => {
                    record.state = DialogueState::PestHelpAwaitCrop;
                    self.stay(record, Prompt::PestCropPrompt)
                }
                "3" => {
                    record.state = DialogueState::MarketPriceAwaitCrop;
                    self.stay(record, Prompt::MarketCropPrompt)
                }
                _ => self.stay(record, Prompt::InvalidInput),
            },

            DialogueState::CropInfoAwaitRegion => {
                record.scratch.region = Some(input.to_string());
                record.state = DialogueState::CropInfoAwaitType;
                self.stay(record, Prompt::CropTypePrompt)
            }
            DialogueState::CropInfoAwaitType => {
                let region = record.scratch.region.take().unwrap_or_default();
                self.end(
                    record.session_id,
                    language,
                    Prompt::CropResult,
                    &[("crop", input), ("region", &region)],
                )
            }

            DialogueState::PestHelpAwaitCrop => {
                record.scratch.crop = Some(input.to_string());
                record.state = DialogueState::PestHelpAwaitDescription;
                self.stay(record, Prompt::PestDescriptionPrompt)
            }
            DialogueState::PestHelpAwaitDescription => {
                let crop = record.scratch.crop.take().unwrap_or_default();
                debug!(session_id = %record.session_id, crop = %crop, "pest description received");
                self.end(
                    record.session_id,
                    language,
                    Prompt::PestResult,
                    &[("crop", &crop)],
                )
            }

            DialogueState::MarketPriceAwaitCrop => {
                let crop_key = input.to_lowercase();
                self.resolve_price(record.session_id, language, &crop_key).await
            }

            // Handled above.
            DialogueState::AwaitingLanguage => self.stay(record, Prompt::Welcome),
            // Absorbing: terminated records are deleted and never re-read, so
            // a request landing here can only mean a fresh gateway retry.
            DialogueState::Terminated => {
                self.stay(SessionRecord::new(record.session_id), Prompt::Welcome)
            }
        }
    }

    /// Terminal market price step: lookup bounded by the configured timeout,
    /// degraded to localized text on any failure.
    async fn resolve_price(
        &self,
        session_id: String,
        language: Language,
        crop_key: &str,
    ) -> StepOutcome {
        let lookup = tokio::time::timeout(self.lookup_timeout, self.prices.most_recent(crop_key));
        match lookup.await {
            Ok(Ok(Some(found))) => {
                let line = found.display_line();
                self.end(
                    session_id,
                    language,
                    Prompt::PriceResult,
                    &[("crop", &title_case(crop_key)), ("price", &line)],
                )
            }
            Ok(Ok(None)) => {
                let not_found = self.catalog.render(Prompt::PriceNotFound, language, &[]);
                self.end(
                    session_id,
                    language,
                    Prompt::PriceResult,
                    &[("crop", &title_case(crop_key)), ("price", &not_found)],
                )
            }
            Ok(Err(e)) => {
                warn!(%session_id, crop = %crop_key, error = %e, "price lookup failed");
                self.end(session_id, language, Prompt::InvalidInput, &[])
            }
            Err(_) => {
                warn!(%session_id, crop = %crop_key, "price lookup timed out");
                self.end(session_id, language, Prompt::InvalidInput, &[])
            }
        }
    }

    /// Non-terminal reply: persist the (possibly updated) record.
    fn stay(&self, mut record: SessionRecord, prompt: Prompt) -> StepOutcome {
        record.touch();
        let language = record.language.unwrap_or(Language::En);
        StepOutcome {
            text: self.catalog.render(prompt, language, &[]),
            language,
            terminal: false,
            record: Some(record),
        }
    }

    /// Terminal reply: the record is gone after this step.
    fn end(
        &self,
        session_id: String,
        language: Language,
        prompt: Prompt,
        fields: &[(&str, &str)],
    ) -> StepOutcome {
        debug!(%session_id, ?prompt, "session terminated");
        StepOutcome {
            record: None,
            text: self.catalog.render(prompt, language, fields),
            language,
            terminal: true,
        }
    }
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
