//! Localized menu text.
//!
//! The catalog is a pure lookup table keyed by prompt and language, built
//! once at process start. Completeness is validated at construction time:
//! a reachable prompt missing a template in either supported language is a
//! startup-fatal configuration error, never a silent per-request fallback.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Supported dialogue languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    Am,
}

impl Language {
    pub const ALL: [Language; 2] = [Language::En, Language::Am];

    /// Keystroke at the language prompt: 1 = English, 2 = Amharic.
    pub fn from_menu_digit(digit: &str) -> Option<Self> {
        match digit {
            "1" => Some(Language::En),
            "2" => Some(Language::Am),
            _ => None,
        }
    }

    /// Wire code as carried by IVR `language_preference`.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "en" => Some(Language::En),
            "am" => Some(Language::Am),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Am => "am",
        }
    }
}

/// Every piece of user-visible dialogue text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Prompt {
    /// Language-selection greeting shown before a language is chosen.
    Welcome,
    MainMenu,
    CropRegionPrompt,
    CropTypePrompt,
    /// Final crop advisory; interpolates `{crop}` and `{region}`.
    CropResult,
    PestCropPrompt,
    PestDescriptionPrompt,
    /// Final pest advisory; interpolates `{crop}`.
    PestResult,
    MarketCropPrompt,
    /// Final market price line; interpolates `{crop}` and `{price}`.
    PriceResult,
    /// Shown in place of the price payload when no record matches.
    PriceNotFound,
    InvalidInput,
    ThankYou,
}

impl Prompt {
    pub const ALL: [Prompt; 13] = [
        Prompt::Welcome,
        Prompt::MainMenu,
        Prompt::CropRegionPrompt,
        Prompt::CropTypePrompt,
        Prompt::CropResult,
        Prompt::PestCropPrompt,
        Prompt::PestDescriptionPrompt,
        Prompt::PestResult,
        Prompt::MarketCropPrompt,
        Prompt::PriceResult,
        Prompt::PriceNotFound,
        Prompt::InvalidInput,
        Prompt::ThankYou,
    ];
}

/// Template table: one entry per prompt per language.
///
/// The welcome text is intentionally bilingual since it is shown before a
/// language has been chosen. "Not found" stays untranslated to match the
/// price dataset convention.
const TEMPLATES: &[(Prompt, Language, &str)] = &[
    (
        Prompt::Welcome,
        Language::En,
        "Welcome to Farmer's Companion! Please select your language:\n1. English\n2. አማርኛ (Amharic)",
    ),
    (
        Prompt::Welcome,
        Language::Am,
        "እንኳን ደህና መጡ ወደ ገበሬ ባልደረባ! ቋንቋ ይምረጡ:\n1. English\n2. አማርኛ",
    ),
    (
        Prompt::MainMenu,
        Language::En,
        "Main Menu:\n1. Crop Info\n2. Pest Help\n3. Market Prices\n0. Exit",
    ),
    (
        Prompt::MainMenu,
        Language::Am,
        "ዋና ምናሌ:\n1. የእርሻ መረጃ\n2. የተባባሪ መረጃ\n3. የገበያ ዋጋ\n0. ውጣ",
    ),
    (
        Prompt::CropRegionPrompt,
        Language::En,
        "Crop Info selected. Enter your region:\n0. Back",
    ),
    (
        Prompt::CropRegionPrompt,
        Language::Am,
        "የእርሻ መረጃ ተመርጧል። ክልልዎን ያስገቡ:\n0. ተመለስ",
    ),
    (
        Prompt::CropTypePrompt,
        Language::En,
        "Enter crop type (e.g., maize, teff):\n0. Back",
    ),
    (
        Prompt::CropTypePrompt,
        Language::Am,
        "የእርሻ አይነት ያስገቡ (ለምሳሌ: በቆሎ, ጤፍ):\n0. ተመለስ",
    ),
    (
        Prompt::CropResult,
        Language::En,
        "Crop: {crop}, Region: {region} - Advisory: Use disease-resistant seeds.",
    ),
    (
        Prompt::CropResult,
        Language::Am,
        "ሰብል: {crop}, ክልል: {region} - ምክር: በሽታን የሚቋቋሙ ዘሮችን ይጠቀሙ።",
    ),
    (
        Prompt::PestCropPrompt,
        Language::En,
        "Pest Help selected. Enter the affected crop:\n0. Back",
    ),
    (
        Prompt::PestCropPrompt,
        Language::Am,
        "የተባባሪ መረጃ ተመርጧል። የተጎዳውን ሰብል ያስገቡ:\n0. ተመለስ",
    ),
    (
        Prompt::PestDescriptionPrompt,
        Language::En,
        "Describe the issue or send photo later:\n0. Back",
    ),
    (
        Prompt::PestDescriptionPrompt,
        Language::Am,
        "ችግሩን ይግለጹ ወይም ፎቶ ይላኩ:\n0. ተመለስ",
    ),
    (
        Prompt::PestResult,
        Language::En,
        "Pest for {crop}: Monitor for symptoms. Consult local extension for specific treatment.",
    ),
    (
        Prompt::PestResult,
        Language::Am,
        "ለ{crop} ተባይ: ምልክቶችን ይከታተሉ። ለተለየ ህክምና የአካባቢውን ባለሙያ ያማክሩ።",
    ),
    (
        Prompt::MarketCropPrompt,
        Language::En,
        "Market Prices selected. Enter crop name:\n0. Back",
    ),
    (
        Prompt::MarketCropPrompt,
        Language::Am,
        "የገበያ ዋጋ ተመርጧል። የእርሻ ስም ያስገቡ:\n0. ተመለስ",
    ),
    (Prompt::PriceResult, Language::En, "{crop} price: {price}"),
    (Prompt::PriceResult, Language::Am, "የ{crop} ዋጋ: {price}"),
    (Prompt::PriceNotFound, Language::En, "Not found"),
    (Prompt::PriceNotFound, Language::Am, "Not found"),
    (
        Prompt::InvalidInput,
        Language::En,
        "Invalid input. Please try again.",
    ),
    (
        Prompt::InvalidInput,
        Language::Am,
        "የተሳሳተ ግብዓት። እባክዎ ደግመው ይሞክሩ።",
    ),
    (
        Prompt::ThankYou,
        Language::En,
        "Thank you for using Farmer's Companion!",
    ),
    (
        Prompt::ThankYou,
        Language::Am,
        "አመሰግናለሁ ወደ ገበሬ ባልደረባ ስለ መጡ!",
    ),
];

/// Language-indexed table of dialogue templates.
#[derive(Debug, Clone)]
pub struct MenuCatalog {
    templates: HashMap<(Prompt, Language), &'static str>,
}

impl MenuCatalog {
    /// Build the catalog and verify every prompt has a template in every
    /// supported language.
    pub fn new() -> Result<Self> {
        let templates: HashMap<(Prompt, Language), &'static str> = TEMPLATES
            .iter()
            .map(|(prompt, language, text)| ((*prompt, *language), *text))
            .collect();

        for prompt in Prompt::ALL {
            for language in Language::ALL {
                if !templates.contains_key(&(prompt, language)) {
                    return Err(Error::MissingTemplate { prompt, language });
                }
            }
        }

        Ok(Self { templates })
    }

    /// Render a template, interpolating `{name}` placeholders from `fields`.
    pub fn render(&self, prompt: Prompt, language: Language, fields: &[(&str, &str)]) -> String {
        // Completeness is checked in new(); the lookup cannot miss.
        let template = self
            .templates
            .get(&(prompt, language))
            .copied()
            .unwrap_or_default();
        let mut text = template.to_string();
        for (name, value) in fields {
            text = text.replace(&format!("{{{name}}}"), value);
        }
        text
    }
}
