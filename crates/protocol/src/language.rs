use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Suffix shared by every localization asset file code.
const FILE_CODE_SUFFIX: &str = "_Text-WindowsClient";

/// A supported game language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    English,
    Japanese,
    Spanish,
    French,
    German,
    Italian,
    Portuguese,
    Russian,
    Korean,
    Chinese,
}

/// Which half of the localization a language is selected for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// On-screen text.
    Text,
    /// Spoken dialogue.
    Voice,
}

/// Returned when parsing a language name that is not in the catalogue.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown language '{0}' (expected one of: {names})", names = Language::names().join(", "))]
pub struct UnknownLanguage(pub String);

impl Language {
    /// Returns the full catalogue in menu order.
    pub fn all() -> &'static [Language] {
        &[
            Language::English,
            Language::Japanese,
            Language::Spanish,
            Language::French,
            Language::German,
            Language::Italian,
            Language::Portuguese,
            Language::Russian,
            Language::Korean,
            Language::Chinese,
        ]
    }

    /// Display names of the whole catalogue.
    pub fn names() -> Vec<&'static str> {
        Self::all().iter().map(|l| l.name()).collect()
    }

    /// Human-readable name, also used as the store subdirectory.
    pub fn name(&self) -> &'static str {
        match self {
            Language::English => "English",
            Language::Japanese => "Japanese",
            Language::Spanish => "Spanish",
            Language::French => "French",
            Language::German => "German",
            Language::Italian => "Italian",
            Language::Portuguese => "Portuguese",
            Language::Russian => "Russian",
            Language::Korean => "Korean",
            Language::Chinese => "Chinese",
        }
    }

    /// Locale prefix of the asset file code (e.g. `en_US`).
    pub fn locale(&self) -> &'static str {
        match self {
            Language::English => "en_US",
            Language::Japanese => "ja_JP",
            Language::Spanish => "es_ES",
            Language::French => "fr_FR",
            Language::German => "de_DE",
            Language::Italian => "it_IT",
            Language::Portuguese => "pt_BR",
            Language::Russian => "ru_RU",
            Language::Korean => "ko_KR",
            Language::Chinese => "zh_CN",
        }
    }

    /// Asset file code, the stem of the `.pak`/`.sig` pair
    /// (e.g. `en_US_Text-WindowsClient`).
    pub fn file_code(&self) -> String {
        format!("{}{FILE_CODE_SUFFIX}", self.locale())
    }

    /// File name of the `.pak` asset.
    pub fn pak_name(&self) -> String {
        format!("{}.pak", self.file_code())
    }

    /// File name of the `.sig` companion.
    pub fn sig_name(&self) -> String {
        format!("{}.sig", self.file_code())
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Language {
    type Err = UnknownLanguage;

    /// Accepts the display name or the locale prefix, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Self::all()
            .iter()
            .copied()
            .find(|l| l.name().eq_ignore_ascii_case(needle) || l.locale().eq_ignore_ascii_case(needle))
            .ok_or_else(|| UnknownLanguage(s.to_string()))
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Text => write!(f, "text"),
            Role::Voice => write!(f, "voice"),
        }
    }
}
