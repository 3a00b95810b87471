//! Per-language page content stored behind one page key.
//!
//! A stored payload is either plain text (older rows, single-language pages)
//! or a JSON object mapping language code to text. Decoding turns the raw
//! string into an explicit [`ContentPayload`] once, at the storage boundary.

use std::collections::BTreeMap;

use crate::error::Result;

pub const DEFAULT_LANG: &str = "en";

pub type LanguageMap = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentPayload {
    PlainText(String),
    Localized(LanguageMap),
}

impl ContentPayload {
    /// Anything that is not a JSON object of strings is plain text.
    pub fn decode(raw: &str) -> Self {
        match serde_json::from_str::<LanguageMap>(raw) {
            Ok(map) => ContentPayload::Localized(map),
            Err(_) => ContentPayload::PlainText(raw.to_string()),
        }
    }

    pub fn encode(&self) -> Result<String> {
        match self {
            ContentPayload::PlainText(text) => Ok(text.clone()),
            ContentPayload::Localized(map) => encode(map),
        }
    }

    /// Plain text becomes the default-language entry.
    pub fn into_language_map(self) -> LanguageMap {
        match self {
            ContentPayload::PlainText(text) => {
                let mut map = LanguageMap::new();
                map.insert(DEFAULT_LANG.to_string(), text);
                map
            }
            ContentPayload::Localized(map) => map,
        }
    }
}

pub fn decode(raw: &str) -> LanguageMap {
    ContentPayload::decode(raw).into_language_map()
}

pub fn encode(map: &LanguageMap) -> Result<String> {
    Ok(serde_json::to_string(map)?)
}

/// Requested language, then the default language, then the first other
/// language that has text. Empty variants are skipped so a caller never gets
/// "" while any text exists, and never sees the encoded map.
pub fn resolve<'a>(map: &'a LanguageMap, lang: &str) -> &'a str {
    map.get(lang)
        .filter(|text| !text.is_empty())
        .or_else(|| map.get(DEFAULT_LANG).filter(|text| !text.is_empty()))
        .or_else(|| map.values().find(|text| !text.is_empty()))
        .map(String::as_str)
        .unwrap_or("")
}

/// Payload after writing `text`. Without a language the payload is replaced
/// wholesale; with one, only that language's entry changes.
pub fn with_variant(existing: Option<&str>, lang: Option<&str>, text: &str) -> Result<String> {
    match lang {
        None => Ok(text.to_string()),
        Some(lang) => {
            let mut map = existing.map(decode).unwrap_or_default();
            map.insert(lang.to_string(), text.to_string());
            encode(&map)
        }
    }
}

/// Lower-cased language tag, or `None` when blank.
pub fn normalize_lang(lang: Option<&str>) -> Option<String> {
    lang.map(|l| l.trim().to_ascii_lowercase())
        .filter(|l| !l.is_empty())
}

// -- Built-in defaults --

const DEFAULT_PAGES: &[(&str, &[(&str, &str)])] = &[
    (
        "landing",
        &[
            ("en", "Welcome. Every message and every donation helps keep this going."),
            ("nl", "Welkom. Elk bericht en elke donatie helpt om dit gaande te houden."),
        ],
    ),
    (
        "about",
        &[
            ("en", "We are a small, independent team. This page tells our story."),
            ("nl", "Wij zijn een klein, onafhankelijk team. Deze pagina vertelt ons verhaal."),
        ],
    ),
    (
        "support",
        &[
            ("en", "Leave a message of support, with or without a donation."),
            ("nl", "Laat een steunbericht achter, met of zonder donatie."),
        ],
    ),
    (
        "storytelling",
        &[
            ("en", "Stories shared by the people who were there."),
            ("nl", "Verhalen gedeeld door de mensen die erbij waren."),
        ],
    ),
];

pub fn default_map(page_id: &str) -> Option<LanguageMap> {
    DEFAULT_PAGES
        .iter()
        .find(|(page, _)| *page == page_id)
        .map(|(_, variants)| {
            variants
                .iter()
                .map(|(lang, text)| (lang.to_string(), text.to_string()))
                .collect()
        })
}

/// Default text for a page in a language, following the normal fallback.
pub fn default_text(page_id: &str, lang: &str) -> String {
    default_map(page_id)
        .map(|map| resolve(&map, lang).to_string())
        .unwrap_or_default()
}
