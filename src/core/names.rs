/// Name generation — language tag to locale resolution and batching.
///
/// Synthesizing names is left to a locale-aware generator supplied by the
/// host through `NameGenerator`.
use serde::Deserialize;
use std::collections::BTreeMap;

use crate::core::config::ConfigStore;

/// Requested sex of generated names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sex {
    Male,
    Female,
}

impl Sex {
    /// Parse a user-supplied tag; unrecognized tags mean "either".
    pub fn from_tag(tag: &str) -> Option<Sex> {
        match tag.to_lowercase().as_str() {
            "男" | "m" | "male" => Some(Sex::Male),
            "女" | "f" | "female" => Some(Sex::Female),
            _ => None,
        }
    }
}

/// A source of random personal names for a locale.
pub trait NameGenerator {
    /// One name. `locale` is `None` when the language could not be mapped,
    /// in which case the generator uses its own default.
    fn name(&mut self, locale: Option<&str>, sex: Option<Sex>) -> String;
}

#[derive(Debug, Clone, Default, Deserialize)]
struct LanguageEntry {
    #[serde(default)]
    locale: Option<String>,
    #[serde(default)]
    aliases: Vec<String>,
}

/// Map a language tag to a generator locale.
///
/// An empty tag means `names.default_language`. The tag is looked up in
/// `names.languages`, first by key then by alias; failing that a few
/// well-known tags are recognized directly.
pub fn resolve_locale(store: &ConfigStore, language: &str) -> Option<String> {
    let default_language: String = store.get("names.default_language", "cn".to_string());
    let language = if language.is_empty() {
        default_language.as_str()
    } else {
        language
    };

    let languages: BTreeMap<String, LanguageEntry> = store.get("names.languages", BTreeMap::new());
    let configured = match languages.get(language) {
        Some(entry) => entry.locale.clone(),
        None => languages
            .values()
            .find(|entry| entry.aliases.iter().any(|alias| alias == language))
            .and_then(|entry| entry.locale.clone()),
    };

    configured.or_else(|| builtin_locale(language).map(str::to_string))
}

fn builtin_locale(language: &str) -> Option<&'static str> {
    if matches!(language, "cn" | "zh" | "zh_CN") || language.contains('中') {
        Some("zh_CN")
    } else if matches!(language, "en" | "en_GB") || language.contains('英') {
        Some("en_GB")
    } else if matches!(language, "us" | "en_US") || language.contains('美') {
        Some("en_US")
    } else if matches!(language, "jp" | "ja_JP") || language.contains('日') {
        Some("ja_JP")
    } else {
        None
    }
}

/// Generate `count` names in the given language.
pub fn generate_names<G: NameGenerator + ?Sized>(
    store: &ConfigStore,
    generator: &mut G,
    language: &str,
    count: usize,
    sex: Option<Sex>,
) -> Vec<String> {
    let locale = resolve_locale(store, language);
    tracing::debug!(language, ?locale, count, "generating names");
    (0..count)
        .map(|_| generator.name(locale.as_deref(), sex))
        .collect()
}
