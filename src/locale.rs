//! Language-fallback string resolution.
//!
//! Human-readable strings live in per-language JSON tables under the `lang/`
//! directory (`en.json`, `fr.json`, ...), with `langs.json` as the ordered
//! registry of supported codes. Resolution never fails: an unknown language
//! falls back to the base table, an unknown key falls back to a humanized
//! form of the key itself.

use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use thiserror::Error;

/// Built-in terminal fallback language.
pub const BASE_LANG: &str = "en";

/// Errors from the language registry.
///
/// Unlike the per-language tables (user-facing data, recovered silently), the
/// registry is a build-time asset; its absence is a configuration error.
#[derive(Error, Debug)]
pub enum LocaleError {
    #[error("Language registry not found: {0}")]
    RegistryMissing(Utf8PathBuf),

    #[error("Language registry is not valid JSON: {0}")]
    RegistryInvalid(#[source] serde_json::Error),
}

/// Resolves string keys through a three-level fallback chain.
///
/// Language selection order: explicit per-directive override, else the
/// configured default language, else [`BASE_LANG`]. Table lookup order: the
/// selected language's table (a missing table file counts as a miss), then
/// the base table, then the humanized key.
///
/// Tables are loaded lazily and cached for the life of the resolver, which is
/// one request.
#[derive(Debug)]
pub struct LocalizationResolver {
    lang_dir: Utf8PathBuf,
    configured: Option<String>,
    tables: RefCell<HashMap<String, Option<HashMap<String, String>>>>,
}

impl LocalizationResolver {
    /// * `lang_dir` - directory holding the language tables and registry
    /// * `configured` - the `lang` setting from the config store, if any
    pub fn new<P: AsRef<Utf8Path>>(lang_dir: P, configured: Option<String>) -> Self {
        Self {
            lang_dir: lang_dir.as_ref().to_path_buf(),
            configured,
            tables: RefCell::new(HashMap::new()),
        }
    }

    /// Resolve `key` to localized text. Never fails.
    pub fn resolve(&self, key: &str, explicit_lang: Option<&str>) -> String {
        let selected = explicit_lang
            .filter(|lang| !lang.is_empty())
            .map(str::to_string)
            .or_else(|| self.configured.clone().filter(|lang| !lang.is_empty()))
            .unwrap_or_else(|| BASE_LANG.to_string());

        if let Some(text) = self.lookup(&selected, key) {
            return text;
        }
        if let Some(text) = self.lookup(BASE_LANG, key) {
            return text;
        }
        humanize(key)
    }

    /// Ordered mapping of language code to display name from `langs.json`.
    pub fn available_languages(&self) -> Result<IndexMap<String, String>, LocaleError> {
        let path = self.lang_dir.join("langs.json");
        let raw =
            fs::read_to_string(&path).map_err(|_| LocaleError::RegistryMissing(path.clone()))?;
        serde_json::from_str(&raw).map_err(LocaleError::RegistryInvalid)
    }

    fn lookup(&self, code: &str, key: &str) -> Option<String> {
        let mut tables = self.tables.borrow_mut();
        let table = tables
            .entry(code.to_string())
            .or_insert_with(|| self.load_table(code));
        table.as_ref()?.get(key).cloned()
    }

    fn load_table(&self, code: &str) -> Option<HashMap<String, String>> {
        // Codes come from page directives and the config file; refuse
        // anything that is not a plain token before touching the filesystem.
        if code.is_empty() || !code.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_') {
            return None;
        }
        let path = self.lang_dir.join(format!("{code}.json"));
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(err) => {
                tracing::debug!("No language table at {}: {}", path, err);
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(table) => Some(table),
            Err(err) => {
                tracing::warn!("Ignoring unreadable language table {}: {}", path, err);
                None
            }
        }
    }
}

/// Terminal default: the key itself with its first letter upper-cased.
fn humanize(key: &str) -> String {
    let mut chars = key.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn lang_fixture() -> (Utf8PathBuf, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let dir = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
        fs::write(
            dir.join("en.json"),
            r#"{"name": "Name", "send": "Send", "only_base": "Base only"}"#,
        )
        .unwrap();
        fs::write(dir.join("fr.json"), r#"{"name": "Nom", "send": "Envoyer"}"#).unwrap();
        fs::write(dir.join("langs.json"), r#"{"en": "English", "fr": "Français"}"#).unwrap();
        (dir, temp_dir)
    }

    #[test]
    fn test_explicit_override_wins_over_configured() {
        let (dir, _temp_dir) = lang_fixture();
        let resolver = LocalizationResolver::new(&dir, Some("en".to_string()));

        assert_eq!(resolver.resolve("name", Some("fr")), "Nom");
        assert_eq!(resolver.resolve("name", None), "Name");
    }

    #[test]
    fn test_configured_language_is_the_default() {
        let (dir, _temp_dir) = lang_fixture();
        let resolver = LocalizationResolver::new(&dir, Some("fr".to_string()));
        assert_eq!(resolver.resolve("send", None), "Envoyer");
    }

    #[test]
    fn test_unknown_language_falls_back_to_base_table() {
        let (dir, _temp_dir) = lang_fixture();
        let resolver = LocalizationResolver::new(&dir, None);
        assert_eq!(resolver.resolve("name", Some("xx")), "Name");
    }

    #[test]
    fn test_key_missing_in_selected_table_falls_back_to_base() {
        let (dir, _temp_dir) = lang_fixture();
        let resolver = LocalizationResolver::new(&dir, Some("fr".to_string()));
        assert_eq!(resolver.resolve("only_base", None), "Base only");
    }

    #[test]
    fn test_unknown_key_is_humanized() {
        let (dir, _temp_dir) = lang_fixture();
        let resolver = LocalizationResolver::new(&dir, None);
        assert_eq!(resolver.resolve("custom_field", None), "Custom_field");
    }

    #[test]
    fn test_traversal_shaped_codes_are_rejected() {
        let (dir, _temp_dir) = lang_fixture();
        let resolver = LocalizationResolver::new(&dir, None);
        assert_eq!(resolver.resolve("name", Some("../en")), "Name");
    }

    #[test]
    fn test_registry_preserves_order() {
        let (dir, _temp_dir) = lang_fixture();
        let resolver = LocalizationResolver::new(&dir, None);

        let langs = resolver.available_languages().unwrap();
        let codes: Vec<&String> = langs.keys().collect();
        assert_eq!(codes, vec!["en", "fr"]);
    }

    #[test]
    fn test_missing_registry_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let dir = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
        let resolver = LocalizationResolver::new(&dir, None);

        assert!(matches!(
            resolver.available_languages(),
            Err(LocaleError::RegistryMissing(_))
        ));
    }
}
