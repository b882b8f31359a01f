//! Localized strings for the statistics page.
//!
//! Messages live in a flat YAML map of `key: message`. The built-in
//! English catalog is compiled into the binary; an operator-supplied file
//! overrides individual keys.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use sitestats_core::{ConfigError, SiteStatsError, SiteStatsResult};

const BUILTIN_EN: &str = include_str!("../locale/en.yaml");

/// Prefix shared by every key of the statistics page.
pub const KEY_PREFIX: &str = "plugins.generic.siteStatistics.";

/// Labels passed to the page template, by short name.
pub const PAGE_LABELS: &[&str] = &[
    "title",
    "journals",
    "issues",
    "articles",
    "downloads",
    "allTimeMostRead",
    "lastMonthMostRead",
    "noneAvailable",
    "lastUpdated",
];

/// Looks up user-facing strings.
pub trait Translator: Send + Sync {
    /// Message for `key`, or the key itself when there is none.
    fn translate(&self, key: &str) -> String;
}

/// YAML-backed message catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageCatalog {
    messages: HashMap<String, String>,
}

impl MessageCatalog {
    /// The built-in English catalog.
    pub fn builtin() -> SiteStatsResult<Self> {
        Self::from_yaml_str(BUILTIN_EN, "builtin")
    }

    /// Parse a catalog from YAML text. `origin` names the source in errors.
    pub fn from_yaml_str(yaml: &str, origin: &str) -> SiteStatsResult<Self> {
        let messages: HashMap<String, String> = serde_yaml::from_str(yaml).map_err(|e| {
            SiteStatsError::Config(ConfigError::InvalidValue {
                field: "catalog_path".to_string(),
                value: origin.to_string(),
                reason: format!("Invalid message catalog: {}", e),
            })
        })?;
        Ok(Self { messages })
    }

    /// The built-in catalog with the messages of `path` layered on top.
    pub fn builtin_with_overrides<P: AsRef<Path>>(path: P) -> SiteStatsResult<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|e| {
            SiteStatsError::Config(ConfigError::InvalidValue {
                field: "catalog_path".to_string(),
                value: path.display().to_string(),
                reason: e.to_string(),
            })
        })?;
        let overrides = Self::from_yaml_str(&yaml, &path.display().to_string())?;

        let mut catalog = Self::builtin()?;
        catalog.messages.extend(overrides.messages);
        Ok(catalog)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl Translator for MessageCatalog {
    fn translate(&self, key: &str) -> String {
        self.messages
            .get(key)
            .cloned()
            .unwrap_or_else(|| key.to_string())
    }
}

/// Translate every page label, keyed by its short name.
pub fn page_labels(translator: &dyn Translator) -> BTreeMap<&'static str, String> {
    PAGE_LABELS
        .iter()
        .map(|name| (*name, translator.translate(&format!("{}{}", KEY_PREFIX, name))))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_builtin_covers_page_labels() {
        let catalog = MessageCatalog::builtin().unwrap();
        let labels = page_labels(&catalog);

        assert_eq!(labels.len(), PAGE_LABELS.len());
        assert_eq!(catalog.len(), PAGE_LABELS.len());
        assert!(!catalog.is_empty());
        assert_eq!(labels["journals"], "Journals");
        assert!(labels.values().all(|label| !label.starts_with(KEY_PREFIX)));
    }

    #[test]
    fn test_unknown_key_translates_to_itself() {
        let catalog = MessageCatalog::builtin().unwrap();
        assert_eq!(catalog.translate("no.such.key"), "no.such.key");
    }

    #[test]
    fn test_overrides_replace_individual_keys() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "plugins.generic.siteStatistics.journals: Revues").unwrap();

        let catalog = MessageCatalog::builtin_with_overrides(file.path()).unwrap();

        assert_eq!(catalog.translate("plugins.generic.siteStatistics.journals"), "Revues");
        assert_eq!(catalog.translate("plugins.generic.siteStatistics.issues"), "Issues");
    }

    #[test]
    fn test_invalid_catalog_is_config_error() {
        let err = MessageCatalog::from_yaml_str("- just\n- a list\n", "inline").unwrap_err();
        assert!(matches!(err, SiteStatsError::Config(_)));
    }
}
