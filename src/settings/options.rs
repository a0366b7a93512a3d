//! Options providers and classification schemas

use indexmap::{IndexMap, IndexSet};

use crate::attributes::AttributeValue;

/// One named group of key/value options
pub type OptionsProvider = IndexMap<String, AttributeValue>;

/// Providers every model carries
pub const DEFAULT_PROVIDERS: [&str; 5] = [
    "PageOptions",
    "SlideshowOptions",
    "UnitsOptions",
    "PrintOptions",
    "NamedOptions",
];

/// Model options, grouped by provider name
#[derive(Debug, Clone, PartialEq)]
pub struct OptionsManager {
    providers: IndexMap<String, OptionsProvider>,
}

impl OptionsManager {
    /// Create a new options manager
    pub fn new() -> Self {
        OptionsManager {
            providers: DEFAULT_PROVIDERS
                .iter()
                .map(|name| (name.to_string(), OptionsProvider::new()))
                .collect(),
        }
    }

    /// Iterate over the provider names
    pub fn provider_names(&self) -> impl Iterator<Item = &str> {
        self.providers.keys().map(String::as_str)
    }

    /// Look up a provider
    pub fn provider(&self, name: &str) -> Option<&OptionsProvider> {
        self.providers.get(name)
    }

    /// Look up an entry
    pub fn get(&self, provider: &str, key: &str) -> Option<&AttributeValue> {
        self.providers.get(provider)?.get(key)
    }

    /// Set an option, creating the provider when needed
    pub fn set(&mut self, provider: &str, key: impl Into<String>, value: impl Into<AttributeValue>) {
        self.providers
            .entry(provider.to_string())
            .or_default()
            .insert(key.into(), value.into());
    }

    /// Replace a whole provider
    pub(crate) fn insert_provider(&mut self, name: impl Into<String>, provider: OptionsProvider) {
        self.providers.insert(name.into(), provider);
    }

    /// Iterate over all entries
    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionsProvider)> {
        self.providers.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl Default for OptionsManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Loaded classification schemas
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Classifications {
    schemas: IndexSet<String>,
}

impl Classifications {
    /// Create with no schemas loaded
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if the schema was already loaded
    pub fn load_schema(&mut self, name: impl Into<String>) -> bool {
        self.schemas.insert(name.into())
    }

    /// Unload a schema; false if it was not loaded
    pub fn unload_schema(&mut self, name: &str) -> bool {
        self.schemas.shift_remove(name)
    }

    /// Check if an entry exists
    pub fn contains(&self, name: &str) -> bool {
        self.schemas.contains(name)
    }

    /// Iterate over loaded schema names
    pub fn schemas(&self) -> impl Iterator<Item = &str> {
        self.schemas.iter().map(String::as_str)
    }

    /// Get the number of entries
    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    /// Check if there are no entries
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_manager() {
        let mut options = OptionsManager::new();
        assert_eq!(options.provider_names().count(), DEFAULT_PROVIDERS.len());
        options.set("UnitsOptions", "LengthPrecision", 2i64);
        assert_eq!(
            options.get("UnitsOptions", "LengthPrecision").and_then(|v| v.as_int()),
            Some(2)
        );
        assert!(options.get("UnitsOptions", "Missing").is_none());
    }

    #[test]
    fn test_classification_schemas() {
        let mut c = Classifications::new();
        assert!(c.load_schema("IFC 2x3"));
        assert!(!c.load_schema("IFC 2x3"));
        assert!(c.unload_schema("IFC 2x3"));
        assert!(c.is_empty());
    }
}
