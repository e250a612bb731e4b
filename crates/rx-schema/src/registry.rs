//! Namespace registry mapping schema tags to URI prefixes

use std::collections::BTreeMap;

/// Namespace root used for locally declared tags
pub const DEFAULT_NAMESPACE_ROOT: &str = "tag:local:";

/// URI prefix of the Rx core type library (`//str`, `//rec`, ...)
pub const CORE_URI: &str = "tag:codesimply.com,2008:rx/core/";

/// URI prefix of the Rx meta type library
pub const META_URI: &str = "tag:codesimply.com,2008:rx/meta/";

/// Outcome of registering a prefix
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrefixRegistration {
    /// The prefix was new and is now mapped
    Registered,
    /// The prefix was already mapped; the existing URI was kept
    AlreadyRegistered { existing: String },
}

/// Registry for managing namespace prefixes
///
/// Constructed once per run and passed by reference through the pipeline.
#[derive(Debug, Clone)]
pub struct NamespaceRegistry {
    root: String,
    prefixes: BTreeMap<String, String>,
}

impl NamespaceRegistry {
    /// Create a registry holding only the built-in Rx prefixes
    pub fn new(root: impl Into<String>) -> Self {
        let mut prefixes = BTreeMap::new();
        prefixes.insert(String::new(), CORE_URI.to_string());
        prefixes.insert(".meta".to_string(), META_URI.to_string());
        Self {
            root: root.into(),
            prefixes,
        }
    }

    /// The namespace root local tags are placed under
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Register a prefix; an existing mapping is never overwritten
    pub fn register(&mut self, prefix: impl Into<String>, uri: impl Into<String>) -> PrefixRegistration {
        let prefix = prefix.into();
        if let Some(existing) = self.prefixes.get(&prefix) {
            return PrefixRegistration::AlreadyRegistered {
                existing: existing.clone(),
            };
        }
        self.prefixes.insert(prefix, uri.into());
        PrefixRegistration::Registered
    }

    /// Register a schema tag such as `/app` under the namespace root
    pub fn register_tag(&mut self, tag: &str) -> PrefixRegistration {
        let prefix = strip_sigil(tag);
        let uri = format!("{}{}/", self.root, prefix);
        self.register(prefix, uri)
    }

    /// Get the URI mapped to a prefix
    pub fn get(&self, prefix: &str) -> Option<&str> {
        self.prefixes.get(prefix).map(String::as_str)
    }

    /// Check if a prefix exists
    pub fn contains(&self, prefix: &str) -> bool {
        self.prefixes.contains_key(prefix)
    }

    /// Fully qualified URI for a declared type name such as `/app/Tag`
    pub fn qualify(&self, name: &str) -> String {
        qualify(&self.root, name)
    }

    /// All prefix mappings, ordered by prefix
    pub fn prefixes(&self) -> &BTreeMap<String, String> {
        &self.prefixes
    }
}

impl Default for NamespaceRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_NAMESPACE_ROOT)
    }
}

/// Qualify a declared name against a namespace root
pub fn qualify(root: &str, name: &str) -> String {
    format!("{}{}", root, strip_sigil(name))
}

fn strip_sigil(name: &str) -> &str {
    name.strip_prefix('/').unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_prefixes() {
        let registry = NamespaceRegistry::default();
        assert_eq!(registry.get(""), Some(CORE_URI));
        assert_eq!(registry.get(".meta"), Some(META_URI));
        assert_eq!(registry.root(), "tag:local:");
    }

    #[test]
    fn test_register_tag() {
        let mut registry = NamespaceRegistry::default();
        assert_eq!(registry.register_tag("/app"), PrefixRegistration::Registered);
        assert_eq!(registry.get("app"), Some("tag:local:app/"));
        assert!(registry.contains("app"));
    }

    #[test]
    fn test_duplicate_tag_keeps_existing_mapping() {
        let mut registry = NamespaceRegistry::new("tag:first:");
        registry.register_tag("/app");

        let outcome = registry.register("app", "tag:other:app/");
        assert_eq!(
            outcome,
            PrefixRegistration::AlreadyRegistered {
                existing: "tag:first:app/".to_string()
            }
        );
        assert_eq!(registry.get("app"), Some("tag:first:app/"));
    }

    #[test]
    fn test_empty_tag_collides_with_core_prefix() {
        let mut registry = NamespaceRegistry::default();
        let outcome = registry.register_tag("/");
        assert!(matches!(outcome, PrefixRegistration::AlreadyRegistered { .. }));
        assert_eq!(registry.get(""), Some(CORE_URI));
    }

    #[test]
    fn test_qualify() {
        let registry = NamespaceRegistry::default();
        assert_eq!(registry.qualify("/app/Tag"), "tag:local:app/Tag");
        assert_eq!(registry.qualify("/app"), "tag:local:app");
        assert_eq!(qualify("urn:x:", "/lib/Item"), "urn:x:lib/Item");
    }

    #[test]
    fn test_independent_registries() {
        let mut first = NamespaceRegistry::default();
        let second = NamespaceRegistry::default();
        first.register_tag("/app");
        assert!(first.contains("app"));
        assert!(!second.contains("app"));
    }
}
