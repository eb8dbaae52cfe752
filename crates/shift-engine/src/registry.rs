//! Rule registry
//!
//! Rules are collected on a [`RegistryBuilder`] at startup and frozen into a
//! [`RuleRegistry`]. The frozen registry has no mutating methods and is shared
//! by reference between concurrently migrated files.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use shift_core::VersionPair;

use crate::error::RegistryError;
use crate::rule::Rule;

type RuleTable = IndexMap<VersionPair, IndexMap<String, Arc<dyn Rule>>>;

/// Collects rule registrations
#[derive(Default)]
pub struct RegistryBuilder {
    rules: RuleTable,
}

impl RegistryBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `rule` for one resource type and version pair
    ///
    /// Registering the same rule instance twice under one key is a no-op.
    ///
    /// # Errors
    /// Returns [`RegistryError::Duplicate`] if a different rule instance is
    /// already registered under the key.
    pub fn register(
        &mut self,
        resource_type: impl Into<String>,
        versions: VersionPair,
        rule: Arc<dyn Rule>,
    ) -> Result<&mut Self, RegistryError> {
        let resource_type = resource_type.into();
        let by_type = self.rules.entry(versions).or_default();
        if let Some(existing) = by_type.get(&resource_type) {
            if same_rule(existing, &rule) {
                return Ok(self);
            }
            return Err(RegistryError::duplicate(
                resource_type,
                versions,
                existing.name(),
                rule.name(),
            ));
        }
        tracing::debug!(
            resource_type = %resource_type,
            versions = %versions,
            rule = rule.name(),
            "registered rule"
        );
        by_type.insert(resource_type, rule);
        Ok(self)
    }

    /// Register `rule` under every type it declares, at its own versions
    ///
    /// # Errors
    /// Returns [`RegistryError`] on a duplicate key or when the rule declares
    /// no resource types.
    pub fn register_rule(&mut self, rule: Arc<dyn Rule>) -> Result<&mut Self, RegistryError> {
        let types: Vec<String> = rule.resource_types().iter().map(|t| t.to_string()).collect();
        if types.is_empty() {
            return Err(RegistryError::NoResourceTypes(rule.name().to_string()));
        }
        let versions = rule.versions();
        for resource_type in types {
            self.register(resource_type, versions, Arc::clone(&rule))?;
        }
        Ok(self)
    }

    /// Builder form of [`RegistryBuilder::register_rule`]
    ///
    /// # Errors
    /// See [`RegistryBuilder::register_rule`].
    pub fn with_rule(mut self, rule: impl Rule + 'static) -> Result<Self, RegistryError> {
        self.register_rule(Arc::new(rule))?;
        Ok(self)
    }

    /// Freeze the registrations
    #[must_use]
    pub fn build(self) -> RuleRegistry {
        RuleRegistry { rules: self.rules }
    }
}

impl fmt::Debug for RegistryBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryBuilder")
            .field("rules", &Keys(&self.rules))
            .finish()
    }
}

/// Read-only map of `(resource type, versions) -> rule`
#[derive(Default)]
pub struct RuleRegistry {
    rules: RuleTable,
}

impl RuleRegistry {
    #[must_use]
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Rule registered for a resource type and version pair
    #[must_use]
    pub fn lookup(&self, resource_type: &str, versions: VersionPair) -> Option<&dyn Rule> {
        self.rules
            .get(&versions)?
            .get(resource_type)
            .map(|rule| rule.as_ref())
    }

    /// Distinct rules registered for a version pair, in registration order
    ///
    /// With `types`, only rules registered under at least one of them.
    #[must_use]
    pub fn list_all(&self, versions: VersionPair, types: Option<&[&str]>) -> Vec<&dyn Rule> {
        let Some(by_type) = self.rules.get(&versions) else {
            return Vec::new();
        };
        let mut seen: Vec<&Arc<dyn Rule>> = Vec::new();
        for (resource_type, rule) in by_type {
            if let Some(types) = types {
                if !types.contains(&resource_type.as_str()) {
                    continue;
                }
            }
            if !seen.iter().any(|known| same_rule(known, rule)) {
                seen.push(rule);
            }
        }
        seen.into_iter().map(|rule| rule.as_ref()).collect()
    }

    /// Resource types registered for a version pair, in registration order
    #[must_use]
    pub fn resource_types(&self, versions: VersionPair) -> Vec<&str> {
        self.rules
            .get(&versions)
            .map(|by_type| by_type.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Number of `(type, versions)` registrations
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.values().map(IndexMap::len).sum()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for RuleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleRegistry")
            .field("rules", &Keys(&self.rules))
            .finish()
    }
}

struct Keys<'a>(&'a RuleTable);

impl fmt::Debug for Keys<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut list = f.debug_list();
        for (versions, by_type) in self.0 {
            for (resource_type, rule) in by_type {
                list.entry(&format_args!("{resource_type} {versions} => {}", rule.name()));
            }
        }
        list.finish()
    }
}

// compares data pointers only; vtable pointers may differ across codegen units
fn same_rule(a: &Arc<dyn Rule>, b: &Arc<dyn Rule>) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a).cast::<()>(),
        Arc::as_ptr(b).cast::<()>(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    struct Named {
        name: &'static str,
        types: &'static [&'static str],
        versions: VersionPair,
    }

    impl Rule for Named {
        fn name(&self) -> &str {
            self.name
        }

        fn resource_types(&self) -> &[&str] {
            self.types
        }

        fn versions(&self) -> VersionPair {
            self.versions
        }
    }

    fn rule(name: &'static str, types: &'static [&'static str]) -> Arc<dyn Rule> {
        Arc::new(Named {
            name,
            types,
            versions: VersionPair::new(4, 5),
        })
    }

    #[test]
    fn aliases_resolve_to_one_rule() {
        let mut builder = RuleRegistry::builder();
        builder
            .register_rule(rule("record", &["acme_record", "acme_dns_record_legacy"]))
            .unwrap();
        let registry = builder.build();

        let pair = VersionPair::new(4, 5);
        let a = registry.lookup("acme_record", pair).unwrap();
        let b = registry.lookup("acme_dns_record_legacy", pair).unwrap();
        assert_eq!(a.name(), "record");
        assert_eq!(b.name(), "record");
        assert_eq!(registry.list_all(pair, None).len(), 1);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn lookup_is_version_scoped() {
        let mut builder = RuleRegistry::builder();
        builder.register_rule(rule("zone", &["acme_zone"])).unwrap();
        let registry = builder.build();

        assert!(registry.lookup("acme_zone", VersionPair::new(4, 5)).is_some());
        assert!(registry.lookup("acme_zone", VersionPair::new(5, 6)).is_none());
        assert!(registry.lookup("acme_other", VersionPair::new(4, 5)).is_none());
    }

    #[test]
    fn different_instance_under_same_key_fails() {
        let mut builder = RuleRegistry::builder();
        builder.register_rule(rule("zone", &["acme_zone"])).unwrap();
        let err = builder
            .register_rule(rule("zone-alt", &["acme_zone"]))
            .unwrap_err();
        assert!(matches!(err, RegistryError::Duplicate { .. }));
    }

    #[test]
    fn same_instance_twice_is_a_noop() {
        let shared = rule("zone", &["acme_zone"]);
        let mut builder = RuleRegistry::builder();
        builder.register_rule(Arc::clone(&shared)).unwrap();
        builder
            .register("acme_zone", VersionPair::new(4, 5), shared)
            .unwrap();
        assert_eq!(builder.build().len(), 1);
    }

    #[test]
    fn rule_without_types_is_rejected() {
        let err = RuleRegistry::builder()
            .with_rule(Named {
                name: "empty",
                types: &[],
                versions: VersionPair::new(4, 5),
            })
            .unwrap_err();
        assert_eq!(err, RegistryError::NoResourceTypes("empty".to_string()));
    }

    #[test]
    fn list_all_keeps_registration_order_and_filters() {
        let registry = RuleRegistry::builder()
            .with_rule(Named {
                name: "zone",
                types: &["acme_zone"],
                versions: VersionPair::new(4, 5),
            })
            .unwrap()
            .with_rule(Named {
                name: "record",
                types: &["acme_record"],
                versions: VersionPair::new(4, 5),
            })
            .unwrap()
            .build();

        let pair = VersionPair::new(4, 5);
        let names: Vec<_> = registry.list_all(pair, None).into_iter().map(|r| r.name()).collect();
        assert_eq!(names, vec!["zone", "record"]);

        let filtered: Vec<_> = registry
            .list_all(pair, Some(&["acme_record"]))
            .into_iter()
            .map(|r| r.name())
            .collect();
        assert_eq!(filtered, vec!["record"]);
        assert_eq!(registry.resource_types(pair), vec!["acme_zone", "acme_record"]);
    }
}
