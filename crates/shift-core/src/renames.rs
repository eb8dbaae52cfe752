//! Attribute rename and resource move directives
//!
//! A rule that renames an attribute on its own resource type cannot see the
//! other files of a project that reference it. It reports the rename as an
//! [`AttributeRename`], and a block whose type changes is reported as a
//! [`ResourceMove`]; the pipeline collects both into a [`RenameTable`] and
//! applies them in a separate pass once every file has been dispatched.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::RenameConflict;

/// `(resource_type, old_attribute) -> new_attribute`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttributeRename {
    pub resource_type: String,
    pub old_attribute: String,
    pub new_attribute: String,
}

impl AttributeRename {
    #[inline]
    #[must_use]
    pub fn new(
        resource_type: impl Into<String>,
        old_attribute: impl Into<String>,
        new_attribute: impl Into<String>,
    ) -> Self {
        Self {
            resource_type: resource_type.into(),
            old_attribute: old_attribute.into(),
            new_attribute: new_attribute.into(),
        }
    }
}

/// `<old_type>.<name>` now declared as `<new_type>.<name>`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceMove {
    /// Whether the block is a `data` source
    pub data: bool,
    pub old_type: String,
    pub name: String,
    pub new_type: String,
}

impl ResourceMove {
    /// Move of a managed resource
    #[inline]
    #[must_use]
    pub fn managed(old_type: impl Into<String>, name: impl Into<String>, new_type: impl Into<String>) -> Self {
        Self {
            data: false,
            old_type: old_type.into(),
            name: name.into(),
            new_type: new_type.into(),
        }
    }

    /// Move of a data source
    #[inline]
    #[must_use]
    pub fn data(old_type: impl Into<String>, name: impl Into<String>, new_type: impl Into<String>) -> Self {
        Self {
            data: true,
            ..Self::managed(old_type, name, new_type)
        }
    }
}

/// Ordered table of attribute renames and resource moves
///
/// Iteration order is first-recorded order, so rewrites are deterministic
/// regardless of how many times a rule was invoked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenameTable {
    entries: IndexMap<(String, String), String>,
    moves: IndexMap<(bool, String, String), String>,
}

impl RenameTable {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of attribute renames and resource moves
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len() + self.moves.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.moves.is_empty()
    }

    /// Record a rename
    ///
    /// Returns `Ok(true)` when the entry is new and `Ok(false)` when the same
    /// rename was already present.
    ///
    /// # Errors
    /// Returns [`RenameConflict`] if the attribute is already mapped to a
    /// different name. The existing mapping is kept.
    pub fn record(&mut self, rename: AttributeRename) -> Result<bool, RenameConflict> {
        let key = (rename.resource_type, rename.old_attribute);
        match self.entries.get(&key) {
            Some(existing) if *existing == rename.new_attribute => Ok(false),
            Some(existing) => Err(RenameConflict {
                resource_type: key.0,
                old_attribute: key.1,
                existing: existing.clone(),
                incoming: rename.new_attribute,
            }),
            None => {
                self.entries.insert(key, rename.new_attribute);
                Ok(true)
            }
        }
    }

    /// Look up the new name of an attribute
    #[must_use]
    pub fn get(&self, resource_type: &str, old_attribute: &str) -> Option<&str> {
        self.entries
            .get(&(resource_type.to_string(), old_attribute.to_string()))
            .map(String::as_str)
    }

    /// Iterate `(resource_type, old_attribute, new_attribute)` in record order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, &str)> {
        self.entries
            .iter()
            .map(|((ty, old), new)| (ty.as_str(), old.as_str(), new.as_str()))
    }

    /// Record a resource move
    ///
    /// Returns `Ok(true)` when the entry is new and `Ok(false)` when the same
    /// move was already present.
    ///
    /// # Errors
    /// Returns [`RenameConflict`] if the block already moved to a different
    /// type. The existing mapping is kept.
    pub fn record_move(&mut self, mv: ResourceMove) -> Result<bool, RenameConflict> {
        let key = (mv.data, mv.old_type, mv.name);
        match self.moves.get(&key) {
            Some(existing) if *existing == mv.new_type => Ok(false),
            Some(existing) => Err(RenameConflict {
                resource_type: if key.0 { format!("data.{}", key.1) } else { key.1 },
                old_attribute: key.2,
                existing: existing.clone(),
                incoming: mv.new_type,
            }),
            None => {
                self.moves.insert(key, mv.new_type);
                Ok(true)
            }
        }
    }

    /// New type of a moved block
    #[must_use]
    pub fn moved_to(&self, data: bool, old_type: &str, name: &str) -> Option<&str> {
        self.moves
            .get(&(data, old_type.to_string(), name.to_string()))
            .map(String::as_str)
    }

    /// Iterate resource moves in record order
    pub fn moves(&self) -> impl Iterator<Item = ResourceMove> + '_ {
        self.moves.iter().map(|((data, old_type, name), new_type)| ResourceMove {
            data: *data,
            old_type: old_type.clone(),
            name: name.clone(),
            new_type: new_type.clone(),
        })
    }

    /// Merge another table into this one, returning conflicts
    pub fn merge(&mut self, other: &RenameTable) -> Vec<RenameConflict> {
        let mut conflicts = Vec::new();
        for (ty, old, new) in other.iter() {
            if let Err(conflict) = self.record(AttributeRename::new(ty, old, new)) {
                conflicts.push(conflict);
            }
        }
        for mv in other.moves() {
            if let Err(conflict) = self.record_move(mv) {
                conflicts.push(conflict);
            }
        }
        conflicts
    }
}

impl FromIterator<AttributeRename> for RenameTable {
    fn from_iter<I: IntoIterator<Item = AttributeRename>>(iter: I) -> Self {
        let mut table = Self::new();
        for rename in iter {
            // first mapping wins
            let _ = table.record(rename);
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_and_lookup() {
        let mut table = RenameTable::new();
        assert_eq!(
            table.record(AttributeRename::new("acme_zones", "zones", "result")),
            Ok(true)
        );
        assert_eq!(table.get("acme_zones", "zones"), Some("result"));
        assert_eq!(table.get("acme_zones", "other"), None);
    }

    #[test]
    fn duplicate_is_not_a_conflict() {
        let mut table = RenameTable::new();
        table
            .record(AttributeRename::new("acme_zones", "zones", "result"))
            .unwrap();
        assert_eq!(
            table.record(AttributeRename::new("acme_zones", "zones", "result")),
            Ok(false)
        );
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn conflicting_rename_keeps_first() {
        let mut table = RenameTable::new();
        table
            .record(AttributeRename::new("acme_zones", "zones", "result"))
            .unwrap();
        let err = table
            .record(AttributeRename::new("acme_zones", "zones", "items"))
            .unwrap_err();
        assert_eq!(err.existing, "result");
        assert_eq!(table.get("acme_zones", "zones"), Some("result"));
    }

    #[test]
    fn merge_preserves_order_and_reports_conflicts() {
        let mut a: RenameTable = [AttributeRename::new("t1", "a", "b")].into_iter().collect();
        let b: RenameTable = [
            AttributeRename::new("t2", "x", "y"),
            AttributeRename::new("t1", "a", "c"),
        ]
        .into_iter()
        .collect();

        let conflicts = a.merge(&b);
        assert_eq!(conflicts.len(), 1);
        let order: Vec<_> = a.iter().map(|(t, _, _)| t).collect();
        assert_eq!(order, vec!["t1", "t2"]);
    }

    #[test]
    fn moves_are_keyed_by_mode_and_merged() {
        let mut a = RenameTable::new();
        assert_eq!(a.record_move(ResourceMove::managed("acme_old", "a", "acme_new")), Ok(true));
        assert_eq!(a.record_move(ResourceMove::managed("acme_old", "a", "acme_new")), Ok(false));
        assert_eq!(a.moved_to(false, "acme_old", "a"), Some("acme_new"));
        assert_eq!(a.moved_to(true, "acme_old", "a"), None);

        let mut b = RenameTable::new();
        b.record_move(ResourceMove::managed("acme_old", "a", "acme_other")).unwrap();
        b.record_move(ResourceMove::data("acme_old", "a", "acme_new")).unwrap();
        let conflicts = a.merge(&b);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].to_string(), "conflicting rename for acme_old.a: 'acme_new' vs 'acme_other'");
        assert_eq!(a.moved_to(true, "acme_old", "a"), Some("acme_new"));
        assert_eq!(a.len(), 2);
        assert!(!a.is_empty());
    }
}
