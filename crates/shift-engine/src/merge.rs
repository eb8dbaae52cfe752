//! Cross-resource merge phase
//!
//! Some legacy child resource types only ever described one element of a
//! parent's collection. Before per-instance dispatch, each child instance is
//! folded into the collection of the parent instance it references and the
//! child is removed from the document.
//!
//! The phase is idempotent on two levels: an element already present in the
//! parent's collection is not appended again, and a context flag stops the
//! same spec from running twice in one run.

use serde_json::Value;
use shift_core::MigrationContext;
use shift_state::normalize::{get_at, get_at_mut, set_at};
use shift_state::{PathError, StateDocument, StatePath};

/// Fold `child_type` instances into `parent_type` collections
#[derive(Debug, Clone)]
pub struct MergeSpec {
    pub child_type: String,
    pub parent_type: String,
    /// Path on the child holding the parent's key
    pub parent_ref: String,
    /// Path on the parent matched against the child's `parent_ref`
    pub parent_key: String,
    /// Path on the parent of the collection receiving elements
    pub collection: String,
    /// Builds one collection element from the child's attributes
    pub element: fn(&Value) -> Value,
}

impl MergeSpec {
    /// Spec matching `child.parent_id` against `parent.id`
    #[must_use]
    pub fn new(
        child_type: impl Into<String>,
        parent_type: impl Into<String>,
        collection: impl Into<String>,
        element: fn(&Value) -> Value,
    ) -> Self {
        Self {
            child_type: child_type.into(),
            parent_type: parent_type.into(),
            parent_ref: "parent_id".to_string(),
            parent_key: "id".to_string(),
            collection: collection.into(),
            element,
        }
    }

    #[must_use]
    pub fn with_parent_ref(mut self, parent_ref: impl Into<String>) -> Self {
        self.parent_ref = parent_ref.into();
        self
    }

    #[must_use]
    pub fn with_parent_key(mut self, parent_key: impl Into<String>) -> Self {
        self.parent_key = parent_key.into();
        self
    }

    /// Context flag set once this spec has run
    #[must_use]
    pub fn marker(&self) -> String {
        format!("merged:{}->{}.{}", self.child_type, self.parent_type, self.collection)
    }
}

/// Counters of one merge phase
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    /// Elements appended to a parent collection
    pub folded: usize,
    /// Children whose element was already in the parent collection
    pub already_present: usize,
    /// Children kept because no parent matched
    pub orphans: usize,
    /// Child resource entries removed from the document
    pub removed_resources: usize,
}

impl std::ops::AddAssign for MergeStats {
    fn add_assign(&mut self, other: Self) {
        self.folded += other.folded;
        self.already_present += other.already_present;
        self.orphans += other.orphans;
        self.removed_resources += other.removed_resources;
    }
}

struct Child {
    resource: usize,
    instance: usize,
    module: Option<String>,
    key: Value,
    element: Value,
    address: String,
}

struct Paths {
    parent_ref: StatePath,
    parent_key: StatePath,
    collection: StatePath,
}

impl Paths {
    fn parse(spec: &MergeSpec) -> Result<Self, PathError> {
        Ok(Self {
            parent_ref: spec.parent_ref.parse()?,
            parent_key: spec.parent_key.parse()?,
            collection: spec.collection.parse()?,
        })
    }
}

/// Run one merge spec over a document
pub fn apply_merge(doc: &mut StateDocument, spec: &MergeSpec, ctx: &mut MigrationContext) -> MergeStats {
    let mut stats = MergeStats::default();
    let marker = spec.marker();
    if ctx.is_marked(&marker) {
        return stats;
    }
    let paths = match Paths::parse(spec) {
        Ok(paths) => paths,
        Err(err) => {
            ctx.error_at(&spec.child_type, "invalid merge specification", err.to_string());
            return stats;
        }
    };

    let children = collect_children(doc, spec, &paths, ctx, &mut stats);
    let mut merged: Vec<(usize, usize)> = Vec::new();

    for child in children {
        let Some((resource, instance)) = find_parent(doc, spec, &paths, &child) else {
            stats.orphans += 1;
            ctx.warn_at(
                child.address,
                "child resource has no matching parent",
                format!(
                    "no {} with `{}` = {}; kept as is",
                    spec.parent_type, spec.parent_key, child.key
                ),
            );
            continue;
        };
        let attributes = &mut doc.resources[resource].instances[instance].attributes;
        match get_at_mut(attributes, &paths.collection) {
            Some(Value::Array(items)) => {
                if items.contains(&child.element) {
                    stats.already_present += 1;
                } else {
                    items.push(child.element);
                    stats.folded += 1;
                }
            }
            None | Some(Value::Null) => {
                if let Err(err) = set_at(attributes, &paths.collection, Value::Array(vec![child.element])) {
                    ctx.warn_at(child.address, "child resource not merged", err.to_string());
                    continue;
                }
                stats.folded += 1;
            }
            Some(_) => {
                ctx.warn_at(
                    child.address,
                    "child resource not merged",
                    format!("`{}` of the parent is not a list", spec.collection),
                );
                continue;
            }
        }
        merged.push((child.resource, child.instance));
    }

    stats.removed_resources = remove_children(doc, &merged);
    ctx.mark(marker);
    tracing::debug!(
        child = %spec.child_type,
        parent = %spec.parent_type,
        folded = stats.folded,
        orphans = stats.orphans,
        "merged child resources"
    );
    stats
}

fn collect_children(
    doc: &StateDocument,
    spec: &MergeSpec,
    paths: &Paths,
    ctx: &mut MigrationContext,
    stats: &mut MergeStats,
) -> Vec<Child> {
    let mut children = Vec::new();
    for (ri, resource) in doc.resources.iter().enumerate() {
        if resource.resource_type != spec.child_type || resource.is_data() {
            continue;
        }
        for (ii, instance) in resource.instances.iter().enumerate() {
            let address = format!("{}{}", resource.address(), instance.key_suffix());
            match get_at(&instance.attributes, &paths.parent_ref) {
                Some(key) if !key.is_null() => children.push(Child {
                    resource: ri,
                    instance: ii,
                    module: resource.module.clone(),
                    key: key.clone(),
                    element: (spec.element)(&instance.attributes),
                    address,
                }),
                _ => {
                    stats.orphans += 1;
                    ctx.warn_at(
                        address,
                        "child resource has no matching parent",
                        format!("`{}` is not set; kept as is", spec.parent_ref),
                    );
                }
            }
        }
    }
    children
}

fn find_parent(doc: &StateDocument, spec: &MergeSpec, paths: &Paths, child: &Child) -> Option<(usize, usize)> {
    doc.resources
        .iter()
        .enumerate()
        .filter(|(_, r)| r.resource_type == spec.parent_type && !r.is_data() && r.module == child.module)
        .find_map(|(ri, r)| {
            r.instances
                .iter()
                .position(|i| get_at(&i.attributes, &paths.parent_key) == Some(&child.key))
                .map(|ii| (ri, ii))
        })
}

fn remove_children(doc: &mut StateDocument, merged: &[(usize, usize)]) -> usize {
    if merged.is_empty() {
        return 0;
    }
    let mut emptied = Vec::new();
    for (ri, resource) in doc.resources.iter_mut().enumerate() {
        let before = resource.instances.len();
        let mut ii = 0;
        resource.instances.retain(|_| {
            let keep = !merged.contains(&(ri, ii));
            ii += 1;
            keep
        });
        if before > 0 && resource.instances.is_empty() {
            emptied.push(ri);
        }
    }
    let mut ri = 0;
    doc.resources.retain(|_| {
        let keep = !emptied.contains(&ri);
        ri += 1;
        keep
    });
    emptied.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use shift_core::VersionPair;

    fn element(attributes: &Value) -> Value {
        json!({ "value": attributes["value"] })
    }

    fn spec() -> MergeSpec {
        MergeSpec::new("acme_list_item", "acme_list", "items", element)
    }

    fn doc() -> StateDocument {
        StateDocument::from_json(
            r#"{
  "version": 4,
  "resources": [
    {"mode": "managed", "type": "acme_list", "name": "l",
     "instances": [{"schema_version": 1, "attributes": {"id": "L1"}}]},
    {"mode": "managed", "type": "acme_list_item", "name": "a",
     "instances": [{"schema_version": 0, "attributes": {"parent_id": "L1", "value": "a"}}]},
    {"mode": "managed", "type": "acme_list_item", "name": "b",
     "instances": [{"schema_version": 0, "attributes": {"parent_id": "L1", "value": "b"}}]}
  ]
}"#,
        )
        .unwrap()
    }

    fn ctx() -> MigrationContext {
        MigrationContext::new(VersionPair::new(4, 5))
    }

    #[test]
    fn folds_children_in_order_and_removes_them() {
        let mut doc = doc();
        let mut ctx = ctx();
        let stats = apply_merge(&mut doc, &spec(), &mut ctx);

        assert_eq!(stats.folded, 2);
        assert_eq!(stats.removed_resources, 2);
        assert_eq!(doc.resources.len(), 1);
        assert_eq!(
            doc.resources[0].instances[0].attributes,
            json!({"id": "L1", "items": [{"value": "a"}, {"value": "b"}]})
        );
        assert!(ctx.is_marked(&spec().marker()));
    }

    #[test]
    fn rerun_does_not_duplicate() {
        let mut once = doc();
        apply_merge(&mut once, &spec(), &mut ctx());

        let mut twice = once.clone();
        let stats = apply_merge(&mut twice, &spec(), &mut ctx());
        assert_eq!(stats, MergeStats::default());
        assert_eq!(twice, once);
    }

    #[test]
    fn already_folded_element_is_not_appended() {
        let mut doc = doc();
        doc.resources[0].instances[0].attributes = json!({"id": "L1", "items": [{"value": "a"}]});
        let stats = apply_merge(&mut doc, &spec(), &mut ctx());

        assert_eq!(stats.already_present, 1);
        assert_eq!(stats.folded, 1);
        assert_eq!(
            doc.resources[0].instances[0].attributes["items"],
            json!([{"value": "a"}, {"value": "b"}])
        );
    }

    #[test]
    fn orphan_is_kept_with_warning() {
        let mut doc = doc();
        doc.resources[2].instances[0].attributes["parent_id"] = json!("missing");
        let mut ctx = ctx();
        let stats = apply_merge(&mut doc, &spec(), &mut ctx);

        assert_eq!(stats.orphans, 1);
        assert_eq!(doc.resources.len(), 2);
        assert_eq!(doc.resources[1].name, "b");
        assert!(ctx.diagnostics().contains_summary("child resource has no matching parent"));
    }

    #[test]
    fn marked_context_skips() {
        let mut doc = doc();
        let mut ctx = ctx();
        ctx.mark(spec().marker());
        let before = doc.clone();
        apply_merge(&mut doc, &spec(), &mut ctx);
        assert_eq!(doc, before);
    }
}
