//! Sample rules for a fictional `acme` provider, v4 to v5
//!
//! Each rule is a thin composition of toolkit primitives, the way real
//! per-resource rules are written.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};
use shift_core::{AttributeRename, MigrationContext, VersionPair};
use shift_engine::{MergeSpec, Rule, RuleError, TransformResult};
use shift_hcl::{toolkit, Block, BlockExt};
use shift_state::normalize::{self, EmptyPolicy};
use shift_state::{coerce, DurationUnit, HashMix, StateInstance};

/// Version pair of every sample rule
pub const VERSIONS: VersionPair = VersionPair::new(4, 5);

fn instance_address(resource_type: &str, instance: &StateInstance) -> String {
    match instance.attributes.get("id").and_then(Value::as_str) {
        Some(id) => format!("{resource_type}[{id}]"),
        None => resource_type.to_string(),
    }
}

/// `acme_widget`: singleton `foo`, repeated `item`, dropped `legacy_mode`
#[derive(Debug, Default)]
pub struct WidgetRule;

impl Rule for WidgetRule {
    fn name(&self) -> &str {
        "acme_widget"
    }

    fn resource_types(&self) -> &[&str] {
        &["acme_widget"]
    }

    fn versions(&self) -> VersionPair {
        VERSIONS
    }

    fn transform_config(
        &self,
        block: &mut Block,
        ctx: &mut MigrationContext,
    ) -> Result<TransformResult, RuleError> {
        let address = block.address();
        toolkit::convert_block_or_comment(&mut block.body, "foo", "foo", ctx, &address);
        toolkit::convert_repeated_or_comment(&mut block.body, "item", "items", false, ctx, &address);
        toolkit::remove_dropped_attribute(&mut block.body, "legacy_mode", ctx, &address);
        Ok(TransformResult::in_place())
    }

    fn transform_state(
        &self,
        instance: &mut StateInstance,
        ctx: &mut MigrationContext,
    ) -> Result<(), RuleError> {
        let address = instance_address("acme_widget", instance);
        let attributes = &mut instance.attributes;
        coerce::to_bool(attributes, "enabled")?.report(ctx, &address, "enabled");
        normalize::unwrap_singleton(attributes, "shield", EmptyPolicy::Null)?;
        normalize::unwrap_singleton(attributes, "foo", EmptyPolicy::Null)?;
        normalize::rename(attributes, "item", "items")?;
        if normalize::remove(attributes, "legacy_mode")?.is_some() {
            ctx.warn_at(&address, "attribute dropped", "`legacy_mode` has no equivalent in schema v5");
        }
        Ok(())
    }
}

/// `data.acme_zones`: `zones` is renamed to `result`
#[derive(Debug, Default)]
pub struct ZonesRule;

impl Rule for ZonesRule {
    fn name(&self) -> &str {
        "acme_zones"
    }

    fn resource_types(&self) -> &[&str] {
        &["acme_zones"]
    }

    fn versions(&self) -> VersionPair {
        VERSIONS
    }

    fn transform_state(
        &self,
        instance: &mut StateInstance,
        _ctx: &mut MigrationContext,
    ) -> Result<(), RuleError> {
        normalize::rename(&mut instance.attributes, "zones", "result")?;
        Ok(())
    }

    fn attribute_renames(&self) -> Vec<AttributeRename> {
        vec![AttributeRename::new("acme_zones", "zones", "result")]
    }
}

/// `acme_record` becomes `acme_dns_record`; state is upgraded elsewhere
#[derive(Debug, Default)]
pub struct RecordRule;

impl Rule for RecordRule {
    fn name(&self) -> &str {
        "acme_dns_record"
    }

    fn resource_types(&self) -> &[&str] {
        &["acme_record", "acme_dns_record"]
    }

    fn versions(&self) -> VersionPair {
        VERSIONS
    }

    fn transform_config(
        &self,
        block: &mut Block,
        _ctx: &mut MigrationContext,
    ) -> Result<TransformResult, RuleError> {
        toolkit::rename_attribute(&mut block.body, "value", "content");
        Ok(TransformResult::in_place())
    }

    fn renamed_type(&self, resource_type: &str) -> Option<String> {
        (resource_type == "acme_record").then(|| "acme_dns_record".to_string())
    }

    fn state_upgrade_deferred(&self) -> bool {
        true
    }
}

fn list_item_element(attributes: &Value) -> Value {
    json!({ "value": attributes.get("value").cloned().unwrap_or(Value::Null) })
}

/// `acme_list` absorbs the legacy `acme_list_item` resources
#[derive(Debug, Default)]
pub struct ListRule;

impl Rule for ListRule {
    fn name(&self) -> &str {
        "acme_list"
    }

    fn resource_types(&self) -> &[&str] {
        &["acme_list"]
    }

    fn versions(&self) -> VersionPair {
        VERSIONS
    }

    fn target_schema_version(&self, _resource_type: &str) -> u64 {
        1
    }

    fn state_merges(&self) -> Vec<MergeSpec> {
        vec![MergeSpec::new("acme_list_item", "acme_list", "items", list_item_element)
            .with_parent_ref("list_id")]
    }
}

/// `acme_firewall_rule`: legacy `priority` was mixed with a hash of
/// `description`
#[derive(Debug, Default)]
pub struct FirewallRule;

impl Rule for FirewallRule {
    fn name(&self) -> &str {
        "acme_firewall_rule"
    }

    fn resource_types(&self) -> &[&str] {
        &["acme_firewall_rule"]
    }

    fn versions(&self) -> VersionPair {
        VERSIONS
    }

    fn transform_state(
        &self,
        instance: &mut StateInstance,
        ctx: &mut MigrationContext,
    ) -> Result<(), RuleError> {
        if instance.schema_version >= self.target_schema_version("acme_firewall_rule") {
            return Ok(());
        }
        let address = instance_address("acme_firewall_rule", instance);
        let Some(stored) = instance.attributes.get("priority").and_then(Value::as_i64) else {
            return Ok(());
        };
        let description = instance
            .attributes
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let reversal = HashMix::default()
            .with_width(ctx.hash_width())
            .reverse(stored, &description);
        reversal.report(ctx, &address, "priority");
        normalize::set(&mut instance.attributes, "priority", json!(reversal.value()))?;
        Ok(())
    }

    fn target_schema_version(&self, _resource_type: &str) -> u64 {
        1
    }
}

static CACHE_BLOCK: Lazy<Result<Regex, regex::Error>> =
    Lazy::new(|| Regex::new(r#"(?ms)^resource\s+"acme_cache"\s+"[^"]*"\s*\{.*?^\}"#));
static TTL_SECONDS: Lazy<Result<Regex, regex::Error>> = Lazy::new(|| Regex::new(r"(?m)^(\s*)ttl_seconds(\s*=)"));

fn compiled(pattern: &'static Lazy<Result<Regex, regex::Error>>) -> Result<&'static Regex, RuleError> {
    pattern.as_ref().map_err(|err| RuleError::failed(format!("invalid pattern: {err}")))
}

/// `acme_cache`: `ttl_seconds` becomes `ttl`, rewritten on the raw text
#[derive(Debug, Default)]
pub struct CacheRule;

impl Rule for CacheRule {
    fn name(&self) -> &str {
        "acme_cache"
    }

    fn resource_types(&self) -> &[&str] {
        &["acme_cache"]
    }

    fn versions(&self) -> VersionPair {
        VERSIONS
    }

    fn preprocess(&self, source: &str, _ctx: &mut MigrationContext) -> Result<Option<String>, RuleError> {
        let (block, ttl) = (compiled(&CACHE_BLOCK)?, compiled(&TTL_SECONDS)?);
        if !block.is_match(source) {
            return Ok(None);
        }
        let rewritten = block.replace_all(source, |caps: &regex::Captures<'_>| {
            ttl.replace_all(&caps[0], "${1}ttl${2}").into_owned()
        });
        Ok(Some(rewritten.into_owned()))
    }

    fn transform_state(
        &self,
        instance: &mut StateInstance,
        ctx: &mut MigrationContext,
    ) -> Result<(), RuleError> {
        let address = instance_address("acme_cache", instance);
        normalize::rename(&mut instance.attributes, "ttl_seconds", "ttl")?;
        coerce::to_duration(&mut instance.attributes, "ttl", DurationUnit::Seconds)?
            .report(ctx, &address, "ttl");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn cache_patterns_compile() {
        assert!(compiled(&CACHE_BLOCK).is_ok());
        assert!(compiled(&TTL_SECONDS).is_ok());
    }

    #[test]
    fn cache_preprocess_only_touches_cache_blocks() {
        let mut ctx = MigrationContext::new(VERSIONS);
        let src = "resource \"acme_cache\" \"c\" {\n  ttl_seconds = 60\n}\n\nresource \"other\" \"o\" {\n  ttl_seconds = 5\n}\n";
        assert_eq!(
            CacheRule.preprocess(src, &mut ctx).unwrap().as_deref(),
            Some("resource \"acme_cache\" \"c\" {\n  ttl = 60\n}\n\nresource \"other\" \"o\" {\n  ttl_seconds = 5\n}\n")
        );
        assert_eq!(CacheRule.preprocess("locals {}\n", &mut ctx).unwrap(), None);
    }
}
