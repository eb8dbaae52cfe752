//! End-to-end migrations with the sample `acme` rules

use pretty_assertions::assert_eq;
use serde_json::json;
use shift_core::HashWidth;
use shift_engine::{migrate_project, SourceFile};
use shift_state::HashMix;
use shift_test_utils::{
    data, managed, migrate_config_text, migrate_config_with, migrate_state_text, migrate_state_with,
    sample_registry, settings, state_document,
};

#[test]
fn singleton_block_becomes_object_attribute() {
    let src = r#"resource "acme_widget" "w" {
  name = "w"

  foo {
    bar = 1
  }
}
"#;
    let outcome = migrate_config_text(src);
    assert_eq!(
        outcome.output,
        r#"resource "acme_widget" "w" {
  name = "w"

  foo = {
    bar = 1
  }
}
"#
    );
    assert_eq!(outcome.stats.blocks_migrated, 1);

    let again = migrate_config_text(&outcome.output);
    assert_eq!(again.output, outcome.output);
    assert!(!again.changed());
}

#[test]
fn repeated_blocks_become_ordered_list() {
    let src = r#"resource "acme_widget" "w" {
  item {
    v = "a"
  }
  item {
    v = "b"
  }
}
"#;
    let outcome = migrate_config_text(src);
    assert_eq!(
        outcome.output,
        r#"resource "acme_widget" "w" {
  items = [
    {
      v = "a"
    },
    {
      v = "b"
    },
  ]
}
"#
    );
    assert_eq!(migrate_config_text(&outcome.output).output, outcome.output);
}

#[test]
fn dynamic_block_becomes_comprehension() {
    let src = r#"resource "acme_widget" "w" {
  dynamic "item" {
    for_each = var.xs
    content {
      v = item.value
    }
  }
}
"#;
    let outcome = migrate_config_text(src);
    assert_eq!(
        outcome.output,
        r#"resource "acme_widget" "w" {
  items = [for item in var.xs : { v = item }]
}
"#
    );
    assert!(outcome.diagnostics.is_empty());
}

#[test]
fn unreducible_dynamic_block_leaves_comment_once() {
    let src = r#"resource "acme_widget" "w" {
  dynamic "item" {
    for_each = var.xs
    content {
      dynamic "inner" {
        for_each = item.value
        content {
          x = inner.value
        }
      }
    }
  }
}
"#;
    let outcome = migrate_config_text(src);
    assert!(outcome
        .output
        .contains("# shift: convert dynamic \"item\" to `items` by hand"));
    assert!(outcome.output.contains("dynamic \"inner\""));
    assert!(outcome.diagnostics.contains_summary("dynamic block kept unconverted"));

    let again = migrate_config_text(&outcome.output);
    assert_eq!(again.output, outcome.output);
}

#[test]
fn dropped_attribute_is_reported() {
    let src = "resource \"acme_widget\" \"w\" {\n  legacy_mode = true\n  name        = \"w\"\n}\n";
    let outcome = migrate_config_text(src);
    assert_eq!(outcome.output, "resource \"acme_widget\" \"w\" {\n  name        = \"w\"\n}\n");
    let warning = &outcome.diagnostics.as_slice()[0];
    assert_eq!(warning.summary, "attribute dropped");
    assert_eq!(warning.address.as_deref(), Some("acme_widget.w"));
    assert_eq!(warning.file.as_deref(), Some("main.tf"));
}

#[test]
fn widget_state_instance_is_normalized() {
    let src = state_document(json!([managed(
        "acme_widget",
        "w",
        1,
        json!({"id": "w1", "enabled": true, "shield": [{"x": 1}]})
    )]));
    let outcome = migrate_state_text(&src);
    let instance = &outcome.document.resources[0].instances[0];
    assert_eq!(instance.attributes, json!({"id": "w1", "enabled": true, "shield": {"x": 1}}));
    assert_eq!(instance.schema_version, 0);
    assert!(outcome.diagnostics.is_empty());

    let again = migrate_state_text(&outcome.output);
    assert_eq!(again.output, outcome.output);
}

#[test]
fn data_source_rename_reaches_references_in_other_files() {
    let files = vec![
        SourceFile::new("zones.tf", "data \"acme_zones\" \"all\" {\n  account = var.account\n}\n"),
        SourceFile::new(
            "outputs.tf",
            "output \"zone_ids\" {\n  value = [for z in data.acme_zones.all.zones : z.id]\n}\n",
        ),
    ];
    let outcome = migrate_project(&sample_registry(), &settings(), &files).unwrap();
    assert_eq!(
        outcome.output("outputs.tf"),
        Some("output \"zone_ids\" {\n  value = [for z in data.acme_zones.all.result : z.id]\n}\n")
    );
    assert_eq!(outcome.output("zones.tf"), Some(files[0].text.as_str()));
    assert!(outcome.failures.is_empty());

    let state = state_document(json!([data("acme_zones", "all", json!({"zones": [{"id": "z1"}]}))]));
    let migrated = migrate_state_text(&state);
    assert_eq!(
        migrated.document.resources[0].instances[0].attributes,
        json!({"result": [{"id": "z1"}]})
    );
}

#[test]
fn resource_type_rename_emits_moved_marker_and_defers_state() {
    let src = "resource \"acme_record\" \"www\" {\n  zone  = \"z1\"\n  value = \"192.0.2.1\"\n}\n";
    let outcome = migrate_config_text(src);
    assert_eq!(
        outcome.output,
        "resource \"acme_dns_record\" \"www\" {\n  zone  = \"z1\"\n  content = \"192.0.2.1\"\n}\n\nmoved {\n  from = acme_record.www\n  to = acme_dns_record.www\n}\n"
    );
    assert_eq!(migrate_config_text(&outcome.output).output, outcome.output);

    let state = state_document(json!([managed("acme_record", "www", 2, json!({"value": "192.0.2.1"}))]));
    let migrated = migrate_state_text(&state);
    let resource = &migrated.document.resources[0];
    assert_eq!(resource.resource_type, "acme_record");
    assert_eq!(resource.instances[0].schema_version, 2);
    assert_eq!(migrated.stats.instances_deferred, 1);
}

#[test]
fn preprocessing_rewrites_raw_text_of_matching_blocks() {
    let src = "resource \"acme_cache\" \"c\" {\n  ttl_seconds = \"1h30m\"\n}\n\nlocals {\n  ttl_seconds = 5\n}\n";
    let outcome = migrate_config_text(src);
    assert_eq!(
        outcome.output,
        "resource \"acme_cache\" \"c\" {\n  ttl = \"1h30m\"\n}\n\nlocals {\n  ttl_seconds = 5\n}\n"
    );
    assert_eq!(outcome.stats.preprocessed, 1);
    assert_eq!(migrate_config_text(&outcome.output).stats.preprocessed, 0);

    let state = state_document(json!([managed("acme_cache", "c", 0, json!({"ttl_seconds": "1h30m"}))]));
    let migrated = migrate_state_text(&state);
    assert_eq!(migrated.document.resources[0].instances[0].attributes, json!({"ttl": 5400}));
}

#[test]
fn invalid_duration_is_kept_with_warning() {
    let state = state_document(json!([managed("acme_cache", "c", 0, json!({"id": "c1", "ttl_seconds": "soon"}))]));
    let migrated = migrate_state_text(&state);
    assert_eq!(migrated.document.resources[0].instances[0].attributes["ttl"], json!("soon"));
    let warning = &migrated.diagnostics.as_slice()[0];
    assert_eq!(warning.summary, "value not converted");
    assert_eq!(warning.address.as_deref(), Some("acme_cache[c1]"));
}

#[test]
fn list_items_are_merged_into_parent() {
    let state = state_document(json!([
        managed("acme_list", "l", 0, json!({"id": "L1", "items": null})),
        managed("acme_list_item", "one", 0, json!({"list_id": "L1", "value": "10.0.0.1"})),
        managed("acme_list_item", "two", 0, json!({"list_id": "L1", "value": "10.0.0.2"})),
    ]));
    let migrated = migrate_state_text(&state);
    let resources = &migrated.document.resources;
    assert_eq!(resources.len(), 1);
    assert_eq!(
        resources[0].instances[0].attributes,
        json!({"id": "L1", "items": [{"value": "10.0.0.1"}, {"value": "10.0.0.2"}]})
    );
    assert_eq!(resources[0].instances[0].schema_version, 1);
    assert_eq!(migrated.stats.merge.folded, 2);

    let again = migrate_state_text(&migrated.output);
    assert_eq!(again.output, migrated.output);
}

#[test]
fn hash_mixed_priority_is_recovered() {
    let stored = HashMix::default().mix(7, "allow ssh").unwrap();
    let state = state_document(json!([managed(
        "acme_firewall_rule",
        "ssh",
        0,
        json!({"id": "r1", "description": "allow ssh", "priority": stored})
    )]));
    let migrated = migrate_state_text(&state);
    let instance = &migrated.document.resources[0].instances[0];
    assert_eq!(instance.attributes["priority"], json!(7));
    assert_eq!(instance.schema_version, 1);
    assert!(migrated.diagnostics.is_empty());

    let again = migrate_state_text(&migrated.output);
    assert_eq!(again.output, migrated.output);
}

#[test]
fn hash_width_follows_settings() {
    let width = HashWidth::Bits32;
    let stored = HashMix::default().with_width(width).mix(3, "deny all").unwrap();
    let state = state_document(json!([managed(
        "acme_firewall_rule",
        "deny",
        0,
        json!({"id": "r2", "description": "deny all", "priority": stored})
    )]));
    let migrated = migrate_state_with(&settings().with_hash_width(width), &state);
    assert_eq!(migrated.document.resources[0].instances[0].attributes["priority"], json!(3));
}

#[test]
fn inconsistent_priority_falls_back_with_warning() {
    let salt = HashMix::default().mix(0, "allow ssh").unwrap();
    let stored = 7 * 1000 + (salt + 1) % 1000;
    let state = state_document(json!([managed(
        "acme_firewall_rule",
        "ssh",
        0,
        json!({"id": "r1", "description": "allow ssh", "priority": stored})
    )]));
    let migrated = migrate_state_text(&state);
    assert_eq!(migrated.document.resources[0].instances[0].attributes["priority"], json!(7));
    assert!(migrated.diagnostics.contains_summary("value not recoverable"));
}

#[test]
fn allowlist_limits_both_pipelines() {
    let settings = settings().with_resources(["acme_cache"]);
    let src = "resource \"acme_widget\" \"w\" {\n  foo {\n    bar = 1\n  }\n}\n";
    assert_eq!(migrate_config_with(&settings, src).output, src);

    let state = state_document(json!([managed("acme_widget", "w", 1, json!({"shield": [{"x": 1}]}))]));
    let migrated = migrate_state_with(&settings, &state);
    let instance = &migrated.document.resources[0].instances[0];
    assert_eq!(instance.attributes, json!({"shield": [{"x": 1}]}));
    assert_eq!(instance.schema_version, 1);
}

#[test]
fn untouched_state_fields_survive() {
    let mut entry = managed("acme_plain", "p", 3, json!({"k": "v"}));
    entry["instances"][0]["private"] = json!("bm9wZQ==");
    entry["instances"][0]["dependencies"] = json!(["acme_widget.w"]);
    let state = state_document(json!([entry]));

    let migrated = migrate_state_text(&state);
    let before: serde_json::Value = serde_json::from_str(&state).unwrap();
    let after: serde_json::Value = serde_json::from_str(&migrated.output).unwrap();
    assert_eq!(after, before);
}

#[test]
fn renamed_resource_type_is_followed_by_references_in_other_files() {
    let files = vec![
        SourceFile::new("dns.tf", "resource \"acme_record\" \"www\" {\n  value = \"192.0.2.1\"\n}\n"),
        SourceFile::new(
            "outputs.tf",
            "output \"record\" {\n  value = acme_record.www.id # address\n}\n\noutput \"other\" {\n  value = acme_record.api.id\n}\n",
        ),
    ];
    let outcome = migrate_project(&sample_registry(), &settings(), &files).unwrap();
    assert_eq!(
        outcome.output("dns.tf"),
        Some("resource \"acme_dns_record\" \"www\" {\n  content = \"192.0.2.1\"\n}\n\nmoved {\n  from = acme_record.www\n  to = acme_dns_record.www\n}\n")
    );
    assert_eq!(
        outcome.output("outputs.tf"),
        Some("output \"record\" {\n  value = acme_dns_record.www.id # address\n}\n\noutput \"other\" {\n  value = acme_record.api.id\n}\n")
    );
    assert_eq!(outcome.renames.moved_to(false, "acme_record", "www"), Some("acme_dns_record"));
}

#[test]
fn crlf_configuration_is_migrated_in_place() {
    let src = "# widgets\r\nresource \"acme_widget\" \"w\" {\r\n  foo {\r\n    bar = 1\r\n  }\r\n} # end\r\n";
    let outcome = migrate_config_text(src);
    assert_eq!(
        outcome.output,
        "# widgets\r\nresource \"acme_widget\" \"w\" {\r\n  foo = {\r\n    bar = 1\r\n  }\r\n} # end\r\n"
    );
}
