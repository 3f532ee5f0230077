//! Export-safe copies of backend documents.
//!
//! Every function takes its input by reference and returns a fresh value;
//! nothing here mutates what the backend handed us.

use serde_json::{json, Value};

/// Server-assigned identity and ownership fields.
const SERVER_FIELDS: [&str; 6] = [
    "id",
    "createdTime",
    "tenantId",
    "customerId",
    "externalId",
    "version",
];

fn remove_keys(value: &mut Value, keys: &[&str]) {
    if let Some(object) = value.as_object_mut() {
        for key in keys {
            object.shift_remove(*key);
        }
    }
}

/// Copy of `data` without identity or ownership fields.
pub fn prepare_export(data: &Value) -> Value {
    let mut exported = data.clone();
    remove_keys(&mut exported, &SERVER_FIELDS);
    exported
}

/// Copy of an imported document without references to the source platform.
pub fn prepare_import(data: &Value) -> Value {
    let mut imported = data.clone();
    remove_keys(&mut imported, &["externalId"]);
    imported
}

pub fn export_dashboard(dashboard: &Value) -> Value {
    let mut exported = prepare_export(dashboard);
    remove_keys(&mut exported, &["assignedCustomers"]);
    exported
}

/// Device, asset and tenant profiles never arrive as the tenant default.
pub fn export_profile(profile: &Value) -> Value {
    let mut exported = prepare_export(profile);
    if exported.is_object() {
        exported["default"] = json!(false);
    }
    exported
}

/// An imported rule chain must not become the root or keep a stale entry node.
pub fn export_rule_chain(rule_chain: &Value) -> Value {
    let mut exported = prepare_export(rule_chain);
    if exported.is_object() {
        if exported.get("firstRuleNodeId").is_some_and(|id| !id.is_null()) {
            exported["firstRuleNodeId"] = Value::Null;
        }
        exported["root"] = json!(false);
    }
    exported
}

pub fn export_rule_chain_metadata(metadata: &Value) -> Value {
    let mut exported = metadata.clone();
    remove_keys(&mut exported, &["ruleChainId"]);
    if let Some(nodes) = exported.get_mut("nodes").and_then(Value::as_array_mut) {
        for node in nodes.iter_mut() {
            remove_keys(node, &["ruleChainId"]);
            *node = prepare_export(node);
        }
    }
    exported
}

/// The `{ruleChain, metadata}` document written for a rule chain export.
pub fn export_rule_chain_import(rule_chain: &Value, metadata: &Value) -> Value {
    json!({
        "ruleChain": export_rule_chain(rule_chain),
        "metadata": export_rule_chain_metadata(metadata),
    })
}

/// Bundle membership is re-established against the target bundle on import.
pub fn export_widget_type(widget_type: &Value) -> Value {
    let mut exported = prepare_export(widget_type);
    remove_keys(&mut exported, &["bundleAlias"]);
    exported
}

/// Members of an exported widgets bundle.
pub enum BundleMembers<'a> {
    /// Full widget type documents, exported one by one.
    Types(&'a [Value]),
    /// References only; the types must already exist on the target.
    Fqns(&'a [String]),
}

pub fn export_widgets_bundle(bundle: &Value, members: BundleMembers<'_>) -> Value {
    match members {
        BundleMembers::Types(types) => json!({
            "widgetsBundle": prepare_export(bundle),
            "widgetTypes": types.iter().map(export_widget_type).collect::<Vec<_>>(),
        }),
        BundleMembers::Fqns(fqns) => json!({
            "widgetsBundle": prepare_export(bundle),
            "widgetTypeFqns": fqns,
        }),
    }
}
