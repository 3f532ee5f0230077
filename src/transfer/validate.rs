use clap::ValueEnum;
use log::debug;
use serde_json::{json, Value};
use strum::{Display, EnumIter};

/// Every kind of document the import/export pipeline understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, ValueEnum)]
pub enum EntityKind {
    #[strum(serialize = "dashboard")]
    Dashboard,
    #[strum(serialize = "widget")]
    Widget,
    #[strum(serialize = "widget type")]
    WidgetType,
    #[strum(serialize = "widgets bundle")]
    WidgetsBundle,
    #[strum(serialize = "rule chain")]
    RuleChain,
    #[strum(serialize = "device profile")]
    DeviceProfile,
    #[strum(serialize = "asset profile")]
    AssetProfile,
    #[strum(serialize = "tenant profile")]
    TenantProfile,
}

/// Fields a document must carry before it is handed to the backend.
pub struct Requirements {
    /// Dotted paths that must exist. Any value, `null` included, counts.
    pub fields: &'static [&'static str],
    /// Structural checks that a flat field list cannot express.
    pub extra: Option<fn(&Value) -> bool>,
}

const DASHBOARD: Requirements = Requirements {
    fields: &["title", "configuration"],
    extra: None,
};

const WIDGET: Requirements = Requirements {
    fields: &["widget", "aliasesInfo", "originalColumns", "widget.type"],
    extra: Some(widget_type_reference),
};

const WIDGET_TYPE: Requirements = Requirements {
    fields: &["name", "descriptor"],
    extra: None,
};

const WIDGETS_BUNDLE: Requirements = Requirements {
    fields: &["widgetsBundle", "widgetsBundle.title"],
    extra: Some(bundle_members),
};

const RULE_CHAIN: Requirements = Requirements {
    fields: &["ruleChain", "metadata", "ruleChain.name"],
    extra: None,
};

const DEVICE_PROFILE: Requirements = Requirements {
    fields: &["name", "type", "transportType", "provisionType", "profileData"],
    extra: None,
};

const ASSET_PROFILE: Requirements = Requirements {
    fields: &["name"],
    extra: None,
};

const TENANT_PROFILE: Requirements = Requirements {
    fields: &["name", "profileData", "isolatedTbCore", "isolatedTbRuleEngine"],
    extra: None,
};

impl EntityKind {
    pub fn requirements(self) -> &'static Requirements {
        match self {
            EntityKind::Dashboard => &DASHBOARD,
            EntityKind::Widget => &WIDGET,
            EntityKind::WidgetType => &WIDGET_TYPE,
            EntityKind::WidgetsBundle => &WIDGETS_BUNDLE,
            EntityKind::RuleChain => &RULE_CHAIN,
            EntityKind::DeviceProfile => &DEVICE_PROFILE,
            EntityKind::AssetProfile => &ASSET_PROFILE,
            EntityKind::TenantProfile => &TENANT_PROFILE,
        }
    }

    pub fn invalid_file_key(self) -> &'static str {
        match self {
            EntityKind::Dashboard => "dashboard.invalid-dashboard-file-error",
            EntityKind::Widget => "dashboard.invalid-widget-file-error",
            EntityKind::WidgetType => "widget-type.invalid-widget-type-file-error",
            EntityKind::WidgetsBundle => "widgets-bundle.invalid-widgets-bundle-file-error",
            EntityKind::RuleChain => "rulechain.invalid-rulechain-file-error",
            EntityKind::DeviceProfile => "device-profile.invalid-device-profile-file-error",
            EntityKind::AssetProfile => "asset-profile.invalid-asset-profile-file-error",
            EntityKind::TenantProfile => "tenant-profile.invalid-tenant-profile-file-error",
        }
    }

    pub fn export_failed_key(self) -> &'static str {
        match self {
            EntityKind::Dashboard | EntityKind::Widget => "dashboard.export-failed-error",
            EntityKind::WidgetType => "widget-type.export-failed-error",
            EntityKind::WidgetsBundle => "widgets-bundle.export-failed-error",
            EntityKind::RuleChain => "rulechain.export-failed-error",
            EntityKind::DeviceProfile => "device-profile.export-failed-error",
            EntityKind::AssetProfile => "asset-profile.export-failed-error",
            EntityKind::TenantProfile => "tenant-profile.export-failed-error",
        }
    }
}

/// Looks up a dotted path; only objects are descended into.
pub fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(value, |current, segment| current.as_object()?.get(segment))
}

fn has(value: &Value, path: &str) -> bool {
    lookup(value, path).is_some()
}

fn widget_type_reference(candidate: &Value) -> bool {
    has(candidate, "widget.typeFullFqn")
        || ["widget.isSystemType", "widget.bundleAlias", "widget.typeAlias"]
            .iter()
            .all(|path| has(candidate, path))
}

fn bundle_members(candidate: &Value) -> bool {
    let types = candidate.get("widgetTypes");
    let fqns = candidate.get("widgetTypeFqns");
    if types.is_none() && fqns.is_none() {
        return false;
    }
    if let Some(types) = types {
        match types.as_array() {
            Some(types) if types.iter().all(|t| validate(EntityKind::WidgetType, t)) => {}
            _ => return false,
        }
    }
    fqns.map_or(true, Value::is_array)
}

/// Required paths missing from `candidate`, in table order.
pub fn missing_fields(kind: EntityKind, candidate: &Value) -> Vec<&'static str> {
    kind.requirements()
        .fields
        .iter()
        .copied()
        .filter(|path| !has(candidate, path))
        .collect()
}

/// True when `candidate` carries everything a save of `kind` needs.
pub fn validate(kind: EntityKind, candidate: &Value) -> bool {
    if !candidate.is_object() {
        return false;
    }
    let missing = missing_fields(kind, candidate);
    if !missing.is_empty() {
        debug!("Rejected {kind}: missing {}", missing.join(", "));
        return false;
    }
    kind.requirements().extra.map_or(true, |check| check(candidate))
}

/// Lenient fixes applied after validation instead of rejecting the file.
pub fn fill_import_defaults(kind: EntityKind, candidate: &mut Value) {
    if kind == EntityKind::RuleChain {
        if let Some(rule_chain) = candidate.get_mut("ruleChain").and_then(Value::as_object_mut) {
            rule_chain.entry("type").or_insert_with(|| json!("CORE"));
        }
    }
}
