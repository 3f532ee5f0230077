pub mod alias;
pub mod bulk;
pub mod entity_type;
pub mod import_result;
pub mod rule_chain;

// Re-export common types for easier access
pub use alias::{
    AliasesInfo, EntityAlias, EntityAliasInfo, EntityAliases, FilterInfo, FiltersInfo, WidgetSize,
};
pub use bulk::{
    BulkImportColumnType, BulkImportMapping, BulkImportRequest, BulkImportResult, ColumnMapping,
};
pub use entity_type::EntityType;
pub use import_result::{
    EntityCount, ErrorCount, ImportEntitiesResultInfo, ImportEntityAttributes, ImportEntityData,
    KeyValue,
};
pub use rule_chain::RuleChainType;
