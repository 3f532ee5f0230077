pub mod dashboard;
pub mod entity;
pub mod profile;
pub mod rule_chain;
pub mod widget;

pub use dashboard::DashboardOperations;
pub use entity::EntityOperations;
pub use profile::{ProfileKind, ProfileOperations};
pub use rule_chain::RuleChainOperations;
pub use widget::WidgetOperations;

/// Super-trait combining every ThingsBoard API operation the import/export
/// pipeline needs. Implemented by the REST client and by test doubles.
pub trait TbClient:
    DashboardOperations + WidgetOperations + RuleChainOperations + ProfileOperations + EntityOperations
{
}

impl<T> TbClient for T where
    T: DashboardOperations + WidgetOperations + RuleChainOperations + ProfileOperations + EntityOperations
{
}
