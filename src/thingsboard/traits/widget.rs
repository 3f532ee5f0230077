use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

/// Trait for widget type and widgets bundle operations
#[async_trait]
pub trait WidgetOperations: Send + Sync {
    async fn get_widget_type(&self, widget_type_id: &str) -> Result<Value>;

    async fn save_widget_type(&self, widget_type: &Value) -> Result<Value>;

    async fn get_widgets_bundle(&self, bundle_id: &str) -> Result<Value>;

    async fn save_widgets_bundle(&self, bundle: &Value) -> Result<Value>;

    /// Full widget type details of every type in a bundle
    async fn get_bundle_widget_types_details(&self, bundle_id: &str) -> Result<Vec<Value>>;

    /// Fully qualified names of the types in a bundle
    async fn get_bundle_widget_type_fqns(&self, bundle_id: &str) -> Result<Vec<String>>;

    /// Replace the bundle's membership with the given fully qualified names
    async fn update_widgets_bundle_widget_fqns(&self, bundle_id: &str, fqns: &[String])
        -> Result<()>;
}
