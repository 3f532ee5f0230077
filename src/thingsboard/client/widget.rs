use anyhow::Result;
use async_trait::async_trait;
use log::debug;
use reqwest::Method;
use serde_json::Value;

use crate::thingsboard::traits::WidgetOperations;

use super::RestClient;

#[async_trait]
impl WidgetOperations for RestClient {
    async fn get_widget_type(&self, widget_type_id: &str) -> Result<Value> {
        debug!("get_widget_type called for id: {widget_type_id}");
        let response = self
            .base_api(Method::GET, &format!("widgetType/{widget_type_id}"))
            .await?
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }

    async fn save_widget_type(&self, widget_type: &Value) -> Result<Value> {
        let response = self
            .base_api(Method::POST, "widgetType")
            .await?
            .json(widget_type)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }

    async fn get_widgets_bundle(&self, bundle_id: &str) -> Result<Value> {
        debug!("get_widgets_bundle called for id: {bundle_id}");
        let response = self
            .base_api(Method::GET, &format!("widgetsBundle/{bundle_id}"))
            .await?
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }

    async fn save_widgets_bundle(&self, bundle: &Value) -> Result<Value> {
        let response = self
            .base_api(Method::POST, "widgetsBundle")
            .await?
            .json(bundle)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }

    async fn get_bundle_widget_types_details(&self, bundle_id: &str) -> Result<Vec<Value>> {
        let response = self
            .base_api(Method::GET, "widgetTypesDetails")
            .await?
            .query(&[("widgetsBundleId", bundle_id)])
            .send()
            .await?
            .error_for_status()?;
        let details: Vec<Value> = response.json().await?;
        debug!("Fetched {} widget types for bundle {bundle_id}", details.len());
        Ok(details)
    }

    async fn get_bundle_widget_type_fqns(&self, bundle_id: &str) -> Result<Vec<String>> {
        let response = self
            .base_api(Method::GET, "widgetTypeFqns")
            .await?
            .query(&[("widgetsBundleId", bundle_id)])
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }

    async fn update_widgets_bundle_widget_fqns(
        &self,
        bundle_id: &str,
        fqns: &[String],
    ) -> Result<()> {
        self.base_api(
            Method::POST,
            &format!("widgetsBundle/{bundle_id}/widgetTypeFqns"),
        )
        .await?
        .json(fqns)
        .send()
        .await?
        .error_for_status()?;
        Ok(())
    }
}
