use serde::Serialize;
use tracing::debug;

use crate::client::JiraClient;
use crate::error::{Error, Result};
use crate::models::{ProjectProperty, PropertyKeys};

fn properties_path(project: &str) -> Result<String> {
    if project.trim().is_empty() {
        return Err(Error::InvalidInput(
            "project key must not be empty".to_string(),
        ));
    }
    Ok(format!(
        "/rest/api/3/project/{}/properties",
        urlencoding::encode(project)
    ))
}

fn property_path(project: &str, key: &str) -> Result<String> {
    if key.trim().is_empty() {
        return Err(Error::InvalidInput(
            "property key must not be empty".to_string(),
        ));
    }
    Ok(format!(
        "{}/{}",
        properties_path(project)?,
        urlencoding::encode(key)
    ))
}

impl JiraClient {
    pub async fn list_project_properties(&self, project: &str) -> Result<Vec<String>> {
        let keys: PropertyKeys = self.get(&properties_path(project)?).await?;
        Ok(keys.names())
    }

    /// プロパティを取得。存在しない場合は `None`。
    pub async fn get_project_property(
        &self,
        project: &str,
        key: &str,
    ) -> Result<Option<ProjectProperty>> {
        self.get_optional(&property_path(project, key)?).await
    }

    /// プロパティを作成または更新する
    pub async fn set_project_property<V>(&self, project: &str, key: &str, value: &V) -> Result<()>
    where
        V: Serialize + ?Sized,
    {
        let status = self.put(&property_path(project, key)?, value).await?;
        debug!(project, key, status = status.as_u16(), "project property saved");
        Ok(())
    }

    /// プロパティを削除する。存在しなかった場合は `false`。
    pub async fn delete_project_property(&self, project: &str, key: &str) -> Result<bool> {
        self.delete(&property_path(project, key)?).await
    }
}
