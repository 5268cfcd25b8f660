use serde::{Deserialize, Serialize};
use serde_json::Value;

/// プロジェクトプロパティ（任意のJSON値）
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectProperty {
    pub key: String,
    pub value: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PropertyKey {
    pub key: String,
    #[serde(rename = "self", default, skip_serializing_if = "Option::is_none")]
    pub self_url: Option<String>,
}

/// `GET /rest/api/3/project/{key}/properties` のレスポンス
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct PropertyKeys {
    #[serde(default)]
    pub keys: Vec<PropertyKey>,
}

impl PropertyKeys {
    pub fn names(&self) -> Vec<String> {
        self.keys.iter().map(|k| k.key.clone()).collect()
    }
}
