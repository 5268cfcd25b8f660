use reqwest::Client;
use url::Url;

use crate::client::{build_http_client, ensure_success};
use crate::error::{Error, Result};
use crate::models::ServicePage;

pub const DEFAULT_OPSGENIE_URL: &str = "https://api.opsgenie.com";

/// Opsgenie REST APIクライアント（`GenieKey` 認証）
#[derive(Debug, Clone)]
pub struct OpsgenieClient {
    client: Client,
    base_url: String,
}

impl OpsgenieClient {
    pub fn new(base_url: impl Into<String>, api_key: &str) -> Result<Self> {
        let base_url = base_url.into();
        Url::parse(&base_url)
            .map_err(|_| Error::InvalidConfiguration("Invalid base URL".to_string()))?;
        if api_key.trim().is_empty() {
            return Err(Error::ConfigurationMissing("Opsgenie API key".to_string()));
        }

        let client = build_http_client(&format!("GenieKey {}", api_key))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// 環境変数 `OPSGENIE_API_KEY`（任意で `OPSGENIE_URL`）から作成
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let api_key = std::env::var("OPSGENIE_API_KEY").map_err(|_| {
            Error::ConfigurationMissing("OPSGENIE_API_KEY not found in environment".to_string())
        })?;
        let base_url =
            std::env::var("OPSGENIE_URL").unwrap_or_else(|_| DEFAULT_OPSGENIE_URL.to_string());

        Self::new(base_url, &api_key)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// サービス一覧の1ページを取得する。続きは `ServicePage::next_offset` で判断する。
    pub async fn list_services(&self, offset: u32, limit: u32) -> Result<ServicePage> {
        if limit == 0 {
            return Err(Error::InvalidInput("limit must be greater than 0".to_string()));
        }

        let url = format!(
            "{}/v1/services?offset={}&limit={}",
            self.base_url, offset, limit
        );
        let response = self.client.get(&url).send().await?;
        let response = ensure_success(response).await?;
        Ok(response.json::<ServicePage>().await?)
    }
}
