use base64::Engine;
use url::Url;

use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub enum Auth {
    Basic { username: String, api_token: String },
    Bearer { token: String },
}

impl Auth {
    /// `Authorization` ヘッダーの値を組み立てる
    pub fn header_value(&self) -> String {
        match self {
            Auth::Basic { username, api_token } => {
                let auth_value = format!("{}:{}", username, api_token);
                let encoded =
                    base64::engine::general_purpose::STANDARD.encode(auth_value.as_bytes());
                format!("Basic {}", encoded)
            }
            Auth::Bearer { token } => format!("Bearer {}", token),
        }
    }
}

/// 接続先と認証情報
///
/// 一度だけ構築し、各操作へ明示的に渡す。
#[derive(Debug, Clone)]
pub struct ApiSession {
    base_url: String,
    auth: Auth,
    authorization: String,
}

impl ApiSession {
    pub fn new(base_url: impl Into<String>, auth: Auth) -> Result<Self> {
        let base_url = base_url.into();

        let parsed = Url::parse(&base_url)
            .map_err(|_| Error::InvalidConfiguration("Invalid base URL".to_string()))?;
        if parsed.cannot_be_a_base() {
            return Err(Error::InvalidConfiguration("Invalid base URL".to_string()));
        }

        let authorization = auth.header_value();

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            auth,
            authorization,
        })
    }

    /// 環境変数（および `.env`）からセッションを作成
    pub fn from_env() -> Result<Self> {
        use std::env;

        dotenv::dotenv().ok();

        let base_url = env::var("JIRA_URL").map_err(|_| {
            Error::ConfigurationMissing("JIRA_URL not found in environment".to_string())
        })?;

        let username = env::var("JIRA_USER").map_err(|_| {
            Error::ConfigurationMissing("JIRA_USER not found in environment".to_string())
        })?;

        let api_token = env::var("JIRA_API_TOKEN").map_err(|_| {
            Error::ConfigurationMissing("JIRA_API_TOKEN not found in environment".to_string())
        })?;

        Self::new(base_url, Auth::Basic { username, api_token })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn auth(&self) -> &Auth {
        &self.auth
    }

    pub fn authorization(&self) -> &str {
        &self.authorization
    }

    /// エクスポートファイル名に使うホスト名部分
    pub fn host(&self) -> String {
        Url::parse(&self.base_url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_string()))
            .unwrap_or_else(|| "jira".to_string())
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}
