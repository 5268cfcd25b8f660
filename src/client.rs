use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, header};
use std::sync::Arc;
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::{SearchOutcome, SearchPage, SearchRequest};
use crate::session::ApiSession;

const SEARCH_PATH: &str = "/rest/api/3/search";

/// 検索エンドポイントへの1リクエスト分の抽象化
///
/// レート制限は `SearchOutcome::RateLimited` として返し、エラーにはしない。
#[async_trait]
pub trait SearchTransport: Send + Sync {
    async fn search(&self, request: &SearchRequest) -> Result<SearchOutcome>;
}

#[derive(Debug, Clone)]
pub struct JiraClient {
    pub(crate) client: Client,
    pub(crate) session: Arc<ApiSession>,
}

impl JiraClient {
    pub fn new(session: ApiSession) -> Result<Self> {
        let client = build_http_client(session.authorization())?;

        Ok(Self {
            client,
            session: Arc::new(session),
        })
    }

    pub fn session(&self) -> &ApiSession {
        &self.session
    }

    fn request(&self, method: Method, endpoint: &str) -> RequestBuilder {
        self.client.request(method, self.session.endpoint(endpoint))
    }

    pub(crate) async fn get<T>(&self, endpoint: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        let response = self.request(Method::GET, endpoint).send().await?;
        let response = ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }

    /// 404を `None` として扱うGET
    pub(crate) async fn get_optional<T>(&self, endpoint: &str) -> Result<Option<T>>
    where
        T: serde::de::DeserializeOwned,
    {
        let response = self.request(Method::GET, endpoint).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = ensure_success(response).await?;
        Ok(Some(response.json::<T>().await?))
    }

    pub(crate) async fn post<T, B>(&self, endpoint: &str, body: &B) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
        B: serde::Serialize + ?Sized,
    {
        let response = self.request(Method::POST, endpoint).json(body).send().await?;
        let response = ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }

    /// 本文を返さない（204 No Content など）PUT
    pub(crate) async fn put<B>(&self, endpoint: &str, body: &B) -> Result<StatusCode>
    where
        B: serde::Serialize + ?Sized,
    {
        let response = self.request(Method::PUT, endpoint).json(body).send().await?;
        let response = ensure_success(response).await?;
        Ok(response.status())
    }

    /// 削除に成功した場合 `true`、対象が存在しなかった場合 `false`
    pub(crate) async fn delete(&self, endpoint: &str) -> Result<bool> {
        let response = self.request(Method::DELETE, endpoint).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        ensure_success(response).await?;
        Ok(true)
    }

    /// 1ページだけ検索する。レート制限は `Error::RateLimitExceeded` になる。
    pub async fn search_issues(&self, request: &SearchRequest) -> Result<SearchPage> {
        match self.search(request).await? {
            SearchOutcome::Page(page) => Ok(page),
            SearchOutcome::RateLimited { .. } => Err(Error::RateLimitExceeded { attempts: 1 }),
        }
    }
}

#[async_trait]
impl SearchTransport for JiraClient {
    async fn search(&self, request: &SearchRequest) -> Result<SearchOutcome> {
        debug!(
            start_at = request.start_at,
            max_results = request.max_results,
            "POST {}",
            SEARCH_PATH
        );

        let response = self
            .request(Method::POST, SEARCH_PATH)
            .json(request)
            .send()
            .await?;

        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            return Ok(SearchOutcome::RateLimited {
                retry_after: retry_after_secs(&response),
            });
        }

        let response = ensure_success(response).await?;
        Ok(SearchOutcome::Page(response.json::<SearchPage>().await?))
    }
}

/// JSON用の既定ヘッダーと認証ヘッダーを持つ `reqwest::Client` を作成
pub(crate) fn build_http_client(authorization: &str) -> Result<Client> {
    let mut headers = header::HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static("application/json"),
    );
    headers.insert(
        header::ACCEPT,
        header::HeaderValue::from_static("application/json"),
    );

    // 認証ヘッダーを追加
    let mut auth_value = header::HeaderValue::from_str(authorization)
        .map_err(|_| Error::InvalidConfiguration("Invalid auth header".to_string()))?;
    auth_value.set_sensitive(true);
    headers.insert(header::AUTHORIZATION, auth_value);

    Client::builder()
        .default_headers(headers)
        .build()
        .map_err(|e| Error::Unexpected(format!("Failed to build HTTP client: {}", e)))
}

/// 2xx以外を `Error` に変換する
pub(crate) async fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(Error::RateLimitExceeded { attempts: 1 });
    }

    let message = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    Err(Error::ApiError {
        status: status.as_u16(),
        message,
    })
}

fn retry_after_secs(response: &Response) -> Option<u64> {
    response
        .headers()
        .get(header::RETRY_AFTER)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
}
