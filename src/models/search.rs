use super::Issue;
use serde::{Deserialize, Serialize};

/// コレクターがページ取得時に除外するフィールド
pub const EXCLUDED_BULK_FIELDS: [&str; 5] =
    ["attachments", "comment", "issuelinks", "subtasks", "worklog"];

/// 取得フィールドの指定
///
/// `-` で始まるトークンは除外指定になる（例: `*all,-comment`）。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct FieldSelector(Vec<String>);

impl FieldSelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// `*all` から大きな配列系フィールドを除いたもの
    pub fn all_without_bulk() -> Self {
        let mut selector = Self::new().include("*all");
        for field in EXCLUDED_BULK_FIELDS {
            selector = selector.exclude(field);
        }
        selector
    }

    pub fn include(mut self, field: impl Into<String>) -> Self {
        self.0.push(field.into());
        self
    }

    pub fn exclude(mut self, field: impl Into<String>) -> Self {
        self.0.push(format!("-{}", field.into()));
        self
    }

    pub fn is_excluded(&self, field: &str) -> bool {
        self.0
            .iter()
            .any(|token| token.strip_prefix('-') == Some(field))
    }

    pub fn tokens(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for FieldSelector {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// `POST /rest/api/3/search` のリクエストボディ
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchRequest {
    pub jql: String,

    pub fields: FieldSelector,

    #[serde(rename = "fieldsByKeys")]
    pub fields_by_keys: bool,

    #[serde(rename = "maxResults")]
    pub max_results: u32,

    #[serde(rename = "startAt")]
    pub start_at: u32,
}

impl SearchRequest {
    pub fn new(jql: impl Into<String>) -> Self {
        Self {
            jql: jql.into(),
            fields: FieldSelector::new(),
            fields_by_keys: false,
            max_results: 50,
            start_at: 0,
        }
    }

    /// 件数確認用の1件だけのリクエスト
    pub fn probe(jql: impl Into<String>) -> Self {
        Self::new(jql).max_results(1).start_at(0)
    }

    pub fn fields(mut self, fields: FieldSelector) -> Self {
        self.fields = fields;
        self
    }

    pub fn fields_by_keys(mut self, by_keys: bool) -> Self {
        self.fields_by_keys = by_keys;
        self
    }

    pub fn max_results(mut self, max_results: u32) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn start_at(mut self, start_at: u32) -> Self {
        self.start_at = start_at;
        self
    }
}

/// 検索結果の1ページ
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchPage {
    #[serde(rename = "startAt", default)]
    pub start_at: u32,

    #[serde(rename = "maxResults", default)]
    pub max_results: u32,

    pub total: u32,

    #[serde(default)]
    pub issues: Vec<Issue>,
}

/// 検索1回分の結果。レート制限はページとして扱わない。
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    Page(SearchPage),
    RateLimited { retry_after: Option<u64> },
}

impl SearchOutcome {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, SearchOutcome::RateLimited { .. })
    }
}
