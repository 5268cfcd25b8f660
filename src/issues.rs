use chrono::NaiveDate;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::changelog::{CHANGELOG_PAGE_LIMIT, IssueChangelog};
use crate::client::JiraClient;
use crate::error::{Error, Result};
use crate::models::{Changelog, FieldSelector, Issue};

/// 課題フィールドに設定する値。フィールド型ごとにJiraが要求する形へ変換する。
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Number(f64),
    /// 単一選択（`{"value": ...}`）
    Option(String),
    /// 複数選択（`[{"value": ...}, ...]`）
    MultiOption(Vec<String>),
    Labels(Vec<String>),
    /// ユーザー（`{"accountId": ...}`）
    User(String),
    Date(NaiveDate),
    /// 値を消す（`null`）
    Clear,
    Raw(Value),
}

impl FieldValue {
    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Text(s) => json!(s),
            FieldValue::Number(n) => json!(n),
            FieldValue::Option(v) => json!({ "value": v }),
            FieldValue::MultiOption(values) => Value::Array(
                values.iter().map(|v| json!({ "value": v })).collect(),
            ),
            FieldValue::Labels(labels) => json!(labels),
            FieldValue::User(account_id) => json!({ "accountId": account_id }),
            FieldValue::Date(date) => json!(date.format("%Y-%m-%d").to_string()),
            FieldValue::Clear => Value::Null,
            FieldValue::Raw(v) => v.clone(),
        }
    }
}

fn issue_path(key: &str) -> Result<String> {
    if key.trim().is_empty() {
        return Err(Error::InvalidInput("issue key must not be empty".to_string()));
    }
    Ok(format!("/rest/api/3/issue/{}", urlencoding::encode(key)))
}

impl JiraClient {
    /// 課題を1件取得。`fields` が空の場合はJiraの既定フィールド。
    pub async fn get_issue(&self, key: &str, fields: &FieldSelector) -> Result<Issue> {
        let mut endpoint = issue_path(key)?;
        if !fields.is_empty() {
            endpoint.push_str("?fields=");
            endpoint.push_str(&urlencoding::encode(&fields.tokens().join(",")));
        }
        self.get(&endpoint).await
    }

    /// 1フィールドだけ更新する
    pub async fn edit_issue_field(&self, key: &str, field_id: &str, value: FieldValue) -> Result<()> {
        if field_id.trim().is_empty() {
            return Err(Error::InvalidInput("field id must not be empty".to_string()));
        }

        let mut fields = serde_json::Map::new();
        fields.insert(field_id.to_string(), value.to_json());
        let body = json!({ "fields": fields });

        self.put(&issue_path(key)?, &body).await?;
        debug!(key, field_id, "issue field updated");
        Ok(())
    }

    /// 課題のchangelogを取得する
    ///
    /// Jiraは課題取得時のchangelogを100件で打ち切るため、超えている場合は警告を出す。
    pub async fn get_changelog(&self, key: &str) -> Result<IssueChangelog> {
        let endpoint = format!("{}?expand=changelog&fields=summary", issue_path(key)?);
        let issue: Issue = self.get(&endpoint).await?;

        let changelog = issue.changelog.unwrap_or(Changelog {
            start_at: 0,
            max_results: CHANGELOG_PAGE_LIMIT,
            total: 0,
            histories: Vec::new(),
        });

        let result = IssueChangelog::from_changelog(issue.key, changelog);
        if result.truncated {
            warn!(
                key = %result.issue_key,
                total = result.total,
                returned = result.histories.len(),
                "changelog truncated at {} entries",
                CHANGELOG_PAGE_LIMIT
            );
        }
        Ok(result)
    }
}
