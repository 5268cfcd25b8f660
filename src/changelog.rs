use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::models::{Changelog, History};

/// Jiraが課題取得時に返すchangelogの上限件数
pub const CHANGELOG_PAGE_LIMIT: u32 = 100;

/// 1件のフィールド変更（historyのitemを平坦化したもの）
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldChange {
    pub history_id: String,
    pub created: DateTime<FixedOffset>,
    pub author_account_id: Option<String>,
    pub author_name: Option<String>,
    pub field: String,
    pub from: Option<String>,
    pub to: Option<String>,
    pub from_display: Option<String>,
    pub to_display: Option<String>,
}

/// 課題のchangelog
#[derive(Debug, Clone, PartialEq)]
pub struct IssueChangelog {
    pub issue_key: String,
    pub histories: Vec<History>,
    /// Jira側の総件数
    pub total: u32,
    /// 上限で切り詰められている場合 true
    pub truncated: bool,
}

impl IssueChangelog {
    pub fn from_changelog(issue_key: impl Into<String>, changelog: Changelog) -> Self {
        let truncated = changelog.total as usize > changelog.histories.len();
        Self {
            issue_key: issue_key.into(),
            total: changelog.total,
            histories: changelog.histories,
            truncated,
        }
    }

    /// 全itemを時系列順に平坦化
    pub fn changes(&self) -> Vec<FieldChange> {
        let mut changes: Vec<FieldChange> = self
            .histories
            .iter()
            .flat_map(|history| {
                history.items.iter().map(move |item| FieldChange {
                    history_id: history.id.clone(),
                    created: history.created,
                    author_account_id: history.author.as_ref().map(|a| a.account_id.clone()),
                    author_name: history.author.as_ref().map(|a| a.display_name.clone()),
                    field: item.field.clone(),
                    from: item.from.clone(),
                    to: item.to.clone(),
                    from_display: item.from_string.clone(),
                    to_display: item.to_string.clone(),
                })
            })
            .collect();
        changes.sort_by_key(|c| c.created);
        changes
    }

    pub fn query(&self) -> ChangelogQuery<'_> {
        ChangelogQuery {
            changelog: self,
            fields: Vec::new(),
            authors: Vec::new(),
        }
    }
}

/// changelogの絞り込み条件
pub struct ChangelogQuery<'a> {
    changelog: &'a IssueChangelog,
    fields: Vec<String>,
    authors: Vec<String>,
}

impl<'a> ChangelogQuery<'a> {
    /// フィールド名で絞り込む（大文字小文字は区別しない）
    pub fn field(mut self, name: impl Into<String>) -> Self {
        self.fields.push(name.into().to_lowercase());
        self
    }

    /// 変更者のaccountIdで絞り込む
    pub fn author(mut self, account_id: impl Into<String>) -> Self {
        self.authors.push(account_id.into());
        self
    }

    pub fn changes(&self) -> Vec<FieldChange> {
        self.changelog
            .changes()
            .into_iter()
            .filter(|c| self.fields.is_empty() || self.fields.contains(&c.field.to_lowercase()))
            .filter(|c| {
                self.authors.is_empty()
                    || c.author_account_id
                        .as_ref()
                        .is_some_and(|id| self.authors.contains(id))
            })
            .collect()
    }

    /// 最後の変更（なければ None）
    pub fn latest(&self) -> Option<FieldChange> {
        self.changes().pop()
    }
}
