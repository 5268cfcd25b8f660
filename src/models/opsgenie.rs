use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Service {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "teamId", default, skip_serializing_if = "Option::is_none")]
    pub team_id: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ServicePaging {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last: Option<String>,
}

/// `GET /v1/services` のレスポンス
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServicePage {
    #[serde(default)]
    pub data: Vec<Service>,
    #[serde(rename = "totalCount", default)]
    pub total_count: u32,
    #[serde(rename = "paging", default)]
    pub paging: ServicePaging,
    #[serde(rename = "took", default, skip_serializing_if = "Option::is_none")]
    pub took: Option<f64>,
}

impl ServicePage {
    /// 次ページの offset（`paging.next` が無ければ None）
    pub fn next_offset(&self, offset: u32) -> Option<u32> {
        self.paging.next.as_ref()?;
        let fetched = u32::try_from(self.data.len()).ok()?;
        let next = offset.checked_add(fetched)?;
        (next < self.total_count).then_some(next)
    }
}
