//! JQLの検索結果を全件取得するコレクター
//!
//! 件数確認（probe）→ 大量件数の確認 → ページ単位の並行取得 → 集約、の順で処理する。
//! 同時実行数はセマフォで制限し、取得タスクは `JoinSet` で管理する。
//! 集約結果とジョブ表を更新するのは呼び出し側のタスクだけである。

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::client::SearchTransport;
use crate::config::CollectorSettings;
use crate::error::{Error, Result};
use crate::models::{FieldSelector, Issue, IssueExport, SearchPage, SearchRequest};
use crate::retry::RetryPolicy;
use crate::sink::PageSink;

/// ページ取得ジョブの状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Pending,
    Running,
    Completed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionJob {
    pub offset: u32,
    pub state: JobState,
}

/// 1クエリ分の集約結果
///
/// `issues` はページの完了順に並ぶ（ページ内の順序は保持される）。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Collection {
    pub total: u32,
    pub issues: Vec<Issue>,
    /// 取得済みページのoffset（完了順）
    pub offsets: Vec<u32>,
    /// 大量件数の確認で取得を見送った場合 true
    pub declined: bool,
}

impl Collection {
    fn empty(total: u32) -> Self {
        Self {
            total,
            ..Self::default()
        }
    }

    fn declined(total: u32) -> Self {
        Self {
            total,
            declined: true,
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn keys(&self) -> Vec<&str> {
        self.issues.iter().map(|i| i.key.as_str()).collect()
    }
}

/// 未反映のジョブ一覧。更新するのはオーケストレーター側のタスクだけ。
#[derive(Debug, Default)]
struct JobTable {
    jobs: BTreeMap<u32, JobState>,
}

impl JobTable {
    fn planned(offsets: &[u32]) -> Self {
        Self {
            jobs: offsets.iter().map(|&o| (o, JobState::Pending)).collect(),
        }
    }

    fn mark(&mut self, offset: u32, state: JobState) {
        self.jobs.insert(offset, state);
    }

    /// 集約に反映したジョブを取り除く
    fn consume(&mut self, offset: u32) -> Option<CollectionJob> {
        self.jobs
            .remove(&offset)
            .map(|state| CollectionJob { offset, state })
    }

    fn count(&self, state: JobState) -> usize {
        self.jobs.values().filter(|&&s| s == state).count()
    }

    fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

/// `[0, total)` を `page_size` ごとに区切ったoffset列
pub fn page_offsets(total: u32, page_size: u32) -> Vec<u32> {
    if page_size == 0 {
        return Vec::new();
    }
    (0..total).step_by(page_size as usize).collect()
}

pub struct QueryCollector {
    transport: Arc<dyn SearchTransport>,
    settings: CollectorSettings,
    fields: FieldSelector,
    sink: Option<Arc<dyn PageSink>>,
}

impl QueryCollector {
    pub fn new(transport: Arc<dyn SearchTransport>, settings: CollectorSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            transport,
            settings,
            fields: FieldSelector::all_without_bulk(),
            sink: None,
        })
    }

    /// 各ページを書き出すシンクを設定
    pub fn with_sink(mut self, sink: Arc<dyn PageSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn with_fields(mut self, fields: FieldSelector) -> Self {
        self.fields = fields;
        self
    }

    pub fn settings(&self) -> &CollectorSettings {
        &self.settings
    }

    /// 件数確認からページ取得まで一括で実行する
    ///
    /// 件数が `warning_limit` を超える場合に限り `confirm(total)` を1回呼ぶ。
    /// `false` が返ると何も取得せず空の結果を返す。
    pub async fn run<F>(&self, jql: &str, confirm: F) -> Result<Collection>
    where
        F: FnOnce(u32) -> bool,
    {
        let total = self.validate(jql).await?;

        if total == 0 {
            info!(jql, "query matched no issues");
            return Ok(Collection::empty(0));
        }

        if total > self.settings.warning_limit {
            warn!(
                jql,
                total,
                limit = self.settings.warning_limit,
                "query result exceeds warning limit"
            );
            if !confirm(total) {
                info!(jql, total, "collection declined");
                return Ok(Collection::declined(total));
            }
        }

        self.collect(jql, total).await
    }

    /// 1件だけ検索して総件数を得る。レート制限中は待機して再試行する。
    pub async fn validate(&self, jql: &str) -> Result<u32> {
        let request = SearchRequest::probe(jql);
        let transport = self.transport.as_ref();
        let probe = &request;

        let page = self
            .settings
            .retry_policy()
            .run("probe", move || transport.search(probe))
            .await?;

        debug!(jql, total = page.total, "probe completed");
        Ok(page.total)
    }

    /// `total` 件をページ単位で並行取得して集約する
    pub async fn collect(&self, jql: &str, total: u32) -> Result<Collection> {
        let page_size = self.settings.page_size;
        let offsets = page_offsets(total, page_size);
        let delay = self.settings.dispatch_delay_duration();
        let policy = self.settings.retry_policy();

        info!(
            jql,
            total,
            pages = offsets.len(),
            cap = self.settings.max_concurrency,
            "collecting query results"
        );

        let semaphore = Arc::new(Semaphore::new(self.settings.max_concurrency));
        let mut tasks: JoinSet<(u32, Result<SearchPage>)> = JoinSet::new();
        let mut jobs = JobTable::planned(&offsets);
        let mut collection = Collection::empty(total);

        for (index, &offset) in offsets.iter().enumerate() {
            if index > 0 && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            // 上限に達している場合はここで空きを待つ
            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|e| Error::Unexpected(format!("Semaphore closed: {}", e)))?;

            let request = SearchRequest::new(jql)
                .fields(self.fields.clone())
                .max_results(page_size)
                .start_at(offset);
            let transport = self.transport.clone();
            let sink = self.sink.clone();
            let policy = policy.clone();

            jobs.mark(offset, JobState::Running);
            debug!(offset, "dispatching page fetch");
            tasks.spawn(async move {
                let result = fetch_page(transport, request, policy, sink).await;
                drop(permit);
                (offset, result)
            });

            while let Some(joined) = tasks.try_join_next() {
                merge(joined, &mut jobs, &mut collection)?;
            }
        }

        while let Some(joined) = tasks.join_next().await {
            merge(joined, &mut jobs, &mut collection)?;
        }

        debug_assert!(jobs.is_empty());
        info!(
            jql,
            collected = collection.issues.len(),
            pages = collection.offsets.len(),
            "collection completed"
        );
        Ok(collection)
    }
}

/// 1ページ取得する。レート制限中は同じoffsetで再試行する。
async fn fetch_page(
    transport: Arc<dyn SearchTransport>,
    request: SearchRequest,
    policy: RetryPolicy,
    sink: Option<Arc<dyn PageSink>>,
) -> Result<SearchPage> {
    let label = format!("page {}", request.start_at);
    let page = {
        let transport = transport.as_ref();
        let request = &request;
        policy.run(&label, move || transport.search(request)).await?
    };

    if let Some(sink) = sink {
        let exports: Vec<IssueExport> = page.issues.iter().map(Issue::to_export).collect();
        sink.write_page(request.start_at, &exports).await?;
    }

    Ok(page)
}

/// 完了したジョブを集約に反映する。失敗した場合はエラーを返し、
/// 呼び出し側で `JoinSet` が破棄されて残りのタスクは中断される。
fn merge(
    joined: std::result::Result<(u32, Result<SearchPage>), tokio::task::JoinError>,
    jobs: &mut JobTable,
    collection: &mut Collection,
) -> Result<()> {
    let (offset, result) = joined?;

    match result {
        Ok(page) => {
            jobs.mark(offset, JobState::Completed);
            if page.total != collection.total {
                // 収集中にデータが変わった場合も初回の件数を信頼する
                warn!(
                    offset,
                    expected = collection.total,
                    reported = page.total,
                    "total changed during collection"
                );
            }
            debug!(offset, count = page.issues.len(), "page merged");
            if let Some(job) = jobs.consume(offset) {
                collection.offsets.push(job.offset);
                collection.issues.extend(page.issues);
            }
            Ok(())
        }
        Err(e) => {
            jobs.mark(offset, JobState::Failed);
            warn!(
                offset,
                error = %e,
                running = jobs.count(JobState::Running),
                pending = jobs.count(JobState::Pending),
                "page fetch failed, aborting collection"
            );
            Err(e)
        }
    }
}
