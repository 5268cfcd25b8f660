use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::error::{Error, Result};
use crate::retry::RetryPolicy;

/// コレクターの設定
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CollectorSettings {
    /// 1ページの件数
    pub page_size: u32,
    /// 同時に実行するページ取得の上限
    pub max_concurrency: usize,
    /// これを超える件数の場合は確認を求める
    pub warning_limit: u32,
    /// ページ取得を起動する間隔（ミリ秒）
    pub dispatch_delay_ms: u64,
    /// レート制限時の待機（ミリ秒）
    pub retry_interval_ms: u64,
    /// レート制限時の最大試行回数（None は無制限）
    pub retry_max_attempts: Option<u32>,
    /// ページを書き出すディレクトリ
    pub export_dir: Option<PathBuf>,
    /// 書き出しをgzip圧縮するか
    pub compress_exports: bool,
}

impl CollectorSettings {
    pub fn new() -> Self {
        Self {
            page_size: 100,
            max_concurrency: 100,
            warning_limit: 2000,
            dispatch_delay_ms: 2000,
            retry_interval_ms: 20_000,
            retry_max_attempts: None,
            export_dir: None,
            compress_exports: false,
        }
    }

    pub fn page_size(mut self, size: u32) -> Self {
        self.page_size = size;
        self
    }

    pub fn max_concurrency(mut self, cap: usize) -> Self {
        self.max_concurrency = cap;
        self
    }

    pub fn warning_limit(mut self, limit: u32) -> Self {
        self.warning_limit = limit;
        self
    }

    pub fn dispatch_delay(mut self, delay: Duration) -> Self {
        self.dispatch_delay_ms = delay.as_millis() as u64;
        self
    }

    pub fn retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval_ms = interval.as_millis() as u64;
        self
    }

    pub fn retry_max_attempts(mut self, attempts: Option<u32>) -> Self {
        self.retry_max_attempts = attempts;
        self
    }

    pub fn export_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.export_dir = Some(dir.into());
        self
    }

    pub fn compress_exports(mut self, compress: bool) -> Self {
        self.compress_exports = compress;
        self
    }

    pub fn dispatch_delay_duration(&self) -> Duration {
        Duration::from_millis(self.dispatch_delay_ms)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        let policy = RetryPolicy::new(Duration::from_millis(self.retry_interval_ms));
        match self.retry_max_attempts {
            Some(max) => policy.max_attempts(max),
            None => policy,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(Error::InvalidConfiguration(
                "page_size must be greater than 0".to_string(),
            ));
        }
        if self.max_concurrency == 0 {
            return Err(Error::InvalidConfiguration(
                "max_concurrency must be greater than 0".to_string(),
            ));
        }
        if self.retry_max_attempts == Some(0) {
            return Err(Error::InvalidConfiguration(
                "retry_max_attempts must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// 環境変数で上書きする
    pub fn with_env_overrides(mut self) -> Result<Self> {
        if let Some(v) = env_number::<u32>("JIRA_COLLECT_PAGE_SIZE")? {
            self.page_size = v;
        }
        if let Some(v) = env_number::<usize>("JIRA_COLLECT_CONCURRENCY")? {
            self.max_concurrency = v;
        }
        if let Some(v) = env_number::<u32>("JIRA_COLLECT_WARNING_LIMIT")? {
            self.warning_limit = v;
        }
        Ok(self)
    }
}

impl Default for CollectorSettings {
    fn default() -> Self {
        Self::new()
    }
}

fn env_number<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| Error::InvalidConfiguration(format!("{} is not a number: {}", name, raw))),
        Err(_) => Ok(None),
    }
}

/// 設定の保存先の抽象化トレイト
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn save_settings(&self, settings: &CollectorSettings) -> Result<()>;

    async fn load_settings(&self) -> Result<Option<CollectorSettings>>;
}

/// JSON形式のファイルベース設定ストア
pub struct FileConfigStore {
    config_dir: PathBuf,
}

impl FileConfigStore {
    pub fn new<P: AsRef<Path>>(config_dir: P) -> Self {
        Self {
            config_dir: config_dir.as_ref().to_path_buf(),
        }
    }

    /// デフォルトの設定ディレクトリでファイル設定ストアを作成
    pub fn default_config_dir() -> Result<Self> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| Error::ConfigurationMissing("config directory not found".to_string()))?
            .join("jira-cloud-api");

        Ok(Self::new(config_dir))
    }

    pub fn settings_path(&self) -> PathBuf {
        self.config_dir.join("collector.json")
    }
}

#[async_trait]
impl SettingsStore for FileConfigStore {
    async fn save_settings(&self, settings: &CollectorSettings) -> Result<()> {
        let path = self.settings_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let json_data = serde_json::to_string_pretty(settings)?;
        let mut file = fs::File::create(&path).await?;
        file.write_all(json_data.as_bytes()).await?;
        file.sync_all().await?;

        Ok(())
    }

    async fn load_settings(&self) -> Result<Option<CollectorSettings>> {
        let path = self.settings_path();
        if !path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(&path).await?;
        if contents.trim().is_empty() {
            return Ok(None);
        }

        Ok(Some(serde_json::from_str(&contents)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tempfile::TempDir;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_collector_settings_defaults() {
        let settings = CollectorSettings::new();

        assert_eq!(settings.page_size, 100);
        assert_eq!(settings.max_concurrency, 100);
        assert_eq!(settings.warning_limit, 2000);
        assert_eq!(settings.dispatch_delay_duration(), Duration::from_secs(2));
        assert_eq!(settings.retry_policy(), RetryPolicy::default());
        assert!(settings.export_dir.is_none());
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_collector_settings_builder_pattern() {
        let settings = CollectorSettings::new()
            .page_size(50)
            .max_concurrency(4)
            .warning_limit(10)
            .dispatch_delay(Duration::from_millis(5))
            .retry_interval(Duration::from_secs(1))
            .retry_max_attempts(Some(3))
            .export_dir("/tmp/pages")
            .compress_exports(true);

        assert_eq!(settings.page_size, 50);
        assert_eq!(settings.max_concurrency, 4);
        assert_eq!(settings.dispatch_delay_ms, 5);
        assert_eq!(
            settings.retry_policy(),
            RetryPolicy::new(Duration::from_secs(1)).max_attempts(3)
        );
        assert_eq!(settings.export_dir, Some(PathBuf::from("/tmp/pages")));
        assert!(settings.compress_exports);
    }

    #[test]
    fn test_sub_second_retry_interval_is_kept() {
        // Given: 1秒未満の待機間隔
        let settings = CollectorSettings::new().retry_interval(Duration::from_millis(500));

        // When: リトライポリシーを組み立てる
        let policy = settings.retry_policy();

        // Then: 0秒に丸められない
        assert_eq!(settings.retry_interval_ms, 500);
        assert_eq!(policy.interval, Duration::from_millis(500));
        assert_eq!(
            CollectorSettings::new()
                .retry_interval(Duration::from_millis(1900))
                .retry_policy()
                .interval,
            Duration::from_millis(1900)
        );
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        assert!(CollectorSettings::new().page_size(0).validate().is_err());
        assert!(CollectorSettings::new().max_concurrency(0).validate().is_err());
        assert!(
            CollectorSettings::new()
                .retry_max_attempts(Some(0))
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let settings: CollectorSettings =
            serde_json::from_str(r#"{ "page_size": 25 }"#).unwrap();

        assert_eq!(settings.page_size, 25);
        assert_eq!(settings.max_concurrency, 100);
    }

    #[test]
    fn test_env_overrides() {
        let _guard = ENV_LOCK.lock().unwrap();
        unsafe {
            std::env::set_var("JIRA_COLLECT_PAGE_SIZE", "20");
            std::env::set_var("JIRA_COLLECT_CONCURRENCY", "8");
            std::env::remove_var("JIRA_COLLECT_WARNING_LIMIT");
        }

        let settings = CollectorSettings::new().with_env_overrides().unwrap();

        assert_eq!(settings.page_size, 20);
        assert_eq!(settings.max_concurrency, 8);
        assert_eq!(settings.warning_limit, 2000);

        unsafe {
            std::env::set_var("JIRA_COLLECT_PAGE_SIZE", "many");
        }
        assert!(matches!(
            CollectorSettings::new().with_env_overrides(),
            Err(Error::InvalidConfiguration(_))
        ));

        unsafe {
            std::env::remove_var("JIRA_COLLECT_PAGE_SIZE");
            std::env::remove_var("JIRA_COLLECT_CONCURRENCY");
        }
    }

    #[tokio::test]
    async fn test_file_config_store_save_and_load() {
        // Given: 一時ディレクトリの設定ストア
        let temp_dir = TempDir::new().unwrap();
        let store = FileConfigStore::new(temp_dir.path().join("config"));

        // 保存前は None
        assert!(store.load_settings().await.unwrap().is_none());

        // When: 設定を保存
        let settings = CollectorSettings::new().page_size(10).export_dir("/data/jira");
        store.save_settings(&settings).await.unwrap();

        // Then: 同じ設定が読み込める
        let loaded = store.load_settings().await.unwrap().unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_file_config_store_empty_file() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileConfigStore::new(temp_dir.path());
        std::fs::write(store.settings_path(), "  \n").unwrap();

        let loaded = tokio_test::block_on(store.load_settings());

        assert!(tokio_test::assert_ok!(loaded).is_none());
    }
}
