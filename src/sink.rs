use async_trait::async_trait;
use chrono::{DateTime, Local};
use flate2::{Compression, write::GzEncoder};
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::fs::{self, create_dir_all};
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::IssueExport;

/// 取得したページの書き出し先
#[async_trait]
pub trait PageSink: Send + Sync {
    async fn write_page(&self, offset: u32, issues: &[IssueExport]) -> Result<()>;
}

/// 1ページ1ファイルでJSONを書き出すシンク
///
/// ファイル名は `{host}_{yyyyMMddHHmmss}_{offset}.json`（圧縮時は `.json.gz`）。
/// タイムスタンプはシンク作成時に固定され、同じ収集のページは同じ接頭辞を持つ。
#[derive(Debug, Clone)]
pub struct FilePageSink {
    dir: PathBuf,
    prefix: String,
    use_compression: bool,
}

impl FilePageSink {
    pub fn new<P: AsRef<Path>>(dir: P, host: &str) -> Self {
        Self::with_timestamp(dir, host, Local::now())
    }

    pub fn with_timestamp<P: AsRef<Path>>(dir: P, host: &str, at: DateTime<Local>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            prefix: format!("{}_{}", sanitize(host), at.format("%Y%m%d%H%M%S")),
            use_compression: false,
        }
    }

    /// 圧縮設定を変更
    pub fn with_compression(mut self, use_compression: bool) -> Self {
        self.use_compression = use_compression;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn page_path(&self, offset: u32) -> PathBuf {
        let ext = if self.use_compression {
            "json.gz"
        } else {
            "json"
        };
        self.dir.join(format!("{}_{}.{}", self.prefix, offset, ext))
    }

    fn encode(&self, issues: &[IssueExport]) -> Result<Vec<u8>> {
        let json = serde_json::to_vec_pretty(issues)?;
        if !self.use_compression {
            return Ok(json);
        }

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&json)?;
        Ok(encoder.finish()?)
    }
}

#[async_trait]
impl PageSink for FilePageSink {
    async fn write_page(&self, offset: u32, issues: &[IssueExport]) -> Result<()> {
        create_dir_all(&self.dir).await?;

        let path = self.page_path(offset);
        let bytes = self.encode(issues)?;
        fs::write(&path, bytes).await.map_err(Error::IoError)?;

        debug!(offset, count = issues.len(), path = %path.display(), "page exported");
        Ok(())
    }
}

/// ファイル名に使えない文字を `_` に置き換える
fn sanitize(host: &str) -> String {
    host.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use flate2::read::GzDecoder;
    use serde_json::{Map, json};
    use std::io::Read;
    use tempfile::TempDir;

    fn export(key: &str) -> IssueExport {
        let mut fields = Map::new();
        fields.insert("summary".to_string(), json!(format!("Summary of {}", key)));
        IssueExport {
            key: key.to_string(),
            fields,
        }
    }

    fn fixed_time() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap()
    }

    #[test]
    fn test_page_path_naming() {
        let sink = FilePageSink::with_timestamp("/tmp/out", "example.atlassian.net", fixed_time());

        assert_eq!(
            sink.page_path(200),
            PathBuf::from("/tmp/out/example.atlassian.net_20240305140709_200.json")
        );
        assert_eq!(
            sink.with_compression(true).page_path(0),
            PathBuf::from("/tmp/out/example.atlassian.net_20240305140709_0.json.gz")
        );
    }

    #[test]
    fn test_sanitize_host() {
        assert_eq!(sanitize("localhost:8080"), "localhost_8080");
        assert_eq!(sanitize("a.b-c"), "a.b-c");
    }

    #[tokio::test]
    async fn test_write_page_plain_json() {
        // Given: 一時ディレクトリ配下のシンク
        let temp_dir = TempDir::new().unwrap();
        let out = temp_dir.path().join("exports");
        let sink = FilePageSink::with_timestamp(&out, "jira.test", fixed_time());

        // When: ページを書き出す
        sink.write_page(100, &[export("TEST-1"), export("TEST-2")])
            .await
            .unwrap();

        // Then: key/fields の配列として保存される
        let content = std::fs::read_to_string(sink.page_path(100)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(value.as_array().unwrap().len(), 2);
        assert_eq!(value[0]["key"], "TEST-1");
        assert_eq!(value[1]["fields"]["summary"], "Summary of TEST-2");
    }

    #[tokio::test]
    async fn test_write_page_compressed() {
        let temp_dir = TempDir::new().unwrap();
        let sink = FilePageSink::with_timestamp(temp_dir.path(), "jira.test", fixed_time())
            .with_compression(true);

        sink.write_page(0, &[export("TEST-9")]).await.unwrap();

        let bytes = std::fs::read(sink.page_path(0)).unwrap();
        let mut decoder = GzDecoder::new(&bytes[..]);
        let mut content = String::new();
        decoder.read_to_string(&mut content).unwrap();

        let decoded: Vec<IssueExport> = serde_json::from_str(&content).unwrap();
        assert_eq!(decoded, vec![export("TEST-9")]);
    }
}
