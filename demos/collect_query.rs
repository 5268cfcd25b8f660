//! JQLの結果を全件取得してページごとにファイルへ書き出すデモ
//!
//! ```
//! export JIRA_URL=https://your-domain.atlassian.net
//! export JIRA_USER=your-email@example.com
//! export JIRA_API_TOKEN=your-api-token
//! cargo run --example collect_query -- "project = TEST" ./exports
//! ```

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use jira_cloud_api::{
    ApiSession, CollectorSettings, FileConfigStore, FilePageSink, JiraClient, QueryCollector,
    SettingsStore,
};
use tracing_subscriber::EnvFilter;

fn confirm_on_stdin(total: u32) -> bool {
    print!("This query returns {} issues. Continue? [y/N] ", total);
    io::stdout().flush().ok();

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer).ok();
    matches!(answer.trim(), "y" | "Y" | "yes")
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let jql = args.next().unwrap_or_else(|| "assignee = currentUser()".to_string());
    let export_dir = args.next();

    let settings = match FileConfigStore::default_config_dir() {
        Ok(store) => store.load_settings().await?.unwrap_or_default(),
        Err(_) => CollectorSettings::default(),
    }
    .with_env_overrides()?;

    let client = Arc::new(JiraClient::new(ApiSession::from_env()?)?);
    let mut collector = QueryCollector::new(client.clone(), settings.clone())?;

    if let Some(dir) = export_dir.map(std::path::PathBuf::from).or(settings.export_dir.clone()) {
        let sink = FilePageSink::new(dir, &client.session().host())
            .with_compression(settings.compress_exports);
        collector = collector.with_sink(Arc::new(sink));
    }

    let collection = collector.run(&jql, confirm_on_stdin).await?;

    if collection.declined {
        println!("Skipped {} issues", collection.total);
    } else {
        println!(
            "Collected {} of {} issues in {} pages",
            collection.len(),
            collection.total,
            collection.offsets.len()
        );
    }

    Ok(())
}
