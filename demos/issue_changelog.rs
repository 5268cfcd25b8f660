//! 課題のchangelogからステータス遷移を表示し、ラベルを更新するデモ

use jira_cloud_api::{ApiSession, FieldValue, JiraClient};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let key = std::env::args().nth(1).unwrap_or_else(|| "TEST-1".to_string());
    let client = JiraClient::new(ApiSession::from_env()?)?;

    let changelog = client.get_changelog(&key).await?;
    if changelog.truncated {
        println!("(only the first {} of {} entries)", changelog.histories.len(), changelog.total);
    }

    for change in changelog.query().field("status").changes() {
        println!(
            "{} {:<20} {} -> {}",
            change.created.format("%Y-%m-%d %H:%M"),
            change.author_name.as_deref().unwrap_or("-"),
            change.from_display.as_deref().unwrap_or("-"),
            change.to_display.as_deref().unwrap_or("-"),
        );
    }

    client
        .edit_issue_field(&key, "labels", FieldValue::Labels(vec!["reviewed".to_string()]))
        .await?;

    Ok(())
}
