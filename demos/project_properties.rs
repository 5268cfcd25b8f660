//! プロジェクトプロパティの一覧・取得・更新・削除のデモ

use jira_cloud_api::{ApiSession, JiraClient};
use serde_json::json;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let project = std::env::args().nth(1).unwrap_or_else(|| "TEST".to_string());
    let client = JiraClient::new(ApiSession::from_env()?)?;

    for key in client.list_project_properties(&project).await? {
        println!("{}: {:?}", key, client.get_project_property(&project, &key).await?);
    }

    client
        .set_project_property(&project, "demo.owner", &json!({ "team": "platform" }))
        .await?;
    println!("saved demo.owner");

    let deleted = client.delete_project_property(&project, "demo.owner").await?;
    println!("deleted demo.owner: {}", deleted);

    Ok(())
}
