//! Scheduler commands.

use anyhow::Result;
use serde_json::Value;

use super::ApiClient;

pub async fn status(client: &ApiClient) -> Result<()> {
    let status: Value = client.get("/api/v1/monitoring/scheduler", &[]).await?;
    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}

pub async fn tick(client: &ApiClient) -> Result<()> {
    let report: Value = client.post("/api/v1/monitoring/scheduler/tick").await?;
    println!("Tick complete");
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
