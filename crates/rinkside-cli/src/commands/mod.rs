//! CLI command implementations.

pub mod games;
pub mod scheduler;

use anyhow::{Context, Result, bail};
use rinkside_config::{PipelineConfig, SchedulerSettings, load_pipeline_config};
use rinkside_core::Stage;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Thin JSON client for the Rinkside API.
pub struct ApiClient {
    http: reqwest::Client,
    base: Url,
}

impl ApiClient {
    pub fn new(api_url: &str) -> Result<Self> {
        let base = Url::parse(api_url).with_context(|| format!("Invalid API URL: {}", api_url))?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()?;
        Ok(Self { http, base })
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.base
            .join(path)
            .with_context(|| format!("Invalid API path: {}", path))
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let url = self.url(path)?;
        debug!(url = %url, "GET");
        let response = self.http.get(url).query(query).send().await?;
        read_response(response).await
    }

    pub async fn post<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.url(path)?;
        debug!(url = %url, "POST");
        let response = self.http.post(url).send().await?;
        read_response(response).await
    }
}

async fn read_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let body: serde_json::Value = response.json().await.unwrap_or_default();
        match body.get("error").and_then(|e| e.as_str()) {
            Some(message) => bail!("API returned {}: {}", status, message),
            None => bail!("API returned {}", status),
        }
    }
    Ok(response.json().await?)
}

pub fn validate(path: &str) -> Result<()> {
    let config = load_pipeline_config(Path::new(path))
        .with_context(|| format!("Configuration error in {}", path))?;
    println!("Configuration is valid");
    print_summary(&config);
    Ok(())
}

fn print_summary(config: &PipelineConfig) {
    let SchedulerSettings {
        tick,
        max_attempts,
        lease,
    } = &config.scheduler;
    println!("  team:      {}", config.team);
    println!("  subreddit: r/{}", config.subreddit);
    println!(
        "  scheduler: tick {}s, {} attempts, lease {}s",
        tick.num_seconds(),
        max_attempts,
        lease.num_seconds()
    );
    println!("  stages (after final):");
    for stage in Stage::ALL {
        println!(
            "    {:<16} {}m",
            stage.name(),
            config.schedule.delay(stage).num_minutes()
        );
    }
}
