//! Game commands.

use anyhow::Result;
use chrono::{DateTime, Utc};
use rinkside_core::{GameStatus, Stage, StagePlanEntry};
use serde::Deserialize;
use serde_json::Value;

use super::ApiClient;

#[derive(Debug, Deserialize)]
struct GameSummary {
    game_id: i64,
    game_date_utc: DateTime<Utc>,
    away_team: String,
    home_team: String,
    away_score: Option<i32>,
    home_score: Option<i32>,
    status: GameStatus,
}

fn score(away: Option<i32>, home: Option<i32>) -> String {
    match (away, home) {
        (Some(a), Some(h)) => format!("{}-{}", a, h),
        _ => "-".to_string(),
    }
}

pub async fn list(client: &ApiClient, limit: u32, team: Option<String>) -> Result<()> {
    let mut query = vec![("limit", limit.to_string())];
    if let Some(team) = team {
        query.push(("team", team));
    }
    let games: Vec<GameSummary> = client.get("/api/v1/games", &query).await?;

    if games.is_empty() {
        println!("No games found");
        return Ok(());
    }

    println!(
        "{:<12} {:<17} {:<11} {:<7} STATUS",
        "GAME", "DATE (UTC)", "MATCHUP", "SCORE"
    );
    for game in games {
        println!(
            "{:<12} {:<17} {:<11} {:<7} {}",
            game.game_id,
            game.game_date_utc.format("%Y-%m-%d %H:%M"),
            format!("{} @ {}", game.away_team, game.home_team),
            score(game.away_score, game.home_score),
            game.status
        );
    }
    Ok(())
}

pub async fn show(client: &ApiClient, id: i64) -> Result<()> {
    let game: Value = client.get(&format!("/api/v1/games/{}", id), &[]).await?;
    println!("{}", serde_json::to_string_pretty(&game)?);
    Ok(())
}

#[derive(Debug, Deserialize)]
struct StagePlan {
    status: GameStatus,
    final_at: Option<DateTime<Utc>>,
    due_stage: Option<Stage>,
    failed_attempts: i32,
    last_error: Option<String>,
    stages: Vec<StagePlanEntry>,
}

fn timestamp(at: Option<DateTime<Utc>>) -> String {
    at.map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

pub async fn stages(client: &ApiClient, id: i64) -> Result<()> {
    let plan: StagePlan = client
        .get(&format!("/api/v1/games/{}/stages", id), &[])
        .await?;

    println!("Game {} ({})", id, plan.status);
    println!("  final at: {}", timestamp(plan.final_at));
    if let Some(stage) = plan.due_stage {
        println!("  due now:  {}", stage);
    }
    if plan.failed_attempts > 0 {
        println!(
            "  failures: {} ({})",
            plan.failed_attempts,
            plan.last_error.as_deref().unwrap_or("unknown error")
        );
    }
    println!();
    println!("{:<2}{:<16} {:<17} FETCHED", "", "STAGE", "DUE (UTC)");
    for entry in plan.stages {
        let fetched = if entry.fetched {
            timestamp(entry.fetched_at)
        } else {
            "no".to_string()
        };
        println!(
            "{:<2}{:<16} {:<17} {}",
            if entry.is_next { ">" } else { "" },
            entry.stage.name(),
            timestamp(entry.due_at),
            fetched
        );
    }
    Ok(())
}
