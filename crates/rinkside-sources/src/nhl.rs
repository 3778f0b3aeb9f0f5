//! NHL web API client.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rinkside_core::feed::{GameFeed, ScheduledGame, TeamStanding};
use rinkside_core::{GameId, Result};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::http::{read_json, transport};

const SERVICE: &str = "NHL API";

/// Client for `api-web.nhle.com`.
pub struct NhlClient {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct ScheduleResponse {
    #[serde(default)]
    games: Vec<ScheduleEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScheduleEntry {
    id: i64,
    season: i64,
    game_type: i32,
    #[serde(rename = "startTimeUTC")]
    start_time_utc: DateTime<Utc>,
    away_team: TeamRef,
    home_team: TeamRef,
    game_state: String,
}

#[derive(Debug, Deserialize)]
struct TeamRef {
    abbrev: String,
}

impl From<ScheduleEntry> for ScheduledGame {
    fn from(entry: ScheduleEntry) -> Self {
        ScheduledGame {
            game_id: GameId::new(entry.id),
            season: entry.season.to_string(),
            game_type: entry.game_type,
            game_date_utc: entry.start_time_utc,
            away_team: entry.away_team.abbrev,
            home_team: entry.home_team.abbrev,
            game_state: entry.game_state,
        }
    }
}

#[derive(Debug, Deserialize)]
struct StandingsResponse {
    #[serde(default)]
    standings: Vec<StandingEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StandingEntry {
    team_abbrev: LocalizedName,
    division_name: String,
    division_sequence: i32,
    #[serde(default)]
    points: i32,
    #[serde(default)]
    wins: i32,
    #[serde(default)]
    losses: i32,
    #[serde(default)]
    ot_losses: i32,
}

#[derive(Debug, Deserialize)]
struct LocalizedName {
    default: String,
}

impl From<StandingEntry> for TeamStanding {
    fn from(entry: StandingEntry) -> Self {
        TeamStanding {
            team: entry.team_abbrev.default,
            division: entry.division_name,
            division_rank: entry.division_sequence,
            points: entry.points,
            wins: entry.wins,
            losses: entry.losses,
            ot_losses: entry.ot_losses,
        }
    }
}

impl NhlClient {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}/{}", self.base_url, path);
        debug!(url = %url, "GET");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| transport(SERVICE, e))?;
        read_json(SERVICE, response).await
    }
}

#[async_trait]
impl GameFeed for NhlClient {
    fn name(&self) -> &'static str {
        "nhl"
    }

    async fn season_schedule(&self, team: &str, season: &str) -> Result<Vec<ScheduledGame>> {
        let schedule: ScheduleResponse = self
            .get_json(&format!("club-schedule-season/{}/{}", team, season))
            .await?;
        let mut games: Vec<ScheduledGame> =
            schedule.games.into_iter().map(ScheduledGame::from).collect();
        games.sort_by_key(|g| g.game_date_utc);
        Ok(games)
    }

    async fn boxscore(&self, game_id: GameId) -> Result<Value> {
        self.get_json(&format!("gamecenter/{}/boxscore", game_id))
            .await
    }

    async fn play_by_play(&self, game_id: GameId) -> Result<Value> {
        self.get_json(&format!("gamecenter/{}/play-by-play", game_id))
            .await
    }

    async fn standings(&self, date: NaiveDate) -> Result<Vec<TeamStanding>> {
        let response: StandingsResponse = self
            .get_json(&format!("standings/{}", date.format("%Y-%m-%d")))
            .await?;
        Ok(response
            .standings
            .into_iter()
            .map(TeamStanding::from)
            .collect())
    }
}
