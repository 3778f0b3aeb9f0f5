//! Game discovery from the team schedule.

use chrono::{DateTime, TimeDelta, Utc};
use rinkside_core::feed::{GameFeed, season_for};
use rinkside_core::{GameRecord, GameStatus};
use rinkside_db::GameRepo;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::SchedulerResult;

/// How far past a game's estimated end discovery keeps looking at it.
pub const DISCOVERY_LOOKBACK: TimeDelta = TimeDelta::days(1);

/// What one discovery pass changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryReport {
    /// Games seen for the first time.
    pub discovered: u32,
    pub went_live: u32,
    /// Games moved to `FINAL`, new or existing.
    pub finalized: u32,
}

/// Sync the local games table with `team`'s schedule.
///
/// Games that started within `game_length` plus [`DISCOVERY_LOOKBACK`] of
/// `now` are still considered, so a game that crosses midnight UTC is
/// finalized after the date rolls over.
///
/// Unseen games are inserted at their feed status. Known games only move
/// forward: to `LIVE`, or to `FINAL` with `final_at` set to the estimated
/// end of the game, or `now` if that is later.
pub async fn discover_games(
    feed: &dyn GameFeed,
    games: &dyn GameRepo,
    team: &str,
    game_length: TimeDelta,
    now: DateTime<Utc>,
) -> SchedulerResult<DiscoveryReport> {
    let season = season_for(now.date_naive());
    let earliest = now - game_length - DISCOVERY_LOOKBACK;
    let schedule = feed.season_schedule(team, &season).await?;
    debug!(team = %team, season = %season, games = schedule.len(), "Fetched schedule");

    let mut report = DiscoveryReport::default();

    for scheduled in schedule
        .iter()
        .filter(|g| g.game_date_utc >= earliest)
    {
        let Some(status) = GameStatus::from_upstream(&scheduled.game_state) else {
            warn!(
                game_id = %scheduled.game_id,
                game_state = %scheduled.game_state,
                "Unknown game state, skipping"
            );
            continue;
        };

        let final_at = (scheduled.game_date_utc + game_length).max(now);

        let mut record = GameRecord::discovered(scheduled, status, now);
        if status == GameStatus::Final {
            record.final_at = Some(final_at);
        }

        if games.insert_if_absent(&record).await? {
            info!(
                game_id = %record.game_id,
                matchup = %record.matchup(),
                status = %status,
                "Discovered game"
            );
            report.discovered += 1;
            match status {
                GameStatus::Live => report.went_live += 1,
                GameStatus::Final => report.finalized += 1,
                _ => {}
            }
            continue;
        }

        let advanced = match status {
            GameStatus::Live => {
                games
                    .advance_status(scheduled.game_id, GameStatus::Live, None, now)
                    .await?
            }
            GameStatus::Final => {
                games
                    .advance_status(scheduled.game_id, GameStatus::Final, Some(final_at), now)
                    .await?
            }
            _ => false,
        };

        if advanced {
            info!(game_id = %scheduled.game_id, status = %status, "Game status advanced");
            match status {
                GameStatus::Live => report.went_live += 1,
                GameStatus::Final => report.finalized += 1,
                _ => {}
            }
        }
    }

    Ok(report)
}
