//! Executes one pipeline stage for one game.

use chrono::{DateTime, Utc};
use rinkside_config::{PipelineConfig, QueryContext};
use rinkside_core::discussion::ThreadQuery;
use rinkside_core::feed::{
    TeamStanding, extract_goals, standing_for, summarize_boxscore, team_game_number,
};
use rinkside_core::media::HighlightQuery;
use rinkside_core::recap::RecapRequest;
use rinkside_core::{GameRecord, Stage};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::{SchedulerError, SchedulerResult, Sources, Stores};

/// Result of running a stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    Completed,
    Failed { message: String },
}

impl StageOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, StageOutcome::Completed)
    }
}

/// Runs stages against the configured sources and stores.
#[derive(Clone)]
pub struct StageRunner {
    sources: Sources,
    stores: Stores,
    config: Arc<PipelineConfig>,
}

impl StageRunner {
    pub fn new(sources: Sources, stores: Stores, config: Arc<PipelineConfig>) -> Self {
        Self {
            sources,
            stores,
            config,
        }
    }

    /// Run `stage` for `game`. On success the stage's marker is set, or the
    /// game is archived for [`Stage::Archive`].
    pub async fn run_stage(
        &self,
        game: &GameRecord,
        stage: Stage,
        now: DateTime<Utc>,
    ) -> StageOutcome {
        debug!(game_id = %game.game_id, stage = %stage, "Running stage");
        let result = match stage {
            Stage::Archive => self.archive(game, now).await,
            _ => self.complete(game, stage, now).await,
        };
        match result {
            Ok(()) => {
                info!(game_id = %game.game_id, stage = %stage, "Stage completed");
                StageOutcome::Completed
            }
            Err(e) => {
                warn!(game_id = %game.game_id, stage = %stage, error = %e, "Stage failed");
                StageOutcome::Failed {
                    message: e.to_string(),
                }
            }
        }
    }

    /// Give up on `stage` after repeated failures: mark it done without its
    /// payload so later stages can run. Settling `archive` marks every
    /// pending stage and archives the game.
    pub async fn settle(
        &self,
        game: &GameRecord,
        stage: Stage,
        now: DateTime<Utc>,
    ) -> SchedulerResult<()> {
        let games = &self.stores.games;
        match stage {
            Stage::Archive => {
                for pending in game.markers.pending() {
                    games.set_marker(game.game_id, pending, now).await?;
                }
                games.archive(game.game_id, now).await?;
            }
            _ => {
                games.set_marker(game.game_id, stage, now).await?;
            }
        }
        Ok(())
    }

    async fn complete(
        &self,
        game: &GameRecord,
        stage: Stage,
        now: DateTime<Utc>,
    ) -> SchedulerResult<()> {
        match stage {
            Stage::BasicStats => self.basic_stats(game).await?,
            Stage::DetailedStats => self.detailed_stats(game).await?,
            Stage::Discussion => self.discussion(game).await?,
            Stage::Media => self.media(game, now).await?,
            Stage::Quotes => self.quotes(game, now).await?,
            // No payload; the store refuses a marker for it below.
            Stage::Archive => {}
        }
        self.stores.games.set_marker(game.game_id, stage, now).await?;
        Ok(())
    }

    async fn basic_stats(&self, game: &GameRecord) -> SchedulerResult<()> {
        let raw = self.sources.feed.boxscore(game.game_id).await?;
        let summary = summarize_boxscore(&raw)?;
        debug!(
            game_id = %game.game_id,
            away_score = summary.away_score,
            home_score = summary.home_score,
            "Boxscore fetched"
        );
        self.stores
            .games
            .save_basic_stats(game.game_id, &summary, &raw)
            .await?;
        Ok(())
    }

    async fn detailed_stats(&self, game: &GameRecord) -> SchedulerResult<()> {
        let play_by_play = self.sources.feed.play_by_play(game.game_id).await?;
        let goals = extract_goals(&play_by_play);
        debug!(game_id = %game.game_id, goals = goals.len(), "Goals extracted");
        self.stores.games.save_goals(game.game_id, &goals).await?;
        Ok(())
    }

    async fn discussion(&self, game: &GameRecord) -> SchedulerResult<()> {
        let query = ThreadQuery {
            away_team: game.away_team.clone(),
            home_team: game.home_team.clone(),
            game_date: game.game_date_utc.date_naive(),
            subreddit: self.config.subreddit.clone(),
            comment_limit: self.config.comment_limit,
        };
        let thread = self.sources.discussion.find_thread(&query).await?;
        if thread.is_none() {
            info!(game_id = %game.game_id, "No game thread; stage completes empty");
        }
        self.stores
            .games
            .save_discussion(game.game_id, thread.as_ref())
            .await?;
        Ok(())
    }

    /// The followed team's game number, used by the review-video query.
    async fn game_number(&self, game: &GameRecord) -> Option<i64> {
        match self
            .sources
            .feed
            .season_schedule(&self.config.team, &game.season)
            .await
        {
            Ok(schedule) => team_game_number(&schedule, game.game_id),
            Err(e) => {
                warn!(game_id = %game.game_id, error = %e, "Could not number game");
                None
            }
        }
    }

    /// The followed team's standing on game day. Recaps are written without
    /// it when the standings cannot be fetched.
    async fn standing(&self, game: &GameRecord) -> Option<TeamStanding> {
        let date = game.game_date_utc.date_naive();
        match self.sources.feed.standings(date).await {
            Ok(standings) => standing_for(&standings, &self.config.team).cloned(),
            Err(e) => {
                warn!(game_id = %game.game_id, error = %e, "Could not fetch standings");
                None
            }
        }
    }

    async fn media(&self, game: &GameRecord, now: DateTime<Utc>) -> SchedulerResult<()> {
        let queries = &self.config.media;
        let context = QueryContext::for_game(game, &self.config.team, self.game_number(game).await);
        let query = HighlightQuery {
            game_id: game.game_id,
            published_after: game.game_date_utc,
            official_query: context.interpolate(&queries.official_query),
            review_query: context.interpolate(&queries.review_query),
            review_channel: queries.review_channel.clone(),
            review_keyword: queries.review_keyword.clone(),
            max_results: queries.max_results,
        };

        let results = self.sources.highlights.search(&query).await?;
        let mut inserted = 0;
        for candidate in results.into_candidates() {
            if self
                .stores
                .videos
                .insert(game.game_id, &candidate, now)
                .await?
            {
                inserted += 1;
            }
        }
        debug!(game_id = %game.game_id, inserted, "Highlight videos stored");

        let request = RecapRequest {
            away_team: game.away_team.clone(),
            home_team: game.home_team.clone(),
            away_score: game.away_score.unwrap_or(0),
            home_score: game.home_score.unwrap_or(0),
            game_date: game.game_date_utc.date_naive(),
            goals: game.goals.clone(),
            team: self.config.team.clone(),
            standing: self.standing(game).await,
        };
        let recap = match self.sources.recaps.write(&request).await {
            Ok(recap) => recap,
            Err(e) => {
                warn!(
                    game_id = %game.game_id,
                    writer = self.sources.recaps.name(),
                    error = %e,
                    "Recap generation failed, using template"
                );
                request.fallback()
            }
        };
        self.stores.games.save_recap(game.game_id, &recap, now).await?;
        Ok(())
    }

    async fn quotes(&self, game: &GameRecord, now: DateTime<Utc>) -> SchedulerResult<()> {
        let quotes = self.sources.quotes.quotes(game).await?;
        let count = quotes.len();
        for quote in quotes {
            self.stores.quotes.insert(game.game_id, quote, now).await?;
        }
        debug!(game_id = %game.game_id, count, "Quotes stored");
        Ok(())
    }

    /// Retry each unfinished stage once, then archive if nothing is left.
    async fn archive(&self, game: &GameRecord, now: DateTime<Utc>) -> SchedulerResult<()> {
        for stage in game.markers.pending() {
            let current = self.stores.games.get(game.game_id).await?;
            if let Err(e) = self.complete(&current, stage, now).await {
                warn!(game_id = %game.game_id, stage = %stage, error = %e, "Retry before archive failed");
            }
        }

        let current = self.stores.games.get(game.game_id).await?;
        if !current.can_archive() {
            let stages = current
                .markers
                .pending()
                .iter()
                .map(|s| s.name())
                .collect::<Vec<_>>()
                .join(", ");
            return Err(SchedulerError::Unfinished {
                game_id: game.game_id.to_string(),
                stages,
            });
        }

        self.stores.games.archive(game.game_id, now).await?;
        info!(game_id = %game.game_id, matchup = %game.matchup(), "Game archived");
        Ok(())
    }
}
