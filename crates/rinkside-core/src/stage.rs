//! Pipeline stages and the delay schedule that decides when each is due.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::game::{GameRecord, GameStatus};
use crate::{Error, Result};

/// One enrichment step of the post-game pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    /// Final score, scorers and the raw boxscore.
    BasicStats,
    /// Goal-by-goal details from the play-by-play.
    DetailedStats,
    /// Game thread lookup on the team subreddit.
    Discussion,
    /// Highlight videos and the written recap.
    Media,
    /// Post-game quotes.
    Quotes,
    /// Final sweep; moves the game to ARCHIVED.
    Archive,
}

impl Stage {
    pub const ALL: [Stage; 6] = [
        Stage::BasicStats,
        Stage::DetailedStats,
        Stage::Discussion,
        Stage::Media,
        Stage::Quotes,
        Stage::Archive,
    ];

    /// Stages that carry a completion marker on the game record.
    pub const MARKED: [Stage; 5] = [
        Stage::BasicStats,
        Stage::DetailedStats,
        Stage::Discussion,
        Stage::Media,
        Stage::Quotes,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Stage::BasicStats => "basic-stats",
            Stage::DetailedStats => "detailed-stats",
            Stage::Discussion => "discussion",
            Stage::Media => "media",
            Stage::Quotes => "quotes",
            Stage::Archive => "archive",
        }
    }

    pub fn from_name(name: &str) -> Option<Stage> {
        Stage::ALL.iter().copied().find(|s| s.name() == name)
    }

    pub fn has_marker(&self) -> bool {
        *self != Stage::Archive
    }

    fn default_delay(&self) -> TimeDelta {
        match self {
            Stage::BasicStats => TimeDelta::zero(),
            Stage::DetailedStats => TimeDelta::minutes(30),
            Stage::Discussion => TimeDelta::hours(2),
            Stage::Media => TimeDelta::hours(4),
            Stage::Quotes => TimeDelta::hours(12),
            Stage::Archive => TimeDelta::hours(24),
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Stage {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Stage::from_name(s).ok_or_else(|| Error::InvalidInput(format!("unknown stage: {}", s)))
    }
}

/// One line of a game's stage plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagePlanEntry {
    pub stage: Stage,
    pub delay_minutes: i64,
    /// `None` until the game is final.
    pub due_at: Option<DateTime<Utc>>,
    pub fetched: bool,
    pub fetched_at: Option<DateTime<Utc>>,
    pub is_next: bool,
}

/// Delay of each stage after the end of a game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageSchedule {
    delays: BTreeMap<Stage, TimeDelta>,
    game_length: TimeDelta,
}

impl Default for StageSchedule {
    fn default() -> Self {
        Self {
            delays: Stage::ALL.iter().map(|s| (*s, s.default_delay())).collect(),
            game_length: TimeDelta::minutes(150),
        }
    }
}

impl StageSchedule {
    pub fn with_delay(mut self, stage: Stage, delay: TimeDelta) -> Self {
        self.delays.insert(stage, delay);
        self
    }

    pub fn with_game_length(mut self, game_length: TimeDelta) -> Self {
        self.game_length = game_length;
        self
    }

    pub fn delay(&self, stage: Stage) -> TimeDelta {
        self.delays
            .get(&stage)
            .copied()
            .unwrap_or_else(|| stage.default_delay())
    }

    pub fn game_length(&self) -> TimeDelta {
        self.game_length
    }

    /// Delays must be non-negative and never decrease along the pipeline.
    pub fn validate(&self) -> Result<()> {
        if self.game_length < TimeDelta::zero() {
            return Err(Error::InvalidInput("game length is negative".to_string()));
        }
        let mut previous: Option<(Stage, TimeDelta)> = None;
        for stage in Stage::ALL {
            let delay = self.delay(stage);
            if delay < TimeDelta::zero() {
                return Err(Error::InvalidInput(format!(
                    "stage '{}' has a negative delay",
                    stage
                )));
            }
            if let Some((prev, prev_delay)) = previous {
                if delay < prev_delay {
                    return Err(Error::InvalidInput(format!(
                        "stage '{}' is due before '{}'",
                        stage, prev
                    )));
                }
            }
            previous = Some((stage, delay));
        }
        Ok(())
    }

    /// When `stage` becomes due for `game`. `None` while the game is not final.
    pub fn due_at(&self, game: &GameRecord, stage: Stage) -> Option<DateTime<Utc>> {
        match game.status {
            GameStatus::Final | GameStatus::Archived => {
                Some(game.pipeline_origin(self.game_length) + self.delay(stage))
            }
            GameStatus::Scheduled | GameStatus::Live => None,
        }
    }

    /// The stage to run now, if any.
    pub fn due_stage(&self, game: &GameRecord, now: DateTime<Utc>) -> Option<Stage> {
        if game.status != GameStatus::Final {
            return None;
        }
        let next = game.markers.next_stage();
        let due_at = self.due_at(game, next)?;
        (now >= due_at).then_some(next)
    }

    pub fn plan(&self, game: &GameRecord) -> Vec<StagePlanEntry> {
        let next = match game.status {
            GameStatus::Archived => None,
            _ => Some(game.markers.next_stage()),
        };
        Stage::ALL
            .iter()
            .map(|stage| {
                let marker = game.markers.get(*stage);
                let fetched = match stage {
                    Stage::Archive => game.status == GameStatus::Archived,
                    _ => marker.map(|m| m.fetched).unwrap_or(false),
                };
                let fetched_at = match stage {
                    Stage::Archive => game.archived_at,
                    _ => marker.and_then(|m| m.fetched_at),
                };
                StagePlanEntry {
                    stage: *stage,
                    delay_minutes: self.delay(*stage).num_minutes(),
                    due_at: self.due_at(game, *stage),
                    fetched,
                    fetched_at,
                    is_next: next == Some(*stage),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GameId;
    use crate::feed::ScheduledGame;
    use chrono::TimeZone;

    fn final_game() -> GameRecord {
        let start = Utc.with_ymd_and_hms(2025, 11, 1, 3, 0, 0).unwrap();
        let scheduled = ScheduledGame {
            game_id: GameId::new(2025020150),
            season: "20252026".to_string(),
            game_type: 2,
            game_date_utc: start,
            away_team: "EDM".to_string(),
            home_team: "SJS".to_string(),
            game_state: "OFF".to_string(),
        };
        let mut game = GameRecord::discovered(&scheduled, GameStatus::Final, start);
        game.final_at = Some(start + TimeDelta::minutes(150));
        game
    }

    #[test]
    fn test_stage_names_round_trip() {
        for stage in Stage::ALL {
            assert_eq!(stage.name().parse::<Stage>().unwrap(), stage);
        }
        assert!("recap".parse::<Stage>().is_err());
    }

    #[test]
    fn test_default_schedule_is_valid() {
        StageSchedule::default().validate().unwrap();
    }

    #[test]
    fn test_decreasing_delay_is_rejected() {
        let schedule = StageSchedule::default().with_delay(Stage::Quotes, TimeDelta::hours(1));
        let err = schedule.validate().unwrap_err();
        assert!(err.to_string().contains("quotes"));
    }

    #[test]
    fn test_negative_delay_is_rejected() {
        let schedule =
            StageSchedule::default().with_delay(Stage::BasicStats, TimeDelta::minutes(-5));
        assert!(schedule.validate().is_err());
    }

    #[test]
    fn test_basic_stats_due_immediately() {
        let schedule = StageSchedule::default();
        let game = final_game();
        let end = game.final_at.unwrap();

        assert_eq!(schedule.due_stage(&game, end - TimeDelta::seconds(1)), None);
        assert_eq!(schedule.due_stage(&game, end), Some(Stage::BasicStats));
    }

    #[test]
    fn test_next_stage_waits_for_its_delay() {
        let schedule = StageSchedule::default();
        let mut game = final_game();
        let end = game.final_at.unwrap();
        game.markers.set(Stage::BasicStats, end);

        assert_eq!(schedule.due_stage(&game, end + TimeDelta::minutes(29)), None);
        assert_eq!(
            schedule.due_stage(&game, end + TimeDelta::minutes(30)),
            Some(Stage::DetailedStats)
        );
    }

    #[test]
    fn test_stages_run_in_order_even_when_overdue() {
        let schedule = StageSchedule::default();
        let game = final_game();
        let much_later = game.final_at.unwrap() + TimeDelta::days(3);
        assert_eq!(
            schedule.due_stage(&game, much_later),
            Some(Stage::BasicStats)
        );
    }

    #[test]
    fn test_archive_due_after_all_markers() {
        let schedule = StageSchedule::default();
        let mut game = final_game();
        let end = game.final_at.unwrap();
        for stage in Stage::MARKED {
            game.markers.set(stage, end);
        }
        assert_eq!(schedule.due_stage(&game, end + TimeDelta::hours(23)), None);
        assert_eq!(
            schedule.due_stage(&game, end + TimeDelta::hours(24)),
            Some(Stage::Archive)
        );
    }

    #[test]
    fn test_no_stage_for_unfinished_or_archived_games() {
        let schedule = StageSchedule::default();
        let later = Utc::now() + TimeDelta::days(365);

        let mut game = final_game();
        game.status = GameStatus::Live;
        assert_eq!(schedule.due_stage(&game, later), None);

        game.status = GameStatus::Archived;
        assert_eq!(schedule.due_stage(&game, later), None);
    }

    #[test]
    fn test_missing_final_at_uses_estimated_end() {
        let schedule = StageSchedule::default().with_game_length(TimeDelta::hours(3));
        let mut game = final_game();
        game.final_at = None;
        let start = game.game_date_utc;

        assert_eq!(schedule.due_stage(&game, start + TimeDelta::minutes(179)), None);
        assert_eq!(
            schedule.due_stage(&game, start + TimeDelta::hours(3)),
            Some(Stage::BasicStats)
        );
    }

    #[test]
    fn test_plan_marks_next_stage() {
        let schedule = StageSchedule::default();
        let mut game = final_game();
        let end = game.final_at.unwrap();
        game.markers.set(Stage::BasicStats, end);

        let plan = schedule.plan(&game);
        assert_eq!(plan.len(), 6);
        assert!(plan[0].fetched);
        assert!(plan[1].is_next);
        assert_eq!(plan[1].due_at, Some(end + TimeDelta::minutes(30)));
        assert_eq!(plan[5].delay_minutes, 24 * 60);
        assert_eq!(plan.iter().filter(|e| e.is_next).count(), 1);
    }

    #[test]
    fn test_plan_for_scheduled_game_has_no_due_times() {
        let schedule = StageSchedule::default();
        let mut game = final_game();
        game.status = GameStatus::Scheduled;
        assert!(schedule.plan(&game).iter().all(|e| e.due_at.is_none()));
    }
}
