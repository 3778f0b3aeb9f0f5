//! The persisted game record and its stage markers.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::feed::ScheduledGame;
use crate::stage::Stage;
use crate::{Error, GameId};

/// Where a game is in its lifecycle.
///
/// Variants are declared in lifecycle order; a status only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameStatus {
    Scheduled,
    Live,
    Final,
    Archived,
}

impl GameStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameStatus::Scheduled => "SCHEDULED",
            GameStatus::Live => "LIVE",
            GameStatus::Final => "FINAL",
            GameStatus::Archived => "ARCHIVED",
        }
    }

    /// Map the schedule feed's `gameState` code onto our lifecycle.
    pub fn from_upstream(game_state: &str) -> Option<Self> {
        match game_state {
            "FUT" | "PRE" => Some(GameStatus::Scheduled),
            "LIVE" | "CRIT" => Some(GameStatus::Live),
            "FINAL" | "OFF" => Some(GameStatus::Final),
            _ => None,
        }
    }

    pub fn can_advance_to(&self, next: GameStatus) -> bool {
        next > *self
    }
}

impl std::fmt::Display for GameStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for GameStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SCHEDULED" => Ok(GameStatus::Scheduled),
            "LIVE" => Ok(GameStatus::Live),
            "FINAL" => Ok(GameStatus::Final),
            "ARCHIVED" => Ok(GameStatus::Archived),
            other => Err(Error::InvalidInput(format!("unknown game status: {}", other))),
        }
    }
}

/// Completion marker for one stage. Once fetched, it stays fetched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageMarker {
    pub fetched: bool,
    pub fetched_at: Option<DateTime<Utc>>,
}

impl StageMarker {
    pub fn done(at: DateTime<Utc>) -> Self {
        Self {
            fetched: true,
            fetched_at: Some(at),
        }
    }

    /// Set the marker. The first completion time wins.
    /// Returns whether the marker changed.
    pub fn set(&mut self, at: DateTime<Utc>) -> bool {
        if self.fetched {
            return false;
        }
        self.fetched = true;
        self.fetched_at = Some(at);
        true
    }
}

/// One marker per stage that has one (every stage but archive).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageMarkers {
    pub basic_stats: StageMarker,
    pub detailed_stats: StageMarker,
    pub discussion: StageMarker,
    pub media: StageMarker,
    pub quotes: StageMarker,
}

impl StageMarkers {
    pub fn get(&self, stage: Stage) -> Option<&StageMarker> {
        match stage {
            Stage::BasicStats => Some(&self.basic_stats),
            Stage::DetailedStats => Some(&self.detailed_stats),
            Stage::Discussion => Some(&self.discussion),
            Stage::Media => Some(&self.media),
            Stage::Quotes => Some(&self.quotes),
            Stage::Archive => None,
        }
    }

    fn get_mut(&mut self, stage: Stage) -> Option<&mut StageMarker> {
        match stage {
            Stage::BasicStats => Some(&mut self.basic_stats),
            Stage::DetailedStats => Some(&mut self.detailed_stats),
            Stage::Discussion => Some(&mut self.discussion),
            Stage::Media => Some(&mut self.media),
            Stage::Quotes => Some(&mut self.quotes),
            Stage::Archive => None,
        }
    }

    pub fn is_fetched(&self, stage: Stage) -> bool {
        self.get(stage).map(|m| m.fetched).unwrap_or(false)
    }

    /// Set the marker for `stage`. Returns whether anything changed.
    pub fn set(&mut self, stage: Stage, at: DateTime<Utc>) -> bool {
        self.get_mut(stage).map(|m| m.set(at)).unwrap_or(false)
    }

    pub fn all_fetched(&self) -> bool {
        Stage::MARKED.iter().all(|s| self.is_fetched(*s))
    }

    /// Stages still waiting for their marker, in pipeline order.
    pub fn pending(&self) -> Vec<Stage> {
        Stage::MARKED
            .iter()
            .copied()
            .filter(|s| !self.is_fetched(*s))
            .collect()
    }

    /// The first stage without a marker, or archive when everything is fetched.
    pub fn next_stage(&self) -> Stage {
        self.pending().first().copied().unwrap_or(Stage::Archive)
    }
}

/// One goal as reported by the play-by-play feed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalDetail {
    pub period: Option<i32>,
    pub time: Option<String>,
    pub scorer: Option<String>,
    pub scorer_id: Option<i64>,
    pub assists: Vec<String>,
    pub team: Option<String>,
    /// `ev`, `pp` or `sh`.
    pub strength: Option<String>,
    pub empty_net: bool,
}

/// A game tracked by the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameRecord {
    pub game_id: GameId,
    pub season: String,
    pub game_type: i32,
    pub game_date_utc: DateTime<Utc>,
    pub away_team: String,
    pub home_team: String,
    pub away_score: Option<i32>,
    pub home_score: Option<i32>,
    pub status: GameStatus,
    /// Origin of the stage delays: the (estimated) end of the game.
    pub final_at: Option<DateTime<Utc>>,
    pub markers: StageMarkers,

    pub scorers: Vec<String>,
    pub goals: Vec<GoalDetail>,
    pub raw_boxscore: Option<serde_json::Value>,
    pub discussion_thread_id: Option<String>,
    pub discussion_url: Option<String>,
    pub discussion_comment_count: Option<i32>,
    pub summary_line: Option<String>,
    pub recap_text: Option<String>,
    pub next_game_storyline: Option<String>,

    pub failed_attempts: i32,
    pub last_error: Option<String>,
    pub claimed_by: Option<String>,
    pub claimed_at: Option<DateTime<Utc>>,

    pub status_updated_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub archived_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl GameRecord {
    /// A fresh record for a game seen on the schedule for the first time.
    pub fn discovered(game: &ScheduledGame, status: GameStatus, now: DateTime<Utc>) -> Self {
        Self {
            game_id: game.game_id,
            season: game.season.clone(),
            game_type: game.game_type,
            game_date_utc: game.game_date_utc,
            away_team: game.away_team.clone(),
            home_team: game.home_team.clone(),
            away_score: None,
            home_score: None,
            status,
            final_at: None,
            markers: StageMarkers::default(),
            scorers: Vec::new(),
            goals: Vec::new(),
            raw_boxscore: None,
            discussion_thread_id: None,
            discussion_url: None,
            discussion_comment_count: None,
            summary_line: None,
            recap_text: None,
            next_game_storyline: None,
            failed_attempts: 0,
            last_error: None,
            claimed_by: None,
            claimed_at: None,
            status_updated_at: Some(now),
            completed_at: None,
            archived_at: None,
            created_at: now,
        }
    }

    /// Scheduled start plus the typical length of a game.
    pub fn estimated_end(&self, game_length: TimeDelta) -> DateTime<Utc> {
        self.game_date_utc + game_length
    }

    /// When the game counts as over for the stage clock.
    pub fn pipeline_origin(&self, game_length: TimeDelta) -> DateTime<Utc> {
        self.final_at
            .unwrap_or_else(|| self.estimated_end(game_length))
    }

    pub fn is_in_flight(&self) -> bool {
        self.status == GameStatus::Final
    }

    pub fn involves(&self, team: &str) -> bool {
        self.away_team.eq_ignore_ascii_case(team) || self.home_team.eq_ignore_ascii_case(team)
    }

    /// `"AWY @ HOM"`, for log lines.
    pub fn matchup(&self) -> String {
        format!("{} @ {}", self.away_team, self.home_team)
    }

    pub fn can_archive(&self) -> bool {
        self.markers.all_fetched()
    }

    /// The claim is held by someone other than `worker` and has not expired.
    pub fn is_claimed_by_other(&self, worker: &str, lease: TimeDelta, now: DateTime<Utc>) -> bool {
        match (&self.claimed_by, self.claimed_at) {
            (Some(owner), Some(at)) => owner != worker && at + lease > now,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> GameRecord {
        let game = ScheduledGame {
            game_id: GameId::new(2025020001),
            season: "20252026".to_string(),
            game_type: 2,
            game_date_utc: Utc.with_ymd_and_hms(2025, 10, 9, 2, 0, 0).unwrap(),
            away_team: "SJS".to_string(),
            home_team: "VGK".to_string(),
            game_state: "FUT".to_string(),
        };
        GameRecord::discovered(&game, GameStatus::Scheduled, Utc::now())
    }

    #[test]
    fn test_status_only_moves_forward() {
        assert!(GameStatus::Scheduled.can_advance_to(GameStatus::Live));
        assert!(GameStatus::Scheduled.can_advance_to(GameStatus::Final));
        assert!(GameStatus::Final.can_advance_to(GameStatus::Archived));
        assert!(!GameStatus::Final.can_advance_to(GameStatus::Live));
        assert!(!GameStatus::Archived.can_advance_to(GameStatus::Archived));
    }

    #[test]
    fn test_upstream_state_mapping() {
        assert_eq!(GameStatus::from_upstream("FUT"), Some(GameStatus::Scheduled));
        assert_eq!(GameStatus::from_upstream("CRIT"), Some(GameStatus::Live));
        assert_eq!(GameStatus::from_upstream("OFF"), Some(GameStatus::Final));
        assert_eq!(GameStatus::from_upstream("PPD"), None);
    }

    #[test]
    fn test_status_round_trips_through_str() {
        for status in [
            GameStatus::Scheduled,
            GameStatus::Live,
            GameStatus::Final,
            GameStatus::Archived,
        ] {
            assert_eq!(status.as_str().parse::<GameStatus>().unwrap(), status);
        }
        assert!("COMPLETE".parse::<GameStatus>().is_err());
    }

    #[test]
    fn test_marker_keeps_first_timestamp() {
        let first = Utc.with_ymd_and_hms(2025, 10, 9, 5, 0, 0).unwrap();
        let later = first + TimeDelta::hours(3);

        let mut marker = StageMarker::default();
        assert!(marker.set(first));
        assert!(!marker.set(later));
        assert_eq!(marker.fetched_at, Some(first));
    }

    #[test]
    fn test_next_stage_follows_pipeline_order() {
        let now = Utc::now();
        let mut markers = StageMarkers::default();
        assert_eq!(markers.next_stage(), Stage::BasicStats);

        markers.set(Stage::BasicStats, now);
        markers.set(Stage::Discussion, now);
        assert_eq!(markers.next_stage(), Stage::DetailedStats);
        assert_eq!(
            markers.pending(),
            vec![Stage::DetailedStats, Stage::Media, Stage::Quotes]
        );

        for stage in Stage::MARKED {
            markers.set(stage, now);
        }
        assert!(markers.all_fetched());
        assert_eq!(markers.next_stage(), Stage::Archive);
    }

    #[test]
    fn test_archive_has_no_marker() {
        let mut markers = StageMarkers::default();
        assert!(!markers.set(Stage::Archive, Utc::now()));
        assert!(markers.get(Stage::Archive).is_none());
    }

    #[test]
    fn test_pipeline_origin_prefers_final_at() {
        let mut game = sample();
        let length = TimeDelta::minutes(150);
        assert_eq!(game.pipeline_origin(length), game.game_date_utc + length);

        let final_at = game.game_date_utc + TimeDelta::hours(5);
        game.final_at = Some(final_at);
        assert_eq!(game.pipeline_origin(length), final_at);
    }

    #[test]
    fn test_claim_expiry() {
        let mut game = sample();
        let now = Utc::now();
        let lease = TimeDelta::minutes(15);
        assert!(!game.is_claimed_by_other("a", lease, now));

        game.claimed_by = Some("b".to_string());
        game.claimed_at = Some(now - TimeDelta::minutes(5));
        assert!(game.is_claimed_by_other("a", lease, now));
        assert!(!game.is_claimed_by_other("b", lease, now));

        game.claimed_at = Some(now - TimeDelta::minutes(20));
        assert!(!game.is_claimed_by_other("a", lease, now));
    }

    #[test]
    fn test_involves_is_case_insensitive() {
        let game = sample();
        assert!(game.involves("sjs"));
        assert!(game.involves("VGK"));
        assert!(!game.involves("LAK"));
        assert_eq!(game.matchup(), "SJS @ VGK");
    }
}
