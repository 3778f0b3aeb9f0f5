//! The league game feed: team schedules, boxscores and play-by-play.

use async_trait::async_trait;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::game::GoalDetail;
use crate::{Error, GameId, Result};

/// A game as listed on a team's season schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledGame {
    pub game_id: GameId,
    pub season: String,
    pub game_type: i32,
    pub game_date_utc: DateTime<Utc>,
    pub away_team: String,
    pub home_team: String,
    /// Raw feed state code (`FUT`, `PRE`, `LIVE`, `CRIT`, `FINAL`, `OFF`, ...).
    pub game_state: String,
}

/// One team's line in the league standings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamStanding {
    pub team: String,
    pub division: String,
    /// Place within the division, from 1.
    pub division_rank: i32,
    pub points: i32,
    pub wins: i32,
    pub losses: i32,
    pub ot_losses: i32,
}

impl TeamStanding {
    /// `"9-12-2"`.
    pub fn record(&self) -> String {
        format!("{}-{}-{}", self.wins, self.losses, self.ot_losses)
    }
}

/// `team`'s line, if it is in `standings`.
pub fn standing_for<'a>(standings: &'a [TeamStanding], team: &str) -> Option<&'a TeamStanding> {
    standings.iter().find(|s| s.team.eq_ignore_ascii_case(team))
}

/// Source of schedule and game data.
#[async_trait]
pub trait GameFeed: Send + Sync {
    fn name(&self) -> &'static str;

    /// Every game of `team` in `season` (`"20252026"`), in date order.
    async fn season_schedule(&self, team: &str, season: &str) -> Result<Vec<ScheduledGame>>;

    async fn boxscore(&self, game_id: GameId) -> Result<Value>;

    async fn play_by_play(&self, game_id: GameId) -> Result<Value>;

    /// League standings as of `date`.
    async fn standings(&self, date: NaiveDate) -> Result<Vec<TeamStanding>>;
}

/// Season code for a date: seasons start in October, so `2025-11-01` and
/// `2026-03-01` both belong to `"20252026"`.
pub fn season_for(date: NaiveDate) -> String {
    let year = if date.month() >= 10 {
        date.year()
    } else {
        date.year() - 1
    };
    format!("{}{}", year, year + 1)
}

/// `game_id`'s position in the team's season among games of the same type,
/// counting from 1. `None` if the game is not on the schedule.
pub fn team_game_number(schedule: &[ScheduledGame], game_id: GameId) -> Option<i64> {
    let game = schedule.iter().find(|g| g.game_id == game_id)?;
    let played = schedule
        .iter()
        .filter(|g| g.game_type == game.game_type && g.game_date_utc <= game.game_date_utc)
        .count();
    i64::try_from(played).ok()
}

/// The parts of a boxscore the basic-stats stage keeps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoxscoreSummary {
    pub away_team: String,
    pub home_team: String,
    pub away_score: i32,
    pub home_score: i32,
    pub scorers: Vec<String>,
}

pub fn summarize_boxscore(raw: &Value) -> Result<BoxscoreSummary> {
    let team = |side: &str| -> Result<(String, i32)> {
        let node = raw
            .get(side)
            .ok_or_else(|| Error::Malformed(format!("boxscore has no {}", side)))?;
        let abbrev = node
            .get("abbrev")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::Malformed(format!("boxscore {} has no abbrev", side)))?;
        let score = node.get("score").and_then(Value::as_i64).unwrap_or(0);
        Ok((abbrev.to_string(), score as i32))
    };

    let (away_team, away_score) = team("awayTeam")?;
    let (home_team, home_score) = team("homeTeam")?;

    let mut scorers = Vec::new();
    if let Some(stats) = raw.get("playerByGameStats") {
        for side in ["awayTeam", "homeTeam"] {
            for role in ["forwards", "defense"] {
                let players = stats
                    .get(side)
                    .and_then(|s| s.get(role))
                    .and_then(Value::as_array);
                for player in players.into_iter().flatten() {
                    let goals = player.get("goals").and_then(Value::as_i64).unwrap_or(0);
                    if goals <= 0 {
                        continue;
                    }
                    if let Some(name) = player
                        .get("name")
                        .and_then(|n| n.get("default"))
                        .and_then(Value::as_str)
                    {
                        scorers.push(name.to_string());
                    }
                }
            }
        }
    }

    Ok(BoxscoreSummary {
        away_team,
        home_team,
        away_score,
        home_score,
        scorers,
    })
}

/// Every goal in a play-by-play document, in the order played.
pub fn extract_goals(play_by_play: &Value) -> Vec<GoalDetail> {
    let Some(plays) = play_by_play.get("plays").and_then(Value::as_array) else {
        return Vec::new();
    };

    let text = |v: Option<&Value>| v.and_then(Value::as_str).map(str::to_string);

    plays
        .iter()
        .filter(|p| p.get("typeDescKey").and_then(Value::as_str) == Some("goal"))
        .map(|play| {
            let details = play.get("details");
            let detail = |key: &str| details.and_then(|d| d.get(key));
            let assists = ["assist1PlayerName", "assist2PlayerName"]
                .into_iter()
                .filter_map(|k| text(detail(k)))
                .collect();
            GoalDetail {
                period: play
                    .get("periodDescriptor")
                    .and_then(|p| p.get("number"))
                    .and_then(Value::as_i64)
                    .map(|n| n as i32),
                time: text(play.get("timeInPeriod")),
                scorer: text(detail("scoringPlayerName")),
                scorer_id: detail("scoringPlayerId").and_then(Value::as_i64),
                assists,
                team: text(play.get("teamAbbrev")),
                strength: text(detail("strength")),
                empty_net: detail("emptyNet")
                    .and_then(Value::as_bool)
                    .unwrap_or(false),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_season_for() {
        let d = |y, m, day| NaiveDate::from_ymd_opt(y, m, day).unwrap();
        assert_eq!(season_for(d(2025, 10, 1)), "20252026");
        assert_eq!(season_for(d(2026, 4, 15)), "20252026");
        assert_eq!(season_for(d(2025, 9, 30)), "20242025");
    }

    #[test]
    fn test_team_game_number() {
        use chrono::TimeZone;
        let game = |id: i64, game_type: i32, day: u32| ScheduledGame {
            game_id: GameId::new(id),
            season: "20252026".to_string(),
            game_type,
            game_date_utc: Utc.with_ymd_and_hms(2025, 10, day, 2, 0, 0).unwrap(),
            away_team: "SJS".to_string(),
            home_team: "VGK".to_string(),
            game_state: "OFF".to_string(),
        };
        let schedule = vec![game(1, 1, 1), game(2, 2, 9), game(3, 2, 11), game(4, 2, 14)];

        assert_eq!(team_game_number(&schedule, GameId::new(2)), Some(1));
        assert_eq!(team_game_number(&schedule, GameId::new(4)), Some(3));
        assert_eq!(team_game_number(&schedule, GameId::new(1)), Some(1));
        assert_eq!(team_game_number(&schedule, GameId::new(9)), None);
    }

    #[test]
    fn test_standing_for_team() {
        let standing = |team: &str, rank| TeamStanding {
            team: team.to_string(),
            division: "Pacific".to_string(),
            division_rank: rank,
            points: 20,
            wins: 9,
            losses: 12,
            ot_losses: 2,
        };
        let standings = vec![standing("VGK", 1), standing("SJS", 8)];

        let sharks = standing_for(&standings, "sjs").unwrap();
        assert_eq!(sharks.division_rank, 8);
        assert_eq!(sharks.record(), "9-12-2");
        assert!(standing_for(&standings, "BOS").is_none());
    }

    #[test]
    fn test_summarize_boxscore() {
        let raw = json!({
            "awayTeam": {"abbrev": "SJS", "score": 4},
            "homeTeam": {"abbrev": "ANA", "score": 2},
            "playerByGameStats": {
                "awayTeam": {
                    "forwards": [
                        {"name": {"default": "M. Celebrini"}, "goals": 2},
                        {"name": {"default": "W. Smith"}, "goals": 0}
                    ],
                    "defense": [{"name": {"default": "J. Thrun"}, "goals": 1}],
                    "goalies": [{"name": {"default": "Y. Nedeljkovic"}, "goals": 1}]
                },
                "homeTeam": {
                    "forwards": [{"name": {"default": "L. Carlsson"}, "goals": 2}]
                }
            }
        });

        let summary = summarize_boxscore(&raw).unwrap();
        assert_eq!(summary.away_team, "SJS");
        assert_eq!(summary.home_score, 2);
        assert_eq!(
            summary.scorers,
            vec!["M. Celebrini", "J. Thrun", "L. Carlsson"]
        );
    }

    #[test]
    fn test_summarize_boxscore_requires_teams() {
        let err = summarize_boxscore(&json!({"homeTeam": {"abbrev": "SJS"}})).unwrap_err();
        assert!(matches!(err, Error::Malformed(_)));
    }

    #[test]
    fn test_extract_goals() {
        let pbp = json!({
            "plays": [
                {"typeDescKey": "faceoff"},
                {
                    "typeDescKey": "goal",
                    "periodDescriptor": {"number": 2},
                    "timeInPeriod": "05:23",
                    "teamAbbrev": "SJS",
                    "details": {
                        "scoringPlayerName": "W. Smith",
                        "scoringPlayerId": 8484801,
                        "assist1PlayerName": "M. Celebrini",
                        "strength": "pp"
                    }
                },
                {
                    "typeDescKey": "goal",
                    "periodDescriptor": {"number": 3},
                    "timeInPeriod": "19:02",
                    "teamAbbrev": "SJS",
                    "details": {"scoringPlayerName": "T. Hertl", "emptyNet": true}
                }
            ]
        });

        let goals = extract_goals(&pbp);
        assert_eq!(goals.len(), 2);
        assert_eq!(goals[0].period, Some(2));
        assert_eq!(goals[0].assists, vec!["M. Celebrini"]);
        assert_eq!(goals[0].strength.as_deref(), Some("pp"));
        assert!(!goals[0].empty_net);
        assert!(goals[1].empty_net);
        assert!(goals[1].assists.is_empty());
    }

    #[test]
    fn test_extract_goals_without_plays() {
        assert!(extract_goals(&json!({})).is_empty());
    }
}
