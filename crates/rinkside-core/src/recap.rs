//! Written game recaps.

use async_trait::async_trait;
use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use crate::feed::TeamStanding;
use crate::game::GoalDetail;
use crate::{Error, Result};

/// Longest summary line we store.
pub const SUMMARY_LINE_MAX: usize = 200;

/// Everything a recap is written from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecapRequest {
    pub away_team: String,
    pub home_team: String,
    pub away_score: i32,
    pub home_score: i32,
    pub game_date: NaiveDate,
    pub goals: Vec<GoalDetail>,
    /// Team the readers follow; sets the voice of the recap.
    pub team: String,
    /// Where `team` sits in the standings on game day.
    pub standing: Option<TeamStanding>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recap {
    pub summary_line: String,
    pub recap_text: String,
    pub next_game_storyline: Option<String>,
}

#[async_trait]
pub trait RecapWriter: Send + Sync {
    fn name(&self) -> &'static str;

    async fn write(&self, request: &RecapRequest) -> Result<Recap>;
}

/// Writes the template recap. Used when no language model is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateRecapWriter;

#[async_trait]
impl RecapWriter for TemplateRecapWriter {
    fn name(&self) -> &'static str {
        "template"
    }

    async fn write(&self, request: &RecapRequest) -> Result<Recap> {
        Ok(request.fallback())
    }
}

static FENCED_JSON: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```(?:json)?\s*(.*?)```").unwrap());

impl RecapRequest {
    fn winner_and_loser(&self) -> Option<((&str, i32), (&str, i32))> {
        let away = (self.away_team.as_str(), self.away_score);
        let home = (self.home_team.as_str(), self.home_score);
        match self.home_score.cmp(&self.away_score) {
            std::cmp::Ordering::Greater => Some((home, away)),
            std::cmp::Ordering::Less => Some((away, home)),
            std::cmp::Ordering::Equal => None,
        }
    }

    /// The prompt handed to a language model.
    pub fn prompt(&self) -> String {
        format!(
            r#"You are a sports journalist writing a game recap for {team} fans.

GAME DETAILS:
- Teams: {away} @ {home}
- Final score: {away_score} - {home_score}
- Date: {date}{standing}

GOALS:
{goals}

TASK:
Return a JSON object with exactly these keys:
1. "summary_line": one sentence capturing the key moment (max 100 characters)
2. "recap_text": a 3-4 paragraph recap (250-350 words) that opens with the outcome,
   covers the turning points and standout performances, and ends with what comes next
3. "next_game_storyline": one sentence previewing the next game, or null

Keep the tone professional but energetic."#,
            team = self.team,
            away = self.away_team,
            home = self.home_team,
            away_score = self.away_score,
            home_score = self.home_score,
            date = self.game_date.format("%B %d, %Y"),
            standing = self.standing_line(),
            goals = format_goals(&self.goals),
        )
    }

    fn standing_line(&self) -> String {
        match &self.standing {
            Some(s) => format!(
                "\n- {} standing: {} in the {} Division, {} pts ({})",
                s.team,
                ordinal(s.division_rank),
                s.division,
                s.points,
                s.record()
            ),
            None => String::new(),
        }
    }

    /// A plain recap built from the score sheet alone.
    pub fn fallback(&self) -> Recap {
        let Some(((winner, high), (loser, low))) = self.winner_and_loser() else {
            return Recap {
                summary_line: format!(
                    "{} and {} finish level at {}-{}",
                    self.away_team, self.home_team, self.away_score, self.home_score
                ),
                recap_text: format!(
                    "The {} and the {} finished {}-{}.",
                    self.away_team, self.home_team, self.away_score, self.home_score
                ),
                next_game_storyline: None,
            };
        };

        let mut recap_text = format!("The {} defeated the {} {}-{}.", winner, loser, high, low);
        if let Some(first) = self.goals.first() {
            if let (Some(scorer), Some(period)) = (&first.scorer, first.period) {
                recap_text.push_str(&format!(
                    " {} opened the scoring in period {}.",
                    scorer, period
                ));
            }
        }

        Recap {
            summary_line: format!("{} defeat {} {}-{}", winner, loser, high, low),
            recap_text,
            next_game_storyline: None,
        }
    }
}

fn ordinal(n: i32) -> String {
    let suffix = match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{}{}", n, suffix)
}

fn format_goals(goals: &[GoalDetail]) -> String {
    if goals.is_empty() {
        return "No goals scored".to_string();
    }
    goals
        .iter()
        .enumerate()
        .map(|(i, goal)| {
            let assists = if goal.assists.is_empty() {
                String::new()
            } else {
                format!(" (Assists: {})", goal.assists.join(", "))
            };
            format!(
                "{}. Period {}, {} - {} ({}) [{}]{}",
                i + 1,
                goal.period.map(|p| p.to_string()).unwrap_or_else(|| "?".to_string()),
                goal.time.as_deref().unwrap_or("?"),
                goal.scorer.as_deref().unwrap_or("Unknown"),
                goal.team.as_deref().unwrap_or("?"),
                goal.strength.as_deref().unwrap_or("ev").to_uppercase(),
                assists
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Deserialize)]
struct RecapAnswer {
    #[serde(default)]
    summary_line: String,
    #[serde(default)]
    recap_text: String,
    #[serde(default)]
    next_game_storyline: Option<String>,
}

/// Parse a model answer, which may wrap its JSON in a fenced code block.
pub fn parse_recap_answer(text: &str) -> Result<Recap> {
    let body = FENCED_JSON
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .unwrap_or(text)
        .trim();

    let answer: RecapAnswer = serde_json::from_str(body)
        .map_err(|e| Error::Malformed(format!("recap answer is not JSON: {}", e)))?;

    if answer.recap_text.trim().is_empty() {
        return Err(Error::Malformed("recap answer has no recap_text".to_string()));
    }

    Ok(Recap {
        summary_line: answer.summary_line.chars().take(SUMMARY_LINE_MAX).collect(),
        recap_text: answer.recap_text,
        next_game_storyline: answer.next_game_storyline.filter(|s| !s.trim().is_empty()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(away_score: i32, home_score: i32) -> RecapRequest {
        RecapRequest {
            away_team: "SJS".to_string(),
            home_team: "LAK".to_string(),
            away_score,
            home_score,
            game_date: NaiveDate::from_ymd_opt(2025, 11, 20).unwrap(),
            goals: vec![GoalDetail {
                period: Some(1),
                time: Some("04:12".to_string()),
                scorer: Some("W. Smith".to_string()),
                team: Some("SJS".to_string()),
                ..GoalDetail::default()
            }],
            team: "SJS".to_string(),
            standing: None,
        }
    }

    #[test]
    fn test_fallback_names_the_winner() {
        let recap = request(3, 1).fallback();
        assert_eq!(recap.summary_line, "SJS defeat LAK 3-1");
        assert!(recap.recap_text.starts_with("The SJS defeated the LAK 3-1."));
        assert!(recap.recap_text.contains("W. Smith opened the scoring in period 1"));

        let recap = request(2, 5).fallback();
        assert_eq!(recap.summary_line, "LAK defeat SJS 5-2");
    }

    #[test]
    fn test_fallback_handles_level_score() {
        let recap = request(2, 2).fallback();
        assert!(recap.summary_line.contains("level"));
    }

    #[test]
    fn test_prompt_lists_goals() {
        let prompt = request(3, 1).prompt();
        assert!(prompt.contains("SJS @ LAK"));
        assert!(prompt.contains("1. Period 1, 04:12 - W. Smith (SJS) [EV]"));
        assert!(prompt.contains("November 20, 2025"));
    }

    #[test]
    fn test_prompt_includes_standing() {
        assert!(!request(3, 1).prompt().contains("standing:"));

        let mut with_standing = request(3, 1);
        with_standing.standing = Some(TeamStanding {
            team: "SJS".to_string(),
            division: "Pacific".to_string(),
            division_rank: 2,
            points: 31,
            wins: 14,
            losses: 8,
            ot_losses: 3,
        });
        let prompt = with_standing.prompt();
        assert!(prompt.contains("- SJS standing: 2nd in the Pacific Division, 31 pts (14-8-3)"));
    }

    #[test]
    fn test_ordinal() {
        assert_eq!(ordinal(1), "1st");
        assert_eq!(ordinal(3), "3rd");
        assert_eq!(ordinal(8), "8th");
        assert_eq!(ordinal(12), "12th");
        assert_eq!(ordinal(22), "22nd");
    }

    #[test]
    fn test_parse_plain_json() {
        let recap = parse_recap_answer(
            r#"{"summary_line": "Smith strikes early", "recap_text": "Body.", "next_game_storyline": null}"#,
        )
        .unwrap();
        assert_eq!(recap.summary_line, "Smith strikes early");
        assert_eq!(recap.next_game_storyline, None);
    }

    #[test]
    fn test_parse_fenced_json() {
        let answer = "Here you go:\n```json\n{\"summary_line\": \"A\", \"recap_text\": \"B\", \"next_game_storyline\": \"C\"}\n```\nEnjoy";
        let recap = parse_recap_answer(answer).unwrap();
        assert_eq!(recap.recap_text, "B");
        assert_eq!(recap.next_game_storyline.as_deref(), Some("C"));
    }

    #[test]
    fn test_parse_truncates_summary() {
        let long = "x".repeat(500);
        let answer = format!(r#"{{"summary_line": "{}", "recap_text": "B"}}"#, long);
        let recap = parse_recap_answer(&answer).unwrap();
        assert_eq!(recap.summary_line.len(), SUMMARY_LINE_MAX);
    }

    #[test]
    fn test_parse_rejects_prose() {
        assert!(parse_recap_answer("The Sharks won.").is_err());
        assert!(parse_recap_answer(r#"{"summary_line": "only"}"#).is_err());
    }
}
