//! Variable interpolation for search-query templates.
//!
//! Supports variables like:
//! - `${away}` / `${home}` - Team abbreviations
//! - `${team}` - The followed team
//! - `${date}` - Game date, long form (`November 20 2025`)
//! - `${iso_date}` - Game date (`2025-11-20`)
//! - `${season}` - Short season (`25-26`)
//! - `${season_code}` - Season code (`20252026`)
//! - `${game_number}` - The followed team's game number in the season

use chrono::NaiveDate;
use regex::Regex;
use rinkside_core::GameRecord;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Names `interpolate` resolves without custom variables.
pub const KNOWN_VARIABLES: [&str; 8] = [
    "away",
    "home",
    "team",
    "date",
    "iso_date",
    "season",
    "season_code",
    "game_number",
];

static VAR_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([a-zA-Z_][a-zA-Z0-9_]*)\}").unwrap());

/// Values available to a query template.
#[derive(Debug, Clone, Default)]
pub struct QueryContext {
    pub away: String,
    pub home: String,
    pub team: String,
    pub date: Option<NaiveDate>,
    pub season_code: String,
    pub game_number: Option<i64>,
    pub custom: HashMap<String, String>,
}

impl QueryContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_game(game: &GameRecord, team: &str, game_number: Option<i64>) -> Self {
        Self {
            away: game.away_team.clone(),
            home: game.home_team.clone(),
            team: team.to_string(),
            date: Some(game.game_date_utc.date_naive()),
            season_code: game.season.clone(),
            game_number,
            custom: HashMap::new(),
        }
    }

    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        self.custom.insert(name.to_string(), value.into());
    }

    /// `"20252026"` becomes `"25-26"`.
    fn short_season(&self) -> Option<String> {
        let code = self.season_code.as_str();
        if code.len() != 8 || !code.is_ascii() {
            return None;
        }
        Some(format!("{}-{}", &code[2..4], &code[6..8]))
    }

    pub fn resolve(&self, name: &str) -> Option<String> {
        match name {
            "away" => Some(self.away.clone()),
            "home" => Some(self.home.clone()),
            "team" => Some(self.team.clone()),
            "date" => self.date.map(|d| d.format("%B %d %Y").to_string()),
            "iso_date" => self.date.map(|d| d.format("%Y-%m-%d").to_string()),
            "season" => self.short_season(),
            "season_code" => Some(self.season_code.clone()),
            "game_number" => self.game_number.map(|n| n.to_string()),
            other => self.custom.get(other).cloned(),
        }
    }

    /// Replace every `${name}`. Unknown names are left as written.
    pub fn interpolate(&self, input: &str) -> String {
        VAR_REGEX
            .replace_all(input, |caps: &regex::Captures| {
                let name = &caps[1];
                self.resolve(name)
                    .unwrap_or_else(|| format!("${{{}}}", name))
            })
            .to_string()
    }
}

/// Variables in `template` that are not in [`KNOWN_VARIABLES`].
pub fn unknown_variables(template: &str) -> Vec<String> {
    VAR_REGEX
        .captures_iter(template)
        .map(|caps| caps[1].to_string())
        .filter(|name| !KNOWN_VARIABLES.contains(&name.as_str()))
        .collect()
}
