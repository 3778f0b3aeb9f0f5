//! Pipeline configuration parsing.

use crate::variables::unknown_variables;
use crate::{ConfigError, ConfigResult};
use chrono::TimeDelta;
use kdl::{KdlDocument, KdlNode};
use regex::Regex;
use rinkside_core::{Stage, StageSchedule};
use std::collections::HashSet;
use std::path::Path;
use std::sync::LazyLock;

static DURATION_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:(\d+)h)?(?:(\d+)m)?(?:(\d+)s)?$").unwrap());

/// How the scheduler ticks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerSettings {
    pub tick: TimeDelta,
    /// Failed runs of one stage before it is settled.
    pub max_attempts: u32,
    /// How long a claim on a game is honoured.
    pub lease: TimeDelta,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            tick: TimeDelta::hours(1),
            max_attempts: 3,
            lease: TimeDelta::minutes(15),
        }
    }
}

/// Highlight search templates for the media stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaQueries {
    pub official_query: String,
    pub review_query: String,
    pub review_channel: String,
    pub review_keyword: String,
    pub max_results: u32,
}

impl Default for MediaQueries {
    fn default() -> Self {
        Self {
            official_query: "${away} vs ${home} highlights ${date}".to_string(),
            review_query: "San Jose Sharks ${season} Regular Season Review Game ${game_number}"
                .to_string(),
            review_channel: "professor".to_string(),
            review_keyword: "sharks".to_string(),
            max_results: 5,
        }
    }
}

/// A parsed `rinkside.kdl`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Team abbreviation whose games are followed.
    pub team: String,
    pub subreddit: String,
    /// Top-level comments kept from a game thread.
    pub comment_limit: u32,
    pub scheduler: SchedulerSettings,
    pub schedule: StageSchedule,
    pub media: MediaQueries,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            team: "SJS".to_string(),
            subreddit: "SanJoseSharks".to_string(),
            comment_limit: 50,
            scheduler: SchedulerSettings::default(),
            schedule: StageSchedule::default(),
            media: MediaQueries::default(),
        }
    }
}

/// Read and parse a pipeline configuration file.
pub fn load_pipeline_config(path: &Path) -> ConfigResult<PipelineConfig> {
    let text = std::fs::read_to_string(path)?;
    parse_pipeline_config(&text)
}

/// Parse a pipeline configuration from KDL text. Missing nodes keep their defaults.
pub fn parse_pipeline_config(kdl: &str) -> ConfigResult<PipelineConfig> {
    let doc: KdlDocument = kdl.parse()?;
    let mut config = PipelineConfig::default();
    let mut seen_stages = HashSet::new();

    for node in doc.nodes() {
        match node.name().value() {
            "team" => {
                config.team = get_first_string_arg(node)
                    .filter(|t| !t.trim().is_empty())
                    .ok_or_else(|| ConfigError::MissingField("team".to_string()))?;
            }
            "subreddit" => {
                config.subreddit = get_first_string_arg(node)
                    .filter(|s| !s.trim().is_empty())
                    .ok_or_else(|| ConfigError::MissingField("subreddit name".to_string()))?;
                if let Some(limit) = get_u32_prop(node, "comments")? {
                    config.comment_limit = limit;
                }
            }
            "scheduler" => {
                config.scheduler = parse_scheduler(node, config.scheduler)?;
                if let Some(length) = get_string_prop(node, "game-length") {
                    config.schedule = config
                        .schedule
                        .with_game_length(parse_duration_field("game-length", &length)?);
                }
            }
            "stage" => {
                let (stage, delay) = parse_stage(node)?;
                if !seen_stages.insert(stage) {
                    return Err(ConfigError::Duplicate(format!("stage '{}'", stage)));
                }
                config.schedule = config.schedule.with_delay(stage, delay);
            }
            "media" => {
                config.media = parse_media(node, config.media)?;
            }
            _ => {} // Ignore unknown nodes
        }
    }

    config
        .schedule
        .validate()
        .map_err(|e| ConfigError::invalid("stage delays", e.to_string()))?;

    for (field, template) in [
        ("official-query", &config.media.official_query),
        ("review-query", &config.media.review_query),
    ] {
        if let Some(name) = unknown_variables(template).into_iter().next() {
            return Err(ConfigError::InvalidReference(format!(
                "{} uses unknown variable '${{{}}}'",
                field, name
            )));
        }
    }

    Ok(config)
}

fn parse_scheduler(
    node: &KdlNode,
    mut settings: SchedulerSettings,
) -> ConfigResult<SchedulerSettings> {
    if let Some(tick) = get_string_prop(node, "tick") {
        settings.tick = parse_duration_field("tick", &tick)?;
        if settings.tick <= TimeDelta::zero() {
            return Err(ConfigError::invalid("tick", "must be positive"));
        }
    }
    if let Some(lease) = get_string_prop(node, "lease") {
        settings.lease = parse_duration_field("lease", &lease)?;
        if settings.lease <= TimeDelta::zero() {
            return Err(ConfigError::invalid("lease", "must be positive"));
        }
    }
    if let Some(max_attempts) = get_u32_prop(node, "max-attempts")? {
        if max_attempts == 0 {
            return Err(ConfigError::invalid("max-attempts", "must be at least 1"));
        }
        settings.max_attempts = max_attempts;
    }
    Ok(settings)
}

fn parse_stage(node: &KdlNode) -> ConfigResult<(Stage, TimeDelta)> {
    let name = get_first_string_arg(node)
        .ok_or_else(|| ConfigError::MissingField("stage name".to_string()))?;
    let stage = Stage::from_name(&name)
        .ok_or_else(|| ConfigError::InvalidReference(format!("unknown stage '{}'", name)))?;
    let after = get_string_prop(node, "after")
        .ok_or_else(|| ConfigError::MissingField(format!("after for stage '{}'", name)))?;
    Ok((stage, parse_duration_field("after", &after)?))
}

fn parse_media(node: &KdlNode, mut media: MediaQueries) -> ConfigResult<MediaQueries> {
    if let Some(max_results) = get_u32_prop(node, "max-results")? {
        media.max_results = max_results;
    }
    if let Some(children) = node.children() {
        for child in children.nodes() {
            let value = get_first_string_arg(child);
            match (child.name().value(), value) {
                ("official-query", Some(v)) => media.official_query = v,
                ("review-query", Some(v)) => media.review_query = v,
                ("review-channel", Some(v)) => media.review_channel = v,
                ("review-keyword", Some(v)) => media.review_keyword = v,
                (
                    name @ ("official-query" | "review-query" | "review-channel"
                    | "review-keyword"),
                    None,
                ) => {
                    return Err(ConfigError::MissingField(format!("media {}", name)));
                }
                _ => {}
            }
        }
    }
    Ok(media)
}

/// Parse `"1h"`, `"30m"`, `"2h30m"`, `"45s"` or `"0"`.
pub fn parse_duration(input: &str) -> Option<TimeDelta> {
    let input = input.trim();
    if input == "0" {
        return Some(TimeDelta::zero());
    }
    if input.is_empty() {
        return None;
    }
    let caps = DURATION_REGEX.captures(input)?;
    let part = |i: usize| -> Option<i64> {
        caps.get(i)
            .map(|m| m.as_str().parse::<i64>().ok())
            .unwrap_or(Some(0))
    };
    let seconds = part(1)?
        .checked_mul(3600)?
        .checked_add(part(2)?.checked_mul(60)?)?
        .checked_add(part(3)?)?;
    TimeDelta::try_seconds(seconds)
}

fn parse_duration_field(field: &str, value: &str) -> ConfigResult<TimeDelta> {
    parse_duration(value).ok_or_else(|| {
        ConfigError::invalid(field, format!("'{}' is not a duration like 2h30m", value))
    })
}

// Helper functions for extracting values from KDL nodes

fn get_first_string_arg(node: &KdlNode) -> Option<String> {
    node.entries()
        .iter()
        .find(|e| e.name().is_none())
        .and_then(|e| e.value().as_string())
        .map(|s| s.to_string())
}

fn get_string_prop(node: &KdlNode, name: &str) -> Option<String> {
    node.get(name)
        .and_then(|v| v.as_string())
        .map(|s| s.to_string())
}

fn get_u32_prop(node: &KdlNode, name: &str) -> ConfigResult<Option<u32>> {
    let Some(value) = node.get(name) else {
        return Ok(None);
    };
    value
        .as_integer()
        .and_then(|n| u32::try_from(n).ok())
        .map(Some)
        .ok_or_else(|| ConfigError::invalid(name, "expected a non-negative integer"))
}
