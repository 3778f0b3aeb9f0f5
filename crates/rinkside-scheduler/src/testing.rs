//! Fakes and fixtures shared by the scheduler tests.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeDelta, TimeZone, Utc};
use rinkside_config::PipelineConfig;
use rinkside_core::discussion::{DiscussionSource, DiscussionThread, ThreadQuery};
use rinkside_core::feed::{GameFeed, ScheduledGame, TeamStanding};
use rinkside_core::media::{
    HighlightQuery, HighlightResults, HighlightSearch, Video, VideoCandidate, VideoKind,
};
use rinkside_core::recap::{Recap, RecapRequest, RecapWriter};
use rinkside_core::{Error, GameId, GameRecord, GameStatus, Result};
use rinkside_db::{GameRepo, MemoryStore, VideoRepo};
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::{Scheduler, Sources, StageRunner, Stores};

pub fn game_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 11, 2, 3, 0, 0).unwrap()
}

pub fn scheduled(id: i64, start: DateTime<Utc>, state: &str) -> ScheduledGame {
    ScheduledGame {
        game_id: GameId::new(id),
        season: "20252026".to_string(),
        game_type: 2,
        game_date_utc: start,
        away_team: "SJS".to_string(),
        home_team: "LAK".to_string(),
        game_state: state.to_string(),
    }
}

/// A final game that ended at 05:30 on 2025-11-02.
pub fn final_game(id: i64) -> GameRecord {
    let start = game_start();
    let mut game = GameRecord::discovered(&scheduled(id, start, "OFF"), GameStatus::Final, start);
    game.final_at = Some(start + TimeDelta::minutes(150));
    game
}

#[derive(Default)]
pub struct FakeFeed {
    schedule: Mutex<Vec<ScheduledGame>>,
    fail_schedule: Mutex<bool>,
    fail_game_data: Mutex<bool>,
    fail_standings: Mutex<bool>,
}

impl FakeFeed {
    pub fn with_schedule(schedule: Vec<ScheduledGame>) -> Self {
        Self {
            schedule: Mutex::new(schedule),
            fail_schedule: Mutex::new(false),
            fail_game_data: Mutex::new(false),
            fail_standings: Mutex::new(false),
        }
    }

    pub async fn set_schedule(&self, schedule: Vec<ScheduledGame>) {
        *self.schedule.lock().await = schedule;
    }

    pub async fn fail_schedule(&self, fail: bool) {
        *self.fail_schedule.lock().await = fail;
    }

    /// Make boxscore and play-by-play requests fail.
    pub async fn fail_game_data(&self, fail: bool) {
        *self.fail_game_data.lock().await = fail;
    }

    pub async fn fail_standings(&self, fail: bool) {
        *self.fail_standings.lock().await = fail;
    }

    async fn game_data(&self, value: Value) -> Result<Value> {
        if *self.fail_game_data.lock().await {
            return Err(Error::upstream("NHL API", 502));
        }
        Ok(value)
    }
}

#[async_trait]
impl GameFeed for FakeFeed {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn season_schedule(&self, _team: &str, _season: &str) -> Result<Vec<ScheduledGame>> {
        if *self.fail_schedule.lock().await {
            return Err(Error::Transport("connection refused".to_string()));
        }
        Ok(self.schedule.lock().await.clone())
    }

    async fn boxscore(&self, game_id: GameId) -> Result<Value> {
        self.game_data(json!({
            "id": game_id.get(),
            "awayTeam": {"abbrev": "SJS", "score": 2},
            "homeTeam": {"abbrev": "LAK", "score": 4},
            "playerByGameStats": {
                "awayTeam": {
                    "forwards": [
                        {"name": {"default": "W. Smith"}, "goals": 2},
                        {"name": {"default": "T. Hertl"}, "goals": 0}
                    ],
                    "defense": []
                },
                "homeTeam": {
                    "forwards": [{"name": {"default": "A. Kopitar"}, "goals": 1}],
                    "defense": []
                }
            }
        }))
        .await
    }

    async fn play_by_play(&self, _game_id: GameId) -> Result<Value> {
        self.game_data(json!({
            "plays": [
                {"typeDescKey": "faceoff"},
                {
                    "typeDescKey": "goal",
                    "periodDescriptor": {"number": 1},
                    "timeInPeriod": "04:12",
                    "teamAbbrev": "SJS",
                    "details": {"scoringPlayerName": "W. Smith", "scoringPlayerId": 8484801}
                }
            ]
        }))
        .await
    }

    async fn standings(&self, _date: NaiveDate) -> Result<Vec<TeamStanding>> {
        if *self.fail_standings.lock().await {
            return Err(Error::upstream("NHL API", 503));
        }
        Ok(vec![
            TeamStanding {
                team: "LAK".to_string(),
                division: "Pacific".to_string(),
                division_rank: 2,
                points: 21,
                wins: 9,
                losses: 4,
                ot_losses: 3,
            },
            TeamStanding {
                team: "SJS".to_string(),
                division: "Pacific".to_string(),
                division_rank: 8,
                points: 12,
                wins: 5,
                losses: 7,
                ot_losses: 2,
            },
        ])
    }
}

#[derive(Default)]
pub struct FakeHighlights {
    fail: Mutex<bool>,
    queries: Mutex<Vec<HighlightQuery>>,
}

impl FakeHighlights {
    pub async fn fail(&self, fail: bool) {
        *self.fail.lock().await = fail;
    }

    pub async fn queries(&self) -> Vec<HighlightQuery> {
        self.queries.lock().await.clone()
    }
}

fn candidate(id: &str, kind: VideoKind) -> VideoCandidate {
    VideoCandidate {
        youtube_id: id.to_string(),
        title: format!("Highlights {}", id),
        channel_name: Some("NHL".to_string()),
        thumbnail_url: None,
        published_at: None,
        kind,
    }
}

#[async_trait]
impl HighlightSearch for FakeHighlights {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn search(&self, query: &HighlightQuery) -> Result<HighlightResults> {
        self.queries.lock().await.push(query.clone());
        if *self.fail.lock().await {
            return Err(Error::upstream("YouTube API", 403));
        }
        Ok(HighlightResults {
            official: Some(candidate("official", VideoKind::NhlOfficial)),
            review: None,
            others: vec![
                candidate("official", VideoKind::Other),
                candidate("other", VideoKind::Other),
            ],
        })
    }
}

/// Records every request, then fails so the template recap is stored.
#[derive(Default)]
pub struct UnavailableRecaps {
    requests: Mutex<Vec<RecapRequest>>,
}

impl UnavailableRecaps {
    pub async fn requests(&self) -> Vec<RecapRequest> {
        self.requests.lock().await.clone()
    }
}

#[async_trait]
impl RecapWriter for UnavailableRecaps {
    fn name(&self) -> &'static str {
        "unavailable"
    }

    async fn write(&self, request: &RecapRequest) -> Result<Recap> {
        self.requests.lock().await.push(request.clone());
        Err(Error::Transport("model unavailable".to_string()))
    }
}

pub struct NoThreads;

#[async_trait]
impl DiscussionSource for NoThreads {
    fn name(&self) -> &'static str {
        "none"
    }

    async fn find_thread(&self, _query: &ThreadQuery) -> Result<Option<DiscussionThread>> {
        Ok(None)
    }
}

/// A memory store wired to the fakes.
pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub feed: Arc<FakeFeed>,
    pub highlights: Arc<FakeHighlights>,
    pub recaps: Arc<UnavailableRecaps>,
    pub config: Arc<PipelineConfig>,
    /// A day and a half after the fixture game ended; every stage is overdue.
    pub now: DateTime<Utc>,
}

impl Harness {
    pub async fn new() -> Self {
        let feed = FakeFeed::with_schedule(vec![scheduled(1, game_start(), "OFF")]);
        Self {
            store: Arc::new(MemoryStore::new()),
            feed: Arc::new(feed),
            highlights: Arc::new(FakeHighlights::default()),
            recaps: Arc::new(UnavailableRecaps::default()),
            config: Arc::new(PipelineConfig::default()),
            now: Utc.with_ymd_and_hms(2025, 11, 3, 18, 0, 0).unwrap(),
        }
    }

    pub fn sources(&self) -> Sources {
        Sources::new(self.feed.clone(), Arc::new(NoThreads))
            .with_highlights(self.highlights.clone())
            .with_recaps(self.recaps.clone())
    }

    pub fn stores(&self) -> Stores {
        Stores::memory(self.store.clone())
    }

    pub fn runner(&self) -> StageRunner {
        StageRunner::new(self.sources(), self.stores(), self.config.clone())
    }

    pub fn scheduler(&self, worker: &str) -> Scheduler {
        Scheduler::new(self.sources(), self.stores(), self.config.clone(), worker)
    }

    pub async fn insert(&self, game: GameRecord) -> GameRecord {
        self.store.insert_if_absent(&game).await.unwrap();
        self.game(game.game_id.get()).await
    }

    pub async fn game(&self, id: i64) -> GameRecord {
        self.store.get(GameId::new(id)).await.unwrap()
    }

    pub async fn videos(&self, id: i64) -> Vec<Video> {
        VideoRepo::list_for_game(self.store.as_ref(), GameId::new(id))
            .await
            .unwrap()
    }
}
