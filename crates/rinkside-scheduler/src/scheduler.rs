//! The hourly pipeline tick.

use chrono::{DateTime, TimeDelta, Utc};
use rinkside_config::PipelineConfig;
use rinkside_core::{GameId, Stage};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use crate::discovery::{DiscoveryReport, discover_games};
use crate::runner::{StageOutcome, StageRunner};
use crate::{SchedulerError, SchedulerResult, Sources, Stores};

/// What one tick did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickReport {
    pub discovery: DiscoveryReport,
    /// Set when discovery failed; the tick still works the known games.
    pub discovery_error: Option<String>,
    pub games_examined: u32,
    pub stages_completed: u32,
    pub stages_failed: u32,
    /// Stages marked done after exhausting their attempts.
    pub stages_settled: u32,
    pub games_archived: u32,
    /// Games another worker held a live claim on.
    pub skipped_claimed: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchedulerStatus {
    pub worker_id: String,
    pub tick_interval_secs: i64,
    pub running: bool,
    pub tick_count: u64,
    pub last_tick_at: Option<DateTime<Utc>>,
    pub next_tick_at: Option<DateTime<Utc>>,
    pub last_report: Option<TickReport>,
}

/// The next multiple of `interval` since the epoch strictly after `now`.
/// A one-hour interval lands on the top of the hour.
pub fn next_tick_after(now: DateTime<Utc>, interval: TimeDelta) -> DateTime<Utc> {
    let secs = interval.num_seconds().max(1);
    let next = (now.timestamp().div_euclid(secs) + 1) * secs;
    DateTime::from_timestamp(next, 0).unwrap_or(now + interval)
}

/// `now` advanced by the wall-clock time elapsed since `started`. Claims
/// are stamped with this so a lease taken late in a long tick is not
/// already stale.
fn claim_clock(now: DateTime<Utc>, started: Instant) -> DateTime<Utc> {
    now + TimeDelta::from_std(started.elapsed()).unwrap_or(TimeDelta::zero())
}

pub struct Scheduler {
    runner: StageRunner,
    sources: Sources,
    stores: Stores,
    config: Arc<PipelineConfig>,
    worker_id: String,
    tick_lock: Mutex<()>,
    state: RwLock<SchedulerStatus>,
}

impl Scheduler {
    pub fn new(
        sources: Sources,
        stores: Stores,
        config: Arc<PipelineConfig>,
        worker_id: impl Into<String>,
    ) -> Self {
        let worker_id = worker_id.into();
        let state = SchedulerStatus {
            worker_id: worker_id.clone(),
            tick_interval_secs: config.scheduler.tick.num_seconds(),
            ..SchedulerStatus::default()
        };
        Self {
            runner: StageRunner::new(sources.clone(), stores.clone(), config.clone()),
            sources,
            stores,
            config,
            worker_id,
            tick_lock: Mutex::new(()),
            state: RwLock::new(state),
        }
    }

    pub fn runner(&self) -> &StageRunner {
        &self.runner
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub async fn status(&self) -> SchedulerStatus {
        let mut status = self.state.read().await.clone();
        status.running = self.tick_lock.try_lock().is_err();
        status
    }

    /// Run discovery and every due stage once.
    ///
    /// Returns [`SchedulerError::TickInProgress`] if another tick is running
    /// in this process.
    pub async fn tick(&self, now: DateTime<Utc>) -> SchedulerResult<TickReport> {
        let _guard = self
            .tick_lock
            .try_lock()
            .map_err(|_| SchedulerError::TickInProgress)?;
        let started = Instant::now();

        let mut report = TickReport::default();

        match discover_games(
            self.sources.feed.as_ref(),
            self.stores.games.as_ref(),
            &self.config.team,
            self.config.schedule.game_length(),
            now,
        )
        .await
        {
            Ok(discovery) => report.discovery = discovery,
            Err(e) => {
                warn!(error = %e, "Discovery failed, continuing with known games");
                report.discovery_error = Some(e.to_string());
            }
        }

        let games = self.stores.games.list_in_flight().await?;
        for game in games {
            report.games_examined += 1;
            let id = game.game_id;

            if !self.claim(id, claim_clock(now, started)).await? {
                debug!(game_id = %id, "Game claimed by another worker, skipping");
                report.skipped_claimed += 1;
                continue;
            }

            if let Err(e) = self.work_game(id, now, started, &mut report).await {
                error!(game_id = %id, error = %e, "Error while working game");
            }

            if let Err(e) = self.stores.games.release_claim(id, &self.worker_id).await {
                warn!(game_id = %id, error = %e, "Failed to release claim");
            }
        }

        {
            let mut state = self.state.write().await;
            state.tick_count += 1;
            state.last_tick_at = Some(now);
            state.last_report = Some(report.clone());
        }

        info!(
            discovered = report.discovery.discovered,
            examined = report.games_examined,
            completed = report.stages_completed,
            failed = report.stages_failed,
            settled = report.stages_settled,
            archived = report.games_archived,
            "Tick finished"
        );
        Ok(report)
    }

    /// Take or renew this worker's claim on `id`.
    async fn claim(&self, id: GameId, at: DateTime<Utc>) -> SchedulerResult<bool> {
        Ok(self
            .stores
            .games
            .try_claim(id, &self.worker_id, self.config.scheduler.lease, at)
            .await?)
    }

    /// Run every due stage of one claimed game, in order, until one fails
    /// or nothing more is due. The claim is renewed before each stage; if
    /// another worker took the game over, this one stops.
    async fn work_game(
        &self,
        id: GameId,
        now: DateTime<Utc>,
        started: Instant,
        report: &mut TickReport,
    ) -> SchedulerResult<()> {
        for (i, _) in Stage::ALL.iter().enumerate() {
            if i > 0 && !self.claim(id, claim_clock(now, started)).await? {
                warn!(game_id = %id, "Claim lost to another worker, stopping");
                return Ok(());
            }
            let game = self.stores.games.get(id).await?;
            let Some(stage) = self.config.schedule.due_stage(&game, now) else {
                return Ok(());
            };

            match self.runner.run_stage(&game, stage, now).await {
                StageOutcome::Completed => {
                    report.stages_completed += 1;
                    if stage == Stage::Archive {
                        report.games_archived += 1;
                        return Ok(());
                    }
                }
                StageOutcome::Failed { message } => {
                    report.stages_failed += 1;
                    let attempts = self.stores.games.record_failure(id, &message).await?;
                    let max_attempts =
                        i32::try_from(self.config.scheduler.max_attempts).unwrap_or(i32::MAX);
                    if attempts >= max_attempts {
                        warn!(
                            game_id = %id,
                            stage = %stage,
                            attempts,
                            last_error = %message,
                            "Stage failed too often, settling"
                        );
                        self.runner.settle(&game, stage, now).await?;
                        report.stages_settled += 1;
                        if stage == Stage::Archive {
                            report.games_archived += 1;
                        }
                    }
                    return Ok(());
                }
            }
        }
        Ok(())
    }

    /// Tick on every interval boundary until `shutdown` resolves.
    pub async fn run(self: Arc<Self>, shutdown: impl Future<Output = ()> + Send) {
        let interval = self.config.scheduler.tick;
        info!(
            worker_id = %self.worker_id,
            interval_secs = interval.num_seconds(),
            "Starting scheduler"
        );
        tokio::pin!(shutdown);

        loop {
            match self.tick(Utc::now()).await {
                Ok(_) => {}
                Err(SchedulerError::TickInProgress) => {
                    debug!("Tick already running, skipping");
                }
                Err(e) => error!(error = %e, "Tick failed"),
            }

            let next = next_tick_after(Utc::now(), interval);
            self.state.write().await.next_tick_at = Some(next);
            let wait = (next - Utc::now()).to_std().unwrap_or(Duration::ZERO);

            tokio::select! {
                _ = &mut shutdown => {
                    info!("Scheduler stopping");
                    break;
                }
                _ = tokio::time::sleep(wait) => {}
            }
        }
    }
}
