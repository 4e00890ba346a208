mod context;
mod event;
mod retry;


use std::{path::Path, sync::Arc, time::Duration};

use chrono::Local;
use clap::builder::styling::AnsiColor;
use log::{debug, error, info, trace, warn};
use tokio::time::{interval, sleep, Instant, MissedTickBehavior};

use crate::{
    config::UploadFields,
    error::Result,
    format::{format_path, format_progress, format_timestamp},
    job::{JobItem, MainDescriptor, Status, GROUP_CAPACITY},
    progress::{GroupSnapshot, ProgressPersister, DEFAULT_CHECKPOINT_EVERY},
    scan::Scanner,
    stats::RunStats,
    store::SharedJobStore,
    upload::{SharedUploader, UploadError},
};

pub use self::{
    context::{ActiveGroup, SchedulerContext},
    event::{AttemptId, Event},
    retry::RetryPolicy,
};

use self::context::InFlight;

#[derive(Debug, Clone)]
pub struct SchedulerOptions {
    /// Items per group file; must match what the scan wrote.
    pub capacity: usize,
    /// Ceiling on outstanding upload attempts.
    pub max_concurrent: usize,
    /// Uploads between two progress checkpoints.
    pub checkpoint_every: u64,
    /// How long an attempt may stay unresolved before it is re-dispatched.
    pub stale_after: Duration,
    /// How often deadlines are checked.
    pub tick: Duration,
    pub retry: RetryPolicy,
}

impl SchedulerOptions {
    pub const DEFAULT_MAX_CONCURRENT: usize = 10;
    pub const DEFAULT_STALE_AFTER: Duration = Duration::from_secs(60);
    pub const DEFAULT_TICK: Duration = Duration::from_secs(1);
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        SchedulerOptions {
            capacity: GROUP_CAPACITY,
            max_concurrent: Self::DEFAULT_MAX_CONCURRENT,
            checkpoint_every: DEFAULT_CHECKPOINT_EVERY,
            stale_after: Self::DEFAULT_STALE_AFTER,
            tick: Self::DEFAULT_TICK,
            retry: RetryPolicy::default(),
        }
    }
}

/// How a run ended.
#[derive(Debug)]
pub struct RunReport {
    pub main: MainDescriptor,
    pub uploaded_total: u64,
    /// Items that ran out of attempts. Non-empty only with a bounded retry
    /// policy, and then the job is left in `Uploading`.
    pub failed: Vec<JobItem>,
    pub stats: RunStats,
}

impl RunReport {
    pub fn is_completed(&self) -> bool {
        self.main.status == Status::Completed
    }
}

enum Wake {
    Event(Event),
    Tick,
}

/// Drives a scanned job to completion, one group at a time, with a bounded
/// number of uploads in flight.
pub struct Scheduler {
    store: SharedJobStore,
    uploader: SharedUploader,
    fields: Arc<UploadFields>,
    persister: ProgressPersister,
    options: SchedulerOptions,
}

impl Scheduler {
    pub fn new(
        store: SharedJobStore,
        uploader: SharedUploader,
        fields: UploadFields,
        mut options: SchedulerOptions,
    ) -> Self {
        options.capacity = options.capacity.max(1);
        options.max_concurrent = options.max_concurrent.max(1);
        let persister = ProgressPersister::new(store.clone(), options.checkpoint_every);
        Scheduler {
            store,
            uploader,
            fields: Arc::new(fields),
            persister,
            options,
        }
    }

    /// Picks the job up from whatever the store holds: scans `root` if it
    /// was never scanned, resumes uploading otherwise.
    pub async fn start(&self, scanner: &Scanner, root: &Path) -> Result<RunReport> {
        let mut stats = RunStats::new();
        let mut main = self.store.load_main().await?;

        match main.status {
            Status::NotStarted | Status::Scanning => {
                info!("scanning {}", format_path(root));
                main = scanner.run(self.store.as_ref(), root).await?;
            }
            Status::Uploading => {
                info!(
                    "resuming upload at group {} of {}",
                    main.next_group_index(),
                    main.group_count(self.options.capacity)
                );
            }
            Status::Completed => {
                info!(
                    "all {} jobs were uploaded by an earlier run, reset to start over",
                    main.jobs_total
                );
            }
        }

        stats.files_scanned = main.files_total;
        stats.jobs_selected = main.jobs_total;
        self.run(main, stats).await
    }

    /// Uploads every group after `main.uploaded_group_index`.
    pub async fn run(&self, main: MainDescriptor, stats: RunStats) -> Result<RunReport> {
        let mut ctx = SchedulerContext::new(main, self.options.capacity, stats);
        if ctx.main.status == Status::Completed {
            ctx.uploaded_total = ctx.main.jobs_total;
            return Ok(Self::finish(ctx));
        }
        ctx.main.status = Status::Uploading;

        let mut ticker = interval(self.options.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        while !self.pump(&mut ctx).await? {
            let wake = tokio::select! {
                event = ctx.events_rx.recv() => event.map_or(Wake::Tick, Wake::Event),
                _ = ticker.tick() => Wake::Tick,
            };

            match wake {
                Wake::Event(event) => self.handle(&mut ctx, event).await,
                Wake::Tick => self.check_deadlines(&mut ctx).await,
            }
            ctx.reap();
        }

        Ok(Self::finish(ctx))
    }

    /// Advances the run as far as it can go without waiting. Returns `true`
    /// once there is nothing left to wait for.
    async fn pump(&self, ctx: &mut SchedulerContext) -> Result<bool> {
        loop {
            if ctx.group.as_ref().is_some_and(ActiveGroup::is_done) {
                self.roll_over(ctx).await;
            }

            if ctx.group.is_none() {
                if ctx.main.uploaded_group_index >= ctx.group_count {
                    self.complete(ctx).await;
                    return Ok(true);
                }
                self.load_next_group(ctx).await?;
            }

            self.fill(ctx);

            let Some(group) = &ctx.group else {
                continue;
            };
            if group.is_done() {
                continue;
            }
            if group.is_dispatched() && ctx.in_flight.is_empty() {
                self.give_up(ctx).await;
                return Ok(true);
            }
            return Ok(false);
        }
    }

    async fn load_next_group(&self, ctx: &mut SchedulerContext) -> Result<()> {
        let index = ctx.main.next_group_index();
        let items = self.store.load_group(index).await?;
        debug!("loaded group {index} ({} jobs)", items.len());

        ctx.uploaded_total = ctx.main.uploaded_group_index * self.options.capacity as u64;
        ctx.group = Some(ActiveGroup::new(index, items));
        Ok(())
    }

    async fn roll_over(&self, ctx: &mut SchedulerContext) {
        let Some(group) = ctx.group.take() else {
            return;
        };
        debug_assert!(ctx.in_flight.is_empty());

        ctx.main.uploaded_group_index += 1;
        let snapshot = GroupSnapshot {
            index: group.index,
            items: &group.items,
        };
        self.persister.checkpoint(&ctx.main, Some(snapshot)).await;

        info!(
            "finished group {} of {}, {} uploaded at {}",
            group.index,
            ctx.group_count,
            format_progress(ctx.uploaded_total, ctx.main.jobs_total),
            format_timestamp(&Local::now())
        );
    }

    async fn complete(&self, ctx: &mut SchedulerContext) {
        ctx.main.status = Status::Completed;
        ctx.uploaded_total = ctx.main.jobs_total;
        self.persister.checkpoint(&ctx.main, None).await;

        let style = AnsiColor::Green.on_default();
        info!(
            "{style}upload complete:{style:#} {} jobs",
            ctx.main.jobs_total
        );
    }

    async fn give_up(&self, ctx: &mut SchedulerContext) {
        self.persister.checkpoint(&ctx.main, ctx.snapshot()).await;
        error!(
            "{} jobs failed permanently, stopping before group {} is finished",
            ctx.failed.len(),
            ctx.main.next_group_index()
        );
    }

    /// Dispatches items at the cursor until the ceiling is reached.
    /// Items already flagged as uploaded are passed over.
    fn fill(&self, ctx: &mut SchedulerContext) {
        while ctx.in_flight.len() < self.options.max_concurrent {
            let Some(group) = ctx.group.as_mut() else {
                break;
            };
            if group.is_dispatched() {
                break;
            }

            let position = group.cursor;
            group.cursor += 1;
            if group.items[position].uploaded {
                group.completed += 1;
                ctx.uploaded_total += 1;
                ctx.stats.files_skipped += 1;
                continue;
            }

            self.dispatch(ctx, position, Duration::ZERO);
        }
    }

    /// Starts an attempt for the item at `position`, taking a slot or
    /// reusing the one it already holds.
    fn dispatch(&self, ctx: &mut SchedulerContext, position: usize, delay: Duration) {
        let Some(group) = &ctx.group else {
            return;
        };
        let group_index = group.index;
        let item = group.items[position].clone();

        let attempt = ctx.next_attempt_id();
        let uploader = self.uploader.clone();
        let fields = self.fields.clone();
        let events = ctx.events_tx.clone();
        trace!("dispatching {} (attempt {attempt})", format_path(&item.path));

        let handle = ctx.tasks.spawn(async move {
            if !delay.is_zero() {
                sleep(delay).await;
            }

            let event = match uploader.upload(&item, &fields).await {
                Ok(bytes) => Event::Success {
                    group: group_index,
                    position,
                    attempt,
                    bytes,
                },
                Err(error) => Event::Failure {
                    group: group_index,
                    position,
                    attempt,
                    error,
                },
            };
            let _ = events.send(event);
        });

        let deadline = Instant::now() + delay + self.options.stale_after;
        ctx.stats.attempts += 1;
        if let Some(flight) = ctx.in_flight.get_mut(&position) {
            flight.attempt = attempt;
            flight.attempts += 1;
            flight.deadline = deadline;
            flight.handle = handle;
        } else {
            let flight = InFlight {
                attempt,
                attempts: 1,
                failures: 0,
                deadline,
                handle,
            };
            ctx.in_flight.insert(position, flight);
        }
    }

    async fn handle(&self, ctx: &mut SchedulerContext, event: Event) {
        if !ctx.is_active(event.group()) {
            trace!("dropping result for inactive group {}", event.group());
            return;
        }

        match event {
            Event::Success {
                position,
                attempt,
                bytes,
                ..
            } => self.on_success(ctx, position, attempt, bytes).await,
            Event::Failure {
                position,
                attempt,
                error,
                ..
            } => self.on_failure(ctx, position, attempt, &error),
            Event::StaleTimeout {
                position, attempt, ..
            } => self.on_stale(ctx, position, attempt),
        }
    }

    async fn on_success(
        &self,
        ctx: &mut SchedulerContext,
        position: usize,
        attempt: AttemptId,
        bytes: u64,
    ) {
        let flight = ctx.in_flight.remove(&position);
        if let Some(flight) = &flight {
            if flight.attempt != attempt {
                flight.handle.abort();
            }
        }

        if !ctx.mark_uploaded(position) {
            trace!("item {position} was already uploaded");
            return;
        }
        ctx.stats.bytes_uploaded += bytes;

        if let Some(item) = ctx.item(position) {
            let path = format_path(&item.path);
            if flight.is_some_and(|flight| flight.attempts > 1) {
                let style = AnsiColor::Green.on_default();
                info!("{style}uploaded after retry:{style:#} {path}");
            } else {
                debug!("uploaded {path}");
            }
        }

        if self.persister.is_due(ctx.uploaded_total) {
            self.persister.checkpoint(&ctx.main, ctx.snapshot()).await;
            info!(
                "uploaded {}",
                format_progress(ctx.uploaded_total, ctx.main.jobs_total)
            );
        }
    }

    fn on_failure(
        &self,
        ctx: &mut SchedulerContext,
        position: usize,
        attempt: AttemptId,
        error: &UploadError,
    ) {
        let Some(flight) = ctx.in_flight.get_mut(&position) else {
            return;
        };
        if flight.attempt != attempt {
            trace!("dropping failure of abandoned attempt {attempt}");
            return;
        }

        flight.failures += 1;
        let attempts = flight.attempts;
        ctx.stats.failed_attempts += 1;
        if let Some(item) = ctx.item(position) {
            warn!(
                "upload of {} failed (attempt {attempts}): {error}",
                format_path(&item.path)
            );
        }

        self.retry_or_drop(ctx, position);
    }

    /// Aborts an attempt that outlived its deadline and redispatches the item.
    ///
    /// The aborted task is dropped at its next await point rather than left
    /// running, so it can neither report late nor hold a concurrency slot.
    fn on_stale(&self, ctx: &mut SchedulerContext, position: usize, attempt: AttemptId) {
        let Some(flight) = ctx.in_flight.get(&position) else {
            return;
        };
        if flight.attempt != attempt {
            return;
        }

        flight.handle.abort();
        ctx.stats.stale_attempts += 1;
        if let Some(item) = ctx.item(position) {
            warn!(
                "upload of {} did not finish in {}, retrying",
                format_path(&item.path),
                humantime::format_duration(self.options.stale_after)
            );
        }

        self.retry_or_drop(ctx, position);
    }

    fn retry_or_drop(&self, ctx: &mut SchedulerContext, position: usize) {
        let Some(flight) = ctx.in_flight.get(&position) else {
            return;
        };

        if self.options.retry.allows(flight.attempts) {
            let delay = self.options.retry.delay(flight.failures);
            self.dispatch(ctx, position, delay);
            return;
        }

        let attempts = flight.attempts;
        ctx.in_flight.remove(&position);
        if let Some(item) = ctx.item(position).cloned() {
            error!(
                "giving up on {} after {attempts} attempts",
                format_path(&item.path)
            );
            ctx.failed.push(item);
        }
    }

    async fn check_deadlines(&self, ctx: &mut SchedulerContext) {
        let Some(group) = ctx.group.as_ref().map(|group| group.index) else {
            return;
        };

        let now = Instant::now();
        let expired: Vec<(usize, AttemptId)> = ctx
            .in_flight
            .iter()
            .filter(|(_, flight)| flight.deadline <= now)
            .map(|(&position, flight)| (position, flight.attempt))
            .collect();

        for (position, attempt) in expired {
            let event = Event::StaleTimeout {
                group,
                position,
                attempt,
            };
            self.handle(ctx, event).await;
        }
    }

    fn finish(mut ctx: SchedulerContext) -> RunReport {
        ctx.tasks.abort_all();
        ctx.stats.end();
        RunReport {
            main: ctx.main,
            uploaded_total: ctx.uploaded_total,
            failed: ctx.failed,
            stats: ctx.stats,
        }
    }
}
