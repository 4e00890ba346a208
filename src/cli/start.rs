use std::sync::Arc;

use clap::builder::styling::AnsiColor;
use humantime::format_duration;
use log::{debug, error, info};

use crate::{
    error::{Error, Result},
    format::{format_bytes, format_path},
    job::GROUP_CAPACITY,
    scan::{Scanner, Selector},
    schedule::{RetryPolicy, RunReport, Scheduler, SchedulerOptions},
    upload::HttpUploader,
};

use super::{args::StartArgs, open_store, print_stat};

pub async fn main(args: StartArgs) -> Result<()> {
    let store = Arc::new(open_store(&args.global));
    let settings = store.load_config().await?.settings()?;

    let mut selector = Selector::new(settings.extensions);
    if args.include_thumbnails {
        selector = selector.without_exclude();
    }
    let scanner = Scanner::new(selector);

    let fields = args.upload_params.unwrap_or_default();
    if !fields.is_empty() {
        debug!("sending {} extra fields with every file", fields.len());
    }

    let options = SchedulerOptions {
        capacity: GROUP_CAPACITY,
        max_concurrent: args.jobs,
        checkpoint_every: args.checkpoint_every,
        stale_after: args.stale_after,
        tick: args.tick,
        retry: RetryPolicy {
            max_attempts: args.max_attempts,
            base_delay: args.retry_delay,
            max_delay: args.max_retry_delay,
        },
    };
    let uploader = HttpUploader::new(settings.server_url, args.timeout)?;
    let scheduler = Scheduler::new(store, Arc::new(uploader), fields, options);

    let report = scheduler.start(&scanner, &settings.folder_path).await?;
    if report.is_completed() {
        let style = AnsiColor::Green.on_default();
        info!(
            "{style}done{style:#} in {}",
            format_duration(report.stats.elapsed_time())
        );
    }

    if args.stats {
        print_stats(&report);
    }

    if !report.failed.is_empty() {
        for item in &report.failed {
            error!("not uploaded: {}", format_path(&item.path));
        }
        return Err(Error::PermanentFailures(report.failed.len()));
    }

    Ok(())
}

fn print_stats(report: &RunReport) {
    let stats = &report.stats;
    print_stat("files scanned", stats.files_scanned);
    print_stat("jobs selected", stats.jobs_selected);
    print_stat("upload attempts", stats.attempts);
    print_stat("failed attempts", stats.failed_attempts);
    print_stat("stale attempts", stats.stale_attempts);
    print_stat("files uploaded", stats.files_uploaded);
    print_stat("files already uploaded", stats.files_skipped);
    print_stat("files failed", report.failed.len());
    print_stat("bytes uploaded", format_bytes(stats.bytes_uploaded));
    print_stat("elapsed time", format_duration(stats.elapsed_time()));
}
