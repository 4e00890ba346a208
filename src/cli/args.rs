use std::{ops::RangeInclusive, path::PathBuf, time::Duration};

use clap::{ArgAction, Args};
use concolor_clap::ColorChoice;
use humantime::parse_duration;

use crate::{config::UploadFields, progress::DEFAULT_CHECKPOINT_EVERY, schedule::SchedulerOptions};

use super::parse::{parse_range_inclusive, parse_upload_fields};

const TASK_COUNT_RANGE: RangeInclusive<usize> = 1..=1024;
const DEFAULT_TASK_COUNT: usize = SchedulerOptions::DEFAULT_MAX_CONCURRENT;

const CHECKPOINT_RANGE: RangeInclusive<u64> = 1..=u64::MAX;
const ATTEMPT_RANGE: RangeInclusive<u32> = 1..=u32::MAX;

fn parse_task_count(s: &str) -> Result<usize, String> {
    parse_range_inclusive(s, TASK_COUNT_RANGE)
}

fn parse_checkpoint_every(s: &str) -> Result<u64, String> {
    parse_range_inclusive(s, CHECKPOINT_RANGE)
}

fn parse_attempts(s: &str) -> Result<u32, String> {
    parse_range_inclusive(s, ATTEMPT_RANGE)
}

#[derive(Args, Debug)]
pub struct InitArgs {
    /// URL that receives the uploads
    #[arg(short = 'u', long, value_name = "URL")]
    pub server_url: Option<String>,

    /// Folder to upload
    #[arg(short = 'f', long, value_name = "DIR")]
    pub folder_path: Option<PathBuf>,

    /// Extensions to upload, comma-separated (e.g. 'jpeg,.png')
    #[arg(short = 'e', long, value_name = "LIST")]
    pub extname: Option<String>,

    #[command(flatten)]
    pub global: GlobalArgs,
}

#[derive(Args, Debug)]
pub struct StartArgs {
    /// Extra form fields sent with every file (e.g. 'album=trip,owner=me')
    #[arg(short = 'p', long, value_name = "PAIRS", value_parser = parse_upload_fields)]
    pub upload_params: Option<UploadFields>,

    /// Maximum number of uploads in flight
    #[arg(
        short = 'j',
        long,
        value_name = "NUM",
        default_value_t = DEFAULT_TASK_COUNT,
        value_parser = parse_task_count,
    )]
    pub jobs: usize,

    /// Save progress after this many uploads
    #[arg(
        long,
        value_name = "NUM",
        default_value_t = DEFAULT_CHECKPOINT_EVERY,
        value_parser = parse_checkpoint_every,
    )]
    pub checkpoint_every: u64,

    /// Retry an upload that has not finished after this long
    #[arg(long, value_name = "DURATION", default_value = "60s", value_parser = parse_duration)]
    pub stale_after: Duration,

    /// How often to look for stale uploads
    #[arg(long, value_name = "DURATION", default_value = "1s", value_parser = parse_duration)]
    pub tick: Duration,

    /// Give up on a file after this many attempts (retries forever if unset)
    #[arg(long, value_name = "NUM", value_parser = parse_attempts)]
    pub max_attempts: Option<u32>,

    /// Wait before the first retry, doubled on each further failure
    #[arg(long, value_name = "DURATION", default_value = "1s", value_parser = parse_duration)]
    pub retry_delay: Duration,

    /// Longest wait between retries
    #[arg(long, value_name = "DURATION", default_value = "60s", value_parser = parse_duration)]
    pub max_retry_delay: Duration,

    /// Also upload files whose name contains '_.'
    #[arg(long, default_value_t = false)]
    pub include_thumbnails: bool,

    /// Timeout for a single request
    #[arg(short = 't', long, value_name = "DURATION", value_parser = parse_duration)]
    pub timeout: Option<Duration>,

    /// Print stats after completion
    #[arg(long, default_value_t = false)]
    pub stats: bool,

    #[command(flatten)]
    pub global: GlobalArgs,
}

#[derive(Args, Debug)]
pub struct ResetArgs {
    #[command(flatten)]
    pub global: GlobalArgs,
}

#[derive(Args, Debug)]
pub struct GetConfigArgs {
    #[command(flatten)]
    pub global: GlobalArgs,
}

#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Where settings and progress are kept
    #[arg(short, long, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    #[command(flatten)]
    pub logger: LoggerArgs,
}

#[derive(Args, Debug)]
pub struct LoggerArgs {
    /// When to use color in output
    #[arg(short, long, default_value_t = ColorChoice::Auto)]
    pub color: ColorChoice,

    /// Print more output
    #[arg(short, long, action = ArgAction::Count, group = "verbosity")]
    pub verbose: u8,

    /// Print less output
    #[arg(short, long, action = ArgAction::Count, group = "verbosity")]
    pub quiet: u8,
}
