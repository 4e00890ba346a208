mod args;
mod config;
mod init;
mod parse;
mod reset;
mod start;

use std::{env, fmt::Display, path::PathBuf, process::ExitCode};

use clap::{
    builder::{styling::AnsiColor, Styles},
    Parser, Subcommand,
};
use concolor_clap::ColorChoice;
use env_logger::WriteStyle;
use log::error;

use crate::{logger, store::LocalJobStore};

use self::args::{GetConfigArgs, GlobalArgs, InitArgs, LoggerArgs, ResetArgs, StartArgs};

/// Overrides the default data directory when `--data-dir` is not given.
pub const DATA_DIR_ENV_VAR: &str = "UPMANY_DATA_DIR";
pub const DEFAULT_DATA_DIR: &str = ".upmany";

#[derive(Parser, Debug)]
#[command(version, about, long_about = None, propagate_version = true, styles = cli_styles())]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Save the server URL, folder and extensions to upload
    Init(InitArgs),
    /// Scan the folder if needed, then upload everything not uploaded yet
    Start(StartArgs),
    /// Forget the settings and all progress
    Reset(ResetArgs),
    /// Print the saved settings
    GetConfig(GetConfigArgs),
}

impl Command {
    fn global(&self) -> &GlobalArgs {
        match self {
            Command::Init(args) => &args.global,
            Command::Start(args) => &args.global,
            Command::Reset(args) => &args.global,
            Command::GetConfig(args) => &args.global,
        }
    }
}

pub async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logger(&cli.command.global().logger);

    let result = match cli.command {
        Command::Init(args) => init::main(args).await,
        Command::Start(args) => start::main(args).await,
        Command::Reset(args) => reset::main(args).await,
        Command::GetConfig(args) => config::main(args).await,
    };

    if let Err(err) = result {
        error!("{err}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

fn init_logger(args: &LoggerArgs) {
    let verbose = i8::try_from(args.verbose).unwrap_or(i8::MAX);
    let quiet = i8::try_from(args.quiet).unwrap_or(i8::MAX);
    logger::init(verbose.saturating_sub(quiet), write_style(&args.color));
}

fn write_style(choice: &ColorChoice) -> WriteStyle {
    match choice {
        ColorChoice::Auto => WriteStyle::Auto,
        ColorChoice::Always => WriteStyle::Always,
        ColorChoice::Never => WriteStyle::Never,
    }
}

fn open_store(args: &GlobalArgs) -> LocalJobStore {
    let env_value = env::var_os(DATA_DIR_ENV_VAR).map(PathBuf::from);
    LocalJobStore::new(data_dir(args.data_dir.clone(), env_value))
}

fn data_dir(flag: Option<PathBuf>, env_value: Option<PathBuf>) -> PathBuf {
    flag.or(env_value.filter(|dir| !dir.as_os_str().is_empty()))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))
}

fn print_stat<T: Display>(name: &str, value: T) {
    let style = AnsiColor::BrightBlue.on_default();
    println!("{style}{name}:{style:#} {value}");
}

fn cli_styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::BrightMagenta.on_default())
        .usage(AnsiColor::BrightMagenta.on_default())
        .literal(AnsiColor::BrightBlue.on_default())
        .placeholder(AnsiColor::BrightCyan.on_default())
}
