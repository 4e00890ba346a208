use clap::builder::styling::AnsiColor;
use log::info;

use crate::{error::Result, format::format_path};

use super::{args::ResetArgs, open_store};

pub async fn main(args: ResetArgs) -> Result<()> {
    let store = open_store(&args.global);
    let removed = store.reset().await?;

    let style = AnsiColor::Yellow.on_default();
    info!(
        "{style}reset{style:#} {} ({removed} group files removed)",
        format_path(store.dir())
    );
    Ok(())
}
