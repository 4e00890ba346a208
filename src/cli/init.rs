use clap::builder::styling::AnsiColor;
use log::info;

use crate::{error::Result, format::format_path};

use super::{args::InitArgs, open_store};

pub async fn main(args: InitArgs) -> Result<()> {
    let store = open_store(&args.global);
    let config = store
        .load_config()
        .await?
        .init(args.server_url, args.folder_path, args.extname)
        .await?;
    store.save_config(&config).await?;

    let style = AnsiColor::Green.on_default();
    info!(
        "{style}initialized{style:#} {}",
        format_path(&store.config_path())
    );
    Ok(())
}
