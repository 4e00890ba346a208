use crate::error::Result;

use super::{args::GetConfigArgs, open_store};

pub async fn main(args: GetConfigArgs) -> Result<()> {
    let store = open_store(&args.global);
    let config = store.load_config().await?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}
