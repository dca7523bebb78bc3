//! Assets command - locations where a character or corporation keeps cyno items.

use anyhow::{Result, bail};
use clap::Args;

use crate::app::{App, interruptible_context, require_credential};
use crate::output::{JsonFormatter, TextFormatter};
use crate::{Cli, ExitCode, OutputFormat};

/// Arguments for the assets command.
#[derive(Args)]
pub struct AssetsArgs {
    /// Character id.
    #[arg(long, conflicts_with = "corporation")]
    pub character: Option<i64>,

    /// Corporation id (the token needs director access).
    #[arg(long)]
    pub corporation: Option<i64>,
}

/// Runs the assets command.
pub async fn run(args: &AssetsArgs, cli: &Cli) -> Result<ExitCode> {
    let cred = require_credential(cli)?;
    let app = App::from_cli(cli)?;
    let ctx = interruptible_context();

    let stashes = match (args.character, args.corporation) {
        (Some(id), None) => app.esi.character_assets(&ctx, id, Some(&cred)).await?,
        (None, Some(id)) => app.esi.corporation_assets(&ctx, id, Some(&cred)).await?,
        _ => bail!("give exactly one of --character or --corporation"),
    };

    match cli.format {
        OutputFormat::Json => {
            println!("{}", JsonFormatter::new(cli.pretty).format(&stashes)?);
        }
        OutputFormat::Text => {
            let formatter = TextFormatter::new(!cli.no_color);
            if stashes.is_empty() {
                println!("No cyno stashes found");
            }
            for stash in &stashes {
                println!("{}", formatter.format_inventory(stash));
            }
        }
    }

    Ok(ExitCode::Success)
}
