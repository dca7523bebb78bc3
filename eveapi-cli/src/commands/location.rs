//! Location command - resolve stations, structures and character locations.

use anyhow::{Result, bail};
use clap::{Args, Subcommand};
use eveapi_core::{LocationReference, SystemId};
use eveapi_fetch::RequestContext;
use eveapi_sources::EsiService;

use crate::app::{App, credential, interruptible_context, require_credential};
use crate::output::{ClonesOutput, JsonFormatter, SystemOutput, TextFormatter};
use crate::{Cli, ExitCode, OutputFormat};

/// Arguments for the location command.
#[derive(Args)]
pub struct LocationArgs {
    #[command(subcommand)]
    pub action: LocationAction,
}

/// Location subcommands.
#[derive(Subcommand)]
pub enum LocationAction {
    /// Resolve a station or structure to its solar system.
    Resolve {
        /// NPC station id.
        #[arg(long, conflicts_with = "structure")]
        station: Option<i64>,

        /// Player structure id (needs a token).
        #[arg(long)]
        structure: Option<i64>,
    },

    /// Solar systems of a character's home and jump clones (needs a token).
    Clones {
        /// Character id.
        #[arg(long)]
        character: i64,
    },

    /// Current solar system of a character (needs a token).
    Current {
        /// Character id.
        #[arg(long)]
        character: i64,
    },
}

/// Runs the location command.
pub async fn run(args: &LocationArgs, cli: &Cli) -> Result<ExitCode> {
    let app = App::from_cli(cli)?;
    let resolver = app.resolver();
    let ctx = interruptible_context();

    match &args.action {
        LocationAction::Resolve { station, structure } => {
            let (location, cred) = match (station, structure) {
                (Some(id), None) => (LocationReference::station(*id), credential(cli)),
                (None, Some(id)) => (
                    LocationReference::structure(*id),
                    Some(require_credential(cli)?),
                ),
                _ => bail!("give exactly one of --station or --structure"),
            };
            let system = resolver.resolve(&ctx, location, cred.as_ref()).await?;
            let output = named(&app.esi, &ctx, system).await;
            print_system(&output, cli)?;
        }
        LocationAction::Clones { character } => {
            let cred = require_credential(cli)?;
            let clones = resolver.clone_locations(&ctx, *character, Some(&cred)).await?;

            let mut systems = Vec::with_capacity(clones.systems.len());
            for system in &clones.systems {
                systems.push(named(&app.esi, &ctx, *system).await);
            }
            let home = match clones.home {
                Some(system) => Some(named(&app.esi, &ctx, system).await),
                None => None,
            };
            let output = ClonesOutput {
                character_id: *character,
                home,
                systems,
            };

            match cli.format {
                OutputFormat::Json => {
                    println!("{}", JsonFormatter::new(cli.pretty).format(&output)?);
                }
                OutputFormat::Text => {
                    let formatter = TextFormatter::new(!cli.no_color);
                    println!("{}", formatter.format_clones(&output));
                }
            }
        }
        LocationAction::Current { character } => {
            let cred = require_credential(cli)?;
            let system = resolver.character_location(&ctx, *character, Some(&cred)).await?;
            let output = named(&app.esi, &ctx, system).await;
            print_system(&output, cli)?;
        }
    }

    Ok(ExitCode::Success)
}

async fn named(esi: &EsiService, ctx: &RequestContext, system_id: SystemId) -> SystemOutput {
    SystemOutput {
        system_id,
        name: esi.system_name(ctx, system_id).await,
    }
}

fn print_system(output: &SystemOutput, cli: &Cli) -> Result<()> {
    match cli.format {
        OutputFormat::Json => println!("{}", JsonFormatter::new(cli.pretty).format(output)?),
        OutputFormat::Text => {
            println!("{}", TextFormatter::new(!cli.no_color).format_system(output));
        }
    }
    Ok(())
}
