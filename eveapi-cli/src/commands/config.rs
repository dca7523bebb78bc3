//! Config command - manage configuration and the response cache.

use anyhow::{Result, bail};
use clap::{Args, Subcommand};
use eveapi_store::{Config, DiskCache, default_config_dir};
use tracing::info;

use crate::app::load_config;
use crate::output::JsonFormatter;
use crate::{Cli, ExitCode, OutputFormat};

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Config subcommands.
#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration.
    Show,

    /// Show configuration and cache paths.
    Path,

    /// Write a configuration file with every default filled in.
    Init {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },

    /// Remove cached responses from the disk cache.
    ClearCache {
        /// Only remove entries that have expired.
        #[arg(long)]
        expired: bool,
    },

    /// Reset to defaults.
    Reset,
}

/// Runs the config command.
pub async fn run(args: &ConfigArgs, cli: &Cli) -> Result<ExitCode> {
    match &args.action {
        ConfigAction::Show => show_config(cli)?,
        ConfigAction::Path => show_paths(cli)?,
        ConfigAction::Init { force } => init_config(cli, *force)?,
        ConfigAction::ClearCache { expired } => clear_cache(cli, *expired)?,
        ConfigAction::Reset => reset_config(cli).await?,
    }
    Ok(ExitCode::Success)
}

fn config_path(cli: &Cli) -> std::path::PathBuf {
    cli.config.clone().unwrap_or_else(Config::default_path)
}

fn show_config(cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;

    match cli.format {
        OutputFormat::Text => {
            println!("eveapi Configuration");
            println!("{}", "─".repeat(40));
            println!();
            println!("User agent:      {}", config.general.user_agent);
            println!("Timeout:         {}s", config.general.timeout_secs);
            println!("Log level:       {}", config.general.log_level);
            println!();
            println!("ESI base:        {}", config.esi.base_url);
            println!("ESI cache TTL:   {}h", config.esi.cache_ttl_hours);
            println!();
            println!("zKill base:      {}", config.zkill.base_url);
            println!("Max pages:       {}", config.zkill.max_pages);
            println!(
                "Page TTLs:       {}h closed months, {}h running month",
                config.zkill.long_ttl_hours, config.zkill.short_ttl_hours
            );
            println!();
            if config.cache.persistent {
                println!("Cache:           {}", config.cache.resolved_dir().display());
            } else {
                println!("Cache:           in memory");
            }
        }
        OutputFormat::Json => {
            let formatter = JsonFormatter::new(cli.pretty);
            println!("{}", formatter.format(&config)?);
        }
    }

    Ok(())
}

fn show_paths(cli: &Cli) -> Result<()> {
    let config_dir = default_config_dir();
    let config_file = config_path(cli);
    let cache_dir = load_config(cli)?.cache.resolved_dir();

    match cli.format {
        OutputFormat::Text => {
            println!("Configuration Paths");
            println!("{}", "─".repeat(40));
            println!();
            println!("Config dir:  {}", config_dir.display());
            println!("Config file: {}", config_file.display());
            println!("Cache dir:   {}", cache_dir.display());
        }
        OutputFormat::Json => {
            let paths = serde_json::json!({
                "config_dir": config_dir.display().to_string(),
                "config_file": config_file.display().to_string(),
                "cache_dir": cache_dir.display().to_string(),
            });
            let formatter = JsonFormatter::new(cli.pretty);
            println!("{}", formatter.format(&paths)?);
        }
    }

    Ok(())
}

fn init_config(cli: &Cli, force: bool) -> Result<()> {
    let path = config_path(cli);
    if path.exists() && !force {
        bail!("{} already exists; use --force to overwrite", path.display());
    }

    Config::default().save_to(&path)?;
    println!("Wrote {}", path.display());
    Ok(())
}

fn clear_cache(cli: &Cli, expired_only: bool) -> Result<()> {
    let config = load_config(cli)?;
    let dir = config.cache.resolved_dir();
    if !dir.exists() {
        println!("No cache at {}", dir.display());
        return Ok(());
    }

    let cache = DiskCache::open(&dir)?;
    let removed = if expired_only {
        cache.purge_expired()?
    } else {
        cache.clear()?
    };

    info!(dir = %dir.display(), removed, "Cache cleared");
    println!("Removed {removed} cached responses");
    Ok(())
}

async fn reset_config(cli: &Cli) -> Result<()> {
    let path = config_path(cli);

    if path.exists() {
        tokio::fs::remove_file(&path).await?;
        info!(path = %path.display(), "Configuration reset");
        println!("Configuration reset to defaults");
    } else {
        println!("No configuration file to reset");
    }

    Ok(())
}
