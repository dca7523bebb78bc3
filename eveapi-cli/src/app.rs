//! Pipeline wiring shared by the commands.

use std::sync::Arc;

use anyhow::{Context, Result};
use eveapi_core::{CacheRepository, Credential};
use eveapi_fetch::{ReqwestSender, RequestContext, RequestExecutor, Transport};
use eveapi_sources::{EsiService, KillmailAggregator, LocationResolver, ZkillClient};
use eveapi_store::{Config, DiskCache, MemoryCache};
use tracing::{debug, warn};

use crate::Cli;

/// Aggregator over the live zKillboard feed and ESI details.
pub type LiveAggregator = KillmailAggregator<Arc<ZkillClient>, Arc<EsiService>>;

/// Everything a command needs to talk to the upstreams.
pub struct App {
    /// Loaded configuration.
    pub config: Config,
    /// Shared response cache.
    pub cache: Arc<dyn CacheRepository>,
    /// ESI executor.
    pub executor: Arc<RequestExecutor>,
    /// ESI endpoints.
    pub esi: Arc<EsiService>,
    /// zKillboard client.
    pub zkill: Arc<ZkillClient>,
}

impl App {
    /// Loads the configuration named on the command line and builds the pipeline.
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let config = load_config(cli)?;
        Self::build(config)
    }

    /// Builds the pipeline from `config`.
    pub fn build(config: Config) -> Result<Self> {
        let sender = ReqwestSender::with_timeout(config.general.timeout())
            .context("failed to create HTTP client")?;
        let transport = Arc::new(
            Transport::new(Arc::new(sender), &config.general.user_agent)
                .context("invalid user agent")?,
        );

        let cache: Arc<dyn CacheRepository> = if config.cache.persistent {
            let dir = config.cache.resolved_dir();
            debug!(dir = %dir.display(), "Using disk cache");
            Arc::new(DiskCache::open(&dir).with_context(|| {
                format!("failed to open cache directory {}", dir.display())
            })?)
        } else {
            Arc::new(MemoryCache::new())
        };

        let executor = Arc::new(
            RequestExecutor::new(&config.esi.base_url, transport.clone(), cache.clone())?
                .with_cache_ttl(config.esi.cache_ttl()),
        );
        let esi = Arc::new(EsiService::new(executor.clone()));
        let zkill = Arc::new(
            ZkillClient::new(&config.zkill.base_url, transport, cache.clone())?
                .with_ttls(config.zkill.long_ttl(), config.zkill.short_ttl()),
        );

        Ok(Self {
            config,
            cache,
            executor,
            esi,
            zkill,
        })
    }

    /// Aggregator honouring the configured page ceiling.
    pub fn aggregator(&self) -> LiveAggregator {
        KillmailAggregator::new(self.zkill.clone(), self.esi.clone())
            .with_max_pages(self.config.zkill.max_pages)
    }

    /// Location resolver backed by this pipeline's ESI service.
    pub fn resolver(&self) -> LocationResolver {
        LocationResolver::new(self.esi.clone())
    }
}

/// Loads the config from `--config` or the default path.
pub fn load_config(cli: &Cli) -> Result<Config> {
    let path = cli.config.clone().unwrap_or_else(Config::default_path);
    Config::load_from(&path).with_context(|| format!("failed to load {}", path.display()))
}

/// Credential from `--token`, if one was given.
pub fn credential(cli: &Cli) -> Option<Credential> {
    cli.token
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(Credential::new)
}

/// Like [`credential`], failing when no token was given.
pub fn require_credential(cli: &Cli) -> Result<Credential> {
    credential(cli).context("this command needs an access token (--token or EVEAPI_ACCESS_TOKEN)")
}

/// Request context cancelled on Ctrl-C.
pub fn interruptible_context() -> RequestContext {
    let ctx = RequestContext::new();
    let handle = ctx.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                warn!("Interrupted, finishing current request");
                handle.cancel();
            }
            Err(e) => debug!(error = %e, "Ctrl-C handler unavailable"),
        }
    });
    ctx
}
