//! Typed ESI endpoints.
//!
//! Thin wrappers over [`RequestExecutor`]: every method builds an endpoint,
//! runs a GET and decodes the body. Static data goes through the cache.
//! Per-character state (location, clones, assets) is always fetched fresh,
//! because the cache key does not include the credential. The only direct
//! `execute` call is the SSO token verification, which lives outside the
//! ESI base URL.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use eveapi_core::{
    AllianceInfo, Asset, CharacterInfo, CharacterLocation, CharacterPortrait, CloneLocations,
    CorporationInfo, Credential, DetailRecord, EntityKind, LocationInventory, SolarSystem,
    Station, Structure, SystemId, VerifiedUser, cyno_inventories,
};
use eveapi_fetch::{FetchError, RequestContext, RequestExecutor};
use reqwest::Method;
use tracing::{debug, instrument};
use url::Url;

use crate::traits::DetailSource;

/// Default ESI base URL.
pub const ESI_BASE_URL: &str = "https://esi.evetech.net/latest/";

/// EVE SSO token verification endpoint.
pub const SSO_VERIFY_URL: &str = "https://login.eveonline.com/oauth/verify";

/// Entries per page of an ESI asset list.
pub const ASSET_PAGE_SIZE: usize = 1000;

/// Upper bound on asset pages fetched for one owner.
const MAX_ASSET_PAGES: u32 = 100;

// ============================================================================
// Service
// ============================================================================

/// Higher-level access to the ESI endpoints the pipeline uses.
pub struct EsiService {
    client: Arc<RequestExecutor>,
    verify_url: String,
}

impl EsiService {
    /// Wraps an executor pointed at the ESI base URL.
    pub fn new(client: Arc<RequestExecutor>) -> Self {
        Self {
            client,
            verify_url: SSO_VERIFY_URL.to_string(),
        }
    }

    /// Points token verification at another SSO host.
    pub fn with_verify_url(mut self, url: impl Into<String>) -> Self {
        self.verify_url = url.into();
        self
    }

    /// The underlying executor.
    pub fn client(&self) -> &Arc<RequestExecutor> {
        &self.client
    }

    // ------------------------------------------------------------------------
    // Auth
    // ------------------------------------------------------------------------

    /// Resolves the character a token belongs to.
    #[instrument(skip(self, ctx, credential))]
    pub async fn verify(
        &self,
        ctx: &RequestContext,
        credential: &Credential,
    ) -> Result<VerifiedUser, FetchError> {
        if credential.access_token.is_empty() {
            return Err(FetchError::InvalidRequest("no token provided".to_string()));
        }
        let url = Url::parse(&self.verify_url)
            .map_err(|e| FetchError::InvalidUrl(format!("{}: {e}", self.verify_url)))?;
        let body = self
            .client
            .execute(ctx, Method::GET, &url, Some(credential), None, &[])
            .await?;
        Ok(serde_json::from_slice(&body)?)
    }

    // ------------------------------------------------------------------------
    // Characters, corporations, alliances
    // ------------------------------------------------------------------------

    /// Public character record.
    pub async fn character_info(
        &self,
        ctx: &RequestContext,
        character_id: i64,
    ) -> Result<CharacterInfo, FetchError> {
        self.client
            .get_json(ctx, &format!("characters/{character_id}/"), None, &[])
            .await
    }

    /// Character record fetched with a credential.
    pub async fn character_data(
        &self,
        ctx: &RequestContext,
        character_id: i64,
        credential: Option<&Credential>,
    ) -> Result<CharacterInfo, FetchError> {
        self.client
            .get_json(ctx, &format!("characters/{character_id}/"), credential, &[])
            .await
    }

    /// Current corporation of a character.
    pub async fn character_corporation(
        &self,
        ctx: &RequestContext,
        character_id: i64,
        credential: Option<&Credential>,
    ) -> Result<i64, FetchError> {
        Ok(self
            .character_data(ctx, character_id, credential)
            .await?
            .corporation_id)
    }

    /// URL of the 64x64 character portrait.
    pub async fn character_portrait(
        &self,
        ctx: &RequestContext,
        character_id: i64,
    ) -> Result<String, FetchError> {
        let portrait: CharacterPortrait = self
            .client
            .get_json(ctx, &format!("characters/{character_id}/portrait/"), None, &[])
            .await?;
        Ok(portrait.px64x64)
    }

    /// Public corporation record.
    pub async fn corporation_info(
        &self,
        ctx: &RequestContext,
        corporation_id: i64,
    ) -> Result<CorporationInfo, FetchError> {
        self.client
            .get_json(ctx, &format!("corporations/{corporation_id}/"), None, &[])
            .await
    }

    /// Public alliance record. Id 0 means "no alliance" and is rejected.
    pub async fn alliance_info(
        &self,
        ctx: &RequestContext,
        alliance_id: i64,
    ) -> Result<AllianceInfo, FetchError> {
        if alliance_id == 0 {
            return Err(FetchError::InvalidRequest(
                "no alliance specified".to_string(),
            ));
        }
        self.client
            .get_json(ctx, &format!("alliances/{alliance_id}/"), None, &[])
            .await
    }

    // ------------------------------------------------------------------------
    // Search
    // ------------------------------------------------------------------------

    /// Finds the id of an entity by exact name.
    ///
    /// Searches as `character_id`. When several ids come back, the first
    /// one whose name matches case-insensitively wins; otherwise the first
    /// id is returned.
    #[instrument(skip(self, ctx, credential))]
    pub async fn id_search(
        &self,
        ctx: &RequestContext,
        character_id: i64,
        name: &str,
        kind: EntityKind,
        credential: Option<&Credential>,
    ) -> Result<i64, FetchError> {
        let category = kind.as_str();
        let params = [
            ("categories", category),
            ("language", "en"),
            ("search", name),
            ("strict", "true"),
        ];
        let result: HashMap<String, Vec<i64>> = self
            .client
            .get_json(
                ctx,
                &format!("characters/{character_id}/search/"),
                credential,
                &params,
            )
            .await?;

        let ids = result.get(category).map(Vec::as_slice).unwrap_or_default();
        let Some(&first) = ids.first() else {
            return Err(FetchError::EmptyResponse(format!(
                "no {category} ids returned for {name:?}"
            )));
        };
        if ids.len() == 1 {
            return Ok(first);
        }

        for &id in ids {
            match self.entity_name(ctx, kind, id).await {
                Ok(candidate) if candidate.eq_ignore_ascii_case(name) => return Ok(id),
                Ok(_) => {}
                Err(e) => debug!(id, error = %e, "Skipping candidate"),
            }
        }
        Ok(first)
    }

    /// [`id_search`](Self::id_search) for characters.
    pub async fn character_id_search(
        &self,
        ctx: &RequestContext,
        character_id: i64,
        name: &str,
        credential: Option<&Credential>,
    ) -> Result<i64, FetchError> {
        self.id_search(ctx, character_id, name, EntityKind::Character, credential)
            .await
    }

    /// [`id_search`](Self::id_search) for corporations.
    pub async fn corporation_id_search(
        &self,
        ctx: &RequestContext,
        character_id: i64,
        name: &str,
        credential: Option<&Credential>,
    ) -> Result<i64, FetchError> {
        self.id_search(ctx, character_id, name, EntityKind::Corporation, credential)
            .await
    }

    /// [`id_search`](Self::id_search) for alliances.
    pub async fn alliance_id_search(
        &self,
        ctx: &RequestContext,
        character_id: i64,
        name: &str,
        credential: Option<&Credential>,
    ) -> Result<i64, FetchError> {
        self.id_search(ctx, character_id, name, EntityKind::Alliance, credential)
            .await
    }

    async fn entity_name(
        &self,
        ctx: &RequestContext,
        kind: EntityKind,
        id: i64,
    ) -> Result<String, FetchError> {
        Ok(match kind {
            EntityKind::Character => self.character_info(ctx, id).await?.name,
            EntityKind::Corporation => self.corporation_info(ctx, id).await?.name,
            EntityKind::Alliance => self.alliance_info(ctx, id).await?.name,
        })
    }

    // ------------------------------------------------------------------------
    // Killmails and universe
    // ------------------------------------------------------------------------

    /// ESI killmail by id and hash.
    pub async fn killmail(
        &self,
        ctx: &RequestContext,
        killmail_id: i64,
        hash: &str,
    ) -> Result<DetailRecord, FetchError> {
        self.client
            .get_json(ctx, &format!("killmails/{killmail_id}/{hash}/"), None, &[])
            .await
    }

    /// Solar system record.
    pub async fn solar_system(
        &self,
        ctx: &RequestContext,
        system_id: SystemId,
    ) -> Result<SolarSystem, FetchError> {
        self.client
            .get_json(ctx, &format!("universe/systems/{system_id}/"), None, &[])
            .await
    }

    /// Name of a solar system, or an empty string if it cannot be fetched.
    pub async fn system_name(&self, ctx: &RequestContext, system_id: SystemId) -> String {
        match self.solar_system(ctx, system_id).await {
            Ok(system) => system.name,
            Err(e) => {
                debug!(system_id, error = %e, "System name unavailable");
                String::new()
            }
        }
    }

    /// Public station record.
    pub async fn station(
        &self,
        ctx: &RequestContext,
        station_id: i64,
    ) -> Result<Station, FetchError> {
        self.client
            .get_json(ctx, &format!("universe/stations/{station_id}/"), None, &[])
            .await
    }

    /// Structure record; requires a credential with docking access.
    pub async fn structure(
        &self,
        ctx: &RequestContext,
        structure_id: i64,
        credential: Option<&Credential>,
    ) -> Result<Structure, FetchError> {
        self.client
            .get_json(
                ctx,
                &format!("universe/structures/{structure_id}/"),
                credential,
                &[],
            )
            .await
    }

    /// Current location of a character.
    pub async fn character_location(
        &self,
        ctx: &RequestContext,
        character_id: i64,
        credential: Option<&Credential>,
    ) -> Result<CharacterLocation, FetchError> {
        self.client
            .get_fresh_json(
                ctx,
                &format!("characters/{character_id}/location/"),
                credential,
                &[],
            )
            .await
    }

    /// Home and jump clone locations of a character.
    pub async fn clones(
        &self,
        ctx: &RequestContext,
        character_id: i64,
        credential: Option<&Credential>,
    ) -> Result<CloneLocations, FetchError> {
        self.client
            .get_fresh_json(
                ctx,
                &format!("characters/{character_id}/clones/"),
                credential,
                &[],
            )
            .await
    }

    // ------------------------------------------------------------------------
    // Assets
    // ------------------------------------------------------------------------

    /// Locations where a character keeps cyno items.
    pub async fn character_assets(
        &self,
        ctx: &RequestContext,
        character_id: i64,
        credential: Option<&Credential>,
    ) -> Result<Vec<LocationInventory>, FetchError> {
        let assets = self
            .assets(ctx, &format!("characters/{character_id}/assets/"), credential)
            .await?;
        Ok(cyno_inventories(character_id, &assets))
    }

    /// Locations where a corporation keeps cyno items.
    pub async fn corporation_assets(
        &self,
        ctx: &RequestContext,
        corporation_id: i64,
        credential: Option<&Credential>,
    ) -> Result<Vec<LocationInventory>, FetchError> {
        let assets = self
            .assets(
                ctx,
                &format!("corporations/{corporation_id}/assets/"),
                credential,
            )
            .await?;
        Ok(cyno_inventories(corporation_id, &assets))
    }

    /// Every page of an asset list. A full page means another may follow;
    /// a 404 past the first page ends the list.
    #[instrument(skip(self, ctx, credential))]
    async fn assets(
        &self,
        ctx: &RequestContext,
        endpoint: &str,
        credential: Option<&Credential>,
    ) -> Result<Vec<Asset>, FetchError> {
        let mut assets = Vec::new();
        for page in 1..=MAX_ASSET_PAGES {
            let page_param = page.to_string();
            let batch: Vec<Asset> = match self
                .client
                .get_fresh_json(ctx, endpoint, credential, &[("page", page_param.as_str())])
                .await
            {
                Ok(batch) => batch,
                Err(e) if page > 1 && e.is_not_found() => break,
                Err(e) => return Err(e),
            };
            let full = batch.len() >= ASSET_PAGE_SIZE;
            assets.extend(batch);
            if !full {
                break;
            }
        }
        debug!(count = assets.len(), "Fetched assets");
        Ok(assets)
    }
}

#[async_trait]
impl DetailSource for EsiService {
    async fn fetch_detail(
        &self,
        ctx: &RequestContext,
        killmail_id: i64,
        hash: &str,
    ) -> Result<DetailRecord, FetchError> {
        self.killmail(ctx, killmail_id, hash).await
    }
}

impl std::fmt::Debug for EsiService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EsiService")
            .field("client", &self.client)
            .field("verify_url", &self.verify_url)
            .finish()
    }
}
