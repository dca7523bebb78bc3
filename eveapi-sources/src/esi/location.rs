//! Station and structure resolution to solar systems.

use std::collections::HashMap;
use std::sync::Arc;

use eveapi_core::{Credential, LocationKind, LocationReference, SystemId};
use eveapi_fetch::{FetchError, RequestContext};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

use super::service::EsiService;

/// A character's clone locations resolved to solar systems.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CloneSystems {
    /// System of the home location, if one is set.
    pub home: Option<SystemId>,
    /// Home system first (when set), then every jump clone in ESI order.
    pub systems: Vec<SystemId>,
}

/// Resolves stations and structures to the solar system containing them.
///
/// Resolved ids are remembered in a table owned by the resolver. The table
/// is keyed by location id alone: station and structure ids never collide.
pub struct LocationResolver {
    esi: Arc<EsiService>,
    table: RwLock<HashMap<i64, SystemId>>,
}

impl LocationResolver {
    /// Creates a resolver with an empty table.
    pub fn new(esi: Arc<EsiService>) -> Self {
        Self {
            esi,
            table: RwLock::new(HashMap::new()),
        }
    }

    /// The ESI service used on a miss.
    pub fn esi(&self) -> &Arc<EsiService> {
        &self.esi
    }

    /// Returns the remembered system for a location id.
    pub async fn cached(&self, location_id: i64) -> Option<SystemId> {
        self.table.read().await.get(&location_id).copied()
    }

    /// Number of remembered locations.
    pub async fn len(&self) -> usize {
        self.table.read().await.len()
    }

    /// Returns true if nothing has been resolved yet.
    pub async fn is_empty(&self) -> bool {
        self.table.read().await.is_empty()
    }

    /// Resolves `location` to its solar system.
    ///
    /// Structures go through the authenticated endpoint, stations through
    /// the public one. The lock is not held while fetching, so concurrent
    /// misses for the same id may both fetch; the last write wins.
    #[instrument(skip(self, ctx, credential), fields(id = location.id, kind = %location.kind))]
    pub async fn resolve(
        &self,
        ctx: &RequestContext,
        location: LocationReference,
        credential: Option<&Credential>,
    ) -> Result<SystemId, FetchError> {
        if let Some(system) = self.cached(location.id).await {
            debug!(system, "Location table hit");
            return Ok(system);
        }

        let system = match location.kind {
            LocationKind::Structure => {
                self.esi
                    .structure(ctx, location.id, credential)
                    .await?
                    .solar_system_id
            }
            LocationKind::Station => self.esi.station(ctx, location.id).await?.system_id,
        };

        self.table.write().await.insert(location.id, system);
        Ok(system)
    }

    /// Resolves the home location and every jump clone of a character.
    ///
    /// Fails on the first location that cannot be resolved.
    pub async fn clone_locations(
        &self,
        ctx: &RequestContext,
        character_id: i64,
        credential: Option<&Credential>,
    ) -> Result<CloneSystems, FetchError> {
        let clones = self.esi.clones(ctx, character_id, credential).await?;

        let mut systems = Vec::with_capacity(clones.jump_clones.len() + 1);
        let home = match clones.home_location {
            Some(home) => {
                let system = self.resolve(ctx, home.reference(), credential).await?;
                systems.push(system);
                Some(system)
            }
            None => None,
        };

        for clone in &clones.jump_clones {
            systems.push(self.resolve(ctx, clone.reference(), credential).await?);
        }

        Ok(CloneSystems { home, systems })
    }

    /// Current solar system of a character.
    pub async fn character_location(
        &self,
        ctx: &RequestContext,
        character_id: i64,
        credential: Option<&Credential>,
    ) -> Result<SystemId, FetchError> {
        Ok(self
            .esi
            .character_location(ctx, character_id, credential)
            .await?
            .solar_system_id)
    }
}

impl std::fmt::Debug for LocationResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocationResolver")
            .field("esi", &self.esi)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use eveapi_core::CacheRepository;
    use eveapi_fetch::{
        HttpRequest, HttpResponse, HttpSender, ManualClock, RequestExecutor, Transport,
    };
    use reqwest::header::AUTHORIZATION;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct RouteSender {
        routes: Mutex<HashMap<String, String>>,
        requests: Mutex<Vec<HttpRequest>>,
    }

    impl RouteSender {
        fn route(&self, path: &str, body: &str) {
            self.routes
                .lock()
                .unwrap()
                .insert(path.to_string(), body.to_string());
        }

        fn paths(&self) -> Vec<String> {
            self.requests
                .lock()
                .unwrap()
                .iter()
                .map(|r| r.url.path().to_string())
                .collect()
        }

        fn authorized(&self, path: &str) -> bool {
            self.requests
                .lock()
                .unwrap()
                .iter()
                .any(|r| r.url.path() == path && r.headers.contains_key(AUTHORIZATION))
        }
    }

    #[async_trait]
    impl HttpSender for RouteSender {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, FetchError> {
            let body = self.routes.lock().unwrap().get(request.url.path()).cloned();
            self.requests.lock().unwrap().push(request);
            Ok(match body {
                Some(body) => HttpResponse::new(200, body.into_bytes()),
                None => HttpResponse::new(404, b"{}".to_vec()),
            })
        }
    }

    /// A cache that never hits, so every miss in the resolver reaches the sender.
    struct NoCache;

    impl CacheRepository for NoCache {
        fn get(&self, _key: &str) -> Option<Vec<u8>> {
            None
        }

        fn set(&self, _key: &str, _value: Vec<u8>, _ttl: Duration) {}

        fn delete(&self, _key: &str) {}
    }

    fn resolver() -> (Arc<RouteSender>, LocationResolver) {
        let sender = Arc::new(RouteSender::default());
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        ));
        let transport = Transport::new(sender.clone(), "eveapi-test")
            .unwrap()
            .with_clock(clock);
        let executor = RequestExecutor::new(
            "https://esi.example.com/latest/",
            Arc::new(transport),
            Arc::new(NoCache),
        )
        .unwrap();
        let esi = Arc::new(EsiService::new(Arc::new(executor)));
        (sender, LocationResolver::new(esi))
    }

    const STATION: &str = r#"{"station_id": 60003760, "name": "Jita IV - Moon 4", "system_id": 30000142}"#;
    const STRUCTURE: &str = r#"{"name": "Keepstar", "owner_id": 98000001, "solar_system_id": 30002187}"#;

    #[tokio::test]
    async fn test_station_resolves_publicly_and_is_remembered() {
        let (sender, resolver) = resolver();
        sender.route("/latest/universe/stations/60003760/", STATION);
        let ctx = RequestContext::new();
        let cred = Credential::new("tok");

        let first = resolver
            .resolve(&ctx, LocationReference::station(60_003_760), Some(&cred))
            .await
            .unwrap();
        let second = resolver
            .resolve(&ctx, LocationReference::station(60_003_760), Some(&cred))
            .await
            .unwrap();

        assert_eq!(first, 30_000_142);
        assert_eq!(second, 30_000_142);
        assert_eq!(sender.paths().len(), 1);
        assert!(!sender.authorized("/latest/universe/stations/60003760/"));
        assert_eq!(resolver.cached(60_003_760).await, Some(30_000_142));
    }

    #[tokio::test]
    async fn test_structure_uses_credential() {
        let (sender, resolver) = resolver();
        sender.route("/latest/universe/structures/1035466617946/", STRUCTURE);
        let cred = Credential::new("tok");

        let system = resolver
            .resolve(
                &RequestContext::new(),
                LocationReference::structure(1_035_466_617_946),
                Some(&cred),
            )
            .await
            .unwrap();

        assert_eq!(system, 30_002_187);
        assert!(sender.authorized("/latest/universe/structures/1035466617946/"));
    }

    #[tokio::test]
    async fn test_failed_resolution_is_not_remembered() {
        let (_, resolver) = resolver();

        let err = resolver
            .resolve(&RequestContext::new(), LocationReference::station(1), None)
            .await
            .unwrap_err();

        assert!(err.is_not_found());
        assert!(resolver.is_empty().await);
    }

    #[tokio::test]
    async fn test_clone_locations_home_first() {
        let (sender, resolver) = resolver();
        sender.route(
            "/latest/characters/9/clones/",
            r#"{
                "home_location": {"location_id": 60003760, "location_type": "station"},
                "jump_clones": [
                    {"jump_clone_id": 1, "location_id": 1035466617946, "location_type": "structure", "implants": []},
                    {"jump_clone_id": 2, "location_id": 60003760, "location_type": "station", "implants": [22118]}
                ]
            }"#,
        );
        sender.route("/latest/universe/stations/60003760/", STATION);
        sender.route("/latest/universe/structures/1035466617946/", STRUCTURE);
        let cred = Credential::new("tok");

        let clones = resolver
            .clone_locations(&RequestContext::new(), 9, Some(&cred))
            .await
            .unwrap();

        assert_eq!(clones.home, Some(30_000_142));
        assert_eq!(clones.systems, vec![30_000_142, 30_002_187, 30_000_142]);
        // the station is fetched once, the second clone hits the table
        let station_fetches = sender
            .paths()
            .iter()
            .filter(|p| p.contains("/stations/"))
            .count();
        assert_eq!(station_fetches, 1);
        assert_eq!(resolver.len().await, 2);
    }

    #[tokio::test]
    async fn test_character_location() {
        let (sender, resolver) = resolver();
        sender.route(
            "/latest/characters/9/location/",
            r#"{"solar_system_id": 30000142, "station_id": 60003760}"#,
        );

        let system = resolver
            .character_location(&RequestContext::new(), 9, Some(&Credential::new("tok")))
            .await
            .unwrap();

        assert_eq!(system, 30_000_142);
    }
}
