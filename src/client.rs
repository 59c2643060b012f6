//! Per-entity client assembly.

use std::sync::Arc;

use crate::error::{PremiaError, Result};
use crate::host::HostEnv;
use crate::license::{ActivationRecord, LicenseManager};
use crate::storage::{MemoryOptionStore, MemoryTtlCache, OptionStore, TtlCache};
use crate::transport::{NoopRequestFilter, RequestFilter, Transport};
use crate::types::{Entity, MarketingInfo, UpdateInfo};
use crate::updates::UpdateManager;

/// Default Premia API URL.
pub const DEFAULT_BASE_URL: &str = "https://api.premia.dev";

/// Configuration options for [`PremiaClient`].
#[derive(Clone, Default)]
pub struct ClientOptions {
    /// Premia server URL (default: [`DEFAULT_BASE_URL`]).
    pub base_url: Option<String>,
    /// Durable option store (default: in-memory).
    pub options_store: Option<Arc<dyn OptionStore>>,
    /// TTL cache (default: in-memory).
    pub cache: Option<Arc<dyn TtlCache>>,
    /// Request filter invoked before every dispatch (default: no-op).
    pub filter: Option<Arc<dyn RequestFilter>>,
    /// Skip TLS certificate verification. For hosts with interception
    /// proxies; leave off everywhere else.
    pub danger_accept_invalid_certs: bool,
}

impl std::fmt::Debug for ClientOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientOptions")
            .field("base_url", &self.base_url)
            .field("options_store", &"<store>")
            .field("cache", &"<cache>")
            .field("filter", &"<filter>")
            .field(
                "danger_accept_invalid_certs",
                &self.danger_accept_invalid_certs,
            )
            .finish()
    }
}

/// Premia licensing client for one entity.
///
/// Construct one value per licensed entity and pass it by reference to
/// consumers; there is no process-wide registry.
///
/// # Example
/// ```rust,ignore
/// use premia_sdk::{ClientOptions, Entity, PremiaClient, StaticHostEnv};
/// use std::sync::Arc;
///
/// let host = Arc::new(StaticHostEnv {
///     site_url: "https://example.com".into(),
///     instance_id: "1".into(),
///     installed_version: "1.4.0".into(),
///     platform_version: "6.4".into(),
///     language_version: "8.2".into(),
///     ..Default::default()
/// });
/// let client = PremiaClient::new(Entity::plugin("42"), host, ClientOptions::default())?;
///
/// client.activate("ABCD-1234").await?;
/// if let Some(update) = client.get_update_info(false).await? {
///     println!("update available: {}", update.version);
/// }
/// ```
pub struct PremiaClient {
    license: LicenseManager,
    updates: UpdateManager,
}

impl PremiaClient {
    pub fn new(
        entity: Entity,
        host: Arc<dyn HostEnv>,
        options: ClientOptions,
    ) -> Result<Self> {
        if entity.id.trim().is_empty() {
            return Err(PremiaError::validation("entity id is required"));
        }

        let base_url = options
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let store: Arc<dyn OptionStore> = options
            .options_store
            .unwrap_or_else(|| Arc::new(MemoryOptionStore::new()));
        let cache: Arc<dyn TtlCache> = options
            .cache
            .unwrap_or_else(|| Arc::new(MemoryTtlCache::new()));
        let filter: Arc<dyn RequestFilter> = options
            .filter
            .unwrap_or_else(|| Arc::new(NoopRequestFilter));

        let transport = Transport::new(
            &base_url,
            entity,
            options.danger_accept_invalid_certs,
            filter,
        )?;

        Ok(Self {
            license: LicenseManager::new(transport.clone(), store, host.clone()),
            updates: UpdateManager::new(transport, cache, host),
        })
    }

    /// Activate this install with a license key.
    pub async fn activate(&self, license_key: &str) -> Result<bool> {
        self.license.activate(license_key).await
    }

    /// Deactivate this install.
    pub async fn deactivate(&self) -> Result<bool> {
        self.license.deactivate().await
    }

    /// Refresh install data by deactivating and re-activating with the
    /// stored key.
    pub async fn sync_install(&self) -> Result<bool> {
        self.license.sync_install().await
    }

    /// Whether this install currently holds a usable activation.
    pub fn is_active(&self) -> bool {
        self.license.is_active()
    }

    /// The durable activation record, if one exists.
    pub fn activation_record(&self) -> Option<ActivationRecord> {
        self.license.record()
    }

    /// Latest applicable release, or `None` when up to date.
    pub async fn get_update_info(&self, force: bool) -> Result<Option<UpdateInfo>> {
        self.updates.get_update_info(&self.license, force).await
    }

    /// Marketing metadata for the product listing.
    pub async fn get_marketing_info(&self) -> Result<MarketingInfo> {
        self.updates.get_marketing_info(&self.license).await
    }
}

impl std::fmt::Debug for PremiaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PremiaClient")
            .field("license", &self.license)
            .field("updates", &self.updates)
            .finish()
    }
}
