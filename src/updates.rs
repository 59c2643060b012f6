//! Update and marketing info with result caching and request throttling.
//!
//! Two cache tiers bound network traffic: result entries (`update_data`,
//! `plugin_info`, 1 day) and throttle markers (`update_check`,
//! `addons_check`, 5 minutes). A marker's existence alone means "a call
//! was attempted recently" and suppresses further network traffic, even
//! when the attempt failed. This caps the long-run rate at one call per
//! operation per window no matter how often callers ask.

use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use reqwest::Method;
use serde_json::{Map, json};

use crate::error::{PremiaError, Result};
use crate::host::HostEnv;
use crate::license::LicenseManager;
use crate::storage::TtlCache;
use crate::transport::Transport;
use crate::types::{MarketingInfo, UpdateInfo};

/// TTL for cached result payloads.
const RESULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);
/// TTL for throttle markers.
const THROTTLE_TTL: Duration = Duration::from_secs(5 * 60);

const UPDATE_DATA: &str = "update_data";
const PLUGIN_INFO: &str = "plugin_info";
const UPDATE_CHECK: &str = "update_check";
const ADDONS_CHECK: &str = "addons_check";

/// Orchestrates "is there a newer release?" and marketing metadata lookups.
pub struct UpdateManager {
    transport: Transport,
    cache: Arc<dyn TtlCache>,
    host: Arc<dyn HostEnv>,
}

impl UpdateManager {
    pub fn new(transport: Transport, cache: Arc<dyn TtlCache>, host: Arc<dyn HostEnv>) -> Self {
        Self {
            transport,
            cache,
            host,
        }
    }

    /// Cache keys are namespaced per entity: `premia_{entity_id}_{name}`.
    fn cache_key(&self, name: &str) -> String {
        format!("premia_{}_{}", self.transport.entity().id, name)
    }

    /// Record that a call was attempted just now. Failed calls count
    /// against the rate limit too.
    fn mark_attempt(&self, name: &str) {
        self.cache.set(
            &self.cache_key(name),
            &Utc::now().timestamp().to_string(),
            THROTTLE_TTL,
        );
    }

    /// Latest release info, or `None` when the host is up to date or the
    /// release cannot run in this environment.
    ///
    /// `force` drops the cached result before reading, but only when not
    /// throttled: a force-check inside the throttle window still serves
    /// the cached value rather than hammering the service.
    pub async fn get_update_info(
        &self,
        license: &LicenseManager,
        force: bool,
    ) -> Result<Option<UpdateInfo>> {
        let throttled = self.cache.get(&self.cache_key(UPDATE_CHECK)).is_some();

        if force && !throttled {
            self.cache.delete(&self.cache_key(UPDATE_DATA));
        }

        if let Some(raw) = self.cache.get(&self.cache_key(UPDATE_DATA))
            && let Ok(cached) = serde_json::from_str::<UpdateInfo>(&raw)
        {
            let current = self.host.installed_version();
            if !cached.version.is_empty()
                && version_compare(&current, &cached.version) != Ordering::Less
            {
                // The cached release is no longer newer than what is
                // installed: a self-update landed since the entry was
                // written. Drop it and re-query.
                self.cache.delete(&self.cache_key(UPDATE_DATA));
            } else {
                return Ok(self.gate(cached));
            }
        }

        if !license.is_active() {
            return Err(PremiaError::NotActive);
        }
        if throttled {
            return Err(PremiaError::TooManyRequests);
        }

        let mut params = Map::new();
        params.insert("version".into(), json!(self.host.installed_version()));

        let credentials = license.record().and_then(|r| r.install_credentials());
        let result: Result<UpdateInfo> = self
            .transport
            .request(
                Method::GET,
                "updates/latest.json",
                params,
                credentials.as_ref(),
            )
            .await;

        self.mark_attempt(UPDATE_CHECK);

        let info = result?;
        // A "no update available" payload is cached as well; up-to-date
        // installs must not re-query on every page load.
        self.cache.set(
            &self.cache_key(UPDATE_DATA),
            &serde_json::to_string(&info)?,
            RESULT_TTL,
        );

        tracing::debug!(version = %info.version, "update check completed");
        Ok(self.gate(info))
    }

    /// Marketing metadata for the product listing.
    pub async fn get_marketing_info(&self, license: &LicenseManager) -> Result<MarketingInfo> {
        if let Some(raw) = self.cache.get(&self.cache_key(PLUGIN_INFO))
            && let Ok(cached) = serde_json::from_str::<MarketingInfo>(&raw)
        {
            return Ok(cached);
        }

        if !license.is_active() {
            return Err(PremiaError::NotActive);
        }
        if self.cache.get(&self.cache_key(ADDONS_CHECK)).is_some() {
            return Err(PremiaError::TooManyRequests);
        }

        let credentials = license.record().and_then(|r| r.install_credentials());
        let result: Result<MarketingInfo> = self
            .transport
            .request(Method::GET, "info.json", Map::new(), credentials.as_ref())
            .await;

        self.mark_attempt(ADDONS_CHECK);

        let info = result?;
        self.cache.set(
            &self.cache_key(PLUGIN_INFO),
            &serde_json::to_string(&info)?,
            RESULT_TTL,
        );
        Ok(info)
    }

    /// Expose a release only when the host can actually run it:
    /// newer than installed, platform at or above the release's floor,
    /// language runtime strictly above the release's floor.
    fn gate(&self, info: UpdateInfo) -> Option<UpdateInfo> {
        if info.version.is_empty() {
            return None;
        }

        let current = self.host.installed_version();
        if version_compare(&current, &info.version) != Ordering::Less {
            return None;
        }

        if let Some(required) = info.requires_platform_version.as_deref()
            && !required.is_empty()
            && version_compare(&self.host.platform_version(), required) == Ordering::Less
        {
            return None;
        }

        if let Some(required) = info.requires_language_version.as_deref()
            && !required.is_empty()
            && version_compare(required, &self.host.language_version()) != Ordering::Less
        {
            return None;
        }

        Some(info)
    }
}

impl std::fmt::Debug for UpdateManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateManager")
            .field("entity", self.transport.entity())
            .finish()
    }
}

/// Dotted-numeric version comparison ("1.2" < "1.10", "1.2" == "1.2.0").
///
/// Not semver: segments are compared numerically, missing segments count
/// as zero, non-numeric segments as zero.
pub(crate) fn version_compare(a: &str, b: &str) -> Ordering {
    let parse = |v: &str| -> Vec<u64> {
        v.split('.')
            .map(|seg| seg.trim().parse::<u64>().unwrap_or(0))
            .collect()
    };
    let a = parse(a);
    let b = parse(b);
    let len = a.len().max(b.len());
    for i in 0..len {
        let left = a.get(i).copied().unwrap_or(0);
        let right = b.get(i).copied().unwrap_or(0);
        match left.cmp(&right) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    Ordering::Equal
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::StaticHostEnv;
    use crate::storage::MemoryTtlCache;
    use crate::transport::NoopRequestFilter;
    use crate::types::{Entity, Scope};

    fn manager(host: StaticHostEnv) -> UpdateManager {
        let transport = Transport::new(
            "http://127.0.0.1:9",
            Entity::new(Scope::Plugin, "42"),
            false,
            Arc::new(NoopRequestFilter),
        )
        .unwrap();
        UpdateManager::new(transport, Arc::new(MemoryTtlCache::new()), Arc::new(host))
    }

    fn host() -> StaticHostEnv {
        StaticHostEnv {
            installed_version: "1.0.0".into(),
            platform_version: "6.4".into(),
            language_version: "8.2".into(),
            ..Default::default()
        }
    }

    fn release(version: &str) -> UpdateInfo {
        UpdateInfo {
            version: version.into(),
            url: "https://cdn.premia.dev/pkg.zip".into(),
            ..Default::default()
        }
    }

    #[test]
    fn version_compare_is_numeric_not_lexicographic() {
        assert_eq!(version_compare("1.2", "1.10"), Ordering::Less);
        assert_eq!(version_compare("1.2", "1.2.0"), Ordering::Equal);
        assert_eq!(version_compare("2.0", "1.9.9"), Ordering::Greater);
        assert_eq!(version_compare("1.2.0.1", "1.2"), Ordering::Greater);
        assert_eq!(version_compare("", "0"), Ordering::Equal);
    }

    #[test]
    fn gate_rejects_non_newer_releases() {
        let m = manager(host());
        assert!(m.gate(release("1.0.0")).is_none());
        assert!(m.gate(release("0.9.9")).is_none());
        assert!(m.gate(release("1.0.1")).is_some());
    }

    #[test]
    fn gate_rejects_empty_version() {
        let m = manager(host());
        assert!(m.gate(UpdateInfo::default()).is_none());
    }

    #[test]
    fn gate_enforces_platform_floor() {
        let m = manager(host());
        let mut info = release("2.0");
        info.requires_platform_version = Some("6.5".into());
        assert!(m.gate(info.clone()).is_none());

        // Floor equal to the host platform is acceptable.
        info.requires_platform_version = Some("6.4".into());
        assert!(m.gate(info).is_some());
    }

    #[test]
    fn gate_enforces_strict_language_floor() {
        let m = manager(host());
        let mut info = release("2.0");
        // Equal language floor is rejected: the gate is strict.
        info.requires_language_version = Some("8.2".into());
        assert!(m.gate(info.clone()).is_none());

        info.requires_language_version = Some("8.1".into());
        assert!(m.gate(info).is_some());
    }

    #[test]
    fn cache_keys_are_namespaced_per_entity() {
        let m = manager(host());
        assert_eq!(m.cache_key(UPDATE_DATA), "premia_42_update_data");
        assert_eq!(m.cache_key(UPDATE_CHECK), "premia_42_update_check");
    }
}
