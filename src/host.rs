//! Host environment collaborator and site fingerprinting.

use sha2::{Digest, Sha256};
use url::Url;

/// Facts about the embedding installation the SDK cannot discover itself.
///
/// The host supplies its own site address, a stable per-installation
/// instance ID, platform/runtime versions and the installed package
/// metadata. All methods are cheap and infallible; hosts should cache
/// anything expensive behind this trait.
pub trait HostEnv: Send + Sync {
    /// Public address of the site this install runs on.
    fn site_url(&self) -> String;

    /// Stable per-installation instance identifier.
    fn instance_id(&self) -> String;

    /// Host platform (e.g. CMS/OS) version.
    fn platform_version(&self) -> String;

    /// Language runtime version.
    fn language_version(&self) -> String;

    /// Currently installed version of the licensed package.
    fn installed_version(&self) -> String;

    /// Display name from the package manifest.
    fn display_name(&self) -> String {
        String::new()
    }

    /// Author from the package manifest.
    fn author(&self) -> String {
        String::new()
    }
}

/// Fixed-value [`HostEnv`] for tests and simple embedders.
#[derive(Debug, Clone, Default)]
pub struct StaticHostEnv {
    pub site_url: String,
    pub instance_id: String,
    pub platform_version: String,
    pub language_version: String,
    pub installed_version: String,
    pub display_name: String,
    pub author: String,
}

impl HostEnv for StaticHostEnv {
    fn site_url(&self) -> String {
        self.site_url.clone()
    }

    fn instance_id(&self) -> String {
        self.instance_id.clone()
    }

    fn platform_version(&self) -> String {
        self.platform_version.clone()
    }

    fn language_version(&self) -> String {
        self.language_version.clone()
    }

    fn installed_version(&self) -> String {
        self.installed_version.clone()
    }

    fn display_name(&self) -> String {
        self.display_name.clone()
    }

    fn author(&self) -> String {
        self.author.clone()
    }
}

/// Stable, non-reversible fingerprint of a site's identity.
///
/// Derived from `(host, instance_id, path)` so that the same code base
/// served from a different address or a copied database yields a different
/// UID. Used to refuse deactivating an activation that belongs to another
/// site instance (the staging-to-production copy case).
pub fn site_uid(site_url: &str, instance_id: &str) -> String {
    let (host, path) = match Url::parse(site_url) {
        Ok(url) => (
            url.host_str().unwrap_or_default().to_string(),
            url.path().trim_end_matches('/').to_string(),
        ),
        // Not a parseable URL; fingerprint the raw string as the host part.
        Err(_) => (site_url.to_string(), String::new()),
    };

    let mut hasher = Sha256::new();
    hasher.update(host.as_bytes());
    hasher.update(b"|");
    hasher.update(instance_id.as_bytes());
    hasher.update(b"|");
    hasher.update(path.as_bytes());
    format!("{:x}", hasher.finalize())
}
