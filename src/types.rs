//! Type definitions for the Premia SDK.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Scope of the entity being licensed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// A product (plugin) as published to the catalog.
    Plugin,
    /// A user account on the licensing service.
    User,
    /// One activation instance of a product on one site.
    Install,
}

impl Scope {
    /// Path segment used in `/v1/{scope}s/{id}/...` resource paths.
    pub(crate) fn path_segment(&self) -> &'static str {
        match self {
            Self::Plugin => "plugins",
            Self::User => "users",
            Self::Install => "installs",
        }
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Plugin => write!(f, "plugin"),
            Self::User => write!(f, "user"),
            Self::Install => write!(f, "install"),
        }
    }
}

/// The scope + ID pair identifying what is being licensed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    pub scope: Scope,
    pub id: String,
}

impl Entity {
    pub fn new(scope: Scope, id: impl Into<String>) -> Self {
        Self {
            scope,
            id: id.into(),
        }
    }

    /// Entity for a published product.
    pub fn plugin(id: impl Into<String>) -> Self {
        Self::new(Scope::Plugin, id)
    }

    /// Entity for a specific install of a product.
    pub fn install(id: impl Into<String>) -> Self {
        Self::new(Scope::Install, id)
    }
}

/// API credential pair for signed requests.
///
/// When `secret_key` equals `public_key` the pair is in public-key-hash
/// mode: signatures are accepted for read-only use only and carry the
/// `FSP` scheme instead of `FS`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub public_key: String,
    pub secret_key: String,
}

impl Credentials {
    pub fn new(public_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            public_key: public_key.into(),
            secret_key: secret_key.into(),
        }
    }

    /// Credentials that only prove knowledge of the public key.
    pub fn public_only(public_key: impl Into<String>) -> Self {
        let public_key = public_key.into();
        Self {
            secret_key: public_key.clone(),
            public_key,
        }
    }

    /// Whether this pair is in public-key-hash (read-only) mode.
    pub fn is_public_only(&self) -> bool {
        self.secret_key == self.public_key
    }

    /// Whether both keys are present; unsigned requests are sent otherwise.
    pub fn is_usable(&self) -> bool {
        !self.public_key.is_empty() && !self.secret_key.is_empty()
    }
}

// Secret keys must never reach logs.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("public_key", &self.public_key)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

/// Structured error body returned by the licensing service.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

/// Top-level `{"error": {...}}` envelope the service wraps failures in.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorEnvelope {
    pub error: ApiError,
}

/// Response to `activate.json`.
///
/// `install_id` is guaranteed by the remote contract on success; everything
/// else is an opaque capability bag (install-scoped credentials, plan name)
/// kept verbatim in the activation record. Documented fields of the bag:
/// `public_key` and `secret_key` are the install-scoped credential pair.
#[derive(Debug, Clone, Deserialize)]
pub struct ActivationResponse {
    pub install_id: String,
    #[serde(flatten)]
    pub install_data: serde_json::Map<String, Value>,
}

/// Response to `deactivate.json`; `id` echoes the deactivated install.
#[derive(Debug, Clone, Deserialize)]
pub struct DeactivationResponse {
    pub id: String,
}

/// Latest-release descriptor returned by the update endpoint.
///
/// An empty `version` means the service has no newer release on offer;
/// that response is still cacheable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateInfo {
    /// Version string of the latest release ("" = none available).
    #[serde(default)]
    pub version: String,
    /// Address of the release package. Never fetched by this SDK.
    #[serde(default)]
    pub url: String,
    /// Minimum host platform version the release supports.
    #[serde(default)]
    pub requires_platform_version: Option<String>,
    /// Minimum language runtime version the release supports.
    #[serde(default)]
    pub requires_language_version: Option<String>,
    /// Highest platform version the release was tested against.
    #[serde(default)]
    pub tested_up_to: Option<String>,
    /// When the release was published.
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Marketing metadata for the product listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarketingInfo {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub banner_url: Option<String>,
    #[serde(default)]
    pub card_banner_url: Option<String>,
}
