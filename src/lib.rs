//! # Premia SDK
//!
//! Rust client SDK for the Premia licensing service: authenticates a
//! locally-running installation against the service, tracks activation
//! state, and periodically checks for newer releases with cached,
//! rate-limited lookups.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use premia_sdk::{ClientOptions, Entity, PremiaClient, StaticHostEnv};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let host = Arc::new(StaticHostEnv {
//!         site_url: "https://example.com".into(),
//!         instance_id: "1".into(),
//!         installed_version: "1.4.0".into(),
//!         platform_version: "6.4".into(),
//!         language_version: "8.2".into(),
//!         ..Default::default()
//!     });
//!
//!     let client = PremiaClient::new(Entity::plugin("42"), host, ClientOptions::default())?;
//!
//!     // Activate with a license key (idempotent per install).
//!     client.activate("ABCD-1234").await?;
//!
//!     // Cached, throttled update check.
//!     if let Some(update) = client.get_update_info(false).await? {
//!         println!("Update available: {} at {}", update.version, update.url);
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Design
//!
//! - Requests are signed with a canonical HMAC-SHA256 scheme ([`signer`]);
//!   failures are normalized into [`PremiaError`] values at the transport
//!   boundary - nothing panics, nothing retries.
//! - Update lookups go through a two-tier cache: 1-day result entries and
//!   5-minute throttle markers that bound the worst-case request rate.
//! - Durable state and the TTL cache live behind the [`OptionStore`] and
//!   [`TtlCache`] traits so hosts plug in their own storage.

pub mod client;
pub mod error;
pub mod host;
pub mod license;
pub mod signer;
pub mod storage;
pub mod transport;
pub mod types;
pub mod updates;

// Main client
pub use client::{ClientOptions, DEFAULT_BASE_URL, PremiaClient};

// Error types
pub use error::{PremiaError, Result};

// Storage
pub use storage::{FileOptionStore, MemoryOptionStore, MemoryTtlCache, OptionStore, TtlCache};

// Host environment
pub use host::{HostEnv, StaticHostEnv, site_uid};

// License state
pub use license::{ActivationParams, ActivationRecord, ActivationStatus, LicenseManager};

// Update manager
pub use updates::UpdateManager;

// Transport surface
pub use transport::{NoopRequestFilter, RequestFilter, Transport};

// Types
pub use types::{
    ActivationResponse, ApiError, Credentials, DeactivationResponse, Entity, MarketingInfo, Scope,
    UpdateInfo,
};

// Signing utilities
pub use signer::{SignedHeaders, http_date_now, sign_request};
