//! Activation lifecycle: `NoRecord -> Activated <-> Deactivated`.
//!
//! The durable activation record is owned here and persisted through the
//! [`OptionStore`] collaborator. All entities' records live under one key,
//! keyed internally by entity ID; every mutation is a read-modify-write of
//! that map. Records are never deleted: deactivation flips status and
//! blanks secrets, preserving `install_id` for idempotent re-activation.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::error::{PremiaError, Result};
use crate::host::{HostEnv, site_uid};
use crate::storage::OptionStore;
use crate::transport::Transport;
use crate::types::{ActivationResponse, Credentials, DeactivationResponse};

/// Option-store key holding every entity's activation record.
pub(crate) const ACCOUNTS_KEY: &str = "premia_accounts";

/// Activation status. There is no pending state: a failed remote call
/// leaves the prior status unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivationStatus {
    Activated,
    Deactivated,
}

/// Exact payload sent on activation, retained for re-activation and sync.
///
/// `license_key` is blanked on deactivation; everything else is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivationParams {
    pub license_key: String,
    pub uid: String,
    pub url: String,
    pub version: String,
}

/// Durable activation record for one entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivationRecord {
    pub status: ActivationStatus,
    /// Server-assigned on first activation; stable across re-activations.
    pub install_id: String,
    pub params: ActivationParams,
    /// Opaque payload returned by the service on activation. Documented
    /// fields: `public_key`/`secret_key` are install-scoped credentials.
    pub install_data: Value,
    pub date: DateTime<Utc>,
}

impl ActivationRecord {
    /// Usable for authenticated calls iff all identifying fields are
    /// present and the status says so. Any one missing means inactive,
    /// regardless of status.
    pub fn is_active(&self) -> bool {
        self.status == ActivationStatus::Activated
            && !self.install_id.is_empty()
            && !self.params.uid.is_empty()
            && !self.params.license_key.is_empty()
    }

    /// Install-scoped credentials from the capability bag, if present.
    pub(crate) fn install_credentials(&self) -> Option<Credentials> {
        let public_key = self.install_data.get("public_key")?.as_str()?;
        let secret_key = self.install_data.get("secret_key")?.as_str()?;
        let credentials = Credentials::new(public_key, secret_key);
        credentials.is_usable().then_some(credentials)
    }
}

/// Owns activation state transitions for one entity.
pub struct LicenseManager {
    transport: Transport,
    store: Arc<dyn OptionStore>,
    host: Arc<dyn HostEnv>,
}

impl LicenseManager {
    pub fn new(transport: Transport, store: Arc<dyn OptionStore>, host: Arc<dyn HostEnv>) -> Self {
        Self {
            transport,
            store,
            host,
        }
    }

    fn entity_id(&self) -> &str {
        &self.transport.entity().id
    }

    fn load_accounts(&self) -> BTreeMap<String, ActivationRecord> {
        self.store
            .get(ACCOUNTS_KEY)
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default()
    }

    /// Current activation record for this entity, if any.
    pub fn record(&self) -> Option<ActivationRecord> {
        self.load_accounts().remove(self.entity_id())
    }

    /// Read-modify-write of the shared accounts map. The store offers no
    /// transaction; last writer wins, tolerated because activation calls
    /// are user-initiated and idempotent on retry.
    fn persist_record(&self, record: ActivationRecord) -> Result<()> {
        let mut accounts = self.load_accounts();
        accounts.insert(self.entity_id().to_string(), record);
        let raw = serde_json::to_string(&accounts)?;
        if !self.store.set(ACCOUNTS_KEY, &raw) {
            return Err(PremiaError::Storage(format!(
                "option store rejected write of {}",
                ACCOUNTS_KEY
            )));
        }
        Ok(())
    }

    /// Whether this install currently holds a usable activation.
    pub fn is_active(&self) -> bool {
        self.record().is_some_and(|r| r.is_active())
    }

    /// Activate this install with a license key.
    ///
    /// Sent unauthenticated: no install credentials exist before the first
    /// activation succeeds. When a prior record holds an `install_id` it is
    /// included so the server updates the existing install instead of
    /// duplicating it.
    pub async fn activate(&self, license_key: &str) -> Result<bool> {
        if license_key.trim().is_empty() {
            return Err(PremiaError::EmptyInput("license_key"));
        }

        let params = ActivationParams {
            license_key: license_key.trim().to_string(),
            uid: site_uid(&self.host.site_url(), &self.host.instance_id()),
            url: self.host.site_url(),
            version: self.host.installed_version(),
        };

        let mut body = Map::new();
        body.insert("license_key".into(), json!(params.license_key));
        body.insert("uid".into(), json!(params.uid));
        body.insert("url".into(), json!(params.url));
        body.insert("version".into(), json!(params.version));

        let prior = self.record();
        if let Some(prior) = &prior
            && !prior.install_id.is_empty()
        {
            body.insert("install_id".into(), json!(prior.install_id));
        }

        let response: ActivationResponse = self
            .transport
            .request(Method::POST, "activate.json", body, None)
            .await?;

        if response.install_id.is_empty() {
            return Err(PremiaError::ContractViolation(
                "activation response carried an empty install_id".into(),
            ));
        }

        tracing::info!(install_id = %response.install_id, "license activated");

        let mut install_data = response.install_data.clone();
        install_data.insert("install_id".into(), json!(response.install_id));

        self.persist_record(ActivationRecord {
            status: ActivationStatus::Activated,
            install_id: response.install_id,
            params,
            install_data: Value::Object(install_data),
            date: Utc::now(),
        })?;

        Ok(true)
    }

    /// Precondition for deactivation. The stored uid must match the uid of
    /// the site we are running on right now, otherwise this record was
    /// copied from a different site instance and must not be released here.
    fn can_deactivate(&self, record: &ActivationRecord) -> Result<()> {
        if record.install_id.is_empty() {
            return Err(PremiaError::InvalidActivationState(
                "record has no install_id".into(),
            ));
        }
        if record.params.uid.is_empty() || record.params.license_key.is_empty() {
            return Err(PremiaError::InvalidActivationState(
                "record is missing uid or license key".into(),
            ));
        }
        let current_uid = site_uid(&self.host.site_url(), &self.host.instance_id());
        if record.params.uid != current_uid {
            return Err(PremiaError::InvalidActivationState(
                "activation belongs to a different site instance".into(),
            ));
        }
        Ok(())
    }

    /// Deactivate this install.
    ///
    /// On success the status flips to deactivated and the stored license
    /// key is blanked: reactivation requires the caller to supply the key
    /// again. The record itself is kept so `install_id` survives.
    pub async fn deactivate(&self) -> Result<bool> {
        let Some(mut record) = self.record() else {
            return Err(PremiaError::InvalidActivationState(
                "no activation record".into(),
            ));
        };
        self.can_deactivate(&record)?;

        let mut body = Map::new();
        body.insert("uid".into(), json!(record.params.uid));
        body.insert("install_id".into(), json!(record.install_id));
        body.insert("license_key".into(), json!(record.params.license_key));
        body.insert("url".into(), json!(record.params.url));

        let credentials = record.install_credentials();
        let response: DeactivationResponse = self
            .transport
            .request(
                Method::POST,
                "deactivate.json",
                body,
                credentials.as_ref(),
            )
            .await?;

        tracing::info!(id = %response.id, "license deactivated");

        record.status = ActivationStatus::Deactivated;
        record.params.license_key.clear();
        // Reduce stored-secret surface once the credentials served their
        // final authenticated call.
        if let Value::Object(data) = &mut record.install_data
            && data.contains_key("secret_key")
        {
            data.insert("secret_key".into(), json!(""));
        }
        self.persist_record(record)?;

        Ok(true)
    }

    /// Refresh `install_data` by deactivating and immediately re-activating
    /// with the currently stored key. Aborts if deactivation fails; never
    /// attempts the re-activation after a failed deactivate.
    pub async fn sync_install(&self) -> Result<bool> {
        let Some(record) = self.record() else {
            return Err(PremiaError::InvalidActivationState(
                "no activation record".into(),
            ));
        };
        if !record.is_active() {
            return Err(PremiaError::NotActive);
        }

        let license_key = record.params.license_key.clone();
        self.deactivate().await?;
        self.activate(&license_key).await
    }
}

impl std::fmt::Debug for LicenseManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LicenseManager")
            .field("entity", self.transport.entity())
            .finish()
    }
}
