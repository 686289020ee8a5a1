//! Stable per-install device id sent as `X-Device-Id`

use geoquest_core::CredentialStore;
use geoquest_domain::ClientConfig;
use tracing::{info, warn};
use uuid::Uuid;

pub struct DeviceIdentity;

impl DeviceIdentity {
    /// Resolve the device id: configured, else persisted, else freshly
    /// generated (UUIDv4) and persisted.
    ///
    /// Storage problems are logged and never block startup; a generated id
    /// that could not be persisted is still used for this run.
    pub async fn resolve(config: &ClientConfig, store: &dyn CredentialStore) -> String {
        if let Some(configured) = config.device_id.as_deref().map(str::trim) {
            if !configured.is_empty() {
                return configured.to_string();
            }
        }

        match store.load_device_id().await {
            Ok(Some(persisted)) if !persisted.is_empty() => return persisted,
            Ok(_) => {}
            Err(err) => warn!(error = %err, "failed to read persisted device id"),
        }

        let generated = Uuid::new_v4().to_string();
        if let Err(err) = store.save_device_id(&generated).await {
            warn!(error = %err, "failed to persist generated device id");
        }
        info!(device_id = %generated, "Generated new device id");
        generated
    }
}
