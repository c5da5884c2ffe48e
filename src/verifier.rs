use crate::config::Config;
use crate::protocol::{self, KeyStatus};
use crate::transport::Transport;
use std::sync::Arc;

/// Sentinel sent once to tell "service unreachable" apart from "no
/// credential configured yet". Well-formed, never valid.
pub const CONNECTIVITY_PROBE_KEY: &str = "1234567890ab";

/// Validates a credential against the remote service. Runs against the
/// bare service host — this is the one operation that exists before a
/// credential does.
pub struct KeyVerifier {
    transport: Arc<dyn Transport>,
    service_host: String,
    protocol_version: String,
    site_url: String,
}

impl KeyVerifier {
    pub fn new(config: &Config, transport: Arc<dyn Transport>) -> Self {
        KeyVerifier {
            transport,
            service_host: config.service_host.clone(),
            protocol_version: config.protocol_version.clone(),
            site_url: config.site_url.clone(),
        }
    }

    /// `Failed` means the service could not give an answer — a
    /// connectivity or configuration problem, never a statement about
    /// the key itself.
    pub async fn verify(&self, key: &str) -> KeyStatus {
        let fields = protocol::verify_fields(key, &self.site_url);
        let path = protocol::endpoint_path(&self.protocol_version, protocol::VERIFY_KEY);
        match self.transport.post(&self.service_host, &path, &fields).await {
            Ok(response) => protocol::decode_verify(&response.body),
            Err(e) => {
                log::warn!("verify-key failed: {e}");
                KeyStatus::Failed
            }
        }
    }

    /// Verify the stored credential. A definite `Invalid` clears it; a
    /// `Failed` leaves it untouched (the key may be fine, the wire is
    /// not). Returns None when no credential is stored. The caller
    /// persists the config afterwards.
    pub async fn verify_stored(&self, config: &mut Config) -> Option<KeyStatus> {
        let key = config.api_key.clone()?;
        let status = self.verify(&key).await;
        if status == KeyStatus::Invalid {
            log::warn!("stored credential rejected by the service; clearing it");
            config.api_key = None;
        }
        Some(status)
    }

    /// Is the service reachable at all? Sends the sentinel key; any
    /// definite answer (even "invalid") proves connectivity.
    pub async fn probe(&self) -> bool {
        self.verify(CONNECTIVITY_PROBE_KEY).await != KeyStatus::Failed
    }
}
