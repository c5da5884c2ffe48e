use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

lazy_static! {
    // Accepted credential alphabet: a-h and 0-9, case-insensitive.
    static ref KEY_REJECT: Regex = Regex::new(r"(?i)[^a-h0-9]").unwrap();
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Credential identifying this deployment to the classification
    /// service. The pipeline refuses to start without one.
    pub api_key: Option<String>,
    /// Base hostname of the classification service. Classification and
    /// feedback requests go to `<api_key>.<service_host>`; key
    /// verification goes to the bare host.
    pub service_host: String,
    pub service_port: u16,
    /// Wire protocol version, used as the leading path segment.
    pub protocol_version: String,
    /// Root URL of the site whose comments are being classified. Sent as
    /// the `blog` field on every request.
    pub site_url: String,
    pub site_charset: String,
    /// Host platform identity for the outbound User-Agent header.
    pub platform_name: String,
    pub platform_version: String,
    pub connect_timeout_secs: u64,
    /// Drop spam outright (instead of queueing it) when the target post
    /// was last edited more than `stale_post_days` ago.
    pub discard_old_post_spam: bool,
    pub stale_post_days: i64,
    /// Confirmed spam older than this is purged by the sweeper.
    pub retention_days: i64,
    /// Storage compaction runs once every this many sweeps. Zero disables
    /// compaction.
    pub compact_every: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api_key: None,
            service_host: "api.antispam.example.net".to_string(),
            service_port: 80,
            protocol_version: "1.1".to_string(),
            site_url: "http://example.com".to_string(),
            site_charset: "UTF-8".to_string(),
            platform_name: "ContentHost".to_string(),
            platform_version: "1.0".to_string(),
            connect_timeout_secs: 10,
            discard_old_post_spam: false,
            stale_post_days: 30,
            retention_days: 15,
            compact_every: 5000,
        }
    }
}

impl Config {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    pub fn to_file(&self, path: &str) -> anyhow::Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Strip everything outside the accepted credential alphabet and
    /// lowercase what remains. Returns None if nothing survives.
    pub fn sanitize_key(raw: &str) -> Option<String> {
        let cleaned = KEY_REJECT.replace_all(raw, "").to_lowercase();
        if cleaned.is_empty() {
            None
        } else {
            Some(cleaned)
        }
    }

    /// Hostname for classification and feedback requests:
    /// `<api_key>.<service_host>`. None until a credential is configured.
    pub fn api_host(&self) -> Option<String> {
        self.api_key
            .as_deref()
            .map(|key| format!("{key}.{}", self.service_host))
    }

    /// Outbound User-Agent: `<platform>/<version> | <crate>/<version>`.
    pub fn user_agent(&self) -> String {
        format!(
            "{}/{} | {}/{}",
            self.platform_name,
            self.platform_version,
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION")
        )
    }

    /// Structural validation for `--test-config`.
    pub fn validate(&self) -> anyhow::Result<()> {
        Url::parse(&self.site_url)
            .map_err(|e| anyhow::anyhow!("site_url is not a valid URL: {e}"))?;
        if self.service_host.is_empty() {
            anyhow::bail!("service_host must not be empty");
        }
        if let Some(key) = &self.api_key {
            match Self::sanitize_key(key) {
                Some(clean) if clean == key.to_lowercase() => {}
                _ => anyhow::bail!(
                    "api_key contains characters outside the accepted alphabet (a-h, 0-9)"
                ),
            }
        }
        if self.connect_timeout_secs == 0 {
            anyhow::bail!("connect_timeout_secs must be at least 1");
        }
        if self.retention_days <= 0 || self.stale_post_days <= 0 {
            anyhow::bail!("retention_days and stale_post_days must be positive");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_key_strips_foreign_characters() {
        assert_eq!(
            Config::sanitize_key("AB-12 cd!34"),
            Some("ab12cd34".to_string())
        );
        assert_eq!(Config::sanitize_key("zzz"), None);
        assert_eq!(Config::sanitize_key(""), None);
    }

    #[test]
    fn api_host_prepends_credential() {
        let mut config = Config::default();
        assert_eq!(config.api_host(), None);
        config.api_key = Some("abc123".to_string());
        assert_eq!(
            config.api_host().as_deref(),
            Some("abc123.api.antispam.example.net")
        );
    }

    #[test]
    fn default_config_is_valid() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn validate_rejects_bad_key_alphabet() {
        let config = Config {
            api_key: Some("not-a-key!".to_string()),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn yaml_round_trip() {
        let mut config = Config::default();
        config.api_key = Some("deadbeef42".to_string());
        config.discard_old_post_spam = true;
        let text = serde_yaml::to_string(&config).unwrap();
        let back: Config = serde_yaml::from_str(&text).unwrap();
        assert_eq!(back.api_key.as_deref(), Some("deadbeef42"));
        assert!(back.discard_old_post_spam);
        assert_eq!(back.retention_days, 15);
    }
}
