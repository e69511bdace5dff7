use std::time::Duration;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use smb_core::error::SMBError;
use smb_core::SMBResult;

use crate::protocol::body::SMBDialect;
use crate::socket::SMBTransportMode;
use crate::util::auth::SMBCredentials;

/// Environment variable holding the JSON connection parameters.
pub const CONNECT_PARAMS_VAR: &str = "SMB_CONNECT_PARAMS";

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Everything needed to reach, authenticate against and mount one share.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Builder)]
#[builder(setter(into), build_fn(validate = "SMBClientConfig::validate_builder"))]
pub struct SMBClientConfig {
    /// Empty for an anonymous logon.
    pub username: String,
    #[serde(default)]
    #[builder(default)]
    pub password: String,
    /// Replaces the password when set.
    #[serde(default, with = "hex_nt_hash")]
    #[builder(default, setter(strip_option))]
    pub nt_hash: Option<[u8; 16]>,
    #[serde(default)]
    #[builder(default)]
    pub domain: String,
    #[serde(alias = "remote_ip")]
    pub remote_address: String,
    /// Defaults to the transport's well known port.
    #[serde(default)]
    #[builder(default, setter(strip_option))]
    pub port: Option<u16>,
    /// NetBIOS name of the server.
    pub remote_name: String,
    #[serde(default = "default_client_name")]
    #[builder(default = "default_client_name()")]
    pub client_name: String,
    #[serde(alias = "service_name")]
    pub share_name: String,
    #[serde(default)]
    #[builder(default)]
    pub transport: SMBTransportMode,
    #[serde(default = "default_timeout_secs")]
    #[builder(default = "DEFAULT_TIMEOUT_SECS")]
    pub timeout_secs: u64,
    #[serde(default = "default_dialects")]
    #[builder(default = "default_dialects()")]
    pub dialects: Vec<SMBDialect>,
    #[serde(default)]
    #[builder(default)]
    pub require_signing: bool,
    #[serde(default = "default_true")]
    #[builder(default = "true")]
    pub use_spnego: bool,
}

impl SMBClientConfig {
    pub fn builder() -> SMBClientConfigBuilder {
        SMBClientConfigBuilder::default()
    }

    pub fn from_json(json: &str) -> SMBResult<Self> {
        let config: Self = serde_json::from_str(json).map_err(SMBError::config_error)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads [`CONNECT_PARAMS_VAR`].
    pub fn from_env() -> SMBResult<Self> {
        let json = std::env::var(CONNECT_PARAMS_VAR)
            .map_err(|e| SMBError::config_error(format!("{CONNECT_PARAMS_VAR}: {e}")))?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> SMBResult<()> {
        validate_fields(
            &self.remote_address,
            &self.remote_name,
            &self.share_name,
            self.transport,
            self.timeout_secs,
            &self.dialects,
        ).map_err(SMBError::Config)
    }

    pub fn port(&self) -> u16 {
        self.port.unwrap_or_else(|| self.transport.default_port())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn credentials(&self) -> SMBCredentials {
        let credentials = match self.nt_hash {
            Some(hash) => SMBCredentials::with_nt_hash(self.username.clone(), hash, self.domain.clone()),
            None => SMBCredentials::new(self.username.clone(), self.password.clone(), self.domain.clone()),
        };
        credentials.workstation(self.client_name.clone())
    }

    fn validate_builder(builder: &SMBClientConfigBuilder) -> Result<(), String> {
        let defaults = default_dialects();
        validate_fields(
            builder.remote_address.as_deref().unwrap_or_default(),
            builder.remote_name.as_deref().unwrap_or_default(),
            builder.share_name.as_deref().unwrap_or_default(),
            builder.transport.unwrap_or_default(),
            builder.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
            builder.dialects.as_deref().unwrap_or(&defaults),
        )
    }
}

fn validate_fields(
    remote_address: &str,
    remote_name: &str,
    share_name: &str,
    transport: SMBTransportMode,
    timeout_secs: u64,
    dialects: &[SMBDialect],
) -> Result<(), String> {
    if remote_address.is_empty() {
        return Err("remote_address must not be empty".into());
    }
    if transport == SMBTransportMode::NetBIOS && remote_name.is_empty() {
        return Err("remote_name is required for the NetBIOS transport".into());
    }
    if share_name.is_empty() {
        return Err("share_name must not be empty".into());
    }
    if timeout_secs == 0 {
        return Err("timeout_secs must be positive".into());
    }
    if dialects.is_empty() {
        return Err("at least one dialect must be offered".into());
    }
    if let Some(dialect) = dialects.iter().find(|d| !SMBDialect::DEFAULT_OFFERED.contains(d)) {
        return Err(format!("dialect {:?} is not supported", dialect));
    }
    Ok(())
}

fn default_client_name() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "SMBCLIENT".into())
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_dialects() -> Vec<SMBDialect> {
    SMBDialect::DEFAULT_OFFERED.to_vec()
}

fn default_true() -> bool {
    true
}

mod hex_nt_hash {
    use serde::{Deserialize, Deserializer, Serializer};
    use serde::de::Error;

    pub fn serialize<S: Serializer>(hash: &Option<[u8; 16]>, serializer: S) -> Result<S::Ok, S::Error> {
        match hash {
            Some(hash) => serializer.serialize_some(&hex::encode(hash)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<[u8; 16]>, D::Error> {
        let Some(raw) = Option::<String>::deserialize(deserializer)? else {
            return Ok(None);
        };
        let bytes = hex::decode(raw.trim()).map_err(D::Error::custom)?;
        let hash = <[u8; 16]>::try_from(bytes.as_slice())
            .map_err(|_| D::Error::custom("nt_hash must be 16 bytes"))?;
        Ok(Some(hash))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const ORIGINAL_KEYS: &str = r#"{
        "username": "alice",
        "password": "secret",
        "remote_ip": "10.0.0.5",
        "remote_name": "FILESERVER",
        "service_name": "shared"
    }"#;

    #[test]
    fn accepts_original_key_names() {
        let config = SMBClientConfig::from_json(ORIGINAL_KEYS).unwrap();
        assert_eq!(config.remote_address, "10.0.0.5");
        assert_eq!(config.share_name, "shared");
        assert_eq!(config.transport, SMBTransportMode::NetBIOS);
        assert_eq!(config.port(), 139);
        assert_eq!(config.dialects, SMBDialect::DEFAULT_OFFERED.to_vec());
        assert!(config.use_spnego);
        assert!(!config.require_signing);
    }

    #[test]
    fn builder_matches_json() {
        let built = SMBClientConfig::builder()
            .username("alice")
            .password("secret")
            .remote_address("10.0.0.5")
            .remote_name("FILESERVER")
            .share_name("shared")
            .client_name(default_client_name())
            .build()
            .unwrap();
        assert_eq!(built, SMBClientConfig::from_json(ORIGINAL_KEYS).unwrap());
    }

    #[test]
    fn nt_hash_is_hex() {
        let json = r#"{"username": "u", "nt_hash": "a4f49c406510bdcab6824ee7c30fd852",
            "remote_address": "h", "remote_name": "n", "share_name": "s", "transport": "Direct"}"#;
        let config = SMBClientConfig::from_json(json).unwrap();
        assert_eq!(config.nt_hash.unwrap()[0], 0xa4);
        assert_eq!(config.port(), 445);

        let bad = json.replace("a4f49c406510bdcab6824ee7c30fd852", "abcd");
        assert!(matches!(SMBClientConfig::from_json(&bad), Err(SMBError::Config(_))));
    }

    #[test]
    fn rejects_invalid_values() {
        let no_share = ORIGINAL_KEYS.replace("\"shared\"", "\"\"");
        assert!(matches!(SMBClientConfig::from_json(&no_share), Err(SMBError::Config(_))));

        let missing = r#"{"username": "u"}"#;
        assert!(matches!(SMBClientConfig::from_json(missing), Err(SMBError::Config(_))));

        let built = SMBClientConfig::builder()
            .username("u")
            .remote_address("h")
            .remote_name("n")
            .share_name("s")
            .dialects(vec![SMBDialect::V3_1_1])
            .build();
        assert!(built.is_err());
    }
}
