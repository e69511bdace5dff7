use serde::{Deserialize, Serialize};

use smb_core::SMBResult;

use crate::util::crypto::ntlm_v2::{nt_hash, ntowf_v2_from_hash};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub enum Secret {
    Password(String),
    NTHash([u8; 16]),
}

/// Identity presented to the server; an empty user name means anonymous.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct SMBCredentials {
    pub username: String,
    pub domain: String,
    pub workstation: String,
    secret: Secret,
}

impl SMBCredentials {
    pub fn new(username: String, password: String, domain: String) -> Self {
        Self {
            username,
            domain,
            workstation: String::new(),
            secret: Secret::Password(password),
        }
    }

    pub fn with_nt_hash(username: String, nt_hash: [u8; 16], domain: String) -> Self {
        Self {
            username,
            domain,
            workstation: String::new(),
            secret: Secret::NTHash(nt_hash),
        }
    }

    pub fn anonymous() -> Self {
        Self::new(String::new(), String::new(), String::new())
    }

    pub fn workstation(mut self, workstation: impl Into<String>) -> Self {
        self.workstation = workstation.into();
        self
    }

    pub fn is_anonymous(&self) -> bool {
        self.username.is_empty()
    }

    /// NTOWFv2 for this identity.
    pub fn response_key_nt(&self) -> SMBResult<[u8; 16]> {
        let hash = match &self.secret {
            Secret::Password(password) => nt_hash(password),
            Secret::NTHash(hash) => *hash,
        };
        ntowf_v2_from_hash(&hash, &self.username, &self.domain)
    }
}
