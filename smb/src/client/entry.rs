use std::time::SystemTime;

use crate::protocol::body::create::{SMBCreateResponse, SMBFileAttributes};
use crate::protocol::body::query_directory::SMBDirectoryInformation;

/// Metadata of one file or directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SMBDirectoryEntry {
    pub name: String,
    pub is_directory: bool,
    /// End of file, in bytes.
    pub size: u64,
    pub allocation_size: u64,
    pub modified_at: Option<SystemTime>,
    pub created_at: Option<SystemTime>,
    pub accessed_at: Option<SystemTime>,
    pub attributes: SMBFileAttributes,
}

impl SMBDirectoryEntry {
    pub(crate) fn from_create(name: impl Into<String>, response: &SMBCreateResponse) -> Self {
        Self {
            name: name.into(),
            is_directory: response.file_attributes.is_directory(),
            size: response.end_of_file,
            allocation_size: response.allocation_size,
            modified_at: response.last_write_time.to_system_time(),
            created_at: response.creation_time.to_system_time(),
            accessed_at: response.last_access_time.to_system_time(),
            attributes: response.file_attributes,
        }
    }

    /// `.` and `..` entries every directory query returns.
    pub fn is_self_or_parent(&self) -> bool {
        self.name == "." || self.name == ".."
    }
}

impl From<SMBDirectoryInformation> for SMBDirectoryEntry {
    fn from(info: SMBDirectoryInformation) -> Self {
        Self {
            is_directory: info.file_attributes.is_directory(),
            size: info.end_of_file,
            allocation_size: info.allocation_size,
            modified_at: info.last_write_time.to_system_time(),
            created_at: info.creation_time.to_system_time(),
            accessed_at: info.last_access_time.to_system_time(),
            attributes: info.file_attributes,
            name: info.file_name,
        }
    }
}
