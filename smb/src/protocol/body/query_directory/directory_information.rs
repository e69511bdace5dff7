use serde::{Deserialize, Serialize};

use smb_core::{SMBFromBytes, SMBResult};
use smb_derive::{SMBByteSize, SMBFromBytes, SMBToBytes};

use crate::protocol::body::create::SMBFileAttributes;
use crate::protocol::body::FileTime;

/// FILE_DIRECTORY_INFORMATION (MS-FSCC 2.4.10)
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize, Clone, SMBByteSize, SMBFromBytes, SMBToBytes)]
pub struct SMBDirectoryInformation {
    #[smb_direct(start(fixed = 0))]
    pub next_entry_offset: u32,
    #[smb_direct(start(fixed = 4))]
    pub file_index: u32,
    #[smb_direct(start(fixed = 8))]
    pub creation_time: FileTime,
    #[smb_direct(start(fixed = 16))]
    pub last_access_time: FileTime,
    #[smb_direct(start(fixed = 24))]
    pub last_write_time: FileTime,
    #[smb_direct(start(fixed = 32))]
    pub change_time: FileTime,
    #[smb_direct(start(fixed = 40))]
    pub end_of_file: u64,
    #[smb_direct(start(fixed = 48))]
    pub allocation_size: u64,
    #[smb_direct(start(fixed = 56))]
    pub file_attributes: SMBFileAttributes,
    #[smb_string(start(fixed = 64), length(inner(start = 60, num_type = "u32")), underlying = "u16")]
    pub file_name: String,
}

impl SMBDirectoryInformation {
    /// Walks the NextEntryOffset chain of a query directory output buffer.
    pub fn parse_list(buffer: &[u8]) -> SMBResult<Vec<Self>> {
        let mut entries = Vec::new();
        let mut cursor = 0usize;
        while cursor < buffer.len() {
            let (_, entry) = Self::smb_from_bytes(&buffer[cursor..])?;
            let next = entry.next_entry_offset as usize;
            entries.push(entry);
            if next == 0 {
                break;
            }
            cursor += next;
        }
        Ok(entries)
    }
}
