use serde::{Deserialize, Serialize};

use smb_derive::{SMBByteSize, SMBFromBytes, SMBToBytes};

/// Four byte body shared by Logoff, TreeDisconnect and Echo, requests and
/// responses alike (MS-SMB2 2.2.7, 2.2.11, 2.2.28).
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone, Copy, Default, SMBByteSize, SMBFromBytes, SMBToBytes)]
#[smb_byte_tag(value = 4)]
pub struct SMBEmpty;
