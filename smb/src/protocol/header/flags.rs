use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::util::flags_helper::{impl_smb_byte_size_for_bitflag, impl_smb_from_bytes_for_bitflag, impl_smb_to_bytes_for_bitflag};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
    pub struct SMBFlags: u32 {
        const SERVER_TO_REDIR = 0x00000001;
        const ASYNC_COMMAND = 0x00000002;
        const RELATED_OPERATIONS = 0x00000004;
        const SIGNED = 0x00000008;
        const PRIORITY_MASK = 0x00000070;
        const DFS_OPERATIONS = 0x10000000;
        const REPLAY_OPERATION = 0x20000000;
    }
}

impl_smb_byte_size_for_bitflag! { SMBFlags }
impl_smb_from_bytes_for_bitflag! { SMBFlags }
impl_smb_to_bytes_for_bitflag! { SMBFlags }

#[cfg(test)]
mod tests {
    use super::*;
    use smb_core::{SMBFromBytes, SMBToBytes};

    /// MS-SMB2 2.2.1: flag bit values.
    #[test]
    fn flag_values() {
        assert_eq!(SMBFlags::SERVER_TO_REDIR.bits(), 0x00000001);
        assert_eq!(SMBFlags::ASYNC_COMMAND.bits(), 0x00000002);
        assert_eq!(SMBFlags::SIGNED.bits(), 0x00000008);
    }

    #[test]
    fn flags_serialization_is_4_bytes_le() {
        let flags = SMBFlags::SERVER_TO_REDIR | SMBFlags::SIGNED;
        assert_eq!(flags.smb_to_bytes(), [0x09, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn unknown_bits_are_dropped() {
        let (_, parsed) = SMBFlags::smb_from_bytes(&[0x03, 0x00, 0x00, 0x80]).unwrap();
        assert_eq!(parsed, SMBFlags::SERVER_TO_REDIR | SMBFlags::ASYNC_COMMAND);
    }
}
