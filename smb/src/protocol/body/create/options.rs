use bitflags::bitflags;
use num_enum::TryFromPrimitive;
use serde::{Deserialize, Serialize};

use smb_derive::{SMBByteSize, SMBFromBytes, SMBToBytes};

use crate::util::flags_helper::{impl_smb_byte_size_for_bitflag, impl_smb_from_bytes_for_bitflag, impl_smb_to_bytes_for_bitflag};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct SMBCreateOptions: u32 {
        const DIRECTORY_FILE            = 0x000001;
        const WRITE_THROUGH             = 0x000002;
        const SEQUENTIAL_ONLY           = 0x000004;
        const SYNCHRONOUS_IO_NONALERT   = 0x000020;
        const NON_DIRECTORY_FILE        = 0x000040;
        const RANDOM_ACCESS             = 0x000800;
        const DELETE_ON_CLOSE           = 0x001000;
        const OPEN_REPARSE_POINT        = 0x200000;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct SMBShareAccess: u32 {
        const READ = 0x1;
        const WRITE = 0x2;
        const DELETE = 0x4;
    }
}

/// What the server does when the target does or does not exist.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TryFromPrimitive, SMBByteSize, SMBFromBytes, SMBToBytes)]
pub enum SMBCreateDisposition {
    /// Replace if present, create if not.
    Supersede = 0x0,
    /// Fail unless present.
    Open = 0x1,
    /// Fail if present.
    Create = 0x2,
    OpenIf = 0x3,
    /// Truncate if present, fail if not.
    Overwrite = 0x4,
    OverwriteIf = 0x5,
}

impl_smb_byte_size_for_bitflag! { SMBCreateOptions SMBShareAccess }
impl_smb_to_bytes_for_bitflag! { SMBCreateOptions SMBShareAccess }
impl_smb_from_bytes_for_bitflag! { SMBCreateOptions SMBShareAccess }

#[cfg(test)]
mod tests {
    use super::*;

    /// MS-SMB2 2.2.13: CreateOptions and CreateDisposition values.
    #[test]
    fn option_bit_values() {
        assert_eq!(SMBCreateOptions::DELETE_ON_CLOSE.bits(), 0x1000);
        assert_eq!(SMBCreateOptions::NON_DIRECTORY_FILE.bits(), 0x40);
        assert_eq!(SMBCreateDisposition::OverwriteIf as u32, 5);
        assert_eq!(SMBCreateDisposition::Create as u32, 2);
        assert_eq!(SMBShareAccess::all().bits(), 0x7);
    }
}
