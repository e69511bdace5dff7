use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use smb_core::{SMBByteSize, SMBFromBytes, SMBParseResult, SMBToBytes};

/// 100-nanosecond intervals since 1601-01-01 UTC.
#[derive(Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Debug, Clone, Copy, Default)]
pub struct FileTime(pub u64);

const INTERVALS_BETWEEN_1601_AND_EPOCH: u64 = 116_444_736_000_000_000;

impl FileTime {
    pub fn from_system_time(time: SystemTime) -> Self {
        let since_epoch = time.duration_since(UNIX_EPOCH).unwrap_or_default();
        Self(INTERVALS_BETWEEN_1601_AND_EPOCH + (since_epoch.as_nanos() / 100) as u64)
    }

    pub fn now() -> Self {
        Self::from_system_time(SystemTime::now())
    }

    /// `None` for the zero time and for times before the unix epoch.
    pub fn to_system_time(&self) -> Option<SystemTime> {
        let intervals = self.0.checked_sub(INTERVALS_BETWEEN_1601_AND_EPOCH)?;
        Some(UNIX_EPOCH + Duration::from_nanos(intervals.saturating_mul(100)))
    }
}

impl SMBByteSize for FileTime {
    fn smb_byte_size(&self) -> usize {
        8
    }
}

impl SMBFromBytes for FileTime {
    fn smb_from_bytes(input: &[u8]) -> SMBParseResult<&[u8], Self> where Self: Sized {
        let (remaining, raw) = u64::smb_from_bytes(input)?;
        Ok((remaining, Self(raw)))
    }
}

impl SMBToBytes for FileTime {
    fn smb_to_bytes(&self) -> Vec<u8> {
        self.0.smb_to_bytes()
    }
}
