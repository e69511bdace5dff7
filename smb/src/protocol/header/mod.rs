mod command_code;
mod flags;
mod header;

pub type SMBCommandCode = command_code::SMBCommandCode;
pub type SMBFlags = flags::SMBFlags;
pub type SMBHeader = header::SMBHeader;

pub use header::{SMB2_HEADER_SIZE, SMB2_PROTOCOL_ID};
