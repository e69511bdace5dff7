use smb_core::SMBResult;
use smb_core::layout::check_byte_tag;

mod body;
mod dialect;
mod filetime;
pub mod close;
pub mod create;
pub mod empty;
pub mod error;
pub mod negotiate;
pub mod query_directory;
pub mod read;
pub mod session_setup;
pub mod set_info;
pub mod tree_connect;
pub mod write;

pub type SMBRequestBody = body::SMBRequestBody;
pub type SMBResponseBody = body::SMBResponseBody;

pub use dialect::SMBDialect;
pub use filetime::FileTime;

/// Checks the leading StructureSize field and returns the rest of the body.
pub(crate) fn structure_size(input: &[u8], expected: u16) -> SMBResult<&[u8]> {
    check_byte_tag(input, expected)?;
    Ok(&input[2..])
}
