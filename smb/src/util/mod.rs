pub mod auth;
pub mod crypto;
pub(crate) mod flags_helper;
