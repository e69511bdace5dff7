//! NEGOTIATE and SESSION_SETUP exchanges.

use num_enum::TryFromPrimitive;

use smb_core::error::{AuthError, SMBError};
use smb_core::logging::{debug, info, trace};
use smb_core::nt_status::NTStatus;
use smb_core::SMBResult;

use crate::client::config::SMBClientConfig;
use crate::client::connection::{SMBConnection, SMBServerInfo};
use crate::client::correlator::SMBSigner;
use crate::protocol::body::{SMBDialect, SMBRequestBody, SMBResponseBody};
use crate::protocol::body::negotiate::{SecurityMode, SMBNegotiateRequest};
use crate::protocol::body::session_setup::{SMBSessionFlags, SMBSessionSetupRequest};
use crate::protocol::header::{SMBCommandCode, SMBHeader};
use crate::protocol::message::{SigningAlgorithm, SMBRequest};
use crate::util::auth::AuthProvider;
use crate::util::crypto::smb2::generate_signing_key;

/// NTLM finishes in two legs; anything beyond this is a confused server.
const MAX_SESSION_SETUP_ROUNDS: usize = 4;

/// Picks the dialect the server answered, provided it was offered.
pub fn select_dialect(offered: &[SMBDialect], answered: u16) -> SMBResult<SMBDialect> {
    SMBDialect::try_from_primitive(answered)
        .ok()
        .filter(|dialect| offered.contains(dialect))
        .ok_or_else(|| AuthError::DialectMismatch.into())
}

pub(crate) async fn negotiate(connection: &SMBConnection, config: &SMBClientConfig) -> SMBResult<SMBServerInfo> {
    let request = SMBRequest::new(
        SMBHeader::request(SMBCommandCode::Negotiate, 0, 0, 0),
        SMBRequestBody::Negotiate(SMBNegotiateRequest::new(
            config.dialects.clone(),
            config.require_signing,
            connection.client_guid,
        )),
    );
    let response = connection.correlator.submit(request).await?;
    let status = response.header.nt_status();
    let body = match response.body {
        SMBResponseBody::Negotiate(body) => body,
        _ if status == NTStatus::StatusNotSupported => return Err(AuthError::DialectMismatch.into()),
        _ => return Err(SMBError::unexpected_status(SMBCommandCode::Negotiate as u16, response.header.status)),
    };
    let dialect = select_dialect(&config.dialects, body.dialect)?;
    connection.correlator.set_multi_credit(dialect.supports_credit_charge());
    info!(?dialect, max_read = body.max_read_size, max_write = body.max_write_size, "dialect negotiated");
    let info = SMBServerInfo {
        dialect,
        server_guid: body.server_guid,
        security_mode: body.security_mode,
        capabilities: body.capabilities,
        max_transact_size: body.max_transact_size,
        max_read_size: body.max_read_size,
        max_write_size: body.max_write_size,
        system_time: body.system_time,
    };
    connection.set_server_info(info.clone());
    Ok(info)
}

/// Result of a completed SESSION_SETUP exchange.
#[derive(Debug, Clone)]
pub(crate) struct SessionSetupOutcome {
    pub session_id: u64,
    pub flags: SMBSessionFlags,
    pub session_key: Option<[u8; 16]>,
}

pub(crate) async fn session_setup<A: AuthProvider>(
    connection: &SMBConnection,
    security_mode: SecurityMode,
    provider: &mut A,
) -> SMBResult<SessionSetupOutcome> {
    let mut token = provider.initial_token()?;
    let mut session_id = 0;
    for round in 0..MAX_SESSION_SETUP_ROUNDS {
        let request = SMBRequest::new(
            SMBHeader::request(SMBCommandCode::SessionSetup, 0, session_id, 0),
            SMBRequestBody::SessionSetup(SMBSessionSetupRequest::new(security_mode, token)),
        );
        let response = connection.correlator.submit(request).await?;
        session_id = response.header.session_id;
        let status = response.header.nt_status();
        trace!(round, session_id, ?status, "session setup leg");
        match (status, response.body) {
            (NTStatus::MoreProcessingRequired, SMBResponseBody::SessionSetup(body)) => {
                token = provider.respond(&body.security_buffer)?;
            }
            (NTStatus::StatusSuccess, SMBResponseBody::SessionSetup(body)) => {
                debug!(session_id, flags = ?body.session_flags, "session setup complete");
                return Ok(SessionSetupOutcome {
                    session_id,
                    flags: body.session_flags,
                    session_key: provider.session_key(),
                });
            }
            _ => return Err(AuthError::Rejected(response.header.status).into()),
        }
    }
    Err(AuthError::InvalidToken("authentication did not finish".into()).into())
}

/// Signing material for a finished session, or `None` when it stays unsigned.
pub(crate) fn signer_for(
    server: &SMBServerInfo,
    config: &SMBClientConfig,
    outcome: &SessionSetupOutcome,
) -> SMBResult<Option<SMBSigner>> {
    let wanted = server.signing_required() || config.require_signing;
    let unsigned_session = outcome.flags.intersects(SMBSessionFlags::IS_GUEST | SMBSessionFlags::IS_NULL);
    let Some(session_key) = outcome.session_key.filter(|_| wanted && !unsigned_session) else {
        return Ok(None);
    };
    Ok(Some(SMBSigner {
        session_id: outcome.session_id,
        key: generate_signing_key(&session_key, server.dialect)?,
        algorithm: SigningAlgorithm::for_dialect(server.dialect),
    }))
}
