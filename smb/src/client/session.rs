use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tokio_util::sync::CancellationToken;

use smb_core::error::{OperationError, SMBError, StateError};
use smb_core::logging::{debug, info, warn};
use smb_core::SMBResult;

use crate::client::config::SMBClientConfig;
use crate::client::connection::{SMBConnection, SMBServerInfo};
use crate::client::negotiate;
use crate::client::state::SMBSessionState;
use crate::client::tree::SMBTree;
use crate::protocol::body::{SMBDialect, SMBRequestBody, SMBResponseBody};
use crate::protocol::body::empty::SMBEmpty;
use crate::protocol::body::negotiate::SecurityMode;
use crate::protocol::body::session_setup::SMBSessionFlags;
use crate::protocol::body::tree_connect::SMBTreeConnectRequest;
use crate::protocol::header::{SMBCommandCode, SMBHeader};
use crate::protocol::message::{SMBRequest, SMBResponse};
use crate::util::auth::AuthProvider;
use crate::util::auth::ntlm::NTLMClientContext;
use crate::util::auth::spnego::SPNEGOAuthProvider;

/// Who the server let in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SMBPrincipal {
    pub username: String,
    pub domain: String,
    pub is_guest: bool,
    pub is_anonymous: bool,
}

pub(crate) struct SessionInner {
    pub(crate) connection: SMBConnection,
    pub(crate) config: SMBClientConfig,
    state: Mutex<SMBSessionState>,
    setup: tokio::sync::Mutex<()>,
    session_id: AtomicU64,
    signing: AtomicBool,
    principal: OnceLock<SMBPrincipal>,
    /// Child of the connection's closed token; trees and handles hang below it.
    pub(crate) token: CancellationToken,
}

impl SessionInner {
    fn state(&self) -> SMBSessionState {
        if self.token.is_cancelled() {
            return SMBSessionState::Closed;
        }
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, state: SMBSessionState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }

    pub(crate) fn session_id(&self) -> u64 {
        self.session_id.load(Ordering::SeqCst)
    }

    fn terminate(&self) {
        if !self.token.is_cancelled() {
            warn!(session_id = self.session_id(), "session terminated");
        }
        self.token.cancel();
        self.set_state(SMBSessionState::Closed);
    }

    /// Ends the session if `error` leaves it unusable and hands it back.
    fn fail(&self, error: SMBError) -> SMBError {
        if error.is_fatal() || self.connection.is_closed() {
            debug!(%error, "fatal error");
            self.terminate();
        }
        error
    }

    pub(crate) async fn submit(&self, tree_id: u32, body: SMBRequestBody) -> SMBResult<SMBResponse> {
        self.submit_cancellable(tree_id, body, &CancellationToken::new()).await
    }

    /// Sends a request in this session. Resolves to
    /// [`StateError::SessionTerminated`] once the session goes away.
    pub(crate) async fn submit_cancellable(
        &self,
        tree_id: u32,
        body: SMBRequestBody,
        cancel: &CancellationToken,
    ) -> SMBResult<SMBResponse> {
        if self.token.is_cancelled() {
            return Err(StateError::SessionTerminated.into());
        }
        let header = SMBHeader::request(body.command(), 0, self.session_id(), tree_id);
        let request = SMBRequest::new(header, body);
        let result = tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(StateError::SessionTerminated.into()),
            result = self.connection.correlator.submit_cancellable(request, cancel) => result,
        };
        match result {
            Ok(response) if response.header.nt_status().ends_session() => {
                debug!(status = response.header.status, "server ended the session");
                self.terminate();
                Err(StateError::SessionTerminated.into())
            }
            Err(error) => Err(self.fail(error)),
            ok => ok,
        }
    }
}

impl Drop for SessionInner {
    fn drop(&mut self) {
        self.token.cancel();
        self.connection.correlator.shutdown();
    }
}

/// An SMB2 session over one connection.
///
/// Goes through [`negotiate`](Self::negotiate), [`authenticate`](Self::authenticate)
/// and [`tree_connect`](Self::tree_connect) in that order. Clones share the
/// same session, so it can be used from several tasks at once.
#[derive(Clone)]
pub struct SMBSession {
    inner: Arc<SessionInner>,
}

impl SMBSession {
    pub(crate) fn new(connection: SMBConnection, config: SMBClientConfig) -> Self {
        let token = connection.correlator.closed_token().child_token();
        Self {
            inner: Arc::new(SessionInner {
                connection,
                config,
                state: Mutex::new(SMBSessionState::Disconnected),
                setup: tokio::sync::Mutex::new(()),
                session_id: AtomicU64::new(0),
                signing: AtomicBool::new(false),
                principal: OnceLock::new(),
                token,
            }),
        }
    }

    pub fn state(&self) -> SMBSessionState {
        self.inner.state()
    }

    pub fn session_id(&self) -> u64 {
        self.inner.session_id()
    }

    pub fn config(&self) -> &SMBClientConfig {
        &self.inner.config
    }

    pub fn server_info(&self) -> Option<&SMBServerInfo> {
        self.inner.connection.server_info()
    }

    pub fn principal(&self) -> Option<&SMBPrincipal> {
        self.inner.principal.get()
    }

    /// Whether requests of this session are signed.
    pub fn is_signing(&self) -> bool {
        self.inner.signing.load(Ordering::SeqCst)
    }

    pub async fn negotiate(&self) -> SMBResult<SMBDialect> {
        let _setup = self.inner.setup.lock().await;
        self.state().require(SMBSessionState::Disconnected, "negotiate")?;
        let server = negotiate::negotiate(&self.inner.connection, &self.inner.config)
            .await
            .map_err(|error| self.inner.fail(error))?;
        self.inner.set_state(SMBSessionState::Negotiated);
        Ok(server.dialect)
    }

    /// Authenticates with the configured credentials over NTLMv2, wrapped in
    /// SPNEGO unless the configuration turns that off.
    pub async fn authenticate(&self) -> SMBResult<SMBPrincipal> {
        let ntlm = NTLMClientContext::new(self.inner.config.credentials());
        if self.inner.config.use_spnego {
            self.authenticate_with(SPNEGOAuthProvider::new(ntlm)).await
        } else {
            self.authenticate_with(ntlm).await
        }
    }

    pub async fn authenticate_with<A: AuthProvider>(&self, mut provider: A) -> SMBResult<SMBPrincipal> {
        let _setup = self.inner.setup.lock().await;
        self.state().require(SMBSessionState::Negotiated, "authenticate")?;
        let server = self.server_info()
            .cloned()
            .ok_or_else(|| SMBError::invalid_order("authenticate before negotiate"))?;
        let config = &self.inner.config;
        let mut security_mode = SecurityMode::SIGNING_ENABLED;
        if config.require_signing {
            security_mode |= SecurityMode::SIGNING_REQUIRED;
        }

        let outcome = negotiate::session_setup(&self.inner.connection, security_mode, &mut provider)
            .await
            .map_err(|error| self.inner.fail(error))?;
        let signer = negotiate::signer_for(&server, config, &outcome).map_err(|error| self.inner.fail(error))?;
        let signing = signer.is_some();
        self.inner.connection.correlator.set_signer(signer);
        self.inner.signing.store(signing, Ordering::SeqCst);
        self.inner.session_id.store(outcome.session_id, Ordering::SeqCst);

        let credentials = config.credentials();
        let principal = SMBPrincipal {
            username: credentials.username.clone(),
            domain: credentials.domain.clone(),
            is_guest: outcome.flags.contains(SMBSessionFlags::IS_GUEST),
            is_anonymous: credentials.is_anonymous() || outcome.flags.contains(SMBSessionFlags::IS_NULL),
        };
        let _ = self.inner.principal.set(principal.clone());
        self.inner.set_state(SMBSessionState::Authenticated);
        info!(user = %principal.username, session_id = outcome.session_id, signing, "authenticated");
        Ok(principal)
    }

    /// Connects the share named in the configuration.
    pub async fn tree_connect(&self) -> SMBResult<SMBTree> {
        let share = self.inner.config.share_name.clone();
        self.tree_connect_share(&share).await
    }

    pub async fn tree_connect_share(&self, share: &str) -> SMBResult<SMBTree> {
        self.state().require(SMBSessionState::Authenticated, "tree connect")?;
        let request = SMBTreeConnectRequest::new(self.inner.connection.remote_name(), share);
        let path = request.path.clone();
        let response = self.inner.submit(0, SMBRequestBody::TreeConnect(request)).await?;
        match response.body {
            SMBResponseBody::TreeConnect(body) => {
                debug!(path = %path, tree_id = response.header.tree_id, share_type = ?body.share_type, "tree connected");
                Ok(SMBTree::new(self.inner.clone(), response.header.tree_id, path, body))
            }
            _ => Err(OperationError::from_status(response.header.status, path).into()),
        }
    }

    pub async fn echo(&self) -> SMBResult<()> {
        self.echo_cancellable(&CancellationToken::new()).await
    }

    pub async fn echo_cancellable(&self, cancel: &CancellationToken) -> SMBResult<()> {
        match self.state() {
            SMBSessionState::Disconnected => return Err(SMBError::invalid_order("echo before negotiate")),
            SMBSessionState::Closed => return Err(StateError::SessionTerminated.into()),
            _ => {}
        }
        let response = self.inner
            .submit_cancellable(0, SMBRequestBody::Echo(SMBEmpty), cancel)
            .await?;
        match response.body {
            SMBResponseBody::Echo(_) => Ok(()),
            _ => Err(SMBError::unexpected_status(SMBCommandCode::Echo as u16, response.header.status)),
        }
    }

    /// Logs off and shuts the connection down. Trees and handles of this
    /// session fail with [`StateError::SessionTerminated`] afterwards.
    pub async fn close(&self) -> SMBResult<()> {
        let state = self.state();
        if state == SMBSessionState::Closed {
            return Ok(());
        }
        self.inner.token.cancel();
        self.inner.set_state(SMBSessionState::Closed);
        let mut result = Ok(());
        if state == SMBSessionState::Authenticated {
            let request = SMBRequest::new(
                SMBHeader::request(SMBCommandCode::LogOff, 0, self.session_id(), 0),
                SMBRequestBody::LogOff(SMBEmpty),
            );
            result = match self.inner.connection.correlator.submit(request).await {
                Ok(response) if response.header.nt_status().is_success() => Ok(()),
                Ok(response) => Err(SMBError::unexpected_status(SMBCommandCode::LogOff as u16, response.header.status)),
                Err(error) => Err(error),
            };
        }
        self.inner.connection.correlator.shutdown();
        info!(session_id = self.session_id(), "session closed");
        result
    }
}
