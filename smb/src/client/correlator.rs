use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, oneshot, Semaphore};
use tokio_util::sync::CancellationToken;

use smb_core::{SMBFromBytes, SMBResult};
use smb_core::error::{ProtocolError, SMBError, TransportError};
use smb_core::logging::{debug, trace, warn};

use crate::protocol::body::SMBRequestBody;
use crate::protocol::header::{SMBCommandCode, SMBFlags, SMBHeader};
use crate::protocol::message::{sign_message, SigningAlgorithm, SMBRequest, SMBResponse, verify_signature};
use crate::socket::{SMBFrameReader, SMBFrameWriter};

/// Credits asked for on every request.
const CREDITS_REQUESTED: u16 = 32;
const CREDIT_UNIT: usize = 64 * 1024;

/// A request waiting for its response, keyed by message id.
struct Pending {
    command: SMBCommandCode,
    sender: oneshot::Sender<SMBResult<SMBResponse>>,
}

type PendingTable = HashMap<u64, Pending>;

/// Key material used to sign requests of one session and check its responses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SMBSigner {
    pub session_id: u64,
    pub key: Vec<u8>,
    pub algorithm: SigningAlgorithm,
}

struct Shared {
    pending: Mutex<PendingTable>,
    credits: Semaphore,
    signer: RwLock<Option<SMBSigner>>,
    failure: Mutex<Option<SMBError>>,
    closed: CancellationToken,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Shared {
    fn failure(&self) -> SMBError {
        lock(&self.failure)
            .clone()
            .unwrap_or(SMBError::Transport(TransportError::ConnectionClosed))
    }

    /// Stops the connection and hands `error` to every waiting request.
    fn fail_all(&self, error: SMBError) {
        {
            let mut failure = lock(&self.failure);
            if failure.is_none() {
                *failure = Some(error.clone());
            }
        }
        self.closed.cancel();
        self.credits.close();
        let drained = std::mem::take(&mut *lock(&self.pending));
        if !drained.is_empty() {
            debug!(count = drained.len(), %error, "failing pending requests");
        }
        for (_, pending) in drained {
            let _ = pending.sender.send(Err(error.clone()));
        }
    }

    fn dispatch(&self, frame: &[u8]) -> SMBResult<()> {
        for part in SMBResponse::split_chain(frame)? {
            self.dispatch_one(part)?;
        }
        Ok(())
    }

    fn dispatch_one(&self, part: &[u8]) -> SMBResult<()> {
        let (_, header) = SMBHeader::smb_from_bytes(part)?;
        if !header.is_response() {
            warn!(message_id = header.message_id, "ignoring request sent by the server");
            return Ok(());
        }
        if header.credits > 0 {
            self.credits.add_permits(header.credits as usize);
        }
        if header.is_interim() {
            trace!(message_id = header.message_id, async_id = header.async_id, "interim response");
            return Ok(());
        }
        let Some(pending) = lock(&self.pending).remove(&header.message_id) else {
            warn!(message_id = header.message_id, command = ?header.command, "dropping unmatched response");
            return Ok(());
        };
        let result = if pending.command != header.command {
            Err(ProtocolError::UnexpectedCommand {
                expected: pending.command.into(),
                actual: header.command.into(),
            }.into())
        } else {
            self.verify(part, &header).and_then(|_| SMBResponse::parse(part))
        };
        if pending.sender.send(result).is_err() {
            trace!(message_id = header.message_id, "requester gone, response discarded");
        }
        Ok(())
    }

    fn verify(&self, part: &[u8], header: &SMBHeader) -> SMBResult<()> {
        if !header.flags.contains(SMBFlags::SIGNED) {
            return Ok(());
        }
        let signer = self.signer.read().unwrap_or_else(PoisonError::into_inner);
        match signer.as_ref() {
            Some(signer) if signer.session_id == header.session_id => {
                if verify_signature(part, &signer.key, signer.algorithm)? {
                    Ok(())
                } else {
                    Err(ProtocolError::BadSignature(header.message_id).into())
                }
            }
            _ => Ok(()),
        }
    }
}

/// Removes the pending entry when the waiting request goes away, answered or not.
struct PendingGuard<'a> {
    shared: &'a Shared,
    message_id: u64,
}

impl<'a> PendingGuard<'a> {
    fn register(shared: &'a Shared, message_id: u64, pending: Pending) -> Self {
        lock(&shared.pending).insert(message_id, pending);
        Self { shared, message_id }
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        lock(&self.shared.pending).remove(&self.message_id);
    }
}

/// Matches responses to pipelined requests over one framed connection.
///
/// A reader task routes every response to the request waiting on its
/// message id; a writer task drains the outgoing queue.
pub struct SMBCorrelator {
    outgoing: mpsc::UnboundedSender<Bytes>,
    shared: Arc<Shared>,
    next_message_id: AtomicU64,
    multi_credit: AtomicBool,
    timeout: Option<Duration>,
}

impl SMBCorrelator {
    pub fn start<R, W>(reader: SMBFrameReader<R>, writer: SMBFrameWriter<W>, timeout: Option<Duration>) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let shared = Arc::new(Shared {
            pending: Mutex::new(HashMap::new()),
            credits: Semaphore::new(1),
            signer: RwLock::new(None),
            failure: Mutex::new(None),
            closed: CancellationToken::new(),
        });
        let (outgoing, queue) = mpsc::unbounded_channel();
        tokio::spawn(read_loop(reader, shared.clone()));
        tokio::spawn(write_loop(writer, queue, shared.clone()));
        Self {
            outgoing,
            shared,
            next_message_id: AtomicU64::new(0),
            multi_credit: AtomicBool::new(false),
            timeout,
        }
    }

    /// Cancelled once the connection is gone.
    pub fn closed_token(&self) -> CancellationToken {
        self.shared.closed.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.is_cancelled()
    }

    pub fn set_multi_credit(&self, enabled: bool) {
        self.multi_credit.store(enabled, Ordering::SeqCst);
    }

    pub fn set_signer(&self, signer: Option<SMBSigner>) {
        *self.shared.signer.write().unwrap_or_else(PoisonError::into_inner) = signer;
    }

    pub fn credit_charge(&self, body: &SMBRequestBody) -> u16 {
        if !self.multi_credit.load(Ordering::SeqCst) {
            return 0;
        }
        let payload = body.payload_size();
        (1 + payload.saturating_sub(1) / CREDIT_UNIT) as u16
    }

    pub async fn submit(&self, request: SMBRequest) -> SMBResult<SMBResponse> {
        self.exchange(request).await
    }

    /// Like [`Self::submit`], resolving to [`SMBError::Cancelled`] once `cancel` fires.
    /// A response arriving afterwards is discarded.
    pub async fn submit_cancellable(&self, request: SMBRequest, cancel: &CancellationToken) -> SMBResult<SMBResponse> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("request cancelled by caller");
                Err(SMBError::Cancelled)
            }
            result = self.exchange(request) => result,
        }
    }

    /// Fails every waiting request and shuts the transport down.
    pub fn shutdown(&self) {
        self.shared.fail_all(TransportError::ConnectionClosed.into());
    }

    async fn exchange(&self, mut request: SMBRequest) -> SMBResult<SMBResponse> {
        let work = async {
            if self.is_closed() {
                return Err(self.shared.failure());
            }
            let charge = self.credit_charge(&request.body);
            let consumed = charge.max(1);
            self.shared.credits
                .acquire_many(consumed as u32)
                .await
                .map_err(|_| self.shared.failure())?
                .forget();
            let message_id = self.next_message_id.fetch_add(consumed as u64, Ordering::SeqCst);
            request.header.message_id = message_id;
            request.header.credit_charge = charge;
            request.header.credits = CREDITS_REQUESTED;

            let mut bytes = request.as_bytes();
            self.sign(&mut bytes, request.header.session_id)?;

            let (sender, receiver) = oneshot::channel();
            let command = request.header.command;
            let _pending = PendingGuard::register(&self.shared, message_id, Pending { command, sender });
            if self.is_closed() {
                return Err(self.shared.failure());
            }
            self.outgoing
                .send(Bytes::from(bytes))
                .map_err(|_| self.shared.failure())?;
            debug!(message_id, command = ?request.header.command, charge, "request sent");
            receiver.await.map_err(|_| self.shared.failure())?
        };
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, work)
                .await
                .map_err(|_| SMBError::from(TransportError::Timeout))?,
            None => work.await,
        }
    }

    fn sign(&self, bytes: &mut [u8], session_id: u64) -> SMBResult<()> {
        let signer = self.shared.signer.read().unwrap_or_else(PoisonError::into_inner);
        match signer.as_ref() {
            Some(signer) if session_id != 0 && signer.session_id == session_id => {
                sign_message(bytes, &signer.key, signer.algorithm)
            }
            _ => Ok(()),
        }
    }
}

impl Drop for SMBCorrelator {
    fn drop(&mut self) {
        self.shared.closed.cancel();
    }
}

async fn read_loop<R>(mut reader: SMBFrameReader<R>, shared: Arc<Shared>)
where
    R: AsyncRead + Unpin + Send,
{
    let error = loop {
        let frame = tokio::select! {
            _ = shared.closed.cancelled() => break SMBError::from(TransportError::ConnectionClosed),
            frame = reader.receive() => frame,
        };
        match frame {
            Ok(frame) => {
                trace!(len = frame.len(), "frame received");
                if let Err(error) = shared.dispatch(&frame) {
                    warn!(%error, "discarding undecodable frame");
                }
            }
            Err(error) => break SMBError::from(error),
        }
    };
    debug!(%error, "read half of SMB stream ended");
    shared.fail_all(error);
}

async fn write_loop<W>(mut writer: SMBFrameWriter<W>, mut queue: mpsc::UnboundedReceiver<Bytes>, shared: Arc<Shared>)
where
    W: AsyncWrite + Unpin + Send,
{
    loop {
        let data = tokio::select! {
            _ = shared.closed.cancelled() => break,
            data = queue.recv() => data,
        };
        let Some(data) = data else { break };
        if let Err(error) = writer.send(&data).await {
            shared.fail_all(error.into());
            break;
        }
    }
    let _ = writer.shutdown().await;
    debug!("write half of SMB stream ended");
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::io::{DuplexStream, ReadHalf, WriteHalf};

    use smb_core::SMBToBytes;
    use smb_core::nt_status::NTStatus;

    use crate::protocol::body::{SMBRequestBody, SMBResponseBody};
    use crate::protocol::body::empty::SMBEmpty;
    use crate::protocol::body::read::SMBReadRequest;
    use crate::protocol::body::create::SMBFileId;
    use crate::protocol::header::SMBCommandCode;
    use crate::socket::{SMBFramer, SMBTransportMode};

    use super::*;

    type ServerFramer = SMBFramer<ReadHalf<DuplexStream>, WriteHalf<DuplexStream>>;

    fn setup(timeout: Option<Duration>) -> (SMBCorrelator, ServerFramer) {
        let (client, server) = tokio::io::duplex(64 * 1024);
        let (reader, writer) = SMBFramer::new(client, SMBTransportMode::Direct).into_split();
        let correlator = SMBCorrelator::start(reader, writer, timeout);
        (correlator, SMBFramer::new(server, SMBTransportMode::Direct))
    }

    fn echo() -> SMBRequest {
        SMBRequest::new(SMBHeader::request(SMBCommandCode::Echo, 0, 0, 0), SMBRequestBody::Echo(SMBEmpty))
    }

    fn response(message_id: u64, status: NTStatus, flags: SMBFlags) -> Vec<u8> {
        let mut header = SMBHeader::request(SMBCommandCode::Echo, message_id, 0, 0);
        header.flags = SMBFlags::SERVER_TO_REDIR | flags;
        header.status = status as u32;
        header.credits = 8;
        [header.smb_to_bytes(), SMBEmpty.smb_to_bytes()].concat()
    }

    async fn next_message_id(server: &mut ServerFramer) -> u64 {
        let frame = server.receive().await.unwrap();
        SMBHeader::smb_from_bytes(&frame).unwrap().1.message_id
    }

    #[tokio::test]
    async fn pipelined_responses_match_out_of_order() {
        let (correlator, mut server) = setup(None);
        let server_task = tokio::spawn(async move {
            let first = next_message_id(&mut server).await;
            server.send(&response(first, NTStatus::StatusSuccess, SMBFlags::empty())).await.unwrap();
            let (a, b) = (next_message_id(&mut server).await, next_message_id(&mut server).await);
            server.send(&response(b, NTStatus::StatusSuccess, SMBFlags::empty())).await.unwrap();
            server.send(&response(a, NTStatus::StatusSuccess, SMBFlags::empty())).await.unwrap();
            server
        });
        // The first response grants the credits the pipelined pair needs.
        assert_eq!(correlator.submit(echo()).await.unwrap().header.message_id, 0);
        let (a, b) = tokio::join!(correlator.submit(echo()), correlator.submit(echo()));
        let mut ids = vec![a.unwrap().header.message_id, b.unwrap().header.message_id];
        ids.sort();
        assert_eq!(ids, vec![1, 2]);
        server_task.await.unwrap();
    }

    #[tokio::test]
    async fn unmatched_and_interim_responses_are_skipped() {
        let (correlator, mut server) = setup(None);
        let server_task = tokio::spawn(async move {
            let id = next_message_id(&mut server).await;
            server.send(&response(99, NTStatus::StatusSuccess, SMBFlags::empty())).await.unwrap();
            server.send(&response(id, NTStatus::StatusPending, SMBFlags::ASYNC_COMMAND)).await.unwrap();
            server.send(&response(id, NTStatus::StatusSuccess, SMBFlags::empty())).await.unwrap();
            server
        });
        let response = correlator.submit(echo()).await.unwrap();
        assert_eq!(response.header.message_id, 0);
        assert_eq!(response.body, SMBResponseBody::Echo(SMBEmpty));
        server_task.await.unwrap();
    }

    #[tokio::test]
    async fn chained_responses_are_split() {
        let (correlator, mut server) = setup(None);
        let server_task = tokio::spawn(async move {
            let first = next_message_id(&mut server).await;
            server.send(&response(first, NTStatus::StatusSuccess, SMBFlags::empty())).await.unwrap();
            let (a, b) = (next_message_id(&mut server).await, next_message_id(&mut server).await);
            let mut head = response(a, NTStatus::StatusSuccess, SMBFlags::empty());
            head.resize(72, 0);
            head[20..24].copy_from_slice(&72u32.to_le_bytes());
            let chained = [head, response(b, NTStatus::StatusSuccess, SMBFlags::empty())].concat();
            server.send(&chained).await.unwrap();
            server
        });
        correlator.submit(echo()).await.unwrap();
        let (a, b) = tokio::join!(correlator.submit(echo()), correlator.submit(echo()));
        assert!(a.is_ok() && b.is_ok());
        server_task.await.unwrap();
    }

    #[tokio::test]
    async fn cancelled_request_leaves_connection_usable() {
        let (correlator, mut server) = setup(None);
        let cancel = CancellationToken::new();
        let server_task = tokio::spawn({
            let cancel = cancel.clone();
            async move {
                let stale = next_message_id(&mut server).await;
                cancel.cancel();
                let next = next_message_id(&mut server).await;
                server.send(&response(stale, NTStatus::StatusSuccess, SMBFlags::empty())).await.unwrap();
                server.send(&response(next, NTStatus::StatusSuccess, SMBFlags::empty())).await.unwrap();
                server
            }
        });
        let result = correlator.submit_cancellable(echo(), &cancel).await;
        assert_eq!(result, Err(SMBError::Cancelled));
        // Only the single initial credit exists, and the stale request still holds it.
        correlator.shared.credits.add_permits(1);
        let response = correlator.submit(echo()).await.unwrap();
        assert_eq!(response.header.message_id, 1);
        server_task.await.unwrap();
    }

    #[tokio::test]
    async fn response_for_another_command_is_rejected() {
        let (correlator, mut server) = setup(None);
        let server_task = tokio::spawn(async move {
            let id = next_message_id(&mut server).await;
            let mut reply = response(id, NTStatus::StatusSuccess, SMBFlags::empty());
            reply[12..14].copy_from_slice(&(SMBCommandCode::Read as u16).to_le_bytes());
            server.send(&reply).await.unwrap();
            server
        });
        let result = correlator.submit(echo()).await;
        assert_eq!(
            result,
            Err(ProtocolError::UnexpectedCommand {
                expected: SMBCommandCode::Echo as u16,
                actual: SMBCommandCode::Read as u16,
            }.into())
        );
        server_task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn silent_server_times_out() {
        let (correlator, mut server) = setup(Some(Duration::from_millis(50)));
        let server_task = tokio::spawn(async move {
            next_message_id(&mut server).await;
            server
        });
        let result = correlator.submit(echo()).await;
        assert_eq!(result, Err(SMBError::Transport(TransportError::Timeout)));
        assert!(!correlator.is_closed());
        drop(server_task.await.unwrap());
    }

    #[tokio::test]
    async fn closed_stream_fails_pending_and_later_requests() {
        let (correlator, mut server) = setup(None);
        let server_task = tokio::spawn(async move {
            next_message_id(&mut server).await;
            drop(server);
        });
        let result = correlator.submit(echo()).await;
        assert_eq!(result, Err(SMBError::Transport(TransportError::ConnectionClosed)));
        server_task.await.unwrap();
        assert!(correlator.is_closed());
        assert_eq!(
            correlator.submit(echo()).await,
            Err(SMBError::Transport(TransportError::ConnectionClosed))
        );
    }

    #[tokio::test]
    async fn credit_charge_follows_payload() {
        let (correlator, _server) = setup(None);
        let read = |length| SMBRequestBody::Read(SMBReadRequest::new(SMBFileId { persistent: 0, volatile: 0 }, 0, length));
        assert_eq!(correlator.credit_charge(&read(200 * 1024)), 0);
        correlator.set_multi_credit(true);
        assert_eq!(correlator.credit_charge(&read(1)), 1);
        assert_eq!(correlator.credit_charge(&read(65536)), 1);
        assert_eq!(correlator.credit_charge(&read(65537)), 2);
        assert_eq!(correlator.credit_charge(&read(200 * 1024)), 4);
        assert_eq!(correlator.credit_charge(&SMBRequestBody::Echo(SMBEmpty)), 1);
    }
}
