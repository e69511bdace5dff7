//! In-memory SMB2 file server used by the integration tests.
//!
//! Parses the client's requests at their fixed wire offsets, checks NTLMv2
//! proofs and MICs with the crate's own crypto helpers and signs its answers
//! once a session key exists. Files live in a flat map keyed by share relative
//! path.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::io::{duplex, DuplexStream};

use smb_client::client::{SMBClient, SMBClientConfig, SMBSession, SMBTree};
use smb_client::protocol::body::SMBDialect;
use smb_client::protocol::header::{SMB2_HEADER_SIZE, SMBCommandCode, SMBFlags, SMBHeader};
use smb_client::protocol::message::{sign_message, verify_signature, SigningAlgorithm};
use smb_client::socket::{SMBFramer, SMBTransportMode};
use smb_client::socket::netbios::{POSITIVE_SESSION_RESPONSE, SESSION_MESSAGE, SESSION_REQUEST};
use smb_client::util::auth::ntlm::{AvId, AvPair, AvPairList, NTLMAuthenticateMessageBody, NTLMChallengeMessageBody, NTLMMessage, NTLMNegotiateFlags};
use smb_client::util::auth::spnego::{NegotiateState, SPNEGOToken, SPNEGOTokenResponseBody};
use smb_client::util::crypto::ntlm_v2::{hmac_md5, nt_proof_str, ntowf_v2, rc4_transform, session_base_key};
use smb_client::util::crypto::smb2::generate_signing_key;
use smb_core::error::SMBError;
use smb_core::nt_status::NTStatus;
use smb_core::{SMBFromBytes, SMBToBytes};

pub const SERVER_NAME: &str = "TESTSRV";
pub const SERVER_CHALLENGE: [u8; 8] = [0x01, 0x23, 0x45, 0x67, 0x89, 0xab, 0xcd, 0xef];
/// Stamped on every file and directory.
pub const FILE_TIME: u64 = 133_506_000_000_000_000;

const MIC_RANGE: std::ops::Range<usize> = 72..88;
const EMPTY_BODY: [u8; 4] = [4, 0, 0, 0];
const ERROR_BODY: [u8; 9] = [9, 0, 0, 0, 0, 0, 0, 0, 0];

const FILE_SUPERSEDE: u32 = 0;
const FILE_OPEN: u32 = 1;
const FILE_CREATE: u32 = 2;
const FILE_OVERWRITE: u32 = 4;

const FILE_DIRECTORY_FILE: u32 = 0x01;
const FILE_NON_DIRECTORY_FILE: u32 = 0x40;
const FILE_DELETE_ON_CLOSE: u32 = 0x1000;

const ATTRIBUTE_DIRECTORY: u32 = 0x10;
const ATTRIBUTE_ARCHIVE: u32 = 0x20;

const SESSION_FLAG_IS_NULL: u16 = 0x02;
const FILE_RENAME_INFORMATION: u8 = 10;

type Handled = Result<(NTStatus, Vec<u8>), NTStatus>;

/// Knobs for one server instance.
#[derive(Debug, Clone)]
pub struct ServerOptions {
    pub username: String,
    pub password: String,
    pub domain: String,
    pub share: String,
    pub dialects: Vec<SMBDialect>,
    /// Answer negotiate with this dialect whatever the client offered.
    pub answer_dialect: Option<u16>,
    pub require_signing: bool,
    pub allow_anonymous: bool,
    pub max_read_size: u32,
    pub max_write_size: u32,
    pub transport: SMBTransportMode,
    /// Commands that are read but never answered.
    pub silent: Vec<SMBCommandCode>,
    /// Send a response nobody asked for ahead of every echo reply.
    pub stray_responses: bool,
    /// Flip a signature byte in responses to this command.
    pub corrupt_signature: Option<SMBCommandCode>,
    /// Entries per QUERY_DIRECTORY response.
    pub listing_batch: usize,
    /// StructureSize written into NEGOTIATE responses.
    pub negotiate_structure_size: u16,
    /// Never answer the NetBIOS session request.
    pub ignore_session_request: bool,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            username: "alice".into(),
            password: "secret".into(),
            domain: "WORKGROUP".into(),
            share: "shared".into(),
            dialects: SMBDialect::DEFAULT_OFFERED.to_vec(),
            answer_dialect: None,
            require_signing: false,
            allow_anonymous: true,
            max_read_size: 1024 * 1024,
            max_write_size: 1024 * 1024,
            transport: SMBTransportMode::Direct,
            silent: Vec::new(),
            stray_responses: false,
            corrupt_signature: None,
            listing_batch: 3,
            negotiate_structure_size: 65,
            ignore_session_request: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    File(Vec<u8>),
    Directory,
}

impl Node {
    fn is_directory(&self) -> bool {
        matches!(self, Node::Directory)
    }

    fn attributes(&self) -> u32 {
        match self {
            Node::File(_) => ATTRIBUTE_ARCHIVE,
            Node::Directory => ATTRIBUTE_DIRECTORY,
        }
    }

    fn size(&self) -> u64 {
        match self {
            Node::File(data) => data.len() as u64,
            Node::Directory => 0,
        }
    }
}

/// What the server holds and what it saw.
#[derive(Debug, Default)]
pub struct ServerState {
    pub nodes: BTreeMap<String, Node>,
    pub commands: Vec<SMBCommandCode>,
    pub signed_requests: usize,
    pub unsigned_requests: usize,
    pub bad_signatures: usize,
    pub open_handles: usize,
}

impl ServerState {
    fn node(&self, path: &str) -> Option<Node> {
        if path.is_empty() {
            return Some(Node::Directory);
        }
        self.nodes.get(path).cloned()
    }

    fn parent_is_directory(&self, path: &str) -> bool {
        match path.rsplit_once('\\') {
            Some((parent, _)) => matches!(self.node(parent), Some(Node::Directory)),
            None => true,
        }
    }

    fn has_children(&self, path: &str) -> bool {
        let prefix = format!("{path}\\");
        self.nodes.keys().any(|key| key.starts_with(&prefix))
    }

    fn children(&self, directory: &str) -> Vec<(String, Node)> {
        self.nodes
            .iter()
            .filter_map(|(key, node)| {
                let (parent, name) = key.rsplit_once('\\').unwrap_or(("", key));
                (parent == directory).then(|| (name.to_string(), node.clone()))
            })
            .collect()
    }

    pub fn count(&self, command: SMBCommandCode) -> usize {
        self.commands.iter().filter(|seen| **seen == command).count()
    }
}

fn key(path: &str) -> String {
    path.replace('/', "\\").trim_matches('\\').to_string()
}

/// Handle on a server's shared state, kept by the test.
#[derive(Clone, Default)]
pub struct TestServer {
    state: Arc<Mutex<ServerState>>,
}

impl TestServer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> MutexGuard<'_, ServerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds a file and any missing parent directories.
    pub fn add_file(&self, path: &str, content: &[u8]) -> &Self {
        let path = key(path);
        self.add_parents(&path);
        self.state().nodes.insert(path, Node::File(content.to_vec()));
        self
    }

    pub fn add_directory(&self, path: &str) -> &Self {
        let path = key(path);
        self.add_parents(&path);
        self.state().nodes.insert(path, Node::Directory);
        self
    }

    fn add_parents(&self, path: &str) {
        let mut state = self.state();
        let mut prefix = String::new();
        let components: Vec<&str> = path.split('\\').collect();
        for component in &components[..components.len().saturating_sub(1)] {
            if !prefix.is_empty() {
                prefix.push('\\');
            }
            prefix.push_str(component);
            state.nodes.entry(prefix.clone()).or_insert(Node::Directory);
        }
    }

    pub fn file(&self, path: &str) -> Option<Vec<u8>> {
        match self.state().nodes.get(&key(path)) {
            Some(Node::File(data)) => Some(data.clone()),
            _ => None,
        }
    }

    pub fn exists(&self, path: &str) -> bool {
        self.state().nodes.contains_key(&key(path))
    }

    pub fn count(&self, command: SMBCommandCode) -> usize {
        self.state().count(command)
    }

    /// Starts serving one connection and returns the client's end of it.
    pub fn spawn(&self, options: ServerOptions) -> DuplexStream {
        let (client, server) = duplex(256 * 1024);
        let connection = ServerConnection::new(options, self.state.clone());
        tokio::spawn(connection.serve(server));
        client
    }

    /// Polls until the server has seen `count` requests of `command`.
    pub async fn wait_for(&self, command: SMBCommandCode, count: usize) -> bool {
        for _ in 0..200 {
            if self.count(command) >= count {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        false
    }
}

pub fn config(options: &ServerOptions) -> SMBClientConfig {
    SMBClientConfig::builder()
        .username(options.username.clone())
        .password(options.password.clone())
        .domain(options.domain.clone())
        .remote_address("127.0.0.1")
        .remote_name(SERVER_NAME)
        .client_name("TESTCLIENT")
        .share_name(options.share.clone())
        .transport(options.transport)
        .timeout_secs(5u64)
        .build()
        .expect("test configuration is valid")
}

/// Connected but not yet negotiated.
pub async fn connect(server: &TestServer, options: ServerOptions, config: SMBClientConfig) -> SMBSession {
    SMBClient::connect_stream(server.spawn(options), config)
        .await
        .expect("transport connects")
}

/// Negotiated, authenticated and mounted on the configured share.
pub async fn mount(server: &TestServer, options: ServerOptions) -> (SMBSession, SMBTree) {
    let config = config(&options);
    mount_with(server, options, config).await
}

pub async fn mount_with(server: &TestServer, options: ServerOptions, config: SMBClientConfig) -> (SMBSession, SMBTree) {
    let session = connect(server, options, config).await;
    session.negotiate().await.expect("negotiate");
    session.authenticate().await.expect("authenticate");
    let tree = session.tree_connect().await.expect("tree connect");
    (session, tree)
}

struct PendingAuth {
    session_id: u64,
    negotiate: Vec<u8>,
    challenge: Vec<u8>,
    spnego: bool,
}

struct Handle {
    path: String,
    delete_on_close: bool,
    listing: Option<VecDeque<(String, Node)>>,
}

struct ServerConnection {
    options: ServerOptions,
    state: Arc<Mutex<ServerState>>,
    dialect: Option<SMBDialect>,
    pending: Option<PendingAuth>,
    session_id: u64,
    authenticated: bool,
    signing_key: Option<Vec<u8>>,
    next_session_id: u64,
    trees: HashSet<u32>,
    next_tree_id: u32,
    handles: HashMap<u64, Handle>,
    next_file_id: u64,
}

impl ServerConnection {
    fn new(options: ServerOptions, state: Arc<Mutex<ServerState>>) -> Self {
        Self {
            options,
            state,
            dialect: None,
            pending: None,
            session_id: 0,
            authenticated: false,
            signing_key: None,
            next_session_id: 0x0000_4000_0000_0000,
            trees: HashSet::new(),
            next_tree_id: 0,
            handles: HashMap::new(),
            next_file_id: 0,
        }
    }

    fn state(&self) -> MutexGuard<'_, ServerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn serve(mut self, stream: DuplexStream) {
        let mut framer = SMBFramer::new(stream, self.options.transport);
        loop {
            let Ok((packet_type, frame)) = framer.reader.receive_packet().await else {
                return;
            };
            match packet_type {
                SESSION_REQUEST if self.options.ignore_session_request => {}
                SESSION_REQUEST => {
                    if framer.writer.send_packet(POSITIVE_SESSION_RESPONSE, &[]).await.is_err() {
                        return;
                    }
                }
                SESSION_MESSAGE => {
                    for reply in self.handle(&frame) {
                        if framer.writer.send(&reply).await.is_err() {
                            return;
                        }
                    }
                }
                _ => {}
            }
        }
    }

    fn handle(&mut self, frame: &[u8]) -> Vec<Vec<u8>> {
        let Ok((_, header)) = SMBHeader::smb_from_bytes(frame) else {
            return Vec::new();
        };
        self.check_signature(frame, &header);
        self.state().commands.push(header.command);
        if self.options.silent.contains(&header.command) {
            return Vec::new();
        }

        let mut replies = Vec::new();
        if self.options.stray_responses && header.command == SMBCommandCode::Echo {
            let mut stray = SMBHeader::request(SMBCommandCode::Echo, u64::MAX - 7, 0, 0);
            stray.flags = SMBFlags::SERVER_TO_REDIR;
            stray.credits = 0;
            replies.push([stray.smb_to_bytes(), EMPTY_BODY.to_vec()].concat());
        }

        let mut reply = header.clone();
        reply.flags = SMBFlags::SERVER_TO_REDIR;
        reply.signature = [0; 16];
        reply.next_command = 0;
        reply.credits = match header.command {
            SMBCommandCode::Negotiate => 32,
            _ => header.credit_charge.max(1),
        };

        let body = frame.get(SMB2_HEADER_SIZE..).unwrap_or_default();
        let handled = match header.command {
            SMBCommandCode::Negotiate => self.negotiate(body),
            SMBCommandCode::SessionSetup => self.session_setup(frame, body, &mut reply),
            SMBCommandCode::LogOff => self.log_off(&header),
            SMBCommandCode::TreeConnect => self.tree_connect(&header, frame, body, &mut reply),
            SMBCommandCode::TreeDisconnect => self.tree_disconnect(&header),
            SMBCommandCode::Create => self.create(&header, frame, body),
            SMBCommandCode::Close => self.close(&header, body),
            SMBCommandCode::Read => self.read(&header, body),
            SMBCommandCode::Write => self.write(&header, frame, body),
            SMBCommandCode::QueryDirectory => self.query_directory(&header, frame, body),
            SMBCommandCode::SetInfo => self.set_info(&header, frame, body),
            SMBCommandCode::Echo => Ok((NTStatus::StatusSuccess, EMPTY_BODY.to_vec())),
            _ => Err(NTStatus::StatusNotSupported),
        };
        let (status, body) = handled.unwrap_or_else(|status| (status, ERROR_BODY.to_vec()));
        reply.status = status as u32;

        let mut bytes = [reply.smb_to_bytes(), body].concat();
        self.sign(&mut bytes, &reply);
        replies.push(bytes);
        replies
    }

    fn algorithm(&self) -> SigningAlgorithm {
        SigningAlgorithm::for_dialect(self.dialect.unwrap_or(SMBDialect::V2_1_0))
    }

    fn check_signature(&self, frame: &[u8], header: &SMBHeader) {
        let Some(key) = &self.signing_key else {
            return;
        };
        if header.session_id != self.session_id || header.command == SMBCommandCode::SessionSetup {
            return;
        }
        let mut state = self.state();
        if !header.flags.contains(SMBFlags::SIGNED) {
            state.unsigned_requests += 1;
        } else if verify_signature(frame, key, self.algorithm()).unwrap_or(false) {
            state.signed_requests += 1;
        } else {
            state.bad_signatures += 1;
        }
    }

    fn sign(&self, bytes: &mut [u8], reply: &SMBHeader) {
        let Some(key) = &self.signing_key else {
            return;
        };
        if reply.session_id != self.session_id || self.session_id == 0 {
            return;
        }
        if sign_message(bytes, key, self.algorithm()).is_ok() && self.options.corrupt_signature == Some(reply.command) {
            bytes[60] ^= 0xFF;
        }
    }

    fn require_session(&self, header: &SMBHeader) -> Result<(), NTStatus> {
        if self.authenticated && header.session_id == self.session_id {
            Ok(())
        } else {
            Err(NTStatus::UserSessionDeleted)
        }
    }

    fn require_tree(&self, header: &SMBHeader) -> Result<(), NTStatus> {
        self.require_session(header)?;
        if self.trees.contains(&header.tree_id) {
            Ok(())
        } else {
            Err(NTStatus::BadNetworkName)
        }
    }

    fn negotiate(&mut self, body: &[u8]) -> Handled {
        let count = u16_at(body, 2) as usize;
        let offered: Vec<u16> = (0..count).map(|i| u16_at(body, 36 + i * 2)).collect();
        let dialect = match self.options.answer_dialect {
            Some(dialect) => dialect,
            None => self.options.dialects
                .iter()
                .rev()
                .map(|dialect| *dialect as u16)
                .find(|dialect| offered.contains(dialect))
                .ok_or(NTStatus::StatusNotSupported)?,
        };
        self.dialect = self.options.dialects.iter().copied().find(|known| *known as u16 == dialect);

        let security_mode: u16 = if self.options.require_signing { 0x03 } else { 0x01 };
        let mut out = Vec::with_capacity(64);
        out.extend(self.options.negotiate_structure_size.to_le_bytes());
        out.extend(security_mode.to_le_bytes());
        out.extend(dialect.to_le_bytes());
        out.extend(0u16.to_le_bytes());
        out.extend([0x5A; 16]);
        out.extend(0u32.to_le_bytes());
        out.extend(self.options.max_read_size.max(self.options.max_write_size).to_le_bytes());
        out.extend(self.options.max_read_size.to_le_bytes());
        out.extend(self.options.max_write_size.to_le_bytes());
        out.extend(FILE_TIME.to_le_bytes());
        out.extend(FILE_TIME.to_le_bytes());
        out.extend(128u16.to_le_bytes());
        out.extend(0u16.to_le_bytes());
        out.extend(0u32.to_le_bytes());
        Ok((NTStatus::StatusSuccess, out))
    }

    fn session_setup(&mut self, frame: &[u8], body: &[u8], reply: &mut SMBHeader) -> Handled {
        let client_security = body.get(3).copied().unwrap_or(0);
        let token = slice(frame, u16_at(body, 12) as usize, u16_at(body, 14) as usize)
            .ok_or(NTStatus::StatusLogonFailure)?;
        let (spnego, ntlm) = if NTLMMessage::is_ntlmssp(token) {
            (false, token.to_vec())
        } else {
            let parsed = SPNEGOToken::parse(token).map_err(|_| NTStatus::StatusLogonFailure)?;
            let inner = parsed.mech_token().ok_or(NTStatus::StatusLogonFailure)?;
            (true, inner.to_vec())
        };

        match NTLMMessage::parse(&ntlm).map_err(|_| NTStatus::StatusLogonFailure)? {
            NTLMMessage::Negotiate(_) => {
                self.next_session_id += 1;
                reply.session_id = self.next_session_id;
                let challenge = NTLMChallengeMessageBody::new(
                    SERVER_NAME.into(),
                    NTLMNegotiateFlags::client_default(),
                    SERVER_CHALLENGE,
                    &AvPairList(vec![
                        AvPair::new(AvId::NbDomainName, utf16(&self.options.domain)),
                        AvPair::new(AvId::NbComputerName, utf16(SERVER_NAME)),
                        AvPair::new(AvId::Timestamp, FILE_TIME.to_le_bytes().to_vec()),
                    ]),
                ).as_bytes();
                let token = if spnego {
                    SPNEGOToken::Response(SPNEGOTokenResponseBody::with_token(
                        Some(NegotiateState::AcceptIncomplete),
                        challenge.clone(),
                    )).as_bytes()
                } else {
                    challenge.clone()
                };
                self.pending = Some(PendingAuth {
                    session_id: reply.session_id,
                    negotiate: ntlm,
                    challenge,
                    spnego,
                });
                Ok((NTStatus::MoreProcessingRequired, session_setup_body(0, &token)))
            }
            NTLMMessage::Authenticate(authenticate) => {
                let pending = self.pending.take().ok_or(NTStatus::StatusLogonFailure)?;
                reply.session_id = pending.session_id;
                let (flags, exported_key) = self.verify(&authenticate, &pending, &ntlm)?;

                let signing = self.options.require_signing || client_security & 0x02 != 0;
                self.signing_key = match (signing, exported_key) {
                    (true, Some(key)) => {
                        let dialect = self.dialect.ok_or(NTStatus::StatusLogonFailure)?;
                        Some(generate_signing_key(&key, dialect).map_err(|_| NTStatus::StatusLogonFailure)?)
                    }
                    _ => None,
                };
                self.session_id = pending.session_id;
                self.authenticated = true;

                let token = if pending.spnego {
                    SPNEGOToken::Response(SPNEGOTokenResponseBody {
                        state: Some(NegotiateState::AcceptCompleted),
                        ..Default::default()
                    }).as_bytes()
                } else {
                    Vec::new()
                };
                Ok((NTStatus::StatusSuccess, session_setup_body(flags, &token)))
            }
            NTLMMessage::Challenge(_) => Err(NTStatus::StatusLogonFailure),
        }
    }

    fn verify(&self, message: &NTLMAuthenticateMessageBody, pending: &PendingAuth, raw: &[u8]) -> Result<(u16, Option<[u8; 16]>), NTStatus> {
        let failure = |_: SMBError| NTStatus::StatusLogonFailure;
        if message.user_name.is_empty() && message.nt_challenge_response.is_empty() {
            return if self.options.allow_anonymous {
                Ok((SESSION_FLAG_IS_NULL, None))
            } else {
                Err(NTStatus::StatusLogonFailure)
            };
        }
        if !message.user_name.eq_ignore_ascii_case(&self.options.username) || message.nt_challenge_response.len() <= 16 {
            return Err(NTStatus::StatusLogonFailure);
        }
        let response_key = ntowf_v2(&self.options.password, &message.user_name, &message.domain_name).map_err(failure)?;
        let (proof, blob) = message.nt_challenge_response.split_at(16);
        let expected = nt_proof_str(&response_key, &SERVER_CHALLENGE, blob).map_err(failure)?;
        if expected[..] != proof[..] {
            return Err(NTStatus::StatusLogonFailure);
        }
        let base_key = session_base_key(&response_key, &expected).map_err(failure)?;
        let exported: [u8; 16] = if message.encrypted_session_key.is_empty() {
            base_key
        } else {
            rc4_transform(&base_key, &message.encrypted_session_key)
                .map_err(failure)?
                .try_into()
                .map_err(|_| NTStatus::StatusLogonFailure)?
        };

        let mut zeroed = raw.to_vec();
        zeroed.get_mut(MIC_RANGE).ok_or(NTStatus::StatusLogonFailure)?.fill(0);
        let mic = hmac_md5(&exported, &[&pending.negotiate, &pending.challenge, &zeroed]).map_err(failure)?;
        if mic != message.mic {
            return Err(NTStatus::StatusLogonFailure);
        }
        Ok((0, Some(exported)))
    }

    fn log_off(&mut self, header: &SMBHeader) -> Handled {
        self.require_session(header)?;
        self.authenticated = false;
        self.trees.clear();
        Ok((NTStatus::StatusSuccess, EMPTY_BODY.to_vec()))
    }

    fn tree_connect(&mut self, header: &SMBHeader, frame: &[u8], body: &[u8], reply: &mut SMBHeader) -> Handled {
        self.require_session(header)?;
        let path = string_at(frame, u16_at(body, 4) as usize, u16_at(body, 6) as usize)?;
        let share = path.rsplit('\\').next().unwrap_or_default();
        if !share.eq_ignore_ascii_case(&self.options.share) {
            return Err(NTStatus::BadNetworkName);
        }
        self.next_tree_id += 1;
        self.trees.insert(self.next_tree_id);
        reply.tree_id = self.next_tree_id;

        let mut out = vec![16, 0, 0x01, 0];
        out.extend(0u32.to_le_bytes());
        out.extend(0u32.to_le_bytes());
        out.extend(0x001F_01FFu32.to_le_bytes());
        Ok((NTStatus::StatusSuccess, out))
    }

    fn tree_disconnect(&mut self, header: &SMBHeader) -> Handled {
        self.require_session(header)?;
        self.trees.remove(&header.tree_id);
        Ok((NTStatus::StatusSuccess, EMPTY_BODY.to_vec()))
    }

    fn create(&mut self, header: &SMBHeader, frame: &[u8], body: &[u8]) -> Handled {
        self.require_tree(header)?;
        let disposition = u32_at(body, 36);
        let options = u32_at(body, 40);
        let name = string_at(frame, u16_at(body, 44) as usize, u16_at(body, 46) as usize)?;
        let wants_directory = options & FILE_DIRECTORY_FILE != 0;
        let wants_file = options & FILE_NON_DIRECTORY_FILE != 0;
        let delete_on_close = options & FILE_DELETE_ON_CLOSE != 0;

        let mut state = self.state();
        let (action, node) = match state.node(&name) {
            Some(node) => {
                if wants_directory && !node.is_directory() {
                    return Err(NTStatus::NotADirectory);
                }
                if wants_file && node.is_directory() {
                    return Err(NTStatus::FileIsADirectory);
                }
                if delete_on_close && state.has_children(&name) {
                    return Err(NTStatus::DirectoryNotEmpty);
                }
                match disposition {
                    FILE_CREATE => return Err(NTStatus::ObjectNameCollision),
                    FILE_SUPERSEDE | FILE_OVERWRITE | 5 if !node.is_directory() => {
                        state.nodes.insert(name.clone(), Node::File(Vec::new()));
                        (3u32, Node::File(Vec::new()))
                    }
                    _ => (1u32, node),
                }
            }
            None => {
                if !state.parent_is_directory(&name) {
                    return Err(NTStatus::ObjectPathNotFound);
                }
                if matches!(disposition, FILE_OPEN | FILE_OVERWRITE) {
                    return Err(NTStatus::ObjectNameNotFound);
                }
                let node = if wants_directory { Node::Directory } else { Node::File(Vec::new()) };
                state.nodes.insert(name.clone(), node.clone());
                (2u32, node)
            }
        };
        state.open_handles += 1;
        drop(state);

        self.next_file_id += 1;
        let file_id = self.next_file_id;
        self.handles.insert(file_id, Handle { path: name, delete_on_close, listing: None });

        let mut out = vec![89, 0, 0, 0];
        out.extend(action.to_le_bytes());
        for _ in 0..4 {
            out.extend(FILE_TIME.to_le_bytes());
        }
        out.extend(allocation(node.size()).to_le_bytes());
        out.extend(node.size().to_le_bytes());
        out.extend(node.attributes().to_le_bytes());
        out.extend(0u32.to_le_bytes());
        out.extend(file_id.to_le_bytes());
        out.extend(file_id.to_le_bytes());
        out.extend(0u32.to_le_bytes());
        out.extend(0u32.to_le_bytes());
        Ok((NTStatus::StatusSuccess, out))
    }

    fn close(&mut self, header: &SMBHeader, body: &[u8]) -> Handled {
        self.require_tree(header)?;
        let handle = self.handles.remove(&u64_at(body, 16)).ok_or(NTStatus::FileClosed)?;
        let mut state = self.state();
        state.open_handles -= 1;
        if handle.delete_on_close {
            state.nodes.remove(&handle.path);
        }
        let mut out = vec![60, 0];
        out.resize(60, 0);
        Ok((NTStatus::StatusSuccess, out))
    }

    fn read(&mut self, header: &SMBHeader, body: &[u8]) -> Handled {
        self.require_tree(header)?;
        let length = u32_at(body, 4).min(self.options.max_read_size) as usize;
        let offset = u64_at(body, 8) as usize;
        let handle = self.handles.get(&u64_at(body, 24)).ok_or(NTStatus::FileClosed)?;
        let Some(Node::File(data)) = self.state().node(&handle.path) else {
            return Err(NTStatus::FileIsADirectory);
        };
        if offset >= data.len() {
            return Err(NTStatus::EndOfFile);
        }
        let chunk = &data[offset..data.len().min(offset + length)];
        let mut out = vec![17, 0, 80, 0];
        out.extend((chunk.len() as u32).to_le_bytes());
        out.extend(0u32.to_le_bytes());
        out.extend(0u32.to_le_bytes());
        out.extend_from_slice(chunk);
        Ok((NTStatus::StatusSuccess, out))
    }

    fn write(&mut self, header: &SMBHeader, frame: &[u8], body: &[u8]) -> Handled {
        self.require_tree(header)?;
        let data = slice(frame, u16_at(body, 2) as usize, u32_at(body, 4) as usize).ok_or(NTStatus::InvalidParameter)?;
        let offset = u64_at(body, 8) as usize;
        let handle = self.handles.get(&u64_at(body, 24)).ok_or(NTStatus::FileClosed)?;
        let mut state = self.state();
        let Some(Node::File(content)) = state.nodes.get_mut(&handle.path) else {
            return Err(NTStatus::FileIsADirectory);
        };
        if content.len() < offset + data.len() {
            content.resize(offset + data.len(), 0);
        }
        content[offset..offset + data.len()].copy_from_slice(data);

        let mut out = vec![17, 0, 0, 0];
        out.extend((data.len() as u32).to_le_bytes());
        out.extend(0u32.to_le_bytes());
        out.extend(0u32.to_le_bytes());
        Ok((NTStatus::StatusSuccess, out))
    }

    fn query_directory(&mut self, header: &SMBHeader, frame: &[u8], body: &[u8]) -> Handled {
        self.require_tree(header)?;
        let restart = body.get(3).copied().unwrap_or(0) & 0x01 != 0;
        let pattern = string_at(frame, u16_at(body, 24) as usize, u16_at(body, 26) as usize)?;
        let batch_size = self.options.listing_batch.max(1);
        let volatile = u64_at(body, 16);
        let path = self.handles.get(&volatile).ok_or(NTStatus::FileClosed)?.path.clone();
        if !matches!(self.state().node(&path), Some(Node::Directory)) {
            return Err(NTStatus::NotADirectory);
        }

        let needs_scan = restart || self.handles.get(&volatile).is_some_and(|handle| handle.listing.is_none());
        if needs_scan {
            let mut entries: VecDeque<(String, Node)> = [".", ".."]
                .into_iter()
                .map(|name| (name.to_string(), Node::Directory))
                .chain(self.state().children(&path))
                .filter(|(name, _)| wildcard_match(&pattern, name))
                .collect();
            let empty = entries.is_empty();
            if let Some(handle) = self.handles.get_mut(&volatile) {
                handle.listing = Some(std::mem::take(&mut entries));
            }
            if empty {
                return Err(NTStatus::NoSuchFile);
            }
        }

        let handle = self.handles.get_mut(&volatile).ok_or(NTStatus::FileClosed)?;
        let queue = handle.listing.get_or_insert_with(VecDeque::new);
        if queue.is_empty() {
            return Err(NTStatus::NoMoreFiles);
        }
        let batch: Vec<(String, Node)> = queue.drain(..batch_size.min(queue.len())).collect();
        let buffer = encode_listing(&batch);

        let mut out = vec![9, 0];
        out.extend(72u16.to_le_bytes());
        out.extend((buffer.len() as u32).to_le_bytes());
        out.extend(buffer);
        Ok((NTStatus::StatusSuccess, out))
    }

    fn set_info(&mut self, header: &SMBHeader, frame: &[u8], body: &[u8]) -> Handled {
        self.require_tree(header)?;
        if body.get(2) != Some(&1) || body.get(3) != Some(&FILE_RENAME_INFORMATION) {
            return Err(NTStatus::StatusNotSupported);
        }
        let buffer = slice(frame, u16_at(body, 8) as usize, u32_at(body, 4) as usize).ok_or(NTStatus::InvalidParameter)?;
        let replace = buffer.first().copied().unwrap_or(0) != 0;
        let target = string_at(buffer, 20, u32_at(buffer, 16) as usize)?;
        let target = key(&target);
        let volatile = u64_at(body, 24);
        let source = self.handles.get(&volatile).ok_or(NTStatus::FileClosed)?.path.clone();

        let mut state = self.state();
        if state.nodes.contains_key(&target) && !replace {
            return Err(NTStatus::ObjectNameCollision);
        }
        if !state.parent_is_directory(&target) {
            return Err(NTStatus::ObjectPathNotFound);
        }
        let prefix = format!("{source}\\");
        let moved: Vec<String> = state.nodes
            .keys()
            .filter(|path| **path == source || path.starts_with(&prefix))
            .cloned()
            .collect();
        for path in moved {
            if let Some(node) = state.nodes.remove(&path) {
                let renamed = format!("{}{}", target, &path[source.len()..]);
                state.nodes.insert(renamed, node);
            }
        }
        drop(state);
        if let Some(handle) = self.handles.get_mut(&volatile) {
            handle.path = target;
        }
        Ok((NTStatus::StatusSuccess, vec![2, 0]))
    }
}

fn session_setup_body(flags: u16, token: &[u8]) -> Vec<u8> {
    let mut out = vec![9, 0];
    out.extend(flags.to_le_bytes());
    out.extend(72u16.to_le_bytes());
    out.extend((token.len() as u16).to_le_bytes());
    out.extend_from_slice(token);
    out
}

fn encode_listing(entries: &[(String, Node)]) -> Vec<u8> {
    let mut out = Vec::new();
    for (index, (name, node)) in entries.iter().enumerate() {
        let name = utf16(name);
        let mut record = vec![0u8; 8];
        for _ in 0..4 {
            record.extend(FILE_TIME.to_le_bytes());
        }
        record.extend(node.size().to_le_bytes());
        record.extend(allocation(node.size()).to_le_bytes());
        record.extend(node.attributes().to_le_bytes());
        record.extend((name.len() as u32).to_le_bytes());
        record.extend(name);
        if index + 1 < entries.len() {
            record.resize(record.len().div_ceil(8) * 8, 0);
            let next = record.len() as u32;
            record[0..4].copy_from_slice(&next.to_le_bytes());
        }
        out.extend(record);
    }
    out
}

fn allocation(size: u64) -> u64 {
    size.div_ceil(4096) * 4096
}

/// `*` and `?` matching, case-insensitive.
pub fn wildcard_match(pattern: &str, name: &str) -> bool {
    let pattern: Vec<char> = pattern.to_lowercase().chars().collect();
    let name: Vec<char> = name.to_lowercase().chars().collect();
    let (mut p, mut n) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;
    while n < name.len() {
        if p < pattern.len() && (pattern[p] == '?' || pattern[p] == name[n]) {
            p += 1;
            n += 1;
        } else if p < pattern.len() && pattern[p] == '*' {
            backtrack = Some((p, n));
            p += 1;
        } else if let Some((star, matched)) = backtrack {
            p = star + 1;
            n = matched + 1;
            backtrack = Some((star, matched + 1));
        } else {
            return false;
        }
    }
    pattern[p..].iter().all(|c| *c == '*')
}

fn u16_at(bytes: &[u8], at: usize) -> u16 {
    bytes.get(at..at + 2).map_or(0, |b| u16::from_le_bytes([b[0], b[1]]))
}

fn u32_at(bytes: &[u8], at: usize) -> u32 {
    bytes.get(at..at + 4).map_or(0, |b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

fn u64_at(bytes: &[u8], at: usize) -> u64 {
    bytes.get(at..at + 8).map_or(0, |b| {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(b);
        u64::from_le_bytes(raw)
    })
}

fn slice(bytes: &[u8], offset: usize, length: usize) -> Option<&[u8]> {
    bytes.get(offset..offset + length)
}

fn string_at(bytes: &[u8], offset: usize, length: usize) -> Result<String, NTStatus> {
    let raw = slice(bytes, offset, length).ok_or(NTStatus::ObjectNameNotFound)?;
    let units: Vec<u16> = raw.chunks_exact(2).map(|pair| u16::from_le_bytes([pair[0], pair[1]])).collect();
    String::from_utf16(&units).map_err(|_| NTStatus::ObjectNameNotFound)
}

pub fn utf16(value: &str) -> Vec<u8> {
    value.encode_utf16().flat_map(u16::to_le_bytes).collect()
}
