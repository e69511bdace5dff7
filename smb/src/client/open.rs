use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tokio_util::sync::CancellationToken;

use smb_core::error::{OperationError, SMBError};
use smb_core::logging::{debug, trace, warn};
use smb_core::nt_status::NTStatus;
use smb_core::SMBResult;

use crate::client::entry::SMBDirectoryEntry;
use crate::client::state::require_live;
use crate::client::tree::TreeInner;
use crate::protocol::body::{SMBRequestBody, SMBResponseBody};
use crate::protocol::body::close::SMBCloseRequest;
use crate::protocol::body::create::{SMBCreateResponse, SMBFileId};
use crate::protocol::body::query_directory::SMBQueryDirectoryRequest;
use crate::protocol::body::read::SMBReadRequest;
use crate::protocol::body::set_info::{SMBRenameInformation, SMBSetInfoRequest};
use crate::protocol::body::write::SMBWriteRequest;
use crate::protocol::message::SMBResponse;

const QUERY_DIRECTORY_BUFFER: u32 = 64 * 1024;

/// An open file or directory on a tree.
///
/// Valid until [`close`](Self::close), a disconnect of its tree or the end of
/// its session. Dropping an open handle queues a close.
pub struct SMBOpen {
    tree: Arc<TreeInner>,
    file_id: SMBFileId,
    path: String,
    entry: SMBDirectoryEntry,
    position: AtomicU64,
    released: AtomicBool,
    token: CancellationToken,
}

impl SMBOpen {
    pub(crate) fn new(tree: Arc<TreeInner>, path: String, response: &SMBCreateResponse) -> Self {
        let name = crate::client::path::split_parent(&path).1.to_string();
        let token = tree.token.child_token();
        Self {
            file_id: response.file_id,
            entry: SMBDirectoryEntry::from_create(name, response),
            path,
            tree,
            position: AtomicU64::new(0),
            released: AtomicBool::new(false),
            token,
        }
    }

    pub fn file_id(&self) -> SMBFileId {
        self.file_id
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Metadata returned when the handle was opened.
    pub fn entry(&self) -> &SMBDirectoryEntry {
        &self.entry
    }

    pub fn is_directory(&self) -> bool {
        self.entry.is_directory
    }

    /// Offset just past the last byte read or written.
    pub fn position(&self) -> u64 {
        self.position.load(Ordering::SeqCst)
    }

    async fn submit(&self, body: SMBRequestBody) -> SMBResult<SMBResponse> {
        require_live(&self.tree.session.token, &self.token, "handle")?;
        self.tree.session.submit(self.tree.tree_id, body).await
    }

    fn failed(&self, response: &SMBResponse) -> SMBError {
        OperationError::from_status(response.header.status, self.path.clone()).into()
    }

    /// Reads up to `length` bytes at `offset`. Empty at end of file.
    pub async fn read_at(&self, offset: u64, length: u32) -> SMBResult<Vec<u8>> {
        let response = self
            .submit(SMBRequestBody::Read(SMBReadRequest::new(self.file_id, offset, length)))
            .await?;
        match response.body {
            SMBResponseBody::Read(body) => {
                trace!(path = %self.path, offset, len = body.data.len(), "read");
                self.position.store(offset + body.data.len() as u64, Ordering::SeqCst);
                Ok(body.data)
            }
            _ if response.header.nt_status() == NTStatus::EndOfFile => Ok(Vec::new()),
            _ => Err(self.failed(&response)),
        }
    }

    /// Writes `data` at `offset`, returning how many bytes the server took.
    pub async fn write_at(&self, offset: u64, data: &[u8]) -> SMBResult<usize> {
        let response = self
            .submit(SMBRequestBody::Write(SMBWriteRequest::new(self.file_id, offset, data.to_vec())))
            .await?;
        match response.body {
            SMBResponseBody::Write(body) => {
                trace!(path = %self.path, offset, count = body.count, "write");
                self.position.store(offset + body.count as u64, Ordering::SeqCst);
                Ok(body.count as usize)
            }
            _ => Err(self.failed(&response)),
        }
    }

    /// Next batch of entries matching `pattern`, `None` once the listing is
    /// exhausted. `restart` starts the scan over.
    pub async fn query_directory(&self, pattern: &str, restart: bool) -> SMBResult<Option<Vec<SMBDirectoryEntry>>> {
        let request = SMBQueryDirectoryRequest::new(self.file_id, pattern, restart, QUERY_DIRECTORY_BUFFER);
        let response = self.submit(SMBRequestBody::QueryDirectory(request)).await?;
        match response.body {
            SMBResponseBody::QueryDirectory(body) => {
                let entries = body.entries()?
                    .into_iter()
                    .map(SMBDirectoryEntry::from)
                    .collect::<Vec<_>>();
                trace!(path = %self.path, count = entries.len(), "directory batch");
                Ok(Some(entries))
            }
            _ => match response.header.nt_status() {
                NTStatus::NoMoreFiles | NTStatus::NoSuchFile => Ok(None),
                _ => Err(self.failed(&response)),
            },
        }
    }

    pub(crate) async fn rename_to(&self, new_path: &str, replace_if_exists: bool) -> SMBResult<()> {
        let information = SMBRenameInformation {
            replace_if_exists,
            file_name: new_path.to_string(),
        };
        let response = self
            .submit(SMBRequestBody::SetInfo(SMBSetInfoRequest::rename(self.file_id, &information)))
            .await?;
        match response.body {
            SMBResponseBody::SetInfo(_) => Ok(()),
            _ => Err(OperationError::from_status(response.header.status, new_path).into()),
        }
    }

    pub async fn close(&self) -> SMBResult<()> {
        require_live(&self.tree.session.token, &self.token, "handle")?;
        if self.released.swap(true, Ordering::SeqCst) {
            return Err(SMBError::invalid_order(format!("{} is already closed", self.path)));
        }
        self.token.cancel();
        let response = self.tree.session
            .submit(self.tree.tree_id, SMBRequestBody::Close(SMBCloseRequest::new(self.file_id)))
            .await?;
        match response.body {
            SMBResponseBody::Close(_) => {
                debug!(path = %self.path, "closed");
                Ok(())
            }
            _ => Err(self.failed(&response)),
        }
    }
}

impl Drop for SMBOpen {
    fn drop(&mut self) {
        if self.released.swap(true, Ordering::SeqCst) || self.token.is_cancelled() {
            return;
        }
        self.token.cancel();
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let tree = self.tree.clone();
        let file_id = self.file_id;
        let path = std::mem::take(&mut self.path);
        runtime.spawn(async move {
            let body = SMBRequestBody::Close(SMBCloseRequest::new(file_id));
            if let Err(error) = tree.session.submit(tree.tree_id, body).await {
                warn!(path = %path, %error, "close of dropped handle failed");
            }
        });
    }
}
