use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;

use smb_core::error::{OperationError, ProtocolError, SMBError};
use smb_core::logging::{debug, info, warn};
use smb_core::SMBResult;

use crate::client::entry::SMBDirectoryEntry;
use crate::client::open::SMBOpen;
use crate::client::path;
use crate::client::session::SessionInner;
use crate::client::state::require_live;
use crate::protocol::body::{SMBRequestBody, SMBResponseBody};
use crate::protocol::body::create::{SMBAccessMask, SMBCreateDisposition, SMBCreateOptions, SMBCreateRequest};
use crate::protocol::body::empty::SMBEmpty;
use crate::protocol::body::tree_connect::{SMBShareType, SMBTreeConnectResponse};

/// Upper bound for one read or write, whatever the server allows.
pub const MAX_CHUNK_SIZE: usize = 64 * 1024;

pub(crate) struct TreeInner {
    pub(crate) session: Arc<SessionInner>,
    pub(crate) tree_id: u32,
    path: String,
    share_type: SMBShareType,
    maximal_access: SMBAccessMask,
    pub(crate) token: CancellationToken,
}

impl Drop for TreeInner {
    fn drop(&mut self) {
        if self.token.is_cancelled() {
            return;
        }
        self.token.cancel();
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let session = self.session.clone();
        let tree_id = self.tree_id;
        runtime.spawn(async move {
            if let Err(error) = session.submit(tree_id, SMBRequestBody::TreeDisconnect(SMBEmpty)).await {
                warn!(tree_id, %error, "disconnect of dropped tree failed");
            }
        });
    }
}

/// A connected share. File and directory operations take share relative
/// paths with either separator.
#[derive(Clone)]
pub struct SMBTree {
    inner: Arc<TreeInner>,
}

impl SMBTree {
    pub(crate) fn new(session: Arc<SessionInner>, tree_id: u32, path: String, response: SMBTreeConnectResponse) -> Self {
        let token = session.token.child_token();
        Self {
            inner: Arc::new(TreeInner {
                session,
                tree_id,
                path,
                share_type: response.share_type,
                maximal_access: response.maximal_access,
                token,
            }),
        }
    }

    pub fn tree_id(&self) -> u32 {
        self.inner.tree_id
    }

    /// `\\server\share`
    pub fn path(&self) -> &str {
        &self.inner.path
    }

    pub fn share_type(&self) -> SMBShareType {
        self.inner.share_type
    }

    pub fn maximal_access(&self) -> SMBAccessMask {
        self.inner.maximal_access
    }

    fn chunk_size(&self, server_limit: impl Fn(&crate::client::SMBServerInfo) -> u32) -> usize {
        self.inner.session.connection
            .server_info()
            .map(|info| (server_limit(info) as usize).clamp(1, MAX_CHUNK_SIZE))
            .unwrap_or(MAX_CHUNK_SIZE)
    }

    /// Opens `path` with a raw CREATE.
    pub async fn open(
        &self,
        path: &str,
        access: SMBAccessMask,
        disposition: SMBCreateDisposition,
        options: SMBCreateOptions,
    ) -> SMBResult<SMBOpen> {
        require_live(&self.inner.session.token, &self.inner.token, "tree")?;
        let name = path::normalize(path);
        let request = SMBCreateRequest::new(name.clone(), access, disposition, options);
        let response = self.inner.session
            .submit(self.inner.tree_id, SMBRequestBody::Create(request))
            .await?;
        match response.body {
            SMBResponseBody::Create(body) => {
                debug!(path = %name, action = ?body.action, "opened");
                Ok(SMBOpen::new(self.inner.clone(), name, &body))
            }
            _ => {
                debug!(path = %name, status = response.header.status, "open failed");
                Err(OperationError::from_status(response.header.status, name).into())
            }
        }
    }

    pub async fn list_path(&self, path: &str) -> SMBResult<Vec<SMBDirectoryEntry>> {
        self.list_path_with_pattern(path, "*").await
    }

    /// Entries of directory `path` whose names match `pattern`, without `.`
    /// and `..`.
    pub async fn list_path_with_pattern(&self, path: &str, pattern: &str) -> SMBResult<Vec<SMBDirectoryEntry>> {
        let directory = self.open(
            path,
            SMBAccessMask::FILE_LIST_DIRECTORY | SMBAccessMask::FILE_READ_ATTRIBUTES | SMBAccessMask::SYNCHRONIZE,
            SMBCreateDisposition::Open,
            SMBCreateOptions::DIRECTORY_FILE,
        ).await?;
        let result = collect_entries(&directory, pattern).await;
        release(directory, result).await
    }

    /// Copies the whole file into `sink`, returning the bytes copied.
    pub async fn retrieve_file<W>(&self, path: &str, sink: &mut W) -> SMBResult<u64>
    where
        W: AsyncWrite + Unpin + Send,
    {
        self.retrieve_file_from_offset(path, sink, 0, u64::MAX).await
    }

    pub async fn retrieve_file_from_offset<W>(&self, path: &str, sink: &mut W, offset: u64, max_length: u64) -> SMBResult<u64>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let file = self.open(
            path,
            SMBAccessMask::read(),
            SMBCreateDisposition::Open,
            SMBCreateOptions::NON_DIRECTORY_FILE,
        ).await?;
        let chunk = self.chunk_size(|info| info.max_read_size);
        let result = copy_out(&file, sink, offset, max_length, chunk).await;
        let copied = release(file, result).await?;
        info!(path, bytes = copied, "retrieved");
        Ok(copied)
    }

    /// Replaces `path` with the contents of `source`, returning the bytes stored.
    pub async fn store_file<R>(&self, path: &str, source: &mut R) -> SMBResult<u64>
    where
        R: AsyncRead + Unpin + Send,
    {
        self.store_file_from_offset(path, source, 0, true).await
    }

    /// Writes `source` into `path` starting at `offset`, creating the file if
    /// needed. With `truncate` the previous contents are dropped first.
    pub async fn store_file_from_offset<R>(&self, path: &str, source: &mut R, offset: u64, truncate: bool) -> SMBResult<u64>
    where
        R: AsyncRead + Unpin + Send,
    {
        let disposition = if truncate {
            SMBCreateDisposition::OverwriteIf
        } else {
            SMBCreateDisposition::OpenIf
        };
        let file = self.open(path, SMBAccessMask::write(), disposition, SMBCreateOptions::NON_DIRECTORY_FILE).await?;
        let chunk = self.chunk_size(|info| info.max_write_size);
        let result = copy_in(&file, source, offset, chunk).await;
        let stored = release(file, result).await?;
        info!(path, bytes = stored, "stored");
        Ok(stored)
    }

    pub async fn create_directory(&self, path: &str) -> SMBResult<()> {
        let directory = self.open(
            path,
            SMBAccessMask::FILE_LIST_DIRECTORY | SMBAccessMask::FILE_ADD_SUBDIRECTORY
                | SMBAccessMask::FILE_READ_ATTRIBUTES | SMBAccessMask::SYNCHRONIZE,
            SMBCreateDisposition::Create,
            SMBCreateOptions::DIRECTORY_FILE,
        ).await?;
        directory.close().await
    }

    /// Removes an empty directory.
    pub async fn delete_directory(&self, path: &str) -> SMBResult<()> {
        let directory = self.open(
            path,
            SMBAccessMask::DELETE | SMBAccessMask::FILE_READ_ATTRIBUTES,
            SMBCreateDisposition::Open,
            SMBCreateOptions::DIRECTORY_FILE | SMBCreateOptions::DELETE_ON_CLOSE,
        ).await?;
        directory.close().await
    }

    /// Deletes the files matched by `path_pattern`, which may carry `*` or `?`
    /// in its last component. Returns how many were deleted.
    pub async fn delete_files(&self, path_pattern: &str) -> SMBResult<usize> {
        let normalized = path::normalize(path_pattern);
        let (directory, name) = path::split_parent(&normalized);
        let targets = if path::has_wildcard(name) {
            self.list_path_with_pattern(directory, name)
                .await?
                .into_iter()
                .filter(|entry| !entry.is_directory)
                .map(|entry| path::join(directory, &entry.name))
                .collect()
        } else {
            vec![normalized.clone()]
        };
        if targets.is_empty() {
            return Err(OperationError::NotFound { path: normalized }.into());
        }
        for target in &targets {
            let file = self.open(
                target,
                SMBAccessMask::DELETE | SMBAccessMask::FILE_READ_ATTRIBUTES,
                SMBCreateDisposition::Open,
                SMBCreateOptions::NON_DIRECTORY_FILE | SMBCreateOptions::DELETE_ON_CLOSE,
            ).await?;
            file.close().await?;
            debug!(path = %target, "deleted");
        }
        Ok(targets.len())
    }

    pub async fn get_attributes(&self, path: &str) -> SMBResult<SMBDirectoryEntry> {
        let handle = self.open(
            path,
            SMBAccessMask::FILE_READ_ATTRIBUTES | SMBAccessMask::SYNCHRONIZE,
            SMBCreateDisposition::Open,
            SMBCreateOptions::empty(),
        ).await?;
        let entry = handle.entry().clone();
        handle.close().await?;
        Ok(entry)
    }

    /// Moves a file or directory within the share. Fails if `new_path` exists.
    pub async fn rename(&self, old_path: &str, new_path: &str) -> SMBResult<()> {
        let handle = self.open(
            old_path,
            SMBAccessMask::DELETE | SMBAccessMask::FILE_READ_ATTRIBUTES | SMBAccessMask::SYNCHRONIZE,
            SMBCreateDisposition::Open,
            SMBCreateOptions::empty(),
        ).await?;
        let target = path::normalize(new_path);
        let result = handle.rename_to(&target, false).await;
        release(handle, result).await
    }

    pub async fn disconnect(&self) -> SMBResult<()> {
        require_live(&self.inner.session.token, &self.inner.token, "tree")?;
        self.inner.token.cancel();
        let response = self.inner.session
            .submit(self.inner.tree_id, SMBRequestBody::TreeDisconnect(SMBEmpty))
            .await?;
        match response.body {
            SMBResponseBody::TreeDisconnect(_) => {
                debug!(path = %self.inner.path, "tree disconnected");
                Ok(())
            }
            _ => Err(OperationError::from_status(response.header.status, self.inner.path.clone()).into()),
        }
    }
}

/// Closes `open`, keeping the operation's error over the close error.
async fn release<T>(open: SMBOpen, result: SMBResult<T>) -> SMBResult<T> {
    let closed = open.close().await;
    let value = result?;
    closed?;
    Ok(value)
}

async fn collect_entries(directory: &SMBOpen, pattern: &str) -> SMBResult<Vec<SMBDirectoryEntry>> {
    let mut entries = Vec::new();
    let mut restart = true;
    while let Some(batch) = directory.query_directory(pattern, restart).await? {
        restart = false;
        entries.extend(batch.into_iter().filter(|entry| !entry.is_self_or_parent()));
    }
    Ok(entries)
}

async fn copy_out<W>(file: &SMBOpen, sink: &mut W, offset: u64, max_length: u64, chunk: usize) -> SMBResult<u64>
where
    W: AsyncWrite + Unpin + Send,
{
    let mut position = offset;
    let mut remaining = max_length;
    while remaining > 0 {
        let wanted = remaining.min(chunk as u64) as u32;
        let data = file.read_at(position, wanted).await?;
        if data.is_empty() {
            break;
        }
        sink.write_all(&data).await.map_err(SMBError::local_io)?;
        position += data.len() as u64;
        remaining = remaining.saturating_sub(data.len() as u64);
        if data.len() < wanted as usize {
            break;
        }
    }
    sink.flush().await.map_err(SMBError::local_io)?;
    Ok(position - offset)
}

async fn copy_in<R>(file: &SMBOpen, source: &mut R, offset: u64, chunk: usize) -> SMBResult<u64>
where
    R: AsyncRead + Unpin + Send,
{
    let mut buffer = vec![0u8; chunk];
    let mut position = offset;
    loop {
        let filled = fill(source, &mut buffer).await?;
        let mut written = 0;
        while written < filled {
            let count = file.write_at(position, &buffer[written..filled]).await?;
            if count == 0 {
                return Err(ProtocolError::Malformed(format!("server accepted no bytes of {}", file.path())).into());
            }
            written += count;
            position += count as u64;
        }
        if filled < buffer.len() {
            break;
        }
    }
    Ok(position - offset)
}

/// Reads until `buffer` is full or `source` is exhausted.
async fn fill<R: AsyncRead + Unpin>(source: &mut R, buffer: &mut [u8]) -> SMBResult<usize> {
    let mut filled = 0;
    while filled < buffer.len() {
        let count = source.read(&mut buffer[filled..]).await.map_err(SMBError::local_io)?;
        if count == 0 {
            break;
        }
        filled += count;
    }
    Ok(filled)
}
