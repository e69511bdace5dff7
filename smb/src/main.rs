use anyhow::{bail, Context};
use tracing_subscriber::EnvFilter;

use smb_client::client::{CONNECT_PARAMS_VAR, SMBClient, SMBClientConfig, SMBTree};
use smb_client::client::path;
use smb_core::logging::info;

const DEFAULT_SOURCE_FOLDER: &str = "folder/on/remote/server";
const DEFAULT_TARGET_FOLDER: &str = "new_folder/on/remote/server";

/// Copies the first file of an existing remote folder into a new remote
/// folder through a local temporary file, then removes the copy and the folder.
///
/// Usage: `smb_transfer [source_folder] [target_folder]`, with the connection
/// parameters as JSON in `SMB_CONNECT_PARAMS`.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut args = std::env::args().skip(1);
    let source_folder = args.next().unwrap_or_else(|| DEFAULT_SOURCE_FOLDER.into());
    let target_folder = args.next().unwrap_or_else(|| DEFAULT_TARGET_FOLDER.into());

    let config = SMBClientConfig::from_env()
        .with_context(|| format!("reading connection parameters from {CONNECT_PARAMS_VAR}"))?;
    let (session, tree) = SMBClient::connect_share(config)
        .await
        .context("connecting to the share")?;

    let result = transfer(&tree, &source_folder, &target_folder).await;
    session.close().await.context("closing the session")?;
    result
}

async fn transfer(tree: &SMBTree, source_folder: &str, target_folder: &str) -> anyhow::Result<()> {
    let files = tree.list_path(source_folder)
        .await
        .with_context(|| format!("listing {source_folder}"))?
        .into_iter()
        .filter(|entry| !entry.is_directory)
        .map(|entry| entry.name)
        .collect::<Vec<_>>();
    info!(folder = source_folder, ?files, "listed");
    let Some(name) = files.first() else {
        bail!("{source_folder} holds no files");
    };

    // Removed on drop, whichever step fails.
    let scratch = tempfile::Builder::new()
        .prefix("smb_transfer")
        .tempdir()
        .context("creating a local scratch directory")?;
    let local = scratch.path().join(name);
    let source = path::join(&path::normalize(source_folder), name);
    let mut sink = tokio::fs::File::create(&local).await?;
    tree.retrieve_file(&source, &mut sink)
        .await
        .with_context(|| format!("downloading {source}"))?;
    drop(sink);

    tree.create_directory(target_folder)
        .await
        .with_context(|| format!("creating {target_folder}"))?;
    let target = path::join(&path::normalize(target_folder), name);
    let mut upload = tokio::fs::File::open(&local).await?;
    tree.store_file(&target, &mut upload)
        .await
        .with_context(|| format!("uploading {target}"))?;
    drop(upload);

    tree.delete_files(&target)
        .await
        .with_context(|| format!("deleting {target}"))?;
    tree.delete_directory(target_folder)
        .await
        .with_context(|| format!("deleting {target_folder}"))?;
    scratch.close().context("removing the local copy")?;
    info!(file = %name, "transfer round trip complete");
    Ok(())
}
