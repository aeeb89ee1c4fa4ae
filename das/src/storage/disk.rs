use super::{Error, ExpirationPolicy, Storage};
use crate::{epoch, expired};
use anytrust_cryptography::{hash, Digest};
use bytes::Bytes;
#[cfg(unix)]
use std::path::Path;
use std::{io::ErrorKind, path::PathBuf, sync::Arc};
use tokio::{fs, io::AsyncWriteExt, sync::Mutex};
use tracing::debug;

/// Length of the timeout prefix of every blob file.
const HEADER_LENGTH: usize = 8;

/// Syncs a directory to ensure directory entry changes are durable.
#[cfg(unix)]
async fn sync_dir(path: &Path) -> Result<(), Error> {
    let dir = fs::File::open(path).await?;
    dir.sync_all().await?;
    Ok(())
}

/// Configuration for [Disk].
#[derive(Clone)]
pub struct Config {
    /// Directory holding one file per blob (created if missing).
    pub directory: PathBuf,

    pub expiration_policy: ExpirationPolicy,
}

/// [Storage] that keeps each blob in its own file (`[timeout u64 BE][data]`), named by the hex of
/// its digest.
///
/// Files are replaced atomically: the new contents are written and synced to a temporary file
/// that is then renamed over the old one.
#[derive(Clone)]
pub struct Disk {
    lock: Arc<Mutex<()>>,
    cfg: Config,
}

impl Disk {
    pub fn new(cfg: Config) -> Self {
        Self {
            lock: Arc::new(Mutex::new(())),
            cfg,
        }
    }

    fn path(&self, digest: &Digest) -> PathBuf {
        self.cfg.directory.join(hex::encode(digest))
    }

    /// Read the `(timeout, data)` stored for `digest`, if any.
    async fn read(&self, digest: &Digest) -> Result<Option<(u64, Bytes)>, Error> {
        let raw = match fs::read(self.path(digest)).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        if raw.len() < HEADER_LENGTH {
            return Err(Error::Corrupt(*digest));
        }
        let mut timeout = [0u8; HEADER_LENGTH];
        timeout.copy_from_slice(&raw[..HEADER_LENGTH]);
        let data = Bytes::from(raw).slice(HEADER_LENGTH..);
        Ok(Some((u64::from_be_bytes(timeout), data)))
    }
}

impl Storage for Disk {
    async fn put(&self, digest: Digest, data: Bytes, timeout: u64) -> Result<(), Error> {
        // Acquire the filesystem lock
        let _guard = self.lock.lock().await;

        // Never shorten the retention of an existing blob
        let timeout = match self.read(&digest).await {
            Ok(Some((existing, _))) => existing.max(timeout),
            Ok(None) => timeout,
            Err(Error::Corrupt(_)) => {
                debug!(?digest, "overwriting corrupt blob");
                timeout
            }
            Err(err) => return Err(err),
        };

        // Write the new contents to a temporary file
        fs::create_dir_all(&self.cfg.directory).await?;
        let path = self.path(&digest);
        let temporary = path.with_extension("tmp");
        let mut file = fs::File::create(&temporary).await?;
        file.write_all(&timeout.to_be_bytes()).await?;
        file.write_all(&data).await?;
        file.sync_all().await?;
        drop(file);

        // Move it into place
        fs::rename(&temporary, &path).await?;
        #[cfg(unix)]
        {
            // Sync the directory to ensure the rename is durable
            sync_dir(&self.cfg.directory).await?;
        }
        Ok(())
    }

    async fn get(&self, digest: &Digest) -> Result<Option<Bytes>, Error> {
        let Some((timeout, data)) = self.read(digest).await? else {
            return Ok(None);
        };
        if self.cfg.expiration_policy == ExpirationPolicy::DiscardAfterTimeout
            && expired(timeout, epoch())
        {
            return Ok(None);
        }
        if hash(&data) != *digest {
            return Err(Error::Corrupt(*digest));
        }
        Ok(Some(data))
    }

    fn expiration_policy(&self) -> ExpirationPolicy {
        self.cfg.expiration_policy
    }
}
