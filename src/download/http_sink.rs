use std::path::{Path, PathBuf};

use futures::StreamExt;
use parking_lot::Mutex;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use super::DownloadSink;
use crate::api::PortalClient;
use crate::domain::{DownloadRequest, Result, SyncError};

/// How many " (n)" suffixes to try before giving up on a free file name.
const MAX_UNIQUIFY: u32 = 100;

/// Streams each requested file to disk on its own tokio task.
pub struct HttpDownloadSink {
    client: PortalClient,
    root: PathBuf,
    in_flight: Mutex<Vec<JoinHandle<Result<PathBuf>>>>,
}

impl HttpDownloadSink {
    pub fn new(client: PortalClient, root: impl Into<PathBuf>) -> Self {
        Self {
            client,
            root: root.into(),
            in_flight: Mutex::new(Vec::new()),
        }
    }

    /// Wait for every download issued so far. Returns (succeeded, failed).
    pub async fn drain(&self) -> (usize, usize) {
        let handles = std::mem::take(&mut *self.in_flight.lock());
        let mut succeeded = 0;
        let mut failed = 0;
        for handle in handles {
            match handle.await {
                Ok(Ok(_)) => succeeded += 1,
                _ => failed += 1,
            }
        }
        (succeeded, failed)
    }

    fn resolve(&self, destination: &str) -> PathBuf {
        destination
            .split('/')
            .filter(|segment| !segment.is_empty() && *segment != "." && *segment != "..")
            .fold(self.root.clone(), |path, segment| path.join(segment))
    }
}

impl DownloadSink for HttpDownloadSink {
    fn download(&self, request: DownloadRequest) {
        let client = self.client.clone();
        let path = self.resolve(&request.destination);
        debug!("Queueing download {} -> {}", request.url, path.display());

        let handle = tokio::spawn(async move {
            let result = fetch_to_file(&client, &request.url, &path).await;
            match &result {
                Ok(saved) => info!("Saved {}", saved.display()),
                Err(e) => error!("Download of {} failed: {}", request.url, e),
            }
            result
        });

        self.in_flight.lock().push(handle);
    }
}

/// Create `path`, or `stem (n).ext` if it is taken, like a browser would.
async fn create_unique(path: &Path) -> Result<(File, PathBuf)> {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = path.extension().map(|e| e.to_string_lossy().into_owned());

    for n in 0..=MAX_UNIQUIFY {
        let candidate = match (n, &extension) {
            (0, _) => path.to_path_buf(),
            (_, Some(ext)) => path.with_file_name(format!("{stem} ({n}).{ext}")),
            (_, None) => path.with_file_name(format!("{stem} ({n})")),
        };
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&candidate)
            .await
        {
            Ok(file) => return Ok((file, candidate)),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e.into()),
        }
    }

    Err(SyncError::Io(format!(
        "no free file name for {}",
        path.display()
    )))
}

async fn fetch_to_file(client: &PortalClient, url: &str, path: &Path) -> Result<PathBuf> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let (total_size, stream) = client.download_file_stream(url).await?;
    let mut stream = stream.boxed();
    let (mut file, saved) = create_unique(path).await?;

    let mut downloaded: u64 = 0;
    while let Some(chunk) = stream.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                drop(file);
                let _ = tokio::fs::remove_file(&saved).await;
                return Err(e.into());
            }
        };
        file.write_all(&chunk).await?;
        downloaded += chunk.len() as u64;
    }
    file.sync_all().await?;

    debug!(
        "Wrote {} of {:?} byte(s) to {}",
        downloaded,
        total_size,
        saved.display()
    );
    Ok(saved)
}
