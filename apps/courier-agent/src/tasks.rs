//! Outbox transfer tasks.
//!
//! Uploads are delivered by copying the payload files into
//! `<outbox>/<upload id>/`. `binary` carries one file (`{"file": path}`),
//! `multipart` carries several (`{"files": [path, ...]}`).

use std::collections::HashSet;
use std::io;
use std::path::{Component, Path, PathBuf};

use courier_upload_service::{
    ErrorDescriptor, StartRequest, TaskContext, TaskError, TaskFactory, TaskFuture, TransferKind,
    UploadTask,
};
use serde::Deserialize;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, info};

/// Response code reported for a delivered upload.
const STORED_RESPONSE_CODE: i32 = 200;

#[derive(Debug, Deserialize)]
struct BinaryConfig {
    file: PathBuf,
}

#[derive(Debug, Deserialize)]
struct MultipartConfig {
    files: Vec<PathBuf>,
}

/// Builds outbox copy tasks from start requests.
#[derive(Debug, Clone)]
pub struct OutboxFactory {
    outbox: PathBuf,
    chunk_size: usize,
}

impl OutboxFactory {
    pub fn new(outbox: impl Into<PathBuf>, chunk_size: usize) -> Self {
        Self {
            outbox: outbox.into(),
            chunk_size: chunk_size.max(1),
        }
    }
}

impl TaskFactory for OutboxFactory {
    fn create(
        &self,
        kind: TransferKind,
        request: &StartRequest,
    ) -> Result<Box<dyn UploadTask>, TaskError> {
        let files = match kind {
            TransferKind::Binary => {
                let config: BinaryConfig = serde_json::from_value(request.task_config.clone())?;
                vec![config.file]
            }
            TransferKind::Multipart => {
                let config: MultipartConfig = serde_json::from_value(request.task_config.clone())?;
                if config.files.is_empty() {
                    return Err(TaskError::InvalidConfig(
                        "multipart upload needs at least one file".into(),
                    ));
                }
                config.files
            }
        };

        if !is_plain_name(&request.upload_id) {
            return Err(TaskError::InvalidConfig(format!(
                "upload id {:?} cannot name an outbox directory",
                request.upload_id
            )));
        }

        let mut names = HashSet::new();
        for file in &files {
            let name = file.file_name().ok_or_else(|| {
                TaskError::InvalidConfig(format!("not a file path: {}", file.display()))
            })?;
            if !names.insert(name.to_os_string()) {
                return Err(TaskError::InvalidConfig(format!(
                    "duplicate file name: {}",
                    file.display()
                )));
            }
        }

        Ok(Box::new(OutboxCopy {
            files,
            dest: self.outbox.join(&request.upload_id),
            chunk_size: self.chunk_size,
        }))
    }
}

/// A single path component, so the upload lands inside the outbox.
fn is_plain_name(id: &str) -> bool {
    let mut components = Path::new(id).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

enum CopyOutcome {
    Stored { files: usize, bytes: u64 },
    Cancelled,
}

/// Copies the payload files into the upload's outbox directory.
struct OutboxCopy {
    files: Vec<PathBuf>,
    dest: PathBuf,
    chunk_size: usize,
}

impl UploadTask for OutboxCopy {
    fn run(self: Box<Self>, ctx: TaskContext) -> TaskFuture {
        Box::pin(async move {
            let mut staged = Vec::new();
            let outcome = self.copy_all(&ctx, &mut staged).await;
            match outcome {
                Ok(CopyOutcome::Stored { files, bytes }) => {
                    info!(upload_id = %ctx.upload_id(), files, bytes, "payload stored");
                    ctx.completed(
                        STORED_RESPONSE_CODE,
                        Some(format!("stored {files} file(s) in {}", self.dest.display())),
                    );
                }
                Ok(CopyOutcome::Cancelled) => {
                    discard(&staged).await;
                    ctx.failed(ErrorDescriptor::cancelled());
                }
                Err(e) => {
                    discard(&staged).await;
                    ctx.failed(e);
                }
            }
        })
    }
}

impl OutboxCopy {
    /// Copies every payload to a staging file next to its final name, then
    /// renames them all. Staging paths created so far are pushed to `staged`.
    async fn copy_all(
        &self,
        ctx: &TaskContext,
        staged: &mut Vec<PathBuf>,
    ) -> io::Result<CopyOutcome> {
        let mut total = 0u64;
        for file in &self.files {
            total += tokio::fs::metadata(file).await?.len();
        }
        tokio::fs::create_dir_all(&self.dest).await?;
        debug!(upload_id = %ctx.upload_id(), total, dest = %self.dest.display(), "copy started");

        let mut sent = 0u64;
        let mut buf = vec![0u8; self.chunk_size];
        let mut finals = Vec::with_capacity(self.files.len());
        for src in &self.files {
            let name = src.file_name().ok_or_else(|| {
                io::Error::new(io::ErrorKind::InvalidInput, "payload path has no file name")
            })?;
            let target = self.dest.join(name);
            let staging = staging_path(&target);

            let mut reader = File::open(src).await?;
            let mut writer = File::create(&staging).await?;
            staged.push(staging.clone());

            loop {
                if ctx.is_cancelled() {
                    return Ok(CopyOutcome::Cancelled);
                }
                let n = reader.read(&mut buf).await?;
                if n == 0 {
                    break;
                }
                writer.write_all(&buf[..n]).await?;
                sent += n as u64;
                if total > 0 {
                    ctx.progress(sent, total);
                }
            }
            writer.flush().await?;
            finals.push((staging, target));
        }

        for (staging, target) in &finals {
            tokio::fs::rename(staging, target).await?;
        }
        staged.clear();

        Ok(CopyOutcome::Stored {
            files: self.files.len(),
            bytes: sent,
        })
    }
}

/// `<dir>/.<name>.part`
fn staging_path(target: &Path) -> PathBuf {
    let mut name = std::ffi::OsString::from(".");
    if let Some(file_name) = target.file_name() {
        name.push(file_name);
    }
    name.push(".part");
    target.with_file_name(name)
}

/// Removes the staging files of a failed run. Earlier deliveries under the
/// same upload ID are left alone.
async fn discard(staged: &[PathBuf]) {
    for path in staged {
        if let Err(e) = tokio::fs::remove_file(path).await {
            if e.kind() != io::ErrorKind::NotFound {
                debug!(path = %path.display(), error = %e, "failed to remove partial upload");
            }
        }
    }
}
