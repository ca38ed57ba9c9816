use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWriteExt};
use tracing::{info, warn};

use crate::services::keyring::Keyring;
use crate::services::pdf::{Classification, DocumentCodec, TrialOutcome};
use crate::utils::keyed_mutex::KeyedMutex;

/// Terminal classification of one upload; drives the reply sent back to the
/// sender. Each upload reaches exactly one of these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Committed under its final name without needing a password.
    Stored { filename: String },
    /// Decrypted with the named keyring entry, then committed.
    Decrypted { password_name: String },
    /// Every keyring entry was rejected; nothing was committed.
    UnknownPassword,
    /// Corrupt or non-conforming document; nothing was committed.
    Malformed,
    /// Staging or commit I/O failed; nothing was committed.
    Failed,
    /// Non-document message from an authorized sender.
    Ignored,
}

/// The intake pipeline: stage → classify → (password trials) → commit.
///
/// All paths live under one destination directory. An upload named
/// `report.pdf` is staged at `._report.pdf`, decrypted (if needed) via the
/// side path `._report.pdf.out`, and committed by an atomic rename to
/// `report.pdf`. The `._` marker keeps staging names out of the final
/// namespace. Temporary files are removed on every non-committed outcome.
pub struct IntakeService {
    dest_dir: PathBuf,
    keyring: Keyring,
    codec: Arc<dyn DocumentCodec>,
    filename_locks: KeyedMutex,
}

impl IntakeService {
    pub fn new(dest_dir: PathBuf, keyring: Keyring, codec: Arc<dyn DocumentCodec>) -> Self {
        Self {
            dest_dir,
            keyring,
            codec,
            filename_locks: KeyedMutex::new(),
        }
    }

    pub fn staging_path(&self, filename: &str) -> PathBuf {
        self.dest_dir.join(format!("._{filename}"))
    }

    fn side_path(&self, filename: &str) -> PathBuf {
        self.dest_dir.join(format!("._{filename}.out"))
    }

    pub fn final_path(&self, filename: &str) -> PathBuf {
        self.dest_dir.join(filename)
    }

    /// Run one upload through the pipeline. Never returns an error: every
    /// failure is contained to this upload and folded into its `Outcome`.
    pub async fn process<R>(&self, filename: &str, reader: R) -> Outcome
    where
        R: AsyncRead + Unpin + Send,
    {
        if !valid_filename(filename) {
            warn!("Rejecting upload with unsafe filename {:?}", filename);
            return Outcome::Failed;
        }

        // Uploads sharing a final filename serialize here; distinct
        // filenames proceed in parallel.
        let _guard = self.filename_locks.lock(filename).await;

        let staged = self.staging_path(filename);
        if let Err(e) = self.stage(&staged, reader).await {
            warn!("Failed to stage {}: {}", filename, e);
            self.cleanup(filename).await;
            return Outcome::Failed;
        }

        let outcome = self.process_staged(filename, &staged).await;
        if !matches!(outcome, Outcome::Stored { .. } | Outcome::Decrypted { .. }) {
            self.cleanup(filename).await;
        }
        outcome
    }

    /// Fully materialize the upload's bytes at the staging path before any
    /// inspection happens.
    async fn stage<R>(&self, staged: &Path, mut reader: R) -> std::io::Result<()>
    where
        R: AsyncRead + Unpin + Send,
    {
        let mut file = tokio::fs::File::create(staged).await?;
        let written = tokio::io::copy(&mut reader, &mut file).await?;
        file.flush().await?;
        info!("📥 Staged {} ({} bytes)", staged.display(), written);
        Ok(())
    }

    async fn process_staged(&self, filename: &str, staged: &Path) -> Outcome {
        match self.classify(staged).await {
            Classification::Open => match self.commit(staged, filename).await {
                Ok(()) => Outcome::Stored {
                    filename: filename.to_string(),
                },
                Err(e) => {
                    warn!("Failed to commit {}: {}", filename, e);
                    Outcome::Failed
                }
            },
            Classification::PasswordRequired => self.try_decrypt(filename, staged).await,
            Classification::Malformed => {
                warn!("Rejecting malformed document {}", filename);
                Outcome::Malformed
            }
        }
    }

    async fn classify(&self, staged: &Path) -> Classification {
        let codec = Arc::clone(&self.codec);
        let path = staged.to_path_buf();
        match tokio::task::spawn_blocking(move || codec.classify(&path)).await {
            Ok(classification) => classification,
            Err(e) => {
                warn!("Classification task failed for {}: {}", staged.display(), e);
                Classification::Malformed
            }
        }
    }

    /// Try keyring entries strictly in configuration order. The first entry
    /// that opens the document wins: its decrypted copy atomically replaces
    /// the staged file, which is then committed. Exhausting the keyring
    /// commits nothing.
    async fn try_decrypt(&self, filename: &str, staged: &Path) -> Outcome {
        let side = self.side_path(filename);
        for entry in self.keyring.iter() {
            let codec = Arc::clone(&self.codec);
            let src = staged.to_path_buf();
            let dest = side.clone();
            let password = entry.value.clone();
            let trial =
                match tokio::task::spawn_blocking(move || codec.decrypt(&src, &dest, &password))
                    .await
                {
                    Ok(trial) => trial,
                    Err(e) => {
                        warn!("Password trial task failed for {}: {}", filename, e);
                        return Outcome::Failed;
                    }
                };

            match trial {
                TrialOutcome::Decrypted => {
                    info!("🔓 Decrypted {} with the '{}' password", filename, entry.name);
                    if let Err(e) = tokio::fs::rename(&side, staged).await {
                        warn!("Failed to swap in decrypted copy of {}: {}", filename, e);
                        return Outcome::Failed;
                    }
                    return match self.commit(staged, filename).await {
                        Ok(()) => Outcome::Decrypted {
                            password_name: entry.name.clone(),
                        },
                        Err(e) => {
                            warn!("Failed to commit {}: {}", filename, e);
                            Outcome::Failed
                        }
                    };
                }
                TrialOutcome::WrongPassword => continue,
                TrialOutcome::Malformed => return Outcome::Malformed,
            }
        }
        info!("🔒 No keyring entry opened {}", filename);
        Outcome::UnknownPassword
    }

    /// Atomic rename from the staging path to the final name, overwriting an
    /// earlier file of the same name. Readers of the destination directory
    /// only ever see the final name fully written.
    async fn commit(&self, staged: &Path, filename: &str) -> std::io::Result<()> {
        let final_path = self.final_path(filename);
        tokio::fs::rename(staged, &final_path).await?;
        info!("📦 Committed {}", final_path.display());
        Ok(())
    }

    /// Remove the staging and side files left behind by a non-committed
    /// outcome.
    async fn cleanup(&self, filename: &str) {
        for path in [self.staging_path(filename), self.side_path(filename)] {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => info!("🧹 Removed {}", path.display()),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => warn!("Failed to remove {}: {}", path.display(), e),
            }
        }
    }
}

/// The filename becomes a path component under the destination directory,
/// and its staging name carries the `._` marker. Reject anything that would
/// escape the directory or collide with the marker namespace.
fn valid_filename(filename: &str) -> bool {
    !filename.is_empty()
        && !filename.contains(['/', '\\'])
        && filename != "."
        && filename != ".."
        && !filename.starts_with("._")
}
