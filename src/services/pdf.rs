use std::path::Path;

use lopdf::Document;
use tracing::warn;

/// Result of inspecting a staged document without a credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// The document opens cleanly and can be committed as-is.
    Open,
    /// The document is valid but requires a password to open.
    PasswordRequired,
    /// The document is corrupt or not a conforming PDF.
    Malformed,
}

/// Result of one password trial against a protected document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrialOutcome {
    /// The password opened the document and the decrypted copy was written.
    Decrypted,
    /// The document rejected this password.
    WrongPassword,
    /// The document broke in a way unrelated to the password.
    Malformed,
}

/// Seam between the intake pipeline and the PDF library, so the pipeline
/// can be exercised with a scripted codec in tests.
pub trait DocumentCodec: Send + Sync {
    fn classify(&self, path: &Path) -> Classification;

    /// Attempt to open `src` with `password`. On success the decrypted
    /// document is written to `dest`; `src` is left untouched either way.
    fn decrypt(&self, src: &Path, dest: &Path, password: &str) -> TrialOutcome;
}

/// `lopdf`-backed codec used in production.
pub struct LopdfCodec;

impl DocumentCodec for LopdfCodec {
    fn classify(&self, path: &Path) -> Classification {
        match Document::load(path) {
            Ok(doc) => {
                if doc.trailer.get(b"Encrypt").is_ok() {
                    Classification::PasswordRequired
                } else {
                    Classification::Open
                }
            }
            Err(e) => {
                let msg = e.to_string().to_lowercase();
                if msg.contains("password") || msg.contains("encrypt") {
                    Classification::PasswordRequired
                } else {
                    warn!("Failed to parse {}: {}", path.display(), e);
                    Classification::Malformed
                }
            }
        }
    }

    fn decrypt(&self, src: &Path, dest: &Path, password: &str) -> TrialOutcome {
        // Authentication has to happen at load time: a plain load of a
        // protected document skips object parsing entirely, so anything
        // saved from it would be hollow.
        let mut doc = match Document::load_with_password(src, password) {
            Ok(doc) => doc,
            Err(e) => return trial_failure(src, &e.to_string()),
        };

        // Drop the encryption dictionary so the saved copy is a plain
        // document rather than one re-flagged as protected.
        doc.trailer.remove(b"Encrypt");

        match doc.save(dest) {
            Ok(_) => TrialOutcome::Decrypted,
            Err(e) => {
                warn!("Failed to write decrypted copy {}: {}", dest.display(), e);
                TrialOutcome::Malformed
            }
        }
    }
}

fn trial_failure(src: &Path, msg: &str) -> TrialOutcome {
    if msg.to_lowercase().contains("password") {
        TrialOutcome::WrongPassword
    } else {
        warn!("Document {} failed during a password trial: {}", src.display(), msg);
        TrialOutcome::Malformed
    }
}
