//! Serialized, size-rotated access logger (§4.J).
//!
//! Grounded in the original `logger.c`: an append-mode file descriptor (no
//! user-space buffering), a single mutex serializing writes, and a
//! size-check-then-rotate-to-`.old` step before any write that would push
//! the file over the threshold.

use std::{
    fs::{self, File, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
    sync::Mutex,
};

use crate::{
    clock::clf_date_now,
    http::types::{StatusCode, Version},
};

const ROTATE_AT_BYTES: u64 = 10 * 1024 * 1024;

/// Appends one Combined-Log-Format-ish line per request, serialized under
/// a single lock so two in-flight writers never interleave.
pub struct Logger {
    path: PathBuf,
    file: Mutex<File>,
}

impl Logger {
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(file),
        })
    }

    /// Appends one access-log line. `host` is `-` when unknown, matching
    /// the Combined Log Format convention for absent fields.
    pub fn log_request(
        &self,
        method_token: &str,
        path: &str,
        version: Version,
        status: StatusCode,
        bytes: u64,
    ) {
        let line = format!(
            "- - - [{}] \"{} {} {}\" {} {} \"-\" \"-\"\n",
            clf_date_now(),
            method_token,
            path,
            std::str::from_utf8(version.as_bytes()).unwrap_or("HTTP/1.1"),
            status.code(),
            bytes,
        );

        let Ok(mut file) = self.file.lock() else {
            return;
        };

        if let Err(e) = self.rotate_if_needed(&mut file) {
            tracing::warn!(error = %e, "access log rotation failed");
        }

        if let Err(e) = file.write_all(line.as_bytes()) {
            tracing::warn!(error = %e, "access log write failed");
        }
    }

    fn rotate_if_needed(&self, file: &mut File) -> io::Result<()> {
        let size = file.metadata()?.len();
        if size < ROTATE_AT_BYTES {
            return Ok(());
        }

        let rotated = self.path.with_extension("log.old");
        if rotated.exists() {
            fs::remove_file(&rotated)?;
        }
        fs::rename(&self.path, &rotated)?;

        *file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        Ok(())
    }
}
