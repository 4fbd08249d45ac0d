//! Disk-backed error page bodies, loaded once at startup (§4.F).
//!
//! Grounded in the original `http.c`'s `send_error_page`, which looks for
//! `./www/<status>.html` relative to the document root and falls back to an
//! inline `<h1>` body. That lookup happens here exactly once per status
//! code so the hot serving path never touches the filesystem for error
//! bodies.

use std::{collections::HashMap, fs, path::Path};

use crate::http::types::StatusCode;

const MAX_TEMPLATE_SIZE: u64 = 100 * 1024;

const ERROR_STATUSES: [StatusCode; 7] = [
    StatusCode::BadRequest,
    StatusCode::Forbidden,
    StatusCode::NotFound,
    StatusCode::RangeNotSatisfiable,
    StatusCode::InternalServerError,
    StatusCode::NotImplemented,
    StatusCode::ServiceUnavailable,
];

/// Holds one body per error status, read (or synthesized) once and kept for
/// the server's lifetime.
pub struct ErrorPages {
    pages: HashMap<u16, Vec<u8>>,
}

impl ErrorPages {
    /// `doc_root` is the default document root; templates are read from
    /// `<doc_root>/../www/<status>.html`.
    pub fn load(doc_root: &Path) -> Self {
        let www_dir = doc_root
            .parent()
            .map(|parent| parent.join("www"))
            .unwrap_or_else(|| Path::new("www").to_path_buf());

        let pages = ERROR_STATUSES
            .into_iter()
            .map(|status| (status.code(), Self::load_one(&www_dir, status)))
            .collect();

        Self { pages }
    }

    fn load_one(www_dir: &Path, status: StatusCode) -> Vec<u8> {
        let path = www_dir.join(format!("{}.html", status.code()));
        match fs::metadata(&path) {
            Ok(meta) if meta.len() <= MAX_TEMPLATE_SIZE => {
                fs::read(&path).unwrap_or_else(|_| fallback_body(status))
            }
            _ => fallback_body(status),
        }
    }

    /// Never fails: every status listed in [`ERROR_STATUSES`] was resolved
    /// at construction, synthesizing a body if nothing was found on disk.
    pub fn get(&self, status: StatusCode) -> &[u8] {
        self.pages
            .get(&status.code())
            .map(Vec::as_slice)
            .unwrap_or(b"")
    }
}

fn fallback_body(status: StatusCode) -> Vec<u8> {
    format!("<h1>{}</h1>", status.reason()).into_bytes()
}
