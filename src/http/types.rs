//! Wire-level HTTP vocabulary: methods, versions, and status lines.
//!
//! Status line bytes are generated at compile time with `concat!`, the same
//! macro-driven approach the teacher uses in its own `types.rs`/`errors.rs`
//! for allocation-free constant responses. Per §4.E every response uses the
//! `HTTP/1.1` status line regardless of the request's own version: only the
//! `Connection` header reflects the request's HTTP/1.0-ness.

/// HTTP version as accepted by the request codec (§4.E): exactly
/// `HTTP/1.0` or `HTTP/1.1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Version {
    Http10,
    Http11,
}

impl Version {
    #[inline]
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        match bytes {
            b"HTTP/1.0" => Some(Version::Http10),
            b"HTTP/1.1" => Some(Version::Http11),
            _ => None,
        }
    }

    #[inline(always)]
    pub const fn as_bytes(self) -> &'static [u8] {
        match self {
            Version::Http10 => b"HTTP/1.0",
            Version::Http11 => b"HTTP/1.1",
        }
    }
}

/// Request method. Only `Get`/`Head` are servable; anything else is
/// preserved verbatim so the session loop can reject it with 501.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Head,
    Other,
}

impl Method {
    #[inline]
    pub fn parse(bytes: &[u8]) -> Self {
        match bytes {
            b"GET" => Method::Get,
            b"HEAD" => Method::Head,
            _ => Method::Other,
        }
    }
}

macro_rules! status_codes {
    ($($variant:ident => $code:literal, $reason:literal;)*) => {
        /// Status codes this server ever emits (§6).
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum StatusCode {
            $($variant,)*
        }

        impl StatusCode {
            #[inline(always)]
            pub const fn code(self) -> u16 {
                match self { $(Self::$variant => $code,)* }
            }

            #[inline(always)]
            pub const fn reason(self) -> &'static str {
                match self { $(Self::$variant => $reason,)* }
            }

            /// Pre-built `HTTP/1.1 STATUS REASON\r\n` status line. Always
            /// `HTTP/1.1` regardless of the request's version (§4.E).
            #[inline(always)]
            pub const fn status_line(self) -> &'static [u8] {
                match self { $(
                    Self::$variant => concat!("HTTP/1.1 ", $code, " ", $reason, "\r\n").as_bytes(),
                )* }
            }
        }
    };
}

status_codes! {
    Ok => 200, "OK";
    PartialContent => 206, "Partial Content";
    BadRequest => 400, "Bad Request";
    Forbidden => 403, "Forbidden";
    NotFound => 404, "Not Found";
    RangeNotSatisfiable => 416, "Range Not Satisfiable";
    InternalServerError => 500, "Internal Server Error";
    NotImplemented => 501, "Not Implemented";
    ServiceUnavailable => 503, "Service Unavailable";
}

/// MIME classification by extension only (§4.E); default is
/// `application/octet-stream`.
pub fn mime_type_for(path: &str) -> &'static str {
    let ext = path.rsplit('.').next().unwrap_or("");
    match ext.to_ascii_lowercase().as_str() {
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "js" => "application/javascript",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        _ => "application/octet-stream",
    }
}
