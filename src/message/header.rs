//! Header values which need encoding before hitting the wire

use std::{
    fmt::{self, Display, Formatter},
    time::SystemTime,
};

use base64::{engine::general_purpose::STANDARD, Engine};
use httpdate::HttpDate;

/// Message `Date` header
///
/// Defined in [RFC2822](https://tools.ietf.org/html/rfc2822#section-3.3)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Date(HttpDate);

impl Date {
    /// Build a `Date` from [`SystemTime`]
    pub fn new(st: SystemTime) -> Self {
        Self(st.into())
    }

    /// Get the current date
    ///
    /// Shortcut for `Date::new(SystemTime::now())`
    pub fn now() -> Self {
        Self::new(SystemTime::now())
    }
}

impl Display for Date {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut s = self.0.to_string();
        if s.ends_with(" GMT") {
            // httpdate always appends ` GMT`, which is an obsolete zone for email
            // https://tools.ietf.org/html/rfc2822#appendix-A.6.2
            s.truncate(s.len() - "GMT".len());
            s.push_str("-0000");
        }
        f.write_str(&s)
    }
}

impl From<SystemTime> for Date {
    fn from(st: SystemTime) -> Self {
        Self::new(st)
    }
}

// https://tools.ietf.org/html/rfc2047
fn allowed_char(c: char) -> bool {
    c == '\t' || (' '..='~').contains(&c)
}

/// Encodes an unstructured header value (like `Subject`) as a UTF-8 encoded-word
/// when it is not printable ASCII
pub(crate) fn encode_text(s: &str) -> String {
    if s.chars().all(allowed_char) {
        s.into()
    } else {
        format!("=?utf-8?b?{}?=", STANDARD.encode(s))
    }
}
