//! SMTP client
//!
//! `SmtpConnection` allows manually sending SMTP commands.
//!
//! ```rust,no_run
//! # use std::error::Error;
//! # fn main() -> Result<(), Box<dyn Error>> {
//! use textmail::transport::smtp::{
//!     client::SmtpConnection, commands::*, extension::ClientId, SUBMISSION_PORT,
//! };
//!
//! let hello = ClientId::Domain("my_hostname".to_owned());
//! let mut client = SmtpConnection::connect(("localhost", SUBMISSION_PORT), None, &hello)?;
//! client.command(Mail::new("user@example.com", vec![]))?;
//! client.command(Rcpt::new("user@example.org"))?;
//! client.command(Data)?;
//! client.message("Test email".as_bytes())?;
//! client.quit()?;
//! # Ok(())
//! # }
//! ```

#[cfg(feature = "tracing")]
use std::borrow::Cow;

pub use self::{
    connection::{Delivery, SmtpConnection},
    net::{Certificate, NetworkStream, TlsParameters, TlsParametersBuilder},
};

mod connection;
mod net;

/// The codec used for transparency
///
/// Lines starting with a `.` get an extra one. The codec starts as if a
/// line had just ended, so a leading `.` is escaped too.
#[derive(Clone, Copy, Debug)]
pub struct ClientCodec {
    escape_count: u8,
}

impl Default for ClientCodec {
    fn default() -> Self {
        ClientCodec { escape_count: 2 }
    }
}

impl ClientCodec {
    /// Creates a new client codec
    pub fn new() -> Self {
        ClientCodec::default()
    }

    /// Adds transparency
    pub fn encode(&mut self, frame: &[u8], buf: &mut Vec<u8>) {
        let mut start = 0;
        for (idx, byte) in frame.iter().enumerate() {
            self.escape_count = match (self.escape_count, *byte) {
                (_, b'\r') => 1,
                (1, b'\n') => 2,
                (2, b'.') => 3,
                _ => 0,
            };
            if self.escape_count == 3 {
                self.escape_count = 0;
                buf.extend_from_slice(&frame[start..idx]);
                buf.push(b'.');
                start = idx;
            }
        }
        buf.extend_from_slice(&frame[start..]);
    }

    /// Writes the end of data marker, preceded by a line break unless the
    /// content already ended with one
    pub fn terminate(&mut self, buf: &mut Vec<u8>) {
        if self.escape_count == 2 {
            buf.extend_from_slice(b".\r\n");
        } else {
            buf.extend_from_slice(b"\r\n.\r\n");
        }
        self.escape_count = 2;
    }
}

/// Returns the string replacing all the CRLF with "\<CRLF\>"
/// Used for debug displays
#[cfg(feature = "tracing")]
pub(super) fn escape_crlf(string: &str) -> Cow<'_, str> {
    if string.contains("\r\n") {
        Cow::Owned(string.replace("\r\n", "<CRLF>"))
    } else {
        Cow::Borrowed(string)
    }
}
