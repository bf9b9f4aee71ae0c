//! Builds the email from a text file
//!
//! ## Usage
//!
//! ```rust,no_run
//! use textmail::message::Message;
//!
//! # use std::error::Error;
//! # fn main() -> Result<(), Box<dyn Error>> {
//! let m = Message::builder()
//!     .from("a@x.com")
//!     .to("b@y.com")
//!     .subject("Hi")
//!     .file("message.txt")?;
//! # Ok(())
//! # }
//! ```
//!
//! Which produces:
//!
//! ```sh
//! Content-Type: multipart/mixed; boundary="OKlWm8G0kZyDOHfFcvXBzaQqB3ATMmbHKFWXKhbq"
//! MIME-Version: 1.0
//! From: a@x.com
//! Subject: Hi
//! To: b@y.com
//! Date: Sat, 12 Dec 2020 16:33:19 -0000
//!
//! --OKlWm8G0kZyDOHfFcvXBzaQqB3ATMmbHKFWXKhbq
//! Content-Type: text/plain; charset="us-ascii"
//! MIME-Version: 1.0
//! Content-Transfer-Encoding: 7bit
//!
//! Hello World
//! --OKlWm8G0kZyDOHfFcvXBzaQqB3ATMmbHKFWXKhbq--
//! ```
//!
//! The unicode subject is encoded using _UTF8-Base64_ encoding, when necessary.
//! The body is sent as `7bit` when it is short-lined ASCII, `base64` otherwise.

use std::{fs, io, path::Path, time::SystemTime};

pub use self::{body::ContentTransferEncoding, error::Error, header::Date};
use self::{body::Body, header::encode_text};
use crate::address::{Envelope, RECIPIENT_SEPARATOR};

mod body;
mod error;
mod header;

const BOUNDARY_LENGTH: usize = 40;

/// Something that can be formatted as an email
pub(crate) trait EmailFormat {
    /// Writes the email to `out`, with CRLF line endings
    fn format(&self, out: &mut Vec<u8>);
}

fn make_boundary() -> String {
    std::iter::repeat_with(fastrand::alphanumeric)
        .take(BOUNDARY_LENGTH)
        .collect()
}

fn push_header(out: &mut Vec<u8>, name: &str, value: &str) {
    out.extend_from_slice(name.as_bytes());
    out.extend_from_slice(b": ");
    out.extend_from_slice(value.as_bytes());
    out.extend_from_slice(b"\r\n");
}

/// A builder for messages
#[derive(Debug, Clone, Default)]
pub struct MessageBuilder {
    from: Option<String>,
    subject: Option<String>,
    to: Vec<String>,
    date: Option<Date>,
    boundary: Option<String>,
}

impl MessageBuilder {
    /// Creates a new default message builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `From` header
    pub fn from<S: Into<String>>(mut self, address: S) -> Self {
        self.from = Some(address.into());
        self
    }

    /// Set `Subject` header
    pub fn subject<S: Into<String>>(mut self, subject: S) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Add a recipient to the `To` header
    pub fn to<S: Into<String>>(mut self, address: S) -> Self {
        self.to.push(address.into());
        self
    }

    /// Set `Date` header
    ///
    /// Defaults to the time the message is built.
    pub fn date(mut self, date: SystemTime) -> Self {
        self.date = Some(date.into());
        self
    }

    /// Set the MIME boundary
    ///
    /// Defaults to 40 random alphanumeric characters.
    pub fn boundary<S: Into<String>>(mut self, boundary: S) -> Self {
        self.boundary = Some(boundary.into());
        self
    }

    /// Reads the body from `path` and creates the message
    ///
    /// The file is checked before the headers, so a missing file is always
    /// reported as [`Error::FileNotFound`].
    pub fn file<P: AsRef<Path>>(self, path: P) -> Result<Message, Error> {
        let body = read_body(path.as_ref())?;
        self.build(body)
    }

    fn build(self, body: String) -> Result<Message, Error> {
        let from = self.from.filter(|f| !f.is_empty()).ok_or(Error::MissingFrom)?;
        check_address(&from)?;
        let subject = self
            .subject
            .filter(|s| !s.is_empty())
            .ok_or(Error::MissingSubject)?;

        if self.to.is_empty() {
            return Err(Error::MissingTo);
        }
        for address in &self.to {
            check_address(address)?;
        }

        let to = self.to.join(RECIPIENT_SEPARATOR);
        let envelope = Envelope::from_header(from.as_str(), &to)?;

        Ok(Message {
            from,
            subject,
            to,
            envelope,
            body,
            date: self.date.unwrap_or_else(Date::now),
            boundary: self.boundary.unwrap_or_else(make_boundary),
        })
    }
}

/// An address must survive the round trip through the `To` header
fn check_address(address: &str) -> Result<(), Error> {
    if address.is_empty()
        || address.contains(RECIPIENT_SEPARATOR)
        || address.contains(['\r', '\n'])
    {
        return Err(Error::InvalidAddress(address.to_owned()));
    }
    Ok(())
}

fn read_body(path: &Path) -> Result<String, Error> {
    let io_error = |source| Error::Io {
        path: path.to_owned(),
        source,
    };

    let metadata = match fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(Error::FileNotFound(path.to_owned()))
        }
        Err(e) => return Err(io_error(e)),
    };
    if metadata.len() == 0 {
        return Err(Error::EmptyFile(path.to_owned()));
    }

    fs::read_to_string(path).map_err(io_error)
}

/// Email message which can be formatted
///
/// Immutable once built: a plain text body attached to a `multipart/mixed` envelope.
#[derive(Clone, Debug)]
pub struct Message {
    from: String,
    subject: String,
    to: String,
    envelope: Envelope,
    body: String,
    date: Date,
    boundary: String,
}

impl Message {
    /// Create a new message builder without headers
    pub fn builder() -> MessageBuilder {
        MessageBuilder::new()
    }

    /// Builds a message from `sender`, `subject`, the text in `path` and `recipients`
    pub fn from_file<P, S>(sender: &str, subject: &str, path: P, recipients: &[S]) -> Result<Message, Error>
    where
        P: AsRef<Path>,
        S: AsRef<str>,
    {
        recipients
            .iter()
            .fold(Self::builder().from(sender).subject(subject), |builder, to| {
                builder.to(to.as_ref())
            })
            .file(path)
    }

    /// The `From` header
    pub fn from(&self) -> &str {
        &self.from
    }

    /// The `Subject` header, as given
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// The `To` header: recipients joined with `", "`
    pub fn to(&self) -> &str {
        &self.to
    }

    /// The recipients, split back out of the `To` header
    pub fn recipients(&self) -> Vec<&str> {
        self.to.split(RECIPIENT_SEPARATOR).collect()
    }

    /// The text body, exactly as read from the file
    pub fn body(&self) -> &str {
        &self.body
    }

    /// The `Date` header
    pub fn date(&self) -> Date {
        self.date
    }

    /// Get `Message` envelope
    ///
    /// Its recipients are the `To` header split on `", "`.
    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    /// Get message content formatted for SMTP
    pub fn formatted(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.format(&mut out);
        out
    }
}

impl EmailFormat for Message {
    fn format(&self, out: &mut Vec<u8>) {
        let body = Body::new(&self.body);

        push_header(
            out,
            "Content-Type",
            &format!("multipart/mixed; boundary=\"{}\"", self.boundary),
        );
        push_header(out, "MIME-Version", "1.0");
        push_header(out, "From", &self.from);
        push_header(out, "Subject", &encode_text(&self.subject));
        push_header(out, "To", &self.to);
        push_header(out, "Date", &self.date.to_string());
        out.extend_from_slice(b"\r\n");

        out.extend_from_slice(format!("--{}\r\n", self.boundary).as_bytes());
        push_header(
            out,
            "Content-Type",
            &format!("text/plain; charset=\"{}\"", body.charset()),
        );
        push_header(out, "MIME-Version", "1.0");
        push_header(out, "Content-Transfer-Encoding", &body.encoding().to_string());
        out.extend_from_slice(b"\r\n");
        out.extend_from_slice(body.as_str().as_bytes());
        out.extend_from_slice(b"\r\n");
        out.extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());
    }
}
