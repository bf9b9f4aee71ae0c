//! Error and result type for SMTP clients

use std::{error::Error as StdError, fmt};

use crate::{
    transport::smtp::response::{Code, Response},
    BoxError,
};

// Inspired by https://github.com/seanmonstar/reqwest/blob/a8566383168c0ef06c21f38cbc9213af6ff6db31/src/error.rs

/// The Errors that may occur when sending an email over SMTP
pub struct Error {
    inner: Box<Inner>,
}

struct Inner {
    kind: Kind,
    code: Option<Code>,
    source: Option<BoxError>,
}

/// Step of the SMTP dialogue that failed
///
/// Each kind is reported on its own by the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    /// The server rejected the banner, `EHLO` and `HELO`
    Greeting,
    /// The server refused the credentials
    Authentication,
    /// The server refused every recipient, no mail was sent
    RecipientsRefused,
    /// The server refused the sender address
    SenderRefused,
    /// Unexpected reply to `DATA` or to the message content
    Data,
    /// Any other protocol failure: missing extension, no usable
    /// authentication mechanism, malformed or truncated reply
    Protocol,
    /// Connection, TLS or socket i/o error
    Connection,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Kind::Greeting => "greeting error",
            Kind::Authentication => "authentication error",
            Kind::RecipientsRefused => "all recipients refused",
            Kind::SenderRefused => "sender refused",
            Kind::Data => "data error",
            Kind::Protocol => "protocol error",
            Kind::Connection => "connection error",
        })
    }
}

impl Error {
    pub(crate) fn new<E>(kind: Kind, code: Option<Code>, source: Option<E>) -> Error
    where
        E: Into<BoxError>,
    {
        Error {
            inner: Box::new(Inner {
                kind,
                code,
                source: source.map(Into::into),
            }),
        }
    }

    /// The step of the dialogue that failed
    pub fn kind(&self) -> Kind {
        self.inner.kind
    }

    /// Returns true if the server rejected the greeting
    pub fn is_greeting(&self) -> bool {
        matches!(self.inner.kind, Kind::Greeting)
    }

    /// Returns true if the server refused the credentials
    pub fn is_authentication(&self) -> bool {
        matches!(self.inner.kind, Kind::Authentication)
    }

    /// Returns true if every recipient was refused
    pub fn is_recipients_refused(&self) -> bool {
        matches!(self.inner.kind, Kind::RecipientsRefused)
    }

    /// Returns true if the sender was refused
    pub fn is_sender_refused(&self) -> bool {
        matches!(self.inner.kind, Kind::SenderRefused)
    }

    /// Returns true if the message transfer got an unexpected reply
    pub fn is_data(&self) -> bool {
        matches!(self.inner.kind, Kind::Data)
    }

    /// Returns true for any other protocol failure
    pub fn is_protocol(&self) -> bool {
        matches!(self.inner.kind, Kind::Protocol)
    }

    /// Returns true if the error is from the network or TLS
    pub fn is_connection(&self) -> bool {
        matches!(self.inner.kind, Kind::Connection)
    }

    /// Returns true if the error is caused by a timeout
    pub fn is_timeout(&self) -> bool {
        let mut source = self.source();

        while let Some(err) = source {
            if let Some(io_err) = err.downcast_ref::<std::io::Error>() {
                return matches!(
                    io_err.kind(),
                    std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock
                );
            }

            source = err.source();
        }

        false
    }

    /// Returns the status code, if the error was generated from a response.
    pub fn status(&self) -> Option<Code> {
        self.inner.code
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut builder = f.debug_struct("textmail::transport::smtp::Error");

        builder.field("kind", &self.inner.kind);

        if let Some(ref code) = self.inner.code {
            builder.field("code", code);
        }

        if let Some(ref source) = self.inner.source {
            builder.field("source", source);
        }

        builder.finish()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner.kind)?;

        if let Some(ref code) = self.inner.code {
            write!(f, " ({code})")?;
        }

        if let Some(ref e) = self.inner.source {
            write!(f, ": {e}")?;
        }

        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.inner.source.as_ref().map(|e| {
            let r: &(dyn std::error::Error + 'static) = &**e;
            r
        })
    }
}

/// Error for a negative reply received during the given step
pub(crate) fn refused(kind: Kind, response: &Response) -> Error {
    let text: Vec<&str> = response.message().collect();
    Error::new(kind, Some(response.code()), Some(text.join("\n")))
}

pub(crate) fn protocol<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Protocol, None, Some(e))
}

pub(crate) fn connection<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Connection, None, Some(e))
}

pub(crate) fn stub(kind: Kind) -> Error {
    Error::new(kind, None, None::<BoxError>)
}
