//! The stub transport keeps the message envelope and content in memory and returns a
//! preset result. It is useful for testing purposes.
//!
//! ```rust
//! # use std::fs;
//! use textmail::{transport::stub::StubTransport, Message, Transport};
//!
//! # let file = tempfile::NamedTempFile::new().unwrap();
//! # fs::write(file.path(), "Hello World").unwrap();
//! let email = Message::from_file("a@x.com", "Hi", file.path(), &["b@y.com"]).unwrap();
//!
//! let sender = StubTransport::new_ok();
//! sender.send(&email).unwrap();
//! assert_eq!(sender.messages()[0].0.to(), ["b@y.com"]);
//! ```

use std::sync::{Arc, Mutex, PoisonError};

use crate::{
    transport::smtp::error::{self, Kind},
    Envelope, Transport,
};

/// This transport records the sent messages and returns the given response
#[derive(Debug, Clone)]
pub struct StubTransport {
    response: Result<(), Kind>,
    message_log: Arc<Mutex<Vec<(Envelope, String)>>>,
}

impl StubTransport {
    /// Creates a new transport that always returns the given response
    ///
    /// `Err(kind)` makes every send fail with an SMTP error of that kind.
    pub fn new(response: Result<(), Kind>) -> StubTransport {
        StubTransport {
            response,
            message_log: Arc::new(Mutex::new(vec![])),
        }
    }

    /// Creates a new transport that always returns a success response
    pub fn new_ok() -> StubTransport {
        Self::new(Ok(()))
    }

    /// Creates a new transport that always fails with the given kind
    pub fn new_error(kind: Kind) -> StubTransport {
        Self::new(Err(kind))
    }

    /// Return all logged messages sent using [`Transport::send_raw`]
    pub fn messages(&self) -> Vec<(Envelope, String)> {
        self.message_log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Transport for StubTransport {
    type Ok = ();
    type Error = error::Error;

    fn send_raw(&self, envelope: &Envelope, email: &[u8]) -> Result<Self::Ok, Self::Error> {
        self.message_log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((envelope.clone(), String::from_utf8_lossy(email).into()));
        self.response.map_err(error::stub)
    }
}
