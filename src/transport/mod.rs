//! ## Transports for sending emails
//!
//! This module contains `Transport`s for sending emails. A `Transport` implements a high-level API
//! for sending emails. It automatically manages the underlying resources and doesn't require any
//! specific knowledge of email protocols in order to be used.
//!
//! | Module     | Protocol | Description                                                          |
//! | ---------- | -------- | -------------------------------------------------------------------- |
//! | [`smtp`]   | SMTP     | Uses the SMTP protocol to send emails to a relay server              |
//! | [`stub`]   | N/A      | Keeps the emails in memory and returns a preset result, for tests    |

use crate::{Envelope, Message};

pub mod smtp;
pub mod stub;

/// Blocking Transport method for emails
pub trait Transport {
    /// Response produced by the Transport
    type Ok;
    /// Error produced by the Transport
    type Error;

    /// Sends the email
    fn send(&self, message: &Message) -> Result<Self::Ok, Self::Error> {
        let raw = message.formatted();
        self.send_raw(message.envelope(), &raw)
    }

    /// Sends an already formatted email to the envelope recipients
    fn send_raw(&self, envelope: &Envelope, email: &[u8]) -> Result<Self::Ok, Self::Error>;
}
