//! The SMTP transport sends emails using the SMTP protocol.
//!
//! This SMTP client follows [RFC 5321](https://tools.ietf.org/html/rfc5321)
//! and submits one message per connection to a relay server.
//!
//! It implements the following extensions:
//!
//! * STARTTLS ([RFC 2487](http://tools.ietf.org/html/rfc2487)), required by default
//! * AUTH ([RFC 4954](http://tools.ietf.org/html/rfc4954)) with PLAIN and LOGIN mechanisms
//! * SIZE ([RFC 1870](https://tools.ietf.org/html/rfc1870))
//! * SMTPUTF8 ([RFC 6531](https://tools.ietf.org/html/rfc6531))
//!
//! Each step of the dialogue fails with its own [`Kind`](error::Kind), so
//! callers can tell a refused sender from refused credentials.
//!
//! #### Example
//!
//! ```rust,no_run
//! # use std::error::Error;
//! # fn main() -> Result<(), Box<dyn Error>> {
//! use textmail::{
//!     transport::smtp::authentication::Credentials, Message, SmtpTransport, Transport,
//! };
//!
//! let email = Message::from_file("nobody@domain.tld", "Happy new year", "note.txt", &["hei@domain.tld"])?;
//!
//! // STARTTLS on the submission port, then AUTH
//! let mailer = SmtpTransport::starttls_relay("smtp.example.com")?
//!     .credentials(Credentials::new("username".to_owned(), "password".to_owned()))
//!     .build();
//!
//! match mailer.send(&email) {
//!     Ok(_) => println!("Email sent successfully!"),
//!     Err(e) if e.is_recipients_refused() => println!("Nobody will get it"),
//!     Err(e) => println!("Could not send email: {e}"),
//! }
//! # Ok(())
//! # }
//! ```

use std::{
    fmt::{self, Debug},
    time::Duration,
};

use self::authentication::DEFAULT_MECHANISMS;
pub use self::{
    client::{Certificate, Delivery, SmtpConnection, TlsParameters, TlsParametersBuilder},
    error::Error,
    transport::{SmtpTransport, SmtpTransportBuilder},
};
use crate::transport::smtp::{
    authentication::{Credentials, Mechanism},
    extension::ClientId,
};

pub mod authentication;
pub mod client;
pub mod commands;
pub mod error;
pub mod extension;
pub mod response;
mod transport;

// Registered port numbers:
// https://www.iana.org/assignments/service-names-port-numbers/service-names-port-numbers.xhtml

/// Default submission port
pub const SUBMISSION_PORT: u16 = 587;

/// Relay used when none is given
pub const DEFAULT_SERVER: &str = "smtp.gmail.com";

/// How to apply TLS to a client connection
#[derive(Clone)]
pub enum Tls {
    /// Insecure connection only
    ///
    /// Only meant for trusted local relays and tests.
    None,
    /// Start with insecure connection and require `STARTTLS`
    Required(TlsParameters),
}

impl Debug for Tls {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self {
            Self::None => f.pad("None"),
            Self::Required(_) => f.pad("Required"),
        }
    }
}

#[derive(Clone, Debug)]
struct SmtpInfo {
    /// Name sent during EHLO
    hello_name: ClientId,
    /// Server we are connecting to
    server: String,
    /// Port to connect to
    port: u16,
    /// TLS security configuration
    tls: Tls,
    /// Accepted authentication mechanisms, in order of preference
    authentication: Vec<Mechanism>,
    /// Credentials
    credentials: Option<Credentials>,
    /// Define network timeout
    timeout: Option<Duration>,
}

impl Default for SmtpInfo {
    fn default() -> Self {
        Self {
            server: DEFAULT_SERVER.to_owned(),
            port: SUBMISSION_PORT,
            hello_name: ClientId::default(),
            credentials: None,
            authentication: DEFAULT_MECHANISMS.into(),
            timeout: None,
            tls: Tls::None,
        }
    }
}
