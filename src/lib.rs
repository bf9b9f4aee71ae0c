//! Send a plain-text file as an email over SMTP.
//!
//! The crate has two halves:
//!
//! * [`message`] reads the body from a text file and builds an immutable
//!   [`Message`] with `From`, `Subject` and `To` headers.
//! * [`transport::smtp`] delivers it: greeting, `STARTTLS`, greeting again,
//!   optional `AUTH`, then `MAIL`/`RCPT`/`DATA` and `QUIT`.
//!
//! The [`cli`] module glues both together for the `textmail` binary.
//!
//! ```rust,no_run
//! use textmail::{transport::smtp::authentication::Credentials, Message, SmtpTransport, Transport};
//!
//! let email = Message::from_file("a@x.com", "Hi", "message.txt", &["b@y.com"]).unwrap();
//!
//! let mailer = SmtpTransport::starttls_relay("smtp.gmail.com")
//!     .unwrap()
//!     .credentials(Credentials::new("user".to_owned(), "password".to_owned()))
//!     .build();
//!
//! match mailer.send(&email) {
//!     Ok(_) => println!("Email sent successfully!"),
//!     Err(e) => eprintln!("Could not send email: {e}"),
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(
    missing_copy_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unstable_features,
    unused_import_braces,
    missing_debug_implementations,
    missing_docs,
    unreachable_pub
)]

pub mod address;
pub mod cli;
pub mod message;
pub mod transport;

pub use crate::{
    address::Envelope,
    message::Message,
    transport::{
        smtp::{SmtpTransport, DEFAULT_SERVER, SUBMISSION_PORT},
        Transport,
    },
};

pub(crate) type BoxError = Box<dyn std::error::Error + Send + Sync>;
