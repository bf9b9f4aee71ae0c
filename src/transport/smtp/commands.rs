//! SMTP commands

use std::fmt::{self, Display, Formatter};

use base64::{engine::general_purpose::STANDARD, Engine};

use crate::transport::smtp::{
    authentication::{Credentials, Mechanism},
    error::{self, Error},
    extension::{ClientId, MailParameter},
    response::Response,
};

/// EHLO command
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Ehlo {
    client_id: ClientId,
}

impl Display for Ehlo {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        #[allow(clippy::write_with_newline)]
        write!(f, "EHLO {}\r\n", self.client_id)
    }
}

impl Ehlo {
    /// Creates a EHLO command
    pub fn new(client_id: ClientId) -> Ehlo {
        Ehlo { client_id }
    }
}

/// HELO command, sent when the server refuses `EHLO`
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Helo {
    client_id: ClientId,
}

impl Display for Helo {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        #[allow(clippy::write_with_newline)]
        write!(f, "HELO {}\r\n", self.client_id)
    }
}

impl Helo {
    /// Creates a HELO command
    pub fn new(client_id: ClientId) -> Helo {
        Helo { client_id }
    }
}

/// STARTTLS command
#[derive(PartialEq, Eq, Clone, Debug, Copy)]
pub struct Starttls;

impl Display for Starttls {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("STARTTLS\r\n")
    }
}

/// MAIL command
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Mail {
    sender: String,
    parameters: Vec<MailParameter>,
}

impl Display for Mail {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "MAIL FROM:<{}>", self.sender)?;
        for parameter in &self.parameters {
            write!(f, " {parameter}")?;
        }
        f.write_str("\r\n")
    }
}

impl Mail {
    /// Creates a MAIL command
    pub fn new<S: Into<String>>(sender: S, parameters: Vec<MailParameter>) -> Mail {
        Mail {
            sender: sender.into(),
            parameters,
        }
    }
}

/// RCPT command
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Rcpt {
    recipient: String,
}

impl Display for Rcpt {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        #[allow(clippy::write_with_newline)]
        write!(f, "RCPT TO:<{}>\r\n", self.recipient)
    }
}

impl Rcpt {
    /// Creates an RCPT command
    pub fn new<S: Into<String>>(recipient: S) -> Rcpt {
        Rcpt {
            recipient: recipient.into(),
        }
    }
}

/// DATA command
#[derive(PartialEq, Eq, Clone, Debug, Copy)]
pub struct Data;

impl Display for Data {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("DATA\r\n")
    }
}

/// QUIT command
#[derive(PartialEq, Eq, Clone, Debug, Copy)]
pub struct Quit;

impl Display for Quit {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("QUIT\r\n")
    }
}

/// RSET command
#[derive(PartialEq, Eq, Clone, Debug, Copy)]
pub struct Rset;

impl Display for Rset {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("RSET\r\n")
    }
}

/// AUTH command
///
/// For `LOGIN`, each answer to a challenge is an `Auth` too, written as
/// the bare base64 line.
#[derive(PartialEq, Eq, Clone)]
pub struct Auth {
    mechanism: Mechanism,
    response: Option<String>,
}

impl Display for Auth {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let encoded_response = self.response.as_ref().map(|r| STANDARD.encode(r));

        match encoded_response {
            Some(response) if self.mechanism.supports_initial_response() => {
                write!(f, "AUTH {} {}", self.mechanism, response)?;
            }
            Some(response) => f.write_str(&response)?,
            None => write!(f, "AUTH {}", self.mechanism)?,
        }
        f.write_str("\r\n")
    }
}

impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Auth")
            .field("mechanism", &self.mechanism)
            .finish_non_exhaustive()
    }
}

impl Auth {
    /// Creates the initial AUTH command
    pub fn new(mechanism: Mechanism, credentials: &Credentials) -> Result<Auth, Error> {
        let response = if mechanism.supports_initial_response() {
            Some(mechanism.response(credentials, None)?)
        } else {
            None
        };
        Ok(Auth {
            mechanism,
            response,
        })
    }

    /// Creates the answer to a server challenge, which needs to be a
    /// `334` reply carrying a base64 word
    pub fn new_from_response(
        mechanism: Mechanism,
        credentials: &Credentials,
        response: &Response,
    ) -> Result<Auth, Error> {
        if !response.has_code(334) {
            return Err(error::protocol("expecting a challenge"));
        }

        let encoded_challenge = response
            .first_word()
            .ok_or_else(|| error::protocol("could not read auth challenge"))?;
        #[cfg(feature = "tracing")]
        tracing::debug!("auth encoded challenge: {}", encoded_challenge);

        let decoded_challenge = STANDARD
            .decode(encoded_challenge)
            .map_err(error::protocol)?;
        let decoded_challenge = String::from_utf8(decoded_challenge).map_err(error::protocol)?;
        #[cfg(feature = "tracing")]
        tracing::debug!("auth decoded challenge: {}", decoded_challenge);

        let response = Some(mechanism.response(credentials, Some(decoded_challenge.as_ref()))?);

        Ok(Auth {
            mechanism,
            response,
        })
    }

    /// The line to log in place of the command, without any secret
    pub fn redacted(&self) -> String {
        if self.mechanism.supports_initial_response() || self.response.is_none() {
            format!("AUTH {} ***", self.mechanism)
        } else {
            "***".to_owned()
        }
    }
}
