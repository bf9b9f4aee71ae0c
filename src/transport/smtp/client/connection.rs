use std::{
    fmt::Display,
    io::{self, BufRead, BufReader, Write},
    net::{Shutdown, ToSocketAddrs},
    time::Duration,
};

#[cfg(feature = "tracing")]
use super::escape_crlf;
use super::{ClientCodec, NetworkStream, TlsParameters};
use crate::{
    address::Envelope,
    transport::smtp::{
        authentication::{Credentials, Mechanism},
        commands::{Auth, Data, Ehlo, Helo, Mail, Quit, Rcpt, Rset, Starttls},
        error::{self, Error, Kind},
        extension::{ClientId, Extension, MailParameter, ServerInfo},
        response::{parse_response, Response, Severity},
    },
};

/// Maximum number of `334` challenges answered during `AUTH`
const MAX_CHALLENGES: usize = 10;

/// Outcome of a successful transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    response: Response,
    refused: Vec<String>,
}

impl Delivery {
    /// The server reply to the message content
    pub fn response(&self) -> &Response {
        &self.response
    }

    /// Recipients the server refused while accepting at least one other
    pub fn refused(&self) -> &[String] {
        &self.refused
    }
}

/// Structure that implements the SMTP client
///
/// The socket is shut down when the connection is dropped.
#[derive(Debug)]
pub struct SmtpConnection {
    /// TCP stream between client and server
    stream: BufReader<NetworkStream>,
    /// Set when the stream can't be trusted anymore
    broken: bool,
    /// Information about the server
    server_info: ServerInfo,
}

impl SmtpConnection {
    /// Get information about the server
    pub fn server_info(&self) -> &ServerInfo {
        &self.server_info
    }

    /// Connects to the configured server
    ///
    /// Reads the banner, then sends EHLO (or HELO) and parses server
    /// information
    pub fn connect<A: ToSocketAddrs>(
        server: A,
        timeout: Option<Duration>,
        hello_name: &ClientId,
    ) -> Result<SmtpConnection, Error> {
        let stream = NetworkStream::connect(server, timeout)?;
        let mut conn = SmtpConnection {
            stream: BufReader::new(stream),
            broken: false,
            server_info: ServerInfo::default(),
        };
        conn.set_timeout(timeout).map_err(error::connection)?;

        let banner = conn.read_response()?;
        if !is_completion(&banner) {
            return Err(error::refused(Kind::Greeting, &banner));
        }

        conn.ehlo(hello_name)?;

        // Print server information
        #[cfg(feature = "tracing")]
        tracing::debug!("server {}", conn.server_info);
        Ok(conn)
    }

    /// Runs a mail transaction for the envelope
    ///
    /// Refused recipients are tolerated as long as one is accepted.
    pub fn send(&mut self, envelope: &Envelope, email: &[u8]) -> Result<Delivery, Error> {
        let mut mail_options = vec![];

        // Check for non-ascii addresses and use the SMTPUTF8 option if any.
        if envelope.has_non_ascii_addresses() {
            if !self.server_info.supports_feature(Extension::SmtpUtfEight) {
                // don't try to send non-ascii addresses (per RFC)
                return Err(error::protocol(
                    "Envelope contains non-ascii chars but server does not support SMTPUTF8",
                ));
            }
            mail_options.push(MailParameter::SmtpUtfEight);
        }

        if self.server_info.supports_feature(Extension::Size) {
            mail_options.push(MailParameter::Size(email.len()));
        }

        let response = self.command(Mail::new(envelope.from(), mail_options))?;
        if !response.has_code(250) {
            self.abort_transaction(&response);
            return Err(error::refused(Kind::SenderRefused, &response));
        }

        let mut refused = Vec::new();
        let mut last_refusal = None;
        for to_address in envelope.to() {
            let response = self.command(Rcpt::new(to_address.as_str()))?;
            if !(response.has_code(250) || response.has_code(251)) {
                #[cfg(feature = "tracing")]
                tracing::warn!(
                    "recipient {} refused ({}): {}",
                    to_address,
                    response.code(),
                    response.first_line().unwrap_or_default()
                );
                refused.push(to_address.clone());
                last_refusal = Some(response);
            }
        }

        if refused.len() == envelope.to().len() {
            let code = last_refusal.as_ref().map(Response::code);
            if let Some(response) = &last_refusal {
                self.abort_transaction(response);
            }
            return Err(Error::new(
                Kind::RecipientsRefused,
                code,
                Some(format!("refused {}", refused.join(", "))),
            ));
        }

        let response = self.command(Data)?;
        if !response.has_code(354) {
            self.abort_transaction(&response);
            return Err(error::refused(Kind::Data, &response));
        }

        let response = self.message(email)?;
        if !response.has_code(250) {
            self.abort_transaction(&response);
            return Err(error::refused(Kind::Data, &response));
        }

        Ok(Delivery { response, refused })
    }

    /// Resets the transaction after a refusal, unless the server is closing
    /// the connection anyway
    fn abort_transaction(&mut self, response: &Response) {
        if response.has_code(421) {
            self.broken = true;
        }
        if !self.broken {
            let _ = self.command(Rset);
        }
    }

    /// Upgrades the connection with STARTTLS and greets the server again
    pub fn starttls(
        &mut self,
        tls_parameters: &TlsParameters,
        hello_name: &ClientId,
    ) -> Result<(), Error> {
        if !self.server_info.supports_feature(Extension::StartTls) {
            return Err(error::protocol("STARTTLS is not supported on this server"));
        }

        let response = self.command(Starttls)?;
        if !response.has_code(220) {
            return Err(error::refused(Kind::Protocol, &response));
        }

        if let Err(err) = self.stream.get_mut().upgrade_tls(tls_parameters) {
            self.broken = true;
            return Err(err);
        }
        #[cfg(feature = "tracing")]
        tracing::debug!("connection encrypted");

        // Extensions may differ once encrypted
        self.ehlo(hello_name)
    }

    /// Send EHLO, falling back to HELO, and update server info
    fn ehlo(&mut self, hello_name: &ClientId) -> Result<(), Error> {
        let ehlo_response = self.command(Ehlo::new(hello_name.clone()))?;
        if is_completion(&ehlo_response) {
            self.server_info = ServerInfo::from_response(&ehlo_response);
            return Ok(());
        }

        #[cfg(feature = "tracing")]
        tracing::debug!("EHLO refused, trying HELO");
        let helo_response = self.command(Helo::new(hello_name.clone()))?;
        if is_completion(&helo_response) {
            self.server_info = ServerInfo::from_helo_response(&helo_response);
            Ok(())
        } else {
            Err(error::refused(Kind::Greeting, &helo_response))
        }
    }

    /// Sends QUIT
    pub fn quit(&mut self) -> Result<Response, Error> {
        let response = self.command(Quit)?;
        self.broken = true;
        Ok(response)
    }

    /// Tells if the underlying stream is currently encrypted
    pub fn is_encrypted(&self) -> bool {
        self.stream.get_ref().is_encrypted()
    }

    /// Set timeout
    pub fn set_timeout(&mut self, duration: Option<Duration>) -> io::Result<()> {
        self.stream.get_mut().set_read_timeout(duration)?;
        self.stream.get_mut().set_write_timeout(duration)
    }

    /// Authenticates with the first mechanism of the list the server supports,
    /// answering challenges if needed
    pub fn auth(
        &mut self,
        mechanisms: &[Mechanism],
        credentials: &Credentials,
    ) -> Result<Response, Error> {
        if !self.server_info.supports_auth() {
            return Err(error::protocol("SMTP AUTH extension not supported by server"));
        }
        let mechanism = self
            .server_info
            .get_auth_mechanism(mechanisms)
            .ok_or_else(|| error::protocol("No compatible authentication mechanism was found"))?;

        let mut challenges = MAX_CHALLENGES;
        let mut response = self.auth_command(&Auth::new(mechanism, credentials)?)?;

        while challenges > 0 && response.has_code(334) {
            challenges -= 1;
            let answer = Auth::new_from_response(mechanism, credentials, &response)?;
            response = self.auth_command(&answer)?;
        }

        // 503: already authenticated
        if response.has_code(235) || response.has_code(503) {
            Ok(response)
        } else if response.has_code(334) {
            Err(error::protocol("Unexpected number of challenges"))
        } else {
            Err(error::refused(Kind::Authentication, &response))
        }
    }

    /// Sends the message content, dot-stuffed and terminated
    pub fn message(&mut self, message: &[u8]) -> Result<Response, Error> {
        let mut codec = ClientCodec::new();
        let mut out_buf = Vec::with_capacity(message.len() + 5);
        codec.encode(message, &mut out_buf);
        codec.terminate(&mut out_buf);

        #[cfg(feature = "tracing")]
        tracing::trace!(">> {}", escape_crlf(&String::from_utf8_lossy(&out_buf)));
        #[cfg(feature = "tracing")]
        tracing::debug!(">> <message content, {} bytes>", out_buf.len());
        self.write(&out_buf)?;

        self.read_response()
    }

    /// Sends an SMTP command
    pub fn command<C: Display>(&mut self, command: C) -> Result<Response, Error> {
        let line = command.to_string();
        #[cfg(feature = "tracing")]
        tracing::debug!(">> {}", escape_crlf(&line));
        self.write(line.as_bytes())?;
        self.read_response()
    }

    /// Sends an `AUTH` line, logged without the credentials
    fn auth_command(&mut self, auth: &Auth) -> Result<Response, Error> {
        #[cfg(feature = "tracing")]
        tracing::debug!(">> {}", auth.redacted());
        self.write(auth.to_string().as_bytes())?;
        self.read_response()
    }

    /// Writes a string to the server
    fn write(&mut self, bytes: &[u8]) -> Result<(), Error> {
        let stream = self.stream.get_mut();
        let result = stream.write_all(bytes).and_then(|()| stream.flush());

        result.map_err(|err| {
            self.broken = true;
            error::connection(err)
        })
    }

    /// Gets the next SMTP reply, positive or not
    pub fn read_response(&mut self) -> Result<Response, Error> {
        let mut buffer = String::with_capacity(100);

        loop {
            let start = buffer.len();
            let read = match self.stream.read_line(&mut buffer) {
                Ok(read) => read,
                Err(err) => {
                    self.broken = true;
                    return Err(error::connection(err));
                }
            };
            if read == 0 {
                self.broken = true;
                return Err(error::protocol("connection closed before a complete reply"));
            }

            #[cfg(feature = "tracing")]
            tracing::debug!("<< {}", escape_crlf(&buffer[start..]));
            #[cfg(not(feature = "tracing"))]
            let _ = start;

            match parse_response(&buffer) {
                Ok((_remaining, response)) => return Ok(response),
                Err(nom::Err::Incomplete(_)) => { /* read more */ }
                Err(nom::Err::Failure(e) | nom::Err::Error(e)) => {
                    let err = error::protocol(format!("malformed reply: {e}"));
                    self.broken = true;
                    return Err(err);
                }
            }
        }
    }
}

impl Drop for SmtpConnection {
    fn drop(&mut self) {
        let _ = self.stream.get_ref().shutdown(Shutdown::Both);
        #[cfg(feature = "tracing")]
        tracing::debug!("connection closed");
    }
}

fn is_completion(response: &Response) -> bool {
    response.code().severity() == Severity::PositiveCompletion
}
