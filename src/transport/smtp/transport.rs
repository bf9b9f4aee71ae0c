use std::time::Duration;

use super::{
    authentication::{Credentials, Mechanism},
    client::{Delivery, SmtpConnection},
    extension::ClientId,
    Error, SmtpInfo, Tls, TlsParameters, SUBMISSION_PORT,
};
use crate::{address::Envelope, Transport};

/// Sends emails using the SMTP protocol
///
/// Every message gets its own connection, closed once the message is sent
/// or has failed.
#[derive(Debug, Clone)]
pub struct SmtpTransport {
    info: SmtpInfo,
}

impl Transport for SmtpTransport {
    type Ok = Delivery;
    type Error = Error;

    /// Sends an email
    fn send_raw(&self, envelope: &Envelope, email: &[u8]) -> Result<Self::Ok, Self::Error> {
        let mut conn = self.connection()?;

        let delivery = conn.send(envelope, email)?;

        // The message is accepted at this point, a failed QUIT changes nothing
        if let Err(_err) = conn.quit() {
            #[cfg(feature = "tracing")]
            tracing::debug!("QUIT failed: {}", _err);
        }

        Ok(delivery)
    }
}

impl SmtpTransport {
    /// Simple and secure transport, using STARTTLS to obtain encrypted connections
    ///
    /// Connects to the submission port with an unencrypted connection, then
    /// upgrades it with STARTTLS. The provided domain is used to validate TLS
    /// certificates.
    ///
    /// An error is returned if the connection can't be upgraded. No credentials
    /// or emails will be sent to the server, protecting from downgrade attacks.
    pub fn starttls_relay(relay: &str) -> Result<SmtpTransportBuilder, Error> {
        let tls_parameters = TlsParameters::new(relay.into())?;

        Ok(Self::builder_dangerous(relay)
            .port(SUBMISSION_PORT)
            .tls(Tls::Required(tls_parameters)))
    }

    /// Creates a new SMTP client
    ///
    /// Defaults are:
    ///
    /// * No authentication
    /// * No TLS
    /// * No timeout
    /// * Port 587
    ///
    /// Consider using [`SmtpTransport::starttls_relay`] instead, if possible.
    pub fn builder_dangerous<T: Into<String>>(server: T) -> SmtpTransportBuilder {
        SmtpTransportBuilder::new(server)
    }

    /// Host the transport connects to
    pub fn server(&self) -> &str {
        &self.info.server
    }

    /// Port the transport connects to
    pub fn port(&self) -> u16 {
        self.info.port
    }

    /// Creates a new connection directly usable to send emails
    ///
    /// Handles encryption and authentication
    pub fn connection(&self) -> Result<SmtpConnection, Error> {
        let mut conn = SmtpConnection::connect::<(&str, u16)>(
            (self.info.server.as_ref(), self.info.port),
            self.info.timeout,
            &self.info.hello_name,
        )?;

        match self.info.tls {
            Tls::Required(ref tls_parameters) => {
                conn.starttls(tls_parameters, &self.info.hello_name)?;
            }
            Tls::None => (),
        }

        if let Some(credentials) = &self.info.credentials {
            conn.auth(&self.info.authentication, credentials)?;
        }
        Ok(conn)
    }
}

/// Contains client configuration.
/// Instances of this struct can be created using functions of [`SmtpTransport`].
#[derive(Debug, Clone)]
pub struct SmtpTransportBuilder {
    info: SmtpInfo,
}

/// Builder for the SMTP `SmtpTransport`
impl SmtpTransportBuilder {
    // Create new builder with default parameters
    pub(crate) fn new<T: Into<String>>(server: T) -> Self {
        let new = SmtpInfo {
            server: server.into(),
            ..Default::default()
        };

        Self { info: new }
    }

    /// Set the name used during EHLO
    pub fn hello_name(mut self, name: ClientId) -> Self {
        self.info.hello_name = name;
        self
    }

    /// Set the credentials, authentication is skipped without them
    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.info.credentials = Some(credentials);
        self
    }

    /// Set the accepted authentication mechanisms, in order of preference
    pub fn authentication(mut self, mechanisms: Vec<Mechanism>) -> Self {
        self.info.authentication = mechanisms;
        self
    }

    /// Set the timeout duration
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.info.timeout = timeout;
        self
    }

    /// Set the port to use
    pub fn port(mut self, port: u16) -> Self {
        self.info.port = port;
        self
    }

    /// Set the TLS settings to use
    pub fn tls(mut self, tls: Tls) -> Self {
        self.info.tls = tls;
        self
    }

    /// Build the transport
    pub fn build(self) -> SmtpTransport {
        SmtpTransport { info: self.info }
    }
}
