use std::{
    fmt::{self, Debug, Formatter},
    io::{self, Read, Write},
    mem,
    net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs},
    time::Duration,
};

use native_tls::{Protocol, TlsConnector, TlsStream};

use crate::transport::smtp::error::{self, Error};

/// Parameters to use for secure clients
#[derive(Clone)]
pub struct TlsParameters {
    connector: TlsConnector,
    /// The domain name which is expected in the TLS certificate from the server
    domain: String,
}

/// Builder for `TlsParameters`
///
/// Certificates are checked against the system trust store, plus the added
/// root certificates. TLS 1.2 is the minimum version.
#[derive(Debug, Clone)]
pub struct TlsParametersBuilder {
    domain: String,
    root_certs: Vec<Certificate>,
    accept_invalid_certs: bool,
}

impl TlsParametersBuilder {
    /// Creates a new builder for `TlsParameters`
    pub fn new(domain: String) -> Self {
        Self {
            domain,
            root_certs: Vec::new(),
            accept_invalid_certs: false,
        }
    }

    /// Add a custom root certificate
    ///
    /// Can be used to safely connect to a server using a self-signed certificate, for example.
    pub fn add_root_certificate(mut self, cert: Certificate) -> Self {
        self.root_certs.push(cert);
        self
    }

    /// Controls whether invalid certificates are accepted
    ///
    /// Defaults to `false`.
    ///
    /// # Warning
    ///
    /// If certificate verification is disabled, *any* certificate is trusted,
    /// including self signed, expired and other hosts' certificates. This
    /// opens the connection to man-in-the-middle attacks.
    pub fn dangerous_accept_invalid_certs(mut self, accept_invalid_certs: bool) -> Self {
        self.accept_invalid_certs = accept_invalid_certs;
        self
    }

    /// Creates the `TlsParameters`
    pub fn build(self) -> Result<TlsParameters, Error> {
        let mut tls_builder = TlsConnector::builder();
        for cert in self.root_certs {
            tls_builder.add_root_certificate(cert.native_tls);
        }
        tls_builder.danger_accept_invalid_certs(self.accept_invalid_certs);
        tls_builder.min_protocol_version(Some(Protocol::Tlsv12));

        let connector = tls_builder.build().map_err(error::connection)?;
        Ok(TlsParameters {
            connector,
            domain: self.domain,
        })
    }
}

impl TlsParameters {
    /// Creates parameters checking the server certificate against `domain`
    /// with the system trust store
    pub fn new(domain: String) -> Result<Self, Error> {
        TlsParametersBuilder::new(domain).build()
    }

    /// Creates a new `TlsParameters` builder
    pub fn builder(domain: String) -> TlsParametersBuilder {
        TlsParametersBuilder::new(domain)
    }

    /// The domain name expected in the server certificate
    pub fn domain(&self) -> &str {
        &self.domain
    }
}

/// A certificate that can be used with [`TlsParametersBuilder::add_root_certificate`]
#[derive(Clone)]
pub struct Certificate {
    native_tls: native_tls::Certificate,
}

impl Certificate {
    /// Create a `Certificate` from a DER encoded certificate
    pub fn from_der(der: &[u8]) -> Result<Self, Error> {
        let native_tls = native_tls::Certificate::from_der(der).map_err(error::connection)?;
        Ok(Self { native_tls })
    }

    /// Create a `Certificate` from a PEM encoded certificate
    pub fn from_pem(pem: &[u8]) -> Result<Self, Error> {
        let native_tls = native_tls::Certificate::from_pem(pem).map_err(error::connection)?;
        Ok(Self { native_tls })
    }
}

impl Debug for Certificate {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Certificate").finish_non_exhaustive()
    }
}

impl Debug for TlsParameters {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsParameters")
            .field("domain", &self.domain)
            .finish_non_exhaustive()
    }
}

/// Represents the different types of underlying network streams
pub enum NetworkStream {
    /// Plain TCP stream
    Tcp(TcpStream),
    /// Encrypted TCP stream
    Tls(TlsStream<TcpStream>),
    /// Can't be built, left behind by a failed TLS upgrade
    None,
}

impl Debug for NetworkStream {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match *self {
            NetworkStream::Tcp(_) => "NetworkStream(Tcp)",
            NetworkStream::Tls(_) => "NetworkStream(Tls)",
            NetworkStream::None => "NetworkStream(None)",
        })
    }
}

impl NetworkStream {
    /// Returns peer's address
    pub fn peer_addr(&self) -> io::Result<SocketAddr> {
        match *self {
            NetworkStream::Tcp(ref s) => s.peer_addr(),
            NetworkStream::Tls(ref s) => s.get_ref().peer_addr(),
            NetworkStream::None => Err(not_connected()),
        }
    }

    /// Shutdowns the connection
    pub fn shutdown(&self, how: Shutdown) -> io::Result<()> {
        match *self {
            NetworkStream::Tcp(ref s) => s.shutdown(how),
            NetworkStream::Tls(ref s) => s.get_ref().shutdown(how),
            NetworkStream::None => Ok(()),
        }
    }

    /// Opens a plain TCP connection, trying each resolved address in turn
    ///
    /// With a `timeout`, every attempt and every later read or write is
    /// bounded by it.
    pub fn connect<T: ToSocketAddrs>(
        server: T,
        timeout: Option<Duration>,
    ) -> Result<NetworkStream, Error> {
        let addrs = server.to_socket_addrs().map_err(error::connection)?;

        let mut last_err = None;
        for addr in addrs {
            let attempt = match timeout {
                Some(timeout) => TcpStream::connect_timeout(&addr, timeout),
                None => TcpStream::connect(addr),
            };
            match attempt {
                Ok(stream) => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!("connected to {}", addr);
                    return Ok(NetworkStream::Tcp(stream));
                }
                Err(err) => last_err = Some(err),
            }
        }

        Err(error::connection(last_err.unwrap_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                "could not resolve to any address",
            )
        })))
    }

    /// Runs the TLS handshake over the plain stream
    pub fn upgrade_tls(&mut self, tls_parameters: &TlsParameters) -> Result<(), Error> {
        match mem::replace(self, NetworkStream::None) {
            NetworkStream::Tcp(stream) => {
                let stream = tls_parameters
                    .connector
                    .connect(&tls_parameters.domain, stream)
                    .map_err(error::connection)?;
                *self = NetworkStream::Tls(stream);
                Ok(())
            }
            NetworkStream::Tls(stream) => {
                *self = NetworkStream::Tls(stream);
                Ok(())
            }
            NetworkStream::None => Err(error::connection(not_connected())),
        }
    }

    /// Tells if the stream is encrypted
    pub fn is_encrypted(&self) -> bool {
        matches!(*self, NetworkStream::Tls(_))
    }

    /// Set read timeout for IO calls
    pub fn set_read_timeout(&mut self, duration: Option<Duration>) -> io::Result<()> {
        match *self {
            NetworkStream::Tcp(ref mut stream) => stream.set_read_timeout(duration),
            NetworkStream::Tls(ref mut stream) => stream.get_ref().set_read_timeout(duration),
            NetworkStream::None => Ok(()),
        }
    }

    /// Set write timeout for IO calls
    pub fn set_write_timeout(&mut self, duration: Option<Duration>) -> io::Result<()> {
        match *self {
            NetworkStream::Tcp(ref mut stream) => stream.set_write_timeout(duration),
            NetworkStream::Tls(ref mut stream) => stream.get_ref().set_write_timeout(duration),
            NetworkStream::None => Ok(()),
        }
    }
}

fn not_connected() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "stream is not connected")
}

impl Read for NetworkStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match *self {
            NetworkStream::Tcp(ref mut s) => s.read(buf),
            NetworkStream::Tls(ref mut s) => s.read(buf),
            NetworkStream::None => Ok(0),
        }
    }
}

impl Write for NetworkStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match *self {
            NetworkStream::Tcp(ref mut s) => s.write(buf),
            NetworkStream::Tls(ref mut s) => s.write(buf),
            NetworkStream::None => Err(not_connected()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match *self {
            NetworkStream::Tcp(ref mut s) => s.flush(),
            NetworkStream::Tls(ref mut s) => s.flush(),
            NetworkStream::None => Ok(()),
        }
    }
}
