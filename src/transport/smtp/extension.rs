//! ESMTP features

use std::{
    collections::HashSet,
    fmt::{self, Display, Formatter},
    net::{Ipv4Addr, Ipv6Addr},
};

use crate::transport::smtp::{authentication::Mechanism, response::Response};

/// Client identifier, the parameter to `EHLO`
#[derive(PartialEq, Eq, Clone, Debug)]
pub enum ClientId {
    /// A fully-qualified domain name
    Domain(String),
    /// An IPv4 address
    Ipv4(Ipv4Addr),
    /// An IPv6 address
    Ipv6(Ipv6Addr),
}

const LOCALHOST_CLIENT: ClientId = ClientId::Ipv4(Ipv4Addr::new(127, 0, 0, 1));

impl Default for ClientId {
    fn default() -> Self {
        // https://tools.ietf.org/html/rfc5321#section-4.1.4
        //
        // An address literal is used when the local host name is unknown.
        #[cfg(feature = "hostname")]
        {
            hostname::get()
                .ok()
                .and_then(|s| s.into_string().ok())
                .filter(|s| !s.is_empty())
                .map(Self::Domain)
                .unwrap_or(LOCALHOST_CLIENT)
        }
        #[cfg(not(feature = "hostname"))]
        LOCALHOST_CLIENT
    }
}

impl Display for ClientId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Domain(ref value) => f.write_str(value),
            Self::Ipv4(ref value) => write!(f, "[{value}]"),
            Self::Ipv6(ref value) => write!(f, "[IPv6:{value}]"),
        }
    }
}

/// Supported ESMTP keywords
#[derive(PartialEq, Eq, Hash, Copy, Clone, Debug)]
pub enum Extension {
    /// SMTPUTF8 keyword
    ///
    /// Defined in [RFC 6531](https://tools.ietf.org/html/rfc6531)
    SmtpUtfEight,
    /// STARTTLS keyword
    ///
    /// Defined in [RFC 2487](https://tools.ietf.org/html/rfc2487)
    StartTls,
    /// SIZE keyword
    ///
    /// Defined in [RFC 1870](https://tools.ietf.org/html/rfc1870)
    Size,
    /// AUTH mechanism
    Authentication(Mechanism),
}

impl Display for Extension {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match *self {
            Extension::SmtpUtfEight => f.write_str("SMTPUTF8"),
            Extension::StartTls => f.write_str("STARTTLS"),
            Extension::Size => f.write_str("SIZE"),
            Extension::Authentication(ref mechanism) => write!(f, "AUTH {mechanism}"),
        }
    }
}

/// Contains information about an SMTP server
#[derive(Clone, Debug, Eq, PartialEq, Default)]
pub struct ServerInfo {
    /// Server name
    ///
    /// The first word of the `EHLO` or `HELO` reply
    name: String,
    /// ESMTP features supported by the server
    ///
    /// Always empty when the server only answered `HELO`.
    features: HashSet<Extension>,
}

impl Display for ServerInfo {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let features = if self.features.is_empty() {
            "no supported features".to_owned()
        } else {
            format!("{:?}", self.features)
        };
        write!(f, "{} with {}", self.name, features)
    }
}

impl ServerInfo {
    /// Parses a EHLO response to create a `ServerInfo`
    ///
    /// Keywords are matched case-insensitively, unknown ones are ignored.
    /// A reply without text gives an empty name.
    pub fn from_response(response: &Response) -> ServerInfo {
        let name = response.first_word().unwrap_or_default();

        let mut features: HashSet<Extension> = HashSet::new();

        // The first line carries the server name
        for line in response.message().skip(1) {
            let mut split = line.split_whitespace();
            let Some(keyword) = split.next() else {
                continue;
            };

            match keyword.to_ascii_uppercase().as_str() {
                "SMTPUTF8" => {
                    features.insert(Extension::SmtpUtfEight);
                }
                "STARTTLS" => {
                    features.insert(Extension::StartTls);
                }
                "SIZE" => {
                    features.insert(Extension::Size);
                }
                "AUTH" => {
                    for mechanism in split {
                        match mechanism.to_ascii_uppercase().as_str() {
                            "PLAIN" => {
                                features.insert(Extension::Authentication(Mechanism::Plain));
                            }
                            "LOGIN" => {
                                features.insert(Extension::Authentication(Mechanism::Login));
                            }
                            _ => (),
                        }
                    }
                }
                _ => (),
            };
        }

        ServerInfo {
            name: name.to_owned(),
            features,
        }
    }

    /// Builds a `ServerInfo` from a `HELO` response, without any extension
    pub fn from_helo_response(response: &Response) -> ServerInfo {
        ServerInfo {
            name: response.first_word().unwrap_or_default().to_owned(),
            features: HashSet::new(),
        }
    }

    /// Checks if the server supports an ESMTP feature
    pub fn supports_feature(&self, keyword: Extension) -> bool {
        self.features.contains(&keyword)
    }

    /// Checks if the server supports an ESMTP feature
    pub fn supports_auth_mechanism(&self, mechanism: Mechanism) -> bool {
        self.features
            .contains(&Extension::Authentication(mechanism))
    }

    /// Gets the first mechanism of the list the server supports
    pub fn get_auth_mechanism(&self, mechanisms: &[Mechanism]) -> Option<Mechanism> {
        mechanisms
            .iter()
            .copied()
            .find(|mechanism| self.supports_auth_mechanism(*mechanism))
    }

    /// Whether the server advertised any `AUTH` mechanism
    pub fn supports_auth(&self) -> bool {
        self.features
            .iter()
            .any(|feature| matches!(feature, Extension::Authentication(_)))
    }

    /// The name given in the greeting reply
    pub fn name(&self) -> &str {
        self.name.as_ref()
    }
}

/// A `MAIL FROM` extension parameter
#[derive(PartialEq, Eq, Clone, Debug)]
pub enum MailParameter {
    /// `SIZE` parameter
    Size(usize),
    /// `SMTPUTF8` parameter
    SmtpUtfEight,
}

impl Display for MailParameter {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match *self {
            MailParameter::Size(size) => write!(f, "SIZE={size}"),
            MailParameter::SmtpUtfEight => f.write_str("SMTPUTF8"),
        }
    }
}

#[cfg(test)]
mod test {
    use std::collections::HashSet;

    use super::*;
    use crate::transport::smtp::{
        authentication::Mechanism,
        response::{code, Response},
    };

    #[test]
    fn test_clientid_fmt() {
        assert_eq!(ClientId::Domain("test".to_owned()).to_string(), "test");
        assert_eq!(LOCALHOST_CLIENT.to_string(), "[127.0.0.1]");
        assert_eq!(
            ClientId::Ipv6(Ipv6Addr::LOCALHOST).to_string(),
            "[IPv6:::1]"
        );
    }

    #[test]
    fn test_extension_fmt() {
        assert_eq!(Extension::StartTls.to_string(), "STARTTLS");
        assert_eq!(
            Extension::Authentication(Mechanism::Plain).to_string(),
            "AUTH PLAIN"
        );
        assert_eq!(MailParameter::Size(42).to_string(), "SIZE=42");
    }

    #[test]
    fn test_serverinfo_fmt() {
        let mut plain = HashSet::new();
        assert!(plain.insert(Extension::Authentication(Mechanism::Plain)));

        assert_eq!(
            ServerInfo {
                name: "name".to_owned(),
                features: plain,
            }
            .to_string(),
            "name with {Authentication(Plain)}"
        );
        assert_eq!(
            ServerInfo {
                name: "name".to_owned(),
                features: HashSet::new(),
            }
            .to_string(),
            "name with no supported features"
        );
    }

    #[test]
    fn test_serverinfo() {
        let response = Response::new(
            code(250),
            vec![
                "me".to_owned(),
                "8BITMIME".to_owned(),
                "size 42".to_owned(),
                "STARTTLS".to_owned(),
            ],
        );

        let server_info = ServerInfo::from_response(&response);
        assert_eq!(server_info.name(), "me");
        assert!(server_info.supports_feature(Extension::Size));
        assert!(server_info.supports_feature(Extension::StartTls));
        assert!(!server_info.supports_feature(Extension::SmtpUtfEight));
        assert!(!server_info.supports_auth());

        let response = Response::new(
            code(250),
            vec![
                "me".to_owned(),
                "AUTH LOGIN CRAM-MD5 XOAUTH2 plain".to_owned(),
                "SMTPUTF8".to_owned(),
            ],
        );

        let server_info = ServerInfo::from_response(&response);
        assert!(server_info.supports_auth());
        assert!(server_info.supports_auth_mechanism(Mechanism::Plain));
        assert!(server_info.supports_auth_mechanism(Mechanism::Login));
        assert!(server_info.supports_feature(Extension::SmtpUtfEight));
        assert_eq!(
            server_info.get_auth_mechanism(&[Mechanism::Plain, Mechanism::Login]),
            Some(Mechanism::Plain)
        );
    }

    #[test]
    fn test_serverinfo_mechanism_preference() {
        let response = Response::new(
            code(250),
            vec!["me".to_owned(), "AUTH LOGIN".to_owned()],
        );
        let server_info = ServerInfo::from_response(&response);

        assert_eq!(
            server_info.get_auth_mechanism(&[Mechanism::Plain, Mechanism::Login]),
            Some(Mechanism::Login)
        );
        assert_eq!(server_info.get_auth_mechanism(&[Mechanism::Plain]), None);
    }

    #[test]
    fn test_serverinfo_helo() {
        let response = Response::new(code(250), vec!["relay.example.org".to_owned()]);
        let server_info = ServerInfo::from_helo_response(&response);

        assert_eq!(server_info.name(), "relay.example.org");
        assert!(!server_info.supports_feature(Extension::StartTls));
        assert!(!server_info.supports_auth());
    }

    #[test]
    fn test_serverinfo_without_name() {
        let response = "250\r\n".parse::<Response>().unwrap();
        let server_info = ServerInfo::from_response(&response);
        assert_eq!(server_info.name(), "");
        assert!(!server_info.supports_feature(Extension::Size));

        let server_info = ServerInfo::from_response(&Response::new(code(250), vec![]));
        assert_eq!(server_info.name(), "");
    }
}
