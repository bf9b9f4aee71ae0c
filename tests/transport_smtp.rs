mod fake_server;

use std::{fs, net::TcpListener, time::Duration};

use fake_server::FakeServer;
use pretty_assertions::assert_eq;
use textmail::{
    transport::smtp::{
        authentication::Credentials,
        error::{Error, Kind},
        extension::ClientId,
        Certificate, Delivery, SmtpTransportBuilder, Tls, TlsParameters,
    },
    Message, SmtpTransport, Transport,
};

fn builder(server: &FakeServer) -> SmtpTransportBuilder {
    SmtpTransport::builder_dangerous("127.0.0.1")
        .port(server.port())
        .timeout(Some(Duration::from_secs(5)))
        .hello_name(ClientId::Domain("client.example.org".to_owned()))
}

fn message(body: &str, recipients: &[&str]) -> (tempfile::TempDir, Message) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("message.txt");
    fs::write(&path, body).unwrap();
    let message = Message::from_file("a@x.com", "Hi", &path, recipients).unwrap();
    (dir, message)
}

/// Trusts the test CA, which signed the `localhost` certificate of the fake server
fn tls_parameters() -> TlsParameters {
    let ca = Certificate::from_pem(include_bytes!("certs/ca.crt")).unwrap();
    TlsParameters::builder("localhost".to_owned())
        .add_root_certificate(ca)
        .build()
        .unwrap()
}

fn send(transport: &SmtpTransport, recipients: &[&str]) -> Result<Delivery, Error> {
    let (_dir, message) = message("Hello World", recipients);
    transport.send(&message)
}

#[test]
fn smtp_transport_simple() {
    let server = FakeServer::well_behaved();
    let transport = builder(&server).build();
    let (_dir, message) = message("Hello World\n.hidden\n", &["b@y.com"]);

    let delivery = transport.send(&message).unwrap();
    assert!(delivery.response().has_code(250));
    assert!(delivery.refused().is_empty());

    let session = server.session();
    assert!(session.closed);
    assert_eq!(session.lines[0], "EHLO client.example.org");
    assert!(session.lines[1].starts_with("MAIL FROM:<a@x.com> SIZE="));
    assert_eq!(session.lines[2], "RCPT TO:<b@y.com>");
    assert_eq!(session.lines[3], "DATA");
    assert!(session.sent("To: b@y.com"));
    assert!(session.sent("..hidden"));
    assert_eq!(session.lines[session.lines.len() - 2], ".");
    assert_eq!(session.lines[session.lines.len() - 1], "QUIT");
    assert!(!session.sent("AUTH"));
}

#[test]
fn greeting_refused_closes_connection() {
    let server = FakeServer::start("554 5.3.2 No service for you\r\n", &[]);
    let transport = builder(&server).build();

    let err = send(&transport, &["b@y.com"]).unwrap_err();
    assert_eq!(err.kind(), Kind::Greeting);
    assert_eq!(err.status().map(u16::from), Some(554));

    let session = server.session();
    assert!(session.closed);
    assert!(session.lines.is_empty());
}

#[test]
fn helo_fallback() {
    let server = FakeServer::start(
        "220 old.example.org\r\n",
        &[("EHLO", "502 5.5.2 Command not recognized\r\n")],
    );
    let transport = builder(&server).build();

    send(&transport, &["b@y.com"]).unwrap();

    let session = server.session();
    assert_eq!(session.lines[0], "EHLO client.example.org");
    assert_eq!(session.lines[1], "HELO client.example.org");
    // No extension is known after HELO
    assert_eq!(session.lines[2], "MAIL FROM:<a@x.com>");
}

#[test]
fn helo_refused() {
    let server = FakeServer::start(
        "220 old.example.org\r\n",
        &[
            ("EHLO", "502 5.5.2 Command not recognized\r\n"),
            ("HELO", "501 5.5.4 Syntax error\r\n"),
        ],
    );
    let transport = builder(&server).build();

    let err = send(&transport, &["b@y.com"]).unwrap_err();
    assert!(err.is_greeting());

    let session = server.session();
    assert!(session.closed);
    assert!(!session.sent("MAIL"));
}

#[test]
fn no_auth_without_credentials() {
    let server = FakeServer::well_behaved();
    let transport = builder(&server).build();

    send(&transport, &["b@y.com"]).unwrap();

    let session = server.session();
    assert!(!session.sent("AUTH"));
    assert!(session.sent("MAIL FROM:<a@x.com>"));
}

#[test]
fn no_auth_with_incomplete_credentials() {
    assert_eq!(Credentials::from_parts(Some("alice"), Some("")), None);
    assert_eq!(Credentials::from_parts(None, Some("wonderland")), None);

    let server = FakeServer::well_behaved();
    let mut transport = builder(&server);
    if let Some(credentials) = Credentials::from_parts(Some("alice"), None) {
        transport = transport.credentials(credentials);
    }

    send(&transport.build(), &["b@y.com"]).unwrap();
    assert!(!server.session().sent("AUTH"));
}

#[test]
fn auth_plain_before_mail() {
    let server = FakeServer::well_behaved();
    let transport = builder(&server)
        .credentials(Credentials::from(("alice", "wonderland")))
        .build();

    send(&transport, &["b@y.com"]).unwrap();

    let session = server.session();
    let auth = session.position("AUTH").unwrap();
    assert_eq!(session.lines[auth], "AUTH PLAIN AGFsaWNlAHdvbmRlcmxhbmQ=");
    assert!(auth < session.position("MAIL").unwrap());
}

#[test]
fn auth_login_challenges() {
    let server = FakeServer::start(
        "220 fake.example.org\r\n",
        &[
            ("EHLO", "250-fake.example.org\r\n250 AUTH LOGIN\r\n"),
            ("AUTH", "334 VXNlcm5hbWU6\r\n"),
            ("*", "334 UGFzc3dvcmQ6\r\n"),
            ("*", "235 2.7.0 Authentication successful\r\n"),
        ],
    );
    let transport = builder(&server)
        .credentials(Credentials::from(("alice", "wonderland")))
        .build();

    send(&transport, &["b@y.com"]).unwrap();

    let session = server.session();
    assert_eq!(
        &session.lines[1..4],
        ["AUTH LOGIN", "YWxpY2U=", "d29uZGVybGFuZA=="]
    );
    assert_eq!(session.lines[4], "MAIL FROM:<a@x.com>");
}

#[test]
fn auth_refused() {
    let server = FakeServer::start(
        "220 fake.example.org\r\n",
        &[(
            "AUTH",
            "535 5.7.8 Username and Password not accepted\r\n",
        )],
    );
    let transport = builder(&server)
        .credentials(Credentials::from(("alice", "wrong")))
        .build();

    let err = send(&transport, &["b@y.com"]).unwrap_err();
    assert!(err.is_authentication());
    assert_eq!(err.status().map(u16::from), Some(535));

    let session = server.session();
    assert!(session.closed);
    assert!(!session.sent("MAIL"));
}

#[test]
fn auth_not_supported() {
    let server = FakeServer::start(
        "220 fake.example.org\r\n",
        &[("EHLO", "250-fake.example.org\r\n250 SIZE 1000\r\n")],
    );
    let transport = builder(&server)
        .credentials(Credentials::from(("alice", "wonderland")))
        .build();

    let err = send(&transport, &["b@y.com"]).unwrap_err();
    assert_eq!(err.kind(), Kind::Protocol);
    assert!(!server.session().sent("AUTH"));
}

#[test]
fn sender_refused() {
    let server = FakeServer::start(
        "220 fake.example.org\r\n",
        &[("MAIL", "553 5.7.1 Sender address rejected\r\n")],
    );
    let transport = builder(&server).build();

    let err = send(&transport, &["b@y.com"]).unwrap_err();
    assert!(err.is_sender_refused());

    let session = server.session();
    assert!(session.sent("RSET"));
    assert!(!session.sent("RCPT"));
}

#[test]
fn sender_refused_closing() {
    let server = FakeServer::start(
        "220 fake.example.org\r\n",
        &[("MAIL", "421 4.3.2 Shutting down\r\n")],
    );
    let transport = builder(&server).build();

    let err = send(&transport, &["b@y.com"]).unwrap_err();
    assert!(err.is_sender_refused());

    let session = server.session();
    assert!(session.closed);
    assert!(!session.sent("RSET"));
}

#[test]
fn all_recipients_refused() {
    let server = FakeServer::start(
        "220 fake.example.org\r\n",
        &[
            ("RCPT", "550 5.1.1 No such user\r\n"),
            ("RCPT", "550 5.1.1 No such user\r\n"),
        ],
    );
    let transport = builder(&server).build();

    let err = send(&transport, &["b@y.com", "c@z.com"]).unwrap_err();
    assert!(err.is_recipients_refused());
    assert_eq!(err.status().map(u16::from), Some(550));

    let session = server.session();
    assert!(session.sent("RSET"));
    assert!(!session.sent("DATA"));
}

#[test]
fn some_recipients_refused() {
    let server = FakeServer::start(
        "220 fake.example.org\r\n",
        &[("RCPT", "550 5.1.1 No such user\r\n")],
    );
    let transport = builder(&server).build();

    let delivery = send(&transport, &["b@y.com", "c@z.com"]).unwrap();
    assert_eq!(delivery.refused(), ["b@y.com"]);

    let session = server.session();
    assert!(session.sent("RCPT TO:<c@z.com>"));
    assert!(session.sent("DATA"));
}

#[test]
fn data_refused() {
    let server = FakeServer::start(
        "220 fake.example.org\r\n",
        &[("DATA", "554 5.5.1 No valid recipients\r\n")],
    );
    let transport = builder(&server).build();

    let err = send(&transport, &["b@y.com"]).unwrap_err();
    assert!(err.is_data());

    let session = server.session();
    assert!(session.sent("RSET"));
    assert!(!session.sent("From: a@x.com"));
}

#[test]
fn content_refused() {
    let server = FakeServer::start(
        "220 fake.example.org\r\n",
        &[(".", "552 5.3.4 Message too big\r\n")],
    );
    let transport = builder(&server).build();

    let err = send(&transport, &["b@y.com"]).unwrap_err();
    assert!(err.is_data());
    assert_eq!(err.status().map(u16::from), Some(552));
    assert!(server.session().sent("RSET"));
}

#[test]
fn starttls_not_advertised() {
    let server = FakeServer::well_behaved();
    let transport = builder(&server)
        .tls(Tls::Required(
            TlsParameters::new("127.0.0.1".to_owned()).unwrap(),
        ))
        .credentials(Credentials::from(("alice", "wonderland")))
        .build();

    let err = send(&transport, &["b@y.com"]).unwrap_err();
    assert_eq!(err.kind(), Kind::Protocol);

    let session = server.session();
    assert!(session.closed);
    assert!(!session.sent("STARTTLS"));
    assert!(!session.sent("AUTH"));
}

#[test]
fn starttls_refused() {
    let server = FakeServer::start(
        "220 fake.example.org\r\n",
        &[
            ("EHLO", "250-fake.example.org\r\n250 STARTTLS\r\n"),
            ("STARTTLS", "454 4.7.0 TLS not available\r\n"),
        ],
    );
    let transport = builder(&server)
        .tls(Tls::Required(
            TlsParameters::new("127.0.0.1".to_owned()).unwrap(),
        ))
        .build();

    let err = send(&transport, &["b@y.com"]).unwrap_err();
    assert!(err.is_protocol());
    assert_eq!(err.status().map(u16::from), Some(454));
    assert!(!server.session().sent("MAIL"));
}

#[test]
fn starttls_then_auth() {
    let server = FakeServer::start_tls(
        "220 fake.example.org\r\n",
        &[("EHLO", "250-fake.example.org\r\n250 STARTTLS\r\n")],
    );
    let transport = builder(&server)
        .tls(Tls::Required(tls_parameters()))
        .credentials(Credentials::from(("alice", "wonderland")))
        .build();
    let (_dir, message) = message("Hello World", &["b@y.com"]);

    let mut conn = transport.connection().unwrap();
    assert!(conn.is_encrypted());
    // Extensions come from the EHLO sent over TLS
    assert!(conn.server_info().supports_auth());
    conn.send(message.envelope(), &message.formatted()).unwrap();
    conn.quit().unwrap();
    drop(conn);

    let session = server.session();
    assert_eq!(
        &session.lines[..3],
        ["EHLO client.example.org", "STARTTLS", "EHLO client.example.org"]
    );
    assert_eq!(session.encrypted_from, Some(2));
    let auth = session.position("AUTH").unwrap();
    assert_eq!(session.lines[auth], "AUTH PLAIN AGFsaWNlAHdvbmRlcmxhbmQ=");
    assert!(auth > 2);
    assert!(auth < session.position("MAIL").unwrap());
    assert_eq!(session.lines.last().map(String::as_str), Some("QUIT"));
}

#[test]
fn starttls_send() {
    let server = FakeServer::start_tls(
        "220 fake.example.org\r\n",
        &[("EHLO", "250-fake.example.org\r\n250 STARTTLS\r\n")],
    );
    let transport = builder(&server)
        .tls(Tls::Required(tls_parameters()))
        .build();

    let delivery = send(&transport, &["b@y.com"]).unwrap();
    assert!(delivery.response().has_code(250));

    let session = server.session();
    assert_eq!(session.encrypted_from, Some(2));
    assert!(session.position("MAIL").unwrap() > 2);
}

#[test]
fn starttls_untrusted_certificate() {
    let server = FakeServer::start_tls(
        "220 fake.example.org\r\n",
        &[("EHLO", "250-fake.example.org\r\n250 STARTTLS\r\n")],
    );
    // The test CA isn't in the system trust store
    let transport = builder(&server)
        .tls(Tls::Required(
            TlsParameters::new("localhost".to_owned()).unwrap(),
        ))
        .credentials(Credentials::from(("alice", "wonderland")))
        .build();

    let err = send(&transport, &["b@y.com"]).unwrap_err();
    assert!(err.is_connection());

    let session = server.session();
    assert_eq!(session.encrypted_from, None);
    assert!(!session.sent("AUTH"));
    assert!(!session.sent("MAIL"));
}

#[test]
fn starttls_accept_invalid_certs() {
    let server = FakeServer::start_tls(
        "220 fake.example.org\r\n",
        &[("EHLO", "250-fake.example.org\r\n250 STARTTLS\r\n")],
    );
    let tls = TlsParameters::builder("mail.example.com".to_owned())
        .dangerous_accept_invalid_certs(true)
        .build()
        .unwrap();
    let transport = builder(&server).tls(Tls::Required(tls)).build();

    send(&transport, &["b@y.com"]).unwrap();
    assert_eq!(server.session().encrypted_from, Some(2));
}

#[test]
fn ehlo_reply_without_text() {
    let server = FakeServer::start("220 fake.example.org\r\n", &[("EHLO", "250\r\n")]);
    let transport = builder(&server).build();

    send(&transport, &["b@y.com"]).unwrap();

    let session = server.session();
    assert!(!session.sent("HELO"));
    // No extension is known
    assert_eq!(session.lines[1], "MAIL FROM:<a@x.com>");
}

#[test]
fn malformed_reply() {
    let server = FakeServer::start(
        "220 fake.example.org\r\n",
        &[("MAIL", "hello there\r\n")],
    );
    let transport = builder(&server).build();

    let err = send(&transport, &["b@y.com"]).unwrap_err();
    assert!(err.is_protocol());

    let session = server.session();
    assert!(session.closed);
    assert!(!session.sent("RSET"));
}

#[test]
fn connection_refused() {
    // Grab a free port then release it
    let port = TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let transport = SmtpTransport::builder_dangerous("127.0.0.1")
        .port(port)
        .timeout(Some(Duration::from_secs(5)))
        .build();

    let err = send(&transport, &["b@y.com"]).unwrap_err();
    assert!(err.is_connection());
    assert!(err.status().is_none());
}
