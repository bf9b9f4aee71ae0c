//! A scripted SMTP server on a local port, one connection per server

#![allow(dead_code)]

use std::{
    io::{BufRead, BufReader, Read, Write},
    net::{SocketAddr, TcpListener},
    thread::{self, JoinHandle},
    time::Duration,
};

use native_tls::{Identity, TlsAcceptor};

const COMMANDS: &[&str] = &[
    "EHLO", "HELO", "STARTTLS", "AUTH", "MAIL", "RCPT", "DATA", ".", "RSET", "QUIT",
];

/// What the client said, and whether it hung up
#[derive(Debug)]
pub struct Session {
    /// Every line received, without the CRLF, message content included
    pub lines: Vec<String>,
    /// The client closed the connection (as opposed to the server timing out)
    pub closed: bool,
    /// Index of the first line received over TLS
    pub encrypted_from: Option<usize>,
}

impl Session {
    /// Position of the first line starting with `prefix`
    pub fn position(&self, prefix: &str) -> Option<usize> {
        self.lines.iter().position(|line| line.starts_with(prefix))
    }

    /// Whether some line starts with `prefix`
    pub fn sent(&self, prefix: &str) -> bool {
        self.position(prefix).is_some()
    }
}

pub struct FakeServer {
    pub addr: SocketAddr,
    handle: JoinHandle<Session>,
}

impl FakeServer {
    /// Answers with `banner`, then with the first matching entry of `replies`
    /// for each command (consumed once used), falling back to a well-behaved
    /// server. The key `*` matches lines that aren't commands, like `AUTH LOGIN`
    /// answers.
    pub fn start(banner: &'static str, replies: &[(&'static str, &'static str)]) -> Self {
        Self::spawn(banner, replies, None)
    }

    /// Like [`FakeServer::start`], and runs the TLS handshake as `localhost`
    /// after a `220` reply to `STARTTLS`
    pub fn start_tls(banner: &'static str, replies: &[(&'static str, &'static str)]) -> Self {
        let identity = Identity::from_pkcs8(
            include_bytes!("../certs/localhost.crt"),
            include_bytes!("../certs/localhost.key"),
        )
        .unwrap();
        let acceptor = TlsAcceptor::new(identity).unwrap();
        Self::spawn(banner, replies, Some(acceptor))
    }

    fn spawn(
        banner: &'static str,
        replies: &[(&'static str, &'static str)],
        acceptor: Option<TlsAcceptor>,
    ) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let mut replies = replies.to_vec();

        let handle = thread::spawn(move || {
            let (tcp, _) = listener.accept().unwrap();
            tcp.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
            let plain: Box<dyn Stream> = Box::new(tcp.try_clone().unwrap());
            let mut stream = BufReader::new(plain);

            stream.get_mut().write_all(banner.as_bytes()).unwrap();

            let mut lines = Vec::new();
            let mut encrypted_from = None;
            let mut in_data = false;
            let closed = loop {
                let mut line = String::new();
                match stream.read_line(&mut line) {
                    Ok(0) => break true,
                    Ok(_) => {}
                    Err(_) => break false,
                }
                let line = line.trim_end_matches("\r\n").to_owned();
                lines.push(line.clone());

                let verb = if in_data {
                    if line != "." {
                        continue;
                    }
                    in_data = false;
                    ".".to_owned()
                } else {
                    line.split([' ', ':']).next().unwrap_or_default().to_ascii_uppercase()
                };

                let reply = take_reply(&mut replies, &verb);
                if verb == "DATA" && reply.starts_with("354") {
                    in_data = true;
                }
                // The client may already be gone
                let _ = stream.get_mut().write_all(reply.as_bytes());

                if verb == "STARTTLS" && reply.starts_with("220") {
                    if let Some(acceptor) = &acceptor {
                        match acceptor.accept(tcp.try_clone().unwrap()) {
                            Ok(tls) => {
                                let tls: Box<dyn Stream> = Box::new(tls);
                                stream = BufReader::new(tls);
                                encrypted_from = Some(lines.len());
                            }
                            Err(_) => break false,
                        }
                    }
                }
            };

            Session {
                lines,
                closed,
                encrypted_from,
            }
        });

        FakeServer { addr, handle }
    }

    /// A server that behaves
    pub fn well_behaved() -> Self {
        Self::start("220 fake.example.org ESMTP ready\r\n", &[])
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Waits for the client to hang up
    pub fn session(self) -> Session {
        self.handle.join().unwrap()
    }
}

trait Stream: Read + Write + Send {}

impl<T: Read + Write + Send> Stream for T {}

fn take_reply(replies: &mut Vec<(&'static str, &'static str)>, verb: &str) -> &'static str {
    let is_command = COMMANDS.contains(&verb);
    let found = replies
        .iter()
        .position(|(key, _)| *key == verb || (*key == "*" && !is_command));
    if let Some(index) = found {
        return replies.remove(index).1;
    }

    match verb {
        "EHLO" => "250-fake.example.org\r\n250-SIZE 1000000\r\n250-8BITMIME\r\n250 AUTH PLAIN LOGIN\r\n",
        "HELO" => "250 fake.example.org\r\n",
        "STARTTLS" => "220 2.0.0 Ready to start TLS\r\n",
        "AUTH" => "235 2.7.0 Authentication successful\r\n",
        "MAIL" | "RCPT" | "RSET" => "250 2.1.0 Ok\r\n",
        "DATA" => "354 End data with <CR><LF>.<CR><LF>\r\n",
        "." => "250 2.0.0 Ok: queued\r\n",
        "QUIT" => "221 2.0.0 Bye\r\n",
        _ => "502 5.5.2 Command not recognized\r\n",
    }
}
