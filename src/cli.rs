//! Command line front end of the `textmail` binary
//!
//! Flags are parsed into [`Cli`], checked into a [`Request`], and every
//! outcome is reported as a single line of text.

use std::{
    io::{self, Write},
    path::PathBuf,
    process::ExitCode,
    time::Duration,
};

use clap::{ArgAction, Args, Parser};
use thiserror::Error;

use crate::{
    message,
    transport::smtp::{self, authentication::Credentials, error::Kind},
    Message, SmtpTransport, Transport, DEFAULT_SERVER, SUBMISSION_PORT,
};

/// Send a plain-text file as an email over SMTP
#[derive(Debug, Parser)]
#[command(name = "textmail", version, about, long_about = None)]
pub struct Cli {
    /// Text file holding the message body
    #[arg(short, long, value_name = "FILE")]
    pub message: Option<PathBuf>,

    /// Subject of the email
    #[arg(short, long, default_value = "No Subject")]
    pub subject: String,

    /// Sender address
    #[arg(short, long, value_name = "ADDR")]
    pub from: Option<String>,

    /// Recipient address
    #[arg(short, long, value_name = "ADDR")]
    pub to: Option<String>,

    #[command(flatten)]
    pub smtp: SmtpArgs,

    /// Log the SMTP dialogue on stderr (-vv for more)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

/// Where and how to connect
#[derive(Debug, Clone, Args)]
#[command(next_help_heading = "SMTP server")]
pub struct SmtpArgs {
    /// Username for the login on the server
    #[arg(short, long)]
    pub user: Option<String>,

    /// Password for the login on the server
    #[arg(short, long)]
    pub password: Option<String>,

    /// Server host name
    #[arg(long, value_name = "HOST", default_value = DEFAULT_SERVER)]
    pub server: String,

    /// Server port
    #[arg(long, default_value_t = SUBMISSION_PORT)]
    pub port: u16,

    /// Network timeout, none if not set
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,
}

impl SmtpArgs {
    /// A STARTTLS transport to the server, logging in only when both the
    /// user and the password are set
    pub fn transport(&self) -> Result<SmtpTransport, smtp::Error> {
        let mut builder = SmtpTransport::starttls_relay(&self.server)?
            .port(self.port)
            .timeout(self.timeout.map(Duration::from_secs));

        if let Some(credentials) =
            Credentials::from_parts(self.user.as_deref(), self.password.as_deref())
        {
            builder = builder.credentials(credentials);
        }
        Ok(builder.build())
    }

    fn relay(&self) -> String {
        format!("{}:{}", self.server, self.port)
    }
}

/// A checked invocation: every required flag is present and non-empty
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Text file holding the message body
    pub path: PathBuf,
    /// Subject of the email
    pub subject: String,
    /// Sender address
    pub from: String,
    /// Recipient address
    pub to: String,
    /// `host:port` of the server, for messages
    pub relay: String,
}

impl Cli {
    /// Checks the required flags without touching the file or the network
    pub fn request(&self) -> Result<Request, Failure> {
        let non_empty = |value: Option<&str>| value.filter(|v| !v.is_empty()).map(str::to_owned);

        let path = self
            .message
            .clone()
            .filter(|path| !path.as_os_str().is_empty());
        let subject = non_empty(Some(self.subject.as_str()));
        let from = non_empty(self.from.as_deref());
        let to = non_empty(self.to.as_deref());

        match (path, subject, from, to) {
            (Some(path), Some(subject), Some(from), Some(to)) => Ok(Request {
                path,
                subject,
                from,
                to,
                relay: self.smtp.relay(),
            }),
            _ => Err(Failure::MissingFields),
        }
    }
}

/// Everything that stops a message from being sent, one line each
#[derive(Debug, Error)]
pub enum Failure {
    /// A required flag is missing or empty
    #[error("Sender, Subject, Filename & Recipient must be set!")]
    MissingFields,
    /// The message could not be built
    #[error("{}", describe_message(.0))]
    Message(#[from] message::Error),
    /// The server conversation failed
    #[error("{}", describe_smtp(.source, .relay))]
    Smtp {
        /// What went wrong
        source: smtp::Error,
        /// `host:port` of the server
        relay: String,
    },
    /// Progress could not be written out
    #[error("Can't write to the output: {0}")]
    Output(#[from] io::Error),
}

fn describe_message(err: &message::Error) -> String {
    if err.is_file() {
        err.to_string()
    } else {
        format!("Invalid message headers: {err}")
    }
}

fn describe_smtp(err: &smtp::Error, relay: &str) -> String {
    match err.kind() {
        Kind::Greeting => {
            "SMTP Server Error: the server didn't reply properly to the 'hello' greeting".to_owned()
        }
        Kind::Authentication => {
            "SMTP Server Error: the server didn't accept the username/password combination."
                .to_owned()
        }
        Kind::RecipientsRefused => "The server rejected ALL recipients (no mail was sent)".to_owned(),
        Kind::SenderRefused => "The server didn't accept the from address.".to_owned(),
        Kind::Data => {
            "The server replied with an unexpected error code (other than a refusal of a recipient)."
                .to_owned()
        }
        Kind::Protocol => "SMTP Server Error: no suitable authentication method was found".to_owned(),
        Kind::Connection => format!("SMTP Server Error: couldn't communicate with {relay}"),
    }
}

/// Builds the message and hands it to `transport`, printing progress to `out`
pub fn deliver<T, W>(request: &Request, transport: &T, out: &mut W) -> Result<(), Failure>
where
    T: Transport<Error = smtp::Error>,
    W: Write,
{
    writeln!(out, "Preparing Message...")?;
    let message = Message::from_file(
        &request.from,
        &request.subject,
        &request.path,
        &[request.to.as_str()],
    )?;

    writeln!(out, "Sending...")?;
    transport.send(&message).map_err(|source| Failure::Smtp {
        source,
        relay: request.relay.clone(),
    })?;

    writeln!(out, "Message Sent!")?;
    Ok(())
}

/// Runs the whole invocation against the configured server
pub fn run<W: Write>(cli: &Cli, out: &mut W) -> Result<(), Failure> {
    let request = cli.request()?;
    let transport = cli.smtp.transport().map_err(|source| Failure::Smtp {
        source,
        relay: request.relay.clone(),
    })?;

    #[cfg(feature = "tracing")]
    tracing::debug!(relay = %request.relay, path = %request.path.display(), "sending");
    deliver(&request, &transport, out)
}

/// Prints the failure line, if any, and picks the exit status
pub fn report<W: Write>(result: Result<(), Failure>, out: &mut W) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(failure) => {
            let _ = writeln!(out, "{failure}");
            ExitCode::FAILURE
        }
    }
}
