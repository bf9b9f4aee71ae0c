use crate::message::Error;

/// Simple email envelope representation
///
/// Addresses are kept verbatim; the server is the judge of their validity.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Envelope {
    /// The envelope recipients' addresses
    ///
    /// This can not be empty.
    forward_path: Vec<String>,
    /// The envelope sender address
    reverse_path: String,
}

impl Envelope {
    /// Creates a new envelope, which may fail if `to` is empty.
    ///
    /// ```
    /// # use textmail::Envelope;
    /// let envelope = Envelope::new("from@email.com", vec!["to@email.com".to_owned()]).unwrap();
    /// assert_eq!(envelope.from(), "from@email.com");
    /// ```
    pub fn new<S: Into<String>>(from: S, to: Vec<String>) -> Result<Envelope, Error> {
        if to.is_empty() {
            return Err(Error::MissingTo);
        }
        Ok(Envelope {
            forward_path: to,
            reverse_path: from.into(),
        })
    }

    /// Builds an envelope from the value of a `To` header, splitting it on
    /// [`RECIPIENT_SEPARATOR`](super::RECIPIENT_SEPARATOR)
    pub fn from_header<S: Into<String>>(from: S, to_header: &str) -> Result<Envelope, Error> {
        let to = to_header
            .split(super::RECIPIENT_SEPARATOR)
            .filter(|address| !address.is_empty())
            .map(str::to_owned)
            .collect();
        Self::new(from, to)
    }

    /// Gets the destination addresses of the envelope.
    pub fn to(&self) -> &[String] {
        self.forward_path.as_slice()
    }

    /// Gets the sender of the envelope.
    pub fn from(&self) -> &str {
        &self.reverse_path
    }

    /// Whether any address of the envelope needs `SMTPUTF8`
    pub(crate) fn has_non_ascii_addresses(&self) -> bool {
        !self.reverse_path.is_ascii() || self.forward_path.iter().any(|a| !a.is_ascii())
    }
}
