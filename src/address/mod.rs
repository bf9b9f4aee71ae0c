//! Email addresses as seen by the SMTP envelope

mod envelope;

pub use self::envelope::Envelope;

/// Separator used to join several recipients into one `To` header value
pub const RECIPIENT_SEPARATOR: &str = ", ";
