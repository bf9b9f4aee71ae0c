use std::{
    fmt::{self, Display, Formatter},
    mem,
};

use base64::{engine::general_purpose::STANDARD, Engine};

/// Maximum line length allowed by RFC 5322, without the trailing CRLF
const MAX_LINE_LENGTH: usize = 998;
/// Line length used when wrapping base64 output
const BASE64_LINE_LENGTH: usize = 76;

/// `Content-Transfer-Encoding` of the text part
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentTransferEncoding {
    /// ASCII only, short lines
    SevenBit,
    /// Anything else
    Base64,
}

impl Display for ContentTransferEncoding {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::SevenBit => "7bit",
            Self::Base64 => "base64",
        })
    }
}

/// A text body, encoded and ready to be written after its part headers
#[derive(Debug, Clone)]
pub(crate) struct Body {
    buf: String,
    encoding: ContentTransferEncoding,
}

impl Body {
    /// Normalises line endings to CRLF and picks the encoding
    pub(crate) fn new(text: &str) -> Self {
        let mut text = text.to_owned();
        in_place_crlf_line_endings(&mut text);

        if is_seven_bit(&text) {
            Self {
                buf: text,
                encoding: ContentTransferEncoding::SevenBit,
            }
        } else {
            Self {
                buf: wrap_base64(&STANDARD.encode(text.as_bytes())),
                encoding: ContentTransferEncoding::Base64,
            }
        }
    }

    pub(crate) fn encoding(&self) -> ContentTransferEncoding {
        self.encoding
    }

    /// `charset` parameter of the `Content-Type` header
    pub(crate) fn charset(&self) -> &'static str {
        match self.encoding {
            ContentTransferEncoding::SevenBit => "us-ascii",
            ContentTransferEncoding::Base64 => "utf-8",
        }
    }

    pub(crate) fn as_str(&self) -> &str {
        &self.buf
    }
}

fn is_seven_bit(text: &str) -> bool {
    let bytes = text.as_bytes();
    let well_formed = bytes.iter().enumerate().all(|(i, &b)| match b {
        0 => false,
        b'\r' => bytes.get(i + 1) == Some(&b'\n'),
        b'\n' => i > 0 && bytes[i - 1] == b'\r',
        b => b.is_ascii(),
    });

    well_formed
        && text
            .split("\r\n")
            .all(|line| line.len() <= MAX_LINE_LENGTH)
}

fn wrap_base64(encoded: &str) -> String {
    let mut wrapped = String::with_capacity(encoded.len() + 2 * (encoded.len() / BASE64_LINE_LENGTH));
    for (i, c) in encoded.chars().enumerate() {
        if i > 0 && i % BASE64_LINE_LENGTH == 0 {
            wrapped.push_str("\r\n");
        }
        wrapped.push(c);
    }
    wrapped
}

/// In place conversion to CRLF line endings
fn in_place_crlf_line_endings(string: &mut String) {
    let indices = find_all_lf_char_indices(string);

    for i in indices {
        // this relies on `indices` being in reverse order
        string.insert(i, '\r');
    }
}

/// Find indices to all places where `\r` should be inserted
/// in order to make `s` have CRLF line endings
///
/// The list is reversed, which is more efficient.
fn find_all_lf_char_indices(s: &str) -> Vec<usize> {
    let mut indices = Vec::new();

    let mut found_lf = false;
    for (i, c) in s.char_indices().rev() {
        if mem::take(&mut found_lf) && c != '\r' {
            // the previous character was `\n`, but this isn't a `\r`
            indices.push(i + c.len_utf8());
        }

        found_lf = c == '\n';
    }

    if found_lf {
        // the first character is `\n`
        indices.push(0);
    }

    indices
}
