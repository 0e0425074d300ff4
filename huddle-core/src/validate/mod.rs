//! String validation predicates shared by the server and client.
//!
//! Everything that crosses the wire is checked against these contracts
//! before it is allowed to touch the store or the session state:
//!
//! - names (groups, nicknames, topics): printable ASCII, no newline, <= 40
//! - message bodies: printable ASCII plus newline, <= 400
//! - password hashes: exactly 64 hexadecimal characters

/// Maximum length of a name (group, nickname, topic).
pub const MAX_NAME_LENGTH: usize = 40;

/// Maximum length of a message body.
pub const MAX_MESSAGE_LENGTH: usize = 400;

/// Length of a hex-encoded SHA-256 digest.
pub const PASSWORD_HASH_LENGTH: usize = 64;

fn is_printable_ascii(c: char) -> bool {
    matches!(c, ' '..='~')
}

/// Checks that a string contains only printable ASCII and newlines.
///
/// This is the weakest contract: any length, newlines allowed. Group
/// provisioning applies it to raw names and passwords before they are
/// validated further.
pub fn is_safe_text(s: &str) -> bool {
    s.chars().all(|c| is_printable_ascii(c) || c == '\n')
}

/// Checks that a string is a well-formed name: printable ASCII, no
/// newlines, at most [`MAX_NAME_LENGTH`] bytes.
pub fn is_valid_name(s: &str) -> bool {
    s.len() <= MAX_NAME_LENGTH && s.chars().all(is_printable_ascii)
}

/// Checks that a string is a well-formed message body: printable ASCII
/// with newlines allowed, at most [`MAX_MESSAGE_LENGTH`] bytes.
pub fn is_valid_message(s: &str) -> bool {
    s.len() <= MAX_MESSAGE_LENGTH && is_safe_text(s)
}

/// Checks that a string has the shape of a hex-encoded SHA-256 digest:
/// exactly [`PASSWORD_HASH_LENGTH`] hexadecimal characters.
pub fn is_valid_password_hash(s: &str) -> bool {
    s.len() == PASSWORD_HASH_LENGTH && s.chars().all(|c| c.is_ascii_hexdigit())
}
