//! SQL identifier rules shared by the catalog and the query compiler.
//!
//! Only plain ASCII names are accepted anywhere in Quarry: letters, digits
//! and underscore, at most 64 characters (the MySQL identifier limit). Names
//! outside this set are never quoted, echoed or looked up.

/// Maximum identifier length accepted by MySQL.
pub const MAX_IDENTIFIER_LEN: usize = 64;

/// Returns true when `name` is a bare identifier Quarry will handle.
pub fn is_valid_identifier(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_IDENTIFIER_LEN
        && name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

/// Backtick-quote an identifier that already passed [`is_valid_identifier`].
///
/// The charset check leaves no backticks to escape.
pub fn quote_identifier(name: &str) -> String {
    debug_assert!(is_valid_identifier(name));
    format!("`{name}`")
}

/// Render a caller-supplied name for an error message. Names outside the
/// identifier charset are replaced so raw input never reaches the caller or logs.
pub fn display_identifier(name: &str) -> &str {
    if is_valid_identifier(name) {
        name
    } else {
        "<invalid identifier>"
    }
}
