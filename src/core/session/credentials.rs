// src/core/session/credentials.rs

//! Login/password validation and password digests.

use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 of the UTF-8 password.
pub fn hash_password(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

/// Compares the digest of `password` against a stored hex digest, ignoring case.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    hash_password(password).eq_ignore_ascii_case(stored_hash)
}

/// True for characters in the basic Russian alphabet (А..я, Ё, ё).
fn is_cyrillic(c: char) -> bool {
    matches!(c, '\u{0410}'..='\u{044F}' | 'Ё' | 'ё')
}

pub fn contains_cyrillic(text: &str) -> bool {
    text.chars().any(is_cyrillic)
}

/// Logins are limited to ASCII letters, digits, `-` and `_`.
pub fn is_valid_login(login: &str) -> bool {
    login
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// The checks shared by `reg` and `auth`. Empty values are rejected too.
pub fn is_acceptable(login: &str, password: &str) -> bool {
    if login.is_empty() || password.is_empty() {
        return false;
    }
    if login.contains(char::is_whitespace) || password.contains(char::is_whitespace) {
        return false;
    }
    if contains_cyrillic(login) || contains_cyrillic(password) {
        return false;
    }
    is_valid_login(login)
}
