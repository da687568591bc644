use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use hmac::Hmac;
use pbkdf2::pbkdf2;
use rand::Rng;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

const ITERATIONS: u32 = 260000;
const KEY_LENGTH: usize = 32;
const SALT_LENGTH: usize = 16;

#[derive(Debug, Error, PartialEq)]
pub enum PasswordError {
    #[error("Invalid hash format")]
    InvalidFormat,
    #[error("Unsupported hash algorithm: {0}")]
    UnsupportedAlgorithm(String),
    #[error("PBKDF2 failure")]
    Derivation,
}

/// Hash un mot de passe au format Werkzeug : pbkdf2:sha256:iterations$salt$hash
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    hash_password_with(password, ITERATIONS)
}

pub(crate) fn hash_password_with(password: &str, iterations: u32) -> Result<String, PasswordError> {
    // Salt aléatoire de 16 bytes
    let mut salt = [0u8; SALT_LENGTH];
    rand::thread_rng().fill(&mut salt);

    let mut key = [0u8; KEY_LENGTH];
    pbkdf2::<HmacSha256>(password.as_bytes(), &salt, iterations, &mut key)
        .map_err(|_| PasswordError::Derivation)?;

    Ok(format!(
        "pbkdf2:sha256:{}${}${}",
        iterations,
        URL_SAFE_NO_PAD.encode(salt),
        URL_SAFE_NO_PAD.encode(key)
    ))
}

/// Vérifie un mot de passe contre un hash stocké.
/// Le hash peut être encodé en base64 URL-safe (nouveau) ou en hexadécimal (ancien format).
pub fn verify_password(password: &str, stored_hash: &str) -> Result<bool, PasswordError> {
    let mut parts = stored_hash.split('$');
    let (Some(header), Some(salt_str), Some(hash_str), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(PasswordError::InvalidFormat);
    };

    let header_parts: Vec<&str> = header.split(':').collect();
    if header_parts.len() != 3 || header_parts[0] != "pbkdf2" {
        return Err(PasswordError::InvalidFormat);
    }
    if header_parts[1] != "sha256" {
        return Err(PasswordError::UnsupportedAlgorithm(header_parts[1].to_string()));
    }

    let iterations = header_parts[2]
        .parse::<u32>()
        .map_err(|_| PasswordError::InvalidFormat)?;

    let salt = decode(salt_str)?;
    let expected = decode(hash_str)?;
    if expected.is_empty() {
        return Err(PasswordError::InvalidFormat);
    }

    let mut computed = vec![0u8; expected.len()];
    pbkdf2::<HmacSha256>(password.as_bytes(), &salt, iterations, &mut computed)
        .map_err(|_| PasswordError::Derivation)?;

    Ok(computed.ct_eq(&expected).into())
}

fn decode(input: &str) -> Result<Vec<u8>, PasswordError> {
    // 64 caractères hexadécimaux = 32 bytes (hash Werkzeug historique)
    if input.len() == 64 && input.chars().all(|c| c.is_ascii_hexdigit()) {
        return hex::decode(input).map_err(|_| PasswordError::InvalidFormat);
    }
    URL_SAFE_NO_PAD
        .decode(input.trim_end_matches('='))
        .map_err(|_| PasswordError::InvalidFormat)
}
