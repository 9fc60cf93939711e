use std::fmt;

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;
use uuid::Uuid;
use zeroize::Zeroizing;

type HmacSha256 = Hmac<Sha256>;

/// Number of hex characters of the HMAC tag kept in a ticket code.
pub const TAG_HEX_LEN: usize = 16;

const SEPARATOR: char = ':';

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodeError {
    #[error("ticket code is malformed")]
    MalformedCode,

    #[error("ticket code signature does not match")]
    SignatureMismatch,

    #[error("shared secret rejected: {0}")]
    InvalidKey(String),
}

/// Application-wide key used to sign ticket codes.
#[derive(Clone)]
pub struct SharedSecret(Zeroizing<Vec<u8>>);

impl SharedSecret {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(Zeroizing::new(bytes.into()))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SharedSecret(<redacted>)")
    }
}

impl From<&str> for SharedSecret {
    fn from(value: &str) -> Self {
        Self::new(value.as_bytes())
    }
}

impl From<String> for SharedSecret {
    fn from(value: String) -> Self {
        Self::new(value.into_bytes())
    }
}

/// Splits a code into its uuid and tag parts without checking the signature.
///
/// Exactly one separator and two non-empty parts are accepted, and the first
/// part has to be a UUID. Devices without the shared secret use this to
/// reject garbage before looking anything up.
pub fn parse(code: &str) -> Result<(Uuid, &str), CodeError> {
    let (uuid_part, tag) = split(code)?;
    let uuid = Uuid::try_parse(uuid_part).map_err(|_| CodeError::MalformedCode)?;
    Ok((uuid, tag))
}

fn split(code: &str) -> Result<(&str, &str), CodeError> {
    let (uuid_part, tag) = code.split_once(SEPARATOR).ok_or(CodeError::MalformedCode)?;
    if uuid_part.is_empty() || tag.is_empty() || tag.contains(SEPARATOR) {
        return Err(CodeError::MalformedCode);
    }
    Ok((uuid_part, tag))
}

/// Constant-time equality over two codes or tags.
pub fn codes_match(expected: &str, supplied: &str) -> bool {
    expected.as_bytes().ct_eq(supplied.as_bytes()).into()
}

#[derive(Debug, Clone)]
pub struct TicketCodec {
    secret: SharedSecret,
}

impl TicketCodec {
    pub fn new(secret: SharedSecret) -> Self {
        Self { secret }
    }

    /// Builds the `"{uuid}:{tag}"` code printed on a ticket.
    pub fn generate(&self, ticket_uuid: &Uuid) -> Result<String, CodeError> {
        let uuid = ticket_uuid.to_string();
        let tag = self.tag_for(&uuid)?;
        Ok(format!("{uuid}{SEPARATOR}{tag}"))
    }

    /// Checks the tag of a scanned code and returns the ticket uuid it carries.
    ///
    /// A valid signature only proves the code was issued here. The uuid still
    /// has to resolve to an admissible ticket.
    pub fn verify(&self, code: &str) -> Result<Uuid, CodeError> {
        let (uuid_part, supplied_tag) = split(code)?;
        let uuid = Uuid::try_parse(uuid_part).map_err(|_| CodeError::MalformedCode)?;
        let expected_tag = self.tag_for(uuid_part)?;
        if codes_match(&expected_tag, supplied_tag) {
            Ok(uuid)
        } else {
            Err(CodeError::SignatureMismatch)
        }
    }

    fn tag_for(&self, uuid: &str) -> Result<String, CodeError> {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|e| CodeError::InvalidKey(e.to_string()))?;
        mac.update(uuid.as_bytes());
        let mut tag = hex::encode(mac.finalize().into_bytes());
        tag.truncate(TAG_HEX_LEN);
        Ok(tag)
    }
}
