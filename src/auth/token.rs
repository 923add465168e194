use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use jsonwebtoken::{
    decode, decode_header, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header,
    Validation,
};
use thiserror::Error;

use super::Claims;

/// Seconds of clock skew tolerated on `exp`/`nbf`.
const LEEWAY_SECS: u64 = 30;

/// Why a token was rejected. Callers only ever see "invalid token"; the variant is for logs.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,

    #[error("token algorithm {found} does not match expected {expected:?}")]
    AlgorithmMismatch { expected: Algorithm, found: String },

    #[error("token signature mismatch")]
    SignatureMismatch,

    #[error("token expired")]
    Expired,

    #[error("token not yet valid")]
    NotYetValid,

    #[error("token secret not configured")]
    MissingSecret,

    #[error("algorithm {0:?} is not an HMAC algorithm")]
    UnsupportedAlgorithm(Algorithm),

    #[error("token generation error: {0}")]
    Encoding(String),
}

impl TokenError {
    /// Short label for structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            TokenError::Malformed => "malformed",
            TokenError::AlgorithmMismatch { .. } => "algorithm_mismatch",
            TokenError::SignatureMismatch => "signature_mismatch",
            TokenError::Expired => "expired",
            TokenError::NotYetValid => "not_yet_valid",
            TokenError::MissingSecret => "missing_secret",
            TokenError::UnsupportedAlgorithm(_) => "unsupported_algorithm",
            TokenError::Encoding(_) => "encoding",
        }
    }
}

fn is_hmac(algorithm: Algorithm) -> bool {
    matches!(algorithm, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512)
}

/// Verifies compact HMAC-signed tokens against one server-held secret and one algorithm.
#[derive(Clone)]
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
    algorithm: Algorithm,
}

impl std::fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenVerifier")
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

impl TokenVerifier {
    pub fn new(secret: &str, algorithm: Algorithm) -> Result<Self, TokenError> {
        if secret.is_empty() {
            return Err(TokenError::MissingSecret);
        }
        if !is_hmac(algorithm) {
            return Err(TokenError::UnsupportedAlgorithm(algorithm));
        }

        let mut validation = Validation::new(algorithm);
        validation.leeway = LEEWAY_SECS;
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.validate_aud = false;

        Ok(Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            algorithm,
        })
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        // Check the declared algorithm before touching the signature so a token can never
        // choose how it is verified.
        let header = decode_header(token).map_err(|_| self.classify_header(token))?;
        if header.alg != self.algorithm {
            return Err(TokenError::AlgorithmMismatch {
                expected: self.algorithm,
                found: format!("{:?}", header.alg),
            });
        }

        let data = decode::<Claims>(token, &self.key, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::InvalidSignature => TokenError::SignatureMismatch,
                ErrorKind::ExpiredSignature => TokenError::Expired,
                ErrorKind::ImmatureSignature => TokenError::NotYetValid,
                ErrorKind::InvalidAlgorithm => TokenError::AlgorithmMismatch {
                    expected: self.algorithm,
                    found: format!("{:?}", header.alg),
                },
                _ => TokenError::Malformed,
            }
        })?;

        Ok(data.claims)
    }
}

impl TokenVerifier {
    // A header that decodes to JSON with an `alg` the library does not know (`none`, `RS1`)
    // is an algorithm mismatch; anything else is malformed.
    fn classify_header(&self, token: &str) -> TokenError {
        let alg = token
            .split('.')
            .next()
            .and_then(|segment| URL_SAFE_NO_PAD.decode(segment).ok())
            .and_then(|bytes| serde_json::from_slice::<serde_json::Value>(&bytes).ok())
            .and_then(|header| header.get("alg").and_then(|v| v.as_str()).map(str::to_string));

        match alg {
            Some(found) => TokenError::AlgorithmMismatch {
                expected: self.algorithm,
                found,
            },
            None => TokenError::Malformed,
        }
    }
}

/// One-shot verification with the default algorithm (HS256).
pub fn verify(token: &str, secret: &str) -> Result<Claims, TokenError> {
    TokenVerifier::new(secret, Algorithm::HS256)?.verify(token)
}

/// Sign `claims` with `secret`.
pub fn generate_token(claims: &Claims, secret: &str, algorithm: Algorithm) -> Result<String, TokenError> {
    if secret.is_empty() {
        return Err(TokenError::MissingSecret);
    }
    if !is_hmac(algorithm) {
        return Err(TokenError::UnsupportedAlgorithm(algorithm));
    }

    let encoding_key = EncodingKey::from_secret(secret.as_bytes());
    encode(&Header::new(algorithm), claims, &encoding_key)
        .map_err(|e| TokenError::Encoding(e.to_string()))
}
