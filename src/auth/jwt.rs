/// JWT Token Encoding and Decoding
///
/// Signs claims with a private key and verifies them with the matching public
/// key. Built once at startup and shared read-only across requests.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use std::str::FromStr;

use crate::auth::claims::Claims;
use crate::configuration::JwtSettings;
use crate::error::{AppError, AuthError, ConfigError};

#[derive(Clone)]
pub struct TokenCodec {
    algorithm: Algorithm,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

enum KeyFamily {
    Rsa,
    Ec,
    Ed,
}

fn key_family(algorithm: Algorithm) -> Result<KeyFamily, ConfigError> {
    match algorithm {
        Algorithm::RS256
        | Algorithm::RS384
        | Algorithm::RS512
        | Algorithm::PS256
        | Algorithm::PS384
        | Algorithm::PS512 => Ok(KeyFamily::Rsa),
        Algorithm::ES256 | Algorithm::ES384 => Ok(KeyFamily::Ec),
        Algorithm::EdDSA => Ok(KeyFamily::Ed),
        Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => Err(ConfigError::InvalidValue(
            format!("{:?} is symmetric; an asymmetric algorithm is required", algorithm),
        )),
    }
}

impl TokenCodec {
    /// Load the key pair named in `settings` from disk.
    ///
    /// # Errors
    /// Returns a config error if the algorithm is unknown or symmetric, or if
    /// either key file is missing or not a valid PEM for that algorithm.
    pub fn from_settings(settings: &JwtSettings) -> Result<Self, AppError> {
        let private_pem = std::fs::read(&settings.private_key_path).map_err(|e| {
            ConfigError::KeyMaterial(format!("{}: {}", settings.private_key_path, e))
        })?;
        let public_pem = std::fs::read(&settings.public_key_path).map_err(|e| {
            ConfigError::KeyMaterial(format!("{}: {}", settings.public_key_path, e))
        })?;

        Self::from_pem(&settings.algorithm, &private_pem, &public_pem)
    }

    pub fn from_pem(algorithm: &str, private_pem: &[u8], public_pem: &[u8]) -> Result<Self, AppError> {
        let algorithm = Algorithm::from_str(algorithm)
            .map_err(|_| ConfigError::InvalidValue(format!("unknown JWT algorithm '{}'", algorithm)))?;

        let key_error = |which: &str, e: jsonwebtoken::errors::Error| {
            ConfigError::KeyMaterial(format!("{} key: {}", which, e))
        };

        let (encoding_key, decoding_key) = match key_family(algorithm)? {
            KeyFamily::Rsa => (
                EncodingKey::from_rsa_pem(private_pem).map_err(|e| key_error("private", e))?,
                DecodingKey::from_rsa_pem(public_pem).map_err(|e| key_error("public", e))?,
            ),
            KeyFamily::Ec => (
                EncodingKey::from_ec_pem(private_pem).map_err(|e| key_error("private", e))?,
                DecodingKey::from_ec_pem(public_pem).map_err(|e| key_error("public", e))?,
            ),
            KeyFamily::Ed => (
                EncodingKey::from_ed_pem(private_pem).map_err(|e| key_error("private", e))?,
                DecodingKey::from_ed_pem(public_pem).map_err(|e| key_error("public", e))?,
            ),
        };

        // Expiry and token type are judged by the session layer, not here.
        let mut validation = Validation::new(algorithm);
        validation.validate_exp = false;

        Ok(Self {
            algorithm,
            encoding_key,
            decoding_key,
            validation,
        })
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Sign `claims` into a compact JWT.
    ///
    /// # Errors
    /// Only fails if the key material cannot sign, which `from_pem` already rules out.
    pub fn encode(&self, claims: &Claims) -> Result<String, AppError> {
        encode(&Header::new(self.algorithm), claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))
    }

    /// Verify the signature and parse the claim set.
    ///
    /// # Errors
    /// `AuthError::TokenInvalid` for a bad signature, malformed encoding, a
    /// different algorithm, or a payload that is not a `Claims`.
    pub fn decode(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::warn!("JWT validation error: {}", e);
                AuthError::TokenInvalid
            })
    }
}
