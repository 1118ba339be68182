use base64::{URL_SAFE_NO_PAD, decode_config, encode_config};
use jwt_simple::algorithms::ECDSAP256KeyPairLike;
use jwt_simple::prelude::{Claims, Duration as JwtDuration, ES256KeyPair};
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};

use crate::types::push::VapidConfig;

const PUBLIC_KEY_LENGTH: usize = 65;
const PRIVATE_KEY_LENGTH: usize = 32;
const UNCOMPRESSED_POINT_TAG: u8 = 0x04;
const ASSERTION_TTL_HOURS: u64 = 12;

pub struct VapidKeys {
    key_pair: ES256KeyPair,
    public_key: Vec<u8>,
    public_key_b64: String,
    subject: String,
}

#[derive(Debug)]
pub enum VapidKeyError {
    InvalidSubject,
    PublicKeyEncoding,
    PublicKeyLength(usize),
    PublicKeyTag(u8),
    PrivateKeyEncoding,
    PrivateKeyLength(usize),
    PrivateKeyScalar,
    KeyMismatch,
}

impl std::fmt::Display for VapidKeyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VapidKeyError::InvalidSubject => {
                f.write_str("VAPID subject must be a mailto: or https: URI")
            }
            VapidKeyError::PublicKeyEncoding => {
                f.write_str("VAPID public key is not base64url without padding")
            }
            VapidKeyError::PublicKeyLength(len) => {
                write!(f, "VAPID public key must decode to 65 bytes, got {len}")
            }
            VapidKeyError::PublicKeyTag(tag) => write!(
                f,
                "VAPID public key must start with the uncompressed point tag 0x04, got {tag:#04x}"
            ),
            VapidKeyError::PrivateKeyEncoding => {
                f.write_str("VAPID private key is not base64url without padding")
            }
            VapidKeyError::PrivateKeyLength(len) => {
                write!(f, "VAPID private key must decode to 32 bytes, got {len}")
            }
            VapidKeyError::PrivateKeyScalar => {
                f.write_str("VAPID private key is not a valid P-256 scalar")
            }
            VapidKeyError::KeyMismatch => {
                f.write_str("VAPID public key does not match the private key")
            }
        }
    }
}

#[derive(Debug)]
pub enum ForgeError {
    InvalidEndpoint,
    Signing,
}

impl std::fmt::Display for ForgeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ForgeError::InvalidEndpoint => f.write_str("push endpoint is not an absolute URL"),
            ForgeError::Signing => f.write_str("failed to sign VAPID assertion"),
        }
    }
}

impl VapidKeys {
    pub fn from_config(vapid: &VapidConfig) -> Result<Self, VapidKeyError> {
        let subject = vapid.subject.trim();
        if !(subject.starts_with("mailto:") || subject.starts_with("https://")) {
            return Err(VapidKeyError::InvalidSubject);
        }

        let public_key_b64 = vapid.public_key.trim();
        let public_key = decode_config(public_key_b64, URL_SAFE_NO_PAD)
            .map_err(|_| VapidKeyError::PublicKeyEncoding)?;
        if public_key.len() != PUBLIC_KEY_LENGTH {
            return Err(VapidKeyError::PublicKeyLength(public_key.len()));
        }
        if public_key[0] != UNCOMPRESSED_POINT_TAG {
            return Err(VapidKeyError::PublicKeyTag(public_key[0]));
        }

        let private_key_b64 = vapid.private_key.trim();
        let private_key = decode_config(private_key_b64, URL_SAFE_NO_PAD)
            .map_err(|_| VapidKeyError::PrivateKeyEncoding)?;
        if private_key.len() != PRIVATE_KEY_LENGTH {
            return Err(VapidKeyError::PrivateKeyLength(private_key.len()));
        }
        let key_pair = ES256KeyPair::from_bytes(&private_key)
            .map_err(|_| VapidKeyError::PrivateKeyScalar)?;

        // A mismatched pair would produce assertions the push service rejects
        // on every send. Derive the point from the scalar and compare.
        let derived = web_push::VapidSignatureBuilder::from_base64_no_sub(
            private_key_b64,
            URL_SAFE_NO_PAD,
        )
        .map_err(|_| VapidKeyError::PrivateKeyScalar)?
        .get_public_key();
        if derived != public_key {
            return Err(VapidKeyError::KeyMismatch);
        }

        Ok(Self {
            key_pair,
            public_key,
            public_key_b64: public_key_b64.to_string(),
            subject: subject.to_string(),
        })
    }

    /// Signs a VAPID assertion for the push service behind `endpoint`. The
    /// audience is the endpoint origin, never the full endpoint: one token
    /// is valid for every subscription on the same push service.
    pub fn forge(&self, endpoint: &str) -> Result<String, ForgeError> {
        let audience = endpoint_origin(endpoint).ok_or(ForgeError::InvalidEndpoint)?;
        let claims = Claims::create(JwtDuration::from_hours(ASSERTION_TTL_HOURS))
            .with_audience(audience)
            .with_subject(&self.subject);
        self.key_pair.sign(claims).map_err(|_| ForgeError::Signing)
    }

    pub fn public_key_bytes(&self) -> &[u8] {
        &self.public_key
    }

    pub fn public_key_base64(&self) -> &str {
        &self.public_key_b64
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }
}

/// Extracts `scheme://host[:port]` from an endpoint URL, dropping the
/// default port for http and https.
fn endpoint_origin(endpoint: &str) -> Option<String> {
    let (scheme, rest) = endpoint.split_once("://")?;
    if scheme.is_empty() {
        return None;
    }
    let host_end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    let host = &rest[..host_end];
    if host.is_empty() {
        return None;
    }
    let host = if host.starts_with('[') {
        host
    } else {
        match (scheme, host.rsplit_once(':')) {
            ("https", Some((name, "443"))) | ("http", Some((name, "80"))) if !name.is_empty() => {
                name
            }
            _ => host,
        }
    };
    Some(format!("{scheme}://{host}"))
}

#[derive(Debug, Clone)]
pub struct VapidCredentials {
    pub private_key: String,
    pub public_key: String,
}

pub fn generate_vapid_credentials() -> Result<VapidCredentials, web_push::WebPushError> {
    let mut rng = OsRng;
    generate_vapid_credentials_with_rng(&mut rng)
}

pub(crate) fn generate_vapid_credentials_with_rng<R: RngCore + CryptoRng>(
    rng: &mut R,
) -> Result<VapidCredentials, web_push::WebPushError> {
    let key_pair = generate_es256_keypair_with_rng(rng);
    let private_key = encode_config(key_pair.to_bytes(), URL_SAFE_NO_PAD);
    let public_key =
        web_push::VapidSignatureBuilder::from_base64_no_sub(&private_key, URL_SAFE_NO_PAD)?
            .get_public_key();
    let public_key = encode_config(public_key, URL_SAFE_NO_PAD);

    Ok(VapidCredentials {
        private_key,
        public_key,
    })
}

fn generate_es256_keypair_with_rng<R: RngCore + CryptoRng>(rng: &mut R) -> ES256KeyPair {
    let mut key_bytes = [0u8; 32];
    loop {
        rng.fill_bytes(&mut key_bytes);
        if let Ok(key_pair) = ES256KeyPair::from_bytes(&key_bytes) {
            return key_pair;
        }
    }
}
