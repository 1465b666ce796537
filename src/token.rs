use base64::{engine::general_purpose, Engine as _};
use derive_more::{Display, From};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::Config;

#[derive(Debug, Display, From)]
pub enum TokenError {
    #[display(fmt = "key is not valid base64: {}", _0)]
    KeyEncoding(base64::DecodeError),
    #[display(fmt = "key is not valid utf-8: {}", _0)]
    KeyUtf8(std::string::FromUtf8Error),
    #[display(fmt = "token subject is not a valid id: {}", _0)]
    Subject(uuid::Error),
    #[display(fmt = "{}", _0)]
    Jwt(jsonwebtoken::errors::Error),
}

impl std::error::Error for TokenError {}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenDetails {
    pub token: Option<String>,
    pub token_uuid: Uuid,
    pub user_id: Uuid,
    pub expires_in: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: String,
    pub token_uuid: String,
    pub exp: i64,
    pub iat: i64,
    pub nbf: i64,
}

#[derive(Debug)]
pub struct Tokens {
    pub access_token: TokenDetails,
    pub refresh_token: TokenDetails,
}

fn decode_pem(key: &str) -> Result<String, TokenError> {
    let bytes = general_purpose::STANDARD.decode(key)?;
    Ok(String::from_utf8(bytes)?)
}

/// Signs an RS256 token for `user_id` valid for `ttl` minutes. `private_key`
/// is a base64 encoded pem.
pub fn generate_jwt_token(
    user_id: Uuid,
    ttl: i64,
    private_key: &str,
) -> Result<TokenDetails, TokenError> {
    let decoded_private_key = decode_pem(private_key)?;

    let now = chrono::Utc::now();
    let mut token_details = TokenDetails {
        user_id,
        token_uuid: Uuid::new_v4(),
        expires_in: Some((now + chrono::Duration::minutes(ttl)).timestamp()),
        token: None,
    };

    let claims = TokenClaims {
        sub: token_details.user_id.to_string(),
        token_uuid: token_details.token_uuid.to_string(),
        exp: token_details.expires_in.unwrap_or_default(),
        iat: now.timestamp(),
        nbf: now.timestamp(),
    };

    let header = Header::new(Algorithm::RS256);
    let token = encode(
        &header,
        &claims,
        &EncodingKey::from_rsa_pem(decoded_private_key.as_bytes())?,
    )?;
    token_details.token = Some(token);
    Ok(token_details)
}

pub fn verify_jwt_token(public_key: &str, token: &str) -> Result<TokenDetails, TokenError> {
    let decoded_public_key = decode_pem(public_key)?;

    let validation = Validation::new(Algorithm::RS256);
    let decoded = decode::<TokenClaims>(
        token,
        &DecodingKey::from_rsa_pem(decoded_public_key.as_bytes())?,
        &validation,
    )?;

    let user_id = Uuid::parse_str(decoded.claims.sub.as_str())?;
    let token_uuid = Uuid::parse_str(decoded.claims.token_uuid.as_str())?;

    Ok(TokenDetails {
        token: None,
        token_uuid,
        user_id,
        expires_in: None,
    })
}

pub fn generate_tokens(user_id: Uuid, config: &Config) -> Result<Tokens, TokenError> {
    let access_token = generate_jwt_token(
        user_id,
        config.access_token_max_age,
        &config.access_token_private_key,
    )?;
    let refresh_token = generate_jwt_token(
        user_id,
        config.refresh_token_max_age,
        &config.refresh_token_private_key,
    )?;
    Ok(Tokens {
        access_token,
        refresh_token,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{test_private_key, test_public_key};

    #[test]
    fn signed_token_verifies_with_public_key() {
        let user_id = Uuid::new_v4();
        let details = generate_jwt_token(user_id, 15, &test_private_key()).unwrap();
        let token = details.token.unwrap();

        let verified = verify_jwt_token(&test_public_key(), &token).unwrap();
        assert_eq!(verified.user_id, user_id);
        assert_eq!(verified.token_uuid, details.token_uuid);
    }

    #[test]
    fn tampered_token_is_rejected() {
        let details = generate_jwt_token(Uuid::new_v4(), 15, &test_private_key()).unwrap();
        let mut token = details.token.unwrap();
        token.push('x');
        assert!(matches!(
            verify_jwt_token(&test_public_key(), &token),
            Err(TokenError::Jwt(_))
        ));
    }

    #[test]
    fn expired_token_is_rejected() {
        let details = generate_jwt_token(Uuid::new_v4(), -10, &test_private_key()).unwrap();
        let token = details.token.unwrap();
        assert!(verify_jwt_token(&test_public_key(), &token).is_err());
    }

    #[test]
    fn key_must_be_base64() {
        assert!(matches!(
            generate_jwt_token(Uuid::new_v4(), 15, "%%%"),
            Err(TokenError::KeyEncoding(_))
        ));
    }
}
