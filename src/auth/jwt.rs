use std::time::{SystemTime, UNIX_EPOCH};

use crate::models::Claims;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

fn now() -> usize {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as usize
}

pub fn generate_access_token(
    employee_id: &str,
    cpf: &str,
    cracha: &str,
    email: Option<String>,
    secret: &str,
    ttl: usize,
) -> String {
    let claims = Claims {
        sub: employee_id.to_string(),
        cpf: cpf.to_string(),
        cracha: cracha.to_string(),
        email,
        exp: now() + ttl,
        jti: Uuid::new_v4().to_string(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, String> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    #[test]
    fn roundtrip_preserves_claims() {
        let token = generate_access_token(
            "emp-1",
            "12345678909",
            "9001",
            Some("joao@empresa.com.br".to_string()),
            SECRET,
            3600,
        );

        let claims = verify_token(&token, SECRET).unwrap();
        assert_eq!(claims.sub, "emp-1");
        assert_eq!(claims.cpf, "12345678909");
        assert_eq!(claims.cracha, "9001");
        assert_eq!(claims.email.as_deref(), Some("joao@empresa.com.br"));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = generate_access_token("emp-1", "12345678909", "9001", None, SECRET, 3600);
        assert!(verify_token(&token, "other-secret").is_err());
    }

    #[test]
    fn tampered_token_is_rejected() {
        let mut token = generate_access_token("emp-1", "12345678909", "9001", None, SECRET, 3600);
        token.push('x');
        assert!(verify_token(&token, SECRET).is_err());
    }

    #[test]
    fn each_token_gets_a_fresh_jti() {
        let a = generate_access_token("emp-1", "12345678909", "9001", None, SECRET, 3600);
        let b = generate_access_token("emp-1", "12345678909", "9001", None, SECRET, 3600);

        let ca = verify_token(&a, SECRET).unwrap();
        let cb = verify_token(&b, SECRET).unwrap();
        assert_ne!(ca.jti, cb.jti);
    }
}
