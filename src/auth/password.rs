use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

pub fn hash_password(password: &str) -> String {
    let argon2 = Argon2::default();
    let salt = SaltString::generate(&mut OsRng);

    argon2
        .hash_password(password.as_bytes(), &salt)
        .unwrap()
        .to_string()
}

pub fn verify_password(password: &str, hashed: &str) -> Result<(), argon2::password_hash::Error> {
    let argon2 = Argon2::default();
    let parsed = PasswordHash::new(hashed)?;

    argon2.verify_password(password.as_bytes(), &parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify_roundtrip() {
        let hash = hash_password("s3nha-forte");
        assert!(verify_password("s3nha-forte", &hash).is_ok());
    }

    #[test]
    fn wrong_password_fails() {
        let hash = hash_password("s3nha-forte");
        assert!(verify_password("outra-senha", &hash).is_err());
    }

    #[test]
    fn garbage_hash_fails_instead_of_panicking() {
        assert!(verify_password("qualquer", "not-a-phc-string").is_err());
    }
}
