use argon2::{
    Argon2,
    password_hash::{
        self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng,
    },
};

pub fn hash_password(password: &str) -> Result<String, password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)?
        .to_string())
}

pub fn verify_password(password: &str, hashed: &str) -> Result<(), password_hash::Error> {
    let parsed = PasswordHash::new(hashed)?;
    Argon2::default().verify_password(password.as_bytes(), &parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let hashed = hash_password("s3cret").unwrap();
        assert!(hashed.starts_with("$argon2"));
        assert!(verify_password("s3cret", &hashed).is_ok());
        assert!(verify_password("wrong", &hashed).is_err());
    }

    #[test]
    fn garbage_hash_is_an_error_not_a_panic() {
        assert!(verify_password("s3cret", "plain-text").is_err());
    }
}
