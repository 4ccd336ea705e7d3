use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

/// Newtype for passwords to prevent accidental logging.
#[derive(Clone)]
pub struct Password(String);

impl Password {
    pub fn new(password: String) -> Self {
        Self(password)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Password {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Password(***)")
    }
}

/// Newtype for stored password hashes.
#[derive(Debug, Clone)]
pub struct PasswordHashString(String);

impl PasswordHashString {
    pub fn new(hash: String) -> Self {
        Self(hash)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

/// Reasons a password fails the strength policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PasswordPolicyViolation {
    TooShort { minimum: usize },
    MissingUppercase,
    MissingLowercase,
    MissingDigit,
}

impl std::fmt::Display for PasswordPolicyViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PasswordPolicyViolation::TooShort { minimum } => {
                write!(f, "password must be at least {minimum} characters")
            }
            PasswordPolicyViolation::MissingUppercase => {
                write!(f, "password must contain an uppercase letter")
            }
            PasswordPolicyViolation::MissingLowercase => {
                write!(f, "password must contain a lowercase letter")
            }
            PasswordPolicyViolation::MissingDigit => {
                write!(f, "password must contain a digit")
            }
        }
    }
}

const MIN_PASSWORD_LENGTH: usize = 8;

/// Validate a candidate password against the strength policy.
pub fn validate_password_strength(password: &str) -> Result<(), PasswordPolicyViolation> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(PasswordPolicyViolation::TooShort {
            minimum: MIN_PASSWORD_LENGTH,
        });
    }
    if !password.chars().any(|c| c.is_uppercase()) {
        return Err(PasswordPolicyViolation::MissingUppercase);
    }
    if !password.chars().any(|c| c.is_lowercase()) {
        return Err(PasswordPolicyViolation::MissingLowercase);
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(PasswordPolicyViolation::MissingDigit);
    }
    Ok(())
}

/// Hash a password using Argon2id with a generated salt.
pub fn hash_password(password: &Password) -> Result<PasswordHashString, anyhow::Error> {
    let argon2 = Argon2::default();
    let salt = SaltString::generate(&mut OsRng);

    let password_hash = argon2
        .hash_password(password.as_str().as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("failed to hash password: {e}"))?
        .to_string();

    Ok(PasswordHashString::new(password_hash))
}

/// Verify a password against a stored hash. The argon2 primitive performs
/// the comparison in constant time.
pub fn verify_password(
    password: &Password,
    password_hash: &PasswordHashString,
) -> Result<(), anyhow::Error> {
    let parsed_hash = PasswordHash::new(password_hash.as_str())
        .map_err(|e| anyhow::anyhow!("invalid password hash format: {e}"))?;

    Argon2::default()
        .verify_password(password.as_str().as_bytes(), &parsed_hash)
        .map_err(|_| anyhow::anyhow!("password verification failed"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify_round_trips() {
        let password = Password::new("Str0ng!Pass".to_string());
        let hash = hash_password(&password).expect("hashing failed");

        assert!(hash.as_str().starts_with("$argon2"));
        assert!(verify_password(&password, &hash).is_ok());
    }

    #[test]
    fn wrong_password_fails_verification() {
        let password = Password::new("Str0ng!Pass".to_string());
        let hash = hash_password(&password).expect("hashing failed");

        let wrong = Password::new("Str0ng!Pas".to_string());
        assert!(verify_password(&wrong, &hash).is_err());
    }

    #[test]
    fn same_password_hashes_differently() {
        let password = Password::new("Str0ng!Pass".to_string());
        let first = hash_password(&password).expect("hashing failed");
        let second = hash_password(&password).expect("hashing failed");
        assert_ne!(first.as_str(), second.as_str());
    }

    #[test]
    fn strength_policy() {
        assert!(validate_password_strength("Str0ng!Pass").is_ok());
        assert_eq!(
            validate_password_strength("Ab1"),
            Err(PasswordPolicyViolation::TooShort { minimum: 8 })
        );
        assert_eq!(
            validate_password_strength("alllower1"),
            Err(PasswordPolicyViolation::MissingUppercase)
        );
        assert_eq!(
            validate_password_strength("ALLUPPER1"),
            Err(PasswordPolicyViolation::MissingLowercase)
        );
        assert_eq!(
            validate_password_strength("NoDigitsHere"),
            Err(PasswordPolicyViolation::MissingDigit)
        );
    }

    #[test]
    fn debug_never_prints_the_password() {
        let password = Password::new("Str0ng!Pass".to_string());
        assert_eq!(format!("{password:?}"), "Password(***)");
    }
}
