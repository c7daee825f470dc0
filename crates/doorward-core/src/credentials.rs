//! Credential store: roster, PINs and access policy
//!
//! Loaded once at startup and never mutated afterwards. PINs are either
//! plain digit strings compared in constant time, or Argon2id PHC hashes
//! verified with [`argon2`].

use std::fmt;
use std::time::Duration;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2,
};
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::error::{Error, Result};
use crate::indicator::MAX_HOLD;
use crate::roster::Roster;

/// Prefix identifying an Argon2 PHC string
const ARGON2_PREFIX: &str = "$argon2";

/// Timing and threshold parameters of the access policy
#[derive(Clone, Debug, PartialEq)]
pub struct AccessPolicy {
    /// Maximum match distance for a biometric accept (lower is stricter)
    pub acceptance_threshold: f64,
    /// Bad PINs in a row that trigger a lockout
    pub max_pin_tries: u32,
    /// How long PIN entry is suspended after a lockout
    pub lockout_duration: Duration,
    /// Minimum spacing between the starts of two attempt cycles
    pub cooldown: Duration,
    /// Extra biometric attempts after the first before falling back to PIN
    pub biometric_retries: u32,
    /// How long the unlock actuator is held
    pub unlock_duration: Duration,
}

impl Default for AccessPolicy {
    fn default() -> Self {
        Self {
            acceptance_threshold: 0.5,
            max_pin_tries: 3,
            lockout_duration: Duration::from_secs(15),
            cooldown: Duration::from_secs(3),
            biometric_retries: 2,
            unlock_duration: Duration::from_secs(5),
        }
    }
}

impl AccessPolicy {
    /// Reject parameter combinations the state machine cannot honour
    pub fn validate(&self) -> Result<()> {
        if self.max_pin_tries == 0 {
            return Err(Error::Config("max_pin_tries must be at least 1".into()));
        }
        if !self.acceptance_threshold.is_finite() || self.acceptance_threshold < 0.0 {
            return Err(Error::Config(format!(
                "acceptance threshold must be a non-negative number, got {}",
                self.acceptance_threshold
            )));
        }
        for (name, value) in [
            ("lockout duration", self.lockout_duration),
            ("cooldown", self.cooldown),
            ("unlock duration", self.unlock_duration),
        ] {
            if value > MAX_HOLD {
                return Err(Error::Config(format!(
                    "{} of {:?} exceeds the {:?} limit",
                    name, value, MAX_HOLD
                )));
            }
        }
        Ok(())
    }
}

/// A stored PIN
pub enum PinSecret {
    /// Plain digits, compared in constant time
    Plain(Zeroizing<String>),
    /// Argon2 PHC string
    Hashed(String),
}

impl PinSecret {
    /// Parse a configured secret; `$argon2…` strings are treated as hashes
    pub fn parse(secret: &str) -> Result<Self> {
        if secret.starts_with(ARGON2_PREFIX) {
            let parsed = PasswordHash::new(secret)
                .map_err(|e| Error::InvalidPinSecret(format!("bad Argon2 hash: {}", e)))?;
            if Algorithm::try_from(parsed.algorithm).is_err() {
                return Err(Error::InvalidPinSecret(format!(
                    "unsupported algorithm: {}",
                    parsed.algorithm
                )));
            }
            if parsed.hash.is_none() || parsed.salt.is_none() {
                return Err(Error::InvalidPinSecret(
                    "Argon2 hash is missing its salt or output".into(),
                ));
            }
            return Ok(PinSecret::Hashed(secret.to_string()));
        }
        if secret.is_empty() {
            return Err(Error::InvalidPinSecret("PIN must not be empty".into()));
        }
        Ok(PinSecret::Plain(Zeroizing::new(secret.to_string())))
    }

    /// Check a candidate against this secret
    pub fn matches(&self, candidate: &str) -> bool {
        match self {
            PinSecret::Plain(pin) => candidate.as_bytes().ct_eq(pin.as_bytes()).into(),
            PinSecret::Hashed(hash) => verify_hash(hash, candidate),
        }
    }

    /// Whether both secrets accept the same PIN
    ///
    /// Two distinct hashes of one PIN (different salts) are not detected.
    fn collides_with(&self, other: &PinSecret) -> bool {
        match (self, other) {
            (PinSecret::Plain(a), PinSecret::Plain(b)) => a.as_str() == b.as_str(),
            (PinSecret::Hashed(a), PinSecret::Hashed(b)) => a == b,
            (PinSecret::Hashed(hash), PinSecret::Plain(pin))
            | (PinSecret::Plain(pin), PinSecret::Hashed(hash)) => verify_hash(hash, pin),
        }
    }
}

impl fmt::Debug for PinSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PinSecret::Plain(_) => f.write_str("PinSecret::Plain(<redacted>)"),
            PinSecret::Hashed(_) => f.write_str("PinSecret::Hashed(<redacted>)"),
        }
    }
}

fn verify_hash(hash: &str, candidate: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(candidate.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// Hash a PIN into an Argon2id PHC string suitable for configuration
pub fn hash_pin(pin: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let pin_bytes = Zeroizing::new(pin.as_bytes().to_vec());
    Argon2::default()
        .hash_password(&pin_bytes, &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| Error::InvalidPinSecret(format!("Failed to hash PIN: {}", e)))
}

/// Classification of an entered credential
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PinClass {
    Emergency,
    Primary,
    Invalid,
}

/// Immutable roster, PINs and access policy
#[derive(Debug)]
pub struct CredentialStore {
    roster: Roster,
    primary_pin: PinSecret,
    emergency_pin: PinSecret,
    policy: AccessPolicy,
}

impl CredentialStore {
    /// Build a store, validating the policy and PIN distinctness
    pub fn new(
        roster: Roster,
        primary_pin: PinSecret,
        emergency_pin: PinSecret,
        policy: AccessPolicy,
    ) -> Result<Self> {
        policy.validate()?;
        if primary_pin.collides_with(&emergency_pin) {
            return Err(Error::Config(
                "primary and emergency PIN must differ".into(),
            ));
        }
        Ok(Self {
            roster,
            primary_pin,
            emergency_pin,
            policy,
        })
    }

    /// Classify in priority order: emergency, then primary
    pub fn classify(&self, candidate: &str) -> PinClass {
        if self.emergency_pin.matches(candidate) {
            PinClass::Emergency
        } else if self.primary_pin.matches(candidate) {
            PinClass::Primary
        } else {
            PinClass::Invalid
        }
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn policy(&self) -> &AccessPolicy {
        &self.policy
    }
}
