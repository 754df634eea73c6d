//! Verification gate: one-time email codes, rate-limited per address.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use thiserror::Error;
use tracing::warn;

use crate::kv::KeyValue;
use crate::mailer::{Delivery, Mailer};

#[derive(Debug, Error)]
pub enum GateError {
    #[error("please use a valid {0} email address")]
    InvalidDomain(String),

    #[error("too many requests, try again in {minutes_left} minutes")]
    RateLimited { minutes_left: i64 },

    #[error("no code found, request a new one")]
    NoChallenge,

    #[error("code expired, request a new one")]
    Expired,

    #[error("too many attempts, request a new code")]
    TooManyAttempts,

    #[error("invalid code")]
    Mismatch { attempts_remaining: u32 },
}

/// One pending code per email. Replaced wholesale when a new code is
/// requested for the same address.
#[derive(Debug, Clone)]
pub struct Challenge {
    pub code: String,
    pub expires_at: DateTime<Utc>,
    pub attempts: u32,
}

/// Rolling request window per email.
#[derive(Debug, Clone)]
pub struct RateWindow {
    pub count: u32,
    pub reset_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct GateConfig {
    /// Institutional parent domain; the bare domain and any subdomain of it
    /// are accepted (e.g. "upenn.edu" admits "@upenn.edu" and "@seas.upenn.edu").
    pub domain: String,
    pub code_ttl_minutes: i64,
    pub max_attempts: u32,
    pub max_requests_per_window: u32,
    pub window_minutes: i64,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            domain: "upenn.edu".to_string(),
            code_ttl_minutes: 15,
            max_attempts: 5,
            max_requests_per_window: 5,
            window_minutes: 60,
        }
    }
}

/// Outcome of a code request.
#[derive(Debug)]
pub struct CodeSent {
    pub email: String,
    /// Set when the mailer could not (or chose not to) deliver; callers may
    /// expose it in dev deployments.
    pub dev_code: Option<String>,
}

pub struct VerificationGate {
    config: GateConfig,
    challenges: Arc<dyn KeyValue<Challenge>>,
    limits: Arc<dyn KeyValue<RateWindow>>,
    mailer: Arc<dyn Mailer>,
}

impl VerificationGate {
    pub fn new(
        config: GateConfig,
        challenges: Arc<dyn KeyValue<Challenge>>,
        limits: Arc<dyn KeyValue<RateWindow>>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self {
            config,
            challenges,
            limits,
            mailer,
        }
    }

    pub fn normalize(email: &str) -> String {
        email.trim().to_lowercase()
    }

    pub fn is_valid_email(&self, email: &str) -> bool {
        let email = Self::normalize(email);
        email.ends_with(&format!("@{}", self.config.domain))
            || email.ends_with(&format!(".{}", self.config.domain))
    }

    /// Generate, store, and deliver a fresh code for `email`.
    pub async fn request_code(&self, email: &str) -> Result<CodeSent, GateError> {
        self.request_code_at(email, Utc::now()).await
    }

    pub async fn request_code_at(
        &self,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<CodeSent, GateError> {
        let email = Self::normalize(email);
        if !self.is_valid_email(&email) {
            return Err(GateError::InvalidDomain(self.config.domain.clone()));
        }

        self.check_rate_limit_at(&email, now)?;

        let code = generate_code();
        let expires_at = now + Duration::minutes(self.config.code_ttl_minutes);
        self.challenges.put(
            &email,
            Challenge {
                code: code.clone(),
                expires_at,
                attempts: 0,
            },
        );
        self.challenges.expire(&email, expires_at);

        let dev_code = match self.mailer.send_code(&email, &code).await {
            Ok(Delivery::Sent) => None,
            Ok(Delivery::DevFallback) => Some(code),
            Err(e) => {
                // Keep the challenge usable: surface the code instead of
                // failing the login flow outright.
                warn!("code delivery to {} failed: {}", email, e);
                Some(code)
            }
        };

        Ok(CodeSent { email, dev_code })
    }

    /// Consume a code. Success deletes the challenge, so a repeat of the
    /// same (correct) code fails with NoChallenge. Wrong checks 1 through 4
    /// report Mismatch; the 5th deletes the challenge and reports
    /// TooManyAttempts.
    pub fn verify_code(&self, email: &str, code: &str) -> Result<String, GateError> {
        self.verify_code_at(email, code, Utc::now())
    }

    pub fn verify_code_at(
        &self,
        email: &str,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<String, GateError> {
        let email = Self::normalize(email);
        let mut challenge = self.challenges.get(&email).ok_or(GateError::NoChallenge)?;

        if now > challenge.expires_at {
            self.challenges.remove(&email);
            return Err(GateError::Expired);
        }
        if challenge.attempts >= self.config.max_attempts {
            self.challenges.remove(&email);
            return Err(GateError::TooManyAttempts);
        }

        if challenge.code != code.trim() {
            challenge.attempts += 1;
            if challenge.attempts >= self.config.max_attempts {
                self.challenges.remove(&email);
                return Err(GateError::TooManyAttempts);
            }
            let remaining = self.config.max_attempts - challenge.attempts;
            let expires_at = challenge.expires_at;
            self.challenges.put(&email, challenge);
            self.challenges.expire(&email, expires_at);
            return Err(GateError::Mismatch {
                attempts_remaining: remaining,
            });
        }

        self.challenges.remove(&email);
        Ok(email)
    }

    fn check_rate_limit_at(&self, email: &str, now: DateTime<Utc>) -> Result<(), GateError> {
        let window = self.limits.get(email);
        match window {
            None => {
                self.open_window(email, now);
                Ok(())
            }
            Some(w) if now > w.reset_at => {
                self.open_window(email, now);
                Ok(())
            }
            Some(w) if w.count >= self.config.max_requests_per_window => {
                // Ceiling in minutes, matching the user-facing hint
                let minutes_left = ((w.reset_at - now).num_seconds() + 59) / 60;
                Err(GateError::RateLimited { minutes_left })
            }
            Some(mut w) => {
                w.count += 1;
                let reset_at = w.reset_at;
                self.limits.put(email, w);
                self.limits.expire(email, reset_at);
                Ok(())
            }
        }
    }

    fn open_window(&self, email: &str, now: DateTime<Utc>) {
        let reset_at = now + Duration::minutes(self.config.window_minutes);
        self.limits.put(email, RateWindow { count: 1, reset_at });
        self.limits.expire(email, reset_at);
    }
}

/// Uniformly random 6-digit code, 100000..=999999.
fn generate_code() -> String {
    let mut rng = rand::rng();
    rng.random_range(100_000..1_000_000u32).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryKv;

    fn gate() -> VerificationGate {
        VerificationGate::new(
            GateConfig::default(),
            Arc::new(MemoryKv::new()),
            Arc::new(MemoryKv::new()),
            Arc::new(crate::mailer::DevMailer),
        )
    }

    #[test]
    fn code_format() {
        for _ in 0..100 {
            let code = generate_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn domain_allow_list() {
        let gate = gate();
        assert!(gate.is_valid_email("alice@upenn.edu"));
        assert!(gate.is_valid_email("Bob@SEAS.upenn.edu"));
        assert!(gate.is_valid_email("  carol@wharton.upenn.edu  "));
        assert!(!gate.is_valid_email("mallory@gmail.com"));
        assert!(!gate.is_valid_email("eve@upenn.edu.evil.com"));
    }

    #[tokio::test]
    async fn rejects_foreign_domains() {
        let gate = gate();
        assert!(matches!(
            gate.request_code("mallory@gmail.com").await,
            Err(GateError::InvalidDomain(_))
        ));
    }

    #[tokio::test]
    async fn sixth_request_within_the_hour_is_limited() {
        let gate = gate();
        let t0 = Utc::now();

        for _ in 0..5 {
            gate.request_code_at("alice@upenn.edu", t0).await.unwrap();
        }
        let err = gate.request_code_at("alice@upenn.edu", t0).await.unwrap_err();
        assert!(matches!(err, GateError::RateLimited { minutes_left } if minutes_left > 0));

        // First call after the window resets succeeds again
        gate.request_code_at("alice@upenn.edu", t0 + Duration::minutes(61))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn correct_code_mints_once_then_no_challenge() {
        let gate = gate();
        let sent = gate.request_code("alice@upenn.edu").await.unwrap();
        let code = sent.dev_code.unwrap();

        assert_eq!(gate.verify_code("alice@upenn.edu", &code).unwrap(), "alice@upenn.edu");
        // Challenge was consumed
        assert!(matches!(
            gate.verify_code("alice@upenn.edu", &code),
            Err(GateError::NoChallenge)
        ));
    }

    #[tokio::test]
    async fn five_wrong_attempts_burn_the_challenge() {
        let gate = gate();
        let sent = gate.request_code("alice@upenn.edu").await.unwrap();
        let code = sent.dev_code.unwrap();
        let wrong = if code == "000000" { "111111" } else { "000000" };

        for i in 1..=4u32 {
            let err = gate.verify_code("alice@upenn.edu", wrong).unwrap_err();
            assert!(
                matches!(err, GateError::Mismatch { attempts_remaining } if attempts_remaining == 5 - i)
            );
        }
        // 5th failure reports exhaustion and deletes the challenge
        assert!(matches!(
            gate.verify_code("alice@upenn.edu", wrong),
            Err(GateError::TooManyAttempts)
        ));
        // Even the correct code is now useless
        assert!(matches!(
            gate.verify_code("alice@upenn.edu", &code),
            Err(GateError::NoChallenge)
        ));
    }

    #[tokio::test]
    async fn expired_code_is_rejected_and_destroyed() {
        let gate = gate();
        let sent = gate.request_code("alice@upenn.edu").await.unwrap();
        let code = sent.dev_code.unwrap();

        let later = Utc::now() + Duration::minutes(16);
        assert!(matches!(
            gate.verify_code_at("alice@upenn.edu", &code, later),
            Err(GateError::Expired)
        ));
        assert!(matches!(
            gate.verify_code("alice@upenn.edu", &code),
            Err(GateError::NoChallenge)
        ));
    }

    #[tokio::test]
    async fn new_request_replaces_the_old_challenge() {
        let gate = gate();
        let first = gate.request_code("alice@upenn.edu").await.unwrap().dev_code.unwrap();
        let second = gate.request_code("alice@upenn.edu").await.unwrap().dev_code.unwrap();

        if first != second {
            assert!(matches!(
                gate.verify_code("alice@upenn.edu", &first),
                Err(GateError::Mismatch { .. })
            ));
        }
        assert!(gate.verify_code("alice@upenn.edu", &second).is_ok());
    }

    #[tokio::test]
    async fn email_is_normalized() {
        let gate = gate();
        let sent = gate.request_code("  Alice@UPenn.EDU ").await.unwrap();
        assert_eq!(sent.email, "alice@upenn.edu");
        let code = sent.dev_code.unwrap();
        assert_eq!(gate.verify_code("ALICE@upenn.edu", &code).unwrap(), "alice@upenn.edu");
    }
}
