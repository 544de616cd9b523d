//! The session state machine.
//!
//! ```text
//! Locked ──authenticate──▶ Unlocking ──validated──▶ Unlocked
//!   ▲                          │                       │
//!   └──── failure / cancel ────┘     expiry / lock / drop
//! ```
//!
//! While `Unlocked` and before `expires_at`, `authenticate` returns the
//! cached secret without asking anyone.  Otherwise it walks the source
//! chain in order: biometric, then escrow (only when biometric is
//! unavailable and escrow fallback is on), then the passphrase prompt.
//! Every candidate is checked against the vault verifier before it is
//! accepted.

use chrono::{DateTime, Duration, Utc};

use super::capability::{
    BiometricCapability, BiometricOutcome, KeyEscrowCapability, PassphraseInput, PassphrasePrompt,
};
use super::clock::{Clock, SystemClock};
use super::secret::MasterSecret;
use crate::errors::{PassGenError, Result};

/// Something that can tell whether a candidate secret opens the vault.
pub trait SecretVerifier {
    fn verify(&self, secret: &MasterSecret) -> bool;
}

impl SecretVerifier for crate::vault::VaultHandle {
    fn verify(&self, secret: &MasterSecret) -> bool {
        self.verify_secret(secret.expose())
    }
}

/// How the current secret was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnlockMethod {
    Biometric,
    Escrow,
    Passphrase,
}

impl std::fmt::Display for UnlockMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            UnlockMethod::Biometric => "biometric",
            UnlockMethod::Escrow => "escrow",
            UnlockMethod::Passphrase => "passphrase",
        })
    }
}

/// Tunables taken from `Settings`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Seconds a validated secret stays cached.  Zero disables the cache.
    pub timeout_seconds: u64,
    pub max_auth_attempts: u32,
    pub escrow_fallback: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 300,
            max_auth_attempts: 3,
            escrow_fallback: true,
        }
    }
}

impl From<&crate::config::Settings> for SessionConfig {
    fn from(settings: &crate::config::Settings) -> Self {
        Self {
            timeout_seconds: settings.session_timeout_seconds,
            max_auth_attempts: settings.max_auth_attempts,
            escrow_fallback: settings.escrow_fallback,
        }
    }
}

struct ActiveSession {
    secret: MasterSecret,
    obtained_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    method: UnlockMethod,
}

enum SessionState {
    Locked,
    Unlocking,
    Unlocked(ActiveSession),
}

/// Coarse state for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Locked,
    Unlocking,
    Unlocked,
}

/// Snapshot returned by `SessionManager::status`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStatus {
    pub phase: SessionPhase,
    pub method: Option<UnlockMethod>,
    pub obtained_at: Option<DateTime<Utc>>,
    pub remaining_seconds: Option<u64>,
    pub biometric_available: bool,
}

/// Obtains, caches and clears the master secret.
pub struct SessionManager {
    app_id: String,
    config: SessionConfig,
    biometric: Box<dyn BiometricCapability>,
    escrow: Box<dyn KeyEscrowCapability>,
    prompt: Box<dyn PassphrasePrompt>,
    clock: Box<dyn Clock>,
    state: SessionState,
}

impl SessionManager {
    pub fn new(
        app_id: impl Into<String>,
        config: SessionConfig,
        biometric: Box<dyn BiometricCapability>,
        escrow: Box<dyn KeyEscrowCapability>,
        prompt: Box<dyn PassphrasePrompt>,
    ) -> Self {
        Self {
            app_id: app_id.into(),
            config,
            biometric,
            escrow,
            prompt,
            clock: Box::new(SystemClock),
            state: SessionState::Locked,
        }
    }

    /// Replace the time source.
    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// The escrow key this session reads and writes.
    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    /// Return a validated master secret, from cache or from the source chain.
    ///
    /// On failure the session ends `Locked`.
    pub fn authenticate(&mut self, verifier: &dyn SecretVerifier) -> Result<&MasterSecret> {
        let now = self.clock.now();
        let cached = matches!(&self.state, SessionState::Unlocked(active) if now < active.expires_at);

        if !cached {
            if matches!(self.state, SessionState::Unlocked(_)) {
                tracing::debug!("session expired");
            }
            self.state = SessionState::Unlocking;

            match self.run_chain(verifier) {
                Ok(active) => {
                    tracing::info!(method = %active.method, "session unlocked");
                    self.state = SessionState::Unlocked(active);
                }
                Err(e) => {
                    self.state = SessionState::Locked;
                    return Err(e);
                }
            }
        }

        match &self.state {
            SessionState::Unlocked(active) => Ok(&active.secret),
            _ => Err(PassGenError::AuthenticationFailed),
        }
    }

    /// Adopt a secret the caller just set (new vault, changed secret).
    ///
    /// The secret is written to escrow; a failure there is logged only.
    pub fn establish(&mut self, secret: MasterSecret) {
        self.store_in_escrow(&secret);
        self.state = SessionState::Unlocked(self.activate(secret, UnlockMethod::Passphrase));
        tracing::info!("session established");
    }

    /// Forget the cached secret.
    pub fn lock(&mut self) {
        if !matches!(self.state, SessionState::Locked) {
            tracing::debug!("session locked");
        }
        self.state = SessionState::Locked;
    }

    /// Forget the cached secret and remove it from escrow.
    pub fn lock_everywhere(&mut self) -> Result<()> {
        self.lock();
        self.escrow.erase(&self.app_id)?;
        tracing::info!("escrowed secret erased");
        Ok(())
    }

    /// Current state.  An expired session is locked first.
    pub fn status(&mut self) -> SessionStatus {
        let now = self.clock.now();
        if matches!(&self.state, SessionState::Unlocked(active) if now >= active.expires_at) {
            self.lock();
        }

        let biometric_available = self.biometric.is_available();
        match &self.state {
            SessionState::Unlocked(active) => SessionStatus {
                phase: SessionPhase::Unlocked,
                method: Some(active.method),
                obtained_at: Some(active.obtained_at),
                remaining_seconds: Some((active.expires_at - now).num_seconds().max(0) as u64),
                biometric_available,
            },
            SessionState::Unlocking => SessionStatus {
                phase: SessionPhase::Unlocking,
                method: None,
                obtained_at: None,
                remaining_seconds: None,
                biometric_available,
            },
            SessionState::Locked => SessionStatus {
                phase: SessionPhase::Locked,
                method: None,
                obtained_at: None,
                remaining_seconds: None,
                biometric_available,
            },
        }
    }

    // ------------------------------------------------------------------
    // Source chain
    // ------------------------------------------------------------------

    fn run_chain(&mut self, verifier: &dyn SecretVerifier) -> Result<ActiveSession> {
        // 1. Biometric.
        let mut try_escrow = false;
        match self.biometric.try_unlock(&self.app_id) {
            BiometricOutcome::Secret(candidate) => {
                if verifier.verify(&candidate) {
                    return Ok(self.activate(candidate, UnlockMethod::Biometric));
                }
                tracing::warn!("biometric secret does not open the vault; discarding it");
                self.erase_stale();
            }
            BiometricOutcome::Unavailable => {
                tracing::debug!("biometric unlock unavailable");
                try_escrow = self.config.escrow_fallback;
            }
            BiometricOutcome::Denied => {
                tracing::debug!("biometric unlock denied; falling back to passphrase");
            }
            BiometricOutcome::Cancelled => {
                tracing::debug!("biometric unlock cancelled");
                return Err(PassGenError::AuthenticationCancelled);
            }
        }

        // 2. Escrow.
        if try_escrow {
            match self.escrow.retrieve(&self.app_id) {
                Ok(Some(candidate)) => {
                    if verifier.verify(&candidate) {
                        return Ok(self.activate(candidate, UnlockMethod::Escrow));
                    }
                    tracing::warn!("escrowed secret does not open the vault; discarding it");
                    self.erase_stale();
                }
                Ok(None) => tracing::debug!("no escrowed secret"),
                Err(e) => tracing::warn!(error = %e, "escrow unavailable"),
            }
        }

        // 3. Passphrase.
        let max = self.config.max_auth_attempts;
        for attempt in 1..=max {
            match self.prompt.ask(attempt, max)? {
                PassphraseInput::Entered(candidate) => {
                    if verifier.verify(&candidate) {
                        self.store_in_escrow(&candidate);
                        return Ok(self.activate(candidate, UnlockMethod::Passphrase));
                    }
                    tracing::warn!(attempt, max, "passphrase rejected");
                }
                PassphraseInput::Cancelled => return Err(PassGenError::AuthenticationCancelled),
                PassphraseInput::Exhausted => break,
            }
        }

        Err(PassGenError::AuthenticationFailed)
    }

    fn activate(&self, secret: MasterSecret, method: UnlockMethod) -> ActiveSession {
        let obtained_at = self.clock.now();
        let expires_at = i64::try_from(self.config.timeout_seconds)
            .ok()
            .and_then(Duration::try_seconds)
            .and_then(|ttl| obtained_at.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        ActiveSession {
            secret,
            obtained_at,
            expires_at,
            method,
        }
    }

    fn store_in_escrow(&mut self, secret: &MasterSecret) {
        if let Err(e) = self.escrow.store(&self.app_id, secret) {
            tracing::warn!(error = %e, "could not store secret in escrow");
        }
    }

    fn erase_stale(&mut self) {
        if let Err(e) = self.escrow.erase(&self.app_id) {
            tracing::warn!(error = %e, "could not erase stale escrowed secret");
        }
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        self.lock();
    }
}
