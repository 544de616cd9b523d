//! Host capabilities the session consults to obtain a master secret.
//!
//! Each source reports a tagged outcome instead of an error so the
//! session can decide what to try next:
//! - `BiometricCapability`: platform biometric unlock (Touch ID, etc.)
//! - `KeyEscrowCapability`: a secure store that remembers the secret
//! - `PassphrasePrompt`: interactive entry

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use super::secret::MasterSecret;
use crate::errors::Result;

/// Result of one biometric unlock attempt.
#[derive(Debug)]
pub enum BiometricOutcome {
    /// The user authenticated and the platform released the secret.
    Secret(MasterSecret),
    /// No biometric hardware, no enrolled identity, or nothing stored.
    Unavailable,
    /// The biometric check failed.
    Denied,
    /// The user dismissed the biometric dialog.
    Cancelled,
}

/// A host-provided biometric unlock.
///
/// `try_unlock` may block while the platform shows its dialog.  It is
/// called at most once per authentication and never retried.
pub trait BiometricCapability {
    fn is_available(&self) -> bool;

    fn try_unlock(&mut self, app_id: &str) -> BiometricOutcome;
}

/// A secure store that keeps the master secret across processes.
pub trait KeyEscrowCapability {
    fn store(&mut self, app_id: &str, secret: &MasterSecret) -> Result<()>;

    /// `Ok(None)` when nothing is stored under `app_id`.
    fn retrieve(&mut self, app_id: &str) -> Result<Option<MasterSecret>>;

    /// Removing an absent entry is not an error.
    fn erase(&mut self, app_id: &str) -> Result<()>;
}

/// Result of one interactive passphrase request.
#[derive(Debug)]
pub enum PassphraseInput {
    Entered(MasterSecret),
    /// The user aborted the prompt.
    Cancelled,
    /// No more input can be obtained (no terminal, one-shot source used up).
    Exhausted,
}

/// Interactive passphrase entry.
pub trait PassphrasePrompt {
    /// Ask for the passphrase.  `attempt` counts from 1 up to `max_attempts`.
    fn ask(&mut self, attempt: u32, max_attempts: u32) -> Result<PassphraseInput>;
}

// ---------------------------------------------------------------------------
// Stock implementations
// ---------------------------------------------------------------------------

/// A host with no biometric support.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoBiometric;

impl BiometricCapability for NoBiometric {
    fn is_available(&self) -> bool {
        false
    }

    fn try_unlock(&mut self, _app_id: &str) -> BiometricOutcome {
        BiometricOutcome::Unavailable
    }
}

/// Escrow that remembers nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoEscrow;

impl KeyEscrowCapability for NoEscrow {
    fn store(&mut self, _app_id: &str, _secret: &MasterSecret) -> Result<()> {
        Ok(())
    }

    fn retrieve(&mut self, _app_id: &str) -> Result<Option<MasterSecret>> {
        Ok(None)
    }

    fn erase(&mut self, _app_id: &str) -> Result<()> {
        Ok(())
    }
}

/// Process-local escrow.  Clones share the same storage.
#[derive(Debug, Default, Clone)]
pub struct MemoryEscrow {
    slots: Rc<RefCell<HashMap<String, MasterSecret>>>,
}

impl MemoryEscrow {
    pub fn contains(&self, app_id: &str) -> bool {
        self.slots.borrow().contains_key(app_id)
    }
}

impl KeyEscrowCapability for MemoryEscrow {
    fn store(&mut self, app_id: &str, secret: &MasterSecret) -> Result<()> {
        self.slots
            .borrow_mut()
            .insert(app_id.to_string(), secret.clone());
        Ok(())
    }

    fn retrieve(&mut self, app_id: &str) -> Result<Option<MasterSecret>> {
        Ok(self.slots.borrow().get(app_id).cloned())
    }

    fn erase(&mut self, app_id: &str) -> Result<()> {
        self.slots.borrow_mut().remove(app_id);
        Ok(())
    }
}

/// A passphrase supplied up front (e.g. from the environment).
///
/// Yields it once; every later request is `Exhausted`.
#[derive(Debug, Default)]
pub struct OneShotPassphrase {
    secret: Option<MasterSecret>,
}

impl OneShotPassphrase {
    pub fn new(secret: Option<MasterSecret>) -> Self {
        Self { secret }
    }
}

impl PassphrasePrompt for OneShotPassphrase {
    fn ask(&mut self, _attempt: u32, _max_attempts: u32) -> Result<PassphraseInput> {
        Ok(match self.secret.take() {
            Some(secret) => PassphraseInput::Entered(secret),
            None => PassphraseInput::Exhausted,
        })
    }
}
