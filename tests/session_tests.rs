//! Integration tests for the session manager against real vault files.

use std::cell::Cell;
use std::collections::VecDeque;
use std::path::Path;
use std::rc::Rc;
use std::time::Duration;

use passgen::crypto::MIN_ITERATIONS;
use passgen::errors::{PassGenError, Result};
use passgen::session::{
    app_id_for, KeyEscrowCapability, ManualClock, MasterSecret, MemoryEscrow, NoBiometric,
    PassphraseInput, PassphrasePrompt, SessionConfig, SessionManager, SessionPhase, UnlockMethod,
};
use passgen::vault::{VaultHandle, VaultStore};
use tempfile::TempDir;

/// Answers with a fixed list of passphrases and counts how often it was asked.
struct Scripted {
    answers: VecDeque<&'static str>,
    asked: Rc<Cell<u32>>,
}

impl Scripted {
    fn new(answers: &[&'static str]) -> (Self, Rc<Cell<u32>>) {
        let asked = Rc::new(Cell::new(0));
        let prompt = Self {
            answers: answers.iter().copied().collect(),
            asked: Rc::clone(&asked),
        };
        (prompt, asked)
    }
}

impl PassphrasePrompt for Scripted {
    fn ask(&mut self, _attempt: u32, _max: u32) -> Result<PassphraseInput> {
        self.asked.set(self.asked.get() + 1);
        Ok(match self.answers.pop_front() {
            Some(pw) => PassphraseInput::Entered(MasterSecret::from_string(pw.into())),
            None => PassphraseInput::Exhausted,
        })
    }
}

fn create_vault(path: &Path, secret: &str) {
    let lock = VaultStore::lock(path, Duration::from_secs(1)).unwrap();
    VaultStore::create(path, secret.as_bytes(), MIN_ITERATIONS, &lock).unwrap();
}

fn manager(
    path: &Path,
    config: SessionConfig,
    escrow: &MemoryEscrow,
    prompt: Scripted,
) -> SessionManager {
    SessionManager::new(
        app_id_for(path),
        config,
        Box::new(NoBiometric),
        Box::new(escrow.clone()),
        Box::new(prompt),
    )
}

fn load(path: &Path) -> VaultHandle {
    VaultStore::load(path).unwrap()
}

#[test]
fn escrowed_secret_unlocks_a_later_session_without_prompting() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("vault.db");
    create_vault(&path, "S1-secret");
    let escrow = MemoryEscrow::default();

    // First run: typed passphrase, stored in escrow.
    let (prompt, _) = Scripted::new(&["S1-secret"]);
    let mut first = manager(&path, SessionConfig::default(), &escrow, prompt);
    first.authenticate(&load(&path)).unwrap();
    assert_eq!(first.status().method, Some(UnlockMethod::Passphrase));
    assert!(escrow.contains(&app_id_for(&path)));
    drop(first);

    // Second run: nothing typed.
    let (prompt, asked) = Scripted::new(&[]);
    let mut second = manager(&path, SessionConfig::default(), &escrow, prompt);
    let secret = second.authenticate(&load(&path)).unwrap();
    assert_eq!(secret.expose(), b"S1-secret");
    assert_eq!(second.status().method, Some(UnlockMethod::Escrow));
    assert_eq!(asked.get(), 0);
}

#[test]
fn stale_escrow_is_discarded_and_replaced() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("vault.db");
    create_vault(&path, "S2-secret");
    let app_id = app_id_for(&path);

    let escrow = MemoryEscrow::default();
    escrow
        .clone()
        .store(&app_id, &MasterSecret::from_string("S1-old".into()))
        .unwrap();

    let (prompt, asked) = Scripted::new(&["S2-secret"]);
    let mut session = manager(&path, SessionConfig::default(), &escrow, prompt);
    session.authenticate(&load(&path)).unwrap();

    assert_eq!(asked.get(), 1);
    let stored = escrow.clone().retrieve(&app_id).unwrap().unwrap();
    assert_eq!(stored.expose(), b"S2-secret");
}

#[test]
fn wrong_passphrases_exhaust_the_attempts() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("vault.db");
    create_vault(&path, "right");
    let escrow = MemoryEscrow::default();

    let config = SessionConfig {
        max_auth_attempts: 2,
        ..SessionConfig::default()
    };
    let (prompt, asked) = Scripted::new(&["nope", "still nope", "right"]);
    let mut session = manager(&path, config, &escrow, prompt);

    let err = session.authenticate(&load(&path)).unwrap_err();
    assert!(matches!(err, PassGenError::AuthenticationFailed));
    assert_eq!(asked.get(), 2);
    assert_eq!(session.status().phase, SessionPhase::Locked);
    assert!(!escrow.contains(&app_id_for(&path)));
}

#[test]
fn cached_secret_expires_after_the_timeout() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("vault.db");
    create_vault(&path, "S1-secret");

    let config = SessionConfig {
        timeout_seconds: 60,
        escrow_fallback: false,
        ..SessionConfig::default()
    };
    let clock = ManualClock::default();
    let (prompt, asked) = Scripted::new(&["S1-secret", "S1-secret"]);
    let mut session = manager(&path, config, &MemoryEscrow::default(), prompt)
        .with_clock(Box::new(clock.clone()));

    session.authenticate(&load(&path)).unwrap();
    clock.advance(chrono::Duration::seconds(59));
    session.authenticate(&load(&path)).unwrap();
    assert_eq!(asked.get(), 1);
    assert_eq!(session.status().remaining_seconds, Some(1));

    clock.advance(chrono::Duration::seconds(1));
    assert_eq!(session.status().phase, SessionPhase::Locked);
    session.authenticate(&load(&path)).unwrap();
    assert_eq!(asked.get(), 2);
}

#[test]
fn lock_everywhere_forgets_the_escrowed_secret() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("vault.db");
    create_vault(&path, "S1-secret");
    let escrow = MemoryEscrow::default();

    let (prompt, _) = Scripted::new(&["S1-secret"]);
    let mut session = manager(&path, SessionConfig::default(), &escrow, prompt);
    session.authenticate(&load(&path)).unwrap();
    assert!(escrow.contains(session.app_id()));

    session.lock_everywhere().unwrap();
    assert!(!escrow.contains(session.app_id()));
    assert_eq!(session.status().phase, SessionPhase::Locked);
}

#[test]
fn app_id_is_stable_before_and_after_the_vault_exists() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("vault.db");

    let before = app_id_for(&path);
    create_vault(&path, "S1-secret");
    let after = app_id_for(&path);

    assert_eq!(before, after);
    assert!(before.starts_with("passgen:"));
}
