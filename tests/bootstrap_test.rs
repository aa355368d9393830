mod common;

use std::path::Path;

use common::{orchestrator, ScriptedConsole};
use orchestrator_siphon::models::{Credential, Orchestrator, SigningKey};
use orchestrator_siphon::orchestration::{resolve_credentials, KeystoreDecryptor, KeystoreError};

struct FixedPassword(&'static str);

impl KeystoreDecryptor for FixedPassword {
    fn decrypt(&self, _keystore: &Path, password: &str) -> Result<SigningKey, KeystoreError> {
        if password == self.0 {
            Ok(SigningKey::new(vec![0x42; 32]))
        } else {
            Err(KeystoreError::InvalidPassword)
        }
    }
}

fn unresolved(n: u8) -> Orchestrator {
    Orchestrator::new(orchestrator(n).identity().clone(), Credential::Unresolved)
}

#[tokio::test]
async fn test_prompts_until_keystore_decrypts() {
    let mut orchestrators = vec![orchestrator(1), unresolved(2)];
    let mut console = ScriptedConsole::new(["wrong", "also wrong", "hunter2"]);

    resolve_credentials(&mut orchestrators, &FixedPassword("hunter2"), &mut console)
        .await
        .unwrap();

    assert!(orchestrators.iter().all(|o| o.credential().is_resolved()));
    assert_eq!(console.remaining(), 0);
    let failures = console
        .transcript
        .iter()
        .filter(|line| line.starts_with("Unable to decrypt keystore"))
        .count();
    assert_eq!(failures, 2);
    // Orchestrator 1 was already resolved and never prompted
    let prompts = console
        .transcript
        .iter()
        .filter(|line| line.starts_with("Enter the password"))
        .count();
    assert_eq!(prompts, 3);
}

#[tokio::test]
async fn test_closed_console_leaves_credential_unresolved() {
    let mut orchestrators = vec![unresolved(1)];
    let mut console = ScriptedConsole::new(["wrong"]);

    let result =
        resolve_credentials(&mut orchestrators, &FixedPassword("hunter2"), &mut console).await;

    assert!(result.is_err());
    assert!(!orchestrators[0].credential().is_resolved());
}
