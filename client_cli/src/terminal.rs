//! Interactive prompts behind a trait, so commands stay testable with
//! scripted answers instead of a terminal.

use std::collections::VecDeque;
use std::io;

use dialoguer::{theme::ColorfulTheme, Confirm, Password};
use eyre::{eyre, Result};
use kestrel_crypto::KeyPair;

use crate::accounts::{StoreError, StoredAccount};

/// Source of interactive answers.
pub trait Prompter {
    /// Ask for a hidden password.
    fn password(&mut self, prompt: &str) -> io::Result<String>;

    /// Ask for a new password, typed twice.
    fn new_password(&mut self, prompt: &str) -> io::Result<String>;

    /// Ask a yes/no question.
    fn confirm(&mut self, prompt: &str) -> io::Result<bool>;
}

/// The real terminal, via `dialoguer`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DialoguerPrompter;

impl Prompter for DialoguerPrompter {
    fn password(&mut self, prompt: &str) -> io::Result<String> {
        Password::with_theme(&ColorfulTheme::default())
            .with_prompt(prompt)
            .allow_empty_password(true)
            .interact()
    }

    fn new_password(&mut self, prompt: &str) -> io::Result<String> {
        Password::with_theme(&ColorfulTheme::default())
            .with_prompt(prompt)
            .with_confirmation("Repeat the password", "The passwords do not match")
            .allow_empty_password(true)
            .interact()
    }

    fn confirm(&mut self, prompt: &str) -> io::Result<bool> {
        Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(prompt)
            .default(false)
            .interact()
    }
}

/// Canned answers for tests and non-interactive runs.
#[derive(Debug, Default)]
#[cfg_attr(not(test), allow(dead_code))]
pub struct ScriptedPrompter {
    passwords: VecDeque<String>,
    confirmations: VecDeque<bool>,
}

#[cfg_attr(not(test), allow(dead_code))]
impl ScriptedPrompter {
    /// Prompter that answers passwords from `passwords` and yes/no
    /// questions from `confirmations`, in order.
    pub fn new(
        passwords: impl IntoIterator<Item = String>,
        confirmations: impl IntoIterator<Item = bool>,
    ) -> Self {
        Self {
            passwords: passwords.into_iter().collect(),
            confirmations: confirmations.into_iter().collect(),
        }
    }

    fn exhausted(what: &str) -> io::Error {
        io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("no scripted {what} left"),
        )
    }
}

impl Prompter for ScriptedPrompter {
    fn password(&mut self, _prompt: &str) -> io::Result<String> {
        self.passwords
            .pop_front()
            .ok_or_else(|| Self::exhausted("password"))
    }

    fn new_password(&mut self, prompt: &str) -> io::Result<String> {
        self.password(prompt)
    }

    fn confirm(&mut self, _prompt: &str) -> io::Result<bool> {
        self.confirmations
            .pop_front()
            .ok_or_else(|| Self::exhausted("confirmation"))
    }
}

/// Bounded password retry for opening stored accounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordPolicy {
    /// Prompt attempts before giving up.
    pub max_attempts: u32,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self { max_attempts: 3 }
    }
}

impl PasswordPolicy {
    /// Open `account`, prompting for the password up to
    /// [`Self::max_attempts`] times. The empty password is tried first
    /// without prompting.
    ///
    /// # Errors
    ///
    /// [`StoreError::BadPassword`] after the last failed attempt, any
    /// prompt failure as is.
    pub fn unseal(
        &self,
        account: &StoredAccount,
        prompter: &mut dyn Prompter,
    ) -> Result<KeyPair> {
        if account.opens_without_password() {
            return Ok(account.unseal("")?);
        }
        if self.max_attempts == 0 {
            return Err(eyre!("password prompting is disabled and the account `{}` needs one", account.name));
        }
        for attempt in 1..=self.max_attempts {
            let password =
                prompter.password(&format!("Password for account `{}`", account.name))?;
            match account.unseal(&password) {
                Ok(pair) => return Ok(pair),
                Err(StoreError::BadPassword(_)) if attempt < self.max_attempts => {
                    eprintln!("Wrong password, {} attempts left", self.max_attempts - attempt);
                }
                Err(error) => return Err(error.into()),
            }
        }
        unreachable!("the loop returns on the last attempt")
    }
}

#[cfg(test)]
mod tests {
    use kestrel_crypto::{Algorithm, Ss58Format};
    use kestrel_data_model::ErrorKind;

    use super::*;

    fn sealed(password: &str) -> StoredAccount {
        let seed = [0x42; 32];
        let pair = KeyPair::from_seed(seed, Algorithm::Ed25519).unwrap();
        StoredAccount::seal("test", &pair, &seed, password, Ss58Format::KESTREL).unwrap()
    }

    #[test]
    fn retries_until_the_right_password() {
        let account = sealed("sesame");
        let mut prompter = ScriptedPrompter::new(
            ["nope".to_owned(), "still no".to_owned(), "sesame".to_owned()],
            [],
        );
        let policy = PasswordPolicy { max_attempts: 3 };
        policy.unseal(&account, &mut prompter).unwrap();
    }

    #[test]
    fn gives_up_after_the_last_attempt() {
        let account = sealed("sesame");
        let mut prompter =
            ScriptedPrompter::new(["a".to_owned(), "b".to_owned()], []);
        let policy = PasswordPolicy { max_attempts: 2 };
        let report = policy.unseal(&account, &mut prompter).unwrap_err();
        let store_error = report.downcast_ref::<StoreError>().unwrap();
        assert_eq!(store_error.kind(), ErrorKind::NoAccountFound);
    }

    #[test]
    fn empty_password_accounts_skip_prompting() {
        let account = sealed("");
        // No scripted answers at all: a prompt would fail.
        let mut prompter = ScriptedPrompter::default();
        let policy = PasswordPolicy::default();
        policy.unseal(&account, &mut prompter).unwrap();
    }
}
