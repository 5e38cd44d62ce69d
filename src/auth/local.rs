use anyhow::Result;
use chrono::{Local, Timelike};
use sha2::{Digest, Sha256};
use std::sync::Arc;

use crate::auth::{IdentityProvider, NewAccount, Session};
use crate::db::backend::{new_id, AccountRow, Backend};
use crate::error::LedgerError;
use crate::models::UserProfile;

const MIN_PASSWORD_LEN: usize = 6;

/// Accounts kept in the same store as the ledger.
pub struct LocalIdentity {
    backend: Arc<dyn Backend>,
}

impl LocalIdentity {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }
}

fn hash_password(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn validate(account: &NewAccount) -> Result<()> {
    let email = account.email.trim();
    let well_formed = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if !well_formed {
        return Err(LedgerError::validation(format!("'{}' is not a valid email", email)).into());
    }
    if account.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(LedgerError::validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        ))
        .into());
    }
    if account.full_name.trim().is_empty() {
        return Err(LedgerError::validation("Full name is required").into());
    }
    if account.age == 0 || account.age > 120 {
        return Err(LedgerError::validation("Age must be between 1 and 120").into());
    }
    Ok(())
}

fn profile_from_row(row: AccountRow) -> UserProfile {
    UserProfile {
        id: row.id,
        email: row.email,
        full_name: row.full_name,
        age: row.age,
        sex: row.sex,
        madhab: row.madhab,
        created_at: row.created_at,
    }
}

impl IdentityProvider for LocalIdentity {
    fn sign_up(&self, account: NewAccount) -> Result<Session> {
        validate(&account)?;
        let email = normalize_email(&account.email);
        let salt = new_id();
        let now = Local::now().naive_local();
        let row = AccountRow {
            id: new_id(),
            password_hash: hash_password(&salt, &account.password),
            salt,
            email: email.clone(),
            full_name: account.full_name.trim().to_string(),
            age: account.age,
            sex: account.sex,
            madhab: account.madhab,
            created_at: now.with_nanosecond(0).unwrap_or(now),
        };
        if !self.backend.insert_account(&row)? {
            return Err(LedgerError::DuplicateEmail(email).into());
        }
        self.backend.set_session(Some(&row.id))?;
        log::debug!("Registered account {}", row.id);
        Ok(Session {
            user_id: row.id,
            email,
        })
    }

    fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        let email = normalize_email(email);
        let row = self
            .backend
            .account_by_email(&email)?
            .filter(|row| row.password_hash == hash_password(&row.salt, password))
            .ok_or(LedgerError::InvalidCredentials)?;
        self.backend.set_session(Some(&row.id))?;
        Ok(Session {
            user_id: row.id,
            email: row.email,
        })
    }

    fn sign_out(&self) -> Result<()> {
        self.backend.set_session(None)
    }

    fn session(&self) -> Result<Option<Session>> {
        let Some(user_id) = self.backend.session()? else {
            return Ok(None);
        };
        match self.backend.account_by_id(&user_id)? {
            Some(row) => Ok(Some(Session {
                user_id: row.id,
                email: row.email,
            })),
            None => {
                log::warn!("Session names unknown account {}, ignoring", user_id);
                Ok(None)
            }
        }
    }

    fn profile(&self, user_id: &str) -> Result<Option<UserProfile>> {
        Ok(self.backend.account_by_id(user_id)?.map(profile_from_row))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::json_file::JsonFileBackend;
    use crate::db::sqlite::SqliteBackend;
    use crate::models::{Madhab, Sex};

    fn account(email: &str) -> NewAccount {
        NewAccount {
            email: email.into(),
            password: "rahasia123".into(),
            full_name: "Aisyah Rahma".into(),
            age: 27,
            sex: Sex::Female,
            madhab: Madhab::Nu,
        }
    }

    fn sqlite_identity() -> LocalIdentity {
        LocalIdentity::new(Arc::new(SqliteBackend::open_in_memory().unwrap()))
    }

    #[test]
    fn sign_up_signs_in() {
        let auth = sqlite_identity();
        let session = auth.sign_up(account("aisyah@example.com")).unwrap();
        assert_eq!(auth.session().unwrap(), Some(session.clone()));

        let profile = auth.profile(&session.user_id).unwrap().unwrap();
        assert_eq!(profile.first_name(), "Aisyah");
        assert_eq!(profile.sex, Sex::Female);
    }

    #[test]
    fn duplicate_email_rejected_on_both_backends() {
        let dir = tempfile::tempdir().unwrap();
        let backends: Vec<Arc<dyn Backend>> = vec![
            Arc::new(SqliteBackend::open_in_memory().unwrap()),
            Arc::new(JsonFileBackend::open(&dir.path().join("store.json")).unwrap()),
        ];
        for backend in backends {
            let auth = LocalIdentity::new(backend);
            auth.sign_up(account("aisyah@example.com")).unwrap();
            let err = auth.sign_up(account("Aisyah@Example.com")).unwrap_err();
            assert!(matches!(
                err.downcast_ref::<LedgerError>(),
                Some(LedgerError::DuplicateEmail(_))
            ));
        }
    }

    #[test]
    fn wrong_password_rejected() {
        let auth = sqlite_identity();
        auth.sign_up(account("aisyah@example.com")).unwrap();
        auth.sign_out().unwrap();
        assert_eq!(auth.session().unwrap(), None);

        let err = auth.sign_in("aisyah@example.com", "salah").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<LedgerError>(),
            Some(LedgerError::InvalidCredentials)
        ));
        let err = auth.sign_in("nobody@example.com", "rahasia123").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<LedgerError>(),
            Some(LedgerError::InvalidCredentials)
        ));

        let session = auth.sign_in(" AISYAH@example.com ", "rahasia123").unwrap();
        assert_eq!(session.email, "aisyah@example.com");
    }

    #[test]
    fn passwords_are_salted() {
        let auth = sqlite_identity();
        auth.sign_up(account("a@example.com")).unwrap();
        auth.sign_up(account("b@example.com")).unwrap();
        let a = auth.backend.account_by_email("a@example.com").unwrap().unwrap();
        let b = auth.backend.account_by_email("b@example.com").unwrap().unwrap();
        assert_ne!(a.password_hash, b.password_hash);
        assert_ne!(a.password_hash, "rahasia123");
    }

    #[test]
    fn bad_registration_input() {
        let auth = sqlite_identity();
        for bad in [
            NewAccount { email: "no-at-sign".into(), ..account("") },
            NewAccount { password: "123".into(), ..account("x@example.com") },
            NewAccount { full_name: "  ".into(), ..account("x@example.com") },
            NewAccount { age: 0, ..account("x@example.com") },
        ] {
            let err = auth.sign_up(bad).unwrap_err();
            assert!(matches!(
                err.downcast_ref::<LedgerError>(),
                Some(LedgerError::Validation(_))
            ));
        }
    }
}
