/// Failures a user can act on. Storage problems travel as plain `anyhow` errors.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("{0}")]
    Validation(String),

    #[error("An account with email {0} already exists")]
    DuplicateEmail(String),

    #[error("Wrong email or password")]
    InvalidCredentials,

    #[error("Not signed in. Run `amal login` first")]
    NotSignedIn,
}

impl LedgerError {
    pub fn validation(msg: impl Into<String>) -> Self {
        LedgerError::Validation(msg.into())
    }
}
