pub mod local;

use anyhow::Result;

use crate::models::{Madhab, Sex, UserProfile};

pub use local::LocalIdentity;

#[derive(Debug, Clone, PartialEq)]
pub struct NewAccount {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub age: u32,
    pub sex: Sex,
    pub madhab: Madhab,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: String,
    pub email: String,
}

/// Where accounts and the current session come from.
pub trait IdentityProvider {
    /// Creates the account and signs it in.
    fn sign_up(&self, account: NewAccount) -> Result<Session>;
    fn sign_in(&self, email: &str, password: &str) -> Result<Session>;
    fn sign_out(&self) -> Result<()>;
    /// The signed-in user, if the stored session still names an account.
    fn session(&self) -> Result<Option<Session>>;
    fn profile(&self, user_id: &str) -> Result<Option<UserProfile>>;
}
