use chrono::NaiveDate;

/// User id substituted when nobody is signed in.
pub const GUEST_USER: &str = "guest";

const NAMESPACE: &str = "amal";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Daily,
    Fasting,
    Recitation,
    Donations,
    Weekly,
    Agenda,
    Targets,
    Accounts,
    Session,
}

impl Category {
    pub fn tag(&self) -> &'static str {
        match self {
            Category::Daily => "daily",
            Category::Fasting => "fasting",
            Category::Recitation => "recitation",
            Category::Donations => "donations",
            Category::Weekly => "weekly",
            Category::Agenda => "agenda",
            Category::Targets => "targets",
            Category::Accounts => "accounts",
            Category::Session => "session",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Secondary {
    Date(NaiveDate),
    Week(u8),
    Id(String),
}

impl std::fmt::Display for Secondary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Secondary::Date(d) => write!(f, "d:{}", d.format("%Y-%m-%d")),
            Secondary::Week(w) => write!(f, "w:{}", w),
            Secondary::Id(id) => write!(f, "id:{}", id),
        }
    }
}

/// Stable storage key for (user, category, secondary).
///
/// The user id is length-prefixed and the secondary part is type-tagged and
/// always last, so distinct triples never encode to the same string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StorageKey(String);

impl StorageKey {
    pub fn new(user: Option<&str>, category: Category, secondary: Option<Secondary>) -> Self {
        let user = resolve_user(user);
        let mut key = format!("{}/{}:{}/{}", NAMESPACE, user.len(), user, category.tag());
        if let Some(secondary) = secondary {
            key.push('/');
            key.push_str(&secondary.to_string());
        }
        StorageKey(key)
    }

    /// Key of a whole per-user collection.
    pub fn collection(user: Option<&str>, category: Category) -> Self {
        Self::new(user, category, None)
    }

    pub fn dated(user: Option<&str>, category: Category, date: NaiveDate) -> Self {
        Self::new(user, category, Some(Secondary::Date(date)))
    }

    pub fn weekly(user: Option<&str>, week: u8) -> Self {
        Self::new(user, Category::Weekly, Some(Secondary::Week(week)))
    }

    /// Key outside any user's namespace (accounts, the session slot).
    pub fn shared(category: Category) -> Self {
        StorageKey(format!("{}/{}", NAMESPACE, category.tag()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for StorageKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn resolve_user(user: Option<&str>) -> &str {
    match user {
        Some(u) if !u.is_empty() => u,
        _ => GUEST_USER,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn same_triple_same_key() {
        let a = StorageKey::dated(Some("u1"), Category::Daily, date("2026-03-01"));
        let b = StorageKey::dated(Some("u1"), Category::Daily, date("2026-03-01"));
        assert_eq!(a, b);
    }

    #[test]
    fn guest_substitution() {
        let none = StorageKey::collection(None, Category::Agenda);
        let empty = StorageKey::collection(Some(""), Category::Agenda);
        let guest = StorageKey::collection(Some(GUEST_USER), Category::Agenda);
        assert_eq!(none, guest);
        assert_eq!(empty, guest);
    }

    #[test]
    fn tricky_ids_do_not_collide() {
        let keys = [
            StorageKey::collection(Some("a/1:b"), Category::Daily),
            StorageKey::collection(Some("a"), Category::Daily),
            StorageKey::new(Some("a"), Category::Daily, Some(Secondary::Id("x".into()))),
            StorageKey::new(Some("a/daily"), Category::Daily, None),
            StorageKey::weekly(Some("a"), 1),
            StorageKey::new(Some("a"), Category::Weekly, Some(Secondary::Id("1".into()))),
            StorageKey::dated(Some("a"), Category::Fasting, date("2026-03-01")),
            StorageKey::dated(Some("a"), Category::Daily, date("2026-03-01")),
            StorageKey::shared(Category::Accounts),
            StorageKey::collection(Some("accounts"), Category::Accounts),
        ];
        let unique: HashSet<_> = keys.iter().collect();
        assert_eq!(unique.len(), keys.len());
    }
}
