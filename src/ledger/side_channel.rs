use serde_json::{Map, Value};

use crate::models::{Prayer, SupplementaryPrayer};

/// Attributes that live in a daily row's `extras` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuxKey {
    /// Why an obligatory prayer was missed.
    Reason(Prayer),
    /// Chosen rakaat count of a supplementary prayer.
    Rakaat(SupplementaryPrayer),
}

impl AuxKey {
    pub fn name(&self) -> String {
        match self {
            AuxKey::Reason(p) => format!("{}_reason", p.as_str()),
            AuxKey::Rakaat(s) => format!("{}_rakaat", s.as_str()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuxValue {
    Text(String),
    Count(u8),
}

impl AuxValue {
    fn to_json(&self) -> Value {
        match self {
            AuxValue::Text(s) => Value::String(s.clone()),
            AuxValue::Count(n) => Value::from(*n),
        }
    }
}

/// Key→value mapping serialized as a JSON object into one text column.
///
/// Parsing never fails: absent, empty, or malformed content is an empty
/// mapping. Keys this module doesn't know are carried through untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SideChannel {
    fields: Map<String, Value>,
}

impl SideChannel {
    pub fn parse(blob: Option<&str>) -> Self {
        let Some(text) = blob.map(str::trim).filter(|t| !t.is_empty()) else {
            return Self::default();
        };
        match serde_json::from_str::<Value>(text) {
            Ok(Value::Object(fields)) => Self { fields },
            Ok(_) => {
                log::debug!("Side channel is not a JSON object, treating as empty");
                Self::default()
            }
            Err(e) => {
                log::debug!("Unreadable side channel ({}), treating as empty", e);
                Self::default()
            }
        }
    }

    /// Serialized form, or `None` when nothing is stored.
    pub fn encode(&self) -> Option<String> {
        if self.fields.is_empty() {
            None
        } else {
            Some(Value::Object(self.fields.clone()).to_string())
        }
    }

    pub fn get(&self, key: AuxKey) -> Option<AuxValue> {
        let value = self.fields.get(&key.name())?;
        match key {
            AuxKey::Reason(_) => value.as_str().map(|s| AuxValue::Text(s.to_string())),
            AuxKey::Rakaat(_) => value
                .as_u64()
                .and_then(|n| u8::try_from(n).ok())
                .map(AuxValue::Count),
        }
    }

    pub fn set(&mut self, key: AuxKey, value: AuxValue) {
        self.fields.insert(key.name(), value.to_json());
    }

    pub fn remove(&mut self, key: AuxKey) {
        self.fields.remove(&key.name());
    }

    pub fn reason(&self, prayer: Prayer) -> Option<String> {
        match self.get(AuxKey::Reason(prayer)) {
            Some(AuxValue::Text(s)) => Some(s),
            _ => None,
        }
    }

    pub fn rakaat(&self, kind: SupplementaryPrayer) -> Option<u8> {
        match self.get(AuxKey::Rakaat(kind)) {
            Some(AuxValue::Count(n)) => Some(n),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
