//! Sparse change-sets for partial updates.
//!
//! A field the caller never mentioned must be left untouched, which is not
//! the same thing as a field explicitly supplied as `null`. `Patch<T>`
//! keeps the two apart: with `#[serde(default)]` an omitted field stays
//! [`Patch::Absent`], while any supplied value (including `null` through a
//! `Patch<Option<T>>`) becomes [`Patch::Set`].

use serde::{Deserialize, Deserializer};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Patch<T> {
    Absent,
    Set(T),
}

// Not derived: `Absent` is the default for every `T`, Default or not.
impl<T> Default for Patch<T> {
    fn default() -> Self {
        Patch::Absent
    }
}

impl<T> Patch<T> {
    pub fn is_set(&self) -> bool {
        matches!(self, Patch::Set(_))
    }

    pub fn as_ref(&self) -> Option<&T> {
        match self {
            Patch::Set(value) => Some(value),
            Patch::Absent => None,
        }
    }

    /// The effective value: the supplied one if present, else `current`.
    pub fn resolve(self, current: T) -> T {
        match self {
            Patch::Set(value) => value,
            Patch::Absent => current,
        }
    }

    /// Assign into `slot` only when a value was supplied.
    pub fn apply_to(self, slot: &mut T) {
        if let Patch::Set(value) = self {
            *slot = value;
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Patch<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        T::deserialize(deserializer).map(Patch::Set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct UpdateRequest {
        #[serde(default)]
        label: Patch<String>,
        #[serde(default)]
        description: Patch<Option<String>>,
    }

    #[test]
    fn omitted_field_stays_absent() {
        let req: UpdateRequest = serde_json::from_str(r#"{"label":"tajweed"}"#).unwrap();
        assert_eq!(req.label, Patch::Set("tajweed".into()));
        assert_eq!(req.description, Patch::Absent);
    }

    #[test]
    fn explicit_null_is_a_set_value() {
        let req: UpdateRequest = serde_json::from_str(r#"{"description":null}"#).unwrap();
        assert_eq!(req.label, Patch::Absent);
        assert_eq!(req.description, Patch::Set(None));
    }

    #[test]
    fn apply_to_leaves_absent_slots_untouched() {
        let req: UpdateRequest = serde_json::from_str(r#"{"label":"madd"}"#).unwrap();
        let mut label = "old".to_string();
        let mut description = Some("keep me".to_string());
        req.label.apply_to(&mut label);
        req.description.apply_to(&mut description);
        assert_eq!(label, "madd");
        assert_eq!(description.as_deref(), Some("keep me"));
    }

    #[test]
    fn resolve_prefers_the_supplied_value() {
        assert_eq!(Patch::Set(2.5).resolve(1.0), 2.5);
        assert_eq!(Patch::<f64>::Absent.resolve(1.0), 1.0);
    }
}
