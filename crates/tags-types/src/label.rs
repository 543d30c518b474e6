//! Relation labels.
//!
//! A label names the semantic role of a relation: the element slot of a
//! sequence (`"item"`), or the key of a mapping entry (`"name"`, `"email"`).
//! Labels are freeform UTF-8 with two restrictions:
//!
//! - No control characters (`\0`, `\n`, `\t`, ...)
//! - At most [`Label::MAX_LEN`] bytes; repositories may configure a lower cap

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// The semantic role of a relation.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Label(String);

impl Label {
    /// Hard upper bound on label length in bytes.
    pub const MAX_LEN: usize = 4096;

    /// Label used for every element relation of a sequence.
    pub const ITEM: &'static str = "item";

    /// Validate and wrap a label.
    ///
    /// # Examples
    ///
    /// ```
    /// use tags_types::Label;
    ///
    /// assert!(Label::new("field:name").is_ok());
    /// assert!(Label::new("").is_ok());
    /// assert!(Label::new("bad\nlabel").is_err());
    /// ```
    pub fn new(label: impl Into<String>) -> Result<Self, TypeError> {
        let label = label.into();
        validate(&label, Self::MAX_LEN)?;
        Ok(Self(label))
    }

    /// The label for sequence elements.
    pub fn item() -> Self {
        Self(Self::ITEM.to_string())
    }

    /// Check this label against a tighter, repository-configured length cap.
    pub fn check_len(&self, max_len: usize) -> Result<(), TypeError> {
        validate(&self.0, max_len)
    }

    /// The label text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the label, returning its text.
    pub fn into_string(self) -> String {
        self.0
    }
}

fn validate(label: &str, max_len: usize) -> Result<(), TypeError> {
    if label.len() > max_len {
        return Err(TypeError::InvalidLabel {
            label: label.chars().take(32).collect(),
            reason: format!("longer than {max_len} bytes"),
        });
    }
    if let Some(ch) = label.chars().find(|c| c.is_control()) {
        return Err(TypeError::InvalidLabel {
            label: label.to_string(),
            reason: format!("contains control character {ch:?}"),
        });
    }
    Ok(())
}

impl TryFrom<String> for Label {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for Label {
    type Error = TypeError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Label> for String {
    fn from(label: Label) -> Self {
        label.0
    }
}

impl AsRef<str> for Label {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Label({:?})", self.0)
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
