//! Validated text primitives shared across the Kinetic workspace.
//!
//! Values of these types are checked once at the boundary (form input, CLI argument, stored
//! record) so the ledger and registry never have to re-check for blank identifiers.

use std::fmt;

/// Errors raised while constructing validated text.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum TextError {
    /// Input was empty after trimming.
    #[error("Text cannot be empty")]
    Empty,
    /// A patient identifier contained interior whitespace.
    #[error("Patient ID must not contain whitespace: '{0}'")]
    WhitespaceInId(String),
}

/// A string type that is never blank.
///
/// Wraps a `String` holding at least one non-whitespace character. Leading and trailing
/// whitespace is stripped when the value is built, so two inputs that differ only in padding
/// produce equal values.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Creates a new `NonEmptyText` from the given input.
    ///
    /// The input is trimmed before it is checked, and the trimmed form is what gets stored.
    ///
    /// # Arguments
    ///
    /// * `input` - Anything that can be viewed as a string slice
    ///
    /// # Returns
    ///
    /// Returns `Ok(NonEmptyText)` holding the trimmed input, or `Err(TextError::Empty)` if
    /// nothing but whitespace was supplied.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the stored text as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the value and returns the owned, trimmed `String`.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for NonEmptyText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for NonEmptyText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for NonEmptyText {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for NonEmptyText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NonEmptyText::new(&s).map_err(serde::de::Error::custom)
    }
}

/// Clinic-assigned patient identifier, e.g. `P001`.
///
/// Identifiers are compared exactly (case-sensitive) once trimmed. Interior whitespace is
/// rejected so an id can always be typed as a single shell word.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PatientId(NonEmptyText);

impl PatientId {
    /// Creates a new `PatientId` from the given input.
    ///
    /// The input goes through the same trimming as [`NonEmptyText::new`], and is then
    /// rejected if any whitespace remains inside it.
    ///
    /// # Arguments
    ///
    /// * `input` - The identifier as typed or stored, e.g. `"P001"`
    ///
    /// # Returns
    ///
    /// Returns `Ok(PatientId)` for a usable identifier. Returns `Err(TextError::Empty)` for
    /// blank input, or `Err(TextError::WhitespaceInId)` when the trimmed id still contains
    /// whitespace.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let text = NonEmptyText::new(input)?;
        if text.as_str().chars().any(char::is_whitespace) {
            return Err(TextError::WhitespaceInId(text.into_inner()));
        }
        Ok(Self(text))
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for PatientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl AsRef<str> for PatientId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl std::str::FromStr for PatientId {
    type Err = TextError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl serde::Serialize for PatientId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> serde::Deserialize<'de> for PatientId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        PatientId::new(&s).map_err(serde::de::Error::custom)
    }
}
