//! Environment-backed configuration loading
//!
//! Services fail at startup with one message listing every missing or invalid
//! variable, rather than surfacing them one restart at a time.

use std::fmt::Display;
use std::str::FromStr;

use thiserror::Error;

/// Raised when required configuration is missing or unparseable
#[derive(Debug, Error)]
#[error("configuration error: {0}")]
pub struct ConfigError(pub String);

/// Collects environment lookups and reports all failures at once
#[derive(Debug, Default)]
pub struct EnvReader {
    issues: Vec<String>,
}

impl EnvReader {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a required variable, recording an issue when it is absent or empty
    pub fn require(&mut self, name: &str) -> String {
        match std::env::var(name) {
            Ok(value) if !value.trim().is_empty() => value,
            _ => {
                self.issues.push(format!("{} is not set", name));
                String::new()
            }
        }
    }

    /// Read an optional variable, falling back to a default
    pub fn optional(&mut self, name: &str, default: &str) -> String {
        match std::env::var(name) {
            Ok(value) if !value.trim().is_empty() => value,
            _ => default.to_string(),
        }
    }

    /// Read and parse an optional variable, recording an issue when the value
    /// is present but does not parse
    pub fn parsed<T>(&mut self, name: &str, default: T) -> T
    where
        T: FromStr,
        T::Err: Display,
    {
        match std::env::var(name) {
            Ok(value) if !value.trim().is_empty() => match value.trim().parse() {
                Ok(parsed) => parsed,
                Err(e) => {
                    self.issues
                        .push(format!("{} has invalid value {:?}: {}", name, value, e));
                    default
                }
            },
            _ => default,
        }
    }

    /// Succeed only when every lookup so far succeeded
    pub fn finish(self) -> Result<(), ConfigError> {
        if self.issues.is_empty() {
            Ok(())
        } else {
            Err(ConfigError(self.issues.join("; ")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_reports_missing_variables() {
        let mut reader = EnvReader::new();
        reader.require("LECTURE_NOTES_TEST_MISSING_A");
        reader.require("LECTURE_NOTES_TEST_MISSING_B");

        let err = reader.finish().unwrap_err();
        let text = err.to_string();
        assert!(text.contains("LECTURE_NOTES_TEST_MISSING_A is not set"));
        assert!(text.contains("LECTURE_NOTES_TEST_MISSING_B is not set"));
    }

    #[test]
    fn test_optional_falls_back_to_default() {
        let mut reader = EnvReader::new();
        let value = reader.optional("LECTURE_NOTES_TEST_MISSING_C", "fallback");
        assert_eq!(value, "fallback");
        assert!(reader.finish().is_ok());
    }

    #[test]
    fn test_parsed_uses_default_when_absent() {
        let mut reader = EnvReader::new();
        let value: u32 = reader.parsed("LECTURE_NOTES_TEST_MISSING_D", 30);
        assert_eq!(value, 30);
        assert!(reader.finish().is_ok());
    }

    #[test]
    fn test_parsed_records_invalid_value() {
        std::env::set_var("LECTURE_NOTES_TEST_BAD_NUMBER", "not-a-number");
        let mut reader = EnvReader::new();
        let value: u64 = reader.parsed("LECTURE_NOTES_TEST_BAD_NUMBER", 7);
        std::env::remove_var("LECTURE_NOTES_TEST_BAD_NUMBER");

        assert_eq!(value, 7);
        let err = reader.finish().unwrap_err();
        assert!(err.to_string().contains("LECTURE_NOTES_TEST_BAD_NUMBER"));
    }

    #[test]
    fn test_require_accepts_present_value() {
        std::env::set_var("LECTURE_NOTES_TEST_PRESENT", "value");
        let mut reader = EnvReader::new();
        let value = reader.require("LECTURE_NOTES_TEST_PRESENT");
        std::env::remove_var("LECTURE_NOTES_TEST_PRESENT");

        assert_eq!(value, "value");
        assert!(reader.finish().is_ok());
    }
}
