// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Registry of valid airports and colleges.
//!
//! Loaded once at startup from line-delimited files and never mutated.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

pub const AIRPORTS_FILE: &str = "airport-codes.dat";
pub const COLLEGES_FILE: &str = "colleges.dat";

/// Immutable sets of known destinations.
#[derive(Debug, Default, Clone)]
pub struct DestinationRegistry {
    airport_codes: HashSet<String>,
    colleges: HashSet<String>,
}

impl DestinationRegistry {
    /// Load `airport-codes.dat` and `colleges.dat` from a directory.
    pub fn load_from_dir<P: AsRef<Path>>(dir: P) -> Result<Self, DestinationError> {
        let dir = dir.as_ref();
        let airports = read_entries(&dir.join(AIRPORTS_FILE))?;
        let colleges = read_entries(&dir.join(COLLEGES_FILE))?;

        if airports.is_empty() || colleges.is_empty() {
            return Err(DestinationError::Empty(dir.display().to_string()));
        }

        let registry = Self::from_lines(airports, colleges);
        tracing::info!(
            airports = registry.airport_codes.len(),
            colleges = registry.colleges.len(),
            "Loaded destinations"
        );
        Ok(registry)
    }

    /// Build a registry from in-memory entries.
    pub fn from_lines<A, C, S>(airports: A, colleges: C) -> Self
    where
        A: IntoIterator<Item = S>,
        C: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            airport_codes: clean(airports),
            colleges: clean(colleges),
        }
    }

    pub fn airport_codes(&self) -> &HashSet<String> {
        &self.airport_codes
    }

    pub fn colleges(&self) -> &HashSet<String> {
        &self.colleges
    }

    pub fn has_airport(&self, code: &str) -> bool {
        self.airport_codes.contains(code)
    }

    pub fn has_college(&self, name: &str) -> bool {
        self.colleges.contains(name)
    }
}

fn clean<I, S>(lines: I) -> HashSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    lines
        .into_iter()
        .map(|line| line.as_ref().trim().to_string())
        .filter(|line| !line.is_empty())
        .collect()
}

fn read_entries(path: &Path) -> Result<Vec<String>, DestinationError> {
    let contents = fs::read_to_string(path).map_err(|e| DestinationError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    Ok(contents.lines().map(str::to_string).collect())
}

/// Errors from destination loading.
#[derive(Debug, thiserror::Error)]
pub enum DestinationError {
    #[error("Failed to read {path}: {message}")]
    Io { path: String, message: String },

    #[error("No destinations found in {0}")]
    Empty(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_lines_trims_and_skips_blanks() {
        let registry = DestinationRegistry::from_lines(
            vec!["BOS", " JFK ", "", "  "],
            vec!["Tufts University", "MIT\r"],
        );
        assert_eq!(registry.airport_codes().len(), 2);
        assert!(registry.has_airport("JFK"));
        assert!(registry.has_college("MIT"));
        assert!(!registry.has_airport(""));
        assert!(!registry.has_college("Harvard"));
    }

    #[test]
    fn test_load_from_missing_dir_fails() {
        let err = DestinationRegistry::load_from_dir("/nonexistent/igetback").unwrap_err();
        assert!(matches!(err, DestinationError::Io { .. }));
    }

    #[test]
    fn test_load_from_dir() {
        let dir = std::env::temp_dir().join(format!("igetback-dest-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(AIRPORTS_FILE), "BOS\nLGA\n\n").unwrap();
        fs::write(dir.join(COLLEGES_FILE), "Tufts University\n").unwrap();

        let registry = DestinationRegistry::load_from_dir(&dir).unwrap();
        assert!(registry.has_airport("LGA"));
        assert!(registry.has_college("Tufts University"));

        fs::remove_dir_all(&dir).ok();
    }
}
