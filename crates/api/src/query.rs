//! Shared query parameter types for API handlers.

use std::collections::HashSet;

use serde::Deserialize;

/// Filenames the client already holds (`?known=a.json,b.json`).
#[derive(Debug, Default, Deserialize)]
pub struct KnownFilesParams {
    pub known: Option<String>,
}

impl KnownFilesParams {
    /// Non-empty, trimmed entries of the comma-separated list.
    pub fn known_set(&self) -> HashSet<String> {
        self.known
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_set_splits_and_trims() {
        let params = KnownFilesParams {
            known: Some(" a.json, ,b.json,a.json".into()),
        };
        let set = params.known_set();
        assert_eq!(set.len(), 2);
        assert!(set.contains("a.json"));
        assert!(set.contains("b.json"));
    }

    #[test]
    fn missing_param_is_empty() {
        assert!(KnownFilesParams::default().known_set().is_empty());
    }
}
