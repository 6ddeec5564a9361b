//! Blob path convention: `{scope}/{owner}/{epoch_millis}_{sanitized_name}`.
//!
//! Other readers of the bucket parse paths with this layout to recover the
//! scope, owner, upload time and file name, so the format must not drift.

use std::fmt;
use std::str::FromStr;

/// Replace every character outside `[A-Za-z0-9.-]` with `_`.
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoragePath {
    pub scope_key: String,
    pub owner_id: String,
    pub uploaded_at_millis: i64,
    /// Already sanitized.
    pub file_name: String,
}

impl StoragePath {
    pub fn new(scope_key: &str, owner_id: &str, uploaded_at_millis: i64, file_name: &str) -> Self {
        Self {
            scope_key: scope_key.to_string(),
            owner_id: owner_id.to_string(),
            uploaded_at_millis,
            file_name: sanitize_file_name(file_name),
        }
    }
}

impl fmt::Display for StoragePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}_{}",
            self.scope_key, self.owner_id, self.uploaded_at_millis, self.file_name
        )
    }
}

impl FromStr for StoragePath {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, '/');
        let (scope_key, owner_id, object) = match (parts.next(), parts.next(), parts.next()) {
            (Some(scope), Some(owner), Some(object))
                if !scope.is_empty() && !owner.is_empty() =>
            {
                (scope, owner, object)
            }
            _ => return Err(format!("Invalid storage path: {}", s)),
        };

        let (millis, file_name) = object
            .split_once('_')
            .ok_or_else(|| format!("Storage path has no timestamp prefix: {}", s))?;

        if millis.is_empty() || !millis.bytes().all(|b| b.is_ascii_digit()) {
            return Err(format!("Storage path has an invalid timestamp: {}", s));
        }
        let uploaded_at_millis = millis
            .parse()
            .map_err(|e| format!("Storage path timestamp out of range ({}): {}", e, s))?;

        if file_name.is_empty() || file_name.contains('/') {
            return Err(format!("Storage path has an invalid file name: {}", s));
        }

        Ok(Self {
            scope_key: scope_key.to_string(),
            owner_id: owner_id.to_string(),
            uploaded_at_millis,
            file_name: file_name.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_replaces_everything_outside_the_allowed_set() {
        assert_eq!(sanitize_file_name("Q3 report (final).pdf"), "Q3_report__final_.pdf");
        assert_eq!(sanitize_file_name("10-K_2023.pdf"), "10-K_2023.pdf");
        assert_eq!(sanitize_file_name("résumé.txt"), "r_sum_.txt");
        assert_eq!(sanitize_file_name("a/b\\c.csv"), "a_b_c.csv");
    }

    #[test]
    fn formats_with_the_wire_layout() {
        let path = StoragePath::new("AAPL", "user1", 1_700_000_000_123, "earnings call.mp3");
        assert_eq!(path.to_string(), "AAPL/user1/1700000000123_earnings_call.mp3");
    }

    #[test]
    fn parse_recovers_components() {
        let path: StoragePath = "BRK.B/u-42/1700000000123_my_file_v2.pdf".parse().unwrap();
        assert_eq!(path.scope_key, "BRK.B");
        assert_eq!(path.owner_id, "u-42");
        assert_eq!(path.uploaded_at_millis, 1_700_000_000_123);
        assert_eq!(path.file_name, "my_file_v2.pdf");
    }

    #[test]
    fn parse_rejects_malformed_paths() {
        for bad in [
            "AAPL/user1",
            "AAPL//1_a.pdf",
            "AAPL/user1/a.pdf",
            "AAPL/user1/abc_a.pdf",
            "AAPL/user1/1_",
            "AAPL/user1/1_dir/a.pdf",
        ] {
            assert!(bad.parse::<StoragePath>().is_err(), "accepted {bad:?}");
        }
    }
}
