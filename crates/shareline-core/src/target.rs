//! Target location: share-URL decomposition.
//!
//! Parsing is pure and cheap, so it is re-run on every retry attempt rather
//! than cached across them.

use crate::error::WriteError;

/// A share URL decomposed into its addressable parts. Derived once per
/// attempt from the request URL and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTarget {
    pub host: String,
    pub share: String,
    /// Path below the share root, `/`-separated, possibly empty.
    pub relative_path: String,
    /// Parent directories of the leaf, shallow to deep.
    pub parent_segments: Vec<String>,
    pub leaf_name: String,
}

impl ParsedTarget {
    /// Decompose `scheme://host/share[/path...]`.
    ///
    /// The scheme prefix is stripped when present; the remainder splits into
    /// at most three components, and the third keeps its internal `/`
    /// separators intact. Fails only when the host component is empty;
    /// everything else is left for the transport to reject.
    pub fn parse(url: &str) -> Result<Self, WriteError> {
        let remainder = match url.find("://") {
            Some(idx) => &url[idx + 3..],
            None => url,
        };

        let mut parts = remainder.splitn(3, '/');
        let host = parts.next().unwrap_or_default().to_string();
        let share = parts.next().unwrap_or_default().to_string();
        let relative_path = parts.next().unwrap_or_default().to_string();

        if host.is_empty() {
            return Err(WriteError::InvalidTarget {
                url: url.to_string(),
                reason: "empty host".to_string(),
            });
        }

        let (parent, leaf) = match relative_path.rfind('/') {
            Some(idx) => (&relative_path[..idx], &relative_path[idx + 1..]),
            None => ("", relative_path.as_str()),
        };
        let parent_segments = parent
            .split('/')
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        let leaf_name = leaf.to_string();

        Ok(Self {
            host,
            share,
            relative_path,
            parent_segments,
            leaf_name,
        })
    }

    /// The leaf's parent directory as a share-relative path, empty when the
    /// leaf sits at the share root.
    pub fn parent_path(&self) -> String {
        self.parent_segments.join("/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deep_path_decomposes() {
        let t = ParsedTarget::parse("smb://host/share/a/b/c.csv").unwrap();
        assert_eq!(t.host, "host");
        assert_eq!(t.share, "share");
        assert_eq!(t.relative_path, "a/b/c.csv");
        assert_eq!(t.parent_segments, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(t.leaf_name, "c.csv");
        assert_eq!(t.parent_path(), "a/b");
    }

    #[test]
    fn leaf_at_share_root_has_no_parent() {
        let t = ParsedTarget::parse("smb://host/share/f.csv").unwrap();
        assert!(t.parent_segments.is_empty());
        assert_eq!(t.leaf_name, "f.csv");
        assert_eq!(t.parent_path(), "");
    }

    #[test]
    fn share_only_url_parses_with_empty_path() {
        let t = ParsedTarget::parse("smb://host/share").unwrap();
        assert_eq!(t.share, "share");
        assert_eq!(t.relative_path, "");
        assert_eq!(t.leaf_name, "");
    }

    #[test]
    fn empty_host_is_invalid() {
        let err = ParsedTarget::parse("smb:///share/f.csv").unwrap_err();
        assert!(matches!(err, WriteError::InvalidTarget { .. }));
        assert!(matches!(
            ParsedTarget::parse("smb://").unwrap_err(),
            WriteError::InvalidTarget { .. }
        ));
    }

    #[test]
    fn missing_scheme_is_tolerated() {
        let t = ParsedTarget::parse("host/share/dir/f.csv").unwrap();
        assert_eq!(t.host, "host");
        assert_eq!(t.parent_segments, vec!["dir".to_string()]);
    }

    #[test]
    fn reparse_is_deterministic() {
        let a = ParsedTarget::parse("smb://h/s/x/y.csv").unwrap();
        let b = ParsedTarget::parse("smb://h/s/x/y.csv").unwrap();
        assert_eq!(a, b);
    }
}
