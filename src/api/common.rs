//! Common API utilities and shared types

use serde::Deserialize;

use crate::models::ListParams;

// ============================================================================
// Pagination Query Types
// ============================================================================

/// `?page=` on listings
///
/// Kept as a raw string so that garbage degrades to page 1 instead of a
/// rejected request.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    pub page: Option<String>,
}

impl PageQuery {
    pub fn params(&self) -> ListParams {
        ListParams::from_query(self.page.as_deref())
    }
}

/// `?next=` on the login endpoint
#[derive(Debug, Default, Deserialize)]
pub struct NextQuery {
    #[serde(default)]
    pub next: Option<String>,
}

impl NextQuery {
    /// Where to go after login; only local paths are honoured
    pub fn target(&self) -> String {
        match self.next.as_deref() {
            Some(path) if is_local(path) => path.to_string(),
            _ => "/".to_string(),
        }
    }
}

/// Browsers read `\` as `/`, so `/\host` is as foreign as `//host`
fn is_local(path: &str) -> bool {
    let mut chars = path.chars();
    chars.next() == Some('/') && !matches!(chars.next(), Some('/' | '\\'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_query_falls_back() {
        let query = PageQuery {
            page: Some("abc".to_string()),
        };
        assert_eq!(query.params().page, 1);
        assert_eq!(PageQuery::default().params().page, 1);
        assert_eq!(PageQuery { page: Some("3".to_string()) }.params().page, 3);
    }

    #[test]
    fn test_next_query_rejects_foreign_targets() {
        let local = NextQuery {
            next: Some("/posts/create/".to_string()),
        };
        assert_eq!(local.target(), "/posts/create/");

        for bad in [
            "https://evil.example/",
            "//evil.example/",
            "/\\evil.example",
            "posts",
        ] {
            let query = NextQuery {
                next: Some(bad.to_string()),
            };
            assert_eq!(query.target(), "/");
        }
    }
}
