//! Utility functions and helpers.

pub mod http;

use url::Url;

use crate::error::Result;

/// Append `key=value` to the query string of `base`, keeping existing pairs
/// untouched.
pub fn append_query(base: &str, key: &str, value: &str) -> Result<String> {
    let mut url = Url::parse(base)?;
    url.query_pairs_mut().append_pair(key, value);
    Ok(url.to_string())
}
