//! Utility functions shared by the mapper and reducer entry points.

use std::path::PathBuf;

use anyhow::Result;
use glob::glob;

/// Splits a comma-separated host list such as `"a:1831, b:1831"`.
///
/// Surrounding whitespace is trimmed and blank entries are dropped.
pub fn split_hosts(hosts: &str) -> Vec<String> {
    hosts
        .split(',')
        .map(str::trim)
        .filter(|host| !host.is_empty())
        .map(String::from)
        .collect()
}

/// Expands input glob patterns into concrete paths, in argument order.
///
/// A pattern that matches nothing is passed through unchanged, so a missing
/// file still gets its own task and its own error.
pub fn expand_inputs<S: AsRef<str>>(patterns: &[S]) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for pattern in patterns {
        let pattern = pattern.as_ref();
        let matched = glob(pattern)?.flatten().collect::<Vec<_>>();
        if matched.is_empty() {
            paths.push(PathBuf::from(pattern));
        } else {
            paths.extend(matched);
        }
    }
    Ok(paths)
}
