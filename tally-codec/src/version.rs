//! Workflow version tags.

use crate::error::CodecError;

/// Numeric segments of a dotted version, trailing zeros removed so that
/// `1.2` and `1.2.0` compare equal.
fn sort_key(version: &str) -> Result<Vec<u64>, CodecError> {
    let mut segments = version
        .split('.')
        .map(|s| s.parse::<u64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| CodecError::InvalidVersion(version.to_owned()))?;
    while segments.len() > 1 && segments.last() == Some(&0) {
        segments.pop();
    }
    Ok(segments)
}

/// The highest version with its last segment incremented.
///
/// `["1.0.1", "1.2.0", "2.0.1", "0.0.9"]` gives `"2.0.2"`.
pub fn next_version<S: AsRef<str>>(versions: &[S]) -> Result<String, CodecError> {
    let mut best: Option<(Vec<u64>, &str)> = None;
    for version in versions {
        let version = version.as_ref();
        let key = sort_key(version)?;
        if best.as_ref().map_or(true, |(k, _)| key > *k) {
            best = Some((key, version));
        }
    }
    let (_, max) = best.ok_or(CodecError::NoVersions)?;

    let (head, last) = match max.rsplit_once('.') {
        Some((head, last)) => (Some(head), last),
        None => (None, max),
    };
    let next = last
        .parse::<u64>()
        .ok()
        .and_then(|n| n.checked_add(1))
        .ok_or_else(|| CodecError::InvalidVersion(max.to_owned()))?;
    Ok(match head {
        Some(head) => format!("{head}.{next}"),
        None => next.to_string(),
    })
}
