//! Mapping of content requests to archive entry paths

use super::error::ArchiveError;

/// Resolve `request_path` (as issued by a content consumer, e.g.
/// `/OEBPS/Text/../Images/cover%20art.png?x=1`) against the package `root`
/// directory inside the archive.
///
/// The result never starts with `/` and never escapes the archive's top
/// level.
pub fn entry_path_for_request(root: &str, request_path: &str) -> Result<String, ArchiveError> {
    let raw = request_path.split(['?', '#']).next().unwrap_or_default();
    let decoded = urlencoding::decode(raw)
        .map_err(|e| ArchiveError::InvalidPath(format!("{request_path}: {e}")))?;

    let mut segments: Vec<&str> = Vec::new();
    for segment in root.split('/').chain(decoded.split('/')) {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.pop().is_none() {
                    return Err(ArchiveError::InvalidPath(request_path.to_string()));
                }
            }
            name => segments.push(name),
        }
    }

    if segments.is_empty() {
        return Err(ArchiveError::InvalidPath(request_path.to_string()));
    }
    Ok(segments.join("/"))
}
