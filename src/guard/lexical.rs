use super::Reason;
use std::path::{Component, Path, PathBuf};

/// Joins `decoded` onto `root` and collapses `.`, `..` and repeated
/// separators without touching the filesystem.
///
/// Both `/` and `\` separate segments on every platform. A leading separator
/// carries no meaning: absolute input is resolved relative to `root`. The
/// result may lie outside `root`; containment is decided separately.
pub fn lexical_candidate(root: &Path, decoded: &str) -> Result<PathBuf, Reason> {
    let mut candidate = root.to_path_buf();
    for segment in decoded.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => {
                candidate.pop();
            }
            name => {
                if !is_single_normal(name) {
                    return Err(Reason::InvalidInput);
                }
                candidate.push(name);
            }
        }
    }
    Ok(candidate)
}

// Rejects segments PathBuf::push would treat as a new root, e.g. `C:` on
// windows.
fn is_single_normal(segment: &str) -> bool {
    let mut components = Path::new(segment).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// Segment-aware containment: `candidate` equals `root` or continues it past a
/// separator boundary, so `/var/www-evil` is never inside `/var/www`.
///
/// Both paths must already be normalized; `Path::starts_with` compares whole
/// components, never raw string prefixes.
pub fn is_contained(root: &Path, candidate: &Path) -> bool {
    candidate.starts_with(root)
}
