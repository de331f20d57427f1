//! URL path to base-path resolution.
//!
//! A base path names a list page. Detail, edit and create routes under it
//! share its page permissions: `/sales/invoices/42`, `/sales/invoices/new`
//! and `/sales/invoices` all resolve to `/sales/invoices`.

/// Minimum length of a hex-like segment treated as an instance id.
const MIN_HEX_ID_LEN: usize = 8;

/// Non-empty segments of a path. Query strings and fragments are ignored.
pub fn segments(path: &str) -> Vec<&str> {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// True for a trailing segment that identifies an instance rather than a
/// page: `new`, `create`, all digits, or a hex-like id of length 8+.
pub fn is_instance_segment(segment: &str) -> bool {
    if segment == "new" || segment == "create" {
        return true;
    }
    if !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit()) {
        return true;
    }
    segment.len() >= MIN_HEX_ID_LEN
        && segment.bytes().all(|b| b.is_ascii_hexdigit() || b == b'-')
        && segment.bytes().any(|b| b.is_ascii_hexdigit())
}

/// Canonical base path for `path`.
pub fn base_path_from(path: &str) -> String {
    let segs = segments(path);
    match segs.as_slice() {
        [] => "/".to_string(),
        [only] => format!("/{}", only),
        [rest @ .., last] if is_instance_segment(last) => format!("/{}", rest.join("/")),
        [first, second, ..] => format!("/{}/{}", first, second),
    }
}
