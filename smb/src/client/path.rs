//! Share relative paths as they go on the wire.

/// Converts `/` separators to `\` and drops empty components, so the result
/// has no leading, trailing or doubled separators. The share root is `""`.
pub fn normalize(path: &str) -> String {
    path.split(['/', '\\'])
        .filter(|component| !component.is_empty())
        .collect::<Vec<_>>()
        .join("\\")
}

/// Splits a normalized path into its parent directory and last component.
pub fn split_parent(path: &str) -> (&str, &str) {
    path.rsplit_once('\\').unwrap_or(("", path))
}

pub fn join(directory: &str, name: &str) -> String {
    if directory.is_empty() {
        name.to_string()
    } else {
        format!("{}\\{}", directory, name)
    }
}

pub fn has_wildcard(component: &str) -> bool {
    component.contains(['*', '?'])
}
