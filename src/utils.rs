/// Directory part of a POSIX path, without the trailing slash.
/// `"a/b/c"` gives `"a/b"`, `"c"` gives `""` and `"/c"` gives `"/"`.
pub fn dirname(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) => "/",
        Some(idx) => &path[..idx],
        None => "",
    }
}

/// Quotes an argument for a raw SFTP quote command
pub fn quote(arg: &str) -> String {
    let escaped = arg.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
}

/// `true` if `name` starts with a non-empty hide marker
pub fn is_hidden(name: &str, marker: &str) -> bool {
    !marker.is_empty() && name.starts_with(marker)
}
