//! Expansion of user supplied directory paths.

use std::path::{Path, PathBuf};

/// Expands a leading `~` and `$VAR` / `${VAR}` references.
///
/// Unknown variables are left as written.
pub fn normalise_path(path: &Path) -> PathBuf {
    let Some(text) = path.to_str() else {
        return path.to_path_buf();
    };
    let text = match text.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => match std::env::var("HOME") {
            Ok(home) => format!("{home}{rest}"),
            Err(_) => text.to_string(),
        },
        _ => text.to_string(),
    };
    PathBuf::from(expand_vars(&text))
}

fn expand_vars(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];
        let (name, consumed) = if let Some(braced) = after.strip_prefix('{') {
            match braced.find('}') {
                Some(end) => (&braced[..end], end + 2),
                None => ("", 0),
            }
        } else {
            let end = after
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(after.len());
            (&after[..end], end)
        };
        match (name.is_empty(), std::env::var(name)) {
            (false, Ok(value)) => out.push_str(&value),
            _ => out.push_str(&rest[pos..pos + 1 + consumed]),
        }
        rest = &after[consumed..];
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_paths_are_untouched() {
        assert_eq!(normalise_path(Path::new("a/b/c")), PathBuf::from("a/b/c"));
        assert_eq!(normalise_path(Path::new("~user/x")), PathBuf::from("~user/x"));
    }

    #[test]
    fn unknown_variables_are_kept() {
        let path = normalise_path(Path::new("/tmp/$CLUSTZ_SURELY_UNSET_VAR/x"));
        assert_eq!(path, PathBuf::from("/tmp/$CLUSTZ_SURELY_UNSET_VAR/x"));
    }

    #[test]
    fn known_variables_are_expanded() {
        let Ok(home) = std::env::var("HOME") else {
            return;
        };
        assert_eq!(normalise_path(Path::new("${HOME}/x")), PathBuf::from(format!("{home}/x")));
        assert_eq!(normalise_path(Path::new("~/x")), PathBuf::from(format!("{home}/x")));
    }
}
