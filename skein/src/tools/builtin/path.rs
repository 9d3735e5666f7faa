//! Path validation shared by the file tools: resolve a path parameter under
//! a tool context's working directory and reject anything that escapes it.

use std::path::{Component, Path, PathBuf};

use crate::tool_source::ToolSourceError;

fn normalize_path(path: &Path) -> PathBuf {
    let mut buf = PathBuf::new();
    for comp in path.components() {
        match comp {
            Component::Prefix(p) => buf = PathBuf::from(p.as_os_str()),
            Component::RootDir => buf.push(comp),
            Component::CurDir => {}
            Component::ParentDir => {
                buf.pop();
            }
            Component::Normal(s) => buf.push(s),
        }
    }
    buf
}

/// Resolves `path_param` relative to `cwd`, rejecting any result that
/// normalizes outside of `cwd`. Does not require the path to exist.
pub fn resolve_path_under(cwd: &Path, path_param: &str) -> Result<PathBuf, ToolSourceError> {
    let base = if cwd.exists() {
        cwd.canonicalize()
            .map_err(|e| ToolSourceError::InvalidInput(format!("invalid working directory: {e}")))?
    } else {
        cwd.to_path_buf()
    };

    let path_param = path_param.trim();
    let path_param = if path_param.is_empty() { "." } else { path_param };
    let full = base.join(path_param);
    let normalized = normalize_path(&full);

    if !normalized.starts_with(&base) {
        return Err(ToolSourceError::InvalidInput(
            "path is outside the working directory".to_string(),
        ));
    }

    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_path_resolves_dot_dot() {
        assert_eq!(normalize_path(Path::new("/a/b/../c")), PathBuf::from("/a/c"));
    }

    #[test]
    fn rejects_escape_above_working_directory() {
        let err = resolve_path_under(Path::new("/tmp"), "../../etc/passwd").unwrap_err();
        assert!(matches!(err, ToolSourceError::InvalidInput(_)));
    }

    #[test]
    fn accepts_relative_path_within_working_directory() {
        let resolved = resolve_path_under(Path::new("/tmp"), "foo/bar.txt").unwrap();
        assert_eq!(resolved, PathBuf::from("/tmp/foo/bar.txt"));
    }
}
