//! Pure POSIX-style path utilities (tokenize / normalize / join / rebase).
//!
//! Nothing here touches a filesystem or the network; it operates purely on
//! byte strings and is shared by every component that needs to turn a
//! caller-supplied path into a LOOKUP chain.

/// Functions here reject any input longer than this, guarding against an
/// unbounded walk on a pathologically deep or malformed path.
pub const MAX_PATH_LEN: usize = 4096;

/// Error returned by the functions in this module.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PathError {
    /// Input (or a component of it) exceeded [`MAX_PATH_LEN`].
    TooLong,
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::TooLong => write!(f, "path exceeds {MAX_PATH_LEN} bytes"),
        }
    }
}

impl std::error::Error for PathError {}

/// Components of a path plus whether the original path was absolute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tokenized {
    pub absolute: bool,
    pub components: Vec<String>,
}

/// Splits `path` into components, collapsing `.` and resolving lexical `..`.
///
/// `..` at the front of a relative path is preserved (there is nothing to
/// cancel it against); `..` past the root of an absolute path is discarded.
/// `"/"` alone yields an empty, absolute component list.
pub fn tokenize(path: &str) -> Result<Tokenized, PathError> {
    if path.len() > MAX_PATH_LEN {
        return Err(PathError::TooLong);
    }

    let absolute = path.starts_with('/');
    let mut components: Vec<String> = Vec::new();

    for part in path.split('/') {
        match part {
            "" | "." => continue,
            ".." => match components.last() {
                Some(last) if last != ".." => {
                    components.pop();
                }
                _ if !absolute => components.push("..".to_string()),
                _ => {}
            },
            other => components.push(other.to_string()),
        }
    }

    Ok(Tokenized { absolute, components })
}

/// Re-joins tokens into a canonical path string.
///
/// Absolute paths gain a leading `/`; an empty relative result becomes `"."`.
pub fn normalize(path: &str) -> Result<String, PathError> {
    let Tokenized { absolute, components } = tokenize(path)?;
    Ok(render(absolute, &components))
}

fn render(absolute: bool, components: &[String]) -> String {
    if absolute {
        if components.is_empty() {
            "/".to_string()
        } else {
            format!("/{}", components.join("/"))
        }
    } else if components.is_empty() {
        ".".to_string()
    } else {
        components.join("/")
    }
}

/// Number of path components after normalization; `"/"` has depth 0.
pub fn depth(path: &str) -> Result<usize, PathError> {
    Ok(tokenize(path)?.components.len())
}

/// Distance between two nodes in the filesystem tree.
///
/// When `dst` is relative, `src` is unused and the result is `depth(dst)`.
/// When `dst` is absolute, `src` must be absolute too and the result is the
/// number of steps up from `src` to the common ancestor plus the number of
/// steps back down to `dst`.
pub fn distance(src: &str, dst: &str) -> Result<usize, PathError> {
    let dst_tok = tokenize(dst)?;
    if !dst_tok.absolute {
        return Ok(dst_tok.components.len());
    }

    let src_tok = tokenize(src)?;
    let common = src_tok
        .components
        .iter()
        .zip(dst_tok.components.iter())
        .take_while(|(a, b)| a == b)
        .count();

    Ok((src_tok.components.len() - common) + (dst_tok.components.len() - common))
}

/// Expresses `path` relative to `base` when that is shorter than `path`
/// itself; otherwise returns `path` unchanged.
pub fn rebase(base: &str, path: &str) -> Result<String, PathError> {
    let base_tok = tokenize(base)?;
    let path_tok = tokenize(path)?;

    if base_tok.absolute != path_tok.absolute {
        return normalize(path);
    }

    let common = base_tok
        .components
        .iter()
        .zip(path_tok.components.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let ups = base_tok.components.len() - common;
    let mut rel_components: Vec<String> = std::iter::repeat("..".to_string()).take(ups).collect();
    rel_components.extend(path_tok.components[common..].iter().cloned());

    let relative = render(false, &rel_components);
    let absolute = render(path_tok.absolute, &path_tok.components);

    if relative.len() < absolute.len() {
        Ok(relative)
    } else {
        Ok(absolute)
    }
}

/// Joins two paths and normalizes the result, e.g. `join("/a", "../b") == "/b"`.
pub fn join(a: &str, b: &str) -> Result<String, PathError> {
    if a.len() + b.len() + 1 > MAX_PATH_LEN {
        return Err(PathError::TooLong);
    }
    normalize(&format!("{a}/{b}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_dots_and_slashes() {
        assert_eq!(normalize("/").unwrap(), "/");
        assert_eq!(normalize("//").unwrap(), "/");
        assert_eq!(normalize("/foo/bar/").unwrap(), "/foo/bar");
        assert_eq!(normalize("/foo/../bar/").unwrap(), "/bar");
        assert_eq!(normalize("/foo/../../../").unwrap(), "/");
        assert_eq!(normalize(".").unwrap(), ".");
        assert_eq!(normalize("a/./b").unwrap(), "a/b");
    }

    #[test]
    fn normalize_is_a_fixed_point() {
        for p in ["/a/b/c", "/", ".", "a/../b", "../a/b"] {
            let once = normalize(p).unwrap();
            let twice = normalize(&once).unwrap();
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn relative_leading_dotdot_is_preserved() {
        let t = tokenize("../a/b").unwrap();
        assert!(!t.absolute);
        assert_eq!(t.components, vec!["..", "a", "b"]);
    }

    #[test]
    fn depth_of_root_is_zero() {
        assert_eq!(depth("/").unwrap(), 0);
        assert_eq!(depth("/foo").unwrap(), 1);
        assert_eq!(depth("/foo/bar").unwrap(), 2);
    }

    #[test]
    fn distance_relative_ignores_src() {
        assert_eq!(distance("/whatever", "a/b").unwrap(), 2);
    }

    #[test]
    fn distance_absolute_uses_common_prefix() {
        assert_eq!(distance("/", "/").unwrap(), 0);
        assert_eq!(distance("/a/b", "/a/c").unwrap(), 2);
        assert_eq!(distance("/a", "/a/b/c").unwrap(), 2);
    }

    #[test]
    fn rebase_prefers_shorter_relative_form() {
        assert_eq!(rebase("/a/b", "/a/b/c").unwrap(), "c");
        assert_eq!(rebase("/a/b", "/a/b/c/d/e").unwrap(), "c/d/e");
    }

    #[test]
    fn rebase_falls_back_to_absolute_when_not_shorter() {
        // "/x" (2 chars) is not longer than "../../../x" so absolute wins.
        assert_eq!(rebase("/a/b/c", "/x").unwrap(), "/x");
    }

    #[test]
    fn join_normalizes_result() {
        assert_eq!(join("/a", "../b").unwrap(), "/b");
        assert_eq!(join("/a", "b/c").unwrap(), "/a/b/c");
    }

    #[test]
    fn oversized_input_is_rejected() {
        let huge = "a".repeat(MAX_PATH_LEN + 1);
        assert_eq!(tokenize(&huge), Err(PathError::TooLong));
        assert_eq!(normalize(&huge), Err(PathError::TooLong));
    }
}
