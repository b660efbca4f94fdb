//! Source locator algebra.
//!
//! Locators are plain strings: `http://` / `https://` URLs, `file://` local
//! locators, root-absolute paths (`/...`) or relative fragments. Nothing in
//! this module touches the network or the filesystem (apart from
//! [`document_location`], which reads the current directory to absolutize a
//! relative document path).

use std::io;
use std::path::{Path, PathBuf};

/// Scheme prefix marking a local-file locator.
pub const FILE_SCHEME: &str = "file://";

/// Check for a `file://` locator.
pub fn is_local_file(locator: &str) -> bool {
    locator.starts_with(FILE_SCHEME)
}

/// Check for an `http://` or `https://` locator.
pub fn is_remote(locator: &str) -> bool {
    locator.starts_with("http://") || locator.starts_with("https://")
}

/// Check for a locator that needs no base: root-absolute or remote.
pub fn is_absolute(locator: &str) -> bool {
    locator.starts_with('/') || is_remote(locator)
}

/// Resolve `candidate` against `base`.
///
/// Rules, first match wins:
/// 1. `file://` candidates are returned unchanged.
/// 2. `./x` is joined to `base` as `x`.
/// 3. Root-absolute and remote candidates are returned unchanged.
/// 4. `../x` is joined to the parent of `base`. Only one leading `../` is
///    consumed; any further `../` segments are joined verbatim.
/// 5. Anything else is joined to `base`, local or remote alike.
pub fn resolve(base: &str, candidate: &str) -> String {
    if is_local_file(candidate) {
        return candidate.to_string();
    }
    if let Some(rest) = candidate.strip_prefix("./") {
        return join(base, rest);
    }
    if is_absolute(candidate) {
        return candidate.to_string();
    }
    if let Some(rest) = candidate.strip_prefix("../") {
        return join(parent(base), rest);
    }
    join(base, candidate)
}

/// Join a relative fragment onto a base with `/` separators.
pub fn join(base: &str, relative: &str) -> String {
    let joined = if base.is_empty() {
        relative.to_string()
    } else if base.ends_with('/') {
        format!("{}{}", base, relative)
    } else {
        format!("{}/{}", base, relative)
    };
    joined.replace('\\', "/")
}

/// Strip one trailing path segment, tolerating a base that ends in `/`.
///
/// `http://x/a/b/` and `http://x/a/b` both give `http://x/a`. A host-root
/// base steps into the scheme: `http://x/` gives `http:/`, so
/// `resolve("http://x/", "../a.obj")` is `http:/a.obj`. That result is
/// expected and left unnormalized.
pub fn parent(base: &str) -> &str {
    let trimmed = base.strip_suffix('/').unwrap_or(base);
    match trimmed.rsplit_once('/') {
        Some((head, _)) => head,
        None => "",
    }
}

/// Directory part of a locator (everything before the last `/`).
///
/// A scheme root such as `file:///a.obj` keeps its trailing slash so the
/// result can still be joined onto.
pub fn dirname(locator: &str) -> &str {
    match locator.rfind('/') {
        Some(i) if locator[..i].ends_with('/') => &locator[..=i],
        Some(i) => &locator[..i],
        None => "",
    }
}

/// Final segment of a locator, without any query string or fragment.
pub fn basename(locator: &str) -> &str {
    let name = match locator.rfind('/') {
        Some(i) => &locator[i + 1..],
        None => locator,
    };
    match name.find(['?', '#']) {
        Some(i) => &name[..i],
        None => name,
    }
}

/// Build a `file://` locator for a local path.
pub fn file_locator(path: &Path) -> String {
    let text = path.to_string_lossy().replace('\\', "/");
    if text.starts_with('/') {
        format!("{}{}", FILE_SCHEME, text)
    } else {
        format!("{}/{}", FILE_SCHEME, text)
    }
}

/// Local filesystem path named by a `file://` or root-absolute locator.
pub fn local_path(locator: &str) -> PathBuf {
    let raw = locator.strip_prefix(FILE_SCHEME).unwrap_or(locator);
    // `file:///C:/x` on Windows
    if raw.len() > 2 && raw.starts_with('/') && raw.as_bytes()[2] == b':' {
        return PathBuf::from(&raw[1..]);
    }
    PathBuf::from(raw)
}

/// Where a room document lives and what its relative references resolve against.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocumentLocation {
    /// Fully qualified locator of the document itself
    pub locator: String,

    /// Base locator for relative asset references
    pub base: String,
}

/// Locate a document given as a URL or a local path.
///
/// Remote documents use everything up to and including the last `/` as their
/// base. Local documents are absolutized and expressed as `file://` locators.
pub fn document_location(source: &str) -> io::Result<DocumentLocation> {
    if is_remote(source) {
        let split = source.rfind('/').map(|i| i + 1).unwrap_or(source.len());
        return Ok(DocumentLocation {
            locator: source.to_string(),
            base: source[..split].to_string(),
        });
    }

    let path = local_path(source);
    let path = if path.is_absolute() {
        path
    } else {
        std::env::current_dir()?.join(path)
    };
    let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();

    Ok(DocumentLocation {
        locator: file_locator(&path),
        base: file_locator(&dir),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_scheme_unchanged() {
        assert_eq!(
            resolve("http://x/a/", "file:///opt/prims/cube.obj"),
            "file:///opt/prims/cube.obj"
        );
    }

    #[test]
    fn test_dot_slash_joined_to_base() {
        assert_eq!(resolve("http://x/a", "./b.obj"), "http://x/a/b.obj");
        assert_eq!(resolve("http://x/a/", "./b.obj"), "http://x/a/b.obj");
    }

    #[test]
    fn test_absolute_unchanged() {
        assert_eq!(resolve("http://x/a/", "/srv/b.obj"), "/srv/b.obj");
        assert_eq!(resolve("file:///tmp", "https://y/c.obj"), "https://y/c.obj");
    }

    #[test]
    fn test_parent_relative() {
        assert_eq!(resolve("http://x/a/b/", "../c/d.obj"), "http://x/a/c/d.obj");
        assert_eq!(resolve("http://x/a/b", "../c/d.obj"), "http://x/a/c/d.obj");
    }

    #[test]
    fn test_parent_relative_strips_only_one_segment() {
        assert_eq!(resolve("http://x/a/b/", "../../d.obj"), "http://x/a/../d.obj");
    }

    #[test]
    fn test_plain_join() {
        assert_eq!(resolve("http://x/a", "b/c.obj"), "http://x/a/b/c.obj");
        assert_eq!(resolve("file:///home/me/room", "c.obj"), "file:///home/me/room/c.obj");
        assert_eq!(resolve("http://x/a", "b\\c.obj"), "http://x/a/b/c.obj");
        assert_eq!(resolve("", "c.obj"), "c.obj");
    }

    #[test]
    fn test_parent_of_host_root() {
        assert_eq!(parent("http://x/"), "http:/");
        assert_eq!(resolve("http://x/", "../x.obj"), "http:/x.obj");
    }

    #[test]
    fn test_dirname_and_basename() {
        assert_eq!(dirname("http://x/a/b.obj"), "http://x/a");
        assert_eq!(dirname("file:///b.obj"), "file:///");
        assert_eq!(dirname("b.obj"), "");
        assert_eq!(basename("http://x/a/b.obj"), "b.obj");
        assert_eq!(basename("http://x/a/b.gltf?v=2"), "b.gltf");
        assert_eq!(basename("b.obj"), "b.obj");
    }

    #[test]
    fn test_file_locator_round_trip() {
        let path = Path::new("/opt/prims/cube.obj");
        let locator = file_locator(path);
        assert_eq!(locator, "file:///opt/prims/cube.obj");
        assert_eq!(local_path(&locator), path);
    }

    #[test]
    fn test_remote_document_location() {
        let location = document_location("https://x.org/rooms/lobby.html").unwrap();
        assert_eq!(location.locator, "https://x.org/rooms/lobby.html");
        assert_eq!(location.base, "https://x.org/rooms/");
    }

    #[test]
    fn test_local_document_location() {
        let location = document_location("/srv/rooms/lobby.html").unwrap();
        assert_eq!(location.locator, "file:///srv/rooms/lobby.html");
        assert_eq!(location.base, "file:///srv/rooms");
        assert_eq!(resolve(&location.base, "chair.obj"), "file:///srv/rooms/chair.obj");
    }
}
