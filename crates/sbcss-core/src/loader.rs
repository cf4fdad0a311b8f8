use crate::resolver::Resolver;
use crate::stylesheet::StyleSheet;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

/// Resolves imports against the file system, relative to the importing
/// file, and parses each file on demand.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsResolver;

impl Resolver for FsResolver {
    fn locate(&self, request: &str, from: Option<&Path>) -> String {
        let base = from.and_then(Path::parent).unwrap_or_else(|| Path::new("."));
        let joined = base.join(request);
        let resolved = joined
            .canonicalize()
            .unwrap_or_else(|_| normalize(&joined));
        resolved.display().to_string()
    }

    fn load(&self, key: &str) -> Option<Arc<StyleSheet>> {
        match StyleSheet::from_file(Path::new(key)) {
            Ok(sheet) => {
                tracing::debug!(path = key, namespace = sheet.namespace(), "loaded style sheet");
                Some(Arc::new(sheet))
            }
            Err(err) => {
                tracing::warn!(path = key, %err, "cannot load imported style sheet");
                None
            }
        }
    }
}

/// Lexically resolve `.` and `..` for paths that do not exist on disk.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/imports")
    }

    #[test]
    fn locate_relative_to_importer() {
        let importer = fixture_dir().join("b.st.css");
        let key = FsResolver.locate("./a.st.css", Some(&importer));
        let expected = fixture_dir().join("a.st.css").canonicalize().expect("fixture");
        assert_eq!(key, expected.display().to_string());
    }

    #[test]
    fn load_parses_with_file_namespace() {
        let key = FsResolver.locate(&fixture_dir().join("a.st.css").display().to_string(), None);
        let sheet = FsResolver.load(&key).expect("load a");
        assert_eq!(sheet.namespace(), "a");
        assert!(sheet.has_class("a"));
    }

    #[test]
    fn missing_file_resolves_to_nothing() {
        let importer = fixture_dir().join("b.st.css");
        let key = FsResolver.locate("./missing.st.css", Some(&importer));
        assert!(key.ends_with("missing.st.css"));
        assert!(FsResolver.load(&key).is_none());
    }

    #[test]
    fn unparsable_file_resolves_to_nothing() {
        let key = fixture_dir().join("broken.st.css").display().to_string();
        assert!(FsResolver.load(&key).is_none());
    }

    #[test]
    fn normalize_collapses_dot_segments() {
        assert_eq!(
            normalize(Path::new("/a/./b/../c.css")),
            PathBuf::from("/a/c.css")
        );
        assert_eq!(normalize(Path::new("../x.css")), PathBuf::from("../x.css"));
    }
}
