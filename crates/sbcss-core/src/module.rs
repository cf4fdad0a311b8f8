//! Module adapter: turns one source file into module source that exposes the
//! unit's namespace and the global name of every class it can reference.

use crate::error::Error;
use crate::generator::GeneratorOptions;
use crate::loader::FsResolver;
use crate::resolver::Resolver;
use crate::stylesheet::StyleSheet;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleExports {
    pub namespace: String,
    /// Local class name to scoped class name, sorted by local name.
    pub classes: BTreeMap<String, String>,
}

/// Classes of `sheet`, with named imports mapped to the class they import.
pub fn module_exports(
    sheet: &StyleSheet,
    resolver: &dyn Resolver,
    options: &GeneratorOptions,
) -> ModuleExports {
    let mut classes: BTreeMap<String, String> = sheet
        .symbols()
        .classes()
        .map(|(name, _)| (name.to_string(), options.scoped(sheet.namespace(), name)))
        .collect();

    for import in sheet.symbols().imports() {
        let exported = match &import.exported_name {
            Some(exported) => exported,
            None => continue,
        };
        let key = resolver.locate(&import.path, sheet.source_path());
        match resolver.load(&key) {
            Some(target) if target.has_class(exported) => {
                classes.insert(
                    import.local_name.clone(),
                    options.scoped(target.namespace(), exported),
                );
            }
            _ => tracing::debug!(
                path = %import.path,
                name = %exported,
                "named import does not resolve; keeping local name"
            ),
        }
    }

    ModuleExports {
        namespace: sheet.namespace().to_string(),
        classes,
    }
}

/// Generate `module.exports = {...};` for the file at `path`.
pub fn compile_to_module(
    source: &str,
    path: &Path,
    resolver: &dyn Resolver,
    options: &GeneratorOptions,
) -> Result<String, Error> {
    let sheet = StyleSheet::from_source(source, path)?;
    for diagnostic in sheet.diagnostics() {
        tracing::warn!(path = %path.display(), "{}", diagnostic);
    }
    let exports = module_exports(&sheet, resolver, options);
    Ok(format!("module.exports = {};\n", serde_json::to_string(&exports)?))
}

/// Test-runner transform hook: [`compile_to_module`] against the file
/// system with default options.
pub fn process(source: &str, path: &Path) -> Result<String, Error> {
    compile_to_module(source, path, &FsResolver, &GeneratorOptions::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::{EmptyResolver, MapResolver};
    use serde_json::Value;
    use std::path::PathBuf;

    fn exports_of(module: &str) -> Value {
        let json = module
            .strip_prefix("module.exports = ")
            .and_then(|rest| rest.strip_suffix(";\n"))
            .expect("module shape");
        serde_json::from_str(json).expect("json exports")
    }

    #[test]
    fn single_file_exports_root() {
        let module = compile_to_module(
            ".root {}",
            Path::new("/entry.st.css"),
            &EmptyResolver,
            &GeneratorOptions::default(),
        )
        .expect("compile");
        let exports = exports_of(&module);
        assert_eq!(exports["namespace"], "entry");
        assert_eq!(exports["classes"], serde_json::json!({ "root": "entry__root" }));
    }

    #[test]
    fn named_import_maps_to_imported_class() {
        let resolver = MapResolver::new().with(
            "./imported.st.css",
            StyleSheet::from_css(".part {}", "imported").expect("parse"),
        );
        let source = ":import {\n    -st-from: \"./imported.st.css\";\n    -st-named: part;\n}\n\
                      .part { color: green; }";
        let module = compile_to_module(
            source,
            Path::new("/entry.st.css"),
            &resolver,
            &GeneratorOptions::default(),
        )
        .expect("compile");
        assert_eq!(
            exports_of(&module)["classes"],
            serde_json::json!({ "root": "entry__root", "part": "imported__part" })
        );
    }

    #[test]
    fn process_reads_imports_from_disk() {
        let path =
            PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/module/test.st.css");
        let source = std::fs::read_to_string(&path).expect("fixture");
        let exports = exports_of(&process(&source, &path).expect("process"));
        let namespace = exports["namespace"].as_str().expect("namespace").to_string();
        assert_eq!(namespace, "test");
        assert_eq!(exports["classes"]["root"], format!("{}__root", namespace));
        assert_eq!(exports["classes"]["test"], format!("{}__test", namespace));
        assert_eq!(exports["classes"]["label"], "label__text");
    }

    #[test]
    fn parse_errors_propagate() {
        let err = process(".a {", Path::new("/broken.st.css")).unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }
}
