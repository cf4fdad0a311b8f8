//! Selector classification, rewriting and output ordering.
//!
//! Every class head is scoped to its unit's namespace. A class that extends
//! an imported type is compounded with that type's root class, a tag that
//! names an imported type becomes a descendant of the unit's root, custom
//! pseudo-elements become descendant segments inside the type that declares
//! them, and custom states become attribute selectors. Imported units are
//! emitted depth-first before the unit importing them.

use crate::emitter;
use crate::error::{Diagnostic, DiagnosticKind, Error, Span};
use crate::resolver::{EmptyResolver, Resolver};
use crate::selector::{
    Combinator, ComplexSelector, CompoundSelector, Head, PseudoArgs, Qualifier, SelectorList,
};
use crate::stylesheet::{
    ImportRef, ImportRule, RuleSelector, SheetAtBody, SheetAtRule, SheetRule, StyleRule,
    StyleSheet, Symbol,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

pub const DEFAULT_NAMESPACE_DIVIDER: &str = "__";
pub const DEFAULT_STATE_ATTRIBUTE_PREFIX: &str = "data";

/// Pseudo-elements browsers know; an unresolved one of these is not reported.
const STANDARD_PSEUDO_ELEMENTS: &[&str] = &[
    "after",
    "backdrop",
    "before",
    "cue",
    "file-selector-button",
    "first-letter",
    "first-line",
    "grammar-error",
    "marker",
    "placeholder",
    "selection",
    "spelling-error",
    "target-text",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorOptions {
    /// Joins a namespace and a local name.
    pub namespace_divider: String,
    /// First segment of custom state attributes: `[<prefix>-<ns>-<state>]`.
    pub state_attribute_prefix: String,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            namespace_divider: DEFAULT_NAMESPACE_DIVIDER.to_string(),
            state_attribute_prefix: DEFAULT_STATE_ATTRIBUTE_PREFIX.to_string(),
        }
    }
}

impl GeneratorOptions {
    pub fn with_divider(divider: impl Into<String>) -> Self {
        Self {
            namespace_divider: divider.into(),
            ..Self::default()
        }
    }

    /// The global class name of `local` in the unit named `namespace`.
    pub fn scoped(&self, namespace: &str, local: &str) -> String {
        if namespace.is_empty() {
            local.to_string()
        } else {
            format!("{}{}{}", namespace, self.namespace_divider, local)
        }
    }

    pub fn state_attribute(&self, namespace: &str, state: &str) -> String {
        if namespace.is_empty() {
            format!("{}-{}", self.state_attribute_prefix, state)
        } else {
            format!(
                "{}-{}-{}",
                self.state_attribute_prefix,
                namespace.to_lowercase(),
                state
            )
        }
    }
}

/// Output of one generation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Generation {
    /// One serialized rule per entry, in emission order.
    pub rules: Vec<String>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Generation {
    pub fn css(&self) -> String {
        emitter::emit_css(&self.rules)
    }
}

pub struct Generator<'r> {
    options: GeneratorOptions,
    resolver: &'r dyn Resolver,
}

impl Default for Generator<'static> {
    fn default() -> Self {
        Self::new(GeneratorOptions::default(), &EmptyResolver)
    }
}

impl<'r> Generator<'r> {
    pub fn new(options: GeneratorOptions, resolver: &'r dyn Resolver) -> Self {
        Self { options, resolver }
    }

    pub fn options(&self) -> &GeneratorOptions {
        &self.options
    }

    /// Generate CSS for `sheets` and everything they import, in order.
    ///
    /// Each call owns its resolution cache; nothing carries over between
    /// calls. Fails only on a cyclic import.
    pub fn generate<'s>(
        &self,
        sheets: impl IntoIterator<Item = &'s StyleSheet>,
    ) -> Result<Generation, Error> {
        let mut pass = Pass::new(self);
        for sheet in sheets {
            pass.emit_root(sheet)?;
        }
        tracing::debug!(
            rules = pass.rules.len(),
            diagnostics = pass.diagnostics.len(),
            "generation complete"
        );
        Ok(Generation {
            rules: pass.rules,
            diagnostics: pass.diagnostics,
        })
    }
}

/// Shorthand for [`Generator::generate`].
pub fn generate<'s>(
    sheets: impl IntoIterator<Item = &'s StyleSheet>,
    options: GeneratorOptions,
    resolver: &dyn Resolver,
) -> Result<Generation, Error> {
    Generator::new(options, resolver).generate(sheets)
}

/// A node of the document tree, known as class `class` of `sheet`.
#[derive(Clone)]
struct Scope {
    sheet: Arc<StyleSheet>,
    class: String,
}

struct Pass<'g, 'r> {
    generator: &'g Generator<'r>,
    /// Resolver key to loaded unit; `None` records a miss.
    cache: HashMap<String, Option<Arc<StyleSheet>>>,
    emitted: HashSet<String>,
    /// Keys of the units currently being emitted, outermost first.
    stack: Vec<String>,
    rules: Vec<String>,
    diagnostics: Vec<Diagnostic>,
}

impl<'g, 'r> Pass<'g, 'r> {
    fn new(generator: &'g Generator<'r>) -> Self {
        Self {
            generator,
            cache: HashMap::new(),
            emitted: HashSet::new(),
            stack: Vec::new(),
            rules: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    fn options(&self) -> &'g GeneratorOptions {
        &self.generator.options
    }

    /// Record a diagnostic unless the same problem was already reported
    /// for the same unit, possibly from another rule.
    fn diagnose(&mut self, diagnostic: Diagnostic) {
        let seen = self.diagnostics.iter().any(|d| {
            d.kind == diagnostic.kind
                && d.namespace == diagnostic.namespace
                && d.message == diagnostic.message
        });
        if !seen {
            self.diagnostics.push(diagnostic);
        }
    }

    fn emit_root(&mut self, sheet: &StyleSheet) -> Result<(), Error> {
        let sheet = Arc::new(sheet.clone());
        let key = sheet
            .source_path()
            .map(|path| self.generator.resolver.locate(&path.display().to_string(), None));

        match key {
            Some(key) => {
                if !self.emitted.insert(key.clone()) {
                    tracing::debug!(path = %key, "root already emitted as an import");
                    return Ok(());
                }
                self.cache.insert(key.clone(), Some(sheet.clone()));
                self.stack.push(key);
                self.emit_sheet(&sheet)?;
                self.stack.pop();
            }
            None => self.emit_sheet(&sheet)?,
        }
        Ok(())
    }

    fn emit_sheet(&mut self, sheet: &Arc<StyleSheet>) -> Result<(), Error> {
        tracing::debug!(namespace = sheet.namespace(), "emitting style sheet");
        for rule in sheet.rules() {
            if let SheetRule::Import(import) = rule {
                self.emit_import(sheet, import)?;
            }
        }

        for diagnostic in sheet.diagnostics() {
            self.diagnose(diagnostic.clone());
        }

        for rule in sheet.rules() {
            if let Some(css) = self.render(sheet, rule) {
                self.rules.push(css);
            }
        }
        Ok(())
    }

    fn emit_import(&mut self, owner: &Arc<StyleSheet>, import: &ImportRule) -> Result<(), Error> {
        let key = self
            .generator
            .resolver
            .locate(&import.path, owner.source_path());

        if let Some(pos) = self.stack.iter().position(|entry| *entry == key) {
            let mut chain = self.stack[pos..].to_vec();
            chain.push(key);
            return Err(Error::CyclicImport { chain });
        }
        if !self.emitted.insert(key.clone()) {
            return Ok(());
        }

        let target = match self.load(&key) {
            Some(target) => target,
            None => {
                tracing::debug!(path = %key, "import does not resolve; skipping");
                return Ok(());
            }
        };
        self.stack.push(key);
        self.emit_sheet(&target)?;
        self.stack.pop();
        Ok(())
    }

    fn load(&mut self, key: &str) -> Option<Arc<StyleSheet>> {
        if let Some(cached) = self.cache.get(key) {
            return cached.clone();
        }
        let loaded = self.generator.resolver.load(key);
        tracing::debug!(path = key, found = loaded.is_some(), "resolved import");
        self.cache.insert(key.to_string(), loaded.clone());
        loaded
    }

    fn render(&mut self, owner: &Arc<StyleSheet>, rule: &SheetRule) -> Option<String> {
        match rule {
            SheetRule::Import(_) => None,
            SheetRule::Style(style) => Some(self.render_style(owner, style)),
            SheetRule::At(at) => Some(self.render_at(owner, at)),
        }
    }

    fn render_style(&mut self, owner: &Arc<StyleSheet>, style: &StyleRule) -> String {
        let selector = match &style.selector {
            RuleSelector::Parsed(list) => {
                let rewritten = self.rewrite_list(owner, list, style.span).to_string();
                tracing::trace!(from = %list, to = %rewritten, "rewrote selector");
                rewritten
            }
            RuleSelector::Raw(raw) => raw.clone(),
        };
        emitter::emit_rule(&selector, &style.declarations)
    }

    fn render_at(&mut self, owner: &Arc<StyleSheet>, at: &SheetAtRule) -> String {
        match &at.body {
            SheetAtBody::Statement => emitter::emit_at_statement(&at.name, &at.params),
            SheetAtBody::Raw(body) => emitter::emit_at_block(&at.name, &at.params, body),
            SheetAtBody::Rules(rules) => {
                let inner: Vec<String> = rules
                    .iter()
                    .filter_map(|rule| self.render(owner, rule))
                    .collect();
                emitter::emit_at_block(&at.name, &at.params, &inner.join("\n"))
            }
        }
    }

    fn rewrite_list(
        &mut self,
        owner: &Arc<StyleSheet>,
        list: &SelectorList,
        span: Span,
    ) -> SelectorList {
        let mut out = Vec::with_capacity(list.0.len());
        for complex in &list.0 {
            let mut rewritten = ComplexSelector::default();
            for (combinator, compound) in &complex.parts {
                self.rewrite_compound(owner, *combinator, compound, span, &mut rewritten);
            }
            out.push(rewritten);
        }
        SelectorList(out)
    }

    /// Rewrite one compound selector, appending one or more compounds to `out`.
    fn rewrite_compound(
        &mut self,
        owner: &Arc<StyleSheet>,
        combinator: Option<Combinator>,
        compound: &CompoundSelector,
        span: Span,
        out: &mut ComplexSelector,
    ) {
        let options = self.options();
        let mut combinator = combinator;
        let mut node = CompoundSelector::default();
        // Nodes the compound denotes, head first. States resolve against the
        // first one that declares them; pseudo-elements against the first.
        let mut scopes = Vec::new();

        match &compound.head {
            Some(Head::Class(name)) => {
                let class = self.classify_class(owner, name, span);
                node.head = Some(Head::Class(class.name));
                node.qualifiers.extend(class.extends_root.map(Qualifier::Class));
                scopes.push(class.scope);
            }
            Some(Head::Element(tag)) => match self.element_instance(owner, tag, span) {
                Some(target) => {
                    let own_root = options.scoped(owner.namespace(), owner.root_name());
                    out.parts.push((combinator, CompoundSelector::with_class(own_root)));
                    combinator = Some(Combinator::Descendant);
                    let root = options.scoped(target.sheet.namespace(), &target.class);
                    node.head = Some(Head::Class(root));
                    scopes.push(target);
                }
                None => node.head = Some(Head::Element(tag.clone())),
            },
            other => node.head = other.clone(),
        }

        let mut classes = Vec::new();
        for qualifier in &compound.qualifiers {
            if let Qualifier::Class(name) = qualifier {
                let class = self.classify_class(owner, name, span);
                scopes.push(class.scope.clone());
                classes.push(class);
            }
        }

        let mut classes = classes.into_iter();
        for qualifier in &compound.qualifiers {
            let rewritten = match qualifier {
                Qualifier::Class(_) => match classes.next() {
                    Some(class) => {
                        node.qualifiers.push(Qualifier::Class(class.name));
                        class.extends_root.map(Qualifier::Class)
                    }
                    None => None,
                },
                other => Some(self.rewrite_qualifier(owner, &scopes, other, span)),
            };
            node.qualifiers.extend(rewritten);
        }

        let mut current = scopes.into_iter().next();
        for pseudo in &compound.pseudo_elements {
            let part = match &current {
                Some(scope) => self.resolve_part(scope, &pseudo.name, span),
                None => None,
            };
            match part {
                Some(part) => {
                    out.parts.push((combinator, std::mem::take(&mut node)));
                    combinator = Some(Combinator::Descendant);
                    let class = options.scoped(part.sheet.namespace(), &part.class);
                    node = CompoundSelector::with_class(class);
                    let scopes = std::slice::from_ref(&part);
                    for qualifier in &pseudo.qualifiers {
                        let rewritten =
                            self.rewrite_qualifier(&part.sheet, scopes, qualifier, span);
                        node.qualifiers.push(rewritten);
                    }
                    current = Some(part);
                }
                None => {
                    // Everything from the first unresolved pseudo-element on
                    // is plain CSS.
                    node.pseudo_elements.push(pseudo.clone());
                    current = None;
                }
            }
        }

        out.parts.push((combinator, node));
    }

    /// A class name as it appears in `owner`: a named import renders as the
    /// class it imports, any other class is scoped to `owner` and carries
    /// the root of the type it extends.
    fn classify_class(&mut self, owner: &Arc<StyleSheet>, name: &str, span: Span) -> ClassNode {
        let options = self.options();
        if let Some(Symbol::Import(import)) = owner.symbols().lookup(name) {
            if let Some(target) = self.import_scope(owner, import, span) {
                return ClassNode {
                    name: options.scoped(target.sheet.namespace(), &target.class),
                    extends_root: None,
                    scope: target,
                };
            }
        }

        let extends = owner.class(name).and_then(|class| class.extends_type.as_ref());
        let extends_root = extends
            .and_then(|import| self.import_scope(owner, import, span))
            .map(|target| options.scoped(target.sheet.namespace(), &target.class));
        ClassNode {
            name: options.scoped(owner.namespace(), name),
            extends_root,
            scope: Scope {
                sheet: owner.clone(),
                class: name.to_string(),
            },
        }
    }

    /// The imported root a tag selector instantiates, if any.
    fn element_instance(
        &mut self,
        owner: &Arc<StyleSheet>,
        tag: &str,
        span: Span,
    ) -> Option<Scope> {
        let import = owner.symbols().element_type(tag)?;
        if import.exported_name.is_some() {
            self.diagnose(Diagnostic::new(
                DiagnosticKind::UnresolvedImportSymbol,
                owner.namespace(),
                format!(
                    "Tag '{}' refers to named import '{}'; only default imports are types",
                    tag, import.local_name
                ),
                span,
            ));
            return None;
        }
        self.import_scope(owner, import, span)
    }

    fn rewrite_qualifier(
        &mut self,
        owner: &Arc<StyleSheet>,
        scopes: &[Scope],
        qualifier: &Qualifier,
        span: Span,
    ) -> Qualifier {
        let options = self.options();
        match qualifier {
            Qualifier::PseudoClass { name, args: None } => {
                let declaring = scopes
                    .iter()
                    .find_map(|scope| self.state_owner(scope, name, span));
                match declaring {
                    Some(sheet) => {
                        Qualifier::Attribute(options.state_attribute(sheet.namespace(), name))
                    }
                    None => qualifier.clone(),
                }
            }
            Qualifier::PseudoClass {
                name,
                args: Some(PseudoArgs::Selectors(list)),
            } => Qualifier::PseudoClass {
                name: name.clone(),
                args: Some(PseudoArgs::Selectors(self.rewrite_list(owner, list, span))),
            },
            other => other.clone(),
        }
    }

    /// The node that `import` denotes: the root of a default import, or the
    /// exported class of a named one.
    fn import_scope(
        &mut self,
        owner: &Arc<StyleSheet>,
        import: &ImportRef,
        span: Span,
    ) -> Option<Scope> {
        let key = self
            .generator
            .resolver
            .locate(&import.path, owner.source_path());
        let target = match self.load(&key) {
            Some(target) => target,
            None => {
                self.diagnose(Diagnostic::new(
                    DiagnosticKind::UnresolvedImportPath,
                    owner.namespace(),
                    format!("Cannot resolve '{}' imported as '{}'", import.path, import.local_name),
                    span,
                ));
                return None;
            }
        };

        match &import.exported_name {
            None => Some(Scope {
                class: target.root_name().to_string(),
                sheet: target,
            }),
            Some(exported) if target.has_class(exported) => Some(Scope {
                sheet: target,
                class: exported.clone(),
            }),
            Some(exported) => {
                self.diagnose(Diagnostic::new(
                    DiagnosticKind::UnresolvedImportSymbol,
                    owner.namespace(),
                    format!("'{}' does not export '{}'", import.path, exported),
                    span,
                ));
                None
            }
        }
    }

    /// The node a scope extends, if any.
    fn extended(&mut self, scope: &Scope, span: Span) -> Option<Scope> {
        let import = scope
            .sheet
            .class(&scope.class)
            .and_then(|class| class.extends_type.clone())?;
        self.import_scope(&scope.sheet, &import, span)
    }

    /// Find the unit that declares pseudo-element `name` for the node at
    /// `scope`. Only a root node exposes its unit's classes as parts; any
    /// other node (and a root that declares nothing by that name) defers to
    /// the type it extends.
    fn resolve_part(&mut self, scope: &Scope, name: &str, span: Span) -> Option<Scope> {
        let mut walk = Walk::default();
        let mut node = scope.clone();
        let mut searched = None;

        while walk.enter(&node) {
            if node.class == node.sheet.root_name() {
                if node.sheet.has_class(name) {
                    return Some(Scope {
                        sheet: node.sheet.clone(),
                        class: name.to_string(),
                    });
                }
                searched = Some(node.sheet.namespace().to_string());
            }
            match self.extended(&node, span) {
                Some(next) => node = next,
                None => break,
            }
        }

        if let Some(namespace) = searched {
            if !STANDARD_PSEUDO_ELEMENTS.contains(&name) {
                self.diagnose(Diagnostic::new(
                    DiagnosticKind::UnresolvedImportSymbol,
                    scope.sheet.namespace(),
                    format!("Unknown pseudo-element '{}' on a '{}' node", name, namespace),
                    span,
                ));
            }
        }
        None
    }

    /// The unit whose class declares `state` for the node at `scope`: the
    /// node's own class first, then each type it extends in turn.
    fn state_owner(&mut self, scope: &Scope, state: &str, span: Span) -> Option<Arc<StyleSheet>> {
        let mut walk = Walk::default();
        let mut node = scope.clone();

        while walk.enter(&node) {
            let declares = node
                .sheet
                .class(&node.class)
                .map_or(false, |class| class.states.contains(state));
            if declares {
                return Some(node.sheet);
            }
            node = self.extended(&node, span)?;
        }
        None
    }
}

/// A class selector after classification.
struct ClassNode {
    /// Global name to emit.
    name: String,
    /// Root of the extended type, emitted as a second class on the same node.
    extends_root: Option<String>,
    scope: Scope,
}

/// Visited set for walks along `-sb-type` chains. Units loaded through one
/// pass are shared, so a node is identified by its unit and class.
#[derive(Default)]
struct Walk {
    seen: HashSet<(usize, String)>,
}

impl Walk {
    /// `false` once the walk comes back to a node it already visited.
    fn enter(&mut self, node: &Scope) -> bool {
        self.seen
            .insert((Arc::as_ptr(&node.sheet) as usize, node.class.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::MapResolver;

    fn sheet(source: &str, namespace: &str) -> StyleSheet {
        StyleSheet::from_css(source, namespace).expect("valid css")
    }

    fn run(roots: &[&StyleSheet], resolver: &MapResolver) -> Generation {
        Generator::new(GeneratorOptions::default(), resolver)
            .generate(roots.iter().copied())
            .expect("generation")
    }

    #[test]
    fn scoped_names_skip_empty_namespace() {
        let options = GeneratorOptions::with_divider("--");
        assert_eq!(options.scoped("Ns", "a"), "Ns--a");
        assert_eq!(options.scoped("", "a"), "a");
        assert_eq!(options.state_attribute("MyNs", "on"), "data-myns-on");
        assert_eq!(options.state_attribute("", "on"), "data-on");
    }

    #[test]
    fn plain_selectors_pass_through() {
        let a = sheet("div > *:hover, #id[x=\"1\"] { color: red; }", "A");
        let out = run(&[&a], &MapResolver::new());
        assert_eq!(out.rules, vec!["div > *:hover, #id[x=\"1\"] {\n    color: red\n}"]);
        assert!(out.diagnostics.is_empty());
    }

    #[test]
    fn qualifier_classes_and_negations_are_scoped() {
        let a = sheet(".a.b:not(.c) {}", "A");
        let out = run(&[&a], &MapResolver::new());
        assert_eq!(out.rules, vec![".A__a.A__b:not(.A__c) {}"]);
    }

    #[test]
    fn root_pseudo_element_resolves_in_own_unit() {
        let a = sheet(".root::label {}\n.label {}\n.root::before {}", "A");
        let out = run(&[&a], &MapResolver::new());
        assert_eq!(
            out.rules,
            vec![".A__root .A__label {}", ".A__label {}", ".A__root::before {}"]
        );
        assert!(out.diagnostics.is_empty());
    }

    #[test]
    fn unknown_pseudo_element_in_type_is_reported_and_kept() {
        let t = sheet(".x {}", "T");
        let a = sheet(
            ":import(\"./t.css\") { -sb-default: T; }\n.a { -sb-type: T; }\n.a::nope:hover {}",
            "A",
        );
        let resolver = MapResolver::new().with("./t.css", t);
        let out = run(&[&a], &resolver);
        assert_eq!(out.rules.last().map(String::as_str), Some(".A__a.T__root::nope:hover {}"));
        assert_eq!(out.diagnostics.len(), 1);
        assert_eq!(out.diagnostics[0].kind, DiagnosticKind::UnresolvedImportSymbol);
    }

    #[test]
    fn parts_are_inherited_through_root_types() {
        let base = sheet(".label {}", "Base");
        let derived = sheet(
            ":import(\"./base.css\") { -sb-default: Base; }\n.root { -sb-type: Base; }",
            "Derived",
        );
        let app = sheet(
            ":import(\"./derived.css\") { -sb-default: Derived; }\n\
             .app { -sb-type: Derived; }\n.app::label {}",
            "App",
        );
        let resolver = MapResolver::new()
            .with("./base.css", base)
            .with("./derived.css", derived);
        let out = run(&[&app], &resolver);
        assert_eq!(
            out.rules.last().map(String::as_str),
            Some(".App__app.Derived__root .Base__label {}")
        );
    }

    #[test]
    fn unresolved_type_path_falls_back_to_local_class() {
        let a = sheet(
            ":import(\"./gone.css\") { -sb-default: Gone; }\n.a { -sb-type: Gone; }\n.a:open {}",
            "A",
        );
        let out = run(&[&a], &MapResolver::new());
        assert_eq!(out.rules, vec![".A__a {}", ".A__a:open {}"]);
        assert_eq!(out.diagnostics.len(), 1);
        assert_eq!(out.diagnostics[0].kind, DiagnosticKind::UnresolvedImportPath);
    }

    #[test]
    fn tag_for_named_import_is_literal() {
        let t = sheet(".widget {}", "T");
        let a = sheet(":import(\"./t.css\") { -sb-named: widget; }\nwidget {}", "A");
        let resolver = MapResolver::new().with("./t.css", t);
        let out = run(&[&a], &resolver);
        assert_eq!(out.rules.last().map(String::as_str), Some("widget {}"));
        assert_eq!(out.diagnostics[0].kind, DiagnosticKind::UnresolvedImportSymbol);
    }

    #[test]
    fn missing_named_export_is_reported() {
        let t = sheet(".x {}", "T");
        let a = sheet(":import(\"./t.css\") { -sb-named: y; }\n.y {}", "A");
        let resolver = MapResolver::new().with("./t.css", t);
        let out = run(&[&a], &resolver);
        assert_eq!(out.rules.last().map(String::as_str), Some(".A__y {}"));
        assert_eq!(out.diagnostics[0].kind, DiagnosticKind::UnresolvedImportSymbol);
    }

    #[test]
    fn media_blocks_rewrite_nested_rules() {
        let a = sheet("@media print { .a { color: red } .b {} }", "A");
        let out = run(&[&a], &MapResolver::new());
        assert_eq!(
            out.rules,
            vec!["@media print {\n    .A__a {\n        color: red\n    }\n    .A__b {}\n}"]
        );
    }

    #[test]
    fn raw_at_rules_are_reindented() {
        let a = sheet("@keyframes spin {\n    from { opacity: 0 }\n    to { opacity: 1 }\n}", "A");
        let out = run(&[&a], &MapResolver::new());
        assert_eq!(
            out.rules,
            vec!["@keyframes spin {\n    from { opacity: 0 }\n    to { opacity: 1 }\n}"]
        );
    }

    #[test]
    fn diamond_imports_emit_once() {
        let shared = sheet(".s {}", "S");
        let left = sheet(":import(\"./s.css\") {}\n.l {}", "L");
        let right = sheet(":import(\"./s.css\") {}\n.r {}", "R");
        let top = sheet(":import(\"./l.css\") {}\n:import(\"./r.css\") {}\n.t {}", "T");
        let resolver = MapResolver::new()
            .with("./s.css", shared)
            .with("./l.css", left)
            .with("./r.css", right);
        let out = run(&[&top], &resolver);
        assert_eq!(out.rules, vec![".S__s {}", ".L__l {}", ".R__r {}", ".T__t {}"]);
    }

    #[test]
    fn cyclic_imports_fail() {
        let a = sheet(":import(\"./b.css\") {}\n.a {}", "A");
        let b = sheet(":import(\"./a.css\") {}\n.b {}", "B");
        let resolver = MapResolver::new().with("./a.css", a.clone()).with("./b.css", b);
        let err = Generator::new(GeneratorOptions::default(), &resolver)
            .generate([&a])
            .unwrap_err();
        match err {
            Error::CyclicImport { chain } => {
                assert_eq!(chain, vec!["./b.css", "./a.css", "./b.css"]);
            }
            other => panic!("unexpected error {}", other),
        }
    }

    #[test]
    fn qualifier_classes_carry_extended_roots() {
        let t = sheet(".root { -sb-states: open; }", "T");
        let a = sheet(
            ":import(\"./t.css\") { -sb-default: T; }\n.menu { -sb-type: T; }\n.x.menu:open {}",
            "A",
        );
        let resolver = MapResolver::new().with("./t.css", t);
        let out = run(&[&a], &resolver);
        assert_eq!(
            out.rules.last().map(String::as_str),
            Some(".A__x.A__menu.T__root[data-t-open] {}")
        );
    }

    #[test]
    fn walk_stops_on_revisited_node() {
        let node = Scope {
            sheet: Arc::new(sheet(".a {}", "A")),
            class: "a".to_string(),
        };
        let mut walk = Walk::default();
        assert!(walk.enter(&node));
        assert!(!walk.enter(&node));
        assert!(walk.enter(&Scope {
            class: "root".to_string(),
            ..node
        }));
    }
}
