use crate::ast::{AtBlock, AtRule, Declaration, QualifiedRule, Rule};
use crate::error::{Diagnostic, DiagnosticKind, Error, Span};
use crate::parser;
use crate::selector::{parse_selector_list, Head, SelectorList};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_ROOT: &str = "root";

/// A reference to a symbol exported by another unit. Resolved lazily.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRef {
    /// Name the symbol is bound to in the importing unit.
    pub local_name: String,
    pub path: String,
    /// `None` for the default export (the unit's root).
    pub exported_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassSymbol {
    pub is_root: bool,
    pub states: BTreeSet<String>,
    pub extends_type: Option<ImportRef>,
}

/// What a local name denotes when used as a class selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Symbol<'a> {
    Class(&'a ClassSymbol),
    Import(&'a ImportRef),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolTable {
    classes: BTreeMap<String, ClassSymbol>,
    imports: BTreeMap<String, ImportRef>,
    /// Tag names declared as instances of an import via `-sb-type`.
    elements: BTreeMap<String, ImportRef>,
    root: String,
}

impl SymbolTable {
    pub fn root_name(&self) -> &str {
        &self.root
    }

    pub fn class(&self, name: &str) -> Option<&ClassSymbol> {
        self.classes.get(name)
    }

    pub fn classes(&self) -> impl Iterator<Item = (&str, &ClassSymbol)> {
        self.classes.iter().map(|(name, class)| (name.as_str(), class))
    }

    pub fn import(&self, name: &str) -> Option<&ImportRef> {
        self.imports.get(name)
    }

    pub fn imports(&self) -> impl Iterator<Item = &ImportRef> {
        self.imports.values()
    }

    /// Named imports shadow local classes of the same name.
    pub fn lookup(&self, name: &str) -> Option<Symbol<'_>> {
        match self.imports.get(name) {
            Some(import) if import.exported_name.is_some() => Some(Symbol::Import(import)),
            _ => self.classes.get(name).map(Symbol::Class),
        }
    }

    /// The import a tag selector instantiates: an explicit `-sb-type` on an
    /// element rule, otherwise an import whose local name matches the tag
    /// ignoring ASCII case.
    pub fn element_type(&self, tag: &str) -> Option<&ImportRef> {
        self.elements.get(tag).or_else(|| {
            self.imports
                .values()
                .find(|import| import.local_name.eq_ignore_ascii_case(tag))
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleSelector {
    Parsed(SelectorList),
    /// Selector text the selector parser rejected.
    Raw(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleRule {
    pub selector: RuleSelector,
    /// Ordinary declarations; special declarations are already stripped.
    pub declarations: Vec<Declaration>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRule {
    pub path: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SheetAtBody {
    Statement,
    Rules(Vec<SheetRule>),
    Raw(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetAtRule {
    pub name: String,
    pub params: String,
    pub body: SheetAtBody,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SheetRule {
    /// Kept for ordering; never emitted.
    Import(ImportRule),
    Style(StyleRule),
    At(SheetAtRule),
}

/// One parsed source unit. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleSheet {
    namespace: String,
    source_path: Option<PathBuf>,
    rules: Vec<SheetRule>,
    symbols: SymbolTable,
    diagnostics: Vec<Diagnostic>,
}

impl StyleSheet {
    /// Parse `source`. `namespace` applies unless the source declares its own
    /// with `@namespace "Name";`. An empty namespace leaves names unprefixed.
    pub fn from_css(source: &str, namespace: impl Into<String>) -> Result<Self, Error> {
        Self::build(source, namespace.into(), None)
    }

    /// Read and parse a file. The default namespace is the file name up to
    /// its first `.`, so `button.st.css` becomes `button`.
    pub fn from_file(path: &Path) -> Result<Self, Error> {
        let source = fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_source(&source, path)
    }

    /// Parse `source` as the contents of the file at `path`.
    pub fn from_source(source: &str, path: &Path) -> Result<Self, Error> {
        Self::build(source, namespace_from_path(path), Some(path.to_path_buf()))
    }

    /// A unit with no rules and no exports besides its implicit root.
    pub fn empty(namespace: impl Into<String>) -> Self {
        let mut builder = SheetBuilder::new(namespace.into());
        builder.finish_symbols();
        builder.into_sheet(Vec::new(), None)
    }

    fn build(source: &str, namespace: String, source_path: Option<PathBuf>) -> Result<Self, Error> {
        let raw = parser::parse(source)?;
        let mut builder = SheetBuilder::new(namespace);

        let mut body = Vec::with_capacity(raw.len());
        for rule in raw {
            match rule {
                Rule::At(at) => match declared_namespace(&at).map(str::to_string) {
                    Some(name) => builder.namespace = name,
                    None => body.push(PendingRule::Rule(Rule::At(at))),
                },
                Rule::Qualified(rule) if is_import_selector(&rule.selector) => {
                    if let Some(import) = builder.import(&rule) {
                        body.push(PendingRule::Import(import));
                    }
                }
                other => body.push(PendingRule::Rule(other)),
            }
        }

        let mut rules = Vec::with_capacity(body.len());
        for pending in body {
            match pending {
                PendingRule::Import(import) => rules.push(SheetRule::Import(import)),
                PendingRule::Rule(rule) => {
                    if let Some(rule) = builder.rule(rule) {
                        rules.push(rule);
                    }
                }
            }
        }
        builder.finish_symbols();

        Ok(builder.into_sheet(rules, source_path))
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn source_path(&self) -> Option<&Path> {
        self.source_path.as_deref()
    }

    pub fn rules(&self) -> &[SheetRule] {
        &self.rules
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn root_name(&self) -> &str {
        self.symbols.root_name()
    }

    pub fn class(&self, name: &str) -> Option<&ClassSymbol> {
        self.symbols.class(name)
    }

    pub fn has_class(&self, name: &str) -> bool {
        self.symbols.class(name).is_some()
    }

    /// Problems found while building the symbol table.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }
}

pub(crate) fn namespace_from_path(path: &Path) -> String {
    path.file_name()
        .and_then(|name| name.to_str())
        .and_then(|name| name.split('.').next())
        .unwrap_or_default()
        .to_string()
}

/// The name in `@namespace "Name";`. Any other `@namespace` is plain CSS.
fn declared_namespace(rule: &AtRule) -> Option<&str> {
    if rule.name != "namespace" || rule.block.is_some() {
        return None;
    }
    let name = unquote(&rule.params);
    (name != rule.params.trim() && is_identifier(name)).then_some(name)
}

fn is_import_selector(selector: &str) -> bool {
    let selector = selector.trim();
    selector == ":import" || selector.starts_with(":import(")
}

/// `-sb-<name>` (or the `-st-` spelling) to `<name>`.
fn directive(property: &str) -> Option<&str> {
    property
        .strip_prefix("-sb-")
        .or_else(|| property.strip_prefix("-st-"))
}

fn is_identifier(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|ch| ch.is_alphanumeric() || ch == '-' || ch == '_')
}

fn unquote(value: &str) -> &str {
    let value = value.trim();
    let bytes = value.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if (first == b'"' && last == b'"') || (first == b'\'' && last == b'\'') {
            return &value[1..value.len() - 1];
        }
    }
    value
}

enum PendingRule {
    Import(ImportRule),
    Rule(Rule),
}

enum Target {
    Class(String),
    Element(String),
}

struct SheetBuilder {
    namespace: String,
    symbols: SymbolTable,
    diagnostics: Vec<Diagnostic>,
    explicit_root: Option<String>,
    /// `-sb-type` values, checked against the imports once all are known.
    pending_types: Vec<(Target, String, Span)>,
}

impl SheetBuilder {
    fn new(namespace: String) -> Self {
        Self {
            namespace,
            symbols: SymbolTable::default(),
            diagnostics: Vec::new(),
            explicit_root: None,
            pending_types: Vec::new(),
        }
    }

    fn diagnose(&mut self, kind: DiagnosticKind, message: String, span: Span) {
        self.diagnostics
            .push(Diagnostic::new(kind, self.namespace.clone(), message, span));
    }

    fn import(&mut self, rule: &QualifiedRule) -> Option<ImportRule> {
        let selector = rule.selector.trim();
        let mut path = selector
            .strip_prefix(":import(")
            .and_then(|rest| rest.strip_suffix(')'))
            .map(|inner| unquote(inner).to_string());

        for decl in &rule.declarations {
            if directive(&decl.property) == Some("from") {
                path = Some(unquote(&decl.value).to_string());
            }
        }
        let path = match path.filter(|path| !path.is_empty()) {
            Some(path) => path,
            None => {
                self.diagnose(
                    DiagnosticKind::MalformedDeclaration,
                    "`:import` without a path".to_string(),
                    rule.span,
                );
                return None;
            }
        };

        for decl in &rule.declarations {
            match directive(&decl.property) {
                Some("from") => {}
                Some("default") => {
                    let local = decl.value.trim();
                    if is_identifier(local) {
                        self.bind_import(local, &path, None, decl.span);
                    } else {
                        self.malformed(decl);
                    }
                }
                Some("named") => {
                    for entry in decl.value.split(',').map(str::trim) {
                        let (exported, local) = match entry.split_once(" as ") {
                            Some((exported, local)) => (exported.trim(), local.trim()),
                            None => (entry, entry),
                        };
                        if is_identifier(exported) && is_identifier(local) {
                            self.bind_import(local, &path, Some(exported), decl.span);
                        } else {
                            self.diagnose(
                                DiagnosticKind::MalformedDeclaration,
                                format!("Invalid named import '{}'", entry),
                                decl.span,
                            );
                        }
                    }
                }
                _ => self.diagnose(
                    DiagnosticKind::MalformedDeclaration,
                    format!("Unexpected declaration '{}' in `:import`", decl.property),
                    decl.span,
                ),
            }
        }

        Some(ImportRule {
            path,
            span: rule.span,
        })
    }

    fn bind_import(&mut self, local: &str, path: &str, exported: Option<&str>, span: Span) {
        let import = ImportRef {
            local_name: local.to_string(),
            path: path.to_string(),
            exported_name: exported.map(str::to_string),
        };
        if self.symbols.imports.insert(local.to_string(), import).is_some() {
            self.diagnose(
                DiagnosticKind::MalformedDeclaration,
                format!("Import name '{}' is declared more than once", local),
                span,
            );
        }
    }

    fn malformed(&mut self, decl: &Declaration) {
        self.diagnose(
            DiagnosticKind::MalformedDeclaration,
            format!("Invalid value '{}' for {}", decl.value, decl.property),
            decl.span,
        );
    }

    fn rule(&mut self, rule: Rule) -> Option<SheetRule> {
        match rule {
            Rule::Qualified(rule) if is_import_selector(&rule.selector) => {
                self.diagnose(
                    DiagnosticKind::MalformedDeclaration,
                    "`:import` is only allowed at the top level".to_string(),
                    rule.span,
                );
                None
            }
            Rule::Qualified(rule) => Some(SheetRule::Style(self.style_rule(rule))),
            Rule::At(at) => {
                let body = match at.block {
                    None => SheetAtBody::Statement,
                    Some(AtBlock::Raw(raw)) => SheetAtBody::Raw(raw),
                    Some(AtBlock::Rules(inner)) => {
                        SheetAtBody::Rules(inner.into_iter().filter_map(|r| self.rule(r)).collect())
                    }
                };
                Some(SheetRule::At(SheetAtRule {
                    name: at.name,
                    params: at.params,
                    body,
                    span: at.span,
                }))
            }
        }
    }

    fn style_rule(&mut self, rule: QualifiedRule) -> StyleRule {
        let selector = match parse_selector_list(&rule.selector) {
            Ok(list) => {
                for name in list.class_names() {
                    self.symbols.classes.entry(name.to_string()).or_default();
                }
                RuleSelector::Parsed(list)
            }
            Err(err) => {
                self.diagnose(
                    DiagnosticKind::MalformedSelector,
                    format!("'{}': {}", rule.selector, err),
                    rule.span,
                );
                RuleSelector::Raw(rule.selector.clone())
            }
        };

        let target = match &selector {
            RuleSelector::Parsed(list) => match list.single_compound().and_then(|c| c.bare_head()) {
                Some(Head::Class(name)) => Some(Target::Class(name.clone())),
                Some(Head::Element(tag)) => Some(Target::Element(tag.clone())),
                _ => None,
            },
            RuleSelector::Raw(_) => None,
        };

        let mut declarations = Vec::with_capacity(rule.declarations.len());
        for decl in rule.declarations {
            match directive(&decl.property) {
                Some(name @ ("root" | "type" | "states")) => {
                    self.special_declaration(name, &decl, target.as_ref());
                }
                Some("default" | "named" | "from") => self.diagnose(
                    DiagnosticKind::MalformedDeclaration,
                    format!("{} is only valid inside `:import`", decl.property),
                    decl.span,
                ),
                _ => declarations.push(decl),
            }
        }

        StyleRule {
            selector,
            declarations,
            span: rule.span,
        }
    }

    fn special_declaration(&mut self, name: &str, decl: &Declaration, target: Option<&Target>) {
        let value = decl.value.trim();
        match (name, target) {
            ("type", Some(Target::Element(tag))) => {
                if is_identifier(value) {
                    self.pending_types
                        .push((Target::Element(tag.clone()), value.to_string(), decl.span));
                } else {
                    self.malformed(decl);
                }
            }
            (_, Some(Target::Element(_)) | None) => self.diagnose(
                DiagnosticKind::MalformedDeclaration,
                format!("{} requires a plain class selector", decl.property),
                decl.span,
            ),
            ("root", Some(Target::Class(class))) => match value {
                "true" => self.mark_root(class, decl.span),
                "false" => {}
                _ => self.malformed(decl),
            },
            ("type", Some(Target::Class(class))) => {
                if is_identifier(value) {
                    self.pending_types
                        .push((Target::Class(class.clone()), value.to_string(), decl.span));
                } else {
                    self.malformed(decl);
                }
            }
            (_, Some(Target::Class(class))) => {
                let mut states = Vec::new();
                for state in value.split(',').map(str::trim) {
                    if is_identifier(state) {
                        states.push(state.to_string());
                    } else {
                        self.diagnose(
                            DiagnosticKind::MalformedDeclaration,
                            format!("Invalid state name '{}' in {}", state, decl.property),
                            decl.span,
                        );
                    }
                }
                self.symbols
                    .classes
                    .entry(class.clone())
                    .or_default()
                    .states
                    .extend(states);
            }
        }
    }

    fn mark_root(&mut self, class: &str, span: Span) {
        match &self.explicit_root {
            Some(existing) if existing != class => {
                let message = format!(
                    "'{}' is marked as root but '{}' already is; ignoring",
                    class, existing
                );
                self.diagnose(DiagnosticKind::MalformedDeclaration, message, span);
            }
            _ => self.explicit_root = Some(class.to_string()),
        }
    }

    fn finish_symbols(&mut self) {
        let root = self
            .explicit_root
            .take()
            .unwrap_or_else(|| DEFAULT_ROOT.to_string());
        self.symbols.classes.entry(root.clone()).or_default().is_root = true;
        self.symbols.root = root;

        for (target, type_name, span) in std::mem::take(&mut self.pending_types) {
            let import = match self.symbols.imports.get(&type_name) {
                Some(import) => import.clone(),
                None => {
                    self.diagnose(
                        DiagnosticKind::UnresolvedImportSymbol,
                        format!("Unknown type '{}': no import declares it", type_name),
                        span,
                    );
                    continue;
                }
            };
            match target {
                Target::Class(class) => {
                    self.symbols.classes.entry(class).or_default().extends_type = Some(import);
                }
                Target::Element(tag) => {
                    self.symbols.elements.insert(tag, import);
                }
            }
        }
    }

    fn into_sheet(self, rules: Vec<SheetRule>, source_path: Option<PathBuf>) -> StyleSheet {
        StyleSheet {
            namespace: self.namespace,
            source_path,
            rules,
            symbols: self.symbols,
            diagnostics: self.diagnostics,
        }
    }
}
