//! Raw rule model produced by [`crate::parser`]. Selectors are still text
//! here; [`crate::stylesheet`] turns them into selector ASTs.

use crate::error::Span;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub property: String,
    pub value: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualifiedRule {
    pub selector: String,
    pub declarations: Vec<Declaration>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AtBlock {
    /// Nested rules, e.g. the body of `@media`.
    Rules(Vec<Rule>),
    /// Body kept verbatim, e.g. `@keyframes` or `@font-face`.
    Raw(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtRule {
    pub name: String,
    pub params: String,
    /// `None` for statement at-rules such as `@charset "utf-8";`.
    pub block: Option<AtBlock>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rule {
    Qualified(QualifiedRule),
    At(AtRule),
}

impl Rule {
    pub fn span(&self) -> Span {
        match self {
            Rule::Qualified(rule) => rule.span,
            Rule::At(rule) => rule.span,
        }
    }
}
