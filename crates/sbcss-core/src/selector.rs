//! Selector AST and a small recursive-descent parser for it.
//!
//! A selector list is a comma separated list of compound chains. Every
//! compound selector is split into a head (class, element or `*`), its
//! qualifiers (extra classes, ids, attributes and pseudo-classes) and a
//! trailing run of pseudo-elements, each of which may carry pseudo-classes
//! of its own (`.a::part:hover`). Rewrites operate on this tree and
//! serialize it once through [`fmt::Display`].

use std::fmt;

/// Pseudo-classes whose argument is itself a selector list.
const SELECTOR_ARG_PSEUDOS: &[&str] = &["not", "is", "where", "has", "matches"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    /// Whitespace: ancestor descendant
    Descendant,
    /// `>`
    Child,
    /// `+`
    NextSibling,
    /// `~`
    SubsequentSibling,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Head {
    Class(String),
    Element(String),
    Universal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PseudoArgs {
    Selectors(SelectorList),
    Raw(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Qualifier {
    Class(String),
    Id(String),
    /// Text between the brackets, kept verbatim.
    Attribute(String),
    PseudoClass {
        name: String,
        args: Option<PseudoArgs>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PseudoElement {
    pub name: String,
    /// Pseudo-classes attached after the pseudo-element.
    pub qualifiers: Vec<Qualifier>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompoundSelector {
    pub head: Option<Head>,
    pub qualifiers: Vec<Qualifier>,
    pub pseudo_elements: Vec<PseudoElement>,
}

impl CompoundSelector {
    pub fn with_class(name: impl Into<String>) -> Self {
        Self {
            head: Some(Head::Class(name.into())),
            ..Self::default()
        }
    }

    fn is_empty(&self) -> bool {
        self.head.is_none() && self.qualifiers.is_empty() && self.pseudo_elements.is_empty()
    }

    /// The head, if it is the only thing in this compound.
    pub fn bare_head(&self) -> Option<&Head> {
        if self.qualifiers.is_empty() && self.pseudo_elements.is_empty() {
            self.head.as_ref()
        } else {
            None
        }
    }
}

/// Compound selectors joined by combinators, left to right. The first part
/// never has a combinator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComplexSelector {
    pub parts: Vec<(Option<Combinator>, CompoundSelector)>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectorList(pub Vec<ComplexSelector>);

impl SelectorList {
    /// The compound selector of a list made of exactly one compound.
    pub fn single_compound(&self) -> Option<&CompoundSelector> {
        match self.0.as_slice() {
            [complex] if complex.parts.len() == 1 => Some(&complex.parts[0].1),
            _ => None,
        }
    }

    /// Every class name mentioned anywhere in the list, in source order.
    pub fn class_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        for complex in &self.0 {
            for (_, compound) in &complex.parts {
                collect_classes(compound, &mut names);
            }
        }
        names
    }
}

fn collect_classes<'a>(compound: &'a CompoundSelector, names: &mut Vec<&'a str>) {
    if let Some(Head::Class(name)) = &compound.head {
        names.push(name);
    }
    let pseudo_qualifiers = compound.pseudo_elements.iter().flat_map(|pe| &pe.qualifiers);
    for qualifier in compound.qualifiers.iter().chain(pseudo_qualifiers) {
        match qualifier {
            Qualifier::Class(name) => names.push(name),
            Qualifier::PseudoClass {
                args: Some(PseudoArgs::Selectors(list)),
                ..
            } => names.extend(list.class_names()),
            _ => {}
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message} at offset {offset}")]
pub struct SelectorError {
    pub message: String,
    pub offset: usize,
}

pub fn parse_selector_list(input: &str) -> Result<SelectorList, SelectorError> {
    let mut parser = SelectorParser { src: input, pos: 0 };
    parser.parse_list()
}

struct SelectorParser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> SelectorParser<'a> {
    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        self.src[self.pos..].chars().nth(1)
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn skip_ws(&mut self) -> bool {
        let start = self.pos;
        while matches!(self.peek(), Some(ch) if ch.is_whitespace()) {
            self.bump();
        }
        self.pos > start
    }

    fn error(&self, message: impl Into<String>) -> SelectorError {
        SelectorError {
            message: message.into(),
            offset: self.pos,
        }
    }

    fn unexpected(&self) -> SelectorError {
        match self.peek() {
            Some(ch) => self.error(format!("Unexpected '{}'", ch)),
            None => self.error("Unexpected end of selector"),
        }
    }

    fn parse_list(&mut self) -> Result<SelectorList, SelectorError> {
        let mut list = Vec::new();
        loop {
            self.skip_ws();
            list.push(self.parse_complex()?);
            self.skip_ws();
            match self.peek() {
                None => break,
                Some(',') => {
                    self.bump();
                }
                Some(_) => return Err(self.unexpected()),
            }
        }
        Ok(SelectorList(list))
    }

    fn parse_complex(&mut self) -> Result<ComplexSelector, SelectorError> {
        let first = self.parse_compound()?;
        if first.is_empty() {
            return Err(self.unexpected());
        }
        let mut parts = vec![(None, first)];

        loop {
            let had_ws = self.skip_ws();
            let combinator = match self.peek() {
                None | Some(',') => break,
                Some('>') => Combinator::Child,
                Some('+') => Combinator::NextSibling,
                Some('~') => Combinator::SubsequentSibling,
                Some(_) if had_ws => Combinator::Descendant,
                Some(_) => return Err(self.unexpected()),
            };
            if combinator != Combinator::Descendant {
                self.bump();
                self.skip_ws();
            }
            let compound = self.parse_compound()?;
            if compound.is_empty() {
                return Err(self.unexpected());
            }
            parts.push((Some(combinator), compound));
        }

        Ok(ComplexSelector { parts })
    }

    fn parse_compound(&mut self) -> Result<CompoundSelector, SelectorError> {
        let mut compound = CompoundSelector::default();

        compound.head = match self.peek() {
            Some('*') => {
                self.bump();
                Some(Head::Universal)
            }
            Some('.') => {
                self.bump();
                Some(Head::Class(self.ident()?))
            }
            Some(ch) if is_ident_start(ch) => Some(Head::Element(self.ident()?)),
            _ => None,
        };

        loop {
            match (self.peek(), self.peek_second()) {
                (Some(':'), Some(':')) => break,
                (Some(':'), _) => {
                    self.bump();
                    compound.qualifiers.push(self.pseudo_class()?);
                }
                (Some('.'), _) => {
                    self.bump();
                    compound.qualifiers.push(Qualifier::Class(self.ident()?));
                }
                (Some('#'), _) => {
                    self.bump();
                    compound.qualifiers.push(Qualifier::Id(self.ident()?));
                }
                (Some('['), _) => {
                    self.bump();
                    let raw = self.balanced(']')?;
                    compound.qualifiers.push(Qualifier::Attribute(raw.trim().to_string()));
                }
                _ => break,
            }
        }

        while self.src[self.pos..].starts_with("::") {
            self.pos += 2;
            let name = self.ident()?;
            let mut qualifiers = Vec::new();
            loop {
                match (self.peek(), self.peek_second()) {
                    (Some(':'), Some(':')) => break,
                    (Some(':'), _) => {
                        self.bump();
                        qualifiers.push(self.pseudo_class()?);
                    }
                    (Some('.' | '#' | '['), _) => {
                        return Err(self.error("Only pseudo-classes may follow a pseudo-element"));
                    }
                    _ => break,
                }
            }
            compound.pseudo_elements.push(PseudoElement { name, qualifiers });
        }

        Ok(compound)
    }

    fn pseudo_class(&mut self) -> Result<Qualifier, SelectorError> {
        let name = self.ident()?;
        let args = if self.peek() == Some('(') {
            self.bump();
            let raw = self.balanced(')')?.trim().to_string();
            if SELECTOR_ARG_PSEUDOS.contains(&name.to_ascii_lowercase().as_str()) {
                match parse_selector_list(&raw) {
                    Ok(list) => Some(PseudoArgs::Selectors(list)),
                    Err(_) => Some(PseudoArgs::Raw(raw)),
                }
            } else {
                Some(PseudoArgs::Raw(raw))
            }
        } else {
            None
        };
        Ok(Qualifier::PseudoClass { name, args })
    }

    fn ident(&mut self) -> Result<String, SelectorError> {
        let start = self.pos;
        while let Some(ch) = self.peek() {
            if ch == '\\' {
                self.bump();
                if self.bump().is_none() {
                    return Err(self.error("Dangling escape"));
                }
            } else if is_ident_char(ch) {
                self.bump();
            } else {
                break;
            }
        }
        if self.pos == start {
            return Err(self.error("Expected identifier"));
        }
        Ok(self.src[start..self.pos].to_string())
    }

    /// Consume up to the `close` that balances an already consumed opener,
    /// returning the text in between.
    fn balanced(&mut self, close: char) -> Result<&'a str, SelectorError> {
        let open = if close == ')' { '(' } else { '[' };
        let start = self.pos;
        let mut depth = 1usize;
        let mut quote: Option<char> = None;
        while let Some(ch) = self.bump() {
            match (quote, ch) {
                (_, '\\') => {
                    self.bump();
                }
                (Some(q), c) if c == q => quote = None,
                (Some(_), _) => {}
                (None, '"' | '\'') => quote = Some(ch),
                (None, c) if c == open => depth += 1,
                (None, c) if c == close => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(&self.src[start..self.pos - close.len_utf8()]);
                    }
                }
                _ => {}
            }
        }
        Err(self.error(format!("Missing '{}'", close)))
    }
}

fn is_ident_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_' || ch == '-' || ch == '\\' || !ch.is_ascii()
}

fn is_ident_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_' || ch == '-' || !ch.is_ascii()
}

impl fmt::Display for Combinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Combinator::Descendant => " ",
            Combinator::Child => " > ",
            Combinator::NextSibling => " + ",
            Combinator::SubsequentSibling => " ~ ",
        };
        f.write_str(text)
    }
}

impl fmt::Display for Head {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Head::Class(name) => write!(f, ".{}", name),
            Head::Element(name) => f.write_str(name),
            Head::Universal => f.write_str("*"),
        }
    }
}

impl fmt::Display for PseudoArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PseudoArgs::Selectors(list) => list.fmt(f),
            PseudoArgs::Raw(raw) => f.write_str(raw),
        }
    }
}

impl fmt::Display for Qualifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Qualifier::Class(name) => write!(f, ".{}", name),
            Qualifier::Id(name) => write!(f, "#{}", name),
            Qualifier::Attribute(raw) => write!(f, "[{}]", raw),
            Qualifier::PseudoClass { name, args: None } => write!(f, ":{}", name),
            Qualifier::PseudoClass {
                name,
                args: Some(args),
            } => write!(f, ":{}({})", name, args),
        }
    }
}

impl fmt::Display for PseudoElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "::{}", self.name)?;
        for qualifier in &self.qualifiers {
            qualifier.fmt(f)?;
        }
        Ok(())
    }
}

impl fmt::Display for CompoundSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(head) = &self.head {
            head.fmt(f)?;
        }
        for qualifier in &self.qualifiers {
            qualifier.fmt(f)?;
        }
        for pseudo in &self.pseudo_elements {
            pseudo.fmt(f)?;
        }
        Ok(())
    }
}

impl fmt::Display for ComplexSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (combinator, compound) in &self.parts {
            if let Some(combinator) = combinator {
                combinator.fmt(f)?;
            }
            compound.fmt(f)?;
        }
        Ok(())
    }
}

impl fmt::Display for SelectorList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, complex) in self.0.iter().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            complex.fmt(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> SelectorList {
        parse_selector_list(input).expect("valid selector")
    }

    #[test]
    fn splits_heads_qualifiers_and_pseudo_elements() {
        let list = parse("button.primary#go[type=\"submit\"]:hover::icon:active");
        let compound = list.single_compound().expect("one compound");
        assert_eq!(compound.head, Some(Head::Element("button".into())));
        assert_eq!(
            compound.qualifiers,
            vec![
                Qualifier::Class("primary".into()),
                Qualifier::Id("go".into()),
                Qualifier::Attribute("type=\"submit\"".into()),
                Qualifier::PseudoClass {
                    name: "hover".into(),
                    args: None
                },
            ]
        );
        assert_eq!(compound.pseudo_elements.len(), 1);
        assert_eq!(compound.pseudo_elements[0].name, "icon");
        assert_eq!(compound.pseudo_elements[0].qualifiers.len(), 1);
    }

    #[test]
    fn parses_combinators_left_to_right() {
        let list = parse(".a > .b + c ~ * .d");
        let combinators: Vec<_> = list.0[0].parts.iter().map(|(c, _)| *c).collect();
        assert_eq!(
            combinators,
            vec![
                None,
                Some(Combinator::Child),
                Some(Combinator::NextSibling),
                Some(Combinator::SubsequentSibling),
                Some(Combinator::Descendant),
            ]
        );
    }

    #[test]
    fn serializes_in_normalized_form() {
        assert_eq!(parse(".a>.b ,  .c::x::y").to_string(), ".a > .b, .c::x::y");
        assert_eq!(parse("li:nth-child( 2n+1 )").to_string(), "li:nth-child(2n+1)");
    }

    #[test]
    fn negation_arguments_are_selector_lists() {
        let list = parse(".a:not(.b, .c)");
        assert_eq!(list.class_names(), vec!["a", "b", "c"]);
        let compound = list.single_compound().expect("one compound");
        assert!(matches!(
            &compound.qualifiers[0],
            Qualifier::PseudoClass { args: Some(PseudoArgs::Selectors(_)), .. }
        ));
    }

    #[test]
    fn unparsable_selector_arguments_stay_raw() {
        let list = parse(":has(> img)");
        let compound = list.single_compound().expect("one compound");
        assert_eq!(
            compound.qualifiers[0],
            Qualifier::PseudoClass {
                name: "has".into(),
                args: Some(PseudoArgs::Raw("> img".into()))
            }
        );
    }

    #[test]
    fn bare_head_requires_nothing_else() {
        let list = parse(".a");
        assert_eq!(
            list.single_compound().and_then(CompoundSelector::bare_head),
            Some(&Head::Class("a".into()))
        );
        let list = parse(".a:hover");
        assert_eq!(list.single_compound().and_then(CompoundSelector::bare_head), None);
        assert!(parse(".a .b").single_compound().is_none());
    }

    #[test]
    fn rejects_malformed_selectors() {
        assert!(parse_selector_list("").is_err());
        assert!(parse_selector_list(".a,").is_err());
        assert!(parse_selector_list(".a >").is_err());
        assert!(parse_selector_list("[x").is_err());
        assert!(parse_selector_list(".a::b.c").is_err());
        assert!(parse_selector_list(". a").is_err());
    }

    #[test]
    fn escapes_stay_part_of_identifiers() {
        let list = parse(".sm\\:flex");
        assert_eq!(list.class_names(), vec!["sm\\:flex"]);
        assert_eq!(list.to_string(), ".sm\\:flex");
    }
}
