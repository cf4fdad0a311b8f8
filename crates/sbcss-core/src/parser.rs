use crate::ast::{AtBlock, AtRule, Declaration, QualifiedRule, Rule};
use crate::error::{Error, Span};

/// At-rules whose body is a list of rules that must be rewritten like
/// top-level ones. Any other block at-rule is kept verbatim.
const NESTING_AT_RULES: &[&str] = &["media", "supports", "container", "layer", "document", "scope"];

/// Split style sheet source into an ordered list of rules.
pub fn parse(input: &str) -> Result<Vec<Rule>, Error> {
    let lines = LineIndex::new(input);
    let cleaned = strip_comments(input, &lines)?;
    let parser = RuleParser {
        src: &cleaned,
        lines: &lines,
    };
    parser.parse_rules(0, cleaned.len())
}

struct RuleParser<'a> {
    src: &'a str,
    lines: &'a LineIndex,
}

impl RuleParser<'_> {
    fn parse_rules(&self, start: usize, end: usize) -> Result<Vec<Rule>, Error> {
        let bytes = self.src.as_bytes();
        let mut rules = Vec::new();
        let mut pos = start;

        loop {
            while pos < end && bytes[pos].is_ascii_whitespace() {
                pos += 1;
            }
            if pos >= end {
                break;
            }

            if bytes[pos] == b'@' {
                let (rule, next) = self.parse_at_rule(pos, end)?;
                rules.push(Rule::At(rule));
                pos = next;
                continue;
            }

            let open_idx = match self.find_outside(pos, end, |b| b == b'{' || b == b'}')? {
                Some(idx) if bytes[idx] == b'{' => idx,
                Some(idx) => {
                    return Err(Error::parse("Unexpected '}'", self.lines.span(idx)));
                }
                None => {
                    return Err(Error::parse(
                        format!("Expected '{{' after '{}'", self.src[pos..end].trim()),
                        self.lines.span(pos),
                    ));
                }
            };
            let selector = self.src[pos..open_idx].trim().to_string();
            if selector.is_empty() {
                return Err(Error::parse(
                    "Missing selector before '{'",
                    self.lines.span(open_idx),
                ));
            }

            let close_idx = self.matching_brace(open_idx, end)?;
            let declarations = self.parse_declarations(open_idx + 1, close_idx)?;
            rules.push(Rule::Qualified(QualifiedRule {
                selector,
                declarations,
                span: self.lines.span(pos),
            }));
            pos = close_idx + 1;
        }

        Ok(rules)
    }

    fn parse_at_rule(&self, start: usize, end: usize) -> Result<(AtRule, usize), Error> {
        let bytes = self.src.as_bytes();
        let mut name_end = start + 1;
        while name_end < end && is_name_byte(bytes[name_end]) {
            name_end += 1;
        }
        let name = self.src[start + 1..name_end].to_ascii_lowercase();
        if name.is_empty() {
            return Err(Error::parse("Missing at-rule name after '@'", self.lines.span(start)));
        }
        let span = self.lines.span(start);

        let delim = self.find_outside(name_end, end, |b| b == b'{' || b == b';' || b == b'}')?;
        match delim {
            Some(idx) if bytes[idx] == b'{' => {
                let close_idx = self.matching_brace(idx, end)?;
                let block = if NESTING_AT_RULES.contains(&name.as_str()) {
                    AtBlock::Rules(self.parse_rules(idx + 1, close_idx)?)
                } else {
                    AtBlock::Raw(dedent(&self.src[idx + 1..close_idx]))
                };
                let rule = AtRule {
                    name,
                    params: self.src[name_end..idx].trim().to_string(),
                    block: Some(block),
                    span,
                };
                Ok((rule, close_idx + 1))
            }
            Some(idx) if bytes[idx] == b'}' => {
                Err(Error::parse("Unexpected '}'", self.lines.span(idx)))
            }
            Some(idx) => {
                let rule = AtRule {
                    name,
                    params: self.src[name_end..idx].trim().to_string(),
                    block: None,
                    span,
                };
                Ok((rule, idx + 1))
            }
            None => {
                let rule = AtRule {
                    name,
                    params: self.src[name_end..end].trim().to_string(),
                    block: None,
                    span,
                };
                Ok((rule, end))
            }
        }
    }

    fn parse_declarations(&self, start: usize, end: usize) -> Result<Vec<Declaration>, Error> {
        let mut declarations = Vec::new();
        let mut fragment_start = start;

        loop {
            let delim = self.find_outside(fragment_start, end, |b| b == b';' || b == b'{')?;
            let fragment_end = match delim {
                Some(idx) if self.src.as_bytes()[idx] == b'{' => {
                    return Err(Error::parse(
                        "Nested rules are not supported inside a rule body",
                        self.lines.span(idx),
                    ));
                }
                Some(idx) => idx,
                None => end,
            };

            let raw = &self.src[fragment_start..fragment_end];
            let fragment = raw.trim();
            if !fragment.is_empty() {
                let offset = fragment_start + (raw.len() - raw.trim_start().len());
                let span = self.lines.span(offset);
                match fragment.split_once(':') {
                    Some((property, value)) if !property.trim().is_empty() => {
                        declarations.push(Declaration {
                            property: property.trim().to_string(),
                            value: value.trim().to_string(),
                            span,
                        });
                    }
                    _ => {
                        return Err(Error::parse(
                            format!("Invalid declaration: '{}'", fragment),
                            span,
                        ));
                    }
                }
            }

            if fragment_end >= end {
                break;
            }
            fragment_start = fragment_end + 1;
        }

        Ok(declarations)
    }

    /// Position of the first byte in `start..end` accepted by `pred` that
    /// sits outside strings, parentheses and brackets.
    fn find_outside(
        &self,
        start: usize,
        end: usize,
        pred: impl Fn(u8) -> bool,
    ) -> Result<Option<usize>, Error> {
        let bytes = self.src.as_bytes();
        let mut depth = 0usize;
        let mut pos = start;
        while pos < end {
            let b = bytes[pos];
            match b {
                b'"' | b'\'' => {
                    pos = self.skip_string(pos, end)?;
                    continue;
                }
                b'\\' => {
                    pos += 2;
                    continue;
                }
                b'(' | b'[' => depth += 1,
                b')' | b']' => depth = depth.saturating_sub(1),
                _ if depth == 0 && pred(b) => return Ok(Some(pos)),
                _ => {}
            }
            pos += 1;
        }
        Ok(None)
    }

    fn matching_brace(&self, open_idx: usize, end: usize) -> Result<usize, Error> {
        let bytes = self.src.as_bytes();
        let mut depth = 0usize;
        let mut pos = open_idx;
        while pos < end {
            match bytes[pos] {
                b'"' | b'\'' => {
                    pos = self.skip_string(pos, end)?;
                    continue;
                }
                b'\\' => {
                    pos += 2;
                    continue;
                }
                b'{' => depth += 1,
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(pos);
                    }
                }
                _ => {}
            }
            pos += 1;
        }
        Err(Error::parse("Unclosed block", self.lines.span(open_idx)))
    }

    /// Returns the position just past the closing quote.
    fn skip_string(&self, open_idx: usize, end: usize) -> Result<usize, Error> {
        let bytes = self.src.as_bytes();
        let quote = bytes[open_idx];
        let mut pos = open_idx + 1;
        while pos < end {
            match bytes[pos] {
                b'\\' => pos += 2,
                b if b == quote => return Ok(pos + 1),
                _ => pos += 1,
            }
        }
        Err(Error::parse("Unterminated string", self.lines.span(open_idx)))
    }
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b'_'
}

/// Replace `/* ... */` comments with whitespace so byte offsets (and
/// therefore spans) stay valid against the original input.
fn strip_comments(input: &str, lines: &LineIndex) -> Result<String, Error> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut pos = 0;
    let mut quote: Option<u8> = None;

    while pos < bytes.len() {
        let b = bytes[pos];
        if let Some(q) = quote {
            out.push(b);
            if b == b'\\' && pos + 1 < bytes.len() {
                out.push(bytes[pos + 1]);
                pos += 2;
                continue;
            }
            if b == q {
                quote = None;
            }
            pos += 1;
            continue;
        }

        if b == b'"' || b == b'\'' {
            quote = Some(b);
            out.push(b);
            pos += 1;
        } else if b == b'/' && bytes.get(pos + 1) == Some(&b'*') {
            let close = input[pos + 2..]
                .find("*/")
                .map(|rel| pos + 2 + rel + 2)
                .ok_or_else(|| Error::parse("Unterminated comment", lines.span(pos)))?;
            out.extend(bytes[pos..close].iter().map(|&c| if c == b'\n' { b'\n' } else { b' ' }));
            pos = close;
        } else {
            out.push(b);
            pos += 1;
        }
    }

    // Only whole comments were replaced, and only with ASCII bytes.
    String::from_utf8(out).map_err(|_| Error::parse("Invalid UTF-8 in input", Span::dummy()))
}

struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    fn new(input: &str) -> Self {
        let mut starts = vec![0];
        starts.extend(input.match_indices('\n').map(|(idx, _)| idx + 1));
        Self { starts }
    }

    fn span(&self, offset: usize) -> Span {
        let line = self.starts.partition_point(|&start| start <= offset);
        let line_start = self.starts[line - 1];
        Span {
            line,
            column: offset - line_start + 1,
        }
    }
}

/// Trim a raw block body and drop the indentation its lines share, so it
/// can be re-indented on output.
fn dedent(body: &str) -> String {
    let body = body.trim();
    let mut lines = body.lines();
    let mut out = lines.next().unwrap_or_default().to_string();
    let rest: Vec<&str> = lines.collect();
    let indent = rest
        .iter()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.len() - line.trim_start().len())
        .min()
        .unwrap_or(0);
    for line in rest {
        out.push('\n');
        out.push_str(line.get(indent..).unwrap_or_else(|| line.trim_start()));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn qualified(rule: &Rule) -> &QualifiedRule {
        match rule {
            Rule::Qualified(rule) => rule,
            Rule::At(at) => panic!("expected qualified rule, got @{}", at.name),
        }
    }

    #[test]
    fn parses_rules_in_source_order() {
        let rules = parse(".a { color: red; margin: 0 }\n.b {}").expect("parse");
        assert_eq!(rules.len(), 2);
        let a = qualified(&rules[0]);
        assert_eq!(a.selector, ".a");
        assert_eq!(a.declarations.len(), 2);
        assert_eq!(a.declarations[1].property, "margin");
        assert_eq!(a.declarations[1].value, "0");
        assert!(qualified(&rules[1]).declarations.is_empty());
        assert_eq!(rules[1].span(), Span { line: 2, column: 1 });
    }

    #[test]
    fn import_rule_is_an_ordinary_qualified_rule() {
        let rules = parse(":import(\"./a.css\") { -sb-default: A; }").expect("parse");
        let import = qualified(&rules[0]);
        assert_eq!(import.selector, ":import(\"./a.css\")");
        assert_eq!(import.declarations[0].property, "-sb-default");
        assert_eq!(import.declarations[0].value, "A");
    }

    #[test]
    fn comments_and_strings_do_not_split_rules() {
        let src = "/* .x { } */ .a { content: \"}{;\"; /* c: d; */ background: url(a;b.png) }";
        let rules = parse(src).expect("parse");
        assert_eq!(rules.len(), 1);
        let a = qualified(&rules[0]);
        assert_eq!(a.declarations.len(), 2);
        assert_eq!(a.declarations[0].value, "\"}{;\"");
        assert_eq!(a.declarations[1].value, "url(a;b.png)");
    }

    #[test]
    fn media_rules_nest_and_keyframes_stay_raw() {
        let src = "@media (max-width: 10px) { .a { color: red } }\n\
                   @keyframes spin { from { opacity: 0 } }\n\
                   @charset \"utf-8\";";
        let rules = parse(src).expect("parse");
        assert_eq!(rules.len(), 3);
        match &rules[0] {
            Rule::At(AtRule { name, params, block: Some(AtBlock::Rules(inner)), .. }) => {
                assert_eq!(name, "media");
                assert_eq!(params, "(max-width: 10px)");
                assert_eq!(qualified(&inner[0]).selector, ".a");
            }
            other => panic!("unexpected {:?}", other),
        }
        match &rules[1] {
            Rule::At(AtRule { block: Some(AtBlock::Raw(body)), .. }) => {
                assert_eq!(body, "from { opacity: 0 }");
            }
            other => panic!("unexpected {:?}", other),
        }
        match &rules[2] {
            Rule::At(AtRule { name, params, block: None, .. }) => {
                assert_eq!(name, "charset");
                assert_eq!(params, "\"utf-8\"");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn raw_blocks_lose_source_indentation() {
        let src = concat!(
            "@keyframes spin {\n",
            "    from {\n",
            "        opacity: 0;\n",
            "    }\n",
            "    to { opacity: 1 }\n",
            "}",
        );
        let rules = parse(src).expect("parse");
        match &rules[0] {
            Rule::At(AtRule { block: Some(AtBlock::Raw(body)), .. }) => {
                assert_eq!(body, "from {\n    opacity: 0;\n}\nto { opacity: 1 }");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn unclosed_block_is_an_error() {
        let err = parse(".a { color: red;").unwrap_err();
        assert!(err.to_string().contains("Unclosed block"));
    }

    #[test]
    fn missing_colon_is_an_error_with_position() {
        let err = parse(".a {\n  color red;\n}").unwrap_err();
        assert_eq!(err.to_string(), "2:3: Invalid declaration: 'color red'");
    }

    #[test]
    fn nested_rule_in_body_is_rejected() {
        let err = parse(".a { .b { color: red } }").unwrap_err();
        assert!(err.to_string().contains("Nested rules are not supported"));
    }

    #[test]
    fn unterminated_comment_is_an_error() {
        assert!(parse(".a {} /* open").is_err());
    }
}
