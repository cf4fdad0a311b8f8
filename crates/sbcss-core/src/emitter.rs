use crate::ast::Declaration;

/// Join generated rules into one style sheet.
pub fn emit_css(rules: &[String]) -> String {
    let mut out = String::new();
    for rule in rules {
        out.push_str(rule);
        out.push('\n');
    }
    out
}

/// `selector {}` for an empty block, otherwise one declaration per line
/// without a trailing semicolon.
pub fn emit_rule(selector: &str, declarations: &[Declaration]) -> String {
    let mut out = String::new();
    out.push_str(selector);
    if declarations.is_empty() {
        out.push_str(" {}");
        return out;
    }

    out.push_str(" {\n");
    for (idx, decl) in declarations.iter().enumerate() {
        if idx > 0 {
            out.push_str(";\n");
        }
        emit_declaration(decl, &mut out);
    }
    out.push_str("\n}");
    out
}

fn emit_declaration(decl: &Declaration, out: &mut String) {
    out.push_str("    ");
    out.push_str(&decl.property);
    out.push_str(": ");
    out.push_str(&decl.value);
}

pub fn emit_at_statement(name: &str, params: &str) -> String {
    format!("{};", at_prelude(name, params))
}

/// An at-rule whose body is already serialized; the body gets indented.
pub fn emit_at_block(name: &str, params: &str, body: &str) -> String {
    let prelude = at_prelude(name, params);
    if body.trim().is_empty() {
        return format!("{} {{}}", prelude);
    }

    let mut out = prelude;
    out.push_str(" {\n");
    for (idx, line) in body.lines().enumerate() {
        if idx > 0 {
            out.push('\n');
        }
        if !line.trim().is_empty() {
            out.push_str("    ");
            out.push_str(line);
        }
    }
    out.push_str("\n}");
    out
}

fn at_prelude(name: &str, params: &str) -> String {
    if params.is_empty() {
        format!("@{}", name)
    } else {
        format!("@{} {}", name, params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Span;

    fn decl(property: &str, value: &str) -> Declaration {
        Declaration {
            property: property.to_string(),
            value: value.to_string(),
            span: Span::dummy(),
        }
    }

    #[test]
    fn empty_rule_has_empty_body() {
        assert_eq!(emit_rule(".a", &[]), ".a {}");
    }

    #[test]
    fn declarations_are_indented_without_trailing_semicolon() {
        let decls = [decl("color", "black"), decl("margin", "0 auto")];
        assert_eq!(
            emit_rule(".a", &decls),
            ".a {\n    color: black;\n    margin: 0 auto\n}"
        );
    }

    #[test]
    fn at_rules_indent_their_body() {
        assert_eq!(
            emit_at_block("media", "print", ".a {\n    color: red\n}"),
            "@media print {\n    .a {\n        color: red\n    }\n}"
        );
        assert_eq!(emit_at_block("font-face", "", ""), "@font-face {}");
        assert_eq!(emit_at_statement("charset", "\"utf-8\""), "@charset \"utf-8\";");
    }

    #[test]
    fn emit_css_puts_each_rule_on_its_own_line() {
        let rules = vec![".a {}".to_string(), ".b {}".to_string()];
        assert_eq!(emit_css(&rules), ".a {}\n.b {}\n");
    }
}
