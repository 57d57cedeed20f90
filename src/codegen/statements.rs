//! # Statement and Expression Syntax
//!
//! Builds statements and expressions from already rendered sub-expressions.
//! Nothing here looks at the graph; callers pass text in and get text back.
//! Shape checks look through informational markers so output is identical
//! whether or not markers are woven in.

use super::debug::strip_markers;

/// One indentation level
pub const INDENT: &str = "\t";

/// Indents every non-empty line of `text` by `levels`
pub fn add_tabs(text: &str, levels: usize) -> String {
    if text.is_empty() {
        return String::new();
    }
    let prefix = INDENT.repeat(levels);
    text.split('\n')
        .map(|line| {
            if strip_markers(line).trim().is_empty() {
                line.to_string()
            } else {
                format!("{}{}", prefix, line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Joins statements, skipping empty ones
pub fn flow<S: AsRef<str>>(parts: &[S]) -> String {
    parts
        .iter()
        .map(|p| p.as_ref())
        .filter(|p| !p.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// `{ body }` spanning several lines
pub fn block(body: &str) -> String {
    if body.trim().is_empty() {
        "{\n}".to_string()
    } else {
        format!("{{\n{}\n}}", add_tabs(body, 1))
    }
}

/// Wraps an operand in parentheses unless it is a single token
pub fn wrap_operand(expr: &str) -> String {
    let plain = strip_markers(expr);
    let simple = !plain.chars().any(char::is_whitespace) && !plain.starts_with('-') && !plain.starts_with('!');
    if simple {
        expr.to_string()
    } else {
        format!("({})", expr)
    }
}

pub fn if_statement(condition: &str, then: &str, otherwise: Option<&str>) -> String {
    let mut code = format!("if({}) {}", condition, block(then));
    if let Some(otherwise) = otherwise.filter(|o| !o.trim().is_empty()) {
        code.push_str(" else ");
        code.push_str(&block(otherwise));
    }
    code
}

/// A `switch` over `value`; each case is (labels, body)
pub fn switch_statement(value: &str, cases: &[(Vec<String>, String)], default: Option<&str>) -> String {
    let mut body = Vec::new();
    for (labels, code) in cases {
        let heads: Vec<String> = labels.iter().map(|l| format!("case {}:", l)).collect();
        body.push(format!("{} {}", heads.join(" "), block(&flow(&[code.as_str(), "break;"]))));
    }
    if let Some(default) = default.filter(|d| !d.trim().is_empty()) {
        body.push(format!("default: {}", block(&flow(&[default, "break;"]))));
    }
    format!("switch({}) {}", value, block(&body.join("\n")))
}

pub fn for_statement(init: &str, condition: &str, iterator: &str, body: &str) -> String {
    format!("for({}; {}; {}) {}", init, condition, iterator, block(body))
}

pub fn foreach_statement(element_type: &str, variable: &str, collection: &str, body: &str) -> String {
    format!("foreach({} {} in {}) {}", element_type, variable, collection, block(body))
}

pub fn while_statement(condition: &str, body: &str) -> String {
    format!("while({}) {}", condition, block(body))
}

/// `(a, b) => { body }`
pub fn lambda(parameters: &[String], body: &str) -> String {
    format!("({}) => {}", parameters.join(", "), block(body))
}

/// `(a, b) => expr`
pub fn lambda_expression(parameters: &[String], expression: &str) -> String {
    format!("({}) => {}", parameters.join(", "), expression)
}

/// Assignment with an optional compound operator (`+`, `-`, ...)
pub fn set(target: &str, value: &str, operator: Option<&str>) -> String {
    match operator.filter(|op| !op.is_empty() && *op != "=") {
        Some(op) => format!("{} {}= {};", target, op.trim_end_matches('='), value),
        None => format!("{} = {};", target, value),
    }
}

pub fn member(target: &str, name: &str) -> String {
    if target.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", target, name)
    }
}

pub fn invoke(target: Option<&str>, method: &str, generic_arguments: &[String], arguments: &[String]) -> String {
    let generics = if generic_arguments.is_empty() {
        String::new()
    } else {
        format!("<{}>", generic_arguments.join(", "))
    };
    let name = member(target.unwrap_or(""), method);
    format!("{}{}({})", name, generics, arguments.join(", "))
}

pub fn new_object(type_name: &str, arguments: &[String]) -> String {
    format!("new {}({})", type_name, arguments.join(", "))
}

pub fn return_statement(value: Option<&str>) -> String {
    match value {
        Some(v) => format!("return {};", v),
        None => "return;".to_string(),
    }
}

pub fn yield_return(value: &str) -> String {
    format!("yield return {};", value)
}

pub fn yield_break() -> String {
    "yield break;".to_string()
}

/// Expression statement
pub fn statement(expression: &str) -> String {
    let plain = strip_markers(expression);
    if plain.trim_end().ends_with(';') || plain.trim_end().ends_with('}') {
        expression.to_string()
    } else {
        format!("{};", expression)
    }
}

pub fn binary(operator: &str, left: &str, right: &str) -> String {
    format!("{} {} {}", wrap_operand(left), operator, wrap_operand(right))
}

pub fn unary(operator: &str, operand: &str) -> String {
    format!("{}{}", operator, wrap_operand(operand))
}

pub fn ternary(condition: &str, then: &str, otherwise: &str) -> String {
    format!("{} ? {} : {}", wrap_operand(condition), then, otherwise)
}

pub fn cast(type_name: &str, value: &str) -> String {
    format!("({}){}", type_name, wrap_operand(value))
}

pub fn is_binary_operator(op: &str) -> bool {
    matches!(
        op,
        "+" | "-" | "*" | "/" | "%" | "==" | "!=" | "<" | ">" | "<=" | ">=" | "&&" | "||" | "&" | "|" | "^"
            | "<<" | ">>" | "??"
    )
}

pub fn is_unary_operator(op: &str) -> bool {
    matches!(op, "!" | "-" | "~" | "+")
}

pub fn comment(text: &str) -> String {
    text.lines().map(|l| format!("// {}", l)).collect::<Vec<_>>().join("\n")
}

pub fn block_comment(text: &str) -> String {
    format!("/* {} */", text.replace("*/", "* /"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn if_with_else() {
        let code = if_statement("a", "Run();", Some("Stop();"));
        assert_eq!(code, "if(a) {\n\tRun();\n} else {\n\tStop();\n}");
    }

    #[test]
    fn if_without_else_omits_branch() {
        assert_eq!(if_statement("a", "Run();", Some("  ")), "if(a) {\n\tRun();\n}");
    }

    #[test]
    fn switch_cases_end_with_break() {
        let code = switch_statement("x", &[(vec!["1".into()], "A();".into())], Some("B();"));
        assert_eq!(
            code,
            "switch(x) {\n\tcase 1: {\n\t\tA();\n\t\tbreak;\n\t}\n\tdefault: {\n\t\tB();\n\t\tbreak;\n\t}\n}"
        );
    }

    #[test]
    fn compound_assignment() {
        assert_eq!(set("x", "1", None), "x = 1;");
        assert_eq!(set("x", "1", Some("+")), "x += 1;");
        assert_eq!(set("x", "1", Some("*=")), "x *= 1;");
    }

    #[test]
    fn operands_are_parenthesized_when_needed() {
        assert_eq!(binary("+", "a", "b * c"), "a + (b * c)");
        assert_eq!(binary("-", "a", "-1"), "a - (-1)");
        assert_eq!(unary("!", "done"), "!done");
        assert_eq!(unary("!", "a && b"), "!(a && b)");
    }

    #[test]
    fn tabs_skip_blank_lines() {
        assert_eq!(add_tabs("a\n\nb", 1), "\ta\n\n\tb");
        assert_eq!(add_tabs("", 2), "");
    }

    #[test]
    fn invoke_with_generics() {
        assert_eq!(
            invoke(Some("list"), "Get", &["int".into()], &["0".into()]),
            "list.Get<int>(0)"
        );
        assert_eq!(invoke(None, "Run", &[], &[]), "Run()");
    }
}
