//! Conditional expressions attached to `--#if` directives.
//!
//! The grammar is deliberately small: comparisons of the form
//! `:name <op> literal` joined by `&&` and `||`, with `&&` binding tighter.
//! Literals are numbers, single-quoted strings, bare words, or the
//! sentinels `null` and `blank`. Missing keys never raise: null and blank
//! checks treat them as null, every other comparison evaluates to false.

use std::cmp::Ordering;

use crate::args::ArgBag;
use crate::error::RenderError;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CmpOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ref(String),
    Op(CmpOp),
    And,
    Or,
    Num { num: f64, raw: String },
    Str(String),
    Word(String),
}

#[derive(Debug, Clone, PartialEq)]
enum Literal {
    Number { num: f64, raw: String },
    Str(String),
    Null,
    Blank,
}

#[derive(Debug, Clone, PartialEq)]
struct Comparison {
    key: String,
    op: CmpOp,
    literal: Literal,
}

/// Evaluates `expr` against `args`.
pub fn evaluate(expr: &str, args: &ArgBag) -> Result<bool, RenderError> {
    if expr.trim().is_empty() {
        return Err(expr_err(expr, "empty expression"));
    }
    let tokens = tokenize(expr).map_err(|reason| expr_err(expr, reason))?;
    let groups = parse(&tokens).map_err(|reason| expr_err(expr, reason))?;

    let mut result = false;
    for group in &groups {
        let mut all = true;
        for comparison in group {
            let holds = compare(comparison, args).map_err(|reason| expr_err(expr, reason))?;
            all = all && holds;
        }
        result = result || all;
    }
    Ok(result)
}

fn expr_err(expr: &str, reason: impl Into<String>) -> RenderError {
    RenderError::Expression {
        expr: expr.trim().to_string(),
        reason: reason.into(),
    }
}

fn is_name_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '.'
}

fn tokenize(expr: &str) -> Result<Vec<Token>, String> {
    let chars: Vec<char> = expr.chars().collect();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < chars.len() {
        let c = chars[pos];
        match c {
            c if c.is_whitespace() => pos += 1,
            ':' => {
                pos += 1;
                let name = scan_name(&chars, &mut pos);
                if name.is_empty() {
                    return Err("expected a name after `:`".to_string());
                }
                tokens.push(Token::Ref(name));
            }
            '&' => {
                if chars.get(pos + 1) == Some(&'&') {
                    tokens.push(Token::And);
                    pos += 2;
                } else {
                    return Err("expected `&&`".to_string());
                }
            }
            '|' => {
                if chars.get(pos + 1) == Some(&'|') {
                    tokens.push(Token::Or);
                    pos += 2;
                } else {
                    return Err("expected `||`".to_string());
                }
            }
            '=' => {
                if chars.get(pos + 1) == Some(&'=') {
                    tokens.push(Token::Op(CmpOp::Eq));
                    pos += 2;
                } else {
                    return Err("expected `==`".to_string());
                }
            }
            '!' => {
                if chars.get(pos + 1) == Some(&'=') {
                    tokens.push(Token::Op(CmpOp::Ne));
                    pos += 2;
                } else {
                    return Err("expected `!=`".to_string());
                }
            }
            '<' => match chars.get(pos + 1) {
                Some('>') => {
                    tokens.push(Token::Op(CmpOp::Ne));
                    pos += 2;
                }
                Some('=') => {
                    tokens.push(Token::Op(CmpOp::Le));
                    pos += 2;
                }
                _ => {
                    tokens.push(Token::Op(CmpOp::Lt));
                    pos += 1;
                }
            },
            '>' => {
                if chars.get(pos + 1) == Some(&'=') {
                    tokens.push(Token::Op(CmpOp::Ge));
                    pos += 2;
                } else {
                    tokens.push(Token::Op(CmpOp::Gt));
                    pos += 1;
                }
            }
            '\'' => {
                pos += 1;
                let mut text = String::new();
                loop {
                    match chars.get(pos) {
                        Some('\'') => {
                            pos += 1;
                            break;
                        }
                        Some(c) => {
                            text.push(*c);
                            pos += 1;
                        }
                        None => return Err("unterminated string literal".to_string()),
                    }
                }
                tokens.push(Token::Str(text));
            }
            c if c.is_ascii_digit() || (c == '-' && chars.get(pos + 1).is_some_and(char::is_ascii_digit)) => {
                let start = pos;
                pos += 1;
                while chars
                    .get(pos)
                    .is_some_and(|c| c.is_ascii_digit() || *c == '.')
                {
                    pos += 1;
                }
                let raw: String = chars[start..pos].iter().collect();
                let num = raw
                    .parse::<f64>()
                    .map_err(|_| format!("invalid number literal `{raw}`"))?;
                tokens.push(Token::Num { num, raw });
            }
            c if is_name_start(c) => {
                let word = scan_name(&chars, &mut pos);
                tokens.push(Token::Word(word));
            }
            c => return Err(format!("unexpected character `{c}`")),
        }
    }
    Ok(tokens)
}

fn scan_name(chars: &[char], pos: &mut usize) -> String {
    let start = *pos;
    if chars.get(*pos).copied().is_some_and(is_name_start) {
        *pos += 1;
        while chars.get(*pos).copied().is_some_and(is_name_char) {
            *pos += 1;
        }
    }
    chars[start..*pos].iter().collect()
}

/// Groups comparisons by precedence: outer vec is the `||` chain, each
/// inner vec one `&&` chain.
fn parse(tokens: &[Token]) -> Result<Vec<Vec<Comparison>>, String> {
    let mut groups = Vec::new();
    let mut current = Vec::new();
    let mut pos = 0;

    loop {
        let Some(Token::Ref(key)) = tokens.get(pos) else {
            return Err(match tokens.get(pos) {
                None if !current.is_empty() || !groups.is_empty() => {
                    "expression ends after a connective".to_string()
                }
                _ => "expected a `:name` reference".to_string(),
            });
        };
        pos += 1;
        let Some(Token::Op(op)) = tokens.get(pos) else {
            return Err(format!("expected a comparison operator after `:{key}`"));
        };
        pos += 1;
        let literal = match tokens.get(pos) {
            Some(Token::Num { num, raw }) => Literal::Number {
                num: *num,
                raw: raw.clone(),
            },
            Some(Token::Str(s)) => Literal::Str(s.clone()),
            Some(Token::Word(w)) if w == "null" => Literal::Null,
            Some(Token::Word(w)) if w == "blank" => Literal::Blank,
            Some(Token::Word(w)) => Literal::Str(w.clone()),
            Some(_) => return Err("expected a literal on the right-hand side".to_string()),
            None => return Err("expression ends before its right-hand side".to_string()),
        };
        pos += 1;
        current.push(Comparison {
            key: key.clone(),
            op: *op,
            literal,
        });

        match tokens.get(pos) {
            None => break,
            Some(Token::And) => pos += 1,
            Some(Token::Or) => {
                pos += 1;
                groups.push(std::mem::take(&mut current));
            }
            Some(_) => return Err("expected `&&` or `||` between comparisons".to_string()),
        }
    }
    groups.push(current);
    Ok(groups)
}

fn compare(comparison: &Comparison, args: &ArgBag) -> Result<bool, String> {
    let value = args.get(&comparison.key);
    match &comparison.literal {
        Literal::Null => {
            let null_like = value.map_or(true, Value::is_null_like);
            bool_op(comparison.op, null_like)
        }
        Literal::Blank => {
            let blank = value.map_or(true, Value::is_blank);
            bool_op(comparison.op, blank)
        }
        Literal::Number { num, raw } => {
            let Some(value) = value else { return Ok(false) };
            if value.is_null_like() {
                return Ok(false);
            }
            match value.numeric_form() {
                Some(n) => Ok(n
                    .partial_cmp(num)
                    .is_some_and(|ordering| holds(comparison.op, ordering))),
                None => Ok(value
                    .text_form()
                    .is_some_and(|s| holds(comparison.op, s.as_str().cmp(raw.as_str())))),
            }
        }
        Literal::Str(expected) => {
            let Some(value) = value else { return Ok(false) };
            if value.is_null_like() {
                return Ok(false);
            }
            Ok(value
                .text_form()
                .is_some_and(|s| holds(comparison.op, s.as_str().cmp(expected.as_str()))))
        }
    }
}

fn bool_op(op: CmpOp, truth: bool) -> Result<bool, String> {
    match op {
        CmpOp::Eq => Ok(truth),
        CmpOp::Ne => Ok(!truth),
        _ => Err("`null` and `blank` only support `==`, `!=` and `<>`".to_string()),
    }
}

const fn holds(op: CmpOp, ordering: Ordering) -> bool {
    match op {
        CmpOp::Eq => matches!(ordering, Ordering::Equal),
        CmpOp::Ne => !matches!(ordering, Ordering::Equal),
        CmpOp::Gt => matches!(ordering, Ordering::Greater),
        CmpOp::Ge => matches!(ordering, Ordering::Greater | Ordering::Equal),
        CmpOp::Lt => matches!(ordering, Ordering::Less),
        CmpOp::Le => matches!(ordering, Ordering::Less | Ordering::Equal),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bag() -> ArgBag {
        ArgBag::new().with("age", 45).with("name", "bob")
    }

    #[test]
    fn test_and_chain_with_blank_guard() {
        assert!(evaluate(":age <> blank && :age < 90", &bag()).unwrap());
        assert!(!evaluate(":age <> blank && :age < 90", &ArgBag::new()).unwrap());
    }

    #[test]
    fn test_missing_keys_never_raise() {
        assert!(evaluate(":ghost == null", &bag()).unwrap());
        assert!(evaluate(":ghost == blank", &bag()).unwrap());
        assert!(!evaluate(":ghost != null", &bag()).unwrap());
        assert!(!evaluate(":ghost > 3", &bag()).unwrap());
        assert!(!evaluate(":ghost == 'x'", &bag()).unwrap());
    }

    #[test]
    fn test_and_binds_tighter_than_or() {
        // a == 1 || (b == 2 && c == 3)
        let expr = ":a == 1 || :b == 2 && :c == 3";
        assert!(evaluate(expr, &ArgBag::new().with("a", 1)).unwrap());
        assert!(evaluate(expr, &ArgBag::new().with("b", 2).with("c", 3)).unwrap());
        assert!(!evaluate(expr, &ArgBag::new().with("b", 2)).unwrap());
        assert!(!evaluate(expr, &ArgBag::new()).unwrap());
    }

    #[test]
    fn test_string_and_bareword_literals() {
        assert!(evaluate(":name == 'bob'", &bag()).unwrap());
        assert!(evaluate(":name == bob", &bag()).unwrap());
        assert!(!evaluate(":name != 'bob'", &bag()).unwrap());
        assert!(evaluate(":name < 'carl'", &bag()).unwrap());
    }

    #[test]
    fn test_numeric_coercion_from_text() {
        let args = ArgBag::new().with("age", "45");
        assert!(evaluate(":age < 90", &args).unwrap());
        assert!(evaluate(":age == 45.0", &args).unwrap());
    }

    #[test]
    fn test_null_value_comparisons_are_false() {
        let args = ArgBag::new().with("age", Value::Null);
        assert!(evaluate(":age == null", &args).unwrap());
        assert!(!evaluate(":age == 45", &args).unwrap());
        assert!(!evaluate(":age < 90", &args).unwrap());
    }

    #[test]
    fn test_blankness_of_values() {
        assert!(evaluate(":s == blank", &ArgBag::new().with("s", "")).unwrap());
        assert!(evaluate(":ids == blank", &ArgBag::new().with("ids", Value::List(Vec::new()))).unwrap());
        assert!(!evaluate(":n == blank", &ArgBag::new().with("n", 0)).unwrap());
    }

    #[test]
    fn test_malformed_expressions() {
        let args = ArgBag::new();
        assert!(evaluate("", &args).is_err());
        assert!(evaluate("age == 1", &args).is_err());
        assert!(evaluate(":age 1", &args).is_err());
        assert!(evaluate(":age ==", &args).is_err());
        assert!(evaluate(":age == 1 &&", &args).is_err());
        assert!(evaluate(":age == 'open", &args).is_err());
        assert!(evaluate(":age = 1", &args).is_err());
        assert!(evaluate(":a == :b", &args).is_err());
    }

    #[test]
    fn test_ordered_ops_reject_sentinels() {
        let args = ArgBag::new().with("age", 45);
        assert!(evaluate(":age > null", &args).is_err());
        assert!(evaluate(":age <= blank", &args).is_err());
    }

    #[test]
    fn test_ignore_counts_as_null() {
        let args = ArgBag::new().with("age", Value::Ignore);
        assert!(evaluate(":age == null", &args).unwrap());
        assert!(!evaluate(":age == 45", &args).unwrap());
    }
}
