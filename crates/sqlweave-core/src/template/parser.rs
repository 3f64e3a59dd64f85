//! Template source to fragment tree.
//!
//! Parsing is line-oriented. A line whose trimmed form starts with `--#` is
//! a directive (`--#if <expr>`, `--#else`, `--#fi`); every other line is
//! scanned for `:name` placeholders with optional `|pipe` chains. The
//! scanner leaves single-quoted strings, `--` comment tails and `::` casts
//! alone, so ordinary SQL passes through untouched.

use crate::error::ParseError;
use crate::template::fragment::Fragment;

/// Default cap on `--#if` nesting.
pub const DEFAULT_MAX_DEPTH: usize = 16;

/// Limits applied while parsing.
#[derive(Debug, Clone, Copy)]
pub struct ParseOptions {
    /// Maximum `--#if` nesting depth before parsing fails.
    pub max_depth: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

struct Frame {
    when: String,
    line: usize,
    then: Vec<Fragment>,
    otherwise: Vec<Fragment>,
    in_else: bool,
}

pub(crate) fn parse(source: &str, options: &ParseOptions) -> Result<Vec<Fragment>, ParseError> {
    let lines: Vec<&str> = source.split('\n').collect();
    let mut root: Vec<Fragment> = Vec::new();
    let mut stack: Vec<Frame> = Vec::new();

    for (index, raw_line) in lines.iter().enumerate() {
        let line_no = index + 1;
        let trimmed = raw_line.trim();
        if let Some(rest) = trimmed.strip_prefix("--#") {
            directive(rest, line_no, options, &mut stack, &mut root)?;
        } else {
            let newline = index + 1 < lines.len();
            scan_line(raw_line, newline, line_no, target(&mut stack, &mut root))?;
        }
    }

    if let Some(frame) = stack.last() {
        return Err(ParseError::new(
            format!("`--#if` at line {} is never closed", frame.line),
            frame.line,
        ));
    }
    Ok(root)
}

/// The fragment list new nodes should land in given the open frames.
fn target<'a>(stack: &'a mut [Frame], root: &'a mut Vec<Fragment>) -> &'a mut Vec<Fragment> {
    match stack.last_mut() {
        Some(frame) if frame.in_else => &mut frame.otherwise,
        Some(frame) => &mut frame.then,
        None => root,
    }
}

fn directive(
    rest: &str,
    line_no: usize,
    options: &ParseOptions,
    stack: &mut Vec<Frame>,
    root: &mut Vec<Fragment>,
) -> Result<(), ParseError> {
    let rest = rest.trim();
    let (keyword, tail) = match rest.find(char::is_whitespace) {
        Some(split) => (&rest[..split], rest[split..].trim()),
        None => (rest, ""),
    };
    match keyword {
        "if" => {
            if tail.is_empty() {
                return Err(ParseError::new("`--#if` requires an expression", line_no));
            }
            if stack.len() >= options.max_depth {
                return Err(ParseError::new(
                    format!(
                        "conditional nesting exceeds the maximum depth of {}",
                        options.max_depth
                    ),
                    line_no,
                ));
            }
            stack.push(Frame {
                when: tail.to_string(),
                line: line_no,
                then: Vec::new(),
                otherwise: Vec::new(),
                in_else: false,
            });
        }
        "else" => {
            if !tail.is_empty() {
                return Err(ParseError::new("unexpected text after `--#else`", line_no));
            }
            let Some(frame) = stack.last_mut() else {
                return Err(ParseError::new("`--#else` without an open `--#if`", line_no));
            };
            if frame.in_else {
                return Err(ParseError::new(
                    "duplicate `--#else` in one conditional",
                    line_no,
                ));
            }
            frame.in_else = true;
        }
        "fi" => {
            if !tail.is_empty() {
                return Err(ParseError::new("unexpected text after `--#fi`", line_no));
            }
            let Some(frame) = stack.pop() else {
                return Err(ParseError::new("`--#fi` without an open `--#if`", line_no));
            };
            target(stack, root).push(Fragment::Branch {
                when: frame.when,
                then: frame.then,
                otherwise: frame.otherwise,
            });
        }
        other => {
            return Err(ParseError::new(
                format!("unknown directive `--#{other}`"),
                line_no,
            ));
        }
    }
    Ok(())
}

fn scan_line(
    line: &str,
    newline: bool,
    line_no: usize,
    out: &mut Vec<Fragment>,
) -> Result<(), ParseError> {
    let chars: Vec<char> = line.chars().collect();
    let mut text = String::new();
    let mut pos = 0;

    while pos < chars.len() {
        let c = chars[pos];
        match c {
            '\'' => {
                text.push(c);
                pos += 1;
                while pos < chars.len() {
                    text.push(chars[pos]);
                    pos += 1;
                    if chars[pos - 1] == '\'' {
                        break;
                    }
                }
            }
            '-' if chars.get(pos + 1) == Some(&'-') => {
                if chars.get(pos + 2) == Some(&'#') {
                    return Err(ParseError::new(
                        "directive `--#` must start its own line",
                        line_no,
                    ));
                }
                while pos < chars.len() {
                    text.push(chars[pos]);
                    pos += 1;
                }
            }
            ':' if chars.get(pos + 1) == Some(&':') => {
                text.push_str("::");
                pos += 2;
            }
            ':' if chars.get(pos + 1).copied().is_some_and(is_name_start) => {
                pos += 1;
                let name = scan_name(&chars, &mut pos);
                let mut pipes = Vec::new();
                while chars.get(pos) == Some(&'|') && chars.get(pos + 1) != Some(&'|') {
                    pos += 1;
                    if !chars.get(pos).copied().is_some_and(is_name_start) {
                        return Err(ParseError::new(
                            format!("placeholder `{name}` has an unterminated pipe"),
                            line_no,
                        ));
                    }
                    pipes.push(scan_name(&chars, &mut pos));
                }
                flush(&mut text, out);
                out.push(Fragment::Placeholder { name, pipes });
            }
            _ => {
                text.push(c);
                pos += 1;
            }
        }
    }

    if newline {
        text.push('\n');
    }
    flush(&mut text, out);
    Ok(())
}

fn flush(text: &mut String, out: &mut Vec<Fragment>) {
    if !text.is_empty() {
        out.push(Fragment::Text(std::mem::take(text)));
    }
}

fn is_name_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '.'
}

fn scan_name(chars: &[char], pos: &mut usize) -> String {
    let start = *pos;
    *pos += 1;
    while chars.get(*pos).copied().is_some_and(is_name_char) {
        *pos += 1;
    }
    chars[start..*pos].iter().collect()
}
