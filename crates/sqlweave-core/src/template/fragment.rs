//! Parsed template nodes.

/// One node of a parsed template.
///
/// Trees are immutable after parsing; rendering walks them without
/// modification, so a parsed template can be shared freely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    /// Verbatim SQL text.
    Text(String),
    /// Named placeholder with an optional pipe chain, applied left to right.
    Placeholder { name: String, pipes: Vec<String> },
    /// Conditional block. `when` holds the raw expression, evaluated at
    /// render time against the argument bag.
    Branch {
        when: String,
        then: Vec<Fragment>,
        otherwise: Vec<Fragment>,
    },
}
