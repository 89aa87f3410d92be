//! Intermediate representation for a regex

use crate::charclasses::CharClass;
use crate::codepointset::CodePoint;
use crate::types::{GroupIndex, GroupName};
use crate::util::to_char_sat;
use core::fmt;

/// A character matcher, as it appears in the AST.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Char {
    /// `.`; whether it matches line terminators depends on dot_all.
    Any,

    /// A single code point.
    Single(CodePoint),

    /// A shorthand class like \d or \W.
    Class { class: CharClass, negate: bool },

    /// A Unicode property escape like \p{Letter}.
    /// These are parsed but never match.
    Property {
        name: String,
        value: String,
        negate: bool,
    },

    /// An inclusive range of code points.
    Range(CodePoint, CodePoint),

    /// Any of the given chars, or none of them if negated.
    Union { negate: bool, chars: Vec<Char> },

    /// All of the given chars, or not all of them if negated.
    Intersection { negate: bool, chars: Vec<Char> },
}

/// The node types of our IR.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// `^`
    StartOfInput,

    /// `$`
    EndOfInput,

    /// `\<`
    StartOfWord,

    /// `\>`
    EndOfWord,

    /// Match the catenation of multiple nodes. The empty Cat matches the empty
    /// string.
    Cat(Vec<Regex>),

    /// Match any of several alternatives, earlier ones preferred.
    Union(Vec<Regex>),

    /// Repeat \p expr between \p min and \p max times; None means unbounded.
    Quant {
        expr: Box<Regex>,
        min: u32,
        max: Option<u32>,
        greedy: bool,
    },

    /// Match \p expr, then assert that \p cond matches (or not) after it.
    LookAhead {
        expr: Box<Regex>,
        cond: Box<Regex>,
        negate: bool,
    },

    /// Match \p expr, asserting that \p cond matches (or not) just before it.
    LookBack {
        expr: Box<Regex>,
        cond: Box<Regex>,
        negate: bool,
    },

    Char(Char),

    /// A named reference, resolved when compiling.
    Var(String),

    /// A back-reference like \1. Not compiled.
    BackNumRef(u32),

    /// A back-reference like \k<name>. Not compiled.
    BackNamedRef(String),
}

/// A regex AST node, plus its capture group and mode flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Regex {
    pub node: Node,

    /// The capture group this node forms, if any.
    pub group_index: Option<GroupIndex>,

    pub group_name: Option<GroupName>,

    /// Mode flags. None means inherited from the enclosing node.
    pub dot_all: Option<bool>,
    pub ignore_case: Option<bool>,
    pub multiline: Option<bool>,
}

impl From<Node> for Regex {
    fn from(node: Node) -> Regex {
        Regex::new(node)
    }
}

impl Regex {
    pub fn new(node: Node) -> Regex {
        Regex {
            node,
            group_index: None,
            group_name: None,
            dot_all: None,
            ignore_case: None,
            multiline: None,
        }
    }

    /// The regex that matches the empty string.
    pub fn empty() -> Regex {
        Regex::new(Node::Cat(Vec::new()))
    }

    pub fn char(c: char) -> Regex {
        Regex::new(Node::Char(Char::Single(c as u32)))
    }

    pub fn char_matcher(c: Char) -> Regex {
        Regex::new(Node::Char(c))
    }

    /// A catenation of the chars of \p s.
    pub fn literal(s: &str) -> Regex {
        Regex::cat(s.chars().map(Regex::char).collect())
    }

    pub fn var(name: &str) -> Regex {
        Regex::new(Node::Var(name.to_string()))
    }

    /// \return whether this node carries no group and no flags, so it can be
    /// merged into its parent.
    pub fn is_plain(&self) -> bool {
        self.group_index.is_none() && self.group_name.is_none() && !self.has_flags()
    }

    pub fn has_flags(&self) -> bool {
        self.dot_all.is_some() || self.ignore_case.is_some() || self.multiline.is_some()
    }

    /// Catenate \p children, flattening plain Cats.
    /// A single child is returned as-is.
    pub fn cat(children: Vec<Regex>) -> Regex {
        let mut flat = Vec::with_capacity(children.len());
        for child in children {
            if child.is_plain() && matches!(child.node, Node::Cat(_)) {
                if let Node::Cat(grandchildren) = child.node {
                    flat.extend(grandchildren);
                }
            } else {
                flat.push(child);
            }
        }
        if flat.len() == 1 {
            return flat.pop().unwrap_or_else(Regex::empty);
        }
        Regex::new(Node::Cat(flat))
    }

    /// Alternate \p options, flattening plain Unions.
    /// A single option is returned as-is.
    pub fn union(options: Vec<Regex>) -> Regex {
        let mut flat = Vec::with_capacity(options.len());
        for option in options {
            if option.is_plain() && matches!(option.node, Node::Union(_)) {
                if let Node::Union(nested) = option.node {
                    flat.extend(nested);
                }
            } else {
                flat.push(option);
            }
        }
        if flat.len() == 1 {
            return flat.pop().unwrap_or_else(Regex::empty);
        }
        Regex::new(Node::Union(flat))
    }

    pub fn quant(expr: Regex, min: u32, max: Option<u32>, greedy: bool) -> Regex {
        Regex::new(Node::Quant {
            expr: Box::new(expr),
            min,
            max,
            greedy,
        })
    }

    pub fn look_ahead(expr: Regex, cond: Regex, negate: bool) -> Regex {
        Regex::new(Node::LookAhead {
            expr: Box::new(expr),
            cond: Box::new(cond),
            negate,
        })
    }

    pub fn look_back(expr: Regex, cond: Regex, negate: bool) -> Regex {
        Regex::new(Node::LookBack {
            expr: Box::new(expr),
            cond: Box::new(cond),
            negate,
        })
    }

    /// \return self as capture group \p gi. If self already forms a group or
    /// carries flags, it is wrapped first so neither is lost.
    pub fn into_group(self, gi: GroupIndex, name: Option<GroupName>) -> Regex {
        let mut res = if self.is_plain() {
            self
        } else {
            Regex::new(Node::Cat(vec![self]))
        };
        res.group_index = Some(gi);
        res.group_name = name;
        res
    }

    /// \return a copy of self that matches the reversed language, for running
    /// a tape backward.
    pub fn reverse(&self) -> Regex {
        let node = match &self.node {
            Node::Cat(children) => Node::Cat(children.iter().rev().map(Regex::reverse).collect()),
            Node::Union(options) => Node::Union(options.iter().rev().map(Regex::reverse).collect()),
            Node::Quant {
                expr,
                min,
                max,
                greedy,
            } => Node::Quant {
                expr: Box::new(expr.reverse()),
                min: *min,
                max: *max,
                greedy: *greedy,
            },
            Node::LookAhead { expr, cond, negate } => Node::LookBack {
                expr: Box::new(expr.reverse()),
                cond: Box::new(cond.reverse()),
                negate: *negate,
            },
            Node::LookBack { expr, cond, negate } => Node::LookAhead {
                expr: Box::new(expr.reverse()),
                cond: Box::new(cond.reverse()),
                negate: *negate,
            },
            other => other.clone(),
        };
        Regex {
            node,
            group_index: self.group_index,
            group_name: self.group_name.clone(),
            dot_all: self.dot_all,
            ignore_case: self.ignore_case,
            multiline: self.multiline,
        }
    }

    /// Invoke \p func on this node and every descendant, in preorder.
    pub fn walk<F: FnMut(&Regex)>(&self, func: &mut F) {
        func(self);
        match &self.node {
            Node::Cat(children) | Node::Union(children) => {
                for child in children {
                    child.walk(func);
                }
            }
            Node::Quant { expr, .. } => expr.walk(func),
            Node::LookAhead { expr, cond, .. } => {
                expr.walk(func);
                cond.walk(func);
            }
            Node::LookBack { expr, cond, .. } => {
                cond.walk(func);
                expr.walk(func);
            }
            _ => {}
        }
    }

    /// \return the number of capture groups: one more than the largest group
    /// index.
    pub fn group_count(&self) -> u32 {
        let mut count = 0;
        self.walk(&mut |r| {
            if let Some(gi) = r.group_index {
                count = count.max(gi + 1);
            }
        });
        count
    }

    /// \return the (index, name) pairs of named groups.
    pub fn group_names(&self) -> Vec<(GroupIndex, GroupName)> {
        let mut names = Vec::new();
        self.walk(&mut |r| {
            if let (Some(gi), Some(name)) = (r.group_index, &r.group_name) {
                names.push((gi, name.clone()));
            }
        });
        names.sort();
        names
    }
}

// Characters escaped when written outside of a bracket.
const SYNTAX_CHARS: &str = "\\^$.|?*+()[]{}/\"";

// Characters escaped when written inside a bracket.
const CLASS_SYNTAX_CHARS: &str = "\\]^-[";

fn write_code_point(cp: CodePoint, specials: &str, f: &mut fmt::Formatter) -> fmt::Result {
    let c = match char::from_u32(cp) {
        Some(c) => c,
        None => return write!(f, "\\u{:04X}", cp),
    };
    match c {
        '\n' => f.write_str("\\n"),
        '\r' => f.write_str("\\r"),
        '\t' => f.write_str("\\t"),
        '\u{0B}' => f.write_str("\\v"),
        '\u{0C}' => f.write_str("\\f"),
        c if (c as u32) < 0x20 || c == '\u{7F}' => write!(f, "\\x{:02X}", c as u32),
        c if specials.contains(c) => write!(f, "\\{}", c),
        c => write!(f, "{}", c),
    }
}

fn write_class_item(c: &Char, f: &mut fmt::Formatter) -> fmt::Result {
    match c {
        Char::Single(cp) => write_code_point(*cp, CLASS_SYNTAX_CHARS, f),
        Char::Range(lo, hi) => {
            write_code_point(*lo, CLASS_SYNTAX_CHARS, f)?;
            f.write_str("-")?;
            write_code_point(*hi, CLASS_SYNTAX_CHARS, f)
        }
        // Everything.
        Char::Any => f.write_str("\\s\\S"),
        Char::Union {
            negate: false,
            chars,
        } => chars.iter().try_for_each(|c| write_class_item(c, f)),
        Char::Class { .. } | Char::Property { .. } => write_char(c, f),
        Char::Union { negate: true, .. } | Char::Intersection { .. } => write_char(c, f),
    }
}

fn write_char(c: &Char, f: &mut fmt::Formatter) -> fmt::Result {
    match c {
        Char::Any => f.write_str("."),
        Char::Single(cp) => write_code_point(*cp, SYNTAX_CHARS, f),
        Char::Class { class, negate } => write!(f, "\\{}", class.escape_letter(*negate)),
        Char::Property {
            name,
            value,
            negate,
        } => write!(f, "\\{}{{{}={}}}", if *negate { 'P' } else { 'p' }, name, value),
        Char::Range(..) => {
            f.write_str("[")?;
            write_class_item(c, f)?;
            f.write_str("]")
        }
        Char::Union { negate, chars } => {
            f.write_str(if *negate { "[^" } else { "[" })?;
            for item in chars {
                write_class_item(item, f)?;
            }
            f.write_str("]")
        }
        Char::Intersection { negate, chars } => {
            f.write_str(if *negate { "[^" } else { "[" })?;
            for (idx, item) in chars.iter().enumerate() {
                if idx > 0 {
                    f.write_str("&&")?;
                }
                write_char(item, f)?;
            }
            f.write_str("]")
        }
    }
}

/// \return whether \p r must be parenthesized before a quantifier applies.
fn needs_wrap_for_quant(r: &Regex) -> bool {
    if r.group_index.is_some() || r.has_flags() {
        return false;
    }
    match &r.node {
        Node::Char(_) | Node::Var(_) | Node::BackNumRef(_) | Node::BackNamedRef(_) => false,
        Node::Cat(children) if children.len() == 1 => needs_wrap_for_quant(&children[0]),
        _ => true,
    }
}

/// \return whether \p r must be parenthesized within a sequence.
fn needs_wrap_in_seq(r: &Regex) -> bool {
    let wrapped = r.group_index.is_some() || r.has_flags();
    !wrapped && matches!(r.node, Node::Union(_))
}

fn write_seq_item(r: &Regex, f: &mut fmt::Formatter) -> fmt::Result {
    if needs_wrap_in_seq(r) {
        write!(f, "(?:{})", r)
    } else {
        write!(f, "{}", r)
    }
}

fn write_flags(r: &Regex, f: &mut fmt::Formatter) -> fmt::Result {
    let flags = [('i', r.ignore_case), ('s', r.dot_all), ('m', r.multiline)];
    let on: String = flags
        .iter()
        .filter(|(_, v)| *v == Some(true))
        .map(|(c, _)| *c)
        .collect();
    let off: String = flags
        .iter()
        .filter(|(_, v)| *v == Some(false))
        .map(|(c, _)| *c)
        .collect();
    f.write_str("(?")?;
    f.write_str(&on)?;
    if !off.is_empty() {
        write!(f, "-{}", off)?;
    }
    f.write_str(":")
}

fn write_quantifier(min: u32, max: Option<u32>, greedy: bool, f: &mut fmt::Formatter) -> fmt::Result {
    match (min, max) {
        (0, None) => f.write_str("*")?,
        (1, None) => f.write_str("+")?,
        (0, Some(1)) => f.write_str("?")?,
        (m, None) => write!(f, "{{{},}}", m)?,
        (m, Some(n)) if m == n => write!(f, "{{{}}}", m)?,
        (m, Some(n)) => write!(f, "{{{},{}}}", m, n)?,
    }
    if !greedy {
        f.write_str("?")?;
    }
    Ok(())
}

fn write_node(node: &Node, f: &mut fmt::Formatter) -> fmt::Result {
    match node {
        Node::StartOfInput => f.write_str("^"),
        Node::EndOfInput => f.write_str("$"),
        Node::StartOfWord => f.write_str("\\<"),
        Node::EndOfWord => f.write_str("\\>"),
        Node::Cat(children) => {
            for (idx, child) in children.iter().enumerate() {
                // \1 followed by a digit would read back as \12.
                let digit_follows = matches!(
                    children.get(idx + 1).map(|r| &r.node),
                    Some(Node::Char(Char::Single(cp))) if to_char_sat(*cp).is_ascii_digit()
                );
                if digit_follows && matches!(child.node, Node::BackNumRef(_)) && child.is_plain() {
                    write!(f, "(?:{})", child)?;
                } else {
                    write_seq_item(child, f)?;
                }
            }
            Ok(())
        }
        Node::Union(options) => {
            for (idx, option) in options.iter().enumerate() {
                if idx > 0 {
                    f.write_str("|")?;
                }
                write_seq_item(option, f)?;
            }
            Ok(())
        }
        Node::Quant {
            expr,
            min,
            max,
            greedy,
        } => {
            if needs_wrap_for_quant(expr) {
                write!(f, "(?:{})", expr)?;
            } else {
                write!(f, "{}", expr)?;
            }
            write_quantifier(*min, *max, *greedy, f)
        }
        Node::LookAhead { expr, cond, negate } => {
            write_seq_item(expr, f)?;
            write!(f, "(?{}{})", if *negate { '!' } else { '=' }, cond)
        }
        Node::LookBack { expr, cond, negate } => {
            write!(f, "(?<{}{})", if *negate { '!' } else { '=' }, cond)?;
            write_seq_item(expr, f)
        }
        Node::Char(c) => write_char(c, f),
        Node::Var(name) => write!(f, "{{{}}}", name),
        Node::BackNumRef(n) => write!(f, "\\{}", n),
        Node::BackNamedRef(name) => write!(f, "\\k<{}>", name),
    }
}

/// Writes the regex back out as a pattern.
impl fmt::Display for Regex {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut closers = 0;
        if self.has_flags() {
            write_flags(self, f)?;
            closers += 1;
        }
        if self.group_index.is_some() {
            match &self.group_name {
                Some(name) => write!(f, "(?<{}>", name)?,
                None => f.write_str("(")?,
            }
            closers += 1;
        }
        write_node(&self.node, f)?;
        for _ in 0..closers {
            f.write_str(")")?;
        }
        Ok(())
    }
}
