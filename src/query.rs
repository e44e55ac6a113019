//! Selector engine for captured documents.
//!
//! Covers the grammar the locator generator produces: a type selector or `*`,
//! `#id`, `.class`, `[attr]`, `[attr="value"]`, `:nth-child(n)`, joined by child
//! (`>`) or descendant (whitespace) combinators. CSS escapes are honoured.
//! Anything else is rejected with [`Error::InvalidSelector`].

use crate::dom::{Document, NodeId};
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Child,
    Descendant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AttrTest {
    name: String,
    value: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    ids: Vec<String>,
    classes: Vec<String>,
    attrs: Vec<AttrTest>,
    nth_child: Option<usize>,
}

/// A parsed complex selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    compounds: Vec<Compound>,
    // combinators[i] joins compounds[i] and compounds[i + 1]
    combinators: Vec<Combinator>,
}

impl Selector {
    pub fn parse(input: &str) -> Result<Self> {
        Parser::new(input).selector()
    }

    /// Whether `node` matches.
    pub fn matches<D: Document + ?Sized>(&self, doc: &D, node: NodeId) -> bool {
        let last = self.compounds.len() - 1;
        self.compounds[last].matches(doc, node) && self.matches_left(doc, node, last)
    }

    // `node` already matched compounds[i]; check everything to its left.
    fn matches_left<D: Document + ?Sized>(&self, doc: &D, node: NodeId, i: usize) -> bool {
        if i == 0 {
            return true;
        }
        let want = &self.compounds[i - 1];
        match self.combinators[i - 1] {
            Combinator::Child => doc
                .parent(node)
                .is_some_and(|p| want.matches(doc, p) && self.matches_left(doc, p, i - 1)),
            Combinator::Descendant => {
                let mut ancestor = doc.parent(node);
                while let Some(a) = ancestor {
                    if want.matches(doc, a) && self.matches_left(doc, a, i - 1) {
                        return true;
                    }
                    ancestor = doc.parent(a);
                }
                false
            }
        }
    }
}

impl Compound {
    fn matches<D: Document + ?Sized>(&self, doc: &D, node: NodeId) -> bool {
        if let Some(ref tag) = self.tag {
            if !doc.tag_name(node).eq_ignore_ascii_case(tag) {
                return false;
            }
        }
        if !self.ids.iter().all(|id| doc.attribute(node, "id") == Some(id.as_str())) {
            return false;
        }
        if !self.classes.is_empty() {
            let class_attr = doc.attribute(node, "class").unwrap_or("");
            let has = |c: &String| class_attr.split_ascii_whitespace().any(|t| t == c);
            if !self.classes.iter().all(has) {
                return false;
            }
        }
        for test in &self.attrs {
            let actual = doc.attribute(node, &test.name);
            let ok = match test.value {
                None => actual.is_some(),
                Some(ref want) => actual == Some(want.as_str()),
            };
            if !ok {
                return false;
            }
        }
        if let Some(n) = self.nth_child {
            let position = doc
                .parent(node)
                .and_then(|p| doc.children(p).iter().position(|&c| c == node));
            if position.map(|i| i + 1) != Some(n) {
                return false;
            }
        }
        true
    }
}

/// Every element under (and including) the body that matches, in document order.
pub fn select_all<D: Document + ?Sized>(doc: &D, selector: &Selector) -> Vec<NodeId> {
    let mut out = Vec::new();
    let Some(body) = doc.body() else {
        return out;
    };
    let mut stack = vec![body];
    while let Some(node) = stack.pop() {
        if selector.matches(doc, node) {
            out.push(node);
        }
        stack.extend(doc.children(node).iter().rev().copied());
    }
    out
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn error(&self, msg: &str) -> Error {
        let input: String = self.chars.iter().collect();
        Error::InvalidSelector(format!("{} at {} in {:?}", msg, self.pos, input))
    }

    fn expect(&mut self, want: char) -> Result<()> {
        match self.bump() {
            Some(c) if c == want => Ok(()),
            _ => Err(self.error(&format!("expected '{}'", want))),
        }
    }

    fn skip_ws(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_whitespace()) {
            self.pos += 1;
        }
        self.pos > start
    }

    fn selector(&mut self) -> Result<Selector> {
        let mut compounds = Vec::new();
        let mut combinators = Vec::new();
        self.skip_ws();
        loop {
            compounds.push(self.compound()?);
            let had_ws = self.skip_ws();
            match self.peek() {
                None => break,
                Some('>') => {
                    self.pos += 1;
                    self.skip_ws();
                    combinators.push(Combinator::Child);
                }
                Some(_) if had_ws => combinators.push(Combinator::Descendant),
                Some(_) => return Err(self.error("unexpected character")),
            }
        }
        Ok(Selector {
            compounds,
            combinators,
        })
    }

    fn compound(&mut self) -> Result<Compound> {
        let mut c = Compound::default();
        let mut any = false;
        match self.peek() {
            Some('*') => {
                self.pos += 1;
                any = true;
            }
            Some(ch) if is_name_char(ch) => {
                c.tag = Some(self.ident()?.to_ascii_lowercase());
                any = true;
            }
            _ => {}
        }
        loop {
            match self.peek() {
                Some('#') => {
                    self.pos += 1;
                    c.ids.push(self.ident()?);
                }
                Some('.') => {
                    self.pos += 1;
                    c.classes.push(self.ident()?);
                }
                Some('[') => {
                    self.pos += 1;
                    c.attrs.push(self.attr()?);
                }
                Some(':') => {
                    self.pos += 1;
                    c.nth_child = Some(self.nth_child()?);
                }
                _ => break,
            }
            any = true;
        }
        if !any {
            return Err(self.error("expected a compound selector"));
        }
        Ok(c)
    }

    fn attr(&mut self) -> Result<AttrTest> {
        self.skip_ws();
        let name = self.ident()?.to_ascii_lowercase();
        self.skip_ws();
        let value = match self.bump() {
            Some(']') => return Ok(AttrTest { name, value: None }),
            Some('=') => {
                self.skip_ws();
                let v = match self.peek() {
                    Some(q @ ('"' | '\'')) => {
                        self.pos += 1;
                        self.string(q)?
                    }
                    _ => self.ident()?,
                };
                self.skip_ws();
                v
            }
            _ => return Err(self.error("only [attr] and [attr=value] are supported")),
        };
        self.expect(']')?;
        Ok(AttrTest {
            name,
            value: Some(value),
        })
    }

    fn nth_child(&mut self) -> Result<usize> {
        let name = self.ident()?;
        if !name.eq_ignore_ascii_case("nth-child") {
            return Err(self.error("only :nth-child(n) is supported"));
        }
        self.expect('(')?;
        self.skip_ws();
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        let digits: String = self.chars[start..self.pos].iter().collect();
        let n = digits
            .parse::<usize>()
            .map_err(|_| self.error("expected an integer position"))?;
        self.skip_ws();
        self.expect(')')?;
        Ok(n)
    }

    fn ident(&mut self) -> Result<String> {
        let mut out = String::new();
        while let Some(c) = self.peek() {
            if c == '\\' {
                self.pos += 1;
                out.push(self.escape()?);
            } else if is_name_char(c) {
                self.pos += 1;
                out.push(c);
            } else {
                break;
            }
        }
        if out.is_empty() {
            return Err(self.error("expected an identifier"));
        }
        Ok(out)
    }

    fn string(&mut self, quote: char) -> Result<String> {
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error("unterminated string")),
                Some(c) if c == quote => return Ok(out),
                Some('\\') => out.push(self.escape()?),
                Some(c) => out.push(c),
            }
        }
    }

    // Called just past the backslash.
    fn escape(&mut self) -> Result<char> {
        let Some(first) = self.peek() else {
            return Err(self.error("dangling escape"));
        };
        if !first.is_ascii_hexdigit() {
            self.pos += 1;
            return Ok(first);
        }
        let start = self.pos;
        while self.pos - start < 6 && self.peek().is_some_and(|c| c.is_ascii_hexdigit()) {
            self.pos += 1;
        }
        let hex: String = self.chars[start..self.pos].iter().collect();
        if self.peek().is_some_and(|c| c.is_ascii_whitespace()) {
            self.pos += 1;
        }
        let code = u32::from_str_radix(&hex, 16).unwrap_or(0);
        Ok(match char::from_u32(code) {
            Some('\0') | None => char::REPLACEMENT_CHARACTER,
            Some(c) => c,
        })
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '\\' || !c.is_ascii()
}
