//! Small CSS selector engine used by the in-memory surface
//!
//! Supported: type and universal selectors, `#id`, `.class`, attribute tests
//! (`[a]`, `[a=v]`, `[a*=v]`, `[a^=v]`, `[a$=v]`, `[a~=v]`, optional `i` flag),
//! `:not(compound)`, descendant and child combinators, selector lists.

/// Tree view the matcher walks
pub(crate) trait Dom {
    fn tag(&self, node: usize) -> &str;
    fn attribute(&self, node: usize, name: &str) -> Option<String>;
    fn parent(&self, node: usize) -> Option<usize>;
}

#[derive(Debug, Clone)]
pub(crate) struct SelectorList {
    selectors: Vec<Complex>,
}

#[derive(Debug, Clone)]
struct Complex {
    // Combinator on part i relates it to part i - 1; the first one is unused.
    parts: Vec<(Combinator, Compound)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, Default)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attributes: Vec<AttrTest>,
    negations: Vec<Compound>,
}

#[derive(Debug, Clone)]
struct AttrTest {
    name: String,
    op: AttrOp,
    value: String,
    ignore_case: bool,
}

#[derive(Debug, Clone, Copy)]
enum AttrOp {
    Exists,
    Equals,
    Contains,
    Prefix,
    Suffix,
    Word,
}

impl SelectorList {
    pub(crate) fn parse(input: &str) -> Result<Self, String> {
        let mut selectors = Vec::new();
        for part in split_top_level(input) {
            let part = part.trim();
            if part.is_empty() {
                return Err(format!("empty selector in '{input}'"));
            }
            selectors.push(Parser::new(part).complex()?);
        }
        Ok(Self { selectors })
    }

    pub(crate) fn matches(&self, dom: &impl Dom, node: usize) -> bool {
        self.selectors.iter().any(|selector| selector.matches(dom, node))
    }
}

impl Complex {
    fn matches(&self, dom: &impl Dom, node: usize) -> bool {
        match self.parts.len() {
            0 => false,
            len => self.matches_from(dom, node, len - 1),
        }
    }

    fn matches_from(&self, dom: &impl Dom, node: usize, index: usize) -> bool {
        let (combinator, compound) = &self.parts[index];
        if !compound.matches(dom, node) {
            return false;
        }
        if index == 0 {
            return true;
        }
        match combinator {
            Combinator::Child => dom
                .parent(node)
                .is_some_and(|parent| self.matches_from(dom, parent, index - 1)),
            Combinator::Descendant => {
                let mut current = dom.parent(node);
                while let Some(ancestor) = current {
                    if self.matches_from(dom, ancestor, index - 1) {
                        return true;
                    }
                    current = dom.parent(ancestor);
                }
                false
            }
        }
    }
}

impl Compound {
    fn matches(&self, dom: &impl Dom, node: usize) -> bool {
        if let Some(tag) = &self.tag {
            if !dom.tag(node).eq_ignore_ascii_case(tag) {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if dom.attribute(node, "id").as_deref() != Some(id.as_str()) {
                return false;
            }
        }
        if !self.classes.is_empty() {
            let class_attr = dom.attribute(node, "class").unwrap_or_default();
            let all_present = self
                .classes
                .iter()
                .all(|class| class_attr.split_whitespace().any(|have| have == class));
            if !all_present {
                return false;
            }
        }
        self.attributes
            .iter()
            .all(|test| test.matches(dom.attribute(node, &test.name).as_deref()))
            && !self.negations.iter().any(|negated| negated.matches(dom, node))
    }
}

impl AttrTest {
    fn matches(&self, actual: Option<&str>) -> bool {
        let Some(actual) = actual else {
            return false;
        };
        let (actual, expected) = if self.ignore_case {
            (actual.to_lowercase(), self.value.to_lowercase())
        } else {
            (actual.to_string(), self.value.clone())
        };
        match self.op {
            AttrOp::Exists => true,
            AttrOp::Equals => actual == expected,
            AttrOp::Contains => !expected.is_empty() && actual.contains(&expected),
            AttrOp::Prefix => !expected.is_empty() && actual.starts_with(&expected),
            AttrOp::Suffix => !expected.is_empty() && actual.ends_with(&expected),
            AttrOp::Word => actual.split_whitespace().any(|word| word == expected),
        }
    }
}

fn split_top_level(input: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (index, c) in input.char_indices() {
        match quote {
            Some(q) => {
                if c == q {
                    quote = None;
                }
            }
            None => match c {
                '"' | '\'' => quote = Some(c),
                '[' | '(' => depth += 1,
                ']' | ')' => depth -= 1,
                ',' if depth == 0 => {
                    parts.push(&input[start..index]);
                    start = index + 1;
                }
                _ => {}
            },
        }
    }
    parts.push(&input[start..]);
    parts
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
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

    /// Returns whether any whitespace was consumed
    fn skip_ws(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
        self.pos > start
    }

    fn error(&self, message: &str) -> String {
        format!("{message} at offset {}", self.pos)
    }

    fn expect(&mut self, wanted: char) -> Result<(), String> {
        match self.bump() {
            Some(c) if c == wanted => Ok(()),
            Some(c) => Err(self.error(&format!("expected '{wanted}', found '{c}'"))),
            None => Err(self.error(&format!("expected '{wanted}'"))),
        }
    }

    fn ident(&mut self) -> Result<String, String> {
        let start = self.pos;
        while self.peek().is_some_and(is_ident_char) {
            self.pos += 1;
        }
        if self.pos == start {
            return Err(self.error("expected an identifier"));
        }
        Ok(self.chars[start..self.pos].iter().collect())
    }

    fn complex(&mut self) -> Result<Complex, String> {
        let mut parts = Vec::new();
        let mut combinator = Combinator::Descendant;
        self.skip_ws();
        loop {
            let compound = self.compound()?;
            parts.push((combinator, compound));
            let spaced = self.skip_ws();
            match self.peek() {
                None => break,
                Some('>') => {
                    self.bump();
                    self.skip_ws();
                    combinator = Combinator::Child;
                }
                Some(_) if spaced => combinator = Combinator::Descendant,
                Some(c) => return Err(self.error(&format!("unexpected '{c}'"))),
            }
        }
        Ok(Complex { parts })
    }

    fn compound(&mut self) -> Result<Compound, String> {
        let mut compound = Compound::default();
        let mut seen = false;
        match self.peek() {
            Some('*') => {
                self.bump();
                seen = true;
            }
            Some(c) if is_ident_char(c) => {
                compound.tag = Some(self.ident()?.to_ascii_lowercase());
                seen = true;
            }
            _ => {}
        }
        loop {
            match self.peek() {
                Some('#') => {
                    self.bump();
                    compound.id = Some(self.ident()?);
                }
                Some('.') => {
                    self.bump();
                    compound.classes.push(self.ident()?);
                }
                Some('[') => compound.attributes.push(self.attribute()?),
                Some(':') => {
                    self.bump();
                    let pseudo = self.ident()?;
                    if pseudo != "not" {
                        return Err(self.error(&format!("unsupported pseudo-class ':{pseudo}'")));
                    }
                    self.expect('(')?;
                    let inner = self.until_close_paren()?;
                    let mut nested = Parser::new(&inner);
                    nested.skip_ws();
                    let negated = nested.compound()?;
                    nested.skip_ws();
                    if nested.peek().is_some() {
                        return Err(self.error(":not() takes a single compound selector"));
                    }
                    compound.negations.push(negated);
                }
                _ => break,
            }
            seen = true;
        }
        if !seen {
            return Err(self.error("expected a selector"));
        }
        Ok(compound)
    }

    fn until_close_paren(&mut self) -> Result<String, String> {
        let mut depth = 0;
        let mut body = String::new();
        loop {
            match self.bump() {
                Some(')') if depth == 0 => return Ok(body),
                Some(c) => {
                    match c {
                        '(' => depth += 1,
                        ')' => depth -= 1,
                        _ => {}
                    }
                    body.push(c);
                }
                None => return Err(self.error("unterminated ':not('")),
            }
        }
    }

    fn attribute(&mut self) -> Result<AttrTest, String> {
        self.expect('[')?;
        self.skip_ws();
        let name = self.ident()?.to_ascii_lowercase();
        self.skip_ws();
        let op = match self.bump() {
            Some(']') => {
                return Ok(AttrTest {
                    name,
                    op: AttrOp::Exists,
                    value: String::new(),
                    ignore_case: false,
                })
            }
            Some('=') => AttrOp::Equals,
            Some(c @ ('*' | '^' | '$' | '~')) => {
                self.expect('=')?;
                match c {
                    '*' => AttrOp::Contains,
                    '^' => AttrOp::Prefix,
                    '$' => AttrOp::Suffix,
                    _ => AttrOp::Word,
                }
            }
            _ => return Err(self.error("malformed attribute selector")),
        };
        self.skip_ws();
        let value = match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                self.bump();
                let mut value = String::new();
                loop {
                    match self.bump() {
                        Some('\\') => {
                            if let Some(escaped) = self.bump() {
                                value.push(escaped);
                            }
                        }
                        Some(c) if c == quote => break,
                        Some(c) => value.push(c),
                        None => return Err(self.error("unterminated string")),
                    }
                }
                value
            }
            _ => self.ident()?,
        };
        self.skip_ws();
        let mut ignore_case = false;
        match self.peek() {
            Some('i' | 'I') => {
                self.bump();
                ignore_case = true;
                self.skip_ws();
            }
            Some('s' | 'S') => {
                self.bump();
                self.skip_ws();
            }
            _ => {}
        }
        self.expect(']')?;
        Ok(AttrTest {
            name,
            op,
            value,
            ignore_case,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    struct Node {
        tag: &'static str,
        parent: Option<usize>,
        attrs: BTreeMap<&'static str, &'static str>,
    }

    struct Doc(Vec<Node>);

    impl Dom for Doc {
        fn tag(&self, node: usize) -> &str {
            self.0[node].tag
        }

        fn attribute(&self, node: usize, name: &str) -> Option<String> {
            self.0[node].attrs.get(name).map(|v| v.to_string())
        }

        fn parent(&self, node: usize) -> Option<usize> {
            self.0[node].parent
        }
    }

    fn doc() -> Doc {
        Doc(vec![
            Node {
                tag: "form",
                parent: None,
                attrs: BTreeMap::from([("id", "login")]),
            },
            Node {
                tag: "input",
                parent: Some(0),
                attrs: BTreeMap::from([("type", "hidden"), ("name", "csrf")]),
            },
            Node {
                tag: "input",
                parent: Some(0),
                attrs: BTreeMap::from([("type", "text"), ("placeholder", "User Name")]),
            },
            Node {
                tag: "button",
                parent: Some(0),
                attrs: BTreeMap::from([("class", "btn primary"), ("aria-label", "Sign In")]),
            },
        ])
    }

    fn matching(selector: &str) -> Vec<usize> {
        let doc = doc();
        let list = SelectorList::parse(selector).unwrap();
        (0..doc.0.len()).filter(|&n| list.matches(&doc, n)).collect()
    }

    #[test]
    fn compound_and_combinators() {
        assert_eq!(matching("#login > input"), vec![1, 2]);
        assert_eq!(matching("form button.btn.primary"), vec![3]);
        assert_eq!(matching("input:not([type=\"hidden\"])"), vec![2]);
    }

    #[test]
    fn attribute_operators_and_case_flag() {
        assert_eq!(matching("[placeholder*='name' i]"), vec![2]);
        assert!(matching("[placeholder*='name']").is_empty());
        assert_eq!(matching("[aria-label^=Sign]"), vec![3]);
        assert_eq!(matching("[class~=primary]"), vec![3]);
    }

    #[test]
    fn selector_lists_union_matches() {
        assert_eq!(matching("button, #login"), vec![0, 3]);
    }

    #[test]
    fn rejects_malformed_selectors() {
        assert!(SelectorList::parse("#").is_err());
        assert!(SelectorList::parse("a,").is_err());
        assert!(SelectorList::parse("li:nth-child(2)").is_err());
        assert!(SelectorList::parse("[name").is_err());
    }
}
