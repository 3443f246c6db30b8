//! Traversal API over a parsed page, shared by both fetch strategies

use regex::Regex;
use scraper::{ElementRef, Html, Node};

/// Tags whose text is never rendered
const INVISIBLE_TAGS: &[&str] = &["script", "style", "noscript", "template"];

/// A parsed HTML document
pub struct Document {
    html: Html,
}

impl Document {
    pub fn parse(content: &str) -> Self {
        Self {
            html: Html::parse_document(content),
        }
    }

    pub fn root(&self) -> ElementRef<'_> {
        self.html.root_element()
    }

    pub fn html(&self) -> &Html {
        &self.html
    }

    /// Text of the first `<title>`, whitespace collapsed
    pub fn title(&self) -> Option<String> {
        find(self.root(), &ElementQuery::tags(&["title"])).map(text_of)
    }

    /// All rendered text of the page, whitespace collapsed
    pub fn visible_text(&self) -> String {
        let root = self.root();
        let body = find(root, &ElementQuery::tags(&["body"])).unwrap_or(root);
        collapse_whitespace(visible_text_nodes(body).into_iter().map(|(_, text)| text))
    }
}

/// How an element's attributes must look to match a query
#[derive(Debug, Clone, Copy)]
pub enum AttrPredicate<'q> {
    Any,
    Present(&'q str),
    Equals(&'q str, &'q str),
    Matches(&'q str, &'q Regex),
}

/// Tag set plus attribute predicate. An empty tag set matches every tag.
#[derive(Debug, Clone, Copy)]
pub struct ElementQuery<'q> {
    tags: &'q [&'q str],
    predicate: AttrPredicate<'q>,
}

impl<'q> ElementQuery<'q> {
    pub const fn tags(tags: &'q [&'q str]) -> Self {
        Self {
            tags,
            predicate: AttrPredicate::Any,
        }
    }

    pub const fn with_attr(self, name: &'q str, value: &'q str) -> Self {
        Self {
            predicate: AttrPredicate::Equals(name, value),
            ..self
        }
    }

    pub const fn with_attr_present(self, name: &'q str) -> Self {
        Self {
            predicate: AttrPredicate::Present(name),
            ..self
        }
    }

    pub const fn with_attr_matching(self, name: &'q str, pattern: &'q Regex) -> Self {
        Self {
            predicate: AttrPredicate::Matches(name, pattern),
            ..self
        }
    }

    pub const fn with_class_matching(self, pattern: &'q Regex) -> Self {
        self.with_attr_matching("class", pattern)
    }

    pub fn matches(&self, element: ElementRef<'_>) -> bool {
        let value = element.value();
        if !self.tags.is_empty() && !self.tags.iter().any(|tag| value.name() == *tag) {
            return false;
        }
        match self.predicate {
            AttrPredicate::Any => true,
            AttrPredicate::Present(name) => value.attr(name).is_some(),
            AttrPredicate::Equals(name, expected) => value.attr(name) == Some(expected),
            AttrPredicate::Matches(name, pattern) => {
                value.attr(name).is_some_and(|attr| pattern.is_match(attr))
            }
        }
    }
}

/// Descendant elements of `scope` in document order, `scope` itself excluded
pub fn descendants<'a>(scope: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    scope.descendants().skip(1).filter_map(ElementRef::wrap)
}

/// First descendant matching `query`
pub fn find<'a>(scope: ElementRef<'a>, query: &ElementQuery<'_>) -> Option<ElementRef<'a>> {
    descendants(scope).find(|el| query.matches(*el))
}

/// Every descendant matching `query`, in document order
pub fn find_all<'a>(scope: ElementRef<'a>, query: &ElementQuery<'_>) -> Vec<ElementRef<'a>> {
    descendants(scope).filter(|el| query.matches(*el)).collect()
}

/// First visible text node under `scope` matching `pattern`, with its parent element
pub fn find_text<'a>(scope: ElementRef<'a>, pattern: &Regex) -> Option<(ElementRef<'a>, &'a str)> {
    visible_text_nodes(scope)
        .into_iter()
        .find(|(_, text)| pattern.is_match(text))
}

/// Text content of an element with runs of whitespace collapsed to single spaces
pub fn text_of(element: ElementRef<'_>) -> String {
    collapse_whitespace(element.text())
}

fn collapse_whitespace<'a>(pieces: impl Iterator<Item = &'a str>) -> String {
    let mut out = String::new();
    for word in pieces.flat_map(str::split_whitespace) {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    out
}

fn visible_text_nodes<'a>(scope: ElementRef<'a>) -> Vec<(ElementRef<'a>, &'a str)> {
    scope
        .descendants()
        .filter_map(|node| {
            let Node::Text(text) = node.value() else {
                return None;
            };
            let parent = node.parent().and_then(ElementRef::wrap)?;
            let hidden = parent
                .ancestors()
                .filter_map(ElementRef::wrap)
                .chain(std::iter::once(parent))
                .any(|el| INVISIBLE_TAGS.contains(&el.value().name()));
            if hidden {
                return None;
            }
            Some((parent, &**text))
        })
        .collect()
}
