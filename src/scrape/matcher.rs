//! Declarative element matchers and a generic search over parsed HTML.
//!
//! A [`Matcher`] describes an element by its name, its attributes, its text
//! and the shape of its ancestor chain. Matchers are plain data, so a site
//! layout can be described (and tested) without a live fetch.

use scraper::{ElementRef, Html};

/// String test applied to an attribute value or element text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    Equals(String),
    Contains(String),
    OneOf(Vec<String>),
}

impl Predicate {
    pub fn matches(&self, value: &str) -> bool {
        match self {
            Predicate::Equals(expected) => value == expected,
            Predicate::Contains(needle) => value.contains(needle.as_str()),
            Predicate::OneOf(options) => options.iter().any(|o| o == value),
        }
    }
}

/// Attribute `name` must be present and satisfy `predicate`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttrRule {
    pub name: String,
    pub predicate: Predicate,
}

impl AttrRule {
    fn matches(&self, element: &ElementRef<'_>) -> bool {
        element
            .value()
            .attr(&self.name)
            .map_or(false, |value| self.predicate.matches(value))
    }
}

/// Constraint on the ancestor `depth` levels up (1 = parent).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AncestorRule {
    pub depth: usize,
    pub element: Option<String>,
    pub attrs: Vec<AttrRule>,
    /// Test on the text of the ancestor's first element child
    pub first_child_text: Option<Predicate>,
}

impl AncestorRule {
    pub fn at(depth: usize) -> Self {
        Self {
            depth,
            ..Default::default()
        }
    }

    pub fn element(mut self, name: impl Into<String>) -> Self {
        self.element = Some(name.into());
        self
    }

    pub fn attr(mut self, name: impl Into<String>, predicate: Predicate) -> Self {
        self.attrs.push(AttrRule {
            name: name.into(),
            predicate,
        });
        self
    }

    pub fn first_child_text(mut self, predicate: Predicate) -> Self {
        self.first_child_text = Some(predicate);
        self
    }

    fn matches(&self, element: &ElementRef<'_>) -> bool {
        let Some(ancestor) = ancestor_at(element, self.depth) else {
            return false;
        };
        if let Some(name) = &self.element {
            if !ancestor.value().name().eq_ignore_ascii_case(name) {
                return false;
            }
        }
        if !self.attrs.iter().all(|rule| rule.matches(&ancestor)) {
            return false;
        }
        match &self.first_child_text {
            Some(predicate) => ancestor
                .children()
                .find_map(ElementRef::wrap)
                .map_or(false, |child| predicate.matches(&text_of(&child))),
            None => true,
        }
    }
}

/// Description of the elements to select from a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Matcher {
    pub element: String,
    pub attrs: Vec<AttrRule>,
    pub text: Option<Predicate>,
    pub ancestors: Vec<AncestorRule>,
}

impl Matcher {
    pub fn element(name: impl Into<String>) -> Self {
        Self {
            element: name.into(),
            attrs: Vec::new(),
            text: None,
            ancestors: Vec::new(),
        }
    }

    pub fn attr(mut self, name: impl Into<String>, predicate: Predicate) -> Self {
        self.attrs.push(AttrRule {
            name: name.into(),
            predicate,
        });
        self
    }

    pub fn text(mut self, predicate: Predicate) -> Self {
        self.text = Some(predicate);
        self
    }

    pub fn ancestor(mut self, rule: AncestorRule) -> Self {
        self.ancestors.push(rule);
        self
    }

    pub fn matches(&self, element: &ElementRef<'_>) -> bool {
        element.value().name().eq_ignore_ascii_case(&self.element)
            && self.attrs.iter().all(|rule| rule.matches(element))
            && self
                .text
                .as_ref()
                .map_or(true, |predicate| predicate.matches(&text_of(element)))
            && self.ancestors.iter().all(|rule| rule.matches(element))
    }
}

/// Every element of `document` accepted by `matcher`, in document order.
pub fn find_all<'a>(document: &'a Html, matcher: &Matcher) -> Vec<ElementRef<'a>> {
    document
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|element| matcher.matches(element))
        .collect()
}

/// First match of `matcher`, if any.
pub fn find_first<'a>(document: &'a Html, matcher: &Matcher) -> Option<ElementRef<'a>> {
    document
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .find(|element| matcher.matches(element))
}

/// Concatenated descendant text, trimmed.
pub fn text_of(element: &ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

pub fn href_of(element: &ElementRef<'_>) -> Option<String> {
    element.value().attr("href").map(str::to_string)
}

fn ancestor_at<'a>(element: &ElementRef<'a>, depth: usize) -> Option<ElementRef<'a>> {
    let mut node = **element;
    for _ in 0..depth {
        node = node.parent()?;
    }
    ElementRef::wrap(node)
}
