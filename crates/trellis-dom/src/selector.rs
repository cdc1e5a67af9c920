//! Selector queries
//!
//! One-token selectors only: `tag`, `#id`, `.class` and `*`. Anything else
//! parses to [`SimpleSelector::Unsupported`], which matches nothing.

use crate::{DomTree, ElementData, NodeId};

/// Simple selector for matching
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimpleSelector {
    Universal,
    Tag(String),
    Id(String),
    Class(String),
    Unsupported,
}

impl SimpleSelector {
    /// Parse a simple selector string. Surrounding whitespace is ignored.
    pub fn parse(s: &str) -> Self {
        let s = s.trim();

        if s == "*" {
            Self::Universal
        } else if let Some(id) = s.strip_prefix('#') {
            if is_name(id) { Self::Id(id.to_string()) } else { Self::Unsupported }
        } else if let Some(class) = s.strip_prefix('.') {
            if is_name(class) { Self::Class(class.to_string()) } else { Self::Unsupported }
        } else if is_ident(s) {
            Self::Tag(s.to_ascii_lowercase())
        } else {
            Self::Unsupported
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Unsupported)
    }

    /// Check an element against this selector
    pub fn matches(&self, element: &ElementData) -> bool {
        match self {
            Self::Universal => true,
            Self::Tag(tag) => element.tag().eq_ignore_ascii_case(tag),
            Self::Id(id) => element.id() == Some(id.as_str()),
            Self::Class(class) => element.has_class(class),
            Self::Unsupported => false,
        }
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_' || !c.is_ascii()
}

/// Non-empty run of name characters (`#1st` and `.2col` are accepted)
fn is_name(s: &str) -> bool {
    !s.is_empty() && s.chars().all(is_name_char)
}

/// Tag identifier: a name that does not start with a digit
fn is_ident(s: &str) -> bool {
    is_name(s) && !s.starts_with(|c: char| c.is_ascii_digit())
}

impl DomTree {
    /// First element under `root` (pre-order, `root` excluded) matching
    /// `selector`. From the document the scan covers every owned node,
    /// detached subtrees included.
    pub fn query_selector(&self, root: NodeId, selector: &str) -> Option<NodeId> {
        let selector = SimpleSelector::parse(selector);
        if !selector.is_supported() {
            tracing::debug!("unsupported selector {:?}", selector);
            return None;
        }
        self.scope(root).find(|&id| self.matches_parsed(id, &selector))
    }

    /// All matching elements under `root`, in pre-order
    pub fn query_selector_all(&self, root: NodeId, selector: &str) -> Vec<NodeId> {
        let selector = SimpleSelector::parse(selector);
        if !selector.is_supported() {
            return Vec::new();
        }
        self.scope(root)
            .filter(|&id| self.matches_parsed(id, &selector))
            .collect()
    }

    /// Check if the node is an element matching `selector`
    pub fn matches(&self, id: NodeId, selector: &str) -> bool {
        self.matches_parsed(id, &SimpleSelector::parse(selector))
    }

    fn scope(&self, root: NodeId) -> Box<dyn Iterator<Item = NodeId> + '_> {
        if root == NodeId::ROOT {
            Box::new(self.owned_nodes())
        } else {
            Box::new(self.descendants(root))
        }
    }

    fn matches_parsed(&self, id: NodeId, selector: &SimpleSelector) -> bool {
        self.element(id).is_some_and(|el| selector.matches(el))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_selector_parse() {
        assert_eq!(SimpleSelector::parse("div"), SimpleSelector::Tag("div".into()));
        assert_eq!(SimpleSelector::parse("DIV"), SimpleSelector::Tag("div".into()));
        assert_eq!(SimpleSelector::parse(".card"), SimpleSelector::Class("card".into()));
        assert_eq!(SimpleSelector::parse("#main"), SimpleSelector::Id("main".into()));
        assert_eq!(SimpleSelector::parse(" *  "), SimpleSelector::Universal);
        assert_eq!(SimpleSelector::parse("my-widget"), SimpleSelector::Tag("my-widget".into()));
    }

    #[test]
    fn test_unsupported_forms() {
        for s in ["", " ", "#", ".", "div p", "div>p", "a,b", "[href]", "a:hover", "1div", "div.x", "#a#b"] {
            assert_eq!(SimpleSelector::parse(s), SimpleSelector::Unsupported, "{s:?}");
        }
    }

    #[test]
    fn test_element_matches() {
        let mut el = ElementData::new("Div");
        el.set_attr("id", "main");
        el.set_attr("class", "container active");

        assert!(SimpleSelector::parse("div").matches(&el));
        assert!(SimpleSelector::parse("#main").matches(&el));
        assert!(SimpleSelector::parse(".active").matches(&el));
        assert!(SimpleSelector::parse("*").matches(&el));
        assert!(!SimpleSelector::parse("#Main").matches(&el));
        assert!(!SimpleSelector::parse("span").matches(&el));
        assert!(!SimpleSelector::Unsupported.matches(&el));
    }

    #[test]
    fn test_query_skips_root_and_text() {
        let mut tree = DomTree::new();
        let root = tree.root();
        let outer = tree.create_element("div");
        let inner = tree.create_element("div");
        let text = tree.create_text_node("div");
        tree.append_child(root, outer).unwrap();
        tree.append_child(outer, text).unwrap();
        tree.append_child(outer, inner).unwrap();

        assert_eq!(tree.query_selector(root, "div"), Some(outer));
        assert_eq!(tree.query_selector(outer, "div"), Some(inner));
        assert_eq!(tree.query_selector(inner, "div"), None);
        assert_eq!(tree.query_selector_all(root, "div"), [outer, inner]);
        assert_eq!(tree.query_selector_all(root, "*"), [outer, inner]);
        assert!(!tree.matches(text, "*"));
    }
}
