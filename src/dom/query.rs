//! Matching of generated selectors against a [`DomTree`].
//!
//! Supports the subset produced by the selector and path builders: type
//! selectors, `*`, `#id`, `.class`, `:nth-of-type(n)`, `:nth-child(n)`, the
//! child combinator `>` and the descendant combinator.

use crate::dom::tree::{DomTree, NodeRef};
use crate::error::{PickerError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Child,
    Descendant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Pseudo {
    NthChild(usize),
    NthOfType(usize),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    pseudos: Vec<Pseudo>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct SelectorPart {
    compound: Compound,
    /// Relation to the previous part; `None` for the first part
    combinator: Option<Combinator>,
}

/// A parsed selector chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    source: String,
    parts: Vec<SelectorPart>,
}

impl Selector {
    /// Parse a selector string
    pub fn parse(selector: &str) -> Result<Self> {
        let trimmed = selector.trim();
        if trimmed.is_empty() {
            return Err(PickerError::UnsupportedSelector(selector.to_string()));
        }

        let spaced = trimmed.replace('>', " > ");
        let mut parts = Vec::new();
        let mut pending: Option<Combinator> = None;

        for token in spaced.split_whitespace() {
            if token == ">" {
                if pending.is_some() || parts.is_empty() {
                    return Err(PickerError::UnsupportedSelector(selector.to_string()));
                }
                pending = Some(Combinator::Child);
                continue;
            }

            let compound = parse_compound(token).ok_or_else(|| PickerError::UnsupportedSelector(selector.to_string()))?;
            let combinator = if parts.is_empty() {
                None
            } else {
                Some(pending.take().unwrap_or(Combinator::Descendant))
            };
            parts.push(SelectorPart { compound, combinator });
        }

        if parts.is_empty() || pending.is_some() {
            return Err(PickerError::UnsupportedSelector(selector.to_string()));
        }

        Ok(Self {
            source: trimmed.to_string(),
            parts,
        })
    }

    /// The selector text this was parsed from
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Check whether a node matches this selector
    pub fn matches(&self, node: NodeRef<'_>) -> bool {
        matches_chain(node, &self.parts)
    }

    /// All matching nodes in document order
    pub fn select<'a>(&self, tree: &'a DomTree) -> Vec<NodeRef<'a>> {
        tree.iter().filter(|node| self.matches(*node)).collect()
    }
}

/// Select all nodes matching `selector`, in document order
pub fn select<'a>(tree: &'a DomTree, selector: &str) -> Result<Vec<NodeRef<'a>>> {
    Ok(Selector::parse(selector)?.select(tree))
}

/// Select the first node matching `selector`
pub fn select_first<'a>(tree: &'a DomTree, selector: &str) -> Result<Option<NodeRef<'a>>> {
    let parsed = Selector::parse(selector)?;
    Ok(tree.iter().find(|node| parsed.matches(*node)))
}

fn matches_chain(node: NodeRef<'_>, parts: &[SelectorPart]) -> bool {
    let Some((last, rest)) = parts.split_last() else {
        return false;
    };

    if !matches_compound(node, &last.compound) {
        return false;
    }

    match last.combinator {
        None => true,
        Some(Combinator::Child) => node.parent().is_some_and(|parent| matches_chain(parent, rest)),
        Some(Combinator::Descendant) => node.ancestors().any(|ancestor| matches_chain(ancestor, rest)),
    }
}

fn matches_compound(node: NodeRef<'_>, compound: &Compound) -> bool {
    if let Some(tag) = &compound.tag {
        if !tag.eq_ignore_ascii_case(node.tag_name()) {
            return false;
        }
    }

    if let Some(id) = &compound.id {
        if node.attribute("id") != Some(id.as_str()) {
            return false;
        }
    }

    if !compound.classes.is_empty() {
        let class = node.attribute("class").unwrap_or_default();
        if !compound
            .classes
            .iter()
            .all(|wanted| class.split_whitespace().any(|c| c == wanted))
        {
            return false;
        }
    }

    compound.pseudos.iter().all(|pseudo| match pseudo {
        Pseudo::NthChild(n) => node.child_position().map(|p| p + 1) == Some(*n),
        Pseudo::NthOfType(n) => nth_of_type(node) == Some(*n),
    })
}

fn nth_of_type(node: NodeRef<'_>) -> Option<usize> {
    node.parent()?;
    node.siblings()
        .filter(|sibling| sibling.tag_name() == node.tag_name())
        .position(|sibling| sibling.id() == node.id())
        .map(|index| index + 1)
}

fn parse_compound(token: &str) -> Option<Compound> {
    let mut compound = Compound::default();
    let head_end = token.find(['#', '.', ':']).unwrap_or(token.len());
    let head = &token[..head_end];
    if !head.is_empty() && head != "*" {
        if !head.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
            return None;
        }
        compound.tag = Some(head.to_ascii_lowercase());
    }

    let mut rest = &token[head_end..];
    while let Some(marker) = rest.chars().next() {
        match marker {
            '#' | '.' => {
                let body = &rest[marker.len_utf8()..];
                let end = body.find(['#', '.', ':']).unwrap_or(body.len());
                let name = &body[..end];
                if name.is_empty() {
                    return None;
                }
                if marker == '#' {
                    compound.id = Some(name.to_string());
                } else {
                    compound.classes.push(name.to_string());
                }
                rest = &body[end..];
            }
            ':' => {
                let body = &rest[marker.len_utf8()..];
                let open = body.find('(')?;
                let close = body.find(')')?;
                if close < open {
                    return None;
                }
                let argument: usize = body[open + 1..close].trim().parse().ok()?;
                let pseudo = match &body[..open] {
                    "nth-child" => Pseudo::NthChild(argument),
                    "nth-of-type" => Pseudo::NthOfType(argument),
                    _ => return None,
                };
                compound.pseudos.push(pseudo);
                rest = &body[close + 1..];
            }
            _ => return None,
        }
    }

    Some(compound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{DomTree, ElementNode, NodeId, css_selector, identifier_path};

    fn sample_tree() -> DomTree {
        DomTree::new(
            ElementNode::new("body")
                .with_child(
                    ElementNode::new("div").with_id("parent").with_children(vec![
                        ElementNode::new("span").with_class("child-class"),
                        ElementNode::new("span").with_class("other child-class"),
                    ]),
                )
                .with_child(ElementNode::new("ul").with_children(vec![
                    ElementNode::new("li").with_text("a"),
                    ElementNode::new("li").with_text("b"),
                    ElementNode::new("li").with_text("c"),
                ]))
                .with_child(ElementNode::new("p").with_class("note")),
        )
    }

    #[test]
    fn test_parse_rejects_unsupported_syntax() {
        assert!(Selector::parse("").is_err());
        assert!(Selector::parse("> div").is_err());
        assert!(Selector::parse("div >").is_err());
        assert!(Selector::parse("li:nth-child(2n+1)").is_err());
        assert!(Selector::parse("a[href]").is_err());
        assert!(Selector::parse("div..x").is_err());
        assert!(Selector::parse("p:hover").is_err());
    }

    #[test]
    fn test_parse_rejects_non_ascii_after_compound() {
        assert!(Selector::parse("li:nth-child(1)é").is_err());
        assert!(Selector::parse("div#mainé").is_ok());
        assert!(Selector::parse("ul > li.é").is_ok());
        assert!(select(&sample_tree(), "li:nth-of-type(2)ü").is_err());
    }

    #[test]
    fn test_select_by_id_and_class() {
        let tree = sample_tree();

        let found = select(&tree, "#parent").unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id(), NodeId(1));

        let found = select(&tree, ".child-class").unwrap();
        let ids: Vec<_> = found.iter().map(|n| n.id()).collect();
        assert_eq!(ids, vec![NodeId(2), NodeId(3)]);

        let found = select(&tree, "span.other.child-class").unwrap();
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn test_select_with_combinators() {
        let tree = sample_tree();

        assert_eq!(select(&tree, "div#parent > span").unwrap().len(), 2);
        assert_eq!(select(&tree, "body li").unwrap().len(), 3);
        assert!(select(&tree, "ul > span").unwrap().is_empty());
        assert_eq!(select(&tree, "ul>li:nth-of-type(2)").unwrap()[0].text(), "b");
    }

    #[test]
    fn test_nth_child() {
        let tree = sample_tree();
        let third = select_first(&tree, "li:nth-child(3)").unwrap().unwrap();
        assert_eq!(third.text(), "c");
        assert!(select_first(&tree, "li:nth-child(4)").unwrap().is_none());
    }

    #[test]
    fn test_generated_selectors_relocate_their_element() {
        let tree = sample_tree();

        for node in tree.iter().skip(1) {
            let selector = css_selector(node);
            let found = select(&tree, &selector).unwrap();
            assert!(
                found.iter().any(|n| n.id() == node.id()),
                "selector {} did not match node {:?}",
                selector,
                node.id()
            );
        }
    }

    #[test]
    fn test_identifier_paths_relocate_their_element() {
        let tree = sample_tree();

        for node in tree.iter().skip(1) {
            let path = identifier_path(node);
            let anchored = format!("body > {}", path);
            let found = select(&tree, &anchored).unwrap();
            assert_eq!(found.len(), 1, "path {} is ambiguous", anchored);
            assert_eq!(found[0].id(), node.id());
        }
    }
}
