//! Wraps a document's markup in its single `article` element.

use crate::markup::{Element, MarkupNode};

/// Wrap top-level nodes in one `article`.
///
/// Whitespace-only text between blocks is dropped. Every top-level `h1` is
/// pointed at `edit_url` and marked so the renderer does not slug it.
pub fn wrap_in_article(nodes: Vec<MarkupNode>, edit_url: &str) -> Element {
    let children = nodes
        .into_iter()
        .filter(|node| !matches!(node, MarkupNode::Text(value) if value.trim().is_empty()))
        .map(|node| match node {
            MarkupNode::Element(mut element) if element.tag == "h1" => {
                element.data.edit_url = Some(edit_url.to_string());
                element.data.no_slug = true;
                MarkupNode::Element(element)
            }
            other => other,
        })
        .collect();
    Element::new("article", children)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EDIT: &str = "https://github.com/logux/docs/edit/main/guide/start.md";

    #[test]
    fn wraps_everything_in_one_article() {
        let nodes = vec![
            MarkupNode::Element(Element::new("p", vec![MarkupNode::text("a")])),
            MarkupNode::Element(Element::new("p", vec![MarkupNode::text("b")])),
        ];
        let article = wrap_in_article(nodes, EDIT);
        assert_eq!(article.tag, "article");
        assert_eq!(article.children.len(), 2);
    }

    #[test]
    fn drops_blank_text_between_blocks() {
        let nodes = vec![
            MarkupNode::text("\n"),
            MarkupNode::Element(Element::new("p", Vec::new())),
            MarkupNode::text("\n  "),
        ];
        let article = wrap_in_article(nodes, EDIT);
        assert_eq!(article.children.len(), 1);
    }

    #[test]
    fn keeps_meaningful_text() {
        let article = wrap_in_article(vec![MarkupNode::text("loose")], EDIT);
        assert_eq!(article.children, vec![MarkupNode::text("loose")]);
    }

    #[test]
    fn h1_gets_edit_url_and_no_slug() {
        let nodes = vec![
            MarkupNode::Element(Element::new("h1", vec![MarkupNode::text("Start")])),
            MarkupNode::Element(Element::new("h2", vec![MarkupNode::text("Install")])),
        ];
        let article = wrap_in_article(nodes, EDIT);

        let h1 = article.children[0].as_element().unwrap();
        assert_eq!(h1.data.edit_url.as_deref(), Some(EDIT));
        assert!(h1.data.no_slug);

        let h2 = article.children[1].as_element().unwrap();
        assert_eq!(h2.data.edit_url, None);
        assert!(!h2.data.no_slug);
    }

    #[test]
    fn empty_document_is_empty_article() {
        let article = wrap_in_article(Vec::new(), EDIT);
        assert!(article.children.is_empty());
    }
}
