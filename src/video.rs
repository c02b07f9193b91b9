//! `Youtube:<id> <alt>` paragraphs become responsive thumbnail links.

use crate::markup::{Element, MarkupNode, text_content};
use regex::Regex;
use std::sync::LazyLock;

static YOUTUBE_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Youtube:(\S+) (.*)$").expect("valid regex"));

/// Replace every matching paragraph below `element` with a video link.
///
/// Paragraphs that start with `Youtube:` but do not match the tag are left
/// as they are.
pub fn insert_videos(element: &mut Element) {
    for child in &mut element.children {
        let MarkupNode::Element(inner) = child else {
            continue;
        };
        if let Some(video) = video_for(inner) {
            *child = MarkupNode::Element(video);
        } else {
            insert_videos(inner);
        }
    }
}

fn video_for(paragraph: &Element) -> Option<Element> {
    if paragraph.tag != "p" {
        return None;
    }
    let text: String = paragraph.children.iter().map(text_content).collect();
    if !text.starts_with("Youtube:") {
        return None;
    }
    let captures = YOUTUBE_TAG.captures(&text)?;
    Some(video_link(&captures[1], &captures[2]))
}

/// `a.video > picture > (source webp, img jpeg)` for a YouTube id.
pub fn video_link(id: &str, alt: &str) -> Element {
    let source = Element::new("source", Vec::new())
        .with_property(
            "srcset",
            format!("https://i.ytimg.com/vi_webp/{id}/maxresdefault.webp"),
        )
        .with_property("type", "image/webp");
    let img = Element::new("img", Vec::new())
        .with_property("alt", alt)
        .with_property("src", format!("https://i.ytimg.com/vi/{id}/maxresdefault.jpg"));
    let picture = Element::new(
        "picture",
        vec![MarkupNode::Element(source), MarkupNode::Element(img)],
    );
    Element::new("a", vec![MarkupNode::Element(picture)])
        .with_property("class", "video")
        .with_property("href", format!("https://www.youtube.com/watch?v={id}"))
}
