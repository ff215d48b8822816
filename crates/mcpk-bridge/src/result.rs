//! Tool result reduction.

use mcpk_types::ContentBlock;

/// Concatenate the text blocks of a tool result in order, with no separator.
/// Images, audio, resources and unknown blocks are dropped.
pub fn reduce_text(content: &[ContentBlock]) -> String {
    content
        .iter()
        .filter_map(|block| match block {
            ContentBlock::Text { text } => Some(text.as_str()),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_blocks_are_joined_without_separator() {
        let content = vec![
            ContentBlock::Text { text: "a".into() },
            ContentBlock::Image {
                data: "iVBORw0KGgo=".into(),
                mime_type: "image/png".into(),
            },
            ContentBlock::Text { text: "b".into() },
        ];
        assert_eq!(reduce_text(&content), "ab");
    }

    #[test]
    fn no_text_gives_empty_string() {
        let content = vec![
            ContentBlock::Resource {
                resource: serde_json::json!({"uri": "file:///x"}),
            },
            ContentBlock::Unknown,
        ];
        assert_eq!(reduce_text(&content), "");
        assert_eq!(reduce_text(&[]), "");
    }
}
