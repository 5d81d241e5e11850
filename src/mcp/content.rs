use serde::{Deserialize, Serialize};

/// One item of an MCP tool result, reduced to what hostwarden can show.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolContent {
    Text { text: String },
    Image { mime_type: String },
    Resource {
        uri: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
}

/// Convert an rmcp content item. Audio becomes a text placeholder.
pub fn from_rmcp_content(content: &rmcp::model::Content) -> ToolContent {
    use rmcp::model::{RawContent, ResourceContents};
    match &content.raw {
        RawContent::Text(text) => ToolContent::Text {
            text: text.text.clone(),
        },
        RawContent::Image(image) => ToolContent::Image {
            mime_type: image.mime_type.clone(),
        },
        RawContent::Resource(embedded) => {
            let uri = match &embedded.resource {
                ResourceContents::TextResourceContents { uri, .. }
                | ResourceContents::BlobResourceContents { uri, .. } => uri.clone(),
            };
            ToolContent::Resource { uri, name: None }
        }
        RawContent::Audio(audio) => ToolContent::Text {
            text: format!("[Audio: {}]", audio.mime_type),
        },
        RawContent::ResourceLink(link) => ToolContent::Resource {
            uri: link.uri.clone(),
            name: Some(link.name.clone()),
        },
    }
}

pub fn from_rmcp_contents(contents: &[rmcp::model::Content]) -> Vec<ToolContent> {
    contents.iter().map(from_rmcp_content).collect()
}

/// Text items joined by newlines; other items become bracketed placeholders.
pub fn render_content_to_text(content: &[ToolContent]) -> String {
    content
        .iter()
        .map(|item| match item {
            ToolContent::Text { text } => text.clone(),
            ToolContent::Image { mime_type } => format!("[Image: {mime_type}]"),
            ToolContent::Resource {
                uri,
                name: Some(name),
            } => format!("[Resource: {name} ({uri})]"),
            ToolContent::Resource { uri, name: None } => format!("[Resource: {uri}]"),
        })
        .collect::<Vec<_>>()
        .join("\n")
}
