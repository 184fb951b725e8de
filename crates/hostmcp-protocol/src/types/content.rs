use serde::{Deserialize, Serialize};

/// A block of content returned from a tool call, prompt, or resource read.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Content {
    Text { text: String },
    Image { data: String, #[serde(rename = "mimeType")] mime_type: String },
    Resource { resource: ResourceContents },
}

/// The inline or blob contents of one resource, as returned by `resources/read`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceContents {
    pub uri: String,
    #[serde(rename = "mimeType", skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blob: Option<String>,
}

impl ResourceContents {
    /// Decode this resource's HTML body, whether carried as inline `text` or
    /// a base64 `blob`. Used by the MCP Apps / ChatGPT Apps widget routes.
    pub fn decode_text(&self) -> Result<String, String> {
        if let Some(text) = &self.text {
            return Ok(text.clone());
        }
        if let Some(blob) = &self.blob {
            use base64::Engine;
            let bytes = base64::engine::general_purpose::STANDARD
                .decode(blob)
                .map_err(|e| format!("invalid base64 blob: {e}"))?;
            return String::from_utf8(bytes).map_err(|e| format!("blob is not valid utf-8: {e}"));
        }
        Err("resource has neither text nor blob contents".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_inline_text() {
        let rc = ResourceContents {
            uri: "ui://widget/a".into(),
            mime_type: Some("text/html".into()),
            text: Some("<div>hi</div>".into()),
            blob: None,
        };
        assert_eq!(rc.decode_text().unwrap(), "<div>hi</div>");
    }

    #[test]
    fn decodes_base64_blob() {
        use base64::Engine;
        let encoded = base64::engine::general_purpose::STANDARD.encode("<div>hi</div>");
        let rc = ResourceContents {
            uri: "ui://widget/a".into(),
            mime_type: Some("text/html".into()),
            text: None,
            blob: Some(encoded),
        };
        assert_eq!(rc.decode_text().unwrap(), "<div>hi</div>");
    }

    #[test]
    fn neither_text_nor_blob_is_an_error() {
        let rc = ResourceContents {
            uri: "ui://widget/a".into(),
            mime_type: None,
            text: None,
            blob: None,
        };
        assert!(rc.decode_text().is_err());
    }
}
