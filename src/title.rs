//! Post titles double as a small JSON document.
//!
//! Posts written by the client store `{"dt": .., "tg": .., "dd": ..}` in the
//! backend's single `title` column; older posts used `tt` for the title, and
//! posts created elsewhere carry plain text.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostTitle {
    #[serde(default, rename = "dt", skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, rename = "tg", skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default, rename = "dd", skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, rename = "tt", skip_serializing_if = "Option::is_none")]
    pub legacy_title: Option<String>,
    #[serde(skip)]
    raw: String,
}

impl PostTitle {
    pub fn new(title: &str, tag: &str, body: &str) -> Self {
        Self {
            title: Some(title.to_string()),
            tag: Some(tag.to_string()),
            body: Some(body.to_string()),
            legacy_title: None,
            raw: String::new(),
        }
    }

    pub fn decode(raw: &str) -> Self {
        let trimmed = raw.trim_start();
        if trimmed.starts_with('{') {
            if let Ok(mut decoded) = serde_json::from_str::<PostTitle>(trimmed) {
                decoded.raw = raw.to_string();
                return decoded;
            }
        }
        Self {
            raw: raw.to_string(),
            ..Self::default()
        }
    }

    pub fn encode(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| self.headline().to_string())
    }

    pub fn headline(&self) -> &str {
        self.title
            .as_deref()
            .filter(|title| !title.is_empty())
            .or(self.legacy_title.as_deref())
            .unwrap_or(&self.raw)
    }

    pub fn tag(&self) -> &str {
        self.tag.as_deref().unwrap_or_default()
    }

    pub fn body(&self) -> &str {
        self.body.as_deref().unwrap_or_default()
    }
}
