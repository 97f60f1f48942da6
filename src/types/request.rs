//! Inbound request record
//!
//! Thin front-end adapters (chat, voice, API) all submit this shape.

use serde::{Deserialize, Serialize};

/// Front-end channel the request arrived on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Chat,
    Voice,
    Cli,
    Api,
}

/// One user question, as submitted by a front-end adapter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub user_id: String,
    pub text: String,
    /// OCR text from an attached photo (nameplate, fault screen), if any
    pub image_text: Option<String>,
    pub channel: Channel,
}

impl Request {
    pub fn new(user_id: impl Into<String>, text: impl Into<String>, channel: Channel) -> Self {
        Self {
            user_id: user_id.into(),
            text: text.into(),
            image_text: None,
            channel,
        }
    }

    /// Query text plus any attached image text, joined for analysis
    pub fn combined_text(&self) -> String {
        match &self.image_text {
            Some(image) if !image.trim().is_empty() => format!("{} {}", self.text, image),
            _ => self.text.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combined_text_without_image() {
        let req = Request::new("u1", "drive fault F0002", Channel::Chat);
        assert_eq!(req.combined_text(), "drive fault F0002");
    }

    #[test]
    fn test_combined_text_with_image() {
        let mut req = Request::new("u1", "what does this mean", Channel::Chat);
        req.image_text = Some("SINAMICS G120 F30005".to_string());
        assert_eq!(req.combined_text(), "what does this mean SINAMICS G120 F30005");
    }

    #[test]
    fn test_blank_image_text_ignored() {
        let mut req = Request::new("u1", "overload trips", Channel::Api);
        req.image_text = Some("   ".to_string());
        assert_eq!(req.combined_text(), "overload trips");
    }
}
