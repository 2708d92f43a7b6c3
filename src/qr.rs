//! QR rendering for ticket deep links.
//!
//! The core only needs "payload in, renderable image out". The terminal
//! renderer draws the code as text blocks, which is what the console gateway
//! prints; a transport that uploads images supplies its own renderer.

use crate::queue::ticket::QueueNumber;

#[derive(Debug, thiserror::Error)]
pub enum QrError {
    #[error("Failed to render QR code: {0}")]
    Render(String),
}

/// A QR code ready to hand to the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedQr {
    /// Encoded payload (the deep link)
    pub payload: String,
    /// Terminal-printable rendering
    pub art: String,
}

/// QR renderer abstraction
pub trait QrRenderer: Send + Sync + 'static {
    fn render(&self, payload: &str) -> Result<RenderedQr, QrError>;
}

/// Renders with `qr2term`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalQrRenderer;

impl QrRenderer for TerminalQrRenderer {
    fn render(&self, payload: &str) -> Result<RenderedQr, QrError> {
        let art = qr2term::generate_qr_string(payload).map_err(|e| QrError::Render(e.to_string()))?;
        Ok(RenderedQr {
            payload: payload.to_string(),
            art,
        })
    }
}

/// Deep link that resolves straight to a ticket: `<base>?start=<queue_number>`.
pub fn deep_link(base_url: &str, queue_number: &QueueNumber) -> String {
    format!("{}?start={}", base_url.trim_end_matches('/'), queue_number)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deep_link_embeds_queue_number() {
        let link = deep_link("https://t.me/speedwash_bot", &QueueNumber::new("20240101-001"));
        assert_eq!(link, "https://t.me/speedwash_bot?start=20240101-001");
    }

    #[test]
    fn test_deep_link_trims_trailing_slash() {
        let link = deep_link("https://t.me/speedwash_bot/", &QueueNumber::new("20240101-001"));
        assert_eq!(link, "https://t.me/speedwash_bot?start=20240101-001");
    }

    #[test]
    fn test_terminal_renderer_keeps_payload() {
        let qr = TerminalQrRenderer
            .render("https://t.me/speedwash_bot?start=20240101-001")
            .unwrap();
        assert_eq!(qr.payload, "https://t.me/speedwash_bot?start=20240101-001");
        assert!(!qr.art.is_empty());
    }
}
