//! Embedded static assets served by the web gateway
//!
//! The page content itself is owned by the UI side of the project; the
//! engine only hands out the bytes.

/// Phone-facing dashboard, served on `/` and `/index.html`
pub static INDEX_HTML: &str = include_str!("../assets/index.html");
