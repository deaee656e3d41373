//! Headless browser rendering over the Chrome DevTools Protocol
//!
//! Opens a DevTools WebSocket, loads a page in a fresh target, waits for it
//! to finish loading and hands back the JavaScript-rendered markup.
//!
//! The `Renderer` trait is the seam the HTTP front end depends on; tests
//! substitute their own implementation.

pub mod cdp;
pub mod renderer;

pub use cdp::{CDPClient, CDPSession};
pub use renderer::{CdpRenderer, RenderError, RenderedPage, Renderer, RendererConfig};
