//! # gateflag-template
//!
//! Loads the global and per-team CloudFormation templates, fills in their
//! literal placeholder tokens, and performs the structural image-reference
//! edit used by rollback.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use gateflag_core::Config;
//! use gateflag_template::TemplateEngine;
//!
//! fn print_all(config: &Config) {
//!     if let Ok(engine) = TemplateEngine::load(config) {
//!         for rendered in engine.render_all() {
//!             println!("{}: {} bytes", rendered.identity, rendered.body.len());
//!         }
//!     }
//! }
//! ```

pub mod context;
pub mod engine;
pub mod error;
pub mod image;

pub use context::TemplateContext;
pub use engine::{RenderedTemplate, TemplateEngine};
pub use error::TemplateError;
pub use image::{current_image_ref, effective_image, toggle_image, ImageToggle, TemplateFormat};
