//! Modelshot: put a product on a model photo with a Gemini image model,
//! then tune the result with cosmetic filters and export it.
//!
//! The [`session::Studio`] holds the whole client session. A generation is
//! started with [`session::Studio::begin_generation`], run detached with
//! [`session::PendingGeneration::run`] and settled with
//! [`session::Studio::finish_generation`]; [`session::Studio::generate`]
//! does all three in one call.

pub mod background;
pub mod config;
pub mod demo;
pub mod encoding;
pub mod export;
pub mod filters;
pub mod gemini;
pub mod models;
pub mod preview;
pub mod session;
pub mod status;
pub mod view;

use std::sync::Arc;

pub use config::Config;
pub use gemini::{GeminiClient, GeminiError, Synthesizer};
pub use session::{GenerateError, Studio};

/// The real client when a key is configured, the offline demo otherwise.
pub fn synthesizer_for(config: &Config, client: reqwest::Client) -> Arc<dyn Synthesizer> {
    match &config.api_key {
        Some(key) => Arc::new(GeminiClient::new(client, key.clone(), config)),
        None => Arc::new(demo::DemoSynthesizer),
    }
}
