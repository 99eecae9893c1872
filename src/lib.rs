//! Core of the `left` letter generator: turns plain-text letters into PDF documents.

pub mod builder;
pub mod config;
pub mod elements;
pub mod error;
pub mod fonts;
pub mod letter;
pub mod model;
pub mod parser;
pub mod sink;
pub mod transcode;

pub use config::Config;
pub use error::{LetterError, Result};
pub use letter::{empty_letter, render, render_str};
