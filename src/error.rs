//! Error types for the letter converter.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, LetterError>;

/// Everything that can stop a conversion.
#[derive(Error, Debug)]
pub enum LetterError {
    /// A configuration file exists but could not be read.
    #[error("Could not read file {}: {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A configuration layer is not valid JSON for the configuration fields.
    #[error("Could not parse {origin} as json: {source}")]
    ConfigParse {
        origin: String,
        #[source]
        source: serde_json::Error,
    },

    /// The effective configuration could not be written as JSON.
    #[error("Could not serialize the configuration: {0}")]
    ConfigSerialize(#[source] serde_json::Error),

    /// The input letter could not be opened.
    #[error("Could not open input file {}: {source}", path.display())]
    InputOpen {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Reading lines from the input letter failed midway.
    #[error("Could not read input: {source}")]
    InputRead {
        #[source]
        source: io::Error,
    },

    /// The input did not contain all four sections.
    #[error(
        "letters MUST have exactly four sections: config, address, subject, body (in this order), initiated by lines starting with //"
    )]
    MissingSections,

    /// The subject section holds more than one line.
    #[error("the subject section (third section) must only contain one single line")]
    MultilineSubject,

    /// The configured font name matches no bundled, imported or builtin font.
    #[error("Unknown font '{0}': not bundled, not imported and not a PDF builtin font")]
    UnknownFont(String),

    /// The PDF backend failed (fonts, images, layout).
    #[error("Failed to render PDF: {0}")]
    Render(#[from] genpdf::error::Error),

    /// The finished PDF could not be written to its destination.
    #[error("Could not write output file {}: {source}", path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
