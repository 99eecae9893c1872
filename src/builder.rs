//! Document construction and the PDF producing [`RenderSink`].

use std::io::Write;
use std::path::Path;

use genpdf::error::{Error, ErrorKind};
use genpdf::fonts::{FontData, FontFamily};
use genpdf::{style, PageDecorator, PaperSize, Size};
use log::debug;
use tempfile::NamedTempFile;

use crate::elements::ScriptedPage;
use crate::error::{LetterError, Result};
use crate::fonts::{self, ResolvedFont};
use crate::model::{FontStyle, TextBlock};
use crate::sink::{PageScript, RenderSink};

/// Builder for `genpdf::Document` instances laid out for letters.
#[derive(Default)]
pub struct DocumentBuilder {
    paper_size: Option<Size>,
    title: Option<String>,
}

impl DocumentBuilder {
    /// Creates a new builder instance with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the paper size; A4 portrait when unset.
    pub fn with_paper_size(mut self, paper_size: impl Into<Size>) -> Self {
        self.paper_size = Some(paper_size.into());
        self
    }

    /// Sets the document title stored in the PDF metadata.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Builds a document using `font_family` as its only font.
    pub fn build(self, font_family: FontFamily<FontData>) -> genpdf::Document {
        let mut document = genpdf::Document::new(font_family);
        document.set_paper_size(
            self.paper_size
                .unwrap_or_else(|| Size::from(PaperSize::A4)),
        );
        if let Some(title) = self.title {
            document.set_title(title);
        }
        document.set_page_decorator(LetterPageDecorator::default());
        document
    }
}

/// Hands the complete page to the content; letter elements position themselves absolutely.
#[derive(Default)]
struct LetterPageDecorator {
    page: usize,
}

impl PageDecorator for LetterPageDecorator {
    fn decorate_page<'a>(
        &mut self,
        _context: &genpdf::Context,
        area: genpdf::render::Area<'a>,
        _style: style::Style,
    ) -> std::result::Result<genpdf::render::Area<'a>, Error> {
        self.page += 1;
        debug!("Starting page {}", self.page);
        Ok(area)
    }
}

/// A [`RenderSink`] that records the layout and renders it into a PDF file on
/// [`RenderSink::finish`].
#[derive(Default)]
pub struct PdfSink {
    script: PageScript,
    title: Option<String>,
}

impl PdfSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the document title and returns the updated sink.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Renders everything drawn so far into PDF bytes.
    pub fn render_bytes(&self) -> Result<Vec<u8>> {
        let font = self.script.font().ok_or_else(|| {
            Error::new("No font selected before rendering", ErrorKind::InvalidData)
        })?;
        let family = fonts::load_family(font)?;

        let mut builder = DocumentBuilder::new().with_paper_size(PaperSize::A4);
        if let Some(title) = &self.title {
            builder = builder.with_title(title.clone());
        }
        let mut document = builder.build(family);
        document.push(ScriptedPage::new(self.script.commands().to_vec()));

        let mut bytes = Vec::new();
        document.render(&mut bytes)?;
        Ok(bytes)
    }
}

impl RenderSink for PdfSink {
    fn use_font(&mut self, font: &ResolvedFont) -> Result<()> {
        self.script.use_font(font)
    }

    fn set_margins(&mut self, left: f64, top: f64, right: f64) {
        self.script.set_margins(left, top, right);
    }

    fn set_position(&mut self, x: f64, y: f64) {
        self.script.set_position(x, y);
    }

    fn set_x(&mut self, x: f64) {
        self.script.set_x(x);
    }

    fn set_font(&mut self, style: FontStyle, size: f64) {
        self.script.set_font(style, size);
    }

    fn text_block(&mut self, block: TextBlock) {
        self.script.text_block(block);
    }

    fn image(&mut self, path: &Path) {
        self.script.image(path);
    }

    fn line_feed(&mut self, height: f64) {
        self.script.line_feed(height);
    }

    fn finish(&mut self, output: &Path) -> Result<()> {
        let bytes = self.render_bytes()?;
        write_atomically(output, &bytes)?;
        self.script.finish(output)
    }
}

/// Writes `bytes` to a temporary file next to `path` and moves it into place, so a failed write
/// never leaves a truncated file at `path`.
fn write_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    let output_error = |source| LetterError::Output {
        path: path.to_owned(),
        source,
    };

    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file = NamedTempFile::new_in(directory).map_err(output_error)?;
    file.write_all(bytes).map_err(output_error)?;
    file.persist(path).map_err(|err| output_error(err.error))?;
    debug!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}
