//! The narrow drawing interface the letter layout is written against.

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::fonts::ResolvedFont;
use crate::model::{DrawCommand, FontStyle, TextBlock};

/// Receives the layout of a letter.  Coordinates are millimetres from the top left corner of an
/// A4 portrait page.
pub trait RenderSink {
    /// Selects the font family used for all text.
    fn use_font(&mut self, font: &ResolvedFont) -> Result<()>;

    fn set_margins(&mut self, left: f64, top: f64, right: f64);

    fn set_position(&mut self, x: f64, y: f64);

    fn set_x(&mut self, x: f64);

    fn set_font(&mut self, style: FontStyle, size: f64);

    /// Draws a wrapping text block at the cursor.
    fn text_block(&mut self, block: TextBlock);

    /// Draws an image file at the cursor.
    fn image(&mut self, path: &Path);

    /// Moves the cursor to the left margin, `height` further down.
    fn line_feed(&mut self, height: f64);

    /// Completes the document and writes it to `output`.
    fn finish(&mut self, output: &Path) -> Result<()>;
}

/// A sink that only records what it is asked to draw.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PageScript {
    font: Option<ResolvedFont>,
    commands: Vec<DrawCommand>,
    output: Option<PathBuf>,
}

impl PageScript {
    pub fn new() -> Self {
        Self::default()
    }

    /// The font selected through [`RenderSink::use_font`].
    pub fn font(&self) -> Option<&ResolvedFont> {
        self.font.as_ref()
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    /// The destination passed to [`RenderSink::finish`], if finished.
    pub fn output(&self) -> Option<&Path> {
        self.output.as_deref()
    }

    /// Texts of all recorded text blocks, in drawing order.
    pub fn texts(&self) -> Vec<&str> {
        self.commands
            .iter()
            .filter_map(|command| match command {
                DrawCommand::Text(block) => Some(block.text.as_str()),
                _ => None,
            })
            .collect()
    }

    fn push(&mut self, command: DrawCommand) {
        self.commands.push(command);
    }
}

impl RenderSink for PageScript {
    fn use_font(&mut self, font: &ResolvedFont) -> Result<()> {
        self.font = Some(font.clone());
        Ok(())
    }

    fn set_margins(&mut self, left: f64, top: f64, right: f64) {
        self.push(DrawCommand::SetMargins { left, top, right });
    }

    fn set_position(&mut self, x: f64, y: f64) {
        self.push(DrawCommand::SetPosition { x, y });
    }

    fn set_x(&mut self, x: f64) {
        self.push(DrawCommand::SetX(x));
    }

    fn set_font(&mut self, style: FontStyle, size: f64) {
        self.push(DrawCommand::SetFont { style, size });
    }

    fn text_block(&mut self, block: TextBlock) {
        self.push(DrawCommand::Text(block));
    }

    fn image(&mut self, path: &Path) {
        self.push(DrawCommand::Image(path.to_owned()));
    }

    fn line_feed(&mut self, height: f64) {
        self.push(DrawCommand::LineFeed(height));
    }

    fn finish(&mut self, output: &Path) -> Result<()> {
        self.output = Some(output.to_owned());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Border;

    #[test]
    fn records_commands_in_order() {
        let mut script = PageScript::new();
        script.set_margins(25.0, 20.0, 25.0);
        script.set_font(FontStyle::Bold, 12.0);
        script.text_block(TextBlock::new(0.0, 8.0, "Subject").with_border(Border::Bottom));
        script.line_feed(8.0);
        script.finish(Path::new("out.pdf")).expect("recording never fails");

        assert_eq!(script.commands().len(), 4);
        assert_eq!(script.texts(), vec!["Subject"]);
        assert_eq!(script.output(), Some(Path::new("out.pdf")));
        assert!(matches!(
            script.commands()[1],
            DrawCommand::SetFont {
                style: FontStyle::Bold,
                ..
            }
        ));
    }
}
