//! Data structures describing what ends up on a letter page.
//!
//! The letter layout is expressed as an ordered list of [`DrawCommand`]s with absolute positions
//! in millimetres.  The types do not reference `genpdf`, so a layout can be recorded and
//! inspected without producing a PDF; [`crate::elements`] replays them on real pages.

use std::path::PathBuf;

/// Horizontal placement of text inside its cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HorizontalAlignment {
    /// Left aligned content.
    #[default]
    Left,
    /// Center aligned content.
    Center,
    /// Right aligned content.
    Right,
}

/// Frame lines drawn around a text block.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Border {
    #[default]
    None,
    /// A rule below the last line of the block.
    Bottom,
}

/// Weight of the active font.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FontStyle {
    #[default]
    Regular,
    Bold,
}

/// A block of text that wraps inside a fixed width, one cell of `line_height` per line.
///
/// A `width` of zero extends the block up to the right margin.
#[derive(Clone, Debug, PartialEq)]
pub struct TextBlock {
    pub width: f64,
    pub line_height: f64,
    pub text: String,
    pub border: Border,
    pub alignment: HorizontalAlignment,
}

impl TextBlock {
    /// Creates a borderless, left aligned block.
    pub fn new(width: f64, line_height: f64, text: impl Into<String>) -> Self {
        Self {
            width,
            line_height,
            text: text.into(),
            border: Border::None,
            alignment: HorizontalAlignment::Left,
        }
    }

    /// Sets the border and returns the updated block.
    pub fn with_border(mut self, border: Border) -> Self {
        self.border = border;
        self
    }

    /// Sets the alignment and returns the updated block.
    pub fn with_alignment(mut self, alignment: HorizontalAlignment) -> Self {
        self.alignment = alignment;
        self
    }
}

/// One step of a page layout.
#[derive(Clone, Debug, PartialEq)]
pub enum DrawCommand {
    /// Page margins; the top margin is where text continues after a page break.
    SetMargins { left: f64, top: f64, right: f64 },
    /// Moves the cursor to an absolute position.
    SetPosition { x: f64, y: f64 },
    /// Moves the cursor horizontally.
    SetX(f64),
    /// Changes the active font weight and size (points).
    SetFont { style: FontStyle, size: f64 },
    /// Draws a wrapping text block at the cursor.
    Text(TextBlock),
    /// Draws the image file at the cursor and moves the cursor below it.
    Image(PathBuf),
    /// Moves the cursor to the left margin, `height` further down.
    LineFeed(f64),
}
