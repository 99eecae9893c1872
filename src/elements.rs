//! `genpdf` element that replays a recorded letter layout.
//!
//! `genpdf` lays elements out in a vertical flow, while a letter places its blocks at fixed
//! positions.  [`ScriptedPage`] bridges the two: it occupies whole pages and draws the
//! [`DrawCommand`]s with a cursor of its own, wrapping text with the font metrics of the render
//! context.  When a line would cross the bottom break margin the element reports `has_more` and
//! continues at the top margin of the next page.

use std::path::Path;

use image::GenericImageView;

use genpdf::elements::Image;
use genpdf::error::{Context as _, Error, ErrorKind};
use genpdf::style::{Style, StyledString};
use genpdf::{render, Element, Mm, Position, RenderResult, Scale, Size};

use crate::model::{Border, DrawCommand, FontStyle, HorizontalAlignment, TextBlock};

/// Resolution images are placed with when no size is given.
const IMAGE_DPI: f64 = 96.0;
/// Resolution `genpdf` assumes for unscaled images.
const GENPDF_IMAGE_DPI: f64 = 300.0;
const MM_PER_INCH: f64 = 25.4;
/// Horizontal padding between a cell edge and its text.
const CELL_PADDING_MM: f64 = 1.0;
/// Distance from the page bottom at which text continues on a new page.
const PAGE_BREAK_MARGIN_MM: f64 = 20.0;

fn mm_from_f64(value: f64) -> Mm {
    Mm::from(printpdf::Mm(value))
}

fn mm_to_f64(value: Mm) -> f64 {
    let mm: printpdf::Mm = value.into();
    mm.0
}

fn position(x: f64, y: f64) -> Position {
    Position::new(mm_from_f64(x), mm_from_f64(y))
}

fn estimated_image_size(image: &image::DynamicImage, dpi: f64) -> Size {
    let (px_width, px_height) = image.dimensions();
    let width_mm = MM_PER_INCH * (px_width as f64) / dpi;
    let height_mm = MM_PER_INCH * (px_height as f64) / dpi;
    Size::new(mm_from_f64(width_mm), mm_from_f64(height_mm))
}

/// Loads an image from the given path using the [`image`] crate with descriptive errors.
pub fn decode_image_from_path(path: impl AsRef<Path>) -> Result<image::DynamicImage, Error> {
    let path = path.as_ref();
    let reader = image::io::Reader::open(path)
        .with_context(|| format!("Failed to open image file {}", path.display()))?;
    reader
        .with_guessed_format()
        .context("Unable to determine image format")?
        .decode()
        .with_context(|| format!("Failed to decode image file {}", path.display()))
}

/// `genpdf` rejects images with an alpha channel.
fn without_alpha(image: image::DynamicImage) -> image::DynamicImage {
    if image.color().has_alpha() {
        image::DynamicImage::ImageRgb8(image.to_rgb8())
    } else {
        image
    }
}

fn font_size_points(size: f64) -> u8 {
    size.round().clamp(1.0, f64::from(u8::MAX)) as u8
}

fn text_width(context: &genpdf::Context, style: Style, text: &str) -> f64 {
    mm_to_f64(StyledString::new(text.to_owned(), style).width(&context.font_cache))
}

/// Byte index of the longest prefix of `text` (at least one character) that fits `max_width`.
fn fitting_prefix(context: &genpdf::Context, style: Style, text: &str, max_width: f64) -> usize {
    let mut indices = text.char_indices().map(|(index, _)| index).skip(1);
    let mut end = indices.next().unwrap_or(text.len());
    for index in indices {
        if text_width(context, style, &text[..index]) > max_width {
            break;
        }
        end = index;
    }
    end
}

/// Splits `text` into lines no wider than `max_width`, breaking at spaces where possible and
/// inside words where a single word is too wide.  Explicit newlines always break.
fn wrap_text(context: &genpdf::Context, style: Style, text: &str, max_width: f64) -> Vec<String> {
    let mut lines = Vec::new();

    for paragraph in text.split('\n') {
        let mut current = String::new();
        for (index, word) in paragraph.split(' ').enumerate() {
            if index == 0 {
                current.push_str(word);
            } else {
                let candidate = format!("{} {}", current, word);
                if text_width(context, style, &candidate) <= max_width {
                    current = candidate;
                } else {
                    lines.push(std::mem::replace(&mut current, word.to_owned()));
                }
            }

            while current.chars().nth(1).is_some()
                && text_width(context, style, &current) > max_width
            {
                let split = fitting_prefix(context, style, &current, max_width);
                let rest = current.split_off(split);
                lines.push(std::mem::replace(&mut current, rest));
            }
        }
        lines.push(current);
    }

    lines
}

#[derive(Clone, Copy, Debug, Default)]
struct Cursor {
    x: f64,
    y: f64,
}

#[derive(Clone, Copy, Debug, Default)]
struct PageMargins {
    left: f64,
    top: f64,
    right: f64,
}

#[derive(Clone, Copy, Debug)]
struct FontSelection {
    style: FontStyle,
    size: f64,
}

/// Wrapped lines of a text block that did not fit on the previous page.
struct PendingBlock {
    lines: Vec<String>,
    x: f64,
    width: f64,
}

/// Replays [`DrawCommand`]s with absolute positioning; see the module documentation.
pub struct ScriptedPage {
    commands: Vec<DrawCommand>,
    next: usize,
    cursor: Cursor,
    margins: PageMargins,
    font: FontSelection,
    pending: Option<PendingBlock>,
    continued: bool,
}

impl ScriptedPage {
    pub fn new(commands: Vec<DrawCommand>) -> Self {
        Self {
            commands,
            next: 0,
            cursor: Cursor::default(),
            margins: PageMargins::default(),
            font: FontSelection {
                style: FontStyle::Regular,
                size: 12.0,
            },
            pending: None,
            continued: false,
        }
    }

    fn text_style(&self, base: Style) -> Style {
        let mut style = base;
        style.set_font_size(font_size_points(self.font.size));
        if self.font.style == FontStyle::Bold {
            style.set_bold();
        }
        style
    }

    fn layout_block(
        &self,
        context: &genpdf::Context,
        style: Style,
        block: &TextBlock,
        page_width: f64,
    ) -> PendingBlock {
        let width = if block.width == 0.0 {
            page_width - self.margins.right - self.cursor.x
        } else {
            block.width
        };
        let lines = wrap_text(
            context,
            style,
            &block.text,
            width - 2.0 * CELL_PADDING_MM,
        );
        PendingBlock {
            lines,
            x: self.cursor.x,
            width,
        }
    }

    /// Draws the lines of `pending`; returns `false` when the page is full.
    fn draw_block(
        &mut self,
        context: &genpdf::Context,
        area: &render::Area<'_>,
        style: Style,
        block: &TextBlock,
        pending: PendingBlock,
        break_at: f64,
    ) -> Result<bool, Error> {
        let line_height = block.line_height;
        let line_box = mm_to_f64(style.line_height(&context.font_cache));

        for (index, line) in pending.lines.iter().enumerate() {
            let at_page_top = self.cursor.y <= self.margins.top;
            if self.cursor.y + line_height > break_at && !at_page_top {
                self.pending = Some(PendingBlock {
                    lines: pending.lines[index..].to_vec(),
                    x: pending.x,
                    width: pending.width,
                });
                return Ok(false);
            }

            let width = text_width(context, style, line);
            let offset = match block.alignment {
                HorizontalAlignment::Left => CELL_PADDING_MM,
                HorizontalAlignment::Center => (pending.width - width) / 2.0,
                HorizontalAlignment::Right => pending.width - CELL_PADDING_MM - width,
            };
            let top = self.cursor.y + (line_height - line_box) / 2.0;
            let printed = area.print_str(
                &context.font_cache,
                position(pending.x + offset, top),
                style,
                line,
            )?;
            if !printed {
                return Err(Error::new(
                    format!(
                        "Line height of {} mm does not fit on the page: {}",
                        line_height, line
                    ),
                    ErrorKind::PageSizeExceeded,
                ));
            }
            self.cursor.y += line_height;
        }

        if block.border == Border::Bottom {
            area.draw_line(
                vec![
                    position(pending.x, self.cursor.y),
                    position(pending.x + pending.width, self.cursor.y),
                ],
                Style::new(),
            );
        }

        self.cursor.x = self.margins.left;
        Ok(true)
    }

    fn draw_image(
        &mut self,
        context: &genpdf::Context,
        area: &render::Area<'_>,
        style: Style,
        path: &Path,
    ) -> Result<(), Error> {
        let image = without_alpha(decode_image_from_path(path)?);
        let size = estimated_image_size(&image, IMAGE_DPI);
        let scale = GENPDF_IMAGE_DPI / IMAGE_DPI;

        let mut element = Image::from_dynamic_image(image)?;
        element.set_position(position(self.cursor.x, self.cursor.y));
        element.set_scale(Scale::new(scale, scale));
        element.render(context, area.clone(), style)?;

        self.cursor.y += mm_to_f64(size.height);
        Ok(())
    }
}

impl Element for ScriptedPage {
    fn render(
        &mut self,
        context: &genpdf::Context,
        area: render::Area<'_>,
        style: Style,
    ) -> Result<RenderResult, Error> {
        let page = area.size();
        let page_width = mm_to_f64(page.width);
        let break_at = mm_to_f64(page.height) - PAGE_BREAK_MARGIN_MM;

        let mut result = RenderResult::default();
        result.size = page;

        if self.continued {
            self.cursor.y = self.margins.top;
            self.continued = false;
        }

        while let Some(command) = self.commands.get(self.next).cloned() {
            match command {
                DrawCommand::SetMargins { left, top, right } => {
                    self.margins = PageMargins { left, top, right };
                }
                DrawCommand::SetPosition { x, y } => self.cursor = Cursor { x, y },
                DrawCommand::SetX(x) => self.cursor.x = x,
                DrawCommand::SetFont { style, size } => self.font = FontSelection { style, size },
                DrawCommand::Text(block) => {
                    let text_style = self.text_style(style);
                    let pending = match self.pending.take() {
                        Some(pending) => pending,
                        None => self.layout_block(context, text_style, &block, page_width),
                    };
                    if !self.draw_block(context, &area, text_style, &block, pending, break_at)? {
                        self.continued = true;
                        result.has_more = true;
                        return Ok(result);
                    }
                }
                DrawCommand::Image(path) => self.draw_image(context, &area, style, &path)?,
                DrawCommand::LineFeed(height) => {
                    self.cursor.x = self.margins.left;
                    self.cursor.y += height;
                }
            }
            self.next += 1;
        }

        Ok(result)
    }
}
