//! Turns a letter file into a PDF.
//!
//! [`render`] runs the whole pipeline: the file is split into its sections, the inline
//! configuration is merged onto the base configuration, the font is resolved, display text is
//! transcoded for that font and [`layout`] emits the page through a [`RenderSink`].

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use log::info;

use crate::builder::PdfSink;
use crate::config::Config;
use crate::error::{LetterError, Result};
use crate::fonts::{self, ResolvedFont};
use crate::model::{Border, FontStyle, HorizontalAlignment, TextBlock};
use crate::parser::{self, ParsedLetter};
use crate::sink::RenderSink;
use crate::transcode::{self, Transcoder};

/// Top page margin; continued pages start here.
pub const TOP_MARGIN_MM: f64 = 20.0;

/// A parsed letter with its effective configuration, ready to be laid out.
#[derive(Clone, Debug, PartialEq)]
pub struct PreparedLetter {
    /// Sections with display text already transcoded.
    pub letter: ParsedLetter,
    /// Effective configuration with display text already transcoded.
    pub config: Config,
    pub font: ResolvedFont,
    pub transcoder: Transcoder,
}

/// Merges the inline configuration of `parsed` onto `base`, resolves the font and transcodes
/// every piece of display text.  `origin` names the letter in configuration errors.
pub fn prepare(parsed: ParsedLetter, base: &Config, origin: &str) -> Result<PreparedLetter> {
    let mut config = base.clone();
    config.merge_json(&parsed.config_json, origin)?;

    let font = fonts::resolve(&config)?;
    let repertoire = fonts::full_repertoire_names(config.font_import.as_ref());
    let transcoder = Transcoder::select(&config.font_name, &repertoire);
    let (letter, config) = transcode::transcode_letter(&parsed, &config, transcoder);

    Ok(PreparedLetter {
        letter,
        config,
        font,
        transcoder,
    })
}

/// Emits the letter page in its fixed order.
pub fn layout<S: RenderSink + ?Sized>(prepared: &PreparedLetter, sink: &mut S) -> Result<()> {
    let config = &prepared.config;
    let letter = &prepared.letter;

    sink.use_font(&prepared.font)?;
    sink.set_margins(config.margins, TOP_MARGIN_MM, config.margins);

    // Sender
    sink.set_position(config.address_section_x, config.address_section_y);
    sink.set_font(FontStyle::Bold, config.font_size_sender);
    sink.text_block(
        TextBlock::new(
            config.address_section_w,
            config.line_height_address,
            config.sender.join(", "),
        )
        .with_border(Border::Bottom),
    );

    // Recipient
    sink.set_font(FontStyle::Regular, config.font_size_address);
    for line in &letter.address {
        sink.set_x(config.address_section_x);
        sink.text_block(TextBlock::new(
            config.address_section_w,
            config.line_height_address,
            line.as_str(),
        ));
    }

    sink.set_font(FontStyle::Regular, config.font_size);
    sink.set_position(config.margins, config.date_y);
    sink.text_block(
        TextBlock::new(
            0.0,
            config.line_height,
            format!("{}{}", config.date_prefix, config.date),
        )
        .with_alignment(HorizontalAlignment::Right),
    );

    sink.set_font(FontStyle::Bold, config.font_size);
    sink.set_position(config.margins, config.date_y + config.line_height);
    sink.text_block(TextBlock::new(
        0.0,
        config.line_height,
        letter.subject.as_str(),
    ));
    sink.set_font(FontStyle::Regular, config.font_size);
    sink.line_feed(config.line_height);

    for line in &letter.body {
        sink.set_x(config.margins);
        sink.text_block(TextBlock::new(0.0, config.line_height, line.as_str()));
    }

    let signature = config.signature_or_empty();
    if !signature.is_empty() {
        sink.image(Path::new(signature));
    }
    sink.line_feed(config.line_height);
    sink.text_block(TextBlock::new(
        0.0,
        config.line_height,
        config.sender_name_or_empty(),
    ));

    Ok(())
}

/// The PDF written for `input`: the same path with its extension replaced by `pdf`.
pub fn output_path(input: &Path) -> PathBuf {
    input.with_extension("pdf")
}

/// Renders the letter file at `input` on top of `base` and returns the path of the written PDF.
pub fn render(input: &Path, base: &Config) -> Result<PathBuf> {
    let file = File::open(input).map_err(|source| LetterError::InputOpen {
        path: input.to_owned(),
        source,
    })?;
    let parsed = parser::parse_reader(BufReader::new(file))?;
    let prepared = prepare(parsed, base, &format!("letter {}", input.display()))?;

    let output = output_path(input);
    let mut sink = PdfSink::new().with_title(prepared.letter.subject.clone());
    layout(&prepared, &mut sink)?;
    sink.finish(&output)?;

    info!("Rendered {} to {}", input.display(), output.display());
    Ok(output)
}

/// Renders letter text held in memory into PDF bytes.
pub fn render_str(text: &str, base: &Config) -> Result<Vec<u8>> {
    let parsed = parser::parse(text.lines())?;
    let prepared = prepare(parsed, base, "letter")?;

    let mut sink = PdfSink::new().with_title(prepared.letter.subject.clone());
    layout(&prepared, &mut sink)?;
    sink.render_bytes()
}

/// A new letter with explanatory notes, the given configuration and placeholder sections.
pub fn empty_letter(config: &Config) -> Result<String> {
    let dump = config.to_json_pretty()?;

    let mut letter = String::new();
    letter.push_str(
        "You can put random notes here. Anything before the first section will be ignored.\n",
    );
    letter.push_str("Config sections are started with a line that begins with //\n");
    letter.push_str("// config\n");
    letter.push_str(&dump);
    letter.push('\n');
    letter.push_str("// address\nName\nStreet\nCity\n");
    letter.push_str("// subject\n");
    letter.push_str("Add your subject here. This section must not have more than one line.\n");
    letter.push_str("// body\n");
    letter.push_str("Dear sir or madam,\n\n\n\nKind regards,\n");
    Ok(letter)
}
