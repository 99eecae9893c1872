//! Font resolution and loading.
//!
//! A letter names its font through `FontName`.  The name is looked up, case-insensitively, among
//! an imported external family, the bundled families and the PDF builtin faces, in that order.
//! Bundled fonts are not compiled into the binary; they are read from a font directory that is
//! searched in the following order:
//!
//! 1. the directory named by the `LEFT_FONTS_DIR` environment variable,
//! 2. `assets/fonts` next to the executable,
//! 3. `assets/fonts` inside the crate sources.

use std::env;
use std::io;
use std::path::{Path, PathBuf};

use genpdf::error::Error;
use genpdf::fonts::{FontData, FontFamily};
use log::debug;
use printpdf::BuiltinFont;

use crate::config::{Config, FontImport};
use crate::error::{LetterError, Result};

/// Environment variable overriding the bundled font directory.
pub const FONTS_DIR_ENV: &str = "LEFT_FONTS_DIR";

/// A font family shipped in the bundled font directory.
#[derive(Debug, PartialEq, Eq)]
pub struct BundledFamily {
    pub name: &'static str,
    pub regular: &'static str,
    pub bold: &'static str,
}

pub const DEJAVU_SANS_CONDENSED: BundledFamily = BundledFamily {
    name: "DejaVuSansCondensed",
    regular: "DejaVuSansCondensed.ttf",
    bold: "DejaVuSansCondensed-Bold.ttf",
};

pub const FREE_SERIF: BundledFamily = BundledFamily {
    name: "FreeSerif",
    regular: "FreeSerif.ttf",
    bold: "FreeSerifBold.ttf",
};

pub const BUNDLED_FAMILIES: &[&BundledFamily] = &[&DEJAVU_SANS_CONDENSED, &FREE_SERIF];

/// The standard PDF faces that every viewer provides.  They only cover WinAnsi text.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BuiltinFace {
    Helvetica,
    Times,
    Courier,
}

impl BuiltinFace {
    fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "helvetica" | "arial" => Some(Self::Helvetica),
            "times" => Some(Self::Times),
            "courier" => Some(Self::Courier),
            _ => None,
        }
    }

    /// Bundled family whose metrics approximate the builtin face.
    fn metrics(self) -> &'static BundledFamily {
        match self {
            Self::Helvetica | Self::Courier => &DEJAVU_SANS_CONDENSED,
            Self::Times => &FREE_SERIF,
        }
    }

    /// The standard PDF font drawing this face in the given style.
    pub fn pdf_font(self, bold: bool, italic: bool) -> BuiltinFont {
        match (self, bold, italic) {
            (Self::Helvetica, false, false) => BuiltinFont::Helvetica,
            (Self::Helvetica, true, false) => BuiltinFont::HelveticaBold,
            (Self::Helvetica, false, true) => BuiltinFont::HelveticaOblique,
            (Self::Helvetica, true, true) => BuiltinFont::HelveticaBoldOblique,
            (Self::Times, false, false) => BuiltinFont::TimesRoman,
            (Self::Times, true, false) => BuiltinFont::TimesBold,
            (Self::Times, false, true) => BuiltinFont::TimesItalic,
            (Self::Times, true, true) => BuiltinFont::TimesBoldItalic,
            (Self::Courier, false, false) => BuiltinFont::Courier,
            (Self::Courier, true, false) => BuiltinFont::CourierBold,
            (Self::Courier, false, true) => BuiltinFont::CourierOblique,
            (Self::Courier, true, true) => BuiltinFont::CourierBoldOblique,
        }
    }
}

/// Where the glyphs of a resolved font come from.
#[derive(Clone, Debug, PartialEq)]
pub enum FontSource {
    Bundled(&'static BundledFamily),
    External(FontImport),
    Builtin {
        face: BuiltinFace,
        metrics: &'static BundledFamily,
    },
}

/// The font a letter is rendered with.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedFont {
    /// The name as configured.
    pub name: String,
    pub source: FontSource,
}

impl ResolvedFont {
    /// Whether text can be drawn without transliteration.
    pub fn is_full_repertoire(&self) -> bool {
        !matches!(self.source, FontSource::Builtin { .. })
    }
}

/// Names of all fonts with full Unicode coverage: the bundled families plus the imported one.
pub fn full_repertoire_names(import: Option<&FontImport>) -> Vec<String> {
    BUNDLED_FAMILIES
        .iter()
        .map(|family| family.name.to_lowercase())
        .chain(import.map(|import| import.name.to_lowercase()))
        .collect()
}

/// Resolves the configured `FontName`.
pub fn resolve(config: &Config) -> Result<ResolvedFont> {
    let wanted = config.font_name.to_lowercase();

    let source = if let Some(import) = config
        .font_import
        .as_ref()
        .filter(|import| import.name.to_lowercase() == wanted)
    {
        FontSource::External(import.clone())
    } else if let Some(family) = BUNDLED_FAMILIES
        .iter()
        .copied()
        .find(|family| family.name.to_lowercase() == wanted)
    {
        FontSource::Bundled(family)
    } else if let Some(face) = BuiltinFace::from_name(&wanted) {
        FontSource::Builtin {
            face,
            metrics: face.metrics(),
        }
    } else {
        return Err(LetterError::UnknownFont(config.font_name.clone()));
    };

    debug!("Resolved font '{}' to {:?}", config.font_name, source);
    Ok(ResolvedFont {
        name: config.font_name.clone(),
        source,
    })
}

/// Directory holding the bundled fonts inside the crate sources.
pub fn bundled_fonts_source_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("assets/fonts")
}

fn font_directory_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    if let Some(path) = env::var_os(FONTS_DIR_ENV) {
        if !path.is_empty() {
            candidates.push(PathBuf::from(path));
        }
    }

    if let Ok(current_exe) = env::current_exe() {
        if let Some(bin_dir) = current_exe.parent() {
            let candidate = bin_dir.join("assets/fonts");
            if !candidates.contains(&candidate) {
                candidates.push(candidate);
            }
        }
    }

    let manifest_candidate = bundled_fonts_source_dir();
    if !candidates.contains(&manifest_candidate) {
        candidates.push(manifest_candidate);
    }

    candidates
}

fn missing_font_files(path: &Path) -> Vec<PathBuf> {
    BUNDLED_FAMILIES
        .iter()
        .flat_map(|family| [family.regular, family.bold])
        .map(|name| path.join(name))
        .filter(|candidate| !candidate.is_file())
        .collect()
}

/// Finds the first candidate directory that holds every bundled font file.
pub fn resolve_font_directory() -> std::result::Result<PathBuf, Error> {
    let mut attempts = Vec::new();

    for candidate in font_directory_candidates() {
        let exists = candidate.is_dir();
        let missing = missing_font_files(&candidate);

        if exists && missing.is_empty() {
            return Ok(candidate);
        }

        let reason = if !exists {
            format!("directory missing at {}", candidate.display())
        } else {
            let missing_list = missing
                .iter()
                .map(|path| path.file_name().unwrap_or_default().to_string_lossy())
                .collect::<Vec<_>>()
                .join(", ");
            format!("missing files [{}]", missing_list)
        };

        attempts.push(format!("{} ({})", candidate.display(), reason));
    }

    let summary = if attempts.is_empty() {
        "no search paths were available".to_owned()
    } else {
        attempts.join(", ")
    };

    Err(Error::new(
        format!(
            "Unable to locate bundled font directory. Checked: {}. See assets/fonts/README.md or set {}.",
            summary, FONTS_DIR_ENV
        ),
        io::Error::new(io::ErrorKind::NotFound, "bundled fonts directory not found"),
    ))
}

/// Indicates whether the bundled font directory can be found.
pub fn default_fonts_available() -> bool {
    resolve_font_directory().is_ok()
}

fn load_font(
    path: &Path,
    builtin: Option<BuiltinFont>,
    style: &str,
) -> std::result::Result<FontData, Error> {
    FontData::load(path, builtin).map_err(|err| {
        let io_kind = if path.is_file() {
            io::ErrorKind::Other
        } else {
            io::ErrorKind::NotFound
        };
        Error::new(
            format!("Failed to load {} font at {}: {}", style, path.display(), err),
            io::Error::new(io_kind, err.to_string()),
        )
    })
}

fn family_from_files(
    regular: &Path,
    bold: &Path,
    builtin: Option<BuiltinFace>,
) -> std::result::Result<FontFamily<FontData>, Error> {
    let face = |is_bold, is_italic| builtin.map(|face| face.pdf_font(is_bold, is_italic));
    // Letters never use italics; the italic slots measure with the upright files.
    Ok(FontFamily {
        regular: load_font(regular, face(false, false), "regular")?,
        bold: load_font(bold, face(true, false), "bold")?,
        italic: load_font(regular, face(false, true), "italic")?,
        bold_italic: load_font(bold, face(true, true), "bold italic")?,
    })
}

/// Loads the glyph data of `font` as a `genpdf` font family.
pub fn load_family(font: &ResolvedFont) -> std::result::Result<FontFamily<FontData>, Error> {
    match &font.source {
        FontSource::Bundled(family) => {
            let directory = resolve_font_directory()?;
            family_from_files(
                &directory.join(family.regular),
                &directory.join(family.bold),
                None,
            )
        }
        FontSource::External(import) => {
            family_from_files(&import.regular_path(), &import.bold_path(), None)
        }
        FontSource::Builtin { face, metrics } => {
            let directory = resolve_font_directory()?;
            family_from_files(
                &directory.join(metrics.regular),
                &directory.join(metrics.bold),
                Some(*face),
            )
        }
    }
}
