//! Conversion of letter text into the repertoire of the selected font.
//!
//! Bundled and imported TrueType fonts are embedded with full Unicode support, so their text
//! passes through untouched.  The PDF builtin faces only cover the Windows-1252 ("WinAnsi")
//! character set; text rendered with them is transliterated on a best-effort basis.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::config::Config;
use crate::parser::ParsedLetter;

/// Character used for text that has no WinAnsi equivalent.
pub const REPLACEMENT: char = '?';

/// Characters of Windows-1252 in the 0x80..=0x9F range.
const WIN_ANSI_EXTRAS: &[char] = &[
    '€', '‚', 'ƒ', '„', '…', '†', '‡', 'ˆ', '‰', 'Š', '‹', 'Œ', 'Ž', '‘', '’', '“', '”', '•', '–',
    '—', '˜', '™', 'š', '›', 'œ', 'ž', 'Ÿ',
];

/// Substitutions for characters that neither exist in WinAnsi nor decompose into it.
const SUBSTITUTIONS: &[(char, &str)] = &[
    ('\t', " "),
    ('\u{AD}', ""),
    ('\u{2010}', "-"),
    ('\u{2011}', "-"),
    ('\u{2012}', "–"),
    ('\u{2015}', "—"),
    ('\u{2212}', "-"),
    ('\u{201B}', "'"),
    ('\u{201F}', "\""),
    ('\u{2032}', "'"),
    ('\u{2033}', "\""),
    ('\u{2043}', "-"),
    ('\u{2190}', "<-"),
    ('\u{2192}', "->"),
    ('\u{2264}', "<="),
    ('\u{2265}', ">="),
    ('\u{2260}', "!="),
    ('Ł', "L"),
    ('ł', "l"),
    ('Đ', "D"),
    ('đ', "d"),
    ('Ħ', "H"),
    ('ħ', "h"),
    ('ı', "i"),
    ('ŀ', "l"),
    ('Ŀ', "L"),
];

/// Returns `true` if `c` can be drawn with a WinAnsi encoded builtin font.  Control characters
/// and the soft hyphen are not printable.
pub fn is_win_ansi(c: char) -> bool {
    let code = c as u32;
    (0x20..=0x7E).contains(&code)
        || ((0xA0..=0xFF).contains(&code) && code != 0xAD)
        || WIN_ANSI_EXTRAS.contains(&c)
}

/// Text conversion applied before drawing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transcoder {
    /// Text is drawn as written.
    Identity,
    /// Text is transliterated into the WinAnsi repertoire.
    WinAnsi,
}

impl Transcoder {
    /// Picks the identity pass when `font_name` (compared case-insensitively) is one of the
    /// full-repertoire fonts in `repertoire`.
    pub fn select<S: AsRef<str>>(font_name: &str, repertoire: &[S]) -> Self {
        let wanted = font_name.to_lowercase();
        if repertoire
            .iter()
            .any(|name| name.as_ref().to_lowercase() == wanted)
        {
            Self::Identity
        } else {
            Self::WinAnsi
        }
    }

    pub fn transcode(&self, text: &str) -> String {
        match self {
            Self::Identity => text.to_owned(),
            Self::WinAnsi => transliterate(text),
        }
    }

    pub fn transcode_all(&self, lines: &[String]) -> Vec<String> {
        lines.iter().map(|line| self.transcode(line)).collect()
    }
}

/// Maps `text` onto the WinAnsi repertoire.  Never fails; tabs become spaces, other control
/// characters are dropped and unmappable characters become [`REPLACEMENT`].
pub fn transliterate(text: &str) -> String {
    let mut output = String::with_capacity(text.len());
    for c in text.nfc() {
        if is_win_ansi(c) {
            output.push(c);
        } else if is_combining_mark(c) {
            // Left over after composition.
            continue;
        } else if let Some((_, replacement)) = SUBSTITUTIONS.iter().find(|(from, _)| *from == c) {
            output.push_str(replacement);
        } else if c.is_control() {
            continue;
        } else if let Some(decomposed) = decompose(c) {
            output.push_str(&decomposed);
        } else {
            output.push(REPLACEMENT);
        }
    }
    output
}

/// Compatibility decomposition without accents, if the result is fully representable.
fn decompose(c: char) -> Option<String> {
    let decomposed: String = std::iter::once(c)
        .nfkd()
        .filter(|d| !is_combining_mark(*d))
        .collect();
    if !decomposed.is_empty() && decomposed.chars().all(is_win_ansi) {
        Some(decomposed)
    } else {
        None
    }
}

/// Returns copies of `letter` and `config` with every piece of display text converted.
///
/// The signature is a file path and is left untouched.
pub fn transcode_letter(
    letter: &ParsedLetter,
    config: &Config,
    transcoder: Transcoder,
) -> (ParsedLetter, Config) {
    let letter = ParsedLetter {
        notes: letter.notes.clone(),
        config_json: letter.config_json.clone(),
        address: transcoder.transcode_all(&letter.address),
        subject: transcoder.transcode(&letter.subject),
        body: transcoder.transcode_all(&letter.body),
    };

    let config = Config {
        date_prefix: transcoder.transcode(&config.date_prefix),
        date: transcoder.transcode(&config.date),
        sender: transcoder.transcode_all(&config.sender),
        sender_name: config
            .sender_name
            .as_deref()
            .map(|name| transcoder.transcode(name)),
        ..config.clone()
    };

    (letter, config)
}
