//! Line-oriented parser that splits a letter file into its sections.
//!
//! A letter consists of free notes followed by four sections, each introduced by a line starting
//! with `//`.  The text after the slashes is ignored: markers are counted, not labelled.  Once the
//! body has started, marker-like lines are ordinary body text.

use std::io::BufRead;

use log::trace;

use crate::error::{LetterError, Result};

const SECTION_MARKER: &str = "//";

/// The part of the letter a line belongs to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Section {
    /// Notes before the first marker.
    #[default]
    Initial,
    /// JSON configuration fragment.
    Configuration,
    /// Recipient address.
    Address,
    /// The single subject line.
    Subject,
    /// Letter text; terminal.
    Body,
}

impl Section {
    /// The section a marker line leads to.
    pub fn next(self) -> Self {
        match self {
            Self::Initial => Self::Configuration,
            Self::Configuration => Self::Address,
            Self::Address => Self::Subject,
            Self::Subject | Self::Body => Self::Body,
        }
    }
}

/// What to do with a line after classifying it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    /// The line is a section marker and carries no content.
    Marker,
    /// Free text before the first marker.
    Note,
    /// Append to the configuration fragment without a separator.
    Configuration,
    /// Append as an address line.
    Address,
    /// Candidate subject line.
    Subject,
    /// Append as a body line.
    Body,
}

/// Returns `true` when `line` starts a new section.
pub fn is_section_marker(line: &str) -> bool {
    line.starts_with(SECTION_MARKER)
}

/// Pure transition function of the section state machine.
pub fn transition(state: Section, line: &str) -> (Section, Action) {
    if state == Section::Body {
        return (Section::Body, Action::Body);
    }
    if is_section_marker(line) {
        return (state.next(), Action::Marker);
    }
    let action = match state {
        Section::Initial => Action::Note,
        Section::Configuration => Action::Configuration,
        Section::Address => Action::Address,
        Section::Subject => Action::Subject,
        Section::Body => Action::Body,
    };
    (state, action)
}

/// The sections of a parsed letter.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParsedLetter {
    /// Lines before the first marker; never rendered.
    pub notes: Vec<String>,
    /// Configuration lines joined without separators.
    pub config_json: String,
    pub address: Vec<String>,
    pub subject: String,
    pub body: Vec<String>,
}

/// Incremental parser; feed lines in order, then call [`LetterParser::finish`].
#[derive(Debug, Default)]
pub struct LetterParser {
    section: Section,
    letter: ParsedLetter,
    multiline_subject: bool,
}

impl LetterParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes one line.
    pub fn feed(&mut self, line: &str) {
        let (next, action) = transition(self.section, line);
        if next != self.section {
            trace!("Entering {:?} section", next);
        }
        self.section = next;

        match action {
            Action::Marker => {}
            Action::Note => self.letter.notes.push(line.to_owned()),
            Action::Configuration => self.letter.config_json.push_str(line),
            Action::Address => self.letter.address.push(line.to_owned()),
            Action::Subject => {
                // Reported only after all markers were seen; missing sections take priority.
                if self.letter.subject.is_empty() {
                    self.letter.subject = line.to_owned();
                } else {
                    self.multiline_subject = true;
                }
            }
            Action::Body => self.letter.body.push(line.to_owned()),
        }
    }

    /// Validates the section structure and returns the letter.
    pub fn finish(self) -> Result<ParsedLetter> {
        if self.section != Section::Body {
            return Err(LetterError::MissingSections);
        }
        if self.multiline_subject {
            return Err(LetterError::MultilineSubject);
        }
        Ok(self.letter)
    }
}

/// Parses a complete sequence of lines.
pub fn parse<I, S>(lines: I) -> Result<ParsedLetter>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut parser = LetterParser::new();
    for line in lines {
        parser.feed(line.as_ref());
    }
    parser.finish()
}

/// Parses lines read from `reader`.  Line endings (`\n` or `\r\n`) are stripped.
pub fn parse_reader<R: BufRead>(reader: R) -> Result<ParsedLetter> {
    let mut parser = LetterParser::new();
    for line in reader.lines() {
        let line = line.map_err(|source| LetterError::InputRead { source })?;
        parser.feed(&line);
    }
    parser.finish()
}
