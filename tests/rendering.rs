use std::fs;
use std::path::{Path, PathBuf};

use left::config::Config;
use left::{fonts, LetterError};
use sha2::{Digest, Sha256};

const MINIMAL_LETTER: &str = "// \n{}\n// \nName\nStreet\n// \nSubj\n// \nLine1\nLine2\n";

fn fixed_config() -> Config {
    Config {
        date: "24.05.2023".to_owned(),
        ..Config::default()
    }
}

fn fonts_missing(test: &str) -> bool {
    if fonts::default_fonts_available() {
        return false;
    }
    eprintln!(
        "Skipping {test}: bundled fonts missing. Set LEFT_FONTS_DIR or copy assets/fonts next to the binary."
    );
    true
}

fn write_letter(dir: &Path, name: &str, text: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, text).expect("write letter fixture");
    path
}

fn scrub_pdf(bytes: &[u8]) -> Vec<u8> {
    fn scrub_segment(data: &mut [u8], tag: &[u8], terminator: u8) {
        let mut index = 0;
        while index + tag.len() < data.len() {
            if data[index..].starts_with(tag) {
                let mut cursor = index + tag.len();
                while cursor < data.len() {
                    let byte = data[cursor];
                    if byte == terminator {
                        break;
                    }
                    if terminator == b')' {
                        data[cursor] = b'0';
                    } else if !matches!(byte, b'<' | b'>' | b' ' | b'\n' | b'\r' | b'\t') {
                        data[cursor] = b'0';
                    }
                    cursor += 1;
                }
                index = cursor;
            } else {
                index += 1;
            }
        }
    }

    fn scrub_xml(data: &mut [u8], start: &[u8], end: &[u8]) {
        let mut offset = 0;
        while offset + start.len() < data.len() {
            if let Some(start_pos) = data[offset..]
                .windows(start.len())
                .position(|window| window == start)
            {
                let start_index = offset + start_pos + start.len();
                if let Some(end_pos) = data[start_index..]
                    .windows(end.len())
                    .position(|window| window == end)
                {
                    for byte in &mut data[start_index..start_index + end_pos] {
                        if !matches!(*byte, b'<' | b'>' | b'/' | b' ' | b'\n' | b'\r' | b'\t') {
                            *byte = b'0';
                        }
                    }
                    offset = start_index + end_pos + end.len();
                } else {
                    break;
                }
            } else {
                break;
            }
        }
    }

    let mut normalized = bytes.to_vec();
    scrub_segment(&mut normalized, b"/CreationDate(", b')');
    scrub_segment(&mut normalized, b"/ModDate(", b')');
    scrub_segment(&mut normalized, b"/ID[", b']');
    scrub_segment(&mut normalized, b"/Producer(", b')');
    scrub_xml(&mut normalized, b"<xmp:CreateDate>", b"</xmp:CreateDate>");
    scrub_xml(&mut normalized, b"<xmp:ModifyDate>", b"</xmp:ModifyDate>");
    scrub_xml(
        &mut normalized,
        b"<xmp:MetadataDate>",
        b"</xmp:MetadataDate>",
    );
    scrub_xml(
        &mut normalized,
        b"<xmpMM:DocumentID>",
        b"</xmpMM:DocumentID>",
    );
    scrub_xml(
        &mut normalized,
        b"<xmpMM:InstanceID>",
        b"</xmpMM:InstanceID>",
    );
    scrub_xml(&mut normalized, b"<xmpMM:VersionID>", b"</xmpMM:VersionID>");
    normalized
}

fn normalized_hash(bytes: &[u8]) -> [u8; 32] {
    let normalized = scrub_pdf(bytes);
    let digest = Sha256::digest(&normalized);
    digest.into()
}

/// Counts `/Type /Page` dictionaries, ignoring the `/Pages` tree node.
fn page_count(bytes: &[u8]) -> usize {
    let tag = b"/Type";
    let mut count = 0;
    let mut index = 0;
    while let Some(offset) = bytes[index..].windows(tag.len()).position(|w| w == tag) {
        let mut cursor = index + offset + tag.len();
        while cursor < bytes.len() && bytes[cursor].is_ascii_whitespace() {
            cursor += 1;
        }
        let rest = &bytes[cursor..];
        if rest.starts_with(b"/Page") && !rest.starts_with(b"/Pages") {
            count += 1;
        }
        index = cursor;
    }
    count
}

#[test]
fn renders_the_minimal_letter() {
    if fonts_missing("renders_the_minimal_letter") {
        return;
    }
    let bytes = left::render_str(MINIMAL_LETTER, &fixed_config()).expect("render letter");
    assert!(bytes.starts_with(b"%PDF"), "output should carry a PDF header");
}

#[test]
fn rendering_is_deterministic() {
    if fonts_missing("rendering_is_deterministic") {
        return;
    }
    let bytes_a = left::render_str(MINIMAL_LETTER, &fixed_config()).expect("first render");
    let bytes_b = left::render_str(MINIMAL_LETTER, &fixed_config()).expect("second render");

    assert_eq!(bytes_a.len(), bytes_b.len(), "PDF sizes should match");
    assert_eq!(
        normalized_hash(&bytes_a),
        normalized_hash(&bytes_b),
        "PDF renders must be deterministic after metadata normalization"
    );
}

#[test]
fn different_letters_render_differently() {
    if fonts_missing("different_letters_render_differently") {
        return;
    }
    let other = MINIMAL_LETTER.replace("Subj", "Another subject");
    let bytes_a = left::render_str(MINIMAL_LETTER, &fixed_config()).expect("first render");
    let bytes_b = left::render_str(&other, &fixed_config()).expect("second render");
    assert_ne!(normalized_hash(&bytes_a), normalized_hash(&bytes_b));
}

#[test]
fn writes_pdf_next_to_the_input() {
    if fonts_missing("writes_pdf_next_to_the_input") {
        return;
    }
    let dir = tempfile::tempdir().expect("temp dir");
    let input = write_letter(dir.path(), "letter.txt", MINIMAL_LETTER);

    let output = left::render(&input, &fixed_config()).expect("render file");

    assert_eq!(output, dir.path().join("letter.pdf"));
    let bytes = fs::read(&output).expect("read output");
    assert!(bytes.starts_with(b"%PDF"));
    let leftovers = fs::read_dir(dir.path()).expect("list dir").count();
    assert_eq!(leftovers, 2, "only the input and the PDF should remain");
}

#[test]
fn long_letters_continue_on_further_pages() {
    if fonts_missing("long_letters_continue_on_further_pages") {
        return;
    }
    let mut letter = String::from("//\n{}\n//\nName\n//\nSubj\n//\n");
    for index in 0..120 {
        letter.push_str(&format!(
            "Paragraph {index} with enough words to wrap across the full width of the page body.\n"
        ));
    }
    let bytes = left::render_str(&letter, &fixed_config()).expect("render long letter");
    assert!(page_count(&bytes) > 1, "body should flow onto a second page");
}

fn contains(bytes: &[u8], needle: &[u8]) -> bool {
    bytes.windows(needle.len()).any(|window| window == needle)
}

#[test]
fn builtin_faces_render_transliterated_text() {
    if fonts_missing("builtin_faces_render_transliterated_text") {
        return;
    }
    let letter = "//\n{\"FontName\": \"Helvetica\"}\n//\nŁódź\n//\nGrüße\n//\nDvořák\n";
    let bytes = left::render_str(letter, &fixed_config()).expect("render with builtin face");
    assert!(bytes.starts_with(b"%PDF"));
    assert!(contains(&bytes, b"Helvetica"));
}

#[test]
fn builtin_faces_use_their_bold_variant() {
    if fonts_missing("builtin_faces_use_their_bold_variant") {
        return;
    }
    for (name, bold) in [
        ("Helvetica", &b"Helvetica-Bold"[..]),
        ("Times", &b"Times-Bold"[..]),
        ("Courier", &b"Courier-Bold"[..]),
    ] {
        let letter = format!("//\n{{\"FontName\": \"{name}\"}}\n//\nName\n//\nSubj\n//\nText\n");
        let bytes = left::render_str(&letter, &fixed_config()).expect("render with builtin face");
        assert!(
            contains(&bytes, bold),
            "{name} letters should draw the subject with the bold face"
        );
    }
}

#[test]
fn builtin_faces_accept_control_characters() {
    if fonts_missing("builtin_faces_accept_control_characters") {
        return;
    }
    let letter = "//\n{\"FontName\": \"Helvetica\"}\n//\nName\n//\nSubj\n//\n\
                  Amount:\t5 EUR\n\
                  soft\u{AD}hyphen A\u{81}B\u{7}\n";
    let bytes = left::render_str(letter, &fixed_config()).expect("render control characters");
    assert!(bytes.starts_with(b"%PDF"));
}

#[test]
fn oversized_line_height_is_a_render_error() {
    if fonts_missing("oversized_line_height_is_a_render_error") {
        return;
    }
    let letter = "//\n{\"LineHeight\": 600, \"LineHeightAddress\": 600}\n//\nName\n//\nSubj\n//\nText\n";
    let err = left::render_str(letter, &fixed_config()).unwrap_err();
    assert!(matches!(err, LetterError::Render(_)));
}

#[test]
fn missing_sections_leave_no_output() {
    let dir = tempfile::tempdir().expect("temp dir");
    let input = write_letter(
        dir.path(),
        "short.txt",
        "// config\n{}\n// address\nName\n// subject\nSubj\n",
    );

    let err = left::render(&input, &fixed_config()).unwrap_err();

    assert!(matches!(err, LetterError::MissingSections));
    assert!(!dir.path().join("short.pdf").exists());
}

#[test]
fn multiline_subject_is_rejected() {
    let dir = tempfile::tempdir().expect("temp dir");
    let input = write_letter(dir.path(), "subject.txt", "//\n//\n//\nFirst\nSecond\n//\nBody\n");

    let err = left::render(&input, &fixed_config()).unwrap_err();

    assert!(matches!(err, LetterError::MultilineSubject));
    assert!(!dir.path().join("subject.pdf").exists());
}

#[test]
fn missing_input_is_an_error() {
    let dir = tempfile::tempdir().expect("temp dir");
    let err = left::render(&dir.path().join("absent.txt"), &fixed_config()).unwrap_err();
    assert!(matches!(err, LetterError::InputOpen { .. }));
}

#[test]
fn config_layers_and_inline_section_combine() {
    let dir = tempfile::tempdir().expect("temp dir");
    let defaults = dir.path().join("defaults.json");
    fs::write(&defaults, r#"{"FontName": "NoSuchFont", "Margins": 30}"#).expect("write defaults");
    let custom = dir.path().join("custom.json");
    fs::write(&custom, r#"{"FontSize": 11}"#).expect("write custom");

    let config = left::config::load([&defaults, &custom]).expect("load layers");
    assert_eq!(config.margins, 30.0);
    assert_eq!(config.font_size, 11.0);

    let letter = "//\n{\"FontName\": \"StillMissing\"}\n//\n//\nS\n//\n";
    let err = left::render_str(letter, &config).unwrap_err();
    assert!(matches!(err, LetterError::UnknownFont(name) if name == "StillMissing"));
}
