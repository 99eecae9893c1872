//! Layered letter configuration.
//!
//! A [`Config`] starts from the built-in defaults and is refined by any number of JSON layers:
//! the system-wide defaults file, the user's defaults file, custom files given on the command line
//! and finally the configuration section of the letter itself.  Every layer is decoded into a
//! [`ConfigOverlay`] that remembers which fields were actually present, so a layer only replaces
//! what it mentions.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{LetterError, Result};

/// Directory name used below the platform configuration directories.
pub const APP_DIR: &str = "left";

/// File name of the defaults file inside [`APP_DIR`].
pub const DEFAULTS_FILE: &str = "defaults.json";

#[cfg(target_os = "linux")]
const SYSTEM_DEFAULTS: &str = "/etc/left/defaults.json";

/// Font family used when no layer overrides `FontName`.
pub const DEFAULT_FONT_NAME: &str = "DejaVuSansCondensed";

const DATE_FORMAT: &str = "%d.%m.%Y";

/// Describes a font family loaded from the file system instead of the bundled fonts.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct FontImport {
    /// Name the font is selected by through `FontName`.
    pub name: String,
    /// Directory holding the font files.
    pub directory: String,
    /// File name of the regular face.
    pub font_file_name: String,
    /// File name of the bold face; empty means the regular face is used for bold text.
    pub font_file_name_bold: String,
}

impl FontImport {
    /// Full path of the regular face.
    pub fn regular_path(&self) -> PathBuf {
        Path::new(&self.directory).join(&self.font_file_name)
    }

    /// Full path of the bold face, falling back to the regular face.
    pub fn bold_path(&self) -> PathBuf {
        if self.font_file_name_bold.is_empty() {
            self.regular_path()
        } else {
            Path::new(&self.directory).join(&self.font_file_name_bold)
        }
    }
}

/// Effective layout and typography settings of a letter.  All lengths are millimetres.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Config {
    pub font_name: String,
    pub font_import: Option<FontImport>,
    #[serde(serialize_with = "serialize_number")]
    pub font_size: f64,
    #[serde(serialize_with = "serialize_number")]
    pub font_size_sender: f64,
    #[serde(serialize_with = "serialize_number")]
    pub font_size_address: f64,
    #[serde(serialize_with = "serialize_number")]
    pub line_height: f64,
    #[serde(serialize_with = "serialize_number")]
    pub line_height_address: f64,
    #[serde(serialize_with = "serialize_number")]
    pub address_section_x: f64,
    #[serde(serialize_with = "serialize_number")]
    pub address_section_y: f64,
    #[serde(serialize_with = "serialize_number")]
    pub address_section_w: f64,
    #[serde(serialize_with = "serialize_number")]
    pub date_y: f64,
    #[serde(serialize_with = "serialize_number")]
    pub margins: f64,
    pub date_prefix: String,
    pub date: String,
    pub sender: Vec<String>,
    /// `None` means "inherit", `Some("")` is an explicitly blank name.
    pub sender_name: Option<String>,
    /// Path of the signature image; same tri-state semantics as `sender_name`.
    pub signature: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            font_name: DEFAULT_FONT_NAME.to_owned(),
            font_import: None,
            font_size: 12.0,
            font_size_sender: 7.0,
            font_size_address: 10.0,
            line_height: 8.0,
            line_height_address: 6.0,
            address_section_x: 25.0,
            address_section_y: 50.0,
            address_section_w: 70.0,
            date_y: 100.0,
            margins: 25.0,
            date_prefix: String::new(),
            date: chrono::Local::now().format(DATE_FORMAT).to_string(),
            sender: Vec::new(),
            sender_name: None,
            signature: None,
        }
    }
}

impl Config {
    /// Returns the sender name, or an empty string when it is unset.
    pub fn sender_name_or_empty(&self) -> &str {
        self.sender_name.as_deref().unwrap_or_default()
    }

    /// Returns the signature path, or an empty string when it is unset.
    pub fn signature_or_empty(&self) -> &str {
        self.signature.as_deref().unwrap_or_default()
    }

    /// Overlays the fields present in `overlay` onto this configuration.
    pub fn apply(&mut self, overlay: ConfigOverlay) {
        set(&mut self.font_name, overlay.font_name);
        set(&mut self.font_size, overlay.font_size);
        set(&mut self.font_size_sender, overlay.font_size_sender);
        set(&mut self.font_size_address, overlay.font_size_address);
        set(&mut self.line_height, overlay.line_height);
        set(&mut self.line_height_address, overlay.line_height_address);
        set(&mut self.address_section_x, overlay.address_section_x);
        set(&mut self.address_section_y, overlay.address_section_y);
        set(&mut self.address_section_w, overlay.address_section_w);
        set(&mut self.date_y, overlay.date_y);
        set(&mut self.margins, overlay.margins);
        set(&mut self.date_prefix, overlay.date_prefix);
        set(&mut self.date, overlay.date);
        set(&mut self.sender, overlay.sender);
        set(&mut self.sender_name, overlay.sender_name);
        set(&mut self.signature, overlay.signature);

        if let Some(import) = overlay.font_import {
            let existing = self.font_import.take();
            self.font_import = import.map(|patch| {
                let mut target = existing.unwrap_or_default();
                patch.apply_to(&mut target);
                target
            });
        }
    }

    /// Overlays a JSON document.  `origin` names the document in error messages.
    ///
    /// A blank document changes nothing.
    pub fn merge_json(&mut self, json: &str, origin: &str) -> Result<()> {
        if json.trim().is_empty() {
            return Ok(());
        }
        let overlay = ConfigOverlay::from_json(json).map_err(|source| LetterError::ConfigParse {
            origin: origin.to_owned(),
            source,
        })?;
        self.apply(overlay);
        Ok(())
    }

    /// Overlays the JSON file at `path`.
    ///
    /// Returns `Ok(false)` without touching the configuration when the file does not exist.
    pub fn merge_file(&mut self, path: &Path) -> Result<bool> {
        let data = match fs::read(path) {
            Ok(data) => data,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!("Skipping missing configuration file {}", path.display());
                return Ok(false);
            }
            Err(source) => {
                return Err(LetterError::ConfigRead {
                    path: path.to_owned(),
                    source,
                })
            }
        };

        let overlay =
            ConfigOverlay::from_slice(&data).map_err(|source| LetterError::ConfigParse {
                origin: format!("file {}", path.display()),
                source,
            })?;
        self.apply(overlay);
        debug!("Applied configuration file {}", path.display());
        Ok(true)
    }

    /// Pretty-printed JSON representation, suitable as a configuration file.
    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(LetterError::ConfigSerialize)
    }
}

/// Builds the effective configuration by applying every file in `paths`, in order, on top of the
/// built-in defaults.  Missing files are skipped.
pub fn load<I, P>(paths: I) -> Result<Config>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let mut config = Config::default();
    for path in paths {
        config.merge_file(path.as_ref())?;
    }
    Ok(config)
}

/// Returns the ordered list of configuration files consulted by the command line tool: the
/// system-wide defaults (Linux only), the user's defaults and finally `custom`.
pub fn search_paths(custom: &[PathBuf]) -> Vec<PathBuf> {
    let mut paths = Vec::new();

    #[cfg(target_os = "linux")]
    paths.push(PathBuf::from(SYSTEM_DEFAULTS));

    match dirs::config_dir() {
        Some(dir) => paths.push(dir.join(APP_DIR).join(DEFAULTS_FILE)),
        None => warn!("Could not determine the user configuration directory; skipping user defaults"),
    }

    paths.extend(custom.iter().cloned());
    paths
}

/// One decoded configuration layer that keeps track of which fields were present.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ConfigOverlay {
    font_name: Option<String>,
    #[serde(deserialize_with = "present")]
    font_import: Option<Option<FontImportOverlay>>,
    font_size: Option<f64>,
    font_size_sender: Option<f64>,
    font_size_address: Option<f64>,
    line_height: Option<f64>,
    line_height_address: Option<f64>,
    address_section_x: Option<f64>,
    address_section_y: Option<f64>,
    address_section_w: Option<f64>,
    date_y: Option<f64>,
    margins: Option<f64>,
    date_prefix: Option<String>,
    date: Option<String>,
    sender: Option<Vec<String>>,
    #[serde(deserialize_with = "present")]
    sender_name: Option<Option<String>>,
    #[serde(deserialize_with = "present")]
    signature: Option<Option<String>>,
}

impl ConfigOverlay {
    /// Decodes a layer from a JSON string.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Decodes a layer from raw JSON bytes.
    pub fn from_slice(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct FontImportOverlay {
    name: Option<String>,
    directory: Option<String>,
    font_file_name: Option<String>,
    font_file_name_bold: Option<String>,
}

impl FontImportOverlay {
    fn apply_to(self, target: &mut FontImport) {
        set(&mut target.name, self.name);
        set(&mut target.directory, self.directory);
        set(&mut target.font_file_name, self.font_file_name);
        set(&mut target.font_file_name_bold, self.font_file_name_bold);
    }
}

fn set<T>(target: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *target = value;
    }
}

/// Wraps a present field in `Some`, so that an explicit `null` becomes `Some(None)` while a
/// missing field stays `None` through `#[serde(default)]`.
fn present<'de, D, T>(deserializer: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Writes whole numbers without a decimal point.
fn serialize_number<S>(value: &f64, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    if value.fract() == 0.0 && value.abs() < 1e15 {
        serializer.serialize_i64(*value as i64)
    } else {
        serializer.serialize_f64(*value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, contents).expect("write config fixture");
        path
    }

    fn fixed_defaults() -> Config {
        Config {
            date: "24.05.2023".to_owned(),
            ..Config::default()
        }
    }

    #[test]
    fn defaults_match_the_builtin_layout() {
        let config = Config::default();
        assert_eq!(config.font_name, DEFAULT_FONT_NAME);
        assert_eq!(config.font_size, 12.0);
        assert_eq!(config.font_size_sender, 7.0);
        assert_eq!(config.font_size_address, 10.0);
        assert_eq!(config.line_height, 8.0);
        assert_eq!(config.line_height_address, 6.0);
        assert_eq!(config.margins, 25.0);
        assert!(config.sender.is_empty());
        assert_eq!(config.sender_name, None);
        assert_eq!(config.sender_name_or_empty(), "");
        assert_eq!(config.signature_or_empty(), "");
        assert_eq!(config.date.len(), "dd.mm.yyyy".len());
    }

    #[test]
    fn full_overlay_replaces_every_field() {
        let mut config = fixed_defaults();
        config
            .merge_json(
                r#"{
                    "FontName": "someFontName",
                    "FontImport": {
                        "Name": "myfont",
                        "Directory": "/usr/share/fonts/myfont",
                        "FontFileName": "MyFont-Condensed.ttf"
                    },
                    "FontSize": 42,
                    "FontSizeSender": 43,
                    "FontSizeAddress": 44,
                    "LineHeight": 45,
                    "LineHeightAddress": 46,
                    "AddressSectionX": 47,
                    "AddressSectionY": 48,
                    "AddressSectionW": 49,
                    "DateY": 50,
                    "Margins": 51,
                    "DatePrefix": "My Hometown, ",
                    "Date": "24/05/2023",
                    "Sender": ["Darth Vader", "Palace District with Special Chars äüößéç", "Coruscant"],
                    "SenderName": "Darth Vader",
                    "Signature": "/home/dvader/documents/Signature.jpg"
                }"#,
                "test",
            )
            .expect("valid overlay");

        assert_eq!(config.font_name, "someFontName");
        let import = config.font_import.as_ref().expect("font import present");
        assert_eq!(import.name, "myfont");
        assert_eq!(import.directory, "/usr/share/fonts/myfont");
        assert_eq!(import.font_file_name, "MyFont-Condensed.ttf");
        assert_eq!(import.bold_path(), import.regular_path());
        assert_eq!(config.font_size, 42.0);
        assert_eq!(config.font_size_sender, 43.0);
        assert_eq!(config.font_size_address, 44.0);
        assert_eq!(config.line_height, 45.0);
        assert_eq!(config.line_height_address, 46.0);
        assert_eq!(config.address_section_x, 47.0);
        assert_eq!(config.address_section_y, 48.0);
        assert_eq!(config.address_section_w, 49.0);
        assert_eq!(config.date_y, 50.0);
        assert_eq!(config.margins, 51.0);
        assert_eq!(config.date_prefix, "My Hometown, ");
        assert_eq!(config.date, "24/05/2023");
        assert_eq!(config.sender[1], "Palace District with Special Chars äüößéç");
        assert_eq!(config.sender_name_or_empty(), "Darth Vader");
        assert_eq!(
            config.signature_or_empty(),
            "/home/dvader/documents/Signature.jpg"
        );
    }

    #[test]
    fn layers_fold_left_and_keep_unmentioned_fields() {
        let dir = tempfile::tempdir().expect("temp dir");
        let first = write(
            dir.path(),
            "config_1.json",
            r#"{"FontSize": 14, "SenderName": "Jane Doe", "Sender": ["Jane Doe", "Main Street 1"]}"#,
        );
        let second = write(dir.path(), "config_2.json", r#"{"FontSize": 11, "Margins": 20}"#);

        let config = load([&first, &second]).expect("load layers");

        assert_eq!(config.font_size, 11.0);
        assert_eq!(config.margins, 20.0);
        assert_eq!(config.sender_name.as_deref(), Some("Jane Doe"));
        assert_eq!(config.sender, vec!["Jane Doe", "Main Street 1"]);
        assert_eq!(config.line_height, Config::default().line_height);
    }

    #[test]
    fn tri_state_fields_distinguish_blank_from_unset() {
        let mut config = fixed_defaults();
        config
            .merge_json(r#"{"SenderName": "Jane", "Signature": "sig.jpg"}"#, "a")
            .expect("set");
        config
            .merge_json(r#"{"SenderName": "", "Signature": null}"#, "b")
            .expect("reset");

        assert_eq!(config.sender_name, Some(String::new()));
        assert_eq!(config.signature, None);
        assert_eq!(config.signature_or_empty(), "");
    }

    #[test]
    fn null_on_plain_field_keeps_previous_value() {
        let mut config = fixed_defaults();
        config
            .merge_json(r#"{"FontSize": null, "DatePrefix": null}"#, "null")
            .expect("nulls are accepted");
        assert_eq!(config, fixed_defaults());
    }

    #[test]
    fn font_import_merges_field_by_field_and_null_removes_it() {
        let mut config = fixed_defaults();
        config
            .merge_json(
                r#"{"FontImport": {"Name": "myfont", "Directory": "/fonts", "FontFileName": "a.ttf"}}"#,
                "a",
            )
            .expect("import");
        config
            .merge_json(r#"{"FontImport": {"FontFileNameBold": "b.ttf"}}"#, "b")
            .expect("partial import");

        let import = config.font_import.clone().expect("import kept");
        assert_eq!(import.name, "myfont");
        assert_eq!(import.bold_path(), PathBuf::from("/fonts/b.ttf"));

        config
            .merge_json(r#"{"FontImport": null}"#, "c")
            .expect("remove import");
        assert_eq!(config.font_import, None);
    }

    #[test]
    fn missing_files_are_skipped() {
        let dir = tempfile::tempdir().expect("temp dir");
        let mut config = fixed_defaults();
        let applied = config
            .merge_file(&dir.path().join("absent.json"))
            .expect("missing file is not an error");
        assert!(!applied);
        assert_eq!(config, fixed_defaults());
    }

    #[test]
    fn malformed_file_reports_path() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = write(dir.path(), "broken.json", "{\"FontSize\": ");

        let err = load([&path]).unwrap_err();
        match &err {
            LetterError::ConfigParse { origin, .. } => assert!(origin.contains("broken.json")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn wrong_field_type_fails_the_whole_layer() {
        let mut config = fixed_defaults();
        let err = config
            .merge_json(r#"{"Margins": 10, "FontSize": "large"}"#, "inline")
            .unwrap_err();
        assert!(matches!(err, LetterError::ConfigParse { .. }));
        assert_eq!(config.margins, 25.0);
    }

    #[test]
    fn unknown_fields_and_blank_documents_are_ignored() {
        let mut config = fixed_defaults();
        config
            .merge_json(r#"{"Colour": "blue"}"#, "unknown")
            .expect("unknown field");
        config.merge_json("  ", "blank").expect("blank document");
        assert_eq!(config, fixed_defaults());
    }

    #[test]
    fn blank_inline_section_is_no_override_although_not_json() {
        assert!(ConfigOverlay::from_json("").is_err());

        let mut config = fixed_defaults();
        config.merge_json("", "letter").expect("empty section accepted");
        config.merge_json("\n\t ", "letter").expect("whitespace accepted");
        assert_eq!(config, fixed_defaults());
    }

    #[test]
    fn dump_round_trips_through_load() {
        let mut original = fixed_defaults();
        original.sender = vec!["Jane Doe".to_owned()];
        original.line_height = 7.5;

        let dir = tempfile::tempdir().expect("temp dir");
        let dump = original.to_json_pretty().expect("dump");
        let path = write(dir.path(), "dump.json", &dump);

        let reloaded = load([&path]).expect("reload dump");
        assert_eq!(reloaded, original);
    }

    #[test]
    fn dump_writes_whole_numbers_as_integers() {
        let dump = fixed_defaults().to_json_pretty().expect("dump");
        assert!(dump.contains("\"FontSize\": 12,"));
        assert!(dump.contains("\"FontImport\": null,"));
        assert!(dump.contains("\"SenderName\": null,"));
        assert!(dump.starts_with("{\n  \"FontName\": \"DejaVuSansCondensed\","));
    }

    #[test]
    fn search_paths_end_with_custom_files_in_order() {
        let custom = vec![PathBuf::from("a.json"), PathBuf::from("b.json")];
        let paths = search_paths(&custom);
        assert!(paths.len() >= 2);
        assert_eq!(&paths[paths.len() - 2..], custom.as_slice());
    }
}
