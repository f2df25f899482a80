//! Engine Config Files
//!
//! Reads and writes INI-style engine config files (`DefaultEngine.ini`).
//! Only the entries a caller touches are rewritten; every other section,
//! comment and line keeps its original order and text.

use anyhow::{bail, Context, Result};
use log::{debug, info};
use std::fmt;
use std::path::{Path, PathBuf};

/// Array operator prefixed to a key (`+Key=Value` and friends)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryOp {
    /// `Key=Value`
    Set,
    /// `+Key=Value`, adds the value unless already present
    Append,
    /// `.Key=Value`, adds the value even if present
    AppendDuplicate,
    /// `-Key=Value`
    Remove,
    /// `!Key=...`
    Clear,
}

impl EntryOp {
    fn split(raw_key: &str) -> (EntryOp, &str) {
        match raw_key.as_bytes().first() {
            Some(b'+') => (EntryOp::Append, &raw_key[1..]),
            Some(b'.') => (EntryOp::AppendDuplicate, &raw_key[1..]),
            Some(b'-') => (EntryOp::Remove, &raw_key[1..]),
            Some(b'!') => (EntryOp::Clear, &raw_key[1..]),
            _ => (EntryOp::Set, raw_key),
        }
    }

    fn prefix(&self) -> &'static str {
        match self {
            EntryOp::Set => "",
            EntryOp::Append => "+",
            EntryOp::AppendDuplicate => ".",
            EntryOp::Remove => "-",
            EntryOp::Clear => "!",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Line {
    Entry { op: EntryOp, key: String, value: String },
    /// Comment, blank or unparseable line, written back verbatim
    Verbatim(String),
}

impl Line {
    fn is_key(&self, wanted: &str) -> bool {
        matches!(self, Line::Entry { key, .. } if key.eq_ignore_ascii_case(wanted))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Section {
    name: String,
    lines: Vec<Line>,
}

impl Section {
    fn entries<'a>(&'a self, wanted: &'a str) -> impl Iterator<Item = (EntryOp, &'a str)> + 'a {
        self.lines.iter().filter_map(move |line| match line {
            Line::Entry { op, key, value } if key.eq_ignore_ascii_case(wanted) => {
                Some((*op, value.as_str()))
            }
            _ => None,
        })
    }
}

/// Parsed INI file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IniDocument {
    preamble: Vec<String>,
    sections: Vec<Section>,
}

impl IniDocument {
    pub fn parse(text: &str) -> Self {
        let mut doc = IniDocument::default();

        for raw in text.lines() {
            let raw = raw.trim_end_matches('\r');
            let trimmed = raw.trim();

            if trimmed.starts_with('[') && trimmed.ends_with(']') && trimmed.len() >= 2 {
                doc.sections.push(Section {
                    name: trimmed[1..trimmed.len() - 1].to_string(),
                    lines: Vec::new(),
                });
                continue;
            }

            let Some(section) = doc.sections.last_mut() else {
                doc.preamble.push(raw.to_string());
                continue;
            };

            let line = if trimmed.is_empty() || trimmed.starts_with(';') || trimmed.starts_with('#')
            {
                Line::Verbatim(raw.to_string())
            } else if let Some((raw_key, value)) = trimmed.split_once('=') {
                let (op, key) = EntryOp::split(raw_key.trim());
                Line::Entry {
                    op,
                    key: key.to_string(),
                    value: value.trim().to_string(),
                }
            } else {
                Line::Verbatim(raw.to_string())
            };
            section.lines.push(line);
        }

        doc
    }

    fn section(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.name == name)
    }

    fn section_mut(&mut self, name: &str) -> &mut Section {
        let pos = match self.sections.iter().position(|s| s.name == name) {
            Some(pos) => pos,
            None => {
                self.sections.push(Section {
                    name: name.to_string(),
                    lines: Vec::new(),
                });
                self.sections.len() - 1
            }
        };
        &mut self.sections[pos]
    }

    /// Last scalar value of `key`
    pub fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.section(section)?
            .entries(key)
            .filter(|(op, _)| *op == EntryOp::Set)
            .last()
            .map(|(_, value)| value.to_string())
    }

    pub fn get_bool(&self, section: &str, key: &str) -> Option<bool> {
        parse_bool(&self.get_string(section, key)?)
    }

    /// Array value of `key` after applying every operator in file order
    pub fn get_array(&self, section: &str, key: &str) -> Vec<String> {
        let mut values: Vec<String> = Vec::new();
        let Some(section) = self.section(section) else {
            return values;
        };

        for (op, value) in section.entries(key) {
            match op {
                EntryOp::Set | EntryOp::AppendDuplicate => values.push(value.to_string()),
                EntryOp::Append => {
                    if !values.iter().any(|v| v == value) {
                        values.push(value.to_string());
                    }
                }
                EntryOp::Remove => values.retain(|v| v != value),
                EntryOp::Clear => values.clear(),
            }
        }
        values
    }

    /// Set a scalar value. Returns true if the document changed.
    pub fn set_string(&mut self, section: &str, key: &str, value: &str) -> Result<bool> {
        check_single_line(key, value)?;
        let section = self.section_mut(section);
        let mut found = false;
        let mut changed = false;

        section.lines.retain_mut(|line| {
            let Line::Entry { op: EntryOp::Set, key: k, value: v } = line else {
                return true;
            };
            if !k.eq_ignore_ascii_case(key) {
                return true;
            }
            if found {
                // duplicate scalar entries collapse into the first one
                changed = true;
                return false;
            }
            found = true;
            if v.as_str() != value {
                *v = value.to_string();
                changed = true;
            }
            true
        });

        if !found {
            section.lines.push(Line::Entry {
                op: EntryOp::Set,
                key: key.to_string(),
                value: value.to_string(),
            });
            changed = true;
        }
        Ok(changed)
    }

    pub fn set_bool(&mut self, section: &str, key: &str, value: bool) -> Result<bool> {
        self.set_string(section, key, if value { "True" } else { "False" })
    }

    /// Replace an array with `values`, written as `+Key=Value` lines.
    /// Returns true if the document changed.
    pub fn set_array(&mut self, section: &str, key: &str, values: &[String]) -> Result<bool> {
        for value in values {
            check_single_line(key, value)?;
        }
        let section = self.section_mut(section);

        let old: Vec<Line> = section.lines.iter().filter(|l| l.is_key(key)).cloned().collect();
        let new: Vec<Line> = values
            .iter()
            .map(|value| Line::Entry {
                op: EntryOp::Append,
                key: key.to_string(),
                value: value.clone(),
            })
            .collect();
        if old == new {
            return Ok(false);
        }

        let insert_at = section
            .lines
            .iter()
            .position(|l| l.is_key(key))
            .unwrap_or(section.lines.len());
        section.lines.retain(|l| !l.is_key(key));
        let insert_at = insert_at.min(section.lines.len());
        section.lines.splice(insert_at..insert_at, new);
        Ok(true)
    }
}

impl fmt::Display for IniDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.preamble {
            writeln!(f, "{}", line)?;
        }
        for (i, section) in self.sections.iter().enumerate() {
            if i > 0 {
                let previous_ends_blank = matches!(
                    self.sections[i - 1].lines.last(),
                    Some(Line::Verbatim(text)) if text.trim().is_empty()
                );
                if !previous_ends_blank {
                    writeln!(f)?;
                }
            }
            writeln!(f, "[{}]", section.name)?;
            for line in &section.lines {
                match line {
                    Line::Entry { op, key, value } => {
                        writeln!(f, "{}{}={}", op.prefix(), key, value)?
                    }
                    Line::Verbatim(text) => writeln!(f, "{}", text)?,
                }
            }
        }
        Ok(())
    }
}

/// Values are stored one per line with no quoting
fn check_single_line(key: &str, value: &str) -> Result<()> {
    if value.contains(['\r', '\n']) {
        bail!("Value for {} must not contain line breaks", key);
    }
    Ok(())
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// INI file on disk with pending in-memory edits
#[derive(Debug)]
pub struct ConfigStore {
    path: PathBuf,
    document: IniDocument,
    /// Document as last read from or written to disk
    saved: IniDocument,
    dirty: bool,
}

impl ConfigStore {
    /// Open a config file. A missing file is treated as empty.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let document = Self::read(&path)?;
        Ok(Self {
            path,
            saved: document.clone(),
            document,
            dirty: false,
        })
    }

    fn read(path: &Path) -> Result<IniDocument> {
        if !path.exists() {
            debug!("Config file {:?} does not exist yet", path);
            return Ok(IniDocument::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        Ok(IniDocument::parse(&content))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.document.get_string(section, key)
    }

    pub fn get_bool(&self, section: &str, key: &str) -> Option<bool> {
        self.document.get_bool(section, key)
    }

    pub fn get_array(&self, section: &str, key: &str) -> Vec<String> {
        self.document.get_array(section, key)
    }

    pub fn set_string(&mut self, section: &str, key: &str, value: &str) -> Result<()> {
        self.dirty |= self.document.set_string(section, key, value)?;
        Ok(())
    }

    pub fn set_bool(&mut self, section: &str, key: &str, value: bool) -> Result<()> {
        self.dirty |= self.document.set_bool(section, key, value)?;
        Ok(())
    }

    pub fn set_array(&mut self, section: &str, key: &str, values: &[String]) -> Result<()> {
        self.dirty |= self.document.set_array(section, key, values)?;
        Ok(())
    }

    /// Write pending edits to disk. Returns true if the file was written.
    pub fn flush(&mut self) -> Result<bool> {
        if !self.dirty {
            return Ok(false);
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create config directory {:?}", parent))?;
            }
        }

        std::fs::write(&self.path, self.document.to_string())
            .with_context(|| format!("Failed to write config file {:?}", self.path))?;
        self.saved = self.document.clone();
        self.dirty = false;
        info!("Saved config to {:?}", self.path);
        Ok(true)
    }

    /// Re-read the file from disk, dropping unflushed edits.
    /// If the file can't be read, falls back to the last saved state.
    pub fn reload(&mut self) -> Result<()> {
        self.dirty = false;
        match Self::read(&self.path) {
            Ok(document) => {
                self.saved = document.clone();
                self.document = document;
                Ok(())
            }
            Err(e) => {
                self.document = self.saved.clone();
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECTION: &str = "/Script/Test.Settings";

    const SAMPLE: &str = "; engine config\n\
[/Script/EngineSettings.GameMapsSettings]\n\
GameDefaultMap=/Game/Maps/Main\n\
\n\
[/Script/Test.Settings]\n\
Name=Old\n\
+Items=a\n\
+Items=b\n\
Flag=True\n";

    #[test]
    fn test_parse_and_get() {
        let doc = IniDocument::parse(SAMPLE);
        assert_eq!(doc.get_string(SECTION, "Name").as_deref(), Some("Old"));
        assert_eq!(doc.get_string(SECTION, "name").as_deref(), Some("Old"));
        assert_eq!(doc.get_array(SECTION, "Items"), vec!["a", "b"]);
        assert_eq!(doc.get_bool(SECTION, "Flag"), Some(true));
        assert_eq!(doc.get_string(SECTION, "Missing"), None);
        assert_eq!(doc.get_string("/Script/Other", "Name"), None);
    }

    #[test]
    fn test_roundtrip_preserves_unrelated_text() {
        let doc = IniDocument::parse(SAMPLE);
        assert_eq!(doc.to_string(), SAMPLE);
    }

    #[test]
    fn test_array_operators() {
        let doc = IniDocument::parse(
            "[S]\n+A=x\n+A=x\n.A=x\n+A=y\n-A=x\n+A=z\n!B=ClearArray\n+B=1\n!B=ClearArray\n+B=2\n",
        );
        assert_eq!(doc.get_array("S", "A"), vec!["y", "z"]);
        assert_eq!(doc.get_array("S", "B"), vec!["2"]);
    }

    #[test]
    fn test_set_string_updates_in_place() {
        let mut doc = IniDocument::parse(SAMPLE);
        assert!(doc.set_string(SECTION, "Name", "New").unwrap());
        assert!(!doc.set_string(SECTION, "Name", "New").unwrap());
        let text = doc.to_string();
        assert!(text.contains("Name=New\n+Items=a"));
        assert!(text.contains("GameDefaultMap=/Game/Maps/Main"));
    }

    #[test]
    fn test_set_creates_missing_section() {
        let mut doc = IniDocument::parse(SAMPLE);
        assert!(doc.set_bool("/Script/New", "Enabled", false).unwrap());
        assert_eq!(doc.get_bool("/Script/New", "Enabled"), Some(false));
        assert!(doc.to_string().ends_with("Flag=True\n\n[/Script/New]\nEnabled=False\n"));
    }

    #[test]
    fn test_set_array_replaces_entries() {
        let mut doc = IniDocument::parse(SAMPLE);
        let values = vec!["c".to_string()];
        assert!(doc.set_array(SECTION, "Items", &values).unwrap());
        assert!(!doc.set_array(SECTION, "Items", &values).unwrap());
        assert_eq!(doc.get_array(SECTION, "Items"), vec!["c"]);
        assert!(doc.to_string().contains("Name=Old\n+Items=c\nFlag=True"));
    }

    #[test]
    fn test_line_breaks_in_values_rejected() {
        let mut doc = IniDocument::parse(SAMPLE);
        assert!(doc.set_string(SECTION, "Name", "dev\nOther=injected").is_err());
        assert!(doc.set_string(SECTION, "Name", "dev\r").is_err());
        let values = vec!["ok".to_string(), "a\nb".to_string()];
        assert!(doc.set_array(SECTION, "Items", &values).is_err());

        assert_eq!(doc.to_string(), SAMPLE);
        assert_eq!(doc.get_string(SECTION, "Other"), None);
    }

    #[test]
    fn test_crlf_input() {
        let doc = IniDocument::parse("[S]\r\nKey=Value\r\n");
        assert_eq!(doc.get_string("S", "Key").as_deref(), Some("Value"));
    }

    #[test]
    fn test_store_flush_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Config").join("DefaultEngine.ini");

        let mut store = ConfigStore::open(&path).unwrap();
        assert!(!store.flush().unwrap());

        store.set_string(SECTION, "Name", "Value").unwrap();
        assert!(store.is_dirty());
        assert!(store.flush().unwrap());
        assert!(!store.is_dirty());
        assert!(!store.flush().unwrap());

        store.set_string(SECTION, "Name", "Unsaved").unwrap();
        store.reload().unwrap();
        assert_eq!(store.get_string(SECTION, "Name").as_deref(), Some("Value"));

        let reopened = ConfigStore::open(&path).unwrap();
        assert_eq!(reopened.get_string(SECTION, "Name").as_deref(), Some("Value"));
    }

    #[test]
    fn test_failed_flush_then_reload_drops_edit() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("Config");
        std::fs::write(&blocker, "not a directory").unwrap();
        let path = blocker.join("DefaultEngine.ini");

        let mut store = ConfigStore::open(&path).unwrap();
        store.set_string(SECTION, "Name", "Value").unwrap();
        assert!(store.flush().is_err());
        assert!(store.is_dirty());

        let _ = store.reload();
        assert!(!store.is_dirty());
        assert_eq!(store.get_string(SECTION, "Name"), None);
    }
}
