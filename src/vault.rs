use crate::config::VaultConfig;
use chrono::NaiveDate;
use regex::Regex;
use std::fs;
use std::io;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Computes the note path for a date from the configured folder and
/// chrono filename format.
pub fn daily_note_path(vault: &VaultConfig, date: NaiveDate) -> PathBuf {
    let stem = date.format(&vault.filename_format).to_string();
    vault.daily_notes_dir.join(format!("{stem}.md"))
}

/// Maps a calendar date to an existing daily note, if there is one.
pub trait NoteResolver {
    fn resolve(&self, date: NaiveDate) -> Option<PathBuf>;
}

pub struct DailyNoteResolver {
    pub vault: VaultConfig,
}

impl NoteResolver for DailyNoteResolver {
    fn resolve(&self, date: NaiveDate) -> Option<PathBuf> {
        let path = daily_note_path(&self.vault, date);
        path.is_file().then_some(path)
    }
}

/// Key-value property access on a single note.
///
/// Implementations give no cross-call ordering guarantee for the same note;
/// callers must never have two mutations of one note in flight at once.
pub trait PropertyStore {
    /// Current value of `name`, or `None` if the note has no such property.
    fn read_property(&self, note: &Path, name: &str) -> io::Result<Option<String>>;
    fn create_property(&self, note: &Path, name: &str, value: i64) -> io::Result<()>;
    fn update_property(&self, note: &Path, name: &str, value: i64) -> io::Result<()>;
}

/// Stores properties as `key: value` lines inside the note's leading `---`
/// fenced block. The note body below the block is never touched.
pub struct FrontmatterStore;

fn property_line_re() -> &'static Regex {
    static PROPERTY_RE: OnceLock<Regex> = OnceLock::new();
    PROPERTY_RE.get_or_init(|| Regex::new(r"^([^:]+?)\s*:\s*(.*)$").expect("Valid regex pattern"))
}

fn split_property_line(line: &str) -> Option<(&str, &str)> {
    let caps = property_line_re().captures(line)?;
    let key = caps.get(1)?.as_str();
    let value = caps.get(2).map_or("", |m| m.as_str());
    Some((key, value.trim()))
}

/// Line range of the frontmatter body (fences excluded), if the note opens
/// with a fenced block.
fn frontmatter_body(lines: &[String]) -> Option<Range<usize>> {
    if lines.first().map(|l| l.trim_end()) != Some("---") {
        return None;
    }
    let close = lines
        .iter()
        .skip(1)
        .position(|l| l.trim_end() == "---")?
        + 1;
    Some(1..close)
}

fn read_note_lines(note: &Path) -> io::Result<Vec<String>> {
    let content = fs::read_to_string(note)?;
    Ok(content.lines().map(str::to_string).collect())
}

fn write_note_lines(note: &Path, lines: &[String]) -> io::Result<()> {
    let mut content = lines.join("\n");
    content.push('\n');
    fs::write(note, content)
}

impl PropertyStore for FrontmatterStore {
    fn read_property(&self, note: &Path, name: &str) -> io::Result<Option<String>> {
        let lines = read_note_lines(note)?;
        let Some(body) = frontmatter_body(&lines) else {
            return Ok(None);
        };
        for line in &lines[body] {
            if let Some((key, value)) = split_property_line(line)
                && key == name
            {
                return Ok(Some(value.to_string()));
            }
        }
        Ok(None)
    }

    fn create_property(&self, note: &Path, name: &str, value: i64) -> io::Result<()> {
        let mut lines = read_note_lines(note)?;
        let entry = format!("{name}: {value}");
        match frontmatter_body(&lines) {
            Some(body) => lines.insert(body.end, entry),
            None => {
                let mut with_block = vec!["---".to_string(), entry, "---".to_string()];
                with_block.extend(lines);
                lines = with_block;
            }
        }
        write_note_lines(note, &lines)
    }

    fn update_property(&self, note: &Path, name: &str, value: i64) -> io::Result<()> {
        let mut lines = read_note_lines(note)?;
        let Some(body) = frontmatter_body(&lines) else {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("note {} has no frontmatter block", note.display()),
            ));
        };
        for idx in body {
            if let Some((key, _)) = split_property_line(&lines[idx])
                && key == name
            {
                lines[idx] = format!("{name}: {value}");
                return write_note_lines(note, &lines);
            }
        }
        Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("note {} has no property {name:?}", note.display()),
        ))
    }
}
