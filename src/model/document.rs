use ropey::Rope;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// A location in a document. `character` counts Unicode scalar values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Position {
    pub line: usize,
    pub character: usize,
}

impl Position {
    pub fn new(line: usize, character: usize) -> Self {
        Self { line, character }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }
}

/// Replacement of `range` with `new_text`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEdit {
    pub range: Range,
    pub new_text: String,
}

impl TextEdit {
    pub fn replace(range: Range, new_text: impl Into<String>) -> Self {
        Self {
            range,
            new_text: new_text.into(),
        }
    }
}

/// Editor formatting options passed with every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormattingOptions {
    pub tab_size: u32,
    pub insert_spaces: bool,
}

impl Default for FormattingOptions {
    fn default() -> Self {
        Self {
            tab_size: 4,
            insert_spaces: true,
        }
    }
}

/// An open document backed by a Rope.
#[derive(Debug, Clone)]
pub struct Document {
    pub path: PathBuf,
    pub language_id: String,
    pub rope: Rope,
}

impl Document {
    pub fn new(path: impl Into<PathBuf>, language_id: impl Into<String>, text: &str) -> Self {
        Self {
            path: path.into(),
            language_id: language_id.into(),
            rope: Rope::from_str(text),
        }
    }

    /// Create a document from file contents.
    pub fn from_file(path: PathBuf, language_id: impl Into<String>) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(&path)?;
        Ok(Self::new(path, language_id, &text))
    }

    /// Write the document back to its path through a uniquely named temporary
    /// file in the same directory. The original file's permissions carry over.
    pub fn save(&self) -> anyhow::Result<()> {
        let dir = self
            .path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        let mut tmp = NamedTempFile::new_in(dir)?;
        {
            let mut writer = std::io::BufWriter::new(tmp.as_file_mut());
            for chunk in self.rope.chunks() {
                writer.write_all(chunk.as_bytes())?;
            }
            writer.flush()?;
        }

        if let Ok(metadata) = std::fs::metadata(&self.path) {
            tmp.as_file().set_permissions(metadata.permissions())?;
        }
        tmp.persist(&self.path)?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn text(&self) -> String {
        self.rope.to_string()
    }

    /// From the start of the first line through the end of the last line,
    /// line break included.
    pub fn full_range(&self) -> Range {
        let last = self.rope.len_lines().saturating_sub(1);
        let end = Position::new(last, self.rope.line(last).len_chars());
        Range::new(Position::default(), end)
    }

    /// Apply edits, back to front so earlier ranges stay valid.
    pub fn apply_edits(&mut self, edits: &[TextEdit]) {
        let mut ordered: Vec<&TextEdit> = edits.iter().collect();
        ordered.sort_by(|a, b| b.range.start.cmp(&a.range.start));

        for edit in ordered {
            let start = self.char_index(edit.range.start);
            let end = self.char_index(edit.range.end).max(start);
            self.rope.remove(start..end);
            self.rope.insert(start, &edit.new_text);
        }
    }

    fn char_index(&self, pos: Position) -> usize {
        if pos.line >= self.rope.len_lines() {
            return self.rope.len_chars();
        }
        let line_start = self.rope.line_to_char(pos.line);
        let line_len = self.rope.line(pos.line).len_chars();
        line_start + pos.character.min(line_len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_range_covers_trailing_newline() {
        let doc = Document::new("/tmp/a.txt", "plaintext", "abc\ndef\n");
        assert_eq!(
            doc.full_range(),
            Range::new(Position::new(0, 0), Position::new(2, 0))
        );
    }

    #[test]
    fn full_range_without_trailing_newline() {
        let doc = Document::new("/tmp/a.txt", "plaintext", "abc\ndéf");
        assert_eq!(doc.full_range().end, Position::new(1, 3));
    }

    #[test]
    fn full_range_of_empty_document() {
        let doc = Document::new("/tmp/a.txt", "plaintext", "");
        assert_eq!(doc.full_range(), Range::default());
    }

    #[test]
    fn whole_document_edit_replaces_everything() {
        let mut doc = Document::new("/tmp/a.txt", "plaintext", "b\na\n");
        let edit = TextEdit::replace(doc.full_range(), "a\nb\n");
        doc.apply_edits(&[edit]);
        assert_eq!(doc.text(), "a\nb\n");
    }

    #[test]
    fn save_writes_back_to_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.txt");
        std::fs::write(&path, "old\n").unwrap();

        let mut doc = Document::from_file(path.clone(), "plaintext").unwrap();
        let edit = TextEdit::replace(doc.full_range(), "new\n");
        doc.apply_edits(&[edit]);
        doc.save().unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "new\n");
    }

    #[test]
    fn save_leaves_sibling_files_alone() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        let sibling = dir.path().join("notes.tmp");
        std::fs::write(&path, "b\n").unwrap();
        std::fs::write(&sibling, "precious").unwrap();

        let doc = Document::from_file(path.clone(), "plaintext").unwrap();
        doc.save().unwrap();

        assert_eq!(std::fs::read_to_string(&sibling).unwrap(), "precious");
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "b\n");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    #[test]
    fn same_stem_documents_save_independently() {
        let dir = tempfile::tempdir().unwrap();
        let rs = Document::new(dir.path().join("foo.rs"), "rust", "fn main() {}\n");
        let py = Document::new(dir.path().join("foo.py"), "python", "pass\n");

        rs.save().unwrap();
        py.save().unwrap();

        let read = |name: &str| std::fs::read_to_string(dir.path().join(name)).unwrap();
        assert_eq!(read("foo.rs"), "fn main() {}\n");
        assert_eq!(read("foo.py"), "pass\n");
    }

    #[cfg(unix)]
    #[test]
    fn save_keeps_file_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.sh");
        std::fs::write(&path, "echo hi\n").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o750)).unwrap();

        let doc = Document::from_file(path.clone(), "shellscript").unwrap();
        doc.save().unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o750);
    }

    #[test]
    fn edits_apply_back_to_front() {
        let mut doc = Document::new("/tmp/a.txt", "plaintext", "one two\nthree\n");
        doc.apply_edits(&[
            TextEdit::replace(Range::new(Position::new(0, 0), Position::new(0, 3)), "1"),
            TextEdit::replace(Range::new(Position::new(1, 0), Position::new(1, 5)), "3"),
        ]);
        assert_eq!(doc.text(), "1 two\n3\n");
    }
}
