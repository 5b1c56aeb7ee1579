//! The line source: file contents, incremental edits, dialect detection,
//! and logical-line splicing.

use std::error::Error;
use std::fmt::Display;
use std::fs;
use std::io;
use std::path::PathBuf;

use log::debug;
use lsp_types::TextDocumentContentChangeEvent;
use sha2::{Digest, Sha256};

use crate::config::ParseConfig;
use crate::parser::recognize::recognize;
use crate::patterns;
use crate::preproc::{self, DefineMap};
use crate::scan::{strip_line_label, strip_strings};

/// Failure to read a source file from disk.
#[derive(Debug)]
pub struct SourceError {
    path: PathBuf,
    source: io::Error,
}

impl Display for SourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "could not read/decode file {}: {}",
            self.path.display(),
            self.source
        )
    }
}

impl Error for SourceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.source)
    }
}

/// Decide the source layout of a file.
///
/// Free-form cues anywhere (a 1-4 column indent before a letter, or a
/// trailing `&`) force free-form. Otherwise the first code-looking lines
/// vote: a majority starting beyond column 6, carrying a statement label,
/// or continuing in column 6 means fixed form.
pub fn detect_fixed_format(lines: &[String]) -> bool {
    const VOTERS: usize = 50;
    let mut fixed_votes = 0usize;
    let mut seen = 0usize;
    for line in lines {
        if patterns::FREE_OPENMP.is_match(line) {
            continue;
        }
        let stripped = strip_strings(line, false);
        if patterns::FREE_FORMAT_TEST.is_match(&stripped) {
            return false;
        }
        if stripped.trim_end().ends_with('&') {
            return false;
        }
        if seen < VOTERS && !stripped.trim().is_empty() {
            if patterns::FIXED_COMMENT_LINE.is_match(&stripped) {
                continue;
            }
            seen += 1;
            if stripped.starts_with("      ")
                || patterns::FIXED_CONT.is_match(&stripped)
                || patterns::LINE_LABEL.is_match(&stripped)
            {
                fixed_votes += 1;
            }
        }
    }
    seen > 0 && fixed_votes * 2 > seen
}

/// Convert an LSP UTF-16 column to a byte offset into `line`, clamped to
/// the line length.
fn utf16_col_to_byte(line: &str, col: u32) -> usize {
    let mut utf16 = 0usize;
    for (idx, ch) in line.char_indices() {
        if utf16 >= col as usize {
            return idx;
        }
        utf16 += ch.len_utf16();
    }
    line.len()
}

/// A Fortran source file held as physical lines.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: PathBuf,
    /// Original physical lines, tabs mapped to single spaces.
    pub contents_split: Vec<String>,
    /// Preprocessed lines, same length; lines inside skip ranges are
    /// empty.
    pub contents_pp: Vec<String>,
    pub fixed: bool,
    /// Whether the preprocessor runs for this file.
    pub preproc: bool,
    pub nlines: usize,
    pub hash: Option<String>,
    /// Working definitions after the last preprocess pass.
    pub pp_defs: DefineMap,
}

impl SourceFile {
    /// Create an empty file object. Preprocessing is enabled when the
    /// extension appears in `pp_suffixes`, or, with no suffix list, when
    /// the extension equals its own upper-case form (`.F90`, `.FOR`, ...).
    pub fn new(path: impl Into<PathBuf>, pp_suffixes: &[String]) -> Self {
        let path = path.into();
        let preproc = match path.extension() {
            Some(ext) => {
                let ext = format!(".{}", ext.to_string_lossy());
                if pp_suffixes.is_empty() {
                    ext == ext.to_uppercase()
                } else {
                    pp_suffixes.iter().any(|suffix| suffix == &ext)
                }
            }
            None => false,
        };
        Self {
            path,
            contents_split: Vec::new(),
            contents_pp: Vec::new(),
            fixed: false,
            preproc,
            nlines: 0,
            hash: None,
            pp_defs: DefineMap::new(),
        }
    }

    /// Build a file object directly from text (tests, unsaved buffers).
    pub fn from_contents(path: impl Into<PathBuf>, text: &str, pp_suffixes: &[String]) -> Self {
        let mut file = Self::new(path, pp_suffixes);
        let normalized = text.replace('\t', " ");
        file.hash = Some(content_digest(&normalized));
        file.set_contents(preproc::split_lines(&normalized), true);
        file
    }

    /// Read (or re-read) the file from disk.
    ///
    /// Returns `Ok(false)` when the digest matches the stored one and the
    /// contents were left untouched.
    pub fn load_from_disk(&mut self) -> Result<bool, SourceError> {
        let bytes = fs::read(&self.path).map_err(|source| SourceError {
            path: self.path.clone(),
            source,
        })?;
        let contents = String::from_utf8_lossy(&bytes).replace('\t', " ");
        let digest = content_digest(&contents);
        if self.hash.as_deref() == Some(digest.as_str()) {
            return Ok(false);
        }
        self.hash = Some(digest);
        self.set_contents(preproc::split_lines(&contents), true);
        Ok(true)
    }

    /// Replace the file contents, optionally re-detecting the dialect.
    pub fn set_contents(&mut self, contents: Vec<String>, detect_format: bool) {
        self.contents_split = contents;
        self.contents_pp = self.contents_split.clone();
        self.nlines = self.contents_split.len();
        if detect_format {
            self.fixed = detect_fixed_format(&self.contents_split);
        }
    }

    pub fn get_line(&self, line_number: usize, pp_content: bool) -> Option<&str> {
        let lines = if pp_content {
            &self.contents_pp
        } else {
            &self.contents_split
        };
        lines.get(line_number).map(String::as_str)
    }

    /// Apply an LSP content change. Returns true when the edit requires a
    /// full re-parse of the file.
    pub fn apply_change(&mut self, change: &TextDocumentContentChangeEvent) -> bool {
        self.hash = None;
        let text = &change.text;
        let text_split: Vec<String> = if text.is_empty() {
            vec![String::new()]
        } else {
            let mut split = preproc::split_lines(text);
            if text.ends_with('\n') || text.ends_with('\r') {
                split.push(String::new());
            }
            split
        };

        let range = match change.range {
            None => {
                // The whole file changed.
                self.set_contents(text_split, true);
                return true;
            }
            Some(range) => range,
        };
        let start_line = range.start.line as usize;
        let end_line = range.end.line as usize;

        // Edit at the very end of the file: pure append.
        if start_line >= self.nlines {
            let mut contents = std::mem::take(&mut self.contents_split);
            contents.extend(text_split);
            self.set_contents(contents, true);
            return true;
        }

        // Single-line fast path.
        if start_line == end_line && text_split.len() == 1 && !text.contains('\n') {
            let prev_line = &self.contents_split[start_line];
            let start_byte = utf16_col_to_byte(prev_line, range.start.character);
            let end_byte = utf16_col_to_byte(prev_line, range.end.character).max(start_byte);
            let new_line = format!(
                "{}{}{}",
                &prev_line[..start_byte],
                text,
                &prev_line[end_byte..]
            );
            self.contents_split[start_line] = new_line.clone();
            self.contents_pp[start_line] = new_line;
            return self.change_requires_reparse(start_line);
        }

        // General splice.
        let mut new_contents: Vec<String> =
            Vec::with_capacity(self.nlines + text_split.len());
        for (i, line) in self.contents_split.iter().enumerate() {
            if i < start_line || i > end_line {
                new_contents.push(line.clone());
                continue;
            }
            if i == start_line {
                let start_byte = utf16_col_to_byte(line, range.start.character);
                for (j, change_line) in text_split.iter().enumerate() {
                    if j == 0 {
                        new_contents.push(format!("{}{}", &line[..start_byte], change_line));
                    } else {
                        new_contents.push(change_line.clone());
                    }
                }
            }
            if i == end_line {
                let end_byte = utf16_col_to_byte(line, range.end.character);
                if let Some(last) = new_contents.last_mut() {
                    last.push_str(&line[end_byte..]);
                }
            }
        }
        self.set_contents(new_contents, true);
        true
    }

    /// Decide whether an edited line can alter the declaration structure.
    pub fn change_requires_reparse(&self, line_number: usize) -> bool {
        if line_number >= self.nlines {
            return true;
        }
        let (pre_lines, curr_line, _) = self.get_code_line(line_number, false, true, false, false);
        let Some(curr_line) = curr_line else {
            return true;
        };
        let comment_pattern = if self.fixed {
            &patterns::FIXED_COMMENT_LINE
        } else {
            &patterns::FREE_COMMENT_LINE
        };
        if comment_pattern.is_match(&curr_line) {
            return false;
        }
        let full_line = pre_lines.concat() + &curr_line;
        let (full_line, label) = strip_line_label(&full_line);
        if label.is_some() {
            return true;
        }
        let masked = strip_strings(&full_line, true);
        if masked.contains(';') {
            return true;
        }
        let no_comment = match masked.find('!') {
            Some(idx) => &full_line[..idx],
            None => full_line.as_str(),
        };
        if patterns::END_WORD.is_match(no_comment)
            || patterns::IMPLICIT.is_match(no_comment)
            || patterns::CONTAINS.is_match(no_comment)
        {
            return true;
        }
        if patterns::NON_DEF.is_match(no_comment) {
            return false;
        }
        recognize(no_comment).is_some()
    }

    /// Assemble the full logical line around a physical line.
    ///
    /// Returns the preceding continuation lines (in file order), the
    /// current line with continuation characters blanked, and the
    /// following continuation lines; comment or empty lines consumed
    /// inside a free-form chain appear as empty placeholders so callers
    /// can keep line numbers aligned.
    pub fn get_code_line(
        &self,
        line_number: usize,
        forward: bool,
        backward: bool,
        pp_content: bool,
        strip_comment: bool,
    ) -> (Vec<String>, Option<String>, Vec<String>) {
        let Some(line) = self.get_line(line_number, pp_content) else {
            return (Vec::new(), None, Vec::new());
        };
        let mut curr_line = line.to_string();
        let mut pre_lines: Vec<String> = Vec::new();

        if backward {
            if self.fixed {
                let mut line_ind = line_number as isize - 1;
                let mut tmp_line = curr_line.clone();
                while line_ind >= 0 {
                    if !patterns::FIXED_CONT.is_match(&tmp_line) {
                        break;
                    }
                    let continuation = tmp_line.clone();
                    tmp_line = self
                        .get_line(line_ind as usize, pp_content)
                        .unwrap_or("")
                        .to_string();
                    let blanked = format!("      {}", &continuation[6..]);
                    if line_ind == line_number as isize - 1 {
                        curr_line = blanked;
                    } else {
                        let last = pre_lines.len() - 1;
                        pre_lines[last] = blanked;
                    }
                    pre_lines.push(tmp_line.clone());
                    line_ind -= 1;
                }
            } else {
                if let Some(leading) = patterns::FREE_CONT.find(&curr_line) {
                    let end = leading.end();
                    curr_line = format!("{}{}", " ".repeat(end), &curr_line[end..]);
                }
                let mut line_ind = line_number as isize - 1;
                while line_ind >= 0 {
                    let raw = self.get_line(line_ind as usize, pp_content).unwrap_or("");
                    let masked = strip_strings(raw, true);
                    let mut no_comm = masked.split('!').next().unwrap_or("").to_string();
                    let cont_ind = no_comm.rfind('&');
                    if let Some(leading) = patterns::FREE_CONT.find(&no_comm) {
                        let end = leading.end();
                        if cont_ind == Some(end - 1) {
                            break;
                        }
                        no_comm = format!("{}{}", " ".repeat(end), &no_comm[end..]);
                    }
                    match cont_ind {
                        Some(idx) => pre_lines.push(no_comm[..idx].to_string()),
                        None => break,
                    }
                    line_ind -= 1;
                }
            }
            pre_lines.reverse();
        }

        let mut post_lines: Vec<String> = Vec::new();
        if forward {
            if self.fixed {
                let mut line_ind = line_number + 1;
                while line_ind < self.nlines {
                    let next_line = self.get_line(line_ind, pp_content).unwrap_or("");
                    if !patterns::FIXED_CONT.is_match(next_line) {
                        break;
                    }
                    post_lines.push(format!("      {}", &next_line[6..]));
                    line_ind += 1;
                }
            } else {
                let mut line_ind = line_number + 1;
                let mut masked = strip_strings(&curr_line, true);
                let mut fetched = String::new();
                let mut first = true;
                loop {
                    let amper = masked.find('&');
                    let comm = masked.find('!');
                    let Some(amper_idx) = amper else { break };
                    if let Some(comm_idx) = comm {
                        if amper_idx > comm_idx {
                            break;
                        }
                    }
                    if first {
                        curr_line.truncate(amper_idx);
                        first = false;
                    } else if !fetched.is_empty() {
                        let last = post_lines.len() - 1;
                        post_lines[last].truncate(amper_idx);
                    }
                    let Some(raw) = self.get_line(line_ind, pp_content) else {
                        break;
                    };
                    line_ind += 1;
                    // Comment, empty, and directive lines inside a chain
                    // become placeholders; the pending '&' stays live.
                    if raw.trim_end().is_empty()
                        || patterns::FREE_COMMENT_LINE.is_match(raw)
                        || patterns::PP_ANY.is_match(raw)
                    {
                        fetched.clear();
                        post_lines.push(String::new());
                        continue;
                    }
                    let mut next_line = raw.to_string();
                    if let Some(leading) = patterns::FREE_CONT.find(&next_line) {
                        let end = leading.end();
                        next_line = format!("{}{}", " ".repeat(end), &next_line[end..]);
                    }
                    fetched = next_line.clone();
                    masked = strip_strings(&next_line, true);
                    post_lines.push(next_line);
                }
            }
        }

        if strip_comment {
            curr_line = self.strip_comment(&curr_line);
        }
        (pre_lines, Some(curr_line), post_lines)
    }

    /// Strip a trailing comment; OpenMP sentinel lines stay intact.
    pub fn strip_comment(&self, line: &str) -> String {
        if self.fixed {
            if patterns::FIXED_COMMENT_LINE.is_match(line) && patterns::FIXED_OPENMP.is_match(line)
            {
                return String::new();
            }
            line.to_string()
        } else {
            if patterns::FREE_OPENMP.is_match(line) {
                return line.to_string();
            }
            let masked = strip_strings(line, true);
            match masked.find('!') {
                Some(idx) => line[..idx].to_string(),
                None => line.to_string(),
            }
        }
    }

    /// Run the preprocessor pass, rewriting `contents_pp` in place and
    /// blanking excluded lines. Returns the skip ranges and the
    /// `#define` line numbers.
    pub fn preprocess(&mut self, config: &ParseConfig) -> (Vec<(usize, usize)>, Vec<usize>) {
        let seed = DefineMap::from_config(&config.pp_defs);
        let result = preproc::preprocess_file(
            &self.contents_split,
            Some(&self.path),
            &seed,
            &config.include_dirs,
        );
        let mut lines = result.lines;
        for &(start, end) in &result.skips {
            for line_number in start..=end.min(lines.len()) {
                lines[line_number - 1].clear();
            }
        }
        debug!(
            "preprocessed {}: {} skip range(s), {} definition(s)",
            self.path.display(),
            result.skips.len(),
            result.defs.len()
        );
        self.contents_pp = lines;
        self.pp_defs = result.defs;
        (result.skips, result.defines)
    }
}

fn content_digest(contents: &str) -> String {
    let digest = Sha256::digest(contents.as_bytes());
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use lsp_types::{Position, Range};

    fn free_file(text: &str) -> SourceFile {
        SourceFile::from_contents("/tmp/test.f90", text, &[])
    }

    fn change(
        start: (u32, u32),
        end: (u32, u32),
        text: &str,
    ) -> TextDocumentContentChangeEvent {
        TextDocumentContentChangeEvent {
            range: Some(Range {
                start: Position {
                    line: start.0,
                    character: start.1,
                },
                end: Position {
                    line: end.0,
                    character: end.1,
                },
            }),
            range_length: None,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_format_detection() {
        assert!(!detect_fixed_format(&preproc::split_lines(
            "module m\n  implicit none\nend module m\n"
        )));
        assert!(detect_fixed_format(&preproc::split_lines(
            "      program main\n      x = 1\n      end\n"
        )));
        // Trailing ampersand forces free form.
        assert!(!detect_fixed_format(&preproc::split_lines(
            "      real :: x, &\n      y\n"
        )));
    }

    #[test]
    fn test_preproc_extension_heuristic() {
        assert!(SourceFile::new("/tmp/a.F90", &[]).preproc);
        assert!(!SourceFile::new("/tmp/a.f90", &[]).preproc);
        assert!(SourceFile::new("/tmp/a.fpp", &[".fpp".to_string()]).preproc);
        assert!(!SourceFile::new("/tmp/a.F90", &[".fpp".to_string()]).preproc);
    }

    #[test]
    fn test_single_line_edit_splices_in_place() {
        let mut file = free_file("integer :: x\ny = 1\n");
        let reparse = file.apply_change(&change((1, 0), (1, 1), "z"));
        assert_eq!(file.contents_split[1], "z = 1");
        // Assignment lines do not need a structural re-parse.
        assert!(!reparse);
    }

    #[test]
    fn test_single_line_edit_on_declaration_reparses() {
        let mut file = free_file("integer :: x\ny = 1\n");
        let reparse = file.apply_change(&change((0, 11), (0, 12), "xx"));
        assert_eq!(file.contents_split[0], "integer :: xx");
        assert!(reparse);
    }

    #[test]
    fn test_multi_line_edit() {
        let mut file = free_file("aaa\nbbb\nccc\n");
        let reparse = file.apply_change(&change((0, 1), (2, 1), "XX\nYY"));
        assert!(reparse);
        assert_eq!(file.contents_split, vec!["aXX", "YYcc"]);
    }

    #[test]
    fn test_append_at_eof() {
        let mut file = free_file("aaa");
        file.apply_change(&change((1, 0), (1, 0), "bbb"));
        assert_eq!(file.contents_split, vec!["aaa", "bbb"]);
    }

    #[test]
    fn test_whole_file_replace() {
        let mut file = free_file("aaa\n");
        let reparse = file.apply_change(&TextDocumentContentChangeEvent {
            range: None,
            range_length: None,
            text: "integer :: x\n".to_string(),
        });
        assert!(reparse);
        assert_eq!(file.contents_split, vec!["integer :: x", ""]);
    }

    #[test]
    fn test_empty_edit_keeps_contents() {
        let mut file = free_file("integer :: x\n");
        let before = file.contents_split.clone();
        file.apply_change(&change((0, 0), (0, 0), ""));
        assert_eq!(file.contents_split, before);
    }

    #[test]
    fn test_free_form_forward_splice() {
        let file = free_file("real :: &\n  x, y\n");
        let (_, curr, post) = file.get_code_line(0, true, false, false, false);
        let logical = format!("{}{}", curr.unwrap(), post.concat());
        assert_eq!(logical, "real ::   x, y");
    }

    #[test]
    fn test_free_form_splice_skips_comments() {
        let file = free_file("real :: a, &\n! interlude\n\n  b\n");
        let (_, curr, post) = file.get_code_line(0, true, false, false, false);
        assert_eq!(post.len(), 3);
        let logical = format!("{}{}", curr.unwrap(), post.concat());
        assert_eq!(logical, "real :: a,   b");
    }

    #[test]
    fn test_free_form_backward_splice() {
        let file = free_file("real :: a, &\n  b\n");
        let (pre, curr, _) = file.get_code_line(1, false, true, false, false);
        assert_eq!(pre, vec!["real :: a, ".to_string()]);
        assert_eq!(curr.unwrap(), "  b");
    }

    #[test]
    fn test_fixed_form_splice() {
        let text = "      real x,\n     1     y\n";
        let mut file = SourceFile::from_contents("/tmp/t.f", text, &[]);
        file.fixed = true;
        let (_, curr, post) = file.get_code_line(0, true, false, false, false);
        assert_eq!(curr.unwrap(), "      real x,");
        assert_eq!(post, vec!["           y".to_string()]);
    }

    #[test]
    fn test_ampersand_inside_string_is_not_continuation() {
        let file = free_file("msg = 'a & b'\nx = 1\n");
        let (_, curr, post) = file.get_code_line(0, true, false, false, false);
        assert_eq!(curr.unwrap(), "msg = 'a & b'");
        assert!(post.is_empty());
    }

    #[test]
    fn test_reparse_heuristic_cases() {
        let file = free_file(
            "x = 1\n! comment\nend module\ninteger :: v\ncall sub(a)\n10 continue\na; b\n",
        );
        assert!(!file.change_requires_reparse(0));
        assert!(!file.change_requires_reparse(1));
        assert!(file.change_requires_reparse(2));
        assert!(file.change_requires_reparse(3));
        assert!(!file.change_requires_reparse(4));
        assert!(file.change_requires_reparse(5));
        assert!(file.change_requires_reparse(6));
        assert!(file.change_requires_reparse(99));
    }

    #[test]
    fn test_load_from_disk_digest_short_circuit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.f90");
        std::fs::write(&path, "integer :: x\n").unwrap();
        let mut file = SourceFile::new(&path, &[]);
        assert!(file.load_from_disk().unwrap());
        assert!(!file.load_from_disk().unwrap());
        std::fs::write(&path, "integer :: y\n").unwrap();
        assert!(file.load_from_disk().unwrap());
        assert_eq!(file.contents_split, vec!["integer :: y".to_string()]);
    }

    #[test]
    fn test_load_missing_file_is_error() {
        let mut file = SourceFile::new("/nonexistent/missing.f90", &[]);
        assert!(file.load_from_disk().is_err());
    }
}
