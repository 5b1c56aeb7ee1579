//! C-preprocessor pass.
//!
//! Runs over the raw physical lines before parsing: resolves conditional
//! directives into skip ranges, collects `#define`/`#undef`, expands
//! `#include` recursively, and substitutes known macros. Output lines sit
//! at the same indices as their inputs so diagnostics keep their original
//! line numbers.

mod expr;

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use regex::{NoExpand, Regex};

use crate::patterns;

/// Insertion-ordered macro table.
///
/// Substitution applies the macros in definition order, single-pass; the
/// order is part of the observable behaviour, so a plain `HashMap` is not
/// enough.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DefineMap {
    entries: Vec<(String, String)>,
}

impl DefineMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed from caller configuration; keys are sorted so a parse is
    /// deterministic regardless of map iteration order.
    pub fn from_config(defs: &HashMap<String, String>) -> Self {
        let mut keys: Vec<&String> = defs.keys().collect();
        keys.sort();
        let entries = keys
            .into_iter()
            .map(|key| (key.clone(), defs[key].clone()))
            .collect();
        Self { entries }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(key, _)| key == name)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn insert(&mut self, name: &str, value: &str) {
        match self.entries.iter_mut().find(|(key, _)| key == name) {
            Some(entry) => entry.1 = value.to_string(),
            None => self.entries.push((name.to_string(), value.to_string())),
        }
    }

    fn append_value(&mut self, name: &str, extra: &str) {
        if let Some(entry) = self.entries.iter_mut().find(|(key, _)| key == name) {
            entry.1.push_str(extra);
        }
    }

    pub fn remove(&mut self, name: &str) {
        self.entries.retain(|(key, _)| key != name);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Result of one preprocessing pass.
#[derive(Debug, Clone)]
pub struct PreprocResult {
    /// Substituted lines, same length and indices as the input.
    pub lines: Vec<String>,
    /// Excluded line ranges, 1-based inclusive, never covering directive
    /// lines.
    pub skips: Vec<(usize, usize)>,
    /// 1-based line numbers of `#define`/`#undef` directives.
    pub defines: Vec<usize>,
    /// Final working definitions, including those picked up from includes.
    pub defs: DefineMap,
}

/// One open `#if*` frame. `excl_start` is the first excluded line of the
/// currently excluded branch, `None` while the active branch is included.
struct Frame {
    excl_start: Option<usize>,
}

/// Split file text the way the line source does.
pub(crate) fn split_lines(text: &str) -> Vec<String> {
    text.lines().map(str::to_string).collect()
}

/// Preprocess a file's lines. `path` anchors relative includes and seeds
/// cycle detection.
pub fn preprocess_file(
    lines: &[String],
    path: Option<&Path>,
    defs: &DefineMap,
    include_dirs: &[PathBuf],
) -> PreprocResult {
    let mut visited = Vec::new();
    if let Some(own) = path {
        match own.canonicalize() {
            Ok(abs) => visited.push(abs),
            Err(_) => visited.push(own.to_path_buf()),
        }
    }
    preprocess_inner(lines, path, defs.clone(), include_dirs, &mut visited)
}

fn preprocess_inner(
    lines: &[String],
    path: Option<&Path>,
    mut defs: DefineMap,
    include_dirs: &[PathBuf],
    visited: &mut Vec<PathBuf>,
) -> PreprocResult {
    let mut search_dirs: Vec<PathBuf> = Vec::new();
    if let Some(dir) = path.and_then(Path::parent) {
        search_dirs.push(dir.to_path_buf());
    }
    search_dirs.extend(include_dirs.iter().cloned());

    let mut stack: Vec<Frame> = Vec::new();
    let mut skips: Vec<(usize, usize)> = Vec::new();
    let mut defines: Vec<usize> = Vec::new();
    let mut output: Vec<String> = Vec::with_capacity(lines.len());
    let mut def_regexes: HashMap<String, Regex> = HashMap::new();
    let mut def_cont_name: Option<String> = None;

    for (i, line) in lines.iter().enumerate() {
        let line_number = i + 1;

        // Multiline macro continuation: accumulate into the open entry and
        // emit a placeholder so line numbering is preserved.
        if let Some(name) = def_cont_name.clone() {
            output.push(String::new());
            let trimmed = line.trim_end();
            if let Some(without_backslash) = trimmed.strip_suffix('\\') {
                defs.append_value(&name, without_backslash.trim());
            } else {
                defs.append_value(&name, line.trim());
                def_cont_name = None;
            }
            continue;
        }

        // Conditional directives.
        if let Some(caps) = patterns::PP_COND.captures(line) {
            output.push(line.clone());
            let directive = caps.get(1).unwrap();
            let after_directive = &line[directive.end()..];
            let opened = match directive.as_str() {
                "if " => Some(eval_pp_if(after_directive, &defs)),
                "ifdef" => Some(defs.contains(after_directive.trim())),
                "ifndef" => Some(!defs.contains(after_directive.trim())),
                _ => None,
            };
            if let Some(active) = opened {
                if active {
                    debug!("{} !!! conditional TRUE({line_number})", line.trim());
                    stack.push(Frame { excl_start: None });
                } else {
                    debug!("{} !!! conditional FALSE({line_number})", line.trim());
                    stack.push(Frame {
                        excl_start: Some(line_number + 1),
                    });
                }
                continue;
            }
            if stack.is_empty() {
                continue;
            }
            match directive.as_str() {
                "elif" => {
                    let frame = stack.last_mut().unwrap();
                    match frame.excl_start {
                        None => {
                            // A branch was already taken; everything from
                            // here to the matching #endif is excluded.
                            frame.excl_start = Some(line_number + 1);
                            debug!("{} !!! conditional FALSE({line_number})", line.trim());
                        }
                        Some(start) => {
                            if eval_pp_if(after_directive, &defs) {
                                if start < line_number {
                                    skips.push((start, line_number - 1));
                                }
                                frame.excl_start = None;
                                debug!("{} !!! conditional TRUE({line_number})", line.trim());
                            }
                        }
                    }
                }
                "else" => {
                    let frame = stack.last_mut().unwrap();
                    match frame.excl_start {
                        None => {
                            frame.excl_start = Some(line_number + 1);
                            debug!("{} !!! conditional FALSE({line_number})", line.trim());
                        }
                        Some(start) => {
                            if start < line_number {
                                skips.push((start, line_number - 1));
                            }
                            frame.excl_start = None;
                            debug!("{} !!! conditional TRUE({line_number})", line.trim());
                        }
                    }
                }
                "endif" => {
                    let frame = stack.pop().unwrap();
                    if let Some(start) = frame.excl_start {
                        if start < line_number {
                            skips.push((start, line_number - 1));
                        }
                    }
                }
                _ => {}
            }
            continue;
        }

        let included = stack
            .last()
            .map(|frame| frame.excl_start.is_none())
            .unwrap_or(true);

        // Definitions; only honoured on included branches. The first
        // definition of a name wins until an explicit #undef.
        if included {
            if let Some(caps) = patterns::PP_DEF.captures(line) {
                output.push(line.clone());
                defines.push(line_number);
                let name = &caps[2];
                if &caps[1] == "define" && !defs.contains(name) {
                    let after = &line[caps.get(0).unwrap().end()..];
                    match after.find(' ') {
                        Some(space) => {
                            let value = &after[space..];
                            let trimmed = value.trim_end();
                            match trimmed.strip_suffix('\\') {
                                Some(without_backslash) => {
                                    defs.insert(name, without_backslash.trim());
                                    def_cont_name = Some(name.to_string());
                                }
                                None => defs.insert(name, value.trim()),
                            }
                        }
                        None => defs.insert(name, "True"),
                    }
                } else if &caps[1] == "undef" {
                    defs.remove(name);
                }
                debug!("{} !!! define({line_number})", line.trim());
                continue;
            }

            // Include expansion; the directive line itself still flows
            // through substitution below.
            if let Some(caps) = patterns::PP_INCLUDE.captures(line) {
                debug!("{} !!! include({line_number})", line.trim());
                let filename = caps[1].replace('"', "");
                if !filename.is_empty() {
                    match find_include(&search_dirs, &filename) {
                        Some(include_path) => {
                            if visited.contains(&include_path) {
                                warn!(
                                    "circular #include of \"{}\" skipped",
                                    include_path.display()
                                );
                            } else {
                                match fs::read(&include_path) {
                                    Ok(bytes) => {
                                        let text = String::from_utf8_lossy(&bytes)
                                            .replace('\t', " ");
                                        let include_lines = split_lines(&text);
                                        visited.push(include_path.clone());
                                        let nested = preprocess_inner(
                                            &include_lines,
                                            Some(&include_path),
                                            defs,
                                            include_dirs,
                                            visited,
                                        );
                                        visited.pop();
                                        defs = nested.defs;
                                        debug!(
                                            "parsed include file \"{}\"",
                                            include_path.display()
                                        );
                                    }
                                    Err(err) => {
                                        debug!("failed to read include file: {err}");
                                    }
                                }
                            }
                        }
                        None => {
                            debug!("could not locate include file ({line_number})");
                        }
                    }
                }
            }
        }

        // Macro substitution, single pass in definition order.
        let mut out_line = line.clone();
        for (name, value) in defs.iter() {
            if !def_regexes.contains_key(name) {
                match Regex::new(&format!(r"\b{}\b", regex::escape(name))) {
                    Ok(regex) => {
                        def_regexes.insert(name.to_string(), regex);
                    }
                    Err(_) => continue,
                }
            }
            let regex = &def_regexes[name];
            if regex.is_match(&out_line) {
                debug!(
                    "{} !!! macro sub({line_number}) '{name}' -> {value}",
                    line.trim()
                );
                out_line = regex.replace_all(&out_line, NoExpand(value)).into_owned();
            }
        }
        output.push(out_line);
    }

    PreprocResult {
        lines: output,
        skips,
        defines,
        defs,
    }
}

fn find_include(search_dirs: &[PathBuf], filename: &str) -> Option<PathBuf> {
    for dir in search_dirs {
        let candidate = dir.join(filename);
        if candidate.is_file() {
            return Some(candidate.canonicalize().unwrap_or(candidate));
        }
    }
    None
}

/// Evaluate an `#if`/`#elif` condition against the current definitions.
///
/// `defined(X)` resolves to membership, remaining known identifiers to
/// their definition text, unknown identifiers to `False`; substitution is
/// single-pass. Any evaluation failure yields false.
pub fn eval_pp_if(text: &str, defs: &DefineMap) -> bool {
    let substituted = replace_vars(&replace_defined(text, defs), defs);
    match expr::eval(&substituted) {
        Some(value) => value != 0,
        None => false,
    }
}

fn replace_defined(text: &str, defs: &DefineMap) -> String {
    let mut out = String::new();
    let mut last = 0;
    for caps in patterns::DEFINED.captures_iter(text) {
        let whole = caps.get(0).unwrap();
        out.push_str(&text[last..whole.start()]);
        out.push_str(if defs.contains(&caps[1]) { " 1 " } else { " 0 " });
        last = whole.end();
    }
    out.push_str(&text[last..]);
    out
}

fn replace_vars(text: &str, defs: &DefineMap) -> String {
    let mut out = String::new();
    let mut last = 0;
    for word in patterns::WORD.find_iter(text) {
        out.push_str(&text[last..word.start()]);
        match defs.get(word.as_str()) {
            Some(value) => out.push_str(value),
            None => out.push_str("False"),
        }
        last = word.end();
    }
    out.push_str(&text[last..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(text: &str) -> Vec<String> {
        split_lines(text)
    }

    fn preprocess(text: &str) -> PreprocResult {
        preprocess_file(&lines(text), None, &DefineMap::new(), &[])
    }

    #[test]
    fn test_ifdef_else_skips() {
        let result = preprocess("#ifdef FOO\ninteger :: x\n#else\ninteger :: y\n#endif\n");
        assert_eq!(result.skips, vec![(2, 2)]);
        assert_eq!(result.lines.len(), 5);
    }

    #[test]
    fn test_if_true_keeps_all() {
        let result = preprocess("#if 1\ninteger :: x\n#endif\n");
        assert!(result.skips.is_empty());
    }

    #[test]
    fn test_if_zero_excludes_body() {
        let result = preprocess("#if 0\ninteger :: x\ninteger :: y\n#endif\n");
        assert_eq!(result.skips, vec![(2, 3)]);
    }

    #[test]
    fn test_elif_taken_closes_exclusion() {
        let text = "#if 0\ninteger :: a\n#elif 1\ninteger :: b\n#endif\n";
        let result = preprocess(text);
        assert_eq!(result.skips, vec![(2, 2)]);
    }

    #[test]
    fn test_elif_after_taken_branch_is_excluded() {
        let text = "#if 1\ninteger :: a\n#elif 1\ninteger :: b\n#endif\n";
        let result = preprocess(text);
        assert_eq!(result.skips, vec![(4, 4)]);
    }

    #[test]
    fn test_macro_substitution() {
        let result = preprocess("#define N 4\ninteger, dimension(N) :: v\n");
        assert_eq!(result.defines, vec![1]);
        assert_eq!(result.lines[1], "integer, dimension(4) :: v");
    }

    #[test]
    fn test_first_definition_wins() {
        let result = preprocess("#define N 4\n#define N 8\ninteger :: v(N)\n");
        assert_eq!(result.lines[2], "integer :: v(4)");

        let result = preprocess("#define N 4\n#undef N\n#define N 8\ninteger :: v(N)\n");
        assert_eq!(result.lines[3], "integer :: v(8)");
    }

    #[test]
    fn test_flag_macro_defaults_to_true() {
        let result = preprocess("#define HAVE_X\n#if HAVE_X\ninteger :: x\n#endif\n");
        assert!(result.skips.is_empty());
        assert_eq!(result.defs.get("HAVE_X"), Some("True"));
    }

    #[test]
    fn test_multiline_macro() {
        let text = "#define LIST a, \\\n    b, \\\n    c\ninteger :: LIST\n";
        let result = preprocess(text);
        assert_eq!(result.defs.get("LIST"), Some("a,b,c"));
        assert_eq!(result.lines[1], "");
        assert_eq!(result.lines[2], "");
        assert_eq!(result.lines[3], "integer :: a,b,c");
    }

    #[test]
    fn test_defined_and_operators() {
        let mut defs = DefineMap::new();
        defs.insert("FOO", "3");
        assert!(eval_pp_if("defined(FOO) && FOO > 2", &defs));
        assert!(!eval_pp_if("defined(BAR)", &defs));
        assert!(eval_pp_if("!defined(BAR)", &defs));
        assert!(!eval_pp_if("garbage ~ expression", &defs));
    }

    #[test]
    fn test_macro_in_condition_substituted_single_pass() {
        let mut defs = DefineMap::new();
        defs.insert("A", "B");
        // B is itself unknown after one pass, so the branch is false.
        assert!(!eval_pp_if("A", &defs));
    }

    #[test]
    fn test_substitution_does_not_touch_partial_words() {
        let result = preprocess("#define N 4\ninteger :: N1, N\n");
        assert_eq!(result.lines[1], "integer :: N1, 4");
    }

    #[test]
    fn test_nested_conditionals() {
        let text = "#if 1\n#if 0\ninteger :: a\n#endif\ninteger :: b\n#endif\n";
        let result = preprocess(text);
        assert_eq!(result.skips, vec![(3, 3)]);
    }

    #[test]
    fn test_stray_endif_ignored() {
        let result = preprocess("#endif\ninteger :: x\n");
        assert!(result.skips.is_empty());
        assert_eq!(result.lines.len(), 2);
    }
}
