//! Low-level line scanning utilities.
//!
//! Everything here operates on a single physical or logical line. String
//! masking is byte-length preserving so offsets found in a masked line can
//! be used to slice the original.

use crate::patterns;

/// Mask quoted substrings so later searches cannot match inside them.
///
/// Both `'` and `"` literals are handled, with the standard doubled-quote
/// escape. With `maintain_len` the string interior is replaced by spaces
/// (one per byte) and the delimiters are kept, so the result has the same
/// byte length as the input. Without it, string literals are dropped
/// entirely.
pub fn strip_strings(line: &str, maintain_len: bool) -> String {
    let mut out = String::with_capacity(line.len());
    let mut in_string: Option<char> = None;
    let mut chars = line.chars().peekable();
    while let Some(ch) = chars.next() {
        match in_string {
            Some(quote) => {
                if ch == quote {
                    if chars.peek() == Some(&quote) {
                        // doubled delimiter stays inside the literal
                        chars.next();
                        if maintain_len {
                            out.push_str("  ");
                        }
                    } else {
                        in_string = None;
                        if maintain_len {
                            out.push(quote);
                        }
                    }
                } else if maintain_len {
                    for _ in 0..ch.len_utf8() {
                        out.push(' ');
                    }
                }
            }
            None => {
                if ch == '\'' || ch == '"' {
                    in_string = Some(ch);
                    if maintain_len {
                        out.push(ch);
                    }
                } else {
                    out.push(ch);
                }
            }
        }
    }
    out
}

/// Remove a numeric statement label, blanking it in place so column
/// positions are unchanged. Returns the blanked line and the label.
pub fn strip_line_label(line: &str) -> (String, Option<String>) {
    match patterns::LINE_LABEL.captures(line) {
        Some(caps) => {
            let group = caps.get(1).unwrap();
            let mut out = String::with_capacity(line.len());
            out.push_str(&line[..group.start()]);
            out.extend(std::iter::repeat(' ').take(group.end() - group.start()));
            out.push_str(&line[group.end()..]);
            (out, Some(group.as_str().to_string()))
        }
        None => (line.to_string(), None),
    }
}

/// Find the byte index of the parenthesis closing an already-open group.
///
/// The input starts just after the opening `(`; brackets are counted too
/// since they appear in coarray and array specs.
pub fn find_paren_match(text: &str) -> Option<usize> {
    let mut level = 1i32;
    for (i, ch) in text.char_indices() {
        match ch {
            '(' | '[' => level += 1,
            ')' | ']' => {
                level -= 1;
                if level == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Return the text between the first `(` and the last `)`, if any.
pub fn get_paren_substring(text: &str) -> Option<&str> {
    let i1 = text.find('(')?;
    let i2 = text.rfind(')')?;
    if i1 < i2 {
        Some(&text[i1 + 1..i2])
    } else {
        None
    }
}

/// Split a declaration list on top-level commas.
///
/// String literals are removed first and commas inside parens or brackets
/// do not split. Returns `None` for lists that start with a separator.
pub fn separate_def_list(text: &str) -> Option<Vec<String>> {
    let stripped = strip_strings(text, false);
    let mut level = 0i32;
    let mut out: Vec<String> = Vec::new();
    let mut curr = String::new();
    for ch in stripped.chars() {
        match ch {
            '(' | '[' => level += 1,
            ')' | ']' => level -= 1,
            ',' if level == 0 => {
                let trimmed = curr.trim();
                if !trimmed.is_empty() {
                    out.push(trimmed.to_string());
                    curr.clear();
                } else if out.is_empty() {
                    return None;
                }
                continue;
            }
            _ => {}
        }
        curr.push(ch);
    }
    let trimmed = curr.trim();
    if !trimmed.is_empty() {
        out.push(trimmed.to_string());
    }
    Some(out)
}

/// Locate a word (whole-token match) in a line. Returns byte start/end.
pub fn find_word_in_line(line: &str, word: &str) -> Option<(usize, usize)> {
    for m in patterns::WORD.find_iter(line) {
        if m.as_str().eq_ignore_ascii_case(word) {
            return Some((m.start(), m.end()));
        }
    }
    None
}

/// Extract the sub-string belonging to the innermost open parenthesis
/// level at the end of the line.
///
/// Scans backward through balanced groups; the returned sections are the
/// byte ranges (start, end) whose concatenation forms the level string, in
/// forward order. The final section always ends at the end of the line, so
/// `sections.last().1 == line.len()` means the cursor sits at the current
/// level rather than inside a deeper, already-closed group.
pub fn get_paren_level(line: &str) -> (String, Vec<(usize, usize)>) {
    if line.is_empty() {
        return (String::new(), vec![(0, 0)]);
    }
    let mut level = 0i32;
    let mut in_string = false;
    let mut string_char = ' ';
    let mut i1 = line.len();
    let mut sections: Vec<(usize, usize)> = Vec::new();
    for (i, ch) in line.char_indices().rev() {
        if in_string {
            if ch == string_char {
                in_string = false;
            }
            continue;
        }
        match ch {
            '\'' | '"' => {
                in_string = true;
                string_char = ch;
            }
            ')' => {
                level += 1;
                if level == 1 {
                    sections.push((i + 1, i1));
                }
            }
            '(' => {
                level -= 1;
                if level == 0 {
                    i1 = i;
                }
                if level < 0 {
                    sections.push((i + 1, i1));
                    break;
                }
            }
            _ => {}
        }
    }
    if level == 0 {
        sections.push((0, i1));
    }
    sections.reverse();
    let mut out = String::new();
    for &(start, end) in &sections {
        out.push_str(&line[start..end]);
    }
    (out, sections)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_strings_maintains_length() {
        let line = "write(*,*) 'hello & !world', x";
        let masked = strip_strings(line, true);
        assert_eq!(masked.len(), line.len());
        assert!(!masked.contains('&'));
        assert!(!masked.contains("hello"));
        assert!(masked.ends_with(", x"));
    }

    #[test]
    fn test_strip_strings_doubled_quote() {
        let masked = strip_strings("a = 'it''s' ! c", true);
        assert_eq!(masked.len(), "a = 'it''s' ! c".len());
        assert_eq!(masked.find('!'), Some(12));
    }

    #[test]
    fn test_strip_strings_removal() {
        assert_eq!(strip_strings("a = 'x,y' // \"z\"", false), "a =  // ");
    }

    #[test]
    fn test_strip_line_label() {
        let (line, label) = strip_line_label("10    continue");
        assert_eq!(label.as_deref(), Some("10"));
        assert_eq!(line, "      continue");

        let (line, label) = strip_line_label("  x = 1");
        assert_eq!(label, None);
        assert_eq!(line, "  x = 1");
    }

    #[test]
    fn test_find_paren_match() {
        assert_eq!(find_paren_match("a, b)"), Some(4));
        assert_eq!(find_paren_match("size(a), b) :: x"), Some(10));
        assert_eq!(find_paren_match("unclosed"), None);
    }

    #[test]
    fn test_separate_def_list() {
        assert_eq!(
            separate_def_list("a, b(2,2), c"),
            Some(vec!["a".to_string(), "b(2,2)".to_string(), "c".to_string()])
        );
        assert_eq!(separate_def_list(", a"), None);
        assert_eq!(
            separate_def_list("msg = 'a,b'"),
            Some(vec!["msg =".to_string()])
        );
    }

    #[test]
    fn test_get_paren_level() {
        let (out, sections) = get_paren_level("call foo(a(1), b");
        assert_eq!(out, "a, b");
        assert_eq!(sections.last().unwrap().1, "call foo(a(1), b".len());

        let (out, _) = get_paren_level("call foo");
        assert_eq!(out, "call foo");

        let (out, sections) = get_paren_level("type(");
        assert_eq!(out, "");
        assert_eq!(sections, vec![(5, 5)]);
    }
}
