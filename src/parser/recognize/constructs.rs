//! Block-construct recognition: `block`, `do`, `where`, `if`, `associate`,
//! `select`, and `enum` openings.

use crate::ast::SelectKind;
use crate::patterns;
use crate::scan::{find_paren_match, separate_def_list, strip_strings};

use super::{Recognized, SelectInfo};

/// Attempt to read a construct opening: named/anonymous `block`, `do`,
/// `where`, or `if (...) then`.
pub fn read_block_def(line: &str) -> Option<Recognized> {
    if let Some(caps) = patterns::BLOCK.captures(line) {
        let name = caps.get(1).map(|label| label.as_str().to_string());
        return Some(Recognized::Block(name));
    }

    let masked = strip_strings(line, true);
    let no_comment = masked.split('!').next().unwrap_or("").trim_end();

    if let Some(caps) = patterns::DO.captures(no_comment) {
        return Some(Recognized::Do(caps[1].trim().to_string()));
    }

    if let Some(where_match) = patterns::WHERE.find(no_comment) {
        let trailing = &line[where_match.end()..];
        let single_line = match find_paren_match(trailing) {
            None => true,
            Some(close) => {
                let remainder = trailing[close + 1..].trim();
                patterns::WORD
                    .find(remainder)
                    .map(|word| word.start() == 0)
                    .unwrap_or(false)
            }
        };
        return Some(Recognized::Where(single_line));
    }

    if patterns::IF.is_match(no_comment) && patterns::THEN.is_match(no_comment) {
        return Some(Recognized::If);
    }
    None
}

/// Attempt to read an `associate(a => x, ...)` opening.
pub fn read_associate_def(line: &str) -> Option<Recognized> {
    let assoc_match = patterns::ASSOCIATE.find(line)?;
    let trailing = &line[assoc_match.end()..];
    let bindings = match find_paren_match(trailing) {
        None => Vec::new(),
        Some(close) => separate_def_list(trailing[..close].trim()).unwrap_or_default(),
    };
    Some(Recognized::Associate(bindings))
}

/// Attempt to read a `select` opening or a `type is`/`class is`/
/// `class default` region line.
pub fn read_select_def(line: &str) -> Option<Recognized> {
    if let Some(caps) = patterns::SELECT.captures(line) {
        let kind = if caps[1].eq_ignore_ascii_case("case") {
            SelectKind::Case
        } else {
            SelectKind::Type
        };
        let binding = caps
            .get(2)
            .map(|group| group.as_str().trim().to_string())
            .filter(|text| !text.is_empty());
        return Some(Recognized::Select(SelectInfo {
            kind,
            binding,
            desc: None,
        }));
    }
    if let Some(caps) = patterns::SELECT_TYPE.captures(line) {
        return Some(Recognized::Select(SelectInfo {
            kind: SelectKind::TypeIs,
            binding: caps.get(2).map(|group| group.as_str().trim().to_string()),
            desc: Some(caps[1].to_uppercase()),
        }));
    }
    if patterns::SELECT_DEFAULT.is_match(line) {
        return Some(Recognized::Select(SelectInfo {
            kind: SelectKind::Default,
            binding: None,
            desc: None,
        }));
    }
    None
}

/// Attempt to read an `enum, bind(c)` opening.
pub fn read_enum_def(line: &str) -> Option<Recognized> {
    if patterns::ENUM_DEF.is_match(line) {
        Some(Recognized::Enum)
    } else {
        None
    }
}
