//! Variable declaration recognition.

use crate::patterns;
use crate::scan::{find_paren_match, separate_def_list};

use super::routines::read_fun_def;
use super::{Recognized, VarInfo};

/// Attempt to read a variable definition line.
///
/// With `fun_only`, the only accepted outcome is a type-prefixed function
/// definition (`integer function f(...)`), which is delegated to the
/// function reader together with the type word seen here.
pub fn read_var_def(line: &str, fun_only: bool) -> Option<Recognized> {
    let type_match = patterns::NAT_VAR.find(line)?;
    let mut type_word = type_match.as_str().trim().to_uppercase();
    let mut trailing = line[type_match.end()..]
        .split('!')
        .next()
        .unwrap_or("")
        .to_string();
    if trailing.is_empty() {
        return None;
    }

    if let Some(kind_caps) = patterns::KIND_SPEC.captures(&trailing) {
        let kind_str = kind_caps[1].replace(' ', "");
        type_word.push_str(&kind_str);
        trailing = trailing[kind_caps.get(0).unwrap().end()..].to_string();
        if kind_str.contains('(') {
            // The spec opener was captured; consume through its closer.
            let close = find_paren_match(&trailing)?;
            type_word.push_str(trailing[..close + 1].trim());
            trailing = trailing[close + 1..].to_string();
        }
    } else {
        // TYPE and CLASS are only type words with a spec attached.
        if type_word == "TYPE" || type_word == "CLASS" {
            return None;
        }
        if !matches!(trailing.chars().next(), Some(' ') | Some(',') | Some(':')) {
            return None;
        }
    }

    let (keywords, trailing) = parse_var_keywords(&trailing);

    let fun_def = read_fun_def(&trailing, Some((type_word.clone(), keywords.clone())), false);
    if fun_def.is_some() || fun_only {
        return fun_def;
    }

    let var_names = match trailing.split_once("::") {
        None => {
            if !keywords.is_empty() {
                None
            } else {
                separate_def_list(trailing.trim())
            }
        }
        Some((_, after)) => Some(separate_def_list(after.trim()).unwrap_or_default()),
    };

    Some(Recognized::Var(VarInfo {
        type_word,
        keywords,
        var_names,
    }))
}

/// Consume the comma-separated attribute keywords of a declaration.
/// Returns the upper-cased keywords and the unconsumed remainder.
pub fn parse_var_keywords(text: &str) -> (Vec<String>, String) {
    let mut keywords = Vec::new();
    let mut rest = text.to_string();
    while let Some(keyword_match) = patterns::KEYWORD_LIST.find(&rest) {
        let mut keyword = keyword_match
            .as_str()
            .trim_start_matches(|c: char| c == ',' || c == ' ')
            .to_string();
        let mut tail = rest[keyword_match.end()..].to_string();
        if keyword.to_lowercase().starts_with("dimension") {
            match find_paren_match(&tail) {
                None => {
                    // Incomplete dimension spec; give up on keywords.
                    rest = tail;
                    break;
                }
                Some(close) => {
                    keyword.push_str(&tail[..close + 1]);
                    tail = tail[close + 1..].to_string();
                }
            }
        }
        keywords.push(keyword.trim().to_uppercase());
        rest = tail;
    }
    (keywords, rest)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var_info(line: &str) -> VarInfo {
        match read_var_def(line, false) {
            Some(Recognized::Var(info)) => info,
            other => panic!("expected variable for {line:?}, got {other:?}"),
        }
    }

    #[test]
    fn test_simple_declaration() {
        let info = var_info("integer :: x = 3");
        assert_eq!(info.type_word, "INTEGER");
        assert!(info.keywords.is_empty());
        assert_eq!(info.var_names, Some(vec!["x = 3".to_string()]));
    }

    #[test]
    fn test_kind_spec() {
        let info = var_info("real(kind=8), intent(in) :: a, b");
        assert_eq!(info.type_word, "REAL(kind=8)");
        assert_eq!(info.keywords, vec!["INTENT(IN)".to_string()]);
        assert_eq!(
            info.var_names,
            Some(vec!["a".to_string(), "b".to_string()])
        );
    }

    #[test]
    fn test_character_star_length() {
        let info = var_info("character*10 name");
        assert_eq!(info.type_word, "CHARACTER*10");
        assert_eq!(info.var_names, Some(vec!["name".to_string()]));
    }

    #[test]
    fn test_dimension_keyword_keeps_spec() {
        let info = var_info("integer, dimension(3,3) :: grid");
        assert_eq!(info.keywords, vec!["DIMENSION(3,3)".to_string()]);
    }

    #[test]
    fn test_type_requires_spec() {
        assert!(read_var_def("type :: point", false).is_none());
        let info = var_info("type(point) :: origin");
        assert_eq!(info.type_word, "TYPE(point)");
    }

    #[test]
    fn test_rejects_lookalike_words() {
        assert!(read_var_def("reallocate(x)", false).is_none());
        assert!(read_var_def("integer_stuff = 5", false).is_none());
    }

    #[test]
    fn test_old_style_declaration_without_colons() {
        let info = var_info("integer i, j");
        assert_eq!(
            info.var_names,
            Some(vec!["i".to_string(), "j".to_string()])
        );
    }

    #[test]
    fn test_attribute_only_statement() {
        // No declarators after an attribute list without `::`.
        let info = var_info("integer, parameter");
        assert_eq!(info.var_names, None);
    }
}
