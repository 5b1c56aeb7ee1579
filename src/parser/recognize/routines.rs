//! Subroutine, function, and program-unit recognition.

use crate::patterns;

use super::variables::read_var_def;
use super::{FunInfo, Recognized, RoutineInfo, SubmodInfo};

/// Strip prefix keywords (`pure`, `elemental`, `module`, ...) from the
/// front of a line, returning them and the remainder.
fn consume_prefix_keywords(line: &str) -> (Vec<String>, &str) {
    let mut keywords = Vec::new();
    let mut rest = line;
    while let Some(caps) = patterns::SUB_MOD.captures(rest) {
        keywords.push(caps[1].to_string());
        rest = &rest[caps.get(0).unwrap().end()..];
    }
    (keywords, rest)
}

/// Extract `(a, b, c)` argument names right after a routine name.
fn parse_paren_args(trailing: &str) -> (Vec<String>, &str) {
    match patterns::SUB_PAREN.find(trailing) {
        Some(paren) => {
            let args = patterns::WORD
                .find_iter(paren.as_str())
                .map(|word| word.as_str().to_string())
                .collect();
            (args, &trailing[paren.end()..])
        }
        None => (Vec::new(), trailing),
    }
}

/// Attempt to read a `subroutine` definition line.
pub fn read_sub_def(line: &str, mod_flag: bool) -> Option<Recognized> {
    let (keywords, rest) = consume_prefix_keywords(line);
    let sub_match = patterns::SUB.captures(rest)?;
    let name = sub_match[1].to_string();
    let trailing = rest[sub_match.get(0).unwrap().end()..]
        .split('!')
        .next()
        .unwrap_or("")
        .trim();
    let (args, _) = parse_paren_args(trailing);
    Some(Recognized::Sub(RoutineInfo {
        name,
        args,
        mod_flag,
        keywords,
    }))
}

/// Attempt to read a `function` definition line.
///
/// `return_type` carries the inline result type when the call came from
/// the variable reader (`real function f()`); prefix keywords consumed
/// here are kept on the delegated result as well.
pub fn read_fun_def(
    line: &str,
    return_type: Option<(String, Vec<String>)>,
    mod_flag: bool,
) -> Option<Recognized> {
    let (keywords, rest) = consume_prefix_keywords(line);
    if !keywords.is_empty() {
        if let Some(delegated) = read_var_def(rest, true) {
            return Some(match delegated {
                Recognized::Fun(mut info) => {
                    let mut all = keywords;
                    all.extend(info.keywords);
                    info.keywords = all;
                    Recognized::Fun(info)
                }
                other => other,
            });
        }
    }
    let fun_match = patterns::FUN.captures(rest)?;
    let name = fun_match[1].to_string();
    let trailing = rest[fun_match.get(0).unwrap().end()..]
        .split('!')
        .next()
        .unwrap_or("")
        .trim();
    let (args, after_args) = parse_paren_args(trailing);
    let mut return_var = None;
    if let Some(result) = patterns::RESULT.captures(after_args.trim()) {
        let result_name = result[1].trim().to_lowercase();
        if !result_name.is_empty() {
            return_var = Some(result_name);
        }
    }
    Some(Recognized::Fun(FunInfo {
        name,
        args,
        return_type,
        return_var,
        mod_flag,
        keywords,
    }))
}

/// Attempt to read `module`, `module procedure`, and prefixed
/// `module subroutine`/`module function` definition lines.
pub fn read_mod_def(line: &str) -> Option<Recognized> {
    let mod_match = patterns::MOD.captures(line)?;
    let name_group = mod_match.get(1).unwrap();
    let name = name_group.as_str();
    if name.eq_ignore_ascii_case("procedure") {
        let names = line[name_group.end()..]
            .split(',')
            .map(|part| part.trim().to_lowercase())
            .filter(|part| !part.is_empty())
            .collect();
        return Some(Recognized::ModuleProcedure(names));
    }
    // `module <something>` may still be a procedure definition.
    let trailing = &line[name_group.start()..];
    if let Some(sub) = read_sub_def(trailing, true) {
        return Some(sub);
    }
    if let Some(delegated) = read_var_def(trailing, true) {
        return Some(match delegated {
            Recognized::Fun(mut info) => {
                info.mod_flag = true;
                Recognized::Fun(info)
            }
            other => other,
        });
    }
    if let Some(fun) = read_fun_def(trailing, None, true) {
        return Some(fun);
    }
    Some(Recognized::Module(name.to_string()))
}

/// Attempt to read a `program` definition line.
pub fn read_prog_def(line: &str) -> Option<Recognized> {
    let caps = patterns::PROG.captures(line)?;
    Some(Recognized::Program(caps[1].to_string()))
}

/// Attempt to read a `submodule (parent) name` definition line.
pub fn read_submod_def(line: &str) -> Option<Recognized> {
    let submod_match = patterns::SUBMOD.find(line)?;
    let trailing = line[submod_match.end()..]
        .split('!')
        .next()
        .unwrap_or("")
        .trim();
    let mut parent = None;
    let mut rest = trailing;
    if let Some(word) = patterns::WORD.find(trailing) {
        if word.start() == 0 {
            parent = Some(word.as_str().to_lowercase());
            rest = if trailing.len() > word.end() + 1 {
                trailing[word.end() + 1..].trim()
            } else {
                ""
            };
        }
    }
    let name = patterns::WORD
        .find(rest)
        .map(|word| word.as_str().to_lowercase());
    Some(Recognized::Submodule(SubmodInfo { name, parent }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subroutine_with_prefixes() {
        match read_sub_def("pure recursive subroutine walk(node, depth)", false) {
            Some(Recognized::Sub(info)) => {
                assert_eq!(info.name, "walk");
                assert_eq!(info.args, vec!["node".to_string(), "depth".to_string()]);
                assert_eq!(
                    info.keywords,
                    vec!["pure".to_string(), "recursive".to_string()]
                );
            }
            other => panic!("expected subroutine, got {other:?}"),
        }
    }

    #[test]
    fn test_subroutine_without_args() {
        match read_sub_def("subroutine init", false) {
            Some(Recognized::Sub(info)) => {
                assert_eq!(info.name, "init");
                assert!(info.args.is_empty());
            }
            other => panic!("expected subroutine, got {other:?}"),
        }
    }

    #[test]
    fn test_prefixed_inline_result_type() {
        match read_fun_def("pure real function norm(v)", None, false) {
            Some(Recognized::Fun(info)) => {
                assert_eq!(info.name, "norm");
                assert_eq!(info.keywords, vec!["pure".to_string()]);
                assert_eq!(info.return_type, Some(("REAL".to_string(), Vec::new())));
            }
            other => panic!("expected function, got {other:?}"),
        }
    }

    #[test]
    fn test_result_clause() {
        match read_fun_def("function area(r) result(a)", None, false) {
            Some(Recognized::Fun(info)) => {
                assert_eq!(info.return_var.as_deref(), Some("a"));
                assert_eq!(info.return_type, None);
            }
            other => panic!("expected function, got {other:?}"),
        }
    }

    #[test]
    fn test_submodule_parent_and_name() {
        match read_submod_def("submodule (points) point_impl") {
            Some(Recognized::Submodule(info)) => {
                assert_eq!(info.parent.as_deref(), Some("points"));
                assert_eq!(info.name.as_deref(), Some("point_impl"));
            }
            other => panic!("expected submodule, got {other:?}"),
        }
    }

    #[test]
    fn test_module_name_resembling_type_word() {
        assert_eq!(
            read_mod_def("module realstuff"),
            Some(Recognized::Module("realstuff".to_string()))
        );
    }
}
