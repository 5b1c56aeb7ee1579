//! `use`, `import`, `include`, and visibility statement recognition.

use std::collections::HashMap;

use crate::patterns;

use super::{Recognized, UseInfo, VisInfo};

/// Attempt to read a `use` statement with its `only` list and renames.
pub fn read_use_stmt(line: &str) -> Option<Recognized> {
    let caps = patterns::USE.captures(line)?;
    let mod_name = caps[1].to_string();
    if mod_name.is_empty() {
        return None;
    }
    let mut only_list = Vec::new();
    let mut rename_map = HashMap::new();
    if caps.get(2).is_some() {
        let trailing = line[caps.get(0).unwrap().end()..].to_lowercase();
        for only_stmt in trailing.split(',') {
            let mut sides = only_stmt.split("=>");
            let local = sides.next().unwrap_or("").trim().to_string();
            if local.is_empty() {
                continue;
            }
            if let Some(remote) = sides.next() {
                rename_map.insert(local.clone(), remote.trim().to_string());
            }
            only_list.push(local);
        }
    }
    Some(Recognized::Use(UseInfo {
        mod_name,
        only_list,
        rename_map,
    }))
}

/// Attempt to read an `import` statement.
pub fn read_imp_stmt(line: &str) -> Option<Recognized> {
    let import_match = patterns::IMPORT.find(line)?;
    let trailing = &line[import_match.end()..];
    if !trailing.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_') {
        return None;
    }
    let lowered = trailing.to_lowercase();
    let names = lowered
        .split(',')
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect();
    Some(Recognized::Import(names))
}

/// Attempt to read a Fortran `include "file"` statement (distinct from
/// the preprocessor's `#include`).
pub fn read_inc_stmt(line: &str) -> Option<Recognized> {
    let caps = patterns::INCLUDE.captures(line)?;
    Some(Recognized::Include(caps[1].to_string()))
}

/// Attempt to read a `public`/`private` statement with optional targets.
pub fn read_vis_stmnt(line: &str) -> Option<Recognized> {
    let caps = patterns::VIS.captures(line)?;
    let private = caps[1].eq_ignore_ascii_case("private");
    let trailing = line[caps.get(0).unwrap().end()..]
        .split('!')
        .next()
        .unwrap_or("");
    let names = patterns::WORD
        .find_iter(trailing)
        .map(|word| word.as_str().to_string())
        .collect();
    Some(Recognized::Visibility(VisInfo { private, names }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_use_plain() {
        match read_use_stmt("use Constants") {
            Some(Recognized::Use(info)) => {
                // Original casing survives for module names.
                assert_eq!(info.mod_name, "Constants");
                assert!(info.only_list.is_empty());
            }
            other => panic!("expected use, got {other:?}"),
        }
    }

    #[test]
    fn test_use_only_with_rename() {
        match read_use_stmt("use solver, only: fast => solve_fast, slow") {
            Some(Recognized::Use(info)) => {
                assert_eq!(info.mod_name, "solver");
                assert_eq!(info.only_list, vec!["fast".to_string(), "slow".to_string()]);
                assert_eq!(
                    info.rename_map.get("fast").map(String::as_str),
                    Some("solve_fast")
                );
            }
            other => panic!("expected use, got {other:?}"),
        }
    }

    #[test]
    fn test_use_intrinsic() {
        match read_use_stmt("use, intrinsic :: iso_c_binding, only: c_int") {
            Some(Recognized::Use(info)) => {
                assert_eq!(info.mod_name, "iso_c_binding");
                assert_eq!(info.only_list, vec!["c_int".to_string()]);
            }
            other => panic!("expected use, got {other:?}"),
        }
    }

    #[test]
    fn test_import() {
        assert_eq!(
            read_imp_stmt("import var_a, var_b"),
            Some(Recognized::Import(vec![
                "var_a".to_string(),
                "var_b".to_string()
            ]))
        );
        assert!(read_imp_stmt("important = 1").is_none());
    }

    #[test]
    fn test_include() {
        assert_eq!(
            read_inc_stmt("include \"params.fi\""),
            Some(Recognized::Include("params.fi".to_string()))
        );
    }

    #[test]
    fn test_visibility() {
        assert_eq!(
            read_vis_stmnt("private"),
            Some(Recognized::Visibility(VisInfo {
                private: true,
                names: vec![]
            }))
        );
        assert_eq!(
            read_vis_stmnt("public :: solve, version"),
            Some(Recognized::Visibility(VisInfo {
                private: false,
                names: vec!["solve".to_string(), "version".to_string()]
            }))
        );
    }
}
