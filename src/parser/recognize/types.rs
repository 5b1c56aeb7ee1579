//! Derived type, interface, and generic-binding recognition.

use crate::patterns;

use super::{GenericInfo, InterfaceInfo, Recognized, TypeInfo};

/// Attempt to read a `type [, attrs] [::] name` definition line.
pub fn read_type_def(line: &str) -> Option<Recognized> {
    let type_match = patterns::TYPE_DEF.captures(line)?;
    let mut trailing = line[type_match.get(1).unwrap().end()..]
        .split('!')
        .next()
        .unwrap_or("")
        .trim()
        .to_string();

    let mut keywords = Vec::new();
    let mut extends = None;
    while let Some(attr_match) = patterns::TATTR_LIST.find(&trailing) {
        let keyword = attr_match.as_str().replace(',', " ").trim().to_uppercase();
        if let Some(ext) = patterns::EXTENDS.captures(&keyword) {
            extends = Some(ext[1].to_lowercase());
        } else {
            keywords.push(keyword);
        }
        trailing = trailing[attr_match.end()..].to_string();
    }

    let name_part = match trailing.split_once("::") {
        None => {
            if !keywords.is_empty() && extends.is_none() {
                return None;
            }
            // Reject `type is (...)` region lines.
            if trailing
                .split('(')
                .next()
                .unwrap_or("")
                .trim()
                .eq_ignore_ascii_case("is")
            {
                return None;
            }
            trailing.clone()
        }
        Some((_, after)) => after.to_string(),
    };

    let trimmed = name_part.trim();
    let word = patterns::WORD.find(trimmed)?;
    if word.start() != 0 {
        return None;
    }
    Some(Recognized::DerivedType(TypeInfo {
        name: word.as_str().to_string(),
        extends,
        keywords,
    }))
}

/// Attempt to read an `interface` definition line. Named `assignment` and
/// `operator` interfaces normalise to anonymous ones.
pub fn read_int_def(line: &str) -> Option<Recognized> {
    let caps = patterns::INT.captures(line)?;
    let is_abstract = caps.get(1).is_some();
    let name = caps.get(2).map(|group| group.as_str()).unwrap_or("");
    if name.is_empty() {
        return Some(Recognized::Interface(InterfaceInfo {
            name: None,
            is_abstract,
        }));
    }
    if name.eq_ignore_ascii_case("assignment") || name.eq_ignore_ascii_case("operator") {
        return Some(Recognized::Interface(InterfaceInfo {
            name: None,
            is_abstract: false,
        }));
    }
    Some(Recognized::Interface(InterfaceInfo {
        name: Some(name.to_string()),
        is_abstract,
    }))
}

/// Attempt to read a `generic [, vis] :: name => a, b` binding.
///
/// `assignment(=)` and `operator(...)` bindings are left to the interface
/// handling and rejected here.
pub fn read_generic_def(line: &str) -> Option<Recognized> {
    let caps = patterns::GENERIC_PRO.captures(line)?;
    let trailing = line[caps.get(0).unwrap().end()..]
        .split('!')
        .next()
        .unwrap_or("")
        .trim();
    if !trailing.starts_with(|c: char| c.is_ascii_alphabetic()) {
        return None;
    }
    let vis = match caps.get(1) {
        None => 0,
        Some(group) if group.as_str().eq_ignore_ascii_case("private") => -1,
        Some(_) => 1,
    };
    let arrow = trailing.find("=>")?;
    let bound_name = trailing[..arrow].trim().to_string();
    if patterns::GEN_ASSIGN.is_match(&bound_name) {
        return None;
    }
    let pro_links: Vec<String> = trailing[arrow + 2..]
        .split(',')
        .map(|link| link.trim().to_string())
        .filter(|link| !link.is_empty())
        .collect();
    if pro_links.is_empty() {
        return None;
    }
    Some(Recognized::Generic(GenericInfo {
        bound_name,
        pro_links,
        vis,
    }))
}
