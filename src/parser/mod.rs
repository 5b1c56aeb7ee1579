//! The scope-stack parser.
//!
//! [`process_file`] walks the preprocessed lines of a file in order,
//! splices continuations, classifies every logical line with the
//! recognizers, and drives the [`Ast`] scope stack: push on definitions,
//! pop on `end` statements, record variables, uses, members, visibility,
//! and documentation along the way.

mod context;
pub mod recognize;

pub use context::{get_line_context, LineContext};

use std::collections::{HashMap, VecDeque};

use log::debug;

use crate::ast::{
    Ast, EndError, Include, ParseErrorRecord, ResultSig, Scope, ScopeKind, SelectKind, Use,
    Variable, map_keywords,
};
use crate::config::ParseConfig;
use crate::patterns;
use crate::scan::{find_word_in_line, get_paren_substring, strip_line_label, strip_strings};
use crate::source::SourceFile;
use recognize::{recognize, Recognized};

/// Build the declaration tree for a file.
///
/// Preprocessing runs first when the file asks for it; the resulting skip
/// ranges and `#define` lines are excluded from recognition but keep
/// their line numbers.
pub fn process_file(file: &mut SourceFile, config: &ParseConfig) -> Ast {
    let mut ast = Ast::new();

    let (pp_skips, pp_defines) = if file.preproc {
        debug!("=== preprocessor pass ===");
        file.preprocess(config)
    } else {
        debug!("=== no preprocessing ===");
        (Vec::new(), Vec::new())
    };
    ast.pp_skips = pp_skips.clone();

    let mut line_ind = 0usize;
    let mut next_line_ind = 0usize;
    let mut line_number = 1usize;
    let mut int_counter = 0usize;
    let mut block_counter = 0usize;
    let mut do_counter = 0usize;
    let mut if_counter = 0usize;
    let mut select_counter = 0usize;
    let mut do_label_stack: Vec<String> = Vec::new();
    let mut semi_split: VecDeque<String> = VecDeque::new();
    let mut doc_string: Option<String> = None;

    let comment_pattern = if file.fixed {
        &patterns::FIXED_COMMENT_LINE
    } else {
        &patterns::FREE_COMMENT_LINE
    };
    let doc_pattern = if file.fixed {
        &patterns::FIXED_DOC
    } else {
        &patterns::FREE_DOC
    };

    while next_line_ind < file.nlines || !semi_split.is_empty() {
        let get_full;
        let mut line = match semi_split.pop_front() {
            Some(part) => {
                get_full = false;
                part
            }
            None => {
                line_ind = next_line_ind;
                line_number = line_ind + 1;
                next_line_ind = line_ind + 1;
                get_full = true;
                file.get_line(line_ind, true).unwrap_or("").to_string()
            }
        };
        if line.is_empty() {
            continue;
        }

        // Comment lines: collect documentation blocks.
        if comment_pattern.is_match(&line) {
            if let Some(doc_match) = doc_pattern.captures(&line) {
                let marker_end = doc_match.get(0).unwrap().end();
                let forward = &doc_match[1] == ">";
                let mut doc_lines = vec![line[marker_end..].trim().to_string()];
                if !forward {
                    if let Some(pending) = doc_string.take() {
                        doc_lines.insert(0, pending);
                    }
                }
                while next_line_ind < file.nlines {
                    let next_line = file.get_line(next_line_ind, true).unwrap_or("");
                    match doc_pattern.captures(next_line) {
                        Some(next_match) => {
                            doc_lines
                                .push(next_line[next_match.get(0).unwrap().end()..].trim().to_string());
                            next_line_ind += 1;
                        }
                        None => break,
                    }
                }
                if doc_lines.iter().any(|entry| !entry.is_empty()) {
                    debug!("doc block({line_number}): {} line(s)", doc_lines.len());
                    ast.add_doc(&format!("!! {}", doc_lines.join("\n!! ")), forward);
                }
            }
            continue;
        }

        // A trailing `!<` from the previous code line attaches backward.
        if let Some(pending) = doc_string.take() {
            debug!("doc string({line_number})");
            ast.add_doc(&format!("!! {pending}"), false);
        }

        // Lines inside excluded preprocessor regions or on define lines.
        let skipped = pp_skips
            .iter()
            .any(|&(start, end)| line_number >= start && line_number <= end)
            || pp_defines.binary_search(&line_number).is_ok();
        if skipped {
            continue;
        }

        // Join continuations into the full logical line.
        if get_full {
            let (_, curr, post_lines) = file.get_code_line(line_ind, true, false, true, false);
            next_line_ind += post_lines.len();
            let mut joined = curr.unwrap_or_default();
            for post in &post_lines {
                joined.push_str(post);
            }
            line = joined;
        }

        let (mut line, line_label) = strip_line_label(&line);
        let mut line_stripped = strip_strings(&line, true);
        let mut line_no_comment;
        let mut line_post_comment;
        match line_stripped.find('!') {
            Some(idx) => {
                line_no_comment = line[..idx].to_string();
                line_post_comment = Some(line[idx..].to_string());
                line_stripped.truncate(idx);
            }
            None => {
                line_no_comment = line.clone();
                line_post_comment = None;
            }
        }

        // Split on top-level semicolons, queueing the remainder.
        let semi_positions: Vec<usize> = line_stripped
            .bytes()
            .enumerate()
            .filter(|&(_, byte)| byte == b';')
            .map(|(idx, _)| idx)
            .collect();
        if semi_positions.first().map(|&idx| idx > 0).unwrap_or(false) {
            let mut parts: Vec<String> = Vec::new();
            let mut start = 0usize;
            for &pos in &semi_positions {
                parts.push(line[start..pos].to_string());
                start = pos + 1;
            }
            parts.push(line[start..].to_string());
            let mut parts = parts.into_iter();
            let first = parts.next().unwrap_or_default();
            for part in parts {
                semi_split.push_back(part);
            }
            line_no_comment = first.clone();
            line_post_comment = None;
            line = first;
        }

        // Scope-end statements.
        if ast.in_scope() {
            if let Some(end_match) = patterns::END_WORD.captures(&line_no_comment) {
                let end_word = end_match.get(1).map(|group| group.as_str());
                let end_name = end_match.get(2).map(|group| group.as_str().trim());
                let current_kind = ast.current_scope().kind.clone();
                let scope_line = ast.current_scope().sline;
                match end_word {
                    None => {
                        if current_kind.requires_named_end() {
                            ast.end_errors.push(EndError {
                                end_line: Some(line_number),
                                scope_line,
                            });
                        }
                    }
                    Some(word) => {
                        let closes_region = current_kind.is_type_region_select()
                            && word.eq_ignore_ascii_case("select");
                        let word_ok = current_kind.matches_end_word(word) || closes_region;
                        let name_ok = match end_name {
                            Some(name) if word_ok && is_plain_word(name) => {
                                // Synthetic names never appear in source.
                                let target = if closes_region {
                                    ast.current_scope()
                                        .parent
                                        .map(|pid| ast.scopes[pid].name.clone())
                                        .unwrap_or_default()
                                } else {
                                    ast.current_scope().name.clone()
                                };
                                target.starts_with('#')
                                    || target.is_empty()
                                    || target.eq_ignore_ascii_case(name)
                            }
                            _ => true,
                        };
                        if !word_ok || !name_ok {
                            ast.end_errors.push(EndError {
                                end_line: Some(line_number),
                                scope_line,
                            });
                        }
                    }
                }
                // `end select` also closes an open `type is` region.
                if current_kind.is_type_region_select()
                    && end_word
                        .map(|word| word.eq_ignore_ascii_case("select"))
                        .unwrap_or(true)
                {
                    ast.end_scope(line_number);
                }
                ast.end_scope(line_number);
                debug!(
                    "{} !!! end \"{}\" scope({line_number})",
                    line.trim(),
                    end_word.unwrap_or("")
                );
                continue;
            }

            // Old-style `do 10 ... 10 continue` termination.
            if matches!(ast.current_scope().kind, ScopeKind::Do) {
                if let Some(label) = &line_label {
                    let mut closed = false;
                    while do_label_stack.last() == Some(label)
                        && matches!(ast.current_scope().kind, ScopeKind::Do)
                    {
                        ast.end_scope(line_number);
                        do_label_stack.pop();
                        closed = true;
                        debug!("{} !!! end \"do\" scope({line_number})", line.trim());
                    }
                    if closed {
                        continue;
                    }
                }
            }
        } else if patterns::END_WORD.is_match(&line_no_comment) {
            ast.end_errors.push(EndError {
                end_line: Some(line_number),
                scope_line: 0,
            });
            continue;
        }

        // Known generic code lines carry no declarations.
        if patterns::NON_DEF.is_match(&line_no_comment) {
            continue;
        }

        if let Some(implicit_match) = patterns::IMPLICIT.captures(&line_no_comment) {
            let group = implicit_match.get(1).unwrap();
            let implicit = !group.as_str().eq_ignore_ascii_case("none");
            if !ast.set_implicit(implicit) {
                ast.parse_errors.push(ParseErrorRecord {
                    line: line_number,
                    schar: group.start(),
                    echar: group.end(),
                    message: "IMPLICIT statement without enclosing scope".to_string(),
                    severity: 1,
                });
            }
            debug!("{} !!! IMPLICIT statement({line_number})", line.trim());
            continue;
        }

        if let Some(contains_match) = patterns::CONTAINS.captures(&line_no_comment) {
            let group = contains_match.get(1).unwrap();
            let message = if !ast.in_scope() {
                Some("CONTAINS statement without enclosing scope")
            } else if !ast.mark_contains(line_number) {
                Some("Multiple CONTAINS statements in scope")
            } else {
                None
            };
            if let Some(message) = message {
                ast.parse_errors.push(ParseErrorRecord {
                    line: line_number,
                    schar: group.start(),
                    echar: group.end(),
                    message: message.to_string(),
                    severity: 1,
                });
            }
            debug!("{} !!! CONTAINS statement({line_number})", line.trim());
            continue;
        }

        // A trailing doc comment on a code line.
        if let Some(post_comment) = &line_post_comment {
            if let Some(doc_match) = patterns::FREE_DOC.captures(post_comment) {
                doc_string =
                    Some(post_comment[doc_match.get(0).unwrap().end()..].trim().to_string());
            }
        }

        let Some(recognized) = recognize(&line_no_comment) else {
            continue;
        };
        match recognized {
            Recognized::Var(info) => {
                let Some(var_names) = info.var_names else {
                    continue;
                };
                let procedure_def = info.type_word.starts_with("PRO");
                if procedure_def
                    && matches!(ast.current_scope().kind, ScopeKind::Interface { .. })
                {
                    for var_name in &var_names {
                        ast.add_int_member(var_name);
                    }
                    debug!("{} !!! INTERFACE-PRO statement({line_number})", line.trim());
                    continue;
                }
                for var_name in &var_names {
                    let mut link_name: Option<String> = None;
                    let mut name_raw = match var_name.split_once("=>") {
                        Some((local, target)) => {
                            let target =
                                target.split('(').next().unwrap_or("").trim().to_string();
                            if !target.eq_ignore_ascii_case("null") {
                                link_name = Some(target);
                            }
                            local.to_string()
                        }
                        None => var_name.split('=').next().unwrap_or("").to_string(),
                    };
                    let mut desc = info.type_word.clone();
                    let mut keyword_strs = info.keywords.clone();
                    if let Some(paren) = name_raw.find('(') {
                        let mut cut = paren;
                        if cut == 0 {
                            continue;
                        }
                        if name_raw.as_bytes()[cut - 1] == b'*' {
                            // `name*(len)` character length spec
                            cut -= 1;
                            if !desc.contains('(') {
                                if let Some(length) = get_paren_substring(&name_raw) {
                                    desc.push_str(&format!("*({length})"));
                                }
                            }
                        } else if let Some(dims) = get_paren_substring(&name_raw) {
                            keyword_strs.push(format!("dimension({dims})"));
                        }
                        name_raw.truncate(cut);
                    }
                    let name = name_raw.trim();
                    if name.is_empty() {
                        continue;
                    }
                    let mut var = Variable::new(line_number, name, &desc, keyword_strs);
                    var.link_name = link_name;
                    if !procedure_def && var.is_parameter() {
                        if let Some((_, word_end)) = find_word_in_line(&line, name) {
                            if let Some(value_match) =
                                patterns::PARAMETER_VAL.captures(&line[word_end..])
                            {
                                let value = value_match[1].trim().to_string();
                                if !value.is_empty() {
                                    var.param_val = Some(value);
                                }
                            }
                        }
                    }
                    ast.add_variable(var);
                }
                debug!("{} !!! VARIABLE statement({line_number})", line.trim());
            }

            Recognized::Sub(info) => {
                let mod_flag = info.mod_flag
                    || info
                        .keywords
                        .iter()
                        .any(|keyword| keyword.eq_ignore_ascii_case("module"));
                let mut scope = Scope::new(
                    ScopeKind::Subroutine {
                        args: info.args.clone(),
                        mod_flag,
                    },
                    &info.name,
                    line_number,
                );
                scope.keywords = map_keywords(&info.keywords);
                ast.add_scope(scope);
                debug!("{} !!! SUBROUTINE statement({line_number})", line.trim());
            }

            Recognized::Fun(info) => {
                let mod_flag = info.mod_flag
                    || info
                        .keywords
                        .iter()
                        .any(|keyword| keyword.eq_ignore_ascii_case("module"));
                let result = ResultSig {
                    type_desc: info.return_type.as_ref().map(|(desc, _)| desc.clone()),
                    name: info.return_var.clone(),
                    keywords: info
                        .return_type
                        .as_ref()
                        .map(|(_, keywords)| keywords.clone())
                        .unwrap_or_default(),
                };
                let mut scope = Scope::new(
                    ScopeKind::Function {
                        args: info.args.clone(),
                        mod_flag,
                        result,
                    },
                    &info.name,
                    line_number,
                );
                scope.keywords = map_keywords(&info.keywords);
                ast.add_scope(scope);
                // An inline result type declares the result variable.
                if let Some((type_desc, type_keywords)) = info.return_type {
                    ast.add_variable(Variable::new(
                        line_number,
                        &info.name,
                        &type_desc,
                        type_keywords,
                    ));
                }
                debug!("{} !!! FUNCTION statement({line_number})", line.trim());
            }

            Recognized::Block(name) => {
                let name = name.unwrap_or_else(|| {
                    block_counter += 1;
                    format!("#BLOCK{block_counter}")
                });
                ast.add_scope(Scope::new(ScopeKind::Block, &name, line_number));
                debug!("{} !!! BLOCK statement({line_number})", line.trim());
            }

            Recognized::Do(label) => {
                do_counter += 1;
                if !label.is_empty() {
                    do_label_stack.push(label);
                }
                ast.add_scope(Scope::new(
                    ScopeKind::Do,
                    &format!("#DO{do_counter}"),
                    line_number,
                ));
                debug!("{} !!! DO statement({line_number})", line.trim());
            }

            Recognized::Where(single_line) => {
                if !single_line {
                    do_counter += 1;
                    ast.add_scope(Scope::new(
                        ScopeKind::Where,
                        &format!("#WHERE{do_counter}"),
                        line_number,
                    ));
                }
                debug!("{} !!! WHERE statement({line_number})", line.trim());
            }

            Recognized::If => {
                if_counter += 1;
                ast.add_scope(Scope::new(
                    ScopeKind::If,
                    &format!("#IF{if_counter}"),
                    line_number,
                ));
                debug!("{} !!! IF statement({line_number})", line.trim());
            }

            Recognized::Associate(bindings) => {
                block_counter += 1;
                ast.add_scope(Scope::new(
                    ScopeKind::Associate,
                    &format!("#ASSOC{block_counter}"),
                    line_number,
                ));
                for binding in &bindings {
                    if let Some((local, target)) = binding.split_once("=>") {
                        let mut var =
                            Variable::new(line_number, local.trim(), "CLASS(*)", Vec::new());
                        var.link_name = Some(target.trim().to_string());
                        ast.add_variable(var);
                    }
                }
                debug!("{} !!! ASSOCIATE statement({line_number})", line.trim());
            }

            Recognized::Select(info) => {
                select_counter += 1;
                let (binding_name, bound_var) = match info.kind {
                    SelectKind::Type => match &info.binding {
                        Some(binding) => match binding.split_once("=>") {
                            Some((local, target)) => (
                                Some(local.trim().to_string()),
                                Some(target.trim().to_string()),
                            ),
                            None => (None, Some(binding.clone())),
                        },
                        None => (None, None),
                    },
                    SelectKind::TypeIs => (info.binding.clone(), None),
                    _ => (None, None),
                };
                ast.add_scope(Scope::new(
                    ScopeKind::Select {
                        kind: info.kind,
                        binding_name,
                        bound_var,
                    },
                    &format!("#SELECT{select_counter}"),
                    line_number,
                ));
                // Region lines re-type the select binding inside the region.
                if info.kind.is_type_region() {
                    if let Some(var) = select_region_binding(&ast, &info, line_number) {
                        ast.add_variable(var);
                    }
                }
                debug!("{} !!! SELECT statement({line_number})", line.trim());
            }

            Recognized::DerivedType(info) => {
                let mut scope = Scope::new(
                    ScopeKind::DerivedType {
                        extends: info.extends,
                    },
                    &info.name,
                    line_number,
                );
                scope.keywords = map_keywords(&info.keywords);
                ast.add_scope(scope);
                debug!("{} !!! TYPE statement({line_number})", line.trim());
            }

            Recognized::Enum => {
                block_counter += 1;
                ast.add_scope(Scope::new(
                    ScopeKind::Enum,
                    &format!("#ENUM{block_counter}"),
                    line_number,
                ));
                debug!("{} !!! ENUM statement({line_number})", line.trim());
            }

            Recognized::Interface(info) => {
                let name = info.name.unwrap_or_else(|| {
                    int_counter += 1;
                    format!("#GEN_INT{int_counter}")
                });
                ast.add_scope(Scope::new(
                    ScopeKind::Interface {
                        is_abstract: info.is_abstract,
                    },
                    &name,
                    line_number,
                ));
                debug!("{} !!! INTERFACE statement({line_number})", line.trim());
            }

            Recognized::Generic(info) => {
                // A generic binding is an interface scope opened and closed
                // on the same line.
                let id = ast.add_scope(Scope::new(
                    ScopeKind::Interface { is_abstract: false },
                    &info.bound_name,
                    line_number,
                ));
                ast.scopes[id].vis = info.vis;
                for link in &info.pro_links {
                    ast.add_int_member(link);
                }
                ast.end_scope(line_number);
                debug!("{} !!! GENERIC statement({line_number})", line.trim());
            }

            Recognized::ModuleProcedure(names) => {
                if matches!(ast.current_scope().kind, ScopeKind::Interface { .. }) {
                    for name in &names {
                        ast.add_int_member(name);
                    }
                    debug!("{} !!! INTERFACE-PRO statement({line_number})", line.trim());
                } else if matches!(ast.current_scope().kind, ScopeKind::Submodule { .. }) {
                    if let Some(first) = names.first() {
                        ast.add_scope(Scope::new(ScopeKind::ProcedureImpl, first, line_number));
                        debug!("{} !!! INTERFACE-IMPL statement({line_number})", line.trim());
                    }
                }
            }

            Recognized::Module(name) => {
                ast.add_scope(Scope::new(ScopeKind::Module, &name, line_number));
                debug!("{} !!! MODULE statement({line_number})", line.trim());
            }

            Recognized::Program(name) => {
                ast.add_scope(Scope::new(ScopeKind::Program, &name, line_number));
                debug!("{} !!! PROGRAM statement({line_number})", line.trim());
            }

            Recognized::Submodule(info) => {
                let name = info.name.unwrap_or_default();
                ast.add_scope(Scope::new(
                    ScopeKind::Submodule {
                        ancestor: info.parent,
                    },
                    &name,
                    line_number,
                ));
                debug!("{} !!! SUBMODULE statement({line_number})", line.trim());
            }

            Recognized::Use(info) => {
                ast.add_use(Use {
                    mod_name: info.mod_name,
                    only_list: info.only_list,
                    rename_map: info.rename_map,
                    line: line_number,
                });
                debug!("{} !!! USE statement({line_number})", line.trim());
            }

            Recognized::Import(names) => {
                // Modeled as a use of the sentinel module #IMPORT.
                ast.add_use(Use {
                    mod_name: "#IMPORT".to_string(),
                    only_list: names,
                    rename_map: HashMap::new(),
                    line: line_number,
                });
                debug!("{} !!! IMPORT statement({line_number})", line.trim());
            }

            Recognized::Include(path) => {
                ast.add_include(Include {
                    path,
                    line: line_number,
                });
                debug!("{} !!! INCLUDE statement({line_number})", line.trim());
            }

            Recognized::Visibility(info) => {
                if !ast.in_scope() {
                    ast.parse_errors.push(ParseErrorRecord {
                        line: line_number,
                        schar: 0,
                        echar: 0,
                        message: "Visibility statement without enclosing scope".to_string(),
                        severity: 1,
                    });
                } else if info.names.is_empty() && info.private {
                    ast.set_default_vis(-1);
                } else {
                    for name in &info.names {
                        if info.private {
                            ast.add_private(name);
                        } else {
                            ast.add_public(name);
                        }
                    }
                }
                debug!("{} !!! VISIBILITY statement({line_number})", line.trim());
            }
        }
    }

    ast.close_file(line_number);
    ast
}

fn is_plain_word(text: &str) -> bool {
    patterns::WORD
        .find(text)
        .map(|word| word.start() == 0 && word.end() == text.len())
        .unwrap_or(false)
}

/// Build the binding variable of a `type is`/`class is`/`class default`
/// region from the enclosing `select type` binding.
fn select_region_binding(
    ast: &Ast,
    info: &recognize::SelectInfo,
    line_number: usize,
) -> Option<Variable> {
    let region_id = ast.current_id();
    let parent_id = ast.scopes[region_id].parent?;
    let ScopeKind::Select {
        kind: SelectKind::Type,
        binding_name,
        bound_var,
    } = &ast.scopes[parent_id].kind
    else {
        return None;
    };
    let desc = match (&info.desc, &info.binding) {
        (Some(desc), Some(binding)) => format!("{desc}({binding})"),
        _ => "CLASS(*)".to_string(),
    };
    match (binding_name, bound_var) {
        (Some(name), target) => {
            let mut var = Variable::new(line_number, name, &desc, Vec::new());
            // Only the default region keeps the link to the selector.
            if info.kind == SelectKind::Default {
                var.link_name = target.clone();
            }
            Some(var)
        }
        (None, Some(target)) => Some(Variable::new(line_number, target, &desc, Vec::new())),
        (None, None) => None,
    }
}
