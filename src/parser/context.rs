//! Cursor-context classification for the completion layer.
//!
//! Given the text of a line up to the cursor, [`get_line_context`] decides
//! what kind of completion applies there. The classification leans on the
//! same recognizers the parser uses plus a backward parenthesis-level
//! analysis of the line tail.

use crate::patterns;
use crate::scan::get_paren_level;

use super::recognize::{read_use_stmt, read_var_def, Recognized};

/// What the cursor position at the end of a line is completing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineContext {
    /// A declaration attribute keyword (`integer, poi<cursor>`).
    VarKey,
    /// Names in a variable declaration.
    VarOnly,
    /// The target of a procedure link (`procedure(...) :: p => <cursor>`).
    ProLink,
    /// Members of a module inside an `only:` list; carries the module
    /// name.
    ModMems(String),
    /// A module name in a `use` statement.
    ModOnly,
    /// No completion applies here.
    Skip,
    /// Names in an `import` statement.
    Import,
    /// Names in a visibility statement.
    Vis,
    /// A subroutine name after `call`.
    Call,
    /// A derived type name (`type(<cursor>`, `extends(<cursor>`).
    TypeOnly,
    /// An abstract interface name (`procedure(<cursor>`).
    IntOnly,
    /// The first word of a statement.
    First,
    /// Ordinary expression context.
    Default,
}

/// Classify the completion context at the end of `line`.
pub fn get_line_context(line: &str) -> LineContext {
    let (last_level, sections) = get_paren_level(line);
    let lev1_end = sections.last().map(|&(_, end)| end).unwrap_or(0);

    // Variable definition statements.
    if let Some(Recognized::Var(info)) = read_var_def(line, false) {
        if info.var_names.is_none() && lev1_end == line.len() {
            return LineContext::VarKey;
        }
        if info.type_word.starts_with("PROCEDURE") && line.contains("=>") {
            return LineContext::ProLink;
        }
        return LineContext::VarOnly;
    }

    // `use` statements complete module names or module members.
    if let Some(Recognized::Use(info)) = read_use_stmt(line) {
        let has_only = patterns::USE
            .captures(line)
            .map(|caps| caps.get(2).is_some())
            .unwrap_or(false);
        if has_only {
            return LineContext::ModMems(info.mod_name);
        }
        return LineContext::ModOnly;
    }

    if patterns::PRO_LINK.is_match(line) {
        return LineContext::ProLink;
    }

    // Scope declarations and end statements get no completion.
    if patterns::SCOPE_DEF.is_match(line) || patterns::END_WORD.is_match(line) {
        return LineContext::Skip;
    }

    if patterns::IMPORT.is_match(line) {
        return LineContext::Import;
    }
    if patterns::VIS.is_match(line) {
        return LineContext::Vis;
    }

    let type_def = patterns::TYPE_DEF.is_match(line);

    // Inside an open `call` statement at the top level.
    if lev1_end == line.len() && patterns::CALL.is_match(&last_level) {
        return LineContext::Call;
    }

    // Cursor just inside an open paren group: check what opened it.
    if sections.len() == 1 && sections[0].0 >= 1 {
        let prefix = &line[..sections[0].0 - 1];
        let (test_str, _) = get_paren_level(prefix);
        let trimmed = test_str.trim_end().to_lowercase();
        if patterns::TYPE_STMNT.is_match(&test_str)
            || (type_def && trimmed.ends_with("extends"))
        {
            return LineContext::TypeOnly;
        }
        if patterns::PROCEDURE_STMNT.is_match(&test_str) {
            return LineContext::IntOnly;
        }
    }

    if patterns::INT_STMNT.is_match(line) {
        return LineContext::First;
    }

    if type_def {
        return LineContext::Skip;
    }
    LineContext::Default
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variable_contexts() {
        assert_eq!(get_line_context("integer, "), LineContext::VarKey);
        assert_eq!(get_line_context("integer :: x, "), LineContext::VarOnly);
        assert_eq!(
            get_line_context("procedure(iface), pointer :: p => "),
            LineContext::ProLink
        );
    }

    #[test]
    fn test_use_contexts() {
        assert_eq!(get_line_context("use my_mod"), LineContext::ModOnly);
        assert_eq!(
            get_line_context("use my_mod, only: "),
            LineContext::ModMems("my_mod".to_string())
        );
    }

    #[test]
    fn test_statement_contexts() {
        assert_eq!(get_line_context("import "), LineContext::Import);
        assert_eq!(get_line_context("public :: "), LineContext::Vis);
        assert_eq!(get_line_context("call my_sub"), LineContext::Call);
        assert_eq!(get_line_context("subroutine "), LineContext::Skip);
        assert_eq!(get_line_context("end "), LineContext::Skip);
    }

    #[test]
    fn test_paren_prefix_contexts() {
        assert_eq!(get_line_context("type("), LineContext::TypeOnly);
        assert_eq!(
            get_line_context("type, extends("),
            LineContext::TypeOnly
        );
        assert_eq!(get_line_context("procedure("), LineContext::IntOnly);
    }

    #[test]
    fn test_fallbacks() {
        assert_eq!(get_line_context("theword"), LineContext::First);
        assert_eq!(get_line_context("x = y + "), LineContext::Default);
    }
}
