//! LSP diagnostic construction from parse results.

use lsp_types::{Diagnostic, DiagnosticSeverity, Position, Range};

use crate::ast::Ast;
use crate::config::ParseConfig;
use crate::patterns;
use crate::source::SourceFile;

fn make_range(line_1based: usize, schar: usize, echar: usize) -> Range {
    let line = line_1based.saturating_sub(1) as u32;
    Range {
        start: Position {
            line,
            character: schar as u32,
        },
        end: Position {
            line,
            character: echar as u32,
        },
    }
}

fn diagnostic(range: Range, message: String, severity: DiagnosticSeverity) -> Diagnostic {
    let mut diagnostic = Diagnostic::new_simple(range, message);
    diagnostic.severity = Some(severity);
    diagnostic
}

/// Warnings for code and comment lines exceeding the configured maxima.
pub fn check_line_lengths(file: &SourceFile, config: &ParseConfig) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    if config.max_line_length.is_none() && config.max_comment_line_length.is_none() {
        return diagnostics;
    }
    let comment_pattern = if file.fixed {
        &patterns::FIXED_COMMENT_LINE
    } else {
        &patterns::FREE_COMMENT_LINE
    };
    for (i, line) in file.contents_split.iter().enumerate() {
        let length = line.chars().count();
        let (limit, label) = if comment_pattern.is_match(line) {
            (config.max_comment_line_length, "max_comment_line_length")
        } else {
            (config.max_line_length, "max_line_length")
        };
        if let Some(max) = limit {
            if length > max {
                diagnostics.push(diagnostic(
                    make_range(i + 1, max, length),
                    format!("Line length exceeds \"{label}\" ({max})"),
                    DiagnosticSeverity::WARNING,
                ));
            }
        }
    }
    diagnostics
}

/// All diagnostics for a parsed file: structural errors collected in the
/// AST plus the line-length scan.
pub fn check_file(file: &SourceFile, ast: &Ast, config: &ParseConfig) -> Vec<Diagnostic> {
    let mut diagnostics = check_line_lengths(file, config);

    for error in &ast.parse_errors {
        let severity = if error.severity == 2 {
            DiagnosticSeverity::WARNING
        } else {
            DiagnosticSeverity::ERROR
        };
        diagnostics.push(diagnostic(
            make_range(error.line, error.schar, error.echar),
            error.message.clone(),
            severity,
        ));
    }

    for error in &ast.end_errors {
        let (message, line) = match error.end_line {
            Some(line) if error.scope_line == 0 => {
                ("Unexpected end statement: no open scopes".to_string(), line)
            }
            Some(line) => (
                "End statement does not match the enclosing scope".to_string(),
                line,
            ),
            None => (
                "Scope is never closed before the end of the file".to_string(),
                error.scope_line,
            ),
        };
        diagnostics.push(diagnostic(
            make_range(line, 0, 0),
            message,
            DiagnosticSeverity::ERROR,
        ));
    }

    diagnostics
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::process_file;

    #[test]
    fn test_line_length_warnings() {
        let text = "integer :: a_rather_long_name\n! a somewhat long comment line\nx = 1\n";
        let file = SourceFile::from_contents("/tmp/t.f90", text, &[]);
        let config = ParseConfig {
            max_line_length: Some(20),
            max_comment_line_length: Some(25),
            ..ParseConfig::default()
        };
        let diagnostics = check_line_lengths(&file, &config);
        assert_eq!(diagnostics.len(), 2);
        assert_eq!(diagnostics[0].range.start.line, 0);
        assert_eq!(diagnostics[0].range.start.character, 20);
        assert_eq!(diagnostics[0].severity, Some(DiagnosticSeverity::WARNING));
        assert_eq!(diagnostics[1].range.start.line, 1);
    }

    #[test]
    fn test_disabled_limits_produce_nothing() {
        let file = SourceFile::from_contents("/tmp/t.f90", &"x".repeat(500), &[]);
        assert!(check_line_lengths(&file, &ParseConfig::default()).is_empty());
    }

    #[test]
    fn test_structural_errors_become_diagnostics() {
        let mut file =
            SourceFile::from_contents("/tmp/t.f90", "module m\nprivate\n", &[]);
        let config = ParseConfig::default();
        let ast = process_file(&mut file, &config);
        let diagnostics = check_file(&file, &ast, &config);
        // One unclosed scope at end of file.
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].severity, Some(DiagnosticSeverity::ERROR));
        assert_eq!(diagnostics[0].range.start.line, 0);
    }
}
