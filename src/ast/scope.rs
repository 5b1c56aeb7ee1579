//! Scope nodes of the declaration tree.

use std::collections::HashMap;

use crate::ast::variable::{KeywordAttr, Variable};

pub type ScopeId = usize;

/// Sub-kind of a `select` construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectKind {
    /// `select case (expr)`
    Case,
    /// `select type (binding)`
    Type,
    /// `type is (...)` / `class is (...)` region
    TypeIs,
    /// `class default` region
    Default,
}

impl SelectKind {
    /// Regions live one level below their `select type` and are closed
    /// implicitly by the next region or the final `end select`.
    pub fn is_type_region(self) -> bool {
        matches!(self, SelectKind::TypeIs | SelectKind::Default)
    }
}

/// Result signature of a function: inline result type (if declared in the
/// prefix), explicit `result(name)`, and the prefix keywords.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSig {
    pub type_desc: Option<String>,
    pub name: Option<String>,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScopeKind {
    /// The implicit file-level scope; never closed, never popped.
    Root,
    Module,
    Submodule {
        ancestor: Option<String>,
    },
    Program,
    Subroutine {
        args: Vec<String>,
        mod_flag: bool,
    },
    Function {
        args: Vec<String>,
        mod_flag: bool,
        result: ResultSig,
    },
    DerivedType {
        extends: Option<String>,
    },
    Interface {
        is_abstract: bool,
    },
    Enum,
    Block,
    Do,
    If,
    Where,
    Select {
        kind: SelectKind,
        binding_name: Option<String>,
        bound_var: Option<String>,
    },
    Associate,
    ProcedureImpl,
}

impl ScopeKind {
    /// The construct word accepted by this scope's `end` statement.
    pub fn end_word(&self) -> Option<&'static str> {
        match self {
            ScopeKind::Root => None,
            ScopeKind::Module => Some("module"),
            ScopeKind::Submodule { .. } => Some("submodule"),
            ScopeKind::Program => Some("program"),
            ScopeKind::Subroutine { .. } => Some("subroutine"),
            ScopeKind::Function { .. } => Some("function"),
            ScopeKind::DerivedType { .. } => Some("type"),
            ScopeKind::Interface { .. } => Some("interface"),
            ScopeKind::Enum => Some("enum"),
            ScopeKind::Block => Some("block"),
            ScopeKind::Do => Some("do"),
            ScopeKind::If => Some("if"),
            ScopeKind::Where => Some("where"),
            ScopeKind::Select { .. } => Some("select"),
            ScopeKind::Associate => Some("associate"),
            ScopeKind::ProcedureImpl => Some("procedure"),
        }
    }

    pub fn matches_end_word(&self, word: &str) -> bool {
        self.end_word()
            .map(|expected| expected.eq_ignore_ascii_case(word))
            .unwrap_or(false)
    }

    /// Program units must close with `end <unit>`; a bare `end` is
    /// accepted but reported.
    pub fn requires_named_end(&self) -> bool {
        matches!(
            self,
            ScopeKind::Module
                | ScopeKind::Submodule { .. }
                | ScopeKind::Program
                | ScopeKind::Subroutine { .. }
                | ScopeKind::Function { .. }
                | ScopeKind::ProcedureImpl
        )
    }

    pub fn is_type_region_select(&self) -> bool {
        matches!(self, ScopeKind::Select { kind, .. } if kind.is_type_region())
    }
}

/// A `use` (or `import`, via the `#IMPORT` sentinel module) statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Use {
    /// Module name with original casing.
    pub mod_name: String,
    pub only_list: Vec<String>,
    /// local name -> remote name
    pub rename_map: HashMap<String, String>,
    pub line: usize,
}

/// A Fortran `include "file"` statement (not the preprocessor one).
#[derive(Debug, Clone, PartialEq)]
pub struct Include {
    pub path: String,
    pub line: usize,
}

#[derive(Debug, Clone)]
pub struct Scope {
    pub kind: ScopeKind,
    pub name: String,
    pub sline: usize,
    /// Closing line; stays at `sline` until the scope is ended.
    pub eline: usize,
    pub parent: Option<ScopeId>,
    pub children: Vec<ScopeId>,
    pub variables: Vec<Variable>,
    pub uses: Vec<Use>,
    pub includes: Vec<Include>,
    /// Interface member procedure names (lower-cased).
    pub members: Vec<String>,
    pub doc: Option<String>,
    /// This scope's own visibility where it matters (generic bindings);
    /// +1 public, -1 private, 0 unset.
    pub vis: i8,
    /// Default visibility of members: +1 public, -1 private, 0 unset.
    pub default_vis: i8,
    pub public_names: Vec<String>,
    pub private_names: Vec<String>,
    /// `Some(false)` after `implicit none`, `Some(true)` after any other
    /// `implicit` statement.
    pub implicit: Option<bool>,
    pub contains_line: Option<usize>,
    /// Prefix keywords of routines and attribute keywords of types.
    pub keywords: Vec<KeywordAttr>,
}

impl Scope {
    pub fn new(kind: ScopeKind, name: &str, sline: usize) -> Self {
        Self {
            kind,
            name: name.to_string(),
            sline,
            eline: sline,
            parent: None,
            children: Vec::new(),
            variables: Vec::new(),
            uses: Vec::new(),
            includes: Vec::new(),
            members: Vec::new(),
            doc: None,
            vis: 0,
            default_vis: 0,
            public_names: Vec::new(),
            private_names: Vec::new(),
            implicit: None,
            contains_line: None,
            keywords: Vec::new(),
        }
    }

    pub fn root() -> Self {
        Self::new(ScopeKind::Root, "", 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_end_word_matching() {
        assert!(ScopeKind::Module.matches_end_word("MODULE"));
        assert!(ScopeKind::Do.matches_end_word("do"));
        assert!(!ScopeKind::Do.matches_end_word("if"));
        assert!(!ScopeKind::Root.matches_end_word("module"));
    }

    #[test]
    fn test_named_end_requirement() {
        assert!(ScopeKind::Program.requires_named_end());
        assert!(ScopeKind::ProcedureImpl.requires_named_end());
        assert!(!ScopeKind::Block.requires_named_end());
        assert!(!ScopeKind::Interface { is_abstract: false }.requires_named_end());
    }

    #[test]
    fn test_type_region() {
        let region = ScopeKind::Select {
            kind: SelectKind::TypeIs,
            binding_name: None,
            bound_var: None,
        };
        assert!(region.is_type_region_select());
        let select = ScopeKind::Select {
            kind: SelectKind::Type,
            binding_name: None,
            bound_var: Some("obj".to_string()),
        };
        assert!(!select.is_type_region_select());
    }
}
