//! Statement recognizers.
//!
//! Each recognizer is a pure function from a stripped, comment-free,
//! continuation-joined logical line to a classified [`Recognized`] value.
//! [`recognize`] applies them in a fixed order, first match wins; that
//! order resolves the real ambiguities of the grammar (a `module function`
//! line must be claimed by the function reader, `type is` must never reach
//! the derived-type reader, and so on).

mod constructs;
mod routines;
mod statements;
mod types;
mod variables;

pub use self::constructs::*;
pub use self::routines::*;
pub use self::statements::*;
pub use self::types::*;
pub use self::variables::*;

use std::collections::HashMap;

use crate::ast::SelectKind;

#[derive(Debug, Clone, PartialEq)]
pub struct VarInfo {
    /// Upper-cased type word including any kind/length spec.
    pub type_word: String,
    /// Raw attribute keywords, upper-cased.
    pub keywords: Vec<String>,
    /// Declarators after `::`; `None` when the statement only sets
    /// attributes.
    pub var_names: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoutineInfo {
    pub name: String,
    pub args: Vec<String>,
    pub mod_flag: bool,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunInfo {
    pub name: String,
    pub args: Vec<String>,
    /// Inline result type and its keywords, when the declaration came
    /// through a type-prefixed line.
    pub return_type: Option<(String, Vec<String>)>,
    /// Name from a `result(...)` suffix.
    pub return_var: Option<String>,
    pub mod_flag: bool,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectInfo {
    pub kind: SelectKind,
    pub binding: Option<String>,
    /// `TYPE` or `CLASS` for `type is`/`class is` regions.
    pub desc: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeInfo {
    pub name: String,
    pub extends: Option<String>,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UseInfo {
    pub mod_name: String,
    pub only_list: Vec<String>,
    pub rename_map: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InterfaceInfo {
    /// `None` for anonymous, `assignment`, and `operator` interfaces.
    pub name: Option<String>,
    pub is_abstract: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenericInfo {
    pub bound_name: String,
    pub pro_links: Vec<String>,
    /// +1 public, -1 private, 0 unspecified.
    pub vis: i8,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubmodInfo {
    pub name: Option<String>,
    pub parent: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VisInfo {
    pub private: bool,
    pub names: Vec<String>,
}

/// A classified logical line.
#[derive(Debug, Clone, PartialEq)]
pub enum Recognized {
    Var(VarInfo),
    Sub(RoutineInfo),
    Fun(FunInfo),
    /// Named or anonymous `block` construct.
    Block(Option<String>),
    /// `do` construct; the payload is the old-style terminal label, empty
    /// when none.
    Do(String),
    /// `where` construct; `true` means single-statement form (no scope).
    Where(bool),
    If,
    Associate(Vec<String>),
    Select(SelectInfo),
    DerivedType(TypeInfo),
    Enum,
    Use(UseInfo),
    Import(Vec<String>),
    Interface(InterfaceInfo),
    Generic(GenericInfo),
    Module(String),
    /// `module procedure a, b` member list.
    ModuleProcedure(Vec<String>),
    Program(String),
    Submodule(SubmodInfo),
    Include(String),
    Visibility(VisInfo),
}

/// Classify a logical line, first match wins.
pub fn recognize(line: &str) -> Option<Recognized> {
    read_var_def(line, false)
        .or_else(|| read_sub_def(line, false))
        .or_else(|| read_fun_def(line, None, false))
        .or_else(|| read_block_def(line))
        .or_else(|| read_associate_def(line))
        .or_else(|| read_select_def(line))
        .or_else(|| read_type_def(line))
        .or_else(|| read_enum_def(line))
        .or_else(|| read_use_stmt(line))
        .or_else(|| read_imp_stmt(line))
        .or_else(|| read_int_def(line))
        .or_else(|| read_generic_def(line))
        .or_else(|| read_mod_def(line))
        .or_else(|| read_prog_def(line))
        .or_else(|| read_submod_def(line))
        .or_else(|| read_inc_stmt(line))
        .or_else(|| read_vis_stmnt(line))
}
