//! The declaration tree built per file.
//!
//! Scopes live in an arena indexed by [`ScopeId`]; the parent edge is a
//! back-reference into the arena, children are owned id lists, so the tree
//! has no ownership cycles. The builder drives this type through a scope
//! stack whose bottom entry, the file-level root, is never popped.

mod scope;
mod variable;

pub use self::scope::*;
pub use self::variable::*;

use log::debug;

/// Location of a variable: owning scope and index within it.
pub type VarRef = (ScopeId, usize);

/// Something the pending documentation machinery can attach to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ObjRef {
    Scope(ScopeId),
    Var(ScopeId, usize),
}

/// A structural error around `end` statements.
///
/// `end_line` is the offending `end` (or `None` for a scope still open at
/// end of file); `scope_line` is the defining line of the scope involved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndError {
    pub end_line: Option<usize>,
    pub scope_line: usize,
}

/// A non-structural parse error with an in-line span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseErrorRecord {
    pub line: usize,
    pub schar: usize,
    pub echar: usize,
    pub message: String,
    /// 1 error, 2 warning; mirrors the LSP severity scale.
    pub severity: u8,
}

#[derive(Debug, Clone)]
pub struct Ast {
    pub scopes: Vec<Scope>,
    stack: Vec<ScopeId>,
    pub variable_list: Vec<VarRef>,
    pub external_objs: Vec<VarRef>,
    pub parse_errors: Vec<ParseErrorRecord>,
    pub end_errors: Vec<EndError>,
    /// Preprocessor skip ranges, 1-based inclusive.
    pub pp_skips: Vec<(usize, usize)>,
    pending_doc: Option<String>,
    last_obj: Option<ObjRef>,
}

impl Default for Ast {
    fn default() -> Self {
        Self::new()
    }
}

impl Ast {
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::root()],
            stack: vec![0],
            variable_list: Vec::new(),
            external_objs: Vec::new(),
            parse_errors: Vec::new(),
            end_errors: Vec::new(),
            pp_skips: Vec::new(),
            pending_doc: None,
            last_obj: None,
        }
    }

    pub fn root(&self) -> &Scope {
        &self.scopes[0]
    }

    pub fn current_id(&self) -> ScopeId {
        *self.stack.last().expect("scope stack never empty")
    }

    pub fn current_scope(&self) -> &Scope {
        &self.scopes[self.current_id()]
    }

    fn current_scope_mut(&mut self) -> &mut Scope {
        let id = self.current_id();
        &mut self.scopes[id]
    }

    /// True when a real (non-root) scope encloses the current line.
    pub fn in_scope(&self) -> bool {
        self.stack.len() > 1
    }

    /// Push a scope under the current one and make it current.
    ///
    /// Opening a `type is`/`class default` region while another region is
    /// current closes the previous region first; the regions of one
    /// `select type` are siblings, not a chain.
    pub fn add_scope(&mut self, mut scope: Scope) -> ScopeId {
        if scope.kind.is_type_region_select() && self.current_scope().kind.is_type_region_select()
        {
            self.end_scope(scope.sline.saturating_sub(1));
        }
        let parent_id = self.current_id();
        scope.parent = Some(parent_id);
        if let Some(doc) = self.pending_doc.take() {
            scope.doc = Some(doc);
        }
        let id = self.scopes.len();
        self.scopes.push(scope);
        self.scopes[parent_id].children.push(id);
        self.stack.push(id);
        self.last_obj = Some(ObjRef::Scope(id));
        id
    }

    /// Close the current scope, recording its ending line. The root scope
    /// is left untouched.
    pub fn end_scope(&mut self, line: usize) -> bool {
        if self.stack.len() <= 1 {
            return false;
        }
        let id = self.stack.pop().unwrap();
        let scope = &mut self.scopes[id];
        scope.eline = line.max(scope.sline);
        true
    }

    /// Add a variable to the current scope, merging `external` pairs.
    ///
    /// `external x` followed by `real x` (or the reverse) describes one
    /// entity; the records merge only when exactly one candidate with the
    /// same name exists in the scope. Zero or several candidates leave the
    /// new record independent.
    pub fn add_variable(&mut self, mut var: Variable) {
        if let Some(doc) = self.pending_doc.take() {
            var.doc = Some(doc);
        }
        let sid = self.current_id();
        let scope = &mut self.scopes[sid];

        if var.desc == "EXTERNAL" {
            let mut matches = scope
                .variables
                .iter()
                .enumerate()
                .filter(|(_, v)| v.name == var.name && !v.is_external());
            if let (Some((index, _)), None) = (matches.next(), matches.next()) {
                let existing = &mut scope.variables[index];
                existing.keywords.push(KeywordAttr::External);
                existing.keywords.sort();
                existing.keyword_strs.push("EXTERNAL".to_string());
                debug!("merged EXTERNAL attribute into {}", existing.name);
                self.external_objs.push((sid, index));
                self.last_obj = Some(ObjRef::Var(sid, index));
                return;
            }
        } else if !var.is_external() {
            let mut matches = scope
                .variables
                .iter()
                .enumerate()
                .filter(|(_, v)| v.name == var.name && v.desc == "EXTERNAL");
            if let (Some((index, _)), None) = (matches.next(), matches.next()) {
                let existing = &mut scope.variables[index];
                existing.desc = var.desc;
                existing.sline = var.sline;
                if !existing.keywords.contains(&KeywordAttr::External) {
                    existing.keywords.push(KeywordAttr::External);
                    existing.keywords.sort();
                }
                debug!("typed previously EXTERNAL object {}", existing.name);
                self.last_obj = Some(ObjRef::Var(sid, index));
                return;
            }
        }

        let index = scope.variables.len();
        let external = var.is_external();
        scope.variables.push(var);
        self.variable_list.push((sid, index));
        if external {
            self.external_objs.push((sid, index));
        }
        self.last_obj = Some(ObjRef::Var(sid, index));
    }

    /// Record a member procedure of the current interface scope.
    pub fn add_int_member(&mut self, name: &str) {
        let lowered = name.trim().to_lowercase();
        self.current_scope_mut().members.push(lowered);
    }

    pub fn add_use(&mut self, record: Use) {
        self.current_scope_mut().uses.push(record);
    }

    pub fn add_include(&mut self, record: Include) {
        self.current_scope_mut().includes.push(record);
    }

    /// Attach documentation: forward docs wait for the next declaration,
    /// backward docs land on the most recent one.
    pub fn add_doc(&mut self, doc: &str, forward: bool) {
        if doc.is_empty() {
            return;
        }
        if forward {
            self.pending_doc = Some(doc.to_string());
            return;
        }
        let slot = match self.last_obj {
            Some(ObjRef::Scope(id)) => &mut self.scopes[id].doc,
            Some(ObjRef::Var(id, index)) => &mut self.scopes[id].variables[index].doc,
            None => return,
        };
        match slot {
            Some(existing) => {
                existing.push('\n');
                existing.push_str(doc);
            }
            None => *slot = Some(doc.to_string()),
        }
    }

    /// Returns false when only the root scope is open.
    pub fn set_implicit(&mut self, implicit: bool) -> bool {
        if !self.in_scope() {
            return false;
        }
        self.current_scope_mut().implicit = Some(implicit);
        true
    }

    /// Returns false on a duplicate `contains` in the same scope.
    pub fn mark_contains(&mut self, line: usize) -> bool {
        let scope = self.current_scope_mut();
        if scope.contains_line.is_some() {
            return false;
        }
        scope.contains_line = Some(line);
        true
    }

    pub fn set_default_vis(&mut self, vis: i8) {
        self.current_scope_mut().default_vis = vis;
    }

    pub fn add_public(&mut self, name: &str) {
        self.current_scope_mut()
            .public_names
            .push(name.to_lowercase());
    }

    pub fn add_private(&mut self, name: &str) {
        self.current_scope_mut()
            .private_names
            .push(name.to_lowercase());
    }

    /// Close every scope still open at end of file, recording each as an
    /// error, and stamp the root's extent.
    pub fn close_file(&mut self, line: usize) {
        while self.in_scope() {
            let sline = self.current_scope().sline;
            self.end_errors.push(EndError {
                end_line: None,
                scope_line: sline,
            });
            self.end_scope(line);
        }
        let root = &mut self.scopes[0];
        root.eline = line.max(root.sline);
    }

    /// All variables of a scope, in declaration order.
    pub fn scope_variables(&self, id: ScopeId) -> &[Variable] {
        &self.scopes[id].variables
    }

    /// Linear search for a scope by name.
    pub fn find_scope(&self, name: &str) -> Option<&Scope> {
        self.scopes
            .iter()
            .find(|scope| scope.name.eq_ignore_ascii_case(name))
    }
}
