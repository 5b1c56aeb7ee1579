//! Variable records and declaration keyword mapping.

use std::fmt::Display;

use crate::scan::get_paren_substring;

/// Canonical declaration attribute.
///
/// The display form is the canonical tag used by downstream consumers
/// (`INTENT-IN`, `DIM(:,:)`, ...); the spelled-out originals travel next to
/// these on the owning record so hover output can echo the source.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum KeywordAttr {
    Pointer,
    Allocatable,
    Optional,
    Public,
    Private,
    Nopass,
    External,
    Save,
    Parameter,
    Contiguous,
    Deferred,
    Target,
    Asynchronous,
    Volatile,
    Value,
    Protected,
    Abstract,
    IntentIn,
    IntentOut,
    IntentInOut,
    Dim(String),
    Pass(Option<String>),
    Bind(String),
    Pure,
    Elemental,
    Recursive,
    Impure,
    Module,
    NonRecursive,
    Atomic,
}

impl Display for KeywordAttr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeywordAttr::Pointer => write!(f, "POINTER"),
            KeywordAttr::Allocatable => write!(f, "ALLOCATABLE"),
            KeywordAttr::Optional => write!(f, "OPTIONAL"),
            KeywordAttr::Public => write!(f, "PUBLIC"),
            KeywordAttr::Private => write!(f, "PRIVATE"),
            KeywordAttr::Nopass => write!(f, "NOPASS"),
            KeywordAttr::External => write!(f, "EXTERNAL"),
            KeywordAttr::Save => write!(f, "SAVE"),
            KeywordAttr::Parameter => write!(f, "PARAMETER"),
            KeywordAttr::Contiguous => write!(f, "CONTIGUOUS"),
            KeywordAttr::Deferred => write!(f, "DEFERRED"),
            KeywordAttr::Target => write!(f, "TARGET"),
            KeywordAttr::Asynchronous => write!(f, "ASYNCHRONOUS"),
            KeywordAttr::Volatile => write!(f, "VOLATILE"),
            KeywordAttr::Value => write!(f, "VALUE"),
            KeywordAttr::Protected => write!(f, "PROTECTED"),
            KeywordAttr::Abstract => write!(f, "ABSTRACT"),
            KeywordAttr::IntentIn => write!(f, "INTENT-IN"),
            KeywordAttr::IntentOut => write!(f, "INTENT-OUT"),
            KeywordAttr::IntentInOut => write!(f, "INTENT-INOUT"),
            KeywordAttr::Dim(spec) => write!(f, "DIM({spec})"),
            KeywordAttr::Pass(None) => write!(f, "PASS"),
            KeywordAttr::Pass(Some(arg)) => write!(f, "PASS({arg})"),
            KeywordAttr::Bind(lang) => write!(f, "BIND({lang})"),
            KeywordAttr::Pure => write!(f, "PURE"),
            KeywordAttr::Elemental => write!(f, "ELEMENTAL"),
            KeywordAttr::Recursive => write!(f, "RECURSIVE"),
            KeywordAttr::Impure => write!(f, "IMPURE"),
            KeywordAttr::Module => write!(f, "MODULE"),
            KeywordAttr::NonRecursive => write!(f, "NON_RECURSIVE"),
            KeywordAttr::Atomic => write!(f, "ATOMIC"),
        }
    }
}

/// Map raw keyword spellings to canonical attributes.
///
/// Unrecognized keywords are dropped from the canonical set; the caller
/// keeps the raw spellings separately. The canonical list is sorted so two
/// declarations with the same attributes compare equal regardless of
/// source order.
pub fn map_keywords(raw: &[String]) -> Vec<KeywordAttr> {
    let mut mapped = Vec::with_capacity(raw.len());
    for keyword in raw {
        let prefix = keyword
            .split('(')
            .next()
            .unwrap_or("")
            .trim()
            .to_lowercase();
        let attr = match prefix.as_str() {
            "pointer" => Some(KeywordAttr::Pointer),
            "allocatable" => Some(KeywordAttr::Allocatable),
            "optional" => Some(KeywordAttr::Optional),
            "public" => Some(KeywordAttr::Public),
            "private" => Some(KeywordAttr::Private),
            "nopass" => Some(KeywordAttr::Nopass),
            "external" => Some(KeywordAttr::External),
            "save" => Some(KeywordAttr::Save),
            "parameter" => Some(KeywordAttr::Parameter),
            "contiguous" => Some(KeywordAttr::Contiguous),
            "deferred" => Some(KeywordAttr::Deferred),
            "target" => Some(KeywordAttr::Target),
            "asynchronous" => Some(KeywordAttr::Asynchronous),
            "volatile" => Some(KeywordAttr::Volatile),
            "value" => Some(KeywordAttr::Value),
            "protected" => Some(KeywordAttr::Protected),
            "abstract" => Some(KeywordAttr::Abstract),
            "pure" => Some(KeywordAttr::Pure),
            "elemental" => Some(KeywordAttr::Elemental),
            "recursive" => Some(KeywordAttr::Recursive),
            "impure" => Some(KeywordAttr::Impure),
            "module" => Some(KeywordAttr::Module),
            "non_recursive" => Some(KeywordAttr::NonRecursive),
            "atomic" => Some(KeywordAttr::Atomic),
            "intent" => {
                let spec = get_paren_substring(keyword)
                    .unwrap_or("")
                    .replace(' ', "")
                    .to_lowercase();
                match spec.as_str() {
                    "in" => Some(KeywordAttr::IntentIn),
                    "out" => Some(KeywordAttr::IntentOut),
                    "inout" => Some(KeywordAttr::IntentInOut),
                    _ => None,
                }
            }
            "dimension" => {
                get_paren_substring(keyword).map(|spec| KeywordAttr::Dim(spec.trim().to_string()))
            }
            "pass" => Some(KeywordAttr::Pass(
                get_paren_substring(keyword).map(|arg| arg.trim().to_lowercase()),
            )),
            "bind" => {
                get_paren_substring(keyword).map(|lang| KeywordAttr::Bind(lang.trim().to_string()))
            }
            _ => None,
        };
        if let Some(attr) = attr {
            mapped.push(attr);
        }
    }
    mapped.sort();
    mapped
}

/// A declared entity: variable, component, enumerator, or procedure
/// pointer.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    /// Lower-cased name.
    pub name: String,
    /// Upper-case type descriptor, e.g. `INTEGER(kind=8)` or `TYPE(point)`.
    pub desc: String,
    pub keywords: Vec<KeywordAttr>,
    /// Original keyword spellings for hover display.
    pub keyword_strs: Vec<String>,
    /// Target of a `=>` binding or procedure interface link.
    pub link_name: Option<String>,
    /// Literal value of a `parameter`, captured for hover.
    pub param_val: Option<String>,
    pub doc: Option<String>,
    pub sline: usize,
}

impl Variable {
    pub fn new(sline: usize, name: &str, desc: &str, keyword_strs: Vec<String>) -> Self {
        let keywords = map_keywords(&keyword_strs);
        Self {
            name: name.to_lowercase(),
            desc: desc.to_string(),
            keywords,
            keyword_strs,
            link_name: None,
            param_val: None,
            doc: None,
            sline,
        }
    }

    pub fn is_parameter(&self) -> bool {
        self.keywords.contains(&KeywordAttr::Parameter)
    }

    pub fn is_external(&self) -> bool {
        self.desc == "EXTERNAL" || self.keywords.contains(&KeywordAttr::External)
    }

    /// Procedure pointers and deferred bindings use a `PROCEDURE(...)`
    /// descriptor.
    pub fn is_procedure(&self) -> bool {
        self.desc.starts_with("PRO")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_keywords_canonical_tags() {
        let raw = vec![
            "INTENT(IN)".to_string(),
            "DIMENSION(:,:)".to_string(),
            "OPTIONAL".to_string(),
        ];
        let mapped = map_keywords(&raw);
        assert!(mapped.contains(&KeywordAttr::IntentIn));
        assert!(mapped.contains(&KeywordAttr::Dim(":,:".to_string())));
        assert!(mapped.contains(&KeywordAttr::Optional));
    }

    #[test]
    fn test_map_keywords_drops_unknown() {
        let mapped = map_keywords(&["WHATEVER".to_string(), "POINTER".to_string()]);
        assert_eq!(mapped, vec![KeywordAttr::Pointer]);
    }

    #[test]
    fn test_canonical_display() {
        assert_eq!(KeywordAttr::IntentInOut.to_string(), "INTENT-INOUT");
        assert_eq!(KeywordAttr::Dim("4".into()).to_string(), "DIM(4)");
        assert_eq!(KeywordAttr::Pass(None).to_string(), "PASS");
    }

    #[test]
    fn test_variable_flags() {
        let var = Variable::new(1, "X", "EXTERNAL", vec![]);
        assert!(var.is_external());
        assert_eq!(var.name, "x");

        let var = Variable::new(1, "p", "PROCEDURE(iface)", vec!["POINTER".to_string()]);
        assert!(var.is_procedure());
        assert!(!var.is_external());
    }
}
