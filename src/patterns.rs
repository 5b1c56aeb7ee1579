//! Precompiled patterns for Fortran statement recognition.
//!
//! Every pattern is compiled once into a process-wide table and shared
//! read-only across parses. Patterns that mirror a `match` in a
//! line-oriented grammar are anchored with `^`; case-insensitive ones carry
//! an inline `(?i)`.

use once_cell::sync::Lazy;
use regex::Regex;

macro_rules! pattern {
    ($name:ident, $re:expr) => {
        pub static $name: Lazy<Regex> = Lazy::new(|| Regex::new($re).unwrap());
    };
}

// Declarations
pattern!(
    NAT_VAR,
    r"(?i)^[ ]*(integer|real|double[ ]*precision|complex|double[ ]*complex|character|logical|procedure|external|type|class|enumerator)"
);
pattern!(KIND_SPEC, r"^[ ]*(\*?\(|\*[ ]*[0-9:]+)");
pattern!(
    KEYWORD_LIST,
    r#"(?i)^[ ]*,[ ]*(public|private|allocatable|pointer|target|dimension[ ]*\(|optional|intent[ ]*\([ inout]*\)|deferred|nopass|pass[ ]*\([a-z0-9_]*\)|save|parameter|external|contiguous|asynchronous|volatile|value|protected|bind[ ]*\([a-z0-9_, ='"]*\))"#
);
pattern!(PARAMETER_VAL, r#"^\w*[\s&]*=((?:[\s&]*[\w.\-+*/'"])*)"#);
pattern!(
    TATTR_LIST,
    r#"(?i)^[ ]*,[ ]*(public|private|abstract|extends[ ]*\([a-z0-9_]*\)|bind[ ]*\([a-z0-9_, ='"]*\))"#
);
pattern!(EXTENDS, r"(?i)extends[ ]*\(([a-z0-9_]*)\)");

// Procedures and program units
pattern!(
    SUB_MOD,
    r"(?i)^[ ]*(pure|impure|elemental|recursive|non_recursive|module|atomic)[ ]+"
);
pattern!(SUB, r"(?i)^[ ]*subroutine[ ]+([a-z0-9_]+)");
pattern!(FUN, r"(?i)^[ ]*function[ ]+([a-z0-9_]+)");
pattern!(RESULT, r"(?i)^result[ ]*\(([a-z0-9_]*)\)");
pattern!(SUB_PAREN, r"^\([a-zA-Z0-9_, ]*\)");
pattern!(MOD, r"(?i)^[ ]*module[ ]+([a-z0-9_]+)");
pattern!(SUBMOD, r"(?i)^[ ]*submodule[ ]*\(");
pattern!(PROG, r"(?i)^[ ]*program[ ]+([a-z0-9_]+)");
pattern!(INT, r"(?i)^[ ]*(abstract[ ]+)?interface[ ]*([a-z0-9_]*)");
pattern!(TYPE_DEF, r"(?i)^[ ]*(type)[, :]+");
pattern!(ENUM_DEF, r"(?i)^[ ]*enum[, ]+");
pattern!(GENERIC_PRO, r"(?i)^[ ]*generic(?:[ ]*,[ ]*(private|public))?[ ]*::");
pattern!(GEN_ASSIGN, r"(?i)^(assignment|operator)[ ]*\(");

// Block constructs
pattern!(BLOCK, r"(?i)^[ ]*(?:([a-z_][a-z0-9_]*)[ ]*:[ ]*)?block(?:[ ]|$)");
pattern!(DO, r"(?i)^[ ]*(?:[a-z_][a-z0-9_]*[ ]*:[ ]*)?do([ ]+[0-9]*|$)");
pattern!(WHERE, r"(?i)^[ ]*where[ ]*\(");
pattern!(IF, r"(?i)^[ ]*(?:[a-z_][a-z0-9_]*[ ]*:[ ]*)?if[ ]*\(");
pattern!(THEN, r"(?i)\)[ ]*then[ ]*$");
pattern!(ASSOCIATE, r"(?i)^[ ]*associate[ ]*\(");
pattern!(
    SELECT,
    r"(?i)^[ ]*(?:[a-z_][a-z0-9_]*[ ]*:[ ]*)?select[ ]*(case|type)[ ]*\(([ ]*[a-z0-9_=> ]*)"
);
pattern!(SELECT_TYPE, r"(?i)^[ ]*(type|class)[ ]+is[ ]*\(([ ]*[a-z0-9_ ]*)");
pattern!(SELECT_DEFAULT, r"(?i)^[ ]*class[ ]+default");

// Simple statements
pattern!(
    USE,
    r"(?i)^[ ]*use(?:[, ]+(?:intrinsic|non_intrinsic))?[ :]+([a-z0-9_]*)([, ]+only[ :]+)?"
);
pattern!(IMPORT, r"(?i)^[ ]*import[ :]+");
pattern!(INCLUDE, r#"(?i)^[ ]*include[ :]*['"]([^'"]*)"#);
pattern!(VIS, r"(?i)^[ ]*(public|private)\b");
pattern!(IMPLICIT, r"(?i)^[ ]*implicit[ ]+([a-z]+)");
pattern!(CONTAINS, r"(?i)^[ ]*(contains)[ ]*$");
pattern!(
    END_WORD,
    r"(?i)^[ ]*end(?:[ ]*(do|where|if|block|associate|select|type|enum|module|submodule|program|interface|subroutine|function|procedure))?(?:[ ]+([a-z0-9_][^!;]*?))?[ ]*$"
);
pattern!(NON_DEF, r"(?i)^[ ]*(call[ ]+[a-z_]|[a-z_][a-z0-9_%]*[ ]*=)");
pattern!(WORD, r"(?i)[a-z_][a-z0-9_]*");
pattern!(LINE_LABEL, r"^[ ]*([0-9]+)[ ]+");

// Source form
pattern!(FIXED_COMMENT_LINE, r"(?i)^[!cd*]");
pattern!(FIXED_CONT, r"^ {5}[^ 0]");
pattern!(FIXED_DOC, r"(?i)^[!c*]([<>!])");
pattern!(FIXED_OPENMP, r"(?i)^[!c*]\$omp");
pattern!(FREE_COMMENT_LINE, r"^[ ]*!");
pattern!(FREE_CONT, r"^[ ]*&");
pattern!(FREE_DOC, r"^[ ]*!([<>!])");
pattern!(FREE_OPENMP, r"(?i)^[ ]*!\$omp");
pattern!(FREE_FORMAT_TEST, r"(?i)^[ ]{1,4}[a-z]");

// Preprocessor
pattern!(PP_ANY, r"^#:?[a-zA-Z]+");
pattern!(PP_COND, r"^#(if |ifdef|ifndef|elif|else|endif)");
pattern!(PP_DEF, r"^#(define|undef)[ ]*([a-zA-Z0-9_]+)");
pattern!(PP_INCLUDE, r#"^#include[ ]*([\w"./]*)"#);
pattern!(DEFINED, r"defined[ ]*\(?[ ]*([a-zA-Z_][a-zA-Z0-9_]*)[ ]*\)?");

// Completion-context classification
pattern!(SCOPE_DEF, r"(?i)^[ ]*(module|program|subroutine|function|interface)[ ]+");
pattern!(CALL, r"(?i)^[ ]*call[ ]+[a-z0-9_%]*$");
pattern!(INT_STMNT, r"(?i)^[ ]*[a-z]*$");
pattern!(TYPE_STMNT, r"(?i)^[ ]*(type|class)[ ]*(is)?[ ]*$");
pattern!(PROCEDURE_STMNT, r"(?i)^[ ]*(procedure)[ ]*$");
pattern!(PRO_LINK, r"(?i)^[ ]*module[ ]*procedure[ ]+");
