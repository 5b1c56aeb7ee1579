//! Preprocessor behaviour through the full parse pipeline.

use std::collections::HashMap;
use std::fs;

use fortran_analyzer::{process_file, ParseConfig, SourceFile};

fn init_logs() {
    let _ = simple_logger::SimpleLogger::new()
        .with_level(log::LevelFilter::Debug)
        .init();
}

fn parse_pp(text: &str, config: &ParseConfig) -> (SourceFile, fortran_analyzer::Ast) {
    // An uppercase extension turns the preprocessor on.
    let mut file = SourceFile::from_contents("/tmp/pp_test.F90", text, &[]);
    let ast = process_file(&mut file, config);
    (file, ast)
}

#[test]
fn test_macro_expansion_in_declaration() {
    init_logs();
    let (file, ast) = parse_pp(
        "#define N 4\ninteger, dimension(N) :: v\n",
        &ParseConfig::default(),
    );
    let var = &ast.root().variables[0];
    assert_eq!(var.name, "v");
    assert_eq!(var.desc, "INTEGER");
    assert!(var
        .keyword_strs
        .iter()
        .any(|keyword| keyword.eq_ignore_ascii_case("dimension(4)")));
    assert_eq!(file.contents_pp[1], "integer, dimension(4) :: v");
}

#[test]
fn test_ifdef_exclusion() {
    let (file, ast) = parse_pp(
        "#ifdef FOO\ninteger :: x\n#else\ninteger :: y\n#endif\n",
        &ParseConfig::default(),
    );
    assert_eq!(ast.pp_skips, vec![(2, 2)]);
    let names: Vec<&str> = ast
        .root()
        .variables
        .iter()
        .map(|var| var.name.as_str())
        .collect();
    assert_eq!(names, vec!["y"]);
    // Excluded lines are blanked in the preprocessed buffer but the line
    // count is preserved.
    assert_eq!(file.contents_pp.len(), file.contents_split.len());
    assert_eq!(file.contents_pp[1], "");
}

#[test]
fn test_caller_supplied_defines() {
    let mut pp_defs = HashMap::new();
    pp_defs.insert("FOO".to_string(), "True".to_string());
    let config = ParseConfig {
        pp_defs,
        ..ParseConfig::default()
    };
    let (_, ast) = parse_pp(
        "#ifdef FOO\ninteger :: x\n#else\ninteger :: y\n#endif\n",
        &config,
    );
    let names: Vec<&str> = ast
        .root()
        .variables
        .iter()
        .map(|var| var.name.as_str())
        .collect();
    assert_eq!(names, vec!["x"]);
}

#[test]
fn test_guard_roundtrip() {
    // #if 1 around a body parses identically to the unguarded body.
    let guarded = parse_pp("#if 1\ninteger :: a\nreal :: b\n#endif\n", &ParseConfig::default()).1;
    let plain = {
        let mut file = SourceFile::from_contents("/tmp/plain.f90", "integer :: a\nreal :: b\n", &[]);
        process_file(&mut file, &ParseConfig::default())
    };
    let guarded_vars: Vec<_> = guarded
        .root()
        .variables
        .iter()
        .map(|var| (var.name.clone(), var.desc.clone()))
        .collect();
    let plain_vars: Vec<_> = plain
        .root()
        .variables
        .iter()
        .map(|var| (var.name.clone(), var.desc.clone()))
        .collect();
    assert_eq!(guarded_vars, plain_vars);

    // #if 0 parses identically to deleting the body.
    let excluded = parse_pp("#if 0\ninteger :: a\nreal :: b\n#endif\n", &ParseConfig::default()).1;
    assert!(excluded.root().variables.is_empty());
}

#[test]
fn test_if_expression_with_comparison() {
    let text = "#define VERSION 7\n#if VERSION > 5\ninteger :: modern\n#else\ninteger :: legacy\n#endif\n";
    let (_, ast) = parse_pp(text, &ParseConfig::default());
    let names: Vec<&str> = ast
        .root()
        .variables
        .iter()
        .map(|var| var.name.as_str())
        .collect();
    assert_eq!(names, vec!["modern"]);
}

#[test]
fn test_pp_disabled_for_lowercase_extension() {
    let mut file = SourceFile::from_contents(
        "/tmp/plain.f90",
        "#ifdef FOO\ninteger :: x\n#endif\n",
        &[],
    );
    assert!(!file.preproc);
    let ast = process_file(&mut file, &ParseConfig::default());
    // Without preprocessing the directives are inert and the body parses.
    assert!(ast.pp_skips.is_empty());
    assert_eq!(ast.root().variables.len(), 1);
}

#[test]
fn test_pp_suffix_configuration() {
    let config = ParseConfig {
        pp_suffixes: vec![".fpp".to_string()],
        ..ParseConfig::default()
    };
    let mut file = SourceFile::from_contents(
        "/tmp/conf.fpp",
        "#ifdef MISSING\ninteger :: x\n#endif\n",
        &config.pp_suffixes,
    );
    assert!(file.preproc);
    let ast = process_file(&mut file, &config);
    assert_eq!(ast.pp_skips, vec![(2, 2)]);
    assert!(ast.root().variables.is_empty());
}

#[test]
fn test_include_resolution() {
    let dir = tempfile::tempdir().unwrap();
    let header = dir.path().join("params.h");
    fs::write(&header, "#define ROWS 3\n#define COLS 5\n").unwrap();
    let source = dir.path().join("grid.F90");
    fs::write(
        &source,
        "#include \"params.h\"\ninteger, dimension(ROWS, COLS) :: grid\n",
    )
    .unwrap();

    let mut file = SourceFile::new(&source, &[]);
    file.load_from_disk().unwrap();
    let ast = process_file(&mut file, &ParseConfig::default());
    let var = &ast.root().variables[0];
    assert_eq!(var.name, "grid");
    assert!(var
        .keyword_strs
        .iter()
        .any(|keyword| keyword.eq_ignore_ascii_case("dimension(3, 5)")));
}

#[test]
fn test_include_dirs_are_ordered() {
    let first = tempfile::tempdir().unwrap();
    let second = tempfile::tempdir().unwrap();
    fs::write(first.path().join("tune.h"), "#define LIMIT 1\n").unwrap();
    fs::write(second.path().join("tune.h"), "#define LIMIT 2\n").unwrap();

    let work = tempfile::tempdir().unwrap();
    let source = work.path().join("main.F90");
    fs::write(&source, "#include \"tune.h\"\ninteger :: v(LIMIT)\n").unwrap();

    let config = ParseConfig {
        include_dirs: vec![first.path().to_path_buf(), second.path().to_path_buf()],
        ..ParseConfig::default()
    };
    let mut file = SourceFile::new(&source, &[]);
    file.load_from_disk().unwrap();
    process_file(&mut file, &config);
    // First match wins.
    assert_eq!(file.contents_pp[1], "integer :: v(1)");
}

#[test]
fn test_missing_include_is_ignored() {
    let (_, ast) = parse_pp(
        "#include \"no_such_file.h\"\ninteger :: x\n",
        &ParseConfig::default(),
    );
    assert_eq!(ast.root().variables.len(), 1);
}

#[test]
fn test_include_cycle_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("a.h");
    let b = dir.path().join("b.h");
    fs::write(&a, "#include \"b.h\"\n#define FROM_A 1\n").unwrap();
    fs::write(&b, "#include \"a.h\"\n#define FROM_B 1\n").unwrap();
    let source = dir.path().join("main.F90");
    fs::write(&source, "#include \"a.h\"\ninteger :: x(FROM_A + FROM_B)\n").unwrap();

    let mut file = SourceFile::new(&source, &[]);
    file.load_from_disk().unwrap();
    // Termination is the property under test.
    process_file(&mut file, &ParseConfig::default());
    assert_eq!(file.contents_pp[1], "integer :: x(1 + 1)");
}

#[test]
fn test_defines_suppressed_from_parse() {
    let (_, ast) = parse_pp("#define integer_decoy\ninteger :: x\n", &ParseConfig::default());
    // The define line itself never reaches the recognizers.
    assert_eq!(ast.root().variables.len(), 1);
    assert_eq!(ast.root().variables[0].name, "x");
}
