//! Error recovery on hostile input: parsing always terminates, keeps what it
//! can, and reports a number of errors bounded by the input size.

use genesis_diagnostics::DiagnosticCode;
use genesis_parser::{
    parse_manifest_source, parse_source, parse_source_with, tokenize, LexMode, ParseOptions,
};

const FRAGMENTS: &[&str] = &[
    "function", "{", "}", "[", "]", ":", ",", "\n", "@", "@x", "@question", "\"", "\"s\"",
    "as", "config", "build", "imports", "deployment", "42", "-1.5", "word", "#", "//",
    "\u{1}", "true", "entrypoints", "dependencies", "{{", "}}",
];

/// Deterministic garbage: a linear congruential generator picking fragments.
fn garbage(seed: u64, len: usize) -> String {
    let mut state = seed;
    let mut out = String::new();
    for _ in 0..len {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        let pick = (state >> 33) as usize % FRAGMENTS.len();
        out.push_str(FRAGMENTS[pick]);
        out.push(' ');
    }
    out
}

#[test]
fn garbage_input_terminates_with_bounded_errors() {
    for seed in 0..50 {
        for len in [1, 10, 100, 500] {
            let src = garbage(seed, len);
            let (tokens, _) = tokenize(&src, LexMode::Tolerant);
            let options = ParseOptions {
                max_errors: 0,
                ..ParseOptions::default()
            };
            let program = parse_source_with(&src, &options);
            assert!(
                program.metadata.errors.len() <= 2 * tokens.len(),
                "seed {seed} len {len}: {} errors for {} tokens",
                program.metadata.errors.len(),
                tokens.len()
            );
            let manifest = parse_manifest_source(&src);
            assert!(manifest.metadata.errors.len() <= 2 * tokens.len() + 100);
        }
    }
}

#[test]
fn pure_closing_braces() {
    let src = "} ".repeat(1000);
    let options = ParseOptions {
        max_errors: 0,
        ..ParseOptions::default()
    };
    let program = parse_source_with(&src, &options);
    assert_eq!(program.metadata.errors.len(), 1000);
    assert!(program.declarations.is_empty());
}

#[test]
fn deeply_nested_unclosed_blocks() {
    let src = format!("config {}", "{ a: ".repeat(100_000));
    let manifest = parse_manifest_source(&src);
    let codes: Vec<_> = manifest.metadata.errors.iter().map(|e| e.code).collect();
    assert!(codes.contains(&DiagnosticCode::NESTING_TOO_DEEP));
    assert!(codes.contains(&DiagnosticCode::UNTERMINATED_BLOCK));
}

#[test]
fn error_cap_limits_recorded_errors() {
    let src = "] ".repeat(500);
    let program = parse_source(&src);
    assert!(program.metadata.error_limit_reached);
    assert_eq!(program.metadata.errors.len(), 101);
}

#[test]
fn bad_function_then_good_function_recovers() {
    let src = r#"
function bad {
  Start.
  @style : :
  ] stray
  Finish.
}

function { orphan body }

function good {
  Do the right thing.
}
"#;
    let program = parse_source(src);
    assert!(program.has_errors());
    let names: Vec<_> = program.functions().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["bad", "unknown", "good"]);
    assert!(program.function("bad").unwrap().metadata.has_errors);
    assert!(!program.function("good").unwrap().metadata.has_errors);
}

#[test]
fn errors_are_sorted_by_position() {
    let src = "] x\nfunction f {\n  :\n}\n}";
    let program = parse_source(src);
    let positions: Vec<_> = program
        .metadata
        .errors
        .iter()
        .map(|e| (e.line(), e.column()))
        .collect();
    let mut sorted = positions.clone();
    sorted.sort();
    assert_eq!(positions, sorted);
    assert!(positions.len() >= 3);
}

#[test]
fn partial_tree_survives_missing_name() {
    let program = parse_source("function { invalid syntax here }");
    assert!(!program.metadata.errors.is_empty());
    assert_eq!(program.functions().count(), 1);
    assert_eq!(program.functions().next().unwrap().name, "unknown");
}

#[test]
fn invalid_characters_are_reported_once_each() {
    let program = parse_source("function f {\n  \u{1}\n}\n\u{2}\n");
    let codes: Vec<_> = program.metadata.errors.iter().map(|e| e.code).collect();
    assert_eq!(
        codes,
        vec![DiagnosticCode::INVALID_CHARACTER, DiagnosticCode::INVALID_CHARACTER]
    );
    assert!(program.function("f").unwrap().metadata.has_errors);
}
