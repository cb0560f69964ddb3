use pyscope::analyzer::analyze;
use pyscope::diagnostics::{DiagnosticSink, Severity, Stage};
use pyscope::parser::Parser;
use pyscope::symtab::SymbolTable;
use pyscope::tokenizer::Tokenizer;

fn run_pipeline(source: &str) -> (usize, SymbolTable, DiagnosticSink) {
    let mut sink = DiagnosticSink::new();
    let mut tokenizer = Tokenizer::new(source);
    let tokens = tokenizer.tokenize(&mut sink);
    let mut parser = Parser::new(tokens);
    let program = parser.parse(&mut sink);
    let table = analyze(&program, &mut sink);
    (program.statements.len(), table, sink)
}

#[test]
fn unterminated_string_is_reported_with_position() {
    let (_, _, sink) = run_pipeline("greeting = \"hello\nx = 1\n");

    let lexical: Vec<_> = sink
        .diagnostics()
        .iter()
        .filter(|diagnostic| diagnostic.stage == Stage::Lexical)
        .collect();
    assert_eq!(lexical.len(), 1);
    assert_eq!(lexical[0].message, "Unterminated string literal.");
    assert_eq!(lexical[0].line, 1);
    assert_eq!(lexical[0].column, 12);
}

#[test]
fn lexing_continues_past_an_unknown_character() {
    let (_, table, sink) = run_pipeline("a = 1\nb = 2 @ 3\nc = 4\n");

    assert!(sink.has_errors());
    assert!(
        sink.diagnostics()
            .iter()
            .any(|diagnostic| diagnostic.message == "Unexpected character: '@'")
    );
    // Statements before and after the bad line still reach the symbol table.
    assert!(table.lookup("a").is_some());
    assert!(table.lookup("c").is_some());
}

#[test]
fn missing_colon_yields_one_syntax_error_and_parsing_resumes() {
    let source = "x = 1\nif x > 0\n    print(x)\ny = 2\n";
    let (count, table, sink) = run_pipeline(source);

    let syntax: Vec<_> = sink
        .diagnostics()
        .iter()
        .filter(|diagnostic| diagnostic.stage == Stage::Syntax)
        .collect();
    assert_eq!(syntax.len(), 1, "got {:?}", syntax);
    assert!(syntax[0].message.contains("':' after condition"));

    // The assignment after the malformed conditional still parses.
    assert!(table.lookup("y").is_some());
    assert!(count >= 2);
}

#[test]
fn else_without_colon_is_a_syntax_error() {
    let (_, _, sink) = run_pipeline("x = 1\nif x > 0:\n    print(x)\nelse\n    print(x)\n");

    assert!(sink.has_errors());
    assert!(
        sink.diagnostics()
            .iter()
            .any(|diagnostic| diagnostic.message.contains("':' after 'else'"))
    );
}

#[test]
fn undeclared_identifier_is_a_semantic_error() {
    let (_, _, sink) = run_pipeline("total = amount + 1\n");

    let semantic: Vec<_> = sink
        .diagnostics()
        .iter()
        .filter(|diagnostic| diagnostic.stage == Stage::Semantic)
        .collect();
    assert_eq!(semantic.len(), 1);
    assert_eq!(semantic[0].severity, Severity::Error);
    assert_eq!(semantic[0].message, "Undeclared identifier: amount");
}

#[test]
fn each_malformed_statement_yields_one_diagnostic() {
    let source = "a = )\nb = 1\nc = )\nd = 2\n";
    let (_, table, sink) = run_pipeline(source);

    let syntax_count = sink
        .diagnostics()
        .iter()
        .filter(|diagnostic| diagnostic.stage == Stage::Syntax)
        .count();
    assert_eq!(syntax_count, 2, "got {:?}", sink.diagnostics());
    assert!(table.lookup("b").is_some());
    assert!(table.lookup("d").is_some());
}

#[test]
fn eof_inside_a_suite_is_reported() {
    let (_, _, sink) = run_pipeline("while x < 3:");

    assert!(sink.has_errors());
    assert!(
        sink.diagnostics()
            .iter()
            .any(|diagnostic| diagnostic.stage == Stage::Syntax)
    );
}

#[test]
fn warnings_alone_do_not_fail_the_analysis() {
    let (_, table, sink) = run_pipeline("x = 1 / 0\nif True:\n    print(x)\n");

    assert!(!sink.has_errors());
    let warnings = sink
        .diagnostics()
        .iter()
        .filter(|diagnostic| diagnostic.severity == Severity::Warning)
        .count();
    assert_eq!(warnings, 2, "got {:?}", sink.diagnostics());
    assert!(table.lookup("x").unwrap().value.is_none());
}
