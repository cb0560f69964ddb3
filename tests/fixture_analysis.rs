use pyscope::analyzer::analyze;
use pyscope::diagnostics::{DiagnosticSink, Severity, Stage};
use pyscope::parser::Parser;
use pyscope::symtab::{DataType, SymbolTable, Value};
use pyscope::tokenizer::Tokenizer;

fn analyze_fixture() -> (SymbolTable, DiagnosticSink) {
    let source = include_str!("valid_python.py");
    let mut sink = DiagnosticSink::new();
    let mut tokenizer = Tokenizer::new(source);
    let tokens = tokenizer.tokenize(&mut sink);
    assert!(
        !sink.has_errors(),
        "fixture should lex cleanly: {:?}",
        sink.diagnostics()
    );
    let mut parser = Parser::new(tokens);
    let program = parser.parse(&mut sink);
    let table = analyze(&program, &mut sink);
    (table, sink)
}

fn folded(table: &SymbolTable, name: &str) -> Option<Value> {
    table
        .lookup(name)
        .unwrap_or_else(|| panic!("missing symbol {name}"))
        .value
        .clone()
}

#[test]
fn fixture_analyzes_without_errors() {
    let (_, sink) = analyze_fixture();
    assert!(
        !sink.has_errors(),
        "fixture should produce no errors: {:?}",
        sink.diagnostics()
    );
}

#[test]
fn fixture_arithmetic_results_fold() {
    let (table, _) = analyze_fixture();

    assert_eq!(folded(&table, "declared_int"), Some(Value::Int(10)));
    assert_eq!(folded(&table, "declared_float"), Some(Value::Float(20.5)));
    assert_eq!(folded(&table, "result_add"), Some(Value::Int(15)));
    assert_eq!(folded(&table, "result_sub"), Some(Value::Float(10.3)));
    assert_eq!(folded(&table, "result_mul"), Some(Value::Int(30)));
    assert_eq!(folded(&table, "result_div"), Some(Value::Float(5.15)));
    assert_eq!(folded(&table, "result_mod"), Some(Value::Int(2)));
    assert_eq!(folded(&table, "final_value"), Some(Value::Float(61.0)));
}

#[test]
fn fixture_inferred_types() {
    let (table, _) = analyze_fixture();

    let type_of = |name: &str| table.lookup(name).unwrap().data_type;
    assert_eq!(type_of("declared_int"), DataType::Int);
    assert_eq!(type_of("declared_float"), DataType::Float);
    assert_eq!(type_of("declared_string"), DataType::Str);
    assert_eq!(type_of("is_active"), DataType::Bool);
    assert_eq!(type_of("result_add"), DataType::Int);
    assert_eq!(type_of("result_sub"), DataType::Float);
    assert_eq!(type_of("result_div"), DataType::Float);
    assert_eq!(type_of("final_value"), DataType::Float);
    assert_eq!(type_of("user_name"), DataType::Str);
}

#[test]
fn fixture_conditions_fold_false() {
    // result_add (15) > 20 and result_sub (10.3) < 5 are both statically
    // false, so only the else suite can execute.
    let (_, sink) = analyze_fixture();

    let warnings: Vec<_> = sink
        .diagnostics()
        .iter()
        .filter(|diagnostic| diagnostic.severity == Severity::Warning)
        .collect();
    assert_eq!(warnings.len(), 2, "got {:?}", warnings);
    for warning in &warnings {
        assert_eq!(warning.stage, Stage::Semantic);
        assert_eq!(warning.message, "Condition is always false.");
    }
    assert_eq!(warnings[0].line, 15);
    assert_eq!(warnings[1].line, 17);
}

#[test]
fn fixture_loop_counter_is_variant() {
    let (table, sink) = analyze_fixture();

    let counter = table.lookup("counter").unwrap();
    assert_eq!(counter.data_type, DataType::Int);
    assert_eq!(counter.declared_line, 23);
    assert!(
        counter.value.is_none(),
        "loop-variant name must not keep a folded value"
    );

    // The while condition depends on the variant name, so no constant
    // condition warning fires for it.
    assert!(
        sink.diagnostics()
            .iter()
            .all(|diagnostic| diagnostic.line != 24),
        "got {:?}",
        sink.diagnostics()
    );
    assert!(counter.usage_lines.contains(&24));
    assert!(counter.usage_lines.contains(&26));
    assert!(counter.usage_lines.contains(&27));
}

#[test]
fn fixture_input_binding_is_str_without_value() {
    let (table, _) = analyze_fixture();

    let user_name = table.lookup("user_name").unwrap();
    assert_eq!(user_name.data_type, DataType::Str);
    assert!(user_name.value.is_none());
    assert_eq!(user_name.declared_line, 30);
    assert_eq!(user_name.usage_lines, vec![32]);
}

#[test]
fn fixture_declarations_keep_source_order() {
    let (table, _) = analyze_fixture();

    let names: Vec<&str> = table
        .entries()
        .iter()
        .map(|entry| entry.name.as_str())
        .collect();
    assert_eq!(
        names,
        vec![
            "declared_int",
            "declared_float",
            "declared_string",
            "is_active",
            "result_add",
            "result_sub",
            "result_mul",
            "result_div",
            "result_mod",
            "counter",
            "user_name",
            "final_value",
        ]
    );
}

#[test]
fn fixture_usage_lines_track_operand_reads() {
    let (table, _) = analyze_fixture();

    assert_eq!(
        table.lookup("declared_int").unwrap().usage_lines,
        vec![8, 35]
    );
    assert_eq!(
        table.lookup("declared_float").unwrap().usage_lines,
        vec![9, 35]
    );
    assert_eq!(
        table.lookup("result_add").unwrap().usage_lines,
        vec![10, 15]
    );
    assert_eq!(
        table.lookup("result_sub").unwrap().usage_lines,
        vec![11, 17]
    );
}
