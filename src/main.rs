use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser as ClapParser, ValueEnum};

use pyscope::analyzer::analyze;
use pyscope::diagnostics::DiagnosticSink;
use pyscope::parser::Parser;
use pyscope::report::{self, AnalysisReport};
use pyscope::symtab::SymbolTable;
use pyscope::tokenizer::Tokenizer;

#[derive(Debug, ClapParser)]
#[command(
    name = "pyscope",
    about = "Analyzes a Python-subset source file: tokens, symbols, and diagnostics.",
    version
)]
struct Args {
    /// Path to the Python-subset script to analyze.
    script: PathBuf,

    /// Print the lexeme/token table.
    #[arg(long)]
    tokens: bool,

    /// Pretty-print the parsed AST after syntax analysis.
    #[arg(long)]
    print_ast: bool,

    /// Output format for the analysis report.
    #[arg(long, value_enum, default_value = "text")]
    format: Format,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();
    let source = fs::read_to_string(&args.script)
        .with_context(|| format!("failed to read {}", args.script.display()))?;

    let mut sink = DiagnosticSink::new();
    let mut tokenizer = Tokenizer::new(&source);
    let tokens = tokenizer.tokenize(&mut sink);

    // Lexical errors poison everything downstream; report and stop here.
    if sink.has_errors() {
        match args.format {
            Format::Text => {
                if args.tokens {
                    println!("{}", report::render_token_table(&tokens));
                }
                print_diagnostics(&sink);
                eprintln!("Lexical errors found. Cannot proceed to parsing.");
            }
            Format::Json => {
                let token_rows = args.tokens.then(|| report::token_rows(&tokens));
                let analysis = AnalysisReport::new(&SymbolTable::new(), &sink, token_rows);
                println!("{}", serde_json::to_string_pretty(&analysis)?);
            }
        }
        return Ok(ExitCode::FAILURE);
    }

    let mut parser = Parser::new(tokens.clone());
    let program = parser.parse(&mut sink);

    if args.print_ast {
        println!("{:#?}", program);
    }

    let table = analyze(&program, &mut sink);

    match args.format {
        Format::Text => {
            if args.tokens {
                println!("{}", report::render_token_table(&tokens));
                println!();
            }
            println!("{}", report::render_symbol_table(&table));
            print_diagnostics(&sink);
            if sink.has_errors() {
                eprintln!("Analysis completed with errors.");
            } else {
                println!("Analysis completed successfully.");
            }
        }
        Format::Json => {
            let token_rows = args.tokens.then(|| report::token_rows(&tokens));
            let analysis = AnalysisReport::new(&table, &sink, token_rows);
            println!("{}", serde_json::to_string_pretty(&analysis)?);
        }
    }

    Ok(if sink.has_errors() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn print_diagnostics(sink: &DiagnosticSink) {
    for diagnostic in sink.diagnostics() {
        eprintln!("{}", diagnostic);
    }
}
