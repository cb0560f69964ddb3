use serde::Serialize;

use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::symtab::SymbolTable;
use crate::tokenizer::Token;

/// One row of the lexeme/token table.
#[derive(Debug, Clone, Serialize)]
pub struct TokenRow {
    pub lexeme: String,
    pub kind: &'static str,
    pub line: usize,
    pub column: usize,
}

/// One row of the symbol table report.
#[derive(Debug, Clone, Serialize)]
pub struct SymbolRow {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
    pub value: Option<String>,
    pub declared_line: usize,
    pub usage_lines: Vec<usize>,
}

/// Serializable analysis result for tool consumers.
#[derive(Debug, Serialize)]
pub struct AnalysisReport {
    pub symbols: Vec<SymbolRow>,
    pub diagnostics: Vec<Diagnostic>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens: Option<Vec<TokenRow>>,
}

impl AnalysisReport {
    pub fn new(table: &SymbolTable, sink: &DiagnosticSink, tokens: Option<Vec<TokenRow>>) -> Self {
        Self {
            symbols: symbol_rows(table),
            diagnostics: sink.diagnostics().to_vec(),
            tokens,
        }
    }
}

/// Layout tokens carry no lexeme and are omitted from the table.
pub fn token_rows(tokens: &[Token]) -> Vec<TokenRow> {
    tokens
        .iter()
        .filter(|token| !token.kind.is_layout())
        .map(|token| TokenRow {
            lexeme: token.kind.lexeme(),
            kind: token.kind.label(),
            line: token.position.line,
            column: token.position.column,
        })
        .collect()
}

pub fn symbol_rows(table: &SymbolTable) -> Vec<SymbolRow> {
    table
        .entries()
        .iter()
        .map(|entry| SymbolRow {
            name: entry.name.clone(),
            data_type: entry.data_type.to_string(),
            value: entry.value.as_ref().map(|value| value.to_string()),
            declared_line: entry.declared_line,
            usage_lines: entry.usage_lines.clone(),
        })
        .collect()
}

pub fn render_token_table(tokens: &[Token]) -> String {
    let mut out = String::new();
    out.push_str("--- Lexemes and Tokens Table ---\n");
    out.push_str(&format!(
        "{:<24}{:<20}{:<8}{:<8}\n",
        "Lexeme", "Token Type", "Line", "Column"
    ));
    out.push_str(&"-".repeat(60));
    out.push('\n');

    for row in token_rows(tokens) {
        out.push_str(&format!(
            "{:<24}{:<20}{:<8}{:<8}\n",
            row.lexeme, row.kind, row.line, row.column
        ));
    }
    out.push_str(&"-".repeat(60));
    out
}

pub fn render_symbol_table(table: &SymbolTable) -> String {
    let mut out = String::new();
    out.push_str("--- Symbol Table ---\n");
    out.push_str(&format!(
        "{:<18}{:<10}{:<26}{:<12}{}\n",
        "Name", "Type", "Value", "Decl. Line", "Usage Lines"
    ));
    out.push_str(&"-".repeat(85));
    out.push('\n');

    for entry in table.entries() {
        let value = entry
            .value
            .as_ref()
            .map(|value| value.to_string())
            .unwrap_or_default();
        let usage = entry
            .usage_lines
            .iter()
            .map(|line| line.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        out.push_str(&format!(
            "{:<18}{:<10}{:<26}{:<12}{}\n",
            entry.name,
            entry.data_type.to_string(),
            value,
            entry.declared_line,
            usage
        ));
    }
    out.push_str(&"-".repeat(85));
    out
}
