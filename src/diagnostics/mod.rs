use std::fmt;

use serde::Serialize;

use crate::tokenizer::Position;

/// Pipeline stage a diagnostic originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Stage {
    Lexical,
    Syntax,
    Semantic,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Lexical => "Lexical",
            Stage::Syntax => "Syntax",
            Stage::Semantic => "Semantic",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Severity {
    Error,
    Warning,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Error => "Error",
            Severity::Warning => "Warning",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub stage: Stage,
    pub severity: Severity,
    pub message: String,
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} at Line {}, Column {}: {}",
            self.stage.as_str(),
            self.severity.as_str(),
            self.line,
            self.column,
            self.message
        )
    }
}

/// Collects diagnostics across the tokenize/parse/analyze pipeline.
///
/// Warnings never fail an analysis; `has_errors` reflects only
/// Error-severity entries.
#[derive(Debug, Default)]
pub struct DiagnosticSink {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticSink {
    pub fn new() -> Self {
        Self {
            diagnostics: Vec::new(),
        }
    }

    pub fn error(&mut self, stage: Stage, message: impl Into<String>, position: &Position) {
        self.diagnostics.push(Diagnostic {
            stage,
            severity: Severity::Error,
            message: message.into(),
            line: position.line,
            column: position.column,
        });
    }

    pub fn warning(&mut self, stage: Stage, message: impl Into<String>, position: &Position) {
        self.diagnostics.push(Diagnostic {
            stage,
            severity: Severity::Warning,
            message: message.into(),
            line: position.line,
            column: position.column,
        });
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|diagnostic| diagnostic.severity == Severity::Error)
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn clear(&mut self) {
        self.diagnostics.clear();
    }
}
