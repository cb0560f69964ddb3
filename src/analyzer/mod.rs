//=====================================================
// File: analyzer.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Semantic analysis for the Python subset AST
// Objective: Populate the symbol table, infer binding types, fold constant
//            expressions, and lint statically-known conditions
//=====================================================

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

use crate::ast::{BinaryOp, Expr, Literal, Program, Stmt, UnaryOp};
use crate::diagnostics::{DiagnosticSink, Stage};
use crate::symtab::{DataType, SymbolTable, Value};
use crate::tokenizer::Position;

/// Run semantic analysis over a parsed program and build its symbol table.
pub fn analyze(program: &Program, sink: &mut DiagnosticSink) -> SymbolTable {
    let mut analyzer = Analyzer::new(sink);
    analyzer.analyze_statements(&program.statements);
    analyzer.table
}

struct Analyzer<'a> {
    table: SymbolTable,
    constants: HashMap<String, Value>,
    sink: &'a mut DiagnosticSink,
}

impl<'a> Analyzer<'a> {
    fn new(sink: &'a mut DiagnosticSink) -> Self {
        Self {
            table: SymbolTable::new(),
            constants: HashMap::new(),
            sink,
        }
    }

    fn analyze_statements(&mut self, statements: &[Stmt]) {
        for stmt in statements {
            self.analyze_stmt(stmt);
        }
    }

    fn analyze_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Assign {
                name,
                name_position,
                value,
                ..
            } => {
                // The target is declared before the right-hand side is read,
                // so a first assignment may reference its own name without an
                // undeclared-identifier report.
                if !self
                    .table
                    .insert(name, DataType::Dynamic, name_position.line)
                {
                    self.table.record_usage(name, name_position.line);
                }
                self.analyze_expr(value);

                let inferred = self.infer_type(value);
                self.table.update_type(name, inferred);

                match self.fold_expr(value) {
                    Some(folded) => {
                        self.table.set_value(name, folded.clone());
                        self.constants.insert(name.clone(), folded);
                    }
                    None => {
                        self.table.clear_value(name);
                        self.constants.remove(name);
                    }
                }
            }
            Stmt::Expression { expr, .. } | Stmt::Print { expr, .. } => {
                self.analyze_expr(expr);
            }
            Stmt::Input { .. } => {}
            Stmt::If {
                arms, else_body, ..
            } => {
                let snapshot = self.constants.clone();
                let mut assigned = BTreeSet::new();

                for arm in arms {
                    self.constants = snapshot.clone();
                    self.analyze_expr(&arm.condition);
                    self.check_constant_condition(&arm.condition);
                    self.analyze_statements(&arm.body);
                    collect_assigned(&arm.body, &mut assigned);
                }
                if let Some(body) = else_body {
                    self.constants = snapshot.clone();
                    self.analyze_statements(body);
                    collect_assigned(body, &mut assigned);
                }

                // Which arm runs is a runtime question, so any name assigned
                // in one of them is no longer statically known afterwards.
                self.constants = snapshot;
                self.invalidate(&assigned);
            }
            Stmt::While {
                condition, body, ..
            } => {
                let mut assigned = BTreeSet::new();
                collect_assigned(body, &mut assigned);

                // Names mutated by the loop are variant across iterations;
                // dropping them first keeps the condition honest.
                self.invalidate(&assigned);
                self.analyze_expr(condition);
                self.check_constant_condition(condition);
                self.analyze_statements(body);
                self.invalidate(&assigned);
            }
            Stmt::For {
                variable,
                variable_position,
                iterable,
                body,
                ..
            } => {
                self.analyze_expr(iterable);
                if !self
                    .table
                    .insert(variable, DataType::Dynamic, variable_position.line)
                {
                    self.table.record_usage(variable, variable_position.line);
                    self.table.update_type(variable, DataType::Dynamic);
                }

                let mut assigned = BTreeSet::new();
                assigned.insert(variable.clone());
                collect_assigned(body, &mut assigned);

                self.invalidate(&assigned);
                self.analyze_statements(body);
                self.invalidate(&assigned);
            }
        }
    }

    fn analyze_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Identifier { name, position } => {
                if self.table.lookup(name).is_some() {
                    self.table.record_usage(name, position.line);
                } else {
                    self.sink.error(
                        Stage::Semantic,
                        format!("Undeclared identifier: {}", name),
                        position,
                    );
                }
            }
            Expr::Binary { left, right, .. } => {
                self.analyze_expr(left);
                self.analyze_expr(right);
            }
            Expr::Unary { operand, .. } => self.analyze_expr(operand),
            Expr::Literal { .. } | Expr::Input { .. } => {}
        }
    }

    fn check_constant_condition(&mut self, condition: &Expr) {
        if let Some(value) = self.fold_expr(condition) {
            let outcome = if value.is_truthy() { "true" } else { "false" };
            self.sink.warning(
                Stage::Semantic,
                format!("Condition is always {}.", outcome),
                condition.position(),
            );
        }
    }

    fn invalidate(&mut self, names: &BTreeSet<String>) {
        for name in names {
            self.constants.remove(name);
            self.table.clear_value(name);
        }
    }

    //=====================================================
    // Type inference
    //=====================================================

    fn infer_type(&self, expr: &Expr) -> DataType {
        match expr {
            Expr::Literal { value, .. } => match value {
                Literal::Integer(_) => DataType::Int,
                Literal::Float(_) => DataType::Float,
                Literal::Str(_) => DataType::Str,
                Literal::Boolean(_) => DataType::Bool,
            },
            Expr::Identifier { name, .. } => self
                .table
                .lookup(name)
                .map(|entry| entry.data_type)
                .unwrap_or(DataType::Dynamic),
            Expr::Input { .. } => DataType::Str,
            Expr::Unary {
                operator, operand, ..
            } => match operator {
                UnaryOp::Not => DataType::Bool,
                UnaryOp::Plus | UnaryOp::Minus => match self.infer_type(operand) {
                    DataType::Int => DataType::Int,
                    DataType::Float => DataType::Float,
                    _ => DataType::Dynamic,
                },
            },
            Expr::Binary {
                left,
                operator,
                right,
                ..
            } => {
                use BinaryOp::*;
                match operator {
                    Equal | NotEqual | Less | LessEqual | Greater | GreaterEqual | And | Or => {
                        DataType::Bool
                    }
                    Divide => {
                        let lhs = self.infer_type(left);
                        let rhs = self.infer_type(right);
                        if is_numeric(lhs) && is_numeric(rhs) {
                            DataType::Float
                        } else {
                            DataType::Dynamic
                        }
                    }
                    Add => match (self.infer_type(left), self.infer_type(right)) {
                        (DataType::Int, DataType::Int) => DataType::Int,
                        (DataType::Str, DataType::Str) => DataType::Str,
                        (lhs, rhs) if is_numeric(lhs) && is_numeric(rhs) => DataType::Float,
                        _ => DataType::Dynamic,
                    },
                    Subtract | Multiply | Modulo => {
                        match (self.infer_type(left), self.infer_type(right)) {
                            (DataType::Int, DataType::Int) => DataType::Int,
                            (lhs, rhs) if is_numeric(lhs) && is_numeric(rhs) => DataType::Float,
                            _ => DataType::Dynamic,
                        }
                    }
                }
            }
        }
    }

    //=====================================================
    // Constant folding
    //=====================================================

    fn fold_expr(&mut self, expr: &Expr) -> Option<Value> {
        match expr {
            Expr::Literal { value, .. } => Some(match value {
                Literal::Integer(v) => Value::Int(*v),
                Literal::Float(v) => Value::Float(*v),
                Literal::Str(v) => Value::Str(v.clone()),
                Literal::Boolean(v) => Value::Bool(*v),
            }),
            Expr::Identifier { name, .. } => self.constants.get(name).cloned(),
            Expr::Input { .. } => None,
            Expr::Unary {
                operator, operand, ..
            } => {
                let value = self.fold_expr(operand)?;
                match operator {
                    UnaryOp::Plus => match value {
                        Value::Int(_) | Value::Float(_) => Some(value),
                        _ => None,
                    },
                    UnaryOp::Minus => match value {
                        Value::Int(v) => v.checked_neg().map(Value::Int),
                        Value::Float(v) => Some(Value::Float(-v)),
                        _ => None,
                    },
                    UnaryOp::Not => match value {
                        Value::Bool(v) => Some(Value::Bool(!v)),
                        _ => None,
                    },
                }
            }
            Expr::Binary {
                left,
                operator,
                right,
                position,
            } => {
                let lhs = self.fold_expr(left)?;
                let rhs = self.fold_expr(right)?;
                self.fold_binary(*operator, lhs, rhs, position)
            }
        }
    }

    fn fold_binary(
        &mut self,
        operator: BinaryOp,
        lhs: Value,
        rhs: Value,
        position: &Position,
    ) -> Option<Value> {
        use BinaryOp::*;
        match operator {
            Add => match (lhs, rhs) {
                (Value::Int(a), Value::Int(b)) => a.checked_add(b).map(Value::Int),
                (Value::Str(a), Value::Str(b)) => Some(Value::Str(format!("{}{}", a, b))),
                (lhs, rhs) => {
                    let (a, b) = numeric_pair(&lhs, &rhs)?;
                    Some(Value::Float(a + b))
                }
            },
            Subtract => match (lhs, rhs) {
                (Value::Int(a), Value::Int(b)) => a.checked_sub(b).map(Value::Int),
                (lhs, rhs) => {
                    let (a, b) = numeric_pair(&lhs, &rhs)?;
                    Some(Value::Float(a - b))
                }
            },
            Multiply => match (lhs, rhs) {
                (Value::Int(a), Value::Int(b)) => a.checked_mul(b).map(Value::Int),
                (lhs, rhs) => {
                    let (a, b) = numeric_pair(&lhs, &rhs)?;
                    Some(Value::Float(a * b))
                }
            },
            Divide => {
                // '/' always produces a float, as in the analyzed language.
                let (a, b) = numeric_pair(&lhs, &rhs)?;
                if b == 0.0 {
                    self.sink.warning(
                        Stage::Semantic,
                        "Division by zero in constant expression.",
                        position,
                    );
                    return None;
                }
                Some(Value::Float(a / b))
            }
            Modulo => match (lhs, rhs) {
                (Value::Int(a), Value::Int(b)) => {
                    if b == 0 {
                        self.sink.warning(
                            Stage::Semantic,
                            "Modulo by zero in constant expression.",
                            position,
                        );
                        return None;
                    }
                    let r = a.checked_rem(b)?;
                    // Result takes the sign of the divisor.
                    let m = if r != 0 && (r < 0) != (b < 0) { r + b } else { r };
                    Some(Value::Int(m))
                }
                (lhs, rhs) => {
                    let (a, b) = numeric_pair(&lhs, &rhs)?;
                    if b == 0.0 {
                        self.sink.warning(
                            Stage::Semantic,
                            "Modulo by zero in constant expression.",
                            position,
                        );
                        return None;
                    }
                    Some(Value::Float(a - b * (a / b).floor()))
                }
            },
            Equal => values_equal(&lhs, &rhs).map(Value::Bool),
            NotEqual => values_equal(&lhs, &rhs).map(|equal| Value::Bool(!equal)),
            Less | LessEqual | Greater | GreaterEqual => {
                let ordering = compare_values(&lhs, &rhs)?;
                let keep = match operator {
                    Less => ordering == Ordering::Less,
                    LessEqual => ordering != Ordering::Greater,
                    Greater => ordering == Ordering::Greater,
                    GreaterEqual => ordering != Ordering::Less,
                    _ => return None,
                };
                Some(Value::Bool(keep))
            }
            And => match (lhs, rhs) {
                (Value::Bool(a), Value::Bool(b)) => Some(Value::Bool(a && b)),
                _ => None,
            },
            Or => match (lhs, rhs) {
                (Value::Bool(a), Value::Bool(b)) => Some(Value::Bool(a || b)),
                _ => None,
            },
        }
    }
}

fn is_numeric(data_type: DataType) -> bool {
    matches!(data_type, DataType::Int | DataType::Float)
}

fn as_float(value: &Value) -> Option<f64> {
    match value {
        Value::Int(v) => Some(*v as f64),
        Value::Float(v) => Some(*v),
        _ => None,
    }
}

fn numeric_pair(lhs: &Value, rhs: &Value) -> Option<(f64, f64)> {
    Some((as_float(lhs)?, as_float(rhs)?))
}

fn values_equal(lhs: &Value, rhs: &Value) -> Option<bool> {
    match (lhs, rhs) {
        (Value::Int(a), Value::Int(b)) => Some(a == b),
        (Value::Str(a), Value::Str(b)) => Some(a == b),
        (Value::Bool(a), Value::Bool(b)) => Some(a == b),
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
            Some(as_float(lhs)? == as_float(rhs)?)
        }
        // Values of different types never compare equal.
        _ => Some(false),
    }
}

fn compare_values(lhs: &Value, rhs: &Value) -> Option<Ordering> {
    match (lhs, rhs) {
        (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
        (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
            as_float(lhs)?.partial_cmp(&as_float(rhs)?)
        }
        _ => None,
    }
}

/// Collect every name assigned anywhere in the given statements, including
/// nested suites and loop variables.
fn collect_assigned(statements: &[Stmt], names: &mut BTreeSet<String>) {
    for stmt in statements {
        match stmt {
            Stmt::Assign { name, .. } => {
                names.insert(name.clone());
            }
            Stmt::If {
                arms, else_body, ..
            } => {
                for arm in arms {
                    collect_assigned(&arm.body, names);
                }
                if let Some(body) = else_body {
                    collect_assigned(body, names);
                }
            }
            Stmt::While { body, .. } => collect_assigned(body, names),
            Stmt::For { variable, body, .. } => {
                names.insert(variable.clone());
                collect_assigned(body, names);
            }
            Stmt::Expression { .. } | Stmt::Print { .. } | Stmt::Input { .. } => {}
        }
    }
}
