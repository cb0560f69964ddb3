//=============================================
// pyscope/parser.rs
//=============================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Recursive descent parser for the Python subset
// Objective: Transform token streams into AST nodes consumed by the analyzer
//=============================================

//=============================================
//            Section 1: Imports
//=============================================

use thiserror::Error;

use crate::ast::{BinaryOp, Expr, IfArm, Literal, Program, Stmt, UnaryOp};
use crate::diagnostics::{DiagnosticSink, Stage};
use crate::tokenizer::{Position, Token, TokenKind};

//=============================================
//            Section 2: Parse Errors
//=============================================

/// Parser error types. Positions are carried separately so diagnostics can
/// place them without duplicating the location in the message.
#[derive(Debug, Clone, Error)]
pub enum ParseError {
    #[error("Expected {expected} but found {found:?}")]
    UnexpectedToken {
        expected: String,
        found: TokenKind,
        position: Position,
    },
    #[error("Unexpected end of input, expected {expected}")]
    UnexpectedEndOfInput { expected: String, position: Position },
    #[error("Invalid syntax: {message}")]
    InvalidSyntax { message: String, position: Position },
}

impl ParseError {
    pub fn position(&self) -> &Position {
        match self {
            ParseError::UnexpectedToken { position, .. } => position,
            ParseError::UnexpectedEndOfInput { position, .. } => position,
            ParseError::InvalidSyntax { position, .. } => position,
        }
    }
}

//=============================================
//            Section 3: Parser State
//=============================================

/// Recursive descent parser for the Python subset
pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
    expr_depth: usize,
}

const MAX_EXPRESSION_DEPTH: usize = 512;

impl Parser {
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if !matches!(tokens.last().map(|token| &token.kind), Some(TokenKind::Eof)) {
            let position = tokens
                .last()
                .map(|token| token.position.clone())
                .unwrap_or_else(|| Position::new(1, 1, 0));
            tokens.push(Token::new(TokenKind::Eof, position));
        }
        Self {
            tokens,
            current: 0,
            expr_depth: 0,
        }
    }

    //=============================================
    //            Section 4: Program Parsing
    //=============================================

    /// Parse a complete program. Statement-level failures are reported to
    /// the sink and parsing resumes at the next statement boundary, so the
    /// returned program holds every statement that parsed cleanly.
    pub fn parse(&mut self, sink: &mut DiagnosticSink) -> Program {
        let position = self.current_position();
        let mut statements = Vec::new();

        while !self.is_at_end() {
            if self.peek().kind.is_layout() {
                self.advance();
                continue;
            }
            match self.parse_statement() {
                Ok(stmt) => statements.push(stmt),
                Err(error) => {
                    sink.error(Stage::Syntax, error.to_string(), error.position());
                    self.synchronize();
                }
            }
        }

        Program::new(statements, position)
    }

    /// Skip tokens until a likely statement boundary.
    fn synchronize(&mut self) {
        while !self.is_at_end() {
            match &self.peek().kind {
                TokenKind::Newline | TokenKind::Dedent => {
                    self.advance();
                    return;
                }
                TokenKind::If
                | TokenKind::While
                | TokenKind::For
                | TokenKind::Print
                | TokenKind::Input => return,
                _ => {
                    self.advance();
                }
            }
        }
    }

    //=============================================
    //            Section 5: Statement Parsing
    //=============================================

    fn parse_statement(&mut self) -> Result<Stmt, ParseError> {
        match &self.peek().kind {
            TokenKind::If => self.parse_if_statement(),
            TokenKind::While => self.parse_while_statement(),
            TokenKind::For => self.parse_for_statement(),
            TokenKind::Print => self.parse_print_statement(),
            TokenKind::Input => self.parse_input_statement(),
            TokenKind::Identifier(_) => {
                if matches!(self.peek_next().kind, TokenKind::Equal) {
                    self.parse_assignment()
                } else {
                    self.parse_expression_statement()
                }
            }
            _ => self.parse_expression_statement(),
        }
    }

    /// Parse assignment: IDENTIFIER '=' expression
    fn parse_assignment(&mut self) -> Result<Stmt, ParseError> {
        let start_pos = self.current_position();
        let (name, name_position) = self.consume_identifier("a variable name")?;
        self.consume(&TokenKind::Equal, "'='")?;
        let value = self.parse_expression()?;
        self.consume_statement_end()?;

        Ok(Stmt::Assign {
            name,
            name_position,
            value,
            position: start_pos,
        })
    }

    fn parse_expression_statement(&mut self) -> Result<Stmt, ParseError> {
        let start_pos = self.current_position();
        let expr = self.parse_expression()?;
        self.consume_statement_end()?;

        Ok(Stmt::Expression {
            expr,
            position: start_pos,
        })
    }

    /// Parse conditional: if expr ':' suite (elif expr ':' suite)* (else ':' suite)?
    fn parse_if_statement(&mut self) -> Result<Stmt, ParseError> {
        let start_pos = self.current_position();
        self.consume(&TokenKind::If, "'if'")?;

        let condition = self.parse_expression()?;
        self.consume(&TokenKind::Colon, "':' after condition")?;
        let body = self.parse_suite()?;

        let mut arms = vec![IfArm {
            condition,
            body,
            position: start_pos.clone(),
        }];
        let mut else_body = None;

        loop {
            if self.check(&TokenKind::Elif) {
                let arm_pos = self.current_position();
                self.advance();
                let condition = self.parse_expression()?;
                self.consume(&TokenKind::Colon, "':' after condition")?;
                let body = self.parse_suite()?;
                arms.push(IfArm {
                    condition,
                    body,
                    position: arm_pos,
                });
                continue;
            }
            if self.check(&TokenKind::Else) {
                self.advance();
                self.consume(&TokenKind::Colon, "':' after 'else'")?;
                else_body = Some(self.parse_suite()?);
            }
            break;
        }

        Ok(Stmt::If {
            arms,
            else_body,
            position: start_pos,
        })
    }

    /// Parse loop: while expr ':' suite
    fn parse_while_statement(&mut self) -> Result<Stmt, ParseError> {
        let start_pos = self.current_position();
        self.consume(&TokenKind::While, "'while'")?;

        let condition = self.parse_expression()?;
        self.consume(&TokenKind::Colon, "':' after condition")?;
        let body = self.parse_suite()?;

        Ok(Stmt::While {
            condition,
            body,
            position: start_pos,
        })
    }

    /// Parse loop: for IDENTIFIER in expr ':' suite
    fn parse_for_statement(&mut self) -> Result<Stmt, ParseError> {
        let start_pos = self.current_position();
        self.consume(&TokenKind::For, "'for'")?;

        let (variable, variable_position) = self.consume_identifier("a loop variable")?;
        self.consume(&TokenKind::In, "'in' after loop variable")?;
        let iterable = self.parse_expression()?;
        self.consume(&TokenKind::Colon, "':' after iterable")?;
        let body = self.parse_suite()?;

        Ok(Stmt::For {
            variable,
            variable_position,
            iterable,
            body,
            position: start_pos,
        })
    }

    /// Parse output: print '(' expression ')'
    fn parse_print_statement(&mut self) -> Result<Stmt, ParseError> {
        let start_pos = self.current_position();
        self.consume(&TokenKind::Print, "'print'")?;
        self.consume(&TokenKind::LeftParen, "'(' after 'print'")?;
        let expr = self.parse_expression()?;
        self.consume(&TokenKind::RightParen, "')'")?;
        self.consume_statement_end()?;

        Ok(Stmt::Print {
            expr,
            position: start_pos,
        })
    }

    /// Parse input in statement position: input '(' [STRING] ')'
    fn parse_input_statement(&mut self) -> Result<Stmt, ParseError> {
        let start_pos = self.current_position();
        let prompt = self.parse_input_call()?;
        self.consume_statement_end()?;

        Ok(Stmt::Input {
            prompt,
            position: start_pos,
        })
    }

    fn parse_input_call(&mut self) -> Result<Option<String>, ParseError> {
        self.consume(&TokenKind::Input, "'input'")?;
        self.consume(&TokenKind::LeftParen, "'(' after 'input'")?;
        let prompt = if let TokenKind::String(text) = &self.peek().kind {
            let text = text.clone();
            self.advance();
            Some(text)
        } else {
            None
        };
        self.consume(&TokenKind::RightParen, "')'")?;
        Ok(prompt)
    }

    /// Parse a suite: either an inline simple statement after the colon, or
    /// a newline followed by an indented block.
    fn parse_suite(&mut self) -> Result<Vec<Stmt>, ParseError> {
        if !self.check(&TokenKind::Newline) {
            let stmt = self.parse_statement()?;
            return Ok(vec![stmt]);
        }

        self.advance();
        self.consume(&TokenKind::Indent, "an indented block")?;

        let mut body = Vec::new();
        while !self.check(&TokenKind::Dedent) && !self.is_at_end() {
            if self.check(&TokenKind::Newline) {
                self.advance();
                continue;
            }
            body.push(self.parse_statement()?);
        }
        if self.check(&TokenKind::Dedent) {
            self.advance();
        }

        if body.is_empty() {
            return Err(ParseError::InvalidSyntax {
                message: "expected at least one statement in block".to_string(),
                position: self.current_position(),
            });
        }
        Ok(body)
    }

    //=============================================
    //            Section 6: Expression Parsing
    //=============================================

    fn enter_expression(&mut self) -> Result<(), ParseError> {
        if self.expr_depth >= MAX_EXPRESSION_DEPTH {
            return Err(ParseError::InvalidSyntax {
                message: format!(
                    "expression recursion limit of {} exceeded",
                    MAX_EXPRESSION_DEPTH
                ),
                position: self.current_position(),
            });
        }
        self.expr_depth += 1;
        Ok(())
    }

    fn exit_expression(&mut self) {
        if self.expr_depth > 0 {
            self.expr_depth -= 1;
        }
    }

    /// Parse expression: comparison (('and' | 'or') comparison)*
    pub fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        self.enter_expression()?;
        let result = self.parse_logical();
        self.exit_expression();
        result
    }

    fn parse_logical(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_comparison()?;

        loop {
            let operator = match self.peek().kind {
                TokenKind::And => BinaryOp::And,
                TokenKind::Or => BinaryOp::Or,
                _ => break,
            };
            let position = self.current_position();
            self.advance();
            let right = self.parse_comparison()?;
            expr = Expr::binary(expr, operator, right, position);
        }

        Ok(expr)
    }

    /// Parse comparison: arith (('==' | '!=' | '<' | '<=' | '>' | '>=') arith)*
    fn parse_comparison(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_arithmetic()?;

        loop {
            let operator = match self.peek().kind {
                TokenKind::EqualEqual => BinaryOp::Equal,
                TokenKind::NotEqual => BinaryOp::NotEqual,
                TokenKind::Less => BinaryOp::Less,
                TokenKind::LessEqual => BinaryOp::LessEqual,
                TokenKind::Greater => BinaryOp::Greater,
                TokenKind::GreaterEqual => BinaryOp::GreaterEqual,
                _ => break,
            };
            let position = self.current_position();
            self.advance();
            let right = self.parse_arithmetic()?;
            expr = Expr::binary(expr, operator, right, position);
        }

        Ok(expr)
    }

    /// Parse additive expression: term (('+' | '-') term)*
    fn parse_arithmetic(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_term()?;

        loop {
            let operator = match self.peek().kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Subtract,
                _ => break,
            };
            let position = self.current_position();
            self.advance();
            let right = self.parse_term()?;
            expr = Expr::binary(expr, operator, right, position);
        }

        Ok(expr)
    }

    /// Parse multiplicative expression: unary (('*' | '/' | '%') unary)*
    fn parse_term(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_unary()?;

        loop {
            let operator = match self.peek().kind {
                TokenKind::Star => BinaryOp::Multiply,
                TokenKind::Slash => BinaryOp::Divide,
                TokenKind::Percent => BinaryOp::Modulo,
                _ => break,
            };
            let position = self.current_position();
            self.advance();
            let right = self.parse_unary()?;
            expr = Expr::binary(expr, operator, right, position);
        }

        Ok(expr)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        let operator = match self.peek().kind {
            TokenKind::Plus => Some(UnaryOp::Plus),
            TokenKind::Minus => Some(UnaryOp::Minus),
            TokenKind::Not => Some(UnaryOp::Not),
            _ => None,
        };

        if let Some(operator) = operator {
            self.enter_expression()?;
            let position = self.current_position();
            self.advance();
            let operand = self.parse_unary();
            self.exit_expression();
            return Ok(Expr::unary(operator, operand?, position));
        }

        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        if self.is_at_end() {
            return Err(ParseError::UnexpectedEndOfInput {
                expected: "an expression".to_string(),
                position: self.current_position(),
            });
        }

        let position = self.current_position();
        match &self.peek().kind {
            TokenKind::Integer(value) => {
                let value = *value;
                self.advance();
                Ok(Expr::literal(Literal::Integer(value), position))
            }
            TokenKind::Float(value) => {
                let value = *value;
                self.advance();
                Ok(Expr::literal(Literal::Float(value), position))
            }
            TokenKind::String(text) => {
                let text = text.clone();
                self.advance();
                Ok(Expr::literal(Literal::Str(text), position))
            }
            TokenKind::Boolean(flag) => {
                let flag = *flag;
                self.advance();
                Ok(Expr::literal(Literal::Boolean(flag), position))
            }
            TokenKind::Identifier(name) => {
                let name = name.clone();
                self.advance();
                Ok(Expr::identifier(name, position))
            }
            TokenKind::LeftParen => {
                self.advance();
                let expr = self.parse_expression()?;
                self.consume(&TokenKind::RightParen, "')'")?;
                Ok(expr)
            }
            TokenKind::Input => {
                let prompt = self.parse_input_call()?;
                Ok(Expr::Input { prompt, position })
            }
            other => Err(ParseError::UnexpectedToken {
                expected: "an expression".to_string(),
                found: other.clone(),
                position,
            }),
        }
    }

    //=============================================
    //            Section 7: Token Navigation
    //=============================================

    fn peek(&self) -> &Token {
        &self.tokens[self.current.min(self.tokens.len() - 1)]
    }

    fn peek_next(&self) -> &Token {
        &self.tokens[(self.current + 1).min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        &self.tokens[self.current.saturating_sub(1)]
    }

    fn check(&self, kind: &TokenKind) -> bool {
        &self.peek().kind == kind
    }

    fn is_at_end(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Eof)
    }

    fn current_position(&self) -> Position {
        self.peek().position.clone()
    }

    fn consume(&mut self, kind: &TokenKind, expected: &str) -> Result<&Token, ParseError> {
        if self.check(kind) {
            return Ok(self.advance());
        }
        if self.is_at_end() {
            return Err(ParseError::UnexpectedEndOfInput {
                expected: expected.to_string(),
                position: self.current_position(),
            });
        }
        Err(ParseError::UnexpectedToken {
            expected: expected.to_string(),
            found: self.peek().kind.clone(),
            position: self.current_position(),
        })
    }

    fn consume_identifier(&mut self, expected: &str) -> Result<(String, Position), ParseError> {
        if let TokenKind::Identifier(name) = &self.peek().kind {
            let name = name.clone();
            let position = self.current_position();
            self.advance();
            return Ok((name, position));
        }
        if self.is_at_end() {
            return Err(ParseError::UnexpectedEndOfInput {
                expected: expected.to_string(),
                position: self.current_position(),
            });
        }
        Err(ParseError::UnexpectedToken {
            expected: expected.to_string(),
            found: self.peek().kind.clone(),
            position: self.current_position(),
        })
    }

    /// Statements end at a newline, a dedent boundary, or end of input. The
    /// newline is consumed; a dedent is left for the enclosing suite.
    fn consume_statement_end(&mut self) -> Result<(), ParseError> {
        match &self.peek().kind {
            TokenKind::Newline => {
                self.advance();
                Ok(())
            }
            TokenKind::Eof | TokenKind::Dedent => Ok(()),
            other => Err(ParseError::UnexpectedToken {
                expected: "end of statement".to_string(),
                found: other.clone(),
                position: self.current_position(),
            }),
        }
    }
}

//=============================================
//            Section 8: Tests
//=============================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::Tokenizer;

    fn parse_source(source: &str) -> (Program, DiagnosticSink) {
        let mut sink = DiagnosticSink::new();
        let mut tokenizer = Tokenizer::new(source);
        let tokens = tokenizer.tokenize(&mut sink);
        assert!(!sink.has_errors(), "lexical errors: {:?}", sink.diagnostics());
        let mut parser = Parser::new(tokens);
        let program = parser.parse(&mut sink);
        (program, sink)
    }

    fn parse_clean(source: &str) -> Program {
        let (program, sink) = parse_source(source);
        assert!(!sink.has_errors(), "parse errors: {:?}", sink.diagnostics());
        program
    }

    #[test]
    fn test_parse_assignment() {
        let program = parse_clean("x = 10\n");
        assert_eq!(program.statements.len(), 1);
        match &program.statements[0] {
            Stmt::Assign { name, value, .. } => {
                assert_eq!(name, "x");
                assert!(matches!(
                    value,
                    Expr::Literal {
                        value: Literal::Integer(10),
                        ..
                    }
                ));
            }
            other => panic!("expected assignment, got {:?}", other),
        }
    }

    #[test]
    fn test_operator_precedence() {
        let program = parse_clean("x = 1 + 2 * 3\n");
        let (_, value) = program.find_assignments()[0];
        match value {
            Expr::Binary {
                operator: BinaryOp::Add,
                right,
                ..
            } => {
                assert!(matches!(
                    **right,
                    Expr::Binary {
                        operator: BinaryOp::Multiply,
                        ..
                    }
                ));
            }
            other => panic!("expected addition at the root, got {:?}", other),
        }
    }

    #[test]
    fn test_parentheses_override_precedence() {
        let program = parse_clean("x = (1 + 2) * 3\n");
        let (_, value) = program.find_assignments()[0];
        match value {
            Expr::Binary {
                operator: BinaryOp::Multiply,
                left,
                ..
            } => {
                assert!(matches!(
                    **left,
                    Expr::Binary {
                        operator: BinaryOp::Add,
                        ..
                    }
                ));
            }
            other => panic!("expected multiplication at the root, got {:?}", other),
        }
    }

    #[test]
    fn test_comparison_binds_looser_than_arithmetic() {
        let program = parse_clean("x = 1 + 2 > 3\n");
        let (_, value) = program.find_assignments()[0];
        assert!(matches!(
            value,
            Expr::Binary {
                operator: BinaryOp::Greater,
                ..
            }
        ));
    }

    #[test]
    fn test_if_elif_else() {
        let source = "if a > 1:\n    print(a)\nelif a < 0:\n    print(a)\nelse:\n    print(a)\n";
        let program = parse_clean(&format!("a = 5\n{}", source));
        assert_eq!(program.statements.len(), 2);
        match &program.statements[1] {
            Stmt::If {
                arms, else_body, ..
            } => {
                assert_eq!(arms.len(), 2);
                assert!(else_body.is_some());
                assert_eq!(arms[0].body.len(), 1);
            }
            other => panic!("expected if statement, got {:?}", other),
        }
    }

    #[test]
    fn test_while_with_indented_block() {
        let source = "while counter < 3:\n    print(counter)\n    counter = counter + 1\n";
        let program = parse_clean(source);
        match &program.statements[0] {
            Stmt::While { body, .. } => assert_eq!(body.len(), 2),
            other => panic!("expected while statement, got {:?}", other),
        }
    }

    #[test]
    fn test_inline_suite() {
        let program = parse_clean("if x: print(x)\n");
        match &program.statements[0] {
            Stmt::If { arms, .. } => {
                assert_eq!(arms.len(), 1);
                assert_eq!(arms[0].body.len(), 1);
                assert!(matches!(arms[0].body[0], Stmt::Print { .. }));
            }
            other => panic!("expected if statement, got {:?}", other),
        }
    }

    #[test]
    fn test_for_in_loop() {
        let program = parse_clean("for item in items:\n    print(item)\n");
        match &program.statements[0] {
            Stmt::For { variable, body, .. } => {
                assert_eq!(variable, "item");
                assert_eq!(body.len(), 1);
            }
            other => panic!("expected for statement, got {:?}", other),
        }
    }

    #[test]
    fn test_input_as_expression_and_statement() {
        let program = parse_clean("name = input(\"Enter: \")\ninput()\n");
        assert!(matches!(
            &program.statements[0],
            Stmt::Assign {
                value: Expr::Input {
                    prompt: Some(prompt),
                    ..
                },
                ..
            } if prompt == "Enter: "
        ));
        assert!(matches!(
            &program.statements[1],
            Stmt::Input { prompt: None, .. }
        ));
    }

    #[test]
    fn test_unary_operators() {
        let program = parse_clean("x = -5\ny = not True\n");
        let assignments = program.find_assignments();
        assert!(matches!(
            assignments[0].1,
            Expr::Unary {
                operator: UnaryOp::Minus,
                ..
            }
        ));
        assert!(matches!(
            assignments[1].1,
            Expr::Unary {
                operator: UnaryOp::Not,
                ..
            }
        ));
    }

    #[test]
    fn test_missing_colon_is_reported() {
        let (_, sink) = parse_source("if x > 1\n    print(x)\n");
        assert!(sink.has_errors());
        let messages: Vec<&str> = sink
            .diagnostics()
            .iter()
            .map(|diagnostic| diagnostic.message.as_str())
            .collect();
        assert!(
            messages
                .iter()
                .any(|message| message.contains("':' after condition")),
            "got {:?}",
            messages
        );
    }

    #[test]
    fn test_recovery_continues_after_bad_statement() {
        let (program, sink) = parse_source("x = 1\ny = )\nz = 2\n");
        assert!(sink.has_errors());
        assert_eq!(program.statements.len(), 2);
        assert!(matches!(
            &program.statements[1],
            Stmt::Assign { name, .. } if name == "z"
        ));
    }

    #[test]
    fn test_trailing_garbage_after_expression() {
        let (_, sink) = parse_source("x = 1 2\n");
        assert!(sink.has_errors());
        assert!(
            sink.diagnostics()[0]
                .message
                .contains("end of statement")
        );
    }

    #[test]
    fn test_eof_inside_condition() {
        let (_, sink) = parse_source("if x >");
        assert!(sink.has_errors());
    }
}
