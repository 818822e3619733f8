use std::mem;

use thiserror::Error;

use crate::{
    ast::{self, BinaryOperator, Block, ElseBranch, Expression},
    lexer::{Token, TokenKind},
};

#[derive(Error, Debug)]
pub enum ParserError {
    #[error("Unexpected token on line {line}: expected {expected}, found {found}")]
    UnexpectedToken {
        expected: TokenKind,
        found: TokenKind,
        line: usize,
    },
    #[error("Unexpected end of input")]
    UnexpectedEof,
    #[error("Expected a statement, found {found} on line {line}")]
    ExpectedStatement { found: TokenKind, line: usize },
    #[error("Expected an expression, found {found} on line {line}")]
    ExpectedExpression { found: TokenKind, line: usize },
    #[error("Invalid integer literal \"{text}\" on line {line}")]
    InvalidIntLiteral { text: String, line: usize },
}

/// Recursive-descent parser over the token sequence produced by the lexer.
/// Any grammar violation aborts the whole parse; there is no recovery and no
/// partial program.
#[derive(Debug)]
pub struct Parser {
    tokens: Vec<Token>,
    index: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, index: 0 }
    }

    pub fn parse_program(&mut self) -> Result<ast::Program, ParserError> {
        let mut statements = Vec::new();
        while self.peek().is_some() {
            statements.push(self.parse_statement()?);
        }

        Ok(ast::Program { statements })
    }

    fn parse_statement(&mut self) -> Result<ast::Statement, ParserError> {
        let (kind, line) = match self.peek() {
            Some(token) => (token.kind.clone(), token.line),
            None => return Err(ParserError::UnexpectedEof),
        };

        match kind {
            TokenKind::KWReturn => self.parse_exit_statement(),
            TokenKind::KWLet => self.parse_let_statement(),
            TokenKind::OpenBrace => Ok(ast::Statement::Compound(self.parse_block()?)),
            TokenKind::KWIf => {
                self.consume();
                Ok(ast::Statement::If(self.parse_if_clause()?))
            }
            kind => Err(ParserError::ExpectedStatement { found: kind, line }),
        }
    }

    fn parse_exit_statement(&mut self) -> Result<ast::Statement, ParserError> {
        self.expect(TokenKind::KWReturn)?;
        self.expect(TokenKind::OpenParen)?;
        let expression = self.parse_expression(0)?;
        self.expect(TokenKind::CloseParen)?;
        self.expect(TokenKind::Semicolon)?;

        Ok(ast::Statement::Exit(expression))
    }

    fn parse_let_statement(&mut self) -> Result<ast::Statement, ParserError> {
        self.expect(TokenKind::KWLet)?;
        let name = self.expect_identifier()?;
        self.expect(TokenKind::Assign)?;
        let init = self.parse_expression(0)?;
        self.expect(TokenKind::Semicolon)?;

        Ok(ast::Statement::Let { name, init })
    }

    fn parse_block(&mut self) -> Result<Block, ParserError> {
        self.expect(TokenKind::OpenBrace)?;
        let mut statements = Vec::new();
        loop {
            match self.peek().map(|token| &token.kind) {
                Some(TokenKind::CloseBrace) => break,
                Some(_) => statements.push(self.parse_statement()?),
                None => return Err(ParserError::UnexpectedEof),
            }
        }
        self.expect(TokenKind::CloseBrace)?;

        Ok(Block(statements))
    }

    /// Parses `( condition ) { ... }` and any trailing `elif`/`else`; the
    /// introducing `if`/`elif` keyword has already been consumed.
    fn parse_if_clause(&mut self) -> Result<ast::If, ParserError> {
        self.expect(TokenKind::OpenParen)?;
        let condition = self.parse_expression(0)?;
        self.expect(TokenKind::CloseParen)?;
        let then = self.parse_block()?;

        let otherwise = match self.peek().map(|token| &token.kind) {
            Some(TokenKind::KWElif) => {
                self.consume();
                Some(ElseBranch::Elif(Box::new(self.parse_if_clause()?)))
            }
            Some(TokenKind::KWElse) => {
                self.consume();
                Some(ElseBranch::Else(self.parse_block()?))
            }
            _ => None,
        };

        Ok(ast::If {
            condition,
            then,
            otherwise,
        })
    }

    /// Precedence climbing: only binary operators at or above
    /// `min_precedence` are consumed at this level, and the right-hand side
    /// recurses one level tighter, which makes every operator
    /// left-associative.
    fn parse_expression(&mut self, min_precedence: u8) -> Result<Expression, ParserError> {
        let mut lhs = self.parse_atom()?;

        loop {
            let (op, precedence) = match self.peek() {
                Some(token) => {
                    match (
                        binary_operator(&token.kind),
                        token.kind.binary_precedence(),
                    ) {
                        (Some(op), Some(precedence)) if precedence >= min_precedence => {
                            (op, precedence)
                        }
                        _ => break,
                    }
                }
                None => break,
            };

            self.consume();
            let rhs = self.parse_expression(precedence + 1)?;
            lhs = Expression::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }

        Ok(lhs)
    }

    fn parse_atom(&mut self) -> Result<Expression, ParserError> {
        let token = match self.consume() {
            Some(token) => token,
            None => return Err(ParserError::UnexpectedEof),
        };

        match token.kind {
            TokenKind::IntLiteral(text) => {
                let value = text
                    .parse()
                    .map_err(|_| ParserError::InvalidIntLiteral {
                        text,
                        line: token.line,
                    })?;
                Ok(Expression::IntLiteral(value))
            }
            TokenKind::Identifier(name) => Ok(Expression::Var(name)),
            TokenKind::OpenParen => {
                // Parentheses reset the precedence threshold.
                let expression = self.parse_expression(0)?;
                self.expect(TokenKind::CloseParen)?;
                Ok(expression)
            }
            kind => Err(ParserError::ExpectedExpression {
                found: kind,
                line: token.line,
            }),
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.index)
    }

    fn consume(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.index).cloned();
        if token.is_some() {
            self.index += 1;
        }
        token
    }

    /// Consumes the next token if it has the same kind as `expected`
    /// (payloads are ignored, only the variant is compared).
    fn expect(&mut self, expected: TokenKind) -> Result<Token, ParserError> {
        let token = match self.tokens.get(self.index) {
            Some(token) => token.clone(),
            None => return Err(ParserError::UnexpectedEof),
        };

        if mem::discriminant(&token.kind) != mem::discriminant(&expected) {
            return Err(ParserError::UnexpectedToken {
                expected,
                found: token.kind,
                line: token.line,
            });
        }

        self.index += 1;
        Ok(token)
    }

    fn expect_identifier(&mut self) -> Result<ast::Identifier, ParserError> {
        let token = self.expect(TokenKind::Identifier(String::new()))?;
        match token.kind {
            TokenKind::Identifier(name) => Ok(name),
            _ => unreachable!("expect only returns tokens of the requested kind"),
        }
    }
}

fn binary_operator(kind: &TokenKind) -> Option<BinaryOperator> {
    Some(match kind {
        TokenKind::Minus => BinaryOperator::Subtract,
        TokenKind::Plus => BinaryOperator::Add,
        TokenKind::Asterisk => BinaryOperator::Multiply,
        TokenKind::Slash => BinaryOperator::Divide,
        _ => return None,
    })
}
