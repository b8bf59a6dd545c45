//! Recursive-descent parser driving [`crate::lexer::Token`] into the
//! [`crate::ast`] shapes.
//!
//! This crate is the one collaborator §1/§6 name as contracted out ("any
//! parser generator provided the AST shape of §3 is produced"); it is kept
//! deliberately small — a straightforward precedence-climbing expression
//! parser plus one function per statement form, rather than a reproduction
//! of `original_source`'s `boost::spirit::x3` grammar combinators.

use crate::ast::*;
use crate::error::{ParseError, ParseResult};
use crate::lexer::Token;
use logos::Logos;

struct Path {
    name: Variable,
    members: Vec<Variable>,
    indexes: Option<Vec<Expr>>,
}

pub struct Parser {
    tokens: Vec<Token>,
    lines: Vec<u32>,
    pos: usize,
}

/// Parses a full program's source text.
pub fn parse(source: &str) -> ParseResult<Program> {
    let mut tokens = Vec::new();
    let mut lines = Vec::new();
    let mut lexer = Token::lexer(source);
    while let Some(result) = lexer.next() {
        let line = 1 + source[..lexer.span().start].matches('\n').count() as u32;
        match result {
            Ok(tok) => {
                tokens.push(tok);
                lines.push(line);
            }
            Err(_) => return Err(ParseError::new(line, format!("unrecognized token {:?}", lexer.slice()))),
        }
    }
    let mut parser = Parser { tokens, lines, pos: 0 };
    parser.parse_program()
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_is(&self, tok: &Token) -> bool {
        self.peek() == Some(tok)
    }

    fn current_line(&self) -> u32 {
        self.lines.get(self.pos).copied().unwrap_or_else(|| self.lines.last().copied().unwrap_or(1))
    }

    fn advance(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        tok
    }

    fn expect(&mut self, tok: &Token) -> ParseResult<()> {
        if self.peek_is(tok) {
            self.advance();
            Ok(())
        } else {
            Err(ParseError::new(
                self.current_line(),
                format!("expected {tok:?}, found {:?}", self.peek()),
            ))
        }
    }

    fn expect_ident(&mut self) -> ParseResult<String> {
        match self.advance() {
            Some(Token::Ident(name)) => Ok(name),
            other => Err(ParseError::new(self.current_line(), format!("expected identifier, found {other:?}"))),
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn parse_program(&mut self) -> ParseResult<Program> {
        let mut statements = Vec::new();
        while !self.at_end() {
            statements.push(self.parse_top_statement()?);
        }
        Ok(Program { statements })
    }

    fn parse_block(&mut self, terminators: &[Token]) -> ParseResult<Vec<Stmt>> {
        let mut statements = Vec::new();
        while !self.at_end() && !terminators.iter().any(|t| self.peek_is(t)) {
            statements.push(self.parse_top_statement()?);
        }
        Ok(statements)
    }

    fn parse_top_statement(&mut self) -> ParseResult<Stmt> {
        match self.peek() {
            Some(Token::Fn) => self.parse_function_or_expr_function(),
            Some(Token::Class) => self.parse_class(),
            _ => self.parse_statement(),
        }
    }

    fn parse_function_or_expr_function(&mut self) -> ParseResult<Stmt> {
        self.advance();
        let name = self.expect_ident()?;
        self.expect(&Token::LeftParen)?;
        let parameters = self.parse_parameter_list()?;
        self.expect(&Token::RightParen)?;
        if self.peek_is(&Token::To) {
            self.advance();
            let expression = self.parse_expr()?;
            self.expect(&Token::SemiColon)?;
            return Ok(Stmt::ExprFunction {
                name,
                parameters,
                expression,
            });
        }
        let body = self.parse_block(&[Token::EndFn])?;
        self.expect(&Token::EndFn)?;
        Ok(Stmt::Function(FunctionDef { name, parameters, body }))
    }

    fn parse_parameter_list(&mut self) -> ParseResult<Vec<Variable>> {
        let mut params = Vec::new();
        if self.peek_is(&Token::RightParen) {
            return Ok(params);
        }
        loop {
            params.push(Variable::from(self.expect_ident()?.as_str()));
            if self.peek_is(&Token::Comma) {
                self.advance();
            } else {
                break;
            }
        }
        Ok(params)
    }

    fn parse_class(&mut self) -> ParseResult<Stmt> {
        self.advance();
        let name = self.expect_ident()?;
        let mut variables = Vec::new();
        while matches!(self.peek(), Some(Token::Ident(_))) {
            variables.push(Variable::from(self.expect_ident()?.as_str()));
            if self.peek_is(&Token::Comma) {
                self.advance();
            } else {
                break;
            }
        }
        self.expect(&Token::SemiColon)?;
        let mut methods = Vec::new();
        while self.peek_is(&Token::Fn) {
            self.advance();
            let method_name = self.expect_ident()?;
            self.expect(&Token::LeftParen)?;
            let parameters = self.parse_parameter_list()?;
            self.expect(&Token::RightParen)?;
            let body = self.parse_block(&[Token::EndFn])?;
            self.expect(&Token::EndFn)?;
            methods.push(FunctionDef {
                name: method_name,
                parameters,
                body,
            });
        }
        self.expect(&Token::EndClass)?;
        Ok(Stmt::Class { name, variables, methods })
    }

    fn parse_statement(&mut self) -> ParseResult<Stmt> {
        match self.peek() {
            Some(Token::Print) => self.parse_print(),
            Some(Token::Let) => self.parse_let(),
            Some(Token::If) => self.parse_if(),
            Some(Token::While) => self.parse_while(),
            Some(Token::Repeat) => self.parse_repeat(),
            Some(Token::Case) => self.parse_case(),
            Some(Token::Return) => self.parse_return(),
            _ => self.parse_simple_statement(),
        }
    }

    /// `print` takes comma-separated items (rendered space-separated); a
    /// trailing comma right before the statement's closing `;` suppresses
    /// the implicit newline (§6) instead of demanding one more item.
    fn parse_print(&mut self) -> ParseResult<Stmt> {
        self.advance();
        let mut parts = Vec::new();
        if !self.peek_is(&Token::SemiColon) {
            loop {
                parts.push(PrintPart::Value(self.parse_expr()?));
                if self.peek_is(&Token::Comma) {
                    self.advance();
                    parts.push(PrintPart::Comma);
                    if self.peek_is(&Token::SemiColon) {
                        break;
                    }
                } else {
                    break;
                }
            }
        }
        self.expect(&Token::SemiColon)?;
        Ok(Stmt::Print(PrintStmt { parts }))
    }

    fn parse_let(&mut self) -> ParseResult<Stmt> {
        self.advance();
        let name = Variable::from(self.expect_ident()?.as_str());
        if self.peek_is(&Token::Colon) {
            self.advance();
            let element_type = self.expect_ident()?;
            self.expect(&Token::From)?;
            let elements = self.parse_list_elements()?;
            self.expect(&Token::SemiColon)?;
            return Ok(Stmt::ListInit {
                name,
                mutable: true,
                element_type: Some(element_type),
                elements,
            });
        }
        let mutable = match self.peek() {
            Some(Token::Equal) => false,
            Some(Token::From) => true,
            other => {
                return Err(ParseError::new(self.current_line(), format!("expected '=' or '<-' in let, found {other:?}")))
            }
        };
        self.advance();
        if self.peek_is(&Token::LeftBracket) {
            let elements = self.parse_list_elements()?;
            self.expect(&Token::SemiColon)?;
            return Ok(Stmt::ListInit {
                name,
                mutable,
                element_type: None,
                elements,
            });
        }
        let value = self.parse_expr()?;
        self.expect(&Token::SemiColon)?;
        Ok(Stmt::Init { name, mutable, value })
    }

    fn parse_list_elements(&mut self) -> ParseResult<Vec<Expr>> {
        self.expect(&Token::LeftBracket)?;
        let elements = self.parse_expr_list(&Token::RightBracket)?;
        self.expect(&Token::RightBracket)?;
        Ok(elements)
    }

    fn parse_expr_list(&mut self, terminator: &Token) -> ParseResult<Vec<Expr>> {
        let mut items = Vec::new();
        if self.peek_is(terminator) {
            return Ok(items);
        }
        loop {
            items.push(self.parse_expr()?);
            if self.peek_is(&Token::Comma) {
                self.advance();
            } else {
                break;
            }
        }
        Ok(items)
    }

    fn parse_if(&mut self) -> ParseResult<Stmt> {
        self.advance();
        let condition = self.parse_expr()?;
        let true_block = self.parse_block(&[Token::Else, Token::EndIf])?;
        let false_block = if self.peek_is(&Token::Else) {
            self.advance();
            self.parse_block(&[Token::EndIf])?
        } else {
            Vec::new()
        };
        self.expect(&Token::EndIf)?;
        Ok(Stmt::If {
            condition,
            true_block,
            false_block,
        })
    }

    fn parse_while(&mut self) -> ParseResult<Stmt> {
        self.advance();
        let condition = self.parse_expr()?;
        let body = self.parse_block(&[Token::EndWhile])?;
        self.expect(&Token::EndWhile)?;
        Ok(Stmt::While { condition, body })
    }

    fn parse_repeat(&mut self) -> ParseResult<Stmt> {
        self.advance();
        let body = self.parse_block(&[Token::Until])?;
        self.expect(&Token::Until)?;
        let condition = self.parse_expr()?;
        self.expect(&Token::SemiColon)?;
        Ok(Stmt::Repeat { body, condition })
    }

    fn parse_case(&mut self) -> ParseResult<Stmt> {
        self.advance();
        let scrutinee = self.parse_expr()?;
        self.expect(&Token::SemiColon)?;
        let mut arms = Vec::new();
        while self.peek_is(&Token::When) {
            self.advance();
            let pattern = self.parse_expr()?;
            self.expect(&Token::SemiColon)?;
            let body = self.parse_block(&[Token::When, Token::Else, Token::EndCase])?;
            arms.push(WhenArm { pattern, body });
        }
        let otherwise = if self.peek_is(&Token::Else) {
            self.advance();
            self.parse_block(&[Token::EndCase])?
        } else {
            Vec::new()
        };
        self.expect(&Token::EndCase)?;
        Ok(Stmt::Case {
            scrutinee,
            arms,
            otherwise,
        })
    }

    fn parse_return(&mut self) -> ParseResult<Stmt> {
        self.advance();
        if self.peek_is(&Token::SemiColon) {
            self.advance();
            return Ok(Stmt::Return(None));
        }
        let expr = self.parse_expr()?;
        self.expect(&Token::SemiColon)?;
        Ok(Stmt::Return(Some(expr)))
    }

    fn parse_simple_statement(&mut self) -> ParseResult<Stmt> {
        let start = self.pos;
        if matches!(self.peek(), Some(Token::Ident(_)) | Some(Token::This)) {
            if let Some(path) = self.try_parse_assignable_path() {
                if self.peek_is(&Token::From) {
                    self.advance();
                    let value = self.parse_expr()?;
                    self.expect(&Token::SemiColon)?;
                    return Ok(match (path.members.is_empty(), path.indexes) {
                        (true, None) => Stmt::Assign { name: path.name, value },
                        (true, Some(indexes)) => Stmt::ListAssign {
                            name: path.name,
                            indexes,
                            value,
                        },
                        (false, None) => Stmt::DataAssign {
                            name: path.name,
                            member_list: path.members,
                            value,
                        },
                        (false, Some(indexes)) => Stmt::DataListAssign {
                            name: path.name,
                            member_list: path.members,
                            indexes,
                            value,
                        },
                    });
                }
            }
            self.pos = start;
        }
        let expr = self.parse_expr()?;
        self.expect(&Token::SemiColon)?;
        Ok(match expr {
            Expr::FunctionCall { name, args } => Stmt::FunctionCall { name, args },
            Expr::MethodCall {
                name,
                member_list,
                method,
                args,
            } => Stmt::MethodCall {
                name,
                member_list,
                method,
                args,
            },
            other => Stmt::Expression(other),
        })
    }

    fn try_parse_assignable_path(&mut self) -> Option<Path> {
        let start = self.pos;
        let name = match self.peek() {
            Some(Token::Ident(s)) => Variable::from(s.clone().as_str()),
            Some(Token::This) => Variable::from("this"),
            _ => return None,
        };
        self.advance();
        if self.peek_is(&Token::LeftParen) {
            self.pos = start;
            return None;
        }
        let mut members = Vec::new();
        while self.peek_is(&Token::Dot) {
            self.advance();
            match self.advance() {
                Some(Token::Ident(m)) => members.push(Variable::from(m.as_str())),
                _ => {
                    self.pos = start;
                    return None;
                }
            }
        }
        if !members.is_empty() && self.peek_is(&Token::LeftParen) {
            self.pos = start;
            return None;
        }
        let indexes = if self.peek_is(&Token::LeftBracket) {
            self.advance();
            let idx = match self.parse_expr_list(&Token::RightBracket) {
                Ok(idx) => idx,
                Err(_) => {
                    self.pos = start;
                    return None;
                }
            };
            if self.expect(&Token::RightBracket).is_err() {
                self.pos = start;
                return None;
            }
            Some(idx)
        } else {
            None
        };
        Some(Path { name, members, indexes })
    }

    // --- Expressions, precedence climbing, lowest to highest. ---

    fn parse_expr(&mut self) -> ParseResult<Expr> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_and()?;
        while self.peek_is(&Token::Or) {
            self.advance();
            let right = self.parse_and()?;
            left = Expr::Binary {
                op: Operator::Or,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_comparison()?;
        while self.peek_is(&Token::And) {
            self.advance();
            let right = self.parse_comparison()?;
            left = Expr::Binary {
                op: Operator::And,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn comparison_op(tok: &Token) -> Option<Operator> {
        Some(match tok {
            Token::Less => Operator::Less,
            Token::LessEqual => Operator::LessEqual,
            Token::Greater => Operator::Greater,
            Token::GreaterEqual => Operator::GreaterEqual,
            Token::Equal => Operator::Equal,
            Token::NotEqual => Operator::NotEqual,
            _ => return None,
        })
    }

    fn parse_comparison(&mut self) -> ParseResult<Expr> {
        let first = self.parse_bitwise()?;
        let mut operands = vec![first];
        let mut ops = Vec::new();
        while let Some(op) = self.peek().and_then(Self::comparison_op) {
            self.advance();
            ops.push(op);
            operands.push(self.parse_bitwise()?);
        }
        if ops.is_empty() {
            Ok(operands.pop().unwrap())
        } else if ops.len() == 1 {
            let right = operands.pop().unwrap();
            let left = operands.pop().unwrap();
            Ok(Expr::Binary {
                op: ops[0],
                left: Box::new(left),
                right: Box::new(right),
            })
        } else {
            Ok(Expr::CompareChain { ops, operands })
        }
    }

    fn parse_bitwise(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_additive()?;
        loop {
            let op = match self.peek() {
                Some(Token::BitAnd) => Operator::BitAnd,
                Some(Token::BitOr) => Operator::BitOr,
                Some(Token::BitXor) => Operator::BitXor,
                _ => break,
            };
            self.advance();
            let right = self.parse_additive()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => Operator::Plus,
                Some(Token::Minus) => Operator::Minus,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_exponent()?;
        loop {
            let op = match self.peek() {
                Some(Token::Times) => Operator::Times,
                Some(Token::Divide) => Operator::Divide,
                Some(Token::FloorDivide) => Operator::FloorDivide,
                Some(Token::Modulo) => Operator::Modulo,
                _ => break,
            };
            self.advance();
            let right = self.parse_exponent()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_exponent(&mut self) -> ParseResult<Expr> {
        let left = self.parse_unary()?;
        if self.peek_is(&Token::Exponent) {
            self.advance();
            let right = self.parse_exponent()?;
            return Ok(Expr::Binary {
                op: Operator::Exponent,
                left: Box::new(left),
                right: Box::new(right),
            });
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> ParseResult<Expr> {
        let op = match self.peek() {
            Some(Token::Plus) => {
                self.advance();
                return self.parse_unary();
            }
            Some(Token::Minus) => Operator::Minus,
            Some(Token::Not) => Operator::Not,
            Some(Token::Compl) => Operator::Compl,
            Some(Token::Bang) => Operator::Bang,
            Some(Token::Question) => Operator::Question,
            _ => return self.parse_postfix(),
        };
        self.advance();
        let operand = self.parse_unary()?;
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn parse_postfix(&mut self) -> ParseResult<Expr> {
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> ParseResult<Expr> {
        match self.peek().cloned() {
            Some(Token::Number(text)) => {
                self.advance();
                Ok(Expr::Literal(parse_number_literal(&text)))
            }
            Some(Token::StringLit(s)) => {
                self.advance();
                Ok(Expr::Literal(Literal::Str(s)))
            }
            Some(Token::True) => {
                self.advance();
                Ok(Expr::Literal(Literal::Bool(true)))
            }
            Some(Token::False) => {
                self.advance();
                Ok(Expr::Literal(Literal::Bool(false)))
            }
            Some(Token::Nil) => {
                self.advance();
                Ok(Expr::Literal(Literal::Nil))
            }
            Some(Token::This) => {
                self.advance();
                if self.peek_is(&Token::Dot) {
                    self.parse_member_chain(Variable::from("this"))
                } else {
                    Ok(Expr::This)
                }
            }
            Some(Token::Input) => {
                self.advance();
                Ok(Expr::UserInput)
            }
            Some(tok @ (Token::Bool | Token::Int | Token::Float | Token::Complex | Token::Str | Token::Real | Token::Imag)) => {
                self.advance();
                self.expect(&Token::LeftParen)?;
                let expr = self.parse_expr()?;
                self.expect(&Token::RightParen)?;
                Ok(Expr::TypeConv {
                    to_type: type_keyword_name(&tok),
                    expr: Box::new(expr),
                })
            }
            Some(Token::LeftParen) => {
                self.advance();
                let expr = self.parse_expr()?;
                self.expect(&Token::RightParen)?;
                Ok(expr)
            }
            Some(Token::LeftBracket) => {
                let elements = self.parse_list_elements()?;
                Ok(Expr::List {
                    elements,
                    element_type: None,
                })
            }
            Some(Token::Ident(name)) => {
                self.advance();
                self.parse_ident_led(name)
            }
            other => Err(ParseError::new(self.current_line(), format!("unexpected token {other:?}"))),
        }
    }

    fn parse_ident_led(&mut self, name: String) -> ParseResult<Expr> {
        if self.peek_is(&Token::LeftParen) {
            self.advance();
            let args = self.parse_expr_list(&Token::RightParen)?;
            self.expect(&Token::RightParen)?;
            return Ok(Expr::FunctionCall { name, args });
        }
        self.parse_member_chain(Variable::from(name.as_str()))
    }

    /// Field access, method calls and list indexing off a base variable —
    /// shared between plain identifiers and `this` (§9: "chained field
    /// access through nested class instances" applies the same way whether
    /// the base is a local or the receiver).
    fn parse_member_chain(&mut self, variable: Variable) -> ParseResult<Expr> {
        let mut members = Vec::new();
        while self.peek_is(&Token::Dot) {
            self.advance();
            members.push(Variable::from(self.expect_ident()?.as_str()));
        }
        if !members.is_empty() && self.peek_is(&Token::LeftParen) {
            let method = members.pop().unwrap().name;
            self.advance();
            let args = self.parse_expr_list(&Token::RightParen)?;
            self.expect(&Token::RightParen)?;
            return Ok(Expr::MethodCall {
                name: variable,
                member_list: members,
                method,
                args,
            });
        }
        if self.peek_is(&Token::LeftBracket) {
            self.advance();
            let indexes = self.parse_expr_list(&Token::RightBracket)?;
            self.expect(&Token::RightBracket)?;
            return Ok(if members.is_empty() {
                Expr::ListIndex {
                    name: variable,
                    indexes,
                }
            } else {
                Expr::DataListIndex {
                    name: variable,
                    member_list: members,
                    indexes,
                }
            });
        }
        Ok(if members.is_empty() {
            Expr::Variable(variable)
        } else {
            Expr::DataMember {
                name: variable,
                member_list: members,
            }
        })
    }
}

fn type_keyword_name(tok: &Token) -> String {
    match tok {
        Token::Bool => "bool",
        Token::Int => "int",
        Token::Float => "float",
        Token::Complex => "complex",
        Token::Str => "str",
        Token::Real => "real",
        Token::Imag => "imag",
        _ => unreachable!(),
    }
    .to_string()
}

fn parse_number_literal(text: &str) -> Literal {
    if let Some(rest) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        return Literal::Int(i64::from_str_radix(rest, 16).unwrap_or(0));
    }
    if let Some(rest) = text.strip_prefix("0b").or_else(|| text.strip_prefix("0B")) {
        return Literal::Int(i64::from_str_radix(rest, 2).unwrap_or(0));
    }
    if let Some(rest) = text.strip_suffix(['j', 'J']) {
        let imag: f64 = rest.parse().unwrap_or(0.0);
        return Literal::Complex(0.0, imag);
    }
    if text.contains('.') || text.contains('e') || text.contains('E') {
        return Literal::Float(text.parse().unwrap_or(0.0));
    }
    match text.parse::<i64>() {
        Ok(v) => Literal::Int(v),
        Err(_) => Literal::Float(text.parse().unwrap_or(0.0)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_let_and_print() {
        let program = parse("let x = 1 + 2; print x;").unwrap();
        assert_eq!(program.statements.len(), 2);
        assert!(matches!(program.statements[0], Stmt::Init { mutable: false, .. }));
        assert!(matches!(program.statements[1], Stmt::Print(_)));
    }

    #[test]
    fn parses_if_else() {
        let program = parse("if x < 1 print 1; else print 2; endif").unwrap();
        match &program.statements[0] {
            Stmt::If {
                true_block, false_block, ..
            } => {
                assert_eq!(true_block.len(), 1);
                assert_eq!(false_block.len(), 1);
            }
            other => panic!("expected if, got {other:?}"),
        }
    }

    #[test]
    fn parses_field_chain_assignment() {
        let program = parse("d.b.a <- 9.9;").unwrap();
        assert!(matches!(program.statements[0], Stmt::DataAssign { .. }));
    }

    #[test]
    fn parses_list_index_and_assign() {
        let program = parse("let g: int <- [1, 2, 3]; g[1] <- 9;").unwrap();
        assert!(matches!(program.statements[0], Stmt::ListInit { .. }));
        assert!(matches!(program.statements[1], Stmt::ListAssign { .. }));
    }

    #[test]
    fn parses_function_and_call() {
        let program = parse("fn add(a, b) return a + b; endfn print add(1, 2);").unwrap();
        assert!(matches!(program.statements[0], Stmt::Function(_)));
        assert!(matches!(program.statements[1], Stmt::Print(_)));
    }

    #[test]
    fn parses_bang_and_question_operators() {
        let program = parse("let e = [1, 2]; print !e, ?e;").unwrap();
        let Stmt::Print(print_stmt) = &program.statements[1] else {
            panic!("expected print");
        };
        assert!(matches!(print_stmt.parts[0], PrintPart::Value(Expr::Unary { op: Operator::Bang, .. })));
    }

    #[test]
    fn parses_this_member_chain_and_assignment() {
        let program = parse("fn set(m) this.n <- m; endfn").unwrap();
        let Stmt::Function(def) = &program.statements[0] else {
            panic!("expected function");
        };
        assert!(matches!(
            &def.body[0],
            Stmt::DataAssign { name, member_list, .. } if name.name == "this" && member_list.len() == 1
        ));

        let program = parse("fn show() print this.n; endfn").unwrap();
        let Stmt::Function(def) = &program.statements[0] else {
            panic!("expected function");
        };
        let Stmt::Print(print_stmt) = &def.body[0] else {
            panic!("expected print");
        };
        assert!(matches!(
            print_stmt.parts[0],
            PrintPart::Value(Expr::DataMember { .. })
        ));
    }

    #[test]
    fn parses_comparison_chain() {
        let program = parse("print 1 < x < 10;").unwrap();
        let Stmt::Print(print_stmt) = &program.statements[0] else {
            panic!("expected print");
        };
        assert!(matches!(print_stmt.parts[0], PrintPart::Value(Expr::CompareChain { .. })));
    }
}
