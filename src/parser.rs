use crate::{
    error::{parser_error, Result},
    tokenizer::{FileLocation, Lexer, Token, TokenKind},
};
use log::debug;
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub expr_type: ExprType,
    pub location: FileLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprType {
    Number(f64),
    Identifier(String),
    Unary {
        operator: UnaryOp,
        target: Box<Expr>,
    },
    Binary {
        left: Box<Expr>,
        operator: BinaryOp,
        right: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        arguments: Vec<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Pos,
    Neg,
    Abs,
}

impl UnaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            UnaryOp::Pos => "'+'",
            UnaryOp::Neg => "'-'",
            UnaryOp::Abs => "'|...|'",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    FloorDiv,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Pow => "**",
            BinaryOp::FloorDiv => "//",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub stmt_type: StmtType,
    pub location: FileLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtType {
    Var {
        name: String,
        initializer: Option<Expr>,
    },
    Return(Option<Expr>),
    Function(Rc<FunctionDecl>),
    Block(Block),
    Expression(Expr),
}

/// Shared between the AST and every function value created from it.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub name: String,
    pub params: Vec<String>,
    pub body: Block,
}

/// An ordered statement list. The program root is a block without braces.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub statements: Vec<Stmt>,
    pub location: FileLocation,
}

pub fn parse(source: &str) -> Result<Block> {
    Parser::new(source).parse_program()
}

pub struct Parser<'src> {
    lexer: Lexer<'src>,
}

impl<'src> Parser<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            lexer: Lexer::new(source),
        }
    }

    pub fn parse_program(&mut self) -> Result<Block> {
        let location = self.lexer.location();
        let mut statements = Vec::new();

        loop {
            self.skip_separators()?;
            if self.matches(&TokenKind::EOF)? {
                break;
            }
            statements.push(self.parse_statement()?);
        }

        debug!("parsed {} top-level statements", statements.len());
        Ok(Block {
            statements,
            location,
        })
    }

    fn peek(&mut self) -> Result<&Token> {
        self.lexer.peek()
    }

    fn next(&mut self) -> Result<Token> {
        self.lexer.next()
    }

    fn matches(&mut self, kind: &TokenKind) -> Result<bool> {
        Ok(&self.peek()?.kind == kind)
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token> {
        let token = self.next()?;
        if token.kind != kind {
            return parser_error(
                &format!("Expected {}, found {}", kind, token.kind),
                token.location,
            );
        }
        Ok(token)
    }

    fn expect_identifier(&mut self, what: &str) -> Result<String> {
        let token = self.next()?;
        match token.kind {
            TokenKind::Identifier(name) => Ok(name),
            kind => parser_error(
                &format!("Expected {}, found {}", what, kind),
                token.location,
            ),
        }
    }

    fn skip_separators(&mut self) -> Result<()> {
        while self.matches(&TokenKind::Semicolon)? {
            self.next()?;
        }
        Ok(())
    }

    fn parse_statement(&mut self) -> Result<Stmt> {
        match self.peek()?.kind {
            TokenKind::Var => self.parse_var(),
            TokenKind::Return => self.parse_return(),
            TokenKind::LeftBrace => {
                let block = self.parse_block()?;
                Ok(Stmt {
                    location: block.location,
                    stmt_type: StmtType::Block(block),
                })
            }
            TokenKind::Func => self.parse_function(),
            _ => {
                let expr = self.parse_expression()?;
                Ok(Stmt {
                    location: expr.location,
                    stmt_type: StmtType::Expression(expr),
                })
            }
        }
    }

    fn parse_var(&mut self) -> Result<Stmt> {
        let location = self.expect(TokenKind::Var)?.location;
        let name = self.expect_identifier("variable name after 'var'")?;

        let initializer = if self.matches(&TokenKind::Equal)? {
            self.next()?;
            Some(self.parse_expression()?)
        } else {
            None
        };

        Ok(Stmt {
            stmt_type: StmtType::Var { name, initializer },
            location,
        })
    }

    fn parse_return(&mut self) -> Result<Stmt> {
        let location = self.expect(TokenKind::Return)?.location;

        // the value must start on the same line as the keyword
        let next = self.peek()?;
        let has_value = next.location.line == location.line
            && !matches!(
                next.kind,
                TokenKind::RightBrace | TokenKind::Semicolon | TokenKind::EOF
            );

        let value = if has_value {
            Some(self.parse_expression()?)
        } else {
            None
        };

        Ok(Stmt {
            stmt_type: StmtType::Return(value),
            location,
        })
    }

    fn parse_block(&mut self) -> Result<Block> {
        let location = self.expect(TokenKind::LeftBrace)?.location;
        let mut statements = Vec::new();

        loop {
            self.skip_separators()?;
            let token = self.peek()?;
            if token.kind == TokenKind::EOF {
                return parser_error(
                    "Expected '}' to close block, found end of input",
                    token.location,
                );
            }
            if token.kind == TokenKind::RightBrace {
                self.next()?;
                break;
            }
            statements.push(self.parse_statement()?);
        }

        Ok(Block {
            statements,
            location,
        })
    }

    fn parse_function(&mut self) -> Result<Stmt> {
        let location = self.expect(TokenKind::Func)?.location;
        let name = self.expect_identifier("function name after 'func'")?;
        self.expect(TokenKind::LeftParen)?;

        let mut params = Vec::new();
        if self.matches(&TokenKind::RightParen)? {
            self.next()?;
        } else {
            loop {
                params.push(self.expect_identifier("parameter name")?);

                let token = self.next()?;
                match token.kind {
                    TokenKind::Comma => continue,
                    TokenKind::RightParen => break,
                    kind => {
                        return parser_error(
                            &format!("Expected ',' or ')' after parameter, found {}", kind),
                            token.location,
                        )
                    }
                }
            }
        }

        let body = self.parse_block()?;

        Ok(Stmt {
            stmt_type: StmtType::Function(Rc::new(FunctionDecl { name, params, body })),
            location,
        })
    }

    pub fn parse_expression(&mut self) -> Result<Expr> {
        self.parse_binary()
    }

    // Every binary operator shares one precedence level and associates left
    // to right in source order.
    fn parse_binary(&mut self) -> Result<Expr> {
        let mut left = self.parse_unary()?;

        loop {
            let operator = match self.peek()?.kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::StarStar => BinaryOp::Pow,
                TokenKind::SlashSlash => BinaryOp::FloorDiv,
                _ => break,
            };
            self.next()?;

            let right = self.parse_unary()?;
            left = Expr {
                location: left.location,
                expr_type: ExprType::Binary {
                    left: Box::new(left),
                    operator,
                    right: Box::new(right),
                },
            };
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        let operator = match self.peek()?.kind {
            TokenKind::Plus => UnaryOp::Pos,
            TokenKind::Minus => UnaryOp::Neg,
            TokenKind::Pipe => UnaryOp::Abs,
            _ => return self.parse_call(),
        };
        let location = self.next()?.location;

        let target = match operator {
            UnaryOp::Abs => {
                let inner = self.parse_expression()?;
                self.expect(TokenKind::Pipe)?;
                inner
            }
            UnaryOp::Pos | UnaryOp::Neg => self.parse_unary()?,
        };

        Ok(Expr {
            expr_type: ExprType::Unary {
                operator,
                target: Box::new(target),
            },
            location,
        })
    }

    fn parse_call(&mut self) -> Result<Expr> {
        let callee = self.parse_primary()?;
        if !self.matches(&TokenKind::LeftParen)? {
            return Ok(callee);
        }
        self.next()?;

        let mut arguments = Vec::new();
        if self.matches(&TokenKind::RightParen)? {
            self.next()?;
        } else {
            loop {
                arguments.push(self.parse_expression()?);

                let token = self.next()?;
                match token.kind {
                    TokenKind::Comma => continue,
                    TokenKind::RightParen => break,
                    kind => {
                        return parser_error(
                            &format!("Expected ',' or ')' after argument, found {}", kind),
                            token.location,
                        )
                    }
                }
            }
        }

        Ok(Expr {
            location: callee.location,
            expr_type: ExprType::Call {
                callee: Box::new(callee),
                arguments,
            },
        })
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        let token = self.next()?;
        let expr_type = match token.kind {
            TokenKind::Identifier(name) => ExprType::Identifier(name),
            TokenKind::Number(n) => ExprType::Number(n),
            TokenKind::LeftParen => {
                let inner = self.parse_expression()?;
                self.expect(TokenKind::RightParen)?;
                return Ok(inner);
            }
            TokenKind::Error(c) => {
                return parser_error(&format!("Unexpected character '{}'", c), token.location)
            }
            kind => {
                return parser_error(
                    &format!("Expected an expression, found {}", kind),
                    token.location,
                )
            }
        };

        Ok(Expr {
            expr_type,
            location: token.location,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn parse_str(input: &str) -> Result<Block> {
        parse(input)
    }

    fn single_expr(input: &str) -> Result<ExprType> {
        let program = parse_str(input)?;
        assert_eq!(program.statements.len(), 1);
        match &program.statements[0].stmt_type {
            StmtType::Expression(expr) => Ok(expr.expr_type.clone()),
            other => panic!("Expected expression statement, got {:?}", other),
        }
    }

    #[test]
    fn test_literals() -> Result<()> {
        assert!(matches!(single_expr("42")?, ExprType::Number(n) if n == 42.0));
        assert!(matches!(single_expr("x")?, ExprType::Identifier(name) if name == "x"));
        assert!(matches!(single_expr("(((7)))")?, ExprType::Number(n) if n == 7.0));
        Ok(())
    }

    #[test]
    fn test_binary_operators_share_one_precedence() -> Result<()> {
        // 2 + 3 * 4 groups as (2 + 3) * 4
        if let ExprType::Binary {
            left,
            operator,
            right,
        } = single_expr("2 + 3 * 4")?
        {
            assert_eq!(operator, BinaryOp::Mul);
            assert!(matches!(right.expr_type, ExprType::Number(n) if n == 4.0));
            assert!(matches!(
                left.expr_type,
                ExprType::Binary {
                    operator: BinaryOp::Add,
                    ..
                }
            ));
        } else {
            panic!("Expected binary expression");
        }
        Ok(())
    }

    #[test]
    fn test_unary_expressions() -> Result<()> {
        if let ExprType::Binary { left, operator, .. } = single_expr("-7 // 2")? {
            assert_eq!(operator, BinaryOp::FloorDiv);
            assert!(matches!(
                left.expr_type,
                ExprType::Unary {
                    operator: UnaryOp::Neg,
                    ..
                }
            ));
        } else {
            panic!("Expected binary expression");
        }

        if let ExprType::Unary { operator, target } = single_expr("|1 - 6|")? {
            assert_eq!(operator, UnaryOp::Abs);
            assert!(matches!(target.expr_type, ExprType::Binary { .. }));
        } else {
            panic!("Expected unary expression");
        }

        assert!(matches!(
            single_expr("+-x")?,
            ExprType::Unary {
                operator: UnaryOp::Pos,
                ..
            }
        ));
        Ok(())
    }

    #[test]
    fn test_calls() -> Result<()> {
        if let ExprType::Call { callee, arguments } = single_expr("max(1, a + 2, f())")? {
            assert!(matches!(callee.expr_type, ExprType::Identifier(ref n) if n == "max"));
            assert_eq!(arguments.len(), 3);
            assert!(matches!(
                arguments[2].expr_type,
                ExprType::Call { ref arguments, .. } if arguments.is_empty()
            ));
        } else {
            panic!("Expected call expression");
        }
        Ok(())
    }

    #[test]
    fn test_declarations() -> Result<()> {
        let program = parse_str("var x = 1\nvar y\nfunc add(a, b) { return a + b }")?;
        assert_eq!(program.statements.len(), 3);

        assert!(matches!(
            &program.statements[0].stmt_type,
            StmtType::Var { name, initializer: Some(_) } if name == "x"
        ));
        assert!(matches!(
            &program.statements[1].stmt_type,
            StmtType::Var { name, initializer: None } if name == "y"
        ));

        if let StmtType::Function(decl) = &program.statements[2].stmt_type {
            assert_eq!(decl.name, "add");
            assert_eq!(decl.params, vec!["a", "b"]);
            assert_eq!(decl.body.statements.len(), 1);
            assert!(matches!(
                decl.body.statements[0].stmt_type,
                StmtType::Return(Some(_))
            ));
        } else {
            panic!("Expected function declaration");
        }
        Ok(())
    }

    #[test]
    fn test_return_is_line_sensitive() -> Result<()> {
        let program = parse_str("func f() {\n  return\n  5\n}")?;
        if let StmtType::Function(decl) = &program.statements[0].stmt_type {
            assert_eq!(decl.body.statements.len(), 2);
            assert!(matches!(
                decl.body.statements[0].stmt_type,
                StmtType::Return(None)
            ));
            assert!(matches!(
                decl.body.statements[1].stmt_type,
                StmtType::Expression(_)
            ));
        } else {
            panic!("Expected function declaration");
        }

        let program = parse_str("{ return }")?;
        if let StmtType::Block(block) = &program.statements[0].stmt_type {
            assert!(matches!(block.statements[0].stmt_type, StmtType::Return(None)));
        } else {
            panic!("Expected block");
        }
        Ok(())
    }

    #[test]
    fn test_separators_and_nested_blocks() -> Result<()> {
        let program = parse_str("var x = 1; { var x = 2; { x } };;")?;
        assert_eq!(program.statements.len(), 2);

        if let StmtType::Block(outer) = &program.statements[1].stmt_type {
            assert_eq!(outer.statements.len(), 2);
            assert!(matches!(outer.statements[1].stmt_type, StmtType::Block(_)));
        } else {
            panic!("Expected block");
        }
        Ok(())
    }

    #[test]
    fn test_locations() -> Result<()> {
        let program = parse_str("var a = 1\n  a + 2")?;
        let stmt = &program.statements[1];
        assert_eq!(stmt.location.line, 2);
        assert_eq!(stmt.location.column, 3);
        Ok(())
    }

    #[test]
    fn test_error_cases() {
        for source in [
            "var",
            "var 1",
            "var x =",
            "func (a) {}",
            "func f(a, ) {}",
            "func f(a b) {}",
            "func f(a)",
            "f(1, )",
            "f(1 2)",
            "(1 + 2",
            "|1 + 2",
            "{ 1",
            "1 +",
            "1 @ 2",
            ")",
        ] {
            assert!(
                matches!(parse_str(source), Err(Error::Parse { .. })),
                "{:?} should not parse",
                source
            );
        }
    }

    #[test]
    fn test_error_messages_name_the_token() {
        match parse_str("f(1 2)") {
            Err(Error::Parse { message, location }) => {
                assert_eq!(message, "Expected ',' or ')' after argument, found number 2");
                assert_eq!(location.column, 5);
            }
            other => panic!("Expected parse error, got {:?}", other),
        }

        match parse_str("1 @ 2") {
            Err(Error::Parse { message, .. }) => {
                // the binary loop stops at '@' and the next statement trips on it
                assert_eq!(message, "Unexpected character '@'");
            }
            other => panic!("Expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_lex_errors_propagate() {
        assert!(matches!(parse_str("var x = 1.2.3"), Err(Error::Lex { .. })));
    }
}
