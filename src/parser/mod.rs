use crate::ast::*;
use crate::error::{Error, Result, SourceLocation};
use crate::lexer::{Token, TokenKind};

/// Recursive-descent parser with a precedence-climbing expression ladder
pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, current: 0 }
    }

    /// Parse a complete program
    pub fn parse(&mut self) -> Result<Program> {
        let mut program = Program::new();

        self.skip_separators();

        while !self.is_at_end() {
            let location = self.current_location();

            if self.match_token(&TokenKind::Function) {
                let function = self.parse_function(location)?;
                if program.functions.iter().any(|f| f.name == function.name) {
                    return Err(Error::parser(
                        format!("function '{}' is already defined", function.name),
                        location,
                    ));
                }
                program.functions.push(function);
            } else if self.match_token(&TokenKind::Begin) {
                program.begin_blocks.push(self.parse_block()?);
            } else if self.match_token(&TokenKind::End) {
                program.end_blocks.push(self.parse_block()?);
            } else {
                let condition = if self.check(&TokenKind::LeftBrace) {
                    None
                } else {
                    Some(self.parse_expression()?)
                };
                program.blocks.push(self.parse_block()?.with_condition(condition));
            }

            self.skip_separators();
        }

        tracing::debug!(
            begin = program.begin_blocks.len(),
            blocks = program.blocks.len(),
            end = program.end_blocks.len(),
            functions = program.functions.len(),
            "parsed program"
        );
        Ok(program)
    }

    /// Parse a function definition; `function` is already consumed
    fn parse_function(&mut self, location: SourceLocation) -> Result<FunctionDef> {
        let name = self.expect_word("function name")?;
        self.expect(&TokenKind::LeftParen, "'(' after function name")?;

        let mut params = Vec::new();
        if !self.check(&TokenKind::RightParen) {
            params.push(self.parse_expression()?);
            while self.match_token(&TokenKind::Comma) {
                params.push(self.parse_expression()?);
            }
        }
        self.expect(&TokenKind::RightParen, "')' to close the parameter list")?;

        let body = self.parse_block()?;

        Ok(FunctionDef {
            name,
            params,
            body,
            location,
        })
    }

    /// Parse a block: a brace-delimited statement list, or exactly one statement
    fn parse_block(&mut self) -> Result<Block> {
        self.skip_separators();
        let location = self.current_location();

        if self.match_token(&TokenKind::LeftBrace) {
            self.skip_separators();

            let mut statements = Vec::new();
            while !self.check(&TokenKind::RightBrace) && !self.is_at_end() {
                statements.push(self.parse_statement()?);
                self.skip_separators();
            }

            self.expect(&TokenKind::RightBrace, "'}' to close the block")?;
            return Ok(Block::new(statements, location));
        }

        if matches!(
            self.peek_kind(),
            None | Some(TokenKind::RightBrace | TokenKind::Eof)
        ) {
            return Err(Error::parser("missing statement in block", location));
        }

        let statement = self.parse_statement()?;
        Ok(Block::new(vec![statement], location))
    }

    /// Parse a single statement
    fn parse_statement(&mut self) -> Result<Stmt> {
        let location = self.current_location();

        if self.match_token(&TokenKind::Continue) {
            return Ok(Stmt::Continue { location });
        }

        if self.match_token(&TokenKind::Break) {
            return Ok(Stmt::Break { location });
        }

        if self.match_token(&TokenKind::If) {
            return self.parse_if_statement(location);
        }

        if self.match_token(&TokenKind::For) {
            return self.parse_for_statement(location);
        }

        if self.match_token(&TokenKind::Delete) {
            return self.parse_delete_statement(location);
        }

        if self.match_token(&TokenKind::While) {
            return self.parse_while_statement(location);
        }

        if self.match_token(&TokenKind::Do) {
            return self.parse_do_while_statement(location);
        }

        if self.match_token(&TokenKind::Return) {
            let value = if self.can_start_expression() {
                Some(self.parse_expression()?)
            } else {
                None
            };
            return Ok(Stmt::Return { value, location });
        }

        let expr = self.parse_expression()?;
        Ok(Stmt::Expr(expr))
    }

    fn parse_if_statement(&mut self, location: SourceLocation) -> Result<Stmt> {
        self.expect(&TokenKind::LeftParen, "'(' after 'if'")?;
        let condition = self.parse_expression()?;
        self.expect(&TokenKind::RightParen, "')' after the if condition")?;

        let then_block = self.parse_block()?;

        // `else` may sit on a later line; only commit to the lookahead if it's there
        let saved_pos = self.current;
        self.skip_separators();
        let else_branch = if self.match_token(&TokenKind::Else) {
            self.skip_separators();
            let else_location = self.current_location();
            if self.match_token(&TokenKind::If) {
                Some(ElseBranch::If(Box::new(self.parse_if_statement(else_location)?)))
            } else {
                Some(ElseBranch::Block(self.parse_block()?))
            }
        } else {
            self.current = saved_pos;
            None
        };

        Ok(Stmt::If {
            condition,
            then_block,
            else_branch,
            location,
        })
    }

    fn parse_while_statement(&mut self, location: SourceLocation) -> Result<Stmt> {
        self.expect(&TokenKind::LeftParen, "'(' after 'while'")?;
        let condition = self.parse_expression()?;
        self.expect(&TokenKind::RightParen, "')' after the while condition")?;

        let body = self.parse_block()?;

        Ok(Stmt::While {
            condition,
            body,
            location,
        })
    }

    fn parse_for_statement(&mut self, location: SourceLocation) -> Result<Stmt> {
        self.expect(&TokenKind::LeftParen, "'(' after 'for'")?;

        // for (var in array)
        if let (Some(TokenKind::Word(var)), Some(TokenKind::In)) = (self.peek_kind(), self.peek_kind_at(1)) {
            let var = var.clone();
            self.advance();
            self.advance();
            let array = self.expect_word("array name after 'in'")?;
            self.expect(&TokenKind::RightParen, "')' after the for-in header")?;
            let body = self.parse_block()?;

            return Ok(Stmt::ForIn {
                var,
                array,
                body,
                location,
            });
        }

        let init = if !self.check(&TokenKind::Separator) {
            Some(self.parse_expression()?)
        } else {
            None
        };
        self.expect(&TokenKind::Separator, "';' after the for initializer")?;

        let condition = if !self.check(&TokenKind::Separator) {
            Some(self.parse_expression()?)
        } else {
            None
        };
        self.expect(&TokenKind::Separator, "';' after the for condition")?;

        let update = if !self.check(&TokenKind::RightParen) {
            Some(self.parse_expression()?)
        } else {
            None
        };
        self.expect(&TokenKind::RightParen, "')' after the for header")?;

        let body = self.parse_block()?;

        Ok(Stmt::For {
            init,
            condition,
            update,
            body,
            location,
        })
    }

    fn parse_do_while_statement(&mut self, location: SourceLocation) -> Result<Stmt> {
        let body = self.parse_block()?;
        self.skip_separators();
        self.expect(&TokenKind::While, "'while' after the do body")?;
        self.expect(&TokenKind::LeftParen, "'(' after 'while'")?;
        let condition = self.parse_expression()?;
        self.expect(&TokenKind::RightParen, "')' after the while condition")?;

        Ok(Stmt::DoWhile {
            body,
            condition,
            location,
        })
    }

    fn parse_delete_statement(&mut self, location: SourceLocation) -> Result<Stmt> {
        let array = self.expect_word("array name after 'delete'")?;

        let index = if self.match_token(&TokenKind::LeftBracket) {
            let index = self.parse_expression()?;
            self.expect(&TokenKind::RightBracket, "']' after the delete index")?;
            Some(index)
        } else {
            None
        };

        Ok(Stmt::Delete {
            array,
            index,
            location,
        })
    }

    /// Arguments of `print`/`printf`: a parenthesized list, or a
    /// comma-separated list running up to the end of the statement
    fn parse_print_args(&mut self) -> Result<Vec<Expr>> {
        let mut args = Vec::new();

        // `print (a, b)` vs `print (a) b`: the parentheses only delimit the
        // list when the statement ends right after them
        let saved_pos = self.current;
        if self.match_token(&TokenKind::LeftParen) {
            if !self.check(&TokenKind::RightParen) {
                args.push(self.parse_expression()?);
                while self.match_token(&TokenKind::Comma) {
                    args.push(self.parse_expression()?);
                }
            }
            self.expect(&TokenKind::RightParen, "')' to close the argument list")?;
            if self.at_statement_end() {
                return Ok(args);
            }
            self.current = saved_pos;
            args.clear();
        }

        if self.at_statement_end() {
            return Ok(args);
        }

        args.push(self.parse_expression()?);
        while self.match_token(&TokenKind::Comma) {
            args.push(self.parse_expression()?);
        }

        // The list runs to the end of the statement; nothing may continue
        // the expression around the call
        if !self.at_statement_end() && !self.check(&TokenKind::Else) {
            return Err(Error::parser(
                format!("expected end of statement after print arguments, found {}", describe(self.peek_kind())),
                self.current_location(),
            ));
        }
        Ok(args)
    }

    // ===== Expressions, lowest precedence first =====

    fn parse_expression(&mut self) -> Result<Expr> {
        self.parse_assignment()
    }

    fn parse_assignment(&mut self) -> Result<Expr> {
        let expr = self.parse_ternary()?;

        let location = self.current_location();
        let op = if self.match_token(&TokenKind::Assign) {
            Some(None)
        } else if self.match_token(&TokenKind::PlusAssign) {
            Some(Some(BinaryOp::Add))
        } else if self.match_token(&TokenKind::MinusAssign) {
            Some(Some(BinaryOp::Sub))
        } else if self.match_token(&TokenKind::StarAssign) {
            Some(Some(BinaryOp::Mul))
        } else if self.match_token(&TokenKind::SlashAssign) {
            Some(Some(BinaryOp::Div))
        } else if self.match_token(&TokenKind::PercentAssign) {
            Some(Some(BinaryOp::Mod))
        } else if self.match_token(&TokenKind::CaretAssign) {
            Some(Some(BinaryOp::Pow))
        } else {
            None
        };

        let Some(compound) = op else {
            return Ok(expr);
        };

        // Right-associative: a = b = c
        let value = self.parse_assignment()?;
        let value = match compound {
            None => value,
            Some(op) => Expr::Binary {
                left: Box::new(expr.clone()),
                op,
                right: Box::new(value),
                location,
            },
        };

        Ok(Expr::Assign {
            target: Box::new(expr),
            value: Box::new(value),
            location,
        })
    }

    fn parse_ternary(&mut self) -> Result<Expr> {
        let expr = self.parse_or()?;

        let location = self.current_location();
        if self.match_token(&TokenKind::Question) {
            let then_expr = self.parse_expression()?;
            self.expect(&TokenKind::Colon, "':' in conditional expression")?;
            let else_expr = self.parse_ternary()?;
            return Ok(Expr::Ternary {
                condition: Box::new(expr),
                then_expr: Box::new(then_expr),
                else_expr: Box::new(else_expr),
                location,
            });
        }

        Ok(expr)
    }

    fn parse_or(&mut self) -> Result<Expr> {
        let mut expr = self.parse_and()?;

        loop {
            let location = self.current_location();
            if !self.match_token(&TokenKind::Or) {
                break;
            }
            let right = self.parse_and()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                op: BinaryOp::Or,
                right: Box::new(right),
                location,
            };
        }

        Ok(expr)
    }

    fn parse_and(&mut self) -> Result<Expr> {
        let mut expr = self.parse_in()?;

        loop {
            let location = self.current_location();
            if !self.match_token(&TokenKind::And) {
                break;
            }
            let right = self.parse_in()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                op: BinaryOp::And,
                right: Box::new(right),
                location,
            };
        }

        Ok(expr)
    }

    /// `key in array`, left-associative; the array side is a bare primary
    fn parse_in(&mut self) -> Result<Expr> {
        let mut expr = self.parse_match()?;

        loop {
            let location = self.current_location();
            if !self.match_token(&TokenKind::In) {
                break;
            }
            let array = self.parse_primary()?;
            expr = Expr::In {
                key: Box::new(expr),
                array: Box::new(array),
                location,
            };
        }

        Ok(expr)
    }

    fn parse_match(&mut self) -> Result<Expr> {
        let expr = self.parse_comparison()?;

        let location = self.current_location();
        let negated = if self.match_token(&TokenKind::Match) {
            false
        } else if self.match_token(&TokenKind::NotMatch) {
            true
        } else {
            return Ok(expr);
        };

        match self.parse_comparison()? {
            Expr::Pattern(pattern, _) => Ok(Expr::Match {
                expr: Box::new(expr),
                pattern,
                negated,
                location,
            }),
            other => Err(Error::parser(
                "expected a pattern literal on the right of a match operator",
                other.location(),
            )),
        }
    }

    /// A single, non-chaining comparison
    fn parse_comparison(&mut self) -> Result<Expr> {
        let expr = self.parse_concat()?;

        let location = self.current_location();
        let op = if self.match_token(&TokenKind::Less) {
            BinaryOp::Lt
        } else if self.match_token(&TokenKind::LessEqual) {
            BinaryOp::Le
        } else if self.match_token(&TokenKind::NotEqual) {
            BinaryOp::Ne
        } else if self.match_token(&TokenKind::Equal) {
            BinaryOp::Eq
        } else if self.match_token(&TokenKind::Greater) {
            BinaryOp::Gt
        } else if self.match_token(&TokenKind::GreaterEqual) {
            BinaryOp::Ge
        } else {
            return Ok(expr);
        };

        let right = self.parse_concat()?;
        Ok(Expr::Binary {
            left: Box::new(expr),
            op,
            right: Box::new(right),
            location,
        })
    }

    fn parse_concat(&mut self) -> Result<Expr> {
        let mut expr = self.parse_additive()?;

        // Concatenation is implicit between adjacent expressions
        while self.can_start_concat_operand() {
            let location = expr.location();
            let right = self.parse_additive()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                op: BinaryOp::Concat,
                right: Box::new(right),
                location,
            };
        }

        Ok(expr)
    }

    fn can_start_concat_operand(&self) -> bool {
        matches!(
            self.peek_kind(),
            Some(
                TokenKind::Number(_)
                    | TokenKind::String(_)
                    | TokenKind::Word(_)
                    | TokenKind::Dollar
                    | TokenKind::LeftParen
                    | TokenKind::Not
                    | TokenKind::Increment
                    | TokenKind::Decrement
            )
        )
    }

    fn parse_additive(&mut self) -> Result<Expr> {
        let mut expr = self.parse_multiplicative()?;

        loop {
            let location = self.current_location();
            let op = if self.match_token(&TokenKind::Plus) {
                BinaryOp::Add
            } else if self.match_token(&TokenKind::Minus) {
                BinaryOp::Sub
            } else {
                break;
            };

            let right = self.parse_multiplicative()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                op,
                right: Box::new(right),
                location,
            };
        }

        Ok(expr)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr> {
        let mut expr = self.parse_power()?;

        loop {
            let location = self.current_location();
            let op = if self.match_token(&TokenKind::Star) {
                BinaryOp::Mul
            } else if self.match_token(&TokenKind::Slash) {
                BinaryOp::Div
            } else if self.match_token(&TokenKind::Percent) {
                BinaryOp::Mod
            } else {
                break;
            };

            let right = self.parse_power()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                op,
                right: Box::new(right),
                location,
            };
        }

        Ok(expr)
    }

    fn parse_power(&mut self) -> Result<Expr> {
        let expr = self.parse_unary()?;

        // Exponentiation is right-associative
        let location = self.current_location();
        if self.match_token(&TokenKind::Caret) {
            let right = self.parse_power()?;
            return Ok(Expr::Binary {
                left: Box::new(expr),
                op: BinaryOp::Pow,
                right: Box::new(right),
                location,
            });
        }

        Ok(expr)
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        let location = self.current_location();

        let op = if self.match_token(&TokenKind::Not) {
            UnaryOp::Not
        } else if self.match_token(&TokenKind::Minus) {
            UnaryOp::Neg
        } else if self.match_token(&TokenKind::Plus) {
            UnaryOp::Pos
        } else if self.match_token(&TokenKind::Increment) {
            let operand = self.parse_unary()?;
            return Ok(Expr::PreIncrement(Box::new(operand), location));
        } else if self.match_token(&TokenKind::Decrement) {
            let operand = self.parse_unary()?;
            return Ok(Expr::PreDecrement(Box::new(operand), location));
        } else {
            return self.parse_postfix();
        };

        let operand = self.parse_unary()?;
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
            location,
        })
    }

    fn parse_postfix(&mut self) -> Result<Expr> {
        let expr = self.parse_field()?;

        if !expr.is_lvalue() {
            return Ok(expr);
        }

        let location = self.current_location();
        if self.match_token(&TokenKind::Increment) {
            Ok(Expr::PostIncrement(Box::new(expr), location))
        } else if self.match_token(&TokenKind::Decrement) {
            Ok(Expr::PostDecrement(Box::new(expr), location))
        } else {
            Ok(expr)
        }
    }

    fn parse_field(&mut self) -> Result<Expr> {
        let location = self.current_location();
        if self.match_token(&TokenKind::Dollar) {
            let expr = self.parse_field()?;
            return Ok(Expr::Field(Box::new(expr), location));
        }

        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        let location = self.current_location();

        match self.peek_kind() {
            Some(TokenKind::Number(text) | TokenKind::String(text)) => {
                let text = text.clone();
                self.advance();
                return Ok(Expr::Constant(text, location));
            }
            Some(TokenKind::Pattern(pattern)) => {
                let pattern = pattern.clone();
                self.advance();
                return Ok(Expr::Pattern(pattern, location));
            }
            Some(TokenKind::Word(name)) => {
                let name = name.clone();
                self.advance();
                return self.parse_name(name, location);
            }
            _ => {}
        }

        if self.match_token(&TokenKind::LeftParen) {
            let expr = self.parse_expression()?;
            self.expect(&TokenKind::RightParen, "')' to close the parenthesized expression")?;
            return Ok(expr);
        }

        // Statement-shaped built-ins
        let builtin = match self.peek_kind() {
            Some(TokenKind::Print) => Some("print"),
            Some(TokenKind::Printf) => Some("printf"),
            Some(TokenKind::Getline) => Some("getline"),
            Some(TokenKind::Next) => Some("next"),
            Some(TokenKind::Nextfile) => Some("nextfile"),
            Some(TokenKind::Exit) => Some("exit"),
            _ => None,
        };
        if let Some(name) = builtin {
            self.advance();
            let args = match name {
                "print" | "printf" => self.parse_print_args()?,
                "exit" if self.can_start_expression() => vec![self.parse_expression()?],
                _ => Vec::new(),
            };
            if name == "printf" && args.is_empty() {
                return Err(Error::parser("printf requires a format argument", location));
            }
            return Ok(Expr::Call {
                name: name.to_string(),
                args,
                location,
            });
        }

        Err(Error::parser(
            format!("expected expression, found {}", describe(self.peek_kind())),
            location,
        ))
    }

    /// A word: function call, array element, or plain variable
    fn parse_name(&mut self, name: String, location: SourceLocation) -> Result<Expr> {
        if self.match_token(&TokenKind::LeftParen) {
            let mut args = Vec::new();
            if !self.check(&TokenKind::RightParen) {
                args.push(self.parse_expression()?);
                while self.match_token(&TokenKind::Comma) {
                    args.push(self.parse_expression()?);
                }
            }
            self.expect(&TokenKind::RightParen, "')' to close the argument list")?;
            return Ok(Expr::Call {
                name,
                args,
                location,
            });
        }

        // Bare `length` measures the record
        if name == "length" && !self.check(&TokenKind::LeftBracket) {
            return Ok(Expr::Call {
                name,
                args: Vec::new(),
                location,
            });
        }

        let index = if self.match_token(&TokenKind::LeftBracket) {
            let index = self.parse_expression()?;
            self.expect(&TokenKind::RightBracket, "']' after the array index")?;
            Some(Box::new(index))
        } else {
            None
        };

        Ok(Expr::Var {
            name,
            index,
            location,
        })
    }

    // ===== Helper methods =====

    fn peek_kind(&self) -> Option<&TokenKind> {
        self.peek_kind_at(0)
    }

    fn peek_kind_at(&self, offset: usize) -> Option<&TokenKind> {
        self.tokens.get(self.current + offset).map(|t| &t.kind)
    }

    fn current_location(&self) -> SourceLocation {
        self.tokens
            .get(self.current)
            .or_else(|| self.tokens.last())
            .map(|t| t.location)
            .unwrap_or_default()
    }

    fn is_at_end(&self) -> bool {
        matches!(self.peek_kind(), None | Some(TokenKind::Eof))
    }

    fn at_statement_end(&self) -> bool {
        matches!(
            self.peek_kind(),
            None | Some(TokenKind::Separator | TokenKind::RightBrace | TokenKind::Eof)
        )
    }

    fn check(&self, kind: &TokenKind) -> bool {
        self.peek_kind()
            .map(|k| std::mem::discriminant(k) == std::mem::discriminant(kind))
            .unwrap_or(false)
    }

    fn advance(&mut self) {
        if !self.is_at_end() {
            self.current += 1;
        }
    }

    fn match_token(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind, what: &str) -> Result<()> {
        if self.match_token(kind) {
            Ok(())
        } else {
            Err(Error::parser(
                format!("expected {}, found {}", what, describe(self.peek_kind())),
                self.current_location(),
            ))
        }
    }

    fn expect_word(&mut self, what: &str) -> Result<String> {
        if let Some(TokenKind::Word(name)) = self.peek_kind() {
            let name = name.clone();
            self.advance();
            Ok(name)
        } else {
            Err(Error::parser(
                format!("expected {}, found {}", what, describe(self.peek_kind())),
                self.current_location(),
            ))
        }
    }

    fn skip_separators(&mut self) {
        while self.match_token(&TokenKind::Separator) {}
    }

    fn can_start_expression(&self) -> bool {
        self.peek_kind().map(|k| k.can_start_expression()).unwrap_or(false)
    }
}

fn describe(kind: Option<&TokenKind>) -> String {
    match kind {
        None | Some(TokenKind::Eof) => "end of input".to_string(),
        Some(TokenKind::Separator) => "end of statement".to_string(),
        Some(kind) => format!("'{}'", kind),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;

    fn parse(source: &str) -> Result<Program> {
        let mut lexer = Lexer::new(source);
        let tokens = lexer.tokenize()?;
        let mut parser = Parser::new(tokens);
        parser.parse()
    }

    fn single_expr(source: &str) -> Expr {
        let program = parse(&format!("BEGIN {{ {} }}", source)).unwrap();
        match &program.begin_blocks[0].statements[0] {
            Stmt::Expr(expr) => expr.clone(),
            other => panic!("expected expression statement, got {other:?}"),
        }
    }

    #[test]
    fn test_program_sections() {
        let program = parse(
            "BEGIN { x = 1 }\nfunction f(a) { return a }\n$1 > 2 { print }\n{ y++ }\nEND { print x }",
        )
        .unwrap();
        assert_eq!(program.begin_blocks.len(), 1);
        assert_eq!(program.end_blocks.len(), 1);
        assert_eq!(program.functions.len(), 1);
        assert_eq!(program.blocks.len(), 2);
        assert!(program.blocks[0].condition.is_some());
        assert!(program.blocks[1].condition.is_none());
    }

    #[test]
    fn test_multiplication_binds_tighter() {
        let expr = single_expr("1 + 2 * 3");
        match expr {
            Expr::Binary { op: BinaryOp::Add, right, .. } => {
                assert!(matches!(*right, Expr::Binary { op: BinaryOp::Mul, .. }));
            }
            other => panic!("unexpected tree {other:?}"),
        }
    }

    #[test]
    fn test_power_is_right_associative() {
        let expr = single_expr("2 ^ 3 ^ 2");
        match expr {
            Expr::Binary { op: BinaryOp::Pow, left, right, .. } => {
                assert!(matches!(*left, Expr::Constant(ref c, _) if c == "2"));
                assert!(matches!(*right, Expr::Binary { op: BinaryOp::Pow, .. }));
            }
            other => panic!("unexpected tree {other:?}"),
        }
    }

    #[test]
    fn test_compound_assignment_desugars() {
        let expr = single_expr("x += 2");
        match expr {
            Expr::Assign { target, value, .. } => {
                assert_eq!(target.plain_name(), Some("x"));
                assert!(matches!(*value, Expr::Binary { op: BinaryOp::Add, .. }));
            }
            other => panic!("unexpected tree {other:?}"),
        }
    }

    #[test]
    fn test_concatenation() {
        let expr = single_expr(r#"a "-" $1"#);
        assert!(matches!(expr, Expr::Binary { op: BinaryOp::Concat, .. }));
    }

    #[test]
    fn test_in_and_match() {
        assert!(matches!(single_expr("k in arr"), Expr::In { .. }));
        assert!(matches!(
            single_expr("$0 !~ `^#`"),
            Expr::Match { negated: true, ref pattern, .. } if pattern == "^#"
        ));
    }

    #[test]
    fn test_match_requires_pattern() {
        let err = parse(r#"BEGIN { x ~ "abc" }"#).unwrap_err();
        assert!(matches!(err, Error::Parser { .. }));
    }

    #[test]
    fn test_postfix_and_prefix() {
        assert!(matches!(single_expr("i++"), Expr::PostIncrement(..)));
        assert!(matches!(single_expr("--i"), Expr::PreDecrement(..)));
        assert!(matches!(single_expr("$2--"), Expr::PostDecrement(..)));
    }

    #[test]
    fn test_print_forms() {
        let expr = single_expr(r#"print "a", b"#);
        assert!(matches!(expr, Expr::Call { ref name, ref args, .. } if name == "print" && args.len() == 2));

        let expr = single_expr(r#"printf("%s", x)"#);
        assert!(matches!(expr, Expr::Call { ref name, ref args, .. } if name == "printf" && args.len() == 2));

        let expr = single_expr("print");
        assert!(matches!(expr, Expr::Call { ref args, .. } if args.is_empty()));

        // Leading parentheses that don't close the statement are a grouping
        let expr = single_expr("print (a) b");
        assert!(matches!(
            expr,
            Expr::Call { ref args, .. } if args.len() == 1
                && matches!(args[0], Expr::Binary { op: BinaryOp::Concat, .. })
        ));
    }

    #[test]
    fn test_print_arguments_end_the_statement() {
        assert!(matches!(single_expr("print 1 < 2"), Expr::Call { ref args, .. } if args.len() == 1));

        let err = parse("BEGIN { print 1 < 2 < 3 }").unwrap_err();
        assert!(format!("{}", err).contains("end of statement after print arguments"));
        assert!(parse("BEGIN { x = 1 < 2 < 3 }").is_err());

        let program = parse("BEGIN { if (x) print 1\n else print 2 }").unwrap();
        assert!(matches!(program.begin_blocks[0].statements[0], Stmt::If { else_branch: Some(_), .. }));
    }

    #[test]
    fn test_bare_length_is_a_call() {
        assert!(matches!(single_expr("length"), Expr::Call { ref name, ref args, .. } if name == "length" && args.is_empty()));
        assert!(matches!(single_expr("n = length + 1"), Expr::Assign { .. }));
    }

    #[test]
    fn test_exit_and_getline() {
        assert!(matches!(single_expr("exit 3"), Expr::Call { ref args, .. } if args.len() == 1));
        assert!(matches!(single_expr("exit"), Expr::Call { ref args, .. } if args.is_empty()));
        assert!(matches!(single_expr("getline"), Expr::Call { ref name, .. } if name == "getline"));
    }

    #[test]
    fn test_if_else_chain() {
        let program = parse("BEGIN { if (x) a = 1\n else if (y) a = 2\n else a = 3 }").unwrap();
        match &program.begin_blocks[0].statements[0] {
            Stmt::If { else_branch: Some(ElseBranch::If(inner)), .. } => {
                assert!(matches!(
                    inner.as_ref(),
                    Stmt::If { else_branch: Some(ElseBranch::Block(_)), .. }
                ));
            }
            other => panic!("unexpected statement {other:?}"),
        }
    }

    #[test]
    fn test_for_forms() {
        let program = parse("BEGIN { for (k in arr) n++; for (;;) break }").unwrap();
        let statements = &program.begin_blocks[0].statements;
        assert!(matches!(&statements[0], Stmt::ForIn { var, array, .. } if var == "k" && array == "arr"));
        assert!(matches!(
            &statements[1],
            Stmt::For { init: None, condition: None, update: None, .. }
        ));
    }

    #[test]
    fn test_delete_forms() {
        let program = parse("BEGIN { delete a[1]; delete a }").unwrap();
        let statements = &program.begin_blocks[0].statements;
        assert!(matches!(&statements[0], Stmt::Delete { index: Some(_), .. }));
        assert!(matches!(&statements[1], Stmt::Delete { index: None, .. }));

        assert!(parse("BEGIN { delete 5 }").is_err());
    }

    #[test]
    fn test_function_def() {
        let program = parse("function add(a, b) { return a + b }").unwrap();
        assert_eq!(program.functions[0].name, "add");
        let names: Vec<_> = program.functions[0]
            .params
            .iter()
            .filter_map(|p| p.plain_name())
            .collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_duplicate_function() {
        let err = parse("function f() { }\nfunction f() { }").unwrap_err();
        assert!(format!("{}", err).contains("already defined"));
    }

    #[test]
    fn test_empty_single_statement_block() {
        let err = parse("BEGIN { if (x) }").unwrap_err();
        assert!(format!("{}", err).contains("missing statement in block"));
    }

    #[test]
    fn test_missing_paren() {
        let err = parse("BEGIN { while (x { } }").unwrap_err();
        assert!(matches!(err, Error::Parser { .. }));
    }
}
