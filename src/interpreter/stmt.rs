use std::io::Write;

use crate::ast::*;
use crate::error::Result;
use crate::value::Value;

use super::Interpreter;

/// Result of executing a statement
#[derive(Debug)]
pub enum StmtResult {
    Normal,
    Break,
    Continue,
    Return(Value),
}

impl<'a> Interpreter<'a> {
    pub fn execute_block<W: Write>(&mut self, block: &Block, output: &mut W) -> Result<StmtResult> {
        for stmt in &block.statements {
            if self.halted {
                break;
            }
            match self.execute_stmt(stmt, output)? {
                StmtResult::Normal => continue,
                other => return Ok(other),
            }
        }
        Ok(StmtResult::Normal)
    }

    pub fn execute_stmt<W: Write>(&mut self, stmt: &Stmt, output: &mut W) -> Result<StmtResult> {
        match stmt {
            Stmt::Expr(expr) => {
                self.eval_expr(expr, output)?;
                Ok(StmtResult::Normal)
            }

            Stmt::If {
                condition,
                then_block,
                else_branch,
                ..
            } => {
                if self.eval_expr(condition, output)?.is_truthy() {
                    self.execute_block(then_block, output)
                } else {
                    match else_branch {
                        Some(ElseBranch::If(stmt)) => self.execute_stmt(stmt, output),
                        Some(ElseBranch::Block(block)) => self.execute_block(block, output),
                        None => Ok(StmtResult::Normal),
                    }
                }
            }

            Stmt::While { condition, body, .. } => {
                while !self.halted && self.eval_expr(condition, output)?.is_truthy() {
                    match self.execute_block(body, output)? {
                        StmtResult::Normal | StmtResult::Continue => continue,
                        StmtResult::Break => break,
                        StmtResult::Return(v) => return Ok(StmtResult::Return(v)),
                    }
                }
                Ok(StmtResult::Normal)
            }

            Stmt::DoWhile { body, condition, .. } => {
                loop {
                    match self.execute_block(body, output)? {
                        StmtResult::Normal | StmtResult::Continue => {}
                        StmtResult::Break => break,
                        StmtResult::Return(v) => return Ok(StmtResult::Return(v)),
                    }
                    if self.halted || !self.eval_expr(condition, output)?.is_truthy() {
                        break;
                    }
                }
                Ok(StmtResult::Normal)
            }

            Stmt::For {
                init,
                condition,
                update,
                body,
                ..
            } => {
                if let Some(init) = init {
                    self.eval_expr(init, output)?;
                }

                while !self.halted {
                    if let Some(cond) = condition {
                        if !self.eval_expr(cond, output)?.is_truthy() {
                            break;
                        }
                    }

                    match self.execute_block(body, output)? {
                        StmtResult::Normal | StmtResult::Continue => {}
                        StmtResult::Break => break,
                        StmtResult::Return(v) => return Ok(StmtResult::Return(v)),
                    }

                    if let Some(update) = update {
                        self.eval_expr(update, output)?;
                    }
                }
                Ok(StmtResult::Normal)
            }

            Stmt::ForIn {
                var,
                array,
                body,
                location,
            } => {
                // Snapshot the keys so the body may modify the array
                let keys = self.array_keys(array, *location)?;

                for key in keys {
                    if self.halted {
                        break;
                    }
                    self.set_scalar(var, Value::from(key), *location)?;
                    match self.execute_block(body, output)? {
                        StmtResult::Normal | StmtResult::Continue => {}
                        StmtResult::Break => break,
                        StmtResult::Return(v) => return Ok(StmtResult::Return(v)),
                    }
                }
                Ok(StmtResult::Normal)
            }

            Stmt::Break { .. } => Ok(StmtResult::Break),

            Stmt::Continue { .. } => Ok(StmtResult::Continue),

            Stmt::Return { value, .. } => {
                let v = match value {
                    Some(expr) => self.eval_expr(expr, output)?,
                    None => Value::default(),
                };
                Ok(StmtResult::Return(v))
            }

            Stmt::Delete {
                array,
                index,
                location,
            } => {
                match index {
                    Some(index) => {
                        let key = self.eval_expr(index, output)?;
                        self.delete(array, Some(key.as_str()), *location)?;
                    }
                    None => self.delete(array, None, *location)?,
                }
                Ok(StmtResult::Normal)
            }
        }
    }
}
