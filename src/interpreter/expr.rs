use std::cmp::Ordering;
use std::io::Write;

use crate::ast::*;
use crate::error::{Error, Result, SourceLocation};
use crate::value::{Value, compare_values};

use super::Interpreter;

/// A resolved assignment target: any index expression has already been evaluated
enum LValue {
    Scalar(String),
    Element(String, String),
    Field(String),
}

impl<'a> Interpreter<'a> {
    pub fn eval_expr<W: Write>(&mut self, expr: &Expr, output: &mut W) -> Result<Value> {
        match expr {
            Expr::Constant(text, _) => Ok(Value::from(text.as_str())),

            Expr::Pattern(_, location) => Err(Error::runtime_at(
                "pattern used outside a match context",
                *location,
            )),

            Expr::Var {
                name,
                index: None,
                location,
            } => self.get_scalar(name, *location),

            Expr::Var {
                name,
                index: Some(index),
                location,
            } => {
                let key = self.eval_expr(index, output)?;
                self.get_element(name, key.as_str(), *location)
            }

            Expr::Field(index, location) => {
                let index = self.eval_expr(index, output)?;
                let name = self.field_name(&index, *location)?;
                Ok(self.get_field(&name))
            }

            Expr::Binary {
                left,
                op,
                right,
                location,
            } => self.eval_binary(*op, left, right, *location, output),

            Expr::Unary { op, operand, .. } => {
                let v = self.eval_expr(operand, output)?;
                Ok(match op {
                    UnaryOp::Neg => Value::from_number(-v.to_number()),
                    UnaryOp::Pos => Value::from_number(v.to_number()),
                    UnaryOp::Not => Value::from_bool(!v.is_truthy()),
                })
            }

            Expr::Assign {
                target,
                value,
                location,
            } => {
                let lvalue = self.resolve_lvalue(target, output)?;
                let value = self.eval_expr(value, output)?;
                self.write_lvalue(&lvalue, value.clone(), *location)?;
                Ok(value)
            }

            Expr::PreIncrement(target, location) => self.increment(target, 1.0, true, *location, output),
            Expr::PreDecrement(target, location) => self.increment(target, -1.0, true, *location, output),
            Expr::PostIncrement(target, location) => self.increment(target, 1.0, false, *location, output),
            Expr::PostDecrement(target, location) => self.increment(target, -1.0, false, *location, output),

            Expr::Ternary {
                condition,
                then_expr,
                else_expr,
                ..
            } => {
                if self.eval_expr(condition, output)?.is_truthy() {
                    self.eval_expr(then_expr, output)
                } else {
                    self.eval_expr(else_expr, output)
                }
            }

            Expr::Call {
                name,
                args,
                location,
            } => self.call_function(name, args, *location, output),

            Expr::In {
                key,
                array,
                location,
            } => {
                let Some(name) = array.plain_name() else {
                    return Err(Error::runtime_at(
                        "right side of 'in' must be an array name",
                        array.location(),
                    ));
                };
                let key = self.eval_expr(key, output)?;
                Ok(Value::from_bool(self.array_contains(name, key.as_str(), *location)?))
            }

            Expr::Match {
                expr,
                pattern,
                negated,
                ..
            } => {
                let text = self.eval_expr(expr, output)?;
                let matched = self.regex(pattern)?.is_match(text.as_str());
                Ok(Value::from_bool(matched != *negated))
            }
        }
    }

    fn eval_binary<W: Write>(
        &mut self,
        op: BinaryOp,
        left: &Expr,
        right: &Expr,
        location: SourceLocation,
        output: &mut W,
    ) -> Result<Value> {
        // Short-circuit evaluation for logical operators
        match op {
            BinaryOp::And => {
                let l = self.eval_expr(left, output)?;
                if !l.is_truthy() {
                    return Ok(Value::from_bool(false));
                }
                let r = self.eval_expr(right, output)?;
                return Ok(Value::from_bool(r.is_truthy()));
            }
            BinaryOp::Or => {
                let l = self.eval_expr(left, output)?;
                if l.is_truthy() {
                    return Ok(Value::from_bool(true));
                }
                let r = self.eval_expr(right, output)?;
                return Ok(Value::from_bool(r.is_truthy()));
            }
            _ => {}
        }

        let l = self.eval_expr(left, output)?;
        let r = self.eval_expr(right, output)?;

        let result = match op {
            BinaryOp::Concat => {
                let mut s = l.into_string();
                s.push_str(r.as_str());
                Value::from(s)
            }

            BinaryOp::Lt => Value::from_bool(compare_values(&l, &r) == Ordering::Less),
            BinaryOp::Le => Value::from_bool(compare_values(&l, &r) != Ordering::Greater),
            BinaryOp::Gt => Value::from_bool(compare_values(&l, &r) == Ordering::Greater),
            BinaryOp::Ge => Value::from_bool(compare_values(&l, &r) != Ordering::Less),
            BinaryOp::Eq => Value::from_bool(compare_values(&l, &r) == Ordering::Equal),
            BinaryOp::Ne => Value::from_bool(compare_values(&l, &r) != Ordering::Equal),

            _ => Value::from_number(arithmetic(op, l.to_number(), r.to_number(), location)?),
        };

        Ok(result)
    }

    fn resolve_lvalue<W: Write>(&mut self, target: &Expr, output: &mut W) -> Result<LValue> {
        match target {
            Expr::Var {
                name, index: None, ..
            } => Ok(LValue::Scalar(name.clone())),
            Expr::Var {
                name,
                index: Some(index),
                ..
            } => {
                let key = self.eval_expr(index, output)?;
                Ok(LValue::Element(name.clone(), key.into_string()))
            }
            Expr::Field(index, location) => {
                let index = self.eval_expr(index, output)?;
                Ok(LValue::Field(self.field_name(&index, *location)?))
            }
            other => Err(Error::runtime_at(
                "invalid assignment target",
                other.location(),
            )),
        }
    }

    fn read_lvalue(&mut self, lvalue: &LValue, location: SourceLocation) -> Result<Value> {
        match lvalue {
            LValue::Scalar(name) => self.get_scalar(name, location),
            LValue::Element(name, key) => self.get_element(name, key, location),
            LValue::Field(name) => Ok(self.get_field(name)),
        }
    }

    fn write_lvalue(&mut self, lvalue: &LValue, value: Value, location: SourceLocation) -> Result<()> {
        match lvalue {
            LValue::Scalar(name) => self.set_scalar(name, value, location),
            LValue::Element(name, key) => self.set_element(name, key.clone(), value, location),
            LValue::Field(name) => {
                self.set_field(name, value);
                Ok(())
            }
        }
    }

    /// `++`/`--`: the target is resolved once; prefix forms yield the new
    /// value, postfix forms the old one
    fn increment<W: Write>(
        &mut self,
        target: &Expr,
        delta: f64,
        prefix: bool,
        location: SourceLocation,
        output: &mut W,
    ) -> Result<Value> {
        let lvalue = self.resolve_lvalue(target, output)?;
        let old = self.read_lvalue(&lvalue, location)?.to_number();
        let new = old + delta;
        self.write_lvalue(&lvalue, Value::from_number(new), location)?;
        Ok(Value::from_number(if prefix { new } else { old }))
    }
}

fn arithmetic(op: BinaryOp, l: f64, r: f64, location: SourceLocation) -> Result<f64> {
    Ok(match op {
        BinaryOp::Add => l + r,
        BinaryOp::Sub => l - r,
        BinaryOp::Mul => l * r,
        BinaryOp::Div => {
            if r == 0.0 {
                return Err(Error::runtime_at("division by zero", location));
            }
            l / r
        }
        BinaryOp::Mod => {
            if r == 0.0 {
                return Err(Error::runtime_at("division by zero in %", location));
            }
            l % r
        }
        BinaryOp::Pow => l.powf(r),
        _ => unreachable!("not an arithmetic operator: {:?}", op),
    })
}

#[cfg(test)]
mod tests {
    use crate::error::Error;
    use crate::interpreter::Interpreter;
    use crate::lexer::Lexer;
    use crate::parser::Parser;

    fn eval(source: &str) -> Result<String, Error> {
        let tokens = Lexer::new(&format!("BEGIN {{ print {} }}", source)).tokenize()?;
        let ast = Parser::new(tokens).parse()?;
        let mut interpreter = Interpreter::new(&ast);
        let mut output = Vec::new();
        interpreter.run(Vec::new(), &mut output)?;
        Ok(String::from_utf8(output).unwrap().trim_end_matches('\n').to_string())
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(eval("1 + 2 * 3").unwrap(), "7");
        assert_eq!(eval("2 ^ 3 ^ 2").unwrap(), "512");
        assert_eq!(eval("(1 + 2) * 3").unwrap(), "9");
        assert_eq!(eval("7 % 3").unwrap(), "1");
        assert_eq!(eval("1 / 4").unwrap(), "0.25");
        assert_eq!(eval("-3 + 1").unwrap(), "-2");
    }

    #[test]
    fn test_non_numeric_operands_are_zero() {
        assert_eq!(eval("\"abc\" + \"2\"").unwrap(), "2");
        assert_eq!(eval("\"3x\" * 2").unwrap(), "0");
    }

    #[test]
    fn test_comparisons() {
        assert_eq!(eval("\"5\" == \"5.0\"").unwrap(), "1");
        assert_eq!(eval("10 > 9").unwrap(), "1");
        assert_eq!(eval("\"10\" < \"9x\"").unwrap(), "1");
        assert_eq!(eval("\"abc\" != \"abc\"").unwrap(), "0");
        assert_eq!(eval("2 <= 2").unwrap(), "1");
    }

    #[test]
    fn test_logical_short_circuit() {
        assert_eq!(eval("0 && (1 / 0)").unwrap(), "0");
        assert_eq!(eval("1 || (1 / 0)").unwrap(), "1");
        assert_eq!(eval("!0").unwrap(), "1");
        assert_eq!(eval("!\"abc\"").unwrap(), "0");
    }

    #[test]
    fn test_division_by_zero() {
        let err = eval("1 / 0").unwrap_err();
        assert!(err.is_runtime());
        assert!(format!("{}", err).contains("division by zero"));
        assert!(eval("5 % 0").unwrap_err().is_runtime());
    }

    #[test]
    fn test_concatenation() {
        assert_eq!(eval("\"a\" \"b\" 1 + 2").unwrap(), "ab3");
        assert_eq!(eval("1 \" \" 2").unwrap(), "1 2");
    }

    #[test]
    fn test_ternary() {
        assert_eq!(eval("1 ? \"yes\" : \"no\"").unwrap(), "yes");
        assert_eq!(eval("0 ? \"yes\" : 0 ? \"maybe\" : \"no\"").unwrap(), "no");
    }

    #[test]
    fn test_match_operator() {
        assert_eq!(eval("\"foobar\" ~ `o+b`").unwrap(), "1");
        assert_eq!(eval("\"foobar\" !~ `^b`").unwrap(), "1");
        assert_eq!(eval("\"foobar\" ~ `^x`").unwrap(), "0");
    }

    #[test]
    fn test_pattern_outside_match_is_error() {
        let err = eval("`abc`").unwrap_err();
        assert!(format!("{}", err).contains("pattern used outside a match context"));
    }

    #[test]
    fn test_increments() {
        assert_eq!(eval("(x++) \" \" x").unwrap(), "0 1");
        assert_eq!(eval("(++x) \" \" x").unwrap(), "1 1");
        assert_eq!(eval("(x--) \" \" x").unwrap(), "0 -1");
        assert_eq!(eval("(a[\"k\"]++) \" \" a[\"k\"]").unwrap(), "0 1");
    }

    #[test]
    fn test_increment_non_lvalue_is_error() {
        assert!(eval("++3").unwrap_err().is_runtime());
    }

    #[test]
    fn test_compound_assignment() {
        assert_eq!(eval("(x = 5) (x += 2) (x *= 3) (x -= 1) (x /= 4) (x %= 3)").unwrap(), "57212052");
        assert_eq!(eval("(x = 2) (x ^= 10)").unwrap(), "21024");
    }

    #[test]
    fn test_assignment_to_non_lvalue_is_error() {
        let err = eval("(1 + 2) = 3").unwrap_err();
        assert!(format!("{}", err).contains("invalid assignment target"));
    }

    #[test]
    fn test_in_requires_array() {
        assert!(eval("1 in missing").unwrap_err().is_runtime());
        assert!(eval("(x = 1) (1 in x)").unwrap_err().is_runtime());
        assert_eq!(eval("(a[1] = 2) (1 in a) (2 in a)").unwrap(), "210");
    }

    #[test]
    fn test_field_assignment() {
        assert_eq!(eval("($3 = \"c\") $3 NF").unwrap(), "cc0");
        assert!(eval("$(-1)").unwrap_err().is_runtime());
    }

    #[test]
    fn test_unary_plus_normalizes() {
        assert_eq!(eval("+\"007\"").unwrap(), "7");
        assert_eq!(eval("-\"1.50\"").unwrap(), "-1.5");
    }
}
