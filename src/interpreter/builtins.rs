use std::collections::HashMap;
use std::io::Write;

use regex::{Captures, Regex};

use crate::ast::*;
use crate::error::{Error, Result, SourceLocation};
use crate::value::{Value, Variable};

use super::stmt::StmtResult;
use super::{ArrayRef, Callable, Frame, Interpreter};

/// Functions the interpreter provides natively
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Print,
    Printf,
    Getline,
    Next,
    Nextfile,
    Exit,
    Gsub,
    Sub,
    Match,
    Index,
    Length,
    Split,
    Substr,
    Tolower,
    Toupper,
}

impl Builtin {
    pub const ALL: [Builtin; 15] = [
        Builtin::Print,
        Builtin::Printf,
        Builtin::Getline,
        Builtin::Next,
        Builtin::Nextfile,
        Builtin::Exit,
        Builtin::Gsub,
        Builtin::Sub,
        Builtin::Match,
        Builtin::Index,
        Builtin::Length,
        Builtin::Split,
        Builtin::Substr,
        Builtin::Tolower,
        Builtin::Toupper,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Builtin::Print => "print",
            Builtin::Printf => "printf",
            Builtin::Getline => "getline",
            Builtin::Next => "next",
            Builtin::Nextfile => "nextfile",
            Builtin::Exit => "exit",
            Builtin::Gsub => "gsub",
            Builtin::Sub => "sub",
            Builtin::Match => "match",
            Builtin::Index => "index",
            Builtin::Length => "length",
            Builtin::Split => "split",
            Builtin::Substr => "substr",
            Builtin::Tolower => "tolower",
            Builtin::Toupper => "toupper",
        }
    }

    /// Declared parameter names, in order
    pub fn params(self) -> &'static [&'static str] {
        match self {
            Builtin::Print | Builtin::Getline | Builtin::Next | Builtin::Nextfile => &[],
            Builtin::Printf => &["format"],
            Builtin::Exit => &["code"],
            Builtin::Gsub | Builtin::Sub => &["regexp", "replacement", "target"],
            Builtin::Match => &["string", "regexp"],
            Builtin::Index => &["in", "find"],
            Builtin::Length | Builtin::Tolower | Builtin::Toupper => &["string"],
            Builtin::Split => &["string", "array", "fieldsep", "seps"],
            Builtin::Substr => &["string", "start", "length"],
        }
    }

    /// Number of leading parameters a call must supply
    pub fn required(self) -> usize {
        match self {
            Builtin::Exit | Builtin::Length => 0,
            Builtin::Tolower | Builtin::Toupper | Builtin::Printf => 1,
            Builtin::Gsub | Builtin::Sub | Builtin::Split | Builtin::Substr => 2,
            other => other.params().len(),
        }
    }

    /// Variadic built-ins accept any number of arguments past their declared ones
    pub fn is_variadic(self) -> bool {
        matches!(self, Builtin::Print | Builtin::Printf)
    }

    fn accepts(self, count: usize) -> bool {
        count >= self.required() && (self.is_variadic() || count <= self.params().len())
    }
}

impl<'a> Interpreter<'a> {
    pub(crate) fn call_function<W: Write>(
        &mut self,
        name: &str,
        args: &[Expr],
        location: SourceLocation,
        output: &mut W,
    ) -> Result<Value> {
        match self.functions.get(name).copied() {
            Some(Callable::Builtin(builtin)) => self.call_builtin(builtin, args, location, output),
            Some(Callable::User(func)) => self.call_user_function(func, args, location, output),
            None => Err(Error::runtime_at(
                format!("call to undefined function '{}'", name),
                location,
            )),
        }
    }

    fn call_builtin<W: Write>(
        &mut self,
        builtin: Builtin,
        args: &[Expr],
        location: SourceLocation,
        output: &mut W,
    ) -> Result<Value> {
        if !builtin.accepts(args.len()) {
            return Err(Error::runtime_at(
                format!(
                    "wrong number of arguments to {}(): got {}",
                    builtin.name(),
                    args.len()
                ),
                location,
            ));
        }

        match builtin {
            Builtin::Print => {
                let mut line = String::new();
                if args.is_empty() {
                    line.push_str(self.get_field("$0").as_str());
                }
                for arg in args {
                    line.push_str(self.eval_expr(arg, output)?.as_str());
                }
                line.push_str(self.global_value("ORS")?.as_str());
                output.write_all(line.as_bytes())?;
                Ok(Value::default())
            }

            Builtin::Printf => {
                let format = self.eval_expr(&args[0], output)?;
                let mut values = Vec::with_capacity(args.len() - 1);
                for arg in &args[1..] {
                    values.push(self.eval_expr(arg, output)?);
                }
                let mut text = format_printf(format.as_str(), &values);
                text.push('\n');
                output.write_all(text.as_bytes())?;
                Ok(Value::default())
            }

            Builtin::Getline => Ok(Value::from_bool(self.load_next_record()?)),

            Builtin::Next => {
                self.load_next_record()?;
                Ok(Value::default())
            }

            Builtin::Nextfile => {
                self.cursor = self.records.len();
                Ok(Value::default())
            }

            Builtin::Exit => {
                if let Some(code) = args.first() {
                    self.exit_code = self.eval_expr(code, output)?.to_number() as i32;
                }
                self.halted = true;
                tracing::debug!(code = self.exit_code, "exit requested");
                Ok(Value::default())
            }

            Builtin::Gsub | Builtin::Sub => {
                let pattern = self.pattern_arg(&args[0], output)?;
                let replacement = self.eval_expr(&args[1], output)?;
                let target = match args.get(2) {
                    Some(target) => self.eval_expr(target, output)?,
                    None => self.get_field("$0"),
                };

                let global = builtin == Builtin::Gsub;
                let re = self.regex(&pattern)?;
                let (result, count) = substitute(re, target.as_str(), replacement.as_str(), global);

                // The result always lands in $0, whatever the target was
                self.set_field("$0", Value::from(result));
                Ok(Value::from_number(count as f64))
            }

            Builtin::Match => {
                let text = self.eval_expr(&args[0], output)?;
                let pattern = self.pattern_arg(&args[1], output)?;
                let re = self.regex(&pattern)?;
                let position = match re.find(text.as_str()) {
                    Some(m) => text.as_str()[..m.start()].chars().count() + 1,
                    None => 0,
                };
                Ok(Value::from_number(position as f64))
            }

            Builtin::Index => {
                let haystack = self.eval_expr(&args[0], output)?;
                let needle = self.eval_expr(&args[1], output)?;
                let position = index_of(haystack.as_str(), needle.as_str()).unwrap_or(0);
                Ok(Value::from_number(position as f64))
            }

            Builtin::Length => {
                let text = match args.first() {
                    Some(arg) => self.eval_expr(arg, output)?,
                    None => self.get_field("$0"),
                };
                Ok(Value::from_number(text.as_str().chars().count() as f64))
            }

            Builtin::Split => self.call_split(args, location, output),

            Builtin::Substr => {
                let text = self.eval_expr(&args[0], output)?;
                let start = self.eval_expr(&args[1], output)?.to_number();
                let length = match args.get(2) {
                    Some(arg) => Some(self.eval_expr(arg, output)?.to_number()),
                    None => None,
                };
                Ok(Value::from(substr(text.as_str(), start, length)))
            }

            Builtin::Tolower => {
                let text = self.eval_expr(&args[0], output)?;
                Ok(Value::from(text.as_str().to_lowercase()))
            }

            Builtin::Toupper => {
                let text = self.eval_expr(&args[0], output)?;
                Ok(Value::from(text.as_str().to_uppercase()))
            }
        }
    }

    /// split(string, array, fieldsep?, seps?)
    fn call_split<W: Write>(
        &mut self,
        args: &[Expr],
        location: SourceLocation,
        output: &mut W,
    ) -> Result<Value> {
        let text = self.eval_expr(&args[0], output)?;
        let array = array_name_arg(&args[1], "split")?;
        let sep = match args.get(2) {
            Some(sep) => self.pattern_arg(sep, output)?,
            None => self.global_value("FS")?.into_string(),
        };
        let seps = match args.get(3) {
            Some(seps) => Some(array_name_arg(seps, "split")?),
            None => None,
        };

        let (fields, separators) = self.split_text(text.as_str(), &sep)?;
        let count = fields.len();

        self.replace_array(array, numbered(fields));
        if let Some(seps) = seps {
            self.replace_array(seps, numbered(separators));
        }

        tracing::trace!(array, count, %location, "split");
        Ok(Value::from_number(count as f64))
    }

    /// A regexp argument: a pattern literal, or any expression's string value
    fn pattern_arg<W: Write>(&mut self, expr: &Expr, output: &mut W) -> Result<String> {
        match expr {
            Expr::Pattern(pattern, _) => Ok(pattern.clone()),
            other => Ok(self.eval_expr(other, output)?.into_string()),
        }
    }

    fn call_user_function<W: Write>(
        &mut self,
        func: &'a FunctionDef,
        args: &[Expr],
        location: SourceLocation,
        output: &mut W,
    ) -> Result<Value> {
        if args.len() != func.params.len() {
            return Err(Error::runtime_at(
                format!(
                    "function '{}' expects {} arguments, got {}",
                    func.name,
                    func.params.len(),
                    args.len()
                ),
                location,
            ));
        }

        // Arguments are evaluated in the caller's scope. A bare name bound
        // to an array is passed as an alias to the caller's cell.
        let mut frame = Frame::default();
        for (param, arg) in func.params.iter().zip(args) {
            let Some(param_name) = param.plain_name() else {
                return Err(Error::runtime_at(
                    format!("parameters of function '{}' must be plain names", func.name),
                    param.location(),
                ));
            };

            match arg.plain_name() {
                Some(name) if matches!(self.lookup(name), Some(Variable::Array(_))) => {
                    let (frame_index, target) = self.slot(name);
                    frame.aliases.insert(
                        param_name.to_string(),
                        ArrayRef {
                            frame: frame_index,
                            name: target.into_owned(),
                        },
                    );
                }
                _ => {
                    let value = self.eval_expr(arg, output)?;
                    frame.variables.insert(param_name.to_string(), Variable::Scalar(value));
                }
            }
        }

        tracing::trace!(function = %func.name, "calling function");
        let result = self.with_frame(frame, |interp| interp.execute_block(&func.body, output))?;

        match result {
            StmtResult::Return(value) => Ok(value),
            _ => Ok(Value::default()),
        }
    }
}

fn array_name_arg<'e>(expr: &'e Expr, function: &str) -> Result<&'e str> {
    expr.plain_name().ok_or_else(|| {
        Error::runtime_at(
            format!("{}() needs an array name here", function),
            expr.location(),
        )
    })
}

/// Key a list of strings "0", "1", ...
fn numbered(items: Vec<String>) -> HashMap<String, Value> {
    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| (i.to_string(), Value::from(item)))
        .collect()
}

/// Replace the first (or every) match of `re` in `target`. `&` in the
/// replacement stands for the matched text and `\&` for a literal `&`.
///
/// The count is the number of matches in `target`, whether or not each
/// one was replaced.
pub(crate) fn substitute(re: &Regex, target: &str, replacement: &str, global: bool) -> (String, usize) {
    let count = re.find_iter(target).count();
    let expand = |caps: &Captures| expand_replacement(replacement, &caps[0]);

    let result = if global {
        re.replace_all(target, expand)
    } else {
        re.replace(target, expand)
    };
    (result.into_owned(), count)
}

fn expand_replacement(replacement: &str, matched: &str) -> String {
    let mut result = String::with_capacity(replacement.len());
    let mut chars = replacement.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' if chars.peek() == Some(&'&') => {
                chars.next();
                result.push('&');
            }
            '&' => result.push_str(matched),
            _ => result.push(ch),
        }
    }
    result
}

/// 0-based character position of `needle` in `haystack`
pub(crate) fn index_of(haystack: &str, needle: &str) -> Option<usize> {
    haystack
        .find(needle)
        .map(|byte| haystack[..byte].chars().count())
}

/// Characters from 0-based `start` up to `start + length`, clamped to the string
pub(crate) fn substr(s: &str, start: f64, length: Option<f64>) -> String {
    let total = s.chars().count();
    let start = if start.is_nan() { 0.0 } else { start.max(0.0) };
    let begin = (start as usize).min(total);
    let end = match length {
        Some(length) if length.is_nan() || length <= 0.0 => begin,
        Some(length) => ((start + length) as usize).clamp(begin, total),
        None => total,
    };
    s.chars().skip(begin).take(end - begin).collect()
}

/// Format values the way `printf` does
pub fn format_printf(format: &str, args: &[Value]) -> String {
    let mut result = String::new();
    let mut chars = format.chars().peekable();
    let mut arg_idx = 0;

    while let Some(ch) = chars.next() {
        if ch != '%' {
            result.push(ch);
            continue;
        }

        if chars.peek() == Some(&'%') {
            chars.next();
            result.push('%');
            continue;
        }

        let mut directive = FormatSpec::default();

        while let Some(&c) = chars.peek() {
            match c {
                '-' => directive.left_align = true,
                '+' => directive.plus = true,
                ' ' => directive.space = true,
                '#' => directive.alternate = true,
                '0' => directive.zero_pad = true,
                _ => break,
            }
            chars.next();
        }

        let mut width = String::new();
        while let Some(&c) = chars.peek() {
            if !c.is_ascii_digit() {
                break;
            }
            width.push(c);
            chars.next();
        }
        directive.width = width.parse().unwrap_or(0);

        if chars.peek() == Some(&'.') {
            chars.next();
            let mut precision = String::new();
            while let Some(&c) = chars.peek() {
                if !c.is_ascii_digit() {
                    break;
                }
                precision.push(c);
                chars.next();
            }
            directive.precision = Some(precision.parse().unwrap_or(0));
        }

        let Some(conversion) = chars.next() else {
            result.push('%');
            break;
        };

        let arg = args.get(arg_idx).cloned().unwrap_or_default();
        arg_idx += 1;

        let formatted = match conversion {
            's' => {
                let s = arg.as_str();
                let s: String = match directive.precision {
                    Some(p) => s.chars().take(p).collect(),
                    None => s.to_string(),
                };
                directive.pad(s, false)
            }
            'c' => {
                let s = match arg.as_number() {
                    Some(n) => char::from_u32(n as u32).map(String::from).unwrap_or_default(),
                    None => arg.as_str().chars().next().map(String::from).unwrap_or_default(),
                };
                directive.pad(s, false)
            }
            'd' | 'i' => {
                let n = arg.to_number().trunc();
                let digits = format!("{}", n.abs() as i64);
                directive.pad(directive.sign(n) + &digits, true)
            }
            'o' | 'x' | 'X' => {
                let n = arg.to_number() as i64 as u64;
                let (digits, prefix) = match conversion {
                    'o' => (format!("{:o}", n), "0"),
                    'x' => (format!("{:x}", n), "0x"),
                    _ => (format!("{:X}", n), "0X"),
                };
                let prefix = if directive.alternate && n != 0 { prefix } else { "" };
                directive.pad(format!("{}{}", prefix, digits), true)
            }
            'f' | 'F' => {
                let n = arg.to_number();
                let p = directive.precision.unwrap_or(6);
                let body = format!("{:.prec$}", n.abs(), prec = p);
                directive.pad(directive.sign(n) + &body, true)
            }
            'e' | 'E' => {
                let n = arg.to_number();
                let p = directive.precision.unwrap_or(6);
                let body = format_exponent(n.abs(), p, conversion == 'E');
                directive.pad(directive.sign(n) + &body, true)
            }
            'g' | 'G' => {
                let n = arg.to_number();
                let body = format_general(n.abs(), directive.precision, directive.alternate, conversion == 'G');
                directive.pad(directive.sign(n) + &body, true)
            }
            other => format!("%{}", other),
        };

        result.push_str(&formatted);
    }

    result
}

#[derive(Default)]
struct FormatSpec {
    left_align: bool,
    plus: bool,
    space: bool,
    alternate: bool,
    zero_pad: bool,
    width: usize,
    precision: Option<usize>,
}

impl FormatSpec {
    fn sign(&self, n: f64) -> String {
        if n.is_sign_negative() && n != 0.0 {
            "-".to_string()
        } else if self.plus {
            "+".to_string()
        } else if self.space {
            " ".to_string()
        } else {
            String::new()
        }
    }

    /// Pad to the field width; numeric fields may be zero-padded after the sign
    fn pad(&self, s: String, numeric: bool) -> String {
        let len = s.chars().count();
        if len >= self.width {
            return s;
        }
        let fill = self.width - len;

        if self.left_align {
            format!("{}{}", s, " ".repeat(fill))
        } else if self.zero_pad && numeric {
            let sign_len = if s.starts_with(['-', '+', ' ']) { 1 } else { 0 };
            format!("{}{}{}", &s[..sign_len], "0".repeat(fill), &s[sign_len..])
        } else {
            format!("{}{}", " ".repeat(fill), s)
        }
    }
}

/// `d.ddde+XX` with `precision` digits after the point
fn format_exponent(n: f64, precision: usize, upper: bool) -> String {
    let raw = format!("{:.prec$e}", n, prec = precision);
    let (mantissa, exponent) = raw.split_once('e').unwrap_or((raw.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let sign = if exponent < 0 { '-' } else { '+' };
    let e = if upper { 'E' } else { 'e' };
    format!("{}{}{}{:02}", mantissa, e, sign, exponent.abs())
}

/// `%g`: the shorter of fixed and exponent notation for `precision`
/// significant digits
fn format_general(n: f64, precision: Option<usize>, alternate: bool, upper: bool) -> String {
    let p = match precision {
        Some(0) => 1,
        Some(p) => p,
        None => 6,
    };

    let exponent = if n == 0.0 {
        0
    } else {
        let raw = format!("{:.prec$e}", n, prec = p - 1);
        raw.split_once('e')
            .and_then(|(_, e)| e.parse::<i32>().ok())
            .unwrap_or(0)
    };

    if exponent < -4 || exponent >= p as i32 {
        let s = format_exponent(n, p - 1, upper);
        if alternate {
            return s;
        }
        match s.find(['e', 'E']) {
            Some(pos) => {
                let (mantissa, rest) = s.split_at(pos);
                format!("{}{}", trim_fraction(mantissa), rest)
            }
            None => s,
        }
    } else {
        let decimals = (p as i32 - 1 - exponent).max(0) as usize;
        let s = format!("{:.prec$}", n, prec = decimals);
        if alternate { s } else { trim_fraction(&s).to_string() }
    }
}

fn trim_fraction(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}
