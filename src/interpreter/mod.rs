mod builtins;
mod expr;
pub mod stmt;

use std::borrow::Cow;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::io::{BufRead, Write};

use regex::Regex;

use crate::ast::*;
use crate::error::{Error, Result, SourceLocation};
use crate::value::{Value, Variable};

pub use builtins::{Builtin, format_printf};

/// An entry in the function registry
#[derive(Clone, Copy)]
enum Callable<'a> {
    Builtin(Builtin),
    User(&'a FunctionDef),
}

/// Storage of an array passed to a user function by name
#[derive(Debug, Clone)]
struct ArrayRef {
    /// Index into the frame stack, or `None` for the globals
    frame: Option<usize>,
    name: String,
}

/// Local layer of one user function call
#[derive(Debug, Default)]
pub(crate) struct Frame {
    variables: HashMap<String, Variable>,
    /// Array parameters bound to the caller's array cell
    aliases: HashMap<String, ArrayRef>,
}

/// Tree-walking interpreter for a parsed program
pub struct Interpreter<'a> {
    /// The parsed program
    program: &'a Program,

    /// Global scope: user variables, arrays, record state and `$N` field cells
    pub(crate) globals: HashMap<String, Variable>,

    /// Call frames. Only the last one is visible by name; earlier frames
    /// are reachable through array aliases alone.
    frames: Vec<Frame>,

    /// Built-in and user-defined functions, keyed by name
    functions: HashMap<String, Callable<'a>>,

    /// Input lines, fully loaded before the record loop starts
    pub(crate) records: Vec<String>,
    /// Index of the next record to load
    pub(crate) cursor: usize,

    /// Compiled regex cache
    pub(crate) regex_cache: HashMap<String, Regex>,

    /// Set by `exit`: stop executing the current phase
    pub(crate) halted: bool,
    pub(crate) exit_code: i32,
}

impl<'a> Interpreter<'a> {
    pub fn new(program: &'a Program) -> Self {
        let mut functions = HashMap::new();
        for builtin in Builtin::ALL {
            functions.insert(builtin.name().to_string(), Callable::Builtin(builtin));
        }
        for func in &program.functions {
            functions.insert(func.name.clone(), Callable::User(func));
        }

        let mut globals = HashMap::new();
        for (name, value) in [
            ("FILENAME", ""),
            ("FS", " "),
            ("OFS", " "),
            ("ORS", "\n"),
            ("OFMT", "%.6g"),
            ("NF", "0"),
            ("NR", "0"),
            ("FNR", "0"),
        ] {
            globals.insert(name.to_string(), Variable::Scalar(Value::from(value)));
        }

        Self {
            program,
            globals,
            frames: Vec::new(),
            functions,
            records: Vec::new(),
            cursor: 0,
            regex_cache: HashMap::new(),
            halted: false,
            exit_code: 0,
        }
    }

    /// Set the field separator
    pub fn set_fs(&mut self, fs: &str) {
        self.set_variable("FS", fs);
    }

    /// Set a global scalar before execution
    pub fn set_variable(&mut self, name: &str, value: &str) {
        self.globals
            .insert(name.to_string(), Variable::Scalar(Value::from(value)));
    }

    /// Set the current filename (FILENAME)
    pub fn set_filename(&mut self, filename: &str) {
        self.set_variable("FILENAME", filename);
    }

    /// Read a global variable, if it's bound
    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.globals.get(name)
    }

    /// Run the program over `records`, writing output to `output`.
    ///
    /// Returns the exit code requested by `exit`, or 0.
    pub fn run<W: Write>(&mut self, records: Vec<String>, output: &mut W) -> Result<i32> {
        let program = self.program;
        self.records = records;
        self.cursor = 0;

        tracing::debug!(records = self.records.len(), "running BEGIN blocks");
        for block in &program.begin_blocks {
            self.execute_block(block, output)?;
            if self.halted {
                break;
            }
        }

        if !self.halted {
            tracing::debug!("running pattern-action blocks");
            while self.load_next_record()? {
                self.process_current_record(output)?;
                if self.halted {
                    break;
                }
            }
        }

        // exit outside END still runs the END blocks
        self.halted = false;
        tracing::debug!("running END blocks");
        for block in &program.end_blocks {
            self.execute_block(block, output)?;
            if self.halted {
                break;
            }
        }

        output.flush()?;
        Ok(self.exit_code)
    }

    /// Run every pattern-action block whose condition holds for the current record
    fn process_current_record<W: Write>(&mut self, output: &mut W) -> Result<()> {
        let program = self.program;
        for block in &program.blocks {
            if self.condition_holds(block.condition.as_ref(), output)? {
                self.execute_block(block, output)?;
            }
            if self.halted {
                break;
            }
        }
        Ok(())
    }

    fn condition_holds<W: Write>(&mut self, condition: Option<&Expr>, output: &mut W) -> Result<bool> {
        match condition {
            None => Ok(true),
            // A bare pattern tests the whole record
            Some(Expr::Pattern(pattern, _)) => {
                let record = self.get_field("$0");
                Ok(self.regex(pattern)?.is_match(record.as_str()))
            }
            Some(expr) => Ok(self.eval_expr(expr, output)?.is_truthy()),
        }
    }

    /// Advance the cursor and make the next line the current record.
    /// Returns false when the input is exhausted.
    pub(crate) fn load_next_record(&mut self) -> Result<bool> {
        let Some(line) = self.records.get(self.cursor).cloned() else {
            return Ok(false);
        };
        self.cursor += 1;

        let nr = self.global_value("NR")?.to_number() + 1.0;
        let fnr = self.global_value("FNR")?.to_number() + 1.0;
        self.set_record(&line)?;
        self.set_variable_value("NR", Value::from_number(nr));
        self.set_variable_value("FNR", Value::from_number(fnr));

        tracing::trace!(nr, record = %line, "loaded record");
        Ok(true)
    }

    /// Replace `$0` and re-derive `$1..$NF` and `NF` using the current `FS`
    pub(crate) fn set_record(&mut self, record: &str) -> Result<()> {
        self.globals.retain(|name, _| !name.starts_with('$'));

        let fs = self.global_value("FS")?;
        let (fields, _) = self.split_text(record, fs.as_str())?;

        self.set_variable_value("$0", Value::from(record));
        let nf = fields.len();
        for (i, field) in fields.into_iter().enumerate() {
            self.set_variable_value(&format!("${}", i + 1), Value::from(field));
        }
        self.set_variable_value("NF", Value::from_number(nf as f64));
        Ok(())
    }

    /// Split `text` by a separator, returning the pieces and the separator
    /// text found between them.
    ///
    /// `" "` splits on runs of whitespace and ignores leading and trailing
    /// whitespace; `""` splits into characters; any other single character is
    /// a literal separator; longer separators are regular expressions.
    pub(crate) fn split_text(&mut self, text: &str, sep: &str) -> Result<(Vec<String>, Vec<String>)> {
        let (text, pattern) = match sep {
            " " => (text.trim(), r"\s+".to_string()),
            _ if sep.chars().count() == 1 => (text, regex::escape(sep)),
            _ => (text, sep.to_string()),
        };

        if text.is_empty() {
            return Ok((Vec::new(), Vec::new()));
        }
        if sep.is_empty() {
            return Ok((text.chars().map(String::from).collect(), Vec::new()));
        }

        let re = self.regex(&pattern)?;
        let mut fields = Vec::new();
        let mut separators = Vec::new();
        let mut last = 0;
        for m in re.find_iter(text) {
            if m.as_str().is_empty() {
                continue;
            }
            fields.push(text[last..m.start()].to_string());
            separators.push(m.as_str().to_string());
            last = m.end();
        }
        fields.push(text[last..].to_string());

        Ok((fields, separators))
    }

    pub(crate) fn regex(&mut self, pattern: &str) -> Result<&Regex> {
        match self.regex_cache.entry(pattern.to_string()) {
            Entry::Occupied(entry) => Ok(&*entry.into_mut()),
            Entry::Vacant(entry) => Ok(&*entry.insert(Regex::new(pattern)?)),
        }
    }

    // ===== Variable environment =====

    /// Where `name` lives: the visible frame if it binds the name, the
    /// aliased array if it is an array parameter, the globals otherwise
    fn slot<'n>(&self, name: &'n str) -> (Option<usize>, Cow<'n, str>) {
        if let Some(frame) = self.frames.last() {
            if let Some(target) = frame.aliases.get(name) {
                return (target.frame, Cow::Owned(target.name.clone()));
            }
            if frame.variables.contains_key(name) {
                return (Some(self.frames.len() - 1), Cow::Borrowed(name));
            }
        }
        (None, Cow::Borrowed(name))
    }

    fn scope(&self, frame: Option<usize>) -> &HashMap<String, Variable> {
        match frame {
            Some(index) => &self.frames[index].variables,
            None => &self.globals,
        }
    }

    /// Find a name in the local layer, then the globals
    pub(crate) fn lookup(&self, name: &str) -> Option<&Variable> {
        let (frame, name) = self.slot(name);
        self.scope(frame).get(name.as_ref())
    }

    /// The scope a write to `name` lands in, and the key to use there
    pub(crate) fn scope_for<'n>(&mut self, name: &'n str) -> (&mut HashMap<String, Variable>, Cow<'n, str>) {
        let (frame, name) = self.slot(name);
        let scope = match frame {
            Some(index) => &mut self.frames[index].variables,
            None => &mut self.globals,
        };
        (scope, name)
    }

    /// Run `body` with `frame` as the visible local layer
    pub(crate) fn with_frame<T>(&mut self, frame: Frame, body: impl FnOnce(&mut Self) -> T) -> T {
        self.frames.push(frame);
        let result = body(self);
        self.frames.pop();
        result
    }

    pub(crate) fn global_value(&self, name: &str) -> Result<Value> {
        match self.globals.get(name) {
            Some(Variable::Scalar(value)) => Ok(value.clone()),
            Some(Variable::Array(_)) => Err(Error::runtime(format!(
                "attempt to use array '{}' in a scalar context",
                name
            ))),
            None => Ok(Value::unset()),
        }
    }

    /// Write a global scalar directly, bypassing the type check
    fn set_variable_value(&mut self, name: &str, value: Value) {
        self.globals.insert(name.to_string(), Variable::Scalar(value));
    }

    pub(crate) fn get_scalar(&self, name: &str, location: SourceLocation) -> Result<Value> {
        match self.lookup(name) {
            Some(Variable::Scalar(value)) => Ok(value.clone()),
            Some(Variable::Array(_)) => Err(Error::runtime_at(
                format!("attempt to use array '{}' in a scalar context", name),
                location,
            )),
            None => Ok(Value::unset()),
        }
    }

    pub(crate) fn set_scalar(&mut self, name: &str, value: Value, location: SourceLocation) -> Result<()> {
        let (scope, key) = self.scope_for(name);
        match scope.get_mut(key.as_ref()) {
            Some(Variable::Scalar(slot)) => *slot = value,
            Some(Variable::Array(_)) => {
                return Err(Error::runtime_at(
                    format!("cannot assign a scalar to array '{}'", name),
                    location,
                ));
            }
            None => {
                scope.insert(key.into_owned(), Variable::Scalar(value));
            }
        }
        Ok(())
    }

    /// Array for `name`, created empty on first use
    fn array_mut(
        &mut self,
        name: &str,
        location: SourceLocation,
    ) -> Result<&mut HashMap<String, Value>> {
        let (scope, key) = self.scope_for(name);
        match scope
            .entry(key.into_owned())
            .or_insert_with(|| Variable::Array(HashMap::new()))
        {
            Variable::Array(entries) => Ok(entries),
            Variable::Scalar(_) => Err(Error::runtime_at(
                format!("attempt to use scalar '{}' as an array", name),
                location,
            )),
        }
    }

    pub(crate) fn get_element(&mut self, name: &str, key: &str, location: SourceLocation) -> Result<Value> {
        let entries = self.array_mut(name, location)?;
        Ok(entries.get(key).cloned().unwrap_or_else(Value::unset))
    }

    pub(crate) fn set_element(
        &mut self,
        name: &str,
        key: String,
        value: Value,
        location: SourceLocation,
    ) -> Result<()> {
        self.array_mut(name, location)?.insert(key, value);
        Ok(())
    }

    /// Bind `name` to a fresh array, replacing whatever was there
    pub(crate) fn replace_array(&mut self, name: &str, entries: HashMap<String, Value>) {
        let (scope, key) = self.scope_for(name);
        scope.insert(key.into_owned(), Variable::Array(entries));
    }

    pub(crate) fn array_contains(&self, name: &str, key: &str, location: SourceLocation) -> Result<bool> {
        match self.lookup(name) {
            Some(Variable::Array(entries)) => Ok(entries.contains_key(key)),
            Some(Variable::Scalar(_)) => Err(Error::runtime_at(
                format!("'{}' is not an array", name),
                location,
            )),
            None => Err(Error::runtime_at(
                format!("'{}' is not an initialized array", name),
                location,
            )),
        }
    }

    pub(crate) fn array_keys(&self, name: &str, location: SourceLocation) -> Result<Vec<String>> {
        match self.lookup(name) {
            Some(Variable::Array(entries)) => Ok(entries.keys().cloned().collect()),
            Some(Variable::Scalar(_)) => Err(Error::runtime_at(
                format!("'{}' is not an array", name),
                location,
            )),
            None => Ok(Vec::new()),
        }
    }

    /// Remove one key, or every key when `key` is `None`
    pub(crate) fn delete(&mut self, name: &str, key: Option<&str>, location: SourceLocation) -> Result<()> {
        let (scope, scope_key) = self.scope_for(name);
        match scope.get_mut(scope_key.as_ref()) {
            Some(Variable::Array(entries)) => {
                match key {
                    Some(key) => {
                        entries.remove(key);
                    }
                    None => entries.clear(),
                }
                Ok(())
            }
            Some(Variable::Scalar(_)) => Err(Error::runtime_at(
                format!("cannot delete from scalar '{}'", name),
                location,
            )),
            None => Ok(()),
        }
    }

    // ===== Fields =====

    /// Cell name for a field index: `$` followed by the canonical number
    pub(crate) fn field_name(&self, index: &Value, location: SourceLocation) -> Result<String> {
        let n = index.to_number();
        if n < 0.0 {
            return Err(Error::runtime_at(
                format!("attempt to access field {}", Value::from_number(n)),
                location,
            ));
        }
        Ok(format!("${}", Value::from_number(n)))
    }

    /// Field cells that were never set read as the empty string
    pub(crate) fn get_field(&self, name: &str) -> Value {
        match self.globals.get(name) {
            Some(Variable::Scalar(value)) => value.clone(),
            _ => Value::default(),
        }
    }

    pub(crate) fn set_field(&mut self, name: &str, value: Value) {
        self.set_variable_value(name, value);
    }
}

/// Read every line of `reader` into a record list
pub fn read_records<R: BufRead>(reader: R) -> Result<Vec<String>> {
    Ok(reader.lines().collect::<std::io::Result<Vec<_>>>()?)
}
