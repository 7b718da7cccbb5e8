use crate::error::SourceLocation;

/// A complete parsed program
#[derive(Debug, Clone, Default)]
pub struct Program {
    pub begin_blocks: Vec<Block>,
    pub end_blocks: Vec<Block>,
    /// Pattern-action blocks, in declaration order
    pub blocks: Vec<Block>,
    pub functions: Vec<FunctionDef>,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }
}

/// User-defined function
#[derive(Debug, Clone)]
pub struct FunctionDef {
    pub name: String,
    /// Declared parameters. Each is expected to be a plain variable
    /// reference; anything else is rejected when the function is called.
    pub params: Vec<Expr>,
    pub body: Block,
    pub location: SourceLocation,
}

/// A block of statements, optionally guarded by a condition
#[derive(Debug, Clone)]
pub struct Block {
    pub statements: Vec<Stmt>,
    pub condition: Option<Expr>,
    pub location: SourceLocation,
}

impl Block {
    pub fn new(statements: Vec<Stmt>, location: SourceLocation) -> Self {
        Self {
            statements,
            condition: None,
            location,
        }
    }

    pub fn with_condition(mut self, condition: Option<Expr>) -> Self {
        self.condition = condition;
        self
    }
}

/// Statement types
#[derive(Debug, Clone)]
pub enum Stmt {
    /// Expression statement (assignment, function call, print, ...)
    Expr(Expr),

    If {
        condition: Expr,
        then_block: Block,
        else_branch: Option<ElseBranch>,
        location: SourceLocation,
    },

    While {
        condition: Expr,
        body: Block,
        location: SourceLocation,
    },

    DoWhile {
        body: Block,
        condition: Expr,
        location: SourceLocation,
    },

    /// C-style for loop; every clause may be absent
    For {
        init: Option<Expr>,
        condition: Option<Expr>,
        update: Option<Expr>,
        body: Block,
        location: SourceLocation,
    },

    /// `for (var in array)`
    ForIn {
        var: String,
        array: String,
        body: Block,
        location: SourceLocation,
    },

    Break { location: SourceLocation },

    Continue { location: SourceLocation },

    Return {
        value: Option<Expr>,
        location: SourceLocation,
    },

    /// `delete array[index]`, or `delete array` when `index` is absent
    Delete {
        array: String,
        index: Option<Expr>,
        location: SourceLocation,
    },
}

/// What follows `else`: either another `if` or a plain block
#[derive(Debug, Clone)]
pub enum ElseBranch {
    If(Box<Stmt>),
    Block(Block),
}

/// Expression types
#[derive(Debug, Clone)]
pub enum Expr {
    /// String or number literal, kept as its text
    Constant(String, SourceLocation),

    /// Pattern literal: `` `regex` ``
    Pattern(String, SourceLocation),

    /// Variable reference: `name` or `name[index]`
    Var {
        name: String,
        index: Option<Box<Expr>>,
        location: SourceLocation,
    },

    /// Field access: $expr
    Field(Box<Expr>, SourceLocation),

    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
        location: SourceLocation,
    },

    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
        location: SourceLocation,
    },

    /// Assignment; compound forms are rewritten to `target = target OP value`
    Assign {
        target: Box<Expr>,
        value: Box<Expr>,
        location: SourceLocation,
    },

    PreIncrement(Box<Expr>, SourceLocation),
    PreDecrement(Box<Expr>, SourceLocation),
    PostIncrement(Box<Expr>, SourceLocation),
    PostDecrement(Box<Expr>, SourceLocation),

    Ternary {
        condition: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Box<Expr>,
        location: SourceLocation,
    },

    /// Function call, including the statement-shaped built-ins
    /// (`print`, `printf`, `getline`, `next`, `nextfile`, `exit`)
    Call {
        name: String,
        args: Vec<Expr>,
        location: SourceLocation,
    },

    /// Array membership: `key in array`
    In {
        key: Box<Expr>,
        array: Box<Expr>,
        location: SourceLocation,
    },

    /// Regex match: `expr ~ pattern` or `expr !~ pattern`
    Match {
        expr: Box<Expr>,
        pattern: String,
        negated: bool,
        location: SourceLocation,
    },
}

impl Expr {
    pub fn location(&self) -> SourceLocation {
        match self {
            Expr::Constant(_, loc)
            | Expr::Pattern(_, loc)
            | Expr::Var { location: loc, .. }
            | Expr::Field(_, loc)
            | Expr::Binary { location: loc, .. }
            | Expr::Unary { location: loc, .. }
            | Expr::Assign { location: loc, .. }
            | Expr::PreIncrement(_, loc)
            | Expr::PreDecrement(_, loc)
            | Expr::PostIncrement(_, loc)
            | Expr::PostDecrement(_, loc)
            | Expr::Ternary { location: loc, .. }
            | Expr::Call { location: loc, .. }
            | Expr::In { location: loc, .. }
            | Expr::Match { location: loc, .. } => *loc,
        }
    }

    /// Name of a bare, unindexed variable reference
    pub fn plain_name(&self) -> Option<&str> {
        match self {
            Expr::Var { name, index: None, .. } => Some(name),
            _ => None,
        }
    }

    /// Whether this expression can appear on the left of an assignment
    pub fn is_lvalue(&self) -> bool {
        matches!(self, Expr::Var { .. } | Expr::Field(..))
    }
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,

    // Comparison
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,

    // Logical
    And,
    Or,

    // String
    Concat,
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg, // -x
    Pos, // +x
    Not, // !x
}
