//! Abstract syntax tree produced by [`crate::parse`].
//!
//! Shaped after `original_source/src/ast/Expr.hpp` and `Stmt.hpp`, but
//! expressed as ordinary Rust enums instead of the `boost::spirit::x3`
//! `variant`-of-structs the original uses — that scheme exists to let the x3
//! grammar combinators build nodes incrementally as they match, which a
//! hand-written recursive-descent parser has no need to imitate. Every
//! statement and expression form the original has survives; `PrintStmt`'s
//! split `expression` + `format` fields are folded into one ordered
//! `Vec<PrintPart>`, an equivalent shape for a parser this small.

/// Operators, matching `original_source/src/utility/Operator.hpp` one for
/// one (including `From`/`To`, the `<-`/`->` assignment arrows, and the
/// comma/semicolon pseudo-operators `print` uses as separators).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Plus,
    Minus,
    Times,
    Divide,
    Modulo,
    FloorDivide,
    Exponent,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    GreaterEqual,
    Greater,
    Not,
    And,
    Or,
    Compl,
    BitAnd,
    BitOr,
    BitXor,
    Comma,
    SemiColon,
    From,
    To,
    /// `!x`: list/string length.
    Bang,
    /// `?x`: type name of `x`.
    Question,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Variable {
    pub name: String,
}

impl From<&str> for Variable {
    fn from(name: &str) -> Self {
        Variable { name: name.to_string() }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Complex(f64, f64),
    Str(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Literal),
    Variable(Variable),
    This,
    Unary {
        op: Operator,
        operand: Box<Expr>,
    },
    Binary {
        op: Operator,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// A chain of same-precedence comparisons (`a < b < c`), each link
    /// evaluated pairwise and the results combined with logical `and` —
    /// `original_source`'s `ExprNode::Boolean` association.
    CompareChain {
        ops: Vec<Operator>,
        operands: Vec<Expr>,
    },
    FunctionCall {
        name: String,
        args: Vec<Expr>,
    },
    DataMember {
        name: Variable,
        member_list: Vec<Variable>,
    },
    MethodCall {
        name: Variable,
        member_list: Vec<Variable>,
        method: String,
        args: Vec<Expr>,
    },
    UserInput,
    TypeConv {
        to_type: String,
        expr: Box<Expr>,
    },
    List {
        elements: Vec<Expr>,
        element_type: Option<String>,
    },
    ListIndex {
        name: Variable,
        indexes: Vec<Expr>,
    },
    DataListIndex {
        name: Variable,
        member_list: Vec<Variable>,
        indexes: Vec<Expr>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum PrintPart {
    Value(Expr),
    /// A `,` separator; a trailing one (right before the statement's `;`)
    /// suppresses the implicit newline (§6).
    Comma,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PrintStmt {
    pub parts: Vec<PrintPart>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhenArm {
    pub pattern: Expr,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDef {
    pub name: String,
    pub parameters: Vec<Variable>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Print(PrintStmt),
    Init {
        name: Variable,
        mutable: bool,
        value: Expr,
    },
    Assign {
        name: Variable,
        value: Expr,
    },
    If {
        condition: Expr,
        true_block: Vec<Stmt>,
        false_block: Vec<Stmt>,
    },
    While {
        condition: Expr,
        body: Vec<Stmt>,
    },
    Repeat {
        body: Vec<Stmt>,
        condition: Expr,
    },
    Case {
        scrutinee: Expr,
        arms: Vec<WhenArm>,
        otherwise: Vec<Stmt>,
    },
    Function(FunctionDef),
    FunctionCall {
        name: String,
        args: Vec<Expr>,
    },
    Return(Option<Expr>),
    ExprFunction {
        name: String,
        parameters: Vec<Variable>,
        expression: Expr,
    },
    Class {
        name: String,
        variables: Vec<Variable>,
        methods: Vec<FunctionDef>,
    },
    DataAssign {
        name: Variable,
        member_list: Vec<Variable>,
        value: Expr,
    },
    MethodCall {
        name: Variable,
        member_list: Vec<Variable>,
        method: String,
        args: Vec<Expr>,
    },
    Expression(Expr),
    ListInit {
        name: Variable,
        mutable: bool,
        element_type: Option<String>,
        elements: Vec<Expr>,
    },
    ListAssign {
        name: Variable,
        indexes: Vec<Expr>,
        value: Expr,
    },
    DataListAssign {
        name: Variable,
        member_list: Vec<Variable>,
        indexes: Vec<Expr>,
        value: Expr,
    },
}

/// A whole parsed program: a flat top-level statement sequence, with
/// `Stmt::Function`/`Stmt::Class` entries interspersed wherever they were
/// declared, matching §3's "top level is itself a function body".
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub statements: Vec<Stmt>,
}
