use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use derivative::Derivative;

use crate::ident::Ident;
use crate::span::{HasSpan, Span};

/// A machine-generated, unique id identifying one node of one parse.
///
/// Node ids take part in the evaluator's per-node memoization; they are
/// deliberately excluded from `Hash` and `PartialEq` on [`Ast`] so that
/// structurally equal trees compare equal regardless of where they were
/// parsed.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct NodeId(pub u64);

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(0);

impl NodeId {
    /// Allocates an id never handed out before in this process.
    pub fn fresh() -> NodeId {
        NodeId(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One node of the surface syntax tree.
///
/// Equality and hashing ignore `id` and `span`: the remaining structural part
/// is the canonical key under which rule matches are memoized.
#[derive(Debug, Clone, Derivative)]
#[derivative(Hash, PartialEq, Eq)]
pub struct Ast {
    #[derivative(PartialEq = "ignore", Hash = "ignore")]
    pub id: NodeId,
    #[derivative(PartialEq = "ignore", Hash = "ignore")]
    pub span: Span,
    pub node: Node,
}

impl Ast {
    pub fn new(id: NodeId, span: Span, node: Node) -> Self {
        Ast { id, span, node }
    }

    pub fn kind(&self) -> NodeKind {
        self.node.kind()
    }

    /// Flattens `Name` and `Attribute` chains to a dotted path (`np.zeros`).
    pub fn dotted_name(&self) -> Option<String> {
        match &self.node {
            Node::Name { id } => Some(id.id.clone()),
            Node::Attribute { value, attr } => {
                value.dotted_name().map(|prefix| format!("{prefix}.{attr}"))
            }
            _ => None,
        }
    }
}

impl HasSpan for Ast {
    fn span(&self) -> Span {
        self.span
    }
}

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum BoolOpKind {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum UnaryOpKind {
    Not,
}

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum BinOpKind {
    Add,
    Mul,
}

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum CmpOpKind {
    Eq,
    Lt,
    Gt,
    Le,
    Ge,
}

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum Node {
    Module {
        body: Vec<Ast>,
    },

    // Statements
    //
    //
    Assign {
        target: Box<Ast>,
        value: Box<Ast>,
    },
    AnnAssign {
        target: Box<Ast>,
        anno: Box<Ast>,
        value: Option<Box<Ast>>,
    },
    If {
        test: Box<Ast>,
        body: Vec<Ast>,
        orelse: Vec<Ast>,
    },
    FunctionDef {
        name: Ident,
        params: Vec<Ast>,
        returns: Box<Ast>,
        body: Vec<Ast>,
    },
    Return {
        value: Box<Ast>,
    },
    Assert {
        test: Box<Ast>,
    },
    ExprStmt {
        value: Box<Ast>,
    },
    Pass,
    Import {
        module: Ident,
        alias: Ident,
    },

    // Expressions
    //
    //
    Name {
        id: Ident,
    },
    Num {
        value: i64,
    },
    NoneLit,
    TrueLit,
    FalseLit,
    Attribute {
        value: Box<Ast>,
        attr: Ident,
    },
    Subscript {
        value: Box<Ast>,
        index: Box<Ast>,
    },
    Call {
        func: Box<Ast>,
        args: Vec<Ast>,
    },
    Lambda {
        params: Vec<Ast>,
        body: Box<Ast>,
    },
    BoolOp {
        op: BoolOpKind,
        left: Box<Ast>,
        right: Box<Ast>,
    },
    UnaryOp {
        op: UnaryOpKind,
        operand: Box<Ast>,
    },
    BinOp {
        op: BinOpKind,
        left: Box<Ast>,
        right: Box<Ast>,
    },
    Compare {
        op: CmpOpKind,
        left: Box<Ast>,
        right: Box<Ast>,
    },
    IfExp {
        test: Box<Ast>,
        body: Box<Ast>,
        orelse: Box<Ast>,
    },

    /// A `def` or `lambda` parameter, possibly annotated.
    Param {
        name: Ident,
        anno: Option<Box<Ast>>,
    },
}

impl Node {
    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Module { .. } => NodeKind::Module,
            Node::Assign { .. } => NodeKind::Assign,
            Node::AnnAssign { .. } => NodeKind::AnnAssign,
            Node::If { .. } => NodeKind::If,
            Node::FunctionDef { .. } => NodeKind::FunctionDef,
            Node::Return { .. } => NodeKind::Return,
            Node::Assert { .. } => NodeKind::Assert,
            Node::ExprStmt { .. } => NodeKind::ExprStmt,
            Node::Pass => NodeKind::Pass,
            Node::Import { .. } => NodeKind::Import,
            Node::Name { .. } => NodeKind::Name,
            Node::Num { .. } => NodeKind::Num,
            Node::NoneLit => NodeKind::NoneLit,
            Node::TrueLit => NodeKind::TrueLit,
            Node::FalseLit => NodeKind::FalseLit,
            Node::Attribute { .. } => NodeKind::Attribute,
            Node::Subscript { .. } => NodeKind::Subscript,
            Node::Call { .. } => NodeKind::Call,
            Node::Lambda { .. } => NodeKind::Lambda,
            Node::BoolOp { .. } => NodeKind::BoolOp,
            Node::UnaryOp { .. } => NodeKind::UnaryOp,
            Node::BinOp { .. } => NodeKind::BinOp,
            Node::Compare { .. } => NodeKind::Compare,
            Node::IfExp { .. } => NodeKind::IfExp,
            Node::Param { .. } => NodeKind::Param,
        }
    }
}

/// The discriminant of [`Node`], used by `x__Kind` pattern captures.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum NodeKind {
    Module,
    Assign,
    AnnAssign,
    If,
    FunctionDef,
    Return,
    Assert,
    ExprStmt,
    Pass,
    Import,
    Name,
    Num,
    NoneLit,
    TrueLit,
    FalseLit,
    Attribute,
    Subscript,
    Call,
    Lambda,
    BoolOp,
    UnaryOp,
    BinOp,
    Compare,
    IfExp,
    Param,
}

impl NodeKind {
    /// The name under which a kind can be demanded in a typed capture,
    /// e.g. the `Name` in `a__Name`.
    pub fn from_capture_name(name: &str) -> Option<NodeKind> {
        match name {
            "Name" => Some(NodeKind::Name),
            "Num" => Some(NodeKind::Num),
            "Attribute" => Some(NodeKind::Attribute),
            "Call" => Some(NodeKind::Call),
            "Lambda" => Some(NodeKind::Lambda),
            "Subscript" => Some(NodeKind::Subscript),
            _ => None,
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}
