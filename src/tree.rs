//! Reconstruction of a typed parse tree from completed Earley states, and
//! the match-level operations built on top of it.
use crate::agreement;
use crate::fact::FactOutcome;
use crate::grammar::Rule;
use crate::interpret;
use crate::morph::MorphService;
use crate::token::Token;
use std::borrow::Cow;
use std::fmt::{Display, Formatter};

/// The parse tree produced by [`Match`] assembly: `Node(rule-meta, children)`
/// for a completed non-terminal, `Leaf(token)` for a scanned terminal.
#[derive(Debug, Clone)]
pub enum Tree {
    Node { rule: Rule, children: Vec<Tree> },
    Leaf(Token),
}

impl Tree {
    pub fn leaves(&self) -> Vec<&Token> {
        let mut out = Vec::new();
        collect_leaves(self, &mut out);
        out
    }
}

fn collect_leaves<'t>(tree: &'t Tree, out: &mut Vec<&'t Token>) {
    match tree {
        Tree::Leaf(t) => out.push(t),
        Tree::Node { children, .. } => {
            for c in children {
                collect_leaves(c, out);
            }
        }
    }
}

impl Display for Tree {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Tree::Leaf(t) => write!(f, "{}", t.value),
            Tree::Node { rule, children } => {
                write!(f, "{}(", rule)?;
                for (i, c) in children.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", c)?;
                }
                write!(f, ")")
            }
        }
    }
}

impl ptree::TreeItem for Tree {
    type Child = Tree;

    fn write_self<W: std::io::Write>(&self, f: &mut W, _style: &ptree::Style) -> std::io::Result<()> {
        match self {
            Tree::Leaf(t) => write!(f, "{:?}", t.value),
            Tree::Node { rule, .. } => write!(f, "{}", rule),
        }
    }

    fn children(&self) -> Cow<[Self::Child]> {
        match self {
            Tree::Leaf(_) => Cow::Owned(Vec::new()),
            Tree::Node { children, .. } => Cow::Borrowed(children),
        }
    }
}

/// Renders `tree` as an indented listing via [`ptree`].
pub fn print_tree(tree: &Tree) -> String {
    let mut buf = Vec::new();
    let _ = ptree::write_tree(tree, &mut buf);
    String::from_utf8_lossy(&buf).into_owned()
}

/// A non-overlapping span of the input matched by `rule`.
///
/// Created from a completed Earley state by the chart's match-assembly step.
#[derive(Debug, Clone)]
pub struct Match {
    pub rule: Rule,
    pub tokens: Vec<Token>,
    pub start: usize,
    pub stop: usize,
    pub tree: Tree,
}

impl Match {
    /// `span(match)` — `(first_token.start, last_token.stop)`, or `(0, 0)`
    /// for an empty match.
    pub fn span(&self) -> (usize, usize) {
        match (self.tokens.first(), self.tokens.last()) {
            (Some(first), Some(last)) => (first.start, last.stop),
            _ => (0, 0),
        }
    }

    /// `text(match)` — space-joined token values. Non-canonical: callers
    /// needing a faithful source-text span should use `span` against the
    /// original input's character range instead.
    pub fn text(&self) -> String {
        self.tokens
            .iter()
            .map(|t| t.value.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// `fact(match)` — runs the interpretation engine over this match's tree.
    pub fn fact(
        &self,
        morph: &dyn MorphService,
        schemas: &crate::fact::SchemaRegistry,
    ) -> Result<FactOutcome, crate::error::InterpretError> {
        interpret::interpret(&self.tree, morph, schemas)
    }

    /// `valid_relations?(match)` — runs the agreement validator over this
    /// match's tree.
    pub fn valid_relations(&self) -> bool {
        agreement::validate(&self.tree)
    }
}
