//! Identifier model: canonical table/column names and lineage fragments.
//!
//! T-SQL identifiers are case-insensitive, so every name is lowercased at the
//! boundary and all comparisons afterwards are plain string equality. A
//! [`ColumnRef`] additionally carries the classification of its table
//! (permanent, temp, CTE, unresolved alias) as observed at the moment the
//! reference was created; the resolver relies on that snapshot rather than
//! re-deriving it later.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of the table a column reference belongs to.
///
/// Recorded at fragment-creation time against the live scope stack. Temp and
/// CTE nodes are interior nodes of the lineage graph; only `Permanent` nodes
/// survive resolution. `Unresolved` marks a reference whose alias could not
/// be resolved: it behaves like an intermediate with no predecessors and
/// drops out of the final report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableKind {
    Permanent,
    Temp,
    Cte,
    Unresolved,
}

impl TableKind {
    /// True for nodes that are eliminated during resolution.
    pub fn is_intermediate(self) -> bool {
        !matches!(self, TableKind::Permanent)
    }
}

/// A fully resolved column reference.
///
/// Both parts are canonicalized to lowercase on construction; aliases never
/// appear here (an unresolvable alias is stored as the table name with
/// [`TableKind::Unresolved`]).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ColumnRef {
    pub table: String,
    pub column: String,
    pub kind: TableKind,
}

impl ColumnRef {
    pub fn new(table: &str, column: &str, kind: TableKind) -> Self {
        Self {
            table: table.to_lowercase(),
            column: column.to_lowercase(),
            kind,
        }
    }

    /// True when the table is a temp table (`#`-prefixed).
    pub fn is_temp(&self) -> bool {
        self.kind == TableKind::Temp
    }

    /// True when this node is eliminated during resolution.
    pub fn is_intermediate(&self) -> bool {
        self.kind.is_intermediate()
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}].[{}]", self.table, self.column)
    }
}

/// One directed edge `source → target` contributed by a single DML clause.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LineageFragment {
    pub source: ColumnRef,
    pub target: ColumnRef,
}

impl LineageFragment {
    pub fn new(source: ColumnRef, target: ColumnRef) -> Self {
        Self { source, target }
    }
}

/// True when a raw table name denotes a temp table.
pub fn is_temp_table_name(name: &str) -> bool {
    name.starts_with('#')
}

/// Canonicalizes a possibly qualified, possibly quoted table reference.
///
/// Splits on `.` outside quoting, strips `[..]`, `".."` and `` `..` ``
/// delimiters from each part and lowercases the rest, so `[dbo].[Customer]`,
/// `dbo.customer` and `DBO.CUSTOMER` all canonicalize identically.
pub fn canonical_table_name(name: &str) -> String {
    split_qualified(name)
        .into_iter()
        .map(|part| canonical_ident(&part))
        .collect::<Vec<_>>()
        .join(".")
}

/// Canonicalizes a single identifier part.
pub fn canonical_ident(part: &str) -> String {
    let part = part.trim();
    let unquoted = if (part.starts_with('[') && part.ends_with(']'))
        || (part.starts_with('"') && part.ends_with('"'))
        || (part.starts_with('`') && part.ends_with('`'))
    {
        &part[1..part.len() - 1]
    } else {
        part
    };
    unquoted.to_lowercase()
}

/// Returns the last segment of a qualified name (`dbo.customer` → `customer`).
pub fn simple_name(canonical: &str) -> &str {
    canonical.rsplit('.').next().unwrap_or(canonical)
}

fn split_qualified(name: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;

    for ch in name.chars() {
        match quote {
            Some(open) => {
                current.push(ch);
                let close = match open {
                    '[' => ']',
                    other => other,
                };
                if ch == close {
                    quote = None;
                }
            }
            None => match ch {
                '[' | '"' | '`' => {
                    current.push(ch);
                    quote = Some(ch);
                }
                '.' => {
                    parts.push(std::mem::take(&mut current));
                }
                _ => current.push(ch),
            },
        }
    }
    if !current.is_empty() {
        parts.push(current);
    }
    parts
}
