use metaport_db::models::{ComparisonOp, LogicalOp};

/// Legacy comparison tokens and the operator each one became.
pub const OPERATORS: [(&str, ComparisonOp); 10] = [
    ("is like", ComparisonOp::Like),
    (">", ComparisonOp::Gt),
    ("<", ComparisonOp::Lt),
    (">=", ComparisonOp::Gte),
    ("<=", ComparisonOp::Lte),
    ("is equal", ComparisonOp::Eq),
    ("is not null", ComparisonOp::Notnull),
    ("is null", ComparisonOp::Null),
    ("is not equal", ComparisonOp::Neq),
    ("is not like", ComparisonOp::Nlike),
];

/// Unmapped tokens translate to `None`.
pub fn translate(legacy: &str) -> Option<ComparisonOp> {
    OPERATORS
        .iter()
        .find(|(token, _)| *token == legacy)
        .map(|(_, op)| *op)
}

pub fn logical(legacy: Option<&str>) -> Option<LogicalOp> {
    legacy.and_then(|op| op.trim().parse().ok())
}
