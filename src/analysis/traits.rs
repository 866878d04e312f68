//! Core traits for element analysis and aggregation.

use crate::error::AnalyzerFailure;
use crate::parser::{SyntaxNode, SyntaxUnit};

/// Context type for analyses that need no traversal context.
pub type NoContext = ();

/// One analyzer's contribution for one node of one unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialResult<P> {
    /// Name of the analyzer that produced the value.
    pub analyzer: &'static str,
    /// Project-relative path of the unit.
    pub path: String,
    /// Module the unit belongs to (`.` for the project root).
    pub module: String,
    /// 1-indexed line of the node.
    pub line: usize,
    pub value: P,
}

impl<P> PartialResult<P> {
    /// Build a partial located at `node` of `unit`.
    pub fn new(analyzer: &'static str, unit: &SyntaxUnit, node: &SyntaxNode, value: P) -> Self {
        Self {
            analyzer,
            path: unit.relative_path().to_string(),
            module: unit.module().to_string(),
            line: node.line(),
            value,
        }
    }

    /// Transform the value, keeping provenance.
    pub fn map<Q>(self, f: impl FnOnce(P) -> Q) -> PartialResult<Q> {
        PartialResult {
            analyzer: self.analyzer,
            path: self.path,
            module: self.module,
            line: self.line,
            value: f(self.value),
        }
    }
}

/// Visits nodes of one kind family and produces partial results.
///
/// Analyzers are read-only with respect to the unit. Returning `Ok(None)`
/// means "not mine" (e.g. a statement outside the block the analyzer cares
/// about); `Err` reports a node the analyzer should understand but cannot, in
/// which case the partial is dropped and the failure recorded.
pub trait ElementAnalyzer<C, P>: Send + Sync {
    /// Analyzer name, used in failure records.
    fn name(&self) -> &'static str;

    /// Node kinds this analyzer targets.
    fn target_kinds(&self) -> &'static [&'static str];

    /// Analyze one matching node.
    fn analyze(
        &self,
        node: &SyntaxNode,
        unit: &SyntaxUnit,
        context: &C,
    ) -> Result<Option<P>, AnalyzerFailure>;

    /// Check if this analyzer handles the given node.
    fn accepts(&self, node: &SyntaxNode) -> bool {
        self.target_kinds().contains(&node.kind())
    }

    /// Build a failure record for `node`.
    fn failure(&self, unit: &SyntaxUnit, node: &SyntaxNode, message: String) -> AnalyzerFailure {
        AnalyzerFailure {
            analyzer: self.name(),
            path: unit.relative_path().to_string(),
            line: node.line(),
            message,
        }
    }
}

/// Maintains traversal context around nodes.
///
/// `open` runs before analyzers see a node, `close` after its subtree.
pub trait ContextController<C>: Send + Sync {
    fn open(&self, node: &SyntaxNode, unit: &SyntaxUnit, context: &mut C);

    fn close(&self, node: &SyntaxNode, unit: &SyntaxUnit, context: &mut C);
}

/// Whether an aggregated result depends on the order of its partials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultOrder {
    /// Input order is preserved (ordered import lists).
    SourceOrder,
    /// Set semantics: deduplicated and emitted sorted, so any permutation of
    /// the input aggregates to the same result.
    Unordered,
}

/// Folds partial results into one result.
///
/// Implementations must be pure folds and must accept an empty input,
/// returning the empty value.
pub trait Aggregator<P, R>: Send + Sync {
    /// Declared order sensitivity.
    fn order(&self) -> ResultOrder;

    fn aggregate(&self, partials: Vec<PartialResult<P>>) -> R;
}
