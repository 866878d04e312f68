//! Orchestration of element analyzers over one unit.

use std::sync::Arc;

use tracing::debug;

use super::traits::{Aggregator, ContextController, ElementAnalyzer, PartialResult};
use crate::error::AnalyzerFailure;
use crate::parser::{SyntaxNode, SyntaxUnit};

/// Partial results collected from one or more units, before aggregation.
#[derive(Debug)]
pub struct Collected<P> {
    pub partials: Vec<PartialResult<P>>,
    pub failures: Vec<AnalyzerFailure>,
}

impl<P> Default for Collected<P> {
    fn default() -> Self {
        Self {
            partials: Vec::new(),
            failures: Vec::new(),
        }
    }
}

impl<P> Collected<P> {
    /// Append another collection, keeping order.
    pub fn extend(&mut self, other: Collected<P>) {
        self.partials.extend(other.partials);
        self.failures.extend(other.failures);
    }

    /// Transform every partial value, keeping provenance and failures.
    pub fn map<Q>(self, mut f: impl FnMut(P) -> Q) -> Collected<Q> {
        Collected {
            partials: self.partials.into_iter().map(|p| p.map(&mut f)).collect(),
            failures: self.failures,
        }
    }

    /// Expand every partial value into zero or more values located at the
    /// same node.
    pub fn flat_map<Q, I>(self, mut f: impl FnMut(P) -> I) -> Collected<Q>
    where
        I: IntoIterator<Item = Q>,
    {
        let mut partials = Vec::new();
        for partial in self.partials {
            let PartialResult {
                analyzer,
                path,
                module,
                line,
                value,
            } = partial;
            partials.extend(f(value).into_iter().map(|value| PartialResult {
                analyzer,
                path: path.clone(),
                module: module.clone(),
                line,
                value,
            }));
        }
        Collected {
            partials,
            failures: self.failures,
        }
    }
}

/// An aggregated result plus the analyzer failures recorded on the way.
#[derive(Debug)]
pub struct Analyzed<R> {
    pub result: R,
    pub failures: Vec<AnalyzerFailure>,
}

enum Step<'a> {
    Enter(&'a SyntaxNode),
    Exit(&'a SyntaxNode),
}

/// Runs an ordered list of element analyzers over a unit and folds their
/// partial results with one aggregator.
///
/// Traversal is a single preorder pass. At every node the controllers open
/// first, then each analyzer that accepts the node runs in configured order;
/// controllers close after the node's subtree. Partials are therefore in
/// source order, with ties broken by analyzer order.
pub struct MainAnalyzer<C, P, R> {
    controllers: Vec<Box<dyn ContextController<C>>>,
    analyzers: Vec<Box<dyn ElementAnalyzer<C, P>>>,
    aggregator: Arc<dyn Aggregator<P, R>>,
}

impl<C: Default, P, R> MainAnalyzer<C, P, R> {
    /// Create a main analyzer from analyzers and a (possibly shared) aggregator.
    pub fn new(
        analyzers: Vec<Box<dyn ElementAnalyzer<C, P>>>,
        aggregator: Arc<dyn Aggregator<P, R>>,
    ) -> Self {
        Self {
            controllers: Vec::new(),
            analyzers,
            aggregator,
        }
    }

    /// Add a context controller.
    pub fn with_controller(mut self, controller: impl ContextController<C> + 'static) -> Self {
        self.controllers.push(Box::new(controller));
        self
    }

    pub fn aggregator(&self) -> &Arc<dyn Aggregator<P, R>> {
        &self.aggregator
    }

    /// Collect partial results from one unit without aggregating.
    pub fn collect(&self, unit: &SyntaxUnit) -> Collected<P> {
        let mut context = C::default();
        let mut collected = Collected::default();
        let mut stack = vec![Step::Enter(unit.root())];

        while let Some(step) = stack.pop() {
            match step {
                Step::Enter(node) => {
                    for controller in &self.controllers {
                        controller.open(node, unit, &mut context);
                    }

                    for analyzer in &self.analyzers {
                        if !analyzer.accepts(node) {
                            continue;
                        }
                        match analyzer.analyze(node, unit, &context) {
                            Ok(Some(value)) => collected.partials.push(PartialResult::new(
                                analyzer.name(),
                                unit,
                                node,
                                value,
                            )),
                            Ok(None) => {}
                            Err(failure) => {
                                debug!(%failure, "dropping partial result");
                                collected.failures.push(failure);
                            }
                        }
                    }

                    stack.push(Step::Exit(node));
                    for child in node.children().iter().rev() {
                        stack.push(Step::Enter(child));
                    }
                }
                Step::Exit(node) => {
                    for controller in self.controllers.iter().rev() {
                        controller.close(node, unit, &mut context);
                    }
                }
            }
        }

        collected
    }

    /// Analyze one unit and aggregate its partials.
    pub fn run(&self, unit: &SyntaxUnit) -> Analyzed<R> {
        let collected = self.collect(unit);
        Analyzed {
            result: self.aggregator.aggregate(collected.partials),
            failures: collected.failures,
        }
    }

    /// Analyze several units in order and aggregate all partials at once.
    pub fn run_all<'a>(&self, units: impl IntoIterator<Item = &'a SyntaxUnit>) -> Analyzed<R> {
        let mut collected = Collected::default();
        for unit in units {
            collected.extend(self.collect(unit));
        }
        Analyzed {
            result: self.aggregator.aggregate(collected.partials),
            failures: collected.failures,
        }
    }
}
