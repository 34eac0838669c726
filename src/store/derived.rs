//! Derived values with hand-declared dependencies.
//!
//! Each node names the slices it reads. Nodes are sorted once (Kahn's
//! algorithm) so a recompute pass visits every node after its inputs.

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DerivedError {
    #[error("derived value '{0}' declared twice")]
    Duplicate(&'static str),

    #[error("derived values form a cycle: {0:?}")]
    Cycle(Vec<&'static str>),
}

type ComputeFn<S> = Box<dyn Fn(&mut S) -> bool + Send + Sync>;

/// One derived value. `compute` writes the value into the state and reports
/// whether it changed.
pub struct DerivedNode<S> {
    name: &'static str,
    deps: Vec<&'static str>,
    compute: ComputeFn<S>,
}

impl<S> DerivedNode<S> {
    pub fn new<F>(name: &'static str, deps: &[&'static str], compute: F) -> Self
    where
        F: Fn(&mut S) -> bool + Send + Sync + 'static,
    {
        Self {
            name,
            deps: deps.to_vec(),
            compute: Box::new(compute),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl<S> fmt::Debug for DerivedNode<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DerivedNode")
            .field("name", &self.name)
            .field("deps", &self.deps)
            .finish_non_exhaustive()
    }
}

/// Derived nodes in evaluation order.
pub struct DerivedGraph<S> {
    order: Vec<DerivedNode<S>>,
}

impl<S> fmt::Debug for DerivedGraph<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.order.iter().map(|n| n.name)).finish()
    }
}

impl<S> DerivedGraph<S> {
    pub fn empty() -> Self {
        Self { order: Vec::new() }
    }

    pub fn new(nodes: Vec<DerivedNode<S>>) -> Result<Self, DerivedError> {
        let mut position: HashMap<&'static str, usize> = HashMap::new();
        for (i, node) in nodes.iter().enumerate() {
            if position.insert(node.name, i).is_some() {
                return Err(DerivedError::Duplicate(node.name));
            }
        }

        // edge dep -> dependent, only between derived nodes
        let mut indegree = vec![0usize; nodes.len()];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
        for (i, node) in nodes.iter().enumerate() {
            for dep in &node.deps {
                if let Some(&d) = position.get(dep) {
                    dependents[d].push(i);
                    indegree[i] += 1;
                }
            }
        }

        let mut queue: VecDeque<usize> = (0..nodes.len()).filter(|&i| indegree[i] == 0).collect();
        let mut sorted = Vec::with_capacity(nodes.len());
        while let Some(i) = queue.pop_front() {
            sorted.push(i);
            for &next in &dependents[i] {
                indegree[next] -= 1;
                if indegree[next] == 0 {
                    queue.push_back(next);
                }
            }
        }

        if sorted.len() != nodes.len() {
            let stuck = (0..nodes.len())
                .filter(|&i| indegree[i] > 0)
                .map(|i| nodes[i].name)
                .collect();
            return Err(DerivedError::Cycle(stuck));
        }

        let mut slots: Vec<Option<DerivedNode<S>>> = nodes.into_iter().map(Some).collect();
        let order = sorted.into_iter().filter_map(|i| slots[i].take()).collect();
        Ok(Self { order })
    }

    /// Names in evaluation order.
    pub fn names(&self) -> Vec<&'static str> {
        self.order.iter().map(|n| n.name).collect()
    }

    /// Recompute nodes whose inputs are in `changed`; their own names are
    /// added to `changed` when their value moves.
    pub fn recompute(&self, state: &mut S, changed: &mut HashSet<&'static str>) {
        for node in &self.order {
            if node.deps.iter().any(|d| changed.contains(d)) && (node.compute)(state) {
                changed.insert(node.name);
            }
        }
    }

    /// Recompute every node regardless of inputs.
    pub fn recompute_all(&self, state: &mut S) {
        for node in &self.order {
            (node.compute)(state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Counts {
        base: i32,
        double: i32,
        quad: i32,
    }

    fn graph() -> DerivedGraph<Counts> {
        DerivedGraph::new(vec![
            DerivedNode::new("quad", &["double"], |s: &mut Counts| {
                let v = s.double * 2;
                let changed = v != s.quad;
                s.quad = v;
                changed
            }),
            DerivedNode::new("double", &["base"], |s: &mut Counts| {
                let v = s.base * 2;
                let changed = v != s.double;
                s.double = v;
                changed
            }),
        ])
        .unwrap()
    }

    #[test]
    fn test_topological_order() {
        assert_eq!(graph().names(), vec!["double", "quad"]);
    }

    #[test]
    fn test_recompute_propagates() {
        let g = graph();
        let mut s = Counts { base: 3, ..Default::default() };
        let mut changed: HashSet<&'static str> = ["base"].into_iter().collect();
        g.recompute(&mut s, &mut changed);
        assert_eq!(s.quad, 12);
        assert!(changed.contains("double") && changed.contains("quad"));
    }

    #[test]
    fn test_unrelated_change_skips() {
        let g = graph();
        let mut s = Counts { base: 3, ..Default::default() };
        let mut changed: HashSet<&'static str> = ["other"].into_iter().collect();
        g.recompute(&mut s, &mut changed);
        assert_eq!(s.double, 0);
        assert_eq!(changed.len(), 1);
    }

    #[test]
    fn test_cycle_is_rejected() {
        let noop = |_: &mut Counts| false;
        let err = DerivedGraph::new(vec![
            DerivedNode::new("a", &["b"], noop),
            DerivedNode::new("b", &["a"], noop),
        ])
        .unwrap_err();
        assert!(matches!(err, DerivedError::Cycle(names) if names.len() == 2));
    }

    #[test]
    fn test_duplicate_is_rejected() {
        let noop = |_: &mut Counts| false;
        let err = DerivedGraph::new(vec![
            DerivedNode::new("a", &[], noop),
            DerivedNode::new("a", &[], noop),
        ])
        .unwrap_err();
        assert_eq!(err, DerivedError::Duplicate("a"));
    }
}
