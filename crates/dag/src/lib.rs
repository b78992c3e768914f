pub mod error;

use crate::error::DagError;
use components::{Activity, ObjectId};
use log::{debug, info};
use petgraph::algo::{is_cyclic_directed, kosaraju_scc, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::time::Instant;

pub type DagResult<T> = Result<T, DagError>;

#[derive(Clone, Copy, Debug, Default)]
pub struct EmptyEdge;

impl Display for EmptyEdge {
    fn fmt(&self, _: &mut Formatter<'_>) -> std::fmt::Result {
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct DagNode {
    pub id: ObjectId,
    pub activity_type: &'static str,
    /// Direct predecessors in declaration order.
    pub depends_on: Vec<ObjectId>,
}

/// Dependency graph over the activities of one compiled pipeline. Edges
/// point from a predecessor to the activity waiting on it.
#[derive(Debug, Default)]
pub struct ActivityDag {
    pub graph: DiGraph<DagNode, EmptyEdge>,
    pub id_to_index: HashMap<ObjectId, NodeIndex>,
}

impl ActivityDag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn build<'a>(activities: impl IntoIterator<Item = &'a Activity>) -> DagResult<Self> {
        let started = Instant::now();
        let mut dag = Self::new();

        // first pass - nodes
        for activity in activities {
            if dag.id_to_index.contains_key(&activity.id) {
                return Err(DagError::duplicate_node(activity.id.as_str()));
            }
            let idx = dag.graph.add_node(DagNode {
                id: activity.id.clone(),
                activity_type: activity.kind.type_name(),
                depends_on: activity.depends_on().to_vec(),
            });
            dag.id_to_index.insert(activity.id.clone(), idx);
        }

        // second pass - edges
        for idx in dag.graph.node_indices().collect::<Vec<_>>() {
            let node = dag.graph[idx].clone();
            for dep in &node.depends_on {
                let from = dag.get_index(dep).ok_or_else(|| {
                    DagError::missing_dependency(format!(
                        "activity '{}' depends on '{}' which is not an activity",
                        node.id, dep
                    ))
                })?;
                dag.graph.add_edge(from, idx, EmptyEdge);
            }
        }

        if is_cyclic_directed(&dag.graph) {
            return Err(dag.cycle_error());
        }

        info!(
            "ActivityDag::build completed for {} activities in {:.3}s",
            dag.graph.node_count(),
            started.elapsed().as_secs_f64()
        );
        Ok(dag)
    }

    fn cycle_error(&self) -> DagError {
        let mut cycle: Vec<String> = kosaraju_scc(&self.graph)
            .into_iter()
            .find(|scc| scc.len() > 1)
            .unwrap_or_default()
            .into_iter()
            .map(|idx| self.graph[idx].id.to_string())
            .collect();
        cycle.sort();
        DagError::cycle(cycle)
    }

    pub fn get(&self, id: &ObjectId) -> Option<&DagNode> {
        self.id_to_index.get(id).map(|&idx| &self.graph[idx])
    }

    pub fn get_index(&self, id: &ObjectId) -> Option<NodeIndex> {
        self.id_to_index.get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn toposort(&self) -> DagResult<Vec<&DagNode>> {
        let order = toposort(&self.graph, None).map_err(|_| self.cycle_error())?;
        Ok(order.into_iter().map(|idx| &self.graph[idx]).collect())
    }

    pub fn traverse(&self, start: NodeIndex, direction: Direction) -> BTreeSet<NodeIndex> {
        let mut visited = BTreeSet::new();
        let mut stack = vec![start];
        while let Some(current) = stack.pop() {
            for next in self.graph.neighbors_directed(current, direction) {
                if visited.insert(next) {
                    stack.push(next);
                }
            }
        }
        visited
    }

    /// Every activity that must finish before `id` may start.
    pub fn ancestors(&self, id: &ObjectId) -> BTreeSet<ObjectId> {
        self.related(id, Direction::Incoming)
    }

    pub fn descendants(&self, id: &ObjectId) -> BTreeSet<ObjectId> {
        self.related(id, Direction::Outgoing)
    }

    fn related(&self, id: &ObjectId, direction: Direction) -> BTreeSet<ObjectId> {
        match self.get_index(id) {
            Some(start) => self
                .traverse(start, direction)
                .into_iter()
                .map(|idx| self.graph[idx].id.clone())
                .collect(),
            None => BTreeSet::new(),
        }
    }

    /// Direct predecessors of each activity with every edge implied by a
    /// longer path removed. Surviving predecessors keep declaration order.
    pub fn reduced_dependencies(&self) -> BTreeMap<ObjectId, Vec<ObjectId>> {
        let mut ancestor_cache: HashMap<NodeIndex, BTreeSet<NodeIndex>> = HashMap::new();
        let mut reduced = BTreeMap::new();

        for idx in self.graph.node_indices() {
            let node = &self.graph[idx];
            let preds: Vec<NodeIndex> = node
                .depends_on
                .iter()
                .filter_map(|dep| self.get_index(dep))
                .collect();

            let mut kept = Vec::new();
            for &candidate in &preds {
                let implied = preds.iter().any(|&other| {
                    other != candidate
                        && ancestor_cache
                            .entry(other)
                            .or_insert_with(|| self.traverse(other, Direction::Incoming))
                            .contains(&candidate)
                });
                if implied {
                    debug!(
                        "dropping implied edge {} -> {}",
                        self.graph[candidate].id, node.id
                    );
                } else {
                    kept.push(self.graph[candidate].id.clone());
                }
            }
            reduced.insert(node.id.clone(), kept);
        }
        reduced
    }

    /// Render the graph as DOT, left to right in execution order.
    pub fn to_dot_string(&self) -> String {
        use std::fmt::Write;

        let mut dot = String::new();
        let _ = writeln!(dot, "digraph {{");
        let _ = writeln!(dot, "    rankdir=LR;");
        for idx in self.graph.node_indices() {
            let node = &self.graph[idx];
            let _ = writeln!(
                dot,
                "    {} [label=\"{}\\n{}\"];",
                idx.index(),
                node.id,
                node.activity_type
            );
        }
        for edge in self.graph.edge_references() {
            let _ = writeln!(
                dot,
                "    {} -> {};",
                edge.source().index(),
                edge.target().index()
            );
        }
        let _ = writeln!(dot, "}}");
        dot
    }

    pub fn export_dot_to<P: AsRef<Path>>(&self, path: P) -> DagResult<()> {
        std::fs::write(path, self.to_dot_string())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use components::{ActivityKind, Runner, ShellCommand};

    fn init_logging() {
        let _ = env_logger::Builder::new()
            .filter_level(log::LevelFilter::Debug)
            .is_test(true)
            .try_init();
    }

    fn activity(id: &str, deps: &[&str]) -> Activity {
        let mut activity = Activity::new(
            id,
            ActivityKind::ShellCommand(ShellCommand::command("true")),
            &ObjectId::new("DefaultSchedule"),
            Runner::Resource(ObjectId::new("Ec2Resource")),
        );
        for dep in deps {
            activity.add_dependency(&ObjectId::new(*dep));
        }
        activity
    }

    fn ids(values: &[&str]) -> Vec<ObjectId> {
        values.iter().map(|v| ObjectId::new(*v)).collect()
    }

    #[test]
    fn orders_and_reduces() -> Result<(), DagError> {
        init_logging();
        let activities = vec![
            activity("A", &[]),
            activity("B", &["A"]),
            activity("C", &["A", "B"]),
            activity("D", &["C", "A", "B"]),
        ];
        let dag = ActivityDag::build(&activities)?;

        let order: Vec<String> = dag.toposort()?.iter().map(|n| n.id.to_string()).collect();
        assert_eq!(order, vec!["A", "B", "C", "D"]);

        let reduced = dag.reduced_dependencies();
        assert_eq!(reduced[&ObjectId::new("B")], ids(&["A"]));
        assert_eq!(reduced[&ObjectId::new("C")], ids(&["B"]));
        assert_eq!(reduced[&ObjectId::new("D")], ids(&["C"]));
        assert_eq!(
            dag.ancestors(&ObjectId::new("D")),
            ids(&["A", "B", "C"]).into_iter().collect()
        );
        Ok(())
    }

    #[test]
    fn independent_branches_are_kept() -> Result<(), DagError> {
        let activities = vec![
            activity("Boot", &[]),
            activity("X", &["Boot"]),
            activity("Y", &["Boot"]),
            activity("Z", &["X", "Y", "Boot"]),
        ];
        let dag = ActivityDag::build(&activities)?;
        assert_eq!(dag.reduced_dependencies()[&ObjectId::new("Z")], ids(&["X", "Y"]));
        assert_eq!(dag.descendants(&ObjectId::new("Boot")).len(), 3);
        Ok(())
    }

    #[test]
    fn cycles_are_reported() {
        let activities = vec![activity("A", &["B"]), activity("B", &["A"])];
        match ActivityDag::build(&activities) {
            Err(DagError::CycleDetected { cycle, .. }) => assert_eq!(cycle, vec!["A", "B"]),
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn unknown_dependency_is_an_error() {
        let activities = vec![activity("A", &["Ghost"])];
        let err = ActivityDag::build(&activities).unwrap_err();
        assert!(matches!(err, DagError::MissingDependency { .. }));
    }

    #[test]
    fn dot_export() -> Result<(), DagError> {
        let activities = vec![activity("A", &[]), activity("B", &["A"])];
        let dag = ActivityDag::build(&activities)?;
        let dot = dag.to_dot_string();
        assert!(dot.starts_with("digraph {\n    rankdir=LR;"));
        assert!(dot.contains("0 -> 1;"));
        assert!(dot.contains("label=\"A\\nShellCommandActivity\""));

        let tmp = tempfile::tempdir()?;
        let path = tmp.path().join("pipeline.dot");
        dag.export_dot_to(&path)?;
        assert_eq!(std::fs::read_to_string(path)?, dot);
        Ok(())
    }
}
