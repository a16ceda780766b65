//! In-memory graph, built programmatically or loaded from a JSON snapshot

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use async_trait::async_trait;
use serde_json::Value;

use super::translate::symbol_from_json;
use super::{DependencyQueryPort, DependencySymbol, GraphError, ReverseDependencies};

/// One project's symbols and reverse call edges
#[derive(Debug, Default, Clone)]
struct ProjectGraph {
    symbols: Vec<DependencySymbol>,
    by_qualified: HashMap<String, usize>,
    /// callee index -> caller indices
    callers: HashMap<usize, BTreeSet<usize>>,
}

impl ProjectGraph {
    fn insert(&mut self, symbol: DependencySymbol) -> usize {
        if let Some(&i) = self.by_qualified.get(&symbol.qualified_name) {
            return i;
        }
        let i = self.symbols.len();
        self.by_qualified.insert(symbol.qualified_name.clone(), i);
        self.symbols.push(symbol);
        i
    }
}

/// Graph held in memory, keyed by project.
///
/// Snapshot format:
///
/// ```json
/// { "projects": { "default": {
///     "symbols": [{"name": "f", "qualified_name": "a.py::f", "file_path": "a.py"}],
///     "calls":   [{"caller": "tests/test_a.py::test_f", "callee": "a.py::f"}]
/// } } }
/// ```
#[derive(Debug, Default, Clone)]
pub struct InMemoryGraph {
    projects: HashMap<String, ProjectGraph>,
}

impl InMemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a symbol; re-adding a qualified name is a no-op.
    pub fn add_symbol(&mut self, project_id: &str, symbol: DependencySymbol) {
        self.projects
            .entry(project_id.to_string())
            .or_default()
            .insert(symbol);
    }

    /// Add a function whose qualified name is `<file_path>::<name>`.
    pub fn add_function(&mut self, project_id: &str, name: &str, file_path: &str) -> String {
        let qualified_name = format!("{file_path}::{name}");
        self.add_symbol(
            project_id,
            DependencySymbol {
                name: name.to_string(),
                qualified_name: qualified_name.clone(),
                file_path: file_path.to_string(),
            },
        );
        qualified_name
    }

    /// Record that `caller` calls `callee` (both qualified names, both known).
    pub fn add_call(&mut self, project_id: &str, caller: &str, callee: &str) -> Result<(), GraphError> {
        let project = self
            .projects
            .get_mut(project_id)
            .ok_or_else(|| GraphError::Snapshot(format!("unknown project '{project_id}'")))?;
        let lookup = |qn: &str| {
            project
                .by_qualified
                .get(qn)
                .copied()
                .ok_or_else(|| GraphError::Snapshot(format!("call references unknown symbol '{qn}'")))
        };
        let caller_idx = lookup(caller)?;
        let callee_idx = lookup(callee)?;
        project.callers.entry(callee_idx).or_default().insert(caller_idx);
        Ok(())
    }

    /// Parse a JSON snapshot.
    pub fn from_json(text: &str) -> Result<Self, GraphError> {
        let root: Value =
            serde_json::from_str(text).map_err(|e| GraphError::Snapshot(e.to_string()))?;
        let projects = root
            .get("projects")
            .and_then(Value::as_object)
            .ok_or_else(|| GraphError::Snapshot("missing 'projects' object".into()))?;

        let mut graph = Self::new();
        for (project_id, project) in projects {
            graph.projects.entry(project_id.clone()).or_default();
            let symbols = project.get("symbols").and_then(Value::as_array);
            for symbol in symbols.into_iter().flatten() {
                graph.add_symbol(project_id, symbol_from_json(symbol)?);
            }
            let calls = project.get("calls").and_then(Value::as_array);
            for call in calls.into_iter().flatten() {
                let caller = call.get("caller").and_then(Value::as_str);
                let callee = call.get("callee").and_then(Value::as_str);
                match (caller, callee) {
                    (Some(caller), Some(callee)) => graph.add_call(project_id, caller, callee)?,
                    _ => {
                        return Err(GraphError::Snapshot(format!(
                            "call needs 'caller' and 'callee': {call}"
                        )))
                    }
                }
            }
        }

        tracing::debug!(projects = graph.projects.len(), "Loaded graph snapshot");
        Ok(graph)
    }

    /// Load a JSON snapshot from disk.
    pub fn load(path: &Path) -> Result<Self, GraphError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }
}

#[async_trait]
impl DependencyQueryPort for InMemoryGraph {
    async fn reverse_dependencies(
        &self,
        function_name: &str,
        project_id: &str,
    ) -> Result<ReverseDependencies, GraphError> {
        let Some(project) = self.projects.get(project_id) else {
            return Ok(ReverseDependencies::not_found());
        };

        // Several definitions may share a name across files
        let mut found = false;
        let mut caller_idx = BTreeSet::new();
        for (i, symbol) in project.symbols.iter().enumerate() {
            if symbol.name == function_name {
                found = true;
                if let Some(c) = project.callers.get(&i) {
                    caller_idx.extend(c.iter().copied());
                }
            }
        }

        let mut callers: Vec<DependencySymbol> = caller_idx
            .into_iter()
            .map(|i| project.symbols[i].clone())
            .collect();
        callers.sort_by(|a, b| {
            a.file_path
                .cmp(&b.file_path)
                .then_with(|| a.qualified_name.cmp(&b.qualified_name))
        });
        Ok(ReverseDependencies { found, callers })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_reverse_dependencies() {
        let mut g = InMemoryGraph::new();
        let callee = g.add_function("p", "process_payment", "app/payment.py");
        let caller = g.add_function("p", "test_payment_success", "tests/test_payment.py");
        g.add_call("p", &caller, &callee).unwrap();

        let deps = g.reverse_dependencies("process_payment", "p").await.unwrap();
        assert!(deps.found);
        assert_eq!(deps.callers.len(), 1);
        assert_eq!(deps.callers[0].file_path, "tests/test_payment.py");

        let none = g.reverse_dependencies("test_payment_success", "p").await.unwrap();
        assert!(none.found);
        assert!(none.callers.is_empty());

        let other = g.reverse_dependencies("process_payment", "other").await.unwrap();
        assert!(!other.found);
    }

    #[tokio::test]
    async fn test_snapshot_round_trip() {
        let snapshot = r#"{
            "projects": {
                "shop": {
                    "symbols": [
                        {"name": "process_order", "qualified_name": "app/orders.py::process_order", "file_path": "app/orders.py"},
                        {"name": "test_checkout_flow", "file_path": "tests/test_checkout.py"}
                    ],
                    "calls": [
                        {"caller": "tests/test_checkout.py::test_checkout_flow", "callee": "app/orders.py::process_order"}
                    ]
                }
            }
        }"#;
        let g = InMemoryGraph::from_json(snapshot).unwrap();
        let deps = g.reverse_dependencies("process_order", "shop").await.unwrap();
        assert_eq!(deps.callers[0].name, "test_checkout_flow");
    }

    #[test]
    fn test_snapshot_errors() {
        assert!(matches!(
            InMemoryGraph::from_json("{}"),
            Err(GraphError::Snapshot(_))
        ));
        assert!(matches!(
            InMemoryGraph::from_json("not json"),
            Err(GraphError::Snapshot(_))
        ));
        let dangling = r#"{"projects": {"p": {"symbols": [], "calls": [{"caller": "a", "callee": "b"}]}}}"#;
        assert!(matches!(
            InMemoryGraph::from_json(dangling),
            Err(GraphError::Snapshot(_))
        ));
    }
}
