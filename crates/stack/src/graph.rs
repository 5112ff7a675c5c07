use std::collections::{BTreeMap, BTreeSet};

use stackgraph_core::{GraphError, GraphResult, Resource, ResourceDeclaration};

use crate::output::Output;
use crate::template::{SynthesisContext, Template};

/// The top-level resource graph.
///
/// Owns one declaration per logical id plus the named outputs. Declarations
/// are snapshots: re-declaring a changed resource means building a new stack.
#[derive(Debug, Clone, Default)]
pub struct Stack {
    name: String,
    description: Option<String>,
    resources: Vec<ResourceDeclaration>,
    index: BTreeMap<String, usize>,
    outputs: BTreeMap<String, Output>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Visit {
    InProgress,
    Done,
}

impl Stack {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Declare a resource. Logical ids are unique within a stack.
    pub fn add(&mut self, resource: &dyn Resource) -> GraphResult<()> {
        let id = resource.logical_id().as_str().to_string();
        if self.index.contains_key(&id) {
            return Err(GraphError::conflict(format!(
                "logical id {id} is already declared in stack {}",
                self.name
            )));
        }
        tracing::debug!(stack = %self.name, id = %id, kind = resource.resource_type(), "resource declared");
        self.index.insert(id, self.resources.len());
        self.resources.push(resource.declare());
        Ok(())
    }

    pub fn add_all<'a, I>(&mut self, resources: I) -> GraphResult<()>
    where
        I: IntoIterator<Item = &'a dyn Resource>,
    {
        resources.into_iter().try_for_each(|r| self.add(r))
    }

    pub fn add_output(&mut self, output: Output) -> GraphResult<()> {
        let name = output.name().as_str().to_string();
        if self.outputs.contains_key(&name) {
            return Err(GraphError::conflict(format!("output {name} is already declared")));
        }
        self.outputs.insert(name, output);
        Ok(())
    }

    pub fn resource(&self, id: &str) -> Option<&ResourceDeclaration> {
        self.index.get(id).map(|&i| &self.resources[i])
    }

    /// Declarations in insertion order.
    pub fn resources(&self) -> &[ResourceDeclaration] {
        &self.resources
    }

    pub fn output(&self, name: &str) -> Option<&Output> {
        self.outputs.get(name)
    }

    /// Outputs sorted by name.
    pub fn outputs(&self) -> impl Iterator<Item = &Output> {
        self.outputs.values()
    }

    /// Check that every reference and `DependsOn` edge resolves and that the
    /// dependency graph is acyclic.
    pub fn validate(&self) -> GraphResult<()> {
        for decl in &self.resources {
            for dep in decl.dependencies() {
                if !self.index.contains_key(&dep) {
                    return Err(GraphError::unresolved(decl.logical_id.as_str(), dep));
                }
            }
        }
        for output in self.outputs.values() {
            for id in output.value().referenced_ids() {
                if !self.index.contains_key(id.as_str()) {
                    return Err(GraphError::unresolved(output.name().as_str(), id.as_str()));
                }
            }
        }
        self.deployment_order().map(|_| ())
    }

    /// Logical ids ordered so every resource comes after its dependencies.
    ///
    /// Ties keep declaration order.
    pub fn deployment_order(&self) -> GraphResult<Vec<&str>> {
        let mut state: BTreeMap<&str, Visit> = BTreeMap::new();
        let mut order = Vec::with_capacity(self.resources.len());
        let mut path = Vec::new();
        for decl in &self.resources {
            self.visit(decl.logical_id.as_str(), &mut state, &mut path, &mut order)?;
        }
        Ok(order)
    }

    fn visit<'a>(
        &'a self,
        id: &'a str,
        state: &mut BTreeMap<&'a str, Visit>,
        path: &mut Vec<&'a str>,
        order: &mut Vec<&'a str>,
    ) -> GraphResult<()> {
        match state.get(id) {
            Some(Visit::Done) => return Ok(()),
            Some(Visit::InProgress) => {
                let start = path.iter().position(|p| *p == id).unwrap_or(0);
                let mut cycle: Vec<String> = path[start..].iter().map(|s| s.to_string()).collect();
                cycle.push(id.to_string());
                return Err(GraphError::DependencyCycle(cycle));
            }
            None => {}
        }
        // Unknown ids are reported by `validate`; here they are leaves.
        let Some(&i) = self.index.get(id) else {
            return Ok(());
        };
        let decl = &self.resources[i];

        state.insert(decl.logical_id.as_str(), Visit::InProgress);
        path.push(decl.logical_id.as_str());
        let deps: BTreeSet<String> = decl.dependencies().into_iter().collect();
        for dep in &deps {
            if let Some(&j) = self.index.get(dep.as_str()) {
                let dep_id = self.resources[j].logical_id.as_str();
                self.visit(dep_id, state, path, order)?;
            }
        }
        path.pop();
        state.insert(decl.logical_id.as_str(), Visit::Done);
        order.push(decl.logical_id.as_str());
        Ok(())
    }

    /// Validate, then render the template.
    pub fn synthesize(&self, context: &SynthesisContext) -> GraphResult<Template> {
        self.validate()?;
        tracing::info!(
            stack = %self.name,
            synthesis_id = %context.synthesis_id(),
            resources = self.resources.len(),
            outputs = self.outputs.len(),
            "stack synthesized"
        );
        Ok(Template::render(self, context))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};
    use stackgraph_core::{Expr, LogicalId};

    use super::*;

    struct Node {
        id: LogicalId,
        refs: Vec<LogicalId>,
        after: Vec<LogicalId>,
    }

    fn node(id: &str, refs: &[&str]) -> Node {
        Node {
            id: LogicalId::new(id).unwrap(),
            refs: refs.iter().map(|r| LogicalId::new(*r).unwrap()).collect(),
            after: Vec::new(),
        }
    }

    impl Resource for Node {
        fn logical_id(&self) -> &LogicalId {
            &self.id
        }

        fn resource_type(&self) -> &'static str {
            "Test::Node"
        }

        fn properties(&self) -> Value {
            let refs: Vec<Value> = self.refs.iter().map(|r| Expr::reference(r).to_json()).collect();
            json!({ "Refs": refs })
        }

        fn depends_on(&self) -> Vec<LogicalId> {
            self.after.clone()
        }
    }

    #[test]
    fn duplicate_ids_conflict() {
        let mut stack = Stack::new("test");
        stack.add(&node("A", &[])).unwrap();
        let err = stack.add(&node("A", &[])).unwrap_err();
        assert!(matches!(err, GraphError::Conflict(_)));
        assert_eq!(stack.resources().len(), 1);
    }

    #[test]
    fn unresolved_reference_is_reported() {
        let mut stack = Stack::new("test");
        stack.add(&node("A", &["Missing"])).unwrap();
        match stack.validate().unwrap_err() {
            GraphError::UnresolvedReference { from, to } => {
                assert_eq!(from, "A");
                assert_eq!(to, "Missing");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn unresolved_depends_on_is_reported() {
        let mut stack = Stack::new("test");
        let mut a = node("A", &[]);
        a.after.push(LogicalId::new("Ghost").unwrap());
        stack.add(&a).unwrap();
        assert!(matches!(
            stack.validate(),
            Err(GraphError::UnresolvedReference { .. })
        ));
    }

    #[test]
    fn output_references_must_resolve() {
        let mut stack = Stack::new("test");
        stack.add(&node("A", &[])).unwrap();
        let ghost = LogicalId::new("Ghost").unwrap();
        stack
            .add_output(Output::new("GhostId", Expr::reference(&ghost)).unwrap())
            .unwrap();
        assert!(stack.validate().is_err());
    }

    #[test]
    fn cycles_are_reported_with_their_path() {
        let mut stack = Stack::new("test");
        stack.add(&node("A", &["B"])).unwrap();
        stack.add(&node("B", &["C"])).unwrap();
        stack.add(&node("C", &["A"])).unwrap();
        match stack.validate().unwrap_err() {
            GraphError::DependencyCycle(path) => {
                assert_eq!(path.first(), path.last());
                assert_eq!(path.len(), 4);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn deployment_order_puts_dependencies_first() {
        let mut stack = Stack::new("test");
        stack.add(&node("Api", &["Function"])).unwrap();
        stack.add(&node("Function", &["Role"])).unwrap();
        stack.add(&node("Role", &["Table"])).unwrap();
        stack.add(&node("Table", &[])).unwrap();
        stack.add(&node("Unrelated", &[])).unwrap();
        assert_eq!(
            stack.deployment_order().unwrap(),
            vec!["Table", "Role", "Function", "Api", "Unrelated"]
        );
    }

    #[test]
    fn duplicate_outputs_conflict() {
        let mut stack = Stack::new("test");
        stack.add_output(Output::new("Out", Expr::literal("1")).unwrap()).unwrap();
        assert!(stack.add_output(Output::new("Out", Expr::literal("2")).unwrap()).is_err());
    }

    proptest::proptest! {
        #[test]
        fn deployment_order_respects_every_edge(
            edges in proptest::collection::vec(proptest::collection::vec(0usize..16, 0..4), 1..16),
        ) {
            // Node i may only reference nodes declared before it, so the graph is acyclic.
            let names: Vec<String> = (0..edges.len()).map(|i| format!("N{i}")).collect();
            let mut stack = Stack::new("prop");
            for (i, targets) in edges.iter().enumerate().rev() {
                let refs: Vec<&str> = targets
                    .iter()
                    .filter(|t| **t < i)
                    .map(|t| names[*t].as_str())
                    .collect();
                stack.add(&node(&names[i], &refs)).unwrap();
            }

            let order = stack.deployment_order().unwrap();
            proptest::prop_assert_eq!(order.len(), edges.len());
            let position = |id: &str| order.iter().position(|o| *o == id).unwrap();
            for (i, targets) in edges.iter().enumerate() {
                for t in targets.iter().filter(|t| **t < i) {
                    proptest::prop_assert!(position(&names[*t]) < position(&names[i]));
                }
            }
        }
    }
}
