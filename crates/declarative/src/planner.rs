//! Resource graph - registration, reference checking and ordering

use crate::error::{Error, Result};
use crate::resource::{BoxedResource, Resource, ResourceExt};
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{BTreeSet, HashMap};

/// An ordered collection of declared resources
///
/// Declaration order is preserved; it is the tie-breaker whenever the
/// dependency order leaves a choice.
#[derive(Debug)]
pub struct ResourceGraph {
    resources: Vec<BoxedResource>,
    index: HashMap<String, usize>,
}

impl ResourceGraph {
    /// Create a new empty graph
    pub fn new() -> Self {
        Self {
            resources: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Declare a resource
    ///
    /// Fails if the logical id is already taken. References are not
    /// checked here since targets may be declared later.
    pub fn add(&mut self, resource: BoxedResource) -> Result<()> {
        let id = resource.logical_id();
        if self.index.contains_key(&id) {
            return Err(Error::DuplicateId(id));
        }
        log::trace!("Declared {} ({})", id, resource.resource_type());
        self.index.insert(id, self.resources.len());
        self.resources.push(resource);
        Ok(())
    }

    /// Look up a resource by logical id
    pub fn get(&self, logical_id: &str) -> Option<&dyn Resource> {
        self.index
            .get(logical_id)
            .map(|&i| self.resources[i].as_ref())
    }

    /// Whether a logical id is declared
    pub fn contains(&self, logical_id: &str) -> bool {
        self.index.contains_key(logical_id)
    }

    /// Resources in declaration order
    pub fn resources(&self) -> impl Iterator<Item = &dyn Resource> {
        self.resources.iter().map(|r| r.as_ref())
    }

    /// Number of declared resources
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Check if graph is empty
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// All `(from, to)` edges, meaning `from` references `to`
    ///
    /// Sorted by declaration order of `from`, then by target id.
    pub fn edges(&self) -> Result<Vec<(String, String)>> {
        let mut edges = Vec::new();
        for resource in &self.resources {
            let from = resource.logical_id();
            for to in resource.dependencies()? {
                edges.push((from.clone(), to));
            }
        }
        Ok(edges)
    }

    /// Check that every reference resolves and the references form a DAG
    pub fn validate(&self) -> Result<()> {
        self.topological_order().map(|_| ())
    }

    /// Logical ids ordered so every resource follows what it references
    ///
    /// Deterministic: among resources whose dependencies are satisfied,
    /// the one declared first comes first.
    pub fn topological_order(&self) -> Result<Vec<String>> {
        let mut graph: DiGraph<usize, ()> = DiGraph::new();
        let nodes: Vec<NodeIndex> = (0..self.resources.len())
            .map(|i| graph.add_node(i))
            .collect();

        let mut blockers: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); self.resources.len()];
        for (i, resource) in self.resources.iter().enumerate() {
            let from = resource.logical_id();
            for to in resource.dependencies()? {
                let Some(&j) = self.index.get(&to) else {
                    return Err(Error::DanglingReference { from, to });
                };
                if i == j {
                    return Err(Error::Cycle(from));
                }
                graph.add_edge(nodes[j], nodes[i], ());
                blockers[i].insert(j);
            }
        }

        // Cycle detection; petgraph's own order is not stable enough to emit
        toposort(&graph, None)
            .map_err(|cycle| Error::Cycle(self.resources[graph[cycle.node_id()]].logical_id()))?;

        let mut placed = vec![false; self.resources.len()];
        let mut order = Vec::with_capacity(self.resources.len());
        while order.len() < self.resources.len() {
            let next = (0..self.resources.len())
                .find(|&i| !placed[i] && blockers[i].iter().all(|&j| placed[j]))
                .ok_or_else(|| Error::Cycle("unresolved dependencies".into()))?;
            placed[next] = true;
            order.push(self.resources[next].logical_id());
        }
        Ok(order)
    }

    /// Keep only resources matching a target pattern
    ///
    /// Target format: "type" or "type.name", where type is a category
    /// ("s3", "cloudfront") or a full provider type, and name is a
    /// substring of the logical id.
    pub fn filter_by_target<'a>(&'a self, target: Option<&str>) -> Vec<&'a dyn Resource> {
        let (resource_type, name) = match target {
            None => (None, None),
            Some(t) => parse_target(t),
        };
        self.resources()
            .filter(|r| matches_filter(*r, resource_type.as_deref(), name.as_deref()))
            .collect()
    }
}

impl Default for ResourceGraph {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a target string like "type.name" into (type, name)
fn parse_target(target: &str) -> (Option<String>, Option<String>) {
    let parts: Vec<&str> = target.split('.').collect();
    match parts.len() {
        1 => (Some(parts[0].to_string()), None),
        2 => (Some(parts[0].to_string()), Some(parts[1].to_string())),
        _ => (None, Some(target.to_string())),
    }
}

/// Check if a resource matches the filter criteria
fn matches_filter(resource: &dyn Resource, resource_type: Option<&str>, name: Option<&str>) -> bool {
    if let Some(rt) = resource_type {
        // Allow common aliases
        let matches_type = match rt.to_lowercase().as_str() {
            "dns" => resource.category() == "route53",
            "cdn" => resource.category() == "cloudfront",
            "api" => resource.category() == "apigatewayv2",
            "buckets" => resource.resource_type() == "AWS::S3::Bucket",
            other => resource.category() == other || resource.resource_type().eq_ignore_ascii_case(rt),
        };
        if !matches_type {
            return false;
        }
    }

    if let Some(n) = name
        && !resource.logical_id().contains(n)
    {
        return false;
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intrinsic::{get_att, reference};
    use serde_json::{Value, json};

    #[derive(Debug)]
    struct Node {
        id: &'static str,
        kind: &'static str,
        refs: Vec<&'static str>,
    }

    impl Resource for Node {
        fn logical_id(&self) -> String {
            self.id.to_string()
        }

        fn resource_type(&self) -> &'static str {
            self.kind
        }

        fn description(&self) -> String {
            format!("Test node {}", self.id)
        }

        fn properties(&self) -> Result<Value> {
            let refs: Vec<Value> = self.refs.iter().map(|r| reference(r)).collect();
            Ok(json!({ "Refs": refs }))
        }
    }

    fn node(id: &'static str, refs: Vec<&'static str>) -> BoxedResource {
        Box::new(Node {
            id,
            kind: "AWS::Test::Node",
            refs,
        })
    }

    #[test]
    fn test_parse_target() {
        assert_eq!(parse_target("s3"), (Some("s3".to_string()), None));
        assert_eq!(
            parse_target("s3.Code"),
            (Some("s3".to_string()), Some("Code".to_string()))
        );
        assert_eq!(parse_target("a.b.c"), (None, Some("a.b.c".to_string())));
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut graph = ResourceGraph::new();
        graph.add(node("Bucket", vec![])).unwrap();
        let err = graph.add(node("Bucket", vec![])).unwrap_err();
        assert!(matches!(err, Error::DuplicateId(id) if id == "Bucket"));
    }

    #[test]
    fn test_topological_order_follows_references() {
        let mut graph = ResourceGraph::new();
        // Declared out of dependency order on purpose
        graph.add(node("Record", vec!["Distribution", "Zone"])).unwrap();
        graph.add(node("Distribution", vec!["Bucket", "Certificate"])).unwrap();
        graph.add(node("Certificate", vec!["Zone"])).unwrap();
        graph.add(node("Zone", vec![])).unwrap();
        graph.add(node("Bucket", vec![])).unwrap();

        let order = graph.topological_order().unwrap();
        let pos = |id: &str| order.iter().position(|o| o == id).unwrap();
        assert!(pos("Zone") < pos("Certificate"));
        assert!(pos("Certificate") < pos("Distribution"));
        assert!(pos("Bucket") < pos("Distribution"));
        assert!(pos("Distribution") < pos("Record"));
        // Ties fall back to declaration order
        assert_eq!(order[0], "Zone");
    }

    #[test]
    fn test_order_is_stable() {
        let build = || {
            let mut graph = ResourceGraph::new();
            graph.add(node("A", vec![])).unwrap();
            graph.add(node("B", vec!["A"])).unwrap();
            graph.add(node("C", vec![])).unwrap();
            graph.topological_order().unwrap()
        };
        assert_eq!(build(), build());
        assert_eq!(build(), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_dangling_reference() {
        let mut graph = ResourceGraph::new();
        graph.add(node("Distribution", vec!["Missing"])).unwrap();
        let err = graph.validate().unwrap_err();
        assert!(matches!(
            err,
            Error::DanglingReference { ref from, ref to } if from == "Distribution" && to == "Missing"
        ));
    }

    #[test]
    fn test_cycle_rejected() {
        let mut graph = ResourceGraph::new();
        graph.add(node("A", vec!["B"])).unwrap();
        graph.add(node("B", vec!["A"])).unwrap();
        assert!(matches!(graph.validate(), Err(Error::Cycle(_))));
    }

    #[test]
    fn test_self_reference_rejected() {
        let mut graph = ResourceGraph::new();
        graph.add(node("A", vec!["A"])).unwrap();
        assert!(matches!(graph.validate(), Err(Error::Cycle(id)) if id == "A"));
    }

    #[test]
    fn test_edges_from_get_att() {
        #[derive(Debug)]
        struct Alias;
        impl Resource for Alias {
            fn logical_id(&self) -> String {
                "Alias".into()
            }
            fn resource_type(&self) -> &'static str {
                "AWS::Route53::RecordSet"
            }
            fn description(&self) -> String {
                "alias".into()
            }
            fn properties(&self) -> Result<Value> {
                Ok(json!({ "Target": get_att("Distribution", "DomainName") }))
            }
        }

        let mut graph = ResourceGraph::new();
        graph.add(node("Distribution", vec![])).unwrap();
        graph.add(Box::new(Alias)).unwrap();
        assert_eq!(
            graph.edges().unwrap(),
            vec![("Alias".to_string(), "Distribution".to_string())]
        );
    }

    #[test]
    fn test_filter_by_target() {
        let mut graph = ResourceGraph::new();
        graph.add(node("FrontEndBucket", vec![])).unwrap();
        graph.add(node("CodeBucket", vec![])).unwrap();

        assert_eq!(graph.filter_by_target(None).len(), 2);
        assert_eq!(graph.filter_by_target(Some("test")).len(), 2);
        assert_eq!(graph.filter_by_target(Some("test.Code")).len(), 1);
        assert_eq!(graph.filter_by_target(Some("s3")).len(), 0);
    }
}
