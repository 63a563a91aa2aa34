//! Synthesis - renders a validated graph into a template

use crate::context::{NoProgress, SynthContext, SynthObserver};
use crate::error::{Error, Result};
use crate::intrinsic;
use crate::planner::ResourceGraph;
use crate::types::{Template, TemplateResource};

/// Synthesize a graph into a template
///
/// Resources are rendered in dependency order and the first invalid
/// declaration aborts the run. Output references are checked against the
/// graph like any other reference.
///
/// # Arguments
/// * `graph` - The declared resources
/// * `ctx` - Stack name, description and outputs
/// * `observer` - Progress callback
pub fn synthesize<O: SynthObserver>(
    graph: &ResourceGraph,
    ctx: &SynthContext,
    observer: &mut O,
) -> Result<Template> {
    let order = graph.topological_order()?;
    let mut template = Template::new(ctx.description.clone());

    observer.on_start(order.len());
    for id in &order {
        let resource = graph
            .get(id)
            .ok_or_else(|| Error::Cycle(format!("{id} vanished from graph")))?;
        let properties = resource.properties()?;
        template.resources.insert(
            id.clone(),
            TemplateResource {
                resource_type: resource.resource_type().to_string(),
                properties,
            },
        );
        observer.on_resource(id, resource.resource_type());
    }

    for (name, output) in &ctx.outputs {
        for to in intrinsic::references(&output.value) {
            if !graph.contains(&to) {
                return Err(Error::DanglingReference {
                    from: format!("output {name}"),
                    to,
                });
            }
        }
        template.outputs.insert(name.clone(), output.clone());
    }

    observer.on_complete();
    log::info!(
        "Synthesized {} with {} resources",
        ctx.stack_name,
        template.resources.len()
    );
    Ok(template)
}

/// Synthesize without progress reporting
pub fn synthesize_simple(graph: &ResourceGraph, ctx: &SynthContext) -> Result<Template> {
    synthesize(graph, ctx, &mut NoProgress)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Recorder;
    use crate::intrinsic::{get_att, reference};
    use crate::resource::Resource;
    use serde_json::{Value, json};

    #[derive(Debug)]
    struct TestResource {
        id: &'static str,
        target: Option<&'static str>,
        valid: bool,
    }

    impl Resource for TestResource {
        fn logical_id(&self) -> String {
            self.id.to_string()
        }

        fn resource_type(&self) -> &'static str {
            "AWS::Test::Thing"
        }

        fn description(&self) -> String {
            format!("Test resource {}", self.id)
        }

        fn properties(&self) -> Result<Value> {
            if !self.valid {
                return Err(Error::invalid(self.id, "bad literal"));
            }
            Ok(match self.target {
                Some(t) => json!({ "Target": reference(t) }),
                None => json!({}),
            })
        }
    }

    fn graph(resources: Vec<TestResource>) -> ResourceGraph {
        let mut graph = ResourceGraph::new();
        for r in resources {
            graph.add(Box::new(r)).unwrap();
        }
        graph
    }

    #[test]
    fn test_synthesize_empty_graph() {
        let template = synthesize_simple(&ResourceGraph::new(), &SynthContext::new("Empty")).unwrap();
        assert!(template.resources.is_empty());
        assert!(template.outputs.is_empty());
    }

    #[test]
    fn test_synthesize_renders_in_dependency_order() {
        let graph = graph(vec![
            TestResource { id: "Record", target: Some("Zone"), valid: true },
            TestResource { id: "Zone", target: None, valid: true },
        ]);
        let mut recorder = Recorder::default();
        let template = synthesize(&graph, &SynthContext::new("Stack"), &mut recorder).unwrap();

        assert_eq!(recorder.rendered, vec!["Zone", "Record"]);
        assert!(recorder.completed);
        assert_eq!(
            template.resources["Record"].properties,
            json!({ "Target": { "Ref": "Zone" } })
        );
    }

    #[test]
    fn test_first_invalid_declaration_aborts() {
        let graph = graph(vec![
            TestResource { id: "Good", target: None, valid: true },
            TestResource { id: "Bad", target: None, valid: false },
        ]);
        let mut recorder = Recorder::default();
        let err = synthesize(&graph, &SynthContext::new("Stack"), &mut recorder).unwrap_err();
        assert!(err.is_declaration_error());
        assert!(!recorder.completed);
    }

    #[test]
    fn test_output_references_checked() {
        let graph = graph(vec![TestResource { id: "Zone", target: None, valid: true }]);

        let mut ctx = SynthContext::new("Stack");
        ctx.add_output("Servers", "name servers", get_att("Zone", "NameServers")).unwrap();
        assert!(synthesize_simple(&graph, &ctx).is_ok());

        ctx.add_output("Missing", "dangling", reference("Nope")).unwrap();
        let err = synthesize_simple(&graph, &ctx).unwrap_err();
        assert!(matches!(err, Error::DanglingReference { ref to, .. } if to == "Nope"));
    }

    #[test]
    fn test_synthesis_is_deterministic() {
        let build = || {
            let graph = graph(vec![
                TestResource { id: "B", target: Some("A"), valid: true },
                TestResource { id: "A", target: None, valid: true },
            ]);
            synthesize_simple(&graph, &SynthContext::new("Stack").with_description("d"))
                .unwrap()
                .to_json()
                .unwrap()
        };
        assert_eq!(build(), build());
    }
}
