use patchcore::{FlowError, Node, NodeError, PatchError, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Factory trait for creating node behaviour from construction arguments
pub trait NodeFactory: Send + Sync {
    /// Create the behaviour for a new node. Argument errors are reported here
    /// or in the node's setup.
    fn create(&self, args: &[Value]) -> Result<Arc<dyn Node>, NodeError>;

    /// Get node type identifier
    fn node_type(&self) -> &str;

    /// Optional: description and port layout for editors
    fn metadata(&self) -> NodeMetadata {
        NodeMetadata::default()
    }
}

/// Metadata about a node type
#[derive(Debug, Clone)]
pub struct NodeMetadata {
    pub description: String,
    pub category: String,
    pub inlets: Vec<PortDefinition>,
    pub outlets: Vec<PortDefinition>,
}

impl Default for NodeMetadata {
    fn default() -> Self {
        Self {
            description: String::new(),
            category: "general".to_string(),
            inlets: Vec::new(),
            outlets: Vec::new(),
        }
    }
}

/// What a described port is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortKind {
    HotInlet,
    ColdInlet,
    Outlet,
}

#[derive(Debug, Clone)]
pub struct PortDefinition {
    pub name: String,
    pub description: String,
    pub kind: PortKind,
}

impl PortDefinition {
    fn new(name: impl Into<String>, description: impl Into<String>, kind: PortKind) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            kind,
        }
    }

    pub fn hot(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, description, PortKind::HotInlet)
    }

    pub fn cold(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, description, PortKind::ColdInlet)
    }

    pub fn outlet(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, description, PortKind::Outlet)
    }
}

/// Registry of available node types
pub struct NodeRegistry {
    factories: HashMap<String, Arc<dyn NodeFactory>>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a node factory
    pub fn register(&mut self, factory: Arc<dyn NodeFactory>) {
        let node_type = factory.node_type().to_string();
        tracing::info!("Registering node type: {}", node_type);
        self.factories.insert(node_type, factory);
    }

    /// Create node behaviour from a node type and arguments
    pub fn create_node(&self, node_type: &str, args: &[Value]) -> Result<Arc<dyn Node>, FlowError> {
        let factory = self
            .factories
            .get(node_type)
            .ok_or_else(|| PatchError::UnknownNodeType(node_type.to_string()))?;

        Ok(factory.create(args)?)
    }

    pub fn contains(&self, node_type: &str) -> bool {
        self.factories.contains_key(node_type)
    }

    /// Get all registered node types, sorted
    pub fn list_node_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.factories.keys().cloned().collect();
        types.sort();
        types
    }

    /// Get metadata for a node type
    pub fn get_metadata(&self, node_type: &str) -> Option<NodeMetadata> {
        self.factories.get(node_type).map(|f| f.metadata())
    }
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use patchcore::{NodeContext, Result};

    struct Noop;

    impl Node for Noop {
        fn node_type(&self) -> &str {
            "noop"
        }

        fn calculate_output(&self, _ctx: &mut NodeContext<'_>) -> Result<()> {
            Ok(())
        }
    }

    struct NoopFactory;

    impl NodeFactory for NoopFactory {
        fn create(&self, args: &[Value]) -> std::result::Result<Arc<dyn Node>, NodeError> {
            if args.len() > 1 {
                return Err(NodeError::Configuration("noop takes at most one argument".into()));
            }
            Ok(Arc::new(Noop))
        }

        fn node_type(&self) -> &str {
            "noop"
        }
    }

    #[test]
    fn test_register_and_create() {
        let mut registry = NodeRegistry::new();
        registry.register(Arc::new(NoopFactory));

        assert!(registry.contains("noop"));
        assert_eq!(registry.list_node_types(), vec!["noop".to_string()]);
        assert_eq!(registry.get_metadata("noop").unwrap().category, "general");
        assert!(registry.create_node("noop", &[]).is_ok());
    }

    #[test]
    fn test_port_definitions_keep_their_kind() {
        assert_eq!(PortDefinition::hot("left", "").kind, PortKind::HotInlet);
        assert_eq!(PortDefinition::cold("right", "").kind, PortKind::ColdInlet);
        assert_eq!(PortDefinition::outlet("out", "").kind, PortKind::Outlet);
    }

    #[test]
    fn test_unknown_type_and_bad_arguments() {
        let mut registry = NodeRegistry::new();
        registry.register(Arc::new(NoopFactory));

        assert!(matches!(
            registry.create_node("missing", &[]),
            Err(FlowError::Patch(PatchError::UnknownNodeType(name))) if name == "missing"
        ));
        assert!(matches!(
            registry.create_node("noop", &[Value::Null, Value::Null]),
            Err(FlowError::Node(NodeError::Configuration(_)))
        ));
    }
}
