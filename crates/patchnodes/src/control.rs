use patchcore::{Node, NodeContext, NodeError, Port, PortId, Result, Value};
use patchruntime::{NodeFactory, NodeMetadata, PortDefinition};
use std::sync::Arc;

/// Turns anything it receives into a bang
pub struct BangNode;

impl Node for BangNode {
    fn node_type(&self) -> &str {
        "bang"
    }

    fn calculate_output(&self, ctx: &mut NodeContext<'_>) -> Result<()> {
        ctx.output_main(Value::Bang)
    }

    fn hot_inlet_received(
        &self,
        ctx: &mut NodeContext<'_>,
        _inlet: PortId,
        _value: Value,
    ) -> Result<()> {
        self.calculate_output(ctx)
    }

    fn load_bang(&self, _ctx: &mut NodeContext<'_>) -> Result<()> {
        Ok(())
    }
}

pub struct BangNodeFactory;

impl NodeFactory for BangNodeFactory {
    fn create(&self, _args: &[Value]) -> std::result::Result<Arc<dyn Node>, NodeError> {
        Ok(Arc::new(BangNode))
    }

    fn node_type(&self) -> &str {
        "bang"
    }

    fn metadata(&self) -> NodeMetadata {
        NodeMetadata {
            description: "Output a bang for any input".to_string(),
            category: "control".to_string(),
            inlets: vec![PortDefinition::hot("hot", "anything")],
            outlets: vec![PortDefinition::outlet("out", "bang")],
        }
    }
}

/// Bangs once when the patch loads. The default load and bang behaviour is
/// exactly this, so nothing is overridden.
pub struct LoadBangNode;

impl Node for LoadBangNode {
    fn node_type(&self) -> &str {
        "loadbang"
    }

    fn calculate_output(&self, ctx: &mut NodeContext<'_>) -> Result<()> {
        ctx.output_main(Value::Bang)
    }
}

pub struct LoadBangNodeFactory;

impl NodeFactory for LoadBangNodeFactory {
    fn create(&self, _args: &[Value]) -> std::result::Result<Arc<dyn Node>, NodeError> {
        Ok(Arc::new(LoadBangNode))
    }

    fn node_type(&self) -> &str {
        "loadbang"
    }

    fn metadata(&self) -> NodeMetadata {
        NodeMetadata {
            description: "Output a bang when the patch loads".to_string(),
            category: "control".to_string(),
            inlets: vec![],
            outlets: vec![PortDefinition::outlet("out", "bang")],
        }
    }
}

/// What a trigger outlet emits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerKind {
    Bang,
    Float,
    Anything,
}

impl TriggerKind {
    pub fn parse(position: usize, arg: &Value) -> std::result::Result<Self, NodeError> {
        match arg.as_str() {
            Some("b") | Some("bang") => Ok(TriggerKind::Bang),
            Some("f") | Some("float") => Ok(TriggerKind::Float),
            Some("a") | Some("anything") => Ok(TriggerKind::Anything),
            _ => Err(NodeError::InvalidArgument {
                position,
                expected: "one of b, f, a".to_string(),
                actual: arg.to_string(),
            }),
        }
    }

    fn convert(self, value: &Value) -> Value {
        match self {
            TriggerKind::Bang => Value::Bang,
            TriggerKind::Float => Value::Number(value.as_f64().unwrap_or(0.0)),
            TriggerKind::Anything => value.clone(),
        }
    }
}

/// Sends its input out of every outlet, right to left, converted per outlet
pub struct TriggerNode {
    kinds: Vec<TriggerKind>,
}

impl TriggerNode {
    pub fn new(kinds: Vec<TriggerKind>) -> Self {
        Self { kinds }
    }

    fn outlet_name(index: usize) -> String {
        format!("out{}", index)
    }

    fn fire(&self, ctx: &mut NodeContext<'_>, value: &Value) -> Result<()> {
        for (index, kind) in self.kinds.iter().enumerate().rev() {
            let Some(outlet) = ctx.outlet_named(&Self::outlet_name(index)) else {
                continue;
            };
            ctx.output(outlet, kind.convert(value))?;
        }
        Ok(())
    }
}

impl Node for TriggerNode {
    fn node_type(&self) -> &str {
        "trigger"
    }

    fn make_main_outlet(&self) -> Port {
        Port::outlet(Self::outlet_name(0))
    }

    fn setup(&self, ctx: &mut NodeContext<'_>, _args: &[Value]) -> Result<()> {
        for index in 1..self.kinds.len() {
            ctx.add_port(Port::outlet(Self::outlet_name(index)))?;
        }
        Ok(())
    }

    fn calculate_output(&self, ctx: &mut NodeContext<'_>) -> Result<()> {
        let value = ctx.port_value(ctx.hot_inlet()).cloned().unwrap_or_default();
        self.fire(ctx, &value)
    }

    fn inlet_received_bang(&self, ctx: &mut NodeContext<'_>, _inlet: PortId) -> Result<()> {
        self.fire(ctx, &Value::Bang)
    }

    fn load_bang(&self, _ctx: &mut NodeContext<'_>) -> Result<()> {
        Ok(())
    }
}

pub struct TriggerNodeFactory;

impl NodeFactory for TriggerNodeFactory {
    fn create(&self, args: &[Value]) -> std::result::Result<Arc<dyn Node>, NodeError> {
        let kinds = if args.is_empty() {
            vec![TriggerKind::Bang, TriggerKind::Bang]
        } else {
            args.iter()
                .enumerate()
                .map(|(i, arg)| TriggerKind::parse(i, arg))
                .collect::<std::result::Result<Vec<_>, _>>()?
        };
        Ok(Arc::new(TriggerNode::new(kinds)))
    }

    fn node_type(&self) -> &str {
        "trigger"
    }

    fn metadata(&self) -> NodeMetadata {
        NodeMetadata {
            description: "Fan a value out right to left, converting per outlet (b, f, a)"
                .to_string(),
            category: "control".to_string(),
            inlets: vec![PortDefinition::hot("hot", "anything")],
            outlets: vec![PortDefinition::outlet("out0..outN", "one per argument")],
        }
    }
}
