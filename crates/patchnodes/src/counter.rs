use crate::args::number_arg;
use crate::math::{BinOp, BinOpNode};
use crate::store::FloatNode;
use patchcore::{
    Node, NodeContext, NodeError, NodeId, PatchError, Port, PortId, Result, TypeCheck, Value,
    ValueKind,
};
use patchruntime::{NodeFactory, NodeMetadata, PortDefinition};
use std::sync::Arc;

/// Counts up by `step` on every bang, starting at `start`.
///
/// Built from two subnodes, a `float` holding the count and a `+ step`
/// feeding the incremented value back into the float's cold inlet:
///
/// ```text
/// hot ──► [float] ──► out
///          ▲    │
///     cold │    ▼
///         [+ step]
/// ```
///
/// The counter's own cold inlet forwards into the float's cold inlet, so a
/// number there resets the count.
pub struct CounterNode {
    step: f64,
    start: f64,
}

impl CounterNode {
    pub fn new(step: f64, start: f64) -> Self {
        Self { step, start }
    }

    /// The float subnode's hot inlet
    fn store_inlet(ctx: &NodeContext<'_>) -> Result<PortId> {
        let store = ctx
            .subnodes()
            .first()
            .copied()
            .ok_or_else(|| NodeError::Configuration("counter has no store".to_string()))?;
        Ok(Self::ports(ctx, store)?.0)
    }

    fn ports(ctx: &NodeContext<'_>, node: NodeId) -> Result<(PortId, PortId, PortId)> {
        let data = ctx
            .patch()
            .node(node)
            .ok_or(PatchError::NodeNotFound(node))?;
        Ok((data.hot_inlet(), data.cold_inlet(), data.main_outlet()))
    }
}

impl Node for CounterNode {
    fn node_type(&self) -> &str {
        "counter"
    }

    fn make_cold_inlet(&self) -> Port {
        Port::cold_inlet("cold").accepting(TypeCheck::only(ValueKind::Number))
    }

    fn setup(&self, ctx: &mut NodeContext<'_>, _args: &[Value]) -> Result<()> {
        let store = ctx.add_subnode(Arc::new(FloatNode), "store", &[Value::Number(self.start)])?;
        let add = ctx.add_subnode(
            Arc::new(BinOpNode::new(BinOp::Add)),
            "increment",
            &[Value::Number(self.step)],
        )?;
        let (_, store_cold, store_out) = Self::ports(ctx, store)?;
        let (add_left, _, add_out) = Self::ports(ctx, add)?;
        let (out, cold) = (ctx.main_outlet(), ctx.cold_inlet());

        let patch = ctx.patch_mut();
        patch.connect(store_out, add_left)?;
        patch.connect(add_out, store_cold)?;
        patch.observe_port(out, store_out)?;
        patch.forward_to_port(cold, store_cold)
    }

    fn calculate_output(&self, ctx: &mut NodeContext<'_>) -> Result<()> {
        let inlet = Self::store_inlet(ctx)?;
        ctx.input(inlet, Value::Bang)?;
        Ok(())
    }

    /// A number sets the count and outputs it
    fn hot_inlet_received(
        &self,
        ctx: &mut NodeContext<'_>,
        _inlet: PortId,
        value: Value,
    ) -> Result<()> {
        let inlet = Self::store_inlet(ctx)?;
        ctx.input(inlet, value)?;
        Ok(())
    }

    fn inlet_received_bang(&self, ctx: &mut NodeContext<'_>, inlet: PortId) -> Result<()> {
        if inlet == ctx.hot_inlet() {
            self.calculate_output(ctx)
        } else {
            Ok(())
        }
    }

    fn load_bang(&self, _ctx: &mut NodeContext<'_>) -> Result<()> {
        Ok(())
    }
}

pub struct CounterNodeFactory;

impl NodeFactory for CounterNodeFactory {
    fn create(&self, args: &[Value]) -> std::result::Result<Arc<dyn Node>, NodeError> {
        let step = number_arg(args, 0, 1.0)?;
        let start = number_arg(args, 1, 0.0)?;
        Ok(Arc::new(CounterNode::new(step, start)))
    }

    fn node_type(&self) -> &str {
        "counter"
    }

    fn metadata(&self) -> NodeMetadata {
        NodeMetadata {
            description: "Output a count on every bang: counter [step] [start]".to_string(),
            category: "control".to_string(),
            inlets: vec![
                PortDefinition::hot("hot", "bang: output and advance, number: output from there"),
                PortDefinition::cold("cold", "number: set the next output"),
            ],
            outlets: vec![PortDefinition::outlet("out", "number")],
        }
    }
}
