use crate::args::number_arg;
use patchcore::{Node, NodeContext, NodeError, Port, PortId, Result, TypeCheck, Value, ValueKind};
use patchruntime::{NodeFactory, NodeMetadata, PortDefinition};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl BinOp {
    pub const ALL: [BinOp; 4] = [BinOp::Add, BinOp::Subtract, BinOp::Multiply, BinOp::Divide];

    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Subtract => "-",
            BinOp::Multiply => "*",
            BinOp::Divide => "/",
        }
    }

    /// Division by zero yields 0
    pub fn apply(self, left: f64, right: f64) -> f64 {
        match self {
            BinOp::Add => left + right,
            BinOp::Subtract => left - right,
            BinOp::Multiply => left * right,
            BinOp::Divide if right == 0.0 => 0.0,
            BinOp::Divide => left / right,
        }
    }
}

/// `left op right`: the hot left operand triggers output, the cold right
/// operand is kept for later
pub struct BinOpNode {
    op: BinOp,
}

impl BinOpNode {
    pub fn new(op: BinOp) -> Self {
        Self { op }
    }
}

impl Node for BinOpNode {
    fn node_type(&self) -> &str {
        self.op.symbol()
    }

    fn make_hot_inlet(&self) -> Port {
        Port::hot_inlet("left").accepting(TypeCheck::only(ValueKind::Number))
    }

    fn make_cold_inlet(&self) -> Port {
        Port::cold_inlet("right").accepting(TypeCheck::only(ValueKind::Number))
    }

    fn setup(&self, ctx: &mut NodeContext<'_>, args: &[Value]) -> Result<()> {
        let right = number_arg(args, 0, 0.0)?;
        let cold = ctx.cold_inlet();
        ctx.set_value(cold, Value::Number(right))
    }

    fn calculate_output(&self, ctx: &mut NodeContext<'_>) -> Result<()> {
        let left = ctx.state()?.number_or("left", 0.0);
        let right = ctx
            .port_value(ctx.cold_inlet())
            .and_then(Value::as_f64)
            .unwrap_or(0.0);
        ctx.output_main(Value::Number(self.op.apply(left, right)))
    }

    /// A bang repeats the last calculation
    fn inlet_received_bang(&self, ctx: &mut NodeContext<'_>, _inlet: PortId) -> Result<()> {
        self.calculate_output(ctx)
    }

    fn load_bang(&self, _ctx: &mut NodeContext<'_>) -> Result<()> {
        Ok(())
    }
}

pub struct BinOpNodeFactory(pub BinOp);

impl NodeFactory for BinOpNodeFactory {
    fn create(&self, args: &[Value]) -> std::result::Result<Arc<dyn Node>, NodeError> {
        number_arg(args, 0, 0.0)?;
        Ok(Arc::new(BinOpNode::new(self.0)))
    }

    fn node_type(&self) -> &str {
        self.0.symbol()
    }

    fn metadata(&self) -> NodeMetadata {
        NodeMetadata {
            description: format!("Compute left {} right", self.0.symbol()),
            category: "math".to_string(),
            inlets: vec![
                PortDefinition::hot("left", "number, outputs the result"),
                PortDefinition::cold("right", "number, stored"),
            ],
            outlets: vec![PortDefinition::outlet("out", "number")],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply() {
        assert_eq!(BinOp::Add.apply(2.0, 3.0), 5.0);
        assert_eq!(BinOp::Subtract.apply(2.0, 3.0), -1.0);
        assert_eq!(BinOp::Multiply.apply(2.0, 3.0), 6.0);
        assert_eq!(BinOp::Divide.apply(3.0, 2.0), 1.5);
        assert_eq!(BinOp::Divide.apply(3.0, 0.0), 0.0);
    }
}
