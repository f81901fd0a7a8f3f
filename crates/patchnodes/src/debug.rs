use patchcore::{Node, NodeContext, NodeError, PortId, Result, Value};
use patchruntime::{NodeFactory, NodeMetadata, PortDefinition};
use std::sync::Arc;

/// Lines a print node keeps in its state
pub const PRINT_HISTORY: usize = 64;

/// Logs what arrives on its hot inlet, prefixed with its argument.
///
/// Printed lines are also kept in the node state: `last` holds the latest
/// line, `lines` the most recent [`PRINT_HISTORY`] and `count` how many were
/// printed in total.
pub struct PrintNode {
    prefix: String,
}

impl PrintNode {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    fn print(&self, ctx: &mut NodeContext<'_>, value: &Value) -> Result<()> {
        let line = format!("{}: {}", self.prefix, value);
        tracing::info!("{}", line);

        let state = ctx.state_mut()?;
        let count = state.number_or("count", 0.0) + 1.0;
        let mut lines = match state.remove("lines") {
            Some(Value::Array(lines)) => lines,
            _ => Vec::new(),
        };
        lines.push(Value::from(line.as_str()));
        if lines.len() > PRINT_HISTORY {
            lines.drain(..lines.len() - PRINT_HISTORY);
        }
        state.set("lines", Value::Array(lines));
        state.set("last", line);
        state.set("count", count);
        Ok(())
    }
}

impl Node for PrintNode {
    fn node_type(&self) -> &str {
        "print"
    }

    fn calculate_output(&self, ctx: &mut NodeContext<'_>) -> Result<()> {
        let value = ctx.state()?.get("hot").cloned().unwrap_or_default();
        self.print(ctx, &value)
    }

    fn inlet_received_bang(&self, ctx: &mut NodeContext<'_>, inlet: PortId) -> Result<()> {
        if inlet == ctx.hot_inlet() {
            self.print(ctx, &Value::Bang)
        } else {
            Ok(())
        }
    }

    fn load_bang(&self, _ctx: &mut NodeContext<'_>) -> Result<()> {
        Ok(())
    }
}

pub struct PrintNodeFactory;

impl NodeFactory for PrintNodeFactory {
    fn create(&self, args: &[Value]) -> std::result::Result<Arc<dyn Node>, NodeError> {
        let prefix = match args.first() {
            None => "print".to_string(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        };
        Ok(Arc::new(PrintNode::new(prefix)))
    }

    fn node_type(&self) -> &str {
        "print"
    }

    fn metadata(&self) -> NodeMetadata {
        NodeMetadata {
            description: "Log incoming values".to_string(),
            category: "debug".to_string(),
            inlets: vec![PortDefinition::hot("hot", "anything")],
            outlets: vec![],
        }
    }
}
