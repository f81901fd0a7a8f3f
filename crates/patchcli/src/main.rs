// crates/patchcli/src/main.rs

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use patchcore::{notification_name, NodeId, PatchConfig, PortEvent, PortId, Value};
use patchruntime::{PatchRuntime, PortKind, RuntimeConfig};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "patch")]
#[command(about = "Patch engine CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available node types
    Nodes,

    /// Spawn one node, feed it values and print what comes out
    Send {
        /// Node type, e.g. "+" or "counter"
        #[arg(short, long)]
        kind: String,

        /// Construction arguments as a JSON array
        #[arg(short, long, default_value = "[]")]
        args: String,

        /// Value to deliver, as JSON. Repeat to send several; "bang" sends a bang.
        #[arg(short, long = "value")]
        values: Vec<String>,

        /// Inlet to deliver to. Defaults to the node's hot inlet.
        #[arg(short, long)]
        inlet: Option<String>,

        /// Maximum propagation depth
        #[arg(long)]
        max_depth: Option<usize>,

        /// Print port events of the node's main outlet
        #[arg(long)]
        events: bool,

        /// Show verbose output
        #[arg(long)]
        verbose: bool,
    },
}

/// Convert a serde_json::Value to patchcore::Value
fn json_to_value(json: serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(b),
        serde_json::Value::Number(n) => {
            if let Some(f) = n.as_f64() {
                Value::Number(f)
            } else {
                Value::Number(n.as_i64().unwrap_or(0) as f64)
            }
        }
        serde_json::Value::String(s) if s == "bang" => Value::Bang,
        serde_json::Value::String(s) => Value::String(s),
        serde_json::Value::Array(arr) => Value::Array(arr.into_iter().map(json_to_value).collect()),
        serde_json::Value::Object(obj) => {
            let map: HashMap<String, Value> = obj
                .into_iter()
                .map(|(k, v)| (k, json_to_value(v)))
                .collect();
            Value::Object(map)
        }
    }
}

/// Parse a command line value. Anything that is not JSON is taken as a string.
fn parse_value(raw: &str) -> Value {
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(json) => json_to_value(json),
        Err(_) if raw == "bang" => Value::Bang,
        Err(_) => Value::String(raw.to_string()),
    }
}

fn parse_args(raw: &str) -> Result<Vec<Value>> {
    let json: serde_json::Value =
        serde_json::from_str(raw).with_context(|| format!("Invalid arguments: {}", raw))?;
    match json {
        serde_json::Value::Array(items) => Ok(items.into_iter().map(json_to_value).collect()),
        other => Ok(vec![json_to_value(other)]),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Nodes => {
            list_nodes();
        }

        Commands::Send {
            kind,
            args,
            values,
            inlet,
            max_depth,
            events,
            verbose,
        } => {
            // Initialize logging
            if verbose {
                tracing_subscriber::fmt()
                    .with_max_level(tracing::Level::DEBUG)
                    .init();
            } else {
                tracing_subscriber::fmt()
                    .with_max_level(tracing::Level::INFO)
                    .init();
            }

            let mut patch = PatchConfig::default();
            if let Some(depth) = max_depth {
                patch = patch.with_max_propagation_depth(depth);
            }
            let config = RuntimeConfig {
                patch,
                debug_nodes: verbose,
            };
            send(&kind, parse_args(&args)?, values, inlet.as_deref(), config, events)?;
        }
    }

    Ok(())
}

/// The inlet named `inlet`, or the node's hot inlet when no name is given
fn target_inlet(rt: &PatchRuntime, node: NodeId, inlet: Option<&str>) -> Result<PortId> {
    match inlet {
        Some(name) => Ok(rt.inlet(node, name)?),
        None => Ok(rt
            .patch()
            .node(node)
            .context("Node disappeared after creation")?
            .hot_inlet()),
    }
}

fn send(
    kind: &str,
    args: Vec<Value>,
    values: Vec<String>,
    inlet: Option<&str>,
    config: RuntimeConfig,
    show_events: bool,
) -> Result<()> {
    let mut rt = PatchRuntime::with_registry(Arc::new(patchnodes::standard_registry()), config);

    let node = rt
        .spawn(kind, kind, &args)
        .with_context(|| format!("Failed to create node '{}'", kind))?;
    let (outlets, main_outlet) = {
        let data = rt
            .patch()
            .node(node)
            .context("Node disappeared after creation")?;
        let mut outlets = vec![data.main_outlet()];
        outlets.extend(data.outlets());
        (outlets, data.main_outlet())
    };

    let print = rt.spawn("print", "print", &[Value::from(kind)])?;
    let print_inlet = rt.inlet(print, "hot")?;
    for outlet in &outlets {
        rt.patch_mut().connect(*outlet, print_inlet)?;
    }
    let mut subscription = rt.patch().subscribe(notification_name(main_outlet));

    println!("🔧 {} {:?}", kind, args.iter().map(Value::to_string).collect::<Vec<_>>());
    rt.load()?;

    let target = target_inlet(&rt, node, inlet)?;
    let target_name = rt
        .patch()
        .port(target)
        .map(|p| p.name().to_string())
        .unwrap_or_default();
    for raw in values {
        let value = parse_value(&raw);
        let delivery = rt.patch_mut().input(target, value.clone())?;
        println!("→ {} {} ({:?})", target_name, value, delivery);
    }

    let state = rt
        .patch()
        .node(print)
        .map(|n| n.state().clone())
        .unwrap_or_default();
    match state.get("lines") {
        Some(Value::Array(lines)) => {
            for line in lines {
                println!("  {}", line);
            }
        }
        _ => println!("  (no output)"),
    }

    if show_events {
        println!();
        println!("📡 Events:");
        for event in subscription.drain() {
            match event {
                PortEvent::ValueChanged { value, .. } => println!("  value  {}", value),
                PortEvent::StatusChanged { status, .. } => println!("  status {:?}", status),
            }
        }
    }

    if let Some(description) = rt.patch().debug_description(node) {
        tracing::debug!("{}", description);
    }
    Ok(())
}

fn list_nodes() {
    let registry = patchnodes::standard_registry();

    println!("📦 Available node types:");
    println!();

    for node_type in registry.list_node_types() {
        if let Some(metadata) = registry.get_metadata(&node_type) {
            println!("  {} - {}", node_type, metadata.description);
            println!("    Category: {}", metadata.category);
            for inlet in &metadata.inlets {
                let temperature = match inlet.kind {
                    PortKind::HotInlet => "hot",
                    PortKind::ColdInlet => "cold",
                    PortKind::Outlet => "outlet",
                };
                println!("    ← {} ({}): {}", inlet.name, temperature, inlet.description);
            }
            for outlet in &metadata.outlets {
                println!("    → {}: {}", outlet.name, outlet.description);
            }
            println!();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runtime() -> PatchRuntime {
        PatchRuntime::with_registry(
            Arc::new(patchnodes::standard_registry()),
            RuntimeConfig::default(),
        )
    }

    #[test]
    fn test_default_inlet_is_the_hot_inlet() {
        let mut rt = runtime();
        for kind in rt.registry().list_node_types() {
            let node = rt.spawn(&kind, &kind, &[]).unwrap();
            let hot = rt.patch().node(node).unwrap().hot_inlet();
            assert_eq!(target_inlet(&rt, node, None).unwrap(), hot, "{}", kind);
        }
    }

    #[test]
    fn test_default_inlet_reaches_arithmetic() {
        let mut rt = runtime();
        let add = rt.spawn("+", "+", &[Value::Number(2.0)]).unwrap();
        let target = target_inlet(&rt, add, None).unwrap();
        rt.patch_mut().input(target, Value::Number(3.0)).unwrap();

        let out = rt.outlet(add, "out").unwrap();
        assert_eq!(rt.patch().value(out), Some(&Value::Number(5.0)));
        assert!(target_inlet(&rt, add, Some("hot")).is_err());
        let right = rt.inlet(add, "right").unwrap();
        assert_eq!(target_inlet(&rt, add, Some("right")).unwrap(), right);
    }

    #[test]
    fn test_parse_value() {
        assert!(parse_value("bang").is_bang());
        assert_eq!(parse_value("3"), Value::Number(3.0));
        assert_eq!(parse_value("hello"), Value::String("hello".to_string()));
    }
}
