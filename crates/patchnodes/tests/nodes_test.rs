// crates/patchnodes/tests/nodes_test.rs

use patchcore::{FlowError, NodeError, NodeId, Value};
use patchnodes::{standard_registry, PRINT_HISTORY};
use patchruntime::{PatchRuntime, RuntimeConfig};
use std::sync::Arc;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

fn runtime() -> PatchRuntime {
    init_tracing();
    PatchRuntime::with_registry(Arc::new(standard_registry()), RuntimeConfig::default())
}

/// Spawn a print node fed by `source`'s outlet
fn printer(rt: &mut PatchRuntime, source: NodeId, outlet: &str) -> NodeId {
    let print = rt.spawn("print", "print", &[]).unwrap();
    rt.connect(source, outlet, print, "hot").unwrap();
    print
}

fn printed(rt: &PatchRuntime, print: NodeId) -> Vec<String> {
    match rt.patch().node(print).unwrap().state().get("lines") {
        Some(Value::Array(lines)) => lines.iter().map(|l| l.to_string()).collect(),
        _ => Vec::new(),
    }
}

fn out_value(rt: &PatchRuntime, node: NodeId) -> Value {
    let out = rt.outlet(node, "out").unwrap();
    rt.patch().value(out).cloned().unwrap_or_default()
}

#[test]
fn test_registry_lists_every_kind() {
    let registry = standard_registry();
    for kind in [
        "bang", "loadbang", "trigger", "counter", "print", "+", "-", "*", "/", "float",
        "message", "pack",
    ] {
        assert!(registry.contains(kind), "missing {}", kind);
    }
}

#[test]
fn test_arithmetic_hot_and_cold() {
    let mut rt = runtime();
    let sub = rt.spawn("-", "sub", &[Value::Number(10.0)]).unwrap();

    rt.send(sub, "left", Value::Number(3.0)).unwrap();
    assert_eq!(out_value(&rt, sub), Value::Number(-7.0));

    // Cold: stored, nothing emitted
    rt.send(sub, "right", Value::Number(2.0)).unwrap();
    assert_eq!(out_value(&rt, sub), Value::Number(-7.0));

    rt.bang(sub, "left").unwrap();
    assert_eq!(out_value(&rt, sub), Value::Number(1.0));
}

#[test]
fn test_divide_by_zero_outputs_zero() {
    let mut rt = runtime();
    let div = rt.spawn("/", "div", &[]).unwrap();
    rt.send(div, "left", Value::Number(5.0)).unwrap();
    assert_eq!(out_value(&rt, div), Value::Number(0.0));
}

#[test]
fn test_arithmetic_rejects_strings() {
    let mut rt = runtime();
    let add = rt.spawn("+", "add", &[Value::Number(1.0)]).unwrap();
    let print = printer(&mut rt, add, "out");

    rt.send(add, "left", Value::from("two")).unwrap();
    assert!(printed(&rt, print).is_empty());
}

#[test]
fn test_float_stores_and_bangs() {
    let mut rt = runtime();
    let float = rt.spawn("float", "f", &[Value::Number(4.0)]).unwrap();
    let print = printer(&mut rt, float, "out");

    rt.bang(float, "hot").unwrap();
    rt.send(float, "cold", Value::Number(5.0)).unwrap();
    rt.bang(float, "hot").unwrap();
    rt.send(float, "hot", Value::Number(7.0)).unwrap();
    rt.bang(float, "hot").unwrap();

    assert_eq!(
        printed(&rt, print),
        vec!["print: 4", "print: 5", "print: 7", "print: 7"]
    );
}

#[test]
fn test_counter_counts_from_start() {
    let mut rt = runtime();
    let counter = rt.spawn("counter", "c", &[]).unwrap();
    let print = printer(&mut rt, counter, "out");

    for _ in 0..3 {
        rt.bang(counter, "hot").unwrap();
    }
    assert_eq!(printed(&rt, print), vec!["print: 0", "print: 1", "print: 2"]);
    assert_eq!(rt.patch().depth(), 0);
}

#[test]
fn test_counter_step_and_reset() {
    let mut rt = runtime();
    let counter = rt
        .spawn("counter", "c", &[Value::Number(5.0), Value::Number(10.0)])
        .unwrap();
    let print = printer(&mut rt, counter, "out");

    rt.bang(counter, "hot").unwrap();
    rt.bang(counter, "hot").unwrap();
    rt.send(counter, "cold", Value::Number(100.0)).unwrap();
    rt.bang(counter, "hot").unwrap();
    rt.send(counter, "hot", Value::Number(1.0)).unwrap();
    rt.bang(counter, "hot").unwrap();

    assert_eq!(
        printed(&rt, print),
        vec!["print: 10", "print: 15", "print: 100", "print: 1", "print: 6"]
    );
}

#[test]
fn test_counter_subnodes_go_with_it() {
    let mut rt = runtime();
    let counter = rt.spawn("counter", "c", &[]).unwrap();
    let subnodes = rt.patch().node(counter).unwrap().subnodes().to_vec();
    assert_eq!(subnodes.len(), 2);
    assert_eq!(rt.patch().node_count(), 3);

    rt.remove(counter).unwrap();
    assert_eq!(rt.patch().node_count(), 0);
    assert!(subnodes.iter().all(|n| rt.patch().node(*n).is_none()));
}

#[test]
fn test_trigger_fires_right_to_left() {
    let mut rt = runtime();
    let trigger = rt
        .spawn("trigger", "t", &[Value::from("f"), Value::from("b")])
        .unwrap();
    let print = rt.spawn("print", "print", &[]).unwrap();
    rt.connect(trigger, "out0", print, "hot").unwrap();
    rt.connect(trigger, "out1", print, "hot").unwrap();

    rt.send(trigger, "hot", Value::Number(3.0)).unwrap();
    assert_eq!(printed(&rt, print), vec!["print: bang", "print: 3"]);
}

#[test]
fn test_message_outputs_content() {
    let mut rt = runtime();
    let message = rt
        .spawn("message", "m", &[Value::Number(1.0), Value::from("x")])
        .unwrap();
    let print = printer(&mut rt, message, "out");

    rt.bang(message, "hot").unwrap();
    rt.send(message, "cold", Value::from("hello")).unwrap();
    rt.send(message, "hot", Value::Number(9.0)).unwrap();

    assert_eq!(printed(&rt, print), vec!["print: 1 x", "print: hello"]);
}

#[test]
fn test_pack_combines_inlets() {
    let mut rt = runtime();
    let pack = rt.spawn("pack", "p", &[]).unwrap();

    rt.send(pack, "right", Value::from("a")).unwrap();
    rt.send(pack, "left", Value::Number(1.0)).unwrap();
    assert_eq!(
        out_value(&rt, pack),
        Value::Array(vec![Value::Number(1.0), Value::from("a")])
    );
}

#[test]
fn test_print_counts_and_prefixes() {
    let mut rt = runtime();
    let print = rt.spawn("print", "p", &[Value::from("dbg")]).unwrap();
    rt.send(print, "hot", Value::from("hi")).unwrap();
    rt.bang(print, "hot").unwrap();

    let state = rt.patch().node(print).unwrap().state();
    assert_eq!(state.number("count"), Some(2.0));
    assert_eq!(state.get("last"), Some(&Value::from("dbg: bang")));
}

#[test]
fn test_print_history_is_bounded() {
    let mut rt = runtime();
    let print = rt.spawn("print", "p", &[]).unwrap();
    let total = PRINT_HISTORY + 10;
    for i in 0..total {
        rt.send(print, "hot", Value::Number(i as f64)).unwrap();
    }

    let lines = printed(&rt, print);
    assert_eq!(lines.len(), PRINT_HISTORY);
    assert_eq!(lines.first().unwrap(), "print: 10");
    assert_eq!(lines.last().unwrap(), &format!("print: {}", total - 1));
    let state = rt.patch().node(print).unwrap().state();
    assert_eq!(state.number("count"), Some(total as f64));
}

#[test]
fn test_loadbang_drives_patch_once() {
    let mut rt = runtime();
    let load = rt.spawn("loadbang", "lb", &[]).unwrap();
    let message = rt.spawn("message", "m", &[Value::Number(42.0)]).unwrap();
    rt.connect(load, "out", message, "hot").unwrap();
    let print = printer(&mut rt, message, "out");

    rt.load().unwrap();
    rt.load().unwrap();
    assert_eq!(printed(&rt, print), vec!["print: 42"]);
}

#[test]
fn test_bang_node_converts_input() {
    let mut rt = runtime();
    let bang = rt.spawn("bang", "b", &[]).unwrap();
    let print = printer(&mut rt, bang, "out");
    rt.send(bang, "hot", Value::Number(1.0)).unwrap();
    assert_eq!(printed(&rt, print), vec!["print: bang"]);
}

#[test]
fn test_invalid_arguments_are_rejected() {
    let mut rt = runtime();
    assert!(matches!(
        rt.spawn("+", "add", &[Value::from("x")]),
        Err(FlowError::Node(NodeError::InvalidArgument { position: 0, .. }))
    ));
    assert!(matches!(
        rt.spawn("trigger", "t", &[Value::from("b"), Value::from("zz")]),
        Err(FlowError::Node(NodeError::InvalidArgument { position: 1, .. }))
    ));
    assert_eq!(rt.patch().node_count(), 0);
}
