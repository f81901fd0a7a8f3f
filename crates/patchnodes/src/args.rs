use patchcore::{NodeError, Value};

/// Numeric argument at `position`, or `default` when absent
pub(crate) fn number_arg(args: &[Value], position: usize, default: f64) -> Result<f64, NodeError> {
    match args.get(position) {
        None => Ok(default),
        Some(Value::Number(n)) => Ok(*n),
        Some(other) => Err(NodeError::InvalidArgument {
            position,
            expected: "number".to_string(),
            actual: format!("{:?}", other.kind()),
        }),
    }
}

/// Collapse construction arguments into a single value
pub(crate) fn args_value(args: &[Value]) -> Value {
    match args {
        [] => Value::Bang,
        [single] => single.clone(),
        many => Value::Array(many.to_vec()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_arg() {
        let args = [Value::Number(2.0), Value::from("x")];
        assert_eq!(number_arg(&args, 0, 1.0).unwrap(), 2.0);
        assert_eq!(number_arg(&args, 5, 1.0).unwrap(), 1.0);
        assert!(matches!(
            number_arg(&args, 1, 1.0),
            Err(NodeError::InvalidArgument { position: 1, .. })
        ));
    }

    #[test]
    fn test_args_value() {
        assert!(args_value(&[]).is_bang());
        assert_eq!(args_value(&[Value::Number(1.0)]), Value::Number(1.0));
        assert_eq!(
            args_value(&[Value::Number(1.0), Value::from("a")]),
            Value::Array(vec![Value::Number(1.0), Value::from("a")])
        );
    }
}
