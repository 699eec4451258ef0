//! Trace wire parsing
//!
//! The tracer serves traces as untyped JSON tuples. This module validates them
//! into [`Event`]s so nothing downstream ever indexes into a positional array.

use crate::domain::TraceError;
use anyhow::{Context as _, Result};
use chainscope_common::{Category, Chain, Event, Trace, EVENT_FIELD_COUNT};
use serde_json::Value;
use std::path::Path;

/// Build an event from its wire tuple `[timestamp, isReturn, address, threadId]`
///
/// `category`, `chain` and `index` only locate the event in error messages.
///
/// # Errors
/// Returns an error if the tuple does not have exactly four fields or a field
/// has the wrong type (non-numeric, negative address, fractional id).
pub fn event_from_fields(
    fields: &[Value],
    category: Category,
    chain: usize,
    index: usize,
) -> Result<Event, TraceError> {
    if fields.len() != EVENT_FIELD_COUNT {
        return Err(TraceError::WrongFieldCount { category, chain, index, found: fields.len() });
    }

    let invalid = |field: &'static str| TraceError::InvalidField { category, chain, index, field };

    let timestamp = fields[0].as_f64().ok_or_else(|| invalid("timestamp"))?;
    let is_return = match &fields[1] {
        Value::Bool(b) => *b,
        other => other.as_u64().map(|flag| flag != 0).ok_or_else(|| invalid("return flag"))?,
    };
    let function_address = fields[2].as_u64().ok_or_else(|| invalid("function address"))?;
    let thread_id = fields[3].as_i64().ok_or_else(|| invalid("thread id"))?;

    Ok(Event { timestamp, is_return, function_address, thread_id })
}

/// Parse all chains of one direction
///
/// `null` means the tracer had nothing for this direction.
///
/// # Errors
/// Returns an error if the value is neither `null` nor an array of chains.
pub fn parse_chains(value: &Value, category: Category) -> Result<Vec<Chain>, TraceError> {
    let chains = match value {
        Value::Null => return Ok(Vec::new()),
        Value::Array(chains) => chains,
        other => {
            return Err(TraceError::InvalidShape(format!(
                "{category} chains must be an array, got {}",
                json_kind(other)
            )))
        }
    };

    chains
        .iter()
        .enumerate()
        .map(|(chain_index, chain)| -> Result<Chain, TraceError> {
            let events =
                chain.as_array().ok_or(TraceError::InvalidChain { category, chain: chain_index })?;
            events
                .iter()
                .enumerate()
                .map(|(index, event)| -> Result<Event, TraceError> {
                    let fields = event.as_array().ok_or(TraceError::InvalidField {
                        category,
                        chain: chain_index,
                        index,
                        field: "tuple",
                    })?;
                    event_from_fields(fields, category, chain_index, index)
                })
                .collect()
        })
        .collect()
}

/// Parse a `[receiveChains, sendChains]` payload
///
/// # Errors
/// Returns an error if the payload is not valid JSON or not of the expected shape.
pub fn parse_trace(json: &str) -> Result<Trace, TraceError> {
    let value: Value = serde_json::from_str(json)?;
    trace_from_value(&value)
}

/// Convert an already decoded payload
///
/// # Errors
/// Returns an error if the payload is not of the expected shape.
pub fn trace_from_value(value: &Value) -> Result<Trace, TraceError> {
    let pair = match value {
        Value::Null => return Ok(Trace::default()),
        Value::Array(pair) => pair,
        other => {
            return Err(TraceError::InvalidShape(format!("got {}", json_kind(other))));
        }
    };
    if pair.len() > 2 {
        return Err(TraceError::InvalidShape(format!("got {} directions", pair.len())));
    }

    let receive = parse_chains(pair.first().unwrap_or(&Value::Null), Category::Receive)?;
    let send = parse_chains(pair.get(1).unwrap_or(&Value::Null), Category::Send)?;
    Ok(Trace { receive, send })
}

/// Load a trace payload from a JSON file
///
/// # Errors
/// Returns an error if the file cannot be read or does not hold a valid trace.
pub fn load_trace(path: impl AsRef<Path>) -> Result<Trace> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read trace file {}", path.display()))?;
    parse_trace(&content).with_context(|| format!("Invalid trace file {}", path.display()))
}

/// Serialize a trace back into its wire form
#[must_use]
pub fn trace_to_value(trace: &Trace) -> Value {
    let chains = |chains: &[Chain]| {
        Value::Array(
            chains
                .iter()
                .map(|chain| {
                    Value::Array(
                        chain
                            .iter()
                            .map(|e| {
                                serde_json::json!([
                                    e.timestamp,
                                    u8::from(e.is_return),
                                    e.function_address,
                                    e.thread_id
                                ])
                            })
                            .collect(),
                    )
                })
                .collect(),
        )
    };
    Value::Array(vec![chains(&trace.receive), chains(&trace.send)])
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_simple_trace() {
        let trace = parse_trace("[[[[0.0,0,16,1],[0.1,1,16,1]]],[]]").unwrap();
        assert_eq!(trace.receive.len(), 1);
        assert!(trace.send.is_empty());
        assert_eq!(trace.receive[0][0], Event::call(0.0, 16, 1));
        assert_eq!(trace.receive[0][1], Event::ret(0.1, 16, 1));
    }

    #[test]
    fn test_null_directions_are_empty() {
        assert_eq!(parse_trace("null").unwrap(), Trace::default());
        assert_eq!(parse_trace("[null, null]").unwrap(), Trace::default());
        assert_eq!(parse_trace("[]").unwrap(), Trace::default());
    }

    #[test]
    fn test_wrong_field_count_is_rejected() {
        let err = parse_trace("[[], [[[0.0, 0, 16]]]]").unwrap_err();
        assert!(matches!(
            err,
            TraceError::WrongFieldCount { category: Category::Send, chain: 0, index: 0, found: 3 }
        ));
    }

    #[test]
    fn test_invalid_fields_are_rejected() {
        let fields = [json!(0.0), json!(0), json!(-5), json!(1)];
        let err = event_from_fields(&fields, Category::Receive, 0, 0).unwrap_err();
        assert!(err.to_string().contains("function address"));

        let fields = [json!("soon"), json!(0), json!(5), json!(1)];
        assert!(event_from_fields(&fields, Category::Receive, 0, 0).is_err());
    }

    #[test]
    fn test_boolean_return_flag_accepted() {
        let fields = [json!(1.5), json!(true), json!(7), json!(3)];
        let event = event_from_fields(&fields, Category::Receive, 0, 0).unwrap();
        assert!(event.is_return);
    }

    #[test]
    fn test_wire_round_trip() {
        let trace = Trace::new(
            vec![vec![Event::call(0.5, 16, 1), Event::ret(0.75, 16, 1)]],
            vec![vec![Event::call(1.0, 32, -1)]],
        );
        let back = trace_from_value(&trace_to_value(&trace)).unwrap();
        assert_eq!(back, trace);
    }

    #[test]
    fn test_bad_shape() {
        assert!(matches!(parse_trace("{}"), Err(TraceError::InvalidShape(_))));
        assert!(matches!(parse_trace("[[], [], []]"), Err(TraceError::InvalidShape(_))));
        assert!(matches!(parse_trace("[[1], []]"), Err(TraceError::InvalidChain { .. })));
    }
}
