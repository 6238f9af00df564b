use crate::auth::simulation_headers;
use crate::error::Fault;
use core_types::{SimulationInstruction, SimulationRequest, SmartContract, Timestamp};
use reqwest::header::HeaderMap;
use serde::Serialize;
use serde_json::{Map, Value};
use std::time::Duration;

/// Path of the simulation endpoint, relative to the core API base URL.
pub const SIMULATE_PATH: &str = "/v1/contracts:simulate";

/// Advisory deadline sent with a call when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const TIMESTAMP_KEY: &str = "timestamp";

/// The JSON body of `POST /v1/contracts:simulate`.
#[derive(Debug, Serialize)]
pub struct SimulateContractsPayload<'a> {
    pub smart_contracts: &'a [SmartContract],
    pub start_timestamp: String,
    pub end_timestamp: String,
    pub instructions: Vec<Map<String, Value>>,
}

/// Headers and body for one call, ready to be sent.
#[derive(Debug)]
pub struct BuiltRequest<'a> {
    pub headers: HeaderMap,
    pub body: SimulateContractsPayload<'a>,
}

/// Turns a simulation request into the wire payload and header set.
///
/// Every timestamp is checked before anything else is produced, so a naive
/// timestamp fails the call without any network activity. Instructions keep
/// the order they were given in.
pub fn build_request<'a>(
    request: &'a SimulationRequest,
    auth_token: &str,
    timeout: Duration,
) -> Result<BuiltRequest<'a>, Fault> {
    let start_timestamp = canonical(&request.start)?;
    let end_timestamp = canonical(&request.end)?;
    let instructions = request
        .instructions
        .iter()
        .map(instruction_to_json)
        .collect::<Result<Vec<_>, _>>()?;

    let headers = simulation_headers(auth_token, timeout)?;

    Ok(BuiltRequest {
        headers,
        body: SimulateContractsPayload {
            smart_contracts: &request.smart_contracts,
            start_timestamp,
            end_timestamp,
            instructions,
        },
    })
}

/// Flattens an instruction into one document: the canonical `timestamp`
/// merged with the body's own fields.
///
/// A body that supplies its own `timestamp` field overrides the canonical one.
pub fn instruction_to_json(instruction: &SimulationInstruction) -> Result<Map<String, Value>, Fault> {
    let mut doc = Map::with_capacity(instruction.instruction().len() + 1);
    doc.insert(TIMESTAMP_KEY.to_string(), Value::String(canonical(instruction.time())?));

    for (key, value) in instruction.instruction() {
        if key == TIMESTAMP_KEY {
            tracing::warn!("Instruction body supplies its own 'timestamp' field; it replaces the instruction time.");
        }
        doc.insert(key.clone(), value.clone());
    }
    Ok(doc)
}

fn canonical(timestamp: &Timestamp) -> Result<String, Fault> {
    timestamp
        .to_rfc3339()
        .map_err(|_| Fault::InvalidTimestamp(timestamp.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, NaiveDate, TimeZone, Utc};
    use serde_json::json;

    fn utc(day: u32, hour: u32) -> Timestamp {
        Utc.with_ymd_and_hms(2019, 1, day, hour, 0, 0).unwrap().into()
    }

    fn body(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn builds_full_payload() {
        let request = SimulationRequest::new(utc(1, 0), utc(2, 0))
            .with_contracts([
                SmartContract::new("1", "api = '3.6.0'").with_params([("denomination", "GBP")]),
                SmartContract::new("2", "api = '3.6.0'"),
            ])
            .with_instructions([SimulationInstruction::new(
                utc(1, 0),
                body(json!({"create_account": {"id": "main_account", "product_version_id": "1"}})),
            )]);

        let built = build_request(&request, "token", DEFAULT_TIMEOUT).unwrap();
        let payload = serde_json::to_value(&built.body).unwrap();

        assert_eq!(
            payload,
            json!({
                "smart_contracts": [
                    {"smart_contract_version_id": "1", "code": "api = '3.6.0'",
                     "smart_contract_param_vals": {"denomination": "GBP"}},
                    {"smart_contract_version_id": "2", "code": "api = '3.6.0'"}
                ],
                "start_timestamp": "2019-01-01T00:00:00+00:00",
                "end_timestamp": "2019-01-02T00:00:00+00:00",
                "instructions": [
                    {"timestamp": "2019-01-01T00:00:00+00:00",
                     "create_account": {"id": "main_account", "product_version_id": "1"}}
                ]
            })
        );
        assert_eq!(built.headers["grpc-timeout"], "10S");
        assert_eq!(built.headers["x-auth-token"], "token");
    }

    #[test]
    fn instruction_order_is_preserved() {
        let instructions = (0..5).rev().map(|i| {
            SimulationInstruction::new(utc(1, i), body(json!({"step": i})))
        });
        let request = SimulationRequest::new(utc(1, 0), utc(2, 0)).with_instructions(instructions);

        let built = build_request(&request, "token", DEFAULT_TIMEOUT).unwrap();
        let steps: Vec<_> = built.body.instructions.iter().map(|doc| doc["step"].clone()).collect();
        assert_eq!(steps, vec![json!(4), json!(3), json!(2), json!(1), json!(0)]);
        assert_eq!(built.body.instructions[0]["timestamp"], "2019-01-01T04:00:00+00:00");
    }

    #[test]
    fn non_utc_offset_round_trips() {
        let tz = FixedOffset::west_opt(5 * 3600).unwrap();
        let at = tz.with_ymd_and_hms(2019, 1, 1, 7, 0, 0).unwrap();
        let request = SimulationRequest::new(utc(1, 0), utc(2, 0))
            .with_instructions([SimulationInstruction::new(at, Map::new())]);

        let built = build_request(&request, "token", DEFAULT_TIMEOUT).unwrap();
        let text = built.body.instructions[0]["timestamp"].as_str().unwrap().to_string();
        assert_eq!(text, "2019-01-01T07:00:00-05:00");
        assert_eq!(chrono::DateTime::parse_from_rfc3339(&text).unwrap(), at);
    }

    #[test]
    fn naive_timestamps_are_rejected_anywhere() {
        let naive: Timestamp = NaiveDate::from_ymd_opt(2019, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            .into();

        let as_start = SimulationRequest::new(naive, utc(2, 0));
        assert!(matches!(
            build_request(&as_start, "token", DEFAULT_TIMEOUT),
            Err(Fault::InvalidTimestamp(_))
        ));

        let as_end = SimulationRequest::new(utc(1, 0), naive);
        assert!(matches!(
            build_request(&as_end, "token", DEFAULT_TIMEOUT),
            Err(Fault::InvalidTimestamp(_))
        ));

        let in_instruction = SimulationRequest::new(utc(1, 0), utc(2, 0))
            .with_instructions([SimulationInstruction::new(naive, Map::new())]);
        assert!(matches!(
            build_request(&in_instruction, "token", DEFAULT_TIMEOUT),
            Err(Fault::InvalidTimestamp(_))
        ));
    }

    #[test]
    fn body_timestamp_field_takes_precedence() {
        let instruction = SimulationInstruction::new(utc(1, 0), body(json!({"timestamp": "custom"})));
        let doc = instruction_to_json(&instruction).unwrap();
        assert_eq!(doc["timestamp"], "custom");
    }
}
