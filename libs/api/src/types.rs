use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::util::now_ms;

/// Open-ended client data. Passed through untouched.
pub type Payload = serde_json::Map<String, serde_json::Value>;

// ════════════════════════════════════════════════════════════════
//  IncomingPayload
// ════════════════════════════════════════════════════════════════

/// Body of `POST /v1/submit`.
///
/// Only the structure is checked: `agent_id` must be a string and `data`
/// an object. Either may be missing or `null`, which yields the empty
/// value. Unknown fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct IncomingPayload {
    #[serde(default, deserialize_with = "null_as_default")]
    pub agent_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub data: Payload,
}

impl IncomingPayload {
    /// Decode a raw request body. The top-level value must be a JSON object;
    /// arrays are rejected even though serde would map them onto the struct
    /// positionally.
    pub fn from_json(body: &[u8]) -> Result<Self, serde_json::Error> {
        let object: serde_json::Map<String, serde_json::Value> = serde_json::from_slice(body)?;
        serde_json::from_value(serde_json::Value::Object(object))
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// ════════════════════════════════════════════════════════════════
//  EnrichedRecord
// ════════════════════════════════════════════════════════════════

/// What actually lands on the queue. Field names are part of the wire
/// contract: consumers decode the envelope by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedRecord {
    pub request_id: String,
    pub trace_id: String,
    pub agent_id: String,
    pub payload: Payload,
    pub timestamp_ms: i64,
}

impl EnrichedRecord {
    /// Stamp an incoming payload with fresh identifiers and the current time.
    ///
    /// `trace_id` is taken from the caller when one was propagated, otherwise
    /// drawn independently of `request_id`.
    pub fn enrich(incoming: IncomingPayload, trace_id: Option<String>) -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            trace_id: trace_id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            agent_id: incoming.agent_id,
            payload: incoming.data,
            timestamp_ms: now_ms(),
        }
    }
}

/// `202 Accepted` body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitAccepted {
    pub request_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_nested_data() {
        let body = br#"{"agent_id":"a1","data":{"k":"v","n":[1,2,{"deep":null}],"f":1.5,"b":true}}"#;
        let p = IncomingPayload::from_json(body).unwrap();
        assert_eq!(p.agent_id, "a1");
        assert_eq!(p.data["k"], json!("v"));
        assert_eq!(p.data["n"], json!([1, 2, {"deep": null}]));
        assert_eq!(p.data["f"], json!(1.5));
        assert_eq!(p.data["b"], json!(true));
    }

    #[test]
    fn missing_and_null_fields_default() {
        let p = IncomingPayload::from_json(b"{}").unwrap();
        assert_eq!(p, IncomingPayload::default());

        let p = IncomingPayload::from_json(br#"{"agent_id":null,"data":null}"#).unwrap();
        assert_eq!(p, IncomingPayload::default());
    }

    #[test]
    fn ignores_unknown_fields() {
        let p = IncomingPayload::from_json(br#"{"agent_id":"x","extra":42}"#).unwrap();
        assert_eq!(p.agent_id, "x");
        assert!(p.data.is_empty());
    }

    #[test]
    fn rejects_structural_mismatch() {
        let bodies: [&[u8]; 8] = [
            br#"{"agent_id": "test-agent", "data":"#,
            b"",
            b"not json",
            br#"["a1", {"k": "v"}]"#,
            b"42",
            br#"{"agent_id": 7}"#,
            br#"{"agent_id": "a", "data": [1, 2]}"#,
            br#"{"agent_id": "a", "data": "text"}"#,
        ];
        for body in bodies {
            assert!(
                IncomingPayload::from_json(body).is_err(),
                "expected rejection of {:?}",
                String::from_utf8_lossy(body)
            );
        }
    }

    #[test]
    fn enrich_copies_fields_and_stamps_ids() {
        let incoming = IncomingPayload::from_json(br#"{"agent_id":"agent-007","data":{"query":"x","top_k":5}}"#).unwrap();
        let before = now_ms();
        let rec = EnrichedRecord::enrich(incoming.clone(), None);

        assert_eq!(rec.agent_id, "agent-007");
        assert_eq!(rec.payload, incoming.data);
        assert!(rec.timestamp_ms >= before);
        assert!(Uuid::parse_str(&rec.request_id).is_ok());
        assert!(Uuid::parse_str(&rec.trace_id).is_ok());
        assert_ne!(rec.request_id, rec.trace_id);
    }

    #[test]
    fn enrich_keeps_propagated_trace_id() {
        let rec = EnrichedRecord::enrich(IncomingPayload::default(), Some("upstream-trace".into()));
        assert_eq!(rec.trace_id, "upstream-trace");
        assert!(Uuid::parse_str(&rec.request_id).is_ok());
    }
}
