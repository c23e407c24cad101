use gateway_api::{EnrichedRecord, EnvelopeCodec, GatewayError};

/// MessagePack envelope codec.
///
/// Records are written as a msgpack map keyed by field name
/// (`rmp_serde::to_vec_named`), never as a positional array, so a consumer
/// needs no schema to read them. Nested payload values keep their msgpack
/// types: maps, arrays, ints, floats, strings, bools, nil.
#[derive(Debug, Clone, Copy, Default)]
pub struct MsgpackCodec;

impl EnvelopeCodec for MsgpackCodec {
    fn encode(&self, record: &EnrichedRecord) -> Result<Vec<u8>, GatewayError> {
        rmp_serde::to_vec_named(record)
            .map_err(|e| GatewayError::format_err(format!("msgpack encode: {e}")))
    }

    fn decode(&self, envelope: &[u8]) -> Result<EnrichedRecord, GatewayError> {
        rmp_serde::from_slice(envelope)
            .map_err(|e| GatewayError::format_err(format!("msgpack decode: {e}")))
    }

    fn name(&self) -> &'static str {
        "msgpack"
    }
}
