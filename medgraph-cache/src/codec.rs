// Copyright 2025 Medgraph (https://github.com/medgraph)
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Record payload codec.
//!
//! Pipeline per record: JSON serialize -> LZ4 block compress -> base64url
//! encode. Tokens are joined by a delimiter and regrouped into bounded
//! chunks so each backend write stays small. Decoding reverses the pipeline
//! and drops malformed tokens with a warning instead of failing the read.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use medgraph_core::{MedgraphError, Record, Result};
use tracing::warn;

/// Delimiter between record tokens. base64url never produces it.
const TOKEN_DELIMITER: char = ',';

/// Upper bound on one chunk, keeping individual backend writes small.
const MAX_CHUNK_BYTES: usize = 100 * 1024;

/// Encode records into ordered chunk strings.
pub fn encode(records: &[Record]) -> Result<Vec<String>> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for record in records {
        let raw = serde_json::to_vec(record)?;
        let compressed = lz4::block::compress(&raw, None, true)
            .map_err(|e| MedgraphError::Cache(format!("lz4 compression failed: {e}")))?;
        let token = URL_SAFE_NO_PAD.encode(compressed);

        if !current.is_empty() && current.len() + token.len() + 1 > MAX_CHUNK_BYTES {
            chunks.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(TOKEN_DELIMITER);
        }
        current.push_str(&token);
    }

    // Flush the trailing partial chunk.
    if !current.is_empty() {
        chunks.push(current);
    }
    Ok(chunks)
}

/// Decode ordered chunks back into records. Malformed tokens are skipped.
pub fn decode(chunks: &[String]) -> Vec<Record> {
    let mut records = Vec::new();
    for token in chunks.join(",").split(TOKEN_DELIMITER) {
        if token.is_empty() {
            continue;
        }
        match decode_token(token) {
            Ok(record) => records.push(record),
            Err(e) => warn!(error = %e, "dropping malformed cached record"),
        }
    }
    records
}

fn decode_token(token: &str) -> Result<Record> {
    let compressed = URL_SAFE_NO_PAD
        .decode(token)
        .map_err(|e| MedgraphError::Cache(format!("base64 decode failed: {e}")))?;
    let raw = lz4::block::decompress(&compressed, None)
        .map_err(|e| MedgraphError::Cache(format!("lz4 decompression failed: {e}")))?;
    Ok(serde_json::from_slice(&raw)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use medgraph_core::{NormalizedCurie, RecordNode};
    use std::collections::BTreeMap;

    fn record(subject: &str, object: &str) -> Record {
        Record {
            subject: RecordNode {
                original: subject.to_string(),
                normalized: NormalizedCurie::identity(subject),
                category: Some("biolink:Gene".into()),
            },
            object: RecordNode {
                original: object.to_string(),
                normalized: NormalizedCurie::identity(object),
                category: Some("biolink:Disease".into()),
            },
            predicate: "biolink:related_to".into(),
            api_name: "Test API".into(),
            source: "infores:test".into(),
            api_is_trapi: false,
            publications: vec!["PMID:123".into()],
            attributes: BTreeMap::new(),
            is_set: false,
            hash: "abc123".into(),
            qedge_id: Some("e01".into()),
        }
    }

    #[test]
    fn test_roundtrip_drops_qedge_backreference() {
        let records = vec![record("NCBIGene:3778", "MONDO:0011122")];
        let decoded = decode(&encode(&records).unwrap());
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].subject.curie(), "NCBIGene:3778");
        assert_eq!(decoded[0].hash, "abc123");
        // The qedge back-reference is skip-serialized; the handler restores it.
        assert_eq!(decoded[0].qedge_id, None);
    }

    #[test]
    fn test_empty_input_yields_no_chunks() {
        assert!(encode(&[]).unwrap().is_empty());
        assert!(decode(&[]).is_empty());
    }

    #[test]
    fn test_large_batch_spans_multiple_chunks() {
        let mut records = Vec::new();
        for i in 0..600u64 {
            let mut rec = record(&format!("NCBIGene:{i}"), "MONDO:0011122");
            // Inflate attributes with content LZ4 cannot collapse, so the
            // compressed tokens add up past one chunk.
            let filler: String = (0..64u64)
                .map(|j| format!("{:016x}", i.wrapping_mul(2654435761).rotate_left(j as u32) ^ j))
                .collect();
            rec.attributes
                .insert("description".into(), serde_json::Value::String(filler));
            records.push(rec);
        }
        let chunks = encode(&records).unwrap();
        assert!(chunks.len() > 1, "expected multiple chunks, got {}", chunks.len());
        assert!(chunks.iter().all(|c| c.len() <= MAX_CHUNK_BYTES));

        let decoded = decode(&chunks);
        assert_eq!(decoded.len(), records.len());
        assert_eq!(decoded[17].subject.curie(), "NCBIGene:17");
    }

    #[test]
    fn test_malformed_token_skipped() {
        let mut chunks = encode(&[record("NCBIGene:3778", "MONDO:0011122")]).unwrap();
        chunks.push("!!not-base64!!".to_string());
        let decoded = decode(&chunks);
        assert_eq!(decoded.len(), 1);
    }
}
