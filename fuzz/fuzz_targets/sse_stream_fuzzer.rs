//! Fuzz target for the Server-Sent Events decoder
//!
//! Network reads split the push stream at arbitrary points (SSE framing)
//!
//! # Strategy
//!
//! - Random bytes: arbitrary stream content, including invalid UTF-8
//! - Random splits: the same stream fed in chunks cut at fuzzer-chosen offsets
//! - Line endings: `\r`, `\n` and `\r\n`, possibly split across chunks
//! - Small size limits, so oversized lines and events get dropped
//!
//! # Invariants
//!
//! - Chunking never changes which events come out, or their order
//! - Nothing after the last line terminator is emitted
//! - Buffered bytes never exceed the limit
//! - NEVER panic on malformed input

#![no_main]

use arbitrary::Arbitrary;
use gallows_proto::{MAX_EVENT_BYTES, SseDecoder};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Clone, Arbitrary)]
struct Stream {
    bytes: Vec<u8>,
    cuts: Vec<u16>,
    limit: Option<u8>,
}

fuzz_target!(|stream: Stream| {
    let limit = stream.limit.map_or(MAX_EVENT_BYTES, usize::from);
    let mut whole = SseDecoder::with_limit(limit);
    let expected = whole.push(&stream.bytes);

    let mut offsets: Vec<usize> =
        stream.cuts.iter().map(|cut| usize::from(*cut) % (stream.bytes.len() + 1)).collect();
    offsets.sort_unstable();
    offsets.dedup();

    let mut chunked = SseDecoder::with_limit(limit);
    let mut events = Vec::new();
    let mut start = 0;
    for end in offsets.into_iter().chain([stream.bytes.len()]) {
        events.extend(chunked.push(&stream.bytes[start..end]));
        start = end;
    }

    assert_eq!(events, expected, "chunking changed the decoded events");
    assert!(events.iter().all(|data| data.len() <= limit));
    assert!(whole.buffered() <= limit && chunked.buffered() <= limit);

    let tail = stream.bytes.iter().rev().take_while(|b| **b != b'\n' && **b != b'\r').count();
    if tail <= limit {
        assert_eq!(chunked.buffered(), whole.buffered());
        assert_eq!(whole.buffered(), tail);
    }
});
