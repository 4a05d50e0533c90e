//! Fuzz target for LineDecoder
//!
//! Feeds arbitrary bytes, split at arbitrary points, into the decoder.
//!
//! # Invariants
//!
//! - Decoding never panics, whatever the bytes or chunking
//! - Chunking does not change the decoded lines
//! - No decoded line contains a line feed
//! - A line over the length limit is one error, never a truncated line, and
//!   the lines after it decode the same for any chunking

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use parlor_proto::{Decoded, LineDecoder};

const MAX_LINE_LEN: usize = 64;

#[derive(Debug, Arbitrary)]
struct Input {
    data: Vec<u8>,
    cuts: Vec<u8>,
}

fn decode(chunks: &[&[u8]]) -> (Vec<Result<String, ()>>, Option<String>) {
    let mut decoder = LineDecoder::with_max_line_len(MAX_LINE_LEN);
    let mut outcomes = Vec::new();

    for chunk in chunks {
        match decoder.feed(chunk) {
            Decoded::Lines(iter) => outcomes.extend(iter.map(|line| line.map_err(|_| ()))),
            Decoded::EndOfStream => unreachable!("empty chunks are filtered out"),
        }
    }
    (outcomes, decoder.finish())
}

fuzz_target!(|input: Input| {
    if input.data.is_empty() {
        return;
    }

    let whole = [input.data.as_slice()];
    let (expected, rest) = decode(&whole);

    let mut chunks = Vec::new();
    let mut remaining = input.data.as_slice();
    for cut in input.cuts {
        if remaining.is_empty() {
            break;
        }
        let at = (usize::from(cut) % remaining.len()).max(1);
        let (head, tail) = remaining.split_at(at);
        chunks.push(head);
        remaining = tail;
    }
    if !remaining.is_empty() {
        chunks.push(remaining);
    }
    let (outcomes, chunked_rest) = decode(&chunks);

    for line in outcomes.iter().flatten() {
        assert!(!line.contains('\n'));
    }

    assert_eq!(outcomes, expected);
    assert_eq!(chunked_rest, rest);
});
