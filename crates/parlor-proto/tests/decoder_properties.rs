//! Property-based tests for the line decoder.
//!
//! The decoder sits directly behind the socket, so every property here is
//! about fragmentation: the same bytes must produce the same lines regardless
//! of how TCP happened to split them.

use parlor_proto::{Decoded, LineDecoder};
use proptest::prelude::*;

/// Decode `chunks` in order, then flush the trailing partial line.
fn decode_chunks<'a>(chunks: impl IntoIterator<Item = &'a [u8]>) -> (Vec<String>, Option<String>) {
    let mut decoder = LineDecoder::new();
    let mut lines = Vec::new();

    for chunk in chunks {
        match decoder.feed(chunk) {
            Decoded::Lines(iter) => {
                for line in iter {
                    lines.push(line.expect("no line exceeds the default limit"));
                }
            },
            Decoded::EndOfStream => unreachable!("empty chunks are filtered"),
        }
    }

    (lines, decoder.finish())
}

/// Decode with a small limit, recording each rejected line as `Err(())`.
fn decode_limited<'a>(
    max: usize,
    chunks: impl IntoIterator<Item = &'a [u8]>,
) -> (Vec<Result<String, ()>>, Option<String>) {
    let mut decoder = LineDecoder::with_max_line_len(max);
    let mut outcomes = Vec::new();

    for chunk in chunks {
        if let Decoded::Lines(iter) = decoder.feed(chunk) {
            outcomes.extend(iter.map(|line| line.map_err(|_| ())));
        }
    }

    (outcomes, decoder.finish())
}

/// Split `bytes` at the given (unsorted, possibly repeated) cut points.
fn split_at_cuts(bytes: &[u8], cuts: &[usize]) -> Vec<Vec<u8>> {
    let mut cuts: Vec<usize> = cuts.iter().map(|c| c % (bytes.len() + 1)).collect();
    cuts.sort_unstable();
    cuts.dedup();

    let mut chunks = Vec::new();
    let mut start = 0;
    for cut in cuts.into_iter().chain(std::iter::once(bytes.len())) {
        if cut > start {
            chunks.push(bytes[start..cut].to_vec());
            start = cut;
        }
    }
    chunks
}

/// Lines of printable text without terminators.
fn line_strategy() -> impl Strategy<Value = String> {
    "[^\r\n]{0,40}"
}

proptest! {
    #[test]
    fn prop_chunk_boundaries_do_not_matter(
        bytes in prop::collection::vec(any::<u8>(), 0..512),
        cuts in prop::collection::vec(any::<usize>(), 0..32),
    ) {
        let whole = decode_chunks(std::iter::once(bytes.as_slice()).filter(|c| !c.is_empty()));
        let chunks = split_at_cuts(&bytes, &cuts);
        let split = decode_chunks(chunks.iter().map(Vec::as_slice));

        prop_assert_eq!(whole, split);
    }

    #[test]
    fn prop_byte_at_a_time_matches_whole(bytes in prop::collection::vec(any::<u8>(), 0..256)) {
        let whole = decode_chunks(std::iter::once(bytes.as_slice()).filter(|c| !c.is_empty()));
        let single = decode_chunks(bytes.chunks(1));

        prop_assert_eq!(whole, single);
    }

    #[test]
    fn prop_terminated_lines_round_trip(
        lines in prop::collection::vec((line_strategy(), any::<bool>()), 0..20),
        cuts in prop::collection::vec(any::<usize>(), 0..16),
    ) {
        let mut wire = Vec::new();
        for (line, crlf) in &lines {
            wire.extend_from_slice(line.as_bytes());
            wire.extend_from_slice(if *crlf { b"\r\n" } else { b"\n" });
        }

        let chunks = split_at_cuts(&wire, &cuts);
        let (decoded, rest) = decode_chunks(chunks.iter().map(Vec::as_slice));

        let expected: Vec<String> = lines.into_iter().map(|(line, _)| line).collect();
        prop_assert_eq!(decoded, expected);
        prop_assert_eq!(rest, None);
    }

    #[test]
    fn prop_overlong_lines_are_skipped_the_same_way_for_any_chunking(
        bytes in prop::collection::vec(prop::sample::select(b"ab\r\n".to_vec()), 0..256),
        cuts in prop::collection::vec(any::<usize>(), 0..32),
        max in 0usize..8,
    ) {
        let whole = decode_limited(max, std::iter::once(bytes.as_slice()).filter(|c| !c.is_empty()));
        let chunks = split_at_cuts(&bytes, &cuts);
        let split = decode_limited(max, chunks.iter().map(Vec::as_slice));

        prop_assert_eq!(&whole, &split);

        for line in whole.0.iter().flatten() {
            prop_assert!(line.len() <= max);
            prop_assert!(!line.contains('\n'));
        }
    }

    #[test]
    fn prop_no_bytes_lost(bytes in prop::collection::vec(1u8..=127, 0..256)) {
        // ASCII without NUL decodes losslessly, so byte counts are comparable.
        let (lines, rest) = decode_chunks(bytes.chunks(7));

        let terminators = bytes.iter().filter(|&&b| b == b'\n').count();
        let stripped_crs = bytes.windows(2).filter(|w| w == b"\r\n").count();
        let delivered: usize = lines.iter().map(String::len).sum::<usize>()
            + rest.map_or(0, |r| r.len());

        prop_assert_eq!(lines.len(), terminators);
        prop_assert_eq!(delivered + terminators + stripped_crs, bytes.len());
    }
}

#[test]
fn scenario_greeting_then_two_lines_in_separate_writes() {
    let (lines, rest) = decode_chunks([b"Welcome\n".as_slice(), b"Hi\r\nBye\n".as_slice()]);

    assert_eq!(lines, vec!["Welcome", "Hi", "Bye"]);
    assert_eq!(rest, None);
}
