use proptest::prelude::*;

use wordstream::checksum::{digest_bytes, ChecksumType, StreamingChecksum};
use wordstream::counter::{count_words, FrequencyTable, WordCounter};
use wordstream::decoder::{decode_chunks, StreamDecoder};

/// Split `bytes` at arbitrary cut points (sorted, deduplicated)
fn split_at_cuts(bytes: &[u8], mut cuts: Vec<usize>) -> Vec<&[u8]> {
    cuts.iter_mut().for_each(|c| *c %= bytes.len() + 1);
    cuts.sort_unstable();
    cuts.dedup();
    let mut pieces = Vec::new();
    let mut start = 0;
    for cut in cuts {
        pieces.push(&bytes[start..cut]);
        start = cut;
    }
    pieces.push(&bytes[start..]);
    pieces
}

proptest! {
    #[test]
    fn chunked_decode_reassembles_original(text in "\\PC*", size in 1usize..64) {
        let bytes = text.as_bytes();
        let decoded = decode_chunks(bytes.chunks(size)).unwrap();
        prop_assert_eq!(decoded.as_bytes(), bytes);
    }

    #[test]
    fn arbitrary_cuts_decode_like_whole(text in "[a-z é日本🦀\\n]{0,80}", cuts in prop::collection::vec(0usize..400, 0..12)) {
        let bytes = text.as_bytes();
        let pieces = split_at_cuts(bytes, cuts);
        let mut decoder = StreamDecoder::new();
        let mut out = String::new();
        for piece in pieces {
            out.push_str(&decoder.feed(piece).unwrap());
            prop_assert!(decoder.pending_len() < 4);
        }
        prop_assert!(decoder.finish().is_ok());
        prop_assert_eq!(out, text);
    }

    #[test]
    fn word_counts_ignore_segment_boundaries(text in "[A-Za-zé0-9 ,.!\\n]{0,120}", cuts in prop::collection::vec(0usize..200, 0..10)) {
        let bytes = text.as_bytes();
        let mut decoder = StreamDecoder::new();
        let mut counter = WordCounter::new();
        for piece in split_at_cuts(bytes, cuts) {
            counter.feed(&decoder.feed(piece).unwrap());
        }
        decoder.finish().unwrap();
        prop_assert_eq!(counter.finish(), count_words(&text));
    }

    #[test]
    fn streaming_checksum_matches_one_shot(data in prop::collection::vec(any::<u8>(), 0..512), size in 1usize..64) {
        for kind in [ChecksumType::Sha256, ChecksumType::Blake3] {
            let mut hasher = StreamingChecksum::new(kind);
            for chunk in data.chunks(size) {
                hasher.update(chunk);
            }
            prop_assert_eq!(hasher.finalize(), digest_bytes(&data, kind));
        }
    }

    #[test]
    fn merge_order_does_not_matter(texts in prop::collection::vec("[a-d ]{0,30}", 1..6)) {
        let tables: Vec<FrequencyTable> = texts.iter().map(|t| count_words(t)).collect();

        let mut forward = FrequencyTable::new();
        for t in &tables {
            forward.merge(t);
        }
        let mut backward = FrequencyTable::new();
        for t in tables.iter().rev() {
            backward.merge(t);
        }
        prop_assert_eq!(&forward, &backward);
        prop_assert_eq!(forward.top_k(3), backward.top_k(3));
        prop_assert_eq!(forward, count_words(&texts.join(" ")));
    }
}

#[test]
fn every_even_split_of_sentence_counts_each_word_once() {
    let sentence = "Rust streams text and counts words exactly once";
    let expected = count_words(sentence);
    for parts in 1..=sentence.len() {
        let size = sentence.len().div_ceil(parts);
        let mut counter = WordCounter::new();
        for piece in sentence.as_bytes().chunks(size) {
            // ASCII only, so every byte boundary is a char boundary
            counter.feed(std::str::from_utf8(piece).unwrap());
        }
        assert_eq!(counter.finish(), expected, "{parts} parts");
    }
}
