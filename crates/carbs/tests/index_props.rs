mod common;

use std::collections::HashSet;

use carbs::persist::{decode_index_file, encode_index_file};
use carbs::{CarbsError, INDEX_CODECS, Index, IndexCodec, NOT_FOUND, Record};
use common::cid_from_digest;
use proptest::prelude::*;

fn dedup(records: Vec<Record>) -> Vec<Record> {
    let mut seen = HashSet::new();
    records.into_iter().filter(|r| seen.insert(r.cid)).collect()
}

fn uniform_records() -> impl Strategy<Value = Vec<Record>> {
    prop::collection::vec((any::<[u8; 32]>(), 0..NOT_FOUND), 0..96).prop_map(|v| {
        dedup(
            v.into_iter()
                .map(|(d, offset)| Record::new(cid_from_digest(&d), offset))
                .collect(),
        )
    })
}

fn mixed_records() -> impl Strategy<Value = Vec<Record>> {
    prop::collection::vec((any::<bool>(), any::<[u8; 32]>(), 0..NOT_FOUND), 0..96).prop_map(
        |v| {
            dedup(
                v.into_iter()
                    .map(|(short, d, offset)| {
                        let digest = if short { &d[..20] } else { &d[..] };
                        Record::new(cid_from_digest(digest), offset)
                    })
                    .collect(),
            )
        },
    )
}

fn has_mixed_lengths(records: &[Record]) -> bool {
    let lens: HashSet<usize> = records.iter().map(|r| r.digest().len()).collect();
    lens.len() > 1
}

proptest! {
    #[test]
    fn every_codec_finds_every_record(records in uniform_records()) {
        for codec in INDEX_CODECS {
            let idx = Index::build(codec, &records).unwrap();
            prop_assert_eq!(idx.len(), records.len());
            for r in &records {
                prop_assert_eq!(idx.get(&r.cid), r.offset, "{}", codec);
            }
        }
    }

    #[test]
    fn absent_cids_miss(
        records in uniform_records(),
        queries in prop::collection::vec(any::<[u8; 32]>(), 1..32),
    ) {
        let present: HashSet<_> = records.iter().map(|r| r.cid).collect();
        for codec in INDEX_CODECS {
            let idx = Index::build(codec, &records).unwrap();
            for p in &queries {
                let cid = cid_from_digest(p);
                if !present.contains(&cid) {
                    prop_assert_eq!(idx.get(&cid), NOT_FOUND);
                }
                let short = cid_from_digest(&p[..20]);
                prop_assert_eq!(idx.get(&short), NOT_FOUND);
            }
        }
    }

    #[test]
    fn mixed_lengths_need_a_general_codec(records in mixed_records()) {
        for codec in [IndexCodec::Hashed, IndexCodec::Sorted] {
            let idx = Index::build(codec, &records).unwrap();
            for r in &records {
                prop_assert_eq!(idx.get(&r.cid), r.offset);
            }
        }

        let single = Index::build(IndexCodec::SingleSorted, &records);
        if has_mixed_lengths(&records) {
            let is_mixed_err = matches!(single, Err(CarbsError::MixedDigestLength { .. }));
            prop_assert!(is_mixed_err);
        } else {
            prop_assert!(single.is_ok());
        }
    }

    #[test]
    fn marshal_round_trip_preserves_answers(
        records in mixed_records(),
        queries in prop::collection::vec(any::<[u8; 32]>(), 0..16),
    ) {
        let codecs: &[IndexCodec] = if has_mixed_lengths(&records) {
            &[IndexCodec::Hashed, IndexCodec::Sorted]
        } else {
            &INDEX_CODECS
        };
        for &codec in codecs {
            let idx = Index::build(codec, &records).unwrap();

            let mut restored = codec.empty_index();
            restored.unmarshal(&idx.to_bytes()).unwrap();
            let from_file = decode_index_file(&encode_index_file(&idx)).unwrap();
            prop_assert_eq!(from_file.codec(), codec);

            let queries = records
                .iter()
                .map(|r| r.cid)
                .chain(queries.iter().map(|p| cid_from_digest(p)));
            for q in queries {
                prop_assert_eq!(restored.get(&q), idx.get(&q));
                prop_assert_eq!(from_file.get(&q), idx.get(&q));
            }
        }
    }

    #[test]
    fn first_occurrence_wins(records in uniform_records()) {
        // replay every record later in reverse order with a different offset
        let mut input = records.clone();
        input.extend(
            records
                .iter()
                .rev()
                .map(|r| Record::new(r.cid, r.offset.wrapping_add(1) % NOT_FOUND)),
        );

        for codec in INDEX_CODECS {
            let idx = Index::build(codec, &input).unwrap();
            prop_assert_eq!(idx.len(), records.len());
            for r in &records {
                prop_assert_eq!(idx.get(&r.cid), r.offset);
            }
        }
    }
}

#[test]
fn duplicate_positions_resolve_to_the_earliest() {
    let a = cid_from_digest(&[1; 32]);
    let b = cid_from_digest(&[2; 32]);
    let input = [
        Record::new(b, 500),
        Record::new(a, 900),
        Record::new(b, 100),
        Record::new(a, 0),
    ];
    for codec in INDEX_CODECS {
        let idx = Index::build(codec, &input).unwrap();
        assert_eq!(idx.get(&a), 900, "{codec}");
        assert_eq!(idx.get(&b), 500, "{codec}");
    }
}

#[test]
fn truncated_payloads_are_corrupt() {
    let records: Vec<Record> = (0u8..20)
        .map(|i| Record::new(cid_from_digest(&[i; 32]), i as u64 * 1000))
        .collect();
    for codec in INDEX_CODECS {
        let bytes = Index::build(codec, &records).unwrap().to_bytes();
        for cut in [1, bytes.len() / 2, bytes.len() - 1] {
            let mut idx = codec.empty_index();
            let err = idx.unmarshal(&bytes[..cut]).unwrap_err();
            assert!(matches!(err, CarbsError::Corrupt(_)), "{codec} cut={cut}: {err}");
        }

        let mut padded = bytes.clone();
        padded.push(0);
        let mut idx = codec.empty_index();
        assert!(matches!(idx.unmarshal(&padded), Err(CarbsError::Corrupt(_))));
    }
}
