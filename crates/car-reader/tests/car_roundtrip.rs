use std::io::Cursor;

use car_reader::{
    CarBlockReader, CarHeader, CarReadError, CarStream, CarWriter, Cid, decode_section,
};
use car_reader::varint::put_uvarint;
use cid::multihash::Multihash;

const DAG_CBOR: u64 = 0x71;
const RAW: u64 = 0x55;
const BLAKE3: u64 = 0x1e;

fn block_cid(codec: u64, data: &[u8]) -> Cid {
    let digest = blake3::hash(data);
    Cid::new_v1(codec, Multihash::wrap(BLAKE3, digest.as_bytes()).unwrap())
}

fn build_car(blocks: &[(Cid, Vec<u8>)], roots: Vec<Cid>) -> (Vec<u8>, Vec<u64>) {
    let mut w = CarWriter::new(Vec::new(), &CarHeader::new(roots)).unwrap();
    let positions = blocks
        .iter()
        .map(|(cid, data)| w.write_block(cid, data).unwrap())
        .collect();
    (w.into_inner(), positions)
}

fn sample_blocks() -> Vec<(Cid, Vec<u8>)> {
    (0u8..5)
        .map(|i| {
            let data = vec![i; 10 + i as usize * 100];
            (block_cid(RAW, &data), data)
        })
        .collect()
}

#[test]
fn first_section_is_at_position_zero() {
    let blocks = sample_blocks();
    let root = blocks[0].0;
    let (car, positions) = build_car(&blocks, vec![root]);
    assert_eq!(positions[0], 0);

    let mut stream = CarStream::from_reader(Cursor::new(car)).unwrap();
    assert_eq!(stream.roots(), &[root]);
    let (cid, pos) = stream.next_record().unwrap().unwrap();
    assert_eq!(cid, root);
    assert_eq!(pos, 0);
}

#[test]
fn stream_positions_match_writer_positions() {
    let blocks = sample_blocks();
    let (car, positions) = build_car(&blocks, vec![blocks[0].0]);

    let scanned: Vec<(Cid, u64)> = CarStream::from_reader(Cursor::new(car))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();

    let expected: Vec<(Cid, u64)> = blocks
        .iter()
        .map(|(c, _)| *c)
        .zip(positions.iter().copied())
        .collect();
    assert_eq!(scanned, expected);
}

#[test]
fn positioned_decode_returns_payload() {
    let blocks = sample_blocks();
    let (car, positions) = build_car(&blocks, vec![]);
    let (_, header_len) = CarHeader::read_framed(&car).unwrap();

    for ((cid, data), pos) in blocks.iter().zip(positions) {
        let at = (header_len + pos) as usize;
        let (got, payload, _) = decode_section(&car[at..]).unwrap();
        assert_eq!(&got, cid);
        assert_eq!(payload, data.as_slice());
    }
}

#[test]
fn sections_carry_payloads() {
    let blocks = vec![(block_cid(DAG_CBOR, b"node"), b"node".to_vec())];
    let (car, _) = build_car(&blocks, vec![blocks[0].0]);

    let mut reader = CarBlockReader::with_capacity(Cursor::new(car), 64);
    let (header, _) = reader.read_header().unwrap();
    assert_eq!(header.roots, vec![blocks[0].0]);

    let section = reader.next_section().unwrap().unwrap();
    assert_eq!(section.cid, blocks[0].0);
    assert_eq!(section.position, 0);
    assert_eq!(&section.data[..], b"node");
    assert!(reader.next_section().unwrap().is_none());
}

#[test]
fn truncated_block_is_reported() {
    let blocks = sample_blocks();
    let (mut car, _) = build_car(&blocks, vec![]);
    car.truncate(car.len() - 3);

    let result: Result<Vec<_>, _> = CarStream::from_reader(Cursor::new(car)).unwrap().collect();
    assert!(matches!(result, Err(CarReadError::UnexpectedEof(_))));
}

#[test]
fn empty_input_has_no_header() {
    assert!(matches!(
        CarStream::from_reader(Cursor::new(Vec::<u8>::new())),
        Err(CarReadError::UnexpectedEof(_))
    ));
}

/// Framed empty header, then a section declaring `entry_len` bytes that holds
/// only a CID and `body`.
fn car_with_declared_len(entry_len: u64, body: &[u8]) -> Vec<u8> {
    let mut car = CarHeader::new(vec![]).to_framed_bytes().unwrap();
    put_uvarint(&mut car, entry_len);
    car.extend_from_slice(&block_cid(RAW, b"hostile").to_bytes());
    car.extend_from_slice(body);
    car
}

#[test]
fn overflowing_entry_len_is_rejected() {
    let car = car_with_declared_len(u64::MAX, &[]);
    let result: Result<Vec<_>, _> = CarStream::from_reader(Cursor::new(car)).unwrap().collect();
    assert!(matches!(result, Err(CarReadError::InvalidEntryLen(_))));
}

#[test]
fn oversized_entry_len_fails_without_reading_past_input() {
    let car = car_with_declared_len(1 << 40, b"short");

    let mut reader = CarBlockReader::with_capacity(Cursor::new(car.clone()), 64);
    reader.read_header().unwrap();
    assert!(matches!(
        reader.next_section(),
        Err(CarReadError::UnexpectedEof(_))
    ));

    let result: Result<Vec<_>, _> = CarStream::from_reader(Cursor::new(car)).unwrap().collect();
    assert!(matches!(result, Err(CarReadError::UnexpectedEof(_))));
}
