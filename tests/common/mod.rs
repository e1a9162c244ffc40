//! Synthetic baseline JPEG covers for integration tests.
//!
//! Covers are built through the crate's own scan encoder with the standard
//! Annex K tables, so every test exercises parse → decode → embed → encode
//! → reparse end-to-end without shipping binary fixtures. Coefficient
//! distributions are seeded, making every cover deterministic.

// not every test binary uses every builder
#![allow(dead_code)]

use histeg::jpeg::parser::{Component, Frame, HuffmanSpec, QuantTable, Segments};
use histeg::jpeg::scan::{self, ComponentCoefficients, BLOCK_SIZE};

/// Standard luminance quantization table (ITU T.81 Annex K, Table K.1).
const QUANT_LUMA: [u8; 64] = [
    16, 11, 10, 16, 24, 40, 51, 61, //
    12, 12, 14, 19, 26, 58, 60, 55, //
    14, 13, 16, 24, 40, 57, 69, 56, //
    14, 17, 22, 29, 51, 87, 80, 62, //
    18, 22, 37, 56, 68, 109, 103, 77, //
    24, 35, 55, 64, 81, 104, 113, 92, //
    49, 64, 78, 87, 103, 121, 120, 101, //
    72, 92, 95, 98, 112, 100, 103, 99,
];

/// Standard chrominance quantization table (Table K.2).
const QUANT_CHROMA: [u8; 64] = [
    17, 18, 24, 47, 99, 99, 99, 99, //
    18, 21, 26, 66, 99, 99, 99, 99, //
    24, 26, 56, 99, 99, 99, 99, 99, //
    47, 66, 99, 99, 99, 99, 99, 99, //
    99, 99, 99, 99, 99, 99, 99, 99, //
    99, 99, 99, 99, 99, 99, 99, 99, //
    99, 99, 99, 99, 99, 99, 99, 99, //
    99, 99, 99, 99, 99, 99, 99, 99,
];

const AC_LUMA_SYMBOLS: [u8; 162] = [
    0x01, 0x02, 0x03, 0x00, 0x04, 0x11, 0x05, 0x12, //
    0x21, 0x31, 0x41, 0x06, 0x13, 0x51, 0x61, 0x07, //
    0x22, 0x71, 0x14, 0x32, 0x81, 0x91, 0xa1, 0x08, //
    0x23, 0x42, 0xb1, 0xc1, 0x15, 0x52, 0xd1, 0xf0, //
    0x24, 0x33, 0x62, 0x72, 0x82, 0x09, 0x0a, 0x16, //
    0x17, 0x18, 0x19, 0x1a, 0x25, 0x26, 0x27, 0x28, //
    0x29, 0x2a, 0x34, 0x35, 0x36, 0x37, 0x38, 0x39, //
    0x3a, 0x43, 0x44, 0x45, 0x46, 0x47, 0x48, 0x49, //
    0x4a, 0x53, 0x54, 0x55, 0x56, 0x57, 0x58, 0x59, //
    0x5a, 0x63, 0x64, 0x65, 0x66, 0x67, 0x68, 0x69, //
    0x6a, 0x73, 0x74, 0x75, 0x76, 0x77, 0x78, 0x79, //
    0x7a, 0x83, 0x84, 0x85, 0x86, 0x87, 0x88, 0x89, //
    0x8a, 0x92, 0x93, 0x94, 0x95, 0x96, 0x97, 0x98, //
    0x99, 0x9a, 0xa2, 0xa3, 0xa4, 0xa5, 0xa6, 0xa7, //
    0xa8, 0xa9, 0xaa, 0xb2, 0xb3, 0xb4, 0xb5, 0xb6, //
    0xb7, 0xb8, 0xb9, 0xba, 0xc2, 0xc3, 0xc4, 0xc5, //
    0xc6, 0xc7, 0xc8, 0xc9, 0xca, 0xd2, 0xd3, 0xd4, //
    0xd5, 0xd6, 0xd7, 0xd8, 0xd9, 0xda, 0xe1, 0xe2, //
    0xe3, 0xe4, 0xe5, 0xe6, 0xe7, 0xe8, 0xe9, 0xea, //
    0xf1, 0xf2, 0xf3, 0xf4, 0xf5, 0xf6, 0xf7, 0xf8, //
    0xf9, 0xfa,
];

const AC_CHROMA_SYMBOLS: [u8; 162] = [
    0x00, 0x01, 0x02, 0x03, 0x11, 0x04, 0x05, 0x21, //
    0x31, 0x06, 0x12, 0x41, 0x51, 0x07, 0x61, 0x71, //
    0x13, 0x22, 0x32, 0x81, 0x08, 0x14, 0x42, 0x91, //
    0xa1, 0xb1, 0xc1, 0x09, 0x23, 0x33, 0x52, 0xf0, //
    0x15, 0x62, 0x72, 0xd1, 0x0a, 0x16, 0x24, 0x34, //
    0xe1, 0x25, 0xf1, 0x17, 0x18, 0x19, 0x1a, 0x26, //
    0x27, 0x28, 0x29, 0x2a, 0x35, 0x36, 0x37, 0x38, //
    0x39, 0x3a, 0x43, 0x44, 0x45, 0x46, 0x47, 0x48, //
    0x49, 0x4a, 0x53, 0x54, 0x55, 0x56, 0x57, 0x58, //
    0x59, 0x5a, 0x63, 0x64, 0x65, 0x66, 0x67, 0x68, //
    0x69, 0x6a, 0x73, 0x74, 0x75, 0x76, 0x77, 0x78, //
    0x79, 0x7a, 0x82, 0x83, 0x84, 0x85, 0x86, 0x87, //
    0x88, 0x89, 0x8a, 0x92, 0x93, 0x94, 0x95, 0x96, //
    0x97, 0x98, 0x99, 0x9a, 0xa2, 0xa3, 0xa4, 0xa5, //
    0xa6, 0xa7, 0xa8, 0xa9, 0xaa, 0xb2, 0xb3, 0xb4, //
    0xb5, 0xb6, 0xb7, 0xb8, 0xb9, 0xba, 0xc2, 0xc3, //
    0xc4, 0xc5, 0xc6, 0xc7, 0xc8, 0xc9, 0xca, 0xd2, //
    0xd3, 0xd4, 0xd5, 0xd6, 0xd7, 0xd8, 0xd9, 0xda, //
    0xe2, 0xe3, 0xe4, 0xe5, 0xe6, 0xe7, 0xe8, 0xe9, //
    0xea, 0xf2, 0xf3, 0xf4, 0xf5, 0xf6, 0xf7, 0xf8, //
    0xf9, 0xfa,
];

fn dc_luma_spec() -> HuffmanSpec {
    HuffmanSpec {
        class: 0,
        id: 0,
        counts: [0, 1, 5, 1, 1, 1, 1, 1, 1, 0, 0, 0, 0, 0, 0, 0],
        symbols: (0..12).collect(),
    }
}

fn ac_luma_spec() -> HuffmanSpec {
    HuffmanSpec {
        class: 1,
        id: 0,
        counts: [0, 2, 1, 3, 3, 2, 4, 3, 5, 5, 4, 4, 0, 0, 1, 0x7d],
        symbols: AC_LUMA_SYMBOLS.to_vec(),
    }
}

fn dc_chroma_spec() -> HuffmanSpec {
    HuffmanSpec {
        class: 0,
        id: 1,
        counts: [0, 3, 1, 1, 1, 1, 1, 1, 1, 1, 1, 0, 0, 0, 0, 0],
        symbols: (0..12).collect(),
    }
}

fn ac_chroma_spec() -> HuffmanSpec {
    HuffmanSpec {
        class: 1,
        id: 1,
        counts: [0, 2, 1, 2, 4, 4, 3, 4, 7, 5, 4, 4, 0, 1, 2, 0x77],
        symbols: AC_CHROMA_SYMBOLS.to_vec(),
    }
}

fn quant_table(id: u8, values: &[u8; 64]) -> QuantTable {
    let mut table = QuantTable {
        id,
        precision: 0,
        values: [0u16; 64],
    };
    for (dst, &src) in table.values.iter_mut().zip(values) {
        *dst = src as u16;
    }
    table
}

/// Fill a component grid with a photographic-looking coefficient mix:
/// mostly zero AC values, some too small to pair, some usable carriers.
fn fill_blocks(rng: &mut fastrand::Rng, component: &mut ComponentCoefficients) {
    for block in component.data.chunks_mut(BLOCK_SIZE) {
        block[0] = rng.i16(-80..=80);
        for cell in &mut block[1..] {
            *cell = match rng.u8(..10) {
                0..=5 => 0,
                6 | 7 => rng.i16(-2..=2),
                _ => {
                    let magnitude = rng.i16(3..=30);
                    if rng.bool() {
                        magnitude
                    } else {
                        -magnitude
                    }
                }
            };
        }
    }
}

fn push_segment(out: &mut Vec<u8>, marker: u8, payload: &[u8]) {
    out.extend_from_slice(&[0xFF, marker]);
    out.extend_from_slice(&((payload.len() + 2) as u16).to_be_bytes());
    out.extend_from_slice(payload);
}

fn dht_payload(spec: &HuffmanSpec) -> Vec<u8> {
    let mut payload = vec![(spec.class << 4) | spec.id];
    payload.extend_from_slice(&spec.counts);
    payload.extend_from_slice(&spec.symbols);
    payload
}

fn dqt_payload(table: &QuantTable) -> Vec<u8> {
    let mut payload = vec![table.id];
    payload.extend(table.values.iter().map(|&v| v as u8));
    payload
}

fn sof_payload(frame: &Frame) -> Vec<u8> {
    let mut payload = vec![frame.precision];
    payload.extend_from_slice(&frame.height.to_be_bytes());
    payload.extend_from_slice(&frame.width.to_be_bytes());
    payload.push(frame.components.len() as u8);
    for c in &frame.components {
        payload.push(c.id);
        payload.push((c.h_sampling << 4) | c.v_sampling);
        payload.push(c.quant_id);
    }
    payload
}

fn sos_payload(frame: &Frame) -> Vec<u8> {
    let mut payload = vec![frame.components.len() as u8];
    for c in &frame.components {
        payload.push(c.id);
        payload.push((c.dc_id << 4) | c.ac_id);
    }
    payload.extend_from_slice(&[0, 63, 0]);
    payload
}

fn build_cover(frame: Frame, segments: Segments, interval: u16, seed: u64) -> Vec<u8> {
    // per-component grids with MCU-padded dimensions, matching the decoder
    let (mcu_cols, mcu_rows, sampling): (usize, usize, Vec<(usize, usize)>) =
        if frame.components.len() == 1 {
            (
                (frame.width as usize).div_ceil(8),
                (frame.height as usize).div_ceil(8),
                vec![(1, 1)],
            )
        } else {
            let h_max = frame.components.iter().map(|c| c.h_sampling).max().unwrap() as usize;
            let v_max = frame.components.iter().map(|c| c.v_sampling).max().unwrap() as usize;
            (
                (frame.width as usize).div_ceil(8 * h_max),
                (frame.height as usize).div_ceil(8 * v_max),
                frame
                    .components
                    .iter()
                    .map(|c| (c.h_sampling as usize, c.v_sampling as usize))
                    .collect(),
            )
        };

    let mut rng = fastrand::Rng::with_seed(seed);
    let components: Vec<ComponentCoefficients> = sampling
        .iter()
        .map(|&(h, v)| {
            let blocks_wide = mcu_cols * h;
            let blocks_tall = mcu_rows * v;
            let mut component = ComponentCoefficients {
                blocks_wide,
                blocks_tall,
                data: vec![0i16; blocks_wide * blocks_tall * BLOCK_SIZE],
            };
            fill_blocks(&mut rng, &mut component);
            component
        })
        .collect();

    let scan_data = scan::encode(&components, &segments).expect("synthetic scan must encode");

    let mut out = vec![0xFF, 0xD8];
    for table in segments.quant_tables.iter().flatten() {
        push_segment(&mut out, 0xDB, &dqt_payload(table));
    }
    push_segment(&mut out, 0xC0, &sof_payload(&frame));
    for spec in segments.dc_tables.iter().flatten() {
        push_segment(&mut out, 0xC4, &dht_payload(spec));
    }
    for spec in segments.ac_tables.iter().flatten() {
        push_segment(&mut out, 0xC4, &dht_payload(spec));
    }
    if interval > 0 {
        push_segment(&mut out, 0xDD, &interval.to_be_bytes());
    }
    push_segment(&mut out, 0xDA, &sos_payload(&frame));
    out.extend_from_slice(&scan_data);
    out.extend_from_slice(&[0xFF, 0xD9]);
    out
}

fn gray_frame(blocks_wide: usize, blocks_tall: usize) -> Frame {
    Frame {
        precision: 8,
        width: (blocks_wide * 8) as u16,
        height: (blocks_tall * 8) as u16,
        components: vec![Component {
            id: 1,
            h_sampling: 1,
            v_sampling: 1,
            quant_id: 0,
            dc_id: 0,
            ac_id: 0,
        }],
    }
}

fn gray_segments(frame: &Frame, interval: u16) -> Segments {
    Segments {
        headers: Vec::new(),
        quant_tables: [Some(quant_table(0, &QUANT_LUMA)), None, None, None],
        dc_tables: [Some(dc_luma_spec()), None, None, None],
        ac_tables: [Some(ac_luma_spec()), None, None, None],
        frame: frame.clone(),
        restart_interval: interval,
        scan_data: Vec::new(),
    }
}

/// A deterministic grayscale baseline cover of the given block geometry.
pub fn gray_cover(blocks_wide: usize, blocks_tall: usize, seed: u64) -> Vec<u8> {
    let frame = gray_frame(blocks_wide, blocks_tall);
    let segments = gray_segments(&frame, 0);
    build_cover(frame, segments, 0, seed)
}

/// Grayscale cover carrying a DRI segment and restart markers.
pub fn gray_cover_restart(
    blocks_wide: usize,
    blocks_tall: usize,
    seed: u64,
    interval: u16,
) -> Vec<u8> {
    let frame = gray_frame(blocks_wide, blocks_tall);
    let segments = gray_segments(&frame, interval);
    build_cover(frame, segments, interval, seed)
}

/// A 4:2:0 YCbCr cover: interleaved MCUs of four luma blocks plus one
/// block per chroma component.
pub fn ycbcr_cover_420(mcu_cols: usize, mcu_rows: usize, seed: u64) -> Vec<u8> {
    let frame = Frame {
        precision: 8,
        width: (mcu_cols * 16) as u16,
        height: (mcu_rows * 16) as u16,
        components: vec![
            Component {
                id: 1,
                h_sampling: 2,
                v_sampling: 2,
                quant_id: 0,
                dc_id: 0,
                ac_id: 0,
            },
            Component {
                id: 2,
                h_sampling: 1,
                v_sampling: 1,
                quant_id: 1,
                dc_id: 1,
                ac_id: 1,
            },
            Component {
                id: 3,
                h_sampling: 1,
                v_sampling: 1,
                quant_id: 1,
                dc_id: 1,
                ac_id: 1,
            },
        ],
    };
    let segments = Segments {
        headers: Vec::new(),
        quant_tables: [
            Some(quant_table(0, &QUANT_LUMA)),
            Some(quant_table(1, &QUANT_CHROMA)),
            None,
            None,
        ],
        dc_tables: [Some(dc_luma_spec()), Some(dc_chroma_spec()), None, None],
        ac_tables: [Some(ac_luma_spec()), Some(ac_chroma_spec()), None, None],
        frame: frame.clone(),
        restart_interval: 0,
        scan_data: Vec::new(),
    };
    build_cover(frame, segments, 0, seed)
}
