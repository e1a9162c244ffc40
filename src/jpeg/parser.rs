//! JPEG header parsing.
//!
//! Splits a JPEG byte stream into the pieces the transcoder needs:
//! quantization tables (DQT), Huffman table specs (DHT), frame layout (SOF),
//! restart interval (DRI), the SOS component selectors, and the raw
//! entropy-coded scan bytes. All other segments are preserved verbatim so
//! the writer can reassemble the file around a new scan.
//!
//! Adapted from [jpeg-decoder](https://github.com/image-rs/jpeg-decoder).

use super::marker::Marker;
use crate::error::{HistegError, Result};

fn malformed(reason: impl Into<String>) -> HistegError {
    HistegError::DecodeFailed {
        reason: reason.into(),
    }
}

/// A quantization table as stored in the file (zigzag order).
#[derive(Debug, Clone)]
pub struct QuantTable {
    /// Table ID (0-3).
    pub id: u8,
    /// 0 = 8-bit entries, 1 = 16-bit entries.
    pub precision: u8,
    /// Entries in zigzag order.
    pub values: [u16; 64],
}

/// An undecoded Huffman table: code-length counts plus symbol list.
#[derive(Debug, Clone)]
pub struct HuffmanSpec {
    /// 0 = DC, 1 = AC.
    pub class: u8,
    /// Table ID (0-3).
    pub id: u8,
    /// Number of codes of each length 1-16.
    pub counts: [u8; 16],
    /// Symbols in code order.
    pub symbols: Vec<u8>,
}

/// One image component as declared by SOF and refined by SOS.
#[derive(Debug, Clone)]
pub struct Component {
    pub id: u8,
    pub h_sampling: u8,
    pub v_sampling: u8,
    pub quant_id: u8,
    /// DC Huffman table ID, assigned during SOS parsing.
    pub dc_id: u8,
    /// AC Huffman table ID, assigned during SOS parsing.
    pub ac_id: u8,
}

/// Frame geometry from the SOF marker.
#[derive(Debug, Clone)]
pub struct Frame {
    pub precision: u8,
    pub width: u16,
    pub height: u16,
    pub components: Vec<Component>,
}

/// A header segment preserved for reassembly.
#[derive(Debug, Clone)]
pub struct RawSegment {
    pub marker: Marker,
    pub data: Vec<u8>,
}

/// Everything extracted from a cover JPEG.
#[derive(Debug, Clone)]
pub struct Segments {
    /// All header segments between SOI and SOS, in file order.
    pub headers: Vec<RawSegment>,
    /// Quantization tables by ID.
    pub quant_tables: [Option<QuantTable>; 4],
    /// DC Huffman specs by ID.
    pub dc_tables: [Option<HuffmanSpec>; 4],
    /// AC Huffman specs by ID.
    pub ac_tables: [Option<HuffmanSpec>; 4],
    /// Frame layout.
    pub frame: Frame,
    /// Restart interval in MCUs, 0 if unset.
    pub restart_interval: u16,
    /// Entropy-coded scan bytes, byte stuffing and restart markers included.
    pub scan_data: Vec<u8>,
}

/// Parse a complete JPEG byte buffer up to and including its scan data.
pub fn parse(data: &[u8]) -> Result<Segments> {
    if data.len() < 2 || data[0] != 0xFF || data[1] != Marker::Soi.code() {
        return Err(malformed("missing SOI marker"));
    }
    let mut pos = 2;

    let mut headers = Vec::new();
    let mut quant_tables: [Option<QuantTable>; 4] = [None, None, None, None];
    let mut dc_tables: [Option<HuffmanSpec>; 4] = [None, None, None, None];
    let mut ac_tables: [Option<HuffmanSpec>; 4] = [None, None, None, None];
    let mut frame: Option<Frame> = None;
    let mut restart_interval = 0u16;

    loop {
        let marker = next_marker(data, &mut pos)?;

        match marker {
            Marker::Eoi => return Err(malformed("no scan data before EOI")),

            Marker::Sos => {
                let payload = read_payload(data, &mut pos)?;
                let frame = frame.ok_or_else(|| malformed("SOS before SOF"))?;
                let frame = apply_sos(payload, frame)?;
                let scan_data = read_scan_data(data, &mut pos);
                return Ok(Segments {
                    headers,
                    quant_tables,
                    dc_tables,
                    ac_tables,
                    frame,
                    restart_interval,
                    scan_data,
                });
            }

            Marker::Dqt => {
                let payload = read_payload(data, &mut pos)?;
                parse_dqt(payload, &mut quant_tables)?;
                headers.push(RawSegment {
                    marker,
                    data: payload.to_vec(),
                });
            }

            Marker::Dht => {
                let payload = read_payload(data, &mut pos)?;
                parse_dht(payload, &mut dc_tables, &mut ac_tables)?;
                headers.push(RawSegment {
                    marker,
                    data: payload.to_vec(),
                });
            }

            Marker::Sof(sof_type) => {
                let payload = read_payload(data, &mut pos)?;
                frame = Some(parse_sof(sof_type, payload)?);
                headers.push(RawSegment {
                    marker,
                    data: payload.to_vec(),
                });
            }

            Marker::Dri => {
                let payload = read_payload(data, &mut pos)?;
                if payload.len() < 2 {
                    return Err(malformed("DRI segment too short"));
                }
                restart_interval = u16::from_be_bytes([payload[0], payload[1]]);
                headers.push(RawSegment {
                    marker,
                    data: payload.to_vec(),
                });
            }

            _ if marker.has_payload() => {
                // APP, COM and anything unrecognized: keep verbatim
                let payload = read_payload(data, &mut pos)?;
                headers.push(RawSegment {
                    marker,
                    data: payload.to_vec(),
                });
            }

            // standalone markers are not expected before SOS
            _ => {}
        }
    }
}

/// Advance to the next marker, skipping fill bytes.
fn next_marker(data: &[u8], pos: &mut usize) -> Result<Marker> {
    while *pos < data.len() && data[*pos] != 0xFF {
        *pos += 1;
    }
    while *pos < data.len() && data[*pos] == 0xFF {
        *pos += 1;
    }
    if *pos >= data.len() {
        return Err(malformed("unexpected end of data while scanning for a marker"));
    }
    let code = data[*pos];
    *pos += 1;
    Marker::from_code(code).ok_or_else(|| malformed(format!("invalid marker byte {code:#04x}")))
}

/// Read a length-prefixed segment payload.
fn read_payload<'a>(data: &'a [u8], pos: &mut usize) -> Result<&'a [u8]> {
    if *pos + 2 > data.len() {
        return Err(malformed("truncated segment length"));
    }
    let length = u16::from_be_bytes([data[*pos], data[*pos + 1]]) as usize;
    if length < 2 {
        return Err(malformed("segment length smaller than its own field"));
    }
    let start = *pos + 2;
    let end = *pos + length;
    if end > data.len() {
        return Err(malformed("truncated segment payload"));
    }
    *pos = end;
    Ok(&data[start..end])
}

/// Copy entropy-coded bytes until a non-RST marker ends the scan.
///
/// Byte stuffing (`FF 00`) and restart markers stay in the output; the
/// scan decoder handles both.
fn read_scan_data(data: &[u8], pos: &mut usize) -> Vec<u8> {
    let mut out = Vec::new();
    while *pos < data.len() {
        let byte = data[*pos];
        if byte != 0xFF {
            out.push(byte);
            *pos += 1;
            continue;
        }
        match data.get(*pos + 1) {
            Some(0x00) => {
                out.extend_from_slice(&[0xFF, 0x00]);
                *pos += 2;
            }
            Some(&code @ 0xD0..=0xD7) => {
                out.extend_from_slice(&[0xFF, code]);
                *pos += 2;
            }
            Some(0xFF) => {
                // fill byte
                *pos += 1;
            }
            _ => break,
        }
    }
    out
}

fn parse_dqt(payload: &[u8], tables: &mut [Option<QuantTable>; 4]) -> Result<()> {
    let mut pos = 0;
    while pos < payload.len() {
        let pq_tq = payload[pos];
        let precision = pq_tq >> 4;
        let id = pq_tq & 0x0F;
        pos += 1;
        if precision > 1 || id > 3 {
            return Err(malformed(format!(
                "invalid quantization table header {pq_tq:#04x}"
            )));
        }

        let entry_len = if precision == 0 { 1 } else { 2 };
        if pos + 64 * entry_len > payload.len() {
            return Err(malformed("DQT segment too short"));
        }
        let mut values = [0u16; 64];
        for value in values.iter_mut() {
            *value = if precision == 0 {
                payload[pos] as u16
            } else {
                u16::from_be_bytes([payload[pos], payload[pos + 1]])
            };
            pos += entry_len;
        }

        tables[id as usize] = Some(QuantTable {
            id,
            precision,
            values,
        });
    }
    Ok(())
}

fn parse_dht(
    payload: &[u8],
    dc_tables: &mut [Option<HuffmanSpec>; 4],
    ac_tables: &mut [Option<HuffmanSpec>; 4],
) -> Result<()> {
    let mut pos = 0;
    while pos < payload.len() {
        let tc_th = payload[pos];
        let class = tc_th >> 4;
        let id = tc_th & 0x0F;
        pos += 1;
        if class > 1 || id > 3 {
            return Err(malformed(format!("invalid Huffman table header {tc_th:#04x}")));
        }

        if pos + 16 > payload.len() {
            return Err(malformed("DHT segment too short for code counts"));
        }
        let mut counts = [0u8; 16];
        counts.copy_from_slice(&payload[pos..pos + 16]);
        pos += 16;

        let total: usize = counts.iter().map(|&n| n as usize).sum();
        if pos + total > payload.len() {
            return Err(malformed("DHT segment too short for symbols"));
        }
        let symbols = payload[pos..pos + total].to_vec();
        pos += total;

        let spec = HuffmanSpec {
            class,
            id,
            counts,
            symbols,
        };
        if class == 0 {
            dc_tables[id as usize] = Some(spec);
        } else {
            ac_tables[id as usize] = Some(spec);
        }
    }
    Ok(())
}

fn parse_sof(sof_type: u8, payload: &[u8]) -> Result<Frame> {
    match sof_type {
        0 | 1 => {}
        2 => return Err(malformed("progressive JPEG is not supported")),
        other => {
            return Err(malformed(format!(
                "unsupported SOF type {other} (only Huffman sequential)"
            )))
        }
    }
    if payload.len() < 6 {
        return Err(malformed("SOF segment too short"));
    }

    let precision = payload[0];
    if precision != 8 {
        return Err(malformed(format!("unsupported sample precision {precision}")));
    }
    let height = u16::from_be_bytes([payload[1], payload[2]]);
    let width = u16::from_be_bytes([payload[3], payload[4]]);
    if width == 0 || height == 0 {
        return Err(malformed("zero image dimension"));
    }
    let num_components = payload[5] as usize;
    if num_components == 0 || payload.len() < 6 + num_components * 3 {
        return Err(malformed("SOF segment too short for its components"));
    }

    let mut components = Vec::with_capacity(num_components);
    for chunk in payload[6..6 + num_components * 3].chunks_exact(3) {
        let sampling = chunk[1];
        let h_sampling = sampling >> 4;
        let v_sampling = sampling & 0x0F;
        if !(1..=4).contains(&h_sampling) || !(1..=4).contains(&v_sampling) {
            return Err(malformed(format!("invalid sampling factors {sampling:#04x}")));
        }
        components.push(Component {
            id: chunk[0],
            h_sampling,
            v_sampling,
            quant_id: chunk[2],
            dc_id: 0,
            ac_id: 0,
        });
    }

    Ok(Frame {
        precision,
        width,
        height,
        components,
    })
}

/// Fold the SOS component selectors into the frame.
fn apply_sos(payload: &[u8], mut frame: Frame) -> Result<Frame> {
    if payload.is_empty() {
        return Err(malformed("empty SOS header"));
    }
    let num_components = payload[0] as usize;
    if payload.len() < 1 + num_components * 2 + 3 {
        return Err(malformed("SOS header too short"));
    }
    if num_components != frame.components.len() {
        return Err(malformed(
            "scan does not cover all frame components in one pass",
        ));
    }

    for chunk in payload[1..1 + num_components * 2].chunks_exact(2) {
        let component = frame
            .components
            .iter_mut()
            .find(|c| c.id == chunk[0])
            .ok_or_else(|| malformed(format!("SOS references unknown component {}", chunk[0])))?;
        component.dc_id = chunk[1] >> 4;
        component.ac_id = chunk[1] & 0x0F;
    }
    Ok(frame)
}
