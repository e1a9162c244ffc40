//! Scan transcoding: entropy-coded bytes to coefficient grids and back.
//!
//! Decoding stops at the coefficient level; there is no dequantization and
//! no inverse DCT. Each component gets its own block grid so the embedder can walk
//! coefficients component by component, independent of the MCU interleaving
//! used on the wire. Encoding is the exact inverse, reusing the cover's
//! Huffman tables and restart interval.

use super::huffman::{magnitude, BitReader, BitWriter, DecodeTable, EncodeTable};
use super::parser::{Frame, Segments};
use crate::error::{HistegError, Result};

/// Coefficients of an 8x8 block, zigzag order.
pub const BLOCK_SIZE: usize = 64;

/// The quantized DCT coefficients of one image component.
#[derive(Debug, Clone)]
pub struct ComponentCoefficients {
    /// Blocks per row, rounded up to full MCU coverage.
    pub blocks_wide: usize,
    /// Block rows, rounded up to full MCU coverage.
    pub blocks_tall: usize,
    /// Blocks row-major; [`BLOCK_SIZE`] values per block, zigzag within.
    pub data: Vec<i16>,
}

impl ComponentCoefficients {
    fn new(blocks_wide: usize, blocks_tall: usize) -> Self {
        ComponentCoefficients {
            blocks_wide,
            blocks_tall,
            data: vec![0i16; blocks_wide * blocks_tall * BLOCK_SIZE],
        }
    }

    #[inline]
    fn block_mut(&mut self, row: usize, col: usize) -> &mut [i16] {
        let start = (row * self.blocks_wide + col) * BLOCK_SIZE;
        &mut self.data[start..start + BLOCK_SIZE]
    }

    #[inline]
    fn block(&self, row: usize, col: usize) -> &[i16] {
        let start = (row * self.blocks_wide + col) * BLOCK_SIZE;
        &self.data[start..start + BLOCK_SIZE]
    }
}

/// MCU geometry shared by decode and encode.
struct McuGrid {
    cols: usize,
    rows: usize,
    /// Per component: blocks per MCU horizontally and vertically.
    sampling: Vec<(usize, usize)>,
}

impl McuGrid {
    fn of(frame: &Frame) -> Self {
        // A single-component scan is never interleaved: the MCU is one
        // block and declared sampling factors do not apply.
        if frame.components.len() == 1 {
            return McuGrid {
                cols: (frame.width as usize).div_ceil(8),
                rows: (frame.height as usize).div_ceil(8),
                sampling: vec![(1, 1)],
            };
        }

        let h_max = frame
            .components
            .iter()
            .map(|c| c.h_sampling as usize)
            .max()
            .unwrap_or(1);
        let v_max = frame
            .components
            .iter()
            .map(|c| c.v_sampling as usize)
            .max()
            .unwrap_or(1);
        McuGrid {
            cols: (frame.width as usize).div_ceil(8 * h_max),
            rows: (frame.height as usize).div_ceil(8 * v_max),
            sampling: frame
                .components
                .iter()
                .map(|c| (c.h_sampling as usize, c.v_sampling as usize))
                .collect(),
        }
    }
}

fn missing_table(class: &str, id: u8) -> HistegError {
    HistegError::DecodeFailed {
        reason: format!("missing {class} Huffman table {id}"),
    }
}

/// Decode the scan into one coefficient grid per component.
pub fn decode(segments: &Segments) -> Result<Vec<ComponentCoefficients>> {
    let frame = &segments.frame;
    let grid = McuGrid::of(frame);

    let mut dc_tables: Vec<DecodeTable> = Vec::with_capacity(frame.components.len());
    let mut ac_tables: Vec<DecodeTable> = Vec::with_capacity(frame.components.len());
    for component in &frame.components {
        let dc = segments.dc_tables[component.dc_id as usize]
            .as_ref()
            .ok_or_else(|| missing_table("DC", component.dc_id))?;
        let ac = segments.ac_tables[component.ac_id as usize]
            .as_ref()
            .ok_or_else(|| missing_table("AC", component.ac_id))?;
        dc_tables.push(DecodeTable::build(dc)?);
        ac_tables.push(DecodeTable::build(ac)?);
    }

    let mut components: Vec<ComponentCoefficients> = grid
        .sampling
        .iter()
        .map(|&(h, v)| ComponentCoefficients::new(grid.cols * h, grid.rows * v))
        .collect();

    let mut reader = BitReader::new(&segments.scan_data);
    let mut predictors = vec![0i16; frame.components.len()];
    let interval = segments.restart_interval as usize;
    let mut mcus_done = 0usize;

    for mcu_row in 0..grid.rows {
        for mcu_col in 0..grid.cols {
            if interval > 0 && mcus_done > 0 && mcus_done % interval == 0 {
                reader.restart()?;
                predictors.fill(0);
            }

            for (ci, &(h, v)) in grid.sampling.iter().enumerate() {
                for by in 0..v {
                    for bx in 0..h {
                        let block =
                            components[ci].block_mut(mcu_row * v + by, mcu_col * h + bx);
                        decode_block(
                            &mut reader,
                            block,
                            &dc_tables[ci],
                            &ac_tables[ci],
                            &mut predictors[ci],
                        )?;
                    }
                }
            }
            mcus_done += 1;
        }
    }

    Ok(components)
}

/// Re-encode coefficient grids into scan bytes using the cover's tables.
pub fn encode(components: &[ComponentCoefficients], segments: &Segments) -> Result<Vec<u8>> {
    let frame = &segments.frame;
    let grid = McuGrid::of(frame);

    let mut dc_tables: Vec<EncodeTable> = Vec::with_capacity(frame.components.len());
    let mut ac_tables: Vec<EncodeTable> = Vec::with_capacity(frame.components.len());
    for component in &frame.components {
        let dc = segments.dc_tables[component.dc_id as usize]
            .as_ref()
            .ok_or_else(|| missing_table("DC", component.dc_id))?;
        let ac = segments.ac_tables[component.ac_id as usize]
            .as_ref()
            .ok_or_else(|| missing_table("AC", component.ac_id))?;
        dc_tables.push(EncodeTable::build(dc)?);
        ac_tables.push(EncodeTable::build(ac)?);
    }

    let mut writer = BitWriter::with_capacity(segments.scan_data.len());
    let mut predictors = vec![0i16; frame.components.len()];
    let interval = segments.restart_interval as usize;
    let mut mcus_done = 0usize;
    let mut restart_index = 0u8;

    for mcu_row in 0..grid.rows {
        for mcu_col in 0..grid.cols {
            if interval > 0 && mcus_done > 0 && mcus_done % interval == 0 {
                writer.restart(restart_index);
                restart_index = restart_index.wrapping_add(1);
                predictors.fill(0);
            }

            for (ci, &(h, v)) in grid.sampling.iter().enumerate() {
                for by in 0..v {
                    for bx in 0..h {
                        let block = components[ci].block(mcu_row * v + by, mcu_col * h + bx);
                        encode_block(
                            &mut writer,
                            block,
                            &dc_tables[ci],
                            &ac_tables[ci],
                            &mut predictors[ci],
                        )?;
                    }
                }
            }
            mcus_done += 1;
        }
    }

    let scan = writer.finish();
    log::debug!(
        "re-encoded scan: {} MCUs, {} -> {} bytes",
        mcus_done,
        segments.scan_data.len(),
        scan.len()
    );
    Ok(scan)
}

fn decode_block(
    reader: &mut BitReader<'_>,
    block: &mut [i16],
    dc_table: &DecodeTable,
    ac_table: &DecodeTable,
    predictor: &mut i16,
) -> Result<()> {
    block.fill(0);

    let dc_size = reader.decode_symbol(dc_table)?;
    if dc_size > 11 {
        return Err(HistegError::DecodeFailed {
            reason: format!("invalid DC magnitude category {dc_size}"),
        });
    }
    let diff = reader.receive_extend(dc_size)?;
    *predictor = predictor.wrapping_add(diff);
    block[0] = *predictor;

    let mut k = 1;
    while k < BLOCK_SIZE {
        let symbol = reader.decode_symbol(ac_table)?;
        let run = (symbol >> 4) as usize;
        let size = symbol & 0x0F;

        if size == 0 {
            match run {
                0 => break,        // EOB
                0x0F => k += 16,   // ZRL
                _ => {
                    return Err(HistegError::DecodeFailed {
                        reason: format!("invalid AC run/size symbol {symbol:#04x}"),
                    })
                }
            }
        } else {
            k += run;
            if k >= BLOCK_SIZE {
                return Err(HistegError::DecodeFailed {
                    reason: "AC coefficient index out of range".into(),
                });
            }
            block[k] = reader.receive_extend(size)?;
            k += 1;
        }
    }

    Ok(())
}

fn encode_block(
    writer: &mut BitWriter,
    block: &[i16],
    dc_table: &EncodeTable,
    ac_table: &EncodeTable,
    predictor: &mut i16,
) -> Result<()> {
    let diff = block[0].wrapping_sub(*predictor);
    *predictor = block[0];

    let (dc_size, dc_bits) = magnitude(diff);
    writer.write_symbol(dc_size, dc_table)?;
    if dc_size > 0 {
        writer.write_bits(dc_bits, dc_size);
    }

    let mut zero_run = 0usize;
    for &coef in &block[1..] {
        if coef == 0 {
            zero_run += 1;
            continue;
        }
        while zero_run >= 16 {
            writer.write_symbol(0xF0, ac_table)?; // ZRL
            zero_run -= 16;
        }
        let (size, bits) = magnitude(coef);
        writer.write_symbol(((zero_run as u8) << 4) | size, ac_table)?;
        writer.write_bits(bits, size);
        zero_run = 0;
    }
    if zero_run > 0 {
        writer.write_symbol(0x00, ac_table)?; // EOB
    }

    Ok(())
}
