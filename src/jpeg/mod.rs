//! Baseline JPEG coefficient transcoding.
//!
//! The embedder needs exactly two things from the JPEG layer: mutable access
//! to every quantized DCT coefficient of the cover in a deterministic order,
//! and re-emission of a JPEG bitstream that carries the mutated coefficients
//! with the cover's quantization tables, Huffman tables, component layout and
//! colorspace. [`CoverImage`] provides both; no pixel-domain processing ever
//! happens.
//!
//! ```text
//! bytes → parse → huffman decode → [i16] grids → embed → huffman encode → bytes
//! ```

pub mod huffman;
pub mod marker;
pub mod parser;
pub mod scan;

use crate::error::Result;
use marker::Marker;
use parser::Segments;
pub use parser::{Component, Frame, HuffmanSpec, QuantTable, RawSegment};
pub use scan::{ComponentCoefficients, BLOCK_SIZE};

/// A decoded cover image: parsed headers plus per-component coefficient
/// grids.
///
/// All three embedding passes walk [`CoverImage::coefficients`] (or the
/// mutable variant) in the same canonical order: components in scan order,
/// blocks row-major within each component, the 64 zigzag positions within
/// each block. Running counters in the embedder depend on every pass seeing
/// the identical sequence.
#[derive(Debug, Clone)]
pub struct CoverImage {
    segments: Segments,
    components: Vec<ComponentCoefficients>,
}

impl CoverImage {
    /// Parse a JPEG byte buffer down to its quantized coefficients.
    pub fn decode(data: &[u8]) -> Result<Self> {
        let segments = parser::parse(data)?;
        let components = scan::decode(&segments)?;
        log::debug!(
            "decoded cover: {}x{}, {} components, {} coefficients",
            segments.frame.width,
            segments.frame.height,
            components.len(),
            components.iter().map(|c| c.data.len()).sum::<usize>(),
        );
        Ok(CoverImage {
            segments,
            components,
        })
    }

    /// Frame geometry of the cover.
    pub fn frame(&self) -> &Frame {
        &self.segments.frame
    }

    /// Total number of quantized coefficients, dummy blocks included.
    pub fn coefficient_count(&self) -> usize {
        self.components.iter().map(|c| c.data.len()).sum()
    }

    /// Every coefficient in canonical order.
    pub fn coefficients(&self) -> impl Iterator<Item = &i16> {
        self.components.iter().flat_map(|c| c.data.iter())
    }

    /// Every coefficient in canonical order, mutable.
    pub fn coefficients_mut(&mut self) -> impl Iterator<Item = &mut i16> {
        self.components.iter_mut().flat_map(|c| c.data.iter_mut())
    }

    /// Per-component coefficient grids.
    pub fn component_coefficients(&self) -> &[ComponentCoefficients] {
        &self.components
    }

    /// Re-emit a JPEG bitstream carrying the current coefficients.
    ///
    /// Every header segment of the cover is written back verbatim; only the
    /// entropy-coded scan is rebuilt, so quantization tables, Huffman tables
    /// and colorspace are those of the cover by construction.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        let scan_data = scan::encode(&self.components, &self.segments)?;
        Ok(assemble(&self.segments, &scan_data))
    }
}

/// Put a complete JPEG file back together around new scan data.
fn assemble(segments: &Segments, scan_data: &[u8]) -> Vec<u8> {
    let estimated = segments
        .headers
        .iter()
        .map(|s| s.data.len() + 4)
        .sum::<usize>()
        + scan_data.len()
        + 64;
    let mut out = Vec::with_capacity(estimated);

    out.extend_from_slice(&[0xFF, Marker::Soi.code()]);

    for segment in &segments.headers {
        out.extend_from_slice(&[0xFF, segment.marker.code()]);
        let length = (segment.data.len() + 2) as u16;
        out.extend_from_slice(&length.to_be_bytes());
        out.extend_from_slice(&segment.data);
    }

    write_sos_header(&mut out, &segments.frame);
    out.extend_from_slice(scan_data);

    out.extend_from_slice(&[0xFF, Marker::Eoi.code()]);
    out
}

/// Reconstruct the SOS header from the frame's component selectors.
fn write_sos_header(out: &mut Vec<u8>, frame: &Frame) {
    out.extend_from_slice(&[0xFF, Marker::Sos.code()]);

    let num_components = frame.components.len() as u8;
    let length = 6 + 2 * num_components as u16;
    out.extend_from_slice(&length.to_be_bytes());

    out.push(num_components);
    for component in &frame.components {
        out.push(component.id);
        out.push((component.dc_id << 4) | component.ac_id);
    }

    // spectral selection 0..63, no successive approximation (baseline)
    out.extend_from_slice(&[0, 63, 0]);
}
