//! The embedding core: histogram, bit classifier, and the three passes.
//!
//! A [`Concealer`] walks the cover's quantized coefficients three ways:
//!
//! 1. a histogram pass fixing `total[u]` for every 16-bit value `u`,
//! 2. an extract pass recovering the bit stream the coefficients currently
//!    spell out (also used dry, to measure capacity and cover entropy),
//! 3. an embed pass writing payload bits by swapping coefficients with
//!    their histogram partners under per-pair quotas.
//!
//! The quota machinery is what keeps the value histogram intact: a value is
//! accepted as a bit carrier only while the ratio of its carrier uses to its
//! sightings stays below `total[coef] / total[partner]`, and surplus partner
//! values written by a previous embedding are flipped back on sight.

use rand::rngs::OsRng;
use rand::RngCore;

use crate::correlation::partner;
use crate::error::{HistegError, Result};
use crate::jpeg::CoverImage;

const TABLE_SIZE: usize = 1 << 16;

/// Classification of one coefficient cell during a pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Cell {
    /// A carrier whose LSB currently reads as this payload bit.
    Bit(u8),
    /// A usable pair that is out of quota; left unchanged.
    Padding,
    /// A surplus value written by us earlier; flip back to its partner.
    Restore,
    /// Unpaired value, or value/partner absent from the cover histogram.
    Invalid,
}

/// Bit cursor over a payload buffer, LSB-first within each byte.
#[derive(Clone, Copy, Default)]
struct Cursor {
    byte: usize,
    bit: u8,
}

impl Cursor {
    #[inline]
    fn advance(&mut self) {
        self.bit += 1;
        self.byte += (self.bit >> 3) as usize;
        self.bit &= 7;
    }
}

/// The per-value counters shared by all passes.
struct Tallies {
    /// Occurrences of each value in the cover; frozen by the histogram pass.
    total: Vec<u64>,
    /// Values processed so far in the current pass.
    occur: Vec<u64>,
    /// Values used to carry an information bit so far in the current pass.
    count: Vec<u64>,
}

impl Tallies {
    fn new() -> Self {
        Tallies {
            total: vec![0; TABLE_SIZE],
            occur: vec![0; TABLE_SIZE],
            count: vec![0; TABLE_SIZE],
        }
    }

    fn begin_pass(&mut self) {
        self.occur.fill(0);
        self.count.fill(0);
    }

    /// Classify `coef` against its partner `corr`.
    fn bit_test(&self, coef: u16, corr: u16) -> Cell {
        let (c, p) = (coef as usize, corr as usize);
        if coef == 0 || corr == 0 || self.total[c] == 0 || self.total[p] == 0 {
            return Cell::Invalid;
        }
        if self.occur[c] >= self.total[c] {
            return Cell::Restore; // every original occurrence already seen
        }
        if self.occur[p] >= self.total[p] {
            return Cell::Padding; // partner bucket exhausted
        }

        let seen = if self.occur[c] != 0 {
            (self.count[c] << 16) / self.occur[c]
        } else {
            0
        };
        let quota = (self.total[c] << 16) / self.total[p];
        if seen < quota {
            Cell::Bit((coef & 1) as u8)
        } else {
            Cell::Padding
        }
    }
}

/// Steganographic embedder for one cover JPEG.
///
/// Construction decodes the cover, fixes its coefficient histogram and
/// measures the cover entropy (fraction of 0-bits in a dry extract); the
/// entropy later drives the statistical profile of post-payload padding.
///
/// An instance is not meant for concurrent use. Independent instances on
/// disjoint images may run in parallel.
pub struct Concealer {
    image: CoverImage,
    tallies: Tallies,
    entropy: f64,
}

impl Concealer {
    /// Build an embedder from a cover JPEG byte buffer.
    pub fn new(cover: &[u8]) -> Result<Self> {
        crate::correlation::verify()?;

        let image = CoverImage::decode(cover)?;
        let mut tallies = Tallies::new();
        for &coef in image.coefficients() {
            tallies.total[coef as u16 as usize] += 1;
        }

        let mut concealer = Concealer {
            image,
            tallies,
            entropy: 0.5,
        };

        // dry extract of the untouched cover: its 0-bit frequency is the
        // noise profile used to pad past the payload
        let cover_bits = concealer.read()?;
        let total_bits = cover_bits.len() as u64 * 8;
        if total_bits > 0 {
            let ones: u64 = cover_bits.iter().map(|b| b.count_ones() as u64).sum();
            concealer.entropy = (total_bits - ones) as f64 / total_bits as f64;
        }
        log::debug!(
            "cover capacity {} bytes, entropy {:.4}",
            cover_bits.len(),
            concealer.entropy
        );

        Ok(concealer)
    }

    /// The cover's frame geometry.
    pub fn image(&self) -> &CoverImage {
        &self.image
    }

    /// Fraction of 0-bits in the cover's dry extract.
    pub fn entropy(&self) -> f64 {
        self.entropy
    }

    /// Payload capacity of the current coefficient state, in whole bytes.
    pub fn current_size(&mut self) -> usize {
        self.extract(None)
    }

    /// Recover the currently embedded byte sequence.
    ///
    /// On an untouched cover this yields the pseudo-random bits the cover
    /// happens to spell out; after [`Concealer::write`] it starts with the
    /// embedded payload.
    pub fn read(&mut self) -> Result<Vec<u8>> {
        let size = self.extract(None);
        let mut msg = vec![0u8; size];
        let read = self.extract(Some(&mut msg));
        if read != size {
            return Err(HistegError::ExtractIncomplete {
                read,
                expected: size,
            });
        }
        Ok(msg)
    }

    /// Embed `payload` and serialize the mutated cover to a new JPEG buffer.
    ///
    /// Fails with [`HistegError::PayloadTooLarge`] if the pass ends before
    /// every payload bit found a carrier; the instance must be discarded in
    /// that case.
    pub fn write(&mut self, payload: &[u8]) -> Result<Vec<u8>> {
        self.embed(payload)?;
        self.image.serialize()
    }

    /// READ pass. Walks every coefficient, collecting carried bits into
    /// `dest` if present; returns the terminal byte cursor.
    fn extract(&mut self, mut dest: Option<&mut [u8]>) -> usize {
        let tallies = &mut self.tallies;
        tallies.begin_pass();
        let mut cursor = Cursor::default();

        for &coef in self.image.coefficients() {
            let coef = coef as u16;
            if let Some(ref buf) = dest {
                if cursor.byte >= buf.len() {
                    break;
                }
            }

            if let Cell::Bit(bit) = tallies.bit_test(coef, partner(coef)) {
                tallies.count[coef as usize] += 1;
                if let Some(ref mut buf) = dest {
                    buf[cursor.byte] |= bit << cursor.bit;
                }
                cursor.advance();
            }
            tallies.occur[coef as usize] += 1;
        }

        cursor.byte
    }

    /// WRITE pass. Payload bits first, then entropy-matched random fill so
    /// the payload boundary leaves no detectable edge.
    fn embed(&mut self, payload: &[u8]) -> Result<()> {
        let tallies = &mut self.tallies;
        tallies.begin_pass();
        let entropy = self.entropy;
        let mut cursor = Cursor::default();
        let mut rng = OsRng;

        for cell in self.image.coefficients_mut() {
            let coef = *cell as u16;
            let corr = partner(coef);
            match tallies.bit_test(coef, corr) {
                Cell::Invalid => {}
                Cell::Restore => {
                    *cell = corr as i16;
                    tallies.occur[corr as usize] += 1;
                }
                Cell::Padding => {
                    tallies.occur[coef as usize] += 1;
                }
                Cell::Bit(bwas) => {
                    let (bset, advance) = if cursor.byte < payload.len() {
                        ((payload[cursor.byte] >> cursor.bit) & 1, true)
                    } else {
                        let mut buf = [0u8; 2];
                        rng.try_fill_bytes(&mut buf)
                            .map_err(HistegError::RngFailed)?;
                        let rnd = u16::from_le_bytes(buf);
                        let bit = if rnd as f64 / f64::from(u16::MAX) >= entropy {
                            1
                        } else {
                            0
                        };
                        (bit, false)
                    };

                    if bwas == bset {
                        tallies.count[coef as usize] += 1;
                        tallies.occur[coef as usize] += 1;
                        if advance {
                            cursor.advance();
                        }
                    } else {
                        // carry the bit via the partner slot if its quota
                        // still allows, then flip either way
                        if tallies.bit_test(corr, coef) == Cell::Bit(bset) {
                            tallies.count[corr as usize] += 1;
                            if advance {
                                cursor.advance();
                            }
                        }
                        *cell = corr as i16;
                        tallies.occur[corr as usize] += 1;
                    }
                }
            }
        }

        if cursor.byte != payload.len() {
            return Err(HistegError::PayloadTooLarge {
                written: cursor.byte,
                payload: payload.len(),
            });
        }
        Ok(())
    }
}
