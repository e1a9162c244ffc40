//! Histogram-preserving JPEG steganography.
//!
//! Hides an arbitrary payload in the quantized DCT coefficients of a
//! baseline JPEG by swapping coefficient values with fixed partners
//! (`3↔4`, `5↔6`, `-3↔-4`, …) under per-pair quotas, so that the marginal
//! histogram of coefficient values, the image's first-order statistical
//! fingerprint, stays approximately unchanged. After the payload ends,
//! remaining carriers are filled with random bits matched to the cover's
//! own bit entropy, hiding the payload boundary as well.
//!
//! # Example
//!
//! ```ignore
//! use histeg::Concealer;
//!
//! let cover = std::fs::read("cover.jpg")?;
//! let mut concealer = Concealer::new(&cover)?;
//!
//! let capacity = concealer.current_size();
//! println!("cover carries up to {capacity} bytes");
//!
//! let stego = concealer.write(b"attack at dawn")?;
//! std::fs::write("stego.jpg", &stego)?;
//!
//! // later, on the receiving side
//! let mut concealer = Concealer::new(&stego)?;
//! let recovered = concealer.read()?;
//! assert!(recovered.starts_with(b"attack at dawn"));
//! ```
//!
//! No encryption, authentication or framing is applied to the payload;
//! callers who need those wrap the payload before embedding. The scheme
//! targets first-order histogram analysis only.

mod concealer;
mod correlation;
mod error;
pub mod jpeg;

pub use concealer::Concealer;
pub use correlation::{partner, verify as verify_partner_map};
pub use error::{HistegError, Result};
