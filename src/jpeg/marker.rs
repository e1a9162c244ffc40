//! JPEG marker identification (ITU T.81 Table B.1).

/// Markers the transcoder cares about, with a catch-all for the rest.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Marker {
    /// Start of Image.
    Soi,
    /// End of Image.
    Eoi,
    /// Start of Scan.
    Sos,
    /// Start of Frame; the parameter is the SOF type (0 = baseline).
    Sof(u8),
    /// Define Quantization Table.
    Dqt,
    /// Define Huffman Table.
    Dht,
    /// Define Restart Interval.
    Dri,
    /// Restart marker 0-7, interleaved into scan data.
    Rst(u8),
    /// Application segment 0-15.
    App(u8),
    /// Comment.
    Com,
    /// Anything else; carried through verbatim.
    Other(u8),
}

impl Marker {
    /// Decode the byte following an `0xFF` prefix.
    ///
    /// Returns `None` for `0x00` (stuffed data byte) and `0xFF` (fill byte),
    /// which are not markers.
    pub fn from_code(code: u8) -> Option<Marker> {
        match code {
            0x00 | 0xFF => None,
            0xD8 => Some(Marker::Soi),
            0xD9 => Some(Marker::Eoi),
            0xDA => Some(Marker::Sos),
            0xC0..=0xC3 | 0xC5..=0xC7 | 0xC9..=0xCB | 0xCD..=0xCF => {
                Some(Marker::Sof(code - 0xC0))
            }
            0xDB => Some(Marker::Dqt),
            0xC4 => Some(Marker::Dht),
            0xDD => Some(Marker::Dri),
            0xD0..=0xD7 => Some(Marker::Rst(code - 0xD0)),
            0xE0..=0xEF => Some(Marker::App(code - 0xE0)),
            0xFE => Some(Marker::Com),
            other => Some(Marker::Other(other)),
        }
    }

    /// The marker byte written after the `0xFF` prefix.
    pub fn code(self) -> u8 {
        match self {
            Marker::Soi => 0xD8,
            Marker::Eoi => 0xD9,
            Marker::Sos => 0xDA,
            Marker::Sof(n) => 0xC0 + n,
            Marker::Dqt => 0xDB,
            Marker::Dht => 0xC4,
            Marker::Dri => 0xDD,
            Marker::Rst(n) => 0xD0 + n,
            Marker::App(n) => 0xE0 + n,
            Marker::Com => 0xFE,
            Marker::Other(code) => code,
        }
    }

    /// Whether a 2-byte length field and segment payload follow the marker.
    pub fn has_payload(self) -> bool {
        !matches!(
            self,
            Marker::Soi | Marker::Eoi | Marker::Rst(_) | Marker::Other(0x01)
        )
    }
}
