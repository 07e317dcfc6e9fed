//! Just enough of the `android.os.Parcel` wire format to pull strings back
//! out of a marshalled object.
//!
//! Strings are written by `Parcel.writeString()` as a little-endian `i32`
//! length in UTF-16 code units (negative for `null`), followed by the code
//! units and a NUL terminator, padded up to a multiple of four bytes.
//!
//! The reader moves its cursor exactly like the framework's `readString()`
//! does, including the cases where it fails half way through, since the
//! position of every later field depends on that.

/// Outcome of reading one string field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ParcelString {
    Null,
    /// The length runs past the end of the buffer or the code units aren't
    /// valid UTF-16.
    Invalid,
    Value(String),
}

#[derive(Debug, Clone)]
pub(crate) struct ParcelReader<'a> {
    data: &'a [u8],
    pos: usize,
}

const fn pad_size(len: usize) -> usize {
    (len + 3) & !3
}

impl<'a> ParcelReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self::at(data, 0)
    }

    pub fn at(data: &'a [u8], pos: usize) -> Self {
        Self { data, pos }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn has_remaining(&self) -> bool {
        self.pos < self.data.len()
    }

    /// `None` without moving the cursor if fewer than four bytes remain.
    pub fn read_i32(&mut self) -> Option<i32> {
        let end = self.pos.checked_add(4)?;
        let bytes = self.data.get(self.pos..end)?;
        self.pos = end;
        Some(i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// `None` if not even the length word could be read, which is the only
    /// case where the cursor doesn't move.
    pub fn read_string(&mut self) -> Option<ParcelString> {
        let len = self.read_i32()?;
        if len < 0 {
            return Some(ParcelString::Null);
        }

        // The length word has been consumed either way; the payload is only
        // consumed if it fits.
        let units = len as usize;
        let Some(payload_len) = units.checked_add(1).and_then(|n| n.checked_mul(2)) else {
            return Some(ParcelString::Invalid);
        };
        let padded = pad_size(payload_len);
        let start = self.pos;
        let Some(end) = start.checked_add(padded) else {
            return Some(ParcelString::Invalid);
        };
        if end > self.data.len() {
            return Some(ParcelString::Invalid);
        }
        self.pos = end;

        let code_units: Vec<u16> = self.data[start..start + units * 2]
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        match String::from_utf16(&code_units) {
            Ok(value) => Some(ParcelString::Value(value)),
            Err(_) => Some(ParcelString::Invalid),
        }
    }
}

/// Builds marshalled parcels for tests.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct ParcelWriter {
    data: Vec<u8>,
}

#[cfg(test)]
impl ParcelWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(&self) -> usize {
        self.data.len()
    }

    pub fn write_i32(&mut self, value: i32) -> &mut Self {
        self.data.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn write_i64(&mut self, value: i64) -> &mut Self {
        self.data.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn write_string(&mut self, value: Option<&str>) -> &mut Self {
        let Some(value) = value else {
            return self.write_i32(-1);
        };
        let units: Vec<u16> = value.encode_utf16().collect();
        self.write_i32(units.len() as i32);
        let start = self.data.len();
        for unit in units.iter().copied().chain(std::iter::once(0)) {
            self.data.extend_from_slice(&unit.to_le_bytes());
        }
        let written = self.data.len() - start;
        self.data.resize(start + pad_size(written), 0);
        self
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}
