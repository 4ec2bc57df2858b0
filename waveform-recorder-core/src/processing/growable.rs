/// Append-only `f32` buffer whose capacity doubles when full.
///
/// The whole backing store, including the zero-filled tail past the written
/// values, is what the renderer sees: its length sets the time axis.
/// Appends are amortised O(1); capacity never shrinks and values already
/// written survive every resize.
#[derive(Debug, Clone, PartialEq)]
pub struct GrowableBuffer {
    data: Vec<f32>,
    len: usize,
}

impl GrowableBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: vec![0.0; capacity],
            len: 0,
        }
    }

    /// Write `value` at the next free index, doubling the capacity first if full.
    pub fn push(&mut self, value: f32) {
        if self.len == self.data.len() {
            let grown = (self.data.len() * 2).max(1);
            self.data.resize(grown, 0.0);
        }
        self.data[self.len] = value;
        self.len += 1;
    }

    /// Number of values written.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Full backing store, `capacity()` values long.
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Only the values written so far.
    #[cfg(test)]
    pub(crate) fn written(&self) -> &[f32] {
        &self.data[..self.len]
    }
}
