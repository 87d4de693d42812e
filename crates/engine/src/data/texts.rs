/// Append-only store for content that does not fit inline into a record.
///
/// Overwritten or deleted content is not reclaimed; `garbage()` reports how
/// many bytes are unreachable.
#[derive(Debug, Clone, Default)]
pub struct TextStore {
    buf: String,
    garbage: usize,
}

impl TextStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `value`, returning its `(offset, len)` reference.
    pub fn store(&mut self, value: &str) -> (u32, u32) {
        let offset = self.buf.len() as u32;
        self.buf.push_str(value);
        (offset, value.len() as u32)
    }

    pub fn get(&self, offset: u32, len: u32) -> &str {
        let start = offset as usize;
        self.buf.get(start..start + len as usize).unwrap_or_default()
    }

    pub(crate) fn release(&mut self, len: u32) {
        self.garbage += len as usize;
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn garbage(&self) -> usize {
        self.garbage
    }
}
