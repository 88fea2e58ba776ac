//! Cyclic selection over the overlay snapshot.

/// Index into the list captured at `Activate` time.
///
/// Movement wraps at both ends.  An empty list has no current index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionCursor {
    index: usize,
    len: usize,
}

impl SelectionCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start over on a list of `len` entries, selecting the first one.
    pub fn reset(&mut self, len: usize) {
        self.index = 0;
        self.len = len;
    }

    pub fn advance(&mut self) {
        if self.len > 0 {
            self.index = (self.index + 1) % self.len;
        }
    }

    pub fn retreat(&mut self) {
        if self.len > 0 {
            self.index = (self.index + self.len - 1) % self.len;
        }
    }

    /// The selected index, or `None` for an empty list.
    pub fn current(&self) -> Option<usize> {
        (self.len > 0).then_some(self.index)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
