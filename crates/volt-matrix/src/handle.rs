//! Matrix-element handles: indices into a flat cell
//! array rather than `(row, col)` pairs, so a behaviour's `Load` can
//! accumulate into its slots without re-hashing coordinates every Newton
//! iteration. A handle targeting ground maps to a shared discard sink.

pub(crate) const SINK: usize = usize::MAX;

/// Handle into a matrix's flat cell array, or the discard sink if it was
/// requested against ground. `generation` lets diagnostic builds assert a
/// handle is not used after the matrix that issued it has been torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementHandle {
    pub(crate) index: usize,
    pub(crate) generation: u32,
}

impl ElementHandle {
    #[must_use]
    pub fn is_sink(&self) -> bool {
        self.index == SINK
    }
}

/// Handle into a matrix's flat RHS array, or the discard sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RhsHandle {
    pub(crate) index: usize,
    pub(crate) generation: u32,
}

impl RhsHandle {
    #[must_use]
    pub fn is_sink(&self) -> bool {
        self.index == SINK
    }
}
