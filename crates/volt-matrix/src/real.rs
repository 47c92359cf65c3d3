use crate::handle::{ElementHandle, RhsHandle, SINK};
use crate::prelude::*;
use faer::sparse::{SparseColMat, Triplet};
use faer::{prelude::Solve, Mat};
use std::collections::HashMap;

/// Real-valued sparse matrix for DC and transient analyses.
///
/// Coordinates are `Variable::index` values (ground is 0). Internally cells
/// are stored compacted to `[0, size)` (ground excluded, since a row/column
/// of all zeros at ground would make the assembled system structurally
/// singular); callers never see that compaction — `get_element`/
/// `get_rhs_element`/`solve` all speak in terms of the original 1-based
/// variable indices, with index 0 always reading back as zero.
pub struct RealMatrix {
    compact_size: usize,
    cells: Vec<(usize, usize, f64)>,
    coord_index: HashMap<(usize, usize), usize>,
    rhs: Vec<f64>,
    generation: u32,
    #[cfg(debug_assertions)]
    debug_tags: Vec<Option<&'static str>>,
}

/// An opaque, reusable LU factorization produced by [`RealMatrix::factor`].
pub struct RealFactorization {
    size: usize,
    lu: faer::linalg::solvers::Lu<usize, f64>,
}

impl RealMatrix {
    /// `variable_count` is the total number of live variables, ground
    /// included (i.e. `VariableSet::len()`).
    #[must_use]
    pub fn new(variable_count: usize) -> Self {
        let compact_size = variable_count.saturating_sub(1);
        Self {
            compact_size,
            cells: Vec::new(),
            coord_index: HashMap::new(),
            rhs: vec![0.0; compact_size],
            generation: 0,
            #[cfg(debug_assertions)]
            debug_tags: Vec::new(),
        }
    }

    fn compact(&self, index: usize) -> Option<usize> {
        if index == 0 {
            None
        } else {
            Some(index - 1)
        }
    }

    /// Returns the handle for matrix cell `(row, col)`, creating it on first
    /// request. Repeated requests for the same coordinate return the same
    /// handle. Either coordinate touching ground (index 0)
    /// returns a sink handle that silently discards writes.
    pub fn get_element(&mut self, row: usize, col: usize) -> ElementHandle {
        let (Some(r), Some(c)) = (self.compact(row), self.compact(col)) else {
            return ElementHandle {
                index: SINK,
                generation: self.generation,
            };
        };
        let index = *self.coord_index.entry((r, c)).or_insert_with(|| {
            self.cells.push((r, c, 0.0));
            self.cells.len() - 1
        });
        #[cfg(debug_assertions)]
        while self.debug_tags.len() < self.cells.len() {
            self.debug_tags.push(None);
        }
        ElementHandle {
            index,
            generation: self.generation,
        }
    }

    pub fn get_rhs_element(&mut self, row: usize) -> RhsHandle {
        let Some(r) = self.compact(row) else {
            return RhsHandle {
                index: SINK,
                generation: self.generation,
            };
        };
        RhsHandle {
            index: r,
            generation: self.generation,
        }
    }

    /// Adds `value` to the accumulating cell. A no-op for a sink handle.
    pub fn stamp(&mut self, handle: ElementHandle, value: f64) {
        if handle.is_sink() {
            return;
        }
        debug_assert_eq!(handle.generation, self.generation, "stale matrix handle");
        self.cells[handle.index].2 += value;
    }

    /// Records, in diagnostic builds only, the entity most recently
    /// stamping into this cell.
    pub fn tag(&mut self, handle: ElementHandle, owner: &'static str) {
        if handle.is_sink() {
            return;
        }
        #[cfg(debug_assertions)]
        {
            self.debug_tags[handle.index] = Some(owner);
        }
        #[cfg(not(debug_assertions))]
        {
            let _ = owner;
        }
    }

    pub fn stamp_rhs(&mut self, handle: RhsHandle, value: f64) {
        if handle.is_sink() {
            return;
        }
        debug_assert_eq!(handle.generation, self.generation, "stale matrix handle");
        self.rhs[handle.index] += value;
    }

    /// Zeroes every live element and RHS entry.
    pub fn reset(&mut self) {
        for cell in &mut self.cells {
            cell.2 = 0.0;
        }
        for v in &mut self.rhs {
            *v = 0.0;
        }
    }

    /// Invalidates every handle issued so far; further use of an old handle
    /// trips the `debug_assert` above in diagnostic builds.
    pub fn unsetup_all(&mut self) {
        self.generation = self.generation.wrapping_add(1);
    }

    /// Factors the current matrix contents. The first call in a simulation
    /// performs structural + numerical factorization; this implementation
    /// delegates fill-reducing ordering to `faer`'s sparse LU rather than a
    /// hand-rolled Markowitz search (see `DESIGN.md`). Rows left with no
    /// nonzero entry above `pivot_abs_tol` are reported as
    /// `Error::SingularMatrix` before attempting the factorization at all,
    /// since `faer` cannot itself name the offending row.
    pub fn factor(&self, pivot_abs_tol: f64) -> Result<RealFactorization> {
        let mut row_has_entry = vec![false; self.compact_size];
        for &(r, _, v) in &self.cells {
            if v.abs() > pivot_abs_tol {
                row_has_entry[r] = true;
            }
        }
        if let Some(row) = row_has_entry.iter().position(|&has| !has) {
            return Err(Error::SingularMatrix { row: Some(row + 1) });
        }

        let triplets: Vec<Triplet<usize, usize, f64>> = self
            .cells
            .iter()
            .map(|&(r, c, v)| Triplet::new(r, c, v))
            .collect();
        let sparse = SparseColMat::try_new_from_triplets(self.compact_size, self.compact_size, &triplets)
            .map_err(|e| Error::MatrixBuild(e.to_string()))?;
        let lu = sparse
            .sp_lu()
            .map_err(|_| Error::SingularMatrix { row: None })?;
        Ok(RealFactorization {
            size: self.compact_size,
            lu,
        })
    }

    /// Forward/back substitution against the current RHS, returning the
    /// full-length solution vector (`variable_count` entries, index 0 always
    /// zero — ground isolation).
    #[must_use]
    pub fn solve(&self, factorization: &RealFactorization) -> Vec<f64> {
        let mut b = Mat::zeros(factorization.size, 1);
        for (i, &value) in self.rhs.iter().enumerate() {
            b[(i, 0)] = value;
        }
        let x = factorization.lu.solve(&b);
        let mut full = vec![0.0; self.compact_size + 1];
        for i in 0..self.compact_size {
            full[i + 1] = x[(i, 0)];
        }
        full
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ground_coordinates_are_silently_discarded() {
        let mut m = RealMatrix::new(3);
        let sink = m.get_element(0, 1);
        assert!(sink.is_sink());
        m.stamp(sink, 42.0);
        let rhs_sink = m.get_rhs_element(0);
        assert!(rhs_sink.is_sink());
    }

    #[test]
    fn repeated_requests_return_the_same_handle() {
        let mut m = RealMatrix::new(3);
        let a = m.get_element(1, 2);
        let b = m.get_element(1, 2);
        assert_eq!(a, b);
    }

    #[test]
    fn resistor_divider_solves_exactly() {
        // Two 1k resistors from node 1 (10V forced via RHS trick not used
        // here) -- instead exercise the matrix directly: node 1 = source
        // node tied via a 1-ohm link to ground is out of scope here; this
        // test only checks additive stamping + solve plumbing.
        let mut m = RealMatrix::new(3); // ground=0, node1, node2
        let g = 1.0 / 1000.0;
        let e11 = m.get_element(1, 1);
        let e12 = m.get_element(1, 2);
        let e21 = m.get_element(2, 1);
        let e22 = m.get_element(2, 2);
        m.stamp(e11, g);
        m.stamp(e12, -g);
        m.stamp(e21, -g);
        m.stamp(e22, g);
        // second resistor from node2 to ground
        let e22b = m.get_element(2, 2);
        m.stamp(e22b, g);
        // force node1 = 10V via a large conductance to an implicit source;
        // simplest: just set node1's diagonal dominant and inject current.
        let e11b = m.get_element(1, 1);
        m.stamp(e11b, 1e9);
        let rhs1 = m.get_rhs_element(1);
        m.stamp_rhs(rhs1, 1e9 * 10.0);

        let factorization = m.factor(1e-13).unwrap();
        let x = m.solve(&factorization);
        assert!((x[1] - 10.0).abs() < 1e-6);
        assert!((x[2] - 5.0).abs() < 1e-6);
    }

    #[test]
    fn floating_node_is_reported_as_singular() {
        let mut m = RealMatrix::new(2);
        // node 1 never stamped at all: row is all zero.
        let err = m.factor(1e-13).unwrap_err();
        assert!(matches!(err, Error::SingularMatrix { row: Some(1) }));
    }

    /// A resistor-only network's conductance matrix is symmetric: the
    /// (r,c) and (c,r) stamps a resistor between two non-ground nodes
    /// produces are equal in magnitude.
    #[test]
    fn resistor_only_network_conductance_matrix_is_symmetric() {
        let mut m = RealMatrix::new(4); // ground=0, n1, n2, n3
        let g12 = 1.0 / 470.0;
        let g23 = 1.0 / 2200.0;
        for (row, col, g) in [(1, 2, g12), (2, 1, g12), (2, 3, g23), (3, 2, g23)] {
            let e = m.get_element(row, col);
            m.stamp(e, -g);
        }
        for (row, g) in [(1, g12), (2, g12 + g23), (3, g23)] {
            let e = m.get_element(row, row);
            m.stamp(e, g);
        }

        let e12 = m.get_element(1, 2);
        let e21 = m.get_element(2, 1);
        let e23 = m.get_element(2, 3);
        let e32 = m.get_element(3, 2);
        // Re-requesting the same coordinates must return identical handles
        // (and thus identical accumulated values) for the off-diagonal pairs.
        assert_eq!(m.cells[e12.index].2, m.cells[e21.index].2);
        assert_eq!(m.cells[e23.index].2, m.cells[e32.index].2);
    }
}
