use crate::handle::{ElementHandle, RhsHandle, SINK};
use crate::prelude::*;
use faer::c64;
use faer::sparse::{SparseColMat, Triplet};
use faer::{prelude::Solve, Mat};
use std::collections::HashMap;

/// Complex-valued counterpart to [`RealMatrix`](crate::real::RealMatrix),
/// used for AC small-signal analysis. Kept as a parallel, non-generic type
/// rather than a single matrix generic over a numeric field, mirroring the
/// real/complex split in the krets matrix crate this workspace descends
/// from — `faer`'s `SparseColMat` and `Lu` both take the scalar type as a
/// concrete parameter, so genericizing over it would mean committing to a
/// `ComplexField`-style bound this crate has no other use for.
pub struct ComplexMatrix {
    compact_size: usize,
    cells: Vec<(usize, usize, c64)>,
    coord_index: HashMap<(usize, usize), usize>,
    rhs: Vec<c64>,
    generation: u32,
}

pub struct ComplexFactorization {
    size: usize,
    lu: faer::linalg::solvers::Lu<usize, c64>,
}

impl ComplexMatrix {
    #[must_use]
    pub fn new(variable_count: usize) -> Self {
        let compact_size = variable_count.saturating_sub(1);
        Self {
            compact_size,
            cells: Vec::new(),
            coord_index: HashMap::new(),
            rhs: vec![c64::new(0.0, 0.0); compact_size],
            generation: 0,
        }
    }

    fn compact(&self, index: usize) -> Option<usize> {
        if index == 0 {
            None
        } else {
            Some(index - 1)
        }
    }

    pub fn get_element(&mut self, row: usize, col: usize) -> ElementHandle {
        let (Some(r), Some(c)) = (self.compact(row), self.compact(col)) else {
            return ElementHandle {
                index: SINK,
                generation: self.generation,
            };
        };
        let index = *self.coord_index.entry((r, c)).or_insert_with(|| {
            self.cells.push((r, c, c64::new(0.0, 0.0)));
            self.cells.len() - 1
        });
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

    pub fn stamp(&mut self, handle: ElementHandle, value: c64) {
        if handle.is_sink() {
            return;
        }
        debug_assert_eq!(handle.generation, self.generation, "stale matrix handle");
        self.cells[handle.index].2 += value;
    }

    pub fn stamp_rhs(&mut self, handle: RhsHandle, value: c64) {
        if handle.is_sink() {
            return;
        }
        debug_assert_eq!(handle.generation, self.generation, "stale matrix handle");
        self.rhs[handle.index] += value;
    }

    pub fn reset(&mut self) {
        for cell in &mut self.cells {
            cell.2 = c64::new(0.0, 0.0);
        }
        for v in &mut self.rhs {
            *v = c64::new(0.0, 0.0);
        }
    }

    pub fn unsetup_all(&mut self) {
        self.generation = self.generation.wrapping_add(1);
    }

    pub fn factor(&self, pivot_abs_tol: f64) -> Result<ComplexFactorization> {
        let mut row_has_entry = vec![false; self.compact_size];
        for &(r, _, v) in &self.cells {
            if v.norm() > pivot_abs_tol {
                row_has_entry[r] = true;
            }
        }
        if let Some(row) = row_has_entry.iter().position(|&has| !has) {
            return Err(Error::SingularMatrix { row: Some(row + 1) });
        }

        let triplets: Vec<Triplet<usize, usize, c64>> = self
            .cells
            .iter()
            .map(|&(r, c, v)| Triplet::new(r, c, v))
            .collect();
        let sparse = SparseColMat::try_new_from_triplets(self.compact_size, self.compact_size, &triplets)
            .map_err(|e| Error::MatrixBuild(e.to_string()))?;
        let lu = sparse
            .sp_lu()
            .map_err(|_| Error::SingularMatrix { row: None })?;
        Ok(ComplexFactorization {
            size: self.compact_size,
            lu,
        })
    }

    #[must_use]
    pub fn solve(&self, factorization: &ComplexFactorization) -> Vec<c64> {
        let mut b = Mat::zeros(factorization.size, 1);
        for (i, &value) in self.rhs.iter().enumerate() {
            b[(i, 0)] = value;
        }
        let x = factorization.lu.solve(&b);
        let mut full = vec![c64::new(0.0, 0.0); self.compact_size + 1];
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
    fn ground_is_sink_for_complex_cells_too() {
        let mut m = ComplexMatrix::new(2);
        let sink = m.get_element(0, 0);
        assert!(sink.is_sink());
    }

    #[test]
    fn rc_impedance_divider_matches_closed_form() {
        // node 1 driven hard to 1+0j, node1->node2 admittance g, node2->gnd
        // admittance y_c = jwC. Solve for node2 and compare to the textbook
        // divider V2 = V1 * g / (g + y_c).
        let omega = 2.0 * std::f64::consts::PI * 1_000.0;
        let g = 1.0 / 1_000.0;
        let cap = 1.0e-7;
        let y_c = c64::new(0.0, omega * cap);

        let mut m = ComplexMatrix::new(3);
        let e11 = m.get_element(1, 1);
        let e12 = m.get_element(1, 2);
        let e21 = m.get_element(2, 1);
        let e22 = m.get_element(2, 2);
        m.stamp(e11, c64::new(g, 0.0));
        m.stamp(e12, c64::new(-g, 0.0));
        m.stamp(e21, c64::new(-g, 0.0));
        m.stamp(e22, c64::new(g, 0.0));
        m.stamp(e22, y_c);
        let e11_forcing = m.get_element(1, 1);
        m.stamp(e11_forcing, c64::new(1.0e9, 0.0));
        let rhs1 = m.get_rhs_element(1);
        m.stamp_rhs(rhs1, c64::new(1.0e9, 0.0));

        let factorization = m.factor(1e-13).unwrap();
        let x = m.solve(&factorization);
        let expected = g / (g + y_c);
        assert!((x[2] - expected).norm() < 1e-6);
    }
}
