use serde::{Deserialize, Serialize};

/// A compressed sparse row matrix with owned storage.
///
/// Rows are contiguous runs of `col_inds`/`values` delimited by `row_ptrs`;
/// column indices within a row are sorted ascending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CsrMatrix {
    pub n_rows: usize,
    pub n_cols: usize,
    row_ptrs: Vec<usize>,
    col_inds: Vec<i32>,
    values: Vec<f32>,
}

impl CsrMatrix {
    /// Assemble a matrix from raw CSR parts.
    ///
    /// Callers are responsible for sorted, in-bounds column indices; the
    /// pointer structure itself is checked.
    pub fn from_parts(
        n_rows: usize,
        n_cols: usize,
        row_ptrs: Vec<usize>,
        col_inds: Vec<i32>,
        values: Vec<f32>,
    ) -> CsrMatrix {
        assert_eq!(row_ptrs.len(), n_rows + 1);
        assert_eq!(row_ptrs[n_rows], col_inds.len());
        assert_eq!(col_inds.len(), values.len());
        CsrMatrix {
            n_rows,
            n_cols,
            row_ptrs,
            col_inds,
            values,
        }
    }

    /// Get the "length" (number of rows) in the matrix.
    pub fn len(&self) -> usize {
        self.n_rows
    }

    pub fn is_empty(&self) -> bool {
        self.n_rows == 0
    }

    /// Get the number of observed values in the matrix.
    pub fn nnz(&self) -> usize {
        self.row_ptrs[self.n_rows]
    }

    /// Get the row pointers as a slice.
    pub fn row_ptrs(&self) -> &[usize] {
        &self.row_ptrs
    }

    /// Get the extent in the underlying arrays for a row in the matrix.
    pub fn extent(&self, row: usize) -> (usize, usize) {
        (self.row_ptrs[row], self.row_ptrs[row + 1])
    }

    /// Get the column indices for a row in the matrix.
    pub fn row_cols(&self, row: usize) -> &[i32] {
        let (start, end) = self.extent(row);
        &self.col_inds[start..end]
    }

    /// Get the values for a row in the matrix.
    pub fn row_vals(&self, row: usize) -> &[f32] {
        let (start, end) = self.extent(row);
        &self.values[start..end]
    }

    /// L2 norm of each row.
    pub fn row_norms(&self) -> Vec<f32> {
        (0..self.n_rows)
            .map(|r| {
                self.row_vals(r)
                    .iter()
                    .map(|v| v * v)
                    .sum::<f32>()
                    .sqrt()
            })
            .collect()
    }

    /// Transpose the matrix with a counting sort over column indices.
    ///
    /// Output rows come out with sorted column indices.
    pub fn transpose(&self) -> CsrMatrix {
        let nnz = self.nnz();
        let mut row_ptrs = vec![0usize; self.n_cols + 1];
        let mut col_inds = vec![0i32; nnz];
        let mut values = vec![0.0f32; nnz];

        // step 1: count column values, placing counts in rps[c+1]
        for c in &self.col_inds {
            row_ptrs[*c as usize + 1] += 1;
        }

        // step 2: convert column counts into row offsets
        for i in 1..=self.n_cols {
            row_ptrs[i] += row_ptrs[i - 1];
        }

        // step 3: insert column indices and values into outputs
        let mut row_ips = row_ptrs.clone();
        for row in 0..self.n_rows {
            let (sp, ep) = self.extent(row);
            for i in sp..ep {
                let c = self.col_inds[i] as usize;
                let pos = row_ips[c];
                col_inds[pos] = row as i32;
                values[pos] = self.values[i];
                row_ips[c] += 1;
            }
        }

        CsrMatrix {
            n_rows: self.n_cols,
            n_cols: self.n_rows,
            row_ptrs,
            col_inds,
            values,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> CsrMatrix {
        // 3x4:
        // [1 2 0 0]
        // [0 0 3 0]
        // [4 0 0 5]
        CsrMatrix::from_parts(
            3,
            4,
            vec![0, 2, 3, 5],
            vec![0, 1, 2, 0, 3],
            vec![1.0, 2.0, 3.0, 4.0, 5.0],
        )
    }

    #[test]
    fn row_access() {
        let m = small();
        assert_eq!(m.nnz(), 5);
        assert_eq!(m.extent(1), (2, 3));
        assert_eq!(m.row_cols(0), &[0, 1]);
        assert_eq!(m.row_vals(2), &[4.0, 5.0]);
        assert_eq!(m.row_cols(1), &[2]);
    }

    #[test]
    fn transpose_structure() {
        let m = small();
        let t = m.transpose();
        assert_eq!(t.n_rows, 4);
        assert_eq!(t.n_cols, 3);
        assert_eq!(t.nnz(), 5);
        // column 0 held rows 0 and 2
        assert_eq!(t.row_cols(0), &[0, 2]);
        assert_eq!(t.row_vals(0), &[1.0, 4.0]);
        assert_eq!(t.row_cols(2), &[1]);
        assert_eq!(t.row_vals(3), &[5.0]);
        // transposing back recovers the original
        assert_eq!(t.transpose(), m);
    }

    #[test]
    fn transposed_rows_are_sorted() {
        let m = small().transpose();
        for r in 0..m.n_rows {
            let cols = m.row_cols(r);
            assert!(cols.windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn row_norms_match() {
        let m = small();
        let norms = m.row_norms();
        assert!((norms[0] - 5.0f32.sqrt()).abs() < 1e-6);
        assert!((norms[1] - 3.0).abs() < 1e-6);
    }
}
