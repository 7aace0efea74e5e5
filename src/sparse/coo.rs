use super::CsrMatrix;

/// Builder accumulating sparse coordinate triples into a [`CsrMatrix`].
pub struct CooBuilder {
    rows: Vec<i32>,
    cols: Vec<i32>,
    vals: Vec<f32>,
}

impl CooBuilder {
    /// Initialize a builder with a specified capacity.
    pub fn with_capacity(cap: usize) -> CooBuilder {
        CooBuilder {
            rows: Vec::with_capacity(cap),
            cols: Vec::with_capacity(cap),
            vals: Vec::with_capacity(cap),
        }
    }

    pub fn new() -> CooBuilder {
        CooBuilder::with_capacity(0)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn add_entry(&mut self, row: i32, col: i32, val: f32) {
        self.rows.push(row);
        self.cols.push(col);
        self.vals.push(val);
    }

    /// Build the final CSR matrix from this builder.
    ///
    /// Entries land row-major with sorted columns; duplicate (row, col)
    /// coordinates sum their values.
    pub fn build(self, n_rows: usize, n_cols: usize) -> CsrMatrix {
        let nnz = self.rows.len();
        let mut row_ptrs = vec![0usize; n_rows + 1];
        for r in &self.rows {
            row_ptrs[*r as usize + 1] += 1;
        }
        for i in 1..=n_rows {
            row_ptrs[i] += row_ptrs[i - 1];
        }

        // scatter into row order
        let mut row_ips = row_ptrs.clone();
        let mut col_inds = vec![0i32; nnz];
        let mut values = vec![0.0f32; nnz];
        for i in 0..nnz {
            let r = self.rows[i] as usize;
            let pos = row_ips[r];
            col_inds[pos] = self.cols[i];
            values[pos] = self.vals[i];
            row_ips[r] += 1;
        }

        // sort each row by column and merge duplicates in place
        let mut out_ptrs = vec![0usize; n_rows + 1];
        let mut write = 0usize;
        for row in 0..n_rows {
            let (sp, ep) = (row_ptrs[row], row_ptrs[row + 1]);
            let mut entries: Vec<(i32, f32)> = (sp..ep)
                .map(|i| (col_inds[i], values[i]))
                .collect();
            entries.sort_by_key(|(c, _)| *c);

            let row_start = write;
            for (c, v) in entries {
                if write > row_start && col_inds[write - 1] == c {
                    values[write - 1] += v;
                } else {
                    col_inds[write] = c;
                    values[write] = v;
                    write += 1;
                }
            }
            out_ptrs[row + 1] = write;
        }
        col_inds.truncate(write);
        values.truncate(write);

        CsrMatrix::from_parts(n_rows, n_cols, out_ptrs, col_inds, values)
    }
}

impl Default for CooBuilder {
    fn default() -> Self {
        CooBuilder::new()
    }
}
