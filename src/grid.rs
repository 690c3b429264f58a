use crate::error::{Error, Result};
use std::ops::{Index, IndexMut};

/// A dense, row-major rectangular grid
#[derive(Debug, Clone, PartialEq)]
pub struct Grid<T> {
    rows: usize,
    cols: usize,
    cells: Vec<T>,
}

impl<T> Grid<T> {
    /// Build a grid of the given shape, filling each cell from `f(row, col)`
    pub fn from_fn(rows: usize, cols: usize, mut f: impl FnMut(usize, usize) -> T) -> Self {
        let mut cells = Vec::with_capacity(rows * cols);
        for i in 0..rows {
            for j in 0..cols {
                cells.push(f(i, j));
            }
        }
        Self { rows, cols, cells }
    }

    /// Build a grid from nested rows. Every row must have the same, non-zero length.
    pub fn from_rows(rows: Vec<Vec<T>>) -> Result<Self> {
        let num_rows = rows.len();
        let num_cols = rows.first().map(Vec::len).unwrap_or(0);
        if num_rows == 0 || num_cols == 0 {
            return Err(Error::InvalidShape(format!(
                "grid must have at least one row and one column, got {}x{}",
                num_rows, num_cols
            )));
        }
        if let Some((i, r)) = rows.iter().enumerate().find(|(_, r)| r.len() != num_cols) {
            return Err(Error::InvalidShape(format!(
                "row {} has {} cells, expected {}",
                i,
                r.len(),
                num_cols
            )));
        }

        Ok(Self {
            rows: num_rows,
            cols: num_cols,
            cells: rows.into_iter().flatten().collect(),
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&T> {
        if row < self.rows && col < self.cols {
            self.cells.get(row * self.cols + col)
        } else {
            None
        }
    }

    /// Cells with their coordinates, row-major
    pub fn iter(&self) -> impl Iterator<Item = ((usize, usize), &T)> {
        let cols = self.cols;
        self.cells
            .iter()
            .enumerate()
            .map(move |(k, v)| ((k / cols, k % cols), v))
    }

    pub fn map<U>(&self, mut f: impl FnMut(&T) -> U) -> Grid<U> {
        Grid {
            rows: self.rows,
            cols: self.cols,
            cells: self.cells.iter().map(|v| f(v)).collect(),
        }
    }

    /// Borrow the grid one row at a time
    pub fn row_slices(&self) -> impl Iterator<Item = &[T]> {
        self.cells.chunks(self.cols.max(1))
    }

    pub fn to_rows(&self) -> Vec<Vec<T>>
    where
        T: Clone,
    {
        self.row_slices().map(<[T]>::to_vec).collect()
    }
}

impl<T> Index<(usize, usize)> for Grid<T> {
    type Output = T;

    fn index(&self, (row, col): (usize, usize)) -> &T {
        assert!(row < self.rows && col < self.cols, "grid index out of bounds");
        &self.cells[row * self.cols + col]
    }
}

impl<T> IndexMut<(usize, usize)> for Grid<T> {
    fn index_mut(&mut self, (row, col): (usize, usize)) -> &mut T {
        assert!(row < self.rows && col < self.cols, "grid index out of bounds");
        &mut self.cells[row * self.cols + col]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_rows_shape() {
        let g = Grid::from_rows(vec![vec![1, 2, 3], vec![4, 5, 6]]).unwrap();
        assert_eq!(g.shape(), (2, 3));
        assert_eq!(g[(1, 0)], 4);
        assert_eq!(g.get(0, 2), Some(&3));
        assert_eq!(g.get(2, 0), None);
        assert_eq!(g.to_rows(), vec![vec![1, 2, 3], vec![4, 5, 6]]);
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let err = Grid::from_rows(vec![vec![1, 2], vec![3]]).unwrap_err();
        assert!(matches!(err, Error::InvalidShape(_)));
    }

    #[test]
    fn test_empty_rejected() {
        assert!(matches!(
            Grid::<u8>::from_rows(vec![]),
            Err(Error::InvalidShape(_))
        ));
        assert!(matches!(
            Grid::<u8>::from_rows(vec![vec![], vec![]]),
            Err(Error::InvalidShape(_))
        ));
    }

    #[test]
    fn test_iter_is_row_major() {
        let g = Grid::from_fn(2, 2, |i, j| i * 10 + j);
        let coords: Vec<(usize, usize)> = g.iter().map(|(c, _)| c).collect();
        assert_eq!(coords, vec![(0, 0), (0, 1), (1, 0), (1, 1)]);
        assert_eq!(g.map(|v| v * 2)[(1, 1)], 22);
    }
}
