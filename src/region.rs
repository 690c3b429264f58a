use crate::error::Result;
use crate::grid::Grid;
use serde::Serialize;

/// Which sides of a cell border a differently-labeled neighbor (or the grid edge)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct EdgeMask(u8);

impl EdgeMask {
    /// Neighbor at row - 1
    pub const TOP: EdgeMask = EdgeMask(1);
    /// Neighbor at col + 1
    pub const RIGHT: EdgeMask = EdgeMask(2);
    /// Neighbor at row + 1
    pub const BOTTOM: EdgeMask = EdgeMask(4);
    /// Neighbor at col - 1
    pub const LEFT: EdgeMask = EdgeMask(8);

    pub const NONE: EdgeMask = EdgeMask(0);
    pub const ALL: EdgeMask = EdgeMask(15);

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn from_bits(bits: u8) -> Self {
        EdgeMask(bits & Self::ALL.0)
    }

    pub fn contains(self, other: EdgeMask) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: EdgeMask) {
        self.0 |= other.0;
    }
}

impl std::ops::BitOr for EdgeMask {
    type Output = EdgeMask;

    fn bitor(self, rhs: EdgeMask) -> EdgeMask {
        EdgeMask(self.0 | rhs.0)
    }
}

/// Output of [`label_regions`]
#[derive(Debug, Clone, PartialEq)]
pub struct Regions {
    pub edges: Grid<EdgeMask>,
    /// Component id per cell, starting at 1
    pub components: Grid<u32>,
    /// Number of components
    pub count: u32,
}

impl Regions {
    /// First cell (row-major) of every component, indexed by `id - 1`
    pub fn anchors(&self) -> Vec<(usize, usize)> {
        let mut anchors = vec![(0, 0); self.count as usize];
        let mut seen = vec![false; self.count as usize];
        for ((i, j), &id) in self.components.iter() {
            let slot = (id - 1) as usize;
            if !seen[slot] {
                seen[slot] = true;
                anchors[slot] = (i, j);
            }
        }
        anchors
    }

    /// Number of cells in each component, indexed by `id - 1`
    pub fn sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.count as usize];
        for (_, &id) in self.components.iter() {
            sizes[(id - 1) as usize] += 1;
        }
        sizes
    }
}

const NEIGHBORS: [(isize, isize, EdgeMask); 4] = [
    (-1, 0, EdgeMask::TOP),
    (0, 1, EdgeMask::RIGHT),
    (1, 0, EdgeMask::BOTTOM),
    (0, -1, EdgeMask::LEFT),
];

fn neighbor(
    (rows, cols): (usize, usize),
    (i, j): (usize, usize),
    (di, dj): (isize, isize),
) -> Option<(usize, usize)> {
    let ni = i.checked_add_signed(di)?;
    let nj = j.checked_add_signed(dj)?;
    (ni < rows && nj < cols).then_some((ni, nj))
}

/// Boundary mask for one cell
pub fn edge_mask<T: PartialEq>(labels: &Grid<T>, cell: (usize, usize)) -> EdgeMask {
    let mut mask = EdgeMask::NONE;
    for (di, dj, side) in NEIGHBORS {
        match neighbor(labels.shape(), cell, (di, dj)) {
            Some(n) if labels[n] == labels[cell] => {}
            _ => mask.insert(side),
        }
    }
    mask
}

/// Compute edge masks and 4-connected component ids for a label grid
pub fn label_regions<T: PartialEq>(labels: &Grid<T>) -> Regions {
    let shape = labels.shape();
    let edges = Grid::from_fn(shape.0, shape.1, |i, j| edge_mask(labels, (i, j)));

    let mut components = Grid::from_fn(shape.0, shape.1, |_, _| 0u32);
    let mut next_id = 0u32;
    let mut stack: Vec<(usize, usize)> = Vec::new();

    for i in 0..shape.0 {
        for j in 0..shape.1 {
            if components[(i, j)] != 0 {
                continue;
            }
            next_id += 1;
            components[(i, j)] = next_id;
            stack.push((i, j));

            while let Some(cell) = stack.pop() {
                for (di, dj, _) in NEIGHBORS {
                    let Some(n) = neighbor(shape, cell, (di, dj)) else {
                        continue;
                    };
                    if components[n] == 0 && labels[n] == labels[cell] {
                        components[n] = next_id;
                        stack.push(n);
                    }
                }
            }
        }
    }

    Regions {
        edges,
        components,
        count: next_id,
    }
}

/// Like [`label_regions`], for nested rows that still need shape validation
pub fn label_rows<T: PartialEq>(rows: Vec<Vec<T>>) -> Result<Regions> {
    let grid = Grid::from_rows(rows)?;
    Ok(label_regions(&grid))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use proptest::collection::vec as prop_vec;
    use proptest::prelude::*;

    fn grid(rows: &[&[&str]]) -> Grid<String> {
        Grid::from_rows(
            rows.iter()
                .map(|r| r.iter().map(|s| s.to_string()).collect())
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_two_interlocking_regions() {
        let labels = grid(&[&["A", "A", "B"], &["A", "B", "B"]]);
        let regions = label_regions(&labels);

        assert_eq!(regions.count, 2);
        assert_eq!(regions.components.to_rows(), vec![vec![1, 1, 2], vec![1, 2, 2]]);
        assert_eq!(regions.sizes(), vec![3, 3]);

        let e = regions.edges[(0, 1)];
        assert!(e.contains(EdgeMask::TOP));
        assert!(e.contains(EdgeMask::RIGHT));
        assert!(e.contains(EdgeMask::BOTTOM));
        assert!(!e.contains(EdgeMask::LEFT));
    }

    #[test]
    fn test_single_row() {
        let labels = grid(&[&["X", "X", "X"]]);
        let regions = label_regions(&labels);

        assert_eq!(regions.count, 1);
        assert_eq!(regions.components.to_rows(), vec![vec![1, 1, 1]]);
        assert_eq!(
            regions.edges[(0, 0)],
            EdgeMask::TOP | EdgeMask::BOTTOM | EdgeMask::LEFT
        );
        assert_eq!(regions.edges[(0, 1)], EdgeMask::TOP | EdgeMask::BOTTOM);
        assert_eq!(
            regions.edges[(0, 2)],
            EdgeMask::TOP | EdgeMask::BOTTOM | EdgeMask::RIGHT
        );
    }

    #[test]
    fn test_single_cell_has_all_edges() {
        let regions = label_rows(vec![vec!["T"]]).unwrap();
        assert_eq!(regions.edges[(0, 0)], EdgeMask::ALL);
        assert_eq!(regions.count, 1);
    }

    #[test]
    fn test_diagonal_cells_are_not_connected() {
        let labels = grid(&[&["A", "B"], &["B", "A"]]);
        let regions = label_regions(&labels);
        assert_eq!(regions.count, 4);
        assert_eq!(regions.components.to_rows(), vec![vec![1, 2], vec![3, 4]]);
    }

    #[test]
    fn test_ids_follow_row_major_first_cell() {
        // "A" wraps around the upper "B", which cuts the lone "B" at (3,1) off
        // from it; the bottom row therefore gets three fresh ids.
        let labels = grid(&[&["A", "B", "A"], &["A", "B", "A"], &["A", "A", "A"], &["C", "B", "C"]]);
        let regions = label_regions(&labels);
        assert_eq!(
            regions.components.to_rows(),
            vec![vec![1, 2, 1], vec![1, 2, 1], vec![1, 1, 1], vec![3, 4, 5]]
        );
        assert_eq!(regions.anchors(), vec![(0, 0), (0, 1), (3, 0), (3, 1), (3, 2)]);
    }

    #[test]
    fn test_tie_sentinel_is_an_ordinary_label() {
        let labels = grid(&[&["T", "T", "A"], &["L", "T", "A"]]);
        let regions = label_regions(&labels);
        assert_eq!(regions.components.to_rows(), vec![vec![1, 1, 2], vec![3, 1, 2]]);
    }

    #[test]
    fn test_large_grid_does_not_exhaust_stack() {
        let labels = Grid::from_fn(600, 600, |_, _| 7u8);
        let regions = label_regions(&labels);
        assert_eq!(regions.count, 1);
        assert_eq!(regions.sizes(), vec![360_000]);
    }

    #[test]
    fn test_serpentine_region() {
        // A single path that snakes through the grid
        let labels = Grid::from_fn(9, 9, |i, j| {
            if i % 2 == 0 || (i % 4 == 1 && j == 8) || (i % 4 == 3 && j == 0) {
                'p'
            } else {
                'w'
            }
        });
        let regions = label_regions(&labels);
        let path_id = regions.components[(0, 0)];
        assert_eq!(regions.components[(8, 0)], path_id);
        assert_eq!(regions.components[(8, 8)], path_id);
        // Each wall segment is its own component
        assert_eq!(regions.count, 1 + 4);
    }

    #[test]
    fn test_ragged_input_rejected() {
        let err = label_rows(vec![vec!["A", "B"], vec!["A"]]).unwrap_err();
        assert!(matches!(err, Error::InvalidShape(_)));
    }

    #[test]
    fn test_edge_mask_bits() {
        assert_eq!(EdgeMask::TOP.bits(), 1);
        assert_eq!(EdgeMask::RIGHT.bits(), 2);
        assert_eq!(EdgeMask::BOTTOM.bits(), 4);
        assert_eq!(EdgeMask::LEFT.bits(), 8);
        assert_eq!(EdgeMask::from_bits(0xff), EdgeMask::ALL);
    }

    /// Reference connectivity check: is there an equal-label 4-path from a to b?
    fn connected(labels: &Grid<u8>, a: (usize, usize), b: (usize, usize)) -> bool {
        let mut seen = Grid::from_fn(labels.rows(), labels.cols(), |_, _| false);
        let mut queue = std::collections::VecDeque::from([a]);
        seen[a] = true;
        while let Some(c) = queue.pop_front() {
            if c == b {
                return true;
            }
            for (di, dj, _) in NEIGHBORS {
                if let Some(n) = neighbor(labels.shape(), c, (di, dj)) {
                    if !seen[n] && labels[n] == labels[c] {
                        seen[n] = true;
                        queue.push_back(n);
                    }
                }
            }
        }
        false
    }

    fn label_grid() -> impl Strategy<Value = Grid<u8>> {
        (1usize..8, 1usize..8).prop_flat_map(|(r, c)| {
            prop_vec(prop_vec(0u8..3, c), r).prop_map(|rows| Grid::from_rows(rows).unwrap())
        })
    }

    proptest! {
        #[test]
        fn prop_components_partition(labels in label_grid()) {
            let regions = label_regions(&labels);
            let cells: Vec<(usize, usize)> = labels.iter().map(|(c, _)| c).collect();

            for &a in &cells {
                let id = regions.components[a];
                prop_assert!(id >= 1 && id <= regions.count);
                for &b in &cells {
                    let same = regions.components[b] == id;
                    prop_assert_eq!(same, connected(&labels, a, b));
                }
            }

            let total: usize = regions.sizes().iter().sum();
            prop_assert_eq!(total, labels.rows() * labels.cols());
            prop_assert!(regions.sizes().iter().all(|&s| s > 0));
        }

        #[test]
        fn prop_ids_assigned_in_row_major_order(labels in label_grid()) {
            let regions = label_regions(&labels);
            let mut max_seen = 0;
            for (_, &id) in regions.components.iter() {
                prop_assert!(id <= max_seen + 1);
                max_seen = max_seen.max(id);
            }
        }

        #[test]
        fn prop_edge_bits_match_neighbors(labels in label_grid()) {
            let regions = label_regions(&labels);
            let (rows, cols) = labels.shape();
            for ((i, j), &mask) in regions.edges.iter() {
                let here = labels[(i, j)];
                prop_assert_eq!(mask.contains(EdgeMask::TOP), i == 0 || labels[(i - 1, j)] != here);
                prop_assert_eq!(mask.contains(EdgeMask::BOTTOM), i == rows - 1 || labels[(i + 1, j)] != here);
                prop_assert_eq!(mask.contains(EdgeMask::LEFT), j == 0 || labels[(i, j - 1)] != here);
                prop_assert_eq!(mask.contains(EdgeMask::RIGHT), j == cols - 1 || labels[(i, j + 1)] != here);
            }
        }

        #[test]
        fn prop_labeling_is_idempotent(labels in label_grid()) {
            prop_assert_eq!(label_regions(&labels), label_regions(&labels));
        }
    }
}
