//! Partition of the comparison matrix into worker tiles.
//!
//! The m x n rectangle is split recursively, always halving the longer
//! side, until both sides fit the cut length. For a self-comparison the
//! partition instead consists of triangle tiles along the diagonal (which
//! enumerate only pairs `j > i`) plus all rectangle pairs of row blocks
//! above it. Tiles are sorted by anti-diagonal for cache reuse across
//! neighbouring tiles.

/// One rectangular (or diagonal-triangle) block of the comparison matrix.
///
/// A `j_len` of zero marks a triangle tile: the block
/// `[i_start, i_start + i_len)` compared against itself, pairs `j > i`
/// only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    pub i_start: usize,
    pub i_len:   usize,
    pub j_start: usize,
    pub j_len:   usize,
}

impl Tile {
    #[inline]
    #[must_use]
    pub fn is_triangle(&self) -> bool {
        self.j_len == 0
    }

    #[inline]
    fn antidiagonal(&self) -> usize {
        if self.is_triangle() {
            self.i_start + self.i_start
        } else {
            self.i_start + self.j_start
        }
    }
}

/// The ordered tile list for one all-against-all run.
pub struct MatrixPartition {
    tiles: Vec<Tile>,
}

impl MatrixPartition {
    /// Partitions the m x n rectangle (database against a distinct query
    /// set).
    #[must_use]
    pub fn rectangular(cut_len: usize, m: usize, n: usize) -> Self {
        debug_assert!(cut_len > 0);
        let mut tiles = Vec::new();
        let mut stack = vec![Tile {
            i_start: 0,
            i_len:   m,
            j_start: 0,
            j_len:   n,
        }];
        while let Some(next) = stack.pop() {
            if next.i_len <= cut_len && next.j_len <= cut_len {
                tiles.push(next);
            } else if next.i_len < next.j_len {
                let (first, second) = split_interval(next.j_start, next.j_len);
                stack.push(Tile { j_start: first.0, j_len: first.1, ..next });
                stack.push(Tile { j_start: second.0, j_len: second.1, ..next });
            } else {
                let (first, second) = split_interval(next.i_start, next.i_len);
                stack.push(Tile { i_start: first.0, i_len: first.1, ..next });
                stack.push(Tile { i_start: second.0, i_len: second.1, ..next });
            }
        }
        Self::sorted(tiles)
    }

    /// Partitions the self-comparison of `m` sequences into diagonal
    /// triangles and the rectangle pairs of row blocks above the diagonal.
    #[must_use]
    pub fn triangular(cut_len: usize, m: usize) -> Self {
        debug_assert!(cut_len > 0);
        let mut tiles = Vec::new();
        let mut idx = 0;
        while idx < m {
            let i_len = cut_len.min(m - idx);
            tiles.push(Tile {
                i_start: idx,
                i_len,
                j_start: 0,
                j_len: 0,
            });
            idx += cut_len;
        }
        let num_blocks = tiles.len();
        for i in 0..num_blocks.saturating_sub(1) {
            let block_i = tiles[i];
            for j in i + 1..num_blocks {
                let block_j = tiles[j];
                tiles.push(Tile {
                    i_start: block_i.i_start,
                    i_len:   block_i.i_len,
                    j_start: block_j.i_start,
                    j_len:   block_j.i_len,
                });
            }
        }
        Self::sorted(tiles)
    }

    fn sorted(mut tiles: Vec<Tile>) -> Self {
        tiles.sort_by_key(|tile| (tile.antidiagonal(), tile.i_start));
        Self { tiles }
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn tile(&self, idx: usize) -> Tile {
        self.tiles[idx]
    }
}

fn split_interval(start: usize, len: usize) -> ((usize, usize), (usize, usize)) {
    let half = len / 2 + len % 2;
    ((start, half), (start + half, len - half))
}
