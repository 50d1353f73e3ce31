//! Track grid and closed-loop construction
//!
//! A track is painted on a grid of cells. Every track cell must touch exactly
//! two other track cells (4-connectivity), and all of them together must form
//! one closed loop. The loop is the order cars drive the cells in.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::error::TrackError;

/// What a grid cell holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellKind {
    Track,
    Infield,
    #[default]
    Open,
}

impl CellKind {
    pub fn from_char(ch: char) -> Option<Self> {
        match ch {
            '#' => Some(CellKind::Track),
            'i' | 'I' => Some(CellKind::Infield),
            '.' => Some(CellKind::Open),
            _ => None,
        }
    }
}

/// Row-major grid of cell kinds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackGrid {
    pub width: usize,
    pub cells: Vec<CellKind>,
}

impl TrackGrid {
    pub fn new(width: usize, cells: Vec<CellKind>) -> Self {
        Self { width, cells }
    }

    /// Parse ASCII rows: `#` track, `i` infield, `.` open. Blank lines are skipped.
    pub fn parse(text: &str) -> Result<Self, TrackError> {
        let rows: Vec<&str> = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();
        Self::from_rows(&rows)
    }

    pub fn from_rows<S: AsRef<str>>(rows: &[S]) -> Result<Self, TrackError> {
        let width = rows.first().map(|r| r.as_ref().chars().count()).unwrap_or(0);
        let mut cells = Vec::with_capacity(width * rows.len());

        for (row, line) in rows.iter().enumerate() {
            let line = line.as_ref();
            if line.chars().count() != width {
                return Err(TrackError::RaggedGrid { row });
            }
            for (col, ch) in line.chars().enumerate() {
                let kind = CellKind::from_char(ch).ok_or(TrackError::UnknownCell { ch, row, col })?;
                cells.push(kind);
            }
        }

        Ok(Self { width, cells })
    }

    /// A `width` x `height` grid whose border is a rectangular track ring
    /// around an infield. Needs both sides >= 3, or exactly 2x2.
    pub fn ring(width: usize, height: usize) -> Self {
        let mut cells = Vec::with_capacity(width * height);
        for row in 0..height {
            for col in 0..width {
                let border = row == 0 || col == 0 || row + 1 == height || col + 1 == width;
                cells.push(if border { CellKind::Track } else { CellKind::Infield });
            }
        }
        Self { width, cells }
    }

    pub fn height(&self) -> usize {
        if self.width == 0 {
            0
        } else {
            self.cells.len() / self.width
        }
    }

    #[inline]
    pub fn is_track(&self, index: usize) -> bool {
        matches!(self.cells.get(index), Some(CellKind::Track))
    }

    pub fn track_count(&self) -> usize {
        self.cells.iter().filter(|c| **c == CellKind::Track).count()
    }

    /// Track neighbors of a cell, checked east, south, west, north
    pub fn track_neighbors(&self, index: usize) -> [Option<usize>; 4] {
        let w = self.width;
        let h = self.height();
        let (col, row) = (index % w, index / w);

        let east = (col + 1 < w).then(|| index + 1);
        let south = (row + 1 < h).then(|| index + w);
        let west = (col > 0).then(|| index - 1);
        let north = (row > 0).then(|| index - w);

        [east, south, west, north].map(|n| n.filter(|&i| self.is_track(i)))
    }

    fn neighbor_count(&self, index: usize) -> usize {
        self.track_neighbors(index).iter().flatten().count()
    }
}

/// Grid direction of travel. Screen space: +x east, +y south.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    North,
    East,
    South,
    West,
}

impl Direction {
    /// Direction from one cell to an adjacent one
    pub fn between(grid_width: usize, from: usize, to: usize) -> Option<Self> {
        let w = grid_width;
        if w == 0 {
            return None;
        }
        if to == from + 1 && to / w == from / w {
            Some(Direction::East)
        } else if from == to + 1 && to / w == from / w {
            Some(Direction::West)
        } else if to == from + w {
            Some(Direction::South)
        } else if from == to + w {
            Some(Direction::North)
        } else {
            None
        }
    }

    pub fn vec(self) -> Vec2 {
        match self {
            Direction::North => Vec2::new(0.0, -1.0),
            Direction::East => Vec2::new(1.0, 0.0),
            Direction::South => Vec2::new(0.0, 1.0),
            Direction::West => Vec2::new(-1.0, 0.0),
        }
    }

    #[inline]
    pub fn is_horizontal(self) -> bool {
        matches!(self, Direction::East | Direction::West)
    }

    /// Facing angle (radians, screen space)
    pub fn angle(self) -> f32 {
        let v = self.vec();
        v.y.atan2(v.x)
    }
}

/// One loop cell with the directions a car enters and leaves it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub cell: usize,
    pub entry: Direction,
    pub exit: Direction,
}

impl Segment {
    /// Entry and exit lie on different axes
    #[inline]
    pub fn is_corner(&self) -> bool {
        self.entry.is_horizontal() != self.exit.is_horizontal()
    }
}

/// Validated closed loop of grid cells
///
/// Arc-length positions are measured in cells: segment `k` covers `[k, k + 1)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackLoop {
    grid_width: usize,
    cells: Vec<usize>,
    segments: Vec<Segment>,
}

impl TrackLoop {
    /// Walk the grid's track cells into a loop, rejecting malformed tracks
    pub fn build(grid: &TrackGrid) -> Result<Self, TrackError> {
        let total = grid.track_count();
        if total == 0 || grid.width == 0 {
            return Err(TrackError::Empty);
        }

        let mut start = None;
        for index in 0..grid.cells.len() {
            if !grid.is_track(index) {
                continue;
            }
            match grid.neighbor_count(index) {
                0 | 1 => return Err(TrackError::DeadEnd { index }),
                2 => {}
                neighbors => return Err(TrackError::Branch { index, neighbors }),
            }
            start.get_or_insert(index);
        }
        let start = start.ok_or(TrackError::Empty)?;

        let mut visited = vec![false; grid.cells.len()];
        let mut cells = Vec::with_capacity(total);
        visited[start] = true;
        cells.push(start);

        let mut current = start;
        while let Some(next) = grid
            .track_neighbors(current)
            .into_iter()
            .flatten()
            .find(|&n| !visited[n])
        {
            visited[next] = true;
            cells.push(next);
            current = next;
        }

        let closes = grid.track_neighbors(current).contains(&Some(start));
        if cells.len() != total || !closes {
            return Err(TrackError::Disconnected {
                visited: cells.len(),
                total,
            });
        }

        log::debug!("Built loop of {} cells (grid width {})", cells.len(), grid.width);
        Self::from_cells(cells, grid.width)
    }

    /// Accept a prebuilt ordered loop, checking that it really is one
    pub fn from_cells(cells: Vec<usize>, grid_width: usize) -> Result<Self, TrackError> {
        if cells.is_empty() || grid_width == 0 {
            return Err(TrackError::Empty);
        }

        let mut sorted = cells.clone();
        sorted.sort_unstable();
        if let Some(pair) = sorted.windows(2).find(|pair| pair[0] == pair[1]) {
            return Err(TrackError::DuplicateCell { index: pair[0] });
        }

        let n = cells.len();
        let mut segments = Vec::with_capacity(n);
        for k in 0..n {
            let prev = cells[(k + n - 1) % n];
            let cell = cells[k];
            let next = cells[(k + 1) % n];
            if prev == next {
                return Err(TrackError::DeadEnd { index: cell });
            }
            let entry = Direction::between(grid_width, prev, cell)
                .ok_or(TrackError::NotAdjacent { from: prev, to: cell })?;
            let exit = Direction::between(grid_width, cell, next)
                .ok_or(TrackError::NotAdjacent { from: cell, to: next })?;
            segments.push(Segment { cell, entry, exit });
        }

        Ok(Self {
            grid_width,
            cells,
            segments,
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Loop length in arc-length units
    #[inline]
    pub fn length(&self) -> f32 {
        self.cells.len() as f32
    }

    pub fn grid_width(&self) -> usize {
        self.grid_width
    }

    pub fn cells(&self) -> &[usize] {
        &self.cells
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    #[inline]
    pub fn segment(&self, k: usize) -> &Segment {
        &self.segments[k % self.segments.len()]
    }

    #[inline]
    pub fn next_segment(&self, k: usize) -> &Segment {
        self.segment(k + 1)
    }

    /// Wrap an arc-length position into [0, length)
    #[inline]
    pub fn wrap(&self, s: f32) -> f32 {
        let wrapped = s.rem_euclid(self.length());
        // rem_euclid can round up to exactly `length` for tiny negatives
        if wrapped >= self.length() { 0.0 } else { wrapped }
    }

    /// Segment index and fraction through it for a position
    #[inline]
    pub fn locate(&self, s: f32) -> (usize, f32) {
        let s = self.wrap(s);
        let k = (s.floor() as usize).min(self.len() - 1);
        (k, s - k as f32)
    }

    /// Distance driven forward from `from` to reach `to`, in [0, length)
    #[inline]
    pub fn forward_gap(&self, from: f32, to: f32) -> f32 {
        self.wrap(to - from)
    }

    /// Where `a` sits relative to `b` along the loop, in [-length/2, length/2)
    #[inline]
    pub fn signed_offset(&self, a: f32, b: f32) -> f32 {
        let half = self.length() * 0.5;
        self.wrap(a - b + half) - half
    }

    /// Pixel center of a grid cell
    pub fn cell_center(&self, cell: usize, cell_size: f32) -> Vec2 {
        let col = (cell % self.grid_width) as f32;
        let row = (cell / self.grid_width) as f32;
        Vec2::new((col + 0.5) * cell_size, (row + 0.5) * cell_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn assert_valid_loop(grid: &TrackGrid, track: &TrackLoop) {
        assert_eq!(track.len(), grid.track_count());
        for (k, &cell) in track.cells().iter().enumerate() {
            assert_eq!(grid.neighbor_count(cell), 2, "cell {cell} at loop index {k}");
            let next = track.cells()[(k + 1) % track.len()];
            assert!(Direction::between(grid.width, cell, next).is_some());
        }
    }

    #[test]
    fn test_ring_builds_loop() {
        let grid = TrackGrid::ring(12, 10);
        let track = TrackLoop::build(&grid).unwrap();
        assert_eq!(track.len(), 40);
        assert_valid_loop(&grid, &track);

        let corners = track.segments().iter().filter(|s| s.is_corner()).count();
        assert_eq!(corners, 4);
    }

    #[test]
    fn test_walk_starts_east_along_top_row() {
        let grid = TrackGrid::ring(6, 4);
        let track = TrackLoop::build(&grid).unwrap();
        assert_eq!(&track.cells()[..6], &[0, 1, 2, 3, 4, 5]);
        assert!(track.segment(0).is_corner());
        assert!(!track.segment(1).is_corner());
        assert_eq!(track.segment(1).entry, Direction::East);
        assert_eq!(track.segment(0).entry, Direction::North);
    }

    #[test]
    fn test_parse_odd_shape() {
        let grid = TrackGrid::parse(
            "
            ####..
            #ii###
            #iiii#
            ######
            ",
        )
        .unwrap();
        let track = TrackLoop::build(&grid).unwrap();
        assert_valid_loop(&grid, &track);
        assert_eq!(track.len(), grid.track_count());
    }

    #[test]
    fn test_empty_grid_rejected() {
        let grid = TrackGrid::parse("...\n.i.\n...").unwrap();
        assert_eq!(TrackLoop::build(&grid), Err(TrackError::Empty));
    }

    #[test]
    fn test_isolated_cell_is_dead_end() {
        let grid = TrackGrid::parse("...\n.#.\n...").unwrap();
        assert_eq!(TrackLoop::build(&grid), Err(TrackError::DeadEnd { index: 4 }));
    }

    #[test]
    fn test_spur_is_dead_end() {
        let grid = TrackGrid::parse(
            "
            ####.
            #ii##
            ####.
            ",
        )
        .unwrap();
        assert!(matches!(
            TrackLoop::build(&grid),
            Err(TrackError::DeadEnd { .. }) | Err(TrackError::Branch { .. })
        ));
    }

    #[test]
    fn test_branch_rejected() {
        let grid = TrackGrid::parse(
            "
            #####
            #i#i#
            #####
            ",
        )
        .unwrap();
        assert!(matches!(
            TrackLoop::build(&grid),
            Err(TrackError::Branch { neighbors: 3, .. })
        ));
    }

    #[test]
    fn test_two_loops_disconnected() {
        let grid = TrackGrid::parse(
            "
            ###.###
            #i#.#i#
            ###.###
            ",
        )
        .unwrap();
        assert_eq!(
            TrackLoop::build(&grid),
            Err(TrackError::Disconnected {
                visited: 8,
                total: 16
            })
        );
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            TrackGrid::parse("###\n##"),
            Err(TrackError::RaggedGrid { row: 1 })
        );
        assert_eq!(
            TrackGrid::parse("#x#"),
            Err(TrackError::UnknownCell {
                ch: 'x',
                row: 0,
                col: 1
            })
        );
    }

    #[test]
    fn test_from_cells_checks_adjacency() {
        // 2x2 ring: 0 1 / 2 3
        assert!(TrackLoop::from_cells(vec![0, 1, 3, 2], 2).is_ok());
        assert_eq!(
            TrackLoop::from_cells(vec![0, 1, 2, 3], 2),
            Err(TrackError::NotAdjacent { from: 3, to: 0 })
        );
        assert_eq!(
            TrackLoop::from_cells(vec![0, 1, 3, 1], 2),
            Err(TrackError::DuplicateCell { index: 1 })
        );
        assert_eq!(
            TrackLoop::from_cells(vec![0, 1], 2),
            Err(TrackError::DeadEnd { index: 0 })
        );
    }

    #[test]
    fn test_gap_helpers_wrap() {
        let track = TrackLoop::build(&TrackGrid::ring(12, 10)).unwrap();
        assert!((track.forward_gap(39.5, 0.5) - 1.0).abs() < 1e-5);
        assert!((track.signed_offset(0.5, 39.5) - 1.0).abs() < 1e-5);
        assert!((track.signed_offset(39.5, 0.5) + 1.0).abs() < 1e-5);
        assert_eq!(track.locate(41.25), (1, 0.25));
    }

    proptest! {
        #[test]
        fn prop_rectangle_rings_are_loops(
            w in 3usize..12,
            h in 3usize..12,
            pad_x in 0usize..3,
            pad_y in 0usize..3,
        ) {
            let ring = TrackGrid::ring(w, h);
            let width = w + pad_x * 2;
            let mut cells = vec![CellKind::Open; width * (h + pad_y * 2)];
            for row in 0..h {
                for col in 0..w {
                    cells[(row + pad_y) * width + col + pad_x] = ring.cells[row * w + col];
                }
            }
            let grid = TrackGrid::new(width, cells);
            let track = TrackLoop::build(&grid).unwrap();
            assert_valid_loop(&grid, &track);
            prop_assert_eq!(track.len(), 2 * w + 2 * h - 4);
        }

        #[test]
        fn prop_random_grids_never_yield_degenerate_loops(
            bits in proptest::collection::vec(any::<bool>(), 36),
        ) {
            let cells = bits
                .iter()
                .map(|&b| if b { CellKind::Track } else { CellKind::Open })
                .collect();
            let grid = TrackGrid::new(6, cells);
            if let Ok(track) = TrackLoop::build(&grid) {
                assert_valid_loop(&grid, &track);
            }
        }
    }
}
