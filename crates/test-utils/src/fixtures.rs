//! Common test fixtures for spectral-recovery tests.
//!
//! This module provides pre-defined trajectories and grids whose recovery
//! metrics are known by hand.

/// Canonical single-pixel trajectories.
pub mod series {
    /// Disturbed in 2001, recovering through 2006.
    ///
    /// With `rest_start = 2001` and `timestep = 5`:
    /// RRI = (110 - 60) / (70 - 60) = 5.
    pub const RRI_FIRST_YEAR: i32 = 2000;
    pub const RRI_REST_START: i32 = 2001;
    pub const RRI_SERIES: [f64; 7] = [70.0, 60.0, 70.0, 80.0, 90.0, 100.0, 110.0];
    pub const RRI_EXPECTED: f64 = 5.0;

    /// Steady climb from 2010.
    ///
    /// With `rest_start = 2010` and `timestep = 5`: dNBR = 100 - 50 = 50.
    pub const DNBR_FIRST_YEAR: i32 = 2010;
    pub const DNBR_SERIES: [f64; 6] = [50.0, 60.0, 70.0, 80.0, 90.0, 100.0];
    pub const DNBR_EXPECTED: f64 = 50.0;

    /// Reaches 80% of a target of 100 in the second year.
    pub const Y2R_FIRST_YEAR: i32 = 2020;
    pub const Y2R_SERIES: [f64; 3] = [70.0, 80.0, 90.0];
    pub const Y2R_TARGET: f64 = 100.0;
    pub const Y2R_EXPECTED: f64 = 1.0;
}

/// Common grid specifications for testing.
pub mod grid {
    /// A small north-up grid of unit cells.
    pub const SMALL: GridSpec = GridSpec {
        rows: 5,
        cols: 5,
        top: 5.0,
        left: 0.0,
        cell_size: 1.0,
    };

    /// A Landsat-like 30 m grid.
    pub const LANDSAT_TILE: GridSpec = GridSpec {
        rows: 64,
        cols: 64,
        top: 5_400_000.0,
        left: 500_000.0,
        cell_size: 30.0,
    };

    /// Grid specification: north-up, square cells.
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct GridSpec {
        pub rows: usize,
        pub cols: usize,
        /// Y of the top edge.
        pub top: f64,
        /// X of the left edge.
        pub left: f64,
        pub cell_size: f64,
    }

    impl GridSpec {
        /// Cell-centre `y` coordinates, descending.
        pub fn y(&self) -> Vec<f64> {
            crate::generators::descending_coords(self.rows, self.top, self.cell_size)
        }

        /// Cell-centre `x` coordinates, ascending.
        pub fn x(&self) -> Vec<f64> {
            crate::generators::ascending_coords(self.cols, self.left, self.cell_size)
        }

        /// Ring of a rectangle over the cells `rows` x `cols` (inclusive
        /// ranges), inset by a quarter cell so only their centres fall inside.
        pub fn cell_rect(
            &self,
            rows: (usize, usize),
            cols: (usize, usize),
        ) -> [(f64, f64); 5] {
            let quarter = self.cell_size / 4.0;
            let x_min = self.left + cols.0 as f64 * self.cell_size + quarter;
            let x_max = self.left + (cols.1 + 1) as f64 * self.cell_size - quarter;
            let y_max = self.top - rows.0 as f64 * self.cell_size - quarter;
            let y_min = self.top - (rows.1 + 1) as f64 * self.cell_size + quarter;
            [
                (x_min, y_min),
                (x_max, y_min),
                (x_max, y_max),
                (x_min, y_max),
                (x_min, y_min),
            ]
        }
    }
}
