use anyhow::{Result, ensure};

use crate::domain::DomainView;
use crate::geom::rectangle::Rectangle;
use crate::sim::config::{FloorFieldKind, NeighbourhoodKind};

use super::floor_field;

/// State of one grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cell {
    Free,
    /// Covered by an obstacle.
    Blocked,
    /// Touched by an access. Stepping here means leaving the domain.
    Exit,
}

const VON_NEUMANN: [(isize, isize); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];
const MOORE: [(isize, isize); 8] = [
    (-1, 0),
    (1, 0),
    (0, -1),
    (0, 1),
    (-1, -1),
    (-1, 1),
    (1, -1),
    (1, 1),
];

/// Row and column steps to the neighbours of a cell.
pub fn offsets(kind: NeighbourhoodKind) -> &'static [(isize, isize)] {
    match kind {
        NeighbourhoodKind::Moore => &MOORE,
        NeighbourhoodKind::VonNeumann => &VON_NEUMANN,
    }
}

/// A domain view rasterized into square cells, together with its static floor field.
///
/// Cells are stored row-major, row 0 being the bottom of the domain.
#[derive(Debug, Clone)]
pub struct Scenario {
    rows: usize,
    cols: usize,
    cell_dimension: f64,
    diameter: f64,
    cells: Vec<Cell>,
    exits: Vec<usize>,
    floor_field: Vec<f64>,
}

impl Scenario {
    pub fn new(view: &DomainView, cell_dimension: f64, kind: FloorFieldKind) -> Result<Self> {
        ensure!(
            cell_dimension.is_finite() && cell_dimension > 0.0,
            "Cell dimension must be positive, got {cell_dimension}"
        );
        // Tolerance keeps e.g. 50 / 0.4 from rounding up to an extra column
        let cols = (view.width() / cell_dimension - 1e-9).ceil().max(1.0) as usize;
        let rows = (view.height() / cell_dimension - 1e-9).ceil().max(1.0) as usize;

        let mut cells = Vec::with_capacity(rows * cols);
        let mut exits = vec![];
        for r in 0..rows {
            for c in 0..cols {
                let rect = Rectangle::new(
                    c as f64 * cell_dimension,
                    r as f64 * cell_dimension,
                    cell_dimension,
                    cell_dimension,
                );
                let (cx, cy) = (
                    rect.left + 0.5 * cell_dimension,
                    rect.bottom + 0.5 * cell_dimension,
                );
                let cell = if view.obstacles().iter().any(|o| o.contains(cx, cy)) {
                    Cell::Blocked
                } else if view.accesses().any(|a| a.shape.overlaps(&rect)) {
                    Cell::Exit
                } else {
                    Cell::Free
                };
                if cell == Cell::Exit {
                    exits.push(r * cols + c);
                }
                cells.push(cell);
            }
        }

        let floor_field = floor_field::compute(&cells, rows, cols, cell_dimension, kind);

        Ok(Self {
            rows,
            cols,
            cell_dimension,
            diameter: view.width().hypot(view.height()),
            cells,
            exits,
            floor_field,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn num_cells(&self) -> usize {
        self.cells.len()
    }

    pub fn cell_dimension(&self) -> f64 {
        self.cell_dimension
    }

    /// Diagonal of the domain this scenario was built from.
    pub fn diameter(&self) -> f64 {
        self.diameter
    }

    pub fn cell(&self, index: usize) -> Cell {
        self.cells[index]
    }

    pub fn exits(&self) -> &[usize] {
        &self.exits
    }

    /// Floor field value of a cell in meters. Infinite where no exit is reachable.
    pub fn floor_field(&self, index: usize) -> f64 {
        self.floor_field[index]
    }

    pub fn center(&self, index: usize) -> (f64, f64) {
        let (r, c) = (index / self.cols, index % self.cols);
        (
            (c as f64 + 0.5) * self.cell_dimension,
            (r as f64 + 0.5) * self.cell_dimension,
        )
    }

    /// Cell reached from `index` by the step `(dr, dc)`, if it lies on the grid.
    pub fn neighbour(&self, index: usize, dr: isize, dc: isize) -> Option<usize> {
        let r = (index / self.cols).checked_add_signed(dr)?;
        let c = (index % self.cols).checked_add_signed(dc)?;
        (r < self.rows && c < self.cols).then_some(r * self.cols + c)
    }

    /// Straight-line distance from the center of `index` to the closest exit cell.
    ///
    /// Capped at the domain diameter, which is also returned when there is no exit.
    pub fn distance_to_closest_exit(&self, index: usize) -> f64 {
        let (x, y) = self.center(index);
        self.exits
            .iter()
            .map(|&e| {
                let (ex, ey) = self.center(e);
                (ex - x).hypot(ey - y)
            })
            .fold(self.diameter, f64::min)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Access, Domain};

    fn room() -> Domain {
        Domain::new("room", 4.0, 2.0)
            .unwrap()
            .with_obstacle(Rectangle::new(1.0, 1.0, 1.0, 1.0))
            .unwrap()
    }

    #[test]
    fn test_rasterization() {
        let d = room();
        let exits = vec![Access::new(0, "door", Rectangle::new(3.0, 0.0, 1.0, 0.1))];
        let s = Scenario::new(&d.view(&exits), 1.0, FloorFieldKind::DijkstraStaticMoore).unwrap();
        assert_eq!(s.rows(), 2);
        assert_eq!(s.cols(), 4);
        assert_eq!(s.cell(5), Cell::Blocked);
        assert_eq!(s.cell(3), Cell::Exit);
        assert_eq!(s.exits(), &[3]);
        assert_eq!(s.cell(0), Cell::Free);
    }

    #[test]
    fn test_exact_multiple_does_not_add_columns() {
        let d = Domain::new("d", 50.0, 25.0).unwrap();
        let s = Scenario::new(&d.view(&[]), 0.4, FloorFieldKind::ManhattanStatic).unwrap();
        assert_eq!(s.cols(), 125);
        assert_eq!(s.rows(), 63);
    }

    #[test]
    fn test_neighbour_stays_on_grid() {
        let d = room();
        let s = Scenario::new(&d.view(&[]), 1.0, FloorFieldKind::ManhattanStatic).unwrap();
        assert_eq!(s.neighbour(0, -1, 0), None);
        assert_eq!(s.neighbour(0, 0, -1), None);
        assert_eq!(s.neighbour(0, 1, 1), Some(5));
        assert_eq!(s.neighbour(7, 0, 1), None);
    }

    #[test]
    fn test_distance_without_exits_is_diameter() {
        let d = room();
        let s = Scenario::new(&d.view(&[]), 1.0, FloorFieldKind::ManhattanStatic).unwrap();
        assert!((s.distance_to_closest_exit(0) - 20.0_f64.sqrt()).abs() < 1e-12);
        assert!(s.floor_field(0).is_infinite());
    }

    #[test]
    fn test_rejects_bad_cell_dimension() {
        let d = room();
        assert!(Scenario::new(&d.view(&[]), 0.0, FloorFieldKind::ManhattanStatic).is_err());
    }
}
