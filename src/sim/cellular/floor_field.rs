//! Static floor fields: distance from every cell to the nearest exit cell.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::f64::consts::SQRT_2;

use crate::sim::config::FloorFieldKind;

use super::scenario::Cell;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Visit {
    cost: f64,
    cell: usize,
}

impl Eq for Visit {}

impl Ord for Visit {
    // Reversed so that BinaryHeap pops the cheapest visit first
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.cell.cmp(&self.cell))
    }
}

impl PartialOrd for Visit {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

static ORTHOGONAL: [(isize, isize, f64); 4] =
    [(-1, 0, 1.0), (1, 0, 1.0), (0, -1, 1.0), (0, 1, 1.0)];
static DIAGONAL: [(isize, isize, f64); 4] = [
    (-1, -1, SQRT_2),
    (-1, 1, SQRT_2),
    (1, -1, SQRT_2),
    (1, 1, SQRT_2),
];

/// Computes the floor field of a row-major grid, in meters.
///
/// Cells with no path to an exit get `f64::INFINITY`. The Manhattan field
/// ignores obstacles, the Dijkstra fields route around them.
pub fn compute(
    cells: &[Cell],
    rows: usize,
    cols: usize,
    cell_dimension: f64,
    kind: FloorFieldKind,
) -> Vec<f64> {
    let (steps, through_obstacles): (Vec<_>, bool) = match kind {
        FloorFieldKind::DijkstraStaticMoore => (ORTHOGONAL.iter().chain(&DIAGONAL).collect(), false),
        FloorFieldKind::DijkstraStaticVonNeumann => (ORTHOGONAL.iter().collect(), false),
        FloorFieldKind::ManhattanStatic => (ORTHOGONAL.iter().collect(), true),
    };

    let mut dist = vec![f64::INFINITY; cells.len()];
    let mut heap = BinaryHeap::new();
    for (i, cell) in cells.iter().enumerate() {
        if *cell == Cell::Exit {
            dist[i] = 0.0;
            heap.push(Visit { cost: 0.0, cell: i });
        }
    }

    while let Some(Visit { cost, cell }) = heap.pop() {
        if cost > dist[cell] {
            continue;
        }
        let (r, c) = (cell / cols, cell % cols);
        for &&(dr, dc, step) in &steps {
            let (Some(nr), Some(nc)) = (r.checked_add_signed(dr), c.checked_add_signed(dc)) else {
                continue;
            };
            if nr >= rows || nc >= cols {
                continue;
            }
            let next = nr * cols + nc;
            if !through_obstacles && cells[next] == Cell::Blocked {
                continue;
            }
            let candidate = cost + step;
            if candidate < dist[next] {
                dist[next] = candidate;
                heap.push(Visit {
                    cost: candidate,
                    cell: next,
                });
            }
        }
    }

    dist.iter_mut().for_each(|d| *d *= cell_dimension);
    dist
}

#[cfg(test)]
mod tests {
    use super::*;

    // 3x3 grid, exit in the bottom-left corner, wall in the middle column
    // except for the top row:
    //
    //   . . .
    //   . # .
    //   E # .
    fn grid() -> Vec<Cell> {
        use Cell::*;
        vec![Exit, Blocked, Free, Free, Blocked, Free, Free, Free, Free]
    }

    #[test]
    fn test_manhattan_ignores_obstacles() {
        let d = compute(&grid(), 3, 3, 1.0, FloorFieldKind::ManhattanStatic);
        assert_eq!(d[0], 0.0);
        assert_eq!(d[2], 2.0);
        assert_eq!(d[8], 4.0);
    }

    #[test]
    fn test_von_neumann_routes_around() {
        let d = compute(&grid(), 3, 3, 1.0, FloorFieldKind::DijkstraStaticVonNeumann);
        assert_eq!(d[3], 1.0);
        assert_eq!(d[7], 3.0);
        // Bottom-right cell has to go over the top row
        assert_eq!(d[2], 6.0);
        assert!(d[1].is_infinite());
    }

    #[test]
    fn test_moore_uses_diagonals() {
        let d = compute(&grid(), 3, 3, 0.5, FloorFieldKind::DijkstraStaticMoore);
        // (2,1) -> (1,0) -> (0,0)
        assert!((d[7] - 0.5 * (1.0 + SQRT_2)).abs() < 1e-12);
        // (1,2) -> (2,1) -> (1,0) -> (0,0)
        assert!((d[5] - 0.5 * (1.0 + 2.0 * SQRT_2)).abs() < 1e-12);
    }

    #[test]
    fn test_no_exit_is_infinite() {
        let cells = vec![Cell::Free; 4];
        let d = compute(&cells, 2, 2, 1.0, FloorFieldKind::DijkstraStaticMoore);
        assert!(d.iter().all(|x| x.is_infinite()));
    }
}
