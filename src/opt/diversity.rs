//! Population diversity for genomes that are sets of points on a circle.

/// Mean distance between the genomes of a population.
///
/// The distance from genome `a` to genome `b` is the sum, over the genes of
/// `a`, of the circular distance (period `range`) to the nearest gene of `b`.
/// It ignores gene order and is averaged over all ordered pairs of distinct
/// individuals. Populations with fewer than two individuals have no diversity.
pub fn circular_set_diversity(population: &[Vec<f64>], range: f64) -> f64 {
    let mu = population.len();
    if mu < 2 {
        return 0.0;
    }
    let mut total = 0.0;
    for (i, a) in population.iter().enumerate() {
        for (j, b) in population.iter().enumerate() {
            if i != j {
                total += set_distance(a, b, range);
            }
        }
    }
    total / (mu * (mu - 1)) as f64
}

fn set_distance(a: &[f64], b: &[f64], range: f64) -> f64 {
    a.iter()
        .map(|&x| {
            b.iter()
                .map(|&y| {
                    let d = (x - y).abs();
                    d.min(range - d)
                })
                .fold(f64::INFINITY, f64::min)
        })
        .filter(|d| d.is_finite())
        .sum()
}
