//! Max-min fair division of a capacity among competing demands.

/// Divides `capacity` among `demands` so that no consumer gets more than it asked for and the
/// leftover of small consumers is split equally among the rest (water filling).
///
/// The result is index-aligned with `demands` and its sum never exceeds `capacity`.
pub fn max_min_fair(capacity: f64, demands: &[f64]) -> Vec<f64> {
    let mut shares = vec![0.; demands.len()];
    if demands.is_empty() || capacity <= 0. {
        return shares;
    }
    let mut order: Vec<usize> = (0..demands.len()).collect();
    // ties are resolved by index so the division is deterministic
    order.sort_by(|&a, &b| demands[a].total_cmp(&demands[b]).then(a.cmp(&b)));

    let mut left = capacity;
    let mut unserved = demands.len();
    for idx in order {
        let fair = left / unserved as f64;
        let share = demands[idx].max(0.).min(fair);
        shares[idx] = share;
        left -= share;
        unserved -= 1;
    }
    shares
}

#[cfg(test)]
mod tests {
    use super::max_min_fair;

    #[test]
    fn equal_demands_get_equal_shares() {
        assert_eq!(max_min_fair(3000., &[2500., 2500.]), vec![1500., 1500.]);
    }

    #[test]
    fn small_demands_are_fully_served() {
        let shares = max_min_fair(6000., &[1000., 4000., 4000.]);
        assert_eq!(shares, vec![1000., 2500., 2500.]);
    }

    #[test]
    fn spare_capacity_stays_unused() {
        let shares = max_min_fair(6000., &[2500.]);
        assert_eq!(shares, vec![2500.]);
    }

    #[test]
    fn sum_never_exceeds_capacity() {
        let demands = [700., 1300., 100., 2500., 2500., 90.];
        for capacity in [0., 10., 999., 3000., 6000., 10000.] {
            let total: f64 = max_min_fair(capacity, &demands).iter().sum();
            assert!(total <= capacity + 1e-9);
        }
    }
}
