use num_traits::{Float, FromPrimitive};

/// Returns `n` evenly spaced values from `start` to `end`, both
/// inclusive.
///
/// A single value is just `start`.
pub fn linspace<T>(start: T, end: T, n: usize) -> impl Iterator<Item = T>
where
    T: Float + FromPrimitive,
{
    let step = match n {
        0 | 1 => T::zero(),
        _ => (end - start) / T::from_usize(n - 1).unwrap_or_else(T::nan),
    };
    (0..n).map(move |i| start + T::from_usize(i).unwrap_or_else(T::nan) * step)
}

#[cfg(test)]
mod tests {
    use super::linspace;
    use approx::assert_relative_eq;

    #[test]
    fn test_linspace() {
        let values: Vec<f64> = linspace(-1.0, 1.0, 5).collect();
        assert_eq!(values.len(), 5);
        assert_relative_eq!(values[0], -1.0);
        assert_relative_eq!(values[2], 0.0);
        assert_relative_eq!(values[4], 1.0);

        let descending: Vec<f64> = linspace(10.0, 0.0, 3).collect();
        assert_eq!(descending, vec![10.0, 5.0, 0.0]);

        assert_eq!(linspace(3.0, 7.0, 1).collect::<Vec<f64>>(), vec![3.0]);
        assert_eq!(linspace(3.0, 7.0, 0).count(), 0);
    }
}
