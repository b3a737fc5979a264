use crate::stack::Stack;
use log::debug;
use ndarray::Axis;

/// Returns `stack` with its slices in ascending order of start time.
///
/// One permutation is applied to the slice times and to every field,
/// so slice `i` of each field still belongs to `times[i]`. Slices with
/// equal start times keep their relative order.
pub fn order(stack: Stack) -> Stack {
    let Stack {
        x,
        y,
        times,
        fields,
    } = stack;

    let mut permutation: Vec<usize> = (0..times.len()).collect();
    permutation.sort_by_key(|&idx| times[idx].start());
    if permutation.iter().enumerate().all(|(pos, &idx)| pos == idx) {
        return Stack {
            x,
            y,
            times,
            fields,
        };
    }
    debug!("reordering {} slices", times.len());

    let times = permutation.iter().map(|&idx| times[idx]).collect();
    let fields = fields
        .into_iter()
        .map(|(field, samples)| (field, samples.select(Axis(0), &permutation)))
        .collect();
    Stack {
        x,
        y,
        times,
        fields,
    }
}
