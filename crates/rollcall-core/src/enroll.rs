//! Multi-sample template folding.
//!
//! Enrollment captures several images of the same face; each valid image
//! yields one descriptor, and the canonical template is their
//! componentwise mean.

use crate::types::Descriptor;

/// Fold several descriptors into one canonical template vector.
///
/// The dimension is fixed by the first descriptor; any descriptor of a
/// different length is discarded before averaging and does not count
/// toward the divisor. Returns `None` when the input is empty.
/// Deterministic for a fixed input set.
pub fn average(descriptors: &[Descriptor]) -> Option<Descriptor> {
    let first = descriptors.first()?;
    let dim = first.dim();

    let mut sum = vec![0.0f64; dim];
    let mut kept = 0usize;

    for d in descriptors {
        if d.dim() != dim {
            tracing::warn!(
                expected = dim,
                got = d.dim(),
                "discarding descriptor with unexpected dimension"
            );
            continue;
        }
        for (acc, x) in sum.iter_mut().zip(d.values.iter()) {
            *acc += f64::from(*x);
        }
        kept += 1;
    }

    // kept >= 1: the first descriptor always matches its own dimension.
    let n = kept as f64;
    Some(Descriptor::new(
        sum.into_iter().map(|x| (x / n) as f32).collect(),
    ))
}
