use spirv_std::arch::IndexUnchecked;

use crate::{DDGI_TRACE_RAYS_GROUP_SIZE_X, DDGI_TRACE_RAYS_PROBES_COUNT_LIMIT};

/// Number of words occupied by a single batch's arguments: trace dispatch
/// followed by probe-update dispatch, `(x, y, z)` each.
pub const DDGI_INDIRECT_ARGS_STRIDE: u32 = 6;

/// Returns number of batches required to process given number of probes.
pub fn batches_needed(probes_count: u32) -> u32 {
    (probes_count + DDGI_TRACE_RAYS_PROBES_COUNT_LIMIT - 1)
        / DDGI_TRACE_RAYS_PROBES_COUNT_LIMIT
}

/// Splits active probes into batches and writes dispatch arguments for each
/// of them.
///
/// Exactly `batches_capacity` batches get written - batches without any
/// probes get zero-sized dispatches and probes that don't fit within the
/// capacity are dropped for this frame.
pub fn build_indirect_args(
    active_count: u32,
    rays_count: u32,
    batches_capacity: u32,
    args: &mut [u32],
) {
    let trace_groups = (rays_count + DDGI_TRACE_RAYS_GROUP_SIZE_X - 1)
        / DDGI_TRACE_RAYS_GROUP_SIZE_X;

    let mut batch = 0;

    while batch < batches_capacity {
        let batch_offset = batch * DDGI_TRACE_RAYS_PROBES_COUNT_LIMIT;

        let probes = if active_count > batch_offset {
            (active_count - batch_offset).min(DDGI_TRACE_RAYS_PROBES_COUNT_LIMIT)
        } else {
            0
        };

        let (trace, update) = if probes > 0 {
            ([trace_groups, probes, 1], [probes, 1, 1])
        } else {
            ([0; 3], [0; 3])
        };

        let base = (batch * DDGI_INDIRECT_ARGS_STRIDE) as usize;

        unsafe {
            *args.index_unchecked_mut(base) = trace[0];
            *args.index_unchecked_mut(base + 1) = trace[1];
            *args.index_unchecked_mut(base + 2) = trace[2];
            *args.index_unchecked_mut(base + 3) = update[0];
            *args.index_unchecked_mut(base + 4) = update[1];
            *args.index_unchecked_mut(base + 5) = update[2];
        }

        batch += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batches_needed() {
        assert_eq!(0, super::batches_needed(0));
        assert_eq!(1, super::batches_needed(1));
        assert_eq!(1, super::batches_needed(4096));
        assert_eq!(2, super::batches_needed(4097));
        assert_eq!(3, super::batches_needed(3 * 4096));
    }

    #[test]
    fn single_batch() {
        let mut args = [123; 12];

        build_indirect_args(100, 64, 2, &mut args);

        assert_eq!([2, 100, 1, 100, 1, 1], args[0..6]);
        assert_eq!([0; 6], args[6..12]);
    }

    #[test]
    fn multiple_batches() {
        let mut args = [0; 18];

        build_indirect_args(4096 + 10, 100, 3, &mut args);

        assert_eq!([4, 4096, 1, 4096, 1, 1], args[0..6]);
        assert_eq!([4, 10, 1, 10, 1, 1], args[6..12]);
        assert_eq!([0; 6], args[12..18]);
    }

    #[test]
    fn overflowing_batches_are_dropped() {
        let mut args = [0; 6];

        build_indirect_args(3 * 4096, 256, 1, &mut args);

        assert_eq!([8, 4096, 1, 4096, 1, 1], args);
    }
}
