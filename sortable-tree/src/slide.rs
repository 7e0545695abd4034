/// Move the block `rows[swap_from..swap_from + swap_length]` so that it
/// starts at `swap_to` in the result.
///
/// The output has the same length as the input. Out-of-range bounds are
/// clamped to the slice.
pub fn slide_rows<T: Clone>(
    rows: &[T],
    swap_from: usize,
    swap_to: usize,
    swap_length: usize,
) -> Vec<T> {
    let start = swap_from.min(rows.len());
    let end = swap_from.saturating_add(swap_length).min(rows.len());
    let moved = &rows[start..end];

    let mut rest: Vec<T> = Vec::with_capacity(rows.len());
    rest.extend_from_slice(&rows[..start]);
    rest.extend_from_slice(&rows[end..]);

    let at = swap_to.min(rest.len());
    let mut slid = Vec::with_capacity(rows.len());
    slid.extend_from_slice(&rest[..at]);
    slid.extend_from_slice(moved);
    slid.extend_from_slice(&rest[at..]);
    slid
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_equal_bounds_when_sliding_then_rows_are_unchanged() {
        let rows = vec!['a', 'b', 'c', 'd', 'e'];

        for start in 0..rows.len() {
            for length in 0..3 {
                assert_eq!(slide_rows(&rows, start, start, length), rows);
            }
        }
    }

    #[test]
    fn given_block_when_slid_down_then_it_starts_at_target() {
        let rows = vec!['a', 'b', 'c', 'd', 'e'];

        assert_eq!(slide_rows(&rows, 0, 2, 2), vec!['c', 'd', 'a', 'b', 'e']);
    }

    #[test]
    fn given_block_when_slid_up_then_rows_outside_window_keep_order() {
        let rows = vec!['a', 'b', 'c', 'd', 'e', 'f'];

        let slid = slide_rows(&rows, 3, 1, 2);

        assert_eq!(slid, vec!['a', 'd', 'e', 'b', 'c', 'f']);
        assert_eq!(slid[0], 'a');
        assert_eq!(slid[5], 'f');
    }

    #[test]
    fn given_out_of_range_bounds_when_sliding_then_length_is_kept() {
        let rows = vec!['a', 'b', 'c'];

        assert_eq!(slide_rows(&rows, 2, 9, 5), vec!['a', 'b', 'c']);
        assert_eq!(slide_rows(&rows, 9, 0, 1), vec!['a', 'b', 'c']);
        assert_eq!(slide_rows(&rows, 1, 9, 1), vec!['a', 'c', 'b']);
    }
}
