/// Most photos a listing may carry; the gallery shows one slot per photo.
pub const MAX_PHOTOS: usize = 10;

/// Move the element at `from` to position `to`, shifting the others.
///
/// This is what a drag-and-drop gallery reports on drag end. Indices out of
/// range leave the list unchanged.
pub fn reorder<T: Clone>(list: &[T], from: usize, to: usize) -> Vec<T> {
    let mut out = list.to_vec();
    if from >= out.len() || to >= out.len() || from == to {
        return out;
    }
    let item = out.remove(from);
    out.insert(to, item);
    out
}

/// Number of empty upload slots shown after `count` photos.
pub fn placeholder_slots(count: usize) -> usize {
    MAX_PHOTOS.saturating_sub(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn moves_forward_and_back() {
        assert_eq!(reorder(&[1, 2, 3, 4], 0, 2), vec![2, 3, 1, 4]);
        assert_eq!(reorder(&[1, 2, 3, 4], 3, 1), vec![1, 4, 2, 3]);
    }

    #[test]
    fn out_of_range_is_a_no_op() {
        assert_eq!(reorder(&[1, 2, 3], 5, 0), vec![1, 2, 3]);
        assert_eq!(reorder(&[1, 2, 3], 0, 3), vec![1, 2, 3]);
        assert!(reorder::<u8>(&[], 0, 0).is_empty());
    }

    #[test]
    fn placeholder_slots_saturate() {
        assert_eq!(placeholder_slots(0), MAX_PHOTOS);
        assert_eq!(placeholder_slots(3), MAX_PHOTOS - 3);
        assert_eq!(placeholder_slots(MAX_PHOTOS + 2), 0);
    }
}
