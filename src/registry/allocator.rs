//! Project id allocation
//!
//! Picks the lowest free id from the set of ids already present in the
//! project files.

use crate::error::RegistryError;

/// Smallest project id handed out to a managed directory
pub const MIN_PROJECT_ID: u32 = 1;

/// Largest project id handed out to a managed directory
pub const MAX_PROJECT_ID: u32 = u32::MAX - 1;

/// Pick the lowest id in `[MIN_PROJECT_ID, MAX_PROJECT_ID]` not already taken.
///
/// Ids outside the managed range are ignored, so foreign entries in the
/// project files never block allocation.
pub fn first_free_id(ids: Vec<u32>) -> Result<u32, RegistryError> {
    first_free_in_range(ids, MIN_PROJECT_ID, MAX_PROJECT_ID)
}

fn first_free_in_range(mut ids: Vec<u32>, min: u32, max: u32) -> Result<u32, RegistryError> {
    ids.retain(|id| (min..=max).contains(id));
    ids.sort_unstable();
    ids.dedup();

    // Sorted and deduplicated, so the first entry that does not sit at
    // min + offset marks the lowest gap.
    for (offset, id) in ids.iter().enumerate() {
        let candidate = min + offset as u32;
        if *id != candidate {
            return Ok(candidate);
        }
    }

    let next = min as u64 + ids.len() as u64;
    if next > max as u64 {
        return Err(RegistryError::IdSpaceExhausted);
    }
    Ok(next as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocates_min_id_when_empty() {
        assert_eq!(first_free_id(Vec::new()).unwrap(), MIN_PROJECT_ID);
    }

    #[test]
    fn test_fills_lowest_gap() {
        assert_eq!(first_free_id(vec![1, 2, 4, 5]).unwrap(), 3);
    }

    #[test]
    fn test_extends_past_dense_prefix() {
        assert_eq!(first_free_id(vec![1, 2, 3]).unwrap(), 4);
    }

    #[test]
    fn test_unsorted_input_is_tolerated() {
        assert_eq!(first_free_id(vec![5, 1, 3, 2]).unwrap(), 4);
    }

    #[test]
    fn test_ignores_duplicates_and_out_of_range_ids() {
        // 0 and u32::MAX are never handed out, duplicates collapse
        assert_eq!(first_free_id(vec![0, 1, 1, 2, u32::MAX]).unwrap(), 3);
    }

    #[test]
    fn test_exhausted_range() {
        let result = first_free_in_range(vec![1, 2, 3], 1, 3);
        assert!(matches!(result, Err(RegistryError::IdSpaceExhausted)));
    }

    #[test]
    fn test_gap_at_min() {
        assert_eq!(first_free_id(vec![2, 3]).unwrap(), 1);
    }
}
