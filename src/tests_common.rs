//! Key generators and structural checks shared by this crate's test and
//! property-test modules.

use std::{collections::HashSet, iter};

use crate::{
    nodes::{Edge, NodeRef, Position},
    strings::StringStore,
    Object,
};

/// Generate an iterator of bytestring keys, with increasing length up to a
/// maximum value.
///
/// This iterator will produce `max_len` number of keys. Each key has the form
/// `[0*, u8::MAX]`, meaning zero or more 0 values, followed by a single
/// `u8::MAX` value. The final `u8::MAX` value is added to ensure that no key is
/// a prefix of another key generated by this function.
///
/// # Examples
///
/// ```
/// # use proptrie::tests_common::generate_keys_skewed;
/// let keys = generate_keys_skewed(10).collect::<Vec<_>>();
/// assert_eq!(keys.len(), 10);
/// assert_eq!(keys[0].as_ref(), &[255]);
/// assert_eq!(keys[keys.len() - 1].as_ref(), &[0, 0, 0, 0, 0, 0, 0, 0, 0, 255]);
/// ```
///
/// # Panics
///  - Panics if `max_len` is 0.
pub fn generate_keys_skewed(max_len: usize) -> impl Iterator<Item = Box<[u8]>> {
    assert!(max_len > 0, "the fixed key length must be greater than 0");

    iter::successors(Some(vec![u8::MAX; 1].into_boxed_slice()), move |prev| {
        if prev.len() < max_len {
            let mut key = vec![u8::MIN; prev.len()];
            key.push(u8::MAX);
            Some(key.into_boxed_slice())
        } else {
            None
        }
    })
}

/// Generate an iterator of bytestring keys, all with the same length.
///
/// The `level_widths` argument specifies the number of distinct values
/// generated per digit of the array. For example, using `[3, 2, 1]` will
/// generate keys of length 3.
///
/// # Examples
///
/// ```
/// # use proptrie::tests_common::generate_key_fixed_length;
/// let keys = generate_key_fixed_length([3, 2, 1]).collect::<Vec<_>>();
/// assert_eq!(keys.len(), 24);
/// assert_eq!(keys[0].as_ref(), &[0, 0, 0]);
/// assert_eq!(keys[keys.len() - 1].as_ref(), &[255, 255, 255]);
/// ```
///
/// # Panics
///
///  - Panics if `KEY_LENGTH` is 0.
///  - Panics if any `level_widths` entry is 0.
pub fn generate_key_fixed_length<const KEY_LENGTH: usize>(
    level_widths: [u8; KEY_LENGTH],
) -> impl Iterator<Item = Box<[u8]>> {
    struct FixedLengthKeys<const KEY_LENGTH: usize> {
        increments: [u8; KEY_LENGTH],
        next_value: Option<Box<[u8]>>,
    }

    impl<const KEY_LENGTH: usize> FixedLengthKeys<KEY_LENGTH> {
        pub fn new(level_widths: [u8; KEY_LENGTH]) -> Self {
            fn div_ceil(lhs: u8, rhs: u8) -> u8 {
                let d = lhs / rhs;
                let r = lhs % rhs;
                if r > 0 && rhs > 0 {
                    d + 1
                } else {
                    d
                }
            }

            assert!(KEY_LENGTH > 0, "the fixed key length must be greater than 0");
            assert!(
                level_widths.iter().all(|value_stops| value_stops > &0),
                "the number of distinct values for each key digit must be greater than 0"
            );

            let increments = level_widths.map(|value_stops| div_ceil(u8::MAX, value_stops));

            FixedLengthKeys { increments, next_value: Some(vec![u8::MIN; KEY_LENGTH].into_boxed_slice()) }
        }
    }

    impl<const KEY_LENGTH: usize> Iterator for FixedLengthKeys<KEY_LENGTH> {
        type Item = Box<[u8]>;

        fn next(&mut self) -> Option<Self::Item> {
            let next_value = self.next_value.take()?;

            if next_value.iter().all(|digit| *digit == u8::MAX) {
                return Some(next_value);
            }

            let mut new_next_value = next_value.clone();
            for idx in (0..new_next_value.len()).rev() {
                if new_next_value[idx] == u8::MAX {
                    new_next_value[idx] = u8::MIN;
                } else {
                    new_next_value[idx] = new_next_value[idx].saturating_add(self.increments[idx]);
                    break;
                }
            }

            self.next_value = Some(new_next_value);
            Some(next_value)
        }
    }

    FixedLengthKeys::new(level_widths)
}

/// A single expansion of an existing fixed-length key that takes the value at
/// a specified index and repeats it multiple times.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrefixExpansion {
    /// The index in an unspecified sequence that will be copied.
    pub base_index: usize,
    /// The number of copies of the original element to create.
    pub expanded_length: usize,
}

/// Generate an iterator of fixed length bytestring keys, where specific
/// portions of the key are expanded as duplicate bytes.
///
/// This is meant to simulate keys with shared prefixes, useful for exercising
/// the crit-bit trie's splitting logic along long common runs (`spec.md`
/// §8's "trie structure" property).
///
/// # Panics
///
///  - Panics if `KEY_LENGTH` is 0.
///  - Panics if any `level_widths` entry is 0.
///  - Panics if any `PrefixExpansion` has `expanded_length` equal to 0.
///  - Panics if any `PrefixExpansion` has `base_index` greater than or equal
///    to `KEY_LENGTH`.
pub fn generate_key_with_prefix<const KEY_LENGTH: usize>(
    level_widths: [u8; KEY_LENGTH],
    prefix_expansions: impl AsRef<[PrefixExpansion]>,
) -> impl Iterator<Item = Box<[u8]>> {
    fn apply_expansions_to_key(
        old_key: &[u8],
        new_key_template: &[u8],
        sorted_expansions: &[PrefixExpansion],
    ) -> Box<[u8]> {
        let mut new_key: Box<[u8]> = new_key_template.into();
        let mut new_key_index = 0usize;
        let mut old_key_index = 0usize;

        for expansion in sorted_expansions {
            let before_len = expansion.base_index - old_key_index;
            new_key[new_key_index..(new_key_index + before_len)]
                .copy_from_slice(&old_key[old_key_index..expansion.base_index]);
            new_key[(new_key_index + before_len)..(new_key_index + before_len + expansion.expanded_length)]
                .fill(old_key[expansion.base_index]);

            old_key_index = expansion.base_index + 1;
            new_key_index += before_len + expansion.expanded_length;
        }

        new_key[new_key_index..].copy_from_slice(&old_key[old_key_index..]);

        new_key
    }

    let expansions = prefix_expansions.as_ref();

    assert!(
        expansions.iter().all(|expand| expand.base_index < KEY_LENGTH),
        "the prefix expansion index must be less than `KEY_LENGTH`."
    );
    assert!(
        expansions.iter().all(|expand| expand.expanded_length > 0),
        "the prefix expansion length must be greater than 0."
    );
    {
        let mut uniq_indices = HashSet::new();
        assert!(
            expansions.iter().all(|expand| uniq_indices.insert(expand.base_index)),
            "the prefix expansion index must be unique"
        );
    }

    let mut sorted_expansions = expansions.to_vec();
    sorted_expansions.sort_by(|a, b| a.base_index.cmp(&b.base_index));

    let full_key_len =
        expansions.iter().map(|expand| expand.expanded_length - 1).sum::<usize>() + KEY_LENGTH;
    let full_key_template = vec![u8::MIN; full_key_len].into_boxed_slice();

    generate_key_fixed_length(level_widths)
        .map(move |key| apply_expansions_to_key(&key, &full_key_template, &sorted_expansions))
}

/// Walk an object's whole property trie and check every structural
/// invariant `spec.md` §3 names (leaf/inner counts, distinct leaf names,
/// child-side crit-bit agreement, strictly-increasing positions, and
/// parent back-links), returning `Err` describing the first one violated.
///
/// Used by the proptest suite after every mutation, alongside the
/// `HashMap`-oracle comparison, to cover the one invariant a pure
/// key/value comparison against an oracle can't see: the shape of the
/// trie itself.
pub fn check_invariants(obj: &Object) -> Result<(), String> {
    let store = StringStore::new();
    let mut leaf_names = HashSet::new();
    let mut leaf_count = 0usize;
    let mut inner_count = 0usize;

    match obj.root_edge() {
        None => {
            if obj.len() != 0 {
                return Err(format!("root is null but len() == {}", obj.len()));
            }
        },
        Some(root) => {
            walk(root, None, None, &store, &mut leaf_names, &mut leaf_count, &mut inner_count)?;
        },
    }

    if leaf_count != obj.len() {
        return Err(format!("leaf count {leaf_count} != property count {}", obj.len()));
    }
    if leaf_count > 0 && inner_count != leaf_count - 1 {
        return Err(format!("inner count {inner_count} != leaf count - 1 ({})", leaf_count - 1));
    }

    Ok(())
}

fn walk(
    edge: Edge,
    parent: Option<Edge>,
    lower_bound: Option<Position>,
    store: &StringStore,
    leaf_names: &mut HashSet<Vec<u8>>,
    leaf_count: &mut usize,
    inner_count: &mut usize,
) -> Result<(), String> {
    // SAFETY: `edge` is reachable from `obj`'s root, which outlives this
    // whole walk since it's only ever called with a live `&Object`.
    let actual_parent = unsafe { edge.parent() };
    if actual_parent != parent {
        return Err(format!(
            "parent back-link mismatch at {edge:?}: expected {parent:?}, found {actual_parent:?}"
        ));
    }

    match edge.classify() {
        NodeRef::Leaf(leaf) => {
            *leaf_count += 1;
            // SAFETY: obtained from classifying a live edge.
            let name = unsafe { leaf.as_ref() }.name;
            let bytes =
                store.get_string(name).ok_or_else(|| format!("leaf {edge:?} name is not a string value"))?;
            if !leaf_names.insert(bytes.clone()) {
                return Err(format!("duplicate leaf name {bytes:?}"));
            }
        },
        NodeRef::Inner(inner) => {
            *inner_count += 1;
            // SAFETY: obtained from classifying a live edge.
            let node = unsafe { inner.as_ref() };
            if let Some(bound) = lower_bound {
                if node.position <= bound {
                    return Err(format!(
                        "position {:?} did not strictly increase past parent position {:?}",
                        node.position, bound
                    ));
                }
            }
            for dir in 0..2 {
                check_subtree_direction(node.child[dir], dir, node.position, store)?;
                walk(node.child[dir], Some(edge), Some(node.position), store, leaf_names, leaf_count, inner_count)?;
            }
        },
    }
    Ok(())
}

/// Every leaf reachable under `edge` must have `expected_dir` as its
/// crit-bit direction at `position` — `spec.md` §3 invariant 3.
fn check_subtree_direction(
    edge: Edge,
    expected_dir: usize,
    position: Position,
    store: &StringStore,
) -> Result<(), String> {
    match edge.classify() {
        NodeRef::Leaf(leaf) => {
            // SAFETY: obtained from classifying a live edge.
            let name = unsafe { leaf.as_ref() }.name;
            let bytes = store.get_string(name).unwrap_or_default();
            let byte = bytes.get(position.byte as usize).copied().unwrap_or(0);
            let dir = position.direction(byte);
            if dir != expected_dir {
                return Err(format!(
                    "leaf {bytes:?} has crit-bit direction {dir} at byte {} mask {:#010b}, but sits under child[{expected_dir}]",
                    position.byte, position.mask
                ));
            }
            Ok(())
        },
        NodeRef::Inner(inner) => {
            // SAFETY: obtained from classifying a live edge.
            let node = unsafe { inner.as_ref() };
            check_subtree_direction(node.child[0], expected_dir, position, store)?;
            check_subtree_direction(node.child[1], expected_dir, position, store)
        },
    }
}
