//! Property 4 of the design document, exercised over randomly generated
//! OIDs rather than the fixed examples already covered by `oid.rs`'s
//! module-local tests.

use rand::Rng;
use rsnmp::Oid;
use std::cmp::Ordering;

fn random_oid(rng: &mut impl Rng, len: usize) -> Oid {
    let first = rng.gen_range(0..=2u32);
    let second = if first < 2 { rng.gen_range(0..=39u32) } else { rng.gen_range(0..=1000u32) };
    let mut parts = vec![first, second];
    for _ in 2..len {
        parts.push(rng.gen_range(0..=100_000u32));
    }
    Oid::from_parts(parts)
}

#[test]
fn prefix_relation_matches_sub_identifier_sequence() {
    let mut rng = rand::thread_rng();
    for _ in 0..500 {
        let prefix_len = rng.gen_range(2..=6);
        let extra = rng.gen_range(0..=4);
        let prefix = random_oid(&mut rng, prefix_len);

        let mut extended_parts = prefix.as_slice().to_vec();
        for _ in 0..extra {
            extended_parts.push(rng.gen_range(0..=100_000u32));
        }
        let extended = Oid::from_parts(extended_parts);

        assert!(prefix.is_prefix_of(&extended));
        if extra > 0 {
            assert!(!extended.is_prefix_of(&prefix));
        }
    }
}

#[test]
fn compare_exact_is_reflexive_and_agrees_with_equality() {
    let mut rng = rand::thread_rng();
    for _ in 0..500 {
        let len = rng.gen_range(2..=8);
        let a = random_oid(&mut rng, len);
        let b = a.clone();
        assert_eq!(a.compare_exact(&b), Ordering::Equal);
        assert_eq!(a, b);

        let mut different_parts = a.as_slice().to_vec();
        let last = different_parts.len() - 1;
        different_parts[last] = different_parts[last].wrapping_add(1);
        let c = Oid::from_parts(different_parts);
        assert_ne!(a.compare_exact(&c), Ordering::Equal);
        assert_ne!(a, c);
    }
}

#[test]
fn shared_prefix_orders_shorter_first() {
    let mut rng = rand::thread_rng();
    for _ in 0..200 {
        let base = random_oid(&mut rng, rng.gen_range(2..=5));
        let mut longer_parts = base.as_slice().to_vec();
        longer_parts.push(rng.gen_range(0..=100_000u32));
        let longer = Oid::from_parts(longer_parts);

        assert_eq!(base.compare(&longer), Ordering::Equal);
        assert_eq!(base.compare_exact(&longer), Ordering::Less);
        assert_eq!(longer.compare_exact(&base), Ordering::Greater);
    }
}
