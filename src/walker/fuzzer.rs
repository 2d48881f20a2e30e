//! Seeded random churn over a walker: local edits, remote ops anchored at
//! arbitrary historical versions, and merges bouncing between frontiers.
//! Deterministic seeds only.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::{ListOp, Walker};

fn random_fuzz(seed: u64, steps: usize) {
    let mut rng = SmallRng::seed_from_u64(seed);
    let mut w: Walker<usize> = Walker::new();
    let mut counter = 0usize;
    let agents = ["alice", "bob", "cara"];

    for _ in 0..steps {
        match rng.gen_range(0..10) {
            // Local edits are the common case.
            0..=5 => {
                let agent = agents[rng.gen_range(0..agents.len())];
                let len = w.active_items().count();
                if len == 0 || rng.gen_bool(0.7) {
                    let pos = rng.gen_range(0..=len);
                    w.local_insert(agent, pos, counter).unwrap();
                    counter += 1;
                } else {
                    let pos = rng.gen_range(0..len);
                    w.local_delete(agent, pos).unwrap();
                }
            }
            // A "remote" op anchored at a random point in history. The
            // position must be valid in the document at that version.
            6..=7 if w.cg().next_lv() > 0 => {
                let anchor = rng.gen_range(0..w.cg().next_lv());
                let parents = w.cg().lv_list_to_raw(&[anchor]).unwrap();
                let frame = w.checkout(&[anchor]).unwrap();
                let agent = agents[rng.gen_range(0..agents.len())];
                let op = if !frame.is_empty() && rng.gen_bool(0.3) {
                    ListOp::delete(rng.gen_range(0..frame.len()))
                } else {
                    counter += 1;
                    ListOp::insert(rng.gen_range(0..=frame.len()), counter - 1)
                };
                w.integrate(op, agent, Some(&parents)).unwrap();
            }
            // Catch up with everything known.
            8 => {
                let heads = w.cg().heads().to_vec();
                w.merge(&heads).unwrap();
            }
            // Bounce to a random version and back.
            9 if w.cg().next_lv() > 0 => {
                let anchor = rng.gen_range(0..w.cg().next_lv());
                let before = w.get_version().to_vec();
                w.merge(&[anchor]).unwrap();
                w.merge(&before).unwrap();
            }
            _ => {}
        }
    }

    w.dbg_check(true);

    let heads = w.cg().heads().to_vec();
    let b1 = w.checkout(&heads).unwrap();
    let b2 = w.checkout(&heads).unwrap();
    assert_eq!(b1, b2);

    // Reaching the same frontier along different routes must converge.
    if w.cg().next_lv() > 0 {
        let mid = rng.gen_range(0..w.cg().next_lv());
        let mut wa = w.clone();
        wa.merge(&[mid]).unwrap();
        wa.merge(&heads).unwrap();
        let mut wb = w.clone();
        wb.merge(&heads).unwrap();
        assert_eq!(wa.get_active_items(), wb.get_active_items());
        assert_eq!(wa.get_active_items(), b1.snapshot);
        wa.dbg_check(true);
    }

    // Every version is an ancestor of the heads.
    for lv in 0..w.cg().next_lv() {
        assert!(w.cg().version_contains_lv(&heads, lv).unwrap());
    }
}

#[test]
fn fuzz_smoke() {
    random_fuzz(321, 100);
}

#[test]
fn fuzz_seeds() {
    for seed in 0..25 {
        random_fuzz(seed, 60);
    }
}
