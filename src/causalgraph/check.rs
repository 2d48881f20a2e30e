use crate::frontier::frontier_is_sorted;
use crate::rle::{HasLength, RleSpanHelpers};
use crate::CausalGraph;

impl CausalGraph {
    /// Check the internal invariants of the graph. Used in testing and
    /// fuzzing; panics on violation.
    pub fn dbg_check(&self, deep: bool) {
        // Entries are packed: they cover [0, next_lv) with no gaps or
        // overlaps, in order.
        let mut expect_start = 0;
        for e in self.entries.iter() {
            assert_eq!(e.start, expect_start);
            assert!(e.len() > 0);
            expect_start = e.end();

            assert!(frontier_is_sorted(e.parents.as_ref()));
            for &p in e.parents.iter() {
                assert!(p < e.start, "parent {} not before entry {}", p, e.start);
            }
        }
        assert_eq!(expect_start, self.next_lv());

        // Client entries are sorted by seq, gapless, and map back onto the
        // graph's entries.
        for (id, client) in self.agent_assignment.client_data.iter().enumerate() {
            let mut expect_seq = 0;
            for pair in client.item_times.iter() {
                assert_eq!(pair.0, expect_seq);
                expect_seq = pair.end();

                for offset in 0..pair.1.len() {
                    let lv = pair.1.start + offset;
                    let (entry, entry_offset) = self.entry_at(lv).unwrap();
                    assert_eq!(entry.span.agent as usize, id);
                    assert_eq!(entry.span.seq_at_offset(entry_offset), pair.0 + offset);
                }
            }
        }

        // The version is the set of entries with no descendants.
        assert!(frontier_is_sorted(self.version.as_ref()));
        if deep {
            let next = self.next_lv();
            let all: Vec<bool> = vec![true; next];
            let heads = self.maximal_frontier(&all);
            assert_eq!(self.version, heads);

            // Raw <-> local version mapping round trips.
            for lv in 0..next {
                let raw = self.lv_to_raw(lv).unwrap();
                assert_eq!(self.try_raw_to_lv(raw.agent(), raw.seq()), Some(lv));
            }
        }
    }
}
