//! Multi-root subtree walk built on GetBulkRequest.
//!
//! [`Session::get_bulk_walk`] repeatedly issues GetBulkRequest to collect
//! every varbind under the requested roots. The first `non_repeaters`
//! inputs are fetched once as singletons; the remaining roots are sorted,
//! deduplicated, and reduced so no root is inside another root's subtree.
//! The caller's slice is never modified.
//!
//! The result is a synthetic GetResponse whose varbinds are the
//! non-repeater results followed by the sorted, duplicate-free walk
//! results. If the agent answers with an error status that does not merely
//! mean "a non-repeater ran off the MIB", that response PDU is returned
//! verbatim instead.

use crate::error::{Error, ErrorStatus, Result};
use crate::oid::Oid;
use crate::pdu::Pdu;
use crate::transport::Transport;
use crate::varbind::{VarBind, sort_and_dedup};

use super::Session;

impl<T: Transport> Session<T> {
    /// Walk the subtrees under `oids` using GetBulkRequest.
    ///
    /// `non_repeaters` leading OIDs are collected once; each remaining
    /// root is traversed to exhaustion, `max_repetitions` varbinds per
    /// request. Requires SNMPv2c or later.
    ///
    /// Termination: every iteration either completes at least one root or
    /// strictly advances each live root's cursor, so bounded subtrees
    /// finish in finitely many requests.
    pub async fn get_bulk_walk(
        &mut self,
        oids: &[Oid],
        non_repeaters: i32,
        max_repetitions: i32,
    ) -> Result<Pdu> {
        self.check_bulk_args(non_repeaters, max_repetitions)?;
        let n = non_repeaters as usize;
        if n > oids.len() {
            return Err(Error::argument(format!(
                "NonRepeaters {} exceeds OID count {}",
                n,
                oids.len()
            )));
        }

        // Working copies only; the input slice stays untouched.
        let mut roots: Vec<Oid> = oids[..n].to_vec();
        roots.extend(reduce_roots(&oids[n..]));
        let mut cursors = roots.clone();
        let mut non_repeaters = non_repeaters;

        let mut non_rep_binds: Vec<VarBind> = Vec::new();
        let mut res_binds: Vec<VarBind> = Vec::new();

        while !cursors.is_empty() {
            let pdu = self
                .get_bulk(&cursors, non_repeaters, max_repetitions)
                .await?;

            // A first-iteration error on an unwalked non-repeater (and any
            // error other than a repeater's noSuchName) surfaces verbatim.
            let status = pdu.error_status_enum();
            if status != ErrorStatus::NoError
                && (status != ErrorStatus::NoSuchName || pdu.error_index <= non_repeaters)
            {
                return Ok(pdu);
            }

            let mut varbinds = pdu.varbinds;

            if non_repeaters > 0 {
                let take = (non_repeaters as usize).min(varbinds.len());
                non_rep_binds.extend(varbinds.drain(..take));

                let drop = (non_repeaters as usize).min(cursors.len());
                roots.drain(..drop);
                cursors.drain(..drop);
                non_repeaters = 0;
            }

            let reps = max_repetitions as usize;
            let filled = varbinds.len() == cursors.len() * reps;
            let varbinds = sort_and_dedup(varbinds);

            // Advance each root's cursor through its matches; None marks a
            // completed root.
            let mut next: Vec<Option<Oid>> = cursors.iter().cloned().map(Some).collect();

            for (i, root) in roots.iter().enumerate() {
                let matched: Vec<&VarBind> = varbinds
                    .iter()
                    .filter(|vb| vb.oid.is_descendant_of(root))
                    .collect();

                let Some(last) = matched.last() else {
                    next[i] = None;
                    continue;
                };
                // The agent circled back onto ground already covered.
                if res_binds.iter().any(|vb| vb.oid == last.oid) {
                    next[i] = None;
                    continue;
                }

                let mut saw_exception = false;
                for vb in &matched {
                    if vb.value.is_exception() {
                        saw_exception = true;
                    } else {
                        res_binds.push((*vb).clone());
                        next[i] = Some(vb.oid.clone());
                    }
                }

                if saw_exception || (!filled && matched.len() < reps) {
                    next[i] = None;
                }
            }

            // Compact completed roots out of both parallel vectors.
            let mut kept_roots = Vec::with_capacity(roots.len());
            let mut kept_cursors = Vec::with_capacity(roots.len());
            for (root, cursor) in roots.iter().zip(next) {
                if let Some(cursor) = cursor {
                    kept_roots.push(root.clone());
                    kept_cursors.push(cursor);
                }
            }
            roots = kept_roots;
            cursors = kept_cursors;
        }

        let mut result = non_rep_binds;
        result.extend(sort_and_dedup(res_binds));
        Ok(Pdu::response(result))
    }
}

/// Sort the roots and drop every entry that equals, or lies inside, an
/// earlier root's subtree.
fn reduce_roots(oids: &[Oid]) -> Vec<Oid> {
    let mut sorted = oids.to_vec();
    sorted.sort();

    let mut roots: Vec<Oid> = Vec::with_capacity(sorted.len());
    for oid in sorted {
        match roots.last() {
            // after sorting, a subsuming prefix always comes first
            Some(prev) if oid.starts_with(prev) => {}
            _ => roots.push(oid),
        }
    }
    roots
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oid;

    #[test]
    fn test_reduce_roots_sorts_and_dedups() {
        let roots = reduce_roots(&[oid!(1, 3, 6, 2), oid!(1, 3, 6, 1), oid!(1, 3, 6, 1)]);
        assert_eq!(roots, vec![oid!(1, 3, 6, 1), oid!(1, 3, 6, 2)]);
    }

    #[test]
    fn test_reduce_roots_drops_subsumed() {
        let roots = reduce_roots(&[
            oid!(1, 3, 6, 1, 2, 1, 1, 1),
            oid!(1, 3, 6, 1, 2, 1),
            oid!(1, 3, 6, 1, 2, 1, 2),
            oid!(1, 3, 6, 2),
        ]);
        assert_eq!(roots, vec![oid!(1, 3, 6, 1, 2, 1), oid!(1, 3, 6, 2)]);
    }

    #[test]
    fn test_reduce_roots_keeps_disjoint() {
        let input = [oid!(1, 3, 6, 1, 2), oid!(1, 3, 6, 1, 4), oid!(1, 3, 6, 1, 6)];
        assert_eq!(reduce_roots(&input), input.to_vec());
    }

    #[test]
    fn test_reduce_roots_empty() {
        assert!(reduce_roots(&[]).is_empty());
    }
}
