use std::cmp::Ordering;

use weave_gateway::QueryEdge;

/// Chooses which of several candidate blobs is current.
///
/// Candidates come from a tag query: every manifest of one repository, or
/// every blob of one named file. `order` sorts them most preferred first;
/// the head of the result is what gets fetched.
pub trait VersionResolver: Send + Sync {
    fn order(&self, candidates: Vec<QueryEdge>) -> Vec<QueryEdge>;

    /// The most preferred candidate, if any.
    fn select(&self, candidates: Vec<QueryEdge>) -> Option<QueryEdge> {
        self.order(candidates).into_iter().next()
    }
}

/// Newest confirmation wins.
///
/// Candidates sort by block timestamp, descending. Pending candidates have
/// no timestamp and rank above every confirmed one, so a pending latest
/// publish is reported rather than silently skipped. Equal timestamps fall
/// back to the lexicographically highest blob id.
#[derive(Clone, Copy, Debug, Default)]
pub struct LatestConfirmed;

impl LatestConfirmed {
    fn compare(a: &QueryEdge, b: &QueryEdge) -> Ordering {
        let rank = |e: &QueryEdge| e.block_timestamp.unwrap_or(u64::MAX);
        rank(b)
            .cmp(&rank(a))
            .then_with(|| b.blob_id.to_string().cmp(&a.blob_id.to_string()))
    }
}

impl VersionResolver for LatestConfirmed {
    fn order(&self, mut candidates: Vec<QueryEdge>) -> Vec<QueryEdge> {
        candidates.sort_by(Self::compare);
        candidates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weave_types::{Address, BlobId, Tags};

    fn edge(id: u8, ts: Option<u64>) -> QueryEdge {
        QueryEdge {
            blob_id: BlobId::from_hash([id; 32]),
            owner: Address::from_hash([0; 32]),
            block_timestamp: ts,
            tags: Tags::new(),
        }
    }

    #[test]
    fn newest_first() {
        let ordered = LatestConfirmed.order(vec![edge(1, Some(10)), edge(2, Some(30)), edge(3, Some(20))]);
        let ts: Vec<_> = ordered.iter().map(|e| e.block_timestamp).collect();
        assert_eq!(ts, vec![Some(30), Some(20), Some(10)]);
    }

    #[test]
    fn pending_ranks_first() {
        let chosen = LatestConfirmed
            .select(vec![edge(1, Some(10)), edge(2, None)])
            .unwrap();
        assert!(chosen.is_pending());
    }

    #[test]
    fn equal_timestamps_pick_highest_id() {
        let a = edge(1, Some(10));
        let b = edge(200, Some(10));
        let expected = if a.blob_id.to_string() > b.blob_id.to_string() {
            a.blob_id
        } else {
            b.blob_id
        };
        let chosen = LatestConfirmed.select(vec![a.clone(), b.clone()]).unwrap();
        assert_eq!(chosen.blob_id, expected);
        // Input order does not matter.
        let chosen = LatestConfirmed.select(vec![b, a]).unwrap();
        assert_eq!(chosen.blob_id, expected);
    }

    #[test]
    fn empty_selects_nothing() {
        assert!(LatestConfirmed.select(Vec::new()).is_none());
    }
}
