use std::sync::atomic::{AtomicU64, Ordering};

/// Transfer progress counters, updated once per chunk.
#[derive(Debug, Default)]
pub struct TransferMetrics {
    pub bytes_uploaded: AtomicU64,
    pub chunks_uploaded: AtomicU64,
    pub bytes_downloaded: AtomicU64,
    pub chunks_downloaded: AtomicU64,
}

/// Point-in-time copy of [`TransferMetrics`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub bytes_uploaded: u64,
    pub chunks_uploaded: u64,
    pub bytes_downloaded: u64,
    pub chunks_downloaded: u64,
}

impl TransferMetrics {
    pub(crate) fn record_upload(&self, bytes: u64) {
        self.bytes_uploaded.fetch_add(bytes, Ordering::Relaxed);
        self.chunks_uploaded.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_download(&self, bytes: u64) {
        self.bytes_downloaded.fetch_add(bytes, Ordering::Relaxed);
        self.chunks_downloaded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            bytes_uploaded: self.bytes_uploaded.load(Ordering::Relaxed),
            chunks_uploaded: self.chunks_uploaded.load(Ordering::Relaxed),
            bytes_downloaded: self.bytes_downloaded.load(Ordering::Relaxed),
            chunks_downloaded: self.chunks_downloaded.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let m = TransferMetrics::default();
        m.record_upload(10);
        m.record_upload(5);
        m.record_download(7);
        assert_eq!(
            m.snapshot(),
            MetricsSnapshot {
                bytes_uploaded: 15,
                chunks_uploaded: 2,
                bytes_downloaded: 7,
                chunks_downloaded: 1,
            }
        );
    }
}
