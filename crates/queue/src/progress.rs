//! Progress aggregation across a round's items.
//!
//! Everything here is a pure function of item state and elapsed time.

use std::time::Duration;

use crate::types::{ItemStatus, UploadItem};

/// Aggregate progress of the active round.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProgressSnapshot {
    /// Sum of sizes of round items that are pending, uploading or completed.
    pub total_bytes: u64,
    /// Completed items in full plus uploading items by their percent.
    pub completed_bytes: u64,
    /// `completed_bytes / total_bytes * 100`, or 0 for an empty total.
    pub overall_progress: f64,
    /// Seconds remaining; `None` until the first item completes.
    pub eta_secs: Option<u64>,
}

/// Computes the aggregate for a round's items.
///
/// Failed items drop out of the byte-weighted total. The ETA assumes every
/// remaining item takes the average time of those already completed.
pub fn aggregate<'a>(
    items: impl IntoIterator<Item = &'a UploadItem>,
    elapsed: Duration,
) -> ProgressSnapshot {
    let mut total_bytes = 0u64;
    let mut completed_bytes = 0u64;
    let mut completed = 0u64;
    let mut remaining = 0u64;

    for item in items {
        let size = item.size();
        match item.status {
            ItemStatus::Pending => {
                total_bytes += size;
                remaining += 1;
            }
            ItemStatus::Uploading => {
                total_bytes += size;
                completed_bytes += partial_bytes(size, item.progress);
                remaining += 1;
            }
            ItemStatus::Completed => {
                total_bytes += size;
                completed_bytes += size;
                completed += 1;
            }
            ItemStatus::Failed => {}
        }
    }

    let overall_progress = if total_bytes == 0 {
        0.0
    } else {
        completed_bytes as f64 / total_bytes as f64 * 100.0
    };

    let eta_secs = (completed > 0).then(|| {
        let per_item = elapsed.as_secs_f64() / completed as f64;
        (per_item * remaining as f64).ceil() as u64
    });

    ProgressSnapshot {
        total_bytes,
        completed_bytes,
        overall_progress,
        eta_secs,
    }
}

fn partial_bytes(size: u64, percent: u8) -> u64 {
    (size as u128 * percent.min(100) as u128 / 100) as u64
}

/// Formats a byte count with base-1024 units, e.g. `"1.5 MB"`.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];

    if bytes == 0 {
        return "0 Bytes".into();
    }

    let mut unit = 0;
    let mut scaled = bytes;
    while scaled >= 1024 && unit < UNITS.len() - 1 {
        scaled /= 1024;
        unit += 1;
    }

    let value = bytes as f64 / 1024f64.powi(unit as i32);
    let rounded = (value * 100.0).round() / 100.0;
    format!("{rounded} {}", UNITS[unit])
}

/// Formats a duration in seconds: `"45s"`, `"5m 30s"`, `"2h 15m"`.
pub fn format_eta(secs: u64) -> String {
    if secs < 60 {
        return format!("{secs}s");
    }
    let minutes = secs / 60;
    if minutes < 60 {
        return format!("{minutes}m {}s", secs % 60);
    }
    format!("{}h {}m", minutes / 60, minutes % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rapidupload_transfer::FileSource;

    fn item(size: u64, status: ItemStatus, progress: u8) -> UploadItem {
        let mut i = UploadItem::new(
            "x".into(),
            FileSource::new("/tmp/x", "x", "image/jpeg", size),
        );
        i.status = status;
        i.progress = progress;
        i
    }

    #[test]
    fn empty_round_is_zero() {
        let snap = aggregate(std::iter::empty(), Duration::from_secs(5));
        assert_eq!(snap.total_bytes, 0);
        assert_eq!(snap.overall_progress, 0.0);
        assert!(snap.eta_secs.is_none());
    }

    #[test]
    fn single_item_follows_its_percent() {
        let observed: Vec<f64> = [0u8, 50, 100]
            .iter()
            .map(|&p| {
                let i = item(1000, ItemStatus::Uploading, p);
                aggregate([&i], Duration::ZERO).overall_progress
            })
            .collect();
        assert_eq!(observed, [0.0, 50.0, 100.0]);

        let done = item(1000, ItemStatus::Completed, 100);
        assert_eq!(aggregate([&done], Duration::ZERO).overall_progress, 100.0);
    }

    #[test]
    fn failed_items_leave_the_total() {
        let items = [
            item(300, ItemStatus::Completed, 100),
            item(700, ItemStatus::Failed, 40),
            item(100, ItemStatus::Pending, 0),
        ];
        let snap = aggregate(&items, Duration::ZERO);
        assert_eq!(snap.total_bytes, 400);
        assert_eq!(snap.completed_bytes, 300);
        assert_eq!(snap.overall_progress, 75.0);
    }

    #[test]
    fn all_failed_is_zero_not_nan() {
        let items = [item(10, ItemStatus::Failed, 0)];
        let snap = aggregate(&items, Duration::from_secs(1));
        assert_eq!(snap.overall_progress, 0.0);
    }

    #[test]
    fn eta_uses_average_completion_time() {
        let items = [
            item(1, ItemStatus::Completed, 100),
            item(1, ItemStatus::Completed, 100),
            item(1, ItemStatus::Uploading, 10),
            item(1, ItemStatus::Pending, 0),
            item(1, ItemStatus::Pending, 0),
            item(1, ItemStatus::Failed, 0),
        ];
        // 10s / 2 done = 5s per item, 3 remaining.
        let snap = aggregate(&items, Duration::from_secs(10));
        assert_eq!(snap.eta_secs, Some(15));

        let snap = aggregate(&items, Duration::from_millis(10_100));
        assert_eq!(snap.eta_secs, Some(16));
    }

    #[test]
    fn eta_absent_before_first_completion() {
        let items = [item(1, ItemStatus::Uploading, 90)];
        assert!(aggregate(&items, Duration::from_secs(100)).eta_secs.is_none());
    }

    #[test]
    fn overall_matches_byte_ratio_for_mixed_states() {
        // Deterministic sweep over size/status/percent combinations.
        let statuses = [
            ItemStatus::Pending,
            ItemStatus::Uploading,
            ItemStatus::Completed,
            ItemStatus::Failed,
        ];
        let mut seed = 0x2545_f491_u64;
        for _ in 0..200 {
            let items: Vec<UploadItem> = (0..8)
                .map(|_| {
                    seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                    let size = (seed >> 33) % 10_000;
                    let status = statuses[((seed >> 20) % 4) as usize];
                    let progress = ((seed >> 8) % 101) as u8;
                    item(size, status, progress)
                })
                .collect();

            let snap = aggregate(&items, Duration::from_secs(1));

            let total: u64 = items
                .iter()
                .filter(|i| i.status != ItemStatus::Failed)
                .map(UploadItem::size)
                .sum();
            let done: u64 = items
                .iter()
                .map(|i| match i.status {
                    ItemStatus::Completed => i.size(),
                    ItemStatus::Uploading => i.size() * i.progress as u64 / 100,
                    _ => 0,
                })
                .sum();
            assert_eq!(snap.total_bytes, total);
            assert_eq!(snap.completed_bytes, done);
            let expected = if total == 0 {
                0.0
            } else {
                done as f64 / total as f64 * 100.0
            };
            assert_eq!(snap.overall_progress, expected);
            assert!((0.0..=100.0).contains(&snap.overall_progress));
        }
    }

    #[test]
    fn format_bytes_units() {
        assert_eq!(format_bytes(0), "0 Bytes");
        assert_eq!(format_bytes(500), "500 Bytes");
        assert_eq!(format_bytes(1023), "1023 Bytes");
        assert_eq!(format_bytes(1024), "1 KB");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(50_000), "48.83 KB");
        assert_eq!(format_bytes(1_572_864), "1.5 MB");
        assert_eq!(format_bytes(2_500_000), "2.38 MB");
        assert_eq!(format_bytes(1_073_741_824), "1 GB");
        assert_eq!(format_bytes(1_610_612_736), "1.5 GB");
    }

    #[test]
    fn format_bytes_caps_at_gigabytes() {
        assert_eq!(format_bytes(2 * 1024 * 1_073_741_824), "2048 GB");
    }

    #[test]
    fn format_eta_ranges() {
        assert_eq!(format_eta(0), "0s");
        assert_eq!(format_eta(45), "45s");
        assert_eq!(format_eta(60), "1m 0s");
        assert_eq!(format_eta(330), "5m 30s");
        assert_eq!(format_eta(3599), "59m 59s");
        assert_eq!(format_eta(3600), "1h 0m");
        assert_eq!(format_eta(8100), "2h 15m");
        assert_eq!(format_eta(7325), "2h 2m");
    }
}
