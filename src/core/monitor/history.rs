use std::collections::{BTreeMap, VecDeque};

use super::metrics::{MetricKey, MetricSample};

pub const DEFAULT_HISTORY_SIZE: usize = 60;

/// Fixed-capacity circular buffer of metric values (for sparklines).
///
/// The buffer is pre-filled with zeros, so its length always equals its
/// capacity. Pushing appends the newest value and evicts the oldest one.
#[derive(Debug, Clone, PartialEq)]
pub struct RollingHistory {
    capacity: usize,
    values: VecDeque<f64>,
}

impl RollingHistory {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_SIZE)
    }

    /// A capacity of zero is bumped to one so there is always a latest value.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            values: std::iter::repeat(0.0).take(capacity).collect(),
        }
    }

    /// Append `value`, returning the evicted oldest value
    pub fn push(&mut self, value: f64) -> f64 {
        let evicted = self.values.pop_front().unwrap_or_default();
        self.values.push_back(value);
        evicted
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn latest(&self) -> f64 {
        self.values.back().copied().unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = &f64> {
        self.values.iter()
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.values.iter().copied().collect()
    }

    /// Values as u64 for the sparkline widget.
    /// Scales values by 10 to preserve decimal precision (0-1000 range for percentages)
    pub fn as_scaled_u64(&self) -> Vec<u64> {
        self.values
            .iter()
            .map(|&v| (v.max(0.0) * 10.0) as u64)
            .collect()
    }
}

impl Default for RollingHistory {
    fn default() -> Self {
        Self::new()
    }
}

/// One rolling history per metric key
#[derive(Debug, Clone)]
pub struct HistoryStore {
    capacity: usize,
    histories: BTreeMap<MetricKey, RollingHistory>,
}

impl HistoryStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            histories: BTreeMap::new(),
        }
    }

    /// Store with zeroed histories for the fixed metrics (disks are added on discovery)
    pub fn with_standard_keys(capacity: usize) -> Self {
        let mut store = Self::new(capacity);
        for key in [
            MetricKey::Cpu,
            MetricKey::Ram,
            MetricKey::Gpu,
            MetricKey::GpuTemp,
            MetricKey::Battery,
            MetricKey::NetworkSent,
            MetricKey::NetworkRecv,
        ] {
            store.ensure(key);
        }
        store
    }

    /// Get the history for `key`, creating a zero-filled one if missing
    pub fn ensure(&mut self, key: MetricKey) -> &mut RollingHistory {
        let capacity = self.capacity;
        self.histories
            .entry(key)
            .or_insert_with(|| RollingHistory::with_capacity(capacity))
    }

    pub fn record(&mut self, sample: &MetricSample) {
        self.ensure(sample.key.clone()).push(sample.value);
    }

    pub fn get(&self, key: &MetricKey) -> Option<&RollingHistory> {
        self.histories.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &MetricKey> {
        self.histories.keys()
    }

    pub fn disk_keys(&self) -> Vec<MetricKey> {
        self.histories.keys().filter(|k| k.is_disk()).cloned().collect()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.histories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.histories.is_empty()
    }
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::with_standard_keys(DEFAULT_HISTORY_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_history_is_full_of_zeros() {
        let history = RollingHistory::new();
        assert_eq!(history.len(), 60);
        assert!(history.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_push_keeps_length_and_evicts_oldest() {
        let mut history = RollingHistory::with_capacity(60);
        for i in 0..200 {
            let evicted = history.push(i as f64);
            if i >= 60 {
                assert_eq!(evicted, (i - 60) as f64);
            } else {
                assert_eq!(evicted, 0.0);
            }
            assert_eq!(history.len(), 60);
        }
    }

    #[test]
    fn test_sixty_one_samples_drop_the_first() {
        let mut history = RollingHistory::with_capacity(60);
        let samples: Vec<f64> = (0..=60).map(|i| i as f64 + 1.0).collect();
        for s in &samples {
            history.push(*s);
        }
        assert_eq!(history.to_vec(), samples[1..].to_vec());
    }

    #[test]
    fn test_cpu_scenario_three_samples() {
        let mut history = RollingHistory::with_capacity(60);
        for v in [10.0, 20.0, 30.0] {
            history.push(v);
        }
        let values = history.to_vec();
        assert_eq!(values.len(), 60);
        assert_eq!(&values[56..], &[0.0, 10.0, 20.0, 30.0]);
        assert!(values[..57].iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_push_preserves_relative_order() {
        let mut history = RollingHistory::with_capacity(5);
        for v in [1.0, 2.0, 3.0, 4.0, 5.0] {
            history.push(v);
        }
        history.push(6.0);
        assert_eq!(history.to_vec(), vec![2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_zero_capacity_is_bumped() {
        let mut history = RollingHistory::with_capacity(0);
        history.push(7.0);
        assert_eq!(history.len(), 1);
        assert_eq!(history.latest(), 7.0);
    }

    #[test]
    fn test_scaled_values() {
        let mut history = RollingHistory::with_capacity(2);
        history.push(12.34);
        assert_eq!(history.as_scaled_u64(), vec![0, 123]);
    }

    #[test]
    fn test_store_creates_disk_history_on_demand() {
        let mut store = HistoryStore::with_standard_keys(60);
        assert!(store.disk_keys().is_empty());

        store.record(&MetricSample::read(MetricKey::disk("/dev/sda1"), 42.0));

        let history = store.get(&MetricKey::disk("/dev/sda1")).unwrap();
        assert_eq!(history.len(), 60);
        assert_eq!(history.latest(), 42.0);
        assert_eq!(store.disk_keys().len(), 1);
    }
}
