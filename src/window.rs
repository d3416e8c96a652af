//! ==============================================================================
//! window.rs - bounded sliding window of distance samples
//! ==============================================================================
//!
//! purpose:
//!     keeps the most recent `capacity` samples in a shape the chart can use
//!     directly: parallel label and distance series plus a sparse list of
//!     motion markers that point into the distance series.
//!
//! layout:
//!
//! ```text
//!     absolute seq:   0    1    2    3    4    5
//!                    ─────────────────────────────
//!     evicted = 3                   │ 3 │ 4 │ 5 │   <- live window
//!     display index                   0   1   2
//!
//!     samples live in a ring (VecDeque). the window never shifts stored
//!     indices: every marker remembers the absolute sequence number of its
//!     sample and the display index is derived as `seq - evicted`.
//!     a marker with `seq < evicted` points at an evicted sample and is
//!     dropped. markers are appended in seq order, so dropping only ever
//!     touches the front of the marker queue.
//! ```
//!
//! relationships:
//!     - used by: adapter.rs (the only owner, one append per reading)
//!     - produces: WindowSnapshot (serialized into dashboard frames)
//!
//! ==============================================================================

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// default number of visible points on the chart
pub const DEFAULT_MAX_POINTS: usize = 120;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WindowError {
    #[error("window capacity must be greater than zero")]
    ZeroCapacity,
}

/// motion overlay point, as the chart consumes it
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionMarker {
    /// position in the distance series of the current snapshot
    pub index: usize,
    /// distance of the reading that raised the marker, frozen at insert
    pub distance: f64,
}

/// owned copy of the window, ready to hand to a renderer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WindowSnapshot {
    pub labels: Vec<String>,
    pub distances: Vec<f64>,
    pub markers: Vec<MotionMarker>,
}

impl WindowSnapshot {
    pub fn len(&self) -> usize {
        self.distances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.distances.is_empty()
    }
}

#[derive(Debug, Clone)]
struct Sample {
    label: String,
    distance: f64,
}

#[derive(Debug, Clone, Copy)]
struct StoredMarker {
    seq: u64,
    distance: f64,
}

/// fixed capacity fifo of samples with a motion marker side index
#[derive(Debug, Clone)]
pub struct SeriesWindow {
    capacity: usize,
    samples: VecDeque<Sample>,
    markers: VecDeque<StoredMarker>,
    /// number of samples evicted since creation, also the seq of samples[0]
    evicted: u64,
}

impl SeriesWindow {
    pub fn new(capacity: usize) -> Result<Self, WindowError> {
        if capacity == 0 {
            return Err(WindowError::ZeroCapacity);
        }
        Ok(Self {
            capacity,
            samples: VecDeque::with_capacity(capacity),
            markers: VecDeque::new(),
            evicted: 0,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// total samples evicted so far
    pub fn evicted_count(&self) -> u64 {
        self.evicted
    }

    /// most recent (label, distance), if any
    pub fn latest(&self) -> Option<(&str, f64)> {
        self.samples.back().map(|s| (s.label.as_str(), s.distance))
    }

    /// Appends one sample, evicting the oldest first when the window is full.
    ///
    /// A motion marker added by this call always lands at `len() - 1`.
    pub fn append(&mut self, label: impl Into<String>, distance: f64, is_motion: bool) {
        if self.samples.len() == self.capacity {
            self.evict_oldest();
        }

        self.samples.push_back(Sample {
            label: label.into(),
            distance,
        });

        if is_motion {
            let seq = self.evicted + (self.samples.len() as u64 - 1);
            self.markers.push_back(StoredMarker { seq, distance });
        }
    }

    fn evict_oldest(&mut self) {
        if self.samples.pop_front().is_none() {
            return;
        }
        self.evicted += 1;

        while self
            .markers
            .front()
            .is_some_and(|marker| marker.seq < self.evicted)
        {
            self.markers.pop_front();
        }
    }

    /// live markers translated to display indices
    pub fn markers(&self) -> impl Iterator<Item = MotionMarker> + '_ {
        self.markers.iter().map(move |m| MotionMarker {
            index: (m.seq - self.evicted) as usize,
            distance: m.distance,
        })
    }

    pub fn snapshot(&self) -> WindowSnapshot {
        WindowSnapshot {
            labels: self.samples.iter().map(|s| s.label.clone()).collect(),
            distances: self.samples.iter().map(|s| s.distance).collect(),
            markers: self.markers().collect(),
        }
    }
}
