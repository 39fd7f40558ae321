//! Transcript table
//!
//! Holds one accumulator per `(side, message id)`. Streaming and finalized
//! lines are each capped; the oldest line past a cap is dropped.

use super::accumulator::{Accumulator, AccumulatorState, MergeMode};
use super::model::{ChunkOrder, LayoutBounds, SpeakerSide, TranscriptMessage};
use crate::error::Result;
use crate::protocol::TextPayload;
use std::collections::{HashMap, VecDeque};

type Key = (SpeakerSide, String);

/// Table behavior, taken from [`crate::SubtitlesConfig`]
#[derive(Clone, Debug)]
pub struct TableOptions {
    pub asr_merge: MergeMode,
    pub llm_merge: MergeMode,
    pub check_ordering: bool,
    /// Finalized lines kept for sealed-write detection
    pub max_sealed_messages: usize,
    /// Lines still waiting for their final chunk
    pub max_streaming_messages: usize,
}

impl Default for TableOptions {
    fn default() -> Self {
        Self {
            asr_merge: MergeMode::Append,
            llm_merge: MergeMode::Append,
            check_ordering: true,
            max_sealed_messages: 256,
            max_streaming_messages: 64,
        }
    }
}

/// A chunk that arrived behind the newest order already seen on its side
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OrderRegression {
    pub previous: ChunkOrder,
    pub received: ChunkOrder,
}

/// Result of applying one chunk
#[derive(Clone, Debug)]
pub struct AppliedChunk {
    /// Snapshot of the line after the update
    pub message: TranscriptMessage,
    pub state: AccumulatorState,
    pub regression: Option<OrderRegression>,
    /// Streaming lines dropped to make room, never finalized
    pub evicted: Vec<TranscriptMessage>,
}

/// Accumulators keyed by `(side, message id)`
///
/// ASR and LLM lines interleave freely; each side keeps its own high-water
/// order mark. Finalized lines are retained up to `max_sealed_messages` and
/// open lines up to `max_streaming_messages`, oldest evicted first; a chunk
/// for an evicted id opens a fresh line.
#[derive(Debug)]
pub struct TranscriptTable {
    options: TableOptions,
    entries: HashMap<Key, Accumulator>,
    streaming: VecDeque<Key>,
    sealed: VecDeque<Key>,
    high_water: HashMap<SpeakerSide, ChunkOrder>,
}

impl TranscriptTable {
    pub fn new(options: TableOptions) -> Self {
        Self {
            options,
            entries: HashMap::new(),
            streaming: VecDeque::new(),
            sealed: VecDeque::new(),
            high_water: HashMap::new(),
        }
    }

    /// Apply a chunk to the line it belongs to, creating the line if needed
    pub fn apply(
        &mut self,
        side: SpeakerSide,
        timestamp: i64,
        order: ChunkOrder,
        payload: &TextPayload,
    ) -> Result<AppliedChunk> {
        let merge = match side {
            SpeakerSide::User => self.options.asr_merge,
            SpeakerSide::Agent => self.options.llm_merge,
        };
        let key = (side, payload.message_id.clone());
        let opened = !self.entries.contains_key(&key);

        let acc = self
            .entries
            .entry(key.clone())
            .or_insert_with(|| Accumulator::new(side, payload.message_id.clone(), merge));
        let message = acc.apply(timestamp, order, payload)?.clone();
        let state = acc.state();

        let regression = self.track_order(side, order);

        let mut evicted = Vec::new();
        if state.is_final() {
            if !opened {
                self.streaming.retain(|k| k != &key);
            }
            self.seal(key);
        } else if opened {
            self.streaming.push_back(key);
            evicted = self.evict_streaming();
        }

        Ok(AppliedChunk {
            message,
            state,
            regression,
            evicted,
        })
    }

    fn track_order(&mut self, side: SpeakerSide, order: ChunkOrder) -> Option<OrderRegression> {
        let mark = self.high_water.entry(side).or_insert(order);
        if order < *mark {
            if self.options.check_ordering {
                return Some(OrderRegression {
                    previous: *mark,
                    received: order,
                });
            }
            return None;
        }
        *mark = order;
        None
    }

    fn seal(&mut self, key: Key) {
        self.sealed.push_back(key);
        while self.sealed.len() > self.options.max_sealed_messages {
            if let Some(old) = self.sealed.pop_front() {
                self.entries.remove(&old);
            }
        }
    }

    fn evict_streaming(&mut self) -> Vec<TranscriptMessage> {
        let mut evicted = Vec::new();
        while self.streaming.len() > self.options.max_streaming_messages {
            let Some(old) = self.streaming.pop_front() else {
                break;
            };
            if let Some(acc) = self.entries.remove(&old) {
                evicted.push(acc.message().clone());
            }
        }
        evicted
    }

    pub fn get(&self, side: SpeakerSide, message_id: &str) -> Option<&Accumulator> {
        self.entries.get(&(side, message_id.to_string()))
    }

    /// State of a line; unknown lines are `Empty`
    pub fn state(&self, side: SpeakerSide, message_id: &str) -> AccumulatorState {
        self.get(side, message_id)
            .map(|acc| acc.state())
            .unwrap_or_default()
    }

    /// Record UI layout for a line. Returns false if the line is unknown.
    pub fn set_layout_bounds(
        &mut self,
        side: SpeakerSide,
        message_id: &str,
        bounds: LayoutBounds,
    ) -> bool {
        match self.entries.get_mut(&(side, message_id.to_string())) {
            Some(acc) => {
                acc.set_layout_bounds(bounds);
                true
            }
            None => false,
        }
    }

    /// Snapshots of all retained lines, in the order they were opened
    pub fn messages(&self) -> Vec<TranscriptMessage> {
        let mut accs: Vec<&Accumulator> = self.entries.values().collect();
        accs.sort_by_key(|acc| (acc.first_order(), acc.side(), acc.message().message_id.clone()));
        accs.into_iter().map(|acc| acc.message().clone()).collect()
    }

    /// Number of lines still streaming
    pub fn streaming_count(&self) -> usize {
        self.entries
            .values()
            .filter(|acc| acc.state().is_streaming())
            .count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.streaming.clear();
        self.sealed.clear();
        self.high_water.clear();
    }
}

impl Default for TranscriptTable {
    fn default() -> Self {
        Self::new(TableOptions::default())
    }
}
