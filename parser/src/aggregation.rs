use crate::{LogLevel, LogRecord, ParseFailure, ParseOutcome};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

/// Insertion-ordered `key -> count` table. Serializes as a JSON object whose
/// keys keep first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CountTable {
    rows: Vec<(String, usize)>,
    index: HashMap<String, usize>,
}

impl CountTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, key: &str, n: usize) {
        match self.index.get(key) {
            Some(&pos) => self.rows[pos].1 += n,
            None => {
                self.index.insert(key.to_string(), self.rows.len());
                self.rows.push((key.to_string(), n));
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<usize> {
        self.index.get(key).map(|&pos| self.rows[pos].1)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.rows.iter().map(|(k, c)| (k.as_str(), *c))
    }

    /// Highest count; ties go to the key seen first.
    pub fn most_common(&self) -> Option<(&str, usize)> {
        let mut best: Option<(&str, usize)> = None;
        for (key, count) in self.iter() {
            if best.map_or(true, |(_, c)| count > c) {
                best = Some((key, count));
            }
        }
        best
    }
}

impl Serialize for CountTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.rows.len()))?;
        for (key, count) in &self.rows {
            map.serialize_entry(key, count)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for CountTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct CountTableVisitor;

        impl<'de> Visitor<'de> for CountTableVisitor {
            type Value = CountTable;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of string keys to counts")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<CountTable, A::Error> {
                let mut table = CountTable::new();
                while let Some((key, count)) = access.next_entry::<String, usize>()? {
                    table.add(&key, count);
                }
                Ok(table)
            }
        }

        deserializer.deserialize_map(CountTableVisitor)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageCount {
    pub message: String,
    pub count: usize,
}

/// Read-only statistics computed from an [`Aggregator`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisStats {
    pub successful_entries: usize,
    pub failed_entries: usize,
    pub service_entries: CountTable,
    pub log_level_entries: CountTable,
    /// Frequency of `message` over ERROR-level records only
    pub error_messages: CountTable,
    pub most_common_error: Option<MessageCount>,
}

impl AnalysisStats {
    pub fn total(&self) -> usize {
        self.successful_entries + self.failed_entries
    }
}

/// Records grouped by key, stored as indices into the success list.
#[derive(Debug, Clone)]
struct Buckets<K> {
    order: Vec<K>,
    entries: HashMap<K, Vec<usize>>,
}

impl<K: Eq + Hash + Clone> Buckets<K> {
    fn new() -> Self {
        Self {
            order: Vec::new(),
            entries: HashMap::new(),
        }
    }

    fn push(&mut self, key: &K, idx: usize) {
        match self.entries.get_mut(key) {
            Some(bucket) => bucket.push(idx),
            None => {
                self.order.push(key.clone());
                self.entries.insert(key.clone(), vec![idx]);
            }
        }
    }

    fn get(&self, key: &K) -> &[usize] {
        self.entries.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    fn iter(&self) -> impl Iterator<Item = (&K, &[usize])> {
        self.order.iter().map(move |k| (k, self.get(k)))
    }
}

/// Classification state for one pipeline run.
///
/// Every record is stored once in `successful`; the service and level
/// buckets index into it, so a record is in exactly one bucket of each.
/// Failures only ever land in `failed`. `classify` is the only way in.
#[derive(Debug, Clone)]
pub struct Aggregator {
    successful: Vec<LogRecord>,
    failed: Vec<ParseFailure>,
    by_service: Buckets<String>,
    by_level: Buckets<LogLevel>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self {
            successful: Vec::new(),
            failed: Vec::new(),
            by_service: Buckets::new(),
            by_level: Buckets::new(),
        }
    }

    pub fn classify(&mut self, outcome: ParseOutcome) {
        match outcome {
            ParseOutcome::Record(record) => {
                let idx = self.successful.len();
                self.by_service.push(&record.service_name().to_string(), idx);
                self.by_level.push(&record.log_level(), idx);
                self.successful.push(record);
            }
            ParseOutcome::Failure(failure) => self.failed.push(failure),
        }
    }

    pub fn successful_entries(&self) -> &[LogRecord] {
        &self.successful
    }

    pub fn failed_entries(&self) -> &[ParseFailure] {
        &self.failed
    }

    pub fn total(&self) -> usize {
        self.successful.len() + self.failed.len()
    }

    pub fn entries_for_service<'a>(&'a self, service: &str) -> impl Iterator<Item = &'a LogRecord> + 'a {
        self.resolve(self.by_service.get(&service.to_string()))
    }

    pub fn entries_for_level(&self, level: LogLevel) -> impl Iterator<Item = &LogRecord> {
        self.resolve(self.by_level.get(&level))
    }

    /// Service buckets in first-seen order
    pub fn service_entries(&self) -> impl Iterator<Item = (&str, Vec<&LogRecord>)> {
        self.by_service
            .iter()
            .map(move |(k, idx)| (k.as_str(), self.resolve(idx).collect()))
    }

    /// Level buckets in first-seen order
    pub fn log_level_entries(&self) -> impl Iterator<Item = (LogLevel, Vec<&LogRecord>)> {
        self.by_level
            .iter()
            .map(move |(k, idx)| (*k, self.resolve(idx).collect()))
    }

    pub fn service_counts(&self) -> CountTable {
        let mut table = CountTable::new();
        for (service, idx) in self.by_service.iter() {
            table.add(service, idx.len());
        }
        table
    }

    pub fn level_counts(&self) -> CountTable {
        let mut table = CountTable::new();
        for (level, idx) in self.by_level.iter() {
            table.add(level.as_str(), idx.len());
        }
        table
    }

    /// Message frequency over ERROR records. Empty when there are none.
    pub fn error_message_counts(&self) -> CountTable {
        let mut table = CountTable::new();
        for record in self.entries_for_level(LogLevel::Error) {
            table.add(record.message(), 1);
        }
        table
    }

    pub fn snapshot(&self) -> AnalysisStats {
        let error_messages = self.error_message_counts();
        let most_common_error = error_messages.most_common().map(|(message, count)| MessageCount {
            message: message.to_string(),
            count,
        });

        AnalysisStats {
            successful_entries: self.successful.len(),
            failed_entries: self.failed.len(),
            service_entries: self.service_counts(),
            log_level_entries: self.level_counts(),
            error_messages,
            most_common_error,
        }
    }

    fn resolve<'a>(&'a self, idx: &'a [usize]) -> impl Iterator<Item = &'a LogRecord> + 'a {
        idx.iter().map(move |&i| &self.successful[i])
    }
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new()
    }
}
