//! # Drive script interpreter module
//!
//! This module provides an interpreter for recorded drive scripts, allowing
//! vehicle state snapshots and control requests to be replayed into the
//! executive from a file instead of the live network links.
//!
//! A script is a sequence of `time: record;` lines, where `time` is the
//! elapsed session time in seconds at which the record becomes pending and
//! `record` is a JSON [`LogRecord`].

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::fs;
use regex::RegexBuilder;
use thiserror::Error;

// Internal
use bus_if::replay::{LogRecord, LogRecordParseError};
use crate::session::get_elapsed_seconds;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A record which is scripted to occur at a specific time.
pub struct ScriptedRecord {
    /// The time the record is supposed to be delivered at
    exec_time_s: f64,

    /// The record to deliver
    record: LogRecord
}

/// A script interpreter.
///
/// After initialising with the path to the script to run use `.get_pending`
/// to acquire a list of records that need delivering.
pub struct ScriptInterpreter {
    _script_path: PathBuf,
    records: VecDeque<ScriptedRecord>
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("Could not find the script at {0}")]
    ScriptNotFound(String),

    #[error("Could not load the script: {0}")]
    ScriptLoadError(std::io::Error),

    #[error("The script is empty (or is so bad it can't be read)")]
    ScriptEmpty,

    #[error(
        "Script contains an invalid timestamp: {0}. \
        Should be a float (like 1.0)")]
    InvalidTimestamp(String),

    #[error("Script contains an invalid record at {0} s: {1}")]
    InvalidRecord(f64, LogRecordParseError)
}

pub enum PendingRecords {
    None,
    Some(Vec<LogRecord>),
    EndOfScript
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ScriptInterpreter {

    /// Create a new interpreter from the given script path.
    pub fn new<P: AsRef<Path>>(script_path: P) -> Result<Self, ScriptError> {

        // Get the path in a buffer
        let path = PathBuf::from(script_path.as_ref());

        // Check that the script file exists.
        if !path.exists() {
            return Err(
                ScriptError::ScriptNotFound(path.to_str().unwrap().to_string()));
        }

        // Load the script into a string
        let script = match fs::read_to_string(script_path) {
            Ok(s) => s,
            Err(e) => return Err(ScriptError::ScriptLoadError(e))
        };

        // Empty queue of records
        let mut record_queue: VecDeque<ScriptedRecord> = VecDeque::new();

        // Go through the script executing __the magic regex__.
        let re = RegexBuilder::
            new(r"^\s*(\d+(\.\d+)?)\s*:\s*([^;]*);")
            .multi_line(true)
            .build()
            .unwrap();

        let mut num_caps = 0;

        for cap in re.captures_iter(&script) {
            // Parse the exec time
            let exec_time_s: f64 = match cap.get(1).unwrap().as_str().parse() {
                Ok(t) => t,
                Err(e) => return Err(
                    ScriptError::InvalidTimestamp(format!("{}", e)))
            };

            // Parse the record from the payload. The scripts contain JSON
            // only.
            let record = match LogRecord::from_json(
                cap.get(3).unwrap().as_str())
            {
                Ok(r) => r,
                Err(e) => return Err(ScriptError::InvalidRecord(
                    exec_time_s, e
                ))
            };

            // Build scripted record from the match
            record_queue.push_back(ScriptedRecord {
                exec_time_s,
                record
            });

            num_caps += 1;
        }

        if num_caps == 0 {
            return Err(ScriptError::ScriptEmpty)
        }

        Ok(ScriptInterpreter {
            _script_path: path,
            records: record_queue
        })
    }

    /// Return a vector of pending records, or `None` if no records need
    /// delivering now.
    pub fn get_pending_records(&mut self) -> PendingRecords {

        // If the queue is empty the script is over and we return the end of
        // script variant
        if self.records.len() == 0 {
            return PendingRecords::EndOfScript
        }

        let mut record_vec: Vec<LogRecord> = vec![];

        let current_time_s = get_elapsed_seconds();

        // Peek items from the queue, if the head's exec time is lower than
        // the current time add it to the vector, and keep adding records
        // until the exec times are larger than the current time.
        while
            self.records.len() > 0
            &&
            self.records.front().unwrap().exec_time_s < current_time_s
        {
            record_vec.push(self.records.pop_front().unwrap().record);
        }

        // If the vector is longer than 0 return Some, otherwise None
        if record_vec.len() > 0 {
            PendingRecords::Some(record_vec)
        }
        else {
            PendingRecords::None
        }
    }

    /// Get the number of records in the script
    pub fn get_num_records(&self) -> usize {
        self.records.len()
    }

    /// Get the length of the script in seconds
    pub fn get_duration(&self) -> f64 {
        match self.records.back() {
            Some(r) => r.exec_time_s,
            None => 0f64
        }
    }
}
