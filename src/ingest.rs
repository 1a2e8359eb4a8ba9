//! Parallel ingest of newline-delimited event JSON
//!
//! One reader thread feeds lines into a bounded channel; a fixed pool of
//! workers decodes them and calls [`RelationStore::store_relation`] on a
//! shared store. Write ordering between workers is whatever the store's
//! serialization gives.

use std::io::BufRead;
use std::sync::atomic::{AtomicUsize, Ordering};

use crossbeam::channel;

use crate::event::Event;
use crate::relation::extract_relation;
use crate::storage::RelationStore;

/// Counters reported after an ingest run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestSummary {
    /// Lines decoded into events
    pub events: usize,
    /// Events that declared a relation
    pub relations: usize,
    /// Lines that were not a decodable event
    pub invalid: usize,
    /// Events the store failed to write
    pub failed: usize,
}

#[derive(Default)]
struct Counters {
    events: AtomicUsize,
    relations: AtomicUsize,
    invalid: AtomicUsize,
    failed: AtomicUsize,
}

/// Store every event read from `input` using `workers` threads.
///
/// Blank lines are skipped. Undecodable lines and failed writes are logged
/// and counted; only a read error on `input` aborts the run.
pub fn ingest_events<R: BufRead>(
    store: &dyn RelationStore,
    input: R,
    workers: usize,
) -> std::io::Result<IngestSummary> {
    let workers = workers.max(1);
    let (tx, rx) = channel::bounded::<(usize, String)>(workers * 16);
    let counters = Counters::default();

    let read_result = crossbeam::scope(|s| -> std::io::Result<()> {
        for _ in 0..workers {
            let rx = rx.clone();
            let counters = &counters;
            s.spawn(move |_| {
                for (line_no, line) in rx {
                    store_line(store, counters, line_no, &line);
                }
            });
        }
        drop(rx);

        for (idx, line) in input.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            if tx.send((idx + 1, line)).is_err() {
                break;
            }
        }
        drop(tx);
        Ok(())
    })
    .unwrap_or_else(|_| Err(std::io::Error::other("ingest worker panicked")));

    read_result?;

    Ok(IngestSummary {
        events: counters.events.into_inner(),
        relations: counters.relations.into_inner(),
        invalid: counters.invalid.into_inner(),
        failed: counters.failed.into_inner(),
    })
}

fn store_line(store: &dyn RelationStore, counters: &Counters, line_no: usize, line: &str) {
    let event = match Event::from_json(line) {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!("Skipping line {}: {}", line_no, e);
            counters.invalid.fetch_add(1, Ordering::Relaxed);
            return;
        }
    };
    counters.events.fetch_add(1, Ordering::Relaxed);
    // store_relation reports no relation as Ok(()), so count from a second parse
    if extract_relation(Some(&event)).is_some() {
        counters.relations.fetch_add(1, Ordering::Relaxed);
    }

    if let Err(e) = store.store_relation(&event) {
        tracing::error!("Failed to store {} (line {}): {}", event.event_id, line_no, e);
        counters.failed.fetch_add(1, Ordering::Relaxed);
    }
}
