//! The input driver: streams dictionary entries through the script,
//! single-threaded by default, optionally fanned out across workers.
//! Each entry's emissions are flushed as one atomic block either way.

use crate::env::RuntimeEnv;
use crate::eval::EntryRun;
use crate::output::OutputHub;
use crate::RuntimeError;
use std::io::BufRead;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct DriverOptions {
    /// Worker count; 0 means one per CPU, 1 means in-process.
    pub jobs: usize,
    /// Log a progress line every N entries.
    pub progress: Option<u64>,
    /// Sleep between entries to throttle throughput.
    pub pace: Option<Duration>,
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self {
            jobs: 1,
            progress: None,
            pace: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Stats {
    pub entries: u64,
    pub lines_emitted: u64,
}

/// Streams every input line through the script. Blank lines are skipped
/// and entries in the ignore set never reach a chain.
pub fn process<R: BufRead>(
    env: &RuntimeEnv,
    hub: &OutputHub,
    input: R,
    opts: &DriverOptions,
) -> Result<Stats, RuntimeError> {
    let jobs = match opts.jobs {
        0 => num_cpus::get(),
        n => n,
    };
    let stats = if jobs <= 1 {
        process_serial(env, hub, input, opts)?
    } else {
        process_parallel(env, hub, input, opts, jobs)?
    };
    hub.flush_all()?;
    Ok(stats)
}

fn process_serial<R: BufRead>(
    env: &RuntimeEnv,
    hub: &OutputHub,
    input: R,
    opts: &DriverOptions,
) -> Result<Stats, RuntimeError> {
    let mut stats = Stats::default();
    let mut run = EntryRun::new(env);
    for line in input.lines() {
        let entry = line?;
        if entry.is_empty() || env.is_ignored(&entry) {
            continue;
        }
        run.reset();
        run.evaluate(&entry)?;
        stats.lines_emitted += hub.emit_entry(&run.take_emissions())?;
        stats.entries += 1;
        if let Some(every) = opts.progress {
            if stats.entries % every == 0 {
                log::info!(
                    "processed {} entries, emitted {} lines",
                    stats.entries,
                    stats.lines_emitted
                );
            }
        }
        if let Some(pace) = opts.pace {
            std::thread::sleep(pace);
        }
    }
    Ok(stats)
}

/// Entries are independent, so they fan out across workers; output order
/// between entries is not preserved, but each entry's emissions stay
/// contiguous because the hub writes them under one lock.
fn process_parallel<R: BufRead>(
    env: &RuntimeEnv,
    hub: &OutputHub,
    input: R,
    opts: &DriverOptions,
    jobs: usize,
) -> Result<Stats, RuntimeError> {
    let (tx, rx) = crossbeam_channel::bounded::<String>(jobs * 64);
    let emitted = AtomicU64::new(0);
    let failed = AtomicBool::new(false);
    let first_error: Mutex<Option<RuntimeError>> = Mutex::new(None);
    let mut entries = 0u64;

    std::thread::scope(|scope| -> Result<(), RuntimeError> {
        for _ in 0..jobs {
            let rx = rx.clone();
            let emitted = &emitted;
            let failed = &failed;
            let first_error = &first_error;
            scope.spawn(move || {
                let mut run = EntryRun::new(env);
                for entry in rx.iter() {
                    if failed.load(Ordering::Relaxed) {
                        break;
                    }
                    run.reset();
                    let outcome = run
                        .evaluate(&entry)
                        .and_then(|()| Ok(hub.emit_entry(&run.take_emissions())?));
                    match outcome {
                        Ok(count) => {
                            emitted.fetch_add(count, Ordering::Relaxed);
                        }
                        Err(err) => {
                            failed.store(true, Ordering::Relaxed);
                            if let Ok(mut slot) = first_error.lock() {
                                slot.get_or_insert(err);
                            }
                            break;
                        }
                    }
                }
            });
        }
        drop(rx);

        for line in input.lines() {
            if failed.load(Ordering::Relaxed) {
                break;
            }
            let entry = line?;
            if entry.is_empty() || env.is_ignored(&entry) {
                continue;
            }
            entries += 1;
            if let Some(every) = opts.progress {
                if entries % every == 0 {
                    log::info!("dispatched {} entries", entries);
                }
            }
            if let Some(pace) = opts.pace {
                std::thread::sleep(pace);
            }
            if tx.send(entry).is_err() {
                break;
            }
        }
        drop(tx);
        Ok(())
    })?;

    if let Ok(mut slot) = first_error.lock() {
        if let Some(err) = slot.take() {
            return Err(err);
        }
    }
    Ok(Stats {
        entries,
        lines_emitted: emitted.into_inner(),
    })
}
