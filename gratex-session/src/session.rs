use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use gratex_core::{GratexError, GratexResult, PerformanceRecord};
use gratex_display::{DisplayDevice, FeedbackLine, Scheduler, Screen, SignalPort, Start};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::log::PresentationLog;
use crate::shuffle::hashed_order;

/// How a session orders its stimulus set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderPolicy {
    /// Content-hash order: pseudorandom in appearance, identical on every run.
    #[default]
    Hashed,
    /// Uniform random order, reshuffled at each wraparound.
    Random,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Directory whose regular files are the animation set.
    pub dir: PathBuf,
    /// Stimulus type written to logs and results.
    pub stimulus_type: String,
    pub order: OrderPolicy,
    /// Background hold between presentations.
    pub trial_interval: Duration,
}

/// One completed presentation.
#[derive(Debug, Clone, Serialize)]
pub struct Presentation {
    pub stimulus_type: String,
    pub identifier: String,
    pub record: PerformanceRecord,
}

/// What a session produced, and whether the operator cut it short.
#[derive(Debug)]
pub struct SessionOutcome {
    pub presentations: Vec<Presentation>,
    pub aborted: bool,
}

/// Every regular file in `dir`, sorted by path so downstream ordering never
/// depends on directory enumeration order.
pub fn scan_animations(dir: &Path) -> GratexResult<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| GratexError::io("read", dir, e))? {
        let entry = entry.map_err(|e| GratexError::io("read", dir, e))?;
        let path = entry.path();
        if path.is_file() {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

/// Serializes presentations to pretty JSON at `path`.
pub fn export_results(path: &Path, presentations: &[Presentation]) -> GratexResult<()> {
    let json = serde_json::to_string_pretty(presentations)?;
    fs::write(path, json).map_err(|e| GratexError::io("write", path, e))
}

/// Plays every animation in the configured directory once, back to back,
/// holding the background for the trial interval between presentations.
/// Returns early with what was shown when the operator aborts.
pub fn run_ordered<D, F>(
    screen: &mut Screen<D>,
    config: &SessionConfig,
    signals: &mut SignalPort,
    feedback: &mut F,
    mut log: Option<&mut PresentationLog>,
) -> GratexResult<SessionOutcome>
where
    D: DisplayDevice,
    F: FeedbackLine,
{
    let paths = scan_animations(&config.dir)?;
    if paths.is_empty() {
        return Err(GratexError::validation(format!(
            "no animation files in {}",
            config.dir.display()
        )));
    }
    let names = identifiers(&paths);
    let order = ordered_indices(&names, config.order);
    info!(stimuli = paths.len(), order = ?config.order, "session start");

    let mut scheduler = Scheduler::new();
    let mut presentations = Vec::with_capacity(paths.len());
    for &index in &order {
        let sequence = screen.load_sequence(&paths[index])?;
        let outcome = scheduler.play(screen, &sequence, Start::Immediate, signals, feedback)?;
        screen.unload(sequence);
        let Some(record) = outcome else {
            info!(shown = presentations.len(), "session aborted");
            return Ok(SessionOutcome {
                presentations,
                aborted: true,
            });
        };
        presentations.push(note(config, &names[index], record, &mut log)?);

        screen.fill(i32::from(screen.background()))?;
        if !config.trial_interval.is_zero() {
            std::thread::sleep(config.trial_interval);
        }
    }
    info!(shown = presentations.len(), "session complete");
    Ok(SessionOutcome {
        presentations,
        aborted: false,
    })
}

/// Cycles the animation set indefinitely, each presentation gated on a rising
/// edge on `channel`. A random-policy session reshuffles at every wraparound;
/// a hashed-policy one repeats the same order. Only an operator abort ends it.
pub fn run_on_trigger<D, F>(
    screen: &mut Screen<D>,
    config: &SessionConfig,
    channel: u8,
    signals: &mut SignalPort,
    feedback: &mut F,
    mut log: Option<&mut PresentationLog>,
) -> GratexResult<SessionOutcome>
where
    D: DisplayDevice,
    F: FeedbackLine,
{
    let paths = scan_animations(&config.dir)?;
    if paths.is_empty() {
        return Err(GratexError::validation(format!(
            "no animation files in {}",
            config.dir.display()
        )));
    }
    let names = identifiers(&paths);
    let mut order = ordered_indices(&names, config.order);
    info!(stimuli = paths.len(), channel, "trigger-gated session start");

    let mut scheduler = Scheduler::new();
    let mut presentations = Vec::new();
    loop {
        for &index in &order {
            let sequence = screen.load_sequence(&paths[index])?;
            let outcome =
                scheduler.play(screen, &sequence, Start::OnTrigger { channel }, signals, feedback)?;
            screen.unload(sequence);
            let Some(record) = outcome else {
                info!(shown = presentations.len(), "session aborted");
                return Ok(SessionOutcome {
                    presentations,
                    aborted: true,
                });
            };
            presentations.push(note(config, &names[index], record, &mut log)?);
            screen.fill(i32::from(screen.background()))?;
        }
        if config.order == OrderPolicy::Random {
            order.shuffle(&mut rand::rng());
        }
        debug!(shown = presentations.len(), "stimulus set wrapped around");
    }
}

fn identifiers(paths: &[PathBuf]) -> Vec<String> {
    paths
        .iter()
        .map(|p| {
            p.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| p.display().to_string())
        })
        .collect()
}

fn ordered_indices(names: &[String], policy: OrderPolicy) -> Vec<usize> {
    match policy {
        OrderPolicy::Hashed => hashed_order(names),
        OrderPolicy::Random => {
            let mut indices: Vec<usize> = (0..names.len()).collect();
            indices.shuffle(&mut rand::rng());
            indices
        }
    }
}

fn note(
    config: &SessionConfig,
    identifier: &str,
    record: PerformanceRecord,
    log: &mut Option<&mut PresentationLog>,
) -> GratexResult<Presentation> {
    if let Some(log) = log.as_deref_mut() {
        log.append(&config.stimulus_type, identifier, &record)?;
    }
    debug!(
        identifier,
        mean_us = record.mean_interframe_us,
        stddev_us = record.stddev_interframe_us,
        "presentation done"
    );
    Ok(Presentation {
        stimulus_type: config.stimulus_type.clone(),
        identifier: identifier.to_owned(),
        record,
    })
}
