//! Per-run output files.
//!
//! A run directory holds one `node-<i>.txt` trace per node and a
//! `transmit_history.txt` channel map. Records are appended every
//! `write_interval` of simulated time; nothing here runs when output is off.

use crate::RunnerError;
use chrono::{DateTime, Utc};
use lfgsim_common::{Settings, SimTime};
use lfgsim_firmware::Node;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Name of the channel-activity file inside a run directory.
pub const TRANSMIT_HISTORY_FILE: &str = "transmit_history.txt";

/// Run directory name for a start time, e.g. `2024-05-01-13-45-09`.
pub fn run_dir_name(start: DateTime<Utc>) -> String {
    start.format("%Y-%m-%d-%H-%M-%S").to_string()
}

/// File name of a node's trace.
pub fn node_file_name(index: usize) -> String {
    format!("node-{}.txt", index)
}

/// One node record: time, channel, function id, position, then the signal
/// heard from every node.
pub fn format_node_record(time: SimTime, node: &Node) -> String {
    let k = &node.kinematics;
    let signals: String = node
        .radio
        .received_signal
        .iter()
        .map(|signal| format!("\t{:.6}", signal))
        .collect();
    format!(
        "{:.6}\t{}\t{}\t{:.6}\t{:.6}\t{:.6}{}\n",
        time.as_secs_f64(),
        node.radio.active_channel,
        node.mcu.current_function.id(),
        k.position.x,
        k.position.y,
        k.position.z,
        signals,
    )
}

/// Transmit-history header: `Time`, an empty column, then channel numbers.
pub fn format_history_header(channel_count: usize) -> String {
    let channels: String = (0..channel_count).map(|channel| format!("\t{}", channel)).collect();
    format!("Time\t{}\n", channels)
}

/// One transmit-history line: `X` for every channel someone is transmitting
/// on, `.` otherwise.
pub fn format_history_record(time: SimTime, nodes: &[Node], channel_count: usize) -> String {
    let mut active = vec![false; channel_count];
    for node in nodes.iter().filter(|n| n.radio.transmit_active) {
        if let Some(slot) = active.get_mut(node.radio.active_channel as usize) {
            *slot = true;
        }
    }
    let markers: Vec<&str> = active.iter().map(|&on| if on { "X" } else { "." }).collect();
    format!("{:.6}\t{}\n", time.as_secs_f64(), markers.join("\t"))
}

/// Writer for a run directory.
pub struct OutputWriter {
    dir: PathBuf,
    node_files: Vec<BufWriter<File>>,
    history: BufWriter<File>,
    channel_count: usize,
    interval: SimTime,
    tick: SimTime,
}

impl OutputWriter {
    /// Create a timestamped run directory under `settings.output_root`.
    pub fn create(settings: &Settings, nodes: &[Node]) -> Result<Self, RunnerError> {
        let dir = settings.output_root.join(run_dir_name(Utc::now()));
        Self::create_in(&dir, settings, nodes)
    }

    /// Create the output files in `dir` (created with parents) and write the
    /// time-zero node records and the history header.
    pub fn create_in(dir: &Path, settings: &Settings, nodes: &[Node]) -> Result<Self, RunnerError> {
        fs::create_dir_all(dir)?;

        let mut node_files = Vec::with_capacity(nodes.len());
        for node in nodes {
            let mut file = BufWriter::new(File::create(dir.join(node_file_name(node.id.index())))?);
            file.write_all(format_node_record(SimTime::ZERO, node).as_bytes())?;
            node_files.push(file);
        }

        let mut history = BufWriter::new(File::create(dir.join(TRANSMIT_HISTORY_FILE))?);
        history.write_all(format_history_header(settings.channel_count).as_bytes())?;

        tracing::info!("Writing output to {}", dir.display());
        Ok(OutputWriter {
            dir: dir.to_path_buf(),
            node_files,
            history,
            channel_count: settings.channel_count,
            interval: settings.write_every(),
            tick: settings.tick(),
        })
    }

    /// The run directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Whether a record is due at `now`: the first tick of each write interval.
    pub fn is_due(&self, now: SimTime) -> bool {
        now.rem(self.interval) < self.tick
    }

    /// Append one record per node and one transmit-history line.
    pub fn write(&mut self, now: SimTime, nodes: &[Node]) -> Result<(), RunnerError> {
        for (file, node) in self.node_files.iter_mut().zip(nodes) {
            file.write_all(format_node_record(now, node).as_bytes())?;
        }
        self.history
            .write_all(format_history_record(now, nodes, self.channel_count).as_bytes())?;
        Ok(())
    }

    /// Flush buffered records to disk.
    pub fn flush(&mut self) -> Result<(), RunnerError> {
        for file in &mut self.node_files {
            file.flush()?;
        }
        self.history.flush()?;
        Ok(())
    }
}
