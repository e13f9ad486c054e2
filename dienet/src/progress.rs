// SPDX-License-Identifier: Apache-2.0

//! Best-effort progress reporting for the long pipeline stages.

use std::time::Instant;

pub struct ProgressMeter {
    stage: String,
    started: Instant,
    last_reported_second: Option<u64>,
}

fn minutes_seconds(total_seconds: u64) -> String {
    format!("{}:{:02}", total_seconds / 60, total_seconds % 60)
}

impl ProgressMeter {
    /// Starts timing a new stage and logs its name.
    pub fn start(stage: &str) -> Self {
        log::info!("{}", stage);
        ProgressMeter {
            stage: stage.to_string(),
            started: Instant::now(),
            last_reported_second: None,
        }
    }

    pub fn stage(&self) -> &str {
        &self.stage
    }

    /// Records that item `pos` out of `max` is being processed. Logs the
    /// percentage done and the estimated remaining time whenever that
    /// estimate changes by a whole second, and once more at completion.
    pub fn tick(&mut self, pos: usize, max: usize) {
        if max == 0 {
            return;
        }
        let done = pos + 1 == max;
        let ratio = (pos + 1) as f64 / max as f64;
        let elapsed_ms = self.started.elapsed().as_millis() as f64;
        let remaining_ms = if done {
            elapsed_ms
        } else {
            elapsed_ms / ratio * (1.0 - ratio)
        };
        let seconds = (remaining_ms / 1000.0) as u64;
        if done {
            log::info!(
                "{}: 100% in {}",
                self.stage,
                minutes_seconds(seconds)
            );
            self.last_reported_second = Some(seconds);
        } else if self.last_reported_second != Some(seconds) {
            log::debug!(
                "{}: {:3}% {} remaining",
                self.stage,
                (100.0 * ratio + 0.5) as u32,
                minutes_seconds(seconds)
            );
            self.last_reported_second = Some(seconds);
        }
    }
}
