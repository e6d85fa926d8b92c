//! Before/after comparison of two runs over the same workload.

use serde::{Deserialize, Serialize};

use crate::collector::MetricsSnapshot;

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    /// Hit the tick bound; the snapshot is partial.
    Exhausted,
    Cancelled,
}

impl RunStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Exhausted => "EXHAUSTED (partial)",
            Self::Cancelled => "CANCELLED (partial)",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub policy: String,
    pub status: RunStatus,
    pub snapshot: MetricsSnapshot,
}

/// Percentage improvement of candidate over baseline. Positive is better.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Improvements {
    pub weighted_turnaround_pct: f64,
    pub makespan_pct: f64,
    pub utilization_pct: f64,
    /// Mean of the three above.
    pub overall_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub baseline: RunSummary,
    /// The candidate's last run.
    pub candidate: RunSummary,
    pub improvements: Improvements,
    /// Every training episode the candidate ran, oldest first. Empty for
    /// a single run.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub candidate_episodes: Vec<RunSummary>,
}

impl ComparisonReport {
    pub fn new(baseline: RunSummary, candidate: RunSummary) -> Self {
        let b = &baseline.snapshot;
        let c = &candidate.snapshot;
        let weighted_turnaround_pct =
            improvement_pct(b.avg_weighted_turnaround, c.avg_weighted_turnaround, true);
        let makespan_pct = improvement_pct(b.makespan, c.makespan, true);
        let utilization_pct = improvement_pct(b.avg_cpu_utilization, c.avg_cpu_utilization, false);

        let improvements = Improvements {
            weighted_turnaround_pct,
            makespan_pct,
            utilization_pct,
            overall_pct: (weighted_turnaround_pct + makespan_pct + utilization_pct) / 3.0,
        };
        Self {
            baseline,
            candidate,
            improvements,
            candidate_episodes: Vec::new(),
        }
    }

    pub fn with_episodes(mut self, episodes: Vec<RunSummary>) -> Self {
        self.candidate_episodes = episodes;
        self
    }

    /// True when both runs finished every task.
    pub fn both_completed(&self) -> bool {
        self.baseline.status == RunStatus::Completed && self.candidate.status == RunStatus::Completed
    }
}

/// Index of the completed run with the lowest average weighted turnaround.
pub fn best_episode(episodes: &[RunSummary]) -> Option<usize> {
    episodes
        .iter()
        .enumerate()
        .filter(|(_, e)| e.status == RunStatus::Completed)
        .min_by(|(_, a), (_, b)| {
            a.snapshot
                .avg_weighted_turnaround
                .total_cmp(&b.snapshot.avg_weighted_turnaround)
        })
        .map(|(i, _)| i)
}

/// Relative change from `before` to `after`, in percent, signed so that
/// positive means the candidate did better. A zero baseline yields 0.
pub fn improvement_pct(before: f64, after: f64, lower_is_better: bool) -> f64 {
    if before == 0.0 {
        return 0.0;
    }
    let delta = if lower_is_better { before - after } else { after - before };
    delta / before.abs() * 100.0
}

pub fn format_report(report: &ComparisonReport) -> String {
    let mut out = String::new();
    let b = &report.baseline;
    let c = &report.candidate;
    let imp = &report.improvements;

    out.push_str("\n╔══════════════════════════════════════════╗\n");
    out.push_str("║  GridSim Policy Comparison               ║\n");
    out.push_str("╠══════════════════════════════════════════╣\n");
    out.push_str(&format!("║  Baseline:  {:<29}║\n", b.policy));
    out.push_str(&format!("║  Candidate: {:<29}║\n", c.policy));
    out.push_str("╚══════════════════════════════════════════╝\n\n");

    out.push_str(&format!(
        "  {:<24}{:>14}{:>14}{:>12}\n",
        "metric", b.policy, c.policy, "change"
    ));
    row(
        &mut out,
        "avg weighted turnaround",
        b.snapshot.avg_weighted_turnaround,
        c.snapshot.avg_weighted_turnaround,
        Some(imp.weighted_turnaround_pct),
    );
    row(&mut out, "makespan", b.snapshot.makespan, c.snapshot.makespan, Some(imp.makespan_pct));
    row(
        &mut out,
        "avg cpu utilization",
        b.snapshot.avg_cpu_utilization * 100.0,
        c.snapshot.avg_cpu_utilization * 100.0,
        Some(imp.utilization_pct),
    );
    row(
        &mut out,
        "avg turnaround",
        b.snapshot.avg_turnaround,
        c.snapshot.avg_turnaround,
        None,
    );
    out.push_str(&format!(
        "  {:<24}{:>14}{:>14}\n",
        "completed", b.snapshot.completed_count, c.snapshot.completed_count
    ));
    out.push_str(&format!(
        "  {:<24}{:>14}{:>14}\n",
        "skipped", b.snapshot.skipped_count, c.snapshot.skipped_count
    ));
    out.push_str(&format!("  {:<24}{:>14}{:>14}\n\n", "ticks", b.snapshot.ticks, c.snapshot.ticks));

    if !report.candidate_episodes.is_empty() {
        out.push_str(&format_episodes(&report.candidate_episodes));
        out.push('\n');
    }

    out.push_str(&format!("Overall improvement: {:+.2}%\n", imp.overall_pct));

    for run in [b, c] {
        if run.status != RunStatus::Completed {
            out.push_str(&format!("⚠️  {} run {}\n", run.policy, run.status.label()));
        }
    }

    out
}

/// One run's metrics as an aligned block of text.
pub fn format_summary(summary: &RunSummary) -> String {
    let s = &summary.snapshot;
    let mut out = String::new();
    out.push_str(&format!("\nPolicy: {} ({})\n\n", summary.policy, summary.status.label()));
    out.push_str(&format!("  {:<24}{:>14.3}\n", "avg weighted turnaround", s.avg_weighted_turnaround));
    out.push_str(&format!("  {:<24}{:>14.3}\n", "makespan", s.makespan));
    out.push_str(&format!("  {:<24}{:>13.2}%\n", "avg cpu utilization", s.avg_cpu_utilization * 100.0));
    out.push_str(&format!("  {:<24}{:>14.3}\n", "avg turnaround", s.avg_turnaround));
    out.push_str(&format!("  {:<24}{:>14}\n", "completed", s.completed_count));
    out.push_str(&format!("  {:<24}{:>14}\n", "skipped", s.skipped_count));
    out.push_str(&format!("  {:<24}{:>14}\n", "ticks", s.ticks));
    out
}

/// One line per training episode, with the best one marked.
pub fn format_episodes(episodes: &[RunSummary]) -> String {
    let best = best_episode(episodes);
    let mut out = String::new();
    out.push_str(&format!(
        "  {:<10}{:>14}{:>14}{:>10}  {}\n",
        "episode", "weighted ta", "makespan", "ticks", "status"
    ));
    for (i, e) in episodes.iter().enumerate() {
        let marker = if Some(i) == best { " *" } else { "" };
        out.push_str(&format!(
            "  {:<10}{:>14.3}{:>14.3}{:>10}  {}{}\n",
            i + 1,
            e.snapshot.avg_weighted_turnaround,
            e.snapshot.makespan,
            e.snapshot.ticks,
            e.status.label(),
            marker
        ));
    }
    out
}

fn row(out: &mut String, name: &str, before: f64, after: f64, change: Option<f64>) {
    match change {
        Some(pct) => out.push_str(&format!("  {name:<24}{before:>14.3}{after:>14.3}{pct:>+11.2}%\n")),
        None => out.push_str(&format!("  {name:<24}{before:>14.3}{after:>14.3}\n")),
    }
}
