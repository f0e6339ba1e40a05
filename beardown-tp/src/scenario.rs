//! Reference fault scenarios and the pass/fail scorecard.
//!
//! Each [`Scenario`] is plain data: which faults the channel injects, what
//! payload to push through it, how many driver steps it may take and, for
//! throughput checks, a wall-clock limit.  One generic [`Scenario::run`]
//! executes any of them.

use std::fmt;
use std::time::Duration;

use crate::receiver::Receiver;
use crate::sender::Sender;
use crate::simulator::{Simulator, SimulatorConfig, SimulatorError};
use crate::timer::TimerConfig;
use crate::transfer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioKind {
    Basic,
    Speed,
    Loss,
    Corruption,
    Duplication,
    Delay,
}

impl fmt::Display for ScenarioKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScenarioKind::Basic => "Basic Test",
            ScenarioKind::Speed => "Basic Speed",
            ScenarioKind::Loss => "Random Drops",
            ScenarioKind::Corruption => "Corruption",
            ScenarioKind::Duplication => "Duplication",
            ScenarioKind::Delay => "Delay",
        };
        f.write_str(name)
    }
}

/// How a scenario builds its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadGenerator {
    /// `pattern` repeated `times` times.
    Repeat { pattern: &'static [u8], times: usize },
    /// `len` bytes of `i % 256`.
    Counter { len: usize },
}

impl PayloadGenerator {
    pub fn generate(&self) -> Vec<u8> {
        match self {
            PayloadGenerator::Repeat { pattern, times } => pattern.repeat(*times),
            PayloadGenerator::Counter { len } => (0..*len).map(|i| i as u8).collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Scenario {
    pub kind: ScenarioKind,
    pub points: u32,
    pub faults: SimulatorConfig,
    pub payload: PayloadGenerator,
    pub max_steps: usize,
    /// Throughput requirement: the transfer must finish within this time.
    pub time_limit: Option<Duration>,
}

/// The six reference scenarios.
pub fn standard_suite() -> Vec<Scenario> {
    let clean = SimulatorConfig::default();
    vec![
        Scenario {
            kind: ScenarioKind::Basic,
            points: 2,
            faults: clean.clone(),
            payload: PayloadGenerator::Repeat { pattern: b"A", times: 100 },
            max_steps: 100,
            time_limit: None,
        },
        Scenario {
            kind: ScenarioKind::Speed,
            points: 1,
            faults: clean.clone(),
            payload: PayloadGenerator::Counter { len: 100 * 1024 },
            max_steps: 1000,
            time_limit: Some(Duration::from_secs(60)),
        },
        Scenario {
            kind: ScenarioKind::Loss,
            points: 2,
            faults: SimulatorConfig {
                loss_rate: 0.1,
                ..clean.clone()
            },
            payload: PayloadGenerator::Repeat {
                pattern: b"Test data with loss: ",
                times: 100,
            },
            max_steps: 2000,
            time_limit: None,
        },
        Scenario {
            kind: ScenarioKind::Corruption,
            points: 2,
            faults: SimulatorConfig {
                corruption_rate: 0.05,
                ..clean.clone()
            },
            payload: PayloadGenerator::Repeat {
                pattern: b"Testing corruption detection mechanism: ",
                times: 50,
            },
            max_steps: 2000,
            time_limit: None,
        },
        Scenario {
            kind: ScenarioKind::Duplication,
            points: 2,
            faults: SimulatorConfig {
                duplicate_rate: 0.05,
                ..clean.clone()
            },
            payload: PayloadGenerator::Repeat {
                pattern: b"Deduplication test payload data: ",
                times: 40,
            },
            max_steps: 2000,
            time_limit: None,
        },
        Scenario {
            kind: ScenarioKind::Delay,
            points: 1,
            faults: SimulatorConfig {
                delay: Duration::ZERO..Duration::from_millis(500),
                ..clean
            },
            payload: PayloadGenerator::Repeat {
                pattern: b"Delay test with up to 500ms latency: ",
                times: 30,
            },
            max_steps: 1500,
            time_limit: None,
        },
    ]
}

/// Result of running one scenario.
#[derive(Debug, Clone)]
pub struct ScenarioOutcome {
    pub kind: ScenarioKind,
    pub points: u32,
    pub passed: bool,
    pub message: String,
    pub duration: Duration,
}

impl ScenarioOutcome {
    pub fn earned(&self) -> u32 {
        if self.passed {
            self.points
        } else {
            0
        }
    }
}

impl Scenario {
    /// Push this scenario's payload through a simulator seeded with `seed`.
    pub async fn run(
        &self,
        seed: u64,
        timers: &TimerConfig,
    ) -> Result<ScenarioOutcome, SimulatorError> {
        let mut channel = Simulator::with_seed(self.faults.clone(), seed)?;
        let data = self.payload.generate();

        let mut sender = Sender::with_config(timers.clone());
        sender.load(data.clone());
        let report = transfer::run(sender, Receiver::new(), &mut channel, self.max_steps).await;

        let sim = channel.stats();
        let (passed, message) = if report.delivered != data {
            (
                false,
                format!(
                    "Data mismatch: sent {} bytes, received {} bytes",
                    data.len(),
                    report.delivered.len()
                ),
            )
        } else if let Some(limit) = self.time_limit.filter(|limit| report.elapsed >= *limit) {
            (
                false,
                format!("Transfer took too long: {:.2?} (limit {limit:?})", report.elapsed),
            )
        } else {
            let detail = match self.kind {
                ScenarioKind::Loss => {
                    format!("lost {}/{} packets", sim.packets_lost, sim.packets_sent)
                }
                ScenarioKind::Corruption => {
                    format!("detected {} corrupted packets", sim.packets_corrupted)
                }
                ScenarioKind::Duplication => format!(
                    "{} duplicated packets, {} duplicate segments discarded",
                    sim.packets_duplicated, report.receiver_stats.duplicates_received
                ),
                ScenarioKind::Delay => format!("{} packets delayed", sim.packets_delayed),
                ScenarioKind::Basic | ScenarioKind::Speed => format!(
                    "{:.2} KB/s",
                    data.len() as f64 / report.elapsed.as_secs_f64().max(1e-6) / 1024.0
                ),
            };
            (
                true,
                format!(
                    "Transferred {} bytes intact in {} steps ({detail})",
                    data.len(),
                    report.steps
                ),
            )
        };

        log::info!("[scenario] {}: passed={passed} {message}", self.kind);
        Ok(ScenarioOutcome {
            kind: self.kind,
            points: self.points,
            passed,
            message,
            duration: report.elapsed,
        })
    }
}

/// Collected outcomes of a suite run.
#[derive(Debug, Clone, Default)]
pub struct Scorecard {
    pub outcomes: Vec<ScenarioOutcome>,
}

impl Scorecard {
    pub fn push(&mut self, outcome: ScenarioOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn earned(&self) -> u32 {
        self.outcomes.iter().map(ScenarioOutcome::earned).sum()
    }

    pub fn total(&self) -> u32 {
        self.outcomes.iter().map(|o| o.points).sum()
    }

    pub fn all_passed(&self) -> bool {
        self.outcomes.iter().all(|o| o.passed)
    }
}

/// Run every scenario of `suite` with the same seed.
pub async fn run_suite(
    suite: &[Scenario],
    seed: u64,
    timers: &TimerConfig,
) -> Result<Scorecard, SimulatorError> {
    let mut card = Scorecard::default();
    for scenario in suite {
        card.push(scenario.run(seed, timers).await?);
    }
    Ok(card)
}

impl fmt::Display for Scorecard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(70);
        writeln!(f, "{rule}")?;
        writeln!(f, "BEARDOWN-TP Protocol Report")?;
        writeln!(f, "{rule}")?;
        for o in &self.outcomes {
            let status = if o.passed { "PASS" } else { "FAIL" };
            writeln!(f, "{} ({} pts) [{status}]", o.kind, o.points)?;
            writeln!(f, "  Message:  {}", o.message)?;
            writeln!(f, "  Duration: {:.2?}", o.duration)?;
            writeln!(f, "  Score:    {}/{}", o.earned(), o.points)?;
        }
        writeln!(f, "{rule}")?;
        writeln!(f, "FINAL SCORE: {}/{} points", self.earned(), self.total())?;
        write!(f, "{rule}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_generators() {
        assert_eq!(
            PayloadGenerator::Repeat { pattern: b"ab", times: 3 }.generate(),
            b"ababab"
        );
        let counter = PayloadGenerator::Counter { len: 300 }.generate();
        assert_eq!(counter[255], 255);
        assert_eq!(counter[256], 0);
    }

    #[test]
    fn suite_is_worth_ten_points() {
        let suite = standard_suite();
        assert_eq!(suite.len(), 6);
        assert_eq!(suite.iter().map(|s| s.points).sum::<u32>(), 10);
    }

    #[test]
    fn scorecard_renders_final_score() {
        let mut card = Scorecard::default();
        card.push(ScenarioOutcome {
            kind: ScenarioKind::Basic,
            points: 2,
            passed: true,
            message: "ok".into(),
            duration: Duration::from_millis(3),
        });
        card.push(ScenarioOutcome {
            kind: ScenarioKind::Delay,
            points: 1,
            passed: false,
            message: "slow".into(),
            duration: Duration::from_secs(1),
        });
        assert_eq!(card.earned(), 2);
        assert_eq!(card.total(), 3);
        assert!(!card.all_passed());
        let text = card.to_string();
        assert!(text.contains("Basic Test (2 pts) [PASS]"));
        assert!(text.contains("Delay (1 pts) [FAIL]"));
        assert!(text.contains("FINAL SCORE: 2/3 points"));
    }
}
