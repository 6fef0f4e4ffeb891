use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Instant;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::command_builder::{self, CommandLine};
use crate::error_handler::{FeatureGenError, Result};
use crate::runner::{ProcessRunner, RunOutcome};
use crate::store::LlmConfiguration;

/// Result of running one configuration against one user story.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionReport {
    pub llm_name: String,
    pub story_path: String,
    pub command_line: CommandLine,
    pub outcome: RunOutcome,
    pub duration_ms: u64,
}

impl ExecutionReport {
    pub fn success(&self) -> bool {
        self.outcome.success
    }
}

/// Runs configurations against user stories. Each run owns its own command
/// line and output buffers; nothing is shared between concurrent runs.
#[derive(Debug, Clone, Default)]
pub struct Executor {
    runner: ProcessRunner,
}

impl Executor {
    pub fn new(runner: ProcessRunner) -> Self {
        Self { runner }
    }

    pub async fn execute(&self, config: &LlmConfiguration, story_path: &str) -> ExecutionReport {
        let command_line = command_builder::build(config, story_path);
        info!(llm = %config.name, story = story_path, "running generator");

        let started = Instant::now();
        let outcome = self.runner.run_command_line(&command_line).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        if outcome.success {
            info!(llm = %config.name, duration_ms, "generator finished");
        } else {
            warn!(llm = %config.name, exit_code = ?outcome.exit_code, duration_ms, "generator failed");
        }

        ExecutionReport {
            llm_name: config.name.clone(),
            story_path: story_path.to_string(),
            command_line,
            outcome,
            duration_ms,
        }
    }

    /// Runs every configuration against every story and returns all reports,
    /// ordered by story then configuration. A failing run does not stop the
    /// others. `on_done` is called as each run completes.
    pub async fn execute_batch<F>(
        &self,
        configs: &[LlmConfiguration],
        stories: &[String],
        parallel: bool,
        mut on_done: F,
    ) -> Result<Vec<ExecutionReport>>
    where
        F: FnMut(&ExecutionReport),
    {
        if configs.is_empty() {
            return Err(FeatureGenError::NoConfigurations);
        }
        warn_on_shared_directories(configs);

        let jobs: Vec<(LlmConfiguration, String)> = stories
            .iter()
            .flat_map(|story| configs.iter().map(move |c| (c.clone(), story.clone())))
            .collect();

        if !parallel {
            let mut reports = Vec::with_capacity(jobs.len());
            for (config, story) in &jobs {
                let report = self.execute(config, story).await;
                on_done(&report);
                reports.push(report);
            }
            return Ok(reports);
        }

        let mut set = JoinSet::new();
        for (index, (config, story)) in jobs.iter().cloned().enumerate() {
            let executor = self.clone();
            set.spawn(async move { (index, executor.execute(&config, &story).await) });
        }

        let mut slots: Vec<Option<ExecutionReport>> = Vec::new();
        slots.resize_with(jobs.len(), || None);
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((index, report)) => {
                    on_done(&report);
                    slots[index] = Some(report);
                }
                Err(e) => warn!(error = %e, "generator task did not complete"),
            }
        }

        Ok(fill_lost_slots(slots, &jobs, &mut on_done))
    }
}

/// Turns every empty slot (a task that panicked or was cancelled) into a
/// failed report so the batch still accounts for that run.
fn fill_lost_slots<F>(
    slots: Vec<Option<ExecutionReport>>,
    jobs: &[(LlmConfiguration, String)],
    on_done: &mut F,
) -> Vec<ExecutionReport>
where
    F: FnMut(&ExecutionReport),
{
    slots
        .into_iter()
        .zip(jobs)
        .map(|(slot, (config, story))| match slot {
            Some(report) => report,
            None => {
                let report = ExecutionReport {
                    llm_name: config.name.clone(),
                    story_path: story.clone(),
                    command_line: command_builder::build(config, story),
                    outcome: RunOutcome::failed(format!(
                        "generator task for '{}' did not complete",
                        config.name
                    )),
                    duration_ms: 0,
                };
                on_done(&report);
                report
            }
        })
        .collect()
}

fn warn_on_shared_directories(configs: &[LlmConfiguration]) {
    let mut by_dir: HashMap<PathBuf, Vec<&str>> = HashMap::new();
    for config in configs {
        let dir = command_builder::working_directory(config);
        by_dir.entry(dir).or_default().push(&config.name);
    }
    for (dir, names) in by_dir {
        if names.len() > 1 {
            warn!(
                cwd = %dir.display(),
                llms = %names.join(", "),
                "several configurations share a working directory; their output files may collide"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lost_tasks_become_failed_reports() {
        let jobs = vec![
            (LlmConfiguration::new("gpt", "gen.py", "python3"), "a.txt".to_string()),
            (LlmConfiguration::new("gemini", "gen.py", "python3"), "a.txt".to_string()),
        ];
        let finished = ExecutionReport {
            llm_name: "gpt".to_string(),
            story_path: "a.txt".to_string(),
            command_line: command_builder::build(&jobs[0].0, "a.txt"),
            outcome: RunOutcome {
                success: true,
                exit_code: Some(0),
                output: "Feature: Login".to_string(),
            },
            duration_ms: 5,
        };

        let mut notified = Vec::new();
        let reports = fill_lost_slots(vec![Some(finished), None], &jobs, &mut |r: &ExecutionReport| {
            notified.push(r.llm_name.clone())
        });

        assert_eq!(reports.len(), 2);
        assert!(reports[0].success());
        assert!(!reports[1].success());
        assert_eq!(reports[1].llm_name, "gemini");
        assert_eq!(reports[1].outcome.exit_code, None);
        assert!(reports[1].outcome.output.contains("did not complete"));
        assert_eq!(notified, vec!["gemini".to_string()]);
    }
}
