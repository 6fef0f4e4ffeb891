use anyhow::{Context, Result};
use handlebars::{handlebars_helper, no_escape, Handlebars};
use serde::{Deserialize, Serialize};

use crate::executor::ExecutionReport;

#[derive(clap::ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Plain,
    Markdown,
    Json,
}

const PLAIN_TEMPLATE: &str = "\
Feature generation report ({{generated_at}})
{{succeeded}}/{{total}} {{pluralize total \"run\" \"runs\"}} succeeded
{{#each runs}}

{{status_icon success}} {{llm_name}} <- {{story_path}} ({{duration_ms}} ms{{#if exit_code_known}}, exit {{exit_code}}{{/if}})
   command: {{command}}
   cwd: {{working_directory}}
{{#if output}}
{{output}}
{{/if}}
{{/each}}
";

const MARKDOWN_TEMPLATE: &str = "\
# Feature Generation Report

_Generated {{generated_at}}_

**{{succeeded}}** of **{{total}}** {{pluralize total \"run\" \"runs\"}} succeeded{{#if failed}}, **{{failed}}** failed{{/if}}.

| | LLM | User story | Exit | Duration |
|---|---|---|---|---|
{{#each runs}}
| {{status_icon success}} | {{llm_name}} | `{{story_path}}` | {{#if exit_code_known}}{{exit_code}}{{else}}-{{/if}} | {{duration_ms}} ms |
{{/each}}
{{#each runs}}

## {{status_icon success}} {{llm_name}}: `{{story_path}}`

- **Command:** `{{command}}`
- **Working directory:** `{{working_directory}}`

{{#if output}}
```text
{{output}}
```
{{else}}
_No output._
{{/if}}
{{/each}}
";

handlebars_helper!(status_icon: |success: bool| if success { "✅" } else { "❌" });
handlebars_helper!(pluralize: |count: u64, singular: str, plural: str| {
    if count == 1 { singular.to_string() } else { plural.to_string() }
});

#[derive(Debug, Serialize)]
struct ReportContext {
    generated_at: String,
    total: usize,
    succeeded: usize,
    failed: usize,
    runs: Vec<RunView>,
}

#[derive(Debug, Serialize)]
struct RunView {
    llm_name: String,
    story_path: String,
    success: bool,
    exit_code_known: bool,
    exit_code: i32,
    command: String,
    working_directory: String,
    duration_ms: u64,
    output: String,
}

impl From<&ExecutionReport> for RunView {
    fn from(report: &ExecutionReport) -> Self {
        Self {
            llm_name: report.llm_name.clone(),
            story_path: report.story_path.clone(),
            success: report.outcome.success,
            exit_code_known: report.outcome.exit_code.is_some(),
            exit_code: report.outcome.exit_code.unwrap_or_default(),
            command: report.command_line.to_string(),
            working_directory: report.command_line.working_directory.display().to_string(),
            duration_ms: report.duration_ms,
            output: report.outcome.output.clone(),
        }
    }
}

pub struct ReportRenderer {
    handlebars: Handlebars<'static>,
}

impl ReportRenderer {
    pub fn new() -> Result<Self> {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(false);
        handlebars.register_escape_fn(no_escape);
        handlebars.register_helper("status_icon", Box::new(status_icon));
        handlebars.register_helper("pluralize", Box::new(pluralize));
        handlebars
            .register_template_string("plain", PLAIN_TEMPLATE)
            .context("Failed to register plain report template")?;
        handlebars
            .register_template_string("markdown", MARKDOWN_TEMPLATE)
            .context("Failed to register markdown report template")?;

        Ok(Self { handlebars })
    }

    pub fn render(&self, reports: &[ExecutionReport], format: OutputFormat) -> Result<String> {
        let succeeded = reports.iter().filter(|r| r.success()).count();
        let context = ReportContext {
            generated_at: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            total: reports.len(),
            succeeded,
            failed: reports.len() - succeeded,
            runs: reports.iter().map(RunView::from).collect(),
        };

        match format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(&JsonReport {
                generated_at: chrono::Utc::now().to_rfc3339(),
                total: context.total,
                succeeded: context.succeeded,
                failed: context.failed,
                runs: reports,
            })?),
            OutputFormat::Plain => Ok(self.handlebars.render("plain", &context)?),
            OutputFormat::Markdown => Ok(self.handlebars.render("markdown", &context)?),
        }
    }
}

#[derive(Serialize)]
struct JsonReport<'a> {
    generated_at: String,
    total: usize,
    succeeded: usize,
    failed: usize,
    runs: &'a [ExecutionReport],
}
