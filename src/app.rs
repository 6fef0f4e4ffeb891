use anyhow::{anyhow, Context, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;
use walkdir::WalkDir;

use crate::cli::{Commands, LlmAction};
use crate::cli_source;
use crate::command_builder;
use crate::config::Config;
use crate::error_handler::FeatureGenError;
use crate::executor::{ExecutionReport, Executor};
use crate::parameter_spec::{self, AllowedValues, UiElement};
use crate::progress::{BatchProgress, Spinner};
use crate::report::{OutputFormat, ReportRenderer};
use crate::runner::ProcessRunner;
use crate::store::{ConfigurationStore, LlmConfiguration};

/// File extensions picked up when a directory of user stories is given.
pub const STORY_EXTENSIONS: &[&str] = &["txt", "md", "story"];

pub struct App {
    pub config: Config,
    renderer: ReportRenderer,
}

impl App {
    pub async fn new() -> Result<Self> {
        let config = Config::load().await?;
        Self::with_config(config)
    }

    pub fn with_config(config: Config) -> Result<Self> {
        let renderer = ReportRenderer::new()?;
        Ok(Self { config, renderer })
    }

    fn executor(&self) -> Executor {
        Executor::new(ProcessRunner::with_timeout(self.config.timeout()))
    }

    pub fn load_store(&self) -> Result<ConfigurationStore> {
        let path = self.config.store_path();
        ConfigurationStore::load(&path)
            .with_context(|| format!("Failed to load LLM configurations from {}", path.display()))
    }

    fn save_store(&self, store: &ConfigurationStore) -> Result<()> {
        let path = self.config.store_path();
        store
            .save(&path)
            .with_context(|| format!("Failed to save LLM configurations to {}", path.display()))
    }

    fn source_store(&self, llms_file: Option<&Path>) -> Result<ConfigurationStore> {
        match llms_file {
            Some(path) => Ok(cli_source::load_llms_file(path)?),
            None => self.load_store(),
        }
    }

    pub async fn run_command(&mut self, command: Commands) -> Result<()> {
        let result = self.dispatch(command).await;
        if let Err(err) = &result {
            if let Some(kind) = err.downcast_ref::<FeatureGenError>().map(FeatureGenError::kind) {
                debug!(error_kind = kind, error = %err, "command failed");
            }
        }
        result
    }

    async fn dispatch(&mut self, command: Commands) -> Result<()> {
        match command {
            Commands::Generate {
                story,
                llm,
                llms_file,
                format,
                output,
                dry_run,
            } => {
                self.generate(story, llm, llms_file, format, output, dry_run)
                    .await
            }
            Commands::Batch {
                story,
                dir,
                llms_file,
                sequential,
                format,
                output,
            } => {
                self.batch(story, dir, llms_file, sequential, format, output)
                    .await
            }
            Commands::Llm { action } => self.manage_llms(action).await,
            Commands::Settings {
                show,
                store_path,
                timeout,
                no_timeout,
                parallel,
                format,
            } => {
                self.update_settings(show, store_path, timeout, no_timeout, parallel, format)
                    .await
            }
        }
    }

    async fn generate(
        &self,
        story: PathBuf,
        llm: Option<String>,
        llms_file: Option<PathBuf>,
        format: Option<OutputFormat>,
        output: Option<PathBuf>,
        dry_run: bool,
    ) -> Result<()> {
        let store = self.source_store(llms_file.as_deref())?;
        let config = match &llm {
            Some(name) => store
                .get_by_name(name)
                .ok_or_else(|| FeatureGenError::NotFound(name.clone()))?,
            None => store.selected().ok_or_else(|| {
                anyhow!("No LLM selected. Pass --llm <NAME> or run 'featuregen llm select <NAME>'")
            })?,
        };

        if !story.is_file() {
            return Err(anyhow!("User story file does not exist: {}", story.display()));
        }
        let story_path = absolute_path(&story)?.display().to_string();

        if dry_run {
            let command_line = command_builder::build(config, &story_path);
            println!("🧾 {}", command_line);
            println!("📁 Working directory: {}", command_line.working_directory.display());
            return Ok(());
        }

        let format = format.unwrap_or(self.config.output.format);
        let show_progress = output.is_none() && format != OutputFormat::Json;

        let spinner = Spinner::new(show_progress, &format!("Generating with {}", config.name));
        let report = self.executor().execute(config, &story_path).await;
        if report.success() {
            spinner.succeed();
        } else {
            spinner.fail();
        }

        let success = report.success();
        self.emit(&[report], format, output.as_deref()).await?;

        if success {
            Ok(())
        } else {
            Err(anyhow!("Feature generation with '{}' failed", config.name))
        }
    }

    async fn batch(
        &self,
        story: Option<PathBuf>,
        dir: Option<PathBuf>,
        llms_file: Option<PathBuf>,
        sequential: bool,
        format: Option<OutputFormat>,
        output: Option<PathBuf>,
    ) -> Result<()> {
        let stories = collect_stories(story.as_deref(), dir.as_deref())?;
        let store = self.source_store(llms_file.as_deref())?;
        if store.is_empty() {
            return Err(FeatureGenError::NoConfigurations.into());
        }

        let format = format.unwrap_or(self.config.output.format);
        let parallel = self.config.run.parallel && !sequential;
        let progress = BatchProgress::new(
            output.is_none() && format != OutputFormat::Json,
            stories.len() * store.len(),
        );

        let reports = self
            .executor()
            .execute_batch(store.list(), &stories, parallel, |report| {
                progress.record(report);
            })
            .await?;
        progress.finish();

        let failed = reports.iter().filter(|r| !r.success()).count();
        let total = reports.len();
        self.emit(&reports, format, output.as_deref()).await?;

        if failed == 0 {
            Ok(())
        } else {
            Err(anyhow!("{} of {} generator runs failed", failed, total))
        }
    }

    async fn emit(
        &self,
        reports: &[ExecutionReport],
        format: OutputFormat,
        output: Option<&Path>,
    ) -> Result<()> {
        let content = self.renderer.render(reports, format)?;
        match output {
            Some(path) => {
                fs::write(path, content)
                    .await
                    .with_context(|| format!("Failed to write report to {}", path.display()))?;
                println!("📁 Report saved to {}", path.display());
            }
            None => println!("{}", content),
        }
        Ok(())
    }

    async fn manage_llms(&mut self, action: LlmAction) -> Result<()> {
        let mut store = self.load_store()?;

        match action {
            LlmAction::Add {
                name,
                script,
                spec,
                command,
            } => {
                // Runs happen in the output directory, so relative paths would break.
                let config = LlmConfiguration::new(
                    name.trim(),
                    &absolute_path(&script)?.display().to_string(),
                    command.trim(),
                )
                .with_spec(&absolute_path(&spec)?.display().to_string());
                store.add(config)?;
                self.save_store(&store)?;
                println!("✅ Added LLM configuration '{}'", name.trim());
                println!("💡 Set its parameters with 'featuregen llm configure {}'", name.trim());
            }
            LlmAction::List => {
                if store.is_empty() {
                    println!("No LLM configurations yet. Add one with 'featuregen llm add'.");
                    return Ok(());
                }
                let selected = store.selected().map(|c| c.name.clone());
                println!("🤖 LLM configurations");
                for config in store.list() {
                    let marker = if selected.as_deref() == Some(config.name.as_str()) {
                        "*"
                    } else {
                        " "
                    };
                    println!(
                        " {} {} ({} {}, {} {})",
                        marker,
                        config.name,
                        config.command,
                        config.script_file_path,
                        config.named_parameters.len(),
                        if config.named_parameters.len() == 1 { "parameter" } else { "parameters" }
                    );
                }
            }
            LlmAction::Show { name } => {
                let config = store
                    .get_by_name(&name)
                    .ok_or_else(|| FeatureGenError::NotFound(name.clone()))?;
                self.print_configuration(config);
            }
            LlmAction::Remove { name } => {
                store.remove(&name)?;
                self.save_store(&store)?;
                println!("🗑️  Removed LLM configuration '{}'", name);
            }
            LlmAction::Select { name } => {
                store.select(&name)?;
                self.save_store(&store)?;
                println!("✅ '{}' is now the selected LLM", name);
            }
            LlmAction::Form { name } => {
                let config = store
                    .get_by_name(&name)
                    .ok_or_else(|| FeatureGenError::NotFound(name.clone()))?;
                let specs = parameter_spec::load(Path::new(&config.parameter_spec_file_path))?;
                print_form(config, &specs);
            }
            LlmAction::Configure {
                name,
                values,
                command,
            } => {
                let existing = store
                    .get_by_name(&name)
                    .cloned()
                    .ok_or_else(|| FeatureGenError::NotFound(name.clone()))?;
                let inputs = parse_assignments(&values)?;
                // A missing spec would resolve to an empty form and drop every parameter.
                let spec_path = Path::new(&existing.parameter_spec_file_path);
                if !spec_path.is_file() {
                    return Err(FeatureGenError::InvalidPath {
                        path: spec_path.to_path_buf(),
                    }
                    .into());
                }
                let specs = parameter_spec::load(spec_path)?;
                let named_parameters =
                    parameter_spec::resolve_form(&specs, &inputs, &existing.named_parameters)?;

                let updated = LlmConfiguration {
                    command: command
                        .map(|c| c.trim().to_string())
                        .unwrap_or_else(|| existing.command.clone()),
                    named_parameters,
                    ..existing
                };
                store.update(&name, updated)?;
                self.save_store(&store)?;

                println!("✅ Updated LLM configuration '{}'", name);
                if let Some(config) = store.get_by_name(&name) {
                    self.print_configuration(config);
                }
            }
        }

        Ok(())
    }

    fn print_configuration(&self, config: &LlmConfiguration) {
        println!("🤖 {}", config.name);
        println!("   Command: {}", config.command);
        println!("   Script: {}", config.script_file_path);
        if !config.parameter_spec_file_path.is_empty() {
            println!("   Parameter spec: {}", config.parameter_spec_file_path);
        }
        if config.named_parameters.is_empty() {
            println!("   Parameters: none");
        } else {
            println!("   Parameters:");
            for parameter in &config.named_parameters {
                let flag = if parameter.arg_name.is_empty() {
                    "(not passed)".to_string()
                } else {
                    parameter.arg_name.clone()
                };
                println!(
                    "     • {} [{}] {} = {}{}",
                    parameter.key,
                    parameter.value.kind(),
                    flag,
                    parameter.value.display_value(),
                    if parameter.required { " (required)" } else { "" }
                );
            }
        }
        let preview = command_builder::build(config, "<user story>");
        println!("   Runs: {}", preview);
        println!("   In: {}", preview.working_directory.display());
    }

    async fn update_settings(
        &mut self,
        show: bool,
        store_path: Option<PathBuf>,
        timeout: Option<u64>,
        no_timeout: bool,
        parallel: Option<bool>,
        format: Option<OutputFormat>,
    ) -> Result<()> {
        let mut updated = false;

        if let Some(path) = store_path {
            self.config.set_store_path(path);
            updated = true;
        }
        if let Some(secs) = timeout {
            self.config.set_timeout(Some(secs));
            updated = true;
        }
        if no_timeout {
            self.config.set_timeout(None);
            updated = true;
        }
        if let Some(parallel) = parallel {
            self.config.run.parallel = parallel;
            updated = true;
        }
        if let Some(format) = format {
            self.config.output.format = format;
            updated = true;
        }

        if updated {
            self.config.save().await?;
            println!("✅ Settings saved to {}", self.config.config_path().display());
        }

        if show || !updated {
            self.show_settings();
        }
        Ok(())
    }

    fn show_settings(&self) {
        println!("🔧 featuregen settings");
        println!("=====================");
        println!("📄 Settings file: {}", self.config.config_path().display());
        println!("🗂️  Configuration store: {}", self.config.store_path().display());
        match self.config.run.timeout_secs {
            Some(secs) => println!("⏱️  Run timeout: {}s", secs),
            None => println!("⏱️  Run timeout: none"),
        }
        println!("🔀 Parallel batch runs: {}", self.config.run.parallel);
        println!("📝 Report format: {:?}", self.config.output.format);
    }
}

fn print_form(config: &LlmConfiguration, specs: &[parameter_spec::ParameterSpec]) {
    println!("📋 Parameters for {}", config.name);
    if specs.is_empty() {
        println!("   No parameter spec found at '{}'", config.parameter_spec_file_path);
        return;
    }

    for spec in specs {
        let required = if spec.required { " *" } else { "" };
        println!("\n   {}{} ({}, {})", spec.name, required, spec.ui_element.label(), spec.flag());
        if !spec.description.is_empty() {
            println!("     {}", spec.description);
        }
        if let Some(default) = spec.default_text() {
            println!("     default: {}", default);
        }
        match (&spec.ui_element, &spec.allowed_values) {
            (UiElement::ComboBox, Some(AllowedValues::Options(_))) => {
                println!("     options: {}", spec.options().join(", "));
            }
            (UiElement::Spinner, Some(AllowedValues::Range { .. })) => {
                let (min, max) = spec.range();
                let step = spec.step.map(|s| format!(", step {}", s)).unwrap_or_default();
                println!("     range: {} to {}{}", min, max, step);
            }
            _ => {}
        }
        if let Some(current) = config.parameter(&spec.name) {
            println!("     current: {}", current.value.display_value());
        }
    }
}

/// Resolves `path` against the current directory. Generators run in their
/// own output directory, so every path handed to them must be absolute.
pub fn absolute_path(path: &Path) -> Result<PathBuf> {
    std::path::absolute(path)
        .with_context(|| format!("Failed to resolve path {}", path.display()))
}

/// Parses `NAME=VALUE` pairs. The value may itself contain `=`.
pub fn parse_assignments(values: &[String]) -> Result<HashMap<String, String>> {
    let mut inputs = HashMap::new();
    for assignment in values {
        let (name, value) = assignment
            .split_once('=')
            .ok_or_else(|| anyhow!("Expected NAME=VALUE, got '{}'", assignment))?;
        let name = name.trim();
        if name.is_empty() {
            return Err(anyhow!("Missing parameter name in '{}'", assignment));
        }
        inputs.insert(name.to_string(), value.to_string());
    }
    Ok(inputs)
}

/// User stories to process: the given file and/or every story file under `dir`.
pub fn collect_stories(story: Option<&Path>, dir: Option<&Path>) -> Result<Vec<String>> {
    let mut stories = Vec::new();

    if let Some(story) = story {
        if !story.is_file() {
            return Err(anyhow!("User story file does not exist: {}", story.display()));
        }
        stories.push(absolute_path(story)?.display().to_string());
    }

    if let Some(dir) = dir {
        if !dir.is_dir() {
            return Err(anyhow!("Directory does not exist: {}", dir.display()));
        }
        let mut found: Vec<String> = WalkDir::new(absolute_path(dir)?)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| {
                e.path()
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .map_or(false, |ext| {
                        STORY_EXTENSIONS.contains(&ext.to_lowercase().as_str())
                    })
            })
            .map(|e| e.path().display().to_string())
            .collect();
        if found.is_empty() {
            return Err(anyhow!(
                "No user story files ({}) found in {}",
                STORY_EXTENSIONS.join(", "),
                dir.display()
            ));
        }
        found.sort();
        stories.extend(found);
    }

    if stories.is_empty() {
        return Err(anyhow!("Give a user story file or --dir with user stories"));
    }
    Ok(stories)
}
