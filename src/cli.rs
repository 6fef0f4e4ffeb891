use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::report::OutputFormat;

#[derive(Parser)]
#[command(name = "featuregen")]
#[command(about = "🥒 featuregen - Gherkin feature files from user stories, via your own LLM scripts")]
#[command(long_about = "featuregen runs LLM-backed generator scripts against user story files to produce
Gherkin .feature files. Each backend is a named configuration: the command that
runs it, the script, a JSON parameter spec and the typed parameters passed as flags.

QUICK START:
  featuregen llm add --name gpt --script gpt_main.py --spec gpt_params.json --command python3
  featuregen llm configure gpt --set \"Temperature=0.7\" --set \"Debug=true\"
  featuregen llm select gpt
  featuregen generate story.txt

EXAMPLES:
  featuregen generate story.txt --llm gemini --dry-run
  featuregen batch story.txt --format markdown --output report.md
  featuregen batch --dir ./stories --llms-file llms.json")]
#[command(version)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(about = "Generate a feature file from one user story with one LLM")]
    #[command(long_about = "Run a single LLM configuration against a user story.

The configuration is the one named with --llm, or the selected one (see 'llm select').
The script receives every configured parameter as a flag, then --user_story_path <STORY>.

EXAMPLES:
  featuregen generate story.txt
  featuregen generate story.txt --llm deepseek --format json
  featuregen generate story.txt --llms-file llms.json --llm gpt --dry-run")]
    Generate {
        #[arg(help = "User story file to generate from")]
        story: PathBuf,

        #[arg(short, long, help = "LLM configuration to use (defaults to the selected one)")]
        llm: Option<String>,

        #[arg(long, help = "Read LLM definitions from a JSON file instead of the store")]
        llms_file: Option<PathBuf>,

        #[arg(long, help = "Output format", value_enum)]
        format: Option<OutputFormat>,

        #[arg(short, long, help = "Save the report to a file instead of printing it")]
        output: Option<PathBuf>,

        #[arg(long, help = "Print the command line and working directory without running it")]
        dry_run: bool,
    },

    #[command(about = "Run every configured LLM against one or more user stories")]
    #[command(long_about = "Run all LLM configurations against a user story, or against every story
file (.txt, .md, .story) found under a directory. Runs are concurrent unless
--sequential is given; a failing run never stops the others and every result is
reported. Exits with an error if any run failed.

EXAMPLES:
  featuregen batch story.txt
  featuregen batch --dir ./stories --sequential
  featuregen batch story.txt --llms-file llms.json --format json --output results.json")]
    Batch {
        #[arg(help = "User story file to generate from")]
        story: Option<PathBuf>,

        #[arg(short, long, help = "Directory of user story files to process")]
        dir: Option<PathBuf>,

        #[arg(long, help = "Read LLM definitions from a JSON file instead of the store")]
        llms_file: Option<PathBuf>,

        #[arg(long, help = "Run one configuration at a time")]
        sequential: bool,

        #[arg(long, help = "Output format", value_enum)]
        format: Option<OutputFormat>,

        #[arg(short, long, help = "Save the report to a file instead of printing it")]
        output: Option<PathBuf>,
    },

    #[command(about = "Manage LLM configurations")]
    Llm {
        #[command(subcommand)]
        action: LlmAction,
    },

    #[command(about = "Show or change featuregen settings")]
    #[command(long_about = "Inspect and modify application settings.

SETTINGS FILE: ~/.featuregen/config.yml (override the directory with FEATUREGEN_HOME)
Any setting can also come from the environment, e.g. FEATUREGEN__RUN__TIMEOUT_SECS=120")]
    Settings {
        #[arg(long, help = "Display current settings")]
        show: bool,

        #[arg(long, help = "File where LLM configurations are stored")]
        store_path: Option<PathBuf>,

        #[arg(long, help = "Kill generator runs that take longer than this many seconds")]
        timeout: Option<u64>,

        #[arg(long, help = "Let generator runs take as long as they need", conflicts_with = "timeout")]
        no_timeout: bool,

        #[arg(long, help = "Run batch configurations concurrently by default")]
        parallel: Option<bool>,

        #[arg(long, help = "Default report format", value_enum)]
        format: Option<OutputFormat>,
    },
}

#[derive(Subcommand, Debug)]
pub enum LlmAction {
    #[command(about = "Add a new LLM configuration")]
    Add {
        #[arg(long, help = "Unique configuration name")]
        name: String,

        #[arg(long, help = "Generator script passed to the command")]
        script: PathBuf,

        #[arg(long, help = "JSON parameter spec describing the script's parameters")]
        spec: PathBuf,

        #[arg(long, help = "Program that runs the script (e.g. python3)")]
        command: String,
    },

    #[command(about = "List LLM configurations")]
    List,

    #[command(about = "Show one configuration and its parameters")]
    Show { name: String },

    #[command(about = "Delete a configuration")]
    Remove { name: String },

    #[command(about = "Use this configuration when 'generate' gets no --llm")]
    Select { name: String },

    #[command(about = "Show the parameter form described by a configuration's spec")]
    Form { name: String },

    #[command(about = "Set a configuration's parameters from its parameter spec")]
    #[command(long_about = "Resolve every parameter in the configuration's spec. Values given with
--set NAME=VALUE are validated against the spec (required fields, allowed values,
numeric ranges); everything else takes the spec's default.

EXAMPLES:
  featuregen llm configure gpt --set \"Temperature=0.7\" --set \"Model=gpt-4o\"
  featuregen llm configure gpt --command python")]
    Configure {
        name: String,

        #[arg(long = "set", value_name = "NAME=VALUE", help = "Parameter value, repeatable")]
        values: Vec<String>,

        #[arg(long, help = "Change the program that runs the script")]
        command: Option<String>,
    },
}
