//! Vercel build-failure remediation loop.
//!
//! `autofix run` watches the deployment built from HEAD, hands failing build
//! logs to a coding agent, and pushes whatever it changed until the build is
//! healthy or the iteration budget runs out.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use autofix::core::classifier::classify;
use autofix::core::types::{BuildVerdict, FixOutcome, PushOutcome};
use autofix::exit_codes;
use autofix::io::config::{AutofixConfig, ConfigError, DEFAULT_CONFIG_FILE, resolve_config};
use autofix::io::fixer::CommandFixer;
use autofix::io::git::Git;
use autofix::io::process::ProcessOutput;
use autofix::io::vercel::VercelCli;
use autofix::locate::locate_deployment;
use autofix::logging;
use autofix::looping::{LoopEvent, LoopSettings, LoopStages, ThreadSleeper, run_loop};

#[derive(Parser)]
#[command(
    name = "autofix",
    version,
    about = "Fix failing Vercel builds with a coding agent until the deployment is healthy"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
struct ConfigArgs {
    /// TOML config file. A missing file means defaults plus environment.
    #[arg(long, value_name = "PATH", default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Command {
    /// Run the locate/classify/fix/push loop.
    Run {
        #[command(flatten)]
        config: ConfigArgs,
        /// Override `max_iterations`.
        #[arg(long, value_name = "N")]
        max_iterations: Option<u32>,
        /// Override `sleep_after_push_secs`.
        #[arg(long, value_name = "SECONDS")]
        sleep_secs: Option<u64>,
    },
    /// Print the deployment built from the current HEAD.
    Locate {
        #[command(flatten)]
        config: ConfigArgs,
    },
    /// Classify a build log file (stdin when omitted).
    Classify {
        /// Log file to read.
        file: Option<PathBuf>,
    },
    /// Print the effective configuration with secrets masked.
    Config {
        #[command(flatten)]
        config: ConfigArgs,
    },
}

fn main() {
    logging::init();
    let cli = Cli::parse();
    match dispatch(cli.command) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{err:#}");
            std::process::exit(exit_code_for(&err));
        }
    }
}

fn dispatch(command: Command) -> Result<i32> {
    match command {
        Command::Run {
            config,
            max_iterations,
            sleep_secs,
        } => {
            let overrides = flag_overrides(max_iterations, sleep_secs);
            let config = load_config(&config, &overrides)?;
            cmd_run(&config)
        }
        Command::Locate { config } => cmd_locate(&load_config(&config, &[])?),
        Command::Classify { file } => cmd_classify(file),
        Command::Config { config } => cmd_config(&load_config(&config, &[])?),
    }
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
    if err.downcast_ref::<ConfigError>().is_some() {
        exit_codes::INVALID
    } else {
        exit_codes::FATAL
    }
}

/// CLI flags expressed as the environment keys they override.
fn flag_overrides(
    max_iterations: Option<u32>,
    sleep_secs: Option<u64>,
) -> Vec<(&'static str, String)> {
    let mut overrides = Vec::new();
    if let Some(n) = max_iterations {
        overrides.push(("MAX_ITERATIONS", n.to_string()));
    }
    if let Some(secs) = sleep_secs {
        overrides.push(("SLEEP_AFTER_PUSH_SECONDS", secs.to_string()));
    }
    overrides
}

/// Lookup that prefers `overrides` and falls back to `env`.
fn layered_lookup<'a, E>(
    overrides: &'a [(&'static str, String)],
    env: E,
) -> impl Fn(&str) -> Option<String> + 'a
where
    E: Fn(&str) -> Option<String> + 'a,
{
    move |key: &str| {
        overrides
            .iter()
            .find(|(name, _)| *name == key)
            .map(|(_, value)| value.clone())
            .or_else(|| env(key))
    }
}

fn load_config(args: &ConfigArgs, overrides: &[(&'static str, String)]) -> Result<AutofixConfig> {
    // Existing variables win over `.env`.
    match dotenvy::dotenv() {
        Ok(_) => {}
        Err(err) if err.not_found() => {}
        Err(err) => return Err(err).context("load .env"),
    }
    resolve_config(
        &args.config,
        layered_lookup(overrides, |key| std::env::var(key).ok()),
    )
}

fn cmd_run(config: &AutofixConfig) -> Result<i32> {
    let platform = VercelCli::from_config(config);
    let repo = Git::new(&config.repo_path).with_limits(config.process_limits());
    let fixer = CommandFixer::from_config(config);
    let settings = LoopSettings::from_config(config);
    let stages = LoopStages {
        platform: &platform,
        repo: &repo,
        fixer: &fixer,
        sleeper: &ThreadSleeper,
    };

    println!("Repository: {}", config.repo_path.display());
    if let Some(url) = &config.prod_url {
        println!("Production URL: {url}");
    }
    let outcome = run_loop(&stages, &settings, print_event)?;
    println!(
        "Stopped after iteration {}: {}.",
        outcome.iterations, outcome.stop
    );
    Ok(exit_codes::OK)
}

fn print_event(event: &LoopEvent) {
    match event {
        LoopEvent::IterationStarted {
            iter,
            max_iterations,
        } => println!("\n=== Iteration {iter}/{max_iterations} ==="),
        LoopEvent::LogsUnavailable { wait, .. } => match wait {
            Some(duration) => println!(
                "No deployment logs for the current revision yet; waiting {}s.",
                duration.as_secs()
            ),
            None => println!("No deployment logs for the current revision."),
        },
        LoopEvent::LogsFetched {
            deployment, tail, ..
        } => {
            println!(
                "Deployment {} (revision {}). Last log lines:",
                deployment.id, deployment.revision
            );
            println!("{tail}");
        }
        LoopEvent::Classified { verdict, .. } => println!("Build status: {verdict}"),
        LoopEvent::FixAttempted {
            outcome,
            changed_paths,
            output,
            ..
        } => {
            if let Some(output) = output {
                print_fixer_output(output);
            }
            print_fix_outcome(*outcome, changed_paths);
        }
        LoopEvent::Published { outcome, .. } => match outcome {
            PushOutcome::Pushed => println!("Committed and pushed the fix."),
            PushOutcome::NothingToCommit => println!("Nothing to commit."),
        },
        LoopEvent::Waiting { duration, .. } => println!(
            "Waiting {}s for Vercel to build the push.",
            duration.as_secs()
        ),
    }
}

fn print_fixer_output(output: &ProcessOutput) {
    for (label, text, truncated) in [
        ("stdout", &output.stdout, output.stdout_truncated),
        ("stderr", &output.stderr, output.stderr_truncated),
    ] {
        if text.trim().is_empty() {
            continue;
        }
        println!("[fixer {label}]");
        println!("{}", text.trim_end());
        if truncated > 0 {
            println!("[{label} truncated {truncated} bytes]");
        }
    }
    if output.timed_out {
        println!("Fixer timed out.");
    } else if let Some(code) = output.exit_code.filter(|code| *code != 0) {
        println!("Fixer exited with code {code}.");
    } else if output.exit_code.is_none() {
        println!("Fixer was killed by a signal.");
    }
}

fn print_fix_outcome(outcome: FixOutcome, changed_paths: &[String]) {
    match outcome {
        FixOutcome::Changed if changed_paths.is_empty() => {
            println!("Fixer left uncommitted changes.");
        }
        FixOutcome::Changed => {
            println!("Fixer changed {} path(s):", changed_paths.len());
            for path in changed_paths {
                println!("  {path}");
            }
        }
        FixOutcome::NoChange => println!("Fixer made no changes."),
        FixOutcome::AgentError => println!("Fixer could not be run."),
    }
}

fn cmd_locate(config: &AutofixConfig) -> Result<i32> {
    let platform = VercelCli::from_config(config);
    let repo = Git::new(&config.repo_path).with_limits(config.process_limits());
    match locate_deployment(&platform, &repo)? {
        Some(deployment) => {
            println!("{}", deployment.id);
            Ok(exit_codes::OK)
        }
        None => {
            eprintln!("no deployment found for the current revision");
            Ok(exit_codes::FAILURE)
        }
    }
}

fn cmd_classify(file: Option<PathBuf>) -> Result<i32> {
    let text = match &file {
        Some(path) => {
            fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?
        }
        None => std::io::read_to_string(std::io::stdin()).context("read stdin")?,
    };
    let verdict = classify(&text);
    println!("{verdict}");
    Ok(match verdict {
        BuildVerdict::Success => exit_codes::OK,
        BuildVerdict::Failure => exit_codes::FAILURE,
        BuildVerdict::Ambiguous => exit_codes::AMBIGUOUS,
    })
}

fn cmd_config(config: &AutofixConfig) -> Result<i32> {
    let rendered = toml::to_string_pretty(&config.redacted()).context("serialize config")?;
    print!("{rendered}");
    Ok(exit_codes::OK)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn parse_run_defaults() {
        let cli = Cli::parse_from(["autofix", "run"]);
        assert_eq!(
            cli.command,
            Command::Run {
                config: ConfigArgs {
                    config: PathBuf::from(DEFAULT_CONFIG_FILE),
                },
                max_iterations: None,
                sleep_secs: None,
            }
        );
    }

    #[test]
    fn parse_run_overrides() {
        let cli = Cli::parse_from([
            "autofix",
            "run",
            "--config",
            "ci.toml",
            "--max-iterations",
            "3",
            "--sleep-secs",
            "5",
        ]);
        let Command::Run {
            config,
            max_iterations,
            sleep_secs,
        } = cli.command
        else {
            panic!("expected run");
        };
        assert_eq!(config.config, PathBuf::from("ci.toml"));
        assert_eq!(max_iterations, Some(3));
        assert_eq!(sleep_secs, Some(5));
    }

    #[test]
    fn parse_classify_optional_file() {
        let cli = Cli::parse_from(["autofix", "classify"]);
        assert_eq!(cli.command, Command::Classify { file: None });
        let cli = Cli::parse_from(["autofix", "classify", "build.log"]);
        assert_eq!(
            cli.command,
            Command::Classify {
                file: Some(PathBuf::from("build.log"))
            }
        );
    }

    #[test]
    fn flags_take_precedence_over_environment() {
        let overrides = flag_overrides(Some(3), None);
        let lookup = layered_lookup(&overrides, |key| match key {
            "MAX_ITERATIONS" => Some("7".to_string()),
            "SLEEP_AFTER_PUSH_SECONDS" => Some("30".to_string()),
            _ => None,
        });
        assert_eq!(lookup("MAX_ITERATIONS").as_deref(), Some("3"));
        assert_eq!(lookup("SLEEP_AFTER_PUSH_SECONDS").as_deref(), Some("30"));
        assert_eq!(lookup("GIT_BRANCH"), None);
    }

    #[test]
    fn config_errors_map_to_invalid() {
        let err = anyhow::Error::from(ConfigError::Invalid("max_iterations must be > 0"))
            .context("load config");
        assert_eq!(exit_code_for(&err), exit_codes::INVALID);
        assert_eq!(exit_code_for(&anyhow!("git push failed")), exit_codes::FATAL);
    }
}
