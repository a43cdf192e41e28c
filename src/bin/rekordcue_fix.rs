use anyhow::Context;
use clap::{Arg, ArgAction, ArgMatches, Command};
use log::Level;

use rekordcue::{CueRewriter, RewriteError};

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::exit;

struct RekordcueFix {
    input: PathBuf,
    output: PathBuf,
    rename_in_place: bool,
    confirm: bool,
    verbosity_level: Level,
}

impl RekordcueFix {
    pub fn from_cli_matches(matches: &ArgMatches) -> Self {
        let verbosity_level = match matches.get_count("verbose") {
            0 => Level::Info,
            1 => Level::Debug,
            2 => Level::Trace,
            _ => {
                eprintln!("using more than -vv does not affect verbosity level");
                Level::Trace
            }
        };

        let (input, output) = if matches.get_flag("default") {
            match standard_paths() {
                Ok(paths) => {
                    println!("\nUsing standard rekordbox paths");
                    paths
                }
                Err(e) => {
                    eprintln!("{e:#}");
                    exit(1)
                }
            }
        } else {
            (
                PathBuf::from(matches.get_one::<String>("in").expect("has a default")),
                PathBuf::from(matches.get_one::<String>("out").expect("has a default")),
            )
        };

        RekordcueFix {
            input,
            output,
            rename_in_place: matches.get_flag("rename"),
            confirm: !matches.get_flag("no-confirm"),
            verbosity_level,
        }
    }

    /// Main entry point for `RekordcueFix`.
    pub fn run(&self) {
        self.try_to_initialize_logging();

        println!("Input : {}", self.input.display());
        println!("Output: {}", self.output.display());

        if self.confirm {
            wait_for_enter();
        }

        let rewriter = match CueRewriter::from_paths(&self.input, &self.output) {
            Ok(rewriter) => rewriter,
            Err(e) => {
                eprintln!("{e}");
                exit(exit_code(&e))
            }
        };

        let summary = match rewriter.run() {
            Ok((summary, _output)) => summary,
            Err(e) => {
                eprintln!("{e}");
                exit(exit_code(&e))
            }
        };

        if self.rename_in_place {
            if let Err(e) = self.swap_into_place() {
                eprintln!("in-place rename failed: {e:#}");
                exit(1)
            }
        }

        println!(
            "Finished: {} tracks changed, {} cues added",
            summary.tracks_changed, summary.cues_added
        );
    }

    /// Non-atomic three-step swap. An interruption between the steps can
    /// leave the backup and the target inconsistent; callers opted into that
    /// with `--rename`.
    fn swap_into_place(&self) -> anyhow::Result<()> {
        let backup = backup_path(&self.input);

        // A stale backup is overwritten without confirmation.
        let _ = fs::remove_file(&backup);

        fs::rename(&self.input, &backup).with_context(|| {
            format!(
                "renaming {} to {}",
                self.input.display(),
                backup.display()
            )
        })?;
        fs::rename(&self.output, &self.input).with_context(|| {
            format!(
                "renaming {} to {}",
                self.output.display(),
                self.input.display()
            )
        })?;

        Ok(())
    }

    fn try_to_initialize_logging(&self) {
        match simplelog::TermLogger::init(
            self.verbosity_level.to_level_filter(),
            simplelog::Config::default(),
            simplelog::TerminalMode::Stderr,
            simplelog::ColorChoice::Auto,
        ) {
            Ok(_) => {}
            Err(e) => eprintln!("Failed to initialize logging: {e:?}"),
        };
    }
}

/// rekordbox reads its collection from `~/Documents` and expects the rewritten
/// library under `~/Library/Pioneer/rekordbox`.
fn standard_paths() -> anyhow::Result<(PathBuf, PathBuf)> {
    let home = dirs::home_dir().context("cannot determine the home directory")?;

    Ok((
        home.join("Documents").join("rekordbox.xml"),
        home.join("Library")
            .join("Pioneer")
            .join("rekordbox")
            .join("rekordbox.xml"),
    ))
}

/// Any line, including an empty one, continues; CTRL-C aborts.
fn wait_for_enter() {
    print!("\nPress enter to continue or CTRL-C to stop...");
    let _ = io::stdout().flush();

    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line).is_err() {
        exit(1)
    }
    println!();
}

fn backup_path(path: &Path) -> PathBuf {
    let mut backup = path.as_os_str().to_os_string();
    backup.push(".bak");
    PathBuf::from(backup)
}

fn exit_code(e: &RewriteError) -> i32 {
    match e {
        RewriteError::FailedToOpenInput { .. } => 1,
        RewriteError::FailedToCreateOutput { .. } => 2,
        RewriteError::TokenRead(_) | RewriteError::InvalidAttribute(_) => 10,
        RewriteError::XmlOutput { .. } | RewriteError::Flush(_) => 11,
    }
}

fn main() {
    let matches = Command::new("rekordcue_fix")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Omer B. <omerbenamram@gmail.com>")
        .about("Adds a memory cue for every hot cue missing one in a rekordbox collection XML")
        .arg(
            Arg::new("default")
                .long("default")
                .action(ArgAction::SetTrue)
                .help("Ignores --in/--out and uses the standard rekordbox library paths"),
        )
        .arg(
            Arg::new("rename")
                .long("rename")
                .action(ArgAction::SetTrue)
                .help(
                    "After a successful run, renames the input to <input>.bak and moves the \
                     output over the input. The three-step swap is not atomic; an interruption \
                     can leave the backup and the target inconsistent.",
                ),
        )
        .arg(
            Arg::new("in")
                .long("in")
                .default_value("rekordbox.xml")
                .help("Input collection XML path"),
        )
        .arg(
            Arg::new("out")
                .long("out")
                .default_value("/tmp/output.xml")
                .help("Temporary output XML path"),
        )
        .arg(
            Arg::new("no-confirm")
                .long("no-confirm")
                .action(ArgAction::SetTrue)
                .help("When set, will not wait for confirmation before rewriting, useful for automation"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .action(ArgAction::Count)
                .help("-v - debug, -vv - trace. Insertion diagnostics are shown by default."),
        )
        .get_matches();

    let app = RekordcueFix::from_cli_matches(&matches);
    app.run();
}
