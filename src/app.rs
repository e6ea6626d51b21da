use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use crate::{
    VERSION,
    config::{OutputStream, PstreeConfig},
    prelude::*,
    tree::{self, RenderConfig, RenderError},
};
use clap::{
    Parser,
    builder::{Styles, styling},
};
use procinfo::{ProcessInfoProvider, Snapshot};

fn create_styles() -> Styles {
    styling::Styles::styled()
        .header(styling::AnsiColor::Green.on_default() | styling::Effects::BOLD)
        .usage(styling::AnsiColor::Green.on_default() | styling::Effects::BOLD)
        .literal(styling::AnsiColor::Cyan.on_default() | styling::Effects::BOLD)
        .placeholder(styling::AnsiColor::Cyan.on_default())
}

#[derive(Parser, Debug, Default)]
#[command(
    name = "pstree",
    version = VERSION,
    about = "Print a tree of the running processes and their threads",
    styles = create_styles()
)]
pub struct Cli {
    /// Sort children by PID instead of discovery order
    #[arg(short, long, overrides_with = "no_numeric_sort")]
    pub numeric_sort: bool,

    /// Keep discovery order even if the configuration sorts by PID
    #[arg(long, overrides_with = "numeric_sort")]
    pub no_numeric_sort: bool,

    /// Show PIDs in addition to names, one line per thread
    #[arg(short = 'p', long, overrides_with = "no_show_pids")]
    pub show_pids: bool,

    /// Hide PIDs even if the configuration shows them
    #[arg(long, overrides_with = "show_pids")]
    pub no_show_pids: bool,

    /// Draw the tree with ASCII characters
    #[arg(short = 'A', long, overrides_with = "no_ascii")]
    pub ascii: bool,

    /// Draw the tree with Unicode characters even if the configuration asks for ASCII
    #[arg(long, overrides_with = "ascii")]
    pub no_ascii: bool,

    /// Fail when processes are nested deeper than this
    #[arg(long, value_name = "DEPTH")]
    pub max_depth: Option<usize>,

    /// Leave out processes that exit while the tree is read, instead of failing
    #[arg(long, overrides_with = "no_skip_vanished")]
    pub skip_vanished: bool,

    /// Fail on processes that exit while the tree is read, even if the configuration skips them
    #[arg(long, overrides_with = "skip_vanished")]
    pub no_skip_vanished: bool,

    /// Print the tree on stderr instead of stdout
    #[arg(long, overrides_with = "stdout")]
    pub stderr: bool,

    /// Print the tree on stdout even if the configuration selects stderr
    #[arg(long, overrides_with = "stderr")]
    pub stdout: bool,

    /// Render a recorded snapshot (YAML, or JSON for `.json` files) instead of live processes
    #[arg(long, value_name = "FILE", conflicts_with = "proc_root")]
    pub snapshot: Option<PathBuf>,

    /// Record the rendered processes to a snapshot file
    #[arg(long, value_name = "FILE")]
    pub save_snapshot: Option<PathBuf>,

    /// Mount point of procfs
    #[arg(long, value_name = "DIR")]
    pub proc_root: Option<PathBuf>,

    /// Configuration file, defaults to ~/.config/pstree/config.yaml
    #[arg(long, value_name = "FILE", env = "PSTREE_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Set `setting` from a `--flag`/`--no-flag` pair, leaving it alone when neither is given.
fn toggle(setting: &mut bool, enable: bool, disable: bool) {
    if enable {
        *setting = true;
    } else if disable {
        *setting = false;
    }
}

impl Cli {
    pub fn apply_to(&self, config: &mut PstreeConfig) {
        let display = &mut config.display;
        toggle(&mut display.numeric_sort, self.numeric_sort, self.no_numeric_sort);
        toggle(&mut display.show_pids, self.show_pids, self.no_show_pids);
        toggle(&mut display.ascii, self.ascii, self.no_ascii);
        if self.stderr {
            display.output = OutputStream::Stderr;
        } else if self.stdout {
            display.output = OutputStream::Stdout;
        }

        let scan = &mut config.scan;
        toggle(&mut scan.skip_vanished, self.skip_vanished, self.no_skip_vanished);
        if let Some(max_depth) = self.max_depth {
            scan.max_depth = Some(max_depth);
        }
        if let Some(proc_root) = &self.proc_root {
            scan.proc_root = Some(proc_root.clone());
        }
    }
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let mut config = PstreeConfig::load(cli.config.as_deref())?;
    cli.apply_to(&mut config);
    debug!("Effective configuration: {config:?}");

    let provider = open_provider(&cli, &config)?;
    let root = provider.lowest_pid().context("Failed to find the root process")?;
    let render_config = RenderConfig::from(&config);

    match &cli.save_snapshot {
        Some(path) => {
            // Render what was recorded, so the file and the output always agree
            let snapshot = Snapshot::capture(&provider, root, render_config.vanished)
                .with_context(|| format!("Failed to record the processes below {root}"))?;
            snapshot.save(path)?;
            info!(
                "Saved {} processes to {}",
                snapshot.processes.len(),
                path.display()
            );
            draw(&snapshot, root, &render_config, config.display.output)
        }
        None => draw(&provider, root, &render_config, config.display.output),
    }
}

fn open_provider(cli: &Cli, config: &PstreeConfig) -> Result<Box<dyn ProcessInfoProvider>> {
    if let Some(path) = &cli.snapshot {
        return Ok(Box::new(Snapshot::load(path)?));
    }

    #[cfg(target_os = "linux")]
    {
        let proc_root = config
            .scan
            .proc_root
            .clone()
            .unwrap_or_else(|| PathBuf::from(procinfo::DEFAULT_PROC_ROOT));
        let provider = procinfo::ProcfsProvider::with_root(proc_root);
        debug!("Reading processes from {}", provider.root().display());
        Ok(Box::new(provider))
    }

    #[cfg(not(target_os = "linux"))]
    {
        let _ = config;
        bail!("Live processes can only be read from procfs, use --snapshot on this platform")
    }
}

fn draw<P: ProcessInfoProvider + ?Sized>(
    provider: &P,
    root: procinfo::Pid,
    config: &RenderConfig,
    output: OutputStream,
) -> Result<()> {
    match output {
        OutputStream::Stdout => {
            let stdout = BufWriter::new(io::stdout().lock());
            write_tree(provider, root, config, stdout)
        }
        OutputStream::Stderr => write_tree(provider, root, config, io::stderr().lock()),
    }
}

fn write_tree<P, W>(provider: &P, root: procinfo::Pid, config: &RenderConfig, out: W) -> Result<()>
where
    P: ProcessInfoProvider + ?Sized,
    W: Write,
{
    match tree::render(provider, root, config, out) {
        // The reader went away, e.g. `pstree | head`
        Err(RenderError::Write(err)) if err.kind() == io::ErrorKind::BrokenPipe => {
            debug!("Output closed early: {err}");
            Ok(())
        }
        other => other.context("Failed to render the process tree"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use procinfo::ProcessEntry;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("pstree").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_short_flags() {
        let cli = parse(&["-n", "-p"]);
        assert!(cli.numeric_sort);
        assert!(cli.show_pids);
        assert!(!cli.ascii);

        let cli = parse(&["-np"]);
        assert!(cli.numeric_sort && cli.show_pids);
    }

    #[test]
    fn test_long_flags() {
        let cli = parse(&[
            "--numeric-sort",
            "--show-pids",
            "--ascii",
            "--max-depth",
            "8",
            "--stderr",
        ]);
        assert!(cli.numeric_sort && cli.show_pids && cli.ascii && cli.stderr);
        assert_eq!(cli.max_depth, Some(8));
    }

    #[test]
    fn test_help_and_version_do_not_run() {
        let err = Cli::try_parse_from(["pstree", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
        assert_eq!(err.exit_code(), 0);

        let err = Cli::try_parse_from(["pstree", "-V"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
        assert_eq!(err.exit_code(), 0);
    }

    #[test]
    fn test_unknown_option_fails() {
        let err = Cli::try_parse_from(["pstree", "--frobnicate"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::UnknownArgument);
        assert_ne!(err.exit_code(), 0);
    }

    #[test]
    fn test_positional_arguments_are_rejected() {
        assert!(Cli::try_parse_from(["pstree", "1"]).is_err());
    }

    #[test]
    fn test_snapshot_conflicts_with_proc_root() {
        assert!(
            Cli::try_parse_from(["pstree", "--snapshot", "a.yaml", "--proc-root", "/proc"])
                .is_err()
        );
    }

    #[test]
    fn test_flags_override_config() {
        let mut config = PstreeConfig::default();
        config.display.show_pids = true;
        config.scan.max_depth = Some(4);

        let cli = Cli {
            numeric_sort: true,
            max_depth: Some(10),
            stderr: true,
            ..Default::default()
        };
        cli.apply_to(&mut config);

        assert!(config.display.show_pids);
        assert!(config.display.numeric_sort);
        assert!(!config.display.ascii);
        assert_eq!(config.display.output, OutputStream::Stderr);
        assert_eq!(config.scan.max_depth, Some(10));
    }

    #[test]
    fn test_negated_flags_turn_off_config() {
        let mut config = PstreeConfig::default();
        config.display.show_pids = true;
        config.display.numeric_sort = true;
        config.display.ascii = true;
        config.display.output = OutputStream::Stderr;
        config.scan.skip_vanished = true;

        parse(&[
            "--no-show-pids",
            "--no-numeric-sort",
            "--no-ascii",
            "--stdout",
            "--no-skip-vanished",
        ])
        .apply_to(&mut config);

        assert!(!config.display.show_pids);
        assert!(!config.display.numeric_sort);
        assert!(!config.display.ascii);
        assert_eq!(config.display.output, OutputStream::Stdout);
        assert!(!config.scan.skip_vanished);
    }

    #[test]
    fn test_last_of_a_flag_pair_wins() {
        let cli = parse(&["-p", "--no-show-pids", "--no-ascii", "-A"]);
        assert!(!cli.show_pids && cli.no_show_pids);
        assert!(cli.ascii && !cli.no_ascii);

        let mut config = PstreeConfig::default();
        parse(&["--stdout", "--stderr"]).apply_to(&mut config);
        assert_eq!(config.display.output, OutputStream::Stderr);
    }

    #[test]
    fn test_version_is_the_crate_version() {
        assert_eq!(Cli::command().get_version(), Some(VERSION));
    }

    /// Fails every write with the given error kind.
    struct FailingWriter(io::ErrorKind);

    impl Write for FailingWriter {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(self.0.into())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn single_process() -> Snapshot {
        Snapshot::default().with_process(ProcessEntry::new(1, "init").thread(1, []))
    }

    #[test]
    fn test_write_tree() {
        let mut buffer = Vec::new();

        write_tree(&single_process(), 1, &RenderConfig::default(), &mut buffer).unwrap();

        assert_eq!(String::from_utf8(buffer).unwrap(), "init\n");
    }

    #[test]
    fn test_closed_output_is_not_an_error() {
        let out = FailingWriter(io::ErrorKind::BrokenPipe);

        write_tree(&single_process(), 1, &RenderConfig::default(), out).unwrap();
    }

    #[test]
    fn test_other_write_failures_are_reported() {
        let out = FailingWriter(io::ErrorKind::StorageFull);

        let err = write_tree(&single_process(), 1, &RenderConfig::default(), out).unwrap_err();

        assert!(format!("{err:#}").starts_with("Failed to render the process tree"));
        assert!(matches!(
            err.downcast_ref::<RenderError>(),
            Some(RenderError::Write(_))
        ));
    }
}
