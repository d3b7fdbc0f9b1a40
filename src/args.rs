use {
    crate::parse_radix::parse_guess_radix,
    clap::{Parser, Subcommand},
    std::path::PathBuf,
};

/// Generates Java object serialization fixtures for primitive arrays and wrappers
#[derive(Parser, Debug, Clone)]
pub struct Args {
    #[command(subcommand)]
    pub cmd: Option<Command>,
    /// Show version information and exit
    #[arg(long, global = true)]
    pub version: bool,
    /// Enable debug logging, printed to stderr at exit
    #[arg(long, global = true)]
    pub debug: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Write fixture files (the default when no command is given)
    Generate(GenerateArgs),
    /// Check that fixture files decode to the expected values
    Verify(VerifyArgs),
    /// Print the decoded contents of a serialized file
    Dump(DumpArgs),
    /// List every dataset
    List,
    /// Show or change saved defaults
    Config(ConfigArgs),
}

/// Which datasets to operate on
#[derive(clap::Args, Debug, Clone, Default)]
pub struct SelectionArgs {
    /// Also include datasets that are not written by default
    #[arg(long)]
    pub include_inert: bool,
    /// Only these datasets
    #[arg(long, value_name = "label", num_args = 1..)]
    pub only: Vec<String>,
}

#[derive(clap::Args, Debug, Clone, Default)]
pub struct GenerateArgs {
    /// Directory to write into (default: saved config, then the working directory)
    #[arg(long, value_name = "dir")]
    pub out_dir: Option<PathBuf>,
    #[clap(flatten)]
    pub selection: SelectionArgs,
}

#[derive(clap::Args, Debug, Clone)]
pub struct VerifyArgs {
    /// Directory holding the fixtures (default: saved config, then the working directory)
    #[arg(long, value_name = "dir")]
    pub dir: Option<PathBuf>,
    #[clap(flatten)]
    pub selection: SelectionArgs,
}

#[derive(clap::Args, Debug, Clone)]
pub struct DumpArgs {
    /// The file to dump
    pub file: PathBuf,
    /// Print raw bytes instead of decoded contents
    #[arg(long)]
    pub hex: bool,
    /// Start at this byte offset
    #[arg(long, value_name = "offset", value_parser = parse_guess_radix::<usize>, default_value = "0")]
    pub seek: usize,
    /// Array elements to show before eliding the rest
    #[arg(long, value_name = "count")]
    pub max_elements: Option<usize>,
}

#[derive(clap::Args, Debug, Clone)]
pub struct ConfigArgs {
    /// Default output directory
    #[arg(long, value_name = "dir", conflicts_with = "clear_out_dir")]
    pub out_dir: Option<PathBuf>,
    /// Forget the default output directory
    #[arg(long)]
    pub clear_out_dir: bool,
    /// Whether inert datasets are included by default
    #[arg(long, value_name = "bool")]
    pub include_inert: Option<bool>,
    /// Default element limit of `dump`
    #[arg(long, value_name = "count")]
    pub max_elements: Option<usize>,
}

#[test]
fn test_args() {
    use clap::CommandFactory;
    Args::command().debug_assert();
}

#[test]
#[allow(clippy::unwrap_used)]
fn test_parse_commands() {
    let args = Args::try_parse_from(["jso-fixtures"]).unwrap();
    assert!(args.cmd.is_none());
    let args = Args::try_parse_from([
        "jso-fixtures",
        "generate",
        "--only",
        "double_wrapper",
        "short_array_new",
        "--debug",
    ])
    .unwrap();
    assert!(args.debug);
    let Some(Command::Generate(generate)) = args.cmd else {
        panic!("expected generate");
    };
    assert_eq!(generate.selection.only, ["double_wrapper", "short_array_new"]);
    let args = Args::try_parse_from(["jso-fixtures", "dump", "a.ser", "--seek", "0x1f"]).unwrap();
    let Some(Command::Dump(dump)) = args.cmd else {
        panic!("expected dump");
    };
    assert_eq!(dump.seek, 0x1f);
    assert!(
        Args::try_parse_from(["jso-fixtures", "config", "--out-dir", "x", "--clear-out-dir"])
            .is_err()
    );
}
