use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

#[derive(Parser)]
#[command(name = "mira-infra")]
#[command(version)]
#[command(about = "Declare the Mira HQ infrastructure and synthesize it into a template", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Stack config file (default: ./infra.toml if present)
    #[arg(long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Synthesize the stack into a template file
    Synth(SynthArgs),

    /// List declared resources in dependency order
    #[command(visible_alias = "ls")]
    List(ListArgs),

    /// Print dependency edges, one `from -> to` per line
    Graph,

    /// Compare the stack with a previously synthesized template
    Diff(DiffArgs),

    /// Build and validate the stack without writing anything
    Validate,

    /// Check whether a declared IAM user may perform an action
    Check(CheckArgs),

    /// Print the effective configuration as TOML
    Config,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

// ============================================================================
// Command Args
// ============================================================================

#[derive(Debug, Args)]
pub struct SynthArgs {
    /// Output directory (default: ./infra.out)
    #[arg(short, long)]
    pub out: Option<String>,

    /// Print the template to stdout instead of writing a file
    #[arg(long, conflicts_with = "out")]
    pub stdout: bool,
}

#[derive(Debug, Args)]
pub struct ListArgs {
    /// Filter by type or type.name (e.g., "s3", "cloudfront", "dns.Lambda")
    pub target: Option<String>,
}

#[derive(Debug, Args)]
pub struct DiffArgs {
    /// Template to compare against (default: the one in the out dir)
    #[arg(long)]
    pub against: Option<String>,

    /// Output directory holding the previous template
    #[arg(short, long)]
    pub out: Option<String>,
}

#[derive(Debug, Args)]
pub struct CheckArgs {
    /// Logical id or user name (e.g., "S3DeploymentUser")
    pub user: String,

    /// Action to evaluate (e.g., "s3:PutObject")
    pub action: String,

    /// Resource ARN, or an intrinsic as JSON (e.g., '{"Fn::GetAtt": ["FrontEndBucket", "Arn"]}')
    pub resource: String,

    /// Condition context as key=value; repeat for more values
    #[arg(long = "context", value_name = "KEY=VALUE")]
    pub context: Vec<String>,
}
