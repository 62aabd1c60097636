use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

use semdiff_core::VERSION;

/// SemDiff - offline-first classroom observation tracker
#[derive(Parser)]
#[command(name = "semdiff")]
#[command(author, version = VERSION, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the database file
    #[arg(long, global = true, env = "SEMDIFF_DB")]
    pub db: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose logging to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the database, write the config and seed default scales
    Init(InitArgs),

    /// Manage students
    #[command(subcommand)]
    Student(StudentCommand),

    /// Manage classes
    #[command(subcommand)]
    Class(ClassCommand),

    /// Manage rating scales
    #[command(subcommand)]
    Scale(ScaleCommand),

    /// Record a rating for a student on a scale
    Rate(RateArgs),

    /// Show a student's current ratings
    Ratings(RatingsArgs),

    /// Manage observation notes
    #[command(subcommand)]
    Note(NoteCommand),

    /// Manage checks and check marks
    #[command(subcommand)]
    Check(CheckCommand),

    /// Show or edit seating plans
    #[command(subcommand)]
    Seating(SeatingCommand),

    /// Export students or latest ratings as CSV
    Export(ExportArgs),

    /// Import students or ratings from CSV
    Import(ImportArgs),

    /// Push local changes and pull remote ones
    Sync(SyncArgs),

    /// Configure the remote endpoint
    #[command(subcommand)]
    Remote(RemoteCommand),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Arguments for the `init` command
#[derive(Args)]
pub struct InitArgs {
    /// Path where the database will be created
    #[arg(value_name = "PATH")]
    pub path: Option<String>,

    /// Skip seeding the default scales
    #[arg(long)]
    pub no_seed: bool,
}

/// Shared `--json` flag for list commands
#[derive(Args)]
pub struct JsonArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

// ============================================================================
// Students and classes
// ============================================================================

#[derive(Subcommand)]
pub enum StudentCommand {
    /// Add a student
    Add(StudentAddArgs),
    /// List students
    List(StudentListArgs),
    /// Show a student with ratings, notes and checks
    Show(StudentShowArgs),
    /// Edit a student (a new id cascades to dependent records)
    Edit(StudentEditArgs),
    /// Delete a student with its ratings, notes and check marks
    Delete(StudentDeleteArgs),
}

#[derive(Args)]
pub struct StudentAddArgs {
    /// Class name
    #[arg(long)]
    pub class: String,

    /// Number in the class
    #[arg(long)]
    pub number: i64,

    /// First name
    #[arg(long)]
    pub first: String,

    /// Last name
    #[arg(long)]
    pub last: String,

    /// Gender
    #[arg(long)]
    pub gender: Option<String>,

    /// Explicit id (assigned when omitted)
    #[arg(long)]
    pub id: Option<i64>,
}

#[derive(Args)]
pub struct StudentListArgs {
    /// Only students of this class
    #[arg(long)]
    pub class: Option<String>,

    /// Filter query over "last first class number"
    #[arg(long)]
    pub filter: Option<String>,

    /// Use subsequence matching for --filter
    #[arg(long)]
    pub fuzzy: bool,

    #[command(flatten)]
    pub output: JsonArgs,
}

#[derive(Args)]
pub struct StudentShowArgs {
    /// Student id
    #[arg(value_name = "STUDENT")]
    pub student: i64,

    #[command(flatten)]
    pub output: JsonArgs,
}

#[derive(Args)]
pub struct StudentEditArgs {
    /// Student id
    #[arg(value_name = "STUDENT")]
    pub student: i64,

    /// New id
    #[arg(long)]
    pub id: Option<i64>,

    /// New class
    #[arg(long)]
    pub class: Option<String>,

    /// New number
    #[arg(long)]
    pub number: Option<i64>,

    /// New first name
    #[arg(long)]
    pub first: Option<String>,

    /// New last name
    #[arg(long)]
    pub last: Option<String>,

    /// New gender
    #[arg(long)]
    pub gender: Option<String>,
}

#[derive(Args)]
pub struct StudentDeleteArgs {
    /// Student id
    #[arg(value_name = "STUDENT")]
    pub student: i64,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

#[derive(Subcommand)]
pub enum ClassCommand {
    /// List class names with student counts
    List(JsonArgs),
    /// Delete a class with its students and their data
    Delete(ClassDeleteArgs),
}

#[derive(Args)]
pub struct ClassDeleteArgs {
    /// Class name
    #[arg(value_name = "CLASS")]
    pub class: String,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

// ============================================================================
// Scales and ratings
// ============================================================================

#[derive(Subcommand)]
pub enum ScaleCommand {
    /// Add or update a scale
    Add(ScaleAddArgs),
    /// List scales in display order
    List(JsonArgs),
    /// Delete a scale (ratings are kept)
    Delete(ScaleDeleteArgs),
    /// Reorder scales; unlisted scales follow in their current order
    Reorder(ReorderArgs),
}

#[derive(Args)]
pub struct ScaleAddArgs {
    /// Scale id
    #[arg(value_name = "ID")]
    pub id: String,

    /// Label for the low end
    #[arg(long)]
    pub left: String,

    /// Label for the high end
    #[arg(long)]
    pub right: String,

    /// Minimum value
    #[arg(long, allow_hyphen_values = true)]
    pub min: Option<f64>,

    /// Maximum value
    #[arg(long, allow_hyphen_values = true)]
    pub max: Option<f64>,

    /// Lower values are better
    #[arg(long)]
    pub lower_is_better: bool,
}

#[derive(Args)]
pub struct ScaleDeleteArgs {
    /// Scale id
    #[arg(value_name = "ID")]
    pub id: String,
}

#[derive(Args)]
pub struct ReorderArgs {
    /// Ids in their new order
    #[arg(value_name = "ID", required = true, num_args = 1..)]
    pub ids: Vec<String>,
}

#[derive(Args)]
pub struct RateArgs {
    /// Student id
    #[arg(value_name = "STUDENT")]
    pub student: i64,

    /// Scale id
    #[arg(value_name = "SCALE")]
    pub scale: String,

    /// Value, clamped to the scale range
    #[arg(value_name = "VALUE", allow_hyphen_values = true)]
    pub value: f64,

    /// Treat VALUE as a step from the current value
    #[arg(long)]
    pub delta: bool,
}

#[derive(Args)]
pub struct RatingsArgs {
    /// Student id
    #[arg(value_name = "STUDENT")]
    pub student: i64,

    /// Include every recorded event, oldest first
    #[arg(long)]
    pub history: bool,

    #[command(flatten)]
    pub output: JsonArgs,
}

// ============================================================================
// Notes and checks
// ============================================================================

#[derive(Subcommand)]
pub enum NoteCommand {
    /// Add a note to a student
    Add(NoteAddArgs),
    /// List a student's notes, newest first
    List(NoteListArgs),
    /// Delete a note
    Delete(NoteDeleteArgs),
}

#[derive(Args)]
pub struct NoteAddArgs {
    /// Student id
    #[arg(value_name = "STUDENT")]
    pub student: i64,

    /// Note text
    #[arg(value_name = "TEXT")]
    pub text: String,

    /// Tags (repeatable)
    #[arg(short, long, value_name = "TAG")]
    pub tag: Vec<String>,
}

#[derive(Args)]
pub struct NoteListArgs {
    /// Student id
    #[arg(value_name = "STUDENT")]
    pub student: i64,

    #[command(flatten)]
    pub output: JsonArgs,
}

#[derive(Args)]
pub struct NoteDeleteArgs {
    /// Note id
    #[arg(value_name = "ID")]
    pub id: String,
}

#[derive(Subcommand)]
pub enum CheckCommand {
    /// Add or rename a check
    Add(CheckAddArgs),
    /// List checks in display order
    List(JsonArgs),
    /// Delete a check and its marks
    Delete(CheckDeleteArgs),
    /// Reorder checks; unlisted checks follow in their current order
    Reorder(ReorderArgs),
    /// Set or clear a check mark for a student
    Mark(CheckMarkArgs),
    /// Show a student's check marks
    Show(CheckShowArgs),
}

#[derive(Args)]
pub struct CheckAddArgs {
    /// Check id
    #[arg(value_name = "ID")]
    pub id: String,

    /// Display label
    #[arg(value_name = "LABEL")]
    pub label: String,
}

#[derive(Args)]
pub struct CheckDeleteArgs {
    /// Check id
    #[arg(value_name = "ID")]
    pub id: String,
}

#[derive(Args)]
pub struct CheckMarkArgs {
    /// Student id
    #[arg(value_name = "STUDENT")]
    pub student: i64,

    /// Check id
    #[arg(value_name = "CHECK")]
    pub check: String,

    /// Clear the mark instead of setting it
    #[arg(long)]
    pub clear: bool,
}

#[derive(Args)]
pub struct CheckShowArgs {
    /// Student id
    #[arg(value_name = "STUDENT")]
    pub student: i64,

    #[command(flatten)]
    pub output: JsonArgs,
}

// ============================================================================
// Seating
// ============================================================================

#[derive(Subcommand)]
pub enum SeatingCommand {
    /// Show a class seating plan (created on first use)
    Show(SeatingShowArgs),
    /// Swap two seats
    Swap(SeatingSwapArgs),
}

#[derive(Args)]
pub struct SeatingShowArgs {
    /// Class name
    #[arg(value_name = "CLASS")]
    pub class: String,

    #[command(flatten)]
    pub output: JsonArgs,
}

#[derive(Args)]
pub struct SeatingSwapArgs {
    /// Class name
    #[arg(value_name = "CLASS")]
    pub class: String,

    /// First seat (0-based)
    #[arg(value_name = "SEAT_A")]
    pub a: usize,

    /// Second seat (0-based)
    #[arg(value_name = "SEAT_B")]
    pub b: usize,
}

// ============================================================================
// Transfer
// ============================================================================

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TransferKind {
    Students,
    Ratings,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DuplicateArg {
    Merge,
    Skip,
}

#[derive(Args)]
pub struct ExportArgs {
    /// What to export
    #[arg(value_enum)]
    pub kind: TransferKind,

    /// Write to this file instead of stdout
    #[arg(long, value_name = "FILE")]
    pub out: Option<String>,
}

#[derive(Args)]
pub struct ImportArgs {
    /// What to import
    #[arg(value_enum)]
    pub kind: TransferKind,

    /// CSV file to read
    #[arg(value_name = "FILE")]
    pub file: String,

    /// Handling of students matching an existing (class, number)
    #[arg(long, value_enum, default_value = "merge")]
    pub on_duplicate: DuplicateArg,

    /// Class used to resolve ratings rows without a class column
    #[arg(long)]
    pub class: Option<String>,
}

// ============================================================================
// Sync and remote
// ============================================================================

#[derive(Args)]
pub struct SyncArgs {
    /// Show queued changes and the last sync time without syncing
    #[arg(long)]
    pub status: bool,

    #[command(flatten)]
    pub output: JsonArgs,
}

#[derive(Subcommand)]
pub enum RemoteCommand {
    /// Show or set the API base URL
    Url(RemoteUrlArgs),
    /// Log in and store the access token
    Login(RemoteLoginArgs),
    /// Forget the stored access token
    Logout,
}

#[derive(Args)]
pub struct RemoteUrlArgs {
    /// New API base URL
    #[arg(value_name = "URL")]
    pub url: Option<String>,
}

#[derive(Args)]
pub struct RemoteLoginArgs {
    /// Username
    #[arg(long)]
    pub username: String,

    /// Password (prompted when omitted)
    #[arg(long, env = "SEMDIFF_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

/// Arguments for the `completions` command
#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_name = "SHELL")]
    pub shell: Shell,
}
