// Command-line surface. Item names match the `.canvas`-era spelling
// (`assignment_groups`, `api_url`) and also accept kebab-case.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Manage a Canvas course from the command line",
    long_about = None
)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch and list items from the current course.
    List {
        what: ListItem,
        /// Also print descriptions where available.
        #[arg(long)]
        detail: bool,
    },
    /// Set a configuration value.
    Set {
        what: ConfigItem,
        /// New value; `api_key` is prompted for when omitted.
        value: Option<String>,
    },
    /// Show a configuration value.
    Show { what: ConfigItem },
    /// Create an item in the current course.
    Create(CreateArgs),
    /// Display every student's score on every assignment.
    Gradebook,
    /// Describe a single Canvas item by id.
    Describe { what: DescribeItem, id: u64 },
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    pub what: CreateItem,
    /// Markdown file (assignment), YAML file (quiz), group name, or file to upload.
    pub arg: String,
    /// Publish the assignment or quiz; for files, make them visible to students.
    #[arg(long)]
    pub publish: bool,
    /// Update an existing assignment or quiz with the same name.
    #[arg(long)]
    pub edit: bool,
    /// Print what would be sent without contacting Canvas.
    #[arg(long)]
    pub dry_run: bool,
    /// Assignment group weight, in percent.
    #[arg(long)]
    pub weight: Option<f64>,
    /// Assignment group position.
    #[arg(long)]
    pub position: Option<u32>,
    /// Folder id to upload into; defaults to the course root folder.
    #[arg(long)]
    pub folder: Option<u64>,
}

impl CreateArgs {
    pub fn path(&self) -> PathBuf {
        PathBuf::from(&self.arg)
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListItem {
    Courses,
    Assignments,
    Quizzes,
    Files,
    Students,
    #[value(name = "assignment_groups", alias = "assignment-groups")]
    AssignmentGroups,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigItem {
    Course,
    #[value(name = "api_url", alias = "api-url")]
    ApiUrl,
    #[value(name = "api_key", alias = "api-key")]
    ApiKey,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum CreateItem {
    Assignment,
    #[value(name = "assignment_group", alias = "assignment-group")]
    AssignmentGroup,
    File,
    Quiz,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum DescribeItem {
    Quiz,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn accepts_snake_and_kebab_item_names() {
        let cli = Cli::parse_from(["canvas", "list", "assignment_groups"]);
        assert!(matches!(cli.command, Commands::List { what: ListItem::AssignmentGroups, .. }));
        let cli = Cli::parse_from(["canvas", "show", "api-url"]);
        assert!(matches!(cli.command, Commands::Show { what: ConfigItem::ApiUrl }));
    }

    #[test]
    fn parses_create_flags() {
        let cli = Cli::parse_from([
            "canvas", "-vv", "create", "assignment", "hw1.md", "--publish", "--dry-run",
        ]);
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Create(args) => {
                assert_eq!(args.what, CreateItem::Assignment);
                assert_eq!(args.arg, "hw1.md");
                assert!(args.publish && args.dry_run && !args.edit);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
