// Command handlers: each subcommand loads the config, talks to Canvas
// through `api::CanvasClient` and prints the result. Conversion of local
// documents happens before any network call so a bad file never results in
// a half-made assignment or quiz.

use crate::api::{CanvasClient, NewAssignmentGroup};
use crate::cli::{Cli, Commands, ConfigItem, CreateArgs, CreateItem, DescribeItem, ListItem};
use crate::config::{config_path, mask_key, Config};
use crate::document::{self, AssignmentDocument, AssignmentPayload};
use crate::gradebook::Gradebook;
use crate::models::Folder;
use crate::quiz::{parse_quiz, QuizDocument};
use anyhow::{Context, Result};
use crossterm::style::Stylize;
use dialoguer::Password;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Loaded configuration plus where it came from, so `set` can write back.
pub struct Session {
    path: PathBuf,
    config: Config,
}

impl Session {
    pub fn load() -> Result<Self> {
        Self::load_from(config_path())
    }

    pub fn load_from(path: PathBuf) -> Result<Self> {
        let config = Config::load_from(&path)?;
        Ok(Session { path, config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn client(&self) -> Result<CanvasClient> {
        CanvasClient::from_config(&self.config)
    }

    /// Client plus the current course id; errors if no course is set.
    fn course(&self) -> Result<(CanvasClient, u64)> {
        let course_id = self.config.require_course()?;
        Ok((self.client()?, course_id))
    }

    fn save(&self) -> Result<()> {
        self.config.save_to(&self.path)
    }
}

/// Dispatch a parsed command line.
pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        // Dry runs need neither config nor network.
        Commands::Create(args) if args.dry_run => dry_run(&args),
        command => {
            let mut session = Session::load()?;
            match command {
                Commands::List { what, detail } => list(&session, what, detail),
                Commands::Set { what, value } => set(&mut session, what, value),
                Commands::Show { what } => show(&session, what),
                Commands::Create(args) => create(&session, &args),
                Commands::Gradebook => gradebook(&session),
                Commands::Describe { what, id } => describe(&session, what, id),
            }
        }
    }
}

/// Run `f` behind a terminal spinner showing `msg`.
fn with_spinner<T>(msg: &str, f: impl FnOnce() -> Result<T>) -> Result<T> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(msg.to_string());
    spinner.enable_steady_tick(Duration::from_millis(100));
    let result = f();
    spinner.finish_and_clear();
    result
}

pub fn list(session: &Session, what: ListItem, detail: bool) -> Result<()> {
    if what == ListItem::Courses {
        let client = session.client()?;
        let courses = with_spinner("Fetching courses...", || client.list_courses())?;
        for course in courses {
            println!("Course ID: {}, Name: {}", course.id, course.name);
        }
        return Ok(());
    }

    let (client, course_id) = session.course()?;
    match what {
        ListItem::Courses => {}
        ListItem::Assignments => {
            let assignments =
                with_spinner("Fetching assignments...", || client.list_assignments(course_id))?;
            for assignment in assignments {
                println!(
                    "Assignment ID: {}, Name: {}, Submission Types: {}",
                    assignment.id,
                    assignment.name,
                    assignment.submission_types.join(", ")
                );
                if detail {
                    println!("{}", assignment.description.as_deref().unwrap_or(""));
                }
            }
        }
        ListItem::Quizzes => {
            let quizzes = with_spinner("Fetching quizzes...", || client.list_quizzes(course_id))?;
            for quiz in quizzes {
                println!("Quiz ID: {}, Title: {}", quiz.id, quiz.title);
                println!("  Points: {}", display_opt(quiz.points_possible));
                println!("  Due: {}", quiz.due_at.as_deref().unwrap_or("None"));
                println!("  Published: {}", quiz.published);
                if detail {
                    println!("  {}", quiz.description.as_deref().unwrap_or(""));
                }
            }
        }
        ListItem::Files => list_files(&client, course_id)?,
        ListItem::Students => {
            let students =
                with_spinner("Fetching students...", || client.list_students(course_id))?;
            for student in students {
                println!(
                    "Student ID: {}, Name: {}, Email: {}",
                    student.id,
                    student.name,
                    student.email.as_deref().unwrap_or("N/A")
                );
            }
        }
        ListItem::AssignmentGroups => {
            let groups = with_spinner("Fetching assignment groups...", || {
                client.list_assignment_groups(course_id)
            })?;
            for group in groups {
                println!(
                    "Group ID: {}, Name: {}, Weight: {}",
                    group.id,
                    group.name,
                    group.group_weight.map(|w| w.to_string()).unwrap_or_else(|| "N/A".into())
                );
            }
        }
    }
    Ok(())
}

/// Print the course folder tree starting at the root folder.
fn list_files(client: &CanvasClient, course_id: u64) -> Result<()> {
    let root = client.root_folder(course_id)?;
    println!("{}", "Complete directory tree for course:".bold());
    print_folder(client, &root, "");
    Ok(())
}

/// Listing failures inside one folder are reported and the walk continues.
fn print_folder(client: &CanvasClient, folder: &Folder, indent: &str) {
    println!("{}📁 {} (ID: {})", indent, folder.name.as_str().bold(), folder.id);
    let child_indent = format!("{indent}  ");

    match client.list_subfolders(folder.id) {
        Ok(subfolders) => {
            for sub in &subfolders {
                print_folder(client, sub, &child_indent);
            }
        }
        Err(e) => println!("{}{} {:#}", child_indent, "Error listing subfolders:".red(), e),
    }

    match client.list_folder_files(folder.id) {
        Ok(files) => {
            for file in files {
                let size = file
                    .size
                    .map(|s| format!("{s} bytes"))
                    .unwrap_or_else(|| "N/A".into());
                println!(
                    "{}📄 {} (ID: {}, Size: {})",
                    child_indent, file.display_name, file.id, size
                );
            }
        }
        Err(e) => println!("{}{} {:#}", child_indent, "Error listing files:".red(), e),
    }
}

pub fn set(session: &mut Session, what: ConfigItem, value: Option<String>) -> Result<()> {
    match what {
        ConfigItem::Course => {
            let value = value.context("A course id is required")?;
            let course_id: u64 = value
                .trim()
                .parse()
                .with_context(|| format!("Invalid course id: {value}"))?;
            let course = with_spinner("Checking course...", || {
                session.client()?.get_course(course_id)
            })?;
            session.config.current_course_id = Some(course_id);
            session.save()?;
            println!("Current Course ID: {}, Name: {}", course.id, course.name);
        }
        ConfigItem::ApiUrl => {
            let value = value.context("A URL is required")?;
            session.config.api_url = value.clone();
            session.save()?;
            println!("Canvas API URL set to: {value}");
        }
        ConfigItem::ApiKey => {
            let value = match value {
                Some(v) => v,
                // `Password` hides input in terminal.
                None => Password::new().with_prompt("Canvas API key").interact()?,
            };
            session.config.api_key = value;
            session.save()?;
            println!("Canvas API key set successfully");
        }
    }
    Ok(())
}

pub fn show(session: &Session, what: ConfigItem) -> Result<()> {
    let config = session.config();
    match what {
        ConfigItem::Course => match config.current_course_id {
            Some(course_id) => {
                let course = with_spinner("Fetching course...", || {
                    session.client()?.get_course(course_id)
                })?;
                println!("Current Course ID: {}, Name: {}", course.id, course.name);
            }
            None => println!("No course is currently set"),
        },
        ConfigItem::ApiUrl => println!("Canvas API URL: {}", config.api_url),
        ConfigItem::ApiKey => println!("Canvas API key: {}", mask_key(&config.api_key)),
    }
    Ok(())
}

pub fn create(session: &Session, args: &CreateArgs) -> Result<()> {
    match args.what {
        CreateItem::Assignment => {
            let payload = load_assignment(&args.path(), args.publish)?;
            submit_assignment(session, &payload, args.edit)
        }
        CreateItem::AssignmentGroup => create_assignment_group(session, args),
        CreateItem::File => upload_file(session, &args.path(), !args.publish, args.folder),
        CreateItem::Quiz => {
            let quiz = load_quiz(&args.path())?;
            submit_quiz(session, &quiz, args.publish, args.edit)
        }
    }
}

/// Parse and render an assignment file into a ready payload.
pub fn load_assignment(path: &Path, publish: bool) -> Result<AssignmentPayload> {
    let doc = AssignmentDocument::from_path(path)?;
    let mut payload = document::render(&doc)
        .with_context(|| format!("Cannot convert {}", path.display()))?;
    payload.published |= publish;
    Ok(payload)
}

fn load_quiz(path: &Path) -> Result<QuizDocument> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read quiz file {}", path.display()))?;
    let quiz = parse_quiz(&text).with_context(|| format!("Cannot convert {}", path.display()))?;
    Ok(quiz)
}

fn dry_run(args: &CreateArgs) -> Result<()> {
    match args.what {
        CreateItem::Assignment => {
            let payload = load_assignment(&args.path(), args.publish)?;
            println!("{}", "Dry run - would create assignment:".yellow());
            println!("Name: {}", payload.name);
            println!("Points: {}", display_opt(payload.points_possible));
            println!("Due: {}", payload.due_at.as_deref().unwrap_or("None"));
            println!("Group: {}", display_opt(payload.assignment_group_id));
            println!("\nHTML Content:");
            println!("{}", payload.description);
        }
        CreateItem::Quiz => {
            let quiz = load_quiz(&args.path())?;
            println!("{}", "Dry run - would create quiz:".yellow());
            println!("{}", serde_json::to_string_pretty(&quiz.settings(args.publish)?)?);
            for question in &quiz.questions {
                println!("{}", serde_json::to_string_pretty(&question.to_payload()?)?);
            }
        }
        CreateItem::AssignmentGroup => {
            println!("{}", "Dry run - would create assignment group:".yellow());
            println!("Name: {}", args.arg);
            println!("Weight: {}", display_opt(args.weight));
        }
        CreateItem::File => {
            let size = std::fs::metadata(args.path())
                .with_context(|| format!("File '{}' does not exist", args.arg))?
                .len();
            println!("{}", "Dry run - would upload file:".yellow());
            println!("{} ({} bytes), hidden: {}", args.arg, size, !args.publish);
        }
    }
    Ok(())
}

fn submit_assignment(session: &Session, payload: &AssignmentPayload, edit: bool) -> Result<()> {
    let (client, course_id) = session.course()?;
    let existing = with_spinner("Checking existing assignments...", || {
        client.list_assignments(course_id)
    })?
    .into_iter()
    .find(|a| a.name == payload.name);

    let status = if payload.published { "published" } else { "unpublished" };
    match existing {
        Some(_) if !edit => {
            println!("{}", "Assignment exists; use --edit to modify it".yellow());
        }
        Some(found) => {
            let assignment = with_spinner("Updating assignment...", || {
                client.edit_assignment(course_id, found.id, payload)
            })?;
            println!(
                "{} {} (ID: {}) - {}",
                "Assignment updated successfully:".green(),
                assignment.name,
                assignment.id,
                status
            );
        }
        None => {
            let assignment = with_spinner("Creating assignment...", || {
                client.create_assignment(course_id, payload)
            })?;
            println!(
                "{} {} (ID: {}) - {}",
                "Assignment created successfully:".green(),
                assignment.name,
                assignment.id,
                status
            );
        }
    }
    Ok(())
}

fn create_assignment_group(session: &Session, args: &CreateArgs) -> Result<()> {
    let (client, course_id) = session.course()?;
    let group = NewAssignmentGroup {
        name: args.arg.clone(),
        group_weight: args.weight,
        position: args.position,
    };
    let created = with_spinner("Creating assignment group...", || {
        client.create_assignment_group(course_id, &group)
    })?;
    println!(
        "{} {} (ID: {})",
        "Assignment group created successfully:".green(),
        created.name,
        created.id
    );
    if let Some(weight) = args.weight {
        println!("Weight: {weight}%");
    }
    Ok(())
}

fn upload_file(session: &Session, path: &Path, hidden: bool, folder: Option<u64>) -> Result<()> {
    if !path.exists() {
        anyhow::bail!("File '{}' does not exist", path.display());
    }
    let (client, course_id) = session.course()?;

    let folder_id = match folder {
        Some(id) => id,
        None => {
            let root = client.root_folder(course_id)?;
            println!("Using course root folder (ID: {})", root.id);
            root.id
        }
    };

    let size = std::fs::metadata(path)?.len();
    let name = path.file_name().and_then(|s| s.to_str()).unwrap_or_default();
    let uploaded = with_spinner(&format!("Uploading {name} ({size} bytes)..."), || {
        let file = client.upload_file(course_id, path, Some(folder_id))?;
        client.set_file_hidden(file.id, hidden)
    })?;
    println!(
        "{} {} (ID: {})",
        "File uploaded successfully".green(),
        uploaded.display_name,
        uploaded.id
    );
    Ok(())
}

fn submit_quiz(session: &Session, quiz: &QuizDocument, publish: bool, edit: bool) -> Result<()> {
    // Build every payload up front so a bad question aborts before any change.
    let settings = quiz.settings(publish)?;
    let questions = quiz
        .questions
        .iter()
        .map(|q| q.to_payload())
        .collect::<Result<Vec<_>, _>>()?;

    let (client, course_id) = session.course()?;
    let title = quiz.title();
    let existing = with_spinner("Checking existing quizzes...", || client.list_quizzes(course_id))?
        .into_iter()
        .find(|q| q.title == title);

    let created = match existing {
        Some(_) if !edit => {
            println!("{}", "Quiz exists; use --edit to modify it".yellow());
            return Ok(());
        }
        Some(found) => {
            let updated = client.edit_quiz(course_id, found.id, &settings)?;
            let status = if publish { "published" } else { "unpublished" };
            println!(
                "{} {} (ID: {}) - {}",
                "Quiz updated successfully:".green(),
                updated.title,
                updated.id,
                status
            );
            updated
        }
        None => {
            let created = client.create_quiz(course_id, &settings)?;
            println!("{} {} (ID: {})", "Creating new quiz".green(), created.title, created.id);
            created
        }
    };

    with_spinner("Replacing questions...", || {
        for old in client.list_quiz_questions(course_id, created.id)? {
            client.delete_quiz_question(course_id, created.id, old.id)?;
        }
        for question in &questions {
            client.create_quiz_question(course_id, created.id, question)?;
        }
        Ok(())
    })?;

    println!(
        "{}",
        format!("Quiz operation completed successfully with ID: {}", created.id).green()
    );
    Ok(())
}

pub fn gradebook(session: &Session) -> Result<()> {
    let (client, course_id) = session.course()?;
    let book = with_spinner("Downloading gradebook...", || {
        let mut book = Gradebook::new(client.list_students(course_id)?);
        for assignment in client.list_assignments(course_id)? {
            let submissions = client.list_submissions(course_id, assignment.id)?;
            book.record(&assignment.name, &submissions);
        }
        Ok(book)
    })?;

    println!("{}\t{}", "Student".bold(), book.assignments().join("\t").bold());
    for row in book.rows() {
        println!("{}", row.to_line());
    }
    Ok(())
}

pub fn describe(session: &Session, what: DescribeItem, id: u64) -> Result<()> {
    let (client, course_id) = session.course()?;
    match what {
        DescribeItem::Quiz => {
            let (quiz, questions) = with_spinner("Fetching quiz...", || {
                Ok((
                    client.get_quiz(course_id, id)?,
                    client.list_quiz_questions(course_id, id)?,
                ))
            })?;

            println!("\nQuiz: {}", quiz.title);
            println!("Points possible: {}", display_opt(quiz.points_possible));
            println!("Description: {}", quiz.description.as_deref().unwrap_or(""));
            println!("\nQuestions:");

            for question in questions {
                println!("\nQuestion {}:", display_opt(question.position));
                println!("Type: {}", question.question_type.as_deref().unwrap_or("N/A"));
                println!("Name: {}", question.question_name.as_deref().unwrap_or("N/A"));
                println!("Text: {}", question.question_text.as_deref().unwrap_or(""));
                println!("Points: {}", display_opt(question.points_possible));
                if !question.answers.is_empty() {
                    println!("Answers:");
                    for answer in &question.answers {
                        let mark = if answer.is_correct() { "✓" } else { " " };
                        println!("  [{}] {}", mark, answer.text.as_deref().unwrap_or("N/A"));
                    }
                }
            }
        }
    }
    Ok(())
}

fn display_opt<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "None".into())
}
