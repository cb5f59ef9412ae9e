// Library root
// -----------
// This crate exposes the library surface behind the `canvas` binary. The
// binary (`main.rs`) only parses arguments, sets up logging and hands off to
// `commands`.
//
// Module responsibilities:
// - `document`: Markdown + YAML frontmatter assignment files -> Canvas
//   assignment payloads (the only real conversion logic in the tool).
// - `markdown`: Markdown -> HTML with LaTeX math spans left untouched.
// - `quiz`: YAML quiz files -> quiz settings and question payloads.
// - `gradebook`: arranges submission scores into a student x assignment table.
// - `config`: the `.canvas` settings file.
// - `api` / `models`: blocking HTTP client for the Canvas REST API and the
//   resource shapes it returns.
// - `cli` / `commands`: the command-line surface and its handlers.
pub mod api;
pub mod cli;
pub mod commands;
pub mod config;
pub mod document;
pub mod gradebook;
pub mod markdown;
pub mod models;
pub mod quiz;
