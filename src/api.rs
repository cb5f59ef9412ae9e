// API client module: a small blocking HTTP client for the parts of the
// Canvas REST API the CLI uses. Every call is a direct pass-through; the
// only extra logic is following pagination links and the three-step file
// upload Canvas requires.

use crate::config::Config;
use crate::document::AssignmentPayload;
use crate::models::{
    Assignment, AssignmentGroup, CanvasFile, Course, Folder, Quiz, QuizQuestion, Submission,
    UploadTarget, User,
};
use anyhow::{Context, Result};
use reqwest::blocking::{multipart, Client, RequestBuilder, Response};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, LINK, LOCATION};
use reqwest::redirect::Policy;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use std::fs::File;
use std::path::Path;
use tracing::{debug, info};

const PER_PAGE: &str = "100";

/// Canvas client holding the HTTP client, the API root (`.../api/v1`) and
/// the access token sent with every request.
#[derive(Clone)]
pub struct CanvasClient {
    client: Client,
    base_url: String,
    token: String,
}

/// Fields accepted when creating an assignment group.
#[derive(Serialize, Debug, Default)]
pub struct NewAssignmentGroup {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_weight: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<u32>,
}

impl CanvasClient {
    /// Build a client from the instance URL (e.g.
    /// `https://school.instructure.com`) and an access token.
    pub fn new(api_url: &str, token: &str) -> Result<Self> {
        let client = Client::builder()
            .build()
            .context("Failed to build HTTP client")?;
        Ok(CanvasClient {
            client,
            base_url: api_root(api_url),
            token: token.to_string(),
        })
    }

    /// Build a client from the loaded config, honouring env overrides.
    pub fn from_config(config: &Config) -> Result<Self> {
        let (url, key) = config.credentials();
        Self::new(&url, &key)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn auth_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        let val = format!("Bearer {}", self.token);
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&val).context("API key contains invalid characters")?,
        );
        Ok(headers)
    }

    fn send(&self, req: RequestBuilder, what: &str) -> Result<Response> {
        let res = req
            .headers(self.auth_headers()?)
            .send()
            .with_context(|| format!("Failed to send {what} request"))?;
        ensure_success(res, what)
    }

    fn get_one<T: DeserializeOwned>(&self, path: &str, what: &str) -> Result<T> {
        debug!(path, "GET");
        let res = self.send(self.client.get(self.url(path)), what)?;
        res.json().with_context(|| format!("Parsing {what} response json"))
    }

    /// GET a collection, following `rel="next"` links until exhausted.
    fn get_all<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        what: &str,
    ) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut req = self
            .client
            .get(self.url(path))
            .query(query)
            .query(&[("per_page", PER_PAGE)]);
        loop {
            let res = self.send(req, what)?;
            let next = next_link(res.headers());
            let page: Vec<T> = res
                .json()
                .with_context(|| format!("Parsing {what} response json"))?;
            debug!(path, count = page.len(), "fetched page");
            items.extend(page);
            match next {
                Some(url) => req = self.client.get(url),
                None => break,
            }
        }
        Ok(items)
    }

    fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        what: &str,
    ) -> Result<T> {
        debug!(path, "POST");
        let res = self.send(self.client.post(self.url(path)).json(body), what)?;
        res.json().with_context(|| format!("Parsing {what} response json"))
    }

    fn put_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        what: &str,
    ) -> Result<T> {
        debug!(path, "PUT");
        let res = self.send(self.client.put(self.url(path)).json(body), what)?;
        res.json().with_context(|| format!("Parsing {what} response json"))
    }

    pub fn list_courses(&self) -> Result<Vec<Course>> {
        self.get_all("courses", &[], "List courses")
    }

    pub fn get_course(&self, course_id: u64) -> Result<Course> {
        self.get_one(&format!("courses/{course_id}"), "Get course")
    }

    pub fn list_assignments(&self, course_id: u64) -> Result<Vec<Assignment>> {
        self.get_all(
            &format!("courses/{course_id}/assignments"),
            &[],
            "List assignments",
        )
    }

    pub fn create_assignment(
        &self,
        course_id: u64,
        payload: &AssignmentPayload,
    ) -> Result<Assignment> {
        let created: Assignment = self.post_json(
            &format!("courses/{course_id}/assignments"),
            &json!({ "assignment": payload }),
            "Create assignment",
        )?;
        info!(id = created.id, name = %created.name, "created assignment");
        Ok(created)
    }

    pub fn edit_assignment(
        &self,
        course_id: u64,
        assignment_id: u64,
        payload: &AssignmentPayload,
    ) -> Result<Assignment> {
        let edited: Assignment = self.put_json(
            &format!("courses/{course_id}/assignments/{assignment_id}"),
            &json!({ "assignment": payload }),
            "Edit assignment",
        )?;
        info!(id = edited.id, name = %edited.name, "updated assignment");
        Ok(edited)
    }

    pub fn list_assignment_groups(&self, course_id: u64) -> Result<Vec<AssignmentGroup>> {
        self.get_all(
            &format!("courses/{course_id}/assignment_groups"),
            &[],
            "List assignment groups",
        )
    }

    pub fn create_assignment_group(
        &self,
        course_id: u64,
        group: &NewAssignmentGroup,
    ) -> Result<AssignmentGroup> {
        let created: AssignmentGroup = self.post_json(
            &format!("courses/{course_id}/assignment_groups"),
            group,
            "Create assignment group",
        )?;
        info!(id = created.id, name = %created.name, "created assignment group");
        Ok(created)
    }

    pub fn list_students(&self, course_id: u64) -> Result<Vec<User>> {
        self.get_all(
            &format!("courses/{course_id}/users"),
            &[("enrollment_type[]", "student")],
            "List students",
        )
    }

    pub fn list_submissions(&self, course_id: u64, assignment_id: u64) -> Result<Vec<Submission>> {
        self.get_all(
            &format!("courses/{course_id}/assignments/{assignment_id}/submissions"),
            &[],
            "List submissions",
        )
    }

    pub fn list_quizzes(&self, course_id: u64) -> Result<Vec<Quiz>> {
        self.get_all(&format!("courses/{course_id}/quizzes"), &[], "List quizzes")
    }

    pub fn get_quiz(&self, course_id: u64, quiz_id: u64) -> Result<Quiz> {
        self.get_one(&format!("courses/{course_id}/quizzes/{quiz_id}"), "Get quiz")
    }

    pub fn create_quiz(&self, course_id: u64, settings: &serde_json::Value) -> Result<Quiz> {
        let created: Quiz = self.post_json(
            &format!("courses/{course_id}/quizzes"),
            &json!({ "quiz": settings }),
            "Create quiz",
        )?;
        info!(id = created.id, title = %created.title, "created quiz");
        Ok(created)
    }

    pub fn edit_quiz(
        &self,
        course_id: u64,
        quiz_id: u64,
        settings: &serde_json::Value,
    ) -> Result<Quiz> {
        self.put_json(
            &format!("courses/{course_id}/quizzes/{quiz_id}"),
            &json!({ "quiz": settings }),
            "Edit quiz",
        )
    }

    pub fn list_quiz_questions(&self, course_id: u64, quiz_id: u64) -> Result<Vec<QuizQuestion>> {
        self.get_all(
            &format!("courses/{course_id}/quizzes/{quiz_id}/questions"),
            &[],
            "List quiz questions",
        )
    }

    pub fn create_quiz_question(
        &self,
        course_id: u64,
        quiz_id: u64,
        question: &serde_json::Value,
    ) -> Result<QuizQuestion> {
        self.post_json(
            &format!("courses/{course_id}/quizzes/{quiz_id}/questions"),
            &json!({ "question": question }),
            "Create quiz question",
        )
    }

    pub fn delete_quiz_question(
        &self,
        course_id: u64,
        quiz_id: u64,
        question_id: u64,
    ) -> Result<()> {
        let path = format!("courses/{course_id}/quizzes/{quiz_id}/questions/{question_id}");
        debug!(path = %path, "DELETE");
        self.send(self.client.delete(self.url(&path)), "Delete quiz question")?;
        Ok(())
    }

    /// The top-level "course files" folder.
    pub fn root_folder(&self, course_id: u64) -> Result<Folder> {
        self.get_one(&format!("courses/{course_id}/folders/root"), "Get root folder")
    }

    pub fn list_subfolders(&self, folder_id: u64) -> Result<Vec<Folder>> {
        self.get_all(&format!("folders/{folder_id}/folders"), &[], "List subfolders")
    }

    pub fn list_folder_files(&self, folder_id: u64) -> Result<Vec<CanvasFile>> {
        self.get_all(&format!("folders/{folder_id}/files"), &[], "List files")
    }

    /// Upload a local file into the course. Canvas first hands out an upload
    /// URL, then takes the bytes as multipart/form-data, and finally either
    /// returns the file record or redirects to a confirmation endpoint.
    pub fn upload_file(
        &self,
        course_id: u64,
        file_path: &Path,
        parent_folder_id: Option<u64>,
    ) -> Result<CanvasFile> {
        let file_name = file_path
            .file_name()
            .and_then(|s| s.to_str())
            .context("Upload path has no file name")?
            .to_string();
        let size = std::fs::metadata(file_path)
            .with_context(|| format!("Failed to read {}", file_path.display()))?
            .len();

        let mut announce = json!({ "name": file_name, "size": size });
        if let Some(folder_id) = parent_folder_id {
            announce["parent_folder_id"] = json!(folder_id);
        }
        let target: UploadTarget = self.post_json(
            &format!("courses/{course_id}/files"),
            &announce,
            "Start upload",
        )?;
        debug!(upload_url = %target.upload_url, "uploading file contents");

        // Upload params must precede the file part.
        let mut form = multipart::Form::new();
        for (key, value) in &target.upload_params {
            let text = match value {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            form = form.text(key.clone(), text);
        }
        let file = File::open(file_path).context("Failed to open upload file")?;
        let part = multipart::Part::reader(file).file_name(file_name);
        form = form.part("file", part);

        // Redirects are handled manually so the confirmation request can
        // carry the auth header.
        let uploader = Client::builder()
            .redirect(Policy::none())
            .build()
            .context("Failed to build upload client")?;
        let res = uploader
            .post(&target.upload_url)
            .multipart(form)
            .send()
            .context("Failed to send upload request")?;

        let uploaded: CanvasFile = if res.status().is_redirection() {
            let location = res
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
                .context("Upload redirect without a Location header")?
                .to_string();
            let confirm = self.send(self.client.get(location), "Confirm upload")?;
            confirm.json().context("Parsing upload confirmation json")?
        } else {
            ensure_success(res, "Upload")?
                .json()
                .context("Parsing upload response json")?
        };
        info!(id = uploaded.id, name = %uploaded.display_name, "uploaded file");
        Ok(uploaded)
    }

    pub fn set_file_hidden(&self, file_id: u64, hidden: bool) -> Result<CanvasFile> {
        self.put_json(
            &format!("files/{file_id}"),
            &json!({ "hidden": hidden }),
            "Update file",
        )
    }
}

/// `https://school.instructure.com/` -> `https://school.instructure.com/api/v1`.
fn api_root(api_url: &str) -> String {
    let trimmed = api_url.trim_end_matches('/');
    if trimmed.ends_with("/api/v1") {
        trimmed.to_string()
    } else {
        format!("{trimmed}/api/v1")
    }
}

/// Turn a non-2xx response into an error carrying the server's body.
fn ensure_success(res: Response, what: &str) -> Result<Response> {
    if !res.status().is_success() {
        let status = res.status();
        let txt = res.text().unwrap_or_else(|_| "".into());
        anyhow::bail!("{} failed: {} - {}", what, status, txt);
    }
    Ok(res)
}

/// Extract the `rel="next"` URL from a Canvas `Link` header.
fn next_link(headers: &HeaderMap) -> Option<String> {
    let link = headers.get(LINK)?.to_str().ok()?;
    link.split(',').find_map(|entry| {
        let mut parts = entry.split(';');
        let target = parts.next()?.trim();
        let is_next = parts.any(|p| {
            let p = p.trim();
            p == r#"rel="next""# || p == "rel=next"
        });
        if !is_next {
            return None;
        }
        target
            .strip_prefix('<')
            .and_then(|t| t.strip_suffix('>'))
            .map(str::to_string)
    })
}
