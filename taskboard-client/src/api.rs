/// Typed API facade
///
/// [`TaskboardApi`] is what the rest of the application talks to. Each
/// backend capability is one method: reads go through the [`QueryCache`]
/// and declare the tags they provide, writes check the session role and the
/// form before anything is sent, and invalidate tags once they succeed.
///
/// # Tags
///
/// | Read | Provides |
/// |---|---|
/// | `list_projects` | `Projects` |
/// | `list_tasks`, `list_tasks_by_user` | `Tasks(id)` per task, `Tasks` if empty |
/// | `list_users`, `get_user` | `Users` |
/// | `search` | nothing |
///
/// | Write | Invalidates |
/// |---|---|
/// | `create_project` | `Projects` |
/// | `create_task`, `delete_task`, `create_comment`, `create_attachment` | `Tasks` |
/// | `update_task_status` | `Tasks(id)` |
/// | `create_user`, `replace_user`, `update_profile` | `Users` |
///
/// # Example
///
/// ```no_run
/// use taskboard_client::api::TaskboardApi;
/// use taskboard_client::config::Config;
/// use taskboard_shared::forms::SignInForm;
/// use taskboard_shared::session::{MemoryPersistence, SessionStore};
/// use std::sync::Arc;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::with_base_url("http://localhost:8000");
/// let session = SessionStore::load(Arc::new(MemoryPersistence::default()));
/// let api = TaskboardApi::from_config(&config, session)?;
///
/// api.sign_in(SignInForm {
///     username: "bob".to_string(),
///     password: "secret1".to_string(),
/// })
/// .await?;
///
/// for project in api.list_projects().await?.iter() {
///     println!("{}", project.name);
/// }
/// # Ok(())
/// # }
/// ```

use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use serde::de::DeserializeOwned;
use taskboard_shared::auth::authorization::{
    require_role, PROJECT_CREATORS, TASK_CREATORS, TASK_EDITORS, USER_MANAGERS,
};
use taskboard_shared::forms::{
    FormErrors, ProfileForm, ProjectForm, SignInForm, SignUpForm, TaskForm, UserForm,
};
use taskboard_shared::models::attachment::{Attachment, NewAttachment};
use taskboard_shared::models::comment::{Comment, NewComment};
use taskboard_shared::models::credentials::SignInResponse;
use taskboard_shared::models::project::Project;
use taskboard_shared::models::search::SearchResult;
use taskboard_shared::models::task::{Status, StatusUpdate, Task};
use taskboard_shared::models::user::User;
use taskboard_shared::session::SessionStore;

use crate::cache::{task_list_tags, QueryCache, QueryKey, Subscription, Tag};
use crate::config::Config;
use crate::error::{ClientError, ClientResult};
use crate::http::{Endpoint, RemoteClient};
use crate::upload::{MediaUploader, UploadFile, MAX_TASK_IMAGES};

/// Search terms shorter than this are not sent
pub const MIN_SEARCH_LEN: usize = 2;

/// Task created together with its uploaded images
#[derive(Debug, Clone)]
pub struct CreatedTask {
    pub task: Task,
    pub attachments: Vec<Attachment>,
}

/// Cached, role-aware access to the Taskboard backend
#[derive(Clone, Debug)]
pub struct TaskboardApi {
    client: RemoteClient,
    cache: QueryCache,
}

impl TaskboardApi {
    pub fn new(client: RemoteClient, cache: QueryCache) -> Self {
        TaskboardApi { client, cache }
    }

    /// Builds client and cache from configuration
    pub fn from_config(config: &Config, session: SessionStore) -> ClientResult<Self> {
        let client = RemoteClient::new(&config.api, session)?;
        let cache = QueryCache::new(config.cache.keep_unused());
        Ok(Self::new(client, cache))
    }

    pub fn session(&self) -> &SessionStore {
        self.client.session()
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    pub fn client(&self) -> &RemoteClient {
        &self.client
    }

    // Authentication

    /// Signs in and stores token and user in the session together
    pub async fn sign_in(&self, form: SignInForm) -> ClientResult<User> {
        let request = form.into_request()?;
        let endpoint = Endpoint::post("auth/signin").public().json(&request)?;

        let response: SignInResponse = self.client.send(endpoint).await?;
        let (token, user) = response.into_parts();
        self.session().sign_in(token, user.clone());
        Ok(user)
    }

    /// Registers an organization with its first admin user
    ///
    /// Does not sign in.
    pub async fn sign_up(&self, form: SignUpForm) -> ClientResult<()> {
        let request = form.into_request()?;
        let endpoint = Endpoint::post("auth/signup").public().json(&request)?;
        self.client.send_unit(endpoint).await?;
        tracing::info!(username = %request.username, "Organization registered");
        Ok(())
    }

    pub fn sign_out(&self) {
        self.session().sign_out();
    }

    // Projects

    pub async fn list_projects(&self) -> ClientResult<Arc<Vec<Project>>> {
        self.cache
            .query(
                QueryKey::bare("list_projects"),
                self.fetcher(Endpoint::get("projects")),
                |_: &Vec<Project>| vec![Tag::projects()],
            )
            .await
    }

    pub fn watch_projects(&self) -> Subscription<Vec<Project>> {
        self.cache.subscribe(
            QueryKey::bare("list_projects"),
            self.fetcher(Endpoint::get("projects")),
            |_: &Vec<Project>| vec![Tag::projects()],
        )
    }

    pub async fn create_project(&self, form: ProjectForm) -> ClientResult<Project> {
        require_role(&self.session().snapshot(), PROJECT_CREATORS)?;
        let project = form.into_new_project()?;
        let endpoint = Endpoint::post("projects").json(&project)?;

        let created = self
            .cache
            .mutate(self.client.send::<Project>(endpoint), |_| vec![Tag::projects()])
            .await?;
        tracing::info!(project_id = created.id, "Project created");
        Ok(created)
    }

    // Tasks

    pub async fn list_tasks(&self, project_id: i64) -> ClientResult<Arc<Vec<Task>>> {
        self.cache
            .query(
                QueryKey::new("list_tasks", project_id),
                self.fetcher(tasks_endpoint(project_id)),
                |tasks: &Vec<Task>| task_tags(tasks),
            )
            .await
    }

    pub fn watch_tasks(&self, project_id: i64) -> Subscription<Vec<Task>> {
        self.cache.subscribe(
            QueryKey::new("list_tasks", project_id),
            self.fetcher(tasks_endpoint(project_id)),
            |tasks: &Vec<Task>| task_tags(tasks),
        )
    }

    pub async fn list_tasks_by_user(&self, user_id: i64) -> ClientResult<Arc<Vec<Task>>> {
        self.cache
            .query(
                QueryKey::new("list_tasks_by_user", user_id),
                self.fetcher(Endpoint::get(format!("tasks/user/{}", user_id))),
                |tasks: &Vec<Task>| task_tags(tasks),
            )
            .await
    }

    pub fn watch_tasks_by_user(&self, user_id: i64) -> Subscription<Vec<Task>> {
        self.cache.subscribe(
            QueryKey::new("list_tasks_by_user", user_id),
            self.fetcher(Endpoint::get(format!("tasks/user/{}", user_id))),
            |tasks: &Vec<Task>| task_tags(tasks),
        )
    }

    pub async fn create_task(&self, form: TaskForm) -> ClientResult<Task> {
        require_role(&self.session().snapshot(), TASK_CREATORS)?;
        let task = form.into_new_task()?;
        let endpoint = Endpoint::post("tasks").json(&task)?;

        let created = self
            .cache
            .mutate(self.client.send::<Task>(endpoint), |_| vec![Tag::tasks()])
            .await?;
        tracing::info!(task_id = created.id, project_id = created.project_id, "Task created");
        Ok(created)
    }

    /// Creates a task, then uploads up to three images and attaches them
    ///
    /// Images beyond the limit are ignored. Failed uploads or attachment
    /// requests are logged and skipped; the task itself is kept.
    pub async fn create_task_with_attachments(
        &self,
        form: TaskForm,
        images: Vec<UploadFile>,
        uploader: &dyn MediaUploader,
    ) -> ClientResult<CreatedTask> {
        let task = self.create_task(form).await?;

        let mut attachments = Vec::new();
        for image in images.into_iter().take(MAX_TASK_IMAGES) {
            let Some(file_url) = uploader.upload_file(image).await else {
                continue;
            };

            match self
                .create_attachment(file_url, task.id, task.author_user_id)
                .await
            {
                Ok(attachment) => attachments.push(attachment),
                Err(e) => {
                    tracing::warn!(task_id = task.id, error = %e, "Failed to attach image");
                }
            }
        }

        Ok(CreatedTask { task, attachments })
    }

    pub async fn update_task_status(&self, task_id: i64, status: Status) -> ClientResult<Task> {
        require_role(&self.session().snapshot(), TASK_EDITORS)?;
        let endpoint =
            Endpoint::patch(format!("tasks/{}/status", task_id)).json(&StatusUpdate { status })?;

        let updated = self
            .cache
            .mutate(self.client.send::<Task>(endpoint), |_| vec![Tag::task(task_id)])
            .await?;
        tracing::info!(task_id, status = %status, "Task status updated");
        Ok(updated)
    }

    pub async fn delete_task(&self, task_id: i64) -> ClientResult<()> {
        require_role(&self.session().snapshot(), TASK_EDITORS)?;
        let endpoint = Endpoint::delete(format!("tasks/{}", task_id));

        self.cache
            .mutate(self.client.send_unit(endpoint), |_| vec![Tag::tasks()])
            .await?;
        tracing::info!(task_id, "Task deleted");
        Ok(())
    }

    /// Adds a comment as the signed-in user
    pub async fn create_comment(&self, task_id: i64, text: &str) -> ClientResult<Comment> {
        let text = text.trim();
        if text.is_empty() {
            let mut errors = FormErrors::new();
            errors.insert("comment", "Comment can not be empty");
            return Err(errors.into());
        }

        let comment = NewComment {
            new_comment: text.to_string(),
            task_id,
            user_id: self.session().user().and_then(|user| user.user_id),
        };
        let endpoint = Endpoint::post("tasks/comment").json(&comment)?;

        self.cache
            .mutate(self.client.send::<Comment>(endpoint), |_| vec![Tag::tasks()])
            .await
    }

    pub async fn create_attachment(
        &self,
        file_url: String,
        task_id: i64,
        user_id: Option<i64>,
    ) -> ClientResult<Attachment> {
        let attachment = NewAttachment {
            file_url,
            task_id,
            user_id,
        };
        let endpoint = Endpoint::post("tasks/attachment").json(&attachment)?;

        self.cache
            .mutate(self.client.send::<Attachment>(endpoint), |_| vec![Tag::tasks()])
            .await
    }

    // Search

    /// Searches tasks, projects and users
    ///
    /// Terms shorter than [`MIN_SEARCH_LEN`] yield an empty result without a
    /// request.
    pub async fn search(&self, query: &str) -> ClientResult<Arc<SearchResult>> {
        let term = query.trim();
        if term.chars().count() < MIN_SEARCH_LEN {
            return Ok(Arc::new(SearchResult::default()));
        }

        self.cache
            .query(
                QueryKey::new("search", term),
                self.fetcher(Endpoint::get("search").query("query", term)),
                |_: &SearchResult| Vec::new(),
            )
            .await
    }

    // Users

    pub async fn list_users(&self) -> ClientResult<Arc<Vec<User>>> {
        self.cache
            .query(
                QueryKey::bare("list_users"),
                self.fetcher(Endpoint::get("users")),
                |_: &Vec<User>| vec![Tag::users()],
            )
            .await
    }

    pub fn watch_users(&self) -> Subscription<Vec<User>> {
        self.cache.subscribe(
            QueryKey::bare("list_users"),
            self.fetcher(Endpoint::get("users")),
            |_: &Vec<User>| vec![Tag::users()],
        )
    }

    pub async fn get_user(&self, username: &str) -> ClientResult<Arc<User>> {
        self.cache
            .query(
                QueryKey::new("get_user", username),
                self.fetcher(Endpoint::get("users").segment(username)),
                |_: &User| vec![Tag::users()],
            )
            .await
    }

    pub fn watch_user(&self, username: &str) -> Subscription<User> {
        self.cache.subscribe(
            QueryKey::new("get_user", username),
            self.fetcher(Endpoint::get("users").segment(username)),
            |_: &User| vec![Tag::users()],
        )
    }

    /// Adds a user to the signed-in user's organization
    pub async fn create_user(
        &self,
        form: UserForm,
        profile_picture_url: Option<String>,
    ) -> ClientResult<User> {
        let session = self.session().snapshot();
        require_role(&session, USER_MANAGERS)?;

        let organization_id = session.user.as_ref().and_then(|user| user.organization_id);
        let new_user = form.into_new_user(profile_picture_url, organization_id)?;
        let endpoint = Endpoint::post("users").json(&new_user)?;

        let created = self
            .cache
            .mutate(self.client.send::<User>(endpoint), |_| vec![Tag::users()])
            .await?;
        tracing::info!(username = %created.username, role = %created.role, "User created");
        Ok(created)
    }

    /// Replaces an existing user
    pub async fn replace_user(
        &self,
        form: UserForm,
        existing: &User,
        profile_picture_url: Option<String>,
    ) -> ClientResult<User> {
        require_role(&self.session().snapshot(), USER_MANAGERS)?;
        let update = form.into_update(existing, profile_picture_url)?;
        let endpoint = Endpoint::put("users").json(&update)?;

        self.cache
            .mutate(self.client.send::<User>(endpoint), |_| vec![Tag::users()])
            .await
    }

    /// Updates the signed-in user's password or picture
    ///
    /// The returned user replaces the one in the session.
    pub async fn update_profile(
        &self,
        form: ProfileForm,
        profile_picture_url: Option<String>,
    ) -> ClientResult<User> {
        let current = self.session().user().ok_or(ClientError::Unauthenticated)?;
        let update = form.into_update(&current, profile_picture_url)?;
        let endpoint = Endpoint::patch("users").json(&update)?;

        let updated = self
            .cache
            .mutate(self.client.send::<User>(endpoint), |_| vec![Tag::users()])
            .await?;
        self.session().replace_user(updated.clone());
        Ok(updated)
    }

    fn fetcher<T>(
        &self,
        endpoint: Endpoint,
    ) -> impl Fn() -> BoxFuture<'static, ClientResult<T>> + Send + Sync + 'static
    where
        T: DeserializeOwned + Send + 'static,
    {
        let client = self.client.clone();
        move || {
            let client = client.clone();
            let endpoint = endpoint.clone();
            async move { client.send::<T>(endpoint).await }.boxed()
        }
    }
}

fn tasks_endpoint(project_id: i64) -> Endpoint {
    Endpoint::get("tasks").query("projectId", project_id)
}

fn task_tags(tasks: &[Task]) -> Vec<Tag> {
    task_list_tags(tasks.iter().map(|task| task.id))
}
