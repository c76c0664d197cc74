/// Search results
///
/// `GET search?query=<q>` matches tasks, projects and users at once. Each list
/// is omitted by the backend when nothing of that kind matched.

use serde::{Deserialize, Serialize};

use super::project::Project;
use super::task::Task;
use super::user::User;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    #[serde(default)]
    pub tasks: Vec<Task>,

    #[serde(default)]
    pub projects: Vec<Project>,

    #[serde(default)]
    pub users: Vec<User>,
}

impl SearchResult {
    /// True when nothing matched
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty() && self.projects.is_empty() && self.users.is_empty()
    }
}
