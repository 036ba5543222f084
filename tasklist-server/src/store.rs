//! In-memory accounts, lists and tasks.
//!
//! [`TodoStore`] keeps one set of lists per account. Every data operation
//! takes the caller's bearer token and resolves it to an account first, so
//! one user can never see or touch another user's lists.

use std::collections::HashMap;

use tokio::sync::RwLock;
use uuid::Uuid;

use tasklist_proto::auth::{Credentials, NewUser, User};
use tasklist_proto::{List, ListBody, ListId, Task, TaskBody, TaskId, TaskPatch};

/// Errors from store operations. Each maps to one HTTP status.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// No token, or a token that was never issued.
    #[error("authentication required")]
    Unauthorized,

    /// Sign-in with an unknown e-mail or a wrong password.
    #[error("invalid email or password")]
    InvalidCredentials,

    /// Sign-up with an e-mail that already has an account.
    #[error("email already registered")]
    EmailTaken,

    /// A required field is missing or blank.
    #[error("{0} is required")]
    Missing(&'static str),

    /// No such list for this user.
    #[error("list {0} not found")]
    ListNotFound(ListId),

    /// No such task in the list.
    #[error("task {0} not found")]
    TaskNotFound(TaskId),
}

#[derive(Debug)]
struct Account {
    name: String,
    password: String,
    token: String,
    lists: Vec<List>,
    tasks: HashMap<ListId, Vec<Task>>,
}

impl Account {
    fn list_mut(&mut self, id: &ListId) -> Result<&mut List, StoreError> {
        self.lists
            .iter_mut()
            .find(|l| &l.id == id)
            .ok_or_else(|| StoreError::ListNotFound(id.clone()))
    }

    fn tasks_mut(&mut self, list: &ListId) -> Result<&mut Vec<Task>, StoreError> {
        self.tasks
            .get_mut(list)
            .ok_or_else(|| StoreError::ListNotFound(list.clone()))
    }
}

#[derive(Debug, Default)]
struct Accounts {
    /// E-mail -> account.
    by_email: HashMap<String, Account>,
    /// Token -> e-mail.
    tokens: HashMap<String, String>,
}

impl Accounts {
    fn authorize(&mut self, token: Option<&str>) -> Result<&mut Account, StoreError> {
        let email = token
            .and_then(|t| self.tokens.get(t))
            .ok_or(StoreError::Unauthorized)?;
        self.by_email.get_mut(email).ok_or(StoreError::Unauthorized)
    }
}

fn require(value: &str, field: &'static str) -> Result<(), StoreError> {
    if value.trim().is_empty() {
        Err(StoreError::Missing(field))
    } else {
        Ok(())
    }
}

fn fresh_id() -> String {
    Uuid::now_v7().to_string()
}

/// Thread-safe in-memory backing store for the server.
#[derive(Debug, Default)]
pub struct TodoStore {
    accounts: RwLock<Accounts>,
}

impl TodoStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an account and returns its token.
    ///
    /// # Errors
    ///
    /// [`StoreError::Missing`] for a blank field, [`StoreError::EmailTaken`]
    /// if the e-mail is already registered.
    pub async fn sign_up(&self, user: &NewUser) -> Result<String, StoreError> {
        require(&user.name, "name")?;
        require(&user.email, "email")?;
        require(&user.password, "password")?;

        let mut accounts = self.accounts.write().await;
        if accounts.by_email.contains_key(&user.email) {
            return Err(StoreError::EmailTaken);
        }
        let token = fresh_id();
        accounts
            .tokens
            .insert(token.clone(), user.email.clone());
        accounts.by_email.insert(
            user.email.clone(),
            Account {
                name: user.name.clone(),
                password: user.password.clone(),
                token: token.clone(),
                lists: Vec::new(),
                tasks: HashMap::new(),
            },
        );
        drop(accounts);
        Ok(token)
    }

    /// Returns the token of the account matching `credentials`.
    ///
    /// # Errors
    ///
    /// [`StoreError::InvalidCredentials`] on an unknown e-mail or wrong
    /// password.
    pub async fn sign_in(&self, credentials: &Credentials) -> Result<String, StoreError> {
        let accounts = self.accounts.read().await;
        accounts
            .by_email
            .get(&credentials.email)
            .filter(|a| a.password == credentials.password)
            .map(|a| a.token.clone())
            .ok_or(StoreError::InvalidCredentials)
    }

    /// The account behind `token`.
    ///
    /// # Errors
    ///
    /// [`StoreError::Unauthorized`] for an unknown token.
    pub async fn user(&self, token: Option<&str>) -> Result<User, StoreError> {
        let mut accounts = self.accounts.write().await;
        let account = accounts.authorize(token)?;
        Ok(User {
            name: account.name.clone(),
        })
    }

    /// All lists of the account, in creation order.
    ///
    /// # Errors
    ///
    /// [`StoreError::Unauthorized`] for an unknown token.
    pub async fn lists(&self, token: Option<&str>) -> Result<Vec<List>, StoreError> {
        let mut accounts = self.accounts.write().await;
        Ok(accounts.authorize(token)?.lists.clone())
    }

    /// Creates a list.
    ///
    /// # Errors
    ///
    /// [`StoreError::Unauthorized`] or [`StoreError::Missing`] for a blank
    /// title.
    pub async fn create_list(
        &self,
        token: Option<&str>,
        body: ListBody,
    ) -> Result<List, StoreError> {
        let mut accounts = self.accounts.write().await;
        let account = accounts.authorize(token)?;
        require(&body.title, "title")?;

        let list = body.into_list(ListId::new(fresh_id()));
        account.tasks.insert(list.id.clone(), Vec::new());
        account.lists.push(list.clone());
        drop(accounts);
        tracing::debug!(list_id = %list.id, "list created");
        Ok(list)
    }

    /// Renames a list; `detail` is only replaced when present.
    ///
    /// # Errors
    ///
    /// [`StoreError::Unauthorized`], [`StoreError::Missing`] or
    /// [`StoreError::ListNotFound`].
    pub async fn update_list(
        &self,
        token: Option<&str>,
        id: &ListId,
        body: ListBody,
    ) -> Result<List, StoreError> {
        let mut accounts = self.accounts.write().await;
        let account = accounts.authorize(token)?;
        require(&body.title, "title")?;

        let list = account.list_mut(id)?;
        list.title = body.title;
        if body.detail.is_some() {
            list.detail = body.detail;
        }
        Ok(list.clone())
    }

    /// Deletes a list and its tasks.
    ///
    /// # Errors
    ///
    /// [`StoreError::Unauthorized`] or [`StoreError::ListNotFound`].
    pub async fn delete_list(&self, token: Option<&str>, id: &ListId) -> Result<(), StoreError> {
        let mut accounts = self.accounts.write().await;
        let account = accounts.authorize(token)?;
        if account.tasks.remove(id).is_none() {
            return Err(StoreError::ListNotFound(id.clone()));
        }
        account.lists.retain(|l| &l.id != id);
        Ok(())
    }

    /// Tasks of a list, in creation order.
    ///
    /// # Errors
    ///
    /// [`StoreError::Unauthorized`] or [`StoreError::ListNotFound`].
    pub async fn tasks(&self, token: Option<&str>, list: &ListId) -> Result<Vec<Task>, StoreError> {
        let mut accounts = self.accounts.write().await;
        let account = accounts.authorize(token)?;
        Ok(account.tasks_mut(list)?.clone())
    }

    /// Creates a task.
    ///
    /// # Errors
    ///
    /// [`StoreError::Unauthorized`], [`StoreError::Missing`] or
    /// [`StoreError::ListNotFound`].
    pub async fn create_task(
        &self,
        token: Option<&str>,
        list: &ListId,
        body: TaskBody,
    ) -> Result<Task, StoreError> {
        let mut accounts = self.accounts.write().await;
        let account = accounts.authorize(token)?;
        require(&body.title, "title")?;

        let task = body.into_task(TaskId::new(fresh_id()));
        account.tasks_mut(list)?.push(task.clone());
        drop(accounts);
        tracing::debug!(list_id = %list, task_id = %task.id, "task created");
        Ok(task)
    }

    /// Applies `body` to a task; fields it leaves out keep their value.
    ///
    /// # Errors
    ///
    /// [`StoreError::Unauthorized`], [`StoreError::Missing`],
    /// [`StoreError::ListNotFound`] or [`StoreError::TaskNotFound`].
    pub async fn update_task(
        &self,
        token: Option<&str>,
        list: &ListId,
        id: &TaskId,
        body: TaskPatch,
    ) -> Result<Task, StoreError> {
        let mut accounts = self.accounts.write().await;
        let account = accounts.authorize(token)?;
        if let Some(title) = &body.title {
            require(title, "title")?;
        }

        let task = account
            .tasks_mut(list)?
            .iter_mut()
            .find(|t| &t.id == id)
            .ok_or_else(|| StoreError::TaskNotFound(id.clone()))?;
        body.apply(task);
        Ok(task.clone())
    }

    /// Deletes a task.
    ///
    /// # Errors
    ///
    /// [`StoreError::Unauthorized`], [`StoreError::ListNotFound`] or
    /// [`StoreError::TaskNotFound`].
    pub async fn delete_task(
        &self,
        token: Option<&str>,
        list: &ListId,
        id: &TaskId,
    ) -> Result<(), StoreError> {
        let mut accounts = self.accounts.write().await;
        let tasks = accounts.authorize(token)?.tasks_mut(list)?;
        let before = tasks.len();
        tasks.retain(|t| &t.id != id);
        if tasks.len() == before {
            return Err(StoreError::TaskNotFound(id.clone()));
        }
        Ok(())
    }
}
