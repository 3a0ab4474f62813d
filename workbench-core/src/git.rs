// workbench-core/src/git.rs

use crate::errors::{Result, WorkbenchError};
use crate::runner::{reject_option_like, CommandOutput, CommandRunner};
use crate::sequence::{SequenceOutcome, StepLog};
use crate::workspace::Workspace;
use std::sync::Arc;
use tracing::{info, warn};
use url::Url;

/// Where pushes go and how to authenticate them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteSettings {
    /// Remote name used by push and set-url, usually `origin`.
    pub remote: String,
    /// Repository location as configured, with or without scheme/credentials.
    pub repo_url: Option<String>,
    /// Access token substituted into the remote URL.
    pub token: Option<String>,
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            remote: "origin".to_string(),
            repo_url: None,
            token: None,
        }
    }
}

/// What `git add` should stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddScope {
    All,
    Paths(Vec<String>),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffOptions {
    /// Compare the index against HEAD instead of the working tree.
    pub staged: bool,
    /// Restrict the diff to one workspace file.
    pub file: Option<String>,
    pub base: Option<String>,
    pub head: Option<String>,
}

/// Builds git command lines and runs them in the workspace root.
#[derive(Clone)]
pub struct GitClient {
    runner: Arc<dyn CommandRunner>,
    workspace: Workspace,
    remote: RemoteSettings,
}

impl GitClient {
    pub fn new(runner: Arc<dyn CommandRunner>, workspace: Workspace, remote: RemoteSettings) -> Self {
        Self {
            runner,
            workspace,
            remote,
        }
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn remote_name(&self) -> &str {
        &self.remote.remote
    }

    /// Runs `git <args>` in the workspace root.
    pub async fn run<S: AsRef<str>>(&self, args: &[S]) -> Result<CommandOutput> {
        let args: Vec<String> = args.iter().map(|a| a.as_ref().to_string()).collect();
        self.runner.run("git", &args, self.workspace.root()).await
    }

    pub async fn status(&self) -> Result<CommandOutput> {
        self.run(&["status"]).await
    }

    pub async fn diff(&self, options: &DiffOptions) -> Result<CommandOutput> {
        for revision in options.base.iter().chain(options.head.iter()) {
            reject_option_like("revision", revision)?;
        }
        let mut args = vec!["diff".to_string()];
        if options.staged {
            args.push("--cached".to_string());
        }
        if options.base.is_some() || options.head.is_some() {
            args.push("--end-of-options".to_string());
        }
        args.extend(options.base.iter().cloned());
        args.extend(options.head.iter().cloned());
        if let Some(file) = &options.file {
            let resolved = self.workspace.resolve(file)?;
            args.push("--".to_string());
            args.push(self.workspace.relative(&resolved));
        }
        self.run(&args).await
    }

    pub async fn add(&self, scope: &AddScope) -> Result<CommandOutput> {
        match scope {
            AddScope::All => self.run(&["add", "-A"]).await,
            AddScope::Paths(paths) => {
                let mut args = vec!["add".to_string(), "--".to_string()];
                args.extend(paths.iter().cloned());
                self.run(&args).await
            }
        }
    }

    pub async fn commit(&self, message: &str) -> Result<CommandOutput> {
        self.run(&["commit", "-m", message]).await
    }

    pub async fn push(&self, remote: &str, branch: Option<&str>) -> Result<CommandOutput> {
        let mut args = vec!["push", remote];
        args.extend(branch);
        self.run(&args).await
    }

    pub async fn pull(&self) -> Result<CommandOutput> {
        self.run(&["pull"]).await
    }

    pub async fn log(&self, limit: usize) -> Result<CommandOutput> {
        let limit = limit.max(1).to_string();
        self.run(&["log", "-n", &limit, "--oneline", "--decorate"]).await
    }

    /// Points the configured remote at the repository location with the
    /// access token embedded. Fails before running git if either is missing.
    pub async fn set_remote_url_from_credentials(&self) -> Result<CommandOutput> {
        let repo_url = non_blank(self.remote.repo_url.as_deref())
            .ok_or_else(|| WorkbenchError::config("repository URL is not configured"))?;
        let token = non_blank(self.remote.token.as_deref())
            .ok_or_else(|| WorkbenchError::config("git access token is not configured"))?;

        let url = authenticated_url(repo_url, token)?;
        info!(remote = %self.remote.remote, "Setting remote URL from configured credentials");
        self.run(&["remote", "set-url", self.remote.remote.as_str(), url.as_str()])
            .await
    }

    pub async fn delete_branch(&self, name: &str, force: bool) -> Result<CommandOutput> {
        reject_option_like("branch name", name)?;
        let flag = if force { "-D" } else { "-d" };
        self.run(&["branch", flag, name]).await
    }

    /// `git checkout -b` then `git push -u`; the push only runs if the
    /// branch was created.
    pub async fn create_and_push_branch(
        &self,
        branch: &str,
        start_point: Option<&str>,
    ) -> Result<SequenceOutcome> {
        reject_option_like("branch name", branch)?;
        if let Some(start) = start_point {
            reject_option_like("start point", start)?;
        }
        let mut log = StepLog::default();

        let mut checkout = vec!["checkout", "-b", branch];
        checkout.extend(start_point);
        let created = self.run(&checkout).await?;
        if !log.record(format!("Create branch {}", branch), created) {
            warn!(branch, "Branch creation failed; not pushing");
            return Ok(log.abort());
        }

        let pushed = self
            .run(&["push", "-u", self.remote.remote.as_str(), branch])
            .await?;
        if !log.record(format!("Push branch {}", branch), pushed) {
            return Ok(log.abort());
        }
        Ok(log.complete())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// `https://{token}@{host}/{path}` from a repository location in any of the
/// usual forms: `https://github.com/o/r.git`, `https://user:pw@host/o/r`,
/// `github.com/o/r`, `git@github.com:o/r.git`.
pub fn authenticated_url(repo_url: &str, token: &str) -> Result<String> {
    let location = repo_url.trim();
    let (had_scheme, rest) = match location.find("://") {
        Some(idx) => (true, &location[idx + 3..]),
        None => (false, location),
    };
    let rest = match rest.find('@') {
        Some(at) if !rest[..at].contains('/') => &rest[at + 1..],
        _ => rest,
    };

    // scp-like `host:owner/repo` has no scheme and a colon before the first slash.
    let host_path = match (had_scheme, rest.find(':'), rest.find('/')) {
        (false, Some(colon), slash) if slash.map_or(true, |s| colon < s) => {
            format!("{}/{}", &rest[..colon], &rest[colon + 1..])
        }
        _ => rest.to_string(),
    };

    let candidate = format!("https://{}@{}", token, host_path.trim_start_matches('/'));
    match Url::parse(&candidate) {
        Ok(url) if url.host_str().is_some_and(|h| !h.is_empty()) => Ok(candidate),
        _ => Err(WorkbenchError::config(format!(
            "repository URL '{}' is not a usable location",
            crate::runner::redact_credentials(repo_url)
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedRunner;
    use std::fs;
    use std::path::PathBuf;
    use std::process::Command;
    use tempfile::tempdir;

    fn scripted(runner: Arc<ScriptedRunner>, remote: RemoteSettings) -> GitClient {
        GitClient::new(runner, Workspace::new("/work").unwrap(), remote)
    }

    fn git_available() -> bool {
        Command::new("git").arg("--version").output().is_ok()
    }

    fn setup_git_repo() -> std::io::Result<PathBuf> {
        let dir = tempdir()?.into_path();
        Command::new("git").current_dir(&dir).arg("init").output()?;
        Command::new("git")
            .current_dir(&dir)
            .args(["config", "user.email", "test@example.com"])
            .output()?;
        Command::new("git")
            .current_dir(&dir)
            .args(["config", "user.name", "Test User"])
            .output()?;
        fs::write(dir.join("README.md"), "Initial commit")?;
        Command::new("git")
            .current_dir(&dir)
            .args(["add", "README.md"])
            .output()?;
        Command::new("git")
            .current_dir(&dir)
            .args(["commit", "-m", "Initial commit"])
            .output()?;
        Ok(dir)
    }

    fn real_client(dir: PathBuf) -> GitClient {
        GitClient::new(
            Arc::new(crate::runner::ProcessRunner::default()),
            Workspace::new(dir).unwrap(),
            RemoteSettings::default(),
        )
    }

    #[test]
    fn test_authenticated_url_forms() {
        assert_eq!(
            authenticated_url("https://github.com/o/r.git", "tok").unwrap(),
            "https://tok@github.com/o/r.git"
        );
        assert_eq!(
            authenticated_url("https://old:pw@github.com/o/r.git", "tok").unwrap(),
            "https://tok@github.com/o/r.git"
        );
        assert_eq!(
            authenticated_url("http://github.com/o/r", "tok").unwrap(),
            "https://tok@github.com/o/r"
        );
        assert_eq!(
            authenticated_url("github.com/o/r", "tok").unwrap(),
            "https://tok@github.com/o/r"
        );
        assert_eq!(
            authenticated_url("git@github.com:o/r.git", "tok").unwrap(),
            "https://tok@github.com/o/r.git"
        );
    }

    #[test]
    fn test_authenticated_url_rejects_garbage() {
        assert!(authenticated_url("   ", "tok").is_err());
    }

    #[tokio::test]
    async fn test_set_remote_url_requires_both_credentials() {
        let runner = Arc::new(ScriptedRunner::new());
        let client = scripted(
            runner.clone(),
            RemoteSettings {
                repo_url: Some("https://github.com/o/r".into()),
                token: None,
                ..RemoteSettings::default()
            },
        );
        let result = client.set_remote_url_from_credentials().await;
        assert!(matches!(result, Err(WorkbenchError::Config(_))));

        let client = scripted(
            runner.clone(),
            RemoteSettings {
                repo_url: Some("  ".into()),
                token: Some("tok".into()),
                ..RemoteSettings::default()
            },
        );
        assert!(client.set_remote_url_from_credentials().await.is_err());
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn test_set_remote_url_runs_set_url() {
        let runner = Arc::new(ScriptedRunner::new());
        let client = scripted(
            runner.clone(),
            RemoteSettings {
                remote: "upstream".into(),
                repo_url: Some("https://github.com/o/r".into()),
                token: Some("tok".into()),
            },
        );
        client.set_remote_url_from_credentials().await.unwrap();
        assert_eq!(
            runner.calls(),
            vec!["git remote set-url upstream https://tok@github.com/o/r"]
        );
        assert_eq!(runner.dirs(), vec![PathBuf::from("/work")]);
    }

    #[tokio::test]
    async fn test_command_construction() {
        let runner = Arc::new(ScriptedRunner::new());
        let client = scripted(runner.clone(), RemoteSettings::default());
        client.add(&AddScope::All).await.unwrap();
        client
            .add(&AddScope::Paths(vec!["a.txt".into(), "dir/b.txt".into()]))
            .await
            .unwrap();
        client.push("origin", Some("main")).await.unwrap();
        client.push("origin", None).await.unwrap();
        client.log(0).await.unwrap();
        client.delete_branch("old", false).await.unwrap();
        client.delete_branch("old", true).await.unwrap();
        client
            .diff(&DiffOptions {
                staged: true,
                file: Some("src/../src/main.rs".into()),
                base: Some("main".into()),
                head: None,
            })
            .await
            .unwrap();
        assert_eq!(
            runner.calls(),
            vec![
                "git add -A",
                "git add -- a.txt dir/b.txt",
                "git push origin main",
                "git push origin",
                "git log -n 1 --oneline --decorate",
                "git branch -d old",
                "git branch -D old",
                "git diff --cached --end-of-options main -- src/main.rs",
            ]
        );
    }

    #[tokio::test]
    async fn test_option_like_revisions_and_branches_are_rejected() {
        let runner = Arc::new(ScriptedRunner::new());
        let client = scripted(runner.clone(), RemoteSettings::default());
        let options = DiffOptions {
            base: Some("--output=/tmp/elsewhere.txt".into()),
            ..DiffOptions::default()
        };
        assert!(matches!(
            client.diff(&options).await,
            Err(WorkbenchError::InvalidArgument(_))
        ));
        let options = DiffOptions {
            head: Some("-p".into()),
            ..DiffOptions::default()
        };
        assert!(client.diff(&options).await.is_err());
        assert!(client.create_and_push_branch("--orphan", None).await.is_err());
        assert!(client
            .create_and_push_branch("feature", Some("--detach"))
            .await
            .is_err());
        assert!(client.delete_branch("-r", true).await.is_err());
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn test_diff_output_option_writes_nothing_outside_workspace() {
        if !git_available() {
            println!("Skipping: git not found.");
            return;
        }
        let repo = setup_git_repo().unwrap();
        let outside = tempdir().unwrap();
        let target = outside.path().join("written.txt");
        let client = real_client(repo);
        let options = DiffOptions {
            base: Some(format!("--output={}", target.display())),
            ..DiffOptions::default()
        };
        assert!(client.diff(&options).await.is_err());
        assert!(!target.exists());
    }

    #[tokio::test]
    async fn test_diff_rejects_file_outside_workspace() {
        let runner = Arc::new(ScriptedRunner::new());
        let client = scripted(runner.clone(), RemoteSettings::default());
        let options = DiffOptions {
            file: Some("../etc/passwd".into()),
            ..DiffOptions::default()
        };
        assert!(client.diff(&options).await.is_err());
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn test_create_and_push_branch_stops_when_checkout_fails() {
        let runner = Arc::new(
            ScriptedRunner::new().fail(
                "git checkout -b",
                128,
                "fatal: a branch named 'feature' already exists",
            ),
        );
        let client = scripted(runner.clone(), RemoteSettings::default());
        let outcome = client.create_and_push_branch("feature", None).await.unwrap();
        match outcome {
            SequenceOutcome::Aborted { completed, failed } => {
                assert!(completed.is_empty());
                assert_eq!(failed.output.status, 128);
                assert!(failed.output.stderr.contains("already exists"));
            }
            other => panic!("expected abort, got {:?}", other),
        }
        assert_eq!(runner.count("git push"), 0);
    }

    #[tokio::test]
    async fn test_create_and_push_branch_from_start_point() {
        let runner = Arc::new(ScriptedRunner::new());
        let client = scripted(runner.clone(), RemoteSettings::default());
        let outcome = client
            .create_and_push_branch("feature", Some("origin/main"))
            .await
            .unwrap();
        assert!(outcome.is_success());
        assert_eq!(
            runner.calls(),
            vec![
                "git checkout -b feature origin/main",
                "git push -u origin feature",
            ]
        );
    }

    #[tokio::test]
    async fn test_real_status_clean() {
        if !git_available() {
            println!("Skipping test_real_status_clean: git not found.");
            return;
        }
        let client = real_client(setup_git_repo().expect("Failed to setup git repo"));
        let output = client.status().await.unwrap();
        assert_eq!(output.status, 0);
        assert!(output.stdout.contains("nothing to commit"));
    }

    #[tokio::test]
    async fn test_real_log_and_bad_diff() {
        if !git_available() {
            println!("Skipping test_real_log_and_bad_diff: git not found.");
            return;
        }
        let client = real_client(setup_git_repo().expect("Failed to setup git repo"));
        let log = client.log(5).await.unwrap();
        assert!(log.stdout.contains("Initial commit"));

        let diff = client
            .diff(&DiffOptions {
                base: Some("nonexistentcommit".into()),
                ..DiffOptions::default()
            })
            .await
            .unwrap();
        assert_ne!(diff.status, 0);
        assert!(diff.stderr.contains("ambiguous argument"));
    }
}
