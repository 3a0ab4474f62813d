// workbench-server/src/server.rs

//! MCP handler: decodes tool arguments and dispatches to [`Workbench`].

use crate::schema::tool_definitions;
use rmcp::model::{
    CallToolRequestParams, CallToolResult, Content, Implementation, JsonObject, ListToolsResult,
    PaginatedRequestParams, ServerCapabilities, ServerInfo, Tool,
};
use rmcp::service::{RequestContext, RoleServer};
use rmcp::{ErrorData as McpError, ServerHandler};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info};
use workbench_core::{DiffOptions, PatchOptions, StartWorkRequest, ToolResponse, Workbench};

const DEFAULT_LOG_LIMIT: usize = 10;

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct NameArgs {
    name: String,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct OptionalNameArgs {
    name: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct WriteFileArgs {
    name: String,
    content: String,
    commit_message: String,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct CommitNameArgs {
    name: String,
    commit_message: String,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct CreateFolderArgs {
    name: String,
    commit_message: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct CopyFolderArgs {
    name: String,
    new_name: String,
    commit_message: String,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct SearchEntriesArgs {
    pattern: String,
    flags: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct SearchContentArgs {
    pattern: String,
    flags: Option<String>,
    path: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct ApplyPatchArgs {
    patch: String,
    #[serde(default)]
    dry_run: bool,
    #[serde(default)]
    reverse: bool,
    fuzz: Option<u32>,
    #[serde(default)]
    commit_message: String,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
struct DiffArgs {
    #[serde(default)]
    staged: bool,
    file: Option<String>,
    base: Option<String>,
    head: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct LogArgs {
    limit: Option<usize>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct StartWorkArgs {
    branch: String,
    cwd: String,
    #[serde(default)]
    legacy_peer_deps: bool,
    start_point: Option<String>,
    commit_message: String,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct InstallArgs {
    cwd: String,
    #[serde(default)]
    legacy_peer_deps: bool,
    commit_message: String,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct InstallPackageArgs {
    cwd: String,
    name: String,
    commit_message: String,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct BuildArgs {
    cwd: String,
    commit_message: String,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct ScriptArgs {
    cwd: String,
    script: String,
    commit_message: String,
}

fn decode<T: DeserializeOwned>(tool: &str, arguments: Option<JsonObject>) -> Result<T, McpError> {
    let value = serde_json::Value::Object(arguments.unwrap_or_default());
    serde_json::from_value(value)
        .map_err(|e| McpError::invalid_params(format!("Invalid arguments for '{}': {}", tool, e), None))
}

fn to_result(response: ToolResponse) -> CallToolResult {
    let content = vec![Content::text(response.text)];
    if response.is_error {
        CallToolResult::error(content)
    } else {
        CallToolResult::success(content)
    }
}

#[derive(Clone)]
pub struct WorkbenchServer {
    workbench: Arc<Workbench>,
    tools: Arc<Vec<Tool>>,
}

impl WorkbenchServer {
    pub fn new(workbench: Workbench) -> Self {
        Self {
            workbench: Arc::new(workbench),
            tools: Arc::new(tool_definitions()),
        }
    }

    pub fn tools(&self) -> &[Tool] {
        &self.tools
    }

    /// Runs one tool. Undecodable arguments and unknown names are protocol
    /// errors; everything else comes back as a [`ToolResponse`].
    pub async fn dispatch(&self, name: &str, arguments: Option<JsonObject>) -> Result<ToolResponse, McpError> {
        let wb = &self.workbench;
        let response = match name {
            "read_file" => {
                let args: NameArgs = decode(name, arguments)?;
                wb.read_file(&args.name).await
            }
            "write_file" => {
                let args: WriteFileArgs = decode(name, arguments)?;
                wb.write_file(&args.name, &args.content, &args.commit_message).await
            }
            "delete_file" => {
                let args: CommitNameArgs = decode(name, arguments)?;
                wb.delete_file(&args.name, &args.commit_message).await
            }
            "create_folder" => {
                let args: CreateFolderArgs = decode(name, arguments)?;
                wb.create_folder(&args.name, args.commit_message.as_deref()).await
            }
            "delete_folder" => {
                let args: CommitNameArgs = decode(name, arguments)?;
                wb.delete_folder(&args.name, &args.commit_message).await
            }
            "copy_folder" => {
                let args: CopyFolderArgs = decode(name, arguments)?;
                wb.copy_folder(&args.name, &args.new_name, &args.commit_message).await
            }
            "list_dir" => {
                let args: OptionalNameArgs = decode(name, arguments)?;
                wb.list_dir(args.name.as_deref()).await
            }
            "search_entries" => {
                let args: SearchEntriesArgs = decode(name, arguments)?;
                wb.search_entries(&args.pattern, args.flags.as_deref()).await
            }
            "search_content" => {
                let args: SearchContentArgs = decode(name, arguments)?;
                wb.search_content(&args.pattern, args.flags.as_deref(), args.path.as_deref())
                    .await
            }
            "apply_patch" => {
                let args: ApplyPatchArgs = decode(name, arguments)?;
                let options = PatchOptions {
                    dry_run: args.dry_run,
                    reverse: args.reverse,
                    fuzz: args.fuzz,
                };
                wb.apply_patch(&args.patch, options, &args.commit_message).await
            }
            "vcs_status" => wb.vcs_status().await,
            "vcs_diff" => {
                let args: DiffArgs = decode(name, arguments)?;
                wb.vcs_diff(&DiffOptions {
                    staged: args.staged,
                    file: args.file,
                    base: args.base,
                    head: args.head,
                })
                .await
            }
            "vcs_log" => {
                let args: LogArgs = decode(name, arguments)?;
                wb.vcs_log(args.limit.unwrap_or(DEFAULT_LOG_LIMIT)).await
            }
            "start_work" => {
                let args: StartWorkArgs = decode(name, arguments)?;
                wb.start_work(&StartWorkRequest {
                    branch: args.branch,
                    cwd: args.cwd,
                    legacy_peer_deps: args.legacy_peer_deps,
                    start_point: args.start_point,
                    commit_message: args.commit_message,
                })
                .await
            }
            "install_dependencies" => {
                let args: InstallArgs = decode(name, arguments)?;
                wb.install_dependencies(&args.cwd, args.legacy_peer_deps, &args.commit_message)
                    .await
            }
            "install_package" => {
                let args: InstallPackageArgs = decode(name, arguments)?;
                wb.install_package(&args.cwd, &args.name, &args.commit_message).await
            }
            "run_build" => {
                let args: BuildArgs = decode(name, arguments)?;
                wb.run_build(&args.cwd, &args.commit_message).await
            }
            "run_script" => {
                let args: ScriptArgs = decode(name, arguments)?;
                wb.run_script(&args.cwd, &args.script, &args.commit_message).await
            }
            other => {
                return Err(McpError::invalid_params(format!("Unknown tool '{}'", other), None));
            }
        };
        Ok(response)
    }
}

impl ServerHandler for WorkbenchServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: env!("CARGO_PKG_NAME").into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            instructions: Some(format!(
                "File, git and npm tools for the workspace at {}. Mutating tools commit and push their changes.",
                self.workbench.workspace().root().display()
            )),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        Ok(ListToolsResult::with_all_items(self.tools.to_vec()))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        info!(tool = %request.name, "Tool call");
        let response = self.dispatch(&request.name, request.arguments).await?;
        debug!(tool = %request.name, is_error = response.is_error, bytes = response.text.len(), "Tool finished");
        Ok(to_result(response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::tempdir;
    use workbench_core::{ProcessRunner, RemoteSettings, Workspace, WorkbenchConfig};

    fn args(value: serde_json::Value) -> Option<JsonObject> {
        match value {
            serde_json::Value::Object(map) => Some(map),
            _ => None,
        }
    }

    fn server_in(root: &std::path::Path) -> WorkbenchServer {
        let workbench = Workbench::new(
            Arc::new(ProcessRunner::default()),
            Workspace::new(root).unwrap(),
            RemoteSettings::default(),
            &WorkbenchConfig::default(),
        );
        WorkbenchServer::new(workbench)
    }

    #[test]
    fn test_camel_case_arguments_decode() {
        let decoded: ApplyPatchArgs = decode(
            "apply_patch",
            args(json!({ "patch": "--- a/x", "dryRun": true, "fuzz": 2 })),
        )
        .unwrap();
        assert!(decoded.dry_run);
        assert!(!decoded.reverse);
        assert_eq!(decoded.fuzz, Some(2));
        assert_eq!(decoded.commit_message, "");

        let start: StartWorkArgs = decode(
            "start_work",
            args(json!({ "branch": "b", "cwd": ".", "legacyPeerDeps": true, "commitMessage": "m" })),
        )
        .unwrap();
        assert!(start.legacy_peer_deps);
        assert_eq!(start.start_point, None);
    }

    #[test]
    fn test_missing_required_argument_is_invalid_params() {
        let result: Result<WriteFileArgs, _> = decode("write_file", args(json!({ "name": "a.txt" })));
        let err = result.unwrap_err();
        assert!(err.message.contains("write_file"));
        assert!(err.message.contains("content"));
    }

    #[test]
    fn test_optional_arguments_may_be_absent() {
        let list: OptionalNameArgs = decode("list_dir", None).unwrap();
        assert!(list.name.is_none());
        let diff: DiffArgs = decode("vcs_diff", None).unwrap();
        assert!(!diff.staged);
    }

    #[test]
    fn test_every_tool_has_an_object_schema() {
        let dir = tempdir().unwrap();
        let server = server_in(dir.path());
        let names: Vec<&str> = server.tools().iter().map(|t| t.name.as_ref()).collect();
        assert_eq!(names.len(), 18);
        for expected in ["read_file", "apply_patch", "start_work", "run_script", "vcs_log"] {
            assert!(names.contains(&expected), "missing {}", expected);
        }
        for tool in server.tools() {
            assert_eq!(tool.input_schema.get("type"), Some(&json!("object")));
        }
    }

    #[tokio::test]
    async fn test_dispatch_unknown_tool() {
        let dir = tempdir().unwrap();
        let server = server_in(dir.path());
        assert!(server.dispatch("rm_rf", None).await.is_err());
    }

    #[tokio::test]
    async fn test_dispatch_read_and_list() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("hello.txt"), "hi there").unwrap();
        let server = server_in(dir.path());

        let read = server
            .dispatch("read_file", args(json!({ "name": "hello.txt" })))
            .await
            .unwrap();
        assert_eq!(read, ToolResponse::success("hi there"));

        let escaped = server
            .dispatch("read_file", args(json!({ "name": "../../etc/hostname" })))
            .await
            .unwrap();
        assert!(escaped.is_error);

        let listing = server.dispatch("list_dir", None).await.unwrap();
        assert_eq!(listing.text, "hello.txt");
    }

    #[test]
    fn test_error_flag_maps_to_call_result() {
        let result = to_result(ToolResponse::error("boom"));
        assert_eq!(result.is_error, Some(true));
        let result = to_result(ToolResponse::success("ok"));
        assert_eq!(result.is_error, Some(false));
    }
}
