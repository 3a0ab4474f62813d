// workbench-server/src/schema.rs

use rmcp::model::Tool;
use serde_json::{json, Map, Value};
use std::sync::Arc;

fn create_schema_object(properties: Vec<(&str, Value)>, required: Vec<&str>) -> Arc<Map<String, Value>> {
    let props_map: Map<String, Value> = properties
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
    let schema = json!({
        "type": "object",
        "properties": props_map,
        "required": required,
    });
    let map = match schema {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    Arc::new(map)
}

fn string(description: &str) -> Value {
    json!({ "type": "string", "description": description })
}

fn boolean(description: &str) -> Value {
    json!({ "type": "boolean", "description": description })
}

fn commit_message() -> (&'static str, Value) {
    (
        "commitMessage",
        string("Commit message used when the change is committed and pushed."),
    )
}

fn cwd() -> (&'static str, Value) {
    ("cwd", string("Directory inside the workspace containing package.json."))
}

/// Every tool the server exposes, in a stable order.
pub fn tool_definitions() -> Vec<Tool> {
    vec![
        Tool::new(
            "read_file",
            "Read a text file from the workspace.",
            create_schema_object(vec![("name", string("Path relative to the workspace root."))], vec!["name"]),
        ),
        Tool::new(
            "write_file",
            "Write a file (creating parent folders), then commit and push that file.",
            create_schema_object(
                vec![
                    ("name", string("Path relative to the workspace root.")),
                    ("content", string("Full new content of the file.")),
                    commit_message(),
                ],
                vec!["name", "content", "commitMessage"],
            ),
        ),
        Tool::new(
            "delete_file",
            "Delete a file, then commit and push the removal.",
            create_schema_object(
                vec![("name", string("Path of the file to delete.")), commit_message()],
                vec!["name", "commitMessage"],
            ),
        ),
        Tool::new(
            "create_folder",
            "Create a folder and any missing parents. Commits only if a message is given.",
            create_schema_object(
                vec![("name", string("Path of the folder to create.")), commit_message()],
                vec!["name"],
            ),
        ),
        Tool::new(
            "delete_folder",
            "Delete a folder recursively, then commit and push the removal.",
            create_schema_object(
                vec![("name", string("Path of the folder to delete.")), commit_message()],
                vec!["name", "commitMessage"],
            ),
        ),
        Tool::new(
            "copy_folder",
            "Copy a folder recursively to a new location, then commit and push the copy.",
            create_schema_object(
                vec![
                    ("name", string("Folder to copy.")),
                    ("newName", string("Destination path; must not exist.")),
                    commit_message(),
                ],
                vec!["name", "newName", "commitMessage"],
            ),
        ),
        Tool::new(
            "list_dir",
            "List the entries of a folder. Folders end with '/'.",
            create_schema_object(
                vec![("name", string("Folder to list; defaults to the workspace root."))],
                vec![],
            ),
        ),
        Tool::new(
            "search_entries",
            "Find files and folders whose name matches a regular expression.",
            create_schema_object(
                vec![
                    ("pattern", string("Regular expression matched against entry names.")),
                    ("flags", string("Regex flags, e.g. 'i' for case-insensitive.")),
                ],
                vec!["pattern"],
            ),
        ),
        Tool::new(
            "search_content",
            "Find lines matching a regular expression. Results are 'path:line:text'.",
            create_schema_object(
                vec![
                    ("pattern", string("Regular expression matched against each line.")),
                    ("flags", string("Regex flags, e.g. 'i' for case-insensitive.")),
                    ("path", string("File or folder to search; defaults to the workspace root.")),
                ],
                vec!["pattern"],
            ),
        ),
        Tool::new(
            "apply_patch",
            "Apply a unified diff with git apply, then commit and push the touched files.",
            create_schema_object(
                vec![
                    ("patch", string("Unified diff text.")),
                    ("dryRun", boolean("Only check that the patch applies.")),
                    ("reverse", boolean("Apply the patch in reverse.")),
                    (
                        "fuzz",
                        json!({ "type": "integer", "minimum": 0, "description": "Context lines that must match (git apply -C)." }),
                    ),
                    commit_message(),
                ],
                vec!["patch"],
            ),
        ),
        Tool::new(
            "vcs_status",
            "Show git status for the workspace.",
            create_schema_object(vec![], vec![]),
        ),
        Tool::new(
            "vcs_diff",
            "Show git diff, optionally staged, for one file, or between revisions.",
            create_schema_object(
                vec![
                    ("staged", boolean("Diff the index against HEAD.")),
                    ("file", string("Limit the diff to this file.")),
                    ("base", string("Base revision.")),
                    ("head", string("Head revision.")),
                ],
                vec![],
            ),
        ),
        Tool::new(
            "vcs_log",
            "Show recent commits, one line each.",
            create_schema_object(
                vec![(
                    "limit",
                    json!({ "type": "integer", "minimum": 1, "default": 10, "description": "Number of commits." }),
                )],
                vec![],
            ),
        ),
        Tool::new(
            "start_work",
            "Authenticate the remote, pull, create and push a branch, install dependencies, then commit and push.",
            create_schema_object(
                vec![
                    ("branch", string("Name of the branch to create.")),
                    cwd(),
                    ("legacyPeerDeps", boolean("Pass --legacy-peer-deps to npm install.")),
                    ("startPoint", string("Revision to branch from; defaults to HEAD.")),
                    commit_message(),
                ],
                vec!["branch", "cwd", "commitMessage"],
            ),
        ),
        Tool::new(
            "install_dependencies",
            "Run npm install (including dev dependencies), then commit and push.",
            create_schema_object(
                vec![
                    cwd(),
                    ("legacyPeerDeps", boolean("Pass --legacy-peer-deps to npm install.")),
                    commit_message(),
                ],
                vec!["cwd", "commitMessage"],
            ),
        ),
        Tool::new(
            "install_package",
            "Install one npm package, then commit and push.",
            create_schema_object(
                vec![
                    cwd(),
                    ("name", string("Package spec, e.g. 'lodash' or 'react@18'.")),
                    commit_message(),
                ],
                vec!["cwd", "name", "commitMessage"],
            ),
        ),
        Tool::new(
            "run_build",
            "Run 'npm run build', then commit and push.",
            create_schema_object(vec![cwd(), commit_message()], vec!["cwd", "commitMessage"]),
        ),
        Tool::new(
            "run_script",
            "Run an npm script, then commit and push.",
            create_schema_object(
                vec![cwd(), ("script", string("Script name from package.json.")), commit_message()],
                vec!["cwd", "script", "commitMessage"],
            ),
        ),
    ]
}
