//! Parsing of the JSON event the host writes to stdin.

use serde::Deserialize;

/// The only event that triggers validation.
pub const POST_TOOL_USE: &str = "PostToolUse";

const EDIT_TOOLS: &[&str] = &["Edit", "MultiEdit", "Write", "NotebookEdit"];

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HookInput {
    #[serde(default)]
    pub hook_event_name: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub transcript_path: Option<String>,
    #[serde(default)]
    pub cwd: Option<String>,
    #[serde(default)]
    pub tool_name: String,
    #[serde(default)]
    pub tool_input: serde_json::Value,
}

#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("no input provided")]
    Empty,
    #[error("invalid hook input: {0}")]
    Malformed(#[from] serde_json::Error),
}

impl HookInput {
    pub fn parse(data: &[u8]) -> Result<Self, InputError> {
        if data.iter().all(u8::is_ascii_whitespace) {
            return Err(InputError::Empty);
        }
        Ok(serde_json::from_slice(data)?)
    }

    pub fn is_edit_tool(&self) -> bool {
        EDIT_TOOLS.contains(&self.tool_name.as_str())
    }

    /// Edited path: `notebook_path` for notebook edits, `file_path` otherwise.
    pub fn file_path(&self) -> Option<&str> {
        let field = if self.tool_name == "NotebookEdit" {
            "notebook_path"
        } else {
            "file_path"
        };
        self.tool_input
            .get(field)
            .and_then(|v| v.as_str())
            .filter(|p| !p.is_empty())
    }

    /// The edited file, if this event should trigger validation at all.
    pub fn edited_file(&self) -> Option<&str> {
        if self.hook_event_name != POST_TOOL_USE || !self.is_edit_tool() {
            return None;
        }
        self.file_path()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_edit_event() {
        let input = HookInput::parse(
            br#"{"hook_event_name":"PostToolUse","tool_name":"Edit","session_id":"s1",
                "tool_input":{"file_path":"/p/main.go","old_string":"a","new_string":"b"}}"#,
        )
        .unwrap();

        assert!(input.is_edit_tool());
        assert_eq!(input.session_id.as_deref(), Some("s1"));
        assert_eq!(input.edited_file(), Some("/p/main.go"));
    }

    #[test]
    fn notebook_edit_uses_notebook_path() {
        let input = HookInput::parse(
            br#"{"hook_event_name":"PostToolUse","tool_name":"NotebookEdit",
                "tool_input":{"notebook_path":"/p/a.ipynb","file_path":"/p/wrong"}}"#,
        )
        .unwrap();
        assert_eq!(input.edited_file(), Some("/p/a.ipynb"));
    }

    #[test]
    fn ignores_other_events_and_tools() {
        let pre = HookInput::parse(
            br#"{"hook_event_name":"PreToolUse","tool_name":"Edit","tool_input":{"file_path":"/p/x"}}"#,
        )
        .unwrap();
        assert_eq!(pre.edited_file(), None);

        let read = HookInput::parse(
            br#"{"hook_event_name":"PostToolUse","tool_name":"Read","tool_input":{"file_path":"/p/x"}}"#,
        )
        .unwrap();
        assert_eq!(read.edited_file(), None);
    }

    #[test]
    fn missing_path_is_none() {
        let input =
            HookInput::parse(br#"{"hook_event_name":"PostToolUse","tool_name":"Write"}"#).unwrap();
        assert_eq!(input.edited_file(), None);
    }

    #[test]
    fn empty_and_malformed_input() {
        assert!(matches!(HookInput::parse(b""), Err(InputError::Empty)));
        assert!(matches!(HookInput::parse(b"  \n"), Err(InputError::Empty)));
        assert!(matches!(
            HookInput::parse(b"{not json"),
            Err(InputError::Malformed(_))
        ));
    }
}
