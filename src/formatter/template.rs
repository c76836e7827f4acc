use regex::{Captures, Regex};
use std::sync::LazyLock;

use crate::model::document::FormattingOptions;

static PLACEHOLDER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{(file|fileRelativeToWorkspace|insertSpaces|tabSize)\}")
        .expect("valid placeholder regex")
});

/// Values substituted into a command template.
#[derive(Debug, Clone, Copy)]
pub struct TemplateContext<'a> {
    pub file: &'a str,
    pub file_relative_to_workspace: &'a str,
    pub options: FormattingOptions,
}

/// Replace every `${file}`, `${fileRelativeToWorkspace}`, `${insertSpaces}` and
/// `${tabSize}` in `template`. Substituted values are not scanned again.
pub fn render(template: &str, ctx: &TemplateContext<'_>) -> String {
    PLACEHOLDER_RE
        .replace_all(template, |caps: &Captures<'_>| match &caps[1] {
            "file" => ctx.file.to_string(),
            "fileRelativeToWorkspace" => ctx.file_relative_to_workspace.to_string(),
            "insertSpaces" => ctx.options.insert_spaces.to_string(),
            _ => ctx.options.tab_size.to_string(),
        })
        .into_owned()
}
