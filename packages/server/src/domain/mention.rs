//! Textual mention matching for personal notifications.

use regex::{Regex, RegexBuilder};

use super::entity::User;

/// Case-insensitive matcher for `@username`, `@display name` and configured aliases.
#[derive(Debug, Clone)]
pub struct MentionMatcher {
    pattern: Regex,
}

impl MentionMatcher {
    pub fn new(user: &User, aliases: &[String]) -> Result<Self, regex::Error> {
        let mut names: Vec<String> = vec![regex::escape(&user.username)];
        let display = user.display_name.trim();
        if !display.is_empty() && display != user.username {
            names.push(regex::escape(display));
        }
        names.extend(
            aliases
                .iter()
                .map(|alias| alias.trim())
                .filter(|alias| !alias.is_empty())
                .map(regex::escape),
        );

        let pattern = RegexBuilder::new(&format!(r"(?:^|\W)@(?:{})(?:$|\W)", names.join("|")))
            .case_insensitive(true)
            .build()?;
        Ok(Self { pattern })
    }

    pub fn matches(&self, content: &str) -> bool {
        self.pattern.is_match(content)
    }
}
