//! the fixed analysis instruction and the languages a reply may be written in.

/// languages offered by the selector, used verbatim in the prompt.
/// the first entry is the default selection.
pub const LANGUAGES: &[&str] = &[
    "English",
    "Spanish",
    "Portuguese",
    "French",
    "German",
    "Italian",
    "Japanese",
    "Chinese",
];

/// embeds `code` and `language` into the analysis template.
///
/// the code is interpolated as-is between fences; nothing is escaped.
pub fn build_prompt(code: &str, language: &str) -> String {
    format!(
        "Analyze the following code snippet. Provide a comprehensive analysis covering these points, in {language}:

1.  **Line-by-Line Explanation**: Explain the code's functionality, breaking it down line by line or in logical blocks.
2.  **Bugs and Inefficiencies**: Identify any potential bugs, logical errors, or inefficient patterns.
3.  **Optimization Suggestions**: Suggest improvements for performance and readability.
4.  **Optimized Version**: Provide an optimized version of the code with explanatory comments.

Format your response in clear, readable Markdown.

--- CODE SNIPPET ---
```
{code}
```
"
    )
}

/// index of `language` in [`LANGUAGES`], if it is one of them.
pub fn language_index(language: &str) -> Option<usize> {
    LANGUAGES.iter().position(|l| *l == language)
}

/// the language after `current`, wrapping; unknown names restart at the default.
pub fn next_language(current: &str) -> &'static str {
    match language_index(current) {
        Some(i) => LANGUAGES[(i + 1) % LANGUAGES.len()],
        None => LANGUAGES[0],
    }
}

/// the language before `current`, wrapping; unknown names restart at the default.
pub fn prev_language(current: &str) -> &'static str {
    match language_index(current) {
        Some(i) => LANGUAGES[(i + LANGUAGES.len() - 1) % LANGUAGES.len()],
        None => LANGUAGES[0],
    }
}
