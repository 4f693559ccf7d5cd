//! 代码文本识别模式
//!
//! 仅凭文本自身（不看祖先）判断一段文字是否"像代码"。正则表达式
//! 通过 `OnceLock` 惰性编译并缓存。误杀（跳过可翻译文本）优于
//! 错杀（翻译了标识符、数字或代码）。

use std::sync::OnceLock;

use regex::Regex;

/// 不参与翻译的元素标签
pub const SKIP_ELEMENTS: &[&str] = &[
    "script", "style", "noscript", "meta", "link", "head", "svg", "math", "canvas", "video",
    "audio", "embed", "object", "iframe", "template", "textarea",
];

/// 代码容器标签
pub const CODE_CONTAINER_TAGS: &[&str] = &["pre", "code", "kbd", "samp", "tt"];

/// 语法高亮容器的类名特征（子串匹配，小写）
pub const CODE_CLASS_HINTS: &[&str] = &[
    "highlight",
    "hljs",
    "prism",
    "codemirror",
    "cm-editor",
    "monaco",
    "syntaxhighlighter",
    "sourcecode",
    "code-block",
    "language-",
];

/// 代码相关的数据属性（行号、文件类型）
pub const CODE_DATA_ATTRS: &[&str] = &["data-line-number", "data-line", "data-file-type"];

/// 原生输入控件标签
pub const INPUT_TAGS: &[&str] = &["input", "textarea", "select"];

/// 代码文件扩展名（后缀匹配，小写）
pub const CODE_FILE_EXTENSIONS: &[&str] = &[
    ".rs", ".js", ".jsx", ".ts", ".tsx", ".mjs", ".py", ".java", ".c", ".h", ".cc", ".cpp",
    ".hpp", ".cs", ".go", ".rb", ".php", ".swift", ".kt", ".scala", ".hs", ".lua", ".pl", ".sh",
    ".bash", ".zsh", ".bat", ".ps1", ".sql", ".json", ".yaml", ".yml", ".toml", ".ini", ".cfg",
    ".xml", ".html", ".htm", ".css", ".scss", ".less", ".vue", ".svelte", ".md", ".lock",
    ".dockerfile", ".makefile",
];

/// 编程语言名称（整词匹配，不区分大小写）
pub const LANGUAGE_NAMES: &[&str] = &[
    "javascript",
    "typescript",
    "python",
    "java",
    "rust",
    "golang",
    "go",
    "ruby",
    "php",
    "swift",
    "kotlin",
    "scala",
    "haskell",
    "erlang",
    "elixir",
    "clojure",
    "perl",
    "lua",
    "dart",
    "html",
    "css",
    "scss",
    "sass",
    "sql",
    "graphql",
    "bash",
    "shell",
    "powershell",
    "json",
    "yaml",
    "toml",
    "xml",
    "markdown",
    "c++",
    "c#",
    "objective-c",
    "assembly",
    "webassembly",
    "wasm",
];

fn number_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // 纯数字、千分位、小数、科学计数法，可带正负号与百分号
        Regex::new(r"^[+-]?\d[\d,_]*(\.\d+)?([eE][+-]?\d+)?%?$").unwrap()
    })
}

fn assignment_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$.]*\s*[:=]").unwrap())
}

fn config_pair_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"^[\w.-]+\s*:\s*["'].*["'],?$"#).unwrap())
}

fn markup_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^</?[A-Za-z][^<>]*/?>").unwrap())
}

fn keyword_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // 仅收录不会出现在日常英文句首的小写代码关键字
        Regex::new(
            r"(?x)^(?:
                (?:function|const|var|enum|struct|elif|lambda|typeof|instanceof|namespace)\b
                |(?:return|import|export|impl|trait|fn|pub|def|async|await|yield
                   |public|private|protected|static|void)\s
                |template<
            )",
        )
        .unwrap()
    })
}

/// 判断文本是否像代码/不可翻译字面量；命中时返回原因（用于调试日志）
pub fn code_reason(text: &str) -> Option<&'static str> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Some("blank");
    }

    // 纯标点/符号（不含任何字母数字）
    if !trimmed.chars().any(|c| c.is_alphanumeric()) {
        return Some("punctuation");
    }

    if number_regex().is_match(trimmed) {
        return Some("numeric");
    }

    // diff 标记与 shell 提示符
    if trimmed.starts_with("+ ")
        || trimmed.starts_with("- ")
        || trimmed.starts_with("@@")
        || trimmed.starts_with("$ ")
    {
        return Some("diff-or-shell");
    }

    if trimmed.starts_with("<!--") || markup_regex().is_match(trimmed) {
        return Some("markup");
    }

    if keyword_regex().is_match(trimmed) {
        return Some("keyword");
    }

    if config_pair_regex().is_match(trimmed) {
        return Some("config-pair");
    }

    if assignment_regex().is_match(trimmed) {
        return Some("assignment");
    }

    if is_code_file_name(trimmed) {
        return Some("file-name");
    }

    if is_language_name(trimmed) {
        return Some("language-name");
    }

    if is_copyright_notice(trimmed) {
        return Some("copyright");
    }

    None
}

/// 是否为代码文件名（单个词 + 已知扩展名）
pub fn is_code_file_name(text: &str) -> bool {
    if text.contains(char::is_whitespace) {
        return false;
    }
    let lower = text.to_lowercase();
    CODE_FILE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

/// 是否为编程语言名称（精确匹配）
pub fn is_language_name(text: &str) -> bool {
    LANGUAGE_NAMES
        .iter()
        .any(|name| text.eq_ignore_ascii_case(name))
}

/// 是否为版权声明
pub fn is_copyright_notice(text: &str) -> bool {
    let lower = text.to_lowercase();
    text.contains('©') || lower.contains("(c)") || lower.contains("copyright")
}

/// 内联样式是否声明了等宽字体
pub fn style_declares_monospace(style: &str) -> bool {
    let lower = style.to_lowercase();
    lower.contains("monospace") || lower.contains("mono ") || lower.contains("courier")
}

/// 内联样式是否隐藏了元素
pub fn style_hides_element(style: &str) -> bool {
    let normalized: String = style
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    normalized.contains("display:none") || normalized.contains("visibility:hidden")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numbers_always_rejected() {
        for text in ["42", "42.5%", "3.14e10", "-7", "+1,000", "1_000_000", "99%"] {
            assert_eq!(code_reason(text), Some("numeric"), "text: {}", text);
        }
    }

    #[test]
    fn test_code_like_text_rejected() {
        assert_eq!(code_reason("value = 42"), Some("assignment"));
        assert_eq!(code_reason("config.path: something"), Some("assignment"));
        assert_eq!(code_reason("<div class=\"x\">"), Some("markup"));
        assert_eq!(code_reason("<!-- comment -->"), Some("markup"));
        assert_eq!(code_reason("fn main() {"), Some("keyword"));
        assert_eq!(code_reason("const answer = 42;"), Some("keyword"));
        assert_eq!(code_reason("+ added a line"), Some("diff-or-shell"));
        assert_eq!(code_reason("$ cargo build"), Some("diff-or-shell"));
        assert_eq!(code_reason("retries: \"3\""), Some("config-pair"));
        assert_eq!(code_reason("---"), Some("punctuation"));
    }

    #[test]
    fn test_file_and_language_names_rejected() {
        assert_eq!(code_reason("main.rs"), Some("file-name"));
        assert_eq!(code_reason("package-lock.json"), Some("file-name"));
        assert_eq!(code_reason("Rust"), Some("language-name"));
        assert_eq!(code_reason("JavaScript"), Some("language-name"));
        // 含空格的就不是文件名了
        assert!(!is_code_file_name("see main.rs"));
    }

    #[test]
    fn test_copyright_rejected() {
        assert_eq!(code_reason("© 2024 Example Corp"), Some("copyright"));
        assert_eq!(code_reason("(c) Example Corp"), Some("copyright"));
        assert_eq!(code_reason("Copyright Example Corp"), Some("copyright"));
    }

    #[test]
    fn test_prose_accepted() {
        for text in [
            "Hello world",
            "Welcome to the documentation portal",
            "点击这里查看更多",
            "Read the 2024 report",
            "A sentence mentioning Rust the language ecosystem",
        ] {
            assert_eq!(code_reason(text), None, "text: {}", text);
        }
    }

    #[test]
    fn test_style_predicates() {
        assert!(style_hides_element("display: none"));
        assert!(style_hides_element("color:red; visibility: hidden"));
        assert!(!style_hides_element("display:block"));
        assert!(style_declares_monospace("font-family: monospace"));
        assert!(!style_declares_monospace("font-family: serif"));
    }
}
