use pulldown_cmark::{html, CowStr, Event, Options, Parser};

fn markdown_options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_TASKLISTS);
    options.insert(Options::ENABLE_MATH);
    options
}

/// Renders a post body. `\(..\)` and `\[..\]` math outside code fences is
/// rewritten to `$` delimiters and typeset with KaTeX.
pub fn render_markdown_to_html(markdown: &str) -> String {
    let normalized_markdown = normalize_latex_delimiters(markdown);
    let parser = Parser::new_ext(&normalized_markdown, markdown_options()).map(|event| match event {
        Event::InlineMath(math) => Event::Html(CowStr::Boxed(render_math_html(&math, false).into_boxed_str())),
        Event::DisplayMath(math) => Event::Html(CowStr::Boxed(render_math_html(&math, true).into_boxed_str())),
        other => other,
    });

    let mut html_out = String::new();
    html::push_html(&mut html_out, parser);
    html_out
}

fn fence_marker(line: &str) -> Option<&'static str> {
    let trimmed = line.trim_start();
    if trimmed.starts_with("```") {
        Some("```")
    } else if trimmed.starts_with("~~~") {
        Some("~~~")
    } else {
        None
    }
}

fn normalize_latex_delimiters(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut prose = String::new();
    let mut open_fence: Option<&'static str> = None;

    for line in input.split_inclusive('\n') {
        match open_fence {
            Some(marker) => {
                out.push_str(line);
                if line.trim_start().starts_with(marker) {
                    open_fence = None;
                }
            }
            None => match fence_marker(line) {
                Some(marker) => {
                    out.push_str(&normalize_prose(&prose));
                    prose.clear();
                    out.push_str(line);
                    open_fence = Some(marker);
                }
                None => prose.push_str(line),
            },
        }
    }

    out.push_str(&normalize_prose(&prose));
    out
}

fn normalize_prose(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut i = 0;

    while i < input.len() {
        if let Some((open, close, display_mode)) = delimiter_at(input, i) {
            let content_start = i + open.len();
            if let Some(close_at) = input[content_start..].find(close) {
                let content_end = content_start + close_at;
                let content = &input[content_start..content_end];
                let fence = if display_mode || content.contains('\n') { "$$" } else { "$" };
                out.push_str(fence);
                out.push_str(content);
                out.push_str(fence);
                i = content_end + close.len();
                continue;
            }
        }

        match input[i..].chars().next() {
            Some(ch) => {
                out.push(ch);
                i += ch.len_utf8();
            }
            None => break,
        }
    }

    out
}

fn delimiter_at(input: &str, index: usize) -> Option<(&'static str, &'static str, bool)> {
    let tail = &input[index..];
    if tail.starts_with("\\(") {
        Some(("\\(", "\\)", false))
    } else if tail.starts_with("\\[") {
        Some(("\\[", "\\]", true))
    } else {
        None
    }
}

fn render_math_html(source: &str, display_mode: bool) -> String {
    let mut opts = katex::Opts::builder();
    opts.display_mode(display_mode);

    let rendered = match opts.build() {
        Ok(opts) => katex::render_with_opts(source, opts),
        Err(_) => return fallback_math_html(source, display_mode),
    };

    rendered.unwrap_or_else(|_| fallback_math_html(source, display_mode))
}

fn fallback_math_html(source: &str, display_mode: bool) -> String {
    let class_name = if display_mode { "math math-display" } else { "math math-inline" };
    let escaped = htmlescape::encode_minimal(source);
    format!("<span class=\"{class_name}\">{escaped}</span>")
}

#[cfg(test)]
mod tests {
    use super::{normalize_latex_delimiters, render_markdown_to_html};

    #[test]
    fn renders_plain_markdown() {
        let output = render_markdown_to_html("# Hi\n\nSome ~~old~~ *new* text.");
        assert!(output.contains("<h1>Hi</h1>"));
        assert!(output.contains("<del>old</del>"));
        assert!(output.contains("<em>new</em>"));
    }

    #[test]
    fn renders_math_with_latex_paren_and_bracket_delimiters() {
        let input = "\\(x^2\\) and \\[y^2\\]";
        let output = render_markdown_to_html(input);
        assert!(output.contains("katex"));
    }

    #[test]
    fn renders_multiline_paren_delimited_math() {
        let input = "Start \\( \\frac{2.24T}{2.08T}\n\\approx 1.077 \\) end";
        let output = render_markdown_to_html(input);
        assert!(output.contains("katex"));
    }

    #[test]
    fn leaves_fenced_code_alone() {
        let input = "before \\(a\\)\n\n```\nlet s = \"\\(b\\)\";\n```\nafter \\[c\\]\n";
        let normalized = normalize_latex_delimiters(input);
        assert!(normalized.contains("before $a$"));
        assert!(normalized.contains("let s = \"\\(b\\)\";"));
        assert!(normalized.contains("after $$c$$"));
    }

    #[test]
    fn renders_tables() {
        let output = render_markdown_to_html("| a | b |\n|---|---|\n| 1 | 2 |\n");
        assert!(output.contains("<table>"));
    }
}
