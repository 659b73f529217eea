use htmlescape::{encode_attribute, encode_minimal};

use crate::markdown::render_markdown_to_html;
use crate::models::Post;

const SITE_NAME: &str = "Blog";

const HOT_RELOAD_SCRIPT: &str = r#"
<script>
    const socket = new WebSocket("ws://" + window.location.host + "/ws");
    socket.onmessage = (event) => {
        if (event.data === "reload") {
            window.location.reload();
        }
    };
</script>
"#;

// Empty input never reaches the API. On failure the textarea keeps its text.
const COMMENTS_SCRIPT: &str = r#"
<script>
    (() => {
        const form = document.getElementById("comment-form");
        const input = document.getElementById("comment-text");
        const list = document.getElementById("comment-list");
        const show = (comment) => {
            const item = document.createElement("li");
            item.textContent = comment.text;
            list.appendChild(item);
        };
        fetch("/api/comments")
            .then((res) => res.ok ? res.json() : [])
            .then((comments) => comments.forEach(show))
            .catch(() => {});
        form.addEventListener("submit", async (e) => {
            e.preventDefault();
            const text = input.value;
            if (!text.trim()) {
                alert("Field cannot be empty!");
                return;
            }
            try {
                const res = await fetch("/api/comments", {
                    method: "POST",
                    headers: { "Content-Type": "application/json" },
                    body: JSON.stringify({ text }),
                });
                if (!res.ok) {
                    throw new Error("status " + res.status);
                }
                show(await res.json());
                input.value = "";
            } catch (err) {
                alert("Error, couldn't save comment");
            }
        });
    })();
</script>
"#;

pub struct Page<'a> {
    pub title: &'a str,
    pub content: &'a str,
    pub posts: &'a [Post],
}

pub fn render_with_layout(layout: &str, banner: &str, page: &Page<'_>, is_development: bool) -> String {
    let mut list_items = String::new();
    for post in page.posts {
        list_items.push_str(&format!(
            "<li><a href=\"/blog/{}\" class=\"text-blue no-underline\">{}</a></li>",
            encode_attribute(&post.slug),
            encode_minimal(display_title(post)),
        ));
    }

    let title = if page.title.is_empty() {
        SITE_NAME.to_string()
    } else {
        format!("{SITE_NAME} | {}", encode_minimal(page.title))
    };

    let mut html = layout
        .replace("{{ title }}", &title)
        .replace("{{ banner }}", banner)
        .replace("{{ content }}", page.content)
        .replace("{{ posts }}", &list_items);

    if is_development {
        html = html.replace("</body>", &format!("{}</body>", HOT_RELOAD_SCRIPT));
    }

    html
}

fn display_title(post: &Post) -> &str {
    match post.frontmatter.title() {
        "" => &post.slug,
        title => title,
    }
}

/// Home page body: the rendered intro followed by one card per post.
pub fn render_home(home_html: &str, posts: &[Post]) -> String {
    let mut out = String::from(home_html);
    out.push_str("<div class=\"posts\">");
    for post in posts {
        let fm = &post.frontmatter;
        out.push_str("<div class=\"card\">");
        if !fm.cover_image().is_empty() {
            out.push_str(&format!(
                "<img src=\"{}\" alt=\"\" />",
                encode_attribute(fm.cover_image())
            ));
        }
        out.push_str(&format!(
            "<div class=\"post-date\">{} | {}</div><h3>{}</h3><p>{}</p>\
             <a href=\"/blog/{}\" class=\"btn\">Read more</a></div>",
            encode_minimal(fm.author()),
            encode_minimal(fm.date()),
            encode_minimal(display_title(post)),
            encode_minimal(fm.excerpts()),
            encode_attribute(&post.slug),
        ));
    }
    out.push_str("</div>");
    out
}

/// Post page body. `with_comments` adds the comment form and its script.
pub fn render_post(post: &Post, with_comments: bool) -> String {
    let fm = &post.frontmatter;
    let mut out = String::from("<a href=\"/\" class=\"btn btn-back\">Go Back</a><div class=\"card-page\">");
    out.push_str(&format!(
        "<h1 class=\"post-title\">{}</h1><div class=\"flex post-date\"><h3>{}</h3><p>Posted on {}</p></div>",
        encode_minimal(display_title(post)),
        encode_minimal(fm.author()),
        encode_minimal(fm.date()),
    ));
    if !fm.author_contact().is_empty() {
        out.push_str(&format!(
            "<p class=\"author-contact\">{}</p>",
            encode_minimal(fm.author_contact())
        ));
    }
    if !fm.cover_image().is_empty() {
        out.push_str(&format!(
            "<img src=\"{}\" alt=\"{}\" width=\"800\" height=\"400\" />",
            encode_attribute(fm.cover_image()),
            encode_attribute(fm.title()),
        ));
    }
    out.push_str("<div class=\"post-body\">");
    out.push_str(&render_markdown_to_html(&post.content));
    out.push_str("</div></div>");

    if with_comments {
        out.push_str(
            "<div class=\"comment\"><ul id=\"comment-list\"></ul>\
             <form id=\"comment-form\"><textarea id=\"comment-text\"></textarea>\
             <button type=\"submit\">Submit</button></form></div>",
        );
        out.push_str(COMMENTS_SCRIPT);
    }
    out
}

pub fn render_not_found(template: &str, slug: &str) -> String {
    template.replace("{{slug}}", &encode_minimal(slug))
}

/// Fills the slug in the browser from the last path segment of the request.
const NOT_FOUND_SLUG_SCRIPT: &str = r#"<script>
  (function () {
    var parts = location.pathname.split("/").filter(Boolean);
    var slug = parts.length ? decodeURIComponent(parts[parts.length - 1]) : "";
    document.querySelectorAll(".missing-slug").forEach(function (el) {
      el.textContent = slug;
    });
  })();
</script>"#;

/// Not-found page for a static host, where the requested slug is unknown
/// at build time.
pub fn render_static_not_found(template: &str) -> String {
    let mut out = template.replace("{{slug}}", "<span class=\"missing-slug\"></span>");
    out.push_str(NOT_FOUND_SLUG_SCRIPT);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content_loader::fixtures::LAYOUT;
    use crate::models::FrontMatter;
    use scraper::{Html, Selector};

    fn post(slug: &str, pairs: &[(&str, &str)], content: &str) -> Post {
        let mut frontmatter = FrontMatter::default();
        for (k, v) in pairs {
            frontmatter.insert(*k, *v);
        }
        Post {
            slug: slug.to_string(),
            frontmatter,
            content: content.to_string(),
        }
    }

    #[test]
    fn home_lists_a_card_per_post_in_order() {
        let posts = vec![
            post("b", &[("title", "Bee"), ("excerpts", "buzz")], ""),
            post("a", &[("title", "Ay")], ""),
        ];
        let html = Html::parse_fragment(&render_home("<p>intro</p>", &posts));

        let titles: Vec<_> = html
            .select(&Selector::parse(".card h3").unwrap())
            .map(|h| h.text().collect::<String>())
            .collect();
        assert_eq!(titles, vec!["Bee", "Ay"]);

        let links: Vec<_> = html
            .select(&Selector::parse(".card a.btn").unwrap())
            .filter_map(|a| a.value().attr("href"))
            .collect();
        assert_eq!(links, vec!["/blog/b", "/blog/a"]);
    }

    #[test]
    fn frontmatter_values_are_escaped() {
        let p = post("x", &[("title", "<script>alert(1)</script>")], "");
        let html = render_home("", &[p]);
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn post_page_renders_body_and_optional_comments() {
        let p = post("x", &[("title", "T"), ("date", "2022-01-05")], "# Heading");
        let with = render_post(&p, true);
        assert!(with.contains("<h1>Heading</h1>"));
        assert!(with.contains("Posted on 2022-01-05"));
        assert!(with.contains("id=\"comment-form\""));

        let without = render_post(&p, false);
        assert!(!without.contains("comment-form"));
    }

    #[test]
    fn layout_placeholders_are_filled() {
        let posts = vec![post("hello", &[], "")];
        let page = Page {
            title: "Hello",
            content: "<p>body</p>",
            posts: &posts,
        };

        let html = render_with_layout(LAYOUT, "<b>banner</b>", &page, false);
        assert!(html.contains("<title>Blog | Hello</title>"));
        assert!(html.contains("<b>banner</b>"));
        assert!(html.contains("<p>body</p>"));
        assert!(html.contains("href=\"/blog/hello\""));
        assert!(!html.contains("WebSocket"));

        let dev = render_with_layout(LAYOUT, "", &page, true);
        assert!(dev.contains("WebSocket"));
    }

    #[test]
    fn static_not_found_leaves_a_slot_for_the_slug() {
        let html = render_static_not_found("<p>No post called {{slug}}</p>");
        assert!(!html.contains("{{slug}}"));
        assert!(!html.contains("No post called </p>"));
        assert!(html.starts_with("<p>No post called <span class=\"missing-slug\"></span></p>"));
        assert!(html.contains("location.pathname"));
    }

    #[test]
    fn not_found_substitutes_escaped_slug() {
        assert_eq!(
            render_not_found("missing: {{slug}}", "<oops>"),
            "missing: &lt;oops&gt;"
        );
    }
}
