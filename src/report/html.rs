//! Self-contained HTML report.
//!
//! The first `pages_per_chunk` pages are rendered here. Later pages are
//! fetched from the pages sidecar and rendered in the browser by a script
//! that mirrors [`render_page`], so large documents open quickly.

use crate::output::{ImageRecord, PageRecord};
use crate::report::{Badge, ReportContext, IMAGES_DIR};
use crate::stats::{count_words, estimate_tokens, format_bytes, text_preview, truncate_chars};

/// Escape text for HTML element content and double-quoted attributes.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Render the complete report document.
pub fn render_report(ctx: &ReportContext<'_>) -> String {
    let doc = ctx.document;
    let title = escape(&doc.filename);
    let mut html = String::with_capacity(64 * 1024);

    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    html.push_str(&format!("<title>{title} · PDF report</title>\n"));
    html.push_str("<style>\n");
    html.push_str(STYLE);
    html.push_str("</style>\n</head>\n<body>\n");

    html.push_str(&render_header(ctx));
    html.push_str(&render_stats(ctx));
    html.push_str(&render_errors(ctx));

    html.push_str("<main id=\"pages\">\n");
    for page in doc.pages.iter().take(ctx.pages_per_chunk) {
        html.push_str(&render_page(ctx, page));
    }
    html.push_str("</main>\n");

    let remaining = doc.pages.len().saturating_sub(ctx.pages_per_chunk);
    if remaining > 0 {
        html.push_str(&format!(
            "<div id=\"load-more\"><button type=\"button\" onclick=\"loadMorePages()\">Load more pages ({remaining} remaining)</button><p id=\"load-error\" hidden></p></div>\n"
        ));
    }
    html.push_str("<footer>Generated by pdf-dissect</footer>\n");

    html.push_str("<script>\n");
    html.push_str(&format!(
        "const PAGES_JSON = \"{}\";\nconst PAGE_CHUNK = {};\nconst TEXT_LIMIT = {};\nconst MIN_SIZE = {};\nlet renderedPages = {};\n",
        escape_js(&ctx.pages_json_name),
        ctx.pages_per_chunk,
        ctx.text_preview_chars,
        ctx.classification.sizes.min_size,
        doc.pages.len().min(ctx.pages_per_chunk),
    ));
    html.push_str(SCRIPT);
    html.push_str("</script>\n</body>\n</html>\n");
    html
}

fn render_header(ctx: &ReportContext<'_>) -> String {
    let doc = ctx.document;
    let mut meta = Vec::new();
    if let Some(ref t) = doc.metadata.title {
        meta.push(format!("<span>Title: {}</span>", escape(t)));
    }
    if let Some(ref a) = doc.metadata.author {
        meta.push(format!("<span>Author: {}</span>", escape(a)));
    }
    meta.push(format!("<span>Extracted: {}</span>", escape(&doc.extracted_at)));

    format!(
        "<header>\n<h1>{}</h1>\n<p class=\"summary\">{} pages · {} unique images</p>\n<p class=\"meta\">{}</p>\n<p class=\"preview\">{}</p>\n</header>\n",
        escape(&doc.filename),
        doc.page_count,
        ctx.unique_count(),
        meta.join(" "),
        escape(&text_preview(&doc.full_text(), 280)),
    )
}

fn render_stats(ctx: &ReportContext<'_>) -> String {
    let doc = ctx.document;
    let text = doc.full_text();
    let sizes = &ctx.classification.sizes;
    let cells = [
        ("Pages", doc.pages.len().to_string()),
        ("Words", count_words(&text).to_string()),
        ("Tokens (est.)", estimate_tokens(&text).to_string()),
        ("Regular images", sizes.regular.len().to_string()),
        ("Small images", sizes.small.len().to_string()),
        ("Unique images", ctx.unique_count().to_string()),
        ("Duplicates", ctx.duplicate_count().to_string()),
        ("Min size", format!("{0}×{0}", sizes.min_size)),
    ];

    let mut html = String::from("<section class=\"stats\">\n");
    for (label, value) in cells {
        html.push_str(&format!(
            "<div class=\"stat\"><span class=\"value\">{}</span><span class=\"label\">{}</span></div>\n",
            escape(&value),
            label
        ));
    }
    html.push_str("</section>\n");
    html
}

fn render_errors(ctx: &ReportContext<'_>) -> String {
    let errors = &ctx.document.errors;
    if errors.is_empty() {
        return String::new();
    }
    let mut html = format!(
        "<details class=\"issues\">\n<summary>{} extraction issue(s)</summary>\n<ul>\n",
        errors.len()
    );
    for err in errors {
        html.push_str(&format!("<li>{}</li>\n", escape(&err.to_string())));
    }
    html.push_str("</ul>\n</details>\n");
    html
}

/// One page section: counters, screenshot, text and image cards.
pub fn render_page(ctx: &ReportContext<'_>, page: &PageRecord) -> String {
    let images = ctx.page_images(page.page_number);
    let (small, regular): (Vec<&ImageRecord>, Vec<&ImageRecord>) = images
        .iter()
        .copied()
        .filter(|img| img.is_extracted())
        .partition(|img| ctx.is_small(img));
    let failed: Vec<&ImageRecord> = images.iter().copied().filter(|i| !i.is_extracted()).collect();

    let mut html = format!(
        "<section class=\"page\" id=\"page-{n}\" data-page=\"{n}\">\n<h2><span class=\"num\">{n}</span> Page {n}\n<span class=\"counts\"><span>{} words</span><span>{} tokens</span><span>{} images</span>{}</span></h2>\n<div class=\"page-body\">\n",
        count_words(&page.text),
        estimate_tokens(&page.text),
        regular.len(),
        if small.is_empty() {
            String::new()
        } else {
            format!("<span>{} small</span>", small.len())
        },
        n = page.page_number,
    );

    html.push_str("<div class=\"shot\">\n<h3>Screenshot</h3>\n");
    match page.screenshot {
        Some(ref name) => html.push_str(&format!(
            "<figure class=\"card\" id=\"page_{n}_screenshot\"><a href=\"{dir}/{f}\" target=\"_blank\"><img src=\"{dir}/{f}\" alt=\"Screenshot of page {n}\" loading=\"lazy\"></a></figure>\n",
            n = page.page_number,
            dir = IMAGES_DIR,
            f = escape(name),
        )),
        None => html.push_str("<p class=\"empty\">No screenshot available</p>\n"),
    }
    html.push_str("</div>\n");

    let text = if page.text.trim().is_empty() {
        "No text content".to_string()
    } else {
        truncate_chars(&page.text, ctx.text_preview_chars)
    };
    html.push_str(&format!(
        "<div class=\"text\">\n<h3>Text</h3>\n<pre>{}</pre>\n</div>\n",
        escape(&text)
    ));

    html.push_str("<div class=\"images\">\n<h3>Images</h3>\n");
    if regular.is_empty() && small.is_empty() && failed.is_empty() {
        html.push_str("<p class=\"empty\">No images found on this page</p>\n");
    }
    if !regular.is_empty() {
        html.push_str("<div class=\"grid\">\n");
        for img in &regular {
            html.push_str(&render_card(ctx, img, false));
        }
        html.push_str("</div>\n");
    }
    if !small.is_empty() {
        html.push_str(&format!(
            "<details class=\"small-strip\">\n<summary>{} small images &amp; UI elements (under {m}×{m} px)</summary>\n<div class=\"grid small\">\n",
            small.len(),
            m = ctx.classification.sizes.min_size,
        ));
        for img in &small {
            html.push_str(&render_card(ctx, img, true));
        }
        html.push_str("</div>\n</details>\n");
    }
    for img in &failed {
        html.push_str(&format!(
            "<div class=\"failed\">Failed to extract image {}{}</div>\n",
            img.index,
            img.error
                .as_deref()
                .map(|e| format!(": {}", escape(e)))
                .unwrap_or_default()
        ));
    }
    html.push_str("</div>\n</div>\n</section>\n");
    html
}

fn render_card(ctx: &ReportContext<'_>, img: &ImageRecord, small: bool) -> String {
    let filename = escape(img.filename.as_deref().unwrap_or_default());
    let badge = ctx
        .badge(img)
        .map(|b: Badge| format!("<span class=\"{}\">{}</span>", b.css_class(), b))
        .unwrap_or_default();
    let details = if small {
        String::new()
    } else {
        format!(
            "<div class=\"dims\">{} × {} · {}</div>",
            img.width,
            img.height,
            format_bytes(img.size_bytes)
        )
    };
    let description = ctx
        .description(img)
        .map(|d| format!("<p class=\"ai\">{}</p>", escape(&d.text)))
        .unwrap_or_default();

    format!(
        "<figure class=\"card{cls}\" id=\"{id}\">{badge}<a href=\"{dir}/{f}\" target=\"_blank\"><img src=\"{dir}/{f}\" alt=\"Page {p} image {i}\" loading=\"lazy\"></a><figcaption><span>Image {i}</span><span class=\"fmt\">{fmt}</span>{details}{description}</figcaption></figure>\n",
        cls = if small { " small" } else { "" },
        id = img.element_id(),
        dir = IMAGES_DIR,
        f = filename,
        p = img.page,
        i = img.index,
        fmt = escape(&img.format.to_uppercase()),
    )
}

fn escape_js(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"").replace('<', "\\u003c")
}

const STYLE: &str = r#"body{font-family:system-ui,sans-serif;margin:0;background:#f5f6f8;color:#1f2328}
header,.stats,.issues,main,#load-more,footer{max-width:1200px;margin:0 auto;padding:0 16px}
header{padding-top:24px}header h1{margin:0 0 4px}
.summary{font-weight:600}.meta span{margin-right:12px;color:#57606a}.preview{color:#57606a;font-size:.9em}
.stats{display:grid;grid-template-columns:repeat(auto-fill,minmax(130px,1fr));gap:8px;margin-top:16px;margin-bottom:16px}
.stat{background:#fff;border-radius:8px;padding:12px;box-shadow:0 1px 2px #0002;display:flex;flex-direction:column}
.stat .value{font-size:1.4em;font-weight:700}.stat .label{color:#57606a;font-size:.85em}
.issues{margin-bottom:16px;color:#9a3412}
.page{background:#fff;border-radius:12px;box-shadow:0 1px 3px #0002;margin:0 0 24px;overflow:hidden}
.page h2{margin:0;padding:12px 16px;background:linear-gradient(90deg,#2563eb,#7c3aed);color:#fff;font-size:1.1em;display:flex;align-items:center;gap:8px}
.page h2 .num{background:#fff3;border-radius:50%;width:28px;height:28px;display:inline-flex;align-items:center;justify-content:center}
.counts{margin-left:auto;display:flex;gap:8px;font-size:.8em}.counts span{background:#fff3;border-radius:999px;padding:2px 8px}
.page-body{display:grid;grid-template-columns:1fr 2fr;gap:16px;padding:16px}
.text,.images{grid-column:2}.shot{grid-row:1 / span 2}
pre{white-space:pre-wrap;background:#f6f8fa;border-radius:8px;padding:12px;max-height:24em;overflow:auto;font-size:.85em}
.grid{display:grid;grid-template-columns:repeat(auto-fill,minmax(220px,1fr));gap:12px}.grid.small{grid-template-columns:repeat(auto-fill,minmax(90px,1fr))}
.card{position:relative;margin:0;border:1px solid #d0d7de;border-radius:8px;overflow:hidden;background:#fff}
.card img{width:100%;height:180px;object-fit:contain;background:#f6f8fa;display:block}.card.small img{height:70px}
.shot .card img{height:auto}
figcaption{padding:8px;font-size:.8em;display:flex;flex-wrap:wrap;justify-content:space-between;gap:4px}
.dims{width:100%;color:#57606a}.ai{width:100%;margin:6px 0 0;color:#6d28d9}
.badge{position:absolute;top:6px;left:6px;font-size:.7em;font-weight:700;padding:2px 6px;border-radius:4px;color:#fff}
.badge.unique{background:#16a34a}.badge.dup{background:#dc2626}.badge.sim{background:#d97706}
.failed{background:#fef2f2;border:1px solid #fecaca;color:#b91c1c;border-radius:8px;padding:10px;margin-top:8px}
.small-strip{margin-top:12px;background:#fefce8;border:1px solid #fde68a;border-radius:8px;padding:8px}
.empty{color:#8c959f;text-align:center}
#load-more{text-align:center;margin-bottom:24px}#load-more button{padding:10px 20px;border:0;border-radius:8px;background:#4f46e5;color:#fff;font-weight:600;cursor:pointer}
footer{color:#8c959f;font-size:.8em;padding-bottom:24px}
@media (max-width:800px){.page-body{grid-template-columns:1fr}.text,.images,.shot{grid-column:1;grid-row:auto}}
"#;

const SCRIPT: &str = r##"let pagesData = null;
function esc(s) {
  return String(s ?? "").replace(/[&<>"']/g, c => ({"&":"&amp;","<":"&lt;",">":"&gt;","\"":"&quot;","'":"&#39;"}[c]));
}
function fmtBytes(n) {
  if (!n) return "0 B";
  const u = ["B","KB","MB","GB","TB"]; let i = 0;
  while (n >= 1024 && i < u.length - 1) { n /= 1024; i++; }
  return n.toFixed(1) + " " + u[i];
}
function card(img, small) {
  const badge = img.badge ? `<span class="${img.badge_class}">${esc(img.badge)}</span>` : "";
  const dims = small ? "" : `<div class="dims">${img.width} × ${img.height} · ${fmtBytes(img.size_bytes)}</div>`;
  const ai = img.description ? `<p class="ai">${esc(img.description)}</p>` : "";
  const f = esc(img.filename);
  return `<figure class="card${small ? " small" : ""}" id="${img.page}_${img.index}">${badge}<a href="images/${f}" target="_blank"><img src="images/${f}" alt="Page ${img.page} image ${img.index}" loading="lazy"></a><figcaption><span>Image ${img.index}</span><span class="fmt">${esc(String(img.format).toUpperCase())}</span>${dims}${ai}</figcaption></figure>`;
}
function renderPage(p) {
  const ok = p.images.filter(i => i.filename);
  const regular = ok.filter(i => !i.small), small = ok.filter(i => i.small);
  const failed = p.images.filter(i => !i.filename);
  const limit = TEXT_LIMIT;
  const chars = Array.from(p.text || "");
  const text = (p.text || "").trim() ? (chars.length > limit ? chars.slice(0, limit).join("") + "..." : p.text) : "No text content";
  const n = p.page_number;
  let h = `<section class="page" id="page-${n}" data-page="${n}"><h2><span class="num">${n}</span> Page ${n}<span class="counts"><span>${p.word_count} words</span><span>${p.token_count} tokens</span><span>${regular.length} images</span>${small.length ? `<span>${small.length} small</span>` : ""}</span></h2><div class="page-body">`;
  h += `<div class="shot"><h3>Screenshot</h3>` + (p.screenshot
    ? `<figure class="card" id="page_${n}_screenshot"><a href="images/${esc(p.screenshot)}" target="_blank"><img src="images/${esc(p.screenshot)}" alt="Screenshot of page ${n}" loading="lazy"></a></figure>`
    : `<p class="empty">No screenshot available</p>`) + `</div>`;
  h += `<div class="text"><h3>Text</h3><pre>${esc(text)}</pre></div><div class="images"><h3>Images</h3>`;
  if (!ok.length && !failed.length) h += `<p class="empty">No images found on this page</p>`;
  if (regular.length) h += `<div class="grid">${regular.map(i => card(i, false)).join("")}</div>`;
  if (small.length) h += `<details class="small-strip"><summary>${small.length} small images &amp; UI elements (under ${MIN_SIZE}×${MIN_SIZE} px)</summary><div class="grid small">${small.map(i => card(i, true)).join("")}</div></details>`;
  h += failed.map(i => `<div class="failed">Failed to extract image ${i.index}${i.error ? ": " + esc(i.error) : ""}</div>`).join("");
  return h + `</div></div></section>`;
}
async function loadMorePages() {
  const errEl = document.getElementById("load-error");
  try {
    if (!pagesData) {
      const res = await fetch(PAGES_JSON);
      if (!res.ok) throw new Error("HTTP " + res.status);
      pagesData = Object.values(await res.json()).sort((a, b) => a.page_number - b.page_number);
    }
    const next = pagesData.slice(renderedPages, renderedPages + PAGE_CHUNK);
    document.getElementById("pages").insertAdjacentHTML("beforeend", next.map(renderPage).join(""));
    renderedPages += next.length;
    const left = pagesData.length - renderedPages;
    const btn = document.querySelector("#load-more button");
    if (left <= 0) { document.getElementById("load-more").innerHTML = "<p>All pages loaded</p>"; }
    else { btn.textContent = `Load more pages (${left} remaining)`; }
  } catch (e) {
    errEl.hidden = false;
    errEl.textContent = "Could not load " + PAGES_JSON + " (" + e.message + "). Browsers block fetch() on file:// pages; serve this directory over HTTP, e.g. python3 -m http.server.";
  }
}
"##;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::classify;
    use crate::output::{ExtractedDocument, ImageDescription, ImageIndex};

    fn doc_with_pages(n: usize) -> ExtractedDocument {
        ExtractedDocument {
            filename: "a<b>.pdf".into(),
            page_count: n,
            pages: (1..=n)
                .map(|p| PageRecord {
                    page_number: p,
                    text: format!("text of page {p} <script>"),
                    image_count: 0,
                    screenshot: None,
                    dimensions: None,
                    text_blocks: Vec::new(),
                })
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn escape_covers_markup() {
        assert_eq!(escape(r#"<a href="x">&'"#), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;");
    }

    #[test]
    fn document_text_is_escaped() {
        let doc = doc_with_pages(1);
        let c = classify(vec![], 256);
        let html = render_report(&ReportContext::new(&doc, &c, &[], 25, 2000, "a_pages.json"));
        assert!(html.contains("a&lt;b&gt;.pdf"));
        assert!(html.contains("text of page 1 &lt;script&gt;"));
        assert!(html.contains("const PAGES_JSON = \"a_pages.json\";"));
        assert!(html.contains("let renderedPages = 1;"));
    }

    #[test]
    fn only_first_chunk_is_inline() {
        let doc = doc_with_pages(5);
        let c = classify(vec![], 256);
        let html = render_report(&ReportContext::new(&doc, &c, &[], 2, 2000, "a_pages.json"));
        assert!(html.contains("id=\"page-2\""));
        assert!(!html.contains("id=\"page-3\""));
        assert!(html.contains("Load more pages (3 remaining)"));
        assert!(html.contains("let renderedPages = 2;"));
    }

    #[test]
    fn loaded_pages_label_small_strip_with_threshold() {
        let doc = doc_with_pages(3);
        let c = classify(vec![], 128);
        let html = render_report(&ReportContext::new(&doc, &c, &[], 1, 2000, "a_pages.json"));
        assert!(html.contains("const MIN_SIZE = 128;"));
        assert!(html.contains("small images &amp; UI elements (under ${MIN_SIZE}×${MIN_SIZE} px)"));
    }

    #[test]
    fn no_load_more_when_everything_fits() {
        let doc = doc_with_pages(2);
        let c = classify(vec![], 256);
        let html = render_report(&ReportContext::new(&doc, &c, &[], 25, 2000, "a_pages.json"));
        assert!(!html.contains("<div id=\"load-more\">"));
    }

    #[test]
    fn long_text_is_truncated() {
        let mut doc = doc_with_pages(1);
        doc.pages[0].text = "x".repeat(50);
        let c = classify(vec![], 256);
        let ctx = ReportContext::new(&doc, &c, &[], 25, 10, "a_pages.json");
        let html = render_page(&ctx, &doc.pages[0]);
        assert!(html.contains(&format!("<pre>{}...</pre>", "x".repeat(10))));
    }

    #[test]
    fn cards_carry_badges_small_strip_and_failures() {
        let mut doc = doc_with_pages(1);
        doc.images = vec![
            ImageRecord::new("page_001_img_000.png", 1, 0, 800, 600, 10_000, "png").with_content_hash("p"),
            ImageRecord::new("page_001_img_001.png", 1, 1, 800, 600, 10_000, "png").with_content_hash("p"),
            ImageRecord::new("page_001_img_002.png", 1, 2, 16, 16, 200, "png").with_content_hash("i"),
            ImageRecord::failed(1, 3, "bad filter"),
        ];
        let descriptions = vec![ImageDescription {
            page: 1,
            index: ImageIndex::Ordinal(0),
            filename: "page_001_img_000.png".into(),
            content_hash: Some("p".into()),
            text: "A team photo.".into(),
            input_tokens: 0,
            output_tokens: 0,
            duration_ms: 0,
            retries: 0,
        }];
        let c = classify(doc.images.clone(), 256);
        let ctx = ReportContext::new(&doc, &c, &descriptions, 25, 2000, "a_pages.json");
        let html = render_page(&ctx, &doc.pages[0]);

        assert_eq!(html.matches("DUP 2×").count(), 2);
        assert!(html.contains("UNIQUE"));
        assert_eq!(html.matches("A team photo.").count(), 2);
        assert!(html.contains("1 small images &amp; UI elements (under 256×256 px)"));
        assert!(html.contains("Failed to extract image 3: bad filter"));
        assert!(html.contains("<span>2 images</span>"));
    }
}
