//! JSON sidecars written next to the HTML report.

use crate::output::{ExtractedDocument, ImageDescription, ImageRecord};
use crate::report::{Badge, ReportContext};
use crate::stats::{count_words, estimate_tokens, ImageStats};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Serialize)]
struct DataSidecar<'a> {
    #[serde(flatten)]
    document: &'a ExtractedDocument,
    image_stats: ImageStats,
    descriptions: &'a [ImageDescription],
}

/// `<stem>_data.json`: the extracted document plus image statistics and
/// descriptions.
pub fn data_json(
    document: &ExtractedDocument,
    descriptions: &[ImageDescription],
) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&DataSidecar {
        document,
        image_stats: ImageStats::from_images(&document.images),
        descriptions,
    })
}

/// One page as the report's loader consumes it.
#[derive(Debug, Serialize)]
pub struct PageEntry<'a> {
    pub page_number: usize,
    pub text: &'a str,
    pub word_count: usize,
    pub token_count: usize,
    pub images: Vec<PageImage<'a>>,
    pub screenshot: Option<&'a str>,
}

/// An image record annotated with what the report shows on its card.
#[derive(Debug, Serialize)]
pub struct PageImage<'a> {
    #[serde(flatten)]
    pub image: &'a ImageRecord,
    pub small: bool,
    pub badge: Option<String>,
    pub badge_class: Option<&'static str>,
    pub description: Option<&'a str>,
}

/// Build the per-page entries, keyed by page number.
///
/// Keys are numbers so the map serialises in page order.
pub fn page_entries<'a>(ctx: &ReportContext<'a>) -> BTreeMap<usize, PageEntry<'a>> {
    ctx.document
        .pages
        .iter()
        .map(|page| {
            let images = ctx
                .page_images(page.page_number)
                .into_iter()
                .map(|image| {
                    let badge = ctx.badge(image);
                    PageImage {
                        image,
                        small: ctx.is_small(image),
                        badge: badge.map(|b| b.to_string()),
                        badge_class: badge.as_ref().map(Badge::css_class),
                        description: ctx.description(image).map(|d| d.text.as_str()),
                    }
                })
                .collect();
            let entry = PageEntry {
                page_number: page.page_number,
                text: &page.text,
                word_count: count_words(&page.text),
                token_count: estimate_tokens(&page.text),
                images,
                screenshot: page.screenshot.as_deref(),
            };
            (page.page_number, entry)
        })
        .collect()
}

/// `<stem>_pages.json`: an object keyed by page-number strings.
pub fn pages_json(ctx: &ReportContext<'_>) -> Result<String, serde_json::Error> {
    let by_key: BTreeMap<usize, PageEntry<'_>> = page_entries(ctx);
    let keyed: serde_json::Map<String, serde_json::Value> = by_key
        .into_iter()
        .map(|(n, entry)| Ok((n.to_string(), serde_json::to_value(entry)?)))
        .collect::<Result<_, serde_json::Error>>()?;
    serde_json::to_string_pretty(&keyed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::classify;
    use crate::output::{ImageIndex, PageRecord};

    fn sample() -> (ExtractedDocument, Vec<ImageDescription>) {
        let doc = ExtractedDocument {
            filename: "deck.pdf".into(),
            page_count: 2,
            pages: vec![
                PageRecord {
                    page_number: 1,
                    text: "Quarterly results overview".into(),
                    image_count: 2,
                    screenshot: Some("page_1_screenshot.png".into()),
                    dimensions: None,
                    text_blocks: Vec::new(),
                },
                PageRecord {
                    page_number: 2,
                    text: String::new(),
                    image_count: 1,
                    screenshot: None,
                    dimensions: None,
                    text_blocks: Vec::new(),
                },
            ],
            images: vec![
                ImageRecord::new("page_001_img_000.png", 1, 0, 600, 400, 50_000, "png")
                    .with_content_hash("chart"),
                ImageRecord::failed(1, 1, "decode"),
                ImageRecord::new("page_002_img_000.png", 2, 0, 600, 400, 50_000, "png")
                    .with_content_hash("chart"),
            ],
            ..Default::default()
        };
        let descriptions = vec![ImageDescription {
            page: 1,
            index: ImageIndex::Ordinal(0),
            filename: "page_001_img_000.png".into(),
            content_hash: Some("chart".into()),
            text: "A bar chart of revenue.".into(),
            input_tokens: 10,
            output_tokens: 8,
            duration_ms: 5,
            retries: 0,
        }];
        (doc, descriptions)
    }

    #[test]
    fn pages_json_is_keyed_by_page_number() {
        let (doc, descriptions) = sample();
        let classification = classify(doc.images.clone(), 256);
        let ctx = ReportContext::new(&doc, &classification, &descriptions, 25, 2000, "deck_pages.json");

        let json: serde_json::Value = serde_json::from_str(&pages_json(&ctx).unwrap()).unwrap();
        let page1 = &json["1"];
        assert_eq!(page1["page_number"], 1);
        assert_eq!(page1["word_count"], 3);
        assert_eq!(page1["token_count"], 6);
        assert_eq!(page1["screenshot"], "page_1_screenshot.png");
        assert_eq!(page1["images"].as_array().unwrap().len(), 2);
        assert_eq!(page1["images"][0]["badge"], "DUP 2×");
        assert_eq!(page1["images"][1]["badge"], serde_json::Value::Null);
        // the copy on page 2 shows its representative's description
        assert_eq!(json["2"]["images"][0]["description"], "A bar chart of revenue.");
        assert_eq!(json["2"]["screenshot"], serde_json::Value::Null);
    }

    #[test]
    fn data_json_flattens_document() {
        let (doc, descriptions) = sample();
        let json: serde_json::Value =
            serde_json::from_str(&data_json(&doc, &descriptions).unwrap()).unwrap();
        assert_eq!(json["filename"], "deck.pdf");
        assert_eq!(json["images"].as_array().unwrap().len(), 3);
        assert_eq!(json["image_stats"]["failed_count"], 1);
        assert_eq!(json["descriptions"][0]["text"], "A bar chart of revenue.");
    }
}
