//! Classification properties checked through the public API.
//!
//! No pdfium or network needed; these always run.

use pdf_dissect::{
    are_similar, classify, classify_by_size, classify_duplicates, ImageRecord, MatchKind,
};
use std::collections::BTreeSet;

fn img(name: &str, page: usize, index: usize, w: u32, h: u32, size: u64) -> ImageRecord {
    ImageRecord::new(name, page, index, w, h, size, "png")
}

fn names(images: &[ImageRecord]) -> Vec<&str> {
    images.iter().filter_map(|i| i.filename.as_deref()).collect()
}

/// Mixed document: repeated logo, near-copies, icons, a failed slot.
fn sample_document() -> Vec<ImageRecord> {
    vec![
        img("p1_logo.png", 1, 0, 400, 120, 9_000).with_content_hash("logo"),
        img("p1_photo.png", 1, 1, 800, 600, 120_000),
        img("p1_icon.png", 1, 2, 24, 24, 300),
        img("p2_logo.png", 2, 0, 400, 120, 9_000).with_content_hash("logo"),
        img("p2_photo.png", 2, 1, 810, 600, 118_000),
        ImageRecord::failed(2, 2, "unsupported filter"),
        img("p3_chart.png", 3, 0, 256, 256, 40_000),
        img("p3_bullet.png", 3, 1, 255, 256, 2_000),
        img("p3_icon.png", 3, 2, 24, 24, 300),
    ]
}

#[test]
fn test_width_boundary_five_percent_inclusive() {
    let base = img("a.png", 1, 0, 100, 100, 1_000);
    let at_limit = img("b.png", 1, 1, 105, 100, 1_000);
    let over = img("c.png", 1, 2, 106, 100, 1_000);

    assert!(are_similar(&base, &at_limit), "100 vs 105 is within 5%");
    assert!(!are_similar(&base, &over), "100 vs 106 exceeds 5%");
}

#[test]
fn test_similarity_is_symmetric() {
    let a = img("a.png", 1, 0, 100, 100, 1_000);
    let b = img("b.png", 1, 1, 104, 98, 1_090);
    assert_eq!(are_similar(&a, &b), are_similar(&b, &a));
}

#[test]
fn test_area_boundary() {
    let out = classify_by_size(
        &[img("exact.png", 1, 0, 256, 256, 1), img("under.png", 1, 1, 255, 256, 1)],
        256,
    );
    assert_eq!(names(&out.regular), vec!["exact.png"]);
    assert_eq!(names(&out.small), vec!["under.png"]);
}

#[test]
fn test_three_image_scenario() {
    let input = vec![
        img("a.png", 1, 0, 500, 500, 1_000),
        img("b.png", 1, 1, 500, 500, 1_050),
        img("c.png", 1, 2, 10, 10, 50),
    ];
    let out = classify(input, 256);

    // c matches nothing, so it stays unique alongside a
    assert_eq!(names(&out.duplicates.unique), vec!["a.png", "c.png"]);
    assert_eq!(out.duplicates.groups.len(), 1);

    let group = &out.duplicates.groups[0];
    assert_eq!(Some(group.hash.as_str()), out.images()[0].content_hash.as_deref());
    let members: Vec<(&str, MatchKind)> = group
        .members
        .iter()
        .map(|m| (m.image.filename.as_deref().unwrap_or(""), m.kind))
        .collect();
    assert_eq!(
        members,
        vec![("a.png", MatchKind::Original), ("b.png", MatchKind::Similar)]
    );

    assert_eq!(names(&out.sizes.regular), vec!["a.png", "b.png"]);
    assert_eq!(names(&out.sizes.small), vec!["c.png"]);
}

#[test]
fn test_exact_hash_groups_regardless_of_metadata() {
    let a = ImageRecord::new("a.png", 1, 0, 10, 10, 100, "png").with_content_hash("same");
    let b = ImageRecord::new("b.jpg", 4, 0, 900, 20, 77_777, "jpeg").with_content_hash("same");
    let out = classify_duplicates(vec![a, b]);

    assert_eq!(out.groups.len(), 1);
    assert_eq!(out.groups[0].members[1].kind, MatchKind::Exact);
    assert_eq!(names(&out.unique), vec!["a.png"]);
}

#[test]
fn test_hash_of_similar_member_is_not_seen() {
    // b joins a by similarity, so its hash is never accepted; c shares b's
    // hash but matches nothing by metadata and stays unique
    let a = img("a.png", 1, 0, 100, 100, 1_000).with_content_hash("ha");
    let b = img("b.png", 1, 1, 100, 100, 1_010).with_content_hash("hb");
    let c = ImageRecord::new("c.jpg", 2, 0, 500, 20, 4_000, "jpeg").with_content_hash("hb");
    let out = classify_duplicates(vec![a, b, c.clone()]);

    assert_eq!(names(&out.unique), vec!["a.png", "c.jpg"]);
    assert_eq!(out.groups.len(), 1);
    let kinds: Vec<MatchKind> = out.groups[0].members.iter().map(|m| m.kind).collect();
    assert_eq!(kinds, vec![MatchKind::Original, MatchKind::Similar]);
    assert!(out.group_of(&c).is_none());
    assert!(out.group("hb").is_none());
}

#[test]
fn test_every_named_image_appears_exactly_once() {
    let input = sample_document();
    let named: BTreeSet<_> = input.iter().filter(|i| i.is_extracted()).map(|i| i.key()).collect();
    let out = classify_duplicates(input);

    let mut seen = Vec::new();
    for u in &out.unique {
        if out.group_of(u).is_none() {
            seen.push(u.key());
        }
    }
    for g in &out.groups {
        seen.extend(g.members.iter().map(|m| m.image.key()));
    }
    let as_set: BTreeSet<_> = seen.iter().copied().collect();

    assert_eq!(seen.len(), as_set.len(), "no image listed twice");
    assert_eq!(as_set, named);
}

#[test]
fn test_sample_document_groups() {
    let out = classify(sample_document(), 256);

    // logo by hash; photo and icon by metadata, their synthesized hashes differ
    // by file name
    assert_eq!(out.duplicates.groups.len(), 3);
    assert_eq!(out.duplicates.duplicate_count(), 3);
    assert_eq!(
        names(&out.duplicates.unique),
        vec!["p1_logo.png", "p1_photo.png", "p1_icon.png", "p3_chart.png", "p3_bullet.png"]
    );
}

#[test]
fn test_failed_slot_excluded_everywhere() {
    let out = classify(sample_document(), 256);
    let failed = ImageRecord::failed(2, 2, "unsupported filter");

    assert!(!out.duplicates.unique.iter().any(|i| i.key() == failed.key()));
    assert!(out.duplicates.group_of(&failed).is_none());
    assert!(!out.sizes.small.iter().any(|i| i.key() == failed.key()));
    assert!(!out.sizes.regular.iter().any(|i| i.key() == failed.key()));
    // still present, untouched, in the enriched list
    assert_eq!(out.images().len(), 9);
    assert_eq!(out.images()[5].content_hash, None);
}

#[test]
fn test_size_partition_preserves_order() {
    let out = classify_by_size(&sample_document(), 256);
    assert_eq!(
        names(&out.regular),
        vec!["p1_logo.png", "p1_photo.png", "p2_logo.png", "p2_photo.png", "p3_chart.png"]
    );
    assert_eq!(
        names(&out.small),
        vec!["p1_icon.png", "p3_bullet.png", "p3_icon.png"]
    );
}

#[test]
fn test_size_partition_is_idempotent() {
    let input = sample_document();
    let first = classify_by_size(&input, 256);
    let second = classify_by_size(&input, 256);
    assert_eq!(first, second);

    // feeding a partition back in reproduces it
    let again = classify_by_size(&first.small, 256);
    assert_eq!(again.small, first.small);
    assert!(again.regular.is_empty());
}

#[test]
fn test_size_partition_consistent_per_page() {
    let input = sample_document();
    let whole = classify_by_size(&input, 256);

    for page in 1..=3 {
        let page_input: Vec<ImageRecord> =
            input.iter().filter(|i| i.page == page).cloned().collect();
        let per_page = classify_by_size(&page_input, 256);

        let restricted_small: Vec<ImageRecord> =
            whole.small.iter().filter(|i| i.page == page).cloned().collect();
        let restricted_regular: Vec<ImageRecord> =
            whole.regular.iter().filter(|i| i.page == page).cloned().collect();

        assert_eq!(per_page.small, restricted_small, "page {page} small");
        assert_eq!(per_page.regular, restricted_regular, "page {page} regular");
    }
}

#[test]
fn test_classification_does_not_depend_on_previous_runs() {
    let first = classify(sample_document(), 256);
    let second = classify(sample_document(), 256);
    assert_eq!(first, second);
}
