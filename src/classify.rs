//! Image classification: duplicate grouping and small/regular partitioning.
//!
//! Both passes work on [`ImageRecord`] metadata only. No pixel data is
//! decoded; "similar" means the dimensions, encoded size and format agree
//! closely enough that the images are very likely the same picture
//! re-encoded or re-embedded.
//!
//! ## Grouping rules
//!
//! Images are visited in extraction order. An image whose content hash was
//! already accepted joins that hash's group as an exact duplicate. Otherwise
//! the accepted unique images are scanned in order and the first one that
//! [`are_similar`] accepts becomes its group's representative. The scan
//! stops at the first match, so grouping depends on encounter order and is
//! not transitive: `a ~ b` and `b ~ c` does not put `a` and `c` together
//! unless the scan happens to visit them that way.
//!
//! Slots without a file name (extraction failed) are skipped by both passes.

use crate::output::{ImageIndex, ImageRecord};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Default minimum edge, in pixels, of a "regular" image.
pub const DEFAULT_MIN_IMAGE_SIZE: u32 = 256;

/// Largest relative width/height difference still considered similar.
pub const DIMENSION_TOLERANCE: f64 = 0.05;

/// Largest relative encoded-size difference still considered similar.
pub const SIZE_TOLERANCE: f64 = 0.10;

/// How a member ended up in its [`DuplicateGroup`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchKind {
    /// The representative: first image of the group in encounter order.
    Original,
    /// Same content hash as the representative.
    Exact,
    /// Different hash, accepted by [`are_similar`].
    Similar,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupMember {
    pub image: ImageRecord,
    pub kind: MatchKind,
}

/// A representative image and everything grouped with it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateGroup {
    /// Content hash of the representative.
    pub hash: String,
    /// Representative first, then members in encounter order.
    pub members: Vec<GroupMember>,
}

impl DuplicateGroup {
    fn seeded(hash: String, original: ImageRecord) -> Self {
        Self {
            hash,
            members: vec![GroupMember {
                image: original,
                kind: MatchKind::Original,
            }],
        }
    }

    pub fn representative(&self) -> &ImageRecord {
        &self.members[0].image
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, image: &ImageRecord) -> bool {
        self.members.iter().any(|m| m.image.key() == image.key())
    }
}

/// Where an image landed in the duplicate pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateStatus {
    /// Extraction failed; not classified.
    Failed,
    /// Unique and not the representative of any group.
    Unique,
    /// Member of a group with `group_len` images.
    Grouped { kind: MatchKind, group_len: usize },
}

/// Output of [`classify_duplicates`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DuplicateClassification {
    /// Every input record in input order, named ones carrying a content hash.
    pub images: Vec<ImageRecord>,
    /// Images neither exact duplicates nor similar to an earlier image.
    pub unique: Vec<ImageRecord>,
    /// Groups in the order they were created.
    pub groups: Vec<DuplicateGroup>,
}

impl DuplicateClassification {
    /// Group keyed by a representative hash.
    pub fn group(&self, hash: &str) -> Option<&DuplicateGroup> {
        self.groups.iter().find(|g| g.hash == hash)
    }

    /// Group containing `image`, if any.
    pub fn group_of(&self, image: &ImageRecord) -> Option<&DuplicateGroup> {
        self.groups.iter().find(|g| g.contains(image))
    }

    /// Grouped images that are not representatives.
    pub fn duplicate_count(&self) -> usize {
        self.groups.iter().map(|g| g.len() - 1).sum()
    }

    /// Key of the unique image standing for `image`: its group's
    /// representative when grouped, the image itself otherwise.
    pub fn representative_key(&self, image: &ImageRecord) -> Option<(usize, ImageIndex)> {
        if !image.is_extracted() {
            return None;
        }
        Some(
            self.group_of(image)
                .map_or_else(|| image.key(), |g| g.representative().key()),
        )
    }

    pub fn status_of(&self, image: &ImageRecord) -> DuplicateStatus {
        if !image.is_extracted() {
            return DuplicateStatus::Failed;
        }
        for group in &self.groups {
            if let Some(member) = group.members.iter().find(|m| m.image.key() == image.key()) {
                return DuplicateStatus::Grouped {
                    kind: member.kind,
                    group_len: group.len(),
                };
            }
        }
        DuplicateStatus::Unique
    }
}

/// Output of [`classify_by_size`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SizeClassification {
    /// Area below `min_size²`: icons, bullets, decorations.
    pub small: Vec<ImageRecord>,
    pub regular: Vec<ImageRecord>,
    pub min_size: u32,
}

/// Both passes over the same image list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub duplicates: DuplicateClassification,
    pub sizes: SizeClassification,
}

impl Classification {
    /// Enriched copy of the input records.
    pub fn images(&self) -> &[ImageRecord] {
        &self.duplicates.images
    }

    pub fn is_small(&self, image: &ImageRecord) -> bool {
        self.sizes.small.iter().any(|s| s.key() == image.key())
    }
}

/// Run the duplicate and size passes.
///
/// The size pass sees the hash-enriched records, so `small` and `regular`
/// carry the same hashes as the duplicate output.
pub fn classify(images: Vec<ImageRecord>, min_size: u32) -> Classification {
    let duplicates = classify_duplicates(images);
    let sizes = classify_by_size(&duplicates.images, min_size);
    Classification { duplicates, sizes }
}

/// Stand-in hash for records the extractor did not hash.
///
/// Built from the file name and byte size only, so two records sharing both
/// always collide. Not meant to be meaningful outside one document.
pub fn synthesize_hash(filename: &str, size_bytes: u64) -> String {
    blake3::hash(format!("{filename}{size_bytes}").as_bytes())
        .to_hex()
        .to_string()
}

/// Group exact duplicates and similar images.
pub fn classify_duplicates(images: Vec<ImageRecord>) -> DuplicateClassification {
    let mut enriched = Vec::with_capacity(images.len());
    let mut unique: Vec<ImageRecord> = Vec::new();
    let mut groups: Vec<DuplicateGroup> = Vec::new();
    // hash of an accepted unique -> its position in `unique`
    let mut seen: HashMap<String, usize> = HashMap::new();
    // representative hash -> position in `groups`
    let mut group_index: HashMap<String, usize> = HashMap::new();

    for mut img in images {
        if !img.is_extracted() {
            enriched.push(img);
            continue;
        }
        if img.content_hash.is_none() {
            let filename = img.filename.as_deref().unwrap_or_default();
            img.content_hash = Some(synthesize_hash(filename, img.size_bytes));
        }
        let hash = img.content_hash.clone().unwrap_or_default();

        let matched = match seen.get(&hash) {
            Some(&original) => Some((original, MatchKind::Exact)),
            None => unique
                .iter()
                .position(|u| are_similar(&img, u))
                .map(|original| (original, MatchKind::Similar)),
        };
        match matched {
            Some((original, kind)) => {
                add_to_group(&mut groups, &mut group_index, &unique[original], img.clone(), kind);
            }
            None => {
                seen.insert(hash, unique.len());
                unique.push(img.clone());
            }
        }
        enriched.push(img);
    }

    DuplicateClassification {
        images: enriched,
        unique,
        groups,
    }
}

fn add_to_group(
    groups: &mut Vec<DuplicateGroup>,
    group_index: &mut HashMap<String, usize>,
    original: &ImageRecord,
    member: ImageRecord,
    kind: MatchKind,
) {
    let key = original.content_hash.clone().unwrap_or_default();
    let slot = *group_index.entry(key.clone()).or_insert_with(|| {
        groups.push(DuplicateGroup::seeded(key, original.clone()));
        groups.len() - 1
    });
    groups[slot].members.push(GroupMember { image: member, kind });
}

/// Metadata similarity heuristic.
///
/// Unknown (zero) dimensions make two images dissimilar; an unknown byte
/// size only skips the size check.
pub fn are_similar(a: &ImageRecord, b: &ImageRecord) -> bool {
    if a.width == 0 || a.height == 0 || b.width == 0 || b.height == 0 {
        return false;
    }
    if relative_diff(u64::from(a.width), u64::from(b.width)) > DIMENSION_TOLERANCE
        || relative_diff(u64::from(a.height), u64::from(b.height)) > DIMENSION_TOLERANCE
    {
        return false;
    }
    if a.size_bytes > 0
        && b.size_bytes > 0
        && relative_diff(a.size_bytes, b.size_bytes) > SIZE_TOLERANCE
    {
        return false;
    }
    a.format == b.format
}

/// `|x - y| / max(x, y)`; callers guarantee at least one side is nonzero.
fn relative_diff(x: u64, y: u64) -> f64 {
    x.abs_diff(y) as f64 / x.max(y) as f64
}

/// Split named images into small and regular by pixel area.
///
/// `width * height < min_size²` is small; an area exactly at the threshold
/// is regular. Input order is kept within each side.
pub fn classify_by_size(images: &[ImageRecord], min_size: u32) -> SizeClassification {
    let min_area = u64::from(min_size) * u64::from(min_size);
    let (small, regular) = images
        .iter()
        .filter(|img| img.is_extracted())
        .cloned()
        .partition(|img| img.area() < min_area);
    SizeClassification {
        small,
        regular,
        min_size,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn img(name: &str, w: u32, h: u32, size: u64, format: &str) -> ImageRecord {
        ImageRecord::new(name, 1, 0, w, h, size, format)
    }

    #[test]
    fn zero_dimension_is_never_similar() {
        let a = img("a.png", 0, 100, 10, "png");
        let b = img("b.png", 0, 100, 10, "png");
        assert!(!are_similar(&a, &b));
        let c = img("c.png", 100, 100, 10, "png");
        let d = img("d.png", 100, 0, 10, "png");
        assert!(!are_similar(&c, &d));
    }

    #[test]
    fn dimension_tolerance_is_inclusive() {
        // 5 / 100 is exactly the tolerance
        let a = img("a.png", 95, 100, 0, "png");
        let b = img("b.png", 100, 100, 0, "png");
        assert!(are_similar(&a, &b));
    }

    #[test]
    fn unknown_size_skips_size_check() {
        let a = img("a.png", 100, 100, 0, "png");
        let b = img("b.png", 100, 100, 999_999, "png");
        assert!(are_similar(&a, &b));
    }

    #[test]
    fn size_outside_tolerance_is_dissimilar() {
        let a = img("a.png", 100, 100, 1000, "png");
        let b = img("b.png", 100, 100, 1200, "png");
        assert!(!are_similar(&a, &b));
    }

    #[test]
    fn format_compared_as_stored() {
        let a = img("a.png", 100, 100, 1000, "png");
        let b = img("b.png", 100, 100, 1000, "PNG");
        assert!(!are_similar(&a, &b));
    }

    #[test]
    fn synthesized_hash_depends_on_name_and_size() {
        assert_eq!(synthesize_hash("a.png", 10), synthesize_hash("a.png", 10));
        assert_ne!(synthesize_hash("a.png", 10), synthesize_hash("a.png", 11));
        assert_ne!(synthesize_hash("a.png", 10), synthesize_hash("b.png", 10));
    }

    #[test]
    fn given_hash_is_kept() {
        let out = classify_duplicates(vec![img("a.png", 1, 1, 1, "png").with_content_hash("h1")]);
        assert_eq!(out.images[0].content_hash.as_deref(), Some("h1"));
    }

    #[test]
    fn failed_slot_keeps_no_hash() {
        let out = classify_duplicates(vec![ImageRecord::failed(1, 0, "boom")]);
        assert_eq!(out.images.len(), 1);
        assert_eq!(out.images[0].content_hash, None);
        assert!(out.unique.is_empty());
        assert!(out.groups.is_empty());
    }

    #[test]
    fn exact_duplicate_after_similar_joins_same_group() {
        let a = img("a.png", 100, 100, 1000, "png").with_content_hash("ha");
        let b = img("b.png", 100, 100, 1010, "png").with_content_hash("hb");
        let c = img("c.png", 100, 100, 1000, "png").with_content_hash("ha");
        let out = classify_duplicates(vec![a, b, c]);
        assert_eq!(out.unique.len(), 1);
        assert_eq!(out.groups.len(), 1);
        let kinds: Vec<MatchKind> = out.groups[0].members.iter().map(|m| m.kind).collect();
        assert_eq!(
            kinds,
            vec![MatchKind::Original, MatchKind::Similar, MatchKind::Exact]
        );
    }

    #[test]
    fn first_match_wins() {
        // b is similar to both a and c but only a is accepted before it
        let a = img("a.png", 100, 100, 0, "png").with_content_hash("ha");
        let c = img("c.png", 200, 200, 0, "png").with_content_hash("hc");
        let b = img("b.png", 100, 100, 0, "png").with_content_hash("hb");
        let out = classify_duplicates(vec![a, c, b]);
        assert_eq!(out.groups.len(), 1);
        assert_eq!(out.groups[0].hash, "ha");
        assert_eq!(out.unique.len(), 2);
    }

    #[test]
    fn status_lookup() {
        let a = img("a.png", 100, 100, 1000, "png").with_content_hash("ha");
        let mut b = img("b.png", 100, 100, 1000, "png").with_content_hash("ha");
        b.index = crate::output::ImageIndex::Ordinal(1);
        let mut c = img("c.png", 30, 30, 10, "png");
        c.index = crate::output::ImageIndex::Ordinal(2);
        let out = classify_duplicates(vec![a.clone(), b.clone(), c.clone()]);
        assert_eq!(
            out.status_of(&a),
            DuplicateStatus::Grouped { kind: MatchKind::Original, group_len: 2 }
        );
        assert_eq!(
            out.status_of(&b),
            DuplicateStatus::Grouped { kind: MatchKind::Exact, group_len: 2 }
        );
        assert_eq!(out.status_of(&c), DuplicateStatus::Unique);
        assert_eq!(out.status_of(&ImageRecord::failed(1, 9, "x")), DuplicateStatus::Failed);
        assert_eq!(out.duplicate_count(), 1);
        assert_eq!(out.representative_key(&b), Some(a.key()));
        assert_eq!(out.representative_key(&c), Some(c.key()));
        assert_eq!(out.representative_key(&ImageRecord::failed(1, 9, "x")), None);
    }

    #[test]
    fn size_partition_skips_failed_slots() {
        let out = classify_by_size(
            &[img("a.png", 300, 300, 1, "png"), ImageRecord::failed(1, 1, "x")],
            DEFAULT_MIN_IMAGE_SIZE,
        );
        assert_eq!(out.regular.len(), 1);
        assert!(out.small.is_empty());
        assert_eq!(out.min_size, DEFAULT_MIN_IMAGE_SIZE);
    }

    #[test]
    fn classify_shares_hashes_between_passes() {
        let out = classify(vec![img("a.png", 10, 10, 5, "png")], 256);
        assert_eq!(out.sizes.small[0].content_hash, out.images()[0].content_hash);
        assert!(out.is_small(&out.images()[0]));
    }
}
