use super::super::{FatLayout, FatType};
use test_support::fat_image::FatImageBuilder;

#[test]
fn test_parse_small_image_is_fat12() {
    let img = FatImageBuilder::new(4096, 16).build();
    let layout = FatLayout::parse(&img.bytes).unwrap();

    assert_eq!(layout.fat_type, FatType::Fat12);
    assert_eq!(layout.cluster_size(), 4096);
    assert_eq!(layout.cluster_count, 16);
    assert_eq!(layout.max_cluster(), 17);
    assert_eq!(layout.first_data_offset(), img.first_data_offset);
}

#[test]
fn test_parse_fat16_by_cluster_count() {
    let img = FatImageBuilder::new(512, 4100).build();
    let layout = FatLayout::parse(&img.bytes).unwrap();

    assert_eq!(layout.fat_type, FatType::Fat16);
    assert_eq!(layout.cluster_count, 4100);
}

#[test]
fn test_parse_rejects_missing_signature() {
    let mut img = FatImageBuilder::new(4096, 16).build();
    img.bytes[510] = 0;
    assert!(FatLayout::parse(&img.bytes).is_err());
}

#[test]
fn test_parse_rejects_truncated_image() {
    let img = FatImageBuilder::new(4096, 16).build();
    assert!(FatLayout::parse(&img.bytes[..1024]).is_err());
}

#[test]
fn test_cluster_range_bounds() {
    let img = FatImageBuilder::new(4096, 16).build();
    let layout = FatLayout::parse(&img.bytes).unwrap();
    let len = img.bytes.len();

    assert_eq!(layout.cluster_range(0, len), None);
    assert_eq!(layout.cluster_range(1, len), None);
    assert_eq!(layout.cluster_range(18, len), None);

    let first = layout.cluster_range(2, len).unwrap();
    assert_eq!(first.start, img.first_data_offset);
    assert_eq!(first.len(), 4096);

    let last = layout.cluster_range(17, len).unwrap();
    assert_eq!(last.end, len);

    // The last cluster no longer fits once the image is cut short.
    assert_eq!(layout.cluster_range(17, len - 1), None);
}

#[test]
fn test_alignment_check() {
    let misaligned = FatImageBuilder::new(4096, 16).build();
    let aligned = FatImageBuilder::new(4096, 16).aligned_to(4096).build();

    assert!(!FatLayout::parse(&misaligned.bytes).unwrap().is_first_data_sector_aligned(4096));
    assert!(FatLayout::parse(&aligned.bytes).unwrap().is_first_data_sector_aligned(4096));
}
