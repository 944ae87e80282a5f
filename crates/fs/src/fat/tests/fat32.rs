use super::super::{ClusterLink, FatLayout, FatType};
use super::*;
use test_support::fat_image::FatImageBuilder;
use vfs::VfsMmFlags;

/// 128 directory entries fit in a 4096-byte cluster; 127 deleted entries push `b.bin` into
/// the second root cluster.
fn two_cluster_root() -> FatImageBuilder {
    FatImageBuilder::new(4096, 16)
        .fat32(2)
        .deleted_entries(127)
        .file("a.bin", 2 * 4096)
        .file("b.bin", 4096)
}

#[test]
fn test_parse_fat32_by_bpb_shape() {
    let img = FatImageBuilder::new(4096, 16).fat32(1).build();
    let layout = FatLayout::parse(&img.bytes).unwrap();

    // Far below the FAT32 cluster-count threshold, still FAT32 on disk.
    assert_eq!(layout.fat_type, FatType::Fat32);
    assert_eq!(layout.cluster_count, 16);
    assert_eq!(layout.root_entries, 0);
    assert_eq!(layout.root_cluster, 2);
    assert_eq!(layout.first_data_offset(), img.first_data_offset);
}

#[test]
fn test_parse_rejects_fat32_root_outside_data_region() {
    let mut img = FatImageBuilder::new(4096, 16).fat32(1).build();
    img.bytes[44..48].copy_from_slice(&18u32.to_le_bytes());
    assert!(FatLayout::parse(&img.bytes).is_err());
}

#[test]
fn test_fat32_root_chain_links() {
    let (dev, _) = mount(two_cluster_root().build());

    assert_eq!(dev.next_cluster(2), ClusterLink::Next(3));
    assert_eq!(dev.next_cluster(3), ClusterLink::EndOfChain);
    assert_eq!(dev.next_cluster(4), ClusterLink::Next(5));
}

#[test]
fn test_fat32_lookup_follows_root_chain() {
    let (dev, _) = mount(two_cluster_root().build());

    let a = dev.lookup_root("a.bin").unwrap();
    assert_eq!(a.first_cluster(), 4);
    assert_eq!(a.size(), 2 * 4096);

    // Lives in the second root cluster.
    let b = dev.lookup_root("B.BIN").unwrap();
    assert_eq!(b.first_cluster(), 6);

    assert!(dev.lookup_root("none.bin").is_none());
}

#[test]
fn test_fat32_lookup_full_root_ends_at_chain_end() {
    // One root cluster with every slot in use, so there is no end-of-directory marker.
    let (dev, _) = mount(
        FatImageBuilder::new(4096, 16)
            .fat32(1)
            .deleted_entries(127)
            .file("last.bin", 4096)
            .build(),
    );

    assert_eq!(dev.lookup_root("last.bin").unwrap().first_cluster(), 3);
    assert!(dev.lookup_root("none.bin").is_none());
}

#[test]
fn test_fat32_map_contiguous_and_fragmented() {
    let dev = prepared(
        two_cluster_root()
            .aligned_to(4096)
            .file_with_chain("frag.bin", 2 * 4096, &[9, 7])
            .build(),
    );
    assert_eq!(dev.fat_type(), FatType::Fat32);

    let handle = open(&dev, "a.bin");
    let mut aspace = MockAddressSpace::new(PAGE);
    let um = mapping(&handle, 0, 2 * PAGE);
    assert_eq!(handle.map_region(&um, &mut aspace, VfsMmFlags::empty()), Ok(2));
    assert_eq!(aspace.translate(Vaddr(UVA)).unwrap().paddr.0, cluster_addr(&dev, 4));
    assert_eq!(aspace.translate(Vaddr(UVA + PAGE)).unwrap().paddr.0, cluster_addr(&dev, 5));

    let handle = open(&dev, "frag.bin");
    let mut aspace = MockAddressSpace::new(PAGE);
    let um = mapping(&handle, 0, 2 * PAGE);
    assert_eq!(handle.map_region(&um, &mut aspace, VfsMmFlags::empty()), Ok(2));
    assert_eq!(aspace.translate(Vaddr(UVA)).unwrap().paddr.0, cluster_addr(&dev, 9));
    assert_eq!(aspace.translate(Vaddr(UVA + PAGE)).unwrap().paddr.0, cluster_addr(&dev, 7));
}

#[test]
fn test_fat32_prepare_repairs_misaligned_image() {
    let img = two_cluster_root().headroom(4096).build();
    assert!(img.first_data_offset % PAGE != 0);
    let len = img.bytes.len();
    let (mut dev, _) = mount(img);
    let before = *dev.layout();
    let mut kspace = MockAddressSpace::new(PAGE);

    assert_eq!(dev.prepare_for_mmap(&mut kspace, len), Ok(()));

    let after = *dev.layout();
    assert!(after.is_first_data_sector_aligned(PAGE));
    assert_eq!(after.fat_type, FatType::Fat32);
    assert_eq!(after.cluster_count, before.cluster_count);
    assert_eq!(after.root_cluster, 2);
    assert_eq!(after.total_sectors, before.total_sectors + 5);

    // The root chain moved with the data region.
    assert_eq!(dev.lookup_root("b.bin").unwrap().first_cluster(), 6);
    assert_eq!(&dev.cluster_data(6).unwrap()[0..4], &6u32.to_le_bytes());
}
