use super::super::MmapError;
use super::*;
use test_support::fat_image::FatImageBuilder;
use vfs::VfsMmFlags;

#[test]
fn test_prepare_aligned_image() {
    let img = FatImageBuilder::new(4096, 16)
        .aligned_to(4096)
        .file("a.bin", 4096)
        .build();
    let before = img.bytes.clone();
    let len = before.len();
    let (mut dev, base) = mount(img);
    let mut kspace = MockAddressSpace::new(PAGE);

    assert_eq!(dev.prepare_for_mmap(&mut kspace, len), Ok(()));

    assert!(dev.mmap_supported());
    assert_eq!(dev.image().as_bytes(), &before[..]);
    assert_eq!(kspace.retained, alloc::vec![(Vaddr(base), len)]);
    assert!(kspace.writable_log.is_empty());
}

#[test]
fn test_prepare_rejects_small_clusters() {
    let img = FatImageBuilder::new(512, 64).file("a.bin", 512).build();
    let len = img.bytes.len();
    let (mut dev, _) = mount(img);
    let mut kspace = MockAddressSpace::new(PAGE);

    assert_eq!(dev.prepare_for_mmap(&mut kspace, len), Err(MmapError::Misconfiguration));
    assert!(!dev.mmap_supported());
    assert!(kspace.retained.is_empty());

    // mmap stays off for the life of the mount
    let dev = Arc::new(dev);
    let handle = open(&dev, "a.bin");
    let mut aspace = MockAddressSpace::new(PAGE);
    let um = mapping(&handle, 0, PAGE);
    assert_eq!(
        handle.map_region(&um, &mut aspace, VfsMmFlags::empty()),
        Err(MmapError::Unsupported)
    );
    assert!(aspace.map_calls.is_empty());
}

#[test]
fn test_prepare_repairs_misaligned_image_in_place() {
    let img = FatImageBuilder::new(4096, 16)
        .file("a.bin", 2 * 4096)
        .headroom(4096)
        .build();
    assert!(img.first_data_offset % PAGE != 0);
    let len = img.bytes.len();
    let (mut dev, base) = mount(img);
    let mut kspace = MockAddressSpace::new(PAGE);

    assert_eq!(dev.prepare_for_mmap(&mut kspace, len), Ok(()));
    assert!(dev.mmap_supported());
    assert!(dev.layout().is_first_data_sector_aligned(PAGE));
    assert_eq!(kspace.retained, alloc::vec![(Vaddr(base), len)]);

    // Every page was made writable for the repair and read-only again afterwards.
    let pages = len.div_ceil(PAGE);
    let (opened, closed) = kspace.writable_log.split_at(pages);
    assert!(opened.iter().all(|&(_, w)| w));
    assert!(closed.iter().all(|&(_, w)| !w));
    assert_eq!(closed.len(), pages);
    assert!(closed.iter().all(|&(va, _)| !kspace.is_writable(va)));

    let dev = Arc::new(dev);
    let entry = dev.lookup_root("A.BIN").unwrap();
    assert_eq!(entry.first_cluster(), 2);
    assert_eq!(&dev.cluster_data(3).unwrap()[0..4], &3u32.to_le_bytes());

    let handle = dev.open(entry);
    let mut aspace = MockAddressSpace::new(PAGE);
    assert_eq!(
        handle.map_region(&mapping(&handle, 0, 2 * PAGE), &mut aspace, VfsMmFlags::empty()),
        Ok(2)
    );
    assert_eq!(aspace.translate(Vaddr(UVA)).unwrap().paddr.0, cluster_addr(&dev, 2));
    assert_eq!(aspace.translate(Vaddr(UVA + PAGE)).unwrap().paddr.0, cluster_addr(&dev, 3));
}

#[test]
fn test_prepare_without_headroom_fails() {
    let img = FatImageBuilder::new(4096, 16).file("a.bin", 4096).build();
    let before = img.bytes.clone();
    let rd_size = img.used_bytes;
    let (mut dev, _) = mount(img);
    let mut kspace = MockAddressSpace::new(PAGE);

    assert_eq!(dev.prepare_for_mmap(&mut kspace, rd_size), Err(MmapError::Misconfiguration));
    assert!(!dev.mmap_supported());
    assert_eq!(dev.image().as_bytes(), &before[..]);
    assert!(kspace.writable_log.is_empty());
}

#[test]
fn test_prepare_rejects_size_beyond_region() {
    let img = FatImageBuilder::new(4096, 16).aligned_to(4096).build();
    let len = img.bytes.len();
    let (mut dev, _) = mount(img);
    let mut kspace = MockAddressSpace::new(PAGE);

    assert_eq!(dev.prepare_for_mmap(&mut kspace, len + PAGE), Err(MmapError::Misconfiguration));
    assert!(!dev.mmap_supported());
}

#[test]
fn test_prepare_aligned_image_with_spare_page() {
    let img = FatImageBuilder::new(4096, 16)
        .aligned_to(4096)
        .file("a.bin", 4096)
        .build();
    let (mut dev, base, rd_size) = mount_with_spare_page(img);
    let mut kspace = MockAddressSpace::new(PAGE);

    assert_eq!(dev.prepare_for_mmap(&mut kspace, rd_size), Ok(()));

    assert!(dev.mmap_supported());
    assert_eq!(dev.image().len(), rd_size + PAGE);
    assert_eq!(kspace.retained, alloc::vec![(Vaddr(base), rd_size + PAGE)]);
    assert!(kspace.writable_log.is_empty());
}

#[test]
fn test_spare_page_makes_full_image_repairable() {
    // The last cluster is allocated, so the reserved region has no slack of its own.
    let img = FatImageBuilder::new(4096, 16)
        .file_with_chain("last.bin", 4096, &[17])
        .build();
    assert_eq!(img.used_bytes, img.bytes.len());
    let (mut dev, _, rd_size) = mount_with_spare_page(img);
    let mut kspace = MockAddressSpace::new(PAGE);

    assert_eq!(dev.prepare_for_mmap(&mut kspace, rd_size), Ok(()));

    assert!(dev.mmap_supported());
    assert!(dev.layout().is_first_data_sector_aligned(PAGE));
    assert_eq!(kspace.writable_log.len(), 2 * (rd_size + PAGE).div_ceil(PAGE));

    let entry = dev.lookup_root("last.bin").unwrap();
    assert_eq!(entry.first_cluster(), 17);
    assert_eq!(&dev.cluster_data(17).unwrap()[0..4], &17u32.to_le_bytes());
}
