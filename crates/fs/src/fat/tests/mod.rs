// Unit tests for the FAT ramdisk driver.
//
// Images are built in memory by `test_support::fat_image` and leaked so they live as long as a
// resident ramdisk would. `fs_ops()` falls back to the identity-mapping mock under `cfg(test)`,
// so a mapped physical address equals the address of the cluster bytes in the leaked image.

extern crate alloc;

use alloc::sync::Arc;

use mm::Vaddr;
use test_support::fat_image::FatImage;
use test_support::leak_image;
use test_support::mock::fs::MOCK_FS_OPS;
use test_support::mock::mm::MockAddressSpace;
use vfs::UserMapping;

use super::{FatFsDevice, FatHandle, RamdiskImage};

const PAGE: usize = 4096;
const UVA: usize = 0x4000_0000;

/// Mount an image without preparing it for mmap. Returns the device and the image base address.
fn mount(img: FatImage) -> (FatFsDevice, usize) {
    let mem = leak_image(img.bytes);
    let base = mem.as_ptr() as usize;
    let dev = FatFsDevice::mount(RamdiskImage::from_static(mem)).expect("mount");
    (dev, base)
}

/// Mount an image whose reserved region is followed by one more page of backing memory, and
/// report that page as usable to the platform mock. Returns the device, the image base address
/// and the reserved size.
fn mount_with_spare_page(img: FatImage) -> (FatFsDevice, usize, usize) {
    let rd_size = img.bytes.len();
    let mut bytes = img.bytes;
    bytes.resize(rd_size + PAGE, 0);
    let base = leak_image(bytes).as_mut_ptr();
    // SAFETY: the leaked allocation spans rd_size + PAGE bytes and is never freed
    let image = unsafe { RamdiskImage::from_raw_parts(base, rd_size) }.expect("non-null base");
    MOCK_FS_OPS.grant_spare_page(base as usize);
    (FatFsDevice::mount(image).expect("mount"), base as usize, rd_size)
}

/// Mount and prepare an image, using the whole image as the ramdisk region.
fn prepared(img: FatImage) -> Arc<FatFsDevice> {
    let len = img.bytes.len();
    let (mut dev, _) = mount(img);
    let mut kspace = MockAddressSpace::new(PAGE);
    dev.prepare_for_mmap(&mut kspace, len).expect("prepare");
    Arc::new(dev)
}

fn open(dev: &Arc<FatFsDevice>, name: &str) -> Arc<FatHandle> {
    let entry = dev.lookup_root(name).expect("lookup");
    dev.open(entry)
}

fn mapping(handle: &Arc<FatHandle>, offset: usize, len: usize) -> UserMapping {
    UserMapping::new(handle.clone(), Vaddr(UVA), len, offset)
}

/// Kernel address of cluster `clu` inside the mounted image.
fn cluster_addr(dev: &FatFsDevice, clu: u32) -> usize {
    dev.cluster_data(clu).expect("cluster in image").as_ptr() as usize
}

mod fat32;
mod layout;
mod prepare;
