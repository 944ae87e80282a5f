//! 内存 FAT 镜像构造器
//!
//! 生成 FAT12/FAT16 镜像（由簇数决定类型）或 FAT32 镜像（根目录位于簇链中），用于驱动的单元测试。
//! 每个被分配给文件的簇都用簇号填充：前 4 字节为小端簇号，其余字节为簇号低 8 位。

use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;

/// 簇号低于此值为 FAT12
const FAT12_MAX_CLUSTERS: u32 = 4085;
const ROOT_ENTRIES: u16 = 512;
const NUM_FATS: u8 = 2;
const ATTR_DIRECTORY: u8 = 0x10;
const ATTR_VOLUME_ID: u8 = 0x08;
const ATTR_LONG_NAME: u8 = 0x0F;
const ENTRY_DELETED: u8 = 0xE5;

struct PlannedFile {
    name: [u8; 11],
    attr: u8,
    size: u32,
    chain: Vec<u32>,
}

/// 构造好的镜像
pub struct FatImage {
    /// 镜像字节
    pub bytes: Vec<u8>,
    /// 每簇字节数
    pub cluster_size: usize,
    /// 首个数据扇区的字节偏移
    pub first_data_offset: usize,
    /// 镜像实际使用的字节数（最高已分配簇的结束位置）
    pub used_bytes: usize,
}

impl FatImage {
    /// 簇 `clu` 在镜像中的字节偏移
    pub fn cluster_offset(&self, clu: u32) -> usize {
        self.first_data_offset + (clu as usize - 2) * self.cluster_size
    }
}

/// FAT 镜像构造器
pub struct FatImageBuilder {
    bytes_per_sector: u16,
    sectors_per_cluster: u8,
    reserved_sectors: u16,
    cluster_count: u32,
    align_to: Option<usize>,
    headroom: usize,
    files: Vec<PlannedFile>,
    bad: Vec<u32>,
    next_free: u32,
    volume_label: bool,
    lfn_entry: bool,
    deleted_entries: usize,
    /// FAT32 根目录簇链，为空表示 FAT12/16
    root_chain: Vec<u32>,
}

impl FatImageBuilder {
    /// 以 512 字节扇区、给定簇大小与簇数创建构造器
    pub fn new(cluster_size: usize, cluster_count: u32) -> Self {
        Self {
            bytes_per_sector: 512,
            sectors_per_cluster: (cluster_size / 512) as u8,
            reserved_sectors: 1,
            cluster_count,
            align_to: None,
            headroom: 0,
            files: Vec::new(),
            bad: Vec::new(),
            next_free: 2,
            volume_label: false,
            lfn_entry: false,
            deleted_entries: 0,
            root_chain: Vec::new(),
        }
    }

    /// 设置保留扇区数
    pub fn reserved_sectors(mut self, count: u16) -> Self {
        self.reserved_sectors = count;
        self
    }

    /// 增加保留扇区，使首个数据扇区按 `align` 字节对齐
    pub fn aligned_to(mut self, align: usize) -> Self {
        self.align_to = Some(align);
        self
    }

    /// 在镜像末尾追加 `bytes` 字节的空闲内存
    pub fn headroom(mut self, bytes: usize) -> Self {
        self.headroom = bytes;
        self
    }

    /// 在根目录中放一个卷标项
    pub fn volume_label(mut self) -> Self {
        self.volume_label = true;
        self
    }

    /// 在根目录开头放一个长文件名项
    pub fn long_name_entry(mut self) -> Self {
        self.lfn_entry = true;
        self
    }

    /// 生成 FAT32 镜像，根目录占用 `root_clusters` 个连续簇
    ///
    /// 必须在添加任何文件之前调用，根目录从第一个空闲簇开始。
    pub fn fat32(mut self, root_clusters: u32) -> Self {
        let root_clusters = root_clusters.max(1);
        self.root_chain = (self.next_free..self.next_free + root_clusters).collect();
        self.next_free += root_clusters;
        self
    }

    /// 在根目录开头（长文件名项与卷标之前）放 `count` 个已删除的目录项
    pub fn deleted_entries(mut self, count: usize) -> Self {
        self.deleted_entries = count;
        self
    }

    /// 添加一个占用连续簇的文件
    pub fn file(mut self, name: &str, size: u32) -> Self {
        let clusters = self.clusters_for(size);
        let chain: Vec<u32> = (self.next_free..self.next_free + clusters).collect();
        self.next_free += clusters;
        self.files.push(PlannedFile {
            name: short_name(name),
            attr: 0x20,
            size,
            chain,
        });
        self
    }

    /// 添加一个按给定簇链存放的文件
    pub fn file_with_chain(mut self, name: &str, size: u32, chain: &[u32]) -> Self {
        if let Some(max) = chain.iter().max() {
            self.next_free = self.next_free.max(max + 1);
        }
        self.files.push(PlannedFile {
            name: short_name(name),
            attr: 0x20,
            size,
            chain: chain.to_vec(),
        });
        self
    }

    /// 添加一个占用一个簇的目录
    pub fn dir(mut self, name: &str) -> Self {
        let clu = self.next_free;
        self.next_free += 1;
        self.files.push(PlannedFile {
            name: short_name(name),
            attr: ATTR_DIRECTORY,
            size: 0,
            chain: vec![clu],
        });
        self
    }

    /// 添加一个空文件（首簇为 0）
    pub fn empty_file(mut self, name: &str) -> Self {
        self.files.push(PlannedFile {
            name: short_name(name),
            attr: 0x20,
            size: 0,
            chain: Vec::new(),
        });
        self
    }

    /// 将簇 `clu` 标记为坏簇
    pub fn bad_cluster(mut self, clu: u32) -> Self {
        self.bad.push(clu);
        self
    }

    fn clusters_for(&self, size: u32) -> u32 {
        let cs = self.bytes_per_sector as u32 * self.sectors_per_cluster as u32;
        size.div_ceil(cs).max(1)
    }

    /// 生成镜像
    pub fn build(self) -> FatImage {
        let bps = self.bytes_per_sector as usize;
        let cluster_size = bps * self.sectors_per_cluster as usize;
        let is_fat32 = !self.root_chain.is_empty();
        let is_fat12 = !is_fat32 && self.cluster_count < FAT12_MAX_CLUSTERS;
        let entries = self.cluster_count as usize + 2;
        let fat_bytes = if is_fat32 {
            entries * 4
        } else if is_fat12 {
            (entries * 3).div_ceil(2)
        } else {
            entries * 2
        };
        let fat_sectors = fat_bytes.div_ceil(bps);
        let root_entries = if is_fat32 { 0 } else { ROOT_ENTRIES };
        let root_sectors = (root_entries as usize * 32).div_ceil(bps);

        let mut reserved = self.reserved_sectors as usize;
        if let Some(align) = self.align_to {
            let fds = (reserved + NUM_FATS as usize * fat_sectors + root_sectors) * bps;
            reserved += ((align - fds % align) % align) / bps;
        }

        let first_data_sector = reserved + NUM_FATS as usize * fat_sectors + root_sectors;
        let total_sectors = first_data_sector + self.cluster_count as usize * self.sectors_per_cluster as usize;
        let first_data_offset = first_data_sector * bps;

        let mut img = vec![0u8; total_sectors * bps + self.headroom];

        // BPB
        img[0..3].copy_from_slice(&[0xEB, 0x3C, 0x90]);
        img[3..11].copy_from_slice(b"MSWIN4.1");
        put_u16(&mut img, 11, self.bytes_per_sector);
        img[13] = self.sectors_per_cluster;
        put_u16(&mut img, 14, reserved as u16);
        img[16] = NUM_FATS;
        put_u16(&mut img, 17, root_entries);
        if total_sectors < 0x10000 && !is_fat32 {
            put_u16(&mut img, 19, total_sectors as u16);
        } else {
            put_u32(&mut img, 32, total_sectors as u32);
        }
        img[21] = 0xF8;
        if is_fat32 {
            put_u32(&mut img, 36, fat_sectors as u32);
            put_u32(&mut img, 44, self.root_chain[0]);
        } else {
            put_u16(&mut img, 22, fat_sectors as u16);
        }
        img[510] = 0x55;
        img[511] = 0xAA;

        // FAT
        let mut fat = vec![0u8; fat_sectors * bps];
        let (media, eoc, bad) = if is_fat32 {
            (0x0FFF_FFF8, 0x0FFF_FFFF, 0x0FFF_FFF7)
        } else if is_fat12 {
            (0xFF8, 0xFFF, 0xFF7)
        } else {
            (0xFFF8, 0xFFFF, 0xFFF7)
        };
        let mut set = |clu: u32, val: u32| {
            if is_fat32 {
                let off = clu as usize * 4;
                fat[off..off + 4].copy_from_slice(&val.to_le_bytes());
            } else if is_fat12 {
                let off = clu as usize + clu as usize / 2;
                let cur = u16::from_le_bytes([fat[off], fat[off + 1]]);
                let new = if clu & 1 == 1 {
                    (cur & 0x000F) | ((val as u16) << 4)
                } else {
                    (cur & 0xF000) | (val as u16 & 0x0FFF)
                };
                fat[off..off + 2].copy_from_slice(&new.to_le_bytes());
            } else {
                let off = clu as usize * 2;
                fat[off..off + 2].copy_from_slice(&(val as u16).to_le_bytes());
            }
        };
        set(0, media);
        set(1, eoc);

        let mut used_bytes = first_data_offset;
        for (i, &clu) in self.root_chain.iter().enumerate() {
            let next = self.root_chain.get(i + 1).copied().unwrap_or(eoc);
            set(clu, next);
            let off = first_data_offset + (clu as usize - 2) * cluster_size;
            used_bytes = used_bytes.max(off + cluster_size);
        }
        for planned in &self.files {
            for (i, &clu) in planned.chain.iter().enumerate() {
                let next = planned.chain.get(i + 1).copied().unwrap_or(eoc);
                set(clu, next);
                let off = first_data_offset + (clu as usize - 2) * cluster_size;
                img[off..off + cluster_size].fill(clu as u8);
                img[off..off + 4].copy_from_slice(&clu.to_le_bytes());
                used_bytes = used_bytes.max(off + cluster_size);
            }
        }
        for &clu in &self.bad {
            set(clu, bad);
            let off = first_data_offset + (clu as usize - 2) * cluster_size;
            used_bytes = used_bytes.max(off + cluster_size);
        }

        for i in 0..NUM_FATS as usize {
            let off = (reserved + i * fat_sectors) * bps;
            img[off..off + fat.len()].copy_from_slice(&fat);
        }

        // 根目录：FAT12/16 位于固定区域，FAT32 按目录项序号落在根目录簇链上
        let root_start = (reserved + NUM_FATS as usize * fat_sectors) * bps;
        let per_cluster = cluster_size / 32;
        let slot_at = |index: usize| -> usize {
            match self.root_chain.get(index / per_cluster) {
                Some(&clu) if is_fat32 => {
                    first_data_offset + (clu as usize - 2) * cluster_size + (index % per_cluster) * 32
                }
                _ if is_fat32 => panic!("FatImageBuilder: root directory full"),
                _ => root_start + index * 32,
            }
        };

        let mut index = 0;
        for _ in 0..self.deleted_entries {
            let slot = slot_at(index);
            img[slot] = ENTRY_DELETED;
            img[slot + 1..slot + 11].copy_from_slice(b"OLD    TMP");
            index += 1;
        }
        if self.lfn_entry {
            let slot = slot_at(index);
            img[slot] = 0x41;
            img[slot + 11] = ATTR_LONG_NAME;
            index += 1;
        }
        if self.volume_label {
            let slot = slot_at(index);
            img[slot..slot + 11].copy_from_slice(b"RAMDISK    ");
            img[slot + 11] = ATTR_VOLUME_ID;
            index += 1;
        }
        for planned in &self.files {
            let slot = slot_at(index);
            let first = planned.chain.first().copied().unwrap_or(0);
            img[slot..slot + 11].copy_from_slice(&planned.name);
            img[slot + 11] = planned.attr;
            put_u16(&mut img, slot + 20, (first >> 16) as u16);
            put_u16(&mut img, slot + 26, first as u16);
            put_u32(&mut img, slot + 28, planned.size);
            index += 1;
        }

        FatImage {
            bytes: img,
            cluster_size,
            first_data_offset,
            used_bytes,
        }
    }
}

/// 将 "name.ext" 转换为 11 字节的 8.3 目录项名
pub fn short_name(name: &str) -> [u8; 11] {
    let mut out = [b' '; 11];
    let upper: String = name.chars().map(|c| c.to_ascii_uppercase()).collect();
    let (base, ext) = match upper.rsplit_once('.') {
        Some((b, e)) => (b, e),
        None => (upper.as_str(), ""),
    };
    for (i, b) in base.bytes().take(8).enumerate() {
        out[i] = b;
    }
    for (i, b) in ext.bytes().take(3).enumerate() {
        out[8 + i] = b;
    }
    out
}

fn put_u16(buf: &mut [u8], off: usize, val: u16) {
    buf[off..off + 2].copy_from_slice(&val.to_le_bytes());
}

fn put_u32(buf: &mut [u8], off: usize, val: u32) {
    buf[off..off + 4].copy_from_slice(&val.to_le_bytes());
}
