//! FAT 布局解析
//!
//! 从引导扇区的 BPB 计算各区域的位置：保留扇区、FAT 表、根目录（FAT12/16）与数据区。
//! 簇号到字节范围的换算总是对照镜像大小做边界检查。

use core::ops::Range;

use vfs::FsError;

/// 簇数低于此值为 FAT12
const FAT12_MAX_CLUSTERS: u32 = 4085;
/// 簇数低于此值为 FAT16
const FAT16_MAX_CLUSTERS: u32 = 65525;

/// BPB 字段偏移
pub(crate) mod bpb {
    pub const BYTS_PER_SEC: usize = 11;
    pub const SEC_PER_CLUS: usize = 13;
    pub const RSVD_SEC_CNT: usize = 14;
    pub const NUM_FATS: usize = 16;
    pub const ROOT_ENT_CNT: usize = 17;
    pub const TOT_SEC16: usize = 19;
    pub const FAT_SZ16: usize = 22;
    pub const TOT_SEC32: usize = 32;
    pub const FAT_SZ32: usize = 36;
    pub const ROOT_CLUS: usize = 44;
    pub const SIGNATURE: usize = 510;
}

/// FAT 变种，决定表项宽度
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FatType {
    /// 12 位表项
    Fat12,
    /// 16 位表项
    Fat16,
    /// 32 位表项（高 4 位保留）
    Fat32,
}

impl FatType {
    /// 按簇数判定 FAT 类型
    pub fn from_cluster_count(count: u32) -> Self {
        if count < FAT12_MAX_CLUSTERS {
            FatType::Fat12
        } else if count < FAT16_MAX_CLUSTERS {
            FatType::Fat16
        } else {
            FatType::Fat32
        }
    }

    /// 坏簇标记
    pub const fn bad_cluster(self) -> u32 {
        match self {
            FatType::Fat12 => 0xFF7,
            FatType::Fat16 => 0xFFF7,
            FatType::Fat32 => 0x0FFF_FFF7,
        }
    }

    /// 不小于此值的表项表示簇链结束
    pub const fn end_of_chain(self) -> u32 {
        match self {
            FatType::Fat12 => 0xFF8,
            FatType::Fat16 => 0xFFF8,
            FatType::Fat32 => 0x0FFF_FFF8,
        }
    }
}

/// 从 BPB 解析出的镜像布局
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FatLayout {
    /// FAT 类型
    pub fat_type: FatType,
    /// 每扇区字节数
    pub bytes_per_sector: usize,
    /// 每簇扇区数
    pub sectors_per_cluster: usize,
    /// 保留扇区数
    pub reserved_sectors: usize,
    /// FAT 表份数
    pub num_fats: usize,
    /// 根目录项数（FAT32 为 0）
    pub root_entries: usize,
    /// 每份 FAT 表的扇区数
    pub fat_size: usize,
    /// 总扇区数
    pub total_sectors: usize,
    /// 数据区簇数
    pub cluster_count: u32,
    /// FAT32 根目录首簇
    pub root_cluster: u32,
}

fn read_u16(buf: &[u8], off: usize) -> usize {
    u16::from_le_bytes([buf[off], buf[off + 1]]) as usize
}

fn read_u32(buf: &[u8], off: usize) -> usize {
    u32::from_le_bytes([buf[off], buf[off + 1], buf[off + 2], buf[off + 3]]) as usize
}

impl FatLayout {
    /// 解析镜像头部
    ///
    /// 镜像必须至少包含引导扇区、FAT 表和根目录区。
    pub fn parse(image: &[u8]) -> Result<Self, FsError> {
        if image.len() < 512 || image[bpb::SIGNATURE..bpb::SIGNATURE + 2] != [0x55, 0xAA] {
            return Err(FsError::InvalidArgument);
        }

        let bytes_per_sector = read_u16(image, bpb::BYTS_PER_SEC);
        let sectors_per_cluster = image[bpb::SEC_PER_CLUS] as usize;
        let reserved_sectors = read_u16(image, bpb::RSVD_SEC_CNT);
        let num_fats = image[bpb::NUM_FATS] as usize;
        let root_entries = read_u16(image, bpb::ROOT_ENT_CNT);

        if !matches!(bytes_per_sector, 512 | 1024 | 2048 | 4096)
            || !sectors_per_cluster.is_power_of_two()
            || reserved_sectors == 0
            || num_fats == 0
        {
            log::warn!(
                "fat: invalid BPB (bps={}, spc={}, rsvd={}, fats={})",
                bytes_per_sector,
                sectors_per_cluster,
                reserved_sectors,
                num_fats
            );
            return Err(FsError::InvalidArgument);
        }

        let fat_size16 = read_u16(image, bpb::FAT_SZ16);
        let fat_size = match fat_size16 {
            0 => read_u32(image, bpb::FAT_SZ32),
            n => n,
        };
        let total_sectors = match read_u16(image, bpb::TOT_SEC16) {
            0 => read_u32(image, bpb::TOT_SEC32),
            n => n,
        };
        if fat_size == 0 {
            return Err(FsError::InvalidArgument);
        }

        let root_dir_sectors = (root_entries * 32).div_ceil(bytes_per_sector);
        let first_data_sector = reserved_sectors + num_fats * fat_size + root_dir_sectors;
        if total_sectors <= first_data_sector
            || image.len() < first_data_sector * bytes_per_sector
        {
            return Err(FsError::InvalidArgument);
        }

        let cluster_count = ((total_sectors - first_data_sector) / sectors_per_cluster) as u32;
        // 精简过的 FAT32 镜像簇数可能低于 FAT32 下限，此时按 BPB 结构判定
        let fat_type = if fat_size16 == 0 && root_entries == 0 {
            FatType::Fat32
        } else {
            FatType::from_cluster_count(cluster_count)
        };
        let root_cluster = match fat_type {
            FatType::Fat32 => read_u32(image, bpb::ROOT_CLUS) as u32,
            _ => 0,
        };
        if fat_type == FatType::Fat32 && (root_cluster < 2 || root_cluster > cluster_count + 1) {
            log::warn!("fat: FAT32 root cluster {} out of range", root_cluster);
            return Err(FsError::InvalidArgument);
        }

        Ok(Self {
            fat_type,
            bytes_per_sector,
            sectors_per_cluster,
            reserved_sectors,
            num_fats,
            root_entries,
            fat_size,
            total_sectors,
            cluster_count,
            root_cluster,
        })
    }

    /// 每簇字节数
    pub fn cluster_size(&self) -> usize {
        self.bytes_per_sector * self.sectors_per_cluster
    }

    /// 根目录占用的扇区数（FAT32 为 0）
    pub fn root_dir_sectors(&self) -> usize {
        (self.root_entries * 32).div_ceil(self.bytes_per_sector)
    }

    /// 第一份 FAT 表的字节偏移
    pub fn fat_offset(&self) -> usize {
        self.reserved_sectors * self.bytes_per_sector
    }

    /// 第一份 FAT 表的字节长度
    pub fn fat_bytes(&self) -> usize {
        self.fat_size * self.bytes_per_sector
    }

    /// 根目录区的字节范围（FAT12/16）
    pub fn root_dir_range(&self) -> Range<usize> {
        let start = (self.reserved_sectors + self.num_fats * self.fat_size) * self.bytes_per_sector;
        start..start + self.root_entries * 32
    }

    /// 首个数据扇区号
    pub fn first_data_sector(&self) -> usize {
        self.reserved_sectors + self.num_fats * self.fat_size + self.root_dir_sectors()
    }

    /// 首个数据扇区的字节偏移
    pub fn first_data_offset(&self) -> usize {
        self.first_data_sector() * self.bytes_per_sector
    }

    /// 首个数据扇区是否按 `align` 字节对齐
    pub fn is_first_data_sector_aligned(&self, align: usize) -> bool {
        self.first_data_offset() % align == 0
    }

    /// 最大合法簇号
    pub fn max_cluster(&self) -> u32 {
        self.cluster_count + 1
    }

    /// 簇 `clu` 在镜像中的字节范围
    ///
    /// 簇号不在 `[2, max_cluster]` 内，或范围超出 `image_len` 时返回 `None`。
    pub fn cluster_range(&self, clu: u32, image_len: usize) -> Option<Range<usize>> {
        if clu < 2 || clu > self.max_cluster() {
            return None;
        }
        let start = self.first_data_offset() + (clu as usize - 2) * self.cluster_size();
        let end = start + self.cluster_size();
        (end <= image_len).then_some(start..end)
    }
}
