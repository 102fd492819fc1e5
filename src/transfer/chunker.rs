/// 分块计划
///
/// 按固定大小从头切分字节缓冲，分块数为 `ceil(len / chunk_size)`，
/// 最后一块的长度落在 `[1, chunk_size]` 之间。空缓冲没有分块。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPlan {
    total_len: usize,
    chunk_size: usize,
}

impl ChunkPlan {
    pub fn new(total_len: usize, chunk_size: usize) -> Self {
        Self {
            total_len,
            chunk_size: chunk_size.max(1),
        }
    }

    pub fn total_chunks(&self) -> usize {
        (self.total_len + self.chunk_size - 1) / self.chunk_size
    }

    /// 指定分块写完后宿主端应有的总字节数
    pub fn bytes_through(&self, index: usize) -> usize {
        ((index + 1) * self.chunk_size).min(self.total_len)
    }

    /// 第 index 块确认后的完成百分比，最后一块恰好为 100
    pub fn percent_after(&self, index: usize) -> f64 {
        let total = self.total_chunks();
        if total == 0 {
            return 100.0;
        }
        (index + 1) as f64 * 100.0 / total as f64
    }

    /// 按顺序切分缓冲
    pub fn slices<'a>(&self, bytes: &'a [u8]) -> std::slice::Chunks<'a, u8> {
        bytes.chunks(self.chunk_size)
    }
}
