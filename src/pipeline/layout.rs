/// Threads per work group on each axis, as declared by the kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkGroupSize {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

impl WorkGroupSize {
    pub const fn new(x: u32, y: u32, z: u32) -> Self {
        Self { x, y, z }
    }

    pub fn threads(&self) -> u64 {
        self.x as u64 * self.y as u64 * self.z as u64
    }

    /// True when some axis declares no threads. Such a group runs nothing.
    pub fn is_degenerate(&self) -> bool {
        self.x == 0 || self.y == 0 || self.z == 0
    }
}

impl Default for WorkGroupSize {
    fn default() -> Self {
        Self::new(8, 8, 1)
    }
}

/// Number of work groups dispatched on each axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchSize {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

impl DispatchSize {
    pub const fn new(x: u32, y: u32, z: u32) -> Self {
        Self { x, y, z }
    }
}

/// Texture dimensions and dispatch sizing for one clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureLayout {
    /// Next power of two >= vertex count. Texel x is the vertex index.
    pub width: usize,
    /// Next power of two >= frame count. Texel y is the frame index.
    pub height: usize,
    pub work_group: WorkGroupSize,
    pub groups: DispatchSize,
}

/// Smallest power of two >= `n`; 1 for 0.
#[inline]
pub fn next_power_of_two(n: usize) -> usize {
    n.next_power_of_two()
}

/// Exact ceiling division. `size` must be non-zero.
#[inline]
pub fn ceil_div(count: usize, size: usize) -> usize {
    count.div_ceil(size)
}

/// Groups needed to cover `count` items, saturating at `u32::MAX` so an
/// oversized grid is rejected by the device instead of wrapping.
#[inline]
fn group_count(count: usize, size: u32) -> u32 {
    u32::try_from(ceil_div(count, size.max(1) as usize)).unwrap_or(u32::MAX)
}

/// Plans texture dimensions and group counts for a `vertex_count` x
/// `frame_count` grid.
///
/// Group counts use exact ceiling division, so an exact multiple of the
/// group size dispatches no extra group. A zero work-group axis is sized
/// as 1 here; devices refuse to dispatch such a group.
pub fn plan(vertex_count: usize, frame_count: usize, work_group: WorkGroupSize) -> TextureLayout {
    TextureLayout {
        width: next_power_of_two(vertex_count),
        height: next_power_of_two(frame_count),
        work_group,
        groups: DispatchSize::new(
            group_count(vertex_count, work_group.x),
            group_count(frame_count, work_group.y),
            1,
        ),
    }
}
