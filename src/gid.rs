//! Packed tile references: a 29-bit global id plus three orientation flags.

/// Horizontal flip, bit 31
pub const FLIP_H: u32 = 0x8000_0000;
/// Vertical flip, bit 30
pub const FLIP_V: u32 = 0x4000_0000;
/// Diagonal flip, bit 29
pub const FLIP_D: u32 = 0x2000_0000;
/// Bits holding the tile id
pub const GID_MASK: u32 = !(FLIP_H | FLIP_V | FLIP_D);

/// One tile reference as stored in a layer or on a tile object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TileInstance(pub u32);

/// A [`TileInstance`] split into its parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DecodedGid {
    /// Global tile id with the flag bits cleared
    pub id: u32,
    /// Mirrored along the x axis
    pub flip_h: bool,
    /// Mirrored along the y axis
    pub flip_v: bool,
    /// Anti-diagonal flip
    pub flip_d: bool,
}

impl TileInstance {
    /// Packed value, flags included
    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }
    /// Id with the flags cleared
    #[inline]
    pub fn gid(self) -> u32 {
        self.0 & GID_MASK
    }
    /// Bit 31
    #[inline]
    pub fn flip_h(self) -> bool {
        (self.0 & FLIP_H) != 0
    }
    /// Bit 30
    #[inline]
    pub fn flip_v(self) -> bool {
        (self.0 & FLIP_V) != 0
    }
    /// Bit 29
    #[inline]
    pub fn flip_d(self) -> bool {
        (self.0 & FLIP_D) != 0
    }

    /// Id 0 is an empty cell and never refers to a tile set.
    #[inline]
    pub fn is_empty(self) -> bool {
        self.gid() == 0
    }

    /// See [`decode`]
    pub fn decode(self) -> DecodedGid {
        decode(self.0)
    }
}

impl From<u32> for TileInstance {
    fn from(raw: u32) -> Self {
        TileInstance(raw)
    }
}

/// Splits a raw packed value into id and flags.
pub fn decode(raw: u32) -> DecodedGid {
    DecodedGid {
        id: raw & GID_MASK,
        flip_h: raw & FLIP_H != 0,
        flip_v: raw & FLIP_V != 0,
        flip_d: raw & FLIP_D != 0,
    }
}

/// Packs an id and flags back into one value. Bits of `id` above bit 28 are dropped.
pub fn encode(id: u32, flip_h: bool, flip_v: bool, flip_d: bool) -> u32 {
    let mut raw = id & GID_MASK;
    if flip_h {
        raw |= FLIP_H;
    }
    if flip_v {
        raw |= FLIP_V;
    }
    if flip_d {
        raw |= FLIP_D;
    }
    raw
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_flag_combination() {
        let ids = [0, 1, 5, 4096, 0x0ABC_DEF1, GID_MASK];
        for &id in &ids {
            for bits in 0..8u32 {
                let (h, v, d) = (bits & 4 != 0, bits & 2 != 0, bits & 1 != 0);
                let back = decode(encode(id, h, v, d));
                assert_eq!(
                    back,
                    DecodedGid {
                        id,
                        flip_h: h,
                        flip_v: v,
                        flip_d: d
                    }
                );
            }
        }
    }

    #[test]
    fn flag_bits_are_the_top_three() {
        let t = TileInstance(0xE000_0007);
        assert!(t.flip_h() && t.flip_v() && t.flip_d());
        assert_eq!(t.gid(), 7);
        assert!(!t.is_empty());
        assert!(TileInstance(FLIP_H).is_empty());
    }
}
