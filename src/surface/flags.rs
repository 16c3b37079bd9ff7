// ── SurfaceControl builder flags ──────────────────────────────────────────────
//
// Values of the hidden `SurfaceControl.*` flag constants passed to
// `SurfaceControl.Builder.setFlags(flags, mask)`.

use serde::{Deserialize, Serialize};

bitflags::bitflags! {
    /// Flags requested when a surface control is built.
    ///
    /// They are fixed at construction: a flag such as `SKIP_SCREENSHOT` cannot
    /// be added to a live surface.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct SurfaceFlags: u32 {
        /// Created hidden; needs an explicit `show`.
        const HIDDEN            = 0x0000_0004;
        /// Excluded from screenshots and screen recording.
        const SKIP_SCREENSHOT   = 0x0000_0040;
        /// Contents may not be captured by non-secure displays.
        const SECURE            = 0x0000_0080;
        const NON_PREMULTIPLIED = 0x0000_0100;
        const OPAQUE            = 0x0000_0400;
        /// No color layer is drawn behind an empty buffer.
        const NO_COLOR_FILL     = 0x0000_4000;
    }
}

impl SurfaceFlags {
    /// Standard flag-setter semantics: bits in `mask` take their value from
    /// `flags`, all other bits are kept.
    pub fn with_masked(self, flags: SurfaceFlags, mask: SurfaceFlags) -> SurfaceFlags {
        (self & !mask) | (flags & mask)
    }
}
