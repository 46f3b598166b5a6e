//! Teal palette for the hero backdrop, matched to the page accent (#64ffda)

/// Linear RGB endpoints, all channels in [0, 1]
pub mod colors {
    // === Point colors ===
    pub const TEAL_LOW: [f32; 3] = [0.1, 0.7, 0.8];   // dim end of the intensity range
    pub const TEAL_HIGH: [f32; 3] = [0.4, 1.0, 1.0];  // bright end

    // === Surface ===
    pub const CLEAR: [f32; 4] = [0.0, 0.0, 0.0, 0.0]; // transparent, page shows through

    /// Canvas opacity, keeps the cloud behind the hero text
    pub const SURFACE_OPACITY: f32 = 0.9;
}

/// Blend two colors channel by channel, `t` in [0, 1]
pub fn lerp_rgb(low: [f32; 3], high: [f32; 3], t: f32) -> [f32; 3] {
    [
        low[0] + (high[0] - low[0]) * t,
        low[1] + (high[1] - low[1]) * t,
        low[2] + (high[2] - low[2]) * t,
    ]
}
