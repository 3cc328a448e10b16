//! The host presentation surface as seen from the machine.
//!
//! The emulator core never talks to a window system. Peripherals that
//! produce output hand it to a [`Platform`], and the front-end decides what a
//! surface or a title actually is.

/// Host surface presenter. Implementations must be callable from the video
/// render thread.
pub trait Platform: Send + Sync {
    /// Present a 640x200 RGBA surface. `bg` is the border color.
    fn render_graphics(&self, pixels: &[u8], bg: (u8, u8, u8));

    /// Headless text fallback: `cells` is an interleaved character/attribute
    /// buffer of `columns * 25 * 2` bytes. `cursor` is `(column, row)` when
    /// the cursor is visible.
    fn render_text(&self, cells: &[u8], blink_enabled: bool, bg_index: u8, cursor: Option<(u8, u8)>);

    /// Window title updates (used for the MIPS readout).
    fn set_title(&self, title: &str);
}

/// Discards all output. Used by tests and by front-ends that only care about
/// the machine state.
pub struct NullPlatform;

impl Platform for NullPlatform {
    fn render_graphics(&self, _pixels: &[u8], _bg: (u8, u8, u8)) {}

    fn render_text(
        &self,
        _cells: &[u8],
        _blink_enabled: bool,
        _bg_index: u8,
        _cursor: Option<(u8, u8)>,
    ) {
    }

    fn set_title(&self, _title: &str) {}
}
