//! Color Graphics Adapter.
//!
//! The adapter owns 16 KiB of framebuffer memory at `0xB8000`; the address
//! decode masks to 14 bits, so the window `[0xBC000, 0xC0000)` aliases it.
//! Ports 0x3D0-0x3DF expose the CRT register file, the mode and color
//! controls, and the status register whose scanline timing is derived from
//! wall time in `step` so BIOS polling loops behave.
//!
//! Rendering runs on a dedicated thread that ticks at ~30 Hz, snapshots the
//! register file and framebuffer under a read lock, rasterizes into a
//! 640x200 RGBA surface, and hands the surface to the host platform after
//! releasing the lock. The emulation thread and the render thread only meet
//! at that lock and at three single-word atomics (dirty, cycle counter,
//! shutdown).

pub mod font;

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, RwLock};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use rand::RngCore;

use rxt_core::logging::{log, LogCategory, LogLevel};
use rxt_core::{InstallError, Peripheral, Pointer, Processor, Slot, StepError};

use crate::platform::Platform;
use font::{glyph_row, CGA_PALETTE};

const MEMORY_BASE: u32 = 0xB8000;
const MEMORY_SIZE: usize = 0x4000;

/// ~15.7 kHz horizontal rate.
const SCANLINE_NS: u64 = 31469;
const SCANLINES_PER_FRAME: u32 = 525;
const FIRST_RETRACE_LINE: u32 = 479;

const SURFACE_W: usize = 640;
const SURFACE_H: usize = 200;

/// Render thread tick, ~30 Hz.
const FRAME_INTERVAL: Duration = Duration::from_millis(33);

/// Everything the render thread reads, behind one reader-writer lock.
struct VideoState {
    mem: Vec<u8>,
    crt_addr: u8,
    crt: [u8; 0x100],
    mode_ctrl: u8,
    color_ctrl: u8,
    cursor_visible: bool,
    cursor_pos: u16,
}

impl VideoState {
    fn new() -> Self {
        let mut mem = vec![0u8; MEMORY_SIZE];
        // Power-on DRAM is garbage.
        rand::thread_rng().fill_bytes(&mut mem);
        Self {
            mem,
            crt_addr: 0,
            crt: [0; 0x100],
            mode_ctrl: 0x01,
            color_ctrl: 0x20,
            cursor_visible: true,
            cursor_pos: 0,
        }
    }

    fn columns(&self) -> usize {
        if self.mode_ctrl & 0x01 != 0 {
            80
        } else {
            40
        }
    }

    fn page_offset(&self) -> usize {
        (((self.crt[0x0C] as usize) << 8) | self.crt[0x0D] as usize) & (MEMORY_SIZE - 1)
    }

    fn blit_char(&self, surface: &mut [u8], ch: u8, attr: u8, x: usize, y: usize, blink: bool) {
        let mut fg_index = attr & 0x0F;
        let mut bg_index = (attr & 0x70) >> 4;

        if attr & 0x80 != 0 {
            if self.mode_ctrl & 0x20 != 0 {
                if blink {
                    fg_index = bg_index;
                }
            } else {
                // Blink disabled: bit 7 selects high-intensity background.
                bg_index += 8;
            }
        }

        let fg = CGA_PALETTE[fg_index as usize];
        let bg = CGA_PALETTE[bg_index as usize];
        let char_width = if self.mode_ctrl & 0x01 == 0 { 2 } else { 1 };

        for row in 0..8 {
            let line = glyph_row(ch, row);
            for col in 0..8 {
                let color = if line & (0x80 >> col) != 0 { fg } else { bg };
                let offset = (SURFACE_W * (y + row) + x * char_width + col * char_width) * 4;
                blit32(surface, offset, color);
                if char_width == 2 {
                    blit32(surface, offset + 4, color);
                }
            }
        }
    }

    fn render_text_mode(&self, surface: &mut [u8], blink: bool) {
        let cols = self.columns();
        let page = self.page_offset();

        for i in 0..cols * 25 {
            let ch = self.mem[(page + i * 2) & (MEMORY_SIZE - 1)];
            let attr = self.mem[(page + i * 2 + 1) & (MEMORY_SIZE - 1)];
            self.blit_char(surface, ch, attr, (i % cols) * 8, (i / cols) * 8, blink);
        }

        if blink && self.cursor_visible {
            let x = self.cursor_pos as usize % cols;
            let y = self.cursor_pos as usize / cols;
            if x < 80 && y < 25 {
                let cell = (page + (cols * y + x) * 2 + 1) & (MEMORY_SIZE - 1);
                let attr = (self.mem[cell] & 0x70) | 0x0F;
                self.blit_char(surface, b'_', attr, x * 8, y * 8, blink);
            }
        }
    }

    /// 320x200, 2 bits per pixel, pixels doubled horizontally. Even lines at
    /// the base, odd lines 8 KiB in.
    fn render_medium_res(&self, surface: &mut [u8]) {
        let palette = (self.color_ctrl >> 5) & 1;
        let intensity = ((self.color_ctrl >> 4) & 1) << 3;
        let bg = CGA_PALETTE[(self.color_ctrl & 0x0F) as usize];

        for y in 0..SURFACE_H {
            for x in 0..320 {
                let addr = (y >> 1) * 80 + (y & 1) * 8192 + (x >> 2);
                let pixel = (self.mem[addr] >> (6 - 2 * (x & 3))) & 3;
                let color = if pixel == 0 {
                    bg
                } else {
                    CGA_PALETTE[(pixel * 2 + palette + intensity) as usize]
                };
                let offset = (y * SURFACE_W + x * 2) * 4;
                blit32(surface, offset, color);
                blit32(surface, offset + 4, color);
            }
        }
    }

    /// 640x200, 1 bit per pixel, MSB first.
    fn render_high_res(&self, surface: &mut [u8]) {
        for y in 0..SURFACE_H {
            for x in 0..SURFACE_W {
                let addr = (y >> 1) * 80 + (y & 1) * 8192 + (x >> 3);
                let bit = (self.mem[addr] >> (7 - (x & 7))) & 1;
                let color = CGA_PALETTE[(bit * 15) as usize];
                blit32(surface, (y * SURFACE_W + x) * 4, color);
            }
        }
    }
}

#[inline]
fn blit32(pixels: &mut [u8], offset: usize, color: u32) {
    pixels[offset] = (color >> 16) as u8;
    pixels[offset + 1] = (color >> 8) as u8;
    pixels[offset + 2] = color as u8;
    pixels[offset + 3] = 0xFF;
}

fn blink_phase(epoch: Instant) -> bool {
    (epoch.elapsed().as_millis() / 500) % 2 == 0
}

fn scanline_status(line: u32) -> u8 {
    let retrace = if line > FIRST_RETRACE_LINE { 8 } else { 0 };
    retrace | 1
}

/// State shared with the render thread.
struct Shared {
    state: RwLock<VideoState>,
    dirty: AtomicBool,
    cycles: AtomicU32,
    shutdown: AtomicBool,
}

pub struct Cga {
    shared: Arc<Shared>,
    platform: Arc<dyn Platform>,
    /// Headless text fallback instead of pixel rendering.
    text_output: bool,
    /// Blink timing reference.
    epoch: Instant,
    last_scanline: Instant,
    scanline: u32,
    status: u8,
    render: Option<JoinHandle<()>>,
}

impl Cga {
    pub fn new(platform: Arc<dyn Platform>, text_output: bool) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: RwLock::new(VideoState::new()),
                dirty: AtomicBool::new(false),
                cycles: AtomicU32::new(0),
                shutdown: AtomicBool::new(false),
            }),
            platform,
            text_output,
            epoch: Instant::now(),
            last_scanline: Instant::now(),
            scanline: 0,
            status: 0,
            render: None,
        }
    }

    #[inline]
    fn mem_index(addr: Pointer) -> usize {
        addr.linear().wrapping_sub(MEMORY_BASE) as usize & (MEMORY_SIZE - 1)
    }
}

impl Peripheral for Cga {
    fn name(&self) -> &str {
        "Color Graphics Adapter"
    }

    fn install(&mut self, cpu: &mut Processor, slot: Slot) -> Result<(), InstallError> {
        // 16K of framebuffer, incompletely decoded: the second window
        // repeats the first.
        cpu.install_memory_device(
            slot,
            Pointer::from_linear(MEMORY_BASE),
            Pointer::from_linear(MEMORY_BASE + 2 * MEMORY_SIZE as u32 - 1),
        )?;
        cpu.install_io_device(slot, 0x3D0, 0x3DF)?;

        let shared = self.shared.clone();
        let platform = self.platform.clone();
        let text_output = self.text_output;
        let epoch = self.epoch;
        self.render = Some(
            thread::Builder::new()
                .name("cga-render".to_string())
                .spawn(move || render_loop(shared, platform, text_output, epoch))
                .expect("failed to spawn the CGA render thread"),
        );
        Ok(())
    }

    fn reset(&mut self) {
        let mut state = self.shared.state.write().unwrap();
        state.mode_ctrl = 0x01;
        state.color_ctrl = 0x20;
        state.cursor_visible = true;
        state.cursor_pos = 0;
        drop(state);

        self.last_scanline = Instant::now();
        self.scanline = 0;
        self.status = 0;
    }

    fn step(&mut self, _cpu: &mut Processor, cycles: u32) -> Result<(), StepError> {
        self.shared.cycles.fetch_add(cycles, Ordering::Relaxed);

        let now = Instant::now();
        let elapsed = now.duration_since(self.last_scanline).as_nanos() as u64;
        let lines = elapsed / SCANLINE_NS;
        if lines > 0 {
            let into_line = elapsed % SCANLINE_NS;
            self.last_scanline = now - Duration::from_nanos(into_line);
            self.scanline = (self.scanline + lines as u32) % SCANLINES_PER_FRAME;
            self.status = scanline_status(self.scanline);
        }
        Ok(())
    }

    fn close(&mut self) {
        self.shared.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.render.take() {
            let _ = handle.join();
        }
    }

    fn read_byte(&self, addr: Pointer) -> u8 {
        let state = self.shared.state.read().unwrap();
        state.mem[Self::mem_index(addr)]
    }

    fn write_byte(&mut self, addr: Pointer, value: u8) {
        let mut state = self.shared.state.write().unwrap();
        state.mem[Self::mem_index(addr)] = value;
        self.shared.dirty.store(true, Ordering::Relaxed);
    }

    fn io_in(&mut self, port: u16) -> u8 {
        match port {
            0x3D1 | 0x3D3 | 0x3D5 | 0x3D7 => {
                let state = self.shared.state.read().unwrap();
                state.crt[state.crt_addr as usize]
            }
            0x3D9 => self.shared.state.read().unwrap().color_ctrl,
            0x3DA => {
                // The "not in active display" bit latches clear on read.
                let status = self.status;
                self.status &= 0xFE;
                status
            }
            _ => 0,
        }
    }

    fn io_out(&mut self, port: u16, value: u8) {
        let mut state = self.shared.state.write().unwrap();
        // Any register touch may need a redraw.
        self.shared.dirty.store(true, Ordering::Relaxed);

        match port {
            0x3D0 | 0x3D2 | 0x3D4 | 0x3D6 => state.crt_addr = value,
            0x3D1 | 0x3D3 | 0x3D5 | 0x3D7 => {
                let index = state.crt_addr;
                state.crt[index as usize] = value;
                match index {
                    0x0A => state.cursor_visible = value & 0x20 == 0,
                    0x0E => state.cursor_pos = (state.cursor_pos & 0x00FF) | ((value as u16) << 8),
                    0x0F => state.cursor_pos = (state.cursor_pos & 0xFF00) | value as u16,
                    _ => {}
                }
            }
            0x3D8 => state.mode_ctrl = value,
            0x3D9 => state.color_ctrl = value,
            _ => {}
        }
    }
}

fn render_loop(
    shared: Arc<Shared>,
    platform: Arc<dyn Platform>,
    text_output: bool,
    epoch: Instant,
) {
    log(LogCategory::Video, LogLevel::Debug, || {
        "render thread started".to_string()
    });

    let mut surface = vec![0u8; SURFACE_W * SURFACE_H * 4];
    let mut prev_blink = false;
    let mut last_title = Instant::now();

    loop {
        thread::sleep(FRAME_INTERVAL);
        if shared.shutdown.load(Ordering::Relaxed) {
            break;
        }

        if last_title.elapsed() >= Duration::from_secs(1) {
            last_title = Instant::now();
            let cycles = shared.cycles.swap(0, Ordering::Relaxed);
            platform.set_title(&format!("RXT - {:.2} MIPS", cycles as f64 / 1_000_000.0));
        }

        let blink = blink_phase(epoch);
        let dirty = shared.dirty.swap(false, Ordering::Relaxed);
        if !dirty && blink == prev_blink {
            continue;
        }
        prev_blink = blink;

        let state = shared.state.read().unwrap();
        let bg_index = state.color_ctrl & 0x0F;
        let bg = CGA_PALETTE[bg_index as usize];
        let bg_rgb = ((bg >> 16) as u8, (bg >> 8) as u8, bg as u8);

        if state.mode_ctrl & 0x02 != 0 {
            if state.mode_ctrl & 0x10 != 0 {
                state.render_high_res(&mut surface);
            } else {
                state.render_medium_res(&mut surface);
            }
            drop(state);
            platform.render_graphics(&surface, bg_rgb);
        } else if text_output {
            if dirty {
                let cols = state.columns();
                let cells = state.mem[..cols * 25 * 2].to_vec();
                let cursor = if state.cursor_visible {
                    Some((
                        (state.cursor_pos as usize % cols) as u8,
                        (state.cursor_pos as usize / cols) as u8,
                    ))
                } else {
                    None
                };
                let blink_enabled = state.mode_ctrl & 0x20 != 0;
                drop(state);
                platform.render_text(&cells, blink_enabled, bg_index, cursor);
            }
        } else {
            state.render_text_mode(&mut surface, blink);
            drop(state);
            platform.render_graphics(&surface, bg_rgb);
        }
    }

    log(LogCategory::Video, LogLevel::Debug, || {
        "render thread stopped".to_string()
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::NullPlatform;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::Mutex;

    fn device() -> Cga {
        Cga::new(Arc::new(NullPlatform), false)
    }

    #[test]
    fn framebuffer_aliases_every_sixteen_kib() {
        let mut cga = device();
        for k in 0..MEMORY_SIZE as u32 {
            cga.write_byte(Pointer::from_linear(0xB8000 + k), (k & 0xFF) as u8);
        }
        for k in 0..MEMORY_SIZE as u32 {
            assert_eq!(
                cga.read_byte(Pointer::from_linear(0xBC000 + k)),
                (k & 0xFF) as u8,
            );
        }
    }

    #[test]
    fn crt_register_file_indexes_through_latch() {
        let mut cga = device();
        cga.io_out(0x3D4, 0x0E);
        cga.io_out(0x3D5, 0x12);
        assert_eq!(cga.io_in(0x3D5), 0x12);

        // All four decode aliases reach the same latch.
        cga.io_out(0x3D0, 0x0F);
        cga.io_out(0x3D1, 0x34);
        assert_eq!(cga.io_in(0x3D7), 0x34);
    }

    #[test]
    fn cursor_position_comes_from_crt_0e_0f() {
        let mut cga = device();
        cga.io_out(0x3D4, 0x0E);
        cga.io_out(0x3D5, 0x01);
        cga.io_out(0x3D4, 0x0F);
        cga.io_out(0x3D5, 0x40);
        assert_eq!(cga.shared.state.read().unwrap().cursor_pos, 0x0140);
    }

    #[test]
    fn cursor_visibility_follows_crt_0a_bit_5() {
        let mut cga = device();
        cga.io_out(0x3D4, 0x0A);
        cga.io_out(0x3D5, 0x20);
        assert!(!cga.shared.state.read().unwrap().cursor_visible);
        cga.io_out(0x3D5, 0x00);
        assert!(cga.shared.state.read().unwrap().cursor_visible);
    }

    #[test]
    fn mode_and_color_registers() {
        let mut cga = device();
        cga.io_out(0x3D8, 0x0A); // graphics, blink
        cga.io_out(0x3D9, 0x17);
        assert_eq!(cga.io_in(0x3D9), 0x17);
        assert_eq!(cga.shared.state.read().unwrap().mode_ctrl, 0x0A);
    }

    #[test]
    fn status_low_bit_latches_clear_on_read() {
        let mut cga = device();
        let mut cpu = Processor::new();

        // Give the scanline counter some wall time to chew through.
        thread::sleep(Duration::from_millis(2));
        cga.step(&mut cpu, 1).unwrap();

        let first = cga.io_in(0x3DA);
        assert_eq!(first & 1, 1);
        let second = cga.io_in(0x3DA);
        assert_eq!(second & 1, 0);
    }

    #[test]
    fn retrace_bit_tracks_scanline_position() {
        assert_eq!(scanline_status(0), 1);
        assert_eq!(scanline_status(479), 1);
        assert_eq!(scanline_status(480), 9);
        assert_eq!(scanline_status(524), 9);
    }

    #[test]
    fn writes_mark_memory_dirty() {
        let mut cga = device();
        assert!(!cga.shared.dirty.load(Ordering::Relaxed));
        cga.write_byte(Pointer::from_linear(0xB8000), b'A');
        assert!(cga.shared.dirty.load(Ordering::Relaxed));
    }

    #[test]
    fn text_rasterizer_draws_glyph_pixels() {
        let mut state = VideoState::new();
        state.mem.fill(0);
        state.mode_ctrl = 0x01; // 80 column text
        state.mem[0] = b'A';
        state.mem[1] = 0x0F; // white on black

        let mut surface = vec![0u8; SURFACE_W * SURFACE_H * 4];
        state.render_text_mode(&mut surface, false);

        for row in 0..8 {
            let line = glyph_row(b'A', row);
            for col in 0..8 {
                let offset = (SURFACE_W * row + col) * 4;
                let expect_fg = line & (0x80 >> col) != 0;
                let is_white = surface[offset] == 0xFF;
                assert_eq!(is_white, expect_fg, "row {} col {}", row, col);
            }
        }
    }

    #[test]
    fn forty_column_mode_doubles_glyphs() {
        let mut state = VideoState::new();
        state.mem.fill(0);
        state.mode_ctrl = 0x00; // 40 column text
        state.mem[0] = 0xDB; // solid block
        state.mem[1] = 0x0F;

        let mut surface = vec![0u8; SURFACE_W * SURFACE_H * 4];
        state.render_text_mode(&mut surface, false);

        // The glyph covers 16 pixels instead of 8.
        for px in 0..16 {
            assert_eq!(surface[px * 4], 0xFF, "pixel {}", px);
        }
        assert_eq!(surface[16 * 4], 0x00);
    }

    #[test]
    fn medium_res_decodes_two_bit_pixels() {
        let mut state = VideoState::new();
        state.mem.fill(0);
        state.mode_ctrl = 0x02; // graphics
        state.color_ctrl = 0x00; // palette 0, no intensity, black border
        state.mem[0] = 0b01_10_11_00; // pixels 1, 2, 3, 0

        let mut surface = vec![0u8; SURFACE_W * SURFACE_H * 4];
        state.render_medium_res(&mut surface);

        let color_at = |x: usize| {
            let off = x * 2 * 4;
            ((surface[off] as u32) << 16) | ((surface[off + 1] as u32) << 8) | surface[off + 2] as u32
        };
        assert_eq!(color_at(0), CGA_PALETTE[2]); // index 1 -> green
        assert_eq!(color_at(1), CGA_PALETTE[4]); // index 2 -> red
        assert_eq!(color_at(2), CGA_PALETTE[6]); // index 3 -> brown
        assert_eq!(color_at(3), CGA_PALETTE[0]); // index 0 -> background
    }

    #[test]
    fn high_res_interleaves_odd_lines() {
        let mut state = VideoState::new();
        state.mem.fill(0);
        state.mode_ctrl = 0x12; // graphics + high-res
        state.mem[0] = 0x80; // line 0, pixel 0
        state.mem[8192] = 0x80; // line 1, pixel 0

        let mut surface = vec![0u8; SURFACE_W * SURFACE_H * 4];
        state.render_high_res(&mut surface);

        assert_eq!(surface[0], 0xFF); // (0, 0) white
        assert_eq!(surface[SURFACE_W * 4], 0xFF); // (0, 1) white
        assert_eq!(surface[4], 0x00); // (1, 0) black
    }

    /// Captures presentation calls for the lifecycle test.
    struct Capture {
        frames: Mutex<usize>,
    }

    impl Platform for Capture {
        fn render_graphics(&self, _pixels: &[u8], _bg: (u8, u8, u8)) {
            *self.frames.lock().unwrap() += 1;
        }

        fn render_text(&self, _c: &[u8], _b: bool, _bg: u8, _cur: Option<(u8, u8)>) {}

        fn set_title(&self, _title: &str) {}
    }

    #[test]
    fn render_thread_runs_and_shuts_down() {
        let capture = Arc::new(Capture {
            frames: Mutex::new(0),
        });
        let mut cpu = Processor::new();
        let cga = Rc::new(RefCell::new(Cga::new(capture.clone(), false)));
        cpu.install(cga.clone()).unwrap();

        cpu.write_byte(Pointer::from_linear(0xB8000), b'A');
        thread::sleep(Duration::from_millis(250));
        cpu.close();

        assert!(*capture.frames.lock().unwrap() > 0);
        // close() joined the thread.
        assert!(cga.borrow().render.is_none());
    }
}
