//! AVIF input decoding.
//!
//! The `image` crate's `"avif"` feature only ships the rav1e **encoder**; its
//! decoder needs the C `dav1d` library. AVIF inputs are instead unpacked with
//! `avif-parse` (ISOBMFF container) and decoded with `rav1d`, the pure Rust
//! port of dav1d, then converted from YUV to interleaved RGB8.
//!
//! Container-level transforms (`irot`/`imir`) are not applied; AVIF inputs
//! are always treated as upright.

use super::backend::BackendError;
use image::{DynamicImage, RgbImage};
use rav1d::include::dav1d::data::Dav1dData;
use rav1d::include::dav1d::dav1d::Dav1dSettings;
use rav1d::include::dav1d::headers::{
    DAV1D_PIXEL_LAYOUT_I400, DAV1D_PIXEL_LAYOUT_I420, DAV1D_PIXEL_LAYOUT_I422,
    DAV1D_PIXEL_LAYOUT_I444,
};
use rav1d::include::dav1d::picture::Dav1dPicture;
use rav1d::src::lib as dav1d;
use std::path::Path;
use std::ptr::NonNull;

/// Runs a cleanup closure when dropped, so every early return releases
/// decoder resources.
struct OnDrop<F: FnMut()>(F);

impl<F: FnMut()> Drop for OnDrop<F> {
    fn drop(&mut self) {
        (self.0)()
    }
}

fn failed(what: &str, path: &Path, detail: impl std::fmt::Debug) -> BackendError {
    BackendError::DecodeFailed(format!("{what} {}: {detail:?}", path.display()))
}

/// Decode the primary image of an AVIF file to RGB8.
pub fn decode(path: &Path) -> Result<DynamicImage, BackendError> {
    let bytes = std::fs::read(path)?;
    let avif = avif_parse::read_avif(&mut std::io::Cursor::new(&bytes))
        .map_err(|e| failed("Failed to parse AVIF", path, e))?;
    let av1: &[u8] = &avif.primary_item;

    let mut settings = std::mem::MaybeUninit::<Dav1dSettings>::uninit();
    let settings_ptr = NonNull::new(settings.as_mut_ptr())
        .ok_or_else(|| BackendError::DecodeFailed("rav1d settings pointer was null".into()))?;
    unsafe { dav1d::dav1d_default_settings(settings_ptr) };
    let mut settings = unsafe { settings.assume_init() };
    settings.n_threads = 1;
    settings.max_frame_delay = 1;

    let mut ctx = None;
    let rc = unsafe { dav1d::dav1d_open(NonNull::new(&mut ctx), NonNull::new(&mut settings)) };
    if rc.0 != 0 {
        return Err(BackendError::DecodeFailed(format!(
            "rav1d open failed ({})",
            rc.0
        )));
    }
    let ctx_ptr: *mut _ = &mut ctx;
    let _close = OnDrop(|| unsafe {
        dav1d::dav1d_close(NonNull::new(ctx_ptr));
    });

    let mut data = Dav1dData::default();
    let buf = unsafe { dav1d::dav1d_data_create(NonNull::new(&mut data), av1.len()) };
    if buf.is_null() {
        return Err(BackendError::DecodeFailed(
            "rav1d data_create failed".into(),
        ));
    }
    unsafe { std::ptr::copy_nonoverlapping(av1.as_ptr(), buf, av1.len()) };

    let rc = unsafe { dav1d::dav1d_send_data(ctx, NonNull::new(&mut data)) };
    if rc.0 != 0 {
        unsafe { dav1d::dav1d_data_unref(NonNull::new(&mut data)) };
        return Err(BackendError::DecodeFailed(format!(
            "rav1d send_data failed ({})",
            rc.0
        )));
    }

    let mut pic: Dav1dPicture = unsafe { std::mem::zeroed() };
    let rc = unsafe { dav1d::dav1d_get_picture(ctx, NonNull::new(&mut pic)) };
    if rc.0 != 0 {
        return Err(BackendError::DecodeFailed(format!(
            "rav1d get_picture failed ({})",
            rc.0
        )));
    }
    let pic_ptr: *mut Dav1dPicture = &mut pic;
    let _unref = OnDrop(|| unsafe {
        dav1d::dav1d_picture_unref(NonNull::new(pic_ptr));
    });

    let frame = unsafe { &*pic_ptr };
    let width = frame.p.w as u32;
    let height = frame.p.h as u32;
    let bpc = frame.p.bpc as u32;
    let layout = frame.p.layout;

    let luma = plane(frame, 0)?;
    let chroma = match layout {
        DAV1D_PIXEL_LAYOUT_I400 => None,
        DAV1D_PIXEL_LAYOUT_I420 => Some((plane(frame, 1)?, plane(frame, 2)?, true, true)),
        DAV1D_PIXEL_LAYOUT_I422 => Some((plane(frame, 1)?, plane(frame, 2)?, true, false)),
        DAV1D_PIXEL_LAYOUT_I444 => Some((plane(frame, 1)?, plane(frame, 2)?, false, false)),
        _ => {
            return Err(BackendError::DecodeFailed(format!(
                "Unsupported AVIF pixel layout: {layout}"
            )));
        }
    };

    let frame = YuvFrame {
        luma,
        chroma: chroma.map(|(cb, cr, ss_x, ss_y)| Chroma {
            cb,
            cr,
            ss_x,
            ss_y,
        }),
        width,
        height,
        bpc,
    };
    let rgb = frame.to_rgb8();

    RgbImage::from_raw(width, height, rgb)
        .map(DynamicImage::ImageRgb8)
        .ok_or_else(|| BackendError::DecodeFailed("decoded AVIF buffer has the wrong size".into()))
}

fn plane(pic: &Dav1dPicture, index: usize) -> Result<Plane, BackendError> {
    let ptr = pic.data[index]
        .ok_or_else(|| BackendError::DecodeFailed(format!("rav1d returned no plane {index}")))?;
    Ok(Plane {
        ptr: ptr.as_ptr() as *const u8,
        stride: pic.stride[index.min(1)],
    })
}

/// One borrowed YUV plane inside a rav1d picture.
struct Plane {
    ptr: *const u8,
    stride: isize,
}

impl Plane {
    /// Sample at `(x, y)`. High bit depth planes store each sample as a `u16`.
    #[inline]
    fn sample(&self, x: u32, y: u32, bpc: u32) -> f32 {
        let row = y as isize * self.stride;
        if bpc <= 8 {
            (unsafe { *self.ptr.offset(row + x as isize) }) as f32
        } else {
            (unsafe { *(self.ptr.offset(row + x as isize * 2) as *const u16) }) as f32
        }
    }
}

struct Chroma {
    cb: Plane,
    cr: Plane,
    ss_x: bool,
    ss_y: bool,
}

struct YuvFrame {
    luma: Plane,
    chroma: Option<Chroma>,
    width: u32,
    height: u32,
    bpc: u32,
}

impl YuvFrame {
    /// BT.601 full-range YCbCr to RGB8.
    fn to_rgb8(&self) -> Vec<u8> {
        let scale = 255.0 / ((1u32 << self.bpc) - 1) as f32;
        let center = (1u32 << (self.bpc - 1)) as f32;
        let mut out = Vec::with_capacity(self.width as usize * self.height as usize * 3);

        for y in 0..self.height {
            for x in 0..self.width {
                let luma = self.luma.sample(x, y, self.bpc);
                let [r, g, b] = match &self.chroma {
                    None => [luma; 3],
                    Some(c) => {
                        let cx = if c.ss_x { x / 2 } else { x };
                        let cy = if c.ss_y { y / 2 } else { y };
                        let cb = c.cb.sample(cx, cy, self.bpc) - center;
                        let cr = c.cr.sample(cx, cy, self.bpc) - center;
                        [
                            luma + 1.402 * cr,
                            luma - 0.344136 * cb - 0.714136 * cr,
                            luma + 1.772 * cb,
                        ]
                    }
                };
                out.extend([r, g, b].map(|v| (v * scale).clamp(0.0, 255.0) as u8));
            }
        }

        out
    }
}
