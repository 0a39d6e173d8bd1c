//! AVIF input decoding.
//!
//! The `image` crate's `"avif"` feature only ships the encoder (rav1e); its
//! decoder needs the C library dav1d. AVIF sources are decoded here instead:
//! `avif-parse` extracts the primary AV1 item from the container and `rav1d`
//! (the pure Rust port of dav1d) decodes it. The alpha item is ignored.

use super::codec::CodecError;
use image::{DynamicImage, RgbImage};
use rav1d::include::dav1d::data::Dav1dData;
use rav1d::include::dav1d::dav1d::Dav1dSettings;
use rav1d::include::dav1d::headers::{
    DAV1D_PIXEL_LAYOUT_I400, DAV1D_PIXEL_LAYOUT_I420, DAV1D_PIXEL_LAYOUT_I422,
    DAV1D_PIXEL_LAYOUT_I444,
};
use rav1d::include::dav1d::picture::Dav1dPicture;
use rav1d::src::lib as dav1d;
use std::io::Cursor;
use std::ptr::NonNull;

/// Decode an AVIF file held in memory into RGB8.
pub fn decode_avif(bytes: &[u8]) -> Result<DynamicImage, CodecError> {
    let avif = avif_parse::read_avif(&mut Cursor::new(bytes))
        .map_err(|e| CodecError::Decode(format!("invalid AVIF container: {e:?}")))?;
    decode_av1(&avif.primary_item)
}

fn decode_av1(av1: &[u8]) -> Result<DynamicImage, CodecError> {
    let mut settings = std::mem::MaybeUninit::<Dav1dSettings>::uninit();
    let settings_ptr = NonNull::new(settings.as_mut_ptr())
        .ok_or_else(|| CodecError::Decode("rav1d settings allocation failed".into()))?;
    unsafe { dav1d::dav1d_default_settings(settings_ptr) };
    let mut settings = unsafe { settings.assume_init() };
    settings.n_threads = 1;
    settings.max_frame_delay = 1;

    let mut ctx = None;
    let rc = unsafe { dav1d::dav1d_open(NonNull::new(&mut ctx), NonNull::new(&mut settings)) };
    if rc.0 != 0 {
        return Err(CodecError::Decode(format!("rav1d open failed ({})", rc.0)));
    }

    // Everything after open runs in the closure so the context is closed on
    // every exit path.
    let decode = || -> Result<DynamicImage, CodecError> {
        let mut data = Dav1dData::default();
        let buf = unsafe { dav1d::dav1d_data_create(NonNull::new(&mut data), av1.len()) };
        if buf.is_null() {
            return Err(CodecError::Decode("rav1d data_create failed".into()));
        }
        unsafe { std::ptr::copy_nonoverlapping(av1.as_ptr(), buf, av1.len()) };

        let rc = unsafe { dav1d::dav1d_send_data(ctx, NonNull::new(&mut data)) };
        if rc.0 != 0 {
            unsafe { dav1d::dav1d_data_unref(NonNull::new(&mut data)) };
            return Err(CodecError::Decode(format!(
                "rav1d send_data failed ({})",
                rc.0
            )));
        }

        let mut pic: Dav1dPicture = unsafe { std::mem::zeroed() };
        let rc = unsafe { dav1d::dav1d_get_picture(ctx, NonNull::new(&mut pic)) };
        if rc.0 != 0 {
            return Err(CodecError::Decode(format!(
                "rav1d get_picture failed ({})",
                rc.0
            )));
        }

        let converted = picture_to_rgb(&pic);
        unsafe { dav1d::dav1d_picture_unref(NonNull::new(&mut pic)) };
        converted
    };

    let result = decode();
    unsafe { dav1d::dav1d_close(NonNull::new(&mut ctx)) };
    result
}

/// One plane of a decoded picture.
#[derive(Clone, Copy)]
struct Plane {
    ptr: *const u8,
    stride: isize,
}

impl Plane {
    /// Sample at (x, y). Depths above 8 bits are stored as u16.
    fn sample(&self, x: u32, y: u32, bpc: u32) -> f32 {
        let row = y as isize * self.stride;
        unsafe {
            if bpc <= 8 {
                *self.ptr.offset(row + x as isize) as f32
            } else {
                *(self.ptr.offset(row + x as isize * 2) as *const u16) as f32
            }
        }
    }
}

fn picture_to_rgb(pic: &Dav1dPicture) -> Result<DynamicImage, CodecError> {
    let width = pic.p.w as u32;
    let height = pic.p.h as u32;
    let bpc = pic.p.bpc as u32;

    let plane = |i: usize, stride: isize| -> Result<Plane, CodecError> {
        let data = pic.data[i]
            .ok_or_else(|| CodecError::Decode(format!("AVIF plane {i} missing")))?;
        Ok(Plane {
            ptr: data.as_ptr() as *const u8,
            stride,
        })
    };

    let luma = plane(0, pic.stride[0])?;
    // (horizontal, vertical) chroma subsampling; None for monochrome
    let chroma = match pic.p.layout {
        DAV1D_PIXEL_LAYOUT_I400 => None,
        DAV1D_PIXEL_LAYOUT_I420 => Some((true, true)),
        DAV1D_PIXEL_LAYOUT_I422 => Some((true, false)),
        DAV1D_PIXEL_LAYOUT_I444 => Some((false, false)),
        other => {
            return Err(CodecError::Unsupported(format!(
                "AVIF pixel layout {other}"
            )));
        }
    };
    let planes = match chroma {
        Some(subsampling) => Some((
            plane(1, pic.stride[1])?,
            plane(2, pic.stride[1])?,
            subsampling,
        )),
        None => None,
    };

    let max = ((1u32 << bpc) - 1) as f32;
    let mid = (1u32 << (bpc - 1)) as f32;
    let to_u8 = |v: f32| (v * 255.0 / max).clamp(0.0, 255.0) as u8;

    // BT.601 YCbCr → RGB
    let img = RgbImage::from_fn(width, height, |x, y| {
        let luma_v = luma.sample(x, y, bpc);
        match planes {
            None => {
                let v = to_u8(luma_v);
                image::Rgb([v, v, v])
            }
            Some((cb_plane, cr_plane, (ss_x, ss_y))) => {
                let cx = if ss_x { x / 2 } else { x };
                let cy = if ss_y { y / 2 } else { y };
                let cb = cb_plane.sample(cx, cy, bpc) - mid;
                let cr = cr_plane.sample(cx, cy, bpc) - mid;
                image::Rgb([
                    to_u8(luma_v + 1.402 * cr),
                    to_u8(luma_v - 0.344136 * cb - 0.714136 * cr),
                    to_u8(luma_v + 1.772 * cb),
                ])
            }
        }
    });
    Ok(DynamicImage::ImageRgb8(img))
}
