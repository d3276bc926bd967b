//! # GOP Framebuffer

use crate::UefiError;
use handover::{Builder, FramebufferAux, Outcome, Record};
use log::{debug, info};
use uefi::boot;
use uefi::boot::ScopedProtocol;
use uefi::proto::console::gop::{GraphicsOutput, Mode, ModeInfo, PixelFormat};

/// Vertical resolution picked when the firmware offers it.
const PREFERRED_HEIGHT: usize = 1080;

/// Bytes per pixel of both supported formats.
const BYTES_PER_PIXEL: usize = 4;

/// The handover pixel format of a GOP pixel format, if it has a linear encoding.
#[must_use]
pub const fn pixel_format(format: PixelFormat) -> Option<handover::PixelFormat> {
    match format {
        PixelFormat::Rgb => Some(handover::PixelFormat::Rgbx8888),
        PixelFormat::Bgr => Some(handover::PixelFormat::Bgrx8888),
        PixelFormat::Bitmask | PixelFormat::BltOnly => None,
    }
}

/// Packs a GOP mode into the framebuffer aux word.
///
/// # Errors
/// Fails for formats without a linear encoding and for modes exceeding the
/// 16-bit width, height or pitch fields.
pub fn mode_aux(info: &ModeInfo) -> Result<FramebufferAux, UefiError> {
    let format = pixel_format(info.pixel_format())
        .ok_or(UefiError::UnsupportedPixelFormat(info.pixel_format()))?;
    let (width, height) = info.resolution();
    let pitch = info.stride() * BYTES_PER_PIXEL;

    let field = |v: usize| u16::try_from(v).map_err(|_| UefiError::ModeOutOfRange);
    Ok(FramebufferAux::new()
        .with_width(field(width)?)
        .with_height(field(height)?)
        .with_pitch(field(pitch)?)
        .with_format(format as u16))
}

/// Switches GOP to the preferred mode and appends a framebuffer record for it.
///
/// # Errors
/// Fails if no GOP is available, no mode with a linear pixel format exists,
/// or the record does not fit the payload.
pub fn append_framebuffer(builder: &mut Builder<'_>) -> Result<Outcome, UefiError> {
    let mut gop = open_gop()?;

    let mode = preferred_mode(&gop).ok_or(UefiError::NoGraphicsMode)?;
    gop.set_mode(&mode)?;

    let info = gop.current_mode_info();
    let aux = mode_aux(&info)?;
    let mut fb = gop.frame_buffer();
    let start = fb.as_mut_ptr() as u64;
    let size = fb.size() as u64;

    info!(
        "framebuffer {}x{} px at {start:#x}, pitch {} bytes",
        aux.width(),
        aux.height(),
        aux.pitch()
    );
    Ok(builder.append(Record::framebuffer(start, size, aux))?)
}

/// The 1080p mode if offered, else the largest mode with a linear pixel format.
fn preferred_mode(gop: &GraphicsOutput) -> Option<Mode> {
    let linear = |mode: &Mode| pixel_format(mode.info().pixel_format()).is_some();

    debug!("GOP offers {} modes", gop.modes().count());
    gop.modes()
        .filter(linear)
        .find(|mode| mode.info().resolution().1 == PREFERRED_HEIGHT)
        .or_else(|| {
            gop.modes().filter(linear).max_by_key(|mode| {
                let (w, h) = mode.info().resolution();
                w * h
            })
        })
}

fn open_gop() -> Result<ScopedProtocol<GraphicsOutput>, UefiError> {
    let handle = boot::get_handle_for_protocol::<GraphicsOutput>()?;
    Ok(boot::open_protocol_exclusive::<GraphicsOutput>(handle)?)
}
