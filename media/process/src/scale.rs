/*!
    YUV/RGB conversion for the rotation path.
*/

use ffmpeg_next::{
    format::Pixel,
    software::scaling::{context::Context as Scaler, flag::Flags},
    util::frame::video::Video as VideoFrameRaw,
};

use media_types::{MediaError, Result, VideoFrame};

/**
    Paired software scalers converting between the pipeline's tight
    YUV 4:2:0 frames and the packed RGB24 buffers the GPU stage consumes.

    Both contexts are created once at processor initialization; per-frame
    work is plane copies plus one scaler run in each direction.
*/
pub struct RgbConverter {
    width: u32,
    height: u32,
    to_rgb: Scaler,
    to_yuv: Scaler,
}

impl RgbConverter {
    /**
        Create converters for the given frame dimensions.
    */
    pub fn new(width: u32, height: u32) -> Result<Self> {
        let to_rgb = Scaler::get(
            Pixel::YUV420P,
            width,
            height,
            Pixel::RGB24,
            width,
            height,
            Flags::BICUBIC,
        )
        .map_err(|e| MediaError::CodecInit(format!("yuv to rgb scaler: {e}")))?;

        let to_yuv = Scaler::get(
            Pixel::RGB24,
            width,
            height,
            Pixel::YUV420P,
            width,
            height,
            Flags::BICUBIC,
        )
        .map_err(|e| MediaError::CodecInit(format!("rgb to yuv scaler: {e}")))?;

        Ok(Self {
            width,
            height,
            to_rgb,
            to_yuv,
        })
    }

    /**
        Convert a YUV 4:2:0 frame to a tightly packed RGB24 buffer of
        `width * height * 3` bytes.
    */
    pub fn to_rgb(&mut self, frame: &VideoFrame) -> Result<Vec<u8>> {
        let width = self.width as usize;
        let height = self.height as usize;

        let mut source = VideoFrameRaw::new(Pixel::YUV420P, self.width, self.height);
        fill_plane(&mut source, 0, frame.y_plane(), width, height);
        let chroma_width = frame.chroma_width() as usize;
        let chroma_height = frame.chroma_height() as usize;
        fill_plane(&mut source, 1, frame.u_plane(), chroma_width, chroma_height);
        fill_plane(&mut source, 2, frame.v_plane(), chroma_width, chroma_height);

        let mut converted = VideoFrameRaw::empty();
        self.to_rgb
            .run(&source, &mut converted)
            .map_err(|e| MediaError::GpuRuntime(format!("yuv to rgb conversion: {e}")))?;

        let stride = converted.stride(0);
        let data = converted.data(0);
        let mut rgb = vec![0u8; width * height * 3];
        for row in 0..height {
            let src = &data[row * stride..row * stride + width * 3];
            rgb[row * width * 3..(row + 1) * width * 3].copy_from_slice(src);
        }
        Ok(rgb)
    }

    /**
        Convert a tightly packed RGB24 buffer back to a YUV 4:2:0 frame.
        The result carries no timestamp; the processor stamps it.
    */
    pub fn to_yuv(&mut self, rgb: &[u8]) -> Result<VideoFrame> {
        let width = self.width as usize;
        let height = self.height as usize;

        let mut source = VideoFrameRaw::new(Pixel::RGB24, self.width, self.height);
        {
            let stride = source.stride(0);
            let data = source.data_mut(0);
            for row in 0..height {
                data[row * stride..row * stride + width * 3]
                    .copy_from_slice(&rgb[row * width * 3..(row + 1) * width * 3]);
            }
        }

        let mut converted = VideoFrameRaw::empty();
        self.to_yuv
            .run(&source, &mut converted)
            .map_err(|e| MediaError::GpuRuntime(format!("rgb to yuv conversion: {e}")))?;

        let mut frame = VideoFrame::alloc_yuv420p(self.width, self.height);
        copy_plane_out(&converted, 0, frame.y_plane_mut(), width, height);
        let chroma_width = frame.chroma_width() as usize;
        let chroma_height = frame.chroma_height() as usize;
        copy_plane_out(&converted, 1, frame.u_plane_mut(), chroma_width, chroma_height);
        copy_plane_out(&converted, 2, frame.v_plane_mut(), chroma_width, chroma_height);
        Ok(frame)
    }
}

fn fill_plane(raw: &mut VideoFrameRaw, plane: usize, src: &[u8], width: usize, height: usize) {
    let stride = raw.stride(plane);
    let data = raw.data_mut(plane);
    for row in 0..height {
        data[row * stride..row * stride + width].copy_from_slice(&src[row * width..(row + 1) * width]);
    }
}

fn copy_plane_out(raw: &VideoFrameRaw, plane: usize, dst: &mut [u8], width: usize, height: usize) {
    let stride = raw.stride(plane);
    let data = raw.data(plane);
    for row in 0..height {
        dst[row * width..(row + 1) * width].copy_from_slice(&data[row * stride..row * stride + width]);
    }
}
