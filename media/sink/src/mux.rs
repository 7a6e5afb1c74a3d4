/*!
    Muxer implementation.
*/

use ffmpeg_next::{codec, encoder, ffi, format, packet, Rational as RawRational};
use tracing::{debug, info};

use media_types::{CodecId, MediaError, Packet, Result, StreamType};

use crate::config::SinkConfig;

/**
    Pick which stream's pending packet to write next.

    Compares head presentation times on a common seconds axis; the
    smaller one wins and ties go to video. When one side has terminated
    (`None`), the other drains.
*/
pub fn next_is_video(video_head: Option<f64>, audio_head: Option<f64>) -> Option<StreamType> {
    match (video_head, audio_head) {
        (Some(video), Some(audio)) => {
            if video <= audio {
                Some(StreamType::Video)
            } else {
                Some(StreamType::Audio)
            }
        }
        (Some(_), None) => Some(StreamType::Video),
        (None, Some(_)) => Some(StreamType::Audio),
        (None, None) => None,
    }
}

/**
    The muxer: owns the output container and writes encoded packets into
    it, rescaling timestamps from the encoders' linear time bases into
    whatever the container negotiated.
*/
pub struct Muxer {
    octx: format::context::Output,
    video_stream_index: Option<usize>,
    audio_stream_index: Option<usize>,
    video_fps: i32,
    audio_sample_rate: u32,
    video_packets: u64,
    audio_packets: u64,
}

impl Muxer {
    /**
        Create the output container, add the configured streams, and
        write the header.
    */
    pub fn new(config: &SinkConfig) -> Result<Self> {
        let mut octx = format::output_as(&config.output_path, &config.format_name)
            .map_err(|e| {
                MediaError::MuxWrite(format!("{}: {e}", config.output_path.display()))
            })?;

        let mut video_stream_index = None;
        let mut video_fps = 0;
        if let Some(video) = &config.video {
            let mut stream = octx
                .add_stream(encoder::find(codec_to_ffmpeg(video.codec)))
                .map_err(|e| MediaError::MuxWrite(format!("video stream setup: {e}")))?;
            stream.set_time_base(RawRational(1, video.fps));
            // the muxer is decoupled from the encoder threads, so the
            // stream parameters are filled in by hand
            unsafe {
                let par = (*stream.as_mut_ptr()).codecpar;
                (*par).codec_type = ffi::AVMediaType::AVMEDIA_TYPE_VIDEO;
                (*par).codec_id = codec_to_ffmpeg(video.codec).into();
                (*par).width = video.width as i32;
                (*par).height = video.height as i32;
                (*par).format = ffi::AVPixelFormat::AV_PIX_FMT_YUV420P as i32;
                (*par).bit_rate = video.bitrate as i64;
            }
            video_stream_index = Some(stream.index());
            video_fps = video.fps;
            debug!(
                width = video.width,
                height = video.height,
                fps = video.fps,
                codec = video.codec.name(),
                "created video stream"
            );
        }

        let mut audio_stream_index = None;
        let mut audio_sample_rate = 0;
        if let Some(audio) = &config.audio {
            let mut stream = octx
                .add_stream(encoder::find(codec_to_ffmpeg(audio.codec)))
                .map_err(|e| MediaError::MuxWrite(format!("audio stream setup: {e}")))?;
            stream.set_time_base(RawRational(1, audio.sample_rate as i32));
            unsafe {
                let par = (*stream.as_mut_ptr()).codecpar;
                (*par).codec_type = ffi::AVMediaType::AVMEDIA_TYPE_AUDIO;
                (*par).codec_id = codec_to_ffmpeg(audio.codec).into();
                (*par).sample_rate = audio.sample_rate as i32;
                ffi::av_channel_layout_default(&mut (*par).ch_layout, audio.channels as i32);
                (*par).format = ffi::AVSampleFormat::AV_SAMPLE_FMT_FLTP as i32;
                (*par).bit_rate = audio.bitrate as i64;
            }
            audio_stream_index = Some(stream.index());
            audio_sample_rate = audio.sample_rate;
            debug!(
                sample_rate = audio.sample_rate,
                channels = audio.channels,
                codec = audio.codec.name(),
                "created audio stream"
            );
        }

        octx.write_header()
            .map_err(|e| MediaError::MuxWrite(format!("container header: {e}")))?;

        Ok(Self {
            octx,
            video_stream_index,
            audio_stream_index,
            video_fps,
            audio_sample_rate,
            video_packets: 0,
            audio_packets: 0,
        })
    }

    /**
        Write one encoded packet, rescaling its timestamps from the
        encoder's time base (frame units for video, sample units for
        audio) into the stream's. A packet arriving without a pts gets
        one synthesized from the stream's running packet count.
    */
    pub fn write(&mut self, packet: &Packet) -> Result<()> {
        let (stream_index, source_time_base, synthesized_pts) = match packet.stream_type {
            StreamType::Video => (
                self.video_stream_index,
                RawRational(1, self.video_fps),
                self.video_packets as i64,
            ),
            StreamType::Audio => (
                self.audio_stream_index,
                RawRational(1, self.audio_sample_rate as i32),
                self.audio_packets as i64,
            ),
        };
        let stream_index = stream_index.ok_or_else(|| {
            MediaError::MuxWrite(format!(
                "no {:?} stream in output container",
                packet.stream_type
            ))
        })?;

        let mut raw = if packet.data.is_empty() {
            ffmpeg_next::Packet::empty()
        } else {
            ffmpeg_next::Packet::copy(&packet.data)
        };
        raw.set_stream(stream_index);
        let pts = packet.pts.map(i64::from).unwrap_or(synthesized_pts);
        raw.set_pts(Some(pts));
        raw.set_dts(Some(packet.dts.map(i64::from).unwrap_or(pts)));
        raw.set_duration(packet.duration.0);
        if packet.is_keyframe {
            raw.set_flags(packet::Flags::KEY);
        }

        let stream_time_base = self
            .octx
            .stream(stream_index)
            .map(|s| s.time_base())
            .unwrap_or(source_time_base);
        raw.rescale_ts(source_time_base, stream_time_base);

        raw.write_interleaved(&mut self.octx)
            .map_err(|e| MediaError::MuxWrite(format!("packet write: {e}")))?;

        match packet.stream_type {
            StreamType::Video => self.video_packets += 1,
            StreamType::Audio => self.audio_packets += 1,
        }
        Ok(())
    }

    /**
        Write the container trailer and close the file.
    */
    pub fn finish(mut self) -> Result<(u64, u64)> {
        self.octx
            .write_trailer()
            .map_err(|e| MediaError::MuxWrite(format!("container trailer: {e}")))?;

        info!(
            video_packets = self.video_packets,
            audio_packets = self.audio_packets,
            "output container finalized"
        );
        Ok((self.video_packets, self.audio_packets))
    }

    /**
        Packets written so far as `(video, audio)`.
    */
    pub fn packet_counts(&self) -> (u64, u64) {
        (self.video_packets, self.audio_packets)
    }
}

fn codec_to_ffmpeg(codec: CodecId) -> codec::Id {
    match codec {
        CodecId::Mpeg4 => codec::Id::MPEG4,
        CodecId::H264 => codec::Id::H264,
        CodecId::Ac3 => codec::Id::AC3,
        CodecId::Aac => codec::Id::AAC,
        CodecId::Mp3 => codec::Id::MP3,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn smaller_head_wins() {
        assert_eq!(
            next_is_video(Some(0.5), Some(1.0)),
            Some(StreamType::Video)
        );
        assert_eq!(
            next_is_video(Some(1.0), Some(0.5)),
            Some(StreamType::Audio)
        );
    }

    #[test]
    fn ties_break_toward_video() {
        assert_eq!(
            next_is_video(Some(2.0), Some(2.0)),
            Some(StreamType::Video)
        );
    }

    #[test]
    fn drained_side_yields_to_the_other() {
        assert_eq!(next_is_video(Some(3.0), None), Some(StreamType::Video));
        assert_eq!(next_is_video(None, Some(3.0)), Some(StreamType::Audio));
        assert_eq!(next_is_video(None, None), None);
    }

    #[test]
    fn merge_of_sorted_streams_is_pts_monotonic() {
        // video frames at 24 fps, audio frames of 1536 samples at 44100 Hz
        let mut video: Vec<f64> = (0..48).map(|i| i as f64 / 24.0).collect();
        let mut audio: Vec<f64> = (0..57).map(|i| (i * 1536) as f64 / 44100.0).collect();
        video.reverse();
        audio.reverse();

        let mut merged = Vec::new();
        loop {
            match next_is_video(video.last().copied(), audio.last().copied()) {
                Some(StreamType::Video) => merged.push(video.pop().unwrap()),
                Some(StreamType::Audio) => merged.push(audio.pop().unwrap()),
                None => break,
            }
        }

        assert_eq!(merged.len(), 48 + 57);
        assert!(merged.windows(2).all(|pair| pair[0] <= pair[1]));
    }
}
