/*!
    Container probing and the demux loop.
*/

use std::path::{Path, PathBuf};

use ffmpeg_next::{codec, format, media};
use tracing::{debug, info, warn};

use media_types::{
    AudioStreamInfo, MediaDuration, MediaError, MediaInfo, MediaQueue, Packet, Pts, Rational,
    Result, StreamType, VideoStreamInfo,
};

use crate::config::CodecConfig;

/**
    Everything [`probe`] learns about an input container.
*/
#[derive(Debug)]
pub struct ProbeResult {
    /// Stream metadata for the pipeline configuration.
    pub info: MediaInfo,
    /// Codec parameters for the video decoder.
    pub video_codec: CodecConfig,
    /// Codec parameters for the audio decoder.
    pub audio_codec: CodecConfig,
}

/**
    Open a container, extract stream information for the first video and
    first audio stream, and close it again.

    Fails with [`MediaError::StreamNotFound`] when either stream is
    missing; the pipeline requires one of each.
*/
pub fn probe(path: impl AsRef<Path>) -> Result<ProbeResult> {
    ffmpeg_next::init().map_err(|e| MediaError::CodecInit(e.to_string()))?;

    let input = format::input(&path.as_ref())
        .map_err(|e| MediaError::InputOpen(format!("{}: {e}", path.as_ref().display())))?;

    let mut info = MediaInfo::default();
    let mut video_codec = None;
    let mut audio_codec = None;

    for stream in input.streams() {
        let parameters = stream.parameters();
        match parameters.medium() {
            media::Type::Video if info.video.is_none() => {
                let decoder = codec::context::Context::from_parameters(parameters.clone())
                    .and_then(|ctx| ctx.decoder().video())
                    .map_err(|e| MediaError::InputOpen(e.to_string()))?;

                let rate = stream.rate();
                let fps = if rate.denominator() > 0 {
                    rate.numerator() / rate.denominator()
                } else {
                    0
                };

                info.video = Some(VideoStreamInfo {
                    width: decoder.width(),
                    height: decoder.height(),
                    fps,
                    time_base: convert_rational(stream.time_base()),
                });
                video_codec = Some(CodecConfig::from_parameters(&parameters));
            }
            media::Type::Audio if info.audio.is_none() => {
                let decoder = codec::context::Context::from_parameters(parameters.clone())
                    .and_then(|ctx| ctx.decoder().audio())
                    .map_err(|e| MediaError::InputOpen(e.to_string()))?;

                info.audio = Some(AudioStreamInfo {
                    sample_rate: decoder.rate(),
                    channels: decoder.channels() as u16,
                    time_base: convert_rational(stream.time_base()),
                });
                audio_codec = Some(CodecConfig::from_parameters(&parameters));
            }
            _ => {}
        }
    }

    let video_codec = video_codec.ok_or(MediaError::StreamNotFound("video"))?;
    let audio_codec = audio_codec.ok_or(MediaError::StreamNotFound("audio"))?;

    if let (Some(video), Some(audio)) = (&info.video, &info.audio) {
        info!(
            width = video.width,
            height = video.height,
            fps = video.fps,
            sample_rate = audio.sample_rate,
            channels = audio.channels,
            "probed input streams"
        );
    }

    Ok(ProbeResult {
        info,
        video_codec,
        audio_codec,
    })
}

/**
    The demuxer stage: reads the container and dispatches each packet to
    the queue of its stream.
*/
pub struct Demuxer {
    path: PathBuf,
    input: format::context::Input,
    video_stream_index: Option<usize>,
    audio_stream_index: Option<usize>,
}

impl Demuxer {
    /**
        Open the container and locate the first video and first audio
        stream.
    */
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let input = format::input(&path)
            .map_err(|e| MediaError::InputOpen(format!("{}: {e}", path.display())))?;

        let mut video_stream_index = None;
        let mut audio_stream_index = None;
        for stream in input.streams() {
            match stream.parameters().medium() {
                media::Type::Video if video_stream_index.is_none() => {
                    video_stream_index = Some(stream.index());
                }
                media::Type::Audio if audio_stream_index.is_none() => {
                    audio_stream_index = Some(stream.index());
                }
                _ => {}
            }
        }

        if video_stream_index.is_none() && audio_stream_index.is_none() {
            return Err(MediaError::StreamNotFound("video or audio"));
        }

        debug!(
            video_stream = ?video_stream_index,
            audio_stream = ?audio_stream_index,
            "opened input container"
        );

        Ok(Self {
            path,
            input,
            video_stream_index,
            audio_stream_index,
        })
    }

    /**
        Read the container to the end, dispatching packets to the stream
        queues, then finish both queues.

        `max_video_packets` caps the run on the video stream when nonzero;
        the audio stream is cut at the same point so the output stays
        roughly aligned. Read errors end the loop like a normal end of
        file.

        Returns the number of video and audio packets dispatched.
    */
    pub fn run(
        mut self,
        video_out: &MediaQueue<Packet>,
        audio_out: &MediaQueue<Packet>,
        max_video_packets: u64,
    ) -> (u64, u64) {
        let mut video_packets = 0u64;
        let mut audio_packets = 0u64;

        for (stream, packet) in self.input.packets() {
            let index = Some(stream.index());
            if index == self.video_stream_index {
                video_out.push(convert_packet(&packet, &stream, StreamType::Video));
                video_packets += 1;
                if max_video_packets > 0 && video_packets >= max_video_packets {
                    info!(max_video_packets, "reached video packet ceiling");
                    break;
                }
            } else if index == self.audio_stream_index {
                audio_out.push(convert_packet(&packet, &stream, StreamType::Audio));
                audio_packets += 1;
            }
        }

        video_out.finish();
        audio_out.finish();

        if video_packets == 0 && audio_packets == 0 {
            warn!(path = %self.path.display(), "no packets read from input");
        }
        debug!(video_packets, audio_packets, "demux finished");

        (video_packets, audio_packets)
    }
}

fn convert_packet(
    packet: &ffmpeg_next::Packet,
    stream: &format::stream::Stream<'_>,
    stream_type: StreamType,
) -> Packet {
    Packet::new(
        packet.data().map(<[u8]>::to_vec).unwrap_or_default(),
        packet.pts().map(Pts),
        packet.dts().map(Pts),
        MediaDuration(packet.duration()),
        convert_rational(stream.time_base()),
        packet.is_key(),
        stream_type,
    )
}

fn convert_rational(rational: ffmpeg_next::Rational) -> Rational {
    if rational.denominator() == 0 {
        return Rational::new(rational.numerator(), 1);
    }
    Rational::new(rational.numerator(), rational.denominator())
}
