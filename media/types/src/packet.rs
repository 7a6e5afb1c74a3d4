/*!
    Compressed packet type.
*/

use crate::{MediaDuration, Pts, Rational};

/**
    Type of media stream.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StreamType {
    /// Video stream
    Video,
    /// Audio stream
    Audio,
}

/**
    A compressed media packet.

    Carries the data of a single codec-level unit with its timing: one
    access unit between the demuxer and a decoder, or one encoded unit
    between an encoder and the muxer. Transferring a packet across a
    [`crate::MediaQueue`] transfers ownership of its payload; whoever
    pops it last drops it.
*/
#[derive(Clone, Debug)]
pub struct Packet {
    /// Compressed data.
    pub data: Vec<u8>,
    /// Presentation timestamp (when to display/play).
    pub pts: Option<Pts>,
    /// Decode timestamp (when to decode — may differ from PTS for B-frames).
    pub dts: Option<Pts>,
    /// Duration of this packet's content.
    pub duration: MediaDuration,
    /// Time base for interpreting timestamps.
    pub time_base: Rational,
    /// Whether this is a keyframe (can be decoded independently).
    pub is_keyframe: bool,
    /// Type of stream this packet belongs to.
    pub stream_type: StreamType,
}

impl Packet {
    /**
        Create a new packet.
    */
    pub fn new(
        data: Vec<u8>,
        pts: Option<Pts>,
        dts: Option<Pts>,
        duration: MediaDuration,
        time_base: Rational,
        is_keyframe: bool,
        stream_type: StreamType,
    ) -> Self {
        Self {
            data,
            pts,
            dts,
            duration,
            time_base,
            is_keyframe,
            stream_type,
        }
    }

    /**
        Returns the presentation time in seconds, if PTS is set.

        The muxer compares video packets (frame-indexed timestamps) and
        audio packets (sample-indexed timestamps) on this common axis
        when deciding the interleave order.
    */
    pub fn pts_seconds(&self) -> Option<f64> {
        self.pts.map(|pts| pts.to_seconds(self.time_base))
    }
}

// Ensure Packet is Send + Sync
static_assertions::assert_impl_all!(Packet: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;

    const TB_VIDEO: Rational = Rational { num: 1, den: 24 };
    const TB_AUDIO: Rational = Rational { num: 1, den: 44100 };

    fn video_packet(pts: i64) -> Packet {
        Packet::new(
            vec![0u8; 64],
            Some(Pts(pts)),
            Some(Pts(pts)),
            MediaDuration(1),
            TB_VIDEO,
            pts == 0,
            StreamType::Video,
        )
    }

    fn audio_packet(pts: i64) -> Packet {
        Packet::new(
            vec![0u8; 64],
            Some(Pts(pts)),
            Some(Pts(pts)),
            MediaDuration(1536),
            TB_AUDIO,
            true,
            StreamType::Audio,
        )
    }

    #[test]
    fn packet_construction() {
        let packet = video_packet(0);
        assert_eq!(packet.data.len(), 64);
        assert!(packet.is_keyframe);
        assert_eq!(packet.stream_type, StreamType::Video);
        assert_eq!(packet.time_base, TB_VIDEO);
    }

    #[test]
    fn streams_share_a_comparison_axis() {
        // frame 12 at 24 fps and sample 22050 at 44.1 kHz are both half
        // a second in
        assert_eq!(video_packet(12).pts_seconds(), Some(0.5));
        assert_eq!(audio_packet(22050).pts_seconds(), Some(0.5));
    }

    #[test]
    fn packet_without_pts_has_no_seconds() {
        let mut packet = audio_packet(0);
        packet.pts = None;
        assert_eq!(packet.pts_seconds(), None);
    }
}
