/*!
    Timestamp types for media timing.
*/

use crate::Rational;

/**
    Presentation timestamp in time_base units.

    This is the raw timestamp value attached to a media unit. To convert
    to a meaningful time, you need the stream's time base. The pipeline
    regenerates timestamps on linear axes: frame indices for video (time
    base `1/fps`) and cumulative sample counts for audio (time base
    `1/sample_rate`).
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pts(pub i64);

impl Pts {
    /**
        Convert this PTS to seconds using the given time base.

        The muxer compares video and audio packets on this axis when
        interleaving.
    */
    #[inline]
    pub fn to_seconds(self, time_base: Rational) -> f64 {
        self.0 as f64 * time_base.to_f64()
    }
}

impl From<i64> for Pts {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<Pts> for i64 {
    fn from(pts: Pts) -> Self {
        pts.0
    }
}

/**
    Duration in time_base units.

    Similar to Pts but semantically represents a span rather than a
    point in time.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MediaDuration(pub i64);

#[cfg(test)]
mod tests {
    use super::*;

    const TB_VIDEO: Rational = Rational { num: 1, den: 24 };
    const TB_AUDIO: Rational = Rational { num: 1, den: 44100 };

    #[test]
    fn pts_to_seconds_frames() {
        assert_eq!(Pts(12).to_seconds(TB_VIDEO), 0.5);
        assert_eq!(Pts(24).to_seconds(TB_VIDEO), 1.0);
    }

    #[test]
    fn pts_to_seconds_samples() {
        assert_eq!(Pts(22050).to_seconds(TB_AUDIO), 0.5);
        assert_eq!(Pts(44100).to_seconds(TB_AUDIO), 1.0);
    }

    #[test]
    fn frame_and_sample_axes_agree() {
        // half a second of 24 fps video and of 44.1 kHz audio land on
        // the same point of the comparison axis
        assert_eq!(Pts(12).to_seconds(TB_VIDEO), Pts(22050).to_seconds(TB_AUDIO));
    }

    #[test]
    fn pts_ordering() {
        assert!(Pts(100) < Pts(200));
        assert!(Pts(200) > Pts(100));
        assert_eq!(Pts(100), Pts(100));
    }

    #[test]
    fn pts_i64_round_trip() {
        let pts = Pts::from(1536i64);
        assert_eq!(i64::from(pts), 1536);
    }
}
