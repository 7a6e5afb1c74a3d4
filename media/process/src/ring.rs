/*!
    Fixed-capacity sample ring buffer for audio repacketization.
*/

use std::sync::Mutex;

use ringbuf::{
    traits::{Consumer, Observer, Producer},
    HeapRb,
};

/**
    A circular buffer of interleaved f32 samples, sized for the frame
    requirements of the downstream audio encoder.

    Capacity is `4 * frame_size * channels` samples: enough headroom for
    the tempo stretcher's bursty output while keeping memory bounded.
    Writes are all-or-nothing and reads dequeue exactly one encoder frame,
    so producers and consumers of different granularities meet cleanly in
    the middle.

    The buffer is mutex-protected: the write and read halves belong to the
    same processing loop today, but the locking keeps the type correct if
    those halves ever run on different threads.
*/
pub struct SampleRing {
    inner: Mutex<HeapRb<f32>>,
    frame_samples: usize,
}

impl SampleRing {
    /**
        Create a ring sized for `frame_size` samples per channel across
        `channels` channels.
    */
    pub fn new(frame_size: usize, channels: usize) -> Self {
        let frame_samples = frame_size * channels;
        Self {
            inner: Mutex::new(HeapRb::new(frame_samples * 4)),
            frame_samples,
        }
    }

    /**
        Append interleaved samples. Returns `false` without writing
        anything if the buffer lacks space for the whole slice.
    */
    pub fn write(&self, samples: &[f32]) -> bool {
        let mut ring = self.inner.lock().unwrap();
        if ring.vacant_len() < samples.len() {
            return false;
        }
        ring.push_slice(samples);
        true
    }

    /**
        Dequeue exactly one frame (`frame_size * channels` samples) into
        `out`. Returns `false` without reading anything if a full frame is
        not yet available.

        # Panics

        Panics if `out` is shorter than one frame.
    */
    pub fn read_frame(&self, out: &mut [f32]) -> bool {
        assert!(out.len() >= self.frame_samples);
        let mut ring = self.inner.lock().unwrap();
        if ring.occupied_len() < self.frame_samples {
            return false;
        }
        ring.pop_slice(&mut out[..self.frame_samples]);
        true
    }

    /**
        Dequeue whatever remains, up to `out.len()` samples, returning the
        count. Used once at end of stream to collect the partial tail
        frame for zero-padding.
    */
    pub fn read_remainder(&self, out: &mut [f32]) -> usize {
        let mut ring = self.inner.lock().unwrap();
        ring.pop_slice(out)
    }

    /**
        Number of interleaved samples currently buffered.
    */
    pub fn available(&self) -> usize {
        self.inner.lock().unwrap().occupied_len()
    }

    /**
        Returns true if at least one full frame is buffered.
    */
    pub fn has_complete_frame(&self) -> bool {
        self.available() >= self.frame_samples
    }

    /**
        Samples in one frame (`frame_size * channels`).
    */
    pub fn frame_samples(&self) -> usize {
        self.frame_samples
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read_frame() {
        let ring = SampleRing::new(4, 2);
        let samples: Vec<f32> = (0..8).map(|i| i as f32).collect();
        assert!(ring.write(&samples));
        assert!(ring.has_complete_frame());

        let mut out = [0.0f32; 8];
        assert!(ring.read_frame(&mut out));
        assert_eq!(out.to_vec(), samples);
        assert_eq!(ring.available(), 0);
    }

    #[test]
    fn read_frame_requires_full_frame() {
        let ring = SampleRing::new(4, 2);
        assert!(ring.write(&[1.0; 7]));

        let mut out = [0.0f32; 8];
        assert!(!ring.read_frame(&mut out));
        // the short read must not consume anything
        assert_eq!(ring.available(), 7);

        assert!(ring.write(&[2.0]));
        assert!(ring.read_frame(&mut out));
        assert_eq!(out[7], 2.0);
    }

    #[test]
    fn write_rejects_overflow() {
        // capacity is 4 * 2 * 4 = 32 samples
        let ring = SampleRing::new(2, 4);
        assert!(ring.write(&[0.0; 30]));
        assert!(!ring.write(&[0.0; 3]));
        // the rejected write must not partially land
        assert_eq!(ring.available(), 30);
        assert!(ring.write(&[0.0; 2]));
    }

    #[test]
    fn read_remainder_drains_partial_tail() {
        let ring = SampleRing::new(4, 2);
        assert!(ring.write(&[1.0, 2.0, 3.0]));

        let mut out = [0.0f32; 8];
        let read = ring.read_remainder(&mut out);
        assert_eq!(read, 3);
        assert_eq!(&out[..3], &[1.0, 2.0, 3.0]);
        assert_eq!(ring.available(), 0);
    }

    #[test]
    fn wraps_around() {
        let ring = SampleRing::new(2, 1);
        let mut out = [0.0f32; 2];

        // cycle more data through than the capacity of 8
        for round in 0..10 {
            let base = (round * 2) as f32;
            assert!(ring.write(&[base, base + 1.0]));
            assert!(ring.read_frame(&mut out));
            assert_eq!(out, [base, base + 1.0]);
        }
    }
}
