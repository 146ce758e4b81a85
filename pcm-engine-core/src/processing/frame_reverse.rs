use crate::models::error::EngineError;
use crate::processing::sample_codec::check_alignment;

/// Reverse the temporal order of the frames in `window`, in place.
///
/// Whole frames are swapped end-for-end (frame 0 with the last frame, frame 1
/// with the second-last, ...), so the bytes inside each frame keep their
/// order. Channel identity and sample integrity survive; only time runs
/// backwards.
pub fn reverse_frames_in_place(window: &mut [u8], frame_size: usize) -> Result<(), EngineError> {
    check_alignment(window.len(), frame_size)?;
    let frames = window.len() / frame_size;
    for i in 0..frames / 2 {
        let mirror = frames - 1 - i;
        let (head, tail) = window.split_at_mut(mirror * frame_size);
        head[i * frame_size..(i + 1) * frame_size].swap_with_slice(&mut tail[..frame_size]);
    }
    Ok(())
}
