pub mod buffer_sizing;
pub mod frame_reverse;
pub mod ring_buffer;
pub mod sample_codec;
