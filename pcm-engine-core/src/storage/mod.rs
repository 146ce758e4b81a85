pub mod backward_cursor;
pub mod chunk_reader;
pub mod pcm_writer;
