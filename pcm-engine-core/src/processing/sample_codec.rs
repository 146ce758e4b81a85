//! Conversion between raw PCM bytes and sample arrays.
//!
//! 16-bit samples use the platform's native byte order, matching what the
//! devices deliver. 8-bit samples map one byte to one sample value (0..=255)
//! without any re-centering, so the round trip is lossless for both encodings.

use crate::models::error::EngineError;
use crate::models::format::{FormatDescriptor, SampleEncoding};

/// Fails with `Alignment` unless `len` is a whole multiple of `unit`.
pub fn check_alignment(len: usize, unit: usize) -> Result<(), EngineError> {
    if unit == 0 || len % unit != 0 {
        return Err(EngineError::Alignment { len, unit });
    }
    Ok(())
}

/// Decode native-order 16-bit PCM into `out`, replacing its contents.
pub fn decode_pcm16_into(bytes: &[u8], out: &mut Vec<i16>) -> Result<(), EngineError> {
    check_alignment(bytes.len(), 2)?;
    out.clear();
    out.extend(
        bytes
            .chunks_exact(2)
            .map(|pair| i16::from_ne_bytes([pair[0], pair[1]])),
    );
    Ok(())
}

/// Decode whole frames of `format` into `out`, replacing its contents.
///
/// Fails with `Alignment` unless `bytes` holds a whole number of frames.
pub fn decode_frames_into(bytes: &[u8], format: &FormatDescriptor, out: &mut Vec<i16>) -> Result<(), EngineError> {
    check_alignment(bytes.len(), format.frame_size())?;
    match format.sample_encoding {
        SampleEncoding::Pcm8 => {
            out.clear();
            out.extend(bytes.iter().map(|&b| b as i16));
            Ok(())
        }
        SampleEncoding::Pcm16 => decode_pcm16_into(bytes, out),
    }
}

/// Encode 16-bit samples as native-order bytes into `out`, replacing its contents.
pub fn encode_pcm16_into(samples: &[i16], out: &mut Vec<u8>) {
    out.clear();
    out.reserve(samples.len() * 2);
    for sample in samples {
        out.extend_from_slice(&sample.to_ne_bytes());
    }
}

/// Interpret `bytes` as samples of `encoding`.
pub fn bytes_to_samples(bytes: &[u8], encoding: SampleEncoding) -> Result<Vec<i16>, EngineError> {
    match encoding {
        SampleEncoding::Pcm8 => Ok(bytes.iter().map(|&b| b as i16).collect()),
        SampleEncoding::Pcm16 => {
            let mut samples = Vec::with_capacity(bytes.len() / 2);
            decode_pcm16_into(bytes, &mut samples)?;
            Ok(samples)
        }
    }
}

/// Inverse of [`bytes_to_samples`].
///
/// For `Pcm8`, values outside `0..=255` are clamped.
pub fn samples_to_bytes(samples: &[i16], encoding: SampleEncoding) -> Vec<u8> {
    match encoding {
        SampleEncoding::Pcm8 => samples.iter().map(|&s| s.clamp(0, 255) as u8).collect(),
        SampleEncoding::Pcm16 => {
            let mut bytes = Vec::with_capacity(samples.len() * 2);
            encode_pcm16_into(samples, &mut bytes);
            bytes
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pcm16_round_trip() {
        let bytes: Vec<u8> = (0..=255u8).chain(0..=255u8).collect();
        let samples = bytes_to_samples(&bytes, SampleEncoding::Pcm16).unwrap();
        assert_eq!(samples.len(), 256);
        assert_eq!(samples_to_bytes(&samples, SampleEncoding::Pcm16), bytes);
    }

    #[test]
    fn pcm16_uses_native_order() {
        let value: i16 = -12345;
        let samples = bytes_to_samples(&value.to_ne_bytes(), SampleEncoding::Pcm16).unwrap();
        assert_eq!(samples, vec![-12345]);
    }

    #[test]
    fn pcm16_rejects_odd_length() {
        let err = bytes_to_samples(&[1, 2, 3], SampleEncoding::Pcm16).unwrap_err();
        assert_eq!(err, EngineError::Alignment { len: 3, unit: 2 });
    }

    #[test]
    fn pcm8_is_one_sample_per_byte() {
        let bytes = [0u8, 128, 255];
        let samples = bytes_to_samples(&bytes, SampleEncoding::Pcm8).unwrap();
        assert_eq!(samples, vec![0, 128, 255]);
        assert_eq!(samples_to_bytes(&samples, SampleEncoding::Pcm8), bytes);
    }

    #[test]
    fn decode_into_reuses_buffer() {
        let mut out = vec![7i16; 10];
        decode_pcm16_into(&[], &mut out).unwrap();
        assert!(out.is_empty());

        let mut bytes = Vec::new();
        encode_pcm16_into(&[1, -1, i16::MAX, i16::MIN], &mut bytes);
        decode_pcm16_into(&bytes, &mut out).unwrap();
        assert_eq!(out, vec![1, -1, i16::MAX, i16::MIN]);
    }

    #[test]
    fn frame_decode_rejects_partial_stereo_frame() {
        let mut out = Vec::new();
        let err = decode_frames_into(&[0; 6], &FormatDescriptor::cd_quality(), &mut out).unwrap_err();
        assert_eq!(err, EngineError::Alignment { len: 6, unit: 4 });

        decode_frames_into(&[0; 8], &FormatDescriptor::cd_quality(), &mut out).unwrap();
        assert_eq!(out, vec![0; 4]);
    }

    #[test]
    fn frame_decode_handles_eight_bit() {
        let format = FormatDescriptor::new(8000, crate::models::format::ChannelLayout::Stereo, SampleEncoding::Pcm8);
        let mut out = Vec::new();
        decode_frames_into(&[0, 255], &format, &mut out).unwrap();
        assert_eq!(out, vec![0, 255]);
        assert!(decode_frames_into(&[1, 2, 3], &format, &mut out).is_err());
    }

    #[test]
    fn alignment_check() {
        assert!(check_alignment(40, 4).is_ok());
        assert!(check_alignment(0, 4).is_ok());
        assert!(check_alignment(42, 4).is_err());
        assert!(check_alignment(4, 0).is_err());
    }
}
