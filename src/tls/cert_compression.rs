use std::{io::Read, slice};

use boring_sys as ffi;
use libc::c_int;

use crate::emulation::CertCompressionAlgorithm;

pub(crate) trait CompressionCallbacks {
    fn compression_fn(&self) -> ffi::ssl_cert_compression_func_t;
    fn decompression_fn(&self) -> ffi::ssl_cert_decompression_func_t;
}

impl CompressionCallbacks for CertCompressionAlgorithm {
    fn compression_fn(&self) -> ffi::ssl_cert_compression_func_t {
        match self {
            Self::Brotli => Some(brotli_compressor),
            Self::Zlib => Some(zlib_compressor),
        }
    }

    fn decompression_fn(&self) -> ffi::ssl_cert_decompression_func_t {
        match self {
            Self::Brotli => Some(brotli_decompressor),
            Self::Zlib => Some(zlib_decompressor),
        }
    }
}

unsafe extern "C" fn brotli_compressor(
    _ssl: *mut ffi::SSL,
    out: *mut ffi::CBB,
    in_: *const u8,
    in_len: usize,
) -> c_int {
    let mut uncompressed = slice::from_raw_parts(in_, in_len);
    let mut compressed: Vec<u8> = Vec::new();

    let params = brotli::enc::encode::BrotliEncoderInitParams();

    if brotli::BrotliCompress(&mut uncompressed, &mut compressed, &params).is_err() {
        return 0;
    }

    ffi::CBB_add_bytes(out, compressed.as_ptr(), compressed.len())
}

unsafe extern "C" fn zlib_compressor(
    _ssl: *mut ffi::SSL,
    out: *mut ffi::CBB,
    in_: *const u8,
    in_len: usize,
) -> c_int {
    let mut uncompressed = slice::from_raw_parts(in_, in_len);
    let mut compressed: Vec<u8> = Vec::new();

    let params = flate2::Compression::default();

    let mut encoder = flate2::bufread::ZlibEncoder::new(&mut uncompressed, params);
    if encoder.read_to_end(&mut compressed).is_err() {
        return 0;
    }

    ffi::CBB_add_bytes(out, compressed.as_ptr(), compressed.len())
}

unsafe extern "C" fn brotli_decompressor(
    _ssl: *mut ffi::SSL,
    out: *mut *mut ffi::CRYPTO_BUFFER,
    uncompressed_len: usize,
    in_: *const u8,
    in_len: usize,
) -> c_int {
    let mut compressed = slice::from_raw_parts(in_, in_len);
    let mut uncompressed: Vec<u8> = Vec::with_capacity(uncompressed_len);

    if brotli::BrotliDecompress(&mut compressed, &mut uncompressed).is_err() {
        return 0;
    }

    if uncompressed.len() != uncompressed_len {
        return 0;
    }

    let buffer =
        ffi::CRYPTO_BUFFER_new(uncompressed.as_ptr(), uncompressed_len, std::ptr::null_mut());

    *out = buffer;

    1
}

unsafe extern "C" fn zlib_decompressor(
    _ssl: *mut ffi::SSL,
    out: *mut *mut ffi::CRYPTO_BUFFER,
    uncompressed_len: usize,
    in_: *const u8,
    in_len: usize,
) -> c_int {
    let mut compressed = slice::from_raw_parts(in_, in_len);
    let mut uncompressed: Vec<u8> = Vec::with_capacity(uncompressed_len);

    let mut decoder = flate2::bufread::ZlibDecoder::new(&mut compressed);
    if decoder.read_to_end(&mut uncompressed).is_err() {
        return 0;
    }

    if uncompressed.len() != uncompressed_len {
        return 0;
    }

    let buffer =
        ffi::CRYPTO_BUFFER_new(uncompressed.as_ptr(), uncompressed_len, std::ptr::null_mut());

    *out = buffer;

    1
}
