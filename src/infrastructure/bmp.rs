//! BMPファイル出力
//!
//! 抽出したBGRAピクセルを32bit BMPとして書き出す。
//! biHeightを負にしたトップダウン形式で、行の反転コピーを避ける。

use crate::domain::{CaptureError, CaptureResult, BYTES_PER_PIXEL};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

const FILE_HEADER_SIZE: u32 = 14;
const INFO_HEADER_SIZE: u32 = 40;

/// BGRAピクセル列を32bit BMPとして保存
///
/// # Arguments
/// * `path` - 出力先ファイルパス
/// * `data` - BGRA順・行パディングなしのピクセル列
/// * `width` / `height` - ピクセル寸法（dataの長さと一致すること）
pub fn write_bmp(
    path: impl AsRef<Path>,
    data: &[u8],
    width: u32,
    height: u32,
) -> CaptureResult<()> {
    let expected = width as usize * height as usize * BYTES_PER_PIXEL;
    if data.len() != expected {
        return Err(CaptureError::Configuration(format!(
            "BMP data length {} does not match {}x{} ({} bytes expected)",
            data.len(),
            width,
            height,
            expected
        )));
    }

    let data_size = data.len() as u32;
    let file_size = FILE_HEADER_SIZE + INFO_HEADER_SIZE + data_size;

    let file = File::create(path.as_ref())?;
    let mut writer = BufWriter::new(file);

    // BITMAPFILEHEADER
    writer.write_all(&0x4D42u16.to_le_bytes())?; // "BM"
    writer.write_all(&file_size.to_le_bytes())?;
    writer.write_all(&0u16.to_le_bytes())?;
    writer.write_all(&0u16.to_le_bytes())?;
    writer.write_all(&(FILE_HEADER_SIZE + INFO_HEADER_SIZE).to_le_bytes())?;

    // BITMAPINFOHEADER（負のbiHeightでトップダウン）
    writer.write_all(&INFO_HEADER_SIZE.to_le_bytes())?;
    writer.write_all(&(width as i32).to_le_bytes())?;
    writer.write_all(&(-(height as i32)).to_le_bytes())?;
    writer.write_all(&1u16.to_le_bytes())?; // biPlanes
    writer.write_all(&32u16.to_le_bytes())?; // biBitCount
    writer.write_all(&0u32.to_le_bytes())?; // biCompression = BI_RGB
    writer.write_all(&data_size.to_le_bytes())?;
    writer.write_all(&0i32.to_le_bytes())?; // biXPelsPerMeter
    writer.write_all(&0i32.to_le_bytes())?; // biYPelsPerMeter
    writer.write_all(&0u32.to_le_bytes())?; // biClrUsed
    writer.write_all(&0u32.to_le_bytes())?; // biClrImportant

    writer.write_all(data)?;
    writer.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_write_bmp_header_layout() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.bmp");

        // 2x2のBGRAピクセル
        let data = vec![0xAAu8; 2 * 2 * BYTES_PER_PIXEL];
        write_bmp(&path, &data, 2, 2).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(bytes.len(), 14 + 40 + 16);

        // マジックナンバー "BM"
        assert_eq!(&bytes[0..2], b"BM");
        // ファイルサイズ
        assert_eq!(u32::from_le_bytes(bytes[2..6].try_into().unwrap()), 70);
        // ピクセルデータオフセット
        assert_eq!(u32::from_le_bytes(bytes[10..14].try_into().unwrap()), 54);
        // biWidth / biHeight（トップダウンなので負）
        assert_eq!(i32::from_le_bytes(bytes[18..22].try_into().unwrap()), 2);
        assert_eq!(i32::from_le_bytes(bytes[22..26].try_into().unwrap()), -2);
        // biBitCount
        assert_eq!(u16::from_le_bytes(bytes[28..30].try_into().unwrap()), 32);
        // ピクセルデータがそのまま続く
        assert_eq!(&bytes[54..], &data[..]);
    }

    #[test]
    fn test_write_bmp_rejects_length_mismatch() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.bmp");

        let data = vec![0u8; 10];
        let result = write_bmp(&path, &data, 2, 2);
        assert!(matches!(result, Err(CaptureError::Configuration(_))));
        assert!(!path.exists());
    }

    #[test]
    fn test_write_bmp_io_error_propagates() {
        let data = vec![0u8; BYTES_PER_PIXEL];
        let result = write_bmp("/nonexistent-dir/out.bmp", &data, 1, 1);
        assert!(matches!(result, Err(CaptureError::Io(_))));
    }
}
