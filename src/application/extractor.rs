//! 領域抽出モジュール
//!
//! キャンバスから呼び出し側指定の矩形を切り出し、内容を検証します。

use crate::domain::{Canvas, Region, BYTES_PER_PIXEL};

/// 抽出の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractStatus {
    /// 抽出成功（書き込んだバイト数）
    Copied(usize),
    /// コピーは完了したが全ピクセルがゼロ（空フレーム）
    ///
    /// セッションは健全な可能性があるため、再初期化なしの再取得を
    /// 促すシグナル。
    Blank,
    /// 矩形がキャンバスと重ならない（リトライ不能な拒否）
    OutOfBounds,
    /// 呼び出し側バッファがクランプ後の矩形に対して不足
    BufferTooSmall,
}

/// キャンバスから矩形を抽出
///
/// regionはキャンバス範囲へインプレースでクランプされる。
/// 呼び出し側はクランプ後のregionで出力バッファの寸法を解釈する。
pub fn extract(canvas: &Canvas, region: &mut Region, out: &mut [u8]) -> ExtractStatus {
    // 重なり判定: 完全にキャンバス外の矩形はクランプ不能
    if !region.overlaps_canvas(canvas.width, canvas.height) {
        return ExtractStatus::OutOfBounds;
    }

    region.clamp_to_canvas(canvas.width, canvas.height);

    let width = region.width() as usize;
    let height = region.height() as usize;
    let total = width * height * BYTES_PER_PIXEL;
    if out.len() < total {
        return ExtractStatus::BufferTooSmall;
    }

    // クランプ済み矩形を行単位でコピー
    let canvas_stride = canvas.width as usize * BYTES_PER_PIXEL;
    let row_bytes = width * BYTES_PER_PIXEL;
    let left = region.left as usize;
    let top = region.top as usize;

    for row in 0..height {
        let src_start = (top + row) * canvas_stride + left * BYTES_PER_PIXEL;
        let dst_start = row * row_bytes;
        out[dst_start..dst_start + row_bytes]
            .copy_from_slice(&canvas.data[src_start..src_start + row_bytes]);
    }

    // 内容検証: 4バイトピクセル単位で全ゼロなら空フレーム扱い
    if is_all_zero(&out[..total]) {
        return ExtractStatus::Blank;
    }

    ExtractStatus::Copied(total)
}

fn is_all_zero(bytes: &[u8]) -> bool {
    bytes
        .chunks_exact(BYTES_PER_PIXEL)
        .all(|px| px == [0, 0, 0, 0])
}
